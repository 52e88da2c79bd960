//! Padding of transcript ends inside a locus: transcripts whose terminal
//! exons nearly coincide are extended to a common start or end.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::codon::CodonTable;
use crate::context::PickContext;
use crate::error::Error;
use crate::graph::OverlapGraph;
use crate::interval::Interval;
use crate::sequence::reverse_complement;
use crate::transcript::Transcript;
use crate::transcript::orf::Orf;

use super::container::LocusContainer;

/// New start and/or end for a transcript.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Extension {
    start: Option<i32>,
    end: Option<i32>,
}

fn first_exon(t: &Transcript) -> Option<Interval> {
    t.exons().iter().min().copied()
}

fn last_exon(t: &Transcript) -> Option<Interval> {
    t.exons().iter().max().copied()
}

fn share_five_prime(a: &Transcript, b: &Transcript, ts_distance: i32) -> bool {
    match (first_exon(a), first_exon(b)) {
        (Some(x), Some(y)) => x.overlaps(&y) && (a.start - b.start).abs() + 1 < ts_distance,
        _ => false,
    }
}

fn share_three_prime(a: &Transcript, b: &Transcript, ts_distance: i32) -> bool {
    match (last_exon(a), last_exon(b)) {
        (Some(x), Some(y)) => x.overlaps(&y) && (a.end - b.end).abs() + 1 < ts_distance,
        _ => false,
    }
}

/// Decide the extensions. 5' groups are connected components ordered by
/// their leftmost start, 3' groups are cliques ordered by their rightmost
/// end; in each group the most extreme transcript is the anchor.
fn plan(locus: &LocusContainer, ctx: &PickContext) -> BTreeMap<String, Extension> {
    let config = &ctx.config.alternative_splicing;
    let ts_distance = config.ts_distance;
    let max_splices = config.ts_max_splices;
    let position = |tid: &String| locus.get(tid).map_or(0, |t| t.start);
    let end_of = |tid: &String| locus.get(tid).map_or(0, |t| t.end);

    let mut plan: BTreeMap<String, Extension> = BTreeMap::new();

    let five_graph = OverlapGraph::build(locus.transcripts(), |a, b| share_five_prime(a, b, ts_distance));
    let mut groups: Vec<Vec<String>> = five_graph.communities();
    groups.sort_by_key(|g| g.iter().map(position).min().unwrap_or(0));
    let mut queue: VecDeque<Vec<String>> = groups.into();
    let mut found: BTreeSet<String> = BTreeSet::new();
    while let Some(group) = queue.pop_front() {
        let mut members: Vec<String> = group.into_iter().filter(|t| !found.contains(t)).collect();
        members.sort_by_key(|t| (position(t), t.clone()));
        let Some((anchor, rest)) = members.split_first() else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        found.insert(anchor.clone());
        let anchor_start = position(anchor);
        for tid in rest {
            let start = position(tid);
            let splices = locus.splices().range(anchor_start..=start).count();
            if start > anchor_start && start - anchor_start + 1 < ts_distance && splices < max_splices {
                plan.entry(tid.clone()).or_default().start = Some(anchor_start);
                found.insert(tid.clone());
            }
        }
        let left: Vec<String> = rest.iter().filter(|t| !found.contains(*t)).cloned().collect();
        if !left.is_empty() {
            queue.push_front(left);
        }
    }

    let three_graph = OverlapGraph::build(locus.transcripts(), |a, b| share_three_prime(a, b, ts_distance));
    let mut groups: Vec<Vec<String>> = three_graph.cliques();
    groups.sort_by_key(|g| std::cmp::Reverse(g.iter().map(end_of).max().unwrap_or(0)));
    let mut queue: VecDeque<Vec<String>> = groups.into();
    let mut found: BTreeSet<String> = BTreeSet::new();
    while let Some(group) = queue.pop_front() {
        let mut members: Vec<String> = group.into_iter().filter(|t| !found.contains(t)).collect();
        members.sort_by_key(|t| (std::cmp::Reverse(end_of(t)), t.clone()));
        let Some((anchor, rest)) = members.split_first() else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        found.insert(anchor.clone());
        let anchor_end = end_of(anchor);
        for tid in rest {
            let end = end_of(tid);
            let splices = locus.splices().range(end..=anchor_end).count();
            if end < anchor_end && anchor_end - end + 1 < ts_distance && splices < max_splices {
                plan.entry(tid.clone()).or_default().end = Some(anchor_end);
                found.insert(tid.clone());
            }
        }
        let left: Vec<String> = rest.iter().filter(|t| !found.contains(*t)).cloned().collect();
        if !left.is_empty() {
            queue.push_front(left);
        }
    }
    plan
}

/// Extend the terminal exons of `original` and re-express its ORFs on the
/// longer cDNA. `None` when a coding transcript cannot be padded for lack of
/// a genome.
fn extend(original: &Transcript, extension: Extension, ctx: &PickContext) -> Result<Option<Transcript>, Error> {
    let mut t = original.clone();
    let orfs = if t.is_coding() { t.orf_records() } else { Vec::new() };
    if !orfs.is_empty() && ctx.genome.is_none() {
        log::warn!(
            "{} ({}:{}-{}): no genome sequence available, not padding a coding transcript",
            t.id,
            t.chrom,
            t.start,
            t.end
        );
        return Ok(None);
    }
    t.strip_cds(true);
    t.unfinalize();

    let mut upstream = 0;
    let mut downstream = 0;
    if let Some(start) = extension.start
        && let Some(first) = first_exon(&t)
    {
        upstream = t.start - start;
        t.remove_exon(first);
        t.add_exon(Interval::new(start, first.end));
        t.start = start;
    }
    if let Some(end) = extension.end
        && let Some(last) = last_exon(&t)
    {
        downstream = end - t.end;
        t.remove_exon(last);
        t.add_exon(Interval::new(last.start, end));
        t.end = end;
    }

    if let Some(genome) = &ctx.genome
        && !orfs.is_empty()
    {
        log::warn!("enlarging the ORFs of {} ({:?})", t.id, extension);
        let mut exons = t.exons().to_vec();
        exons.sort();
        let mut sequence = Vec::new();
        for exon in exons {
            sequence.extend(genome.fetch(&t.chrom, exon.start, exon.end)?);
        }
        if t.strand.is_reverse() {
            sequence = reverse_complement(&sequence);
            std::mem::swap(&mut upstream, &mut downstream);
        }
        let table = CodonTable::standard();
        let expanded: Vec<Orf> = orfs
            .iter()
            .map(|orf| orf.expand(&sequence, upstream, downstream, &table))
            .collect();
        t.load_orfs(&expanded)?;
    }
    t.finalize()?;
    t.attributes.insert("padded".to_string(), "True".to_string());
    Ok(Some(t))
}

/// Pad the transcript ends of a locus. Returns the ids of the padded
/// transcripts.
pub fn pad_transcripts(locus: &mut LocusContainer, ctx: &PickContext) -> Result<Vec<String>, Error> {
    let plan = plan(locus, ctx);
    let mut padded = Vec::new();
    for (tid, extension) in plan {
        let Some(original) = locus.get(&tid) else {
            continue;
        };
        if let Some(transcript) = extend(original, extension, ctx)? {
            log::debug!(
                "padded {tid} in {}: {}-{} to {}-{}",
                locus.id(),
                original.start,
                original.end,
                transcript.start,
                transcript.end
            );
            locus.replace_transcript(transcript)?;
            padded.push(tid);
        }
    }
    Ok(padded)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::PickConfig;
    use crate::loci::container::Stage;
    use crate::sequence::InMemoryGenome;
    use crate::strand::Strand;
    use crate::transcript::test_transcript;

    fn locus_of(transcripts: Vec<Transcript>) -> LocusContainer {
        let mut iter = transcripts.into_iter();
        let mut locus = LocusContainer::new(Stage::Locus, iter.next().unwrap()).unwrap();
        for t in iter {
            locus.add_transcript(t, false).unwrap();
        }
        locus
    }

    #[test]
    fn non_coding_start_is_extended() {
        let ctx = PickContext::new(PickConfig::default());
        let primary = test_transcript("p", Strand::Plus, &[(100, 200), (300, 400)], &[]);
        let short = test_transcript("s", Strand::Plus, &[(150, 200), (300, 380)], &[]);
        let mut locus = locus_of(vec![primary, short]);
        let padded = pad_transcripts(&mut locus, &ctx).unwrap();
        assert_eq!(padded, vec!["s"]);
        let s = locus.get("s").unwrap();
        assert_eq!((s.start, s.end), (100, 400));
        assert_eq!(s.exons(), &[Interval::new(100, 200), Interval::new(300, 400)]);
        assert_eq!(s.attributes["padded"], "True");
    }

    #[test]
    fn distance_and_splices_limit_padding() {
        let mut config = PickConfig::default();
        config.alternative_splicing.ts_distance = 40;
        let ctx = PickContext::new(config);
        let primary = test_transcript("p", Strand::Plus, &[(100, 200), (300, 400)], &[]);
        let short = test_transcript("s", Strand::Plus, &[(150, 200), (300, 400)], &[]);
        let mut locus = locus_of(vec![primary, short]);
        assert!(pad_transcripts(&mut locus, &ctx).unwrap().is_empty());
        assert_eq!(locus.get("s").unwrap().start, 150);
    }

    #[test]
    fn coding_transcript_needs_a_genome() {
        let primary = test_transcript("p", Strand::Plus, &[(100, 200), (300, 400)], &[]);
        let coding = test_transcript("c", Strand::Plus, &[(150, 200), (300, 400)], &[(161, 200), (300, 346)]);

        let ctx = PickContext::new(PickConfig::default());
        let mut locus = locus_of(vec![primary.clone(), coding.clone()]);
        assert!(pad_transcripts(&mut locus, &ctx).unwrap().is_empty());
        assert_eq!(locus.get("c").unwrap().start, 150);

        let mut genome = InMemoryGenome::default();
        genome.insert("chr1", &[b'A'; 1000]);
        let ctx = PickContext::new(PickConfig::default()).with_genome(Arc::new(genome));
        let mut locus = locus_of(vec![primary, coding]);
        assert_eq!(pad_transcripts(&mut locus, &ctx).unwrap(), vec!["c"]);
        let c = locus.get("c").unwrap();
        assert_eq!(c.start, 100);
        assert!(c.is_coding());
        assert_eq!(c.combined_cds(), &[Interval::new(161, 200), Interval::new(300, 346)]);
    }
}
