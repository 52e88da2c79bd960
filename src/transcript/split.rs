//! Splitting of chimeric transcripts that carry several non-overlapping ORFs.
//!
//! Each ORF (or group of ORFs merged on homology evidence) yields a new
//! transcript named `<id>.split<n>`, carved from the exons of the original.

use std::cmp::{max, min};
use std::collections::BTreeMap;

use crate::config::{BlastParams, ChimeraSplitConfig, Leniency};
use crate::error::Error;
use crate::homology::{self, Hsp};
use crate::interval::Interval;

use super::Transcript;
use super::construction::cdna_to_genomic;
use super::orf::Orf;

/// HSPs per target protein, with the target length.
type RegionHits = BTreeMap<String, (i32, Vec<Hsp>)>;

/// A cDNA region destined to become one transcript, with the ORFs it contains.
#[derive(Debug, Clone)]
struct Boundary {
    span: Interval,
    orfs: Vec<Orf>,
}

impl Transcript {
    /// Split the transcript at ORF boundaries.
    ///
    /// Returns a single copy of the transcript when it has fewer than two ORFs
    /// or when homology evidence merges all ORFs back together.
    pub fn split_by_cds(&self, config: &ChimeraSplitConfig) -> Result<Vec<Transcript>, Error> {
        if !self.finalized {
            return Err(Error::Validation(format!(
                "{} must be finalized before splitting",
                self.id
            )));
        }
        if self.number_internal_orfs() < 2 {
            return Ok(vec![self.clone()]);
        }

        let mut orfs = self.orf_records();
        orfs.sort_by_key(|o| (o.thick_start, o.thick_end));
        let mut boundaries: Vec<Boundary> = orfs
            .into_iter()
            .map(|orf| Boundary {
                span: orf.span(),
                orfs: vec![orf],
            })
            .collect();

        if config.blast_check {
            boundaries = self.merge_boundaries_by_homology(boundaries, &config.blast_params);
        }
        if boundaries.len() == 1 {
            return Ok(vec![self.clone()]);
        }
        self.create_split_transcripts(&boundaries, &config.blast_params)
    }

    /// Merge adjacent boundaries whose homology evidence does not support a split.
    ///
    /// Each ORF is judged against the ORF immediately before it, not against
    /// the region merged so far.
    fn merge_boundaries_by_homology(&self, boundaries: Vec<Boundary>, params: &BlastParams) -> Vec<Boundary> {
        let hits: Vec<RegionHits> = boundaries.iter().map(|b| self.hsps_in_region(b.span, params)).collect();
        let mut merged: Vec<Boundary> = Vec::with_capacity(boundaries.len());
        for (index, boundary) in boundaries.into_iter().enumerate() {
            let split = index == 0 || should_split(&hits[index - 1], &hits[index], params);
            match merged.last_mut() {
                Some(previous) if !split => {
                    log::debug!(
                        "{}: keeping ORF regions {} and {} together",
                        self.id,
                        previous.span,
                        boundary.span
                    );
                    previous.span = Interval::new(
                        min(previous.span.start, boundary.span.start),
                        max(previous.span.end, boundary.span.end),
                    );
                    previous.orfs.extend(boundary.orfs);
                }
                _ => merged.push(boundary),
            }
        }
        merged
    }

    /// HSPs per target covering at least `minimal_hsp_overlap` of `region`.
    fn hsps_in_region(&self, region: Interval, params: &BlastParams) -> RegionHits {
        let mut hits = RegionHits::new();
        for hit in &self.blast_hits {
            for hsp in &hit.hsps {
                if hsp.hsp_evalue > params.hsp_evalue {
                    continue;
                }
                let overlap = hsp.query_span().overlap(&region).max(0);
                if f64::from(overlap) >= params.minimal_hsp_overlap * f64::from(region.len()) {
                    hits.entry(hit.target.clone())
                        .or_insert_with(|| (hit.target_length, Vec::new()))
                        .1
                        .push(hsp.clone());
                }
            }
        }
        hits
    }

    fn create_split_transcripts(&self, boundaries: &[Boundary], params: &BlastParams) -> Result<Vec<Transcript>, Error> {
        let mut pieces = Vec::with_capacity(boundaries.len());
        let last_index = boundaries.len() - 1;
        for (index, boundary) in boundaries.iter().enumerate() {
            let (exons, retained) = self.split_exons(boundary.span, index > 0, index < last_index);
            let (Some(first), Some(last)) = (exons.first(), exons.last()) else {
                return Err(Error::InvalidTranscript(format!(
                    "{}: no exons retained for region {}",
                    self.id, boundary.span
                )));
            };

            let mut piece = Transcript::new(
                &format!("{}.split{}", self.id, index + 1),
                &self.chrom,
                self.strand,
                first.start,
                last.end,
            );
            piece.source = self.source.clone();
            piece.parent = self.parent.clone();
            piece.attributes = self.attributes.clone();
            piece.feature = self.feature;
            piece.exons = exons;
            piece.finalize()?;

            let offset = retained.start - 1;
            let relocated: Vec<Orf> = boundary.orfs.iter().map(|o| o.shifted(-offset)).collect();
            piece.load_orfs(&relocated)?;
            if piece.selected_cds_length() == 0 {
                return Err(Error::InvalidTranscript(format!(
                    "{}: no CDS retained after splitting at {}",
                    self.id, boundary.span
                )));
            }

            piece.blast_hits = self
                .blast_hits
                .iter()
                .filter_map(|hit| homology::recalculate_hit(hit, retained, params.minimal_hsp_overlap))
                .collect();
            piece.verified_introns = self
                .verified_introns
                .intersection(&piece.introns)
                .copied()
                .collect();
            pieces.push(piece);
        }

        let mut spans: Vec<Interval> = pieces.iter().map(Transcript::span).collect();
        spans.sort();
        if let Some(pair) = spans.windows(2).find(|w| w[0].overlaps(&w[1])) {
            return Err(Error::InvalidTranscript(format!(
                "{}: split products {} and {} overlap",
                self.id, pair[0], pair[1]
            )));
        }
        log::debug!("{} split into {} transcripts", self.id, pieces.len());
        Ok(pieces)
    }

    /// Exons retained for a cDNA `boundary`. `left`/`right` cut away the
    /// sequence before/after the boundary; otherwise the UTR on that side is
    /// kept. Returns the genomic exons and the retained cDNA interval.
    fn split_exons(&self, boundary: Interval, left: bool, right: bool) -> (Vec<Interval>, Interval) {
        let lower = if left { boundary.start } else { i32::MIN };
        let upper = if right { boundary.end } else { i32::MAX };
        let reverse = self.strand.is_reverse();

        let mut exons = Vec::new();
        let (mut tstart, mut tend) = (i32::MAX, i32::MIN);
        let mut offset = 0;
        for exon in self.exons_in_transcription_order() {
            let texon = Interval::new(offset + 1, offset + exon.len());
            offset += exon.len();
            let (from, to) = (max(texon.start, lower), min(texon.end, upper));
            if from > to {
                continue;
            }
            exons.push(cdna_to_genomic(exon, texon.start, Interval::new(from, to), reverse));
            tstart = min(tstart, from);
            tend = max(tend, to);
        }
        exons.sort();
        (exons, Interval::new(tstart, tend))
    }
}

fn should_split(old_hits: &RegionHits, new_hits: &RegionHits, params: &BlastParams) -> bool {
    match (old_hits.is_empty(), new_hits.is_empty()) {
        (true, true) => params.leniency != Leniency::Stringent,
        (true, false) | (false, true) => params.leniency == Leniency::Permissive,
        (false, false) => common_hits_support_split(new_hits, old_hits, params.min_overlap_duplication),
    }
}

/// Decide whether two ORF regions hitting the same proteins are separate genes.
///
/// Split when the regions share no target. For shared targets, keep them
/// together if any HSP spans both regions or if the HSPs cover different or
/// only slightly overlapping parts of the protein; split only when every
/// shared target shows a duplication (target overlap of at least
/// `min_overlap_duplication` of the protein length).
fn common_hits_support_split(
    new_hits: &RegionHits,
    old_hits: &RegionHits,
    min_overlap_duplication: f64,
) -> bool {
    for (target, (target_length, new_hsps)) in new_hits {
        let Some((_, old_hsps)) = old_hits.get(target) else {
            continue;
        };
        let spanning = new_hsps
            .iter()
            .any(|n| old_hsps.iter().any(|o| n.query_span().overlaps(&o.query_span())));
        if spanning {
            return false;
        }
        let mut duplicated = false;
        for new in new_hsps {
            for old in old_hsps {
                let overlap = new.target_span().overlap(&old.target_span());
                if overlap <= 0 {
                    continue;
                }
                if f64::from(overlap) / f64::from(*target_length) < min_overlap_duplication {
                    return false;
                }
                duplicated = true;
            }
        }
        if !duplicated {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::homology::test_hit;
    use crate::strand::Strand;
    use crate::transcript::test_transcript;

    fn chimera(strand: Strand) -> Transcript {
        // cDNA length 600; ORFs at 11-250 and 301-540
        let mut t = test_transcript("chim", strand, &[(1000, 1200), (1301, 1500), (1601, 1799)], &[]);
        t.load_orfs(&[Orf::new("a", 11, 250), Orf::new("b", 301, 540)]).unwrap();
        t
    }

    fn no_blast() -> ChimeraSplitConfig {
        ChimeraSplitConfig {
            blast_check: false,
            ..Default::default()
        }
    }

    #[test]
    fn split_partitions_exons() {
        let t = chimera(Strand::Plus);
        assert_eq!(t.number_internal_orfs(), 2);
        let pieces = t.split_by_cds(&no_blast()).unwrap();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].id, "chim.split1");
        assert_eq!(pieces[1].id, "chim.split2");
        for piece in &pieces {
            assert_eq!(piece.number_internal_orfs(), 1);
            assert!(piece.selected_cds_length() > 0);
        }
        // first piece keeps the 5' end, second the 3' end
        assert_eq!(pieces[0].start, 1000);
        assert_eq!(pieces[1].end, 1799);
        assert!(pieces[0].end < pieces[1].start);
        for exon in pieces.iter().flat_map(|p| p.exons()) {
            assert!(t.exons().iter().any(|e| e.contains(exon)));
        }
        assert_eq!(pieces[0].combined_cds_length(), 240);
        assert_eq!(pieces[1].combined_cds_length(), 240);
    }

    #[test]
    fn split_on_minus_strand() {
        let t = chimera(Strand::Minus);
        let pieces = t.split_by_cds(&no_blast()).unwrap();
        assert_eq!(pieces.len(), 2);
        // the first ORF in transcription order sits at the genomic 3' end
        assert_eq!(pieces[0].end, 1799);
        assert_eq!(pieces[1].start, 1000);
    }

    #[test]
    fn single_orf_is_not_split() {
        let mut t = test_transcript("t", Strand::Plus, &[(1, 600)], &[]);
        t.load_orfs(&[Orf::new("a", 11, 250)]).unwrap();
        let pieces = t.split_by_cds(&no_blast()).unwrap();
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].id, "t");
    }

    #[test]
    fn stringent_merges_orfs_without_hits() {
        let t = chimera(Strand::Plus);
        let mut config = ChimeraSplitConfig::default();
        config.blast_check = true;
        config.blast_params.leniency = Leniency::Stringent;
        assert_eq!(t.split_by_cds(&config).unwrap().len(), 1);
        config.blast_params.leniency = Leniency::Lenient;
        assert_eq!(t.split_by_cds(&config).unwrap().len(), 2);
    }

    #[test]
    fn one_sided_hits_split_only_when_permissive() {
        let mut t = chimera(Strand::Plus);
        t.blast_hits = vec![test_hit("p1", 100, &[(20, 240, 1, 70)])];
        let mut config = ChimeraSplitConfig::default();
        config.blast_params.leniency = Leniency::Lenient;
        assert_eq!(t.split_by_cds(&config).unwrap().len(), 1);
        config.blast_params.leniency = Leniency::Permissive;
        let pieces = t.split_by_cds(&config).unwrap();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].blast_hits.len(), 1);
        assert!(pieces[1].blast_hits.is_empty());
    }

    #[test]
    fn distinct_targets_split() {
        let mut t = chimera(Strand::Plus);
        t.blast_hits = vec![
            test_hit("p1", 100, &[(20, 240, 1, 70)]),
            test_hit("p2", 100, &[(310, 530, 1, 70)]),
        ];
        assert_eq!(t.split_by_cds(&ChimeraSplitConfig::default()).unwrap().len(), 2);
    }

    #[test]
    fn fragments_of_one_protein_stay_together() {
        let mut t = chimera(Strand::Plus);
        t.blast_hits = vec![test_hit("p1", 200, &[(20, 240, 1, 70), (310, 530, 120, 190)])];
        assert_eq!(t.split_by_cds(&ChimeraSplitConfig::default()).unwrap().len(), 1);
    }

    #[test]
    fn tandem_duplication_splits() {
        let mut t = chimera(Strand::Plus);
        t.blast_hits = vec![test_hit("p1", 80, &[(20, 240, 1, 75), (310, 530, 3, 78)])];
        assert_eq!(t.split_by_cds(&ChimeraSplitConfig::default()).unwrap().len(), 2);
    }

    #[test]
    fn monoexonic_pieces_keep_the_orf_strand() {
        let mut t = test_transcript("mono", Strand::Minus, &[(1000, 1599)], &[]);
        t.load_orfs(&[Orf::new("a", 11, 250), Orf::new("b", 301, 540)]).unwrap();
        let pieces = t.split_by_cds(&no_blast()).unwrap();
        assert_eq!(pieces.len(), 2);
        assert!(pieces.iter().all(|p| p.strand == Strand::Minus));
        assert_eq!((pieces[0].start, pieces[0].end), (1350, 1599));
        assert_eq!(pieces[0].combined_cds(), &[Interval::new(1350, 1589)]);
        assert_eq!((pieces[1].start, pieces[1].end), (1000, 1299));
        assert_eq!(pieces[1].combined_cds_length(), 240);
    }

    #[test]
    fn short_hsp_inside_a_long_orf_is_not_support() {
        // 60 of 240 ORF bases covered: both regions count as hit-free
        let mut t = chimera(Strand::Plus);
        t.blast_hits = vec![test_hit("p1", 100, &[(100, 159, 1, 20)])];
        let mut config = ChimeraSplitConfig::default();
        config.blast_params.leniency = Leniency::Lenient;
        assert_eq!(t.split_by_cds(&config).unwrap().len(), 2);
        config.blast_params.leniency = Leniency::Stringent;
        assert_eq!(t.split_by_cds(&config).unwrap().len(), 1);
    }

    #[test]
    fn hsp_coverage_threshold_per_leniency() {
        // the first ORF spans 11-250 (240 bases); the threshold is 120
        let cases = [
            ((132, 280), [2, 2, 1]),
            ((131, 280), [2, 1, 1]),
            ((130, 280), [2, 1, 1]),
        ];
        let modes = [Leniency::Permissive, Leniency::Lenient, Leniency::Stringent];
        for ((start, end), expected) in cases {
            let mut t = chimera(Strand::Plus);
            t.blast_hits = vec![test_hit("p1", 100, &[(start, end, 1, 50)])];
            for (leniency, pieces) in modes.iter().zip(expected) {
                let mut config = ChimeraSplitConfig::default();
                config.blast_params.leniency = *leniency;
                assert_eq!(
                    t.split_by_cds(&config).unwrap().len(),
                    pieces,
                    "HSP {start}-{end} under {leniency:?}"
                );
            }
        }
    }

    #[test]
    fn each_orf_is_judged_against_its_neighbour() {
        // ORFs at 11-250, 271-300 and 331-540; only the first has a hit
        let mut t = test_transcript("tri", Strand::Plus, &[(1000, 1200), (1301, 1500), (1601, 1799)], &[]);
        t.load_orfs(&[Orf::new("a", 11, 250), Orf::new("b", 271, 300), Orf::new("c", 331, 540)])
            .unwrap();
        assert_eq!(t.number_internal_orfs(), 3);
        t.blast_hits = vec![test_hit("p1", 100, &[(11, 250, 1, 80)])];
        let mut config = ChimeraSplitConfig::default();
        config.blast_params.leniency = Leniency::Lenient;
        let pieces = t.split_by_cds(&config).unwrap();
        // a and b merge on one-sided evidence; b and c both lack hits
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].number_internal_orfs(), 2);
        assert_eq!(pieces[1].number_internal_orfs(), 1);
    }
}
