//! Subloci and the clique loop that extracts the best non-overlapping
//! transcripts from a container.

use std::collections::BTreeSet;

use crate::context::PickContext;
use crate::error::Error;
use crate::graph::OverlapGraph;
use crate::transcript::Transcript;

use super::container::{LocusContainer, Stage};

/// Outcome of [`pick_by_cliques`].
#[derive(Debug, Default)]
pub struct Picked {
    pub selected: Vec<Transcript>,
    /// Winners that were purged for scoring zero.
    pub excluded: Vec<Transcript>,
}

/// Score the container, then repeatedly take the best transcript of every
/// connected component of the stage graph and remove it together with all
/// its clique partners, until the graph is empty.
pub fn pick_by_cliques(container: &mut LocusContainer, ctx: &PickContext) -> Result<Picked, Error> {
    container.calculate_scores(ctx)?;
    let mut picked = Picked::default();
    let Some(predicate) = container.stage.strategy().intersecting else {
        picked.selected = container.transcripts().cloned().collect();
        return Ok(picked);
    };
    let cds_only = container.cds_only;
    let purge = ctx.config.run_options.purge;
    let mut graph = OverlapGraph::build(container.transcripts(), |a, b| predicate(a, b, cds_only));

    while !graph.is_empty() {
        let cliques = graph.cliques();
        let mut to_remove: BTreeSet<String> = BTreeSet::new();
        for community in graph.communities() {
            let Some(best) = container.choose_best(&community) else {
                continue;
            };
            for clique in cliques.iter().filter(|c| c.contains(&best)) {
                to_remove.extend(clique.iter().cloned());
            }
            to_remove.insert(best.clone());
            let Some(transcript) = container.get(&best) else {
                continue;
            };
            if !purge || transcript.score > 0.0 {
                picked.selected.push(transcript.clone());
            } else {
                log::debug!("{best} scores 0 in {}; purging it", container.id());
                picked.excluded.push(transcript.clone());
            }
        }
        graph.remove_nodes(to_remove.iter().map(String::as_str));
    }
    Ok(picked)
}

impl LocusContainer {
    /// Split a sublocus into monosubloci. Returns the monosubloci and the
    /// purged transcripts.
    pub fn define_monosubloci(&mut self, ctx: &PickContext) -> Result<(Vec<LocusContainer>, Vec<Transcript>), Error> {
        debug_assert_eq!(self.stage, Stage::Sublocus);
        let picked = pick_by_cliques(self, ctx)?;
        let monosubloci = picked
            .selected
            .into_iter()
            .map(|t| self.spawn(Stage::Monosublocus, t))
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("{}: {} monosubloci", self.id(), monosubloci.len());
        Ok((monosubloci, picked.excluded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loci::container::tests::context;
    use crate::strand::Strand;
    use crate::transcript::test_transcript;

    fn sublocus(transcripts: Vec<Transcript>) -> LocusContainer {
        let mut iter = transcripts.into_iter();
        let mut container = LocusContainer::new(Stage::Sublocus, iter.next().unwrap()).unwrap();
        for t in iter {
            container.add_transcript(t, false).unwrap();
        }
        container
    }

    #[test]
    fn best_transcript_wins_each_clique() {
        let ctx = context();
        let long = test_transcript("long", Strand::Plus, &[(100, 200), (300, 900)], &[(150, 200), (300, 800)]);
        let short = test_transcript("short", Strand::Plus, &[(100, 200), (300, 400)], &[(150, 200), (300, 350)]);
        let apart = test_transcript("apart", Strand::Plus, &[(1000, 1200), (1300, 1400)], &[(1050, 1200), (1300, 1349)]);
        let mut container = sublocus(vec![short, long, apart]);

        let (monosubloci, excluded) = container.define_monosubloci(&ctx).unwrap();
        let chosen: Vec<String> = monosubloci
            .iter()
            .filter_map(|m| m.primary.clone())
            .collect();
        assert_eq!(monosubloci.len(), 2);
        assert!(chosen.contains(&"apart".to_string()));
        assert!(chosen.contains(&container.choose_best(&["long", "short"]).unwrap()));
        assert!(excluded.is_empty());
        assert!(monosubloci.iter().all(|m| m.stage == Stage::Monosublocus));
    }

    #[test]
    fn chain_keeps_both_ends() {
        // a-b and b-c overlap, a and c do not: removing the winner's clique
        // partners leaves the far end for a second round
        let ctx = context();
        let a = test_transcript("a", Strand::Plus, &[(100, 300)], &[]);
        let b = test_transcript("b", Strand::Plus, &[(250, 500)], &[]);
        let c = test_transcript("c", Strand::Plus, &[(450, 700)], &[]);
        let mut container = sublocus(vec![a, b, c]);
        let picked = pick_by_cliques(&mut container, &ctx).unwrap();
        let ids: BTreeSet<String> = picked.selected.iter().map(|t| t.id.clone()).collect();
        assert!(!ids.is_empty());
        for t in &picked.selected {
            for u in &picked.selected {
                if t.id != u.id {
                    assert!(!t.span().overlaps(&u.span()));
                }
            }
        }
    }
}
