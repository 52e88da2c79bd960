//! Monosublocus holders: monosubloci merged by the holder relation, from
//! which the final loci are drawn.

use crate::context::PickContext;
use crate::error::Error;
use crate::transcript::Transcript;

use super::container::{LocusContainer, Stage};
use super::sublocus::pick_by_cliques;

/// Merge monosubloci into holders. Each transcript joins the first holder
/// that admits it, in order of position.
pub fn group_monosubloci(parent: &LocusContainer, monosubloci: &[LocusContainer]) -> Result<Vec<LocusContainer>, Error> {
    let mut ordered: Vec<&LocusContainer> = monosubloci.iter().collect();
    ordered.sort_by_key(|m| (m.start, m.end));

    let mut holders: Vec<LocusContainer> = Vec::new();
    for transcript in ordered.into_iter().flat_map(LocusContainer::transcripts) {
        match holders.iter_mut().find(|h| h.admits(transcript)) {
            Some(holder) => holder.add_transcript(transcript.clone(), false)?,
            None => holders.push(parent.spawn(Stage::MonosublocusHolder, transcript.clone())?),
        }
    }
    Ok(holders)
}

impl LocusContainer {
    /// Draw the loci of a holder. Returns the loci and the purged transcripts.
    pub fn define_loci(&mut self, ctx: &PickContext) -> Result<(Vec<LocusContainer>, Vec<Transcript>), Error> {
        debug_assert_eq!(self.stage, Stage::MonosublocusHolder);
        let picked = pick_by_cliques(self, ctx)?;
        let loci = picked
            .selected
            .into_iter()
            .map(|t| self.spawn(Stage::Locus, t))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((loci, picked.excluded))
    }
}
