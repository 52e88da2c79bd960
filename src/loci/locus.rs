//! Final loci: alternative-splicing admission, isoform pruning and fragment
//! detection.

use std::collections::BTreeSet;

use crate::compare::{self, ClassCode};
use crate::context::PickContext;
use crate::error::Error;
use crate::interval;
use crate::strand::Strand;
use crate::transcript::Transcript;
use crate::transcript::metrics;

use super::container::{LocusContainer, Stage};
use super::padding;

/// Class codes marking a locus as a likely fragment of another.
const FRAGMENT_CODES: [ClassCode; 7] = [
    ClassCode::InIntron,
    ClassCode::RunOn,
    ClassCode::Nearby,
    ClassCode::OppositeStrand,
    ClassCode::OppositeStrandIntronic,
    ClassCode::MonoOverlap,
    ClassCode::MonoIdentical,
];

impl LocusContainer {
    /// Offer `transcript` as an alternative isoform of the primary.
    ///
    /// Checks run in order and stop at the first failure; the isoform cap is
    /// enforced later by [`LocusContainer::finalize_alternative_splicing`].
    /// Returns whether the transcript was admitted.
    pub fn add_transcript_to_locus(&mut self, mut transcript: Transcript, ctx: &PickContext) -> Result<bool, Error> {
        debug_assert_eq!(self.stage, Stage::Locus);
        let config = &ctx.config.alternative_splicing;
        let Some(primary) = self.primary_transcript() else {
            return Err(Error::NotInLocus(format!("{}: locus {} has no primary", transcript.id, self.id())));
        };
        if self.contains(&transcript.id) {
            return Ok(false);
        }
        transcript.finalize()?;
        let tid = transcript.id.clone();

        if config.only_confirmed_introns {
            let unconfirmed = transcript
                .introns()
                .iter()
                .filter(|i| !primary.introns().contains(i) && !transcript.verified_introns.contains(i))
                .count();
            if unconfirmed > 0 {
                log::debug!("{tid} not added to {}: {unconfirmed} unconfirmed introns", self.id());
                return Ok(false);
            }
        }

        if transcript.strand != self.strand {
            log::debug!("{tid} not added to {}: strand {} vs {}", self.id(), transcript.strand, self.strand);
            return Ok(false);
        }

        let comparison = compare::compare(&transcript, primary);
        if !config.valid_ccodes.contains(&comparison.ccode) {
            log::debug!("{tid} not added to {}: class code {} vs the primary", self.id(), comparison.ccode);
            return Ok(false);
        }
        let redundant = self
            .transcripts()
            .filter(|other| Some(&other.id) != self.primary.as_ref())
            .find(|other| config.redundant_ccodes.contains(&compare::compare(&transcript, other).ccode));
        if let Some(other) = redundant {
            log::debug!("{tid} not added to {}: redundant with {}", self.id(), other.id);
            return Ok(false);
        }

        if config.min_cdna_overlap > 0.0 && comparison.n_recall < config.min_cdna_overlap {
            log::debug!(
                "{tid} not added to {}: cDNA overlap {:.2} below {}",
                self.id(),
                comparison.n_recall,
                config.min_cdna_overlap
            );
            return Ok(false);
        }

        let utr_checks = [
            ("UTR", transcript.combined_utr_length(), config.max_utr_length),
            ("5' UTR", transcript.five_utr_length(), config.max_fiveutr_length),
            ("3' UTR", transcript.three_utr_length(), config.max_threeutr_length),
        ];
        if let Some((name, length, cap)) = utr_checks.into_iter().find(|&(_, length, cap)| length > cap) {
            log::debug!("{tid} not added to {}: {name} length {length} above {cap}", self.id());
            return Ok(false);
        }

        if config.min_cds_overlap > 0.0 && primary.combined_cds_length() > 0 {
            let shared = interval::overlap_length(transcript.combined_cds(), primary.combined_cds());
            let fraction = f64::from(shared) / f64::from(primary.combined_cds_length());
            if fraction < config.min_cds_overlap {
                log::debug!("{tid} not added to {}: CDS overlap {fraction:.2} below {}", self.id(), config.min_cds_overlap);
                return Ok(false);
            }
        }

        transcript.attributes.insert("ccode".to_string(), comparison.ccode.to_string());
        transcript.attributes.insert("primary".to_string(), "False".to_string());
        self.add_transcript(transcript, false)?;
        log::debug!("{tid} added to {} as {}", self.id(), comparison.ccode);
        Ok(true)
    }

    /// Rescore the locus and prune isoforms until at most `max_isoforms`
    /// remain, all scoring at least `min_score_perc` of the primary; then
    /// handle retained introns and, if configured, pad the transcript ends.
    pub fn finalize_alternative_splicing(&mut self, ctx: &PickContext) -> Result<(), Error> {
        let config = &ctx.config.alternative_splicing;
        let Some(primary_id) = self.primary.clone() else {
            return Ok(());
        };

        loop {
            self.reset();
            self.calculate_scores(ctx)?;
            let primary_score = self.get(&primary_id).map_or(0.0, |t| t.score);
            let threshold = primary_score * config.min_score_perc;

            let mut others: Vec<&Transcript> = self.transcripts().filter(|t| t.id != primary_id).collect();
            others.sort_by(|a, b| b.score.total_cmp(&a.score));
            let mut keep: BTreeSet<String> = BTreeSet::from([primary_id.clone()]);
            for t in others {
                if keep.len() >= config.max_isoforms || t.score < threshold {
                    break;
                }
                keep.insert(t.id.clone());
            }
            if keep.len() == self.len() {
                break;
            }
            let dropped: Vec<String> = self.ids().filter(|id| !keep.contains(*id)).map(str::to_string).collect();
            for tid in dropped {
                log::debug!("removing {tid} from {}: below the isoform score threshold or cap", self.id());
                self.remove_transcript(&tid);
            }
        }

        loop {
            let retained: Vec<String> = self
                .transcripts()
                .filter(|t| t.id != primary_id && !self.find_retained_introns(t).is_empty())
                .map(|t| t.id.clone())
                .collect();
            if retained.is_empty() {
                break;
            }
            if config.keep_retained_introns {
                for tid in &retained {
                    if let Some(t) = self.transcripts.get_mut(tid) {
                        t.attributes.insert("retained_intron".to_string(), "True".to_string());
                    }
                }
                break;
            }
            for tid in retained {
                log::debug!("removing {tid} from {}: retained intron", self.id());
                self.remove_transcript(&tid);
            }
            self.calculate_scores(ctx)?;
        }

        if config.pad && self.len() > 1 {
            padding::pad_transcripts(self, ctx)?;
            self.calculate_scores(ctx)?;
        }
        Ok(())
    }

    /// Whether the primary fails the `not_fragmentary` expression.
    pub fn is_putative_fragment(&self, ctx: &PickContext) -> Result<bool, Error> {
        let (Some(expression), Some(primary)) = (&ctx.config.not_fragmentary, self.primary_transcript()) else {
            return Ok(false);
        };
        let set = match self.metrics_of(&primary.id) {
            Some(set) => set.clone(),
            None => metrics::collect(primary),
        };
        Ok(!expression.evaluate(&set)?)
    }

    /// Whether the primary of `other` looks like a fragment of this locus.
    #[must_use]
    pub fn other_is_fragment(&self, other: &LocusContainer) -> bool {
        let (Some(mine), Some(theirs)) = (self.primary_transcript(), other.primary_transcript()) else {
            return false;
        };
        if mine.id == theirs.id {
            return false;
        }
        let comparison = compare::compare(theirs, mine);
        FRAGMENT_CODES.contains(&comparison.ccode) || (theirs.strand == Strand::Unknown && comparison.n_f1 > 0.0)
    }
}

/// Flag loci whose primary is a putative fragment of another, non-fragment
/// locus with the `is_fragment` attribute. Returns the number flagged.
pub fn flag_fragments(loci: &mut [LocusContainer], ctx: &PickContext) -> Result<usize, Error> {
    let suspects = loci
        .iter()
        .map(|l| l.is_putative_fragment(ctx))
        .collect::<Result<Vec<bool>, _>>()?;
    let flagged: Vec<usize> = (0..loci.len())
        .filter(|&i| suspects[i])
        .filter(|&i| {
            (0..loci.len())
                .filter(|&j| j != i && !suspects[j])
                .any(|j| loci[j].chrom == loci[i].chrom && loci[j].other_is_fragment(&loci[i]))
        })
        .collect();
    for &i in &flagged {
        log::debug!("{} flagged as a fragment", loci[i].id());
        loci[i].attributes.insert("is_fragment".to_string(), "True".to_string());
    }
    Ok(flagged.len())
}
