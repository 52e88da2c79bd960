//! Finalization: validation of the exon/CDS/UTR structure and computation of
//! introns, splice sites, phases and CDS introns.
//!
//! Coding problems are recovered from locally (recompute the UTR, then strip the
//! CDS); only structural problems make finalization fail.

use std::cmp::{max, min};

use itertools::Itertools;

use crate::error::Error;
use crate::interval::{self, Interval};

use super::Transcript;
use super::types::{Feature, Segment, SegmentKind};

impl Transcript {
    /// Validate the transcript and compute its derived structure. Idempotent.
    ///
    /// On error the transcript is left unfinalized and should be discarded.
    pub fn finalize(&mut self) -> Result<(), Error> {
        if self.finalized {
            return Ok(());
        }

        self.exons.sort();
        self.combined_cds.sort();
        self.combined_utr.sort();
        self.basic_checks()?;

        if let Err(err) = self.check_cdna_vs_utr() {
            if !self.is_coding() {
                return Err(err);
            }
            log::warn!("{}: {err}; recalculating the UTR", self.id);
            self.combined_utr.clear();
            self.internal_orfs.clear();
            if let Err(err) = self.check_cdna_vs_utr() {
                log::warn!("{}: {err}; stripping the CDS", self.id);
                self.strip_cds(true);
                self.basic_checks()?;
                self.check_cdna_vs_utr()?;
            }
        }
        self.combined_cds.sort();
        self.combined_utr.sort();

        self.check_completeness();
        self.verify_boundaries();
        self.check_phase_correctness();
        if let Err(err) = self.calculate_introns() {
            self.unfinalize();
            return Err(err);
        }

        self.feature = if self.is_coding() {
            Feature::Mrna
        } else if self.feature == Feature::NcRna {
            Feature::NcRna
        } else {
            Feature::Transcript
        };
        self.finalized = true;
        Ok(())
    }

    /// Drop the finalized flag and the derived caches. The exon, CDS and UTR
    /// sets and the ORF segmentation are kept, so finalizing again reproduces
    /// the same structure.
    pub fn unfinalize(&mut self) {
        self.finalized = false;
        self.introns.clear();
        self.splices.clear();
        self.selected_cds_introns.clear();
        self.combined_cds_introns.clear();
        self.selected_orf = None;
    }

    /// Remove all coding information. Monoexonic transcripts lose their strand
    /// unless `strand_specific` is set.
    pub fn strip_cds(&mut self, strand_specific: bool) {
        log::debug!("stripping CDS from {}", self.id);
        self.combined_cds.clear();
        self.combined_utr.clear();
        self.internal_orfs.clear();
        self.loaded_orfs.clear();
        self.phases.clear();
        self.selected_orf = None;
        self.selected_cds_introns.clear();
        self.combined_cds_introns.clear();
        self.has_start_codon = false;
        self.has_stop_codon = false;
        if self.feature == Feature::Mrna {
            self.feature = Feature::Transcript;
        }
        if !strand_specific && self.monoexonic() {
            self.strand = crate::strand::Strand::Unknown;
        }
    }

    fn basic_checks(&self) -> Result<(), Error> {
        let (Some(first), Some(last)) = (self.exons.first(), self.exons.last()) else {
            return Err(Error::InvalidTranscript(format!("{} has no exons", self.id)));
        };
        if self.start > self.end {
            return Err(Error::InvalidTranscript(format!(
                "{} starts after its end ({} > {})",
                self.id, self.start, self.end
            )));
        }
        if first.start < self.start || last.end > self.end {
            return Err(Error::InvalidTranscript(format!(
                "{} has exons outside its boundaries {}-{}",
                self.id, self.start, self.end
            )));
        }
        if self.exons.len() > 1 && !self.strand.is_known() {
            return Err(Error::InvalidTranscript(format!(
                "multi-exonic transcript {} has no strand",
                self.id
            )));
        }
        if !self.combined_utr.is_empty() && self.combined_cds.is_empty() {
            return Err(Error::InvalidTranscript(format!(
                "{} has UTR segments but no CDS",
                self.id
            )));
        }
        Ok(())
    }

    /// cDNA length must equal CDS length plus UTR length. A missing UTR is
    /// recomputed as exons minus CDS; an internal UTR (between coding segments
    /// of a single ORF) is rejected.
    fn check_cdna_vs_utr(&mut self) -> Result<(), Error> {
        if self.combined_cds.is_empty() && self.combined_utr.is_empty() {
            return Ok(());
        }
        let cdna = self.cdna_length();
        if cdna == self.combined_cds_length() + self.combined_utr_length() {
            return Ok(());
        }

        let utr = interval::subtract(&self.exons, &self.combined_cds);
        if self.internal_orfs.len() <= 1
            && let (Some(first), Some(last)) = (self.combined_cds.first(), self.combined_cds.last())
            && let Some(internal) = utr
                .iter()
                .find(|u| u.start > first.start && u.end < last.end)
        {
            return Err(Error::InvalidCds(format!(
                "{} has an internal UTR at {internal}",
                self.id
            )));
        }
        self.combined_utr = utr;

        let total = self.combined_cds_length() + self.combined_utr_length();
        if cdna != total {
            return Err(Error::InvalidCds(format!(
                "{}: cDNA length {cdna} differs from CDS plus UTR length {total}",
                self.id
            )));
        }
        Ok(())
    }

    /// UTR upstream or downstream of the CDS implies the presence of a start or stop codon.
    fn check_completeness(&mut self) {
        let (Some(cds_first), Some(cds_last)) = (self.combined_cds.first(), self.combined_cds.last())
        else {
            return;
        };
        let reverse = self.strand.is_reverse();
        if self.combined_utr.iter().any(|u| u.end < cds_first.start) {
            if reverse {
                self.has_stop_codon = true;
            } else {
                self.has_start_codon = true;
            }
        }
        if self.combined_utr.iter().any(|u| u.start > cds_last.end) {
            if reverse {
                self.has_start_codon = true;
            } else {
                self.has_stop_codon = true;
            }
        }
    }

    fn verify_boundaries(&mut self) {
        let (Some(first), Some(last)) = (self.exons.first(), self.exons.last()) else {
            return;
        };
        if first.start != self.start || last.end != self.end {
            log::warn!(
                "{}: boundaries {}-{} shrunk to the exon span {}-{}",
                self.id,
                self.start,
                self.end,
                first.start,
                last.end
            );
            self.start = first.start;
            self.end = last.end;
        }
    }

    /// Build the ORF segmentation if needed and check every ORF. Any coding
    /// error strips the CDS; the transcript then finalizes as non-coding.
    fn check_phase_correctness(&mut self) {
        if !self.is_coding() {
            self.internal_orfs.clear();
            self.selected_orf = None;
            return;
        }
        if self.internal_orfs.is_empty() || !self.orfs_match_exons() {
            self.internal_orfs = vec![self.segments_from_combined()];
            self.loaded_orfs.clear();
        }
        for index in 0..self.internal_orfs.len() {
            if let Err(err) = self.check_internal_orf(index) {
                log::warn!("{}: {err}; stripping the CDS", self.id);
                self.strip_cds(true);
                return;
            }
        }
        self.selected_orf = Some(0);
    }

    fn orfs_match_exons(&self) -> bool {
        self.internal_orfs.iter().all(|orf| {
            orf.iter()
                .filter(|s| s.kind == SegmentKind::Exon)
                .map(|s| s.span)
                .eq(self.exons.iter().copied())
        })
    }

    fn segments_from_combined(&self) -> Vec<Segment> {
        let mut segments: Vec<Segment> = self
            .exons
            .iter()
            .map(|&e| Segment::new(SegmentKind::Exon, e))
            .chain(self.combined_cds.iter().map(|&c| Segment {
                kind: SegmentKind::Cds,
                span: c,
                phase: self.phases.get(&c).copied(),
            }))
            .chain(
                self.combined_utr
                    .iter()
                    .map(|&u| Segment::new(SegmentKind::Utr, u)),
            )
            .collect();
        segments.sort_by_key(Segment::sort_key);
        segments
    }

    fn check_internal_orf(&mut self, index: usize) -> Result<(), Error> {
        let orf = &self.internal_orfs[index];
        let coding: Vec<Interval> = orf.iter().filter(|s| s.is_cds()).map(|s| s.span).sorted().collect();
        let utr: Vec<Interval> = orf
            .iter()
            .filter(|s| s.kind == SegmentKind::Utr)
            .map(|s| s.span)
            .sorted()
            .collect();
        let (Some(&cds_first), Some(&cds_last)) = (coding.first(), coding.last()) else {
            return Err(Error::InvalidCds(format!("ORF {index} has no CDS")));
        };

        let cds_span = Interval::new(cds_first.start, cds_last.end);
        let coding_exons: Vec<Interval> = self
            .exons
            .iter()
            .filter(|e| e.overlaps(&cds_span))
            .copied()
            .collect();
        if coding_exons.len() != coding.len() {
            return Err(Error::InvalidCds(format!(
                "ORF {index} has {} CDS segments over {} coding exons",
                coding.len(),
                coding_exons.len()
            )));
        }
        let last_index = coding.len() - 1;
        for (i, (cds, exon)) in coding.iter().zip(&coding_exons).enumerate() {
            let misplaced = !exon.contains(cds)
                || (i > 0 && cds.start != exon.start)
                || (i < last_index && cds.end != exon.end);
            if misplaced {
                return Err(Error::InvalidCds(format!(
                    "CDS segment {cds} does not match the boundaries of exon {exon}"
                )));
            }
        }

        let first = utr.first().map_or(cds_first.start, |u| min(u.start, cds_first.start));
        let last = utr.last().map_or(cds_last.end, |u| max(u.end, cds_last.end));
        if first != self.start || last != self.end {
            return Err(Error::InvalidCds(format!(
                "ORF {index} spans {first}-{last} instead of {}-{}",
                self.start, self.end
            )));
        }

        let reverse = self.strand.is_reverse();
        let ordered: Vec<Interval> = if reverse {
            coding.iter().rev().copied().collect()
        } else {
            coding.clone()
        };
        let mut total = self
            .phases
            .get(&ordered[0])
            .map_or(0, |&p| i32::from((3 - p % 3) % 3));
        let mut computed = Vec::with_capacity(ordered.len());
        for segment in &ordered {
            let phase = ((3 - total % 3) % 3) as u8;
            if let Some(&declared) = self.phases.get(segment)
                && declared != phase
            {
                log::debug!(
                    "{}: declared phase {declared} of {segment} replaced by {phase}",
                    self.id
                );
            }
            computed.push((*segment, phase));
            total += segment.len();
        }

        let phase0 = i32::from(computed[0].1);
        let cds_length = interval::total_length(&coding);
        let has_five_utr = utr.iter().any(|u| {
            if reverse {
                u.start > cds_last.end
            } else {
                u.end < cds_first.start
            }
        });
        let has_three_utr = utr.iter().any(|u| {
            if reverse {
                u.end < cds_first.start
            } else {
                u.start > cds_last.end
            }
        });
        if phase0 != 0 && has_five_utr {
            return Err(Error::InvalidCds(format!(
                "ORF {index} is truncated at the 5' end but has a 5' UTR"
            )));
        }
        // leftover bases past the last full codon, net of the 5' skip
        if cds_length % 3 - phase0 > 0 && has_three_utr {
            return Err(Error::InvalidCds(format!(
                "ORF {index} is truncated at the 3' end but has a 3' UTR"
            )));
        }

        for segment in self.internal_orfs[index].iter_mut().filter(|s| s.is_cds()) {
            segment.phase = computed
                .iter()
                .find(|(span, _)| *span == segment.span)
                .map(|&(_, phase)| phase);
        }
        Ok(())
    }

    fn calculate_introns(&mut self) -> Result<(), Error> {
        self.introns.clear();
        self.splices.clear();
        for (a, b) in self.exons.iter().tuple_windows() {
            if b.start <= a.end + 1 {
                return Err(Error::InvalidTranscript(format!(
                    "{}: exons {a} and {b} overlap or abut",
                    self.id
                )));
            }
            let intron = Interval::new(a.end + 1, b.start - 1);
            self.introns.insert(intron);
            self.splices.insert(intron.start);
            self.splices.insert(intron.end);
        }

        self.selected_cds_introns = if self.selected_orf.is_some() {
            let selected = self.selected_cds();
            self.cds_gaps_in_introns(&selected)
        } else {
            Default::default()
        };
        self.combined_cds_introns = if self.internal_orfs.len() > 1 {
            let combined = self.combined_cds.clone();
            self.cds_gaps_in_introns(&combined)
        } else {
            self.selected_cds_introns.clone()
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strand::Strand;
    use crate::transcript::test_transcript;

    fn raw(strand: Strand, exons: &[(i32, i32)]) -> Transcript {
        let start = exons.iter().map(|e| e.0).min().unwrap();
        let end = exons.iter().map(|e| e.1).max().unwrap();
        let mut t = Transcript::new("t1", "chr1", strand, start, end);
        t.add_exons(exons.iter().map(|&e| Interval::from(e)));
        t
    }

    #[test]
    fn coding_two_exon_transcript() {
        let t = test_transcript("t1", Strand::Plus, &[(100, 200), (300, 400)], &[(150, 200), (300, 350)]);
        assert!(t.is_finalized());
        assert_eq!(t.introns().iter().copied().collect::<Vec<_>>(), vec![Interval::new(201, 299)]);
        assert_eq!(t.combined_cds_length(), 102);
        assert_eq!(t.feature, Feature::Mrna);
        assert_eq!(t.combined_utr(), &[Interval::new(100, 149), Interval::new(351, 400)]);
        assert!(t.has_start_codon() && t.has_stop_codon());
        assert_eq!(t.selected_cds_introns().len(), 1);
        assert_eq!(t.cdna_length(), t.combined_cds_length() + t.combined_utr_length());
    }

    #[test]
    fn finalize_is_idempotent_and_round_trips() {
        let mut t = test_transcript("t1", Strand::Minus, &[(100, 200), (300, 400), (500, 600)], &[(151, 200), (300, 400), (500, 549)]);
        let exons = t.exons().to_vec();
        let introns = t.introns().clone();
        let cds = t.combined_cds().to_vec();
        let utr = t.combined_utr().to_vec();
        let phases: Vec<_> = t.internal_orfs()[0].iter().map(|s| s.phase).collect();

        t.finalize().unwrap();
        t.unfinalize();
        assert!(!t.is_finalized());
        assert!(t.introns().is_empty());
        t.finalize().unwrap();

        assert_eq!(t.exons(), exons.as_slice());
        assert_eq!(t.introns(), &introns);
        assert_eq!(t.combined_cds(), cds.as_slice());
        assert_eq!(t.combined_utr(), utr.as_slice());
        let again: Vec<_> = t.internal_orfs()[0].iter().map(|s| s.phase).collect();
        assert_eq!(again, phases);
    }

    #[test]
    fn phases_follow_transcription_order() {
        // 50 + 101 + 50 = 201 coding bases, read from 549 downwards
        let t = test_transcript("t1", Strand::Minus, &[(100, 200), (300, 400), (500, 600)], &[(151, 200), (300, 400), (500, 549)]);
        let phase_of = |start: i32| {
            t.internal_orfs()[0]
                .iter()
                .find(|s| s.is_cds() && s.span.start == start)
                .and_then(|s| s.phase)
        };
        assert_eq!(phase_of(500), Some(0));
        assert_eq!(phase_of(300), Some(1));
        assert_eq!(phase_of(151), Some(2));
    }

    #[test]
    fn no_exons_is_invalid() {
        let mut t = Transcript::new("t1", "chr1", Strand::Plus, 1, 100);
        assert!(matches!(t.finalize(), Err(Error::InvalidTranscript(_))));
        assert!(!t.is_finalized());
    }

    #[test]
    fn exon_outside_bounds_is_invalid() {
        let mut t = raw(Strand::Plus, &[(100, 200)]);
        t.end = 150;
        assert!(matches!(t.finalize(), Err(Error::InvalidTranscript(_))));
    }

    #[test]
    fn multiexonic_without_strand_is_invalid() {
        let mut t = raw(Strand::Unknown, &[(100, 200), (300, 400)]);
        assert!(matches!(t.finalize(), Err(Error::InvalidTranscript(_))));
    }

    #[test]
    fn overlapping_exons_leave_transcript_unfinalized() {
        let mut t = raw(Strand::Plus, &[(100, 200), (150, 400)]);
        assert!(t.finalize().is_err());
        assert!(!t.is_finalized());
    }

    #[test]
    fn monoexonic_without_strand_is_valid() {
        let mut t = raw(Strand::Unknown, &[(100, 200)]);
        t.finalize().unwrap();
        assert!(t.introns().is_empty());
        assert_eq!(t.feature, Feature::Transcript);
    }

    #[test]
    fn boundaries_shrink_to_exons() {
        let mut t = raw(Strand::Plus, &[(100, 200), (300, 400)]);
        t.start = 50;
        t.end = 450;
        t.finalize().unwrap();
        assert_eq!((t.start, t.end), (100, 400));
    }

    #[test]
    fn cds_outside_exons_is_stripped() {
        let mut t = raw(Strand::Plus, &[(100, 200), (300, 400)]);
        t.add_cds(Interval::new(150, 250), None);
        t.finalize().unwrap();
        assert!(!t.is_coding());
        assert_eq!(t.feature, Feature::Transcript);
        assert_eq!(t.introns().len(), 1);
    }

    #[test]
    fn internal_utr_strips_cds() {
        let mut t = raw(Strand::Plus, &[(100, 200), (300, 400), (500, 600)]);
        t.add_cds(Interval::new(150, 200), None);
        t.add_cds(Interval::new(500, 550), None);
        t.finalize().unwrap();
        assert!(!t.is_coding());
    }

    #[test]
    fn wrong_utr_is_recalculated() {
        let mut t = raw(Strand::Plus, &[(100, 200), (300, 400)]);
        t.add_cds(Interval::new(150, 200), None);
        t.add_cds(Interval::new(300, 350), None);
        t.add_utr(Interval::new(100, 120));
        t.finalize().unwrap();
        assert!(t.is_coding());
        assert_eq!(t.combined_utr_length(), 100);
    }

    #[test]
    fn truncated_five_prime_with_utr_strips_cds() {
        let mut t = raw(Strand::Plus, &[(100, 200), (300, 400)]);
        t.add_cds(Interval::new(150, 200), Some(1));
        t.add_cds(Interval::new(300, 351), None);
        t.finalize().unwrap();
        assert!(!t.is_coding());
    }

    #[test]
    fn truncated_five_prime_without_utr_is_kept() {
        // 101 + 51 = 152 coding bases, first base skipped
        let mut t = raw(Strand::Plus, &[(100, 200), (300, 400)]);
        t.add_cds(Interval::new(100, 200), Some(2));
        t.add_cds(Interval::new(300, 350), None);
        t.finalize().unwrap();
        assert!(t.is_coding());
        assert!(!t.has_start_codon());
        assert!(t.has_stop_codon());
    }

    #[test]
    fn three_prime_truncation_accounts_for_initial_phase() {
        // 101 + 50 = 151 coding bases: one leftover base, two skipped at the 5' end
        let mut t = raw(Strand::Plus, &[(100, 200), (300, 400)]);
        t.add_cds(Interval::new(100, 200), Some(2));
        t.add_cds(Interval::new(300, 349), None);
        t.finalize().unwrap();
        assert!(t.is_coding());

        // 51 + 49 = 100 coding bases in frame 0 followed by a 3' UTR
        let mut t = raw(Strand::Plus, &[(100, 200), (300, 400)]);
        t.add_cds(Interval::new(150, 200), Some(0));
        t.add_cds(Interval::new(300, 348), None);
        t.finalize().unwrap();
        assert!(!t.is_coding());
    }
}
