//! Transcript construction: conversion of raw records, ORF projection between
//! cDNA and genomic coordinates, and ORF loading.

use std::cmp::{max, min};

use itertools::Itertools;

use crate::error::Error;
use crate::interval::{self, Interval};
use crate::strand::Strand;

use super::Transcript;
use super::orf::Orf;
use super::types::{Segment, SegmentKind, TranscriptRecord};

impl Transcript {
    /// Build an (unfinalized) transcript from a raw record.
    pub fn from_record(record: &TranscriptRecord) -> Result<Self, Error> {
        if record.start > record.end {
            return Err(Error::InvalidTranscript(format!(
                "{}: start {} after end {}",
                record.id, record.start, record.end
            )));
        }
        if !record.cds_phases.is_empty() && record.cds_phases.len() != record.cds.len() {
            return Err(Error::InvalidCds(format!(
                "{}: {} phases for {} CDS segments",
                record.id,
                record.cds_phases.len(),
                record.cds.len()
            )));
        }

        let mut transcript = Self::new(&record.id, &record.chrom, record.strand, record.start, record.end);
        transcript.source = record.source.clone();
        transcript.parent = record.parent.clone();
        transcript.attributes = record.attributes.clone();
        transcript.score = record.score.unwrap_or(0.0);
        transcript.exons = record.exons.iter().copied().sorted().dedup().collect();
        for (i, &segment) in record.cds.iter().enumerate() {
            transcript.add_cds(segment, record.cds_phases.get(i).copied());
        }
        transcript.combined_utr = record.utr.clone();
        Ok(transcript)
    }

    /// Replace the coding annotation with externally predicted ORFs.
    ///
    /// ORFs on the opposite strand are only accepted for monoexonic
    /// transcripts, whose strand is flipped to match the first such ORF. ORFs
    /// are taken longest first; any ORF overlapping an accepted one is dropped.
    pub fn load_orfs(&mut self, orfs: &[Orf]) -> Result<(), Error> {
        if orfs.is_empty() {
            return Ok(());
        }
        self.finalize()?;
        let cdna_length = self.cdna_length();

        let mut candidates: Vec<Orf> = Vec::new();
        let sorted = orfs
            .iter()
            .sorted_by_key(|o| (-o.cds_len(), o.thick_start, o.name.clone()));
        for orf in sorted {
            if orf.thick_start < 1 || orf.thick_end > cdna_length || orf.thick_start > orf.thick_end {
                log::warn!(
                    "{}: ORF {} ({}-{}) outside the transcript of length {cdna_length}",
                    self.id,
                    orf.name,
                    orf.thick_start,
                    orf.thick_end
                );
                continue;
            }
            let orf = if orf.strand == Strand::Minus {
                if !self.monoexonic() || !candidates.is_empty() {
                    log::debug!("{}: skipping reverse-strand ORF {}", self.id, orf.name);
                    continue;
                }
                self.strand = if self.strand == Strand::Minus {
                    Strand::Plus
                } else {
                    Strand::Minus
                };
                orf.reversed(cdna_length)
            } else {
                orf.clone()
            };
            if candidates.iter().any(|c| c.span().overlaps(&orf.span())) {
                continue;
            }
            candidates.push(orf);
        }
        let Some(primary) = candidates.first() else {
            return Ok(());
        };
        if !self.strand.is_known() {
            self.strand = Strand::Plus;
        }

        self.unfinalize();
        self.has_start_codon = primary.has_start_codon;
        self.has_stop_codon = primary.has_stop_codon;
        self.combined_cds.clear();
        self.combined_utr.clear();
        self.internal_orfs.clear();
        self.phases.clear();

        let mut all_cds = Vec::new();
        for orf in &candidates {
            let segments = self.project_orf(orf);
            let coding: Vec<Interval> = segments.iter().filter(|s| s.is_cds()).map(|s| s.span).collect();
            let first = if self.strand.is_reverse() {
                coding.last()
            } else {
                coding.first()
            };
            if let Some(&first) = first {
                self.phases.insert(first, orf.phase);
            }
            all_cds.extend(coding);
            self.internal_orfs.push(segments);
        }
        self.combined_cds = interval::merge(&all_cds);
        self.combined_utr = interval::subtract(&self.exons, &self.combined_cds);
        self.loaded_orfs = candidates;
        self.finalize()
    }

    /// Project an ORF in cDNA coordinates onto the exon chain.
    pub(crate) fn project_orf(&self, orf: &Orf) -> Vec<Segment> {
        let reverse = self.strand.is_reverse();
        let mut segments: Vec<Segment> = self
            .exons
            .iter()
            .map(|&e| Segment::new(SegmentKind::Exon, e))
            .collect();
        let mut offset = 0;
        for exon in self.exons_in_transcription_order() {
            let texon = Interval::new(offset + 1, offset + exon.len());
            offset += exon.len();
            if !texon.overlaps(&orf.span()) {
                segments.push(Segment::new(SegmentKind::Utr, exon));
                continue;
            }
            let coding = Interval::new(
                max(texon.start, orf.thick_start),
                min(texon.end, orf.thick_end),
            );
            let genomic = cdna_to_genomic(exon, texon.start, coding, reverse);
            segments.push(Segment::new(SegmentKind::Cds, genomic));
            for utr in interval::subtract(&[exon], &[genomic]) {
                segments.push(Segment::new(SegmentKind::Utr, utr));
            }
        }
        segments.sort_by_key(Segment::sort_key);
        segments
    }

    /// The internal ORFs as records in cDNA coordinates, in ORF order.
    #[must_use]
    pub fn orf_records(&self) -> Vec<Orf> {
        let reverse = self.strand.is_reverse();
        let aligned = self.loaded_orfs.len() == self.internal_orfs.len();
        self.internal_orfs
            .iter()
            .enumerate()
            .filter_map(|(index, segments)| {
                let mut coding: Vec<&Segment> = segments.iter().filter(|s| s.is_cds()).collect();
                coding.sort_by_key(|s| s.span);
                if reverse {
                    coding.reverse();
                }
                let (first, last) = (coding.first()?, coding.last()?);
                let (from, to) = if reverse {
                    (first.span.end, last.span.start)
                } else {
                    (first.span.start, last.span.end)
                };
                let thick_start = self.genomic_to_cdna(from)?;
                let thick_end = self.genomic_to_cdna(to)?;

                let utr_before = segments
                    .iter()
                    .any(|s| s.kind == SegmentKind::Utr && self.genomic_to_cdna(s.span.start).is_some_and(|p| p < thick_start));
                let utr_after = segments
                    .iter()
                    .any(|s| s.kind == SegmentKind::Utr && self.genomic_to_cdna(s.span.start).is_some_and(|p| p > thick_end));
                let (has_start_codon, has_stop_codon) = if aligned {
                    let loaded = &self.loaded_orfs[index];
                    (loaded.has_start_codon || utr_before, loaded.has_stop_codon || utr_after)
                } else if index == 0 {
                    (self.has_start_codon, self.has_stop_codon)
                } else {
                    (utr_before, utr_after)
                };
                let name = if aligned && !self.loaded_orfs[index].name.is_empty() {
                    self.loaded_orfs[index].name.clone()
                } else {
                    format!("{}.orf{}", self.id, index + 1)
                };
                Some(Orf {
                    name,
                    thick_start,
                    thick_end,
                    strand: Strand::Plus,
                    phase: first.phase.unwrap_or(0),
                    has_start_codon,
                    has_stop_codon,
                })
            })
            .collect()
    }
}

/// Convert `coding` (cDNA coordinates inside an exon whose first transcribed
/// base sits at cDNA position `texon_start`) to genomic coordinates.
pub(crate) fn cdna_to_genomic(exon: Interval, texon_start: i32, coding: Interval, reverse: bool) -> Interval {
    if reverse {
        Interval::new(
            exon.end - (coding.end - texon_start),
            exon.end - (coding.start - texon_start),
        )
    } else {
        Interval::new(
            exon.start + (coding.start - texon_start),
            exon.start + (coding.end - texon_start),
        )
    }
}
