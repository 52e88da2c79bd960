//! The transcript model: exon chain, coding annotation and the derived structure
//! computed by [`Transcript::finalize`].

pub mod construction;
pub mod finalize;
pub mod metrics;
pub mod orf;
pub mod split;
pub mod types;

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use itertools::Itertools;

use crate::homology::BlastHit;
use crate::interval::{self, Interval};
use crate::strand::Strand;

use orf::Orf;
use types::{Feature, RelativeMetrics, Segment};

/// A transcript model.
///
/// Exons, CDS and UTR are stored as sorted, closed genomic intervals. Introns,
/// splice sites, CDS introns and the internal ORF segmentation are only valid
/// while the transcript is finalized; structural edits unfinalize it.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub id: String,
    pub chrom: String,
    pub source: String,
    pub strand: Strand,
    pub start: i32,
    pub end: i32,
    pub parent: Option<String>,
    pub attributes: IndexMap<String, String>,
    pub score: f64,
    pub scores: BTreeMap<String, f64>,
    pub verified_introns: BTreeSet<Interval>,
    pub blast_hits: Vec<BlastHit>,
    pub relative: RelativeMetrics,
    pub feature: Feature,

    pub(crate) exons: Vec<Interval>,
    pub(crate) combined_cds: Vec<Interval>,
    pub(crate) combined_utr: Vec<Interval>,
    /// Declared phases, keyed by CDS segment.
    pub(crate) phases: BTreeMap<Interval, u8>,
    pub(crate) internal_orfs: Vec<Vec<Segment>>,
    /// ORF records aligned with `internal_orfs` when loaded from external predictions.
    pub(crate) loaded_orfs: Vec<Orf>,
    pub(crate) selected_orf: Option<usize>,
    pub(crate) introns: BTreeSet<Interval>,
    pub(crate) splices: BTreeSet<i32>,
    pub(crate) selected_cds_introns: BTreeSet<Interval>,
    pub(crate) combined_cds_introns: BTreeSet<Interval>,
    pub(crate) has_start_codon: bool,
    pub(crate) has_stop_codon: bool,
    pub(crate) finalized: bool,
}

impl Transcript {
    pub fn new(id: &str, chrom: &str, strand: Strand, start: i32, end: i32) -> Self {
        Self {
            id: id.to_string(),
            chrom: chrom.to_string(),
            source: String::new(),
            strand,
            start,
            end,
            parent: None,
            attributes: IndexMap::new(),
            score: 0.0,
            scores: BTreeMap::new(),
            verified_introns: BTreeSet::new(),
            blast_hits: Vec::new(),
            relative: RelativeMetrics::default(),
            feature: Feature::Transcript,
            exons: Vec::new(),
            combined_cds: Vec::new(),
            combined_utr: Vec::new(),
            phases: BTreeMap::new(),
            internal_orfs: Vec::new(),
            loaded_orfs: Vec::new(),
            selected_orf: None,
            introns: BTreeSet::new(),
            splices: BTreeSet::new(),
            selected_cds_introns: BTreeSet::new(),
            combined_cds_introns: BTreeSet::new(),
            has_start_codon: false,
            has_stop_codon: false,
            finalized: false,
        }
    }

    // ── Structural edits ──────────────────────────────────

    /// Add an exon. Unfinalizes the transcript and drops the ORF segmentation.
    pub fn add_exon(&mut self, exon: Interval) {
        self.unfinalize();
        self.internal_orfs.clear();
        self.exons.push(exon);
    }

    pub fn add_exons(&mut self, exons: impl IntoIterator<Item = Interval>) {
        for exon in exons {
            self.add_exon(exon);
        }
    }

    /// Remove an exon; returns false if it was not present.
    pub fn remove_exon(&mut self, exon: Interval) -> bool {
        let Some(pos) = self.exons.iter().position(|e| *e == exon) else {
            return false;
        };
        self.unfinalize();
        self.internal_orfs.clear();
        self.exons.remove(pos);
        true
    }

    /// Add a CDS segment with an optional declared phase.
    pub fn add_cds(&mut self, segment: Interval, phase: Option<u8>) {
        self.unfinalize();
        self.internal_orfs.clear();
        self.combined_cds.push(segment);
        if let Some(phase) = phase {
            self.phases.insert(segment, phase);
        }
    }

    pub fn add_utr(&mut self, segment: Interval) {
        self.unfinalize();
        self.internal_orfs.clear();
        self.combined_utr.push(segment);
    }

    // ── Basic structure ───────────────────────────────────

    #[must_use]
    pub fn exons(&self) -> &[Interval] {
        &self.exons
    }

    #[must_use]
    pub fn combined_cds(&self) -> &[Interval] {
        &self.combined_cds
    }

    #[must_use]
    pub fn combined_utr(&self) -> &[Interval] {
        &self.combined_utr
    }

    #[must_use]
    pub fn introns(&self) -> &BTreeSet<Interval> {
        &self.introns
    }

    #[must_use]
    pub fn splices(&self) -> &BTreeSet<i32> {
        &self.splices
    }

    #[must_use]
    pub fn selected_cds_introns(&self) -> &BTreeSet<Interval> {
        &self.selected_cds_introns
    }

    #[must_use]
    pub fn combined_cds_introns(&self) -> &BTreeSet<Interval> {
        &self.combined_cds_introns
    }

    #[must_use]
    pub fn internal_orfs(&self) -> &[Vec<Segment>] {
        &self.internal_orfs
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    #[must_use]
    pub fn span(&self) -> Interval {
        Interval::new(self.start, self.end)
    }

    #[must_use]
    pub fn monoexonic(&self) -> bool {
        self.exons.len() == 1
    }

    #[must_use]
    pub fn is_coding(&self) -> bool {
        !self.combined_cds.is_empty()
    }

    #[must_use]
    pub fn has_start_codon(&self) -> bool {
        self.has_start_codon
    }

    #[must_use]
    pub fn has_stop_codon(&self) -> bool {
        self.has_stop_codon
    }

    #[must_use]
    pub fn number_internal_orfs(&self) -> usize {
        self.internal_orfs.len()
    }

    /// Sort key used wherever transcripts need a stable genomic order.
    #[must_use]
    pub fn sort_key(&self) -> (&str, i32, i32, &str) {
        (&self.chrom, self.start, self.end, &self.id)
    }

    // ── Derived lengths ───────────────────────────────────

    #[must_use]
    pub fn cdna_length(&self) -> i32 {
        interval::total_length(&self.exons)
    }

    #[must_use]
    pub fn combined_cds_length(&self) -> i32 {
        interval::total_length(&self.combined_cds)
    }

    #[must_use]
    pub fn combined_utr_length(&self) -> i32 {
        interval::total_length(&self.combined_utr)
    }

    /// CDS segments of the selected ORF, sorted by genomic position.
    #[must_use]
    pub fn selected_cds(&self) -> Vec<Interval> {
        self.selected_segments()
            .iter()
            .filter(|s| s.is_cds())
            .map(|s| s.span)
            .collect()
    }

    /// CDS segments of the selected ORF with their phases.
    #[must_use]
    pub fn selected_cds_segments(&self) -> Vec<Segment> {
        self.selected_segments()
            .iter()
            .filter(|s| s.is_cds())
            .copied()
            .collect()
    }

    #[must_use]
    pub fn selected_cds_length(&self) -> i32 {
        interval::total_length(&self.selected_cds())
    }

    /// Genomic position of the first coding base of the selected ORF, in transcription order.
    #[must_use]
    pub fn selected_cds_start(&self) -> Option<i32> {
        let cds = self.selected_cds();
        if self.strand.is_reverse() {
            cds.last().map(|c| c.end)
        } else {
            cds.first().map(|c| c.start)
        }
    }

    /// Genomic position of the last coding base of the selected ORF, in transcription order.
    #[must_use]
    pub fn selected_cds_end(&self) -> Option<i32> {
        let cds = self.selected_cds();
        if self.strand.is_reverse() {
            cds.first().map(|c| c.start)
        } else {
            cds.last().map(|c| c.end)
        }
    }

    /// UTR segments upstream of the selected CDS.
    #[must_use]
    pub fn five_utr(&self) -> Vec<Interval> {
        self.flanking_utr(true)
    }

    /// UTR segments downstream of the selected CDS.
    #[must_use]
    pub fn three_utr(&self) -> Vec<Interval> {
        self.flanking_utr(false)
    }

    #[must_use]
    pub fn five_utr_length(&self) -> i32 {
        interval::total_length(&self.five_utr())
    }

    #[must_use]
    pub fn three_utr_length(&self) -> i32 {
        interval::total_length(&self.three_utr())
    }

    fn selected_segments(&self) -> &[Segment] {
        self.selected_orf
            .and_then(|i| self.internal_orfs.get(i))
            .map_or(&[], Vec::as_slice)
    }

    fn flanking_utr(&self, five_prime: bool) -> Vec<Interval> {
        let cds = self.selected_cds();
        let (Some(first), Some(last)) = (cds.first(), cds.last()) else {
            return Vec::new();
        };
        // upstream in genomic terms is 5' on plus, 3' on minus
        let genomic_upstream = five_prime != self.strand.is_reverse();
        self.selected_segments()
            .iter()
            .filter(|s| s.kind == types::SegmentKind::Utr)
            .filter(|s| {
                if genomic_upstream {
                    s.span.end < first.start
                } else {
                    s.span.start > last.end
                }
            })
            .map(|s| s.span)
            .collect()
    }

    /// Exons which contain at least one base of the selected CDS.
    #[must_use]
    pub fn selected_coding_exons(&self) -> usize {
        let cds = self.selected_cds();
        self.exons
            .iter()
            .filter(|e| cds.iter().any(|c| c.overlaps(e)))
            .count()
    }

    #[must_use]
    pub fn intron_lengths(&self) -> Vec<i32> {
        self.introns.iter().map(Interval::len).collect()
    }

    /// Genomic gaps between consecutive CDS segments that coincide with introns.
    pub(crate) fn cds_gaps_in_introns(&self, cds: &[Interval]) -> BTreeSet<Interval> {
        cds.iter()
            .tuple_windows()
            .filter(|(a, b)| b.start > a.end + 1)
            .map(|(a, b)| Interval::new(a.end + 1, b.start - 1))
            .filter(|gap| self.introns.contains(gap))
            .collect()
    }

    /// Copy of this transcript with ORF `index` promoted to the selected ORF.
    ///
    /// Used to score alternative ORFs; the copy is never inserted into a locus.
    #[must_use]
    pub fn with_selected_orf(&self, index: usize, new_id: &str) -> Transcript {
        let mut copy = self.clone();
        copy.id = new_id.to_string();
        if index < copy.internal_orfs.len() {
            let orf = copy.internal_orfs.remove(index);
            copy.internal_orfs.insert(0, orf);
            if index < copy.loaded_orfs.len() {
                let loaded = copy.loaded_orfs.remove(index);
                copy.loaded_orfs.insert(0, loaded);
            }
            copy.selected_orf = Some(0);
            let selected = copy.selected_cds();
            copy.selected_cds_introns = copy.cds_gaps_in_introns(&selected);
        }
        copy
    }

    /// Map a genomic position onto the transcript's cDNA (1-based, transcription order).
    #[must_use]
    pub fn genomic_to_cdna(&self, pos: i32) -> Option<i32> {
        let mut offset = 0;
        for exon in self.exons_in_transcription_order() {
            if exon.contains_pos(pos) {
                let within = if self.strand.is_reverse() {
                    exon.end - pos
                } else {
                    pos - exon.start
                };
                return Some(offset + within + 1);
            }
            offset += exon.len();
        }
        None
    }

    pub(crate) fn exons_in_transcription_order(&self) -> Vec<Interval> {
        let mut exons = self.exons.clone();
        exons.sort();
        if self.strand.is_reverse() {
            exons.reverse();
        }
        exons
    }
}

/// Build and finalize a transcript from plain coordinates.
#[cfg(test)]
pub(crate) fn test_transcript(
    id: &str,
    strand: Strand,
    exons: &[(i32, i32)],
    cds: &[(i32, i32)],
) -> Transcript {
    let start = exons.iter().map(|e| e.0).min().unwrap();
    let end = exons.iter().map(|e| e.1).max().unwrap();
    let mut transcript = Transcript::new(id, "chr1", strand, start, end);
    transcript.source = "test".to_string();
    transcript.add_exons(exons.iter().map(|&e| Interval::from(e)));
    for &c in cds {
        transcript.add_cds(Interval::from(c), None);
    }
    transcript.finalize().unwrap();
    transcript
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utr_sides_follow_strand() {
        let plus = test_transcript("p", Strand::Plus, &[(100, 200), (300, 400)], &[(150, 200), (300, 350)]);
        assert_eq!(plus.five_utr(), vec![Interval::new(100, 149)]);
        assert_eq!(plus.three_utr(), vec![Interval::new(351, 400)]);
        assert_eq!(plus.selected_cds_start(), Some(150));

        let minus = test_transcript("m", Strand::Minus, &[(100, 200), (300, 400)], &[(150, 200), (300, 350)]);
        assert_eq!(minus.five_utr(), vec![Interval::new(351, 400)]);
        assert_eq!(minus.three_utr_length(), 50);
        assert_eq!(minus.selected_cds_start(), Some(350));
        assert_eq!(minus.selected_cds_end(), Some(150));
    }

    #[test]
    fn genomic_to_cdna_both_strands() {
        let plus = test_transcript("p", Strand::Plus, &[(100, 200), (300, 400)], &[]);
        assert_eq!(plus.genomic_to_cdna(100), Some(1));
        assert_eq!(plus.genomic_to_cdna(300), Some(102));
        assert_eq!(plus.genomic_to_cdna(250), None);

        let minus = test_transcript("m", Strand::Minus, &[(100, 200), (300, 400)], &[]);
        assert_eq!(minus.genomic_to_cdna(400), Some(1));
        assert_eq!(minus.genomic_to_cdna(200), Some(102));
    }

    #[test]
    fn structural_edit_unfinalizes() {
        let mut t = test_transcript("t", Strand::Plus, &[(100, 200), (300, 400)], &[]);
        assert!(t.is_finalized());
        assert!(t.remove_exon(Interval::new(300, 400)));
        assert!(!t.is_finalized());
        assert!(!t.remove_exon(Interval::new(1, 2)));
        t.finalize().unwrap();
        assert!(t.introns().is_empty());
        assert_eq!(t.end, 200);
    }
}
