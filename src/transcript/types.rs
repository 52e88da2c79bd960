//! Transcript data model types: segments, raw input records and container-relative metrics.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::interval::Interval;
use crate::strand::Strand;

/// Kind of a segment inside an internal ORF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SegmentKind {
    Cds,
    Utr,
    Exon,
}

/// One element of an internal ORF: an exon, or the CDS/UTR portion of an exon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub span: Interval,
    /// Phase of CDS segments; `None` for exons and UTRs.
    pub phase: Option<u8>,
}

impl Segment {
    #[must_use]
    pub fn new(kind: SegmentKind, span: Interval) -> Self {
        Self {
            kind,
            span,
            phase: None,
        }
    }

    #[must_use]
    pub fn is_cds(&self) -> bool {
        self.kind == SegmentKind::Cds
    }

    pub(crate) fn sort_key(&self) -> (i32, i32, SegmentKind) {
        (self.span.start, self.span.end, self.kind)
    }
}

/// GFF feature type reported for a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Feature {
    Mrna,
    #[default]
    Transcript,
    NcRna,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mrna => write!(f, "mRNA"),
            Self::Transcript => write!(f, "transcript"),
            Self::NcRna => write!(f, "ncRNA"),
        }
    }
}

/// Raw transcript as delivered by an annotation parser, before finalization.
///
/// Intervals are `[start, end]` pairs in genomic coordinates. `cds_phases`, when
/// present, runs parallel to `cds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub id: String,
    pub chrom: String,
    #[serde(default)]
    pub strand: Strand,
    pub start: i32,
    pub end: i32,
    #[serde(default)]
    pub source: String,
    pub exons: Vec<Interval>,
    #[serde(default)]
    pub cds: Vec<Interval>,
    #[serde(default)]
    pub cds_phases: Vec<u8>,
    #[serde(default)]
    pub utr: Vec<Interval>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Metrics that only make sense relative to the container holding the transcript.
/// Filled in by the container before scoring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelativeMetrics {
    pub exon_fraction: f64,
    pub intron_fraction: f64,
    pub combined_cds_intron_fraction: f64,
    pub selected_cds_intron_fraction: f64,
    /// Exons of this transcript that read through a coding intron of the container.
    pub retained_introns: Vec<Interval>,
    pub retained_fraction: f64,
    pub proportion_verified_introns_inlocus: f64,
}
