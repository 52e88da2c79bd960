//! Class codes: categorical comparison of a predicted transcript against a
//! reference transcript.
//!
//! | Code | Meaning |
//! |---|---|
//! | `=` | multi-exonic, identical intron chain |
//! | `_` | both monoexonic, reciprocal nucleotide overlap of at least 80% |
//! | `c` | prediction contained in the reference (intron chain is a consecutive subset, terminal exons inside) |
//! | `C` | like `c`, but the prediction's terminal exons stick out of the reference |
//! | `j` | at least one shared intron or splice site, otherwise different chains |
//! | `J` | prediction has every reference intron plus extra introns inside the reference span |
//! | `n` | reference contained in the prediction, extra introns outside the reference span |
//! | `o` | exonic overlap without any shared or overlapping intron |
//! | `h` | introns overlap but no intron or splice site is shared |
//! | `e` | monoexonic prediction overlapping a reference exon and intron |
//! | `g` | monoexonic prediction spanning a whole reference intron |
//! | `G` | multi-exonic prediction over a monoexonic reference |
//! | `m` | both monoexonic, partial overlap |
//! | `i` | prediction lies entirely inside a reference intron |
//! | `I` | reference lies entirely inside a prediction intron |
//! | `x` | overlap on the opposite strand |
//! | `p` | no overlap, within 2 kb |
//! | `P` | no overlap, within 2 kb downstream on the same strand (possible run-on) |
//! | `u` | unrelated |

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::interval::{self, Interval};
use crate::strand::Strand;
use crate::transcript::Transcript;

/// Maximum distance for the `p`/`P` codes.
pub const NEARBY_DISTANCE: i32 = 2000;

/// Reciprocal overlap required for two monoexonic transcripts to be `_`.
const MONO_IDENTITY: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClassCode {
    #[serde(rename = "=")]
    Identical,
    #[serde(rename = "_")]
    MonoIdentical,
    #[serde(rename = "c")]
    Contained,
    #[serde(rename = "C")]
    ContainedOverhang,
    #[serde(rename = "j")]
    SharedJunction,
    #[serde(rename = "J")]
    ExtraInternalIntrons,
    #[serde(rename = "n")]
    Extension,
    #[serde(rename = "o")]
    Overlap,
    #[serde(rename = "h")]
    IntronOverlap,
    #[serde(rename = "e")]
    PreMrnaFragment,
    #[serde(rename = "g")]
    MonoOverIntron,
    #[serde(rename = "G")]
    MultiOverMono,
    #[serde(rename = "m")]
    MonoOverlap,
    #[serde(rename = "i")]
    InIntron,
    #[serde(rename = "I")]
    ContainsReference,
    #[serde(rename = "x")]
    OppositeStrand,
    #[serde(rename = "X")]
    OppositeStrandIntronic,
    #[serde(rename = "p")]
    Nearby,
    #[serde(rename = "P")]
    RunOn,
    #[serde(rename = "u")]
    Unrelated,
}

impl ClassCode {
    pub const ALL: [ClassCode; 20] = [
        Self::Identical,
        Self::MonoIdentical,
        Self::Contained,
        Self::ContainedOverhang,
        Self::SharedJunction,
        Self::ExtraInternalIntrons,
        Self::Extension,
        Self::Overlap,
        Self::IntronOverlap,
        Self::PreMrnaFragment,
        Self::MonoOverIntron,
        Self::MultiOverMono,
        Self::MonoOverlap,
        Self::InIntron,
        Self::ContainsReference,
        Self::OppositeStrand,
        Self::OppositeStrandIntronic,
        Self::Nearby,
        Self::RunOn,
        Self::Unrelated,
    ];

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Identical => "=",
            Self::MonoIdentical => "_",
            Self::Contained => "c",
            Self::ContainedOverhang => "C",
            Self::SharedJunction => "j",
            Self::ExtraInternalIntrons => "J",
            Self::Extension => "n",
            Self::Overlap => "o",
            Self::IntronOverlap => "h",
            Self::PreMrnaFragment => "e",
            Self::MonoOverIntron => "g",
            Self::MultiOverMono => "G",
            Self::MonoOverlap => "m",
            Self::InIntron => "i",
            Self::ContainsReference => "I",
            Self::OppositeStrand => "x",
            Self::OppositeStrandIntronic => "X",
            Self::Nearby => "p",
            Self::RunOn => "P",
            Self::Unrelated => "u",
        }
    }
}

impl fmt::Display for ClassCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for ClassCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|code| code.symbol() == s)
            .ok_or_else(|| Error::Parse(format!("unknown class code '{s}'")))
    }
}

/// Result of comparing a prediction against a reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub ccode: ClassCode,
    pub n_prec: f64,
    pub n_recall: f64,
    pub n_f1: f64,
    pub j_prec: f64,
    pub j_recall: f64,
    pub j_f1: f64,
    /// Genomic distance between the two spans; zero when they overlap.
    pub distance: i32,
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// True when `inner` occurs as a contiguous run inside `outer` (both sorted).
fn is_consecutive_subset(inner: &BTreeSet<Interval>, outer: &BTreeSet<Interval>) -> bool {
    let Some(first) = inner.iter().next() else {
        return false;
    };
    let outer: Vec<&Interval> = outer.iter().collect();
    let Some(offset) = outer.iter().position(|i| *i == first) else {
        return false;
    };
    inner
        .iter()
        .enumerate()
        .all(|(k, intron)| outer.get(offset + k).is_some_and(|o| *o == intron))
}

fn within_single_exon(span: Interval, exons: &[Interval]) -> bool {
    exons.iter().any(|e| e.contains(&span))
}

/// Compare `prediction` against `reference`. Both must be finalized.
#[must_use]
pub fn compare(prediction: &Transcript, reference: &Transcript) -> Comparison {
    let (p_span, r_span) = (prediction.span(), reference.span());
    let distance = if prediction.chrom == reference.chrom {
        p_span.distance(&r_span)
    } else {
        i32::MAX
    };

    let shared = interval::overlap_length(prediction.exons(), reference.exons()).max(0);
    let n_prec = ratio(shared, prediction.cdna_length());
    let n_recall = ratio(shared, reference.cdna_length());

    let (p_introns, r_introns) = (prediction.introns(), reference.introns());
    let (j_prec, j_recall) = match (p_introns.is_empty(), r_introns.is_empty()) {
        (true, true) => (1.0, 1.0),
        (true, false) | (false, true) => (0.0, 0.0),
        (false, false) => {
            let common = p_introns.intersection(r_introns).count();
            (ratio_usize(common, p_introns.len()), ratio_usize(common, r_introns.len()))
        }
    };

    let ccode = classify(prediction, reference, shared, n_prec, n_recall, distance);
    Comparison {
        ccode,
        n_prec,
        n_recall,
        n_f1: f1(n_prec, n_recall),
        j_prec,
        j_recall,
        j_f1: f1(j_prec, j_recall),
        distance,
    }
}

fn ratio(numerator: i32, denominator: i32) -> f64 {
    if denominator <= 0 {
        0.0
    } else {
        f64::from(numerator) / f64::from(denominator)
    }
}

fn ratio_usize(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn classify(
    p: &Transcript,
    r: &Transcript,
    shared: i32,
    n_prec: f64,
    n_recall: f64,
    distance: i32,
) -> ClassCode {
    let (p_span, r_span) = (p.span(), r.span());
    if p.chrom != r.chrom {
        return ClassCode::Unrelated;
    }
    if !p_span.overlaps(&r_span) {
        if distance > NEARBY_DISTANCE {
            return ClassCode::Unrelated;
        }
        let downstream = match (p.strand, r.strand) {
            (Strand::Plus, Strand::Plus) => p_span.start > r_span.end,
            (Strand::Minus, Strand::Minus) => p_span.end < r_span.start,
            _ => false,
        };
        return if downstream {
            ClassCode::RunOn
        } else {
            ClassCode::Nearby
        };
    }
    if p.strand.is_known() && r.strand.is_known() && p.strand != r.strand {
        let intronic = p
            .introns()
            .iter()
            .any(|pi| r.introns().iter().any(|ri| pi.overlaps(ri)));
        return if intronic {
            ClassCode::OppositeStrandIntronic
        } else {
            ClassCode::OppositeStrand
        };
    }
    if shared == 0 {
        if r.introns().iter().any(|i| i.contains(&p_span)) {
            return ClassCode::InIntron;
        }
        if p.introns().iter().any(|i| i.contains(&r_span)) {
            return ClassCode::ContainsReference;
        }
    }

    match (p.monoexonic(), r.monoexonic()) {
        (true, true) => {
            if n_prec >= MONO_IDENTITY && n_recall >= MONO_IDENTITY {
                ClassCode::MonoIdentical
            } else if r_span.contains(&p_span) {
                ClassCode::Contained
            } else if p_span.contains(&r_span) {
                ClassCode::Extension
            } else {
                ClassCode::MonoOverlap
            }
        }
        (true, false) => {
            if within_single_exon(p_span, r.exons()) {
                ClassCode::Contained
            } else if r.introns().iter().any(|i| p_span.contains(i))
                && r.exons().iter().any(|e| e.contains_pos(p_span.start))
                && r.exons().iter().any(|e| e.contains_pos(p_span.end))
            {
                ClassCode::MonoOverIntron
            } else {
                ClassCode::PreMrnaFragment
            }
        }
        (false, true) => {
            if within_single_exon(r_span, p.exons()) {
                ClassCode::Extension
            } else {
                ClassCode::MultiOverMono
            }
        }
        (false, false) => classify_multiexonic(p, r),
    }
}

fn classify_multiexonic(p: &Transcript, r: &Transcript) -> ClassCode {
    let (p_introns, r_introns) = (p.introns(), r.introns());
    let (p_span, r_span) = (p.span(), r.span());
    if p_introns == r_introns {
        return ClassCode::Identical;
    }
    if p_introns.is_subset(r_introns) && is_consecutive_subset(p_introns, r_introns) {
        return if r_span.contains(&p_span) {
            ClassCode::Contained
        } else {
            ClassCode::ContainedOverhang
        };
    }
    if r_introns.is_subset(p_introns) {
        let extra_inside = p_introns
            .difference(r_introns)
            .any(|intron| intron.overlaps(&r_span));
        return if extra_inside {
            ClassCode::ExtraInternalIntrons
        } else {
            ClassCode::Extension
        };
    }
    if !p_introns.is_disjoint(r_introns) || !p.splices().is_disjoint(r.splices()) {
        return ClassCode::SharedJunction;
    }
    if p_introns
        .iter()
        .any(|a| r_introns.iter().any(|b| a.overlaps(b)))
    {
        return ClassCode::IntronOverlap;
    }
    ClassCode::Overlap
}
