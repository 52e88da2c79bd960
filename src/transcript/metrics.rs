//! Named transcript metrics used by scoring rules, requirement expressions and
//! the metrics tables.

use std::collections::BTreeMap;
use std::fmt;

use super::Transcript;

/// Value of a single metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Number(f64),
    Flag(bool),
}

impl MetricValue {
    /// Numeric view; flags map to 0/1.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Number(v) => v,
            Self::Flag(b) => f64::from(u8::from(b)),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{}", *v as i64),
            Self::Number(v) => write!(f, "{v:.4}"),
            Self::Flag(b) => write!(f, "{}", if *b { "True" } else { "False" }),
        }
    }
}

/// Anything that can resolve a metric name to a value.
pub trait MetricLookup {
    fn metric(&self, name: &str) -> Option<MetricValue>;
}

/// Every metric of one transcript, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSet(BTreeMap<&'static str, MetricValue>);

impl MetricSet {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<MetricValue> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, MetricValue)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

impl MetricLookup for MetricSet {
    fn metric(&self, name: &str) -> Option<MetricValue> {
        self.get(name)
    }
}

impl MetricLookup for Transcript {
    fn metric(&self, name: &str) -> Option<MetricValue> {
        compute(self, name)
    }
}

pub const METRIC_NAMES: &[&str] = &[
    "cdna_length",
    "exon_num",
    "combined_cds_length",
    "combined_cds_num",
    "combined_cds_fraction",
    "combined_utr_length",
    "combined_utr_fraction",
    "five_utr_length",
    "five_utr_num",
    "three_utr_length",
    "three_utr_num",
    "utr_num",
    "selected_cds_length",
    "selected_cds_num",
    "selected_cds_fraction",
    "cds_not_maximal",
    "cds_not_maximal_fraction",
    "number_internal_orfs",
    "has_start_codon",
    "has_stop_codon",
    "is_complete",
    "max_intron_length",
    "min_intron_length",
    "end_distance_from_junction",
    "highest_cds_exons_num",
    "verified_introns_num",
    "non_verified_introns_num",
    "proportion_verified_introns",
    "best_bits",
    "exon_fraction",
    "intron_fraction",
    "combined_cds_intron_fraction",
    "selected_cds_intron_fraction",
    "retained_intron_num",
    "retained_fraction",
    "proportion_verified_introns_inlocus",
];

#[must_use]
pub fn is_known_metric(name: &str) -> bool {
    METRIC_NAMES.contains(&name)
}

/// Compute all metrics of a transcript.
#[must_use]
pub fn collect(transcript: &Transcript) -> MetricSet {
    MetricSet(
        METRIC_NAMES
            .iter()
            .filter_map(|&name| compute(transcript, name).map(|v| (name, v)))
            .collect(),
    )
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Compute a single metric by name; `None` for unknown names.
#[must_use]
pub fn compute(t: &Transcript, name: &str) -> Option<MetricValue> {
    use MetricValue::{Flag, Number};

    let cdna = f64::from(t.cdna_length());
    let value = match name {
        "cdna_length" => Number(cdna),
        "exon_num" => Number(t.exons.len() as f64),
        "combined_cds_length" => Number(f64::from(t.combined_cds_length())),
        "combined_cds_num" => Number(t.combined_cds.len() as f64),
        "combined_cds_fraction" => Number(ratio(f64::from(t.combined_cds_length()), cdna)),
        "combined_utr_length" => Number(f64::from(t.combined_utr_length())),
        "combined_utr_fraction" => Number(ratio(f64::from(t.combined_utr_length()), cdna)),
        "five_utr_length" => Number(f64::from(t.five_utr_length())),
        "five_utr_num" => Number(t.five_utr().len() as f64),
        "three_utr_length" => Number(f64::from(t.three_utr_length())),
        "three_utr_num" => Number(t.three_utr().len() as f64),
        "utr_num" => Number((t.five_utr().len() + t.three_utr().len()) as f64),
        "selected_cds_length" => Number(f64::from(t.selected_cds_length())),
        "selected_cds_num" => Number(t.selected_cds().len() as f64),
        "selected_cds_fraction" => Number(ratio(f64::from(t.selected_cds_length()), cdna)),
        "cds_not_maximal" => Number(f64::from(t.combined_cds_length() - t.selected_cds_length())),
        "cds_not_maximal_fraction" => Number(ratio(
            f64::from(t.combined_cds_length() - t.selected_cds_length()),
            f64::from(t.combined_cds_length()),
        )),
        "number_internal_orfs" => Number(t.number_internal_orfs() as f64),
        "has_start_codon" => Flag(t.has_start_codon),
        "has_stop_codon" => Flag(t.has_stop_codon),
        "is_complete" => Flag(t.has_start_codon && t.has_stop_codon),
        "max_intron_length" => Number(f64::from(t.intron_lengths().into_iter().max().unwrap_or(0))),
        "min_intron_length" => Number(f64::from(t.intron_lengths().into_iter().min().unwrap_or(0))),
        "end_distance_from_junction" => Number(f64::from(end_distance_from_junction(t))),
        "highest_cds_exons_num" => Number(t.selected_coding_exons() as f64),
        "verified_introns_num" => Number(t.verified_introns.len() as f64),
        "non_verified_introns_num" => {
            Number(t.introns.len().saturating_sub(t.verified_introns.len()) as f64)
        }
        "proportion_verified_introns" => Number(ratio(
            t.verified_introns.len() as f64,
            t.introns.len() as f64,
        )),
        "best_bits" => Number(t.blast_hits.iter().map(|h| h.bits).fold(0.0, f64::max)),
        "exon_fraction" => Number(t.relative.exon_fraction),
        "intron_fraction" => Number(t.relative.intron_fraction),
        "combined_cds_intron_fraction" => Number(t.relative.combined_cds_intron_fraction),
        "selected_cds_intron_fraction" => Number(t.relative.selected_cds_intron_fraction),
        "retained_intron_num" => Number(t.relative.retained_introns.len() as f64),
        "retained_fraction" => Number(t.relative.retained_fraction),
        "proportion_verified_introns_inlocus" => {
            Number(t.relative.proportion_verified_introns_inlocus)
        }
        _ => return None,
    };
    Some(value)
}

/// cDNA distance between the stop codon and the last exon-exon junction
/// downstream of it; zero when the CDS ends in the last exon.
fn end_distance_from_junction(t: &Transcript) -> i32 {
    let Some(cds_end) = t.selected_cds_end().and_then(|p| t.genomic_to_cdna(p)) else {
        return 0;
    };
    let exons = t.exons_in_transcription_order();
    let Some(last_exon) = exons.last() else {
        return 0;
    };
    let last_junction = t.cdna_length() - last_exon.len();
    (last_junction - cds_end).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strand::Strand;
    use crate::transcript::test_transcript;

    #[test]
    fn coding_metrics() {
        let t = test_transcript("t", Strand::Plus, &[(100, 200), (300, 400), (500, 600)], &[(151, 200), (300, 400), (500, 549)]);
        let metrics = collect(&t);
        assert_eq!(metrics.get("cdna_length"), Some(MetricValue::Number(303.0)));
        assert_eq!(metrics.get("selected_cds_length"), Some(MetricValue::Number(201.0)));
        assert_eq!(metrics.get("five_utr_length"), Some(MetricValue::Number(51.0)));
        assert_eq!(metrics.get("three_utr_length"), Some(MetricValue::Number(51.0)));
        assert_eq!(metrics.get("is_complete"), Some(MetricValue::Flag(true)));
        assert_eq!(metrics.get("max_intron_length"), Some(MetricValue::Number(99.0)));
        assert_eq!(metrics.get("highest_cds_exons_num"), Some(MetricValue::Number(3.0)));
        assert_eq!(metrics.get("end_distance_from_junction"), Some(MetricValue::Number(0.0)));
        assert!(metrics.get("no_such_metric").is_none());
    }

    #[test]
    fn junction_distance_for_early_stop() {
        // stop codon in the first exon, 100 bases before the only junction
        let t = test_transcript("t", Strand::Plus, &[(1, 200), (301, 400)], &[(50, 100)]);
        assert_eq!(compute(&t, "end_distance_from_junction"), Some(MetricValue::Number(100.0)));
    }

    #[test]
    fn every_named_metric_resolves() {
        let t = test_transcript("t", Strand::Unknown, &[(1, 200)], &[]);
        for name in METRIC_NAMES {
            assert!(compute(&t, name).is_some(), "{name}");
        }
        assert_eq!(collect(&t).iter().count(), METRIC_NAMES.len());
    }

    #[test]
    fn display_formats() {
        assert_eq!(MetricValue::Number(3.0).to_string(), "3");
        assert_eq!(MetricValue::Number(0.5).to_string(), "0.5000");
        assert_eq!(MetricValue::Flag(false).to_string(), "False");
        assert_eq!(MetricValue::Flag(true).as_f64(), 1.0);
    }
}
