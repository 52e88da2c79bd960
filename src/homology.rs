//! Protein homology hits (BLASTX-style) attached to transcripts.
//!
//! Query coordinates are cDNA positions on the transcript, target coordinates
//! are positions on the protein.

use std::cmp::{max, min};

use serde::{Deserialize, Serialize};

use crate::interval::Interval;

/// A single high-scoring segment pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hsp {
    pub query_hsp_start: i32,
    pub query_hsp_end: i32,
    pub target_hsp_start: i32,
    pub target_hsp_end: i32,
    pub hsp_evalue: f64,
    #[serde(default)]
    pub hsp_bits: f64,
    #[serde(default)]
    pub hsp_identity: f64,
}

impl Hsp {
    #[must_use]
    pub fn query_span(&self) -> Interval {
        Interval::new(self.query_hsp_start, self.query_hsp_end)
    }

    #[must_use]
    pub fn target_span(&self) -> Interval {
        Interval::new(self.target_hsp_start, self.target_hsp_end)
    }
}

/// All HSPs of a transcript against one target protein.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlastHit {
    pub target: String,
    pub target_length: i32,
    pub query_start: i32,
    pub query_end: i32,
    pub target_start: i32,
    pub target_end: i32,
    pub evalue: f64,
    #[serde(default)]
    pub bits: f64,
    #[serde(default)]
    pub global_identity: f64,
    #[serde(default)]
    pub hsps: Vec<Hsp>,
}

impl BlastHit {
    #[must_use]
    pub fn query_span(&self) -> Interval {
        Interval::new(self.query_start, self.query_end)
    }
}

/// Re-express `hit` on the fragment of the transcript covering `boundary`.
///
/// HSPs whose query span overlaps the boundary by at least `minimal_overlap`
/// (as a fraction of the HSP length) are kept, clipped to the boundary and
/// shifted so that `boundary.start` becomes position 1. Returns `None` when
/// no HSP survives.
#[must_use]
pub fn recalculate_hit(hit: &BlastHit, boundary: Interval, minimal_overlap: f64) -> Option<BlastHit> {
    let offset = boundary.start - 1;
    let hsps: Vec<Hsp> = hit
        .hsps
        .iter()
        .filter(|hsp| {
            let span = hsp.query_span();
            f64::from(span.overlap(&boundary).max(0)) / f64::from(span.len()) >= minimal_overlap
        })
        .map(|hsp| Hsp {
            query_hsp_start: max(hsp.query_hsp_start, boundary.start) - offset,
            query_hsp_end: min(hsp.query_hsp_end, boundary.end) - offset,
            ..hsp.clone()
        })
        .collect();

    let first = hsps.first()?;
    let mut recalculated = BlastHit {
        query_start: first.query_hsp_start,
        query_end: first.query_hsp_end,
        target_start: first.target_hsp_start,
        target_end: first.target_hsp_end,
        evalue: first.hsp_evalue,
        bits: first.hsp_bits,
        hsps: Vec::new(),
        ..hit.clone()
    };
    for hsp in &hsps {
        recalculated.query_start = min(recalculated.query_start, hsp.query_hsp_start);
        recalculated.query_end = max(recalculated.query_end, hsp.query_hsp_end);
        recalculated.target_start = min(recalculated.target_start, hsp.target_hsp_start);
        recalculated.target_end = max(recalculated.target_end, hsp.target_hsp_end);
        recalculated.evalue = recalculated.evalue.min(hsp.hsp_evalue);
        recalculated.bits = recalculated.bits.max(hsp.hsp_bits);
    }
    recalculated.hsps = hsps;
    Some(recalculated)
}

#[cfg(test)]
pub(crate) fn test_hit(target: &str, target_length: i32, hsps: &[(i32, i32, i32, i32)]) -> BlastHit {
    let hsps: Vec<Hsp> = hsps
        .iter()
        .map(|&(qs, qe, ts, te)| Hsp {
            query_hsp_start: qs,
            query_hsp_end: qe,
            target_hsp_start: ts,
            target_hsp_end: te,
            hsp_evalue: 1e-20,
            hsp_bits: 100.0,
            hsp_identity: 90.0,
        })
        .collect();
    BlastHit {
        target: target.to_string(),
        target_length,
        query_start: hsps.iter().map(|h| h.query_hsp_start).min().unwrap_or(0),
        query_end: hsps.iter().map(|h| h.query_hsp_end).max().unwrap_or(0),
        target_start: hsps.iter().map(|h| h.target_hsp_start).min().unwrap_or(0),
        target_end: hsps.iter().map(|h| h.target_hsp_end).max().unwrap_or(0),
        evalue: 1e-20,
        bits: 100.0,
        global_identity: 90.0,
        hsps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recalculate_keeps_overlapping_hsps() {
        let hit = test_hit("prot1", 300, &[(10, 100, 1, 30), (400, 600, 100, 170)]);
        let recalculated = recalculate_hit(&hit, Interval::new(350, 700), 0.5).unwrap();
        assert_eq!(recalculated.hsps.len(), 1);
        assert_eq!(recalculated.query_start, 51);
        assert_eq!(recalculated.query_end, 251);
        assert_eq!(recalculated.target_start, 100);
    }

    #[test]
    fn recalculate_drops_hit_without_hsps() {
        let hit = test_hit("prot1", 300, &[(10, 100, 1, 30)]);
        assert!(recalculate_hit(&hit, Interval::new(90, 500), 0.5).is_none());
    }
}
