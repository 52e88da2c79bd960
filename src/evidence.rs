//! Evidence attached to transcripts before picking: verified junctions,
//! externally predicted ORFs and protein homology hits.

use std::collections::HashMap;
use std::io::Read;

use serde::Deserialize;

use crate::error::Error;
use crate::homology::BlastHit;
use crate::interval::Interval;
use crate::strand::Strand;
use crate::transcript::orf::Orf;

/// Read access to the evidence databases.
pub trait EvidenceSource {
    /// Verified introns lying within `[start, end]` on `chrom`.
    fn verified_introns(&self, chrom: &str, start: i32, end: i32) -> Vec<(Interval, Strand)>;

    /// ORFs predicted on the transcript, in cDNA coordinates.
    fn orfs(&self, tid: &str) -> Vec<Orf>;

    /// Homology hits of the transcript, best first.
    fn hits(&self, tid: &str) -> Vec<BlastHit>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Junction {
    pub chrom: String,
    pub start: i32,
    pub end: i32,
    #[serde(default)]
    pub strand: Strand,
}

/// In-memory evidence, typically loaded from a JSON dump.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EvidenceStore {
    pub junctions: Vec<Junction>,
    pub orfs: HashMap<String, Vec<Orf>>,
    pub hits: HashMap<String, Vec<BlastHit>>,
}

impl EvidenceStore {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        serde_json::from_reader(reader).map_err(|e| Error::Parse(format!("invalid evidence store: {e}")))
    }
}

impl EvidenceSource for EvidenceStore {
    fn verified_introns(&self, chrom: &str, start: i32, end: i32) -> Vec<(Interval, Strand)> {
        self.junctions
            .iter()
            .filter(|j| j.chrom == chrom && j.start >= start && j.end <= end)
            .map(|j| (Interval::new(j.start, j.end), j.strand))
            .collect()
    }

    fn orfs(&self, tid: &str) -> Vec<Orf> {
        self.orfs.get(tid).cloned().unwrap_or_default()
    }

    fn hits(&self, tid: &str) -> Vec<BlastHit> {
        let mut hits = self.hits.get(tid).cloned().unwrap_or_default();
        hits.sort_by(|a, b| a.evalue.total_cmp(&b.evalue).then_with(|| b.bits.total_cmp(&a.bits)));
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORE: &str = r#"{
        "junctions": [
            { "chrom": "chr1", "start": 201, "end": 299, "strand": "+" },
            { "chrom": "chr1", "start": 5001, "end": 5099, "strand": "-" },
            { "chrom": "chr2", "start": 201, "end": 299 }
        ],
        "orfs": { "t1": [{ "thick_start": 10, "thick_end": 99, "has_start_codon": true }] },
        "hits": { "t1": [
            { "target": "P2", "target_length": 300, "query_start": 1, "query_end": 90,
              "target_start": 1, "target_end": 30, "evalue": 1e-5 },
            { "target": "P1", "target_length": 300, "query_start": 1, "query_end": 90,
              "target_start": 1, "target_end": 30, "evalue": 1e-20, "bits": 80.0 }
        ] }
    }"#;

    #[test]
    fn parse_and_query() {
        let store = EvidenceStore::from_reader(STORE.as_bytes()).unwrap();
        let introns = store.verified_introns("chr1", 100, 400);
        assert_eq!(introns, vec![(Interval::new(201, 299), Strand::Plus)]);
        assert_eq!(store.verified_introns("chr2", 1, 1000)[0].1, Strand::Unknown);

        let orfs = store.orfs("t1");
        assert_eq!(orfs.len(), 1);
        assert_eq!(orfs[0].strand, Strand::Plus);
        assert!(store.orfs("t2").is_empty());

        let hits = store.hits("t1");
        assert_eq!(hits[0].target, "P1");
    }

    #[test]
    fn malformed_store() {
        assert!(matches!(
            EvidenceStore::from_reader("{\"junctions\": 3}".as_bytes()),
            Err(Error::Parse(_))
        ));
    }
}
