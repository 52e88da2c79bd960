//! Open reading frames expressed in transcript (cDNA) coordinates.

use serde::{Deserialize, Serialize};

use crate::codon::CodonTable;
use crate::interval::Interval;
use crate::strand::Strand;

fn default_orf_strand() -> Strand {
    Strand::Plus
}

/// A BED12-style ORF: thick start/end are 1-based cDNA positions.
///
/// `strand` is relative to the transcript; `phase` is the number of bases
/// before the first complete codon (non-zero only for 5'-truncated ORFs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orf {
    #[serde(default)]
    pub name: String,
    pub thick_start: i32,
    pub thick_end: i32,
    #[serde(default = "default_orf_strand")]
    pub strand: Strand,
    #[serde(default)]
    pub phase: u8,
    #[serde(default)]
    pub has_start_codon: bool,
    #[serde(default)]
    pub has_stop_codon: bool,
}

impl Orf {
    #[must_use]
    pub fn new(name: &str, thick_start: i32, thick_end: i32) -> Self {
        Self {
            name: name.to_string(),
            thick_start,
            thick_end,
            strand: Strand::Plus,
            phase: 0,
            has_start_codon: false,
            has_stop_codon: false,
        }
    }

    #[must_use]
    pub fn span(&self) -> Interval {
        Interval::new(self.thick_start, self.thick_end)
    }

    #[must_use]
    pub fn cds_len(&self) -> i32 {
        self.thick_end - self.thick_start + 1
    }

    /// Same ORF seen from the opposite strand of a transcript of `cdna_length` bases.
    #[must_use]
    pub fn reversed(&self, cdna_length: i32) -> Orf {
        Orf {
            thick_start: cdna_length - self.thick_end + 1,
            thick_end: cdna_length - self.thick_start + 1,
            strand: self.strand.flipped(),
            ..self.clone()
        }
    }

    /// Shift the ORF by `offset` cDNA bases (negative to move towards the 5' end).
    #[must_use]
    pub fn shifted(&self, offset: i32) -> Orf {
        Orf {
            thick_start: self.thick_start + offset,
            thick_end: self.thick_end + offset,
            ..self.clone()
        }
    }

    /// Re-express the ORF on a transcript lengthened by `upstream` bases at the
    /// 5' end and `downstream` bases at the 3' end.
    ///
    /// `sequence` is the new cDNA sequence in transcription orientation. An ORF
    /// lacking a start codon is extended upstream, in frame, to the most
    /// upstream ATG that is not preceded by a stop (or to the 5' end, where it
    /// stays truncated); an ORF lacking a stop codon is extended downstream to
    /// the first in-frame stop (or to the last complete codon).
    #[must_use]
    pub fn expand(&self, sequence: &[u8], upstream: i32, downstream: i32, table: &CodonTable) -> Orf {
        let mut orf = self.shifted(upstream);
        let length = sequence.len() as i32;
        let codon_at = |pos: i32| -> &[u8] {
            let from = (pos - 1) as usize;
            &sequence[from..from + 3]
        };

        if !orf.has_start_codon && upstream > 0 {
            // first complete codon in frame with the current start
            let frame_start = orf.thick_start + i32::from(orf.phase);
            let mut pos = frame_start - 3;
            let mut most_upstream_start = None;
            let mut hit_stop = false;
            while pos >= 1 {
                let codon = codon_at(pos);
                if table.is_stop(codon) {
                    hit_stop = true;
                    break;
                }
                if table.is_start(codon) {
                    most_upstream_start = Some(pos);
                }
                pos -= 3;
            }
            if let Some(start) = most_upstream_start {
                orf.thick_start = start;
                orf.phase = 0;
                orf.has_start_codon = true;
            } else if !hit_stop {
                // ran off the 5' end: keep the frame, stay truncated
                let leftover = (frame_start - 1) % 3;
                orf.thick_start = 1;
                orf.phase = leftover as u8;
            }
            log::debug!(
                "ORF {} extended upstream to {} (start codon: {})",
                orf.name,
                orf.thick_start,
                orf.has_start_codon
            );
        }

        if !orf.has_stop_codon && downstream > 0 {
            let coding = orf.thick_end - orf.thick_start + 1 - i32::from(orf.phase);
            // last complete codon of the current frame
            let mut pos = orf.thick_end - coding.rem_euclid(3) + 1;
            let mut last_complete = pos - 1;
            while pos + 2 <= length {
                let codon = codon_at(pos);
                last_complete = pos + 2;
                if table.is_stop(codon) {
                    orf.has_stop_codon = true;
                    break;
                }
                pos += 3;
            }
            orf.thick_end = last_complete.max(orf.thick_end);
            log::debug!(
                "ORF {} extended downstream to {} (stop codon: {})",
                orf.name,
                orf.thick_end,
                orf.has_stop_codon
            );
        }

        orf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_mirrors_coordinates() {
        let orf = Orf::new("o", 11, 40);
        let rev = orf.reversed(100);
        assert_eq!((rev.thick_start, rev.thick_end), (61, 90));
        assert_eq!(rev.strand, Strand::Minus);
        assert_eq!(rev.reversed(100).span(), orf.span());
    }

    #[test]
    fn expand_finds_upstream_start() {
        // old transcript started at "GCA"; six new bases "ATGCCC" were added in front
        let seq = b"ATGCCCGCAAAATAG";
        let mut orf = Orf::new("o", 1, 9);
        orf.has_stop_codon = true;
        let expanded = orf.expand(seq, 6, 0, &CodonTable::standard());
        assert_eq!(expanded.thick_start, 1);
        assert!(expanded.has_start_codon);
        assert_eq!(expanded.thick_end, 15);
    }

    #[test]
    fn expand_stops_at_upstream_stop() {
        let seq = b"ATGTAAGCAAAATAG";
        let mut orf = Orf::new("o", 1, 9);
        orf.has_stop_codon = true;
        let expanded = orf.expand(seq, 6, 0, &CodonTable::standard());
        assert_eq!(expanded.thick_start, 7);
        assert!(!expanded.has_start_codon);
    }

    #[test]
    fn expand_finds_downstream_stop() {
        let seq = b"ATGAAACCCTGAGG";
        let mut orf = Orf::new("o", 1, 6);
        orf.has_start_codon = true;
        let expanded = orf.expand(seq, 0, 8, &CodonTable::standard());
        assert_eq!(expanded.thick_end, 12);
        assert!(expanded.has_stop_codon);
    }

    #[test]
    fn expand_without_stop_keeps_complete_codons() {
        let seq = b"ATGAAACCCGG";
        let mut orf = Orf::new("o", 1, 6);
        orf.has_start_codon = true;
        let expanded = orf.expand(seq, 0, 5, &CodonTable::standard());
        assert_eq!(expanded.thick_end, 9);
        assert!(!expanded.has_stop_codon);
    }
}
