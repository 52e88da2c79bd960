//! Genome sequence access for UTR padding and ORF extension.

use std::collections::HashMap;
use std::io::Read;

use crate::error::Error;
use crate::fasta;

/// Source of genomic sequence. Coordinates are 1-based and inclusive.
pub trait GenomeSequence {
    /// Fetch `[start, end]` on `chrom`, uppercased, forward strand.
    fn fetch(&self, chrom: &str, start: i32, end: i32) -> Result<Vec<u8>, Error>;
}

/// Chromosome sequences held in memory, indexed by name.
#[derive(Debug, Default)]
pub struct InMemoryGenome {
    sequences: HashMap<String, Vec<u8>>,
}

impl InMemoryGenome {
    /// Build from a plain or gzip-compressed FASTA stream.
    pub fn from_fasta<R: Read>(reader: R) -> Result<Self, Error> {
        let entries = fasta::read_fasta(reader)?;
        let mut sequences = HashMap::with_capacity(entries.len());
        for (name, seq) in entries {
            if sequences.contains_key(&name) {
                return Err(Error::Validation(format!(
                    "duplicate sequence name in genome FASTA: {name}"
                )));
            }
            sequences.insert(name, seq);
        }
        Ok(Self { sequences })
    }

    pub fn insert(&mut self, name: &str, sequence: &[u8]) {
        self.sequences
            .insert(name.to_string(), sequence.to_ascii_uppercase());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

impl GenomeSequence for InMemoryGenome {
    fn fetch(&self, chrom: &str, start: i32, end: i32) -> Result<Vec<u8>, Error> {
        let seq = self
            .sequences
            .get(chrom)
            .ok_or_else(|| Error::Validation(format!("unknown sequence: {chrom}")))?;
        if start < 1 || end < start || end as usize > seq.len() {
            return Err(Error::Validation(format!(
                "region {chrom}:{start}-{end} outside sequence of length {}",
                seq.len()
            )));
        }
        Ok(seq[(start - 1) as usize..end as usize].to_vec())
    }
}

/// Reverse complement of a nucleotide sequence; unknown bases become `N`.
#[must_use]
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|b| match b.to_ascii_uppercase() {
            b'A' => b'T',
            b'C' => b'G',
            b'G' => b'C',
            b'T' | b'U' => b'A',
            _ => b'N',
        })
        .collect()
}
