//! Start and stop codon recognition used when extending open reading frames
//! into padded UTRs.

/// 6-bit code of a codon (A=0, C=1, G=2, T/U=3); `None` for ambiguous bases
/// or short input.
fn encode(codon: &[u8]) -> Option<usize> {
    let [a, b, c, ..] = codon else {
        return None;
    };
    let base = |n: &u8| match n.to_ascii_uppercase() {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' | b'U' => Some(3),
        _ => None,
    };
    Some(base(a)? * 16 + base(b)? * 4 + base(c)?)
}

/// Start and stop codons of a genetic code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodonTable {
    starts: u64,
    stops: u64,
}

impl CodonTable {
    /// Standard code (NCBI table 1) with ATG as the only start.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(&[b"ATG"], &[b"TAA", b"TAG", b"TGA"])
    }

    /// Build from explicit codon lists; ambiguous entries are ignored.
    #[must_use]
    pub fn new(starts: &[&[u8]], stops: &[&[u8]]) -> Self {
        let mask = |codons: &[&[u8]]| {
            codons
                .iter()
                .filter_map(|c| encode(c))
                .fold(0u64, |acc, code| acc | (1 << code))
        };
        Self {
            starts: mask(starts),
            stops: mask(stops),
        }
    }

    #[must_use]
    pub fn is_start(&self, codon: &[u8]) -> bool {
        encode(codon).is_some_and(|code| self.starts & (1 << code) != 0)
    }

    #[must_use]
    pub fn is_stop(&self, codon: &[u8]) -> bool {
        encode(codon).is_some_and(|code| self.stops & (1 << code) != 0)
    }
}

impl Default for CodonTable {
    fn default() -> Self {
        Self::standard()
    }
}
