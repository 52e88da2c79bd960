//! GFF3 rendering of transcripts and loci.

use std::fmt;

use indexmap::IndexMap;

use crate::strand::Strand;
use crate::transcript::Transcript;

/// One GFF3 feature line.
#[derive(Debug, Clone, PartialEq)]
pub struct GffLine {
    pub seqid: String,
    pub source: String,
    pub feature: String,
    pub start: i32,
    pub end: i32,
    pub score: Option<f64>,
    pub strand: Strand,
    pub phase: Option<u8>,
    pub attributes: IndexMap<String, String>,
}

impl GffLine {
    #[must_use]
    pub fn new(seqid: &str, source: &str, feature: &str, start: i32, end: i32, strand: Strand) -> Self {
        Self {
            seqid: seqid.to_string(),
            source: source.to_string(),
            feature: feature.to_string(),
            start,
            end,
            score: None,
            strand,
            phase: None,
            attributes: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: impl ToString) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }
}

/// Escape the characters reserved in GFF3 column 9.
fn escape(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace(';', "%3B")
        .replace('=', "%3D")
        .replace(',', "%2C")
        .replace('\t', "%09")
}

impl fmt::Display for GffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let score = self.score.map_or_else(|| ".".to_string(), |s| format!("{s:.2}"));
        let phase = self.phase.map_or_else(|| ".".to_string(), |p| p.to_string());
        let attributes = if self.attributes.is_empty() {
            ".".to_string()
        } else {
            self.attributes
                .iter()
                .map(|(k, v)| format!("{k}={}", escape(v)))
                .collect::<Vec<_>>()
                .join(";")
        };
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.seqid, self.source, self.feature, self.start, self.end, score, self.strand, phase, attributes
        )
    }
}

/// Transcript line followed by its exon, CDS and UTR lines.
///
/// With `print_cds` false the transcript is reported as non-coding.
#[must_use]
pub fn transcript_lines(t: &Transcript, source: &str, print_cds: bool) -> Vec<GffLine> {
    let coding = print_cds && t.is_coding();
    let feature = if coding || !t.is_coding() {
        t.feature.to_string()
    } else {
        "transcript".to_string()
    };
    let mut line = GffLine::new(&t.chrom, source, &feature, t.start, t.end, t.strand);
    line.score = Some(t.score);
    line = line.with_attribute("ID", &t.id);
    if let Some(parent) = &t.parent {
        line = line.with_attribute("Parent", parent);
    }
    for (key, value) in &t.attributes {
        if key != "ID" && key != "Parent" {
            line.attributes.insert(key.clone(), value.clone());
        }
    }
    let mut lines = vec![line];

    let child = |feature: &str, span: crate::interval::Interval, n: usize| {
        GffLine::new(&t.chrom, source, feature, span.start, span.end, t.strand)
            .with_attribute("ID", format!("{}.{feature}{n}", t.id))
            .with_attribute("Parent", &t.id)
    };
    for (n, &exon) in t.exons().iter().enumerate() {
        lines.push(child("exon", exon, n + 1));
    }
    if coding {
        for (n, utr) in t.five_utr().into_iter().enumerate() {
            lines.push(child("five_prime_UTR", utr, n + 1));
        }
        for (n, segment) in t.selected_cds_segments().into_iter().enumerate() {
            let mut cds = child("CDS", segment.span, n + 1);
            cds.phase = segment.phase.or(Some(0));
            lines.push(cds);
        }
        for (n, utr) in t.three_utr().into_iter().enumerate() {
            lines.push(child("three_prime_UTR", utr, n + 1));
        }
    }
    lines.sort_by_key(|l| (l.feature != feature, l.start, l.feature != "exon"));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::test_transcript;

    #[test]
    fn line_format() {
        let line = GffLine::new("chr1", "pick", "gene", 1, 100, Strand::Minus)
            .with_attribute("ID", "g1")
            .with_attribute("Note", "a;b");
        assert_eq!(line.to_string(), "chr1\tpick\tgene\t1\t100\t.\t-\t.\tID=g1;Note=a%3Bb");
    }

    #[test]
    fn coding_transcript_block() {
        let mut t = test_transcript("t1", Strand::Plus, &[(100, 200), (300, 400)], &[(150, 200), (300, 350)]);
        t.parent = Some("locus1".to_string());
        let lines = transcript_lines(&t, "pick", true);
        let features: Vec<&str> = lines.iter().map(|l| l.feature.as_str()).collect();
        assert_eq!(
            features,
            vec!["mRNA", "exon", "five_prime_UTR", "CDS", "exon", "CDS", "three_prime_UTR"]
        );
        assert_eq!(lines[0].attributes["Parent"], "locus1");
        assert_eq!(lines[3].phase, Some(0));
        assert_eq!(lines[5].phase, Some(0));

        let plain = transcript_lines(&t, "pick", false);
        assert_eq!(plain[0].feature, "transcript");
        assert_eq!(plain.len(), 3);
    }
}
