//! FASTA reader for the genome used when padding transcripts.

use std::io::{BufRead, BufReader, Read};

use flate2::read::MultiGzDecoder;

use crate::error::Error;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Reads plain or gzip-compressed FASTA and returns (name, sequence) pairs.
///
/// Compression is detected from the first two bytes. The name is the first
/// whitespace-delimited token after `>`. Sequence bases are uppercased.
pub fn read_fasta<R: Read>(reader: R) -> Result<Vec<(String, Vec<u8>)>, Error> {
    let mut buf_reader = BufReader::new(reader);
    let is_gzip = buf_reader.fill_buf()?.starts_with(&GZIP_MAGIC);
    if is_gzip {
        parse_fasta(BufReader::new(MultiGzDecoder::new(buf_reader)))
    } else {
        parse_fasta(buf_reader)
    }
}

fn parse_fasta<R: BufRead>(reader: R) -> Result<Vec<(String, Vec<u8>)>, Error> {
    let mut results: Vec<(String, Vec<u8>)> = Vec::new();
    let mut current_name: Option<String> = None;
    let mut current_sequence: Vec<u8> = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if let Some(header) = line.strip_prefix('>') {
            if let Some(name) = current_name.take() {
                results.push((name, std::mem::take(&mut current_sequence)));
            }
            let name = header.split_whitespace().next().ok_or_else(|| {
                Error::Parse(format!("empty FASTA header at line {}", line_num + 1))
            })?;
            current_name = Some(name.to_string());
        } else if current_name.is_some() {
            let start = current_sequence.len();
            current_sequence.extend_from_slice(line.trim().as_bytes());
            current_sequence[start..].make_ascii_uppercase();
        } else if !line.trim().is_empty() {
            return Err(Error::Parse(format!(
                "sequence data before the first FASTA header at line {}",
                line_num + 1
            )));
        }
    }

    if let Some(name) = current_name {
        results.push((name, current_sequence));
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn make_gz(content: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn plain_multiple_sequences() {
        let fasta = b">chr1 first\nACGT\nacgt\n>chr2\nTTTT\n";
        let results = read_fasta(std::io::Cursor::new(fasta.to_vec())).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "chr1");
        assert_eq!(results[0].1, b"ACGTACGT");
        assert_eq!(results[1].1, b"TTTT");
    }

    #[test]
    fn gzip_detected_from_magic() {
        let gz = make_gz(b">Chr5\nnnACG\n");
        let results = read_fasta(std::io::Cursor::new(gz)).unwrap();
        assert_eq!(results, vec![("Chr5".to_string(), b"NNACG".to_vec())]);
    }

    #[test]
    fn empty_header_is_an_error() {
        assert!(read_fasta(std::io::Cursor::new(b">\nACGT\n".to_vec())).is_err());
        assert!(read_fasta(std::io::Cursor::new(b"ACGT\n".to_vec())).is_err());
    }
}
