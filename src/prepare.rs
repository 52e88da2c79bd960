//! Ingestion of raw transcript records: label prefixing, name collision
//! checks, length filtering and collapsing of identical models.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::Error;
use crate::interval::Interval;
use crate::strand::Strand;
use crate::transcript::Transcript;
use crate::transcript::types::TranscriptRecord;

/// Build the transcripts of one input assembly.
///
/// With a non-empty `label` every id is prefixed `{label}_` and the label
/// becomes the source. Records that cannot be built or are shorter than
/// `min_length` cDNA bases are dropped.
pub fn prepare_records(
    records: impl IntoIterator<Item = TranscriptRecord>,
    label: &str,
    min_length: i32,
) -> Result<Vec<Transcript>, Error> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut transcripts = Vec::new();
    let mut total = 0usize;

    for mut record in records {
        total += 1;
        if !label.is_empty() {
            record.id = format!("{label}_{}", record.id);
            record.source = label.to_string();
        }
        if !seen.insert(record.id.clone()) {
            return Err(Error::RedundantNames(if label.is_empty() {
                record.id
            } else {
                format!("{} (label: {label})", record.id)
            }));
        }

        let length: i32 = record.exons.iter().map(Interval::len).sum();
        if length < min_length {
            log::debug!("{}: cDNA length {length} below {min_length}, discarded", record.id);
            continue;
        }
        match Transcript::from_record(&record) {
            Ok(transcript) => transcripts.push(transcript),
            Err(e) => log::warn!("{}: discarded: {e}", record.id),
        }
    }

    if total > 0 && transcripts.is_empty() {
        let name = if label.is_empty() { "input" } else { label };
        return Err(Error::InvalidAssembly(format!("no usable transcript in {name} ({total} records)")));
    }
    log::info!("{}: kept {} of {total} transcripts", if label.is_empty() { "input" } else { label }, transcripts.len());
    Ok(transcripts)
}

/// Concatenate prepared assemblies; an id present in two of them is an error.
pub fn merge_assemblies(assemblies: Vec<Vec<Transcript>>) -> Result<Vec<Transcript>, Error> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut merged = Vec::new();
    for transcript in assemblies.into_iter().flatten() {
        if !seen.insert(transcript.id.clone()) {
            return Err(Error::RedundantNames(format!(
                "{} appears in more than one assembly; use distinct labels",
                transcript.id
            )));
        }
        merged.push(transcript);
    }
    Ok(merged)
}

type Structure = (String, Strand, i32, i32, Vec<Interval>);

/// Collapse transcripts with the same chromosome, strand, span and exon
/// chain, keeping the lexicographically smallest id of each group.
pub fn deduplicate(transcripts: Vec<Transcript>) -> Vec<Transcript> {
    let mut groups: BTreeMap<Structure, Transcript> = BTreeMap::new();
    let mut order: Vec<Structure> = Vec::new();
    for transcript in transcripts {
        let mut exons = transcript.exons().to_vec();
        exons.sort();
        let key = (transcript.chrom.clone(), transcript.strand, transcript.start, transcript.end, exons);
        match groups.get_mut(&key) {
            Some(kept) if transcript.id < kept.id => {
                log::debug!("{} is identical to {}; keeping the former", transcript.id, kept.id);
                *kept = transcript;
            }
            Some(kept) => log::debug!("{} is identical to {}; keeping the latter", transcript.id, kept.id),
            None => {
                order.push(key.clone());
                groups.insert(key, transcript);
            }
        }
    }
    order.into_iter().filter_map(|key| groups.remove(&key)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, exons: &[(i32, i32)]) -> TranscriptRecord {
        TranscriptRecord {
            id: id.to_string(),
            chrom: "chr1".to_string(),
            strand: Strand::Plus,
            start: exons.iter().map(|e| e.0).min().unwrap(),
            end: exons.iter().map(|e| e.1).max().unwrap(),
            source: "asm".to_string(),
            exons: exons.iter().map(|&e| Interval::from(e)).collect(),
            cds: Vec::new(),
            cds_phases: Vec::new(),
            utr: Vec::new(),
            parent: None,
            attributes: Default::default(),
            score: None,
        }
    }

    #[test]
    fn labels_prefix_ids() {
        let prepared = prepare_records(vec![record("t1", &[(100, 400)])], "st", 0).unwrap();
        assert_eq!(prepared[0].id, "st_t1");
        assert_eq!(prepared[0].source, "st");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let records = vec![record("t1", &[(100, 400)]), record("t1", &[(500, 900)])];
        assert!(matches!(prepare_records(records, "", 0), Err(Error::RedundantNames(_))));

        let a = prepare_records(vec![record("t1", &[(100, 400)])], "", 0).unwrap();
        let b = prepare_records(vec![record("t1", &[(100, 400)])], "", 0).unwrap();
        assert!(matches!(merge_assemblies(vec![a, b]), Err(Error::RedundantNames(_))));
    }

    #[test]
    fn short_transcripts_are_filtered() {
        let records = vec![record("short", &[(100, 150)]), record("long", &[(100, 400)])];
        let prepared = prepare_records(records, "", 200).unwrap();
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0].id, "long");

        let records = vec![record("short", &[(100, 150)])];
        assert!(matches!(prepare_records(records, "", 200), Err(Error::InvalidAssembly(_))));
        assert!(prepare_records(Vec::new(), "", 200).unwrap().is_empty());
    }

    #[test]
    fn identical_models_keep_the_smallest_id() {
        let records = vec![
            record("zeta", &[(100, 200), (300, 400)]),
            record("alpha", &[(100, 200), (300, 400)]),
            record("other", &[(100, 200), (350, 400)]),
        ];
        let prepared = deduplicate(prepare_records(records, "", 0).unwrap());
        let ids: Vec<&str> = prepared.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "other"]);
    }
}
