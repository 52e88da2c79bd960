use std::path::Path;

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::compare::ClassCode;
use crate::scoring::expression::Expression;
use crate::scoring::rules::{MetricFilter, Operator, Rescaling, ScoringRule};
use crate::transcript::metrics;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunOptions {
    /// Drop transcripts that fail the requirements or score zero instead of
    /// reporting them as excluded.
    pub purge: bool,
    /// Build subloci from CDS introns only.
    pub subloci_from_cds_only: bool,
    /// Score every internal ORF, not only the selected one.
    pub report_all_orfs: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            purge: true,
            subloci_from_cds_only: false,
            report_all_orfs: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlternativeSplicingConfig {
    pub report: bool,
    pub max_isoforms: usize,
    /// Minimum score of an isoform relative to the primary transcript.
    pub min_score_perc: f64,
    pub max_utr_length: i32,
    pub max_fiveutr_length: i32,
    pub max_threeutr_length: i32,
    pub min_cdna_overlap: f64,
    pub min_cds_overlap: f64,
    pub only_confirmed_introns: bool,
    pub keep_retained_introns: bool,
    pub valid_ccodes: Vec<ClassCode>,
    pub redundant_ccodes: Vec<ClassCode>,
    pub pad: bool,
    pub ts_distance: i32,
    pub ts_max_splices: usize,
}

impl Default for AlternativeSplicingConfig {
    fn default() -> Self {
        Self {
            report: true,
            max_isoforms: 3,
            min_score_perc: 0.6,
            max_utr_length: 2500,
            max_fiveutr_length: 2500,
            max_threeutr_length: 2500,
            min_cdna_overlap: 0.5,
            min_cds_overlap: 0.75,
            only_confirmed_introns: true,
            keep_retained_introns: true,
            valid_ccodes: vec![
                ClassCode::SharedJunction,
                ClassCode::ExtraInternalIntrons,
                ClassCode::ContainedOverhang,
                ClassCode::MultiOverMono,
                ClassCode::MonoOverIntron,
                ClassCode::IntronOverlap,
            ],
            redundant_ccodes: vec![
                ClassCode::Contained,
                ClassCode::MonoOverlap,
                ClassCode::MonoIdentical,
                ClassCode::Identical,
                ClassCode::Extension,
            ],
            pad: false,
            ts_distance: 300,
            ts_max_splices: 1,
        }
    }
}

/// Limits above which the overlap graph is approximated.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComplexityConfig {
    pub max_nodes: usize,
    pub max_degree: usize,
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            max_nodes: 1000,
            max_degree: 1000,
        }
    }
}

/// How much homology evidence is needed before a chimera is split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Leniency {
    /// Split only when both ORFs have hits and the hits support it.
    Stringent,
    /// Also split when neither ORF has hits.
    #[default]
    Lenient,
    /// Also split when only one ORF has hits.
    Permissive,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlastParams {
    pub evalue: f64,
    pub hsp_evalue: f64,
    pub max_target_seqs: usize,
    pub minimal_hsp_overlap: f64,
    pub min_overlap_duplication: f64,
    pub leniency: Leniency,
}

impl Default for BlastParams {
    fn default() -> Self {
        Self {
            evalue: 1e-6,
            hsp_evalue: 1e-6,
            max_target_seqs: 3,
            minimal_hsp_overlap: 0.5,
            min_overlap_duplication: 0.8,
            leniency: Leniency::Lenient,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChimeraSplitConfig {
    pub execute: bool,
    pub blast_check: bool,
    pub blast_params: BlastParams,
}

impl Default for ChimeraSplitConfig {
    fn default() -> Self {
        Self {
            execute: true,
            blast_check: true,
            blast_params: BlastParams::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrepareConfig {
    /// Source labels, in priority order.
    pub labels: Vec<String>,
    /// Minimum cDNA length of an input transcript.
    pub min_length: i32,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            labels: Vec::new(),
            min_length: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PickConfig {
    pub run_options: RunOptions,
    pub scoring: IndexMap<String, ScoringRule>,
    pub requirements: Option<Expression>,
    pub not_fragmentary: Option<Expression>,
    pub source_scores: IndexMap<String, f64>,
    pub alternative_splicing: AlternativeSplicingConfig,
    pub complexity: ComplexityConfig,
    pub chimera_split: ChimeraSplitConfig,
    pub prepare: PrepareConfig,
}

impl Default for PickConfig {
    fn default() -> Self {
        Self {
            run_options: RunOptions::default(),
            scoring: default_scoring(),
            requirements: None,
            not_fragmentary: None,
            source_scores: IndexMap::new(),
            alternative_splicing: AlternativeSplicingConfig::default(),
            complexity: ComplexityConfig::default(),
            chimera_split: ChimeraSplitConfig::default(),
            prepare: PrepareConfig::default(),
        }
    }
}

fn default_scoring() -> IndexMap<String, ScoringRule> {
    let utr_cap = |operator| MetricFilter {
        operator,
        value: 2500.0,
        metric: None,
    };
    let mut five_utr = ScoringRule::new(Rescaling::Target).with_target(100.0);
    five_utr.filter = Some(utr_cap(Operator::Le));
    let mut three_utr = ScoringRule::new(Rescaling::Target).with_target(200.0);
    three_utr.filter = Some(utr_cap(Operator::Le));

    [
        ("cdna_length", ScoringRule::new(Rescaling::Max)),
        ("selected_cds_length", ScoringRule::new(Rescaling::Max).with_multiplier(2.0)),
        ("selected_cds_fraction", ScoringRule::new(Rescaling::Target).with_target(0.8)),
        ("cds_not_maximal", ScoringRule::new(Rescaling::Min)),
        ("is_complete", ScoringRule::new(Rescaling::Target).with_target(1.0)),
        ("number_internal_orfs", ScoringRule::new(Rescaling::Target).with_target(1.0)),
        ("proportion_verified_introns", ScoringRule::new(Rescaling::Max).with_multiplier(2.0)),
        ("proportion_verified_introns_inlocus", ScoringRule::new(Rescaling::Max)),
        ("exon_num", ScoringRule::new(Rescaling::Max)),
        ("five_utr_length", five_utr),
        ("three_utr_length", three_utr),
        ("end_distance_from_junction", ScoringRule::new(Rescaling::Min)),
        ("retained_fraction", ScoringRule::new(Rescaling::Min)),
        ("best_bits", ScoringRule::new(Rescaling::Max)),
    ]
    .into_iter()
    .map(|(name, rule)| (name.to_string(), rule))
    .collect()
}

impl PickConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, rule) in &self.scoring {
            if !metrics::is_known_metric(name) {
                bail!("unknown metric in scoring: '{name}'");
            }
            if rule.rescaling == Rescaling::Target && rule.value.is_none() {
                bail!("scoring rule '{name}' uses target rescaling without a value");
            }
            if let Some(filter) = &rule.filter
                && let Some(metric) = &filter.metric
                && !metrics::is_known_metric(metric)
            {
                bail!("unknown metric '{metric}' in the filter of scoring rule '{name}'");
            }
        }

        let splicing = &self.alternative_splicing;
        let blast = &self.chimera_split.blast_params;
        for (name, value) in [
            ("alternativeSplicing.minScorePerc", splicing.min_score_perc),
            ("alternativeSplicing.minCdnaOverlap", splicing.min_cdna_overlap),
            ("alternativeSplicing.minCdsOverlap", splicing.min_cds_overlap),
            ("chimeraSplit.blastParams.minimalHspOverlap", blast.minimal_hsp_overlap),
            ("chimeraSplit.blastParams.minOverlapDuplication", blast.min_overlap_duplication),
        ] {
            validate_fraction(name, value)?;
        }
        if splicing.max_isoforms == 0 {
            bail!("alternativeSplicing.maxIsoforms must be at least 1");
        }
        if self.complexity.max_nodes == 0 || self.complexity.max_degree == 0 {
            bail!("complexity limits must be positive");
        }
        Ok(())
    }

    /// Additive score for a source label; zero when not configured.
    #[must_use]
    pub fn source_score(&self, source: &str) -> f64 {
        self.source_scores.get(source).copied().unwrap_or(0.0)
    }
}

fn validate_fraction(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        bail!("invalid value for '{name}': expected a fraction between 0 and 1, got {value}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(json: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(json.as_bytes()).unwrap();
        f
    }

    #[test]
    fn defaults_are_valid() {
        let config = PickConfig::default();
        config.validate().unwrap();
        assert!(config.run_options.purge);
        assert_eq!(config.chimera_split.blast_params.leniency, Leniency::Lenient);
        assert!(config.alternative_splicing.valid_ccodes.contains(&ClassCode::ExtraInternalIntrons));
    }

    #[test]
    fn valid_config_all_sections() {
        let json = r#"{
            "runOptions": { "purge": false },
            "scoring": {
                "cdna_length": { "rescaling": "max" },
                "five_utr_length": { "rescaling": "target", "value": 100, "filter": { "operator": "le", "value": 2500 } }
            },
            "requirements": "exon_num > 1 or cdna_length >= 500",
            "sourceScores": { "stringtie": 1.5 },
            "alternativeSplicing": { "maxIsoforms": 5, "validCcodes": ["j", "J"], "pad": true },
            "complexity": { "maxNodes": 50 },
            "chimeraSplit": { "blastParams": { "leniency": "PERMISSIVE" } },
            "prepare": { "labels": ["st", "cl"], "minLength": 100 }
        }"#;
        let f = write_config(json);
        let config = PickConfig::from_file(f.path()).unwrap();
        assert!(!config.run_options.purge);
        assert!(config.run_options.report_all_orfs);
        assert_eq!(config.scoring.len(), 2);
        assert_eq!(config.scoring["five_utr_length"].value, Some(100.0));
        assert!(config.requirements.is_some());
        assert_eq!(config.source_score("stringtie"), 1.5);
        assert_eq!(config.source_score("other"), 0.0);
        assert_eq!(config.alternative_splicing.max_isoforms, 5);
        assert_eq!(config.alternative_splicing.max_utr_length, 2500);
        assert_eq!(config.complexity.max_nodes, 50);
        assert_eq!(config.complexity.max_degree, 1000);
        assert_eq!(config.chimera_split.blast_params.leniency, Leniency::Permissive);
        assert_eq!(config.prepare.labels, vec!["st", "cl"]);
    }

    #[test]
    fn unknown_scoring_metric() {
        let f = write_config(r#"{ "scoring": { "exon_count": { "rescaling": "max" } } }"#);
        let err = PickConfig::from_file(f.path()).unwrap_err();
        assert!(err.to_string().contains("unknown metric"));
    }

    #[test]
    fn target_without_value() {
        let f = write_config(r#"{ "scoring": { "cdna_length": { "rescaling": "target" } } }"#);
        let err = PickConfig::from_file(f.path()).unwrap_err();
        assert!(err.to_string().contains("without a value"));
    }

    #[test]
    fn fraction_out_of_range() {
        let f = write_config(r#"{ "alternativeSplicing": { "minCdnaOverlap": 1.5 } }"#);
        let err = PickConfig::from_file(f.path()).unwrap_err();
        assert!(err.to_string().contains("minCdnaOverlap"));
    }

    #[test]
    fn malformed_requirement_expression() {
        let f = write_config(r#"{ "requirements": "exon_num >" }"#);
        let err = PickConfig::from_file(f.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
    }

    #[test]
    fn zero_isoforms_rejected() {
        let f = write_config(r#"{ "alternativeSplicing": { "maxIsoforms": 0 } }"#);
        assert!(PickConfig::from_file(f.path()).is_err());
    }
}
