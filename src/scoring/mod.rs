//! Scoring: turns per-transcript metrics into scores, either through the
//! configured weighted rules or through an external [`Regressor`].

pub mod expression;
pub mod rules;

use std::collections::BTreeMap;

use crate::config::PickConfig;
use crate::context::PickContext;
use crate::error::Error;
use crate::transcript::metrics::{MetricLookup, MetricSet};

use rules::round2;

/// Name of the total score entry in a [`ScoreTable`] row.
pub const TOTAL: &str = "score";
/// Name of the source bonus entry.
pub const SOURCE_SCORE: &str = "source_score";

/// Black-box predictor used instead of the weighted rules.
pub trait Regressor {
    /// Metric names, in the column order expected by [`Regressor::predict`].
    fn metrics(&self) -> &[String];

    /// One score per row.
    fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64>;
}

/// Metrics of one scoring candidate.
#[derive(Debug, Clone)]
pub struct ScoreInput {
    pub id: String,
    pub source: String,
    pub metrics: MetricSet,
    /// Alternative-ORF clone: takes part in normalization, never published.
    pub transient: bool,
}

/// Per-transcript sub-scores plus the [`TOTAL`] entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreTable(BTreeMap<String, BTreeMap<String, f64>>);

impl ScoreTable {
    #[must_use]
    pub fn row(&self, tid: &str) -> Option<&BTreeMap<String, f64>> {
        self.0.get(tid)
    }

    #[must_use]
    pub fn total(&self, tid: &str) -> Option<f64> {
        self.0.get(tid).and_then(|row| row.get(TOTAL)).copied()
    }

    pub fn insert(&mut self, tid: &str, row: BTreeMap<String, f64>) {
        self.0.insert(tid.to_string(), row);
    }

    pub fn remove(&mut self, tid: &str) -> Option<BTreeMap<String, f64>> {
        self.0.remove(tid)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, f64>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Score every candidate. Transient rows are dropped from the result.
pub fn score(inputs: &[ScoreInput], ctx: &PickContext) -> Result<ScoreTable, Error> {
    let mut table = match &ctx.regressor {
        Some(regressor) => score_with_regressor(inputs, regressor.as_ref())?,
        None => score_with_rules(inputs, &ctx.config)?,
    };
    for input in inputs.iter().filter(|i| i.transient) {
        table.remove(&input.id);
    }
    Ok(table)
}

fn metric_value(input: &ScoreInput, name: &str) -> Result<f64, Error> {
    input
        .metrics
        .metric(name)
        .map(|v| v.as_f64())
        .ok_or_else(|| Error::Validation(format!("{}: metric '{name}' unavailable", input.id)))
}

fn score_with_rules(inputs: &[ScoreInput], config: &PickConfig) -> Result<ScoreTable, Error> {
    let mut rows: Vec<BTreeMap<String, f64>> = vec![BTreeMap::new(); inputs.len()];

    for (name, rule) in &config.scoring {
        let values = inputs
            .iter()
            .map(|input| metric_value(input, name))
            .collect::<Result<Vec<_>, _>>()?;
        let passes = match &rule.filter {
            None => vec![true; inputs.len()],
            Some(filter) => {
                let metric = filter.metric.as_deref().unwrap_or(name);
                inputs
                    .iter()
                    .map(|input| Ok(filter.operator.apply(metric_value(input, metric)?, filter.value)))
                    .collect::<Result<Vec<_>, Error>>()?
            }
        };
        for (row, value) in rows.iter_mut().zip(rule.rescale(&values, &passes)) {
            row.insert(name.clone(), value);
        }
    }

    let mut table = ScoreTable::default();
    for (input, mut row) in inputs.iter().zip(rows) {
        row.insert(SOURCE_SCORE.to_string(), round2(config.source_score(&input.source)));
        if let Some(requirements) = &config.requirements
            && !requirements.evaluate(&input.metrics)?
        {
            log::debug!("{} fails the requirements; zeroing its scores", input.id);
            row.values_mut().for_each(|v| *v = 0.0);
        }
        let total = round2(row.values().sum());
        row.insert(TOTAL.to_string(), total);
        table.insert(&input.id, row);
    }
    Ok(table)
}

fn score_with_regressor(inputs: &[ScoreInput], regressor: &dyn Regressor) -> Result<ScoreTable, Error> {
    let rows = inputs
        .iter()
        .map(|input| {
            regressor
                .metrics()
                .iter()
                .map(|name| metric_value(input, name))
                .collect::<Result<Vec<f64>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;
    let predictions = regressor.predict(&rows);
    if predictions.len() != inputs.len() {
        return Err(Error::Validation(format!(
            "regressor returned {} scores for {} transcripts",
            predictions.len(),
            inputs.len()
        )));
    }
    let mut table = ScoreTable::default();
    for (input, prediction) in inputs.iter().zip(predictions) {
        table.insert(&input.id, BTreeMap::from([(TOTAL.to_string(), prediction)]));
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::expression::Expression;
    use crate::scoring::rules::{Rescaling, ScoringRule};
    use crate::strand::Strand;
    use crate::transcript::{metrics, test_transcript};
    use indexmap::IndexMap;
    use std::sync::Arc;

    fn input(id: &str, exons: &[(i32, i32)], cds: &[(i32, i32)]) -> ScoreInput {
        let t = test_transcript(id, Strand::Plus, exons, cds);
        ScoreInput {
            id: id.to_string(),
            source: "st".to_string(),
            metrics: metrics::collect(&t),
            transient: false,
        }
    }

    fn inputs() -> Vec<ScoreInput> {
        vec![
            input("a", &[(100, 200), (300, 400)], &[(150, 200), (300, 350)]),
            input("b", &[(100, 200), (300, 500)], &[]),
            input("c", &[(100, 400)], &[(101, 400)]),
        ]
    }

    fn context(scoring: IndexMap<String, ScoringRule>) -> PickContext {
        let mut config = PickConfig {
            scoring,
            ..PickConfig::default()
        };
        config.source_scores.insert("st".to_string(), 0.5);
        PickContext::new(config)
    }

    #[test]
    fn sub_scores_sum_to_total() {
        let table = score(&inputs(), &PickContext::new(PickConfig::default())).unwrap();
        assert_eq!(table.len(), 3);
        for (tid, row) in table.iter() {
            let sum: f64 = row.iter().filter(|(k, _)| *k != TOTAL).map(|(_, v)| v).sum();
            assert_eq!(round2(sum), table.total(tid).unwrap(), "{tid}");
        }
    }

    #[test]
    fn max_and_min_rules() {
        let scoring = IndexMap::from([
            ("cdna_length".to_string(), ScoringRule::new(Rescaling::Max)),
            ("exon_num".to_string(), ScoringRule::new(Rescaling::Min).with_multiplier(2.0)),
        ]);
        let table = score(&inputs(), &context(scoring)).unwrap();
        let b = table.row("b").unwrap();
        assert_eq!(b["cdna_length"], 1.0);
        assert_eq!(b["exon_num"], 0.0);
        assert_eq!(b[SOURCE_SCORE], 0.5);
        assert_eq!(table.total("b"), Some(1.5));
        assert_eq!(table.row("c").unwrap()["exon_num"], 2.0);
    }

    #[test]
    fn failing_requirements_zero_everything() {
        let mut ctx = context(IndexMap::from([(
            "cdna_length".to_string(),
            ScoringRule::new(Rescaling::Max),
        )]));
        Arc::make_mut(&mut ctx.config).requirements = Some(Expression::parse("exon_num > 1").unwrap());
        let table = score(&inputs(), &ctx).unwrap();
        assert_eq!(table.total("c"), Some(0.0));
        assert!(table.row("c").unwrap().values().all(|v| *v == 0.0));
        assert!(table.total("b").unwrap() > 0.0);
    }

    #[test]
    fn transient_rows_normalize_but_are_not_published() {
        let scoring = IndexMap::from([("cdna_length".to_string(), ScoringRule::new(Rescaling::Max))]);
        let mut rows = inputs();
        let mut clone = input("b.orf2", &[(1, 1000)], &[]);
        clone.transient = true;
        rows.push(clone);
        let table = score(&rows, &context(scoring)).unwrap();
        assert!(table.row("b.orf2").is_none());
        assert!(table.row("b").unwrap()["cdna_length"] < 1.0);
    }

    #[test]
    fn unknown_metric_is_an_error() {
        let mut rows = inputs();
        rows[0].metrics = MetricSet::default();
        let scoring = IndexMap::from([("cdna_length".to_string(), ScoringRule::new(Rescaling::Max))]);
        assert!(matches!(score(&rows, &context(scoring)), Err(Error::Validation(_))));
    }

    struct Length(Vec<String>, bool);

    impl Regressor for Length {
        fn metrics(&self) -> &[String] {
            &self.0
        }

        fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
            let mut out: Vec<f64> = rows.iter().map(|r| r[0] / 1000.0).collect();
            if self.1 {
                out.pop();
            }
            out
        }
    }

    #[test]
    fn regressor_scores() {
        let ctx = PickContext::new(PickConfig::default())
            .with_regressor(Arc::new(Length(vec!["cdna_length".to_string()], false)));
        let table = score(&inputs(), &ctx).unwrap();
        assert_eq!(table.total("c"), Some(0.301));

        let broken = PickContext::new(PickConfig::default())
            .with_regressor(Arc::new(Length(vec!["cdna_length".to_string()], true)));
        assert!(matches!(score(&inputs(), &broken), Err(Error::Validation(_))));
    }
}
