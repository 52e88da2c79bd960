//! Scoring rules: how one metric is rescaled into a sub-score.

use std::fmt;

use serde::Deserialize;

/// How raw metric values are mapped onto [0, 1] before applying the multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rescaling {
    /// Highest value scores 1.
    Max,
    /// Lowest value scores 1.
    Min,
    /// Value closest to the rule's `value` scores 1.
    Target,
    /// Share of other candidates with a strictly lower value.
    Percentile,
}

/// Comparison operator shared by rule filters and requirement expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    #[must_use]
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Eq => (lhs - rhs).abs() < f64::EPSILON,
            Self::Ne => (lhs - rhs).abs() >= f64::EPSILON,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        };
        write!(f, "{symbol}")
    }
}

/// Restricts a rule to candidates whose metric (by default the rule's own) passes a comparison.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricFilter {
    pub operator: Operator,
    pub value: f64,
    #[serde(default)]
    pub metric: Option<String>,
}

fn default_multiplier() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRule {
    pub rescaling: Rescaling,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default)]
    pub filter: Option<MetricFilter>,
}

impl ScoringRule {
    #[must_use]
    pub fn new(rescaling: Rescaling) -> Self {
        Self {
            rescaling,
            value: None,
            multiplier: 1.0,
            filter: None,
        }
    }

    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    #[must_use]
    pub fn with_target(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Rescale `values`; candidates with `passes[i] == false` score 0 and do
    /// not take part in normalization. Scores are multiplied and rounded to
    /// two decimals.
    #[must_use]
    pub fn rescale(&self, values: &[f64], passes: &[bool]) -> Vec<f64> {
        let eligible: Vec<f64> = values
            .iter()
            .zip(passes)
            .filter(|&(_, &ok)| ok)
            .map(|(&v, _)| v)
            .collect();
        if eligible.is_empty() {
            return vec![0.0; values.len()];
        }
        let min = eligible.iter().copied().fold(f64::INFINITY, f64::min);
        let max = eligible.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let target = self.value.unwrap_or(0.0);
        let target_denominator = eligible
            .iter()
            .map(|v| (v - target).abs())
            .fold(0.0, f64::max);

        values
            .iter()
            .zip(passes)
            .map(|(&x, &ok)| {
                if !ok {
                    return 0.0;
                }
                let scaled = match self.rescaling {
                    Rescaling::Max | Rescaling::Min if max == min => 1.0,
                    Rescaling::Max => (x - min) / (max - min),
                    Rescaling::Min => 1.0 - (x - min) / (max - min),
                    Rescaling::Target if target_denominator == 0.0 => 1.0,
                    Rescaling::Target => 1.0 - (x - target).abs() / target_denominator,
                    Rescaling::Percentile if eligible.len() == 1 => 1.0,
                    Rescaling::Percentile => {
                        let lower = eligible.iter().filter(|&&v| v < x).count();
                        lower as f64 / (eligible.len() - 1) as f64
                    }
                };
                round2(scaled * self.multiplier)
            })
            .collect()
    }
}

/// Round to two decimals.
#[must_use]
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
