//! Evaluator configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Weight of each dimension in the total. Must sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub insight: f64,
    pub path: f64,
    pub tool_usage: f64,
    pub efficiency: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            insight: 0.40,
            path: 0.25,
            tool_usage: 0.20,
            efficiency: 0.15,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.insight + self.path + self.tool_usage + self.efficiency
    }

    fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("insight", self.insight),
            ("path", self.path),
            ("tool_usage", self.tool_usage),
            ("efficiency", self.efficiency),
        ]
    }
}

/// Lower bounds of the verdict bands: `0 < pass < good < excellent <= 100`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictThresholds {
    pub excellent: f64,
    pub good: f64,
    pub pass: f64,
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        Self {
            excellent: 85.0,
            good: 70.0,
            pass: 60.0,
        }
    }
}

/// Scoring knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub weights: ScoreWeights,
    pub thresholds: VerdictThresholds,
    /// Keyword fraction for insights that do not set their own
    pub default_min_fraction: f64,
    /// Secondary insights needed for full depth credit
    pub depth_cap: usize,
    /// Tool-usage ceiling when a required tool is missing
    pub required_tool_ceiling: f64,
    /// Score the final answer as one more claim
    pub include_final_answer: bool,
    /// Efficiency points lost per consecutive repeated call
    pub redundancy_penalty: f64,
    /// Tool-usage points lost per call to an inapplicable tool
    pub inapplicable_penalty: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            thresholds: VerdictThresholds::default(),
            default_min_fraction: 0.5,
            depth_cap: 2,
            required_tool_ceiling: 30.0,
            include_final_answer: true,
            redundancy_penalty: 10.0,
            inapplicable_penalty: 15.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationConfigError {
    #[error("weights must sum to 1, got {0}")]
    WeightSum(f64),

    #[error("weight '{0}' must not be negative")]
    NegativeWeight(&'static str),

    #[error("thresholds must satisfy 0 < pass < good < excellent <= 100, got {pass} / {good} / {excellent}")]
    Thresholds { pass: f64, good: f64, excellent: f64 },

    #[error("{name} is out of range: {reason}")]
    OutOfRange { name: &'static str, reason: String },
}

impl EvaluationConfig {
    pub fn validate(&self) -> Result<(), EvaluationConfigError> {
        for (name, weight) in self.weights.named() {
            if weight < 0.0 || !weight.is_finite() {
                return Err(EvaluationConfigError::NegativeWeight(name));
            }
        }
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(EvaluationConfigError::WeightSum(sum));
        }

        let t = self.thresholds;
        if !(0.0 < t.pass && t.pass < t.good && t.good < t.excellent && t.excellent <= 100.0) {
            return Err(EvaluationConfigError::Thresholds {
                pass: t.pass,
                good: t.good,
                excellent: t.excellent,
            });
        }

        if !(self.default_min_fraction > 0.0 && self.default_min_fraction <= 1.0) {
            return Err(EvaluationConfigError::OutOfRange {
                name: "default_min_fraction",
                reason: format!("must be in (0, 1], got {}", self.default_min_fraction),
            });
        }
        if self.depth_cap == 0 {
            return Err(EvaluationConfigError::OutOfRange {
                name: "depth_cap",
                reason: "must be at least 1".to_string(),
            });
        }
        let percent_knobs = [
            ("required_tool_ceiling", self.required_tool_ceiling),
            ("redundancy_penalty", self.redundancy_penalty),
            ("inapplicable_penalty", self.inapplicable_penalty),
        ];
        for (name, value) in percent_knobs {
            if !(0.0..=100.0).contains(&value) {
                return Err(EvaluationConfigError::OutOfRange {
                    name,
                    reason: format!("must be in [0, 100], got {}", value),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = EvaluationConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.weights.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut config = EvaluationConfig::default();
        config.weights.insight = 0.5;
        assert!(matches!(config.validate(), Err(EvaluationConfigError::WeightSum(_))));
    }

    #[test]
    fn test_thresholds_must_be_ordered() {
        let mut config = EvaluationConfig::default();
        config.thresholds.good = 90.0;
        assert!(matches!(config.validate(), Err(EvaluationConfigError::Thresholds { .. })));

        config.thresholds = VerdictThresholds {
            excellent: 85.0,
            good: 70.0,
            pass: 0.0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_like_override() {
        let config: EvaluationConfig =
            serde_json::from_value(serde_json::json!({"depth_cap": 3})).unwrap();
        assert_eq!(config.depth_cap, 3);
        assert_eq!(config.weights, ScoreWeights::default());
    }
}
