//! Score report

use super::config::{ScoreWeights, VerdictThresholds};
use super::matching::DepthLevel;
use serde::{Deserialize, Serialize};

/// Categorical verdict derived from the weighted total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Excellent,
    Good,
    Pass,
    Fail,
}

impl Verdict {
    pub fn from_total(total: f64, thresholds: &VerdictThresholds) -> Verdict {
        if total >= thresholds.excellent {
            Verdict::Excellent
        } else if total >= thresholds.good {
            Verdict::Good
        } else if total >= thresholds.pass {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Excellent => "Excellent",
            Verdict::Good => "Good",
            Verdict::Pass => "Pass",
            Verdict::Fail => "Fail",
        }
    }

    pub fn is_passing(&self) -> bool {
        !matches!(self, Verdict::Fail)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The four dimension scores, each in `[0, 100]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub insight: f64,
    pub path: f64,
    pub tool_usage: f64,
    pub efficiency: f64,
}

impl SubScores {
    pub fn weighted_total(&self, weights: &ScoreWeights) -> f64 {
        self.insight * weights.insight
            + self.path * weights.path
            + self.tool_usage * weights.tool_usage
            + self.efficiency * weights.efficiency
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightAudit {
    pub matched_critical: Vec<String>,
    pub missing_critical: Vec<String>,
    pub matched_secondary: Vec<String>,
    pub missing_secondary: Vec<String>,
    pub recall: f64,
    pub precision: f64,
    pub depth: f64,
    /// Claims long enough to be scored
    pub claims: usize,
    /// Claims that match at least one ground-truth insight
    pub matched_claims: usize,
    /// Reasoning depth of each scored claim, in claim order
    pub depth_levels: Vec<DepthLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathAudit {
    pub satisfied_milestones: Vec<String>,
    pub unsatisfied_milestones: Vec<String>,
    /// Satisfied required milestones / required milestones
    pub milestone_ratio: f64,
    pub rounds: usize,
    pub step_efficiency: f64,
    /// LCS of the tool sequence and the reference path, over the reference length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_similarity: Option<f64>,
    /// Deductions for calls that repeat an already known result or failure
    #[serde(default)]
    pub reasoning_coherence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUsageAudit {
    pub missing_required: Vec<String>,
    pub recommended_used: Vec<String>,
    /// Positions of calls to inapplicable tools
    pub inapplicable_calls: Vec<usize>,
    /// Calls rejected by the executor (unknown tool or invalid arguments)
    pub invalid_calls: usize,
    pub coverage: f64,
    pub validity: f64,
    /// Whether the missing-required-tool ceiling was applied
    pub capped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyAudit {
    /// Positions of calls that repeat the immediately preceding call
    pub redundant_calls: Vec<usize>,
    pub redundancy_penalty: f64,
}

/// Result of scoring one transcript against one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub task_id: String,
    pub session_id: String,
    pub scores: SubScores,
    pub weights: ScoreWeights,
    pub total: f64,
    pub verdict: Verdict,
    pub insights: InsightAudit,
    pub path: PathAudit,
    pub tool_usage: ToolUsageAudit,
    pub efficiency: EfficiencyAudit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_bands() {
        let t = VerdictThresholds::default();
        assert_eq!(Verdict::from_total(85.0, &t), Verdict::Excellent);
        assert_eq!(Verdict::from_total(84.99, &t), Verdict::Good);
        assert_eq!(Verdict::from_total(70.0, &t), Verdict::Good);
        assert_eq!(Verdict::from_total(69.9, &t), Verdict::Pass);
        assert_eq!(Verdict::from_total(60.0, &t), Verdict::Pass);
        assert_eq!(Verdict::from_total(59.9, &t), Verdict::Fail);
        assert!(!Verdict::Fail.is_passing());
    }

    #[test]
    fn test_weighted_total() {
        let scores = SubScores {
            insight: 100.0,
            path: 50.0,
            tool_usage: 0.0,
            efficiency: 100.0,
        };
        let total = scores.weighted_total(&ScoreWeights::default());
        assert!((total - (40.0 + 12.5 + 0.0 + 15.0)).abs() < 1e-9);
    }

    #[test]
    fn test_verdict_serializes_as_string() {
        assert_eq!(serde_json::to_value(Verdict::Good).unwrap(), "Good");
    }
}
