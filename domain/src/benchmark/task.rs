//! Ground-truth benchmark task

use super::milestone::MilestonePredicate;
use crate::chart::ChartType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// A ground-truth insight and the keywords that identify it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightSpec {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub keywords: Vec<String>,
    /// Overrides the evaluator's default keyword fraction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_fraction: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightSet {
    pub critical: Vec<InsightSpec>,
    #[serde(default)]
    pub secondary: Vec<InsightSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneSpec {
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// Optional milestones are reported but do not count toward the ratio
    #[serde(default = "default_true")]
    pub required: bool,
    pub predicate: MilestonePredicate,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolExpectations {
    pub required: Vec<String>,
    pub recommended: Vec<String>,
    pub inapplicable: Vec<String>,
}

/// Optimal round count and the acceptable range around it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepBudget {
    pub optimal: usize,
    pub min: usize,
    pub max: usize,
}

/// A benchmark task: the ground truth one transcript is scored against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkTask {
    pub task_id: String,
    #[serde(default)]
    pub chart_type: ChartType,
    #[serde(default)]
    pub query: String,
    pub insights: InsightSet,
    #[serde(default)]
    pub milestones: Vec<MilestoneSpec>,
    /// Milestones must be satisfied in list order
    #[serde(default)]
    pub milestones_ordered: bool,
    #[serde(default)]
    pub tools: ToolExpectations,
    pub steps: StepBudget,
    /// Too few steps are penalized only when the task needs interaction
    #[serde(default = "default_true")]
    pub interaction_required: bool,
    /// Tool sequence of a known good exploration, used for path similarity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_path: Option<Vec<String>>,
}

/// A task definition that cannot be used for scoring
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedTaskError {
    #[error("task is not valid JSON: {0}")]
    Syntax(String),

    #[error("task is missing or mistyping a field: {0}")]
    Shape(String),

    #[error("task field '{field}' is invalid: {reason}")]
    InvalidField { field: String, reason: String },
}

impl MalformedTaskError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        MalformedTaskError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl BenchmarkTask {
    /// Decode and validate a task document
    pub fn from_json(text: &str) -> Result<Self, MalformedTaskError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| MalformedTaskError::Syntax(e.to_string()))?;
        let task: BenchmarkTask =
            serde_json::from_value(value).map_err(|e| MalformedTaskError::Shape(e.to_string()))?;
        task.validate()?;
        Ok(task)
    }

    pub fn validate(&self) -> Result<(), MalformedTaskError> {
        if self.task_id.trim().is_empty() {
            return Err(MalformedTaskError::invalid("task_id", "must not be empty"));
        }
        if self.insights.critical.is_empty() {
            return Err(MalformedTaskError::invalid(
                "insights.critical",
                "at least one critical insight is required",
            ));
        }

        let mut insight_ids = HashSet::new();
        let groups = [
            ("insights.critical", &self.insights.critical),
            ("insights.secondary", &self.insights.secondary),
        ];
        for (group, insights) in groups {
            for (index, insight) in insights.iter().enumerate() {
                let field = format!("{}[{}]", group, index);
                if !insight_ids.insert(insight.id.as_str()) {
                    return Err(MalformedTaskError::invalid(
                        field,
                        format!("duplicate insight id '{}'", insight.id),
                    ));
                }
                if insight.keywords.iter().all(|k| k.trim().is_empty()) {
                    return Err(MalformedTaskError::invalid(
                        format!("{}.keywords", field),
                        "at least one keyword is required",
                    ));
                }
                if let Some(fraction) = insight.min_fraction {
                    check_fraction(&format!("{}.min_fraction", field), fraction)?;
                }
            }
        }

        let mut milestone_ids = HashSet::new();
        for (index, milestone) in self.milestones.iter().enumerate() {
            let field = format!("milestones[{}]", index);
            if !milestone_ids.insert(milestone.id.as_str()) {
                return Err(MalformedTaskError::invalid(
                    field,
                    format!("duplicate milestone id '{}'", milestone.id),
                ));
            }
            milestone
                .predicate
                .validate()
                .map_err(|reason| MalformedTaskError::invalid(format!("{}.predicate", field), reason))?;
        }

        let lists = [
            ("required", &self.tools.required),
            ("recommended", &self.tools.recommended),
            ("inapplicable", &self.tools.inapplicable),
        ];
        for (i, (name_a, list_a)) in lists.iter().enumerate() {
            for (name_b, list_b) in lists.iter().skip(i + 1) {
                if let Some(shared) = list_a.iter().find(|tool| list_b.contains(tool)) {
                    return Err(MalformedTaskError::invalid(
                        "tools",
                        format!("'{}' is both {} and {}", shared, name_a, name_b),
                    ));
                }
            }
        }

        let steps = self.steps;
        if !(steps.min <= steps.optimal && steps.optimal <= steps.max) {
            return Err(MalformedTaskError::invalid(
                "steps",
                format!(
                    "expected min <= optimal <= max, got {} / {} / {}",
                    steps.min, steps.optimal, steps.max
                ),
            ));
        }

        if let Some(path) = &self.reference_path
            && path.is_empty()
        {
            return Err(MalformedTaskError::invalid("reference_path", "must not be empty"));
        }

        Ok(())
    }
}

pub(crate) fn check_fraction(field: &str, fraction: f64) -> Result<(), MalformedTaskError> {
    if fraction > 0.0 && fraction <= 1.0 {
        Ok(())
    } else {
        Err(MalformedTaskError::invalid(
            field,
            format!("must be in (0, 1], got {}", fraction),
        ))
    }
}
