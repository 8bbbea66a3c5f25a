//! Type definitions for the RunExploration use case.

use crate::ports::decision_model::ChartImage;
use chartscout_domain::{ChartType, SessionError};
use serde_json::Value;
use thiserror::Error;

/// Errors that prevent an exploration from starting
///
/// Once a session is running, every outcome (including model failure and
/// cancellation) is reported through the transcript's termination state.
#[derive(Error, Debug)]
pub enum ExplorationError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid chart specification: {0}")]
    InvalidChart(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Input for one exploration session
#[derive(Debug, Clone)]
pub struct RunExplorationInput {
    pub query: String,
    /// Vega-Lite specification of the chart
    pub spec: Value,
    /// Overrides detection from the specification
    pub chart_type: Option<ChartType>,
    pub task_id: Option<String>,
    pub image: Option<ChartImage>,
}

impl RunExplorationInput {
    pub fn new(query: impl Into<String>, spec: Value) -> Self {
        Self {
            query: query.into(),
            spec,
            chart_type: None,
            task_id: None,
            image: None,
        }
    }

    pub fn with_chart_type(mut self, chart_type: ChartType) -> Self {
        self.chart_type = Some(chart_type);
        self
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_image(mut self, image: ChartImage) -> Self {
        self.image = Some(image);
        self
    }

    /// Explicit chart type, or the one detected from the specification
    pub fn resolved_chart_type(&self) -> ChartType {
        self.chart_type.unwrap_or_else(|| ChartType::detect(&self.spec))
    }
}

/// Why a round produced no decision
#[derive(Debug)]
pub(super) enum DecisionFailure {
    Cancelled,
    Exhausted(String),
}
