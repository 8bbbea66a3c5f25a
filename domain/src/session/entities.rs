//! Exploration session entity and its state machine

use crate::chart::{ChartState, ChartType};
use crate::tool::entities::{ToolCall, ToolCategory, ToolDescriptor};
use crate::tool::history::CallHistory;
use crate::tool::value_objects::ExecutionRecord;
use crate::transcript::{TerminationState, Transcript, TranscriptCall};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::LazyLock;
use thiserror::Error;

/// Session-level tool that restores the chart the session started from
pub const RESET_VIEW_TOOL: &str = "reset_view";

static RESET_VIEW: LazyLock<ToolDescriptor> = LazyLock::new(|| {
    ToolDescriptor::new(
        RESET_VIEW_TOOL,
        ToolCategory::Action,
        "Undo every view change and return to the original chart",
    )
});

/// Descriptor of [`RESET_VIEW_TOOL`], offered for every chart type
pub fn reset_view_descriptor() -> &'static ToolDescriptor {
    &RESET_VIEW
}

/// Lifecycle of a session.
///
/// ```text
/// Init ──▶ Running ──▶ Completed
///   │         ├──────▶ MaxRoundsExceeded
///   └─────────┴──────▶ Aborted
/// ```
///
/// The three terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Init,
    Running,
    Completed,
    Aborted,
    MaxRoundsExceeded,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Aborted | SessionStatus::MaxRoundsExceeded
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Init => "init",
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Aborted => "aborted",
            SessionStatus::MaxRoundsExceeded => "max_rounds_exceeded",
        }
    }

    fn termination(&self) -> Option<TerminationState> {
        match self {
            SessionStatus::Completed => Some(TerminationState::Completed),
            SessionStatus::Aborted => Some(TerminationState::Aborted),
            SessionStatus::MaxRoundsExceeded => Some(TerminationState::MaxRoundsExceeded),
            SessionStatus::Init | SessionStatus::Running => None,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cannot move session from {from} to {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("session is {0}; execution records are only accepted while running")]
    NotRunning(SessionStatus),
}

/// One exploration of one chart (Entity).
///
/// Owns its chart state exclusively. The state changes only through
/// [`record`](Self::record) of a successful [`ExecutionRecord`]; failed
/// records are kept in the history but leave the state untouched.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    query: String,
    chart_type: ChartType,
    task_id: Option<String>,
    initial_state: ChartState,
    state: ChartState,
    round: usize,
    history: CallHistory,
    insights: Vec<String>,
    final_answer: Option<String>,
    status: SessionStatus,
    abort_reason: Option<String>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        query: impl Into<String>,
        chart_type: ChartType,
        state: ChartState,
    ) -> Self {
        Self {
            id: id.into(),
            query: query.into(),
            chart_type,
            task_id: None,
            initial_state: state.clone(),
            state,
            round: 0,
            history: CallHistory::new(),
            insights: Vec::new(),
            final_answer: None,
            status: SessionStatus::Init,
            abort_reason: None,
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn chart_type(&self) -> ChartType {
        self.chart_type
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn state(&self) -> &ChartState {
        &self.state
    }

    /// The chart the session started from
    pub fn initial_state(&self) -> &ChartState {
        &self.initial_state
    }

    /// Completed tool rounds so far
    pub fn round(&self) -> usize {
        self.round
    }

    pub fn history(&self) -> &CallHistory {
        &self.history
    }

    pub fn insights(&self) -> &[String] {
        &self.insights
    }

    pub fn final_answer(&self) -> Option<&str> {
        self.final_answer.as_deref()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn abort_reason(&self) -> Option<&str> {
        self.abort_reason.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn transition(&mut self, to: SessionStatus) -> Result<(), SessionError> {
        let allowed = match (self.status, to) {
            (SessionStatus::Init, SessionStatus::Running) => true,
            (SessionStatus::Init, SessionStatus::Aborted) => true,
            (SessionStatus::Running, next) => next.is_terminal(),
            _ => false,
        };
        if !allowed {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        self.transition(SessionStatus::Running)
    }

    /// Append an execution record; a successful record replaces the chart state
    pub fn record(&mut self, record: ExecutionRecord) -> Result<&ExecutionRecord, SessionError> {
        if self.status != SessionStatus::Running {
            return Err(SessionError::NotRunning(self.status));
        }
        if record.is_success()
            && let Some(state) = record.state()
        {
            self.state = state.clone();
        }
        Ok(self.history.append(record))
    }

    /// Restore the initial chart, recording `call` as a successful step
    pub fn reset_state(&mut self, call: ToolCall) -> Result<&ExecutionRecord, SessionError> {
        let record = ExecutionRecord::success(
            call,
            self.initial_state.clone(),
            json!({"reset": true}),
        );
        self.record(record)
    }

    /// Add insight claims, skipping blanks and exact repeats
    pub fn add_insights<I, S>(&mut self, insights: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for insight in insights {
            let text = insight.as_ref().trim();
            if !text.is_empty() && !self.insights.iter().any(|i| i == text) {
                self.insights.push(text.to_string());
            }
        }
    }

    pub fn advance_round(&mut self) -> usize {
        self.round += 1;
        self.round
    }

    pub fn complete(&mut self, answer: impl Into<String>) -> Result<(), SessionError> {
        self.transition(SessionStatus::Completed)?;
        self.final_answer = Some(answer.into());
        Ok(())
    }

    pub fn abort(&mut self, reason: impl Into<String>) -> Result<(), SessionError> {
        self.transition(SessionStatus::Aborted)?;
        self.abort_reason = Some(reason.into());
        Ok(())
    }

    pub fn exceed_rounds(&mut self) -> Result<(), SessionError> {
        self.transition(SessionStatus::MaxRoundsExceeded)
    }

    /// Read-only projection of this session.
    ///
    /// A session that never reached a terminal state projects as `Aborted`.
    pub fn to_transcript(&self) -> Transcript {
        let termination = self
            .status
            .termination()
            .unwrap_or(TerminationState::Aborted);

        Transcript {
            session_id: self.id.clone(),
            task_id: self.task_id.clone(),
            chart_type: self.chart_type,
            query: self.query.clone(),
            rounds: self.round,
            calls: self
                .history
                .iter()
                .map(|record| TranscriptCall {
                    round: record.call().round,
                    tool_name: record.tool_name().to_string(),
                    arguments: record.call().arguments.clone(),
                    success: record.is_success(),
                    error: record.error().cloned(),
                })
                .collect(),
            insights: self.insights.clone(),
            final_answer: self.final_answer.clone(),
            termination,
            abort_reason: self.abort_reason.clone(),
            final_state: Some(self.state.clone()),
        }
    }
}
