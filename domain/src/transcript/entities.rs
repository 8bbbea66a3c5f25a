//! Transcript entities

use crate::chart::{ChartState, ChartType};
use crate::tool::entities::ToolArguments;
use crate::tool::value_objects::{ToolError, ToolErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationState {
    Completed,
    Aborted,
    MaxRoundsExceeded,
}

impl TerminationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationState::Completed => "completed",
            TerminationState::Aborted => "aborted",
            TerminationState::MaxRoundsExceeded => "max_rounds_exceeded",
        }
    }
}

impl std::fmt::Display for TerminationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of the ordered call list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptCall {
    /// Zero-based round in which the call was made
    pub round: usize,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: ToolArguments,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

impl TranscriptCall {
    pub fn error_kind(&self) -> Option<ToolErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// Whether the executor rejected this call before running the tool
    pub fn was_rejected(&self) -> bool {
        self.error_kind().is_some_and(|k| k.is_rejection())
    }
}

/// Persisted record of one terminated session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default)]
    pub chart_type: ChartType,
    #[serde(default)]
    pub query: String,
    /// Number of completed tool rounds
    pub rounds: usize,
    pub calls: Vec<TranscriptCall>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_answer: Option<String>,
    pub termination: TerminationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_state: Option<ChartState>,
}

/// A transcript that cannot be scored
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedTranscriptError {
    #[error("transcript is not valid JSON: {0}")]
    Syntax(String),

    #[error("transcript is missing or mistyping a field: {0}")]
    Shape(String),

    #[error("transcript field '{field}' is invalid: {reason}")]
    InvalidField { field: String, reason: String },
}

impl MalformedTranscriptError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        MalformedTranscriptError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl Transcript {
    /// Decode and validate a transcript document
    pub fn from_json(text: &str) -> Result<Self, MalformedTranscriptError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| MalformedTranscriptError::Syntax(e.to_string()))?;
        let transcript: Transcript = serde_json::from_value(value)
            .map_err(|e| MalformedTranscriptError::Shape(e.to_string()))?;
        transcript.validate()?;
        Ok(transcript)
    }

    /// Structural checks that serde cannot express
    pub fn validate(&self) -> Result<(), MalformedTranscriptError> {
        if self.session_id.trim().is_empty() {
            return Err(MalformedTranscriptError::invalid("session_id", "must not be empty"));
        }

        let mut previous_round = 0;
        for (index, call) in self.calls.iter().enumerate() {
            let field = format!("calls[{}]", index);
            if call.tool_name.trim().is_empty() {
                return Err(MalformedTranscriptError::invalid(
                    format!("{}.tool_name", field),
                    "must not be empty",
                ));
            }
            if call.round >= self.rounds {
                return Err(MalformedTranscriptError::invalid(
                    format!("{}.round", field),
                    format!("round {} is not below the round count {}", call.round, self.rounds),
                ));
            }
            if call.round < previous_round {
                return Err(MalformedTranscriptError::invalid(
                    format!("{}.round", field),
                    "rounds must not decrease",
                ));
            }
            if call.success == call.error.is_some() {
                return Err(MalformedTranscriptError::invalid(
                    field,
                    "a call has an error exactly when it did not succeed",
                ));
            }
            previous_round = call.round;
        }

        if self.termination == TerminationState::Completed
            && self.final_answer.as_deref().is_none_or(|a| a.trim().is_empty())
        {
            return Err(MalformedTranscriptError::invalid(
                "final_answer",
                "a completed transcript needs a final answer",
            ));
        }

        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Tool names in call order
    pub fn tool_sequence(&self) -> Vec<&str> {
        self.calls.iter().map(|c| c.tool_name.as_str()).collect()
    }
}
