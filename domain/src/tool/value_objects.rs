//! Tool domain value objects: immutable result and error types
//!
//! These types form the **output side** of the tool pipeline. Every
//! execution attempt produces exactly one [`ExecutionRecord`], successful or
//! not, and the record is appended to the session's
//! [`CallHistory`](super::history::CallHistory).
//!
//! The [`ToolErrorKind`] of a failed record is what the benchmark evaluator
//! inspects: `InvalidArgument` and `UnknownTool` calls do not count as tool
//! usage, `ToolExecutionFailed` calls do.

use super::entities::ToolCall;
use crate::chart::ChartState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of a failed tool execution.
///
/// | Kind | Cause |
/// |------|-------|
/// | `UnknownTool` | Name is not in the catalog |
/// | `InvalidArgument` | Arguments violate the descriptor |
/// | `ToolExecutionFailed` | The tool body failed (or has no implementation) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolErrorKind {
    UnknownTool,
    InvalidArgument,
    ToolExecutionFailed,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorKind::UnknownTool => "UnknownTool",
            ToolErrorKind::InvalidArgument => "InvalidArgument",
            ToolErrorKind::ToolExecutionFailed => "ToolExecutionFailed",
        }
    }

    /// Whether the call was rejected before the tool body ran
    pub fn is_rejection(&self) -> bool {
        matches!(self, ToolErrorKind::UnknownTool | ToolErrorKind::InvalidArgument)
    }
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error that occurred while executing a tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Offending parameter for `InvalidArgument`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            parameter: None,
        }
    }

    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::new(
            ToolErrorKind::UnknownTool,
            format!("Unknown tool: {}", name.into()),
        )
    }

    pub fn invalid_argument(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::InvalidArgument,
            message: message.into(),
            parameter: Some(parameter.into()),
        }
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::ToolExecutionFailed, message)
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ToolError {}

/// What a tool body returns on success
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    /// New chart state, `None` when the tool only observes
    pub state: Option<ChartState>,
    /// Observation returned to the model
    pub payload: Value,
}

impl ToolOutcome {
    pub fn new(payload: Value) -> Self {
        Self {
            state: None,
            payload,
        }
    }

    pub fn with_state(mut self, state: ChartState) -> Self {
        self.state = Some(state);
        self
    }
}

/// Failure raised by a tool body
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ToolFailure {
    pub message: String,
}

impl ToolFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Outcome of one execution attempt.
///
/// Exactly one of `state`/`payload` (success) or `error` (failure) is set;
/// the constructors are the only way to build a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    call: ToolCall,
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<ChartState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ToolError>,
    /// Position in the session history, assigned on append
    #[serde(default)]
    sequence: usize,
    recorded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration_ms: Option<u64>,
}

impl ExecutionRecord {
    /// Successful execution. `state` is the resulting chart (the input state
    /// for observation-only tools).
    pub fn success(call: ToolCall, state: ChartState, payload: Value) -> Self {
        Self {
            call,
            success: true,
            state: Some(state),
            payload: Some(payload),
            error: None,
            sequence: 0,
            recorded_at: Utc::now(),
            duration_ms: None,
        }
    }

    pub fn failure(call: ToolCall, error: ToolError) -> Self {
        Self {
            call,
            success: false,
            state: None,
            payload: None,
            error: Some(error),
            sequence: 0,
            recorded_at: Utc::now(),
            duration_ms: None,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub(crate) fn with_sequence(mut self, sequence: usize) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn call(&self) -> &ToolCall {
        &self.call
    }

    pub fn tool_name(&self) -> &str {
        &self.call.tool_name
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn state(&self) -> Option<&ChartState> {
        self.state.as_ref()
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn error(&self) -> Option<&ToolError> {
        self.error.as_ref()
    }

    pub fn error_kind(&self) -> Option<ToolErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    pub fn sequence(&self) -> usize {
        self.sequence
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    /// Observation text sent back to the model for this record
    pub fn observation(&self) -> Value {
        match (&self.payload, &self.error) {
            (Some(payload), _) => serde_json::json!({
                "tool": self.call.tool_name,
                "success": true,
                "result": payload,
            }),
            (None, Some(error)) => serde_json::json!({
                "tool": self.call.tool_name,
                "success": false,
                "error": error.kind.as_str(),
                "message": error.message,
            }),
            (None, None) => serde_json::json!({"tool": self.call.tool_name, "success": self.success}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_record_has_no_error() {
        let call = ToolCall::new("get_data_summary", 0);
        let state = ChartState::new(json!({"mark": "bar"}));
        let record = ExecutionRecord::success(call, state.clone(), json!({"rows": 3}));

        assert!(record.is_success());
        assert_eq!(record.state(), Some(&state));
        assert!(record.error().is_none());
        assert_eq!(record.observation()["result"]["rows"], 3);
    }

    #[test]
    fn test_failure_record_has_no_state() {
        let call = ToolCall::new("zoom", 2);
        let record = ExecutionRecord::failure(
            call,
            ToolError::invalid_argument("area", "invalid argument 'area': is required"),
        );

        assert!(!record.is_success());
        assert!(record.state().is_none());
        assert!(record.payload().is_none());
        assert_eq!(record.error_kind(), Some(ToolErrorKind::InvalidArgument));
        assert_eq!(record.observation()["error"], "InvalidArgument");
    }

    #[test]
    fn test_error_kind_rejection() {
        assert!(ToolErrorKind::UnknownTool.is_rejection());
        assert!(ToolErrorKind::InvalidArgument.is_rejection());
        assert!(!ToolErrorKind::ToolExecutionFailed.is_rejection());
    }

    #[test]
    fn test_tool_error_display_and_serde() {
        let error = ToolError::unknown_tool("teleport");
        assert_eq!(error.to_string(), "[UnknownTool] Unknown tool: teleport");

        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["kind"], "UnknownTool");
        assert!(value.get("parameter").is_none());
    }
}
