//! Exploration progress port.
//!
//! [`ExplorationProgressNotifier`] is an **output port** the presentation
//! layer implements to show a running exploration. All methods default to
//! no-ops, so implementers only override what they display.

use chartscout_domain::{ChartType, Decision, ExecutionRecord, ToolCall, Transcript};

pub trait ExplorationProgressNotifier: Send + Sync {
    /// Called once the session is running
    fn on_session_start(&self, _session_id: &str, _query: &str, _chart_type: ChartType) {}

    /// Called at the top of each round (zero-based)
    fn on_round_start(&self, _round: usize, _max_rounds: usize) {}

    /// Called before each model request; `attempt` starts at 1
    fn on_model_request(&self, _round: usize, _attempt: usize) {}

    /// Called when a model request failed or was rejected and will be retried
    fn on_model_retry(&self, _attempt: usize, _max_attempts: usize, _error: &str) {}

    /// Called with every accepted decision
    fn on_decision(&self, _decision: &Decision) {}

    /// Called before a tool call executes
    fn on_tool_call(&self, _call: &ToolCall) {}

    /// Called with the record of an executed call
    fn on_tool_result(&self, _record: &ExecutionRecord) {}

    /// Called with the transcript of the terminated session
    fn on_session_end(&self, _transcript: &Transcript) {}
}

/// No-op progress notifier
pub struct NoExplorationProgress;

impl ExplorationProgressNotifier for NoExplorationProgress {}
