//! Port for structured conversation logging.
//!
//! Defines the [`ConversationLogger`] trait for recording exploration events
//! (model requests and responses, rejected decisions, tool executions,
//! session end) to a structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the full
//! exploration in a machine-readable format (JSONL).

use serde_json::Value;

/// A structured conversation event for logging.
///
/// The adapter adds the timestamp when it writes the event.
pub struct ConversationEvent {
    /// Event type identifier (e.g., "model_request", "tool_execution", "session_end").
    pub event_type: &'static str,
    /// Session the event belongs to.
    pub session_id: String,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, session_id: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type,
            session_id: session_id.into(),
            payload,
        }
    }
}

/// Port for logging conversation events to a structured log.
///
/// `log` is synchronous and non-fallible; a logging failure must never
/// interrupt a session.
pub trait ConversationLogger: Send + Sync {
    /// Record a conversation event.
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
