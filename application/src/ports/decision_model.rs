//! Decision model port
//!
//! Defines the single capability the exploration loop needs from a
//! vision-language model: given the current context, return one raw
//! response that should decode into a [`Decision`](chartscout_domain::Decision).
//! Vendor-specific adapters (OpenAI-compatible, Anthropic, scripted replay)
//! live in the infrastructure layer.

use async_trait::async_trait;
use chartscout_domain::{
    ChartState, ChartType, ExecutionRecord, ExplorationPromptTemplate, Message, ToolDescriptor,
};
use std::time::Duration;
use thiserror::Error;

/// Errors from model communication
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Model request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Scripted responses exhausted after {0} replies")]
    ScriptExhausted(usize),

    #[error("Model request cancelled")]
    Cancelled,
}

impl ModelError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ModelError::Cancelled)
    }
}

/// Rendered chart image attached to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    /// MIME type, e.g. `image/png`
    pub media_type: String,
    /// Base64-encoded bytes
    pub data: String,
}

impl ChartImage {
    pub fn new(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// Everything a model sees when asked for the next decision
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    pub query: &'a str,
    pub chart_type: ChartType,
    pub state: &'a ChartState,
    /// Most recent execution records, oldest first
    pub history: &'a [ExecutionRecord],
    pub insights: &'a [String],
    /// Zero-based round being decided
    pub round: usize,
    pub max_rounds: usize,
    /// Tools applicable to the chart type
    pub tools: &'a [&'a ToolDescriptor],
    pub image: Option<&'a ChartImage>,
    /// Set after a rejected response; asks the model to fix its format
    pub corrective_hint: Option<&'a str>,
    pub include_payloads: bool,
}

impl DecisionContext<'_> {
    pub fn system_prompt(&self) -> String {
        ExplorationPromptTemplate::system(self.chart_type, self.tools)
    }

    pub fn user_prompt(&self) -> String {
        let message = ExplorationPromptTemplate::round_message(
            self.query,
            self.round,
            self.max_rounds,
            self.state,
            self.history,
            self.insights,
            self.include_payloads,
        );
        match self.corrective_hint {
            Some(hint) => ExplorationPromptTemplate::with_correction(&message, hint),
            None => message,
        }
    }

    /// System and user message for a single-turn request
    pub fn messages(&self) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt()),
            Message::user(self.user_prompt()),
        ]
    }
}

/// Port for requesting decisions from a model
///
/// One call is one request; retries, timeouts and cancellation are handled
/// by the caller.
#[async_trait]
pub trait DecisionModel: Send + Sync {
    /// Display name of the model, used in logs
    fn name(&self) -> &str;

    /// Request the next decision as raw response text
    async fn decide(&self, context: &DecisionContext<'_>) -> Result<String, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartscout_domain::{ToolCategory, ToolDescriptor};
    use serde_json::json;

    #[test]
    fn test_context_prompts() {
        let state = ChartState::new(json!({"mark": "point"}));
        let tool = ToolDescriptor::new("zoom", ToolCategory::Action, "Zoom into an area");
        let tools = [&tool];
        let insights = vec!["two groups".to_string()];
        let context = DecisionContext {
            query: "What groups exist?",
            chart_type: ChartType::ScatterPlot,
            state: &state,
            history: &[],
            insights: &insights,
            round: 0,
            max_rounds: 5,
            tools: &tools,
            image: None,
            corrective_hint: Some("send JSON"),
            include_payloads: true,
        };

        let messages = context.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains("**zoom**"));
        assert!(messages[1].content.contains("What groups exist?"));
        assert!(messages[1].content.contains("1 of 5"));
        assert!(messages[1].content.ends_with("## Correction\n\nsend JSON"));
    }

    #[test]
    fn test_image_data_url() {
        let image = ChartImage::new("image/png", "aGVsbG8=");
        assert_eq!(image.data_url(), "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn test_cancelled() {
        assert!(ModelError::Cancelled.is_cancelled());
        assert!(!ModelError::Timeout(Duration::from_secs(1)).is_cancelled());
    }
}
