//! Decision decoding from model responses.
//!
//! A model answers every round with exactly one of two variants:
//!
//! ```json
//! {"type": "final_answer", "text": "...", "insights": ["..."]}
//! {"type": "tool_calls", "calls": [{"name": "zoom", "arguments": {...}}], "insights": [], "reasoning": "..."}
//! ```
//!
//! Decoding is strict: the JSON document is located (```json fenced block,
//! whole response, or the outermost `{...}` span), decoded into the closed
//! [`Decision`] enum, then checked for empty payloads. Anything else is a
//! [`DecisionParseError`] that the orchestration loop answers with a
//! corrective re-prompt.

use crate::tool::entities::{ToolArguments, ToolCall};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A tool call as proposed by the model, before a round number is attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedCall {
    pub name: String,
    #[serde(default)]
    pub arguments: ToolArguments,
}

/// One structured decision from the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Decision {
    FinalAnswer {
        text: String,
        #[serde(default)]
        insights: Vec<String>,
    },
    ToolCalls {
        calls: Vec<ProposedCall>,
        #[serde(default)]
        insights: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
    },
}

impl Decision {
    pub fn final_answer(text: impl Into<String>) -> Self {
        Decision::FinalAnswer {
            text: text.into(),
            insights: Vec::new(),
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Decision::FinalAnswer { .. })
    }

    pub fn insights(&self) -> &[String] {
        match self {
            Decision::FinalAnswer { insights, .. } | Decision::ToolCalls { insights, .. } => {
                insights
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Decision::FinalAnswer { .. } => "final_answer",
            Decision::ToolCalls { .. } => "tool_calls",
        }
    }

    /// Tool calls of this decision stamped with `round`, in proposal order
    pub fn tool_calls(&self, round: usize) -> Vec<ToolCall> {
        match self {
            Decision::FinalAnswer { .. } => Vec::new(),
            Decision::ToolCalls { calls, .. } => calls
                .iter()
                .map(|c| ToolCall::new(c.name.clone(), round).with_arguments(c.arguments.clone()))
                .collect(),
        }
    }
}

/// Why a model response could not be decoded into a [`Decision`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionParseError {
    #[error("response contains no JSON object")]
    NoJson,

    #[error("response JSON is invalid: {0}")]
    InvalidJson(String),

    #[error("response does not match the decision format: {0}")]
    InvalidShape(String),

    #[error("decision is empty: {0}")]
    Empty(String),

    #[error("no tools are available in this session, only a final_answer is accepted")]
    ToolsUnavailable,
}

impl DecisionParseError {
    /// Instruction appended to the next request after this rejection
    pub fn corrective_hint(&self) -> String {
        format!(
            "Your previous response was rejected ({}). Reply with exactly one JSON object: \
             either {{\"type\": \"tool_calls\", \"calls\": [{{\"name\": \"<tool>\", \"arguments\": {{...}}}}], \
             \"insights\": [\"...\"]}} or {{\"type\": \"final_answer\", \"text\": \"...\", \"insights\": [\"...\"]}}.",
            self
        )
    }
}

/// Decode a model response into a [`Decision`].
pub fn parse_decision(response: &str) -> Result<Decision, DecisionParseError> {
    let json = locate_json(response)?;
    let decision: Decision = serde_json::from_value(json)
        .map_err(|e| DecisionParseError::InvalidShape(e.to_string()))?;
    check_decision(&decision)?;
    Ok(decision)
}

/// Reject tool calls when the session offers no tools
pub fn require_offered_tools(
    decision: Decision,
    tools_offered: bool,
) -> Result<Decision, DecisionParseError> {
    if !tools_offered && !decision.is_final() {
        return Err(DecisionParseError::ToolsUnavailable);
    }
    Ok(decision)
}

/// Find the first candidate span that parses as a JSON object
fn locate_json(response: &str) -> Result<serde_json::Value, DecisionParseError> {
    let mut last_error = None;

    for candidate in candidates(response) {
        match serde_json::from_str::<serde_json::Value>(candidate) {
            Ok(value) if value.is_object() => return Ok(value),
            Ok(_) => {
                last_error = Some(DecisionParseError::InvalidShape(
                    "expected a JSON object".to_string(),
                ))
            }
            Err(e) => last_error = Some(DecisionParseError::InvalidJson(e.to_string())),
        }
    }

    Err(last_error.unwrap_or(DecisionParseError::NoJson))
}

fn candidates(response: &str) -> Vec<&str> {
    let mut found = Vec::new();

    if let Some(block) = fenced_json_block(response) {
        found.push(block);
    }

    let trimmed = response.trim();
    if trimmed.starts_with('{') {
        found.push(trimmed);
    }

    if let (Some(start), Some(end)) = (response.find('{'), response.rfind('}'))
        && start < end
    {
        found.push(&response[start..=end]);
    }

    found
}

fn fenced_json_block(response: &str) -> Option<&str> {
    let open = response.find("```json")?;
    let body_start = open + "```json".len();
    let body_len = response[body_start..].find("```")?;
    Some(response[body_start..body_start + body_len].trim())
}

fn check_decision(decision: &Decision) -> Result<(), DecisionParseError> {
    match decision {
        Decision::FinalAnswer { text, .. } if text.trim().is_empty() => {
            Err(DecisionParseError::Empty("final_answer text is blank".to_string()))
        }
        Decision::ToolCalls { calls, .. } if calls.is_empty() => {
            Err(DecisionParseError::Empty("tool_calls has no calls".to_string()))
        }
        Decision::ToolCalls { calls, .. } => {
            match calls.iter().position(|c| c.name.trim().is_empty()) {
                Some(index) => Err(DecisionParseError::Empty(format!(
                    "call {} has no tool name",
                    index
                ))),
                None => Ok(()),
            }
        }
        Decision::FinalAnswer { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_calls_rejected_without_tools() {
        let calls = parse_decision(r#"{"type": "tool_calls", "calls": [{"name": "zoom"}]}"#).unwrap();
        assert_eq!(
            require_offered_tools(calls.clone(), false),
            Err(DecisionParseError::ToolsUnavailable)
        );
        assert!(require_offered_tools(calls, true).is_ok());

        let answer = Decision::final_answer("two groups");
        assert!(require_offered_tools(answer, false).is_ok());
        assert!(
            DecisionParseError::ToolsUnavailable
                .corrective_hint()
                .contains("final_answer")
        );
    }

    #[test]
    fn test_parse_raw_tool_calls() {
        let response = r#"{"type": "tool_calls", "calls": [{"name": "identify_clusters", "arguments": {"n_clusters": 2}}], "insights": ["two groups"]}"#;
        let decision = parse_decision(response).unwrap();

        let calls = decision.tool_calls(3);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_name, "identify_clusters");
        assert_eq!(calls[0].round, 3);
        assert_eq!(calls[0].arguments["n_clusters"], json!(2));
        assert_eq!(decision.insights(), ["two groups".to_string()]);
    }

    #[test]
    fn test_parse_fenced_block() {
        let response = "I will finish now.\n```json\n{\"type\": \"final_answer\", \"text\": \"Two clusters.\"}\n```\nThanks";
        let decision = parse_decision(response).unwrap();
        assert!(decision.is_final());
    }

    #[test]
    fn test_parse_embedded_object() {
        let response = "Sure: {\"type\": \"tool_calls\", \"calls\": [{\"name\": \"get_data_summary\"}]} done";
        let decision = parse_decision(response).unwrap();
        assert_eq!(decision.kind(), "tool_calls");
        assert!(decision.tool_calls(0)[0].arguments.is_empty());
    }

    #[test]
    fn test_reject_no_json() {
        assert_eq!(
            parse_decision("I think the chart shows two groups").unwrap_err(),
            DecisionParseError::NoJson
        );
    }

    #[test]
    fn test_reject_unknown_variant() {
        let err = parse_decision(r#"{"type": "maybe", "text": "x"}"#).unwrap_err();
        assert!(matches!(err, DecisionParseError::InvalidShape(_)));
    }

    #[test]
    fn test_reject_wrong_field_types() {
        let err = parse_decision(r#"{"type": "tool_calls", "calls": "zoom"}"#).unwrap_err();
        assert!(matches!(err, DecisionParseError::InvalidShape(_)));
    }

    #[test]
    fn test_reject_empty_payloads() {
        let err = parse_decision(r#"{"type": "tool_calls", "calls": []}"#).unwrap_err();
        assert!(matches!(err, DecisionParseError::Empty(_)));

        let err = parse_decision(r#"{"type": "final_answer", "text": "  "}"#).unwrap_err();
        assert!(matches!(err, DecisionParseError::Empty(_)));

        let err = parse_decision(r#"{"type": "tool_calls", "calls": [{"name": ""}]}"#).unwrap_err();
        assert!(matches!(err, DecisionParseError::Empty(_)));
    }

    #[test]
    fn test_reject_truncated_json() {
        let err = parse_decision(r#"{"type": "tool_calls", "calls": [{"name": "zoom""#).unwrap_err();
        assert!(matches!(
            err,
            DecisionParseError::InvalidJson(_) | DecisionParseError::NoJson
        ));
    }

    #[test]
    fn test_corrective_hint_names_error() {
        let hint = DecisionParseError::NoJson.corrective_hint();
        assert!(hint.contains("no JSON object"));
        assert!(hint.contains("final_answer"));
    }
}
