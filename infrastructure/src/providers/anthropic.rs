//! Anthropic Messages API adapter
//!
//! The applicable chart tools are offered as native tools, next to a
//! `final_answer` tool. The reply's `tool_use` blocks are normalized into the
//! decision JSON the exploration loop decodes:
//!
//! - a `final_answer` block wins and becomes `{"type": "final_answer", ...}`
//! - any other blocks become `{"type": "tool_calls", "calls": [...]}`, with
//!   the reply's text blocks as `reasoning`
//! - a reply without tool use is passed through as text

use super::{ProviderError, error_for_status, map_http_error};
use crate::tools::JsonSchemaToolConverter;
use async_trait::async_trait;
use chartscout_application::{DecisionContext, DecisionModel, ModelError};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const FINAL_ANSWER_TOOL: &str = "final_answer";

pub struct AnthropicDecisionModel {
    client: Client,
    model: String,
    api_key: String,
    api_url: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl AnthropicDecisionModel {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: Client::builder().build()?,
            model: model.into(),
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            max_tokens: 2000,
            temperature: 0.2,
            timeout: Duration::from_secs(120),
        })
    }

    /// Full messages endpoint URL, or a base URL to which `/v1/messages` is appended
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        let trimmed = url.trim_end_matches('/');
        self.api_url = if trimmed.ends_with("/messages") {
            trimmed.to_string()
        } else if trimmed.ends_with("/v1") {
            format!("{}/messages", trimmed)
        } else {
            format!("{}/v1/messages", trimmed)
        };
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request_body(&self, context: &DecisionContext<'_>) -> Value {
        let mut content = Vec::new();
        if let Some(image) = context.image {
            content.push(json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": image.media_type,
                    "data": image.data,
                },
            }));
        }
        content.push(json!({"type": "text", "text": context.user_prompt()}));

        let mut tools = JsonSchemaToolConverter.tools_schema(context.tools.iter().copied());
        tools.push(final_answer_tool());

        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "system": context.system_prompt(),
            "messages": [{"role": "user", "content": content}],
            "tools": tools,
        })
    }
}

fn final_answer_tool() -> Value {
    json!({
        "name": FINAL_ANSWER_TOOL,
        "description": "Finish the exploration with an answer to the user's question",
        "input_schema": {
            "type": "object",
            "properties": {
                "text": {"type": "string", "description": "Answer to the question"},
                "insights": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Findings supporting the answer",
                },
            },
            "required": ["text"],
        },
    })
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

/// Turn a Messages API reply into the decision JSON contract
fn normalize_response(body: &str) -> Result<String, ModelError> {
    let response: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| ModelError::InvalidResponse(format!("malformed message: {}", e)))?;

    let mut texts = Vec::new();
    let mut calls = Vec::new();
    for block in response.content {
        match block {
            ContentBlock::Text { text } if !text.trim().is_empty() => texts.push(text),
            ContentBlock::ToolUse { name, input } => calls.push((name, input)),
            _ => {}
        }
    }

    if let Some((_, input)) = calls.iter().find(|(name, _)| name == FINAL_ANSWER_TOOL) {
        let decision = json!({
            "type": "final_answer",
            "text": input.get("text").cloned().unwrap_or(Value::Null),
            "insights": input.get("insights").cloned().unwrap_or_else(|| json!([])),
        });
        return Ok(decision.to_string());
    }

    if calls.is_empty() {
        if texts.is_empty() {
            return Err(ModelError::InvalidResponse(
                "message has neither text nor tool use".to_string(),
            ));
        }
        return Ok(texts.join("\n"));
    }

    let mut decision = json!({
        "type": "tool_calls",
        "calls": calls
            .into_iter()
            .map(|(name, input)| {
                let arguments = if input.is_object() { input } else { json!({}) };
                json!({"name": name, "arguments": arguments})
            })
            .collect::<Vec<_>>(),
    });
    if !texts.is_empty() {
        decision["reasoning"] = json!(texts.join("\n"));
    }
    Ok(decision.to_string())
}

#[async_trait]
impl DecisionModel for AnthropicDecisionModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn decide(&self, context: &DecisionContext<'_>) -> Result<String, ModelError> {
        debug!(model = %self.model, round = context.round, "Sending messages request");

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .timeout(self.timeout)
            .json(&self.request_body(context))
            .send()
            .await
            .map_err(|e| map_http_error(e, self.timeout))?;

        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| map_http_error(e, self.timeout))?;
        normalize_response(&body)
    }
}
