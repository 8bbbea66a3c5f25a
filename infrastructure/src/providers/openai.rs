//! OpenAI-compatible Chat Completions adapter
//!
//! Works against any server speaking the `/v1/chat/completions` dialect.
//! The model answers in text; decoding into a decision is left to the
//! caller's strict parser.

use super::{ProviderError, error_for_status, map_http_error};
use async_trait::async_trait;
use chartscout_application::{DecisionContext, DecisionModel, ModelError};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiDecisionModel {
    client: Client,
    model: String,
    api_key: Option<String>,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiDecisionModel {
    /// `api_key` may be `None` for local servers that need no auth
    pub fn new(model: impl Into<String>, api_key: Option<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: Client::builder().build()?,
            model: model.into(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: 2000,
            temperature: 0.2,
            timeout: Duration::from_secs(120),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(&base_url.into());
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

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn headers(&self) -> Result<HeaderMap, ModelError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| ModelError::RequestFailed(format!("invalid API key header: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn request_body(&self, context: &DecisionContext<'_>) -> Value {
        let mut user_content = vec![json!({"type": "text", "text": context.user_prompt()})];
        if let Some(image) = context.image {
            user_content.push(json!({
                "type": "image_url",
                "image_url": {"url": image.data_url()},
            }));
        }

        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": [
                {"role": "system", "content": context.system_prompt()},
                {"role": "user", "content": user_content},
            ],
        })
    }
}

/// Ensure the base URL ends in `/v1` and carries no trailing slash
fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.ends_with("/v1") || trimmed.contains("/v1/") {
        trimmed.to_string()
    } else {
        format!("{}/v1", trimmed)
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn extract_content(body: &str) -> Result<String, ModelError> {
    let completion: ChatCompletion = serde_json::from_str(body)
        .map_err(|e| ModelError::InvalidResponse(format!("malformed completion: {}", e)))?;
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ModelError::InvalidResponse("completion has no content".to_string()))
}

#[async_trait]
impl DecisionModel for OpenAiDecisionModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn decide(&self, context: &DecisionContext<'_>) -> Result<String, ModelError> {
        debug!(model = %self.model, round = context.round, "Sending chat completion request");

        let response = self
            .client
            .post(self.endpoint())
            .headers(self.headers()?)
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
        extract_content(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartscout_application::ChartImage;
    use chartscout_domain::{ChartState, ChartType};

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("http://localhost:11434"), "http://localhost:11434/v1");
        assert_eq!(normalize_base_url("http://localhost:11434/v1/"), "http://localhost:11434/v1");
        assert_eq!(normalize_base_url("https://api.openai.com/v1"), "https://api.openai.com/v1");
    }

    #[test]
    fn test_request_body_with_image() {
        let model = OpenAiDecisionModel::new("gpt-4o", Some("sk-test".to_string()))
            .unwrap()
            .with_temperature(0.0)
            .with_base_url("http://localhost:8000");
        assert_eq!(model.endpoint(), "http://localhost:8000/v1/chat/completions");

        let state = ChartState::new(json!({"mark": "point"}));
        let image = ChartImage::new("image/png", "aGVsbG8=");
        let context = DecisionContext {
            query: "What groups exist?",
            chart_type: ChartType::ScatterPlot,
            state: &state,
            history: &[],
            insights: &[],
            round: 0,
            max_rounds: 3,
            tools: &[],
            image: Some(&image),
            corrective_hint: None,
            include_payloads: true,
        };

        let body = model.request_body(&context);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["messages"][0]["role"], "system");
        let content = body["messages"][1]["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[1]["image_url"]["url"], "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn test_headers() {
        let with_key = OpenAiDecisionModel::new("m", Some("sk-test".to_string())).unwrap();
        assert_eq!(with_key.headers().unwrap()[AUTHORIZATION], "Bearer sk-test");

        let without_key = OpenAiDecisionModel::new("m", None).unwrap();
        assert!(without_key.headers().unwrap().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_extract_content() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "{\"type\": \"final_answer\", \"text\": \"ok\"}"}}]}"#;
        assert!(extract_content(body).unwrap().contains("final_answer"));

        let empty = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        assert!(matches!(extract_content(empty), Err(ModelError::InvalidResponse(_))));
        assert!(matches!(extract_content("not json"), Err(ModelError::InvalidResponse(_))));
    }
}
