//! Decision model adapters
//!
//! Each adapter implements the application layer's [`DecisionModel`] port
//! for one vendor API. [`build_decision_model`] picks the adapter named by
//! the `[model]` config section.

pub mod anthropic;
pub mod openai;
pub mod scripted;

pub use anthropic::AnthropicDecisionModel;
pub use openai::OpenAiDecisionModel;
pub use scripted::ScriptedDecisionModel;

use crate::config::FileModelConfig;
use chartscout_application::{DecisionModel, ModelError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Supported model vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Anthropic,
    Scripted,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Scripted => "scripted",
        }
    }

    /// Environment variable holding the API key when none is configured
    pub fn default_api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::Scripted => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "open_ai" => Ok(ProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "scripted" | "script" => Ok(ProviderKind::Scripted),
            other => Err(ProviderError::UnknownProvider(other.to_string())),
        }
    }
}

/// Errors raised while constructing a model adapter
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Unknown model provider '{0}' (expected openai, anthropic or scripted)")]
    UnknownProvider(String),

    #[error("No API key: set {0} or [model] api_key")]
    MissingApiKey(String),

    #[error("Scripted provider needs [model] script (path to a JSON array of responses)")]
    MissingScript,

    #[error("Failed to read script {path}: {message}")]
    Script { path: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Build the adapter described by the `[model]` config section
pub fn build_decision_model(
    config: &FileModelConfig,
) -> Result<Arc<dyn DecisionModel>, ProviderError> {
    let kind: ProviderKind = config.provider.parse()?;
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let model: Arc<dyn DecisionModel> = match kind {
        ProviderKind::Scripted => {
            let path = config.script.as_ref().ok_or(ProviderError::MissingScript)?;
            Arc::new(ScriptedDecisionModel::from_file(path)?)
        }
        ProviderKind::OpenAi => {
            let mut model = OpenAiDecisionModel::new(&config.name, resolve_api_key(kind, config).ok())?
                .with_max_tokens(config.max_tokens)
                .with_temperature(config.temperature)
                .with_timeout(timeout);
            if let Some(base_url) = &config.base_url {
                model = model.with_base_url(base_url);
            }
            Arc::new(model)
        }
        ProviderKind::Anthropic => {
            let mut model = AnthropicDecisionModel::new(&config.name, resolve_api_key(kind, config)?)?
                .with_max_tokens(config.max_tokens)
                .with_temperature(config.temperature)
                .with_timeout(timeout);
            if let Some(base_url) = &config.base_url {
                model = model.with_base_url(base_url);
            }
            Arc::new(model)
        }
    };

    info!(provider = %kind, model = model.name(), "Decision model ready");
    Ok(model)
}

/// Key from config, else from the configured (or vendor default) env var
fn resolve_api_key(kind: ProviderKind, config: &FileModelConfig) -> Result<String, ProviderError> {
    if let Some(key) = config.api_key.as_ref().filter(|k| !k.is_empty()) {
        return Ok(key.clone());
    }
    let env = config
        .api_key_env
        .clone()
        .or_else(|| kind.default_api_key_env().map(str::to_string))
        .unwrap_or_default();
    match std::env::var(&env) {
        Ok(key) if !key.is_empty() => Ok(key),
        _ => Err(ProviderError::MissingApiKey(env)),
    }
}

/// Map a transport error onto the model error taxonomy
pub(crate) fn map_http_error(error: reqwest::Error, timeout: Duration) -> ModelError {
    if error.is_timeout() {
        ModelError::Timeout(timeout)
    } else if error.is_connect() {
        ModelError::Connection(error.to_string())
    } else {
        ModelError::RequestFailed(error.to_string())
    }
}

/// Map a non-success HTTP response onto [`ModelError::RequestFailed`]
pub(crate) async fn error_for_status(response: reqwest::Response) -> ModelError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(500).collect();
    ModelError::RequestFailed(format!("HTTP {}: {}", status, excerpt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(" Anthropic ".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!("scripted".parse::<ProviderKind>().unwrap(), ProviderKind::Scripted);
        assert!(matches!(
            "bedrock".parse::<ProviderKind>(),
            Err(ProviderError::UnknownProvider(p)) if p == "bedrock"
        ));
    }

    #[test]
    fn test_build_scripted_model() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"type": "final_answer", "text": "done"}}]"#).unwrap();

        let config = FileModelConfig {
            provider: "scripted".to_string(),
            script: Some(file.path().to_string_lossy().into_owned()),
            ..FileModelConfig::default()
        };
        let model = build_decision_model(&config).unwrap();
        assert_eq!(model.name(), "scripted");
    }

    #[test]
    fn test_build_scripted_without_script_fails() {
        let config = FileModelConfig {
            provider: "scripted".to_string(),
            ..FileModelConfig::default()
        };
        assert!(matches!(
            build_decision_model(&config),
            Err(ProviderError::MissingScript)
        ));
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let config = FileModelConfig {
            provider: "anthropic".to_string(),
            api_key: Some("sk-test".to_string()),
            api_key_env: Some("CHARTSCOUT_TEST_UNSET_KEY_VAR".to_string()),
            ..FileModelConfig::default()
        };
        assert_eq!(
            resolve_api_key(ProviderKind::Anthropic, &config).unwrap(),
            "sk-test"
        );
    }

    #[test]
    fn test_missing_api_key_names_env_var() {
        let config = FileModelConfig {
            provider: "anthropic".to_string(),
            api_key_env: Some("CHARTSCOUT_TEST_UNSET_KEY_VAR".to_string()),
            ..FileModelConfig::default()
        };
        let err = resolve_api_key(ProviderKind::Anthropic, &config).unwrap_err();
        assert!(err.to_string().contains("CHARTSCOUT_TEST_UNSET_KEY_VAR"));
    }
}
