//! Model configuration from TOML (`[model]` section)

use serde::{Deserialize, Serialize};

/// Raw decision model configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelConfig {
    /// `openai`, `anthropic` or `scripted`
    pub provider: String,
    /// Vendor model identifier
    pub name: String,
    /// Override of the vendor endpoint (OpenAI-compatible servers, proxies)
    pub base_url: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    /// API key given inline; takes precedence over `api_key_env`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// HTTP timeout per request
    pub request_timeout_secs: u64,
    /// JSON array of responses for the scripted provider
    pub script: Option<String>,
}

impl Default for FileModelConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            name: "gpt-4o".to_string(),
            base_url: None,
            api_key_env: None,
            api_key: None,
            max_tokens: 2000,
            temperature: 0.2,
            request_timeout_secs: 120,
            script: None,
        }
    }
}
