//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod exploration;
mod logging;
mod model;
mod output;

pub use exploration::FileExplorationConfig;
pub use logging::FileLoggingConfig;
pub use model::FileModelConfig;
pub use output::{FileOutputConfig, FileOutputFormat};

use crate::providers::ProviderKind;
use chartscout_domain::{EvaluationConfig, EvaluationConfigError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigValidationError {
    #[error("exploration.max_rounds must be at least 1")]
    ZeroRounds,

    #[error("model.provider: unknown provider '{0}' (expected openai, anthropic or scripted)")]
    UnknownProvider(String),

    #[error("model.name cannot be empty")]
    EmptyModelName,

    #[error("model.max_tokens cannot be 0")]
    ZeroMaxTokens,

    #[error("model.temperature must be in [0, 2], got {0}")]
    InvalidTemperature(f32),

    #[error("model.request_timeout_secs cannot be 0")]
    ZeroRequestTimeout,

    #[error("model.script is required for the scripted provider")]
    MissingScript,

    #[error("evaluation: {0}")]
    Evaluation(#[from] EvaluationConfigError),
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Exploration loop control
    pub exploration: FileExplorationConfig,
    /// Decision model selection
    pub model: FileModelConfig,
    /// Scoring weights and thresholds
    pub evaluation: EvaluationConfig,
    /// Conversation and diagnostic logs
    pub logging: FileLoggingConfig,
    /// Output settings
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();

        if self.exploration.max_rounds == 0 {
            issues.push(ConfigValidationError::ZeroRounds);
        }

        match self.model.provider.parse::<ProviderKind>() {
            Ok(ProviderKind::Scripted) => {
                if self.model.script.is_none() {
                    issues.push(ConfigValidationError::MissingScript);
                }
            }
            Ok(_) => {
                if self.model.name.trim().is_empty() {
                    issues.push(ConfigValidationError::EmptyModelName);
                }
            }
            Err(_) => issues.push(ConfigValidationError::UnknownProvider(
                self.model.provider.clone(),
            )),
        }
        if self.model.max_tokens == 0 {
            issues.push(ConfigValidationError::ZeroMaxTokens);
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            issues.push(ConfigValidationError::InvalidTemperature(
                self.model.temperature,
            ));
        }
        if self.model.request_timeout_secs == 0 {
            issues.push(ConfigValidationError::ZeroRequestTimeout);
        }

        if let Err(e) = self.evaluation.validate() {
            issues.push(e.into());
        }

        issues
    }
}
