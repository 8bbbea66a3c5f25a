//! Exploration configuration from TOML (`[exploration]` section)

use chartscout_application::ExplorationParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw exploration loop configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileExplorationConfig {
    /// Tool rounds before the session gives up
    pub max_rounds: usize,
    /// Extra model requests per round after a failed request
    pub max_model_retries: usize,
    /// Corrective re-prompts per round after an undecodable response (at least 1)
    pub max_corrective_retries: usize,
    /// Upper bound for one model request; 0 disables the bound
    pub model_timeout_secs: u64,
    /// Show tool payloads to the model, not just success/failure
    pub include_tool_payloads: bool,
    /// Execution records shown to the model
    pub history_window: usize,
}

impl Default for FileExplorationConfig {
    fn default() -> Self {
        let params = ExplorationParams::default();
        Self {
            max_rounds: params.max_rounds,
            max_model_retries: params.max_model_retries,
            max_corrective_retries: params.max_corrective_retries,
            model_timeout_secs: params.model_timeout.map(|t| t.as_secs()).unwrap_or(0),
            include_tool_payloads: params.include_tool_payloads,
            history_window: params.history_window,
        }
    }
}

impl FileExplorationConfig {
    pub fn to_params(&self) -> ExplorationParams {
        let timeout = (self.model_timeout_secs > 0).then(|| Duration::from_secs(self.model_timeout_secs));
        ExplorationParams::default()
            .with_max_rounds(self.max_rounds)
            .with_max_model_retries(self.max_model_retries)
            .with_max_corrective_retries(self.max_corrective_retries)
            .with_model_timeout(timeout)
            .with_tool_payloads(self.include_tool_payloads)
            .with_history_window(self.history_window)
    }
}
