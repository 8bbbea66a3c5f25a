//! Exploration parameters: use case loop control.
//!
//! [`ExplorationParams`] groups the static parameters that control the loop
//! in [`RunExplorationUseCase`](crate::use_cases::run_exploration::RunExplorationUseCase).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exploration loop control parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationParams {
    /// Tool rounds before the session ends as `MaxRoundsExceeded`.
    pub max_rounds: usize,
    /// Extra model requests per round after a failed request (timeout,
    /// transport or HTTP error).
    pub max_model_retries: usize,
    /// Corrective re-prompts per round after a response that does not decode
    /// into a decision. Never less than one.
    pub max_corrective_retries: usize,
    /// Upper bound for a single model request.
    pub model_timeout: Option<Duration>,
    /// Show tool payloads (not just success/failure) in the next prompt.
    pub include_tool_payloads: bool,
    /// Execution records shown to the model.
    pub history_window: usize,
    /// Offer tools to the model. Without tools the session is a static
    /// baseline: one decision, which must be a final answer.
    pub tools_enabled: bool,
}

impl Default for ExplorationParams {
    fn default() -> Self {
        Self {
            max_rounds: 15,
            max_model_retries: 1,
            max_corrective_retries: 1,
            model_timeout: Some(Duration::from_secs(120)),
            include_tool_payloads: true,
            history_window: 20,
            tools_enabled: true,
        }
    }
}

impl ExplorationParams {
    // ==================== Builder Methods ====================

    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = max;
        self
    }

    pub fn with_max_model_retries(mut self, retries: usize) -> Self {
        self.max_model_retries = retries;
        self
    }

    pub fn with_max_corrective_retries(mut self, retries: usize) -> Self {
        self.max_corrective_retries = retries;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_tool_payloads(mut self, include: bool) -> Self {
        self.include_tool_payloads = include;
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn with_tools_enabled(mut self, enabled: bool) -> Self {
        self.tools_enabled = enabled;
        self
    }

    /// Model requests allowed per round before communication failures abort it
    pub fn model_attempts(&self) -> usize {
        self.max_model_retries + 1
    }

    /// Corrective re-prompts allowed per round; a malformed response is
    /// always re-prompted at least once
    pub fn corrective_retries(&self) -> usize {
        self.max_corrective_retries.max(1)
    }

    /// Upper bound on model requests in one round
    pub fn max_requests_per_round(&self) -> usize {
        self.model_attempts() + self.corrective_retries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = ExplorationParams::default();
        assert_eq!(params.max_rounds, 15);
        assert_eq!(params.max_model_retries, 1);
        assert_eq!(params.model_attempts(), 2);
        assert_eq!(params.corrective_retries(), 1);
        assert_eq!(params.max_requests_per_round(), 3);
        assert_eq!(params.model_timeout, Some(Duration::from_secs(120)));
        assert!(params.include_tool_payloads);
        assert_eq!(params.history_window, 20);
        assert!(params.tools_enabled);
    }

    #[test]
    fn test_builder() {
        let params = ExplorationParams::default()
            .with_max_rounds(4)
            .with_max_model_retries(0)
            .with_model_timeout(None)
            .with_tool_payloads(false)
            .with_history_window(5)
            .with_tools_enabled(false);

        assert_eq!(params.max_rounds, 4);
        assert_eq!(params.model_attempts(), 1);
        assert!(params.model_timeout.is_none());
        assert!(!params.include_tool_payloads);
        assert_eq!(params.history_window, 5);
        assert!(!params.tools_enabled);
    }

    #[test]
    fn test_corrective_retries_never_zero() {
        let params = ExplorationParams::default().with_max_corrective_retries(0);
        assert_eq!(params.corrective_retries(), 1);

        let params = ExplorationParams::default().with_max_corrective_retries(3);
        assert_eq!(params.corrective_retries(), 3);
    }
}
