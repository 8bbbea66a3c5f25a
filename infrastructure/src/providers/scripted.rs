//! Scripted replay model
//!
//! Serves a fixed list of responses in order, one per request. Used for demos
//! and for running the full exploration loop without network access.

use super::ProviderError;
use async_trait::async_trait;
use chartscout_application::{DecisionContext, DecisionModel, ModelError};
use serde_json::Value;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

pub struct ScriptedDecisionModel {
    name: String,
    responses: Mutex<VecDeque<String>>,
    served: Mutex<usize>,
}

impl ScriptedDecisionModel {
    pub fn new(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: "scripted".to_string(),
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            served: Mutex::new(0),
        }
    }

    /// String entries are served verbatim; any other value as its JSON text
    pub fn from_values(values: Vec<Value>) -> Self {
        Self::new(values.into_iter().map(|value| match value {
            Value::String(text) => text,
            other => other.to_string(),
        }))
    }

    /// Load a JSON array of responses
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let script_error = |message: String| ProviderError::Script {
            path: path.display().to_string(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| script_error(e.to_string()))?;
        let values: Vec<Value> =
            serde_json::from_str(&content).map_err(|e| script_error(e.to_string()))?;
        Ok(Self::from_values(values))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl DecisionModel for ScriptedDecisionModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn decide(&self, context: &DecisionContext<'_>) -> Result<String, ModelError> {
        let mut served = self
            .served
            .lock()
            .map_err(|_| ModelError::RequestFailed("script state poisoned".to_string()))?;
        let next = self
            .responses
            .lock()
            .map_err(|_| ModelError::RequestFailed("script state poisoned".to_string()))?
            .pop_front();

        match next {
            Some(response) => {
                *served += 1;
                debug!(round = context.round, served = *served, "Replaying scripted response");
                Ok(response)
            }
            None => Err(ModelError::ScriptExhausted(*served)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartscout_domain::{ChartState, ChartType, parse_decision};
    use serde_json::json;

    const DEMO_RESPONSES: &str =
        include_str!("../../../demos/scatter_clustering_001/responses.json");

    fn context(state: &ChartState) -> DecisionContext<'_> {
        DecisionContext {
            query: "q",
            chart_type: ChartType::ScatterPlot,
            state,
            history: &[],
            insights: &[],
            round: 0,
            max_rounds: 5,
            tools: &[],
            image: None,
            corrective_hint: None,
            include_payloads: true,
        }
    }

    #[tokio::test]
    async fn test_replays_in_order_then_exhausts() {
        let state = ChartState::new(json!({}));
        let model = ScriptedDecisionModel::new(["first", "second"]);

        assert_eq!(model.decide(&context(&state)).await.unwrap(), "first");
        assert_eq!(model.decide(&context(&state)).await.unwrap(), "second");
        assert_eq!(model.remaining(), 0);
        assert_eq!(
            model.decide(&context(&state)).await,
            Err(ModelError::ScriptExhausted(2))
        );
    }

    #[tokio::test]
    async fn test_demo_script_decodes() {
        let values: Vec<Value> = serde_json::from_str(DEMO_RESPONSES).unwrap();
        let model = ScriptedDecisionModel::from_values(values).with_name("demo");
        assert_eq!(model.name(), "demo");
        assert_eq!(model.remaining(), 4);

        let state = ChartState::new(json!({}));
        let first = parse_decision(&model.decide(&context(&state)).await.unwrap()).unwrap();
        assert_eq!(first.kind(), "tool_calls");
        assert_eq!(first.tool_calls(0)[0].tool_name, "identify_clusters");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.json");
        std::fs::write(&path, r#"["plain text", {"type": "final_answer", "text": "ok"}]"#).unwrap();

        let model = ScriptedDecisionModel::from_file(&path).unwrap();
        assert_eq!(model.remaining(), 2);

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            ScriptedDecisionModel::from_file(&path),
            Err(ProviderError::Script { .. })
        ));
        assert!(ScriptedDecisionModel::from_file(dir.path().join("missing.json")).is_err());
    }
}
