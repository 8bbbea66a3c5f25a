//! Local tool executor: the concrete implementation of [`ToolExecutorPort`].
//!
//! [`LocalToolExecutor`] bridges the application layer's abstract
//! [`ToolExecutorPort`] with the in-process chart tools.
//!
//! # Execution Path
//!
//! ```text
//! ToolExecutorPort::execute()
//!   ├─ catalog lookup      → UnknownTool
//!   ├─ argument validation → InvalidArgument (names the parameter)
//!   ├─ fill defaults
//!   ├─ binding lookup      → ToolExecutionFailed ("not implemented")
//!   └─ invoke (panics caught) → success record, or ToolExecutionFailed
//! ```
//!
//! The async port runs the invoke step on tokio's blocking pool.
//!
//! The recorded call keeps the arguments as proposed; only the tool body
//! sees the completed argument map.

use async_trait::async_trait;
use chartscout_application::ToolExecutorPort;
use chartscout_domain::{
    CatalogError, ChartState, ChartTool, DefaultToolValidator, ExecutionRecord, ToolArguments,
    ToolCall, ToolCatalog, ToolError, ToolValidator,
};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::ToolBinding;

/// Executor that runs chart tools in process.
///
/// # Configurations
///
/// | Constructor | Tools | Use Case |
/// |-------------|-------|----------|
/// | [`new()`](Self::new) | Every built-in tool | Exploration sessions |
/// | [`with_tools()`](Self::with_tools) | Custom catalog + bindings | Testing / specialized setups |
#[derive(Clone)]
pub struct LocalToolExecutor {
    catalog: ToolCatalog,
    tools: HashMap<String, Arc<dyn ChartTool>>,
}

impl std::fmt::Debug for LocalToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut bound: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        bound.sort_unstable();
        f.debug_struct("LocalToolExecutor")
            .field("catalog", &self.catalog.len())
            .field("bound", &bound)
            .finish()
    }
}

impl LocalToolExecutor {
    /// Create an executor with every built-in tool
    pub fn new() -> Result<Self, CatalogError> {
        Ok(Self::with_tools(
            super::default_catalog()?,
            super::default_bindings(),
        ))
    }

    /// Create an executor from a catalog and implementations
    pub fn with_tools(catalog: ToolCatalog, bindings: impl IntoIterator<Item = ToolBinding>) -> Self {
        Self {
            catalog,
            tools: bindings
                .into_iter()
                .map(|(name, tool)| (name.to_string(), tool))
                .collect(),
        }
    }

    /// Bind (or replace) the implementation of one tool
    pub fn bind(mut self, name: impl Into<String>, tool: impl ChartTool + 'static) -> Self {
        self.tools.insert(name.into(), Arc::new(tool));
        self
    }

    /// Cataloged tools without an implementation
    pub fn unbound_tools(&self) -> Vec<&str> {
        self.catalog
            .names()
            .filter(|name| !self.tools.contains_key(*name))
            .collect()
    }

    /// Run one call to completion on the current thread. Never panics and
    /// never fails: every problem becomes a failed record.
    pub fn execute_sync(&self, call: &ToolCall, state: &ChartState) -> ExecutionRecord {
        let start = Instant::now();
        let record = match self.prepare(call) {
            Ok((tool, arguments)) => invoke(tool.as_ref(), call, state, &arguments),
            Err(record) => record,
        };
        finish(call, record, start)
    }

    /// Resolve the implementation and the completed arguments, or the
    /// failed record that rejects the call
    fn prepare(&self, call: &ToolCall) -> Result<(Arc<dyn ChartTool>, ToolArguments), ExecutionRecord> {
        let descriptor = self.catalog.lookup(&call.tool_name).map_err(|_| {
            ExecutionRecord::failure(call.clone(), ToolError::unknown_tool(&call.tool_name))
        })?;

        if let Err(violation) = DefaultToolValidator.validate(&call.arguments, descriptor) {
            return Err(ExecutionRecord::failure(
                call.clone(),
                ToolError::invalid_argument(&violation.parameter, violation.to_string()),
            ));
        }

        let Some(tool) = self.tools.get(&call.tool_name) else {
            return Err(ExecutionRecord::failure(
                call.clone(),
                ToolError::execution_failed(format!(
                    "Tool '{}' is not implemented",
                    call.tool_name
                )),
            ));
        };

        Ok((tool.clone(), descriptor.with_defaults(&call.arguments)))
    }
}

/// Invoke a tool body, turning failures and panics into failed records
fn invoke(
    tool: &dyn ChartTool,
    call: &ToolCall,
    state: &ChartState,
    arguments: &ToolArguments,
) -> ExecutionRecord {
    match catch_unwind(AssertUnwindSafe(|| tool.invoke(state, arguments))) {
        Ok(Ok(outcome)) => ExecutionRecord::success(
            call.clone(),
            outcome.state.unwrap_or_else(|| state.clone()),
            outcome.payload,
        ),
        Ok(Err(failure)) => {
            ExecutionRecord::failure(call.clone(), ToolError::execution_failed(failure.message))
        }
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            ExecutionRecord::failure(
                call.clone(),
                ToolError::execution_failed(format!(
                    "Tool '{}' panicked: {}",
                    call.tool_name, reason
                )),
            )
        }
    }
}

fn finish(call: &ToolCall, record: ExecutionRecord, start: Instant) -> ExecutionRecord {
    let duration_ms = start.elapsed().as_millis() as u64;
    match record.error() {
        Some(error) => warn!(
            tool = %call.tool_name,
            kind = %error.kind,
            "Tool call failed: {}",
            error.message
        ),
        None => debug!(tool = %call.tool_name, duration_ms, "Tool call succeeded"),
    }
    record.with_duration_ms(duration_ms)
}

#[async_trait]
impl ToolExecutorPort for LocalToolExecutor {
    fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Tool bodies are CPU-bound (clustering, regression, aggregation), so
    /// they run on the blocking pool; lookup and validation stay inline.
    async fn execute(&self, call: &ToolCall, state: &ChartState) -> ExecutionRecord {
        let start = Instant::now();
        let (tool, arguments) = match self.prepare(call) {
            Ok(prepared) => prepared,
            Err(record) => return finish(call, record, start),
        };

        let (owned_call, owned_state) = (call.clone(), state.clone());
        let record = tokio::task::spawn_blocking(move || {
            invoke(tool.as_ref(), &owned_call, &owned_state, &arguments)
        })
        .await
        .unwrap_or_else(|e| {
            ExecutionRecord::failure(
                call.clone(),
                ToolError::execution_failed(format!(
                    "Tool '{}' did not finish: {}",
                    call.tool_name, e
                )),
            )
        });
        finish(call, record, start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartscout_domain::{
        ChartType, ParamType, ToolArguments, ToolCategory, ToolDescriptor, ToolErrorKind,
        ToolFailure, ToolOutcome, ToolParameter,
    };
    use serde_json::json;

    const DEMO_CHART: &str = include_str!("../../../demos/scatter_clustering_001/chart.vl.json");

    fn demo() -> ChartState {
        ChartState::new(serde_json::from_str(DEMO_CHART).unwrap())
    }

    fn executor() -> LocalToolExecutor {
        LocalToolExecutor::new().unwrap()
    }

    #[test]
    fn test_executor_has_all_tools() {
        let executor = executor();
        assert!(executor.has_tool("zoom"));
        assert!(executor.has_tool("identify_clusters"));
        assert!(executor.has_tool("trace_node"));
        assert!(executor.unbound_tools().is_empty());
        assert!(
            executor
                .applicable_tools(ChartType::ScatterPlot)
                .iter()
                .any(|d| d.name == "calculate_correlation")
        );
    }

    #[test]
    fn test_executor_unknown_tool() {
        let record = executor().execute_sync(&ToolCall::new("teleport", 0), &demo());
        assert!(!record.is_success());
        assert_eq!(record.error_kind(), Some(ToolErrorKind::UnknownTool));
        assert!(record.state().is_none());
    }

    #[test]
    fn test_executor_validation_error_names_parameter() {
        let call = ToolCall::new("identify_clusters", 0).with_arg("n_clusters", 50);
        let record = executor().execute_sync(&call, &demo());
        assert_eq!(record.error_kind(), Some(ToolErrorKind::InvalidArgument));
        assert_eq!(record.error().unwrap().parameter.as_deref(), Some("n_clusters"));
    }

    #[test]
    fn test_executor_rejects_undeclared_argument() {
        let call = ToolCall::new("calculate_correlation", 0).with_arg("alpha", 0.05);
        let record = executor().execute_sync(&call, &demo());
        assert_eq!(record.error_kind(), Some(ToolErrorKind::InvalidArgument));
    }

    #[test]
    fn test_executor_fills_defaults_but_records_proposed_arguments() {
        let call = ToolCall::new("identify_clusters", 1);
        let record = executor().execute_sync(&call, &demo());
        assert!(record.is_success());
        assert!(record.call().arguments.is_empty());
        assert_eq!(record.payload().unwrap()["n_clusters"], 3);
        let spec = record.state().unwrap().spec();
        assert_eq!(spec["encoding"]["color"]["field"], "cluster_3");
        assert!(record.duration_ms().is_some());
    }

    #[test]
    fn test_executor_observation_tool_keeps_state() {
        let state = demo();
        let record = executor().execute_sync(&ToolCall::new("calculate_correlation", 0), &state);
        assert!(record.is_success());
        assert_eq!(record.state(), Some(&state));
    }

    #[test]
    fn test_executor_tool_failure() {
        let call = ToolCall::new("zoom", 0).with_arg("area", json!([500, 500, 600, 600]));
        let record = executor().execute_sync(&call, &demo());
        assert_eq!(record.error_kind(), Some(ToolErrorKind::ToolExecutionFailed));
    }

    fn custom_catalog() -> ToolCatalog {
        ToolCatalog::builder()
            .register(
                ToolDescriptor::new("explode", ToolCategory::Action, "always panics").with_param(
                    "force",
                    ToolParameter::new(ParamType::Number, "force").with_default(1.0),
                ),
            )
            .register(ToolDescriptor::new("ghost", ToolCategory::Perception, "never bound"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_executor_unbound_tool() {
        let executor = LocalToolExecutor::with_tools(custom_catalog(), Vec::new());
        assert_eq!(executor.unbound_tools(), vec!["explode", "ghost"]);
        let record = executor.execute_sync(&ToolCall::new("ghost", 0), &demo());
        assert_eq!(record.error_kind(), Some(ToolErrorKind::ToolExecutionFailed));
        assert!(record.error().unwrap().message.contains("not implemented"));
    }

    #[test]
    fn test_executor_catches_panics() {
        let executor = LocalToolExecutor::with_tools(custom_catalog(), Vec::new()).bind(
            "explode",
            |_: &ChartState, _: &ToolArguments| -> Result<ToolOutcome, ToolFailure> {
                panic!("boom")
            },
        );
        let record = executor.execute_sync(&ToolCall::new("explode", 0), &demo());
        assert_eq!(record.error_kind(), Some(ToolErrorKind::ToolExecutionFailed));
        assert!(record.error().unwrap().message.contains("boom"));
    }

    #[tokio::test]
    async fn test_executor_port_execute() {
        let executor = executor();
        let call = ToolCall::new("zoom_dense_area", 0)
            .with_arg("x_range", json!([0, 25]))
            .with_arg("y_range", json!([0, 50]));
        let record = ToolExecutorPort::execute(&executor, &call, &demo()).await;
        assert!(record.is_success());
        assert_eq!(record.payload().unwrap()["visible_count"], 10);
        assert!(record.duration_ms().is_some());
    }

    #[tokio::test]
    async fn test_executor_port_runs_off_the_async_thread() {
        let caller = std::thread::current().id();
        let executor = LocalToolExecutor::with_tools(custom_catalog(), Vec::new()).bind(
            "explode",
            move |state: &ChartState, _: &ToolArguments| -> Result<ToolOutcome, ToolFailure> {
                assert_ne!(std::thread::current().id(), caller);
                Ok(ToolOutcome::new(json!({"mark": state.mark_type()})))
            },
        );
        let record = ToolExecutorPort::execute(&executor, &ToolCall::new("explode", 0), &demo()).await;
        assert!(record.is_success(), "{:?}", record.error());
    }

    #[tokio::test]
    async fn test_executor_port_catches_panics() {
        let executor = LocalToolExecutor::with_tools(custom_catalog(), Vec::new()).bind(
            "explode",
            |_: &ChartState, _: &ToolArguments| -> Result<ToolOutcome, ToolFailure> {
                panic!("boom")
            },
        );
        let record = ToolExecutorPort::execute(&executor, &ToolCall::new("explode", 0), &demo()).await;
        assert_eq!(record.error_kind(), Some(ToolErrorKind::ToolExecutionFailed));
        assert!(record.error().unwrap().message.contains("boom"));

        let record = ToolExecutorPort::execute(&executor, &ToolCall::new("teleport", 0), &demo()).await;
        assert_eq!(record.error_kind(), Some(ToolErrorKind::UnknownTool));
    }
}
