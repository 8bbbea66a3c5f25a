//! Tool Executor port
//!
//! Defines the interface for executing chart tools against a chart state.

use async_trait::async_trait;
use chartscout_domain::{ChartState, ChartType, ExecutionRecord, ToolCall, ToolCatalog, ToolDescriptor};

/// Port for tool execution
///
/// `execute` never fails: unknown tools, invalid arguments and tool failures
/// come back as a failed [`ExecutionRecord`]. The executor never touches a
/// session; a successful record carries the candidate state and the caller
/// decides whether to apply it.
#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// Catalog of every tool this executor knows
    fn catalog(&self) -> &ToolCatalog;

    /// Check if a tool is available
    fn has_tool(&self, name: &str) -> bool {
        self.catalog().contains(name)
    }

    /// Tools offered to the model for a chart type
    fn applicable_tools(&self, chart_type: ChartType) -> Vec<&ToolDescriptor> {
        self.catalog().list_applicable(chart_type)
    }

    /// Execute one call against `state`
    async fn execute(&self, call: &ToolCall, state: &ChartState) -> ExecutionRecord;
}
