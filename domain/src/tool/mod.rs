//! Tool domain module
//!
//! This module defines how a model acts on a chart: every tool is described
//! by a [`ToolDescriptor`] (name, category, parameters, applicable chart
//! types), proposed as a [`ToolCall`], and produces exactly one
//! [`ExecutionRecord`].
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌─────────────────┐
//! │ ToolCatalog  │───▶│ ToolCall     │───▶│ ExecutionRecord │
//! │ (registry)   │    │ (proposal)   │    │ (outcome)       │
//! └──────────────┘    └──────────────┘    └────────┬────────┘
//!                                                  │
//!                                                  └─▶ CallHistory (append-only)
//! ```
//!
//! # Key Types
//!
//! - [`ToolCatalog`]: Registry of descriptors, queried by name or chart type
//! - [`ToolDescriptor`]: Schema for a single tool
//! - [`ToolValidator`]: Pure argument validation against a descriptor
//! - [`ChartTool`]: Synchronous tool body, implemented in infrastructure
//! - [`ToolError`] / [`ToolErrorKind`]: Failure classification
//!
//! # Architecture
//!
//! - **Domain** (this module): Pure definitions, no I/O
//! - **Application** (`ToolExecutorPort`): Port trait for tool execution
//! - **Infrastructure** (`LocalToolExecutor`): Lookup, validation, default
//!   filling and dispatch to the built-in chart tools

pub mod catalog;
pub mod entities;
pub mod history;
pub mod traits;
pub mod value_objects;

pub use catalog::{CatalogError, ToolCatalog, ToolCatalogBuilder};
pub use entities::{
    ParamConstraints, ParamType, ToolArguments, ToolCall, ToolCategory, ToolDescriptor,
    ToolParameter,
};
pub use history::CallHistory;
pub use traits::{ArgumentViolation, ChartTool, DefaultToolValidator, ToolValidator};
pub use value_objects::{ExecutionRecord, ToolError, ToolErrorKind, ToolFailure, ToolOutcome};
