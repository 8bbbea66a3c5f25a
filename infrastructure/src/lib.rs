//! Infrastructure layer for chartscout
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the built-in chart tools and their executor,
//! decision model clients, configuration file loading, conversation logging
//! and artifact storage.

pub mod config;
pub mod logging;
pub mod providers;
pub mod storage;
pub mod tools;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileExplorationConfig, FileLoggingConfig,
    FileModelConfig, FileOutputConfig, FileOutputFormat,
};
pub use logging::JsonlConversationLogger;
pub use providers::{
    AnthropicDecisionModel, OpenAiDecisionModel, ProviderError, ProviderKind,
    ScriptedDecisionModel, build_decision_model,
};
pub use storage::{FileArtifactStore, load_chart_image};
pub use tools::{JsonSchemaToolConverter, LocalToolExecutor, ToolBinding, default_catalog};
