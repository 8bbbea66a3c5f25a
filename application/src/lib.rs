//! Application layer for chartscout
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::ExplorationParams;
pub use ports::{
    artifact_store::{ArtifactError, ArtifactStore},
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    decision_model::{ChartImage, DecisionContext, DecisionModel, ModelError},
    progress::{ExplorationProgressNotifier, NoExplorationProgress},
    tool_executor::ToolExecutorPort,
};
pub use use_cases::evaluate_transcript::{BatchEntry, EvaluateError, EvaluateTranscriptUseCase};
pub use use_cases::run_exploration::{
    ExplorationError, RunExplorationInput, RunExplorationUseCase,
};
