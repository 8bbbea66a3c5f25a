//! Domain layer for chartscout
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Exploration
//!
//! A [`Session`] explores one chart ([`ChartState`]) by asking a model for
//! [`Decision`]s and executing the proposed [`ToolCall`]s. Every attempt is
//! recorded as an [`ExecutionRecord`]; only successful records change the
//! chart. A terminated session projects into a [`Transcript`].
//!
//! ## Benchmark
//!
//! The [`Evaluator`] scores a [`Transcript`] against a [`BenchmarkTask`]
//! along four dimensions and derives a [`Verdict`].

pub mod benchmark;
pub mod chart;
pub mod config;
pub mod core;
pub mod prompt;
pub mod session;
pub mod tool;
pub mod transcript;

// Re-export commonly used types
pub use benchmark::{
    BenchmarkTask, EvaluationConfig, EvaluationConfigError, EvaluationError, Evaluator,
    MalformedTaskError, ScoreReport, ScoreWeights, SubScores, Verdict, VerdictThresholds,
};
pub use chart::{ChartState, ChartType};
pub use config::OutputFormat;
pub use core::error::DomainError;
pub use prompt::ExplorationPromptTemplate;
pub use session::{
    Decision, DecisionParseError, Message, ProposedCall, RESET_VIEW_TOOL, Role, Session,
    SessionError, SessionStatus, parse_decision, require_offered_tools, reset_view_descriptor,
};
pub use tool::{
    ArgumentViolation, CallHistory, CatalogError, ChartTool, DefaultToolValidator,
    ExecutionRecord, ParamType, ToolArguments, ToolCall, ToolCatalog, ToolCategory,
    ToolDescriptor, ToolError, ToolErrorKind, ToolFailure, ToolOutcome, ToolParameter,
    ToolValidator,
};
pub use transcript::{MalformedTranscriptError, TerminationState, Transcript, TranscriptCall};
