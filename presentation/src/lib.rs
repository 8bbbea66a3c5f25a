//! Presentation layer for chartscout
//!
//! This crate contains CLI definitions, output formatters
//! and progress reporters.

pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{Cli, Command, EvaluateArgs, ExploreArgs, FormatArg, ToolsArgs};
pub use output::{ConsoleFormatter, JsonFormatter, OutputFormatter, formatter_for};
pub use progress::{ProgressReporter, SimpleProgress};
