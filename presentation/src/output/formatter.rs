//! Output formatter trait

use chartscout_application::BatchEntry;
use chartscout_domain::{ScoreReport, ToolDescriptor, Transcript};

/// Trait for formatting command results
pub trait OutputFormatter {
    /// Format one score report
    fn format_report(&self, report: &ScoreReport) -> String;

    /// Format the outcome of a batch evaluation
    fn format_batch(&self, entries: &[BatchEntry]) -> String;

    /// Summarize a finished exploration
    fn format_transcript(&self, transcript: &Transcript) -> String;

    /// List tool descriptors
    fn format_tools(&self, tools: &[&ToolDescriptor]) -> String;
}
