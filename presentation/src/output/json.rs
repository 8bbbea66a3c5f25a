//! JSON output formatter

use crate::output::formatter::OutputFormatter;
use chartscout_application::BatchEntry;
use chartscout_domain::{ScoreReport, ToolDescriptor, Transcript};
use serde::Serialize;
use serde_json::json;

/// Formats results as pretty-printed JSON
pub struct JsonFormatter;

impl JsonFormatter {
    fn pretty(value: &impl Serialize) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &ScoreReport) -> String {
        Self::pretty(report)
    }

    fn format_batch(&self, entries: &[BatchEntry]) -> String {
        let entries: Vec<_> = entries
            .iter()
            .map(|entry| match &entry.result {
                Ok(report) => json!({"source": entry.source, "report": report}),
                Err(e) => json!({"source": entry.source, "error": e.to_string()}),
            })
            .collect();
        Self::pretty(&entries)
    }

    fn format_transcript(&self, transcript: &Transcript) -> String {
        Self::pretty(transcript)
    }

    fn format_tools(&self, tools: &[&ToolDescriptor]) -> String {
        Self::pretty(&tools)
    }
}
