//! Progress reporting for exploration sessions

use chartscout_application::ExplorationProgressNotifier;
use chartscout_domain::{ChartType, Decision, ExecutionRecord, ToolCall, Transcript};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Reports progress with a round bar and a status message
pub struct ProgressReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn round_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock()
            && let Some(bar) = guard.as_ref()
        {
            f(bar);
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExplorationProgressNotifier for ProgressReporter {
    fn on_session_start(&self, session_id: &str, _query: &str, chart_type: ChartType) {
        let bar = ProgressBar::new(0);
        bar.set_style(Self::round_style());
        bar.set_prefix(format!("Exploring {}", chart_type));
        bar.set_message(session_id.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(bar);
        }
    }

    fn on_round_start(&self, round: usize, max_rounds: usize) {
        self.with_bar(|bar| {
            bar.set_length(max_rounds as u64);
            bar.set_position(round as u64);
        });
    }

    fn on_model_request(&self, _round: usize, attempt: usize) {
        self.with_bar(|bar| {
            if attempt <= 1 {
                bar.set_message("waiting for model...");
            } else {
                bar.set_message(format!("waiting for model (attempt {})...", attempt));
            }
        });
    }

    fn on_model_retry(&self, attempt: usize, max_attempts: usize, error: &str) {
        self.with_bar(|bar| {
            bar.println(format!(
                "  {} attempt {}/{} failed: {}",
                "!".yellow(),
                attempt,
                max_attempts,
                error
            ));
        });
    }

    fn on_tool_call(&self, call: &ToolCall) {
        self.with_bar(|bar| bar.set_message(format!("running {}", call.tool_name)));
    }

    fn on_tool_result(&self, record: &ExecutionRecord) {
        self.with_bar(|bar| {
            let line = match record.error() {
                None => format!("  {} {}", "v".green(), record.call().tool_name),
                Some(error) => format!(
                    "  {} {} ({})",
                    "x".red(),
                    record.call().tool_name,
                    error.message
                ),
            };
            bar.println(line);
        });
    }

    fn on_session_end(&self, transcript: &Transcript) {
        if let Ok(mut guard) = self.bar.lock()
            && let Some(bar) = guard.take()
        {
            bar.finish_with_message(format!(
                "{} after {} rounds",
                transcript.termination.as_str().green(),
                transcript.rounds
            ));
        }
    }
}

/// Simple line-based progress (no fancy UI), written to stderr
pub struct SimpleProgress;

impl ExplorationProgressNotifier for SimpleProgress {
    fn on_session_start(&self, session_id: &str, query: &str, chart_type: ChartType) {
        eprintln!(
            "{} {} on {} ({})",
            "->".cyan(),
            query.bold(),
            chart_type,
            session_id
        );
    }

    fn on_round_start(&self, round: usize, max_rounds: usize) {
        eprintln!("  round {}/{}", round + 1, max_rounds);
    }

    fn on_model_retry(&self, attempt: usize, max_attempts: usize, error: &str) {
        eprintln!("  {} attempt {}/{} failed: {}", "!".yellow(), attempt, max_attempts, error);
    }

    fn on_decision(&self, decision: &Decision) {
        if decision.is_final() {
            eprintln!("  {} final answer", "=>".green());
        }
    }

    fn on_tool_result(&self, record: &ExecutionRecord) {
        match record.error() {
            None => eprintln!("  {} {}", "v".green(), record.call().tool_name),
            Some(error) => eprintln!(
                "  {} {} ({})",
                "x".red(),
                record.call().tool_name,
                error.message
            ),
        }
    }

    fn on_session_end(&self, transcript: &Transcript) {
        eprintln!("  {} {}", "done:".bold(), transcript.termination);
    }
}
