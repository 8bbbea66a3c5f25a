//! Console output formatter for reports, transcripts and the tool catalog

use crate::output::formatter::OutputFormatter;
use chartscout_application::BatchEntry;
use chartscout_domain::{
    ScoreReport, TerminationState, ToolDescriptor, Transcript, Verdict,
};
use colored::{ColoredString, Colorize};
use serde_json::json;

/// Formats results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format a complete score report
    pub fn format_report(report: &ScoreReport) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Exploration Score"));
        output.push('\n');
        output.push_str(&format!("{} {}\n", "Task:".cyan().bold(), report.task_id));
        output.push_str(&format!("{} {}\n\n", "Session:".cyan().bold(), report.session_id));

        output.push_str(&format!(
            "{} {:.1}  {}\n",
            "Total:".bold(),
            report.total,
            Self::verdict(report.verdict)
        ));

        output.push_str(&Self::section_header("Dimensions"));
        let dimensions = [
            ("Insight", report.scores.insight, report.weights.insight),
            ("Path", report.scores.path, report.weights.path),
            ("Tool usage", report.scores.tool_usage, report.weights.tool_usage),
            ("Efficiency", report.scores.efficiency, report.weights.efficiency),
        ];
        for (name, score, weight) in dimensions {
            output.push_str(&format!(
                "  {:<12} {:>6.1}  (weight {:.2})\n",
                name, score, weight
            ));
        }

        let insights = &report.insights;
        output.push_str(&Self::section_header("Insights"));
        output.push_str(&format!(
            "  recall {:.1}  precision {:.1}  depth {:.1}  ({} of {} claims matched)\n",
            insights.recall, insights.precision, insights.depth, insights.matched_claims, insights.claims
        ));
        output.push_str(&Self::list("Matched critical", &insights.matched_critical, |s| s.green()));
        output.push_str(&Self::list("Missing critical", &insights.missing_critical, |s| s.red()));
        output.push_str(&Self::list("Matched secondary", &insights.matched_secondary, |s| s.green()));

        let path = &report.path;
        output.push_str(&Self::section_header("Path"));
        output.push_str(&format!(
            "  {} rounds, step efficiency {:.1}, milestones {:.0}%\n",
            path.rounds,
            path.step_efficiency,
            path.milestone_ratio * 100.0
        ));
        if let Some(similarity) = path.reference_similarity {
            output.push_str(&format!("  reference path similarity {:.2}\n", similarity));
        }
        output.push_str(&format!(
            "  reasoning coherence {:.1} (not scored)\n",
            path.reasoning_coherence
        ));
        output.push_str(&Self::list("Satisfied", &path.satisfied_milestones, |s| s.green()));
        output.push_str(&Self::list("Unsatisfied", &path.unsatisfied_milestones, |s| s.yellow()));

        let tools = &report.tool_usage;
        output.push_str(&Self::section_header("Tool usage"));
        output.push_str(&format!(
            "  coverage {:.1}  validity {:.1}  invalid calls {}\n",
            tools.coverage, tools.validity, tools.invalid_calls
        ));
        if tools.capped {
            output.push_str(&format!("  {}\n", "capped: a required tool was never used".red()));
        }
        output.push_str(&Self::list("Missing required", &tools.missing_required, |s| s.red()));
        if !tools.inapplicable_calls.is_empty() {
            output.push_str(&format!(
                "  Inapplicable calls at positions {:?}\n",
                tools.inapplicable_calls
            ));
        }

        if !report.efficiency.redundant_calls.is_empty() {
            output.push_str(&Self::section_header("Efficiency"));
            output.push_str(&format!(
                "  redundant calls at positions {:?} (-{:.1})\n",
                report.efficiency.redundant_calls, report.efficiency.redundancy_penalty
            ));
        }

        output.push_str(&Self::footer());
        output
    }

    /// One line per transcript, followed by a pass count
    pub fn format_batch(entries: &[BatchEntry]) -> String {
        let mut output = String::new();
        let mut passing = 0;

        for entry in entries {
            match &entry.result {
                Ok(report) => {
                    if report.verdict.is_passing() {
                        passing += 1;
                    }
                    output.push_str(&format!(
                        "{:>6.1}  {:<10} {}\n",
                        report.total,
                        Self::verdict(report.verdict),
                        entry.source
                    ));
                }
                Err(e) => {
                    output.push_str(&format!(
                        "{:>6}  {:<10} {}: {}\n",
                        "-",
                        "error".red().bold(),
                        entry.source,
                        e
                    ));
                }
            }
        }

        output.push_str(&format!(
            "\n{} {}/{} passing\n",
            "Summary:".bold(),
            passing,
            entries.len()
        ));
        output
    }

    /// Summarize a finished exploration
    pub fn format_transcript(transcript: &Transcript) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{}\n\n",
            "=== Exploration Result ===".cyan().bold()
        ));
        output.push_str(&format!("{} {}\n", "Q:".bold(), transcript.query));
        output.push_str(&format!(
            "{} {} ({}), {} rounds\n\n",
            "Session:".dimmed(),
            transcript.session_id,
            Self::termination(transcript.termination),
            transcript.rounds
        ));

        if !transcript.calls.is_empty() {
            output.push_str(&format!("{}\n", "Calls:".cyan().bold()));
            for call in &transcript.calls {
                let mark = if call.success { "v".green() } else { "x".red() };
                let arguments = json!(call.arguments);
                output.push_str(&format!(
                    "  {} [{}] {} {}\n",
                    mark, call.round, call.tool_name, arguments
                ));
                if let Some(error) = &call.error {
                    output.push_str(&format!("      {}\n", error.to_string().dimmed()));
                }
            }
            output.push('\n');
        }

        output.push_str(&Self::list("Insights", &transcript.insights, |s| s.normal()));

        match (&transcript.final_answer, &transcript.abort_reason) {
            (Some(answer), _) => {
                output.push_str(&format!("\n{}\n{}\n", "Answer:".green().bold(), answer));
            }
            (None, Some(reason)) => {
                output.push_str(&format!("\n{} {}\n", "Aborted:".red().bold(), reason));
            }
            (None, None) => {}
        }

        output
    }

    /// Tools grouped by category, with their parameters
    pub fn format_tools(tools: &[&ToolDescriptor]) -> String {
        let mut output = String::new();

        for tool in tools {
            let scope = if tool.applicable_chart_types.is_empty() {
                "all charts".to_string()
            } else {
                tool.applicable_chart_types
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            output.push_str(&format!(
                "{} {} {}\n    {}\n",
                tool.name.bold(),
                format!("[{}]", tool.category.as_str()).cyan(),
                format!("({})", scope).dimmed(),
                tool.description
            ));
            for (name, param) in &tool.params {
                let required = if param.required { "*" } else { " " };
                let default = param
                    .default
                    .as_ref()
                    .map(|d| format!(" = {}", d))
                    .unwrap_or_default();
                output.push_str(&format!(
                    "    {}{}: {}{}\n",
                    required,
                    name,
                    param.param_type.as_str(),
                    default
                ));
            }
        }

        output.push_str(&format!("\n{} tools\n", tools.len()));
        output
    }

    fn verdict(verdict: Verdict) -> ColoredString {
        match verdict {
            Verdict::Excellent => verdict.as_str().green().bold(),
            Verdict::Good => verdict.as_str().green(),
            Verdict::Pass => verdict.as_str().yellow(),
            Verdict::Fail => verdict.as_str().red().bold(),
        }
    }

    fn termination(state: TerminationState) -> ColoredString {
        match state {
            TerminationState::Completed => state.as_str().green(),
            TerminationState::MaxRoundsExceeded => state.as_str().yellow(),
            TerminationState::Aborted => state.as_str().red(),
        }
    }

    fn list(title: &str, items: &[String], paint: impl Fn(&str) -> ColoredString) -> String {
        if items.is_empty() {
            return String::new();
        }
        let mut output = format!("  {}:\n", title);
        for item in items {
            output.push_str(&format!("    * {}\n", paint(item)));
        }
        output
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_report(&self, report: &ScoreReport) -> String {
        Self::format_report(report)
    }

    fn format_batch(&self, entries: &[BatchEntry]) -> String {
        Self::format_batch(entries)
    }

    fn format_transcript(&self, transcript: &Transcript) -> String {
        Self::format_transcript(transcript)
    }

    fn format_tools(&self, tools: &[&ToolDescriptor]) -> String {
        Self::format_tools(tools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartscout_domain::{
        BenchmarkTask, ChartType, EvaluationConfig, Evaluator, ParamType, ToolCategory,
        ToolParameter,
    };

    const DEMO_TASK: &str = include_str!("../../../demos/scatter_clustering_001/task.json");
    const DEMO_TRANSCRIPT: &str =
        include_str!("../../../demos/scatter_clustering_001/transcript.json");

    fn demo_report() -> ScoreReport {
        let task = BenchmarkTask::from_json(DEMO_TASK).unwrap();
        let transcript = Transcript::from_json(DEMO_TRANSCRIPT).unwrap();
        Evaluator::new(EvaluationConfig::default())
            .unwrap()
            .evaluate(&transcript, &task)
            .unwrap()
    }

    #[test]
    fn test_format_report() {
        colored::control::set_override(false);
        let output = ConsoleFormatter::format_report(&demo_report());
        assert!(output.contains("Task: scatter_clustering_001"));
        assert!(output.contains("Insight"));
        assert!(output.contains("Tool usage"));
        assert!(output.contains("reasoning coherence"));
    }

    #[test]
    fn test_format_batch() {
        colored::control::set_override(false);
        let entries = vec![BatchEntry {
            source: "demo.json".to_string(),
            result: Ok(demo_report()),
        }];
        let output = ConsoleFormatter::format_batch(&entries);
        assert!(output.contains("demo.json"));
        assert!(output.contains("1/1 passing"));
    }

    #[test]
    fn test_format_transcript() {
        colored::control::set_override(false);
        let transcript = Transcript::from_json(DEMO_TRANSCRIPT).unwrap();
        let output = ConsoleFormatter::format_transcript(&transcript);
        assert!(output.contains("completed"));
        assert!(output.contains("identify_clusters"));
        assert!(output.contains("Answer:"));
    }

    #[test]
    fn test_format_tools() {
        colored::control::set_override(false);
        let zoom = ToolDescriptor::new("zoom", ToolCategory::Action, "Zoom into an area")
            .with_param(
                "area",
                ToolParameter::new(ParamType::Array, "[x1, y1, x2, y2]").required(),
            );
        let clusters = ToolDescriptor::new("identify_clusters", ToolCategory::Analysis, "k-means")
            .with_param(
                "n_clusters",
                ToolParameter::new(ParamType::Integer, "clusters").with_default(3),
            )
            .applicable_to(ChartType::ScatterPlot);

        let output = ConsoleFormatter::format_tools(&[&zoom, &clusters]);
        assert!(output.contains("zoom [action] (all charts)"));
        assert!(output.contains("*area: array"));
        assert!(output.contains(" n_clusters: integer = 3"));
        assert!(output.contains("(scatter_plot)"));
        assert!(output.ends_with("2 tools\n"));
    }
}
