//! CLI command definitions

use chartscout_domain::ChartType;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Report format for command output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Human-readable console output
    Text,
    /// Pretty-printed JSON
    Json,
}

impl From<FormatArg> for chartscout_domain::OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => chartscout_domain::OutputFormat::Text,
            FormatArg::Json => chartscout_domain::OutputFormat::Json,
        }
    }
}

fn parse_chart_type(s: &str) -> Result<ChartType, String> {
    s.parse()
}

/// CLI arguments for chartscout
#[derive(Parser, Debug)]
#[command(name = "chartscout")]
#[command(author, version, about = "Let a vision-language model explore a chart with tools, then score the exploration")]
#[command(long_about = r#"
chartscout drives a vision-language model through a chart exploration:
the model proposes tool calls (zoom, filter, cluster, ...), chartscout
validates and executes them against the Vega-Lite specification, and the
results are fed back until the model answers or the round budget runs out.
Finished explorations are saved as transcripts and can be scored against a
benchmark task.

Configuration files are loaded from (in priority order):
1. CHARTSCOUT_<SECTION>__<KEY>            Environment variables
2. --config <path>                        Explicit config file
3. ./chartscout.toml                      Project-level config
4. ~/.config/chartscout/config.toml       Global config

Example:
  chartscout tools --chart-type scatter
  chartscout explore --spec chart.vl.json --query "Which groups exist?"
  chartscout evaluate --task task.json out/transcripts/*.json
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one exploration session and save its transcript
    Explore(ExploreArgs),
    /// Score transcripts against a benchmark task
    Evaluate(EvaluateArgs),
    /// List the tool catalog
    Tools(ToolsArgs),
}

#[derive(Args, Debug)]
pub struct ExploreArgs {
    /// Vega-Lite specification of the chart (JSON)
    #[arg(long, value_name = "PATH")]
    pub spec: PathBuf,

    /// Question to answer about the chart
    #[arg(long)]
    pub query: Option<String>,

    /// Benchmark task; supplies the query and task id when given
    #[arg(long, value_name = "PATH")]
    pub task: Option<PathBuf>,

    /// Override chart type detection
    #[arg(long, value_parser = parse_chart_type)]
    pub chart_type: Option<ChartType>,

    /// Rendered chart image sent to the model
    #[arg(long, value_name = "PATH")]
    pub image: Option<PathBuf>,

    /// Override [exploration] max_rounds
    #[arg(long, value_name = "N")]
    pub max_rounds: Option<usize>,

    /// Override [output] directory
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Score the transcript against --task right away
    #[arg(long, requires = "task")]
    pub evaluate: bool,

    /// Static baseline: offer no tools and accept a single final answer
    #[arg(long, conflicts_with = "max_rounds")]
    pub no_tools: bool,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Transcript files to score
    #[arg(required = true, value_name = "TRANSCRIPT")]
    pub transcripts: Vec<PathBuf>,

    /// Benchmark task file
    #[arg(long, value_name = "PATH", required_unless_present = "tasks_dir")]
    pub task: Option<PathBuf>,

    /// Directory of task files; transcripts are matched by task id
    #[arg(long, value_name = "DIR")]
    pub tasks_dir: Option<PathBuf>,

    /// Output format (defaults to [output] format)
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Save each report under the output directory
    #[arg(long)]
    pub save: bool,

    /// Override [output] directory
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Only tools applicable to this chart type
    #[arg(long, value_parser = parse_chart_type)]
    pub chart_type: Option<ChartType>,

    /// Print JSON Schema instead of a table
    #[arg(long)]
    pub schema: bool,
}
