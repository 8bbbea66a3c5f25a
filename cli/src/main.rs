//! CLI entrypoint for chartscout
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use chartscout_application::{
    ArtifactStore, ConversationLogger, EvaluateTranscriptUseCase, ExplorationProgressNotifier,
    NoExplorationProgress, RunExplorationInput, RunExplorationUseCase, ToolExecutorPort,
};
use chartscout_domain::{BenchmarkTask, ChartType, Transcript};
use chartscout_infrastructure::{
    ConfigLoader, FileArtifactStore, FileConfig, JsonSchemaToolConverter, JsonlConversationLogger,
    LocalToolExecutor, build_decision_model, load_chart_image,
};
use chartscout_presentation::{
    Cli, Command, EvaluateArgs, ExploreArgs, ProgressReporter, SimpleProgress, ToolsArgs,
    formatter_for,
};
use clap::{CommandFactory, Parser};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        for line in ConfigLoader::config_sources(cli.config.as_deref()) {
            println!("{}", line);
        }
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    let _log_guard = init_logging(cli.verbose, config.logging.file.as_deref())?;

    let issues = config.validate();
    if !issues.is_empty() {
        let listing: Vec<String> = issues.iter().map(|i| format!("  - {}", i)).collect();
        bail!("Invalid configuration:\n{}", listing.join("\n"));
    }

    if !config.output.color {
        colored::control::set_override(false);
    }

    info!("Starting chartscout");

    match cli.command {
        Some(Command::Explore(args)) => run_explore(args, &config, cli.quiet).await,
        Some(Command::Evaluate(args)) => run_evaluate(args, &config).await,
        Some(Command::Tools(args)) => run_tools(args, &config),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

/// Install the stderr subscriber, plus a file layer when configured
fn init_logging(verbose: u8, file: Option<&str>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let (file_layer, guard) = match file {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow!("logging.file has no file name: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

fn output_dir(config: &FileConfig, out: Option<PathBuf>) -> PathBuf {
    out.unwrap_or_else(|| PathBuf::from(&config.output.directory))
}

async fn run_explore(args: ExploreArgs, config: &FileConfig, quiet: bool) -> Result<()> {
    let out_dir = output_dir(config, args.out.clone());
    let store = FileArtifactStore::new(out_dir.clone());

    let spec_text = std::fs::read_to_string(&args.spec)
        .with_context(|| format!("Failed to read chart spec {}", args.spec.display()))?;
    let spec: serde_json::Value = serde_json::from_str(&spec_text)
        .with_context(|| format!("Chart spec {} is not valid JSON", args.spec.display()))?;

    let task = match &args.task {
        Some(path) => Some(store.load_task(path).await?),
        None => None,
    };

    let query = args
        .query
        .clone()
        .or_else(|| task.as_ref().map(|t| t.query.clone()))
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| anyhow!("A query is required: pass --query or a --task with a query"))?;

    let mut input = RunExplorationInput::new(query, spec);
    let chart_type = args.chart_type.or_else(|| {
        task.as_ref()
            .map(|t| t.chart_type)
            .filter(|t| *t != ChartType::Unknown)
    });
    if let Some(chart_type) = chart_type {
        input = input.with_chart_type(chart_type);
    }
    if let Some(task) = &task {
        input = input.with_task_id(task.task_id.clone());
    }
    if let Some(path) = &args.image {
        input = input.with_image(load_chart_image(path).await?);
    }

    let mut params = config.exploration.to_params();
    if let Some(max_rounds) = args.max_rounds {
        if max_rounds == 0 {
            bail!("--max-rounds must be at least 1");
        }
        params = params.with_max_rounds(max_rounds);
    }
    if args.no_tools {
        params = params.with_tools_enabled(false);
    }

    // === Dependency Injection ===
    let model = build_decision_model(&config.model)?;
    let executor = Arc::new(LocalToolExecutor::new()?);

    let progress: Arc<dyn ExplorationProgressNotifier> = if quiet {
        Arc::new(NoExplorationProgress)
    } else if std::io::stderr().is_terminal() {
        Arc::new(ProgressReporter::new())
    } else {
        Arc::new(SimpleProgress)
    };

    let cancellation = CancellationToken::new();
    let ctrl_c_token = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; finishing the current round");
            ctrl_c_token.cancel();
        }
    });

    let mut use_case = RunExplorationUseCase::new(model, executor)
        .with_params(params)
        .with_progress(progress)
        .with_cancellation(cancellation);

    if config.logging.conversation_log {
        let dir = config.logging.conversation_dir(&out_dir.to_string_lossy());
        if let Some(logger) = JsonlConversationLogger::in_directory(&dir) {
            info!(path = %logger.path().display(), "Writing conversation log");
            let logger: Arc<dyn ConversationLogger> = Arc::new(logger);
            use_case = use_case.with_logger(logger);
        }
    }

    let transcript = use_case.execute(input).await?;
    let path = store.save_transcript(&transcript).await?;

    let formatter = formatter_for(config.output.format);
    println!("{}", formatter.format_transcript(&transcript));
    eprintln!("Transcript saved to {}", path.display());

    if args.evaluate
        && let Some(task) = &task
    {
        let use_case = EvaluateTranscriptUseCase::new(config.evaluation.clone())?;
        let report = use_case.execute(&transcript, task)?;
        println!("{}", formatter.format_report(&report));
        let path = store.save_report(&report).await?;
        eprintln!("Report saved to {}", path.display());
    }

    Ok(())
}

/// Task files given with --task and found in --tasks-dir
async fn load_tasks(store: &FileArtifactStore, args: &EvaluateArgs) -> Result<Vec<BenchmarkTask>> {
    let mut paths = Vec::new();
    if let Some(path) = &args.task {
        paths.push(path.clone());
    }
    if let Some(dir) = &args.tasks_dir {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read tasks directory {}", dir.display()))?;
        let mut found: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        found.sort();
        paths.extend(found);
    }

    let mut tasks = Vec::with_capacity(paths.len());
    for path in &paths {
        tasks.push(store.load_task(path).await?);
    }
    if tasks.is_empty() {
        bail!("No task files found");
    }
    Ok(tasks)
}

async fn run_evaluate(args: EvaluateArgs, config: &FileConfig) -> Result<()> {
    let store = FileArtifactStore::new(output_dir(config, args.out.clone()));
    let tasks = load_tasks(&store, &args).await?;
    let use_case = EvaluateTranscriptUseCase::new(config.evaluation.clone())?;

    let mut transcripts: Vec<(String, Transcript)> = Vec::new();
    let mut load_failures = 0;
    for path in &args.transcripts {
        match store.load_transcript(path).await {
            Ok(transcript) => transcripts.push((path.display().to_string(), transcript)),
            Err(e) => {
                load_failures += 1;
                eprintln!("error: {}", e);
            }
        }
    }

    let entries = use_case.execute_batch(transcripts, &tasks);
    let format = args.format.map(Into::into).unwrap_or(config.output.format);
    let formatter = formatter_for(format);

    match entries.as_slice() {
        [single] if load_failures == 0 => match &single.result {
            Ok(report) => println!("{}", formatter.format_report(report)),
            Err(_) => println!("{}", formatter.format_batch(&entries)),
        },
        _ => println!("{}", formatter.format_batch(&entries)),
    }

    if args.save {
        for report in entries.iter().filter_map(|e| e.result.as_ref().ok()) {
            let path = store.save_report(report).await?;
            eprintln!("Report saved to {}", path.display());
        }
    }

    let failures = load_failures + entries.iter().filter(|e| e.result.is_err()).count();
    if failures > 0 {
        bail!("{} transcript(s) could not be evaluated", failures);
    }
    Ok(())
}

fn run_tools(args: ToolsArgs, config: &FileConfig) -> Result<()> {
    let executor = LocalToolExecutor::new()?;
    let catalog = executor.catalog();

    let mut tools = match args.chart_type {
        Some(chart_type) => catalog.list_applicable(chart_type),
        None => catalog.all().collect(),
    };
    tools.sort_by(|a, b| a.category.as_str().cmp(b.category.as_str()).then(a.name.cmp(&b.name)));

    if args.schema {
        let schema = JsonSchemaToolConverter.tools_schema(tools.iter().copied());
        println!("{}", serde_json::to_string_pretty(&schema)?);
    } else {
        println!("{}", formatter_for(config.output.format).format_tools(&tools));
    }
    Ok(())
}
