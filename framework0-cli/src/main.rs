//! framework0 CLI entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use framework0::prelude::*;
use framework0::pipeline::PerformanceSummary;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "FRAMEWORK0_LOG";

#[derive(Parser, Debug)]
#[command(name = "framework0")]
#[command(about = "Run and inspect framework0 recipes", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a recipe
    Run(RunArgs),

    /// Validate a recipe and print its execution order
    Validate {
        /// Path to the recipe file
        recipe: PathBuf,
    },

    /// List registered step types
    Steps,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Path to the recipe file
    recipe: PathBuf,

    /// Run only these steps (comma separated)
    #[arg(long, value_delimiter = ',')]
    only: Vec<String>,

    /// Skip these steps (comma separated)
    #[arg(long, value_delimiter = ',')]
    skip: Vec<String>,

    /// Run independent steps concurrently
    #[arg(long)]
    parallel: bool,

    /// Worker limit for parallel runs
    #[arg(long)]
    workers: Option<usize>,

    /// Print the performance summary
    #[arg(long)]
    profile: bool,

    /// Write the execution report to this path
    #[arg(long)]
    export_report: Option<PathBuf>,

    /// Scheduler configuration file, replacing the recipe's own config
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    tracing::debug!(?cli, "framework0 starting");

    let result = match cli.command {
        Commands::Run(args) => run_recipe(&args).await,
        Commands::Validate { recipe } => validate_recipe(&recipe),
        Commands::Steps => {
            list_steps();
            Ok(true)
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(1)
        }
    }
}

/// Builds the effective config: `--config` file or recipe config, then
/// command-line overrides.
fn resolve_config(recipe: &Recipe, args: &RunArgs) -> anyhow::Result<SchedulerConfig> {
    let mut config = match &args.config {
        Some(path) => SchedulerConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => recipe.scheduler_config(),
    };
    if args.parallel {
        config = config.with_parallel(true);
    }
    if let Some(workers) = args.workers {
        config = config.with_max_workers(workers);
    }
    if !args.only.is_empty() {
        config = config.with_only(args.only.iter().cloned());
    }
    if !args.skip.is_empty() {
        config = config.with_skip(args.skip.iter().cloned());
    }
    Ok(config)
}

fn load_recipe(path: &Path) -> anyhow::Result<Recipe> {
    Recipe::from_file(path).with_context(|| format!("loading recipe {}", path.display()))
}

async fn run_recipe(args: &RunArgs) -> anyhow::Result<bool> {
    let recipe = load_recipe(&args.recipe)?;
    let config = resolve_config(&recipe, args)?;

    let registry = Arc::new(StepRegistry::with_builtins());
    let scheduler =
        Scheduler::new(registry, config).with_event_sink(Arc::new(LoggingEventSink::debug()));
    let context = Arc::new(Context::new());

    let outcome = scheduler.run(recipe.steps.clone(), context.clone()).await?;

    println!("Recipe '{}' finished: {}", recipe.name, outcome.state);
    for result in &outcome.results {
        let status = if result.success { "ok" } else { "FAILED" };
        println!(
            "  {:<24} {:<6} exit={:<4} {:.3}s",
            result.step_name, status, result.exit_code, result.duration
        );
        if let Some(message) = &result.error_message {
            println!("    {message}");
        }
    }
    for name in &outcome.skipped {
        println!("  {name:<24} skipped");
    }
    if let Some(error) = &outcome.error {
        println!("Error: {error}");
    }

    let report = ExecutionReport::new(&outcome, &context).with_recipe_name(&recipe.name);
    if args.profile {
        print_profile(&report.performance_summary);
    }
    if let Some(path) = &args.export_report {
        report
            .export(path)
            .with_context(|| format!("exporting report to {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    Ok(outcome.success())
}

fn print_profile(summary: &PerformanceSummary) {
    println!("Performance:");
    println!("  total duration:   {:.3}s", summary.total_duration);
    println!("  steps run:        {}", summary.step_count);
    println!("  average step:     {:.3}s", summary.average_step_duration);
    if let Some(slowest) = &summary.slowest_step {
        println!("  slowest step:     {} ({:.3}s)", slowest.step_name, slowest.duration);
    }
    if let Some(fastest) = &summary.fastest_step {
        println!("  fastest step:     {} ({:.3}s)", fastest.step_name, fastest.duration);
    }
    println!("  context changes:  {}", summary.total_context_changes);
}

fn validate_recipe(path: &Path) -> anyhow::Result<bool> {
    let recipe = load_recipe(path)?;
    let registry = Arc::new(StepRegistry::with_builtins());
    let unknown: Vec<String> = recipe
        .steps
        .iter()
        .map(StepDefinition::registry_key)
        .filter(|key| !registry.contains(key))
        .collect();
    let scheduler = Scheduler::new(registry, recipe.scheduler_config());

    match scheduler.plan(recipe.steps) {
        Ok(order) => {
            println!("Recipe '{}' is valid. Execution order:", recipe.name);
            for (position, name) in order.iter().enumerate() {
                println!("  {}. {name}", position + 1);
            }
            for key in &unknown {
                println!("Warning: no built-in step registered for '{key}'");
            }
            Ok(true)
        }
        Err(err) => {
            println!("Recipe '{}' is invalid: {err}", recipe.name);
            if let Some(info) = &err.error_info {
                println!("  [{}] {}", info.code, info.summary);
            }
            Ok(false)
        }
    }
}

fn list_steps() {
    let registry = StepRegistry::with_builtins();
    for (key, description) in registry.describe() {
        println!("{key:<16} {description}");
    }
}
