use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use evloop_scenarios::{Scenario, ScenarioOptions};
use evloop_scheduler::SchedulerConfig;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "evloop")]
#[command(about = "Watch a single-threaded event loop order its work", long_about = None)]
struct Cli {
    /// JSON file with scheduler settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available scenarios
    List,
    /// Run one scenario and print its output
    Run {
        /// Scenario name, see `evloop list`
        scenario: Scenario,
        #[command(flatten)]
        args: RunArgs,
    },
    /// Run every scenario in turn
    RunAll {
        #[command(flatten)]
        args: RunArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// File read by the I/O scenarios
    #[arg(long, default_value = "./file.txt")]
    file: PathBuf,
    /// PBKDF2 iterations for the key derivation scenario
    #[arg(long, default_value_t = 100_000)]
    rounds: u32,
    /// Passes the simulated network request takes
    #[arg(long, default_value_t = 2)]
    network_latency: u32,
}

fn load_config(path: Option<&Path>) -> Result<SchedulerConfig> {
    let Some(path) = path else {
        return Ok(SchedulerConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

fn scenario_options(args: &RunArgs, scheduler: SchedulerConfig) -> ScenarioOptions {
    ScenarioOptions {
        file_path: args.file.clone(),
        key_rounds: args.rounds,
        network_latency_passes: args.network_latency,
        echo: true,
        scheduler,
    }
}

fn run_scenario(scenario: Scenario, options: &ScenarioOptions) -> Result<()> {
    let outcome = evloop_scenarios::run(scenario, options);
    let summary = outcome
        .result
        .with_context(|| format!("scenario {scenario} failed"))?;
    tracing::info!(
        %scenario,
        passes = summary.passes,
        tick = summary.final_tick,
        callbacks = summary.total_invocations(),
        "scenario finished"
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::List => {
            let mut out = io::stdout().lock();
            for scenario in Scenario::ALL {
                if writeln!(out, "{:<18} {}", scenario.name(), scenario.description()).is_err() {
                    break;
                }
            }
        }
        Commands::Run { scenario, args } => {
            run_scenario(scenario, &scenario_options(&args, config))?;
        }
        Commands::RunAll { args } => {
            let options = scenario_options(&args, config);
            let mut failed = Vec::new();
            for scenario in Scenario::ALL {
                let _ = writeln!(io::stdout(), "== {scenario} ==");
                if let Err(err) = run_scenario(scenario, &options) {
                    eprintln!("{err:#}");
                    failed.push(scenario.name());
                }
            }
            if !failed.is_empty() {
                anyhow::bail!("scenarios failed: {}", failed.join(", "));
            }
        }
    }

    Ok(())
}
