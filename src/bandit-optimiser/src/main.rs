//! Bandit Optimiser: Thompson sampling traffic allocation demo.
//!
//! Initializes an experiment, runs simulated rounds and prints the resulting
//! log and per-variant posterior summaries as JSON for external rendering.

use anyhow::Context;
use bandit_core::config::AppConfig;
use bandit_core::{RetentionWindow, VariantSet};
use bandit_rl_engine::{ExperimentReport, ExperimentSession, RoundSummary};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "bandit-optimiser")]
#[command(about = "Optimise variant traffic with Bayesian statistics, using Thompson sampling")]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true, env = "BANDIT_OPTIMISER_CONFIG")]
    config: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize an experiment, run simulation rounds and print the report
    Run {
        /// Number of simulate rounds after initialization
        #[arg(short, long, default_value_t = 10)]
        rounds: usize,

        /// Comma-separated variants (overrides config), e.g. "Video, Text, Image"
        #[arg(short, long)]
        variants: Option<String>,

        /// Retention window for the report: none, trailing_30_days, trailing_60_days
        #[arg(long)]
        retention: Option<String>,

        /// RNG seed for a reproducible run (overrides config)
        #[arg(long)]
        seed: Option<u64>,

        /// Print only the final report, without per-round summaries
        #[arg(long, default_value_t = false)]
        report_only: bool,
    },

    /// Print the resolved configuration
    ShowConfig,
}

#[derive(Serialize)]
struct RunOutput {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rounds: Vec<RoundSummary>,
    report: ExperimentReport,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            rounds,
            variants,
            retention,
            seed,
            report_only,
        } => {
            // Apply CLI overrides
            if let Some(list) = variants {
                let parsed = VariantSet::parse_list(&list).context("invalid --variants")?;
                config.experiment.variants = parsed.into();
            }
            if let Some(window) = retention {
                config.experiment.retention = window
                    .parse::<RetentionWindow>()
                    .context("invalid --retention")?;
            }
            if seed.is_some() {
                config.experiment.seed = seed;
            }

            let output = run_experiment(&config, rounds, report_only)?;
            write_json(&output)?;
        }
        Commands::ShowConfig => {
            config.validate().context("configuration is invalid")?;
            write_json(&config)?;
        }
    }

    Ok(())
}

/// An explicitly named config file must load; without one, environment
/// errors fall back to defaults.
fn load_config(path: Option<&str>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(Some(path))
            .with_context(|| format!("failed to load configuration from {path}")),
        None => Ok(AppConfig::load(None).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            AppConfig::default()
        })),
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bandit_optimiser=info,bandit_rl_engine=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run_experiment(config: &AppConfig, rounds: usize, report_only: bool) -> anyhow::Result<RunOutput> {
    let mut session =
        ExperimentSession::from_config(config).context("failed to create experiment session")?;

    info!(
        session_id = %session.id(),
        variants = session.variants().len(),
        rounds,
        seeded = config.experiment.seed.is_some(),
        "Experiment starting"
    );

    let mut summaries = Vec::with_capacity(rounds + 1);
    summaries.push(session.initialize().context("initialize round failed")?);
    for _ in 0..rounds {
        summaries.push(session.simulate().context("simulate round failed")?);
    }

    let report = session.report().context("failed to build report")?;
    info!(day = report.day, records = report.records.len(), "Experiment finished");

    Ok(RunOutput {
        rounds: if report_only { Vec::new() } else { summaries },
        report,
    })
}

fn write_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value).context("failed to serialise output")?;
    writeln!(out)?;
    Ok(())
}
