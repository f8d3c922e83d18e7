use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::bench::{self, BenchParams, ExecutorKind, Workload};
use crate::config::Config;
use crate::logging;

#[derive(Parser)]
#[command(name = "proutines")]
#[command(about = "Proutines - cooperative single-stepped coroutines", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Measure tick throughput of an executor
    Bench {
        /// Number of coroutines to run side by side
        #[arg(long, default_value = "100")]
        coroutines: usize,

        /// Ticks to run (thread executor: ticks per coroutine to wait for)
        #[arg(long, default_value = "1000")]
        ticks: u64,

        /// Executor to measure
        #[arg(long, value_enum, default_value = "registry")]
        executor: ExecutorKind,

        /// What each coroutine does per tick
        #[arg(long, value_enum, default_value = "counter")]
        workload: Workload,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    run_cli_with_args(Cli::parse())
}

/// Run the CLI with provided arguments
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    run_cli_with_args(Cli::parse_from(args))
}

fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load before executing anything so config errors show up first
    let config = Config::builder()
        .config_path(cli.config.clone())
        .build()
        .context("Failed to load configuration")?;
    logging::init_tracing(&config.logging.filter);

    match cli.command {
        Commands::Bench {
            coroutines,
            ticks,
            executor,
            workload,
            json,
        } => {
            let params = BenchParams {
                coroutines,
                ticks,
                executor,
                workload,
                executor_config: config.executor.clone(),
            };
            tracing::info!(coroutines, ticks, ?executor, ?workload, "starting benchmark");

            let report = bench::run_bench(&params)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                bench::display_report(&report);
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
