//! aka-orchestrator - 5G authentication performance test orchestrator
//!
//! Runs the configured (method × ue_count × iteration) matrix against an
//! external 5G core and radio simulator, then consolidates the per-cell
//! artifacts into summary statistics and comparison charts.
//!
//! # Usage
//!
//! ```bash
//! aka-orchestrator --config orchestrator.yaml
//! aka-orchestrator --auth-methods 5G_AKA EAP_AKA --ue-counts 10 25 --iterations 3
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::{error, info, warn};

use akaperf_common::{init_logging_with_file, AuthMethod, LogLevel, OrchestratorConfig};
use akaperf_orchestrator::{plot, results, Orchestrator};

/// 5G Authentication Performance Test Orchestrator
#[derive(Parser, Debug)]
#[command(name = "aka-orchestrator")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file (optional)
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Authentication methods to test (overrides config)
    #[arg(long = "auth-methods", value_name = "METHOD", num_args = 1..)]
    auth_methods: Option<Vec<AuthMethod>>,

    /// UE counts to test (overrides config)
    #[arg(long = "ue-counts", value_name = "N", num_args = 1..)]
    ue_counts: Option<Vec<u32>>,

    /// Number of iterations per test (overrides config)
    #[arg(long = "iterations", value_name = "K")]
    iterations: Option<u32>,
}

/// Applies CLI overrides on top of the loaded configuration.
/// Precedence: CLI > YAML file > built-in defaults.
fn apply_overrides(config: &mut OrchestratorConfig, args: &Args) {
    if let Some(methods) = &args.auth_methods {
        config.test_configuration.authentication_methods = methods.clone();
    }
    if let Some(counts) = &args.ue_counts {
        config.test_configuration.ue_counts = counts.clone();
    }
    if let Some(iterations) = args.iterations {
        config.test_configuration.iterations_per_test = iterations;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    println!("akaperf - 5G Authentication Performance Test Orchestrator");
    println!("=========================================================");

    match run(args).await {
        Ok(clean) => {
            if clean {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            // The failure may predate logging setup, so report on stderr
            eprintln!("ERROR: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<bool> {
    let mut config = OrchestratorConfig::load(args.config.as_deref());
    apply_overrides(&mut config, &args);
    config.validate().context("Invalid configuration")?;

    let results_dir = PathBuf::from(format!(
        "{}_{}",
        config.output.results_dir_prefix,
        Local::now().format("%Y%m%d_%H%M%S")
    ));
    std::fs::create_dir_all(&results_dir)
        .with_context(|| format!("Failed to create results directory {}", results_dir.display()))?;

    let level: LogLevel = config.output.log_level.parse().unwrap_or_default();
    init_logging_with_file(level, &results_dir.join("test_orchestrator.log"))
        .context("Failed to initialize logging")?;

    info!("Results directory: {}", results_dir.display());

    let mut orchestrator = Orchestrator::new(config.clone(), results_dir.clone());
    let outcome = orchestrator.run().await?;
    let records = orchestrator.records();

    if records.is_empty() {
        warn!("No test results to summarize");
        return Ok(!outcome.aborted);
    }

    if config.output.consolidate_results {
        results::write_consolidated_json(&results_dir, records)?;
        results::write_test_summary_csv(&results_dir, records)?;
    }

    let stats = results::compute_summary(records);
    results::write_summary_statistics_csv(&results_dir, &stats)?;

    if config.output.generate_plots {
        let chart = results_dir.join("performance_comparison.png");
        if let Err(e) = plot::render_comparison_chart(&chart, &stats) {
            error!("Failed to generate plots: {e}");
        }
    }

    info!("Summary report generated in {}", results_dir.display());
    Ok(!outcome.aborted && !outcome.interrupted)
}
