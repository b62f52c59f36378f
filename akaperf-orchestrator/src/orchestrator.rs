//! Test matrix orchestration.
//!
//! Enumerates the (method × ue_count × iteration) matrix and executes each
//! cell to completion, strictly sequentially. A cell walks through:
//! apply auth method, restart core, provision subscribers, write UE config
//! variants, start the radio simulator, start the sampler, launch the UE
//! fleet, wait the scaled test duration, stop the sampler, tear down,
//! parse artifacts into a run record. Failed cells are retried up to the
//! configured budget; after that the failure policy decides whether the
//! matrix continues or aborts.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use tokio::signal;
use tokio::time::sleep;
use tracing::{error, info, warn};

use akaperf_common::{Error, OrchestratorConfig, RunRecord, TestCell};

use crate::command;
use crate::launcher::UeFleet;
use crate::results;
use crate::sampler::MetricsSampler;
use crate::services::ServiceDriver;
use crate::ue_config;

/// How the matrix ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixOutcome {
    /// Cells in the configured matrix
    pub total: usize,
    /// Cells that ran to completion
    pub completed: usize,
    /// Cells that exhausted their retries
    pub failed: usize,
    /// The matrix was interrupted by the user
    pub interrupted: bool,
    /// A failure stopped the matrix (continue_on_failure = false)
    pub aborted: bool,
}

/// Sequential executor of the test matrix.
pub struct Orchestrator {
    config: OrchestratorConfig,
    results_dir: PathBuf,
    records: Vec<RunRecord>,
}

impl Orchestrator {
    /// Creates an orchestrator writing all artifacts under `results_dir`.
    pub fn new(config: OrchestratorConfig, results_dir: PathBuf) -> Self {
        Self { config, results_dir, records: Vec::new() }
    }

    /// Run records collected so far, in execution order.
    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    /// Executes the whole matrix.
    pub async fn run(&mut self) -> Result<MatrixOutcome, Error> {
        let cells = self.config.test_configuration.cells();
        let total = cells.len();

        info!("Starting {total} tests");
        info!(
            "Auth methods: {:?}",
            self.config
                .test_configuration
                .authentication_methods
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        );
        info!("UE counts: {:?}", self.config.test_configuration.ue_counts);
        info!("Iterations: {}", self.config.test_configuration.iterations_per_test);

        let mut outcome =
            MatrixOutcome { total, completed: 0, failed: 0, interrupted: false, aborted: false };

        for (i, cell) in cells.iter().enumerate() {
            info!("Progress: test {}/{total}", i + 1);

            let record = tokio::select! {
                record = self.run_cell_with_retry(cell) => Some(record),
                _ = signal::ctrl_c() => None,
            };

            let Some(record) = record else {
                warn!("Interrupted by user; tearing down and stopping the matrix");
                let cleanup = &self.config.scripts.cleanup_ues;
                if !cleanup.is_empty() {
                    command::probe(cleanup).await;
                }
                outcome.interrupted = true;
                break;
            };

            let success = record.success;
            self.records.push(record);

            if success {
                outcome.completed += 1;
                info!("Completed test: {cell}");
            } else {
                outcome.failed += 1;
                if !self.config.error_handling.continue_on_failure {
                    error!("Test {cell} failed and continue_on_failure is false, stopping");
                    outcome.aborted = true;
                    break;
                }
                error!("Test {cell} failed, continuing with next test");
            }

            if i + 1 < total {
                let wait = self.config.timing.inter_test_wait;
                info!("Resting {wait} seconds before next test");
                sleep(Duration::from_secs(wait)).await;
            }
        }

        info!(
            "Matrix finished: {} completed, {} failed out of {total}",
            outcome.completed, outcome.failed
        );
        Ok(outcome)
    }

    /// Runs one cell, retrying up to the configured budget.
    ///
    /// Returns a failure-marked record when every attempt failed.
    async fn run_cell_with_retry(&self, cell: &TestCell) -> RunRecord {
        let attempts = 1 + self.config.error_handling.max_retries;

        for attempt in 1..=attempts {
            match self.run_cell(cell).await {
                Ok(record) => return record,
                Err(e) => {
                    error!("Test {cell} attempt {attempt}/{attempts} failed: {e}");
                    if self.config.error_handling.cleanup_on_error {
                        let cleanup = &self.config.scripts.cleanup_ues;
                        if !cleanup.is_empty() {
                            command::probe(cleanup).await;
                        }
                        sleep(Duration::from_secs(self.config.timing.cleanup_wait)).await;
                    }
                    if attempt < attempts {
                        info!("Retrying test {cell}");
                    }
                }
            }
        }

        let now = Local::now();
        RunRecord {
            cell: *cell,
            start_time: now,
            end_time: now,
            duration_sec: 0.0,
            success: false,
            metrics: None,
            recorded_at: now,
        }
    }

    /// One attempt at one cell.
    async fn run_cell(&self, cell: &TestCell) -> Result<RunRecord, Error> {
        let cell_dir = self.results_dir.join(cell.dir_name());
        std::fs::create_dir_all(&cell_dir)?;

        info!("Starting test: {cell}");
        let services = ServiceDriver::new(&self.config);

        services
            .apply_auth_method(cell.method)
            .await
            .inspect_err(|e| error!("{cell}: step `change_auth` failed: {e}"))?;

        services
            .restart_core()
            .await
            .inspect_err(|e| error!("{cell}: step `start_services` failed: {e}"))?;

        services
            .provision_subscribers(cell.ue_count)
            .await
            .inspect_err(|e| error!("{cell}: step `add_subscribers` failed: {e}"))?;

        let variants = ue_config::write_variants(
            std::path::Path::new(&self.config.ue_template.path),
            &cell_dir.join("ue_configs"),
            cell.ue_count,
            self.config.ue_template.supi_digits,
        )
        .inspect_err(|e| error!("{cell}: step `write_ue_configs` failed: {e}"))?;

        let gnb = services
            .start_gnb(&cell_dir)
            .await
            .inspect_err(|e| error!("{cell}: step `start_gnb` failed: {e}"))?;

        let sampler = MetricsSampler::spawn(
            self.config.monitoring.clone(),
            cell_dir.clone(),
            self.config.output.result_file_name.clone(),
            cell.ue_count,
        );
        let start_time = Local::now();

        let mut fleet = match UeFleet::launch(
            &self.config.scripts,
            &variants,
            &cell_dir,
            self.config.timing.ue_launch_stagger(),
        )
        .await
        {
            Ok(fleet) => fleet,
            Err(e) => {
                error!("{cell}: step `launch_ues` failed: {e}");
                let _ = sampler.stop().await;
                gnb.stop().await;
                return Err(e);
            }
        };

        let duration = self.config.timing.test_duration(cell.ue_count);
        info!("Running test for {:.1} seconds", duration.as_secs_f64());
        sleep(duration).await;

        let crashed = fleet.crashed();
        if !crashed.is_empty() {
            warn!("{cell}: {} UE client(s) exited before teardown", crashed.len());
        }

        let report = sampler.stop().await;
        fleet.terminate_all().await;
        sleep(Duration::from_secs(self.config.timing.cleanup_wait)).await;
        gnb.stop().await;
        let end_time = Local::now();

        match &report {
            Ok(report) => info!(
                "{cell}: {}/{} UEs registered, {} samples collected",
                report.windows.len(),
                report.expected_ues,
                report.samples_collected
            ),
            Err(e) => warn!("{cell}: sampler failed: {e}"),
        }

        let summary_path = cell_dir.join(&self.config.output.result_file_name);
        let metrics = match results::parse_summary_csv(&summary_path) {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                warn!("{cell}: no usable summary CSV: {e}");
                None
            }
        };

        Ok(RunRecord {
            cell: *cell,
            start_time,
            end_time,
            duration_sec: (end_time - start_time).num_milliseconds() as f64 / 1000.0,
            success: true,
            metrics,
            recorded_at: Local::now(),
        })
    }
}
