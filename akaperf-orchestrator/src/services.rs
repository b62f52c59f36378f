//! External service lifecycle.
//!
//! Drives the 5G core and the radio simulator through the configured shell
//! commands. Readiness is a configurable probe polled with bounded retry;
//! without a probe the driver falls back to the fixed settle times of the
//! original harness.

use std::path::Path;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use akaperf_common::{AuthMethod, Error, OrchestratorConfig};

use crate::command;

/// Handle of the spawned radio simulator process.
#[derive(Debug)]
pub struct GnbHandle {
    child: tokio::process::Child,
}

impl GnbHandle {
    /// Stops the radio simulator and reaps it.
    pub async fn stop(mut self) {
        if let Err(e) = self.child.kill().await {
            warn!("Failed to stop radio simulator: {e}");
        } else {
            info!("Radio simulator stopped");
        }
    }
}

/// Drives core-network and radio-simulator lifecycle for one cell.
pub struct ServiceDriver<'a> {
    config: &'a OrchestratorConfig,
}

impl<'a> ServiceDriver<'a> {
    /// Creates a driver over an immutable configuration.
    pub fn new(config: &'a OrchestratorConfig) -> Self {
        Self { config }
    }

    fn timeout(&self) -> u64 {
        self.config.error_handling.timeout_seconds
    }

    /// Switches the core's authentication method.
    pub async fn apply_auth_method(&self, method: AuthMethod) -> Result<(), Error> {
        info!("Setting authentication method to {method}");
        let cmd = format!("{} {method}", self.config.scripts.change_auth);
        command::run_shell(&cmd, self.timeout()).await
    }

    /// Restarts the 5G core services and waits until they are ready.
    ///
    /// Leftover UE clients from a previous run are killed first so the core
    /// comes up without registration traffic.
    pub async fn restart_core(&self) -> Result<(), Error> {
        info!("Restarting core services");

        let cleanup = &self.config.scripts.cleanup_ues;
        if !cleanup.is_empty() {
            let matched = command::probe(cleanup).await;
            debug!("Pre-restart UE cleanup `{cleanup}` matched: {matched}");
        }
        sleep(Duration::from_secs(self.config.timing.ue_settlement_wait)).await;

        command::run_shell(&self.config.scripts.start_services, self.timeout()).await?;

        self.wait_ready(
            self.config.scripts.check_core_ready.as_deref(),
            self.config.timing.service_restart_wait,
            "core services",
        )
        .await
    }

    /// Provisions exactly `ue_count` subscriber identities.
    pub async fn provision_subscribers(&self, ue_count: u32) -> Result<(), Error> {
        info!("Provisioning {ue_count} subscribers");
        let cmd = format!("{} {ue_count}", self.config.scripts.add_subscribers);
        command::run_shell(&cmd, self.timeout()).await
    }

    /// Starts the radio simulator and waits until it is ready.
    ///
    /// The process runs for the whole cell; its combined output lands in
    /// `gnb.log` inside the cell directory.
    pub async fn start_gnb(&self, cell_dir: &Path) -> Result<GnbHandle, Error> {
        info!("Starting radio simulator");
        let log_path = cell_dir.join("gnb.log");
        let child = command::spawn_shell(&self.config.scripts.start_gnb, &log_path)?;

        self.wait_ready(
            self.config.scripts.check_gnb_ready.as_deref(),
            self.config.timing.gnb_startup_wait,
            "radio simulator",
        )
        .await?;

        Ok(GnbHandle { child })
    }

    /// Waits for a component to become ready.
    ///
    /// With a probe configured, polls it once per second for up to
    /// `budget_secs` attempts; without one, sleeps the fixed settle time.
    async fn wait_ready(
        &self,
        probe_cmd: Option<&str>,
        budget_secs: u64,
        what: &str,
    ) -> Result<(), Error> {
        match probe_cmd {
            Some(cmd) => {
                let attempts = budget_secs.max(1);
                for attempt in 1..=attempts {
                    if command::probe(cmd).await {
                        info!("{what} ready after {attempt} probe(s)");
                        return Ok(());
                    }
                    if attempt < attempts {
                        sleep(Duration::from_secs(1)).await;
                    }
                }
                Err(Error::Command(format!("{what} not ready within {budget_secs}s")))
            }
            None => {
                debug!("No readiness probe for {what}; waiting fixed {budget_secs}s");
                sleep(Duration::from_secs(budget_secs)).await;
                Ok(())
            }
        }
    }
}
