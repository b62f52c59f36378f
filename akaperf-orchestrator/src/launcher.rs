//! UE client process launcher.
//!
//! Launches one external UE client per configuration variant and keeps the
//! handle of every child it spawned, so bulk termination is deterministic
//! rather than relying on name-based process kill. A name-based cleanup
//! command still runs afterwards as a best-effort net for strays from
//! earlier, interrupted runs. Crashed UEs are not restarted; they are
//! simply absent from the results.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Child;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use akaperf_common::{Error, ScriptsConfig};

use crate::command;
use crate::ue_config::UeVariant;

/// A single launched UE client.
#[derive(Debug)]
struct UeProcess {
    index: u32,
    supi: String,
    child: Child,
    log_path: PathBuf,
}

/// The set of UE client processes launched for one matrix cell.
#[derive(Debug, Default)]
pub struct UeFleet {
    processes: Vec<UeProcess>,
    cleanup_cmd: String,
}

impl UeFleet {
    /// Launches one UE client per variant, staggered by `stagger`.
    ///
    /// Each client's combined output goes to `ue_<index>.log` in the cell
    /// directory. The `launch_ues` template has `{config}` and `{log}`
    /// substituted per UE. Children are killed on drop, so a failed launch
    /// tears down whatever was already started.
    pub async fn launch(
        scripts: &ScriptsConfig,
        variants: &[UeVariant],
        cell_dir: &Path,
        stagger: Duration,
    ) -> Result<Self, Error> {
        let mut processes = Vec::with_capacity(variants.len());

        for (i, variant) in variants.iter().enumerate() {
            let log_path = cell_dir.join(format!("ue_{:03}.log", variant.index));
            let cmd = scripts
                .launch_ues
                .replace("{config}", &variant.path.display().to_string())
                .replace("{log}", &log_path.display().to_string());

            let child = command::spawn_shell(&cmd, &log_path)?;
            debug!("Launched UE {} ({})", variant.index, variant.supi);
            processes.push(UeProcess {
                index: variant.index,
                supi: variant.supi.clone(),
                child,
                log_path,
            });

            if stagger > Duration::ZERO && i + 1 < variants.len() {
                sleep(stagger).await;
            }
        }

        info!("Launched {} UE client processes", processes.len());
        Ok(Self { processes, cleanup_cmd: scripts.cleanup_ues.clone() })
    }

    /// Number of UEs this fleet launched.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// True when no UE was launched.
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Indices of UEs that exited on their own before termination.
    pub fn crashed(&mut self) -> Vec<u32> {
        let mut crashed = Vec::new();
        for proc in &mut self.processes {
            if let Ok(Some(status)) = proc.child.try_wait() {
                warn!(
                    "UE {} ({}) exited early with {status} (log: {})",
                    proc.index,
                    proc.supi,
                    proc.log_path.display()
                );
                crashed.push(proc.index);
            }
        }
        crashed
    }

    /// Terminates every tracked UE, then runs the name-based cleanup
    /// command for strays. Idempotent; returns the number of children
    /// signalled on this call.
    pub async fn terminate_all(&mut self) -> usize {
        let mut killed = 0;
        for mut proc in self.processes.drain(..) {
            match proc.child.kill().await {
                Ok(()) => killed += 1,
                Err(e) => warn!("Failed to kill UE {}: {e}", proc.index),
            }
        }
        if killed > 0 {
            info!("Terminated {killed} UE client processes");
        }

        // pkill exits non-zero when nothing matched; either answer is fine
        if !self.cleanup_cmd.is_empty() {
            let matched = command::probe(&self.cleanup_cmd).await;
            debug!("Stray UE cleanup `{}` matched: {matched}", self.cleanup_cmd);
        }

        killed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripts(launch: &str) -> ScriptsConfig {
        ScriptsConfig {
            launch_ues: launch.to_string(),
            // no-op matcher keeps the test hermetic
            cleanup_ues: "true".to_string(),
            ..ScriptsConfig::default()
        }
    }

    fn variants(dir: &Path, n: u32) -> Vec<UeVariant> {
        (1..=n)
            .map(|index| UeVariant {
                index,
                supi: format!("imsi-00101000000{index:04}"),
                path: dir.join(format!("ue_{index:03}.yaml")),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_launch_and_terminate() {
        let dir = tempfile::tempdir().unwrap();
        let vars = variants(dir.path(), 3);

        let mut fleet =
            UeFleet::launch(&scripts("sleep 30"), &vars, dir.path(), Duration::ZERO)
                .await
                .unwrap();
        assert_eq!(fleet.len(), 3);
        assert!(fleet.crashed().is_empty());

        assert_eq!(fleet.terminate_all().await, 3);
        assert!(fleet.is_empty());
        // Idempotent
        assert_eq!(fleet.terminate_all().await, 0);
    }

    #[tokio::test]
    async fn test_crashed_ues_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let vars = variants(dir.path(), 2);

        let mut fleet = UeFleet::launch(&scripts("true"), &vars, dir.path(), Duration::ZERO)
            .await
            .unwrap();
        // Give the no-op children time to exit
        sleep(Duration::from_millis(200)).await;
        let crashed = fleet.crashed();
        assert_eq!(crashed, vec![1, 2]);
        fleet.terminate_all().await;
    }

    #[tokio::test]
    async fn test_launch_writes_per_ue_logs() {
        let dir = tempfile::tempdir().unwrap();
        let vars = variants(dir.path(), 2);

        let mut fleet =
            UeFleet::launch(&scripts("echo ue-config {config}"), &vars, dir.path(), Duration::ZERO)
                .await
                .unwrap();
        sleep(Duration::from_millis(200)).await;
        fleet.terminate_all().await;

        let log = std::fs::read_to_string(dir.path().join("ue_001.log")).unwrap();
        assert!(log.contains("ue-config"));
        assert!(log.contains("ue_001.yaml"));
    }
}
