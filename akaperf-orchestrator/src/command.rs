//! External command execution.
//!
//! All external tooling (core restart, subscriber provisioning, UE clients)
//! is driven through shell command strings from the configuration. Blocking
//! commands run under a timeout budget; long-running ones are spawned with
//! their output redirected to a log file and killed on drop.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, error, info};

use akaperf_common::Error;

/// Timeout budget for readiness probes, which are expected to answer fast.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs a shell command to completion under a timeout budget.
///
/// A non-zero exit status or an expired timeout is an error; stderr is
/// logged so the failing external command can be located from the log.
pub async fn run_shell(command: &str, timeout_secs: u64) -> Result<(), Error> {
    info!("Executing: {command}");

    let future = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output();

    match timeout(Duration::from_secs(timeout_secs), future).await {
        Ok(Ok(output)) => {
            if output.status.success() {
                Ok(())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                error!("Command failed: {command}");
                if !stderr.trim().is_empty() {
                    error!("Error: {}", stderr.trim());
                }
                Err(Error::Command(format!(
                    "{command} (exit status {})",
                    output.status.code().map_or_else(|| "signal".into(), |c| c.to_string())
                )))
            }
        }
        Ok(Err(e)) => {
            error!("Failed to spawn command {command}: {e}");
            Err(Error::Io(e))
        }
        Err(_) => {
            error!("Command timed out: {command}");
            Err(Error::CommandTimeout { seconds: timeout_secs, command: command.to_string() })
        }
    }
}

/// Runs a quiet probe command, reporting only whether it succeeded.
///
/// Used for readiness checks and best-effort cleanup, where failure is an
/// expected answer rather than an error.
pub async fn probe(command: &str) -> bool {
    let future = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match timeout(PROBE_TIMEOUT, future).await {
        Ok(Ok(status)) => status.success(),
        Ok(Err(e)) => {
            debug!("Probe `{command}` failed to spawn: {e}");
            false
        }
        Err(_) => {
            debug!("Probe `{command}` timed out");
            false
        }
    }
}

/// Spawns a long-running shell command with combined output in `log_path`.
///
/// The child is killed when its handle is dropped, so an orchestrator
/// failure cannot leak the process.
pub fn spawn_shell(command: &str, log_path: &Path) -> Result<Child, Error> {
    let stdout = std::fs::File::create(log_path)?;
    let stderr = stdout.try_clone()?;

    debug!("Spawning: {command} (log: {})", log_path.display());

    let child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .kill_on_drop(true)
        .spawn()?;

    Ok(child)
}
