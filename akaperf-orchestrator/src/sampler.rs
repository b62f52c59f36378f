//! Core-process metrics sampling and registration tracking.
//!
//! While the UE fleet runs, a background task samples the core process's
//! CPU and memory via `sysinfo` and tails the core log for registration
//! events: the first appearance of a UE's concealed identity (SUCI) opens
//! its window, a "Registration complete" line with the matching IMSI
//! suffix closes it. Sampling is best-effort and lossy; a UE that never
//! registers is excluded from the averages and reported as missing.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use regex::Regex;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use akaperf_common::{CellMetrics, Error, MonitoringConfig, UeWindow};

/// One CPU/memory sample of the monitored process.
#[derive(Debug, Clone, Copy)]
struct Sample {
    at: DateTime<Local>,
    cpu_percent: f64,
    memory_mb: f64,
}

/// What the sampler observed during a run.
#[derive(Debug)]
pub struct SamplerReport {
    /// UEs the cell launched
    pub expected_ues: u32,
    /// Completed registration windows, in completion order
    pub windows: Vec<UeWindow>,
    /// Aggregated metrics, when both samples and windows were captured
    pub metrics: Option<CellMetrics>,
    /// Number of CPU/memory samples collected
    pub samples_collected: usize,
}

/// Incrementally follows a log file from its current end.
struct LogTail {
    reader: BufReader<File>,
    pending: String,
}

impl LogTail {
    /// Opens the log and seeks to its end, so only new lines are observed.
    fn open(path: &Path) -> Result<Self, Error> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::End(0))?;
        Ok(Self { reader: BufReader::new(file), pending: String::new() })
    }

    /// Returns the complete lines appended since the last call.
    fn drain(&mut self) -> Vec<String> {
        let mut chunk = String::new();
        if self.reader.read_to_string(&mut chunk).is_err() {
            // Non-UTF8 garbage in the log; skip this chunk
            return Vec::new();
        }
        self.pending.push_str(&chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            lines.push(line.trim_end().to_string());
        }
        lines
    }
}

/// Tracks per-UE registration windows from core log lines.
pub struct RegistrationTracker {
    suci_re: Regex,
    imsi_re: Regex,
    windows: HashMap<String, (Option<DateTime<Local>>, Option<DateTime<Local>>)>,
    completed_order: Vec<String>,
}

impl RegistrationTracker {
    /// Builds the tracker with the SUCI/IMSI suffix patterns.
    pub fn new() -> Result<Self, Error> {
        let suci_re = Regex::new(r"suci-[\d-]+(\d{6})")
            .map_err(|e| Error::Metrics(format!("bad SUCI pattern: {e}")))?;
        let imsi_re = Regex::new(r"imsi-\d+?(\d{6})\b")
            .map_err(|e| Error::Metrics(format!("bad IMSI pattern: {e}")))?;
        Ok(Self {
            suci_re,
            imsi_re,
            windows: HashMap::new(),
            completed_order: Vec::new(),
        })
    }

    /// Feeds one log line observed at `ts`.
    ///
    /// Returns the UE suffix when this line completed a window.
    pub fn observe(&mut self, line: &str, ts: DateTime<Local>) -> Option<String> {
        if let Some(caps) = self.suci_re.captures(line) {
            let ue = caps[1].to_string();
            let entry = self.windows.entry(ue).or_insert((None, None));
            if entry.0.is_none() {
                entry.0 = Some(ts);
            }
        }

        if line.contains("Registration complete") {
            if let Some(caps) = self.imsi_re.captures(line) {
                let ue = caps[1].to_string();
                let entry = self.windows.entry(ue.clone()).or_insert((None, None));
                if entry.0.is_some() && entry.1.is_none() {
                    entry.1 = Some(ts);
                    self.completed_order.push(ue.clone());
                    return Some(ue);
                }
            }
        }
        None
    }

    /// Number of UEs with a complete window.
    pub fn completed_count(&self) -> usize {
        self.completed_order.len()
    }

    /// Completed windows in completion order.
    pub fn completed_windows(&self) -> Vec<UeWindow> {
        self.completed_order
            .iter()
            .filter_map(|ue| {
                let (start, end) = self.windows.get(ue)?;
                Some(UeWindow {
                    ue_suffix: ue.clone(),
                    start: (*start)?,
                    end: (*end)?,
                })
            })
            .collect()
    }
}

/// Aggregates samples and windows into cell metrics.
///
/// Returns `None` unless at least one window completed and at least one
/// sample fell inside the global window spanned by the completed windows.
fn compute_metrics(samples: &[Sample], windows: &[UeWindow]) -> Option<CellMetrics> {
    if windows.is_empty() {
        return None;
    }

    let global_start = windows.iter().map(|w| w.start).min()?;
    let global_end = windows.iter().map(|w| w.end).max()?;
    let total_time_sec = (global_end - global_start).num_milliseconds() as f64 / 1000.0;

    let avg_registration_time_sec =
        windows.iter().map(UeWindow::registration_time_sec).sum::<f64>() / windows.len() as f64;

    let in_window: Vec<&Sample> =
        samples.iter().filter(|s| s.at >= global_start && s.at <= global_end).collect();
    if in_window.is_empty() {
        return None;
    }

    let avg_cpu_percent =
        in_window.iter().map(|s| s.cpu_percent).sum::<f64>() / in_window.len() as f64;
    let max_cpu_percent = in_window.iter().map(|s| s.cpu_percent).fold(0.0, f64::max);
    let avg_memory_mb =
        in_window.iter().map(|s| s.memory_mb).sum::<f64>() / in_window.len() as f64;

    Some(CellMetrics {
        registered_ues: windows.len() as u32,
        total_time_sec,
        avg_registration_time_sec,
        avg_cpu_percent,
        max_cpu_percent,
        avg_memory_mb,
    })
}

/// Writes the single-row summary CSV consumed by the orchestrator.
pub(crate) fn write_summary_csv(path: &Path, metrics: &CellMetrics) -> Result<(), Error> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "timestamp",
        "num_ues",
        "total_time_sec",
        "avg_registration_time_sec",
        "avg_cpu_percent",
        "max_cpu_percent",
        "avg_memory_mb",
    ])?;
    writer.write_record([
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        metrics.registered_ues.to_string(),
        format!("{:.3}", metrics.total_time_sec),
        format!("{:.3}", metrics.avg_registration_time_sec),
        format!("{:.2}", metrics.avg_cpu_percent),
        format!("{:.2}", metrics.max_cpu_percent),
        format!("{:.2}", metrics.avg_memory_mb),
    ])?;
    writer.flush()?;
    Ok(())
}

/// Writes the per-UE registration-time CSV.
fn write_per_ue_csv(path: &Path, windows: &[UeWindow]) -> Result<(), Error> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["ue", "registration_start", "registration_end", "registration_time_sec"])?;
    for window in windows {
        writer.write_record([
            window.ue_suffix.clone(),
            window.start.to_rfc3339(),
            window.end.to_rfc3339(),
            format!("{:.3}", window.registration_time_sec()),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn find_target_process(sys: &System, name: &str) -> Option<Pid> {
    sys.processes().iter().find_map(|(pid, process)| {
        let pname = process.name().to_string_lossy();
        if pname == name || process.cmd().iter().any(|arg| arg.to_string_lossy().contains(name)) {
            Some(*pid)
        } else {
            None
        }
    })
}

/// Handle of a running sampler task.
pub struct MetricsSampler {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<Result<SamplerReport, Error>>,
}

impl MetricsSampler {
    /// Starts sampling for one cell.
    ///
    /// `summary_file` is the name of the summary CSV inside `cell_dir`;
    /// the per-UE CSV and `performance_output.log` land next to it.
    pub fn spawn(
        monitoring: MonitoringConfig,
        cell_dir: PathBuf,
        summary_file: String,
        expected_ues: u32,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(sample_loop(monitoring, cell_dir, summary_file, expected_ues, stop_rx));
        Self { stop_tx, task }
    }

    /// Stops sampling, writes the artifacts and returns the report.
    pub async fn stop(self) -> Result<SamplerReport, Error> {
        let _ = self.stop_tx.send(true);
        self.task
            .await
            .map_err(|e| Error::Metrics(format!("sampler task panicked: {e}")))?
    }
}

async fn sample_loop(
    monitoring: MonitoringConfig,
    cell_dir: PathBuf,
    summary_file: String,
    expected_ues: u32,
    mut stop_rx: watch::Receiver<bool>,
) -> Result<SamplerReport, Error> {
    let mut transcript: Vec<String> = Vec::new();
    let note = |transcript: &mut Vec<String>, line: String| {
        transcript.push(format!("{} {line}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f")));
    };

    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::All, true);
    let mut target = find_target_process(&sys, &monitoring.process_name);
    match target {
        Some(pid) => {
            info!("Sampling {} (pid {pid})", monitoring.process_name);
            note(&mut transcript, format!("[INFO] sampling {} pid {pid}", monitoring.process_name));
        }
        None => {
            warn!("Core process {} not found; CPU/memory sampling disabled", monitoring.process_name);
            note(
                &mut transcript,
                format!("[WARN] core process {} not found", monitoring.process_name),
            );
        }
    }

    let log_path = PathBuf::from(&monitoring.amf_log);
    let mut tail = match LogTail::open(&log_path) {
        Ok(tail) => Some(tail),
        Err(e) => {
            warn!("Cannot tail {}: {e}; registration events disabled until the file appears", log_path.display());
            note(&mut transcript, format!("[WARN] cannot tail {}: {e}", log_path.display()));
            None
        }
    };

    let mut tracker = RegistrationTracker::new()?;
    let mut samples: Vec<Sample> = Vec::new();
    let mut all_registered_noted = false;

    let mut ticker = interval(Duration::from_millis(monitoring.sample_interval_ms.max(10)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if let Some(pid) = target {
                    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
                    match sys.process(pid) {
                        Some(process) => samples.push(Sample {
                            at: Local::now(),
                            cpu_percent: f64::from(process.cpu_usage()),
                            memory_mb: process.memory() as f64 / (1024.0 * 1024.0),
                        }),
                        None => {
                            warn!("Core process exited during sampling");
                            note(&mut transcript, "[WARN] core process exited during sampling".into());
                            target = None;
                        }
                    }
                }

                if tail.is_none() {
                    // The core may create its log after we started
                    tail = LogTail::open(&log_path).ok();
                }
                if let Some(tail) = tail.as_mut() {
                    for line in tail.drain() {
                        if let Some(ue) = tracker.observe(&line, Local::now()) {
                            debug!("UE {ue} registered");
                            note(&mut transcript, format!("[INFO] UE {ue} registered"));
                        }
                    }
                }

                if !all_registered_noted && tracker.completed_count() >= expected_ues as usize {
                    info!("All {expected_ues} UEs registered");
                    note(&mut transcript, format!("[INFO] all {expected_ues} UEs registered"));
                    all_registered_noted = true;
                }
            }
        }
    }

    let windows = tracker.completed_windows();
    if windows.len() < expected_ues as usize {
        warn!(
            "Only {}/{expected_ues} UEs completed registration within the run",
            windows.len()
        );
        note(
            &mut transcript,
            format!("[WARN] {}/{expected_ues} UEs completed registration", windows.len()),
        );
    }

    let metrics = compute_metrics(&samples, &windows);
    match &metrics {
        Some(m) => {
            let summary_path = cell_dir.join(&summary_file);
            write_summary_csv(&summary_path, m)?;
            note(&mut transcript, format!("[INFO] summary written to {}", summary_path.display()));

            let per_ue_name = summary_file
                .strip_suffix(".csv")
                .map_or_else(|| format!("{summary_file}_per_ue"), |stem| format!("{stem}_per_ue.csv"));
            write_per_ue_csv(&cell_dir.join(per_ue_name), &windows)?;
        }
        None => {
            warn!("No complete registration windows with samples; summary CSV not written");
            note(&mut transcript, "[WARN] no metrics to write".into());
        }
    }

    note(
        &mut transcript,
        format!("[INFO] collected {} samples, {} registration windows", samples.len(), windows.len()),
    );
    std::fs::write(cell_dir.join("performance_output.log"), transcript.join("\n") + "\n")?;

    Ok(SamplerReport {
        expected_ues,
        windows,
        metrics,
        samples_collected: samples.len(),
    })
}
