//! Result consolidation and summary statistics.
//!
//! After the matrix completes, every run record is written to
//! `consolidated_results.json` and `test_summary.csv`, and per
//! (method, ue_count) mean/standard-deviation statistics land in
//! `summary_statistics.csv`. Missing or malformed per-cell artifacts are
//! skipped with a warning; they never abort aggregation.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

use akaperf_common::{AuthMethod, CellMetrics, Error, RunRecord, TestCell};

/// Sample mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n-1 denominator); `None` for fewer than two
/// values.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Aggregated statistics for one (method, ue_count) group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupStats {
    /// Authentication method of the group
    pub method: AuthMethod,
    /// UE count of the group
    pub ue_count: u32,
    /// Successful runs with metrics in the group
    pub samples: usize,
    /// Mean/std of the average per-UE registration time
    pub reg_time_mean: Option<f64>,
    /// Std-dev counterpart; `None` below two samples
    pub reg_time_std: Option<f64>,
    /// Mean/std of the peak core CPU usage
    pub max_cpu_mean: Option<f64>,
    pub max_cpu_std: Option<f64>,
    /// Mean/std of the average core memory usage
    pub avg_memory_mean: Option<f64>,
    pub avg_memory_std: Option<f64>,
    /// Mean/std of the measured run duration
    pub duration_mean: Option<f64>,
    pub duration_std: Option<f64>,
}

/// Groups successful records and computes per-group statistics.
///
/// Groups come out ordered by method, then UE count.
pub fn compute_summary(records: &[RunRecord]) -> Vec<GroupStats> {
    let mut groups: BTreeMap<(String, u32), Vec<&RunRecord>> = BTreeMap::new();
    for record in records {
        if !record.success {
            continue;
        }
        groups
            .entry((record.cell.method.to_string(), record.cell.ue_count))
            .or_default()
            .push(record);
    }

    groups
        .into_iter()
        .filter_map(|((method, ue_count), group)| {
            let method: AuthMethod = method.parse().ok()?;
            let metrics: Vec<&CellMetrics> =
                group.iter().filter_map(|r| r.metrics.as_ref()).collect();

            let reg: Vec<f64> = metrics.iter().map(|m| m.avg_registration_time_sec).collect();
            let cpu: Vec<f64> = metrics.iter().map(|m| m.max_cpu_percent).collect();
            let mem: Vec<f64> = metrics.iter().map(|m| m.avg_memory_mb).collect();
            let dur: Vec<f64> = group.iter().map(|r| r.duration_sec).collect();

            Some(GroupStats {
                method,
                ue_count,
                samples: metrics.len(),
                reg_time_mean: mean(&reg),
                reg_time_std: std_dev(&reg),
                max_cpu_mean: mean(&cpu),
                max_cpu_std: std_dev(&cpu),
                avg_memory_mean: mean(&mem),
                avg_memory_std: std_dev(&mem),
                duration_mean: mean(&dur),
                duration_std: std_dev(&dur),
            })
        })
        .collect()
}

/// Parses one per-cell summary CSV into metrics.
pub fn parse_summary_csv(path: &Path) -> Result<CellMetrics, Error> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let record = reader
        .records()
        .next()
        .ok_or_else(|| Error::Metrics(format!("{}: empty summary CSV", path.display())))??;

    let field = |name: &str| -> Result<&str, Error> {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|i| record.get(i))
            .ok_or_else(|| Error::Metrics(format!("{}: missing column {name}", path.display())))
    };
    let float = |name: &str| -> Result<f64, Error> {
        field(name)?
            .trim()
            .parse()
            .map_err(|e| Error::Metrics(format!("{}: bad {name}: {e}", path.display())))
    };

    Ok(CellMetrics {
        registered_ues: field("num_ues")?
            .trim()
            .parse()
            .map_err(|e| Error::Metrics(format!("{}: bad num_ues: {e}", path.display())))?,
        total_time_sec: float("total_time_sec")?,
        avg_registration_time_sec: float("avg_registration_time_sec")?,
        avg_cpu_percent: float("avg_cpu_percent")?,
        max_cpu_percent: float("max_cpu_percent")?,
        avg_memory_mb: float("avg_memory_mb")?,
    })
}

/// Rebuilds run records by scanning a results tree.
///
/// Used to re-aggregate a finished (or interrupted) results directory:
/// every subdirectory whose name parses as a cell contributes one record;
/// cells with a missing or malformed summary CSV are kept with empty
/// metrics. Timestamps are recovered from file modification times.
pub fn scan_results_tree(results_dir: &Path, summary_file: &str) -> Result<Vec<RunRecord>, Error> {
    let mut records = Vec::new();

    let mut entries: Vec<_> = std::fs::read_dir(results_dir)?
        .filter_map(Result::ok)
        .filter(|e| e.path().is_dir())
        .collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name();
        let Some(cell) = TestCell::parse_dir_name(&name.to_string_lossy()) else {
            continue;
        };

        let csv_path = entry.path().join(summary_file);
        let metrics = match parse_summary_csv(&csv_path) {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                warn!("Skipping metrics for {}: {e}", cell.dir_name());
                None
            }
        };

        let stamp: DateTime<Local> = entry
            .metadata()
            .and_then(|m| m.modified())
            .map(DateTime::from)
            .unwrap_or_else(|_| Local::now());
        let duration_sec = metrics.map_or(0.0, |m| m.total_time_sec);

        records.push(RunRecord {
            cell,
            start_time: stamp,
            end_time: stamp,
            duration_sec,
            success: true,
            metrics,
            recorded_at: stamp,
        });
    }

    Ok(records)
}

fn opt(value: Option<f64>) -> String {
    value.map_or_else(String::new, |v| format!("{v:.4}"))
}

/// Writes `consolidated_results.json`.
pub fn write_consolidated_json(results_dir: &Path, records: &[RunRecord]) -> Result<(), Error> {
    let path = results_dir.join("consolidated_results.json");
    let file = File::create(&path)?;
    serde_json::to_writer_pretty(file, records)?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Writes `test_summary.csv`, one row per run record.
pub fn write_test_summary_csv(results_dir: &Path, records: &[RunRecord]) -> Result<(), Error> {
    let path = results_dir.join("test_summary.csv");
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record([
        "auth_method",
        "ue_count",
        "iteration",
        "start_time",
        "end_time",
        "duration_sec",
        "success",
        "registered_ues",
        "total_time_sec",
        "avg_registration_time_sec",
        "avg_cpu_percent",
        "max_cpu_percent",
        "avg_memory_mb",
    ])?;

    for record in records {
        let m = record.metrics.as_ref();
        writer.write_record([
            record.cell.method.to_string(),
            record.cell.ue_count.to_string(),
            record.cell.iteration.to_string(),
            record.start_time.to_rfc3339(),
            record.end_time.to_rfc3339(),
            format!("{:.3}", record.duration_sec),
            record.success.to_string(),
            m.map_or_else(String::new, |m| m.registered_ues.to_string()),
            opt(m.map(|m| m.total_time_sec)),
            opt(m.map(|m| m.avg_registration_time_sec)),
            opt(m.map(|m| m.avg_cpu_percent)),
            opt(m.map(|m| m.max_cpu_percent)),
            opt(m.map(|m| m.avg_memory_mb)),
        ])?;
    }
    writer.flush()?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Writes `summary_statistics.csv`, one row per (method, ue_count) group.
pub fn write_summary_statistics_csv(results_dir: &Path, stats: &[GroupStats]) -> Result<(), Error> {
    let path = results_dir.join("summary_statistics.csv");
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record([
        "auth_method",
        "ue_count",
        "samples",
        "avg_registration_time_mean",
        "avg_registration_time_std",
        "max_cpu_mean",
        "max_cpu_std",
        "avg_memory_mean",
        "avg_memory_std",
        "duration_mean",
        "duration_std",
    ])?;

    for group in stats {
        writer.write_record([
            group.method.to_string(),
            group.ue_count.to_string(),
            group.samples.to_string(),
            opt(group.reg_time_mean),
            opt(group.reg_time_std),
            opt(group.max_cpu_mean),
            opt(group.max_cpu_std),
            opt(group.avg_memory_mean),
            opt(group.avg_memory_std),
            opt(group.duration_mean),
            opt(group.duration_std),
        ])?;
    }
    writer.flush()?;
    info!("Wrote {}", path.display());
    Ok(())
}
