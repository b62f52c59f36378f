//! Core harness types: authentication methods, matrix cells, run records.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Authentication method under test.
///
/// Treated as an opaque configuration token handed to the core network
/// tooling; the harness never implements the protocol itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthMethod {
    /// 5G-AKA
    #[serde(rename = "5G_AKA")]
    FiveGAka,
    /// EAP-AKA'
    #[serde(rename = "EAP_AKA")]
    EapAkaPrime,
}

impl AuthMethod {
    /// All methods the harness knows how to configure.
    pub const ALL: [AuthMethod; 2] = [AuthMethod::FiveGAka, AuthMethod::EapAkaPrime];
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::FiveGAka => write!(f, "5G_AKA"),
            AuthMethod::EapAkaPrime => write!(f, "EAP_AKA"),
        }
    }
}

impl std::str::FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "5G_AKA" => Ok(AuthMethod::FiveGAka),
            "EAP_AKA" | "EAP_AKA'" | "EAP_AKA_PRIME" => Ok(AuthMethod::EapAkaPrime),
            _ => Err(format!("unknown authentication method: {s}")),
        }
    }
}

/// One cell of the test matrix: (method, UE count, iteration).
///
/// Cells are immutable once enumerated and executed strictly sequentially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestCell {
    /// Authentication method applied to the core for this run
    pub method: AuthMethod,
    /// Number of simulated UEs launched
    pub ue_count: u32,
    /// 1-based repetition index
    pub iteration: u32,
}

impl TestCell {
    /// Creates a new matrix cell.
    pub fn new(method: AuthMethod, ue_count: u32, iteration: u32) -> Self {
        Self { method, ue_count, iteration }
    }

    /// Directory name for this cell's artifacts, e.g. `5G_AKA_10ues_iter2`.
    pub fn dir_name(&self) -> String {
        format!("{}_{}ues_iter{}", self.method, self.ue_count, self.iteration)
    }

    /// Parses a cell back out of a result directory name.
    ///
    /// Returns `None` for names that do not follow the
    /// `<method>_<N>ues_iter<k>` convention.
    pub fn parse_dir_name(name: &str) -> Option<Self> {
        let (rest, iter_part) = name.rsplit_once("_iter")?;
        let iteration = iter_part.parse().ok()?;
        let (method_part, ue_part) = rest.rsplit_once('_')?;
        let ue_count = ue_part.strip_suffix("ues")?.parse().ok()?;
        let method = method_part.parse().ok()?;
        Some(Self { method, ue_count, iteration })
    }
}

impl fmt::Display for TestCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

/// Metrics parsed from one cell's summary CSV.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellMetrics {
    /// UEs whose registration window completed within the run
    pub registered_ues: u32,
    /// Wall-clock span of the global registration window, seconds
    pub total_time_sec: f64,
    /// Mean per-UE registration time, seconds
    pub avg_registration_time_sec: f64,
    /// Mean core-process CPU usage over the global window, percent
    pub avg_cpu_percent: f64,
    /// Peak core-process CPU usage over the global window, percent
    pub max_cpu_percent: f64,
    /// Mean core-process resident memory over the global window, MB
    pub avg_memory_mb: f64,
}

/// Outcome of one executed matrix cell.
///
/// Produced after the cell tears down; appended to the consolidated result
/// set. `metrics` is `None` when the summary CSV was missing or malformed —
/// the run itself may still have succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// The matrix cell this record belongs to
    #[serde(flatten)]
    pub cell: TestCell,
    /// Run start (UE launch)
    pub start_time: DateTime<Local>,
    /// Run end (fleet teardown)
    pub end_time: DateTime<Local>,
    /// Measured run duration, seconds
    pub duration_sec: f64,
    /// False when the cell exhausted its retries
    pub success: bool,
    /// Parsed metrics, absent on missing/malformed artifacts
    pub metrics: Option<CellMetrics>,
    /// When this record was written
    pub recorded_at: DateTime<Local>,
}

/// Registration window of a single UE, keyed by its identity suffix.
#[derive(Debug, Clone, PartialEq)]
pub struct UeWindow {
    /// Last digits of the UE identity as seen in the core log
    pub ue_suffix: String,
    /// First appearance of the concealed identity (SUCI)
    pub start: DateTime<Local>,
    /// Registration-complete timestamp
    pub end: DateTime<Local>,
}

impl UeWindow {
    /// Registration duration in seconds.
    pub fn registration_time_sec(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }
}
