//! Harness configuration.
//!
//! The orchestrator is configured from a YAML file with CLI overrides on
//! top; every key is optional and falls back to built-in defaults, so a
//! missing or unparsable file is never fatal.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{AuthMethod, TestCell};

/// Test matrix parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestConfiguration {
    /// Authentication methods to compare
    #[serde(default = "default_auth_methods")]
    pub authentication_methods: Vec<AuthMethod>,
    /// UE population sizes to run
    #[serde(default = "default_ue_counts")]
    pub ue_counts: Vec<u32>,
    /// Repetitions per (method, ue_count) pair
    #[serde(default = "default_iterations")]
    pub iterations_per_test: u32,
}

fn default_auth_methods() -> Vec<AuthMethod> {
    vec![AuthMethod::FiveGAka, AuthMethod::EapAkaPrime]
}

fn default_ue_counts() -> Vec<u32> {
    vec![10, 25, 50, 75, 100]
}

fn default_iterations() -> u32 {
    3
}

impl Default for TestConfiguration {
    fn default() -> Self {
        Self {
            authentication_methods: default_auth_methods(),
            ue_counts: default_ue_counts(),
            iterations_per_test: default_iterations(),
        }
    }
}

impl TestConfiguration {
    /// Enumerates the full matrix in deterministic order:
    /// methods, then UE counts, then iterations 1..=k.
    pub fn cells(&self) -> Vec<TestCell> {
        let mut cells = Vec::new();
        for &method in &self.authentication_methods {
            for &ue_count in &self.ue_counts {
                for iteration in 1..=self.iterations_per_test {
                    cells.push(TestCell::new(method, ue_count, iteration));
                }
            }
        }
        cells
    }
}

/// Settle times and duration scaling, in seconds unless noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Wait after the core services restart
    #[serde(default = "default_service_restart_wait")]
    pub service_restart_wait: u64,
    /// Wait after the radio simulator starts
    #[serde(default = "default_gnb_startup_wait")]
    pub gnb_startup_wait: u64,
    /// Settle time after killing leftover UEs, before the core restart
    #[serde(default = "default_ue_settlement_wait")]
    pub ue_settlement_wait: u64,
    /// Base run duration
    #[serde(default = "default_test_duration_base")]
    pub test_duration_base: u64,
    /// Extra run duration per launched UE (fractional seconds)
    #[serde(default = "default_test_duration_per_ue")]
    pub test_duration_per_ue: f64,
    /// Settle time after bulk UE termination
    #[serde(default = "default_cleanup_wait")]
    pub cleanup_wait: u64,
    /// Rest between matrix cells
    #[serde(default = "default_inter_test_wait")]
    pub inter_test_wait: u64,
    /// Delay between consecutive UE launches, milliseconds
    #[serde(default = "default_ue_launch_stagger_ms")]
    pub ue_launch_stagger_ms: u64,
}

fn default_service_restart_wait() -> u64 {
    15
}
fn default_gnb_startup_wait() -> u64 {
    10
}
fn default_ue_settlement_wait() -> u64 {
    5
}
fn default_test_duration_base() -> u64 {
    60
}
fn default_test_duration_per_ue() -> f64 {
    0.5
}
fn default_cleanup_wait() -> u64 {
    5
}
fn default_inter_test_wait() -> u64 {
    30
}
fn default_ue_launch_stagger_ms() -> u64 {
    100
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            service_restart_wait: default_service_restart_wait(),
            gnb_startup_wait: default_gnb_startup_wait(),
            ue_settlement_wait: default_ue_settlement_wait(),
            test_duration_base: default_test_duration_base(),
            test_duration_per_ue: default_test_duration_per_ue(),
            cleanup_wait: default_cleanup_wait(),
            inter_test_wait: default_inter_test_wait(),
            ue_launch_stagger_ms: default_ue_launch_stagger_ms(),
        }
    }
}

impl TimingConfig {
    /// Run duration for a cell: base + per-UE increment × ue_count.
    pub fn test_duration(&self, ue_count: u32) -> Duration {
        Duration::from_secs_f64(
            self.test_duration_base as f64 + self.test_duration_per_ue * ue_count as f64,
        )
    }

    /// Delay between consecutive UE launches.
    pub fn ue_launch_stagger(&self) -> Duration {
        Duration::from_millis(self.ue_launch_stagger_ms)
    }
}

/// External commands driven by the orchestrator.
///
/// All entries are shell command strings. `change_auth` and
/// `add_subscribers` get their argument appended; `launch_ues` is a per-UE
/// template with `{config}` and `{log}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptsConfig {
    /// Switch the core's authentication method (method token appended)
    #[serde(default = "default_change_auth")]
    pub change_auth: String,
    /// (Re)start the 5G core services
    #[serde(default = "default_start_services")]
    pub start_services: String,
    /// Provision N subscriber identities (count appended)
    #[serde(default = "default_add_subscribers")]
    pub add_subscribers: String,
    /// Start the radio simulator (long-running, spawned)
    #[serde(default = "default_start_gnb")]
    pub start_gnb: String,
    /// Per-UE client command template
    #[serde(default = "default_launch_ues")]
    pub launch_ues: String,
    /// Best-effort name-based kill for stray UE processes
    #[serde(default = "default_cleanup_ues")]
    pub cleanup_ues: String,
    /// Optional readiness probe for the core; polled once per second
    #[serde(default)]
    pub check_core_ready: Option<String>,
    /// Optional readiness probe for the radio simulator
    #[serde(default)]
    pub check_gnb_ready: Option<String>,
}

fn default_change_auth() -> String {
    "python3 change_authmethod.py".into()
}
fn default_start_services() -> String {
    "sudo bash startservices.sh".into()
}
fn default_add_subscribers() -> String {
    "sudo python3 add_subscribers.py".into()
}
fn default_start_gnb() -> String {
    "sudo bash start_gnb.sh".into()
}
fn default_launch_ues() -> String {
    "nr-ue -c {config}".into()
}
fn default_cleanup_ues() -> String {
    "pkill -f nr-ue".into()
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            change_auth: default_change_auth(),
            start_services: default_start_services(),
            add_subscribers: default_add_subscribers(),
            start_gnb: default_start_gnb(),
            launch_ues: default_launch_ues(),
            cleanup_ues: default_cleanup_ues(),
            check_core_ready: None,
            check_gnb_ready: None,
        }
    }
}

/// Core-process monitoring parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Name of the core process whose CPU/memory is sampled
    #[serde(default = "default_process_name")]
    pub process_name: String,
    /// Core log file tailed for registration events
    #[serde(default = "default_amf_log")]
    pub amf_log: String,
    /// Sampling period, milliseconds
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
}

fn default_process_name() -> String {
    "open5gs-amfd".into()
}
fn default_amf_log() -> String {
    "amf.log".into()
}
fn default_sample_interval_ms() -> u64 {
    100
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            process_name: default_process_name(),
            amf_log: default_amf_log(),
            sample_interval_ms: default_sample_interval_ms(),
        }
    }
}

/// UE configuration template parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UeTemplateConfig {
    /// Base UE YAML template; the `supi:` line is rewritten per variant
    #[serde(default = "default_ue_template_path")]
    pub path: String,
    /// Width of the zero-padded index substituted into the identity
    #[serde(default = "default_supi_digits")]
    pub supi_digits: usize,
}

fn default_ue_template_path() -> String {
    "config/ue.yaml".into()
}
fn default_supi_digits() -> usize {
    3
}

impl Default for UeTemplateConfig {
    fn default() -> Self {
        Self {
            path: default_ue_template_path(),
            supi_digits: default_supi_digits(),
        }
    }
}

/// Retry and failure policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorHandlingConfig {
    /// Additional attempts per failed cell
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Timeout budget for each external command, seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Keep running the matrix after a cell exhausts its retries
    #[serde(default = "default_true")]
    pub continue_on_failure: bool,
    /// Tear down spawned processes before retrying a failed cell
    #[serde(default = "default_true")]
    pub cleanup_on_error: bool,
}

fn default_max_retries() -> u32 {
    2
}
fn default_timeout_seconds() -> u64 {
    300
}
fn default_true() -> bool {
    true
}

impl Default for ErrorHandlingConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            timeout_seconds: default_timeout_seconds(),
            continue_on_failure: true,
            cleanup_on_error: true,
        }
    }
}

/// Output locations and report toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Results directory prefix; a timestamp is appended per invocation
    #[serde(default = "default_results_dir_prefix")]
    pub results_dir_prefix: String,
    /// File name of the per-cell summary CSV written by the sampler
    #[serde(default = "default_result_file_name")]
    pub result_file_name: String,
    /// Log verbosity (trace/debug/info/warn/error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Render the comparison chart at the end of the matrix
    #[serde(default = "default_true")]
    pub generate_plots: bool,
    /// Write the consolidated JSON/CSV reports
    #[serde(default = "default_true")]
    pub consolidate_results: bool,
}

fn default_results_dir_prefix() -> String {
    "automated_test_results".into()
}
fn default_result_file_name() -> String {
    "registration_overhead_summary.csv".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir_prefix: default_results_dir_prefix(),
            result_file_name: default_result_file_name(),
            log_level: default_log_level(),
            generate_plots: true,
            consolidate_results: true,
        }
    }
}

/// Top-level harness configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Test matrix
    #[serde(default)]
    pub test_configuration: TestConfiguration,
    /// Settle times and duration scaling
    #[serde(default)]
    pub timing: TimingConfig,
    /// External commands
    #[serde(default)]
    pub scripts: ScriptsConfig,
    /// Core-process monitoring
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    /// UE configuration template
    #[serde(default)]
    pub ue_template: UeTemplateConfig,
    /// Retry and failure policy
    #[serde(default)]
    pub error_handling: ErrorHandlingConfig,
    /// Output locations and report toggles
    #[serde(default)]
    pub output: OutputConfig,
}

impl OrchestratorConfig {
    /// Parses a configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads a configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Serializes the configuration to a YAML string.
    pub fn to_yaml(&self) -> Result<String, Error> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Loads the configuration for a harness invocation.
    ///
    /// A missing or unparsable file is non-fatal: the error is reported on
    /// stderr (logging is not yet initialized at this point) and the
    /// built-in defaults are used instead.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::from_yaml_file(path) {
            Ok(config) => {
                eprintln!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                eprintln!("Error loading config file {}: {e}", path.display());
                eprintln!("Using default configuration instead");
                Self::default()
            }
        }
    }

    /// Rejects configurations the orchestrator cannot run.
    pub fn validate(&self) -> Result<(), Error> {
        if self.test_configuration.authentication_methods.is_empty() {
            return Err(Error::Config("at least one authentication method is required".into()));
        }
        if self.test_configuration.ue_counts.is_empty() {
            return Err(Error::Config("at least one UE count is required".into()));
        }
        if self.test_configuration.ue_counts.contains(&0) {
            return Err(Error::Config("UE counts must be at least 1".into()));
        }
        if self.test_configuration.iterations_per_test == 0 {
            return Err(Error::Config("iterations_per_test must be at least 1".into()));
        }
        if self.ue_template.supi_digits == 0 || self.ue_template.supi_digits > 10 {
            return Err(Error::Config("supi_digits must be between 1 and 10".into()));
        }
        let max_ues = 10u64.pow(self.ue_template.supi_digits as u32);
        if let Some(&n) = self.test_configuration.ue_counts.iter().find(|&&n| n as u64 >= max_ues) {
            return Err(Error::Config(format!(
                "ue_count {n} does not fit in {} identity digits",
                self.ue_template.supi_digits
            )));
        }
        Ok(())
    }
}
