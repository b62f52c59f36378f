//! Shared fixtures for integration tests.

use std::path::{Path, PathBuf};
use std::sync::Once;

use akaperf_common::{AuthMethod, OrchestratorConfig, TestCell};

static INIT: Once = Once::new();

/// Initializes test logging once per process.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("info")
            .with_test_writer()
            .try_init();
    });
}

/// Writes a minimal UE template and returns its path.
pub fn write_ue_template(dir: &Path) -> PathBuf {
    let path = dir.join("ue.yaml");
    std::fs::write(
        &path,
        "# UE base configuration\nsupi: 'imsi-001010000000001'\nkey: '465B5CE8B199B49FAA5F0A2EE238A6BC'\n",
    )
    .expect("write UE template");
    path
}

/// Writes a per-cell summary CSV with the given metric values.
///
/// Layout matches what the sampler produces:
/// `<results>/<cell>/registration_overhead_summary.csv`.
pub fn write_summary_fixture(
    results_dir: &Path,
    cell: &TestCell,
    reg_time: f64,
    max_cpu: f64,
    avg_mem: f64,
) -> PathBuf {
    let cell_dir = results_dir.join(cell.dir_name());
    std::fs::create_dir_all(&cell_dir).expect("create cell dir");
    let path = cell_dir.join("registration_overhead_summary.csv");
    let header = "timestamp,num_ues,total_time_sec,avg_registration_time_sec,avg_cpu_percent,max_cpu_percent,avg_memory_mb";
    let row = format!(
        "2026-01-01 00:00:00,{},{:.3},{reg_time:.3},{:.2},{max_cpu:.2},{avg_mem:.2}",
        cell.ue_count,
        reg_time * cell.ue_count as f64,
        max_cpu / 2.0,
    );
    std::fs::write(&path, format!("{header}\n{row}\n")).expect("write summary fixture");
    path
}

/// Builds a configuration that runs the matrix in well under a second per
/// cell, with every external command replaced by a shell stand-in.
pub fn fast_config(dir: &Path) -> OrchestratorConfig {
    let template = write_ue_template(dir);
    let amf_log = dir.join("amf.log");
    std::fs::write(&amf_log, "").expect("create core log");

    let mut config = OrchestratorConfig::default();
    config.test_configuration.authentication_methods = vec![AuthMethod::FiveGAka];
    config.test_configuration.ue_counts = vec![1];
    config.test_configuration.iterations_per_test = 1;

    config.timing.service_restart_wait = 1;
    config.timing.gnb_startup_wait = 1;
    config.timing.ue_settlement_wait = 0;
    config.timing.test_duration_base = 0;
    config.timing.test_duration_per_ue = 0.05;
    config.timing.cleanup_wait = 0;
    config.timing.inter_test_wait = 0;
    config.timing.ue_launch_stagger_ms = 0;

    config.scripts.change_auth = "true".into();
    config.scripts.start_services = "true".into();
    config.scripts.add_subscribers = "true".into();
    config.scripts.start_gnb = "sleep 30".into();
    config.scripts.launch_ues = "sleep 30".into();
    config.scripts.cleanup_ues = "true".into();
    config.scripts.check_core_ready = Some("true".into());
    config.scripts.check_gnb_ready = Some("true".into());

    config.monitoring.process_name = "no-such-process-akaperf".into();
    config.monitoring.amf_log = amf_log.display().to_string();
    config.monitoring.sample_interval_ms = 20;

    config.ue_template.path = template.display().to_string();
    config.error_handling.timeout_seconds = 10;
    config.error_handling.max_retries = 0;
    config
}
