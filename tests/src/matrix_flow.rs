//! End-to-end matrix scenarios
//!
//! Drives the orchestrator against stand-in shell commands. The "UE
//! client" is a shell snippet that writes SUCI / registration-complete
//! lines into the fake core log, so the sampler observes real windows; the
//! monitored process is this test binary itself.

use akaperf_common::{AuthMethod, TestCell};
use akaperf_orchestrator::{results, Orchestrator};

use crate::test_utils::{fast_config, init_test_logging};

/// Name of a process that is guaranteed to be alive: our own.
fn own_process_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "cargo".to_string())
}

#[tokio::test]
async fn test_spec_example_matrix_shape() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();

    // ue_counts [10, 25] x 2 iterations x one method = exactly 4 cells
    let mut config = fast_config(dir.path());
    config.test_configuration.ue_counts = vec![10, 25];
    config.test_configuration.iterations_per_test = 2;
    config.timing.test_duration_per_ue = 0.002;

    let results_dir = dir.path().join("results");
    std::fs::create_dir_all(&results_dir).unwrap();

    let mut orchestrator = Orchestrator::new(config, results_dir.clone());
    let outcome = orchestrator.run().await.unwrap();

    assert_eq!(outcome.total, 4);
    assert_eq!(outcome.completed, 4);

    let expected = [
        TestCell::new(AuthMethod::FiveGAka, 10, 1),
        TestCell::new(AuthMethod::FiveGAka, 10, 2),
        TestCell::new(AuthMethod::FiveGAka, 25, 1),
        TestCell::new(AuthMethod::FiveGAka, 25, 2),
    ];
    for (record, expected) in orchestrator.records().iter().zip(expected) {
        assert_eq!(record.cell, expected);
        assert!(results_dir.join(expected.dir_name()).is_dir());
    }
}

#[tokio::test]
async fn test_full_pipeline_with_registration_events() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();

    let mut config = fast_config(dir.path());
    let amf_log = config.monitoring.amf_log.clone();

    // Each "UE" announces its SUCI, registers 100ms later, then idles
    config.scripts.launch_ues = format!(
        "sh -c \"echo 'InitialUEMessage suci-0-001-01-0000-0-0-000001' >> {amf_log}; \
         sleep 0.1; \
         echo 'Registration complete imsi-001010000001' >> {amf_log}; \
         sleep 30\" # {{config}}"
    );
    // Sample this test binary instead of a real AMF
    config.monitoring.process_name = own_process_name();
    config.timing.test_duration_base = 1;
    config.timing.test_duration_per_ue = 0.0;

    let results_dir = dir.path().join("results");
    std::fs::create_dir_all(&results_dir).unwrap();

    let mut orchestrator = Orchestrator::new(config, results_dir.clone());
    let outcome = orchestrator.run().await.unwrap();
    assert_eq!(outcome.completed, 1);

    let record = &orchestrator.records()[0];
    assert!(record.success);
    let metrics = record.metrics.expect("summary CSV should have been parsed");
    assert_eq!(metrics.registered_ues, 1);
    assert!(metrics.avg_registration_time_sec > 0.05);
    assert!(metrics.avg_registration_time_sec < 2.0);
    assert!(metrics.avg_memory_mb > 0.0);

    // The cell directory carries the expected artifacts
    let cell_dir = results_dir.join(record.cell.dir_name());
    assert!(cell_dir.join("registration_overhead_summary.csv").exists());
    assert!(cell_dir.join("registration_overhead_summary_per_ue.csv").exists());
    assert!(cell_dir.join("performance_output.log").exists());
    assert!(cell_dir.join("gnb.log").exists());
    assert!(cell_dir.join("ue_configs").join("ue_001.yaml").exists());

    // Variant carries the derived identity
    let variant = std::fs::read_to_string(cell_dir.join("ue_configs").join("ue_001.yaml")).unwrap();
    assert!(variant.contains("imsi-001010000000001"));

    // Consolidation over the records produced by the run
    results::write_consolidated_json(&results_dir, orchestrator.records()).unwrap();
    results::write_test_summary_csv(&results_dir, orchestrator.records()).unwrap();
    let stats = results::compute_summary(orchestrator.records());
    results::write_summary_statistics_csv(&results_dir, &stats).unwrap();

    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].samples, 1);
    assert!(
        (stats[0].reg_time_mean.unwrap() - metrics.avg_registration_time_sec).abs() < 1e-6
    );
}

#[tokio::test]
async fn test_forced_failure_with_continue_on_failure() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();

    let mut config = fast_config(dir.path());
    config.test_configuration.iterations_per_test = 3;
    // Fail only the second iteration: the stand-in inspects a marker file
    let marker = dir.path().join("iteration");
    config.scripts.add_subscribers = format!(
        "sh -c 'n=$(cat {m} 2>/dev/null || echo 0); n=$((n+1)); echo $n >{m}; test $n -ne 2' #",
        m = marker.display()
    );

    let results_dir = dir.path().join("results");
    std::fs::create_dir_all(&results_dir).unwrap();

    let mut orchestrator = Orchestrator::new(config, results_dir);
    let outcome = orchestrator.run().await.unwrap();

    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.completed, 2);
    assert_eq!(outcome.failed, 1);
    assert!(!outcome.aborted);

    let records = orchestrator.records();
    assert_eq!(records.len(), 3);
    assert!(records[0].success);
    assert!(!records[1].success, "second cell must carry the failure marker");
    assert!(records[2].success, "failure must not prevent subsequent cells");
}
