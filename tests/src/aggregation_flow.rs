//! Result-tree aggregation scenarios
//!
//! Builds fake results trees with known metric values and verifies the
//! re-scan, summary statistics and report/chart outputs end to end.

use akaperf_common::{AuthMethod, TestCell};
use akaperf_orchestrator::{plot, results};

use crate::test_utils::{init_test_logging, write_summary_fixture};

#[test]
fn test_scan_and_summarize_known_tree() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();

    // Two iterations per method at 10 UEs, with hand-picked values
    write_summary_fixture(dir.path(), &TestCell::new(AuthMethod::FiveGAka, 10, 1), 1.0, 40.0, 100.0);
    write_summary_fixture(dir.path(), &TestCell::new(AuthMethod::FiveGAka, 10, 2), 3.0, 60.0, 140.0);
    write_summary_fixture(dir.path(), &TestCell::new(AuthMethod::EapAkaPrime, 10, 1), 2.0, 50.0, 120.0);
    write_summary_fixture(dir.path(), &TestCell::new(AuthMethod::EapAkaPrime, 10, 2), 4.0, 70.0, 160.0);

    let records =
        results::scan_results_tree(dir.path(), "registration_overhead_summary.csv").unwrap();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.metrics.is_some()));

    let stats = results::compute_summary(&records);
    assert_eq!(stats.len(), 2);

    let aka = stats.iter().find(|s| s.method == AuthMethod::FiveGAka).unwrap();
    assert_eq!(aka.samples, 2);
    // Hand-computed: mean(1, 3) = 2, sample std = sqrt(2)
    assert!((aka.reg_time_mean.unwrap() - 2.0).abs() < 1e-9);
    assert!((aka.reg_time_std.unwrap() - std::f64::consts::SQRT_2).abs() < 1e-9);
    assert!((aka.max_cpu_mean.unwrap() - 50.0).abs() < 1e-9);
    assert!((aka.avg_memory_mean.unwrap() - 120.0).abs() < 1e-9);

    let eap = stats.iter().find(|s| s.method == AuthMethod::EapAkaPrime).unwrap();
    assert!((eap.reg_time_mean.unwrap() - 3.0).abs() < 1e-9);
    assert!((eap.max_cpu_mean.unwrap() - 60.0).abs() < 1e-9);
}

#[test]
fn test_malformed_cell_is_skipped_not_fatal() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();

    write_summary_fixture(dir.path(), &TestCell::new(AuthMethod::FiveGAka, 10, 1), 1.5, 40.0, 100.0);

    // A cell directory with a truncated CSV
    let broken = dir.path().join("EAP_AKA_10ues_iter1");
    std::fs::create_dir_all(&broken).unwrap();
    std::fs::write(broken.join("registration_overhead_summary.csv"), "timestamp,num_ues\n").unwrap();

    // A cell directory with no CSV at all
    std::fs::create_dir_all(dir.path().join("EAP_AKA_10ues_iter2")).unwrap();

    let records =
        results::scan_results_tree(dir.path(), "registration_overhead_summary.csv").unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records.iter().filter(|r| r.metrics.is_some()).count(), 1);

    // Aggregation still proceeds over what is usable
    let stats = results::compute_summary(&records);
    let aka = stats.iter().find(|s| s.method == AuthMethod::FiveGAka).unwrap();
    assert_eq!(aka.samples, 1);
    assert!((aka.reg_time_mean.unwrap() - 1.5).abs() < 1e-9);
}

#[test]
fn test_reports_and_chart_from_scanned_tree() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();

    for ue_count in [10, 25] {
        for iteration in [1, 2] {
            write_summary_fixture(
                dir.path(),
                &TestCell::new(AuthMethod::FiveGAka, ue_count, iteration),
                1.0 + ue_count as f64 / 100.0,
                40.0,
                100.0,
            );
            write_summary_fixture(
                dir.path(),
                &TestCell::new(AuthMethod::EapAkaPrime, ue_count, iteration),
                1.2 + ue_count as f64 / 100.0,
                45.0,
                110.0,
            );
        }
    }

    let records =
        results::scan_results_tree(dir.path(), "registration_overhead_summary.csv").unwrap();
    assert_eq!(records.len(), 8);

    results::write_consolidated_json(dir.path(), &records).unwrap();
    results::write_test_summary_csv(dir.path(), &records).unwrap();
    let stats = results::compute_summary(&records);
    results::write_summary_statistics_csv(dir.path(), &stats).unwrap();
    plot::render_comparison_chart(&dir.path().join("performance_comparison.png"), &stats).unwrap();

    assert!(dir.path().join("consolidated_results.json").exists());
    assert!(dir.path().join("test_summary.csv").exists());
    assert!(dir.path().join("summary_statistics.csv").exists());
    assert!(dir.path().join("performance_comparison.png").exists());

    let summary = std::fs::read_to_string(dir.path().join("test_summary.csv")).unwrap();
    assert_eq!(summary.lines().count(), 9); // header + 8 records
}
