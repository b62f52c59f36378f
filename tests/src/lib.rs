//! Integration test framework for the akaperf harness
//!
//! Provides shared fixtures (fast configurations, fake result trees) plus
//! end-to-end scenarios that drive the orchestrator against stand-in shell
//! commands instead of a real 5G core.

pub mod test_utils;

#[cfg(test)]
mod aggregation_flow;
#[cfg(test)]
mod matrix_flow;

pub use test_utils::{fast_config, init_test_logging, write_summary_fixture, write_ue_template};
