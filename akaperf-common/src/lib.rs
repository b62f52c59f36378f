//! Common types and utilities for the akaperf harness
//!
//! This crate provides the shared domain types, configuration structures,
//! error type and logging bootstrap used by the orchestrator.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{
    ErrorHandlingConfig, MonitoringConfig, OrchestratorConfig, OutputConfig, ScriptsConfig,
    TestConfiguration, TimingConfig, UeTemplateConfig,
};
pub use error::Error;
pub use logging::{init_logging, init_logging_with_file, LogLevel};
pub use types::{AuthMethod, CellMetrics, RunRecord, TestCell, UeWindow};
