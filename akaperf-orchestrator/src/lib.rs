//! Comparative 5G authentication performance test harness
//!
//! Orchestrates registration-overhead measurements of 5G-AKA versus
//! EAP-AKA' against an external mobile core and radio simulator: it drives
//! the core's lifecycle, provisions subscribers, launches fleets of UE
//! client processes, samples core CPU/memory and registration timings, and
//! consolidates everything into summary statistics and comparison charts.

pub mod command;
pub mod launcher;
pub mod orchestrator;
pub mod plot;
pub mod results;
pub mod sampler;
pub mod services;
pub mod ue_config;

pub use launcher::UeFleet;
pub use orchestrator::{MatrixOutcome, Orchestrator};
pub use results::GroupStats;
pub use sampler::{MetricsSampler, SamplerReport};
pub use services::{GnbHandle, ServiceDriver};
pub use ue_config::UeVariant;
