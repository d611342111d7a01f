//! # Panel Sensors - status-bar sensor sampling
//!
//! The sampling core behind a desktop panel that shows CPU, RAM and GPU
//! usage, temperatures and a fan reading. The crate reads raw kernel and
//! vendor sources, derives metrics from them, and refreshes everything on a
//! timer that never runs two sampling passes at once. Rendering is left to
//! whoever consumes the snapshot stream.
//!
//! ## Features
//!
//! - **CPU usage** from successive `/proc/stat` counter samples
//! - **CPU temperature** from a resolved thermal file with a `sensors` fallback
//! - **RAM usage** from `/proc/meminfo`
//! - **GPU usage and temperature** from `nvidia-smi` or an override command
//! - **Fan speed** from the `fan5` channel of `sensors`
//! - **Live reconfiguration** of interval and sources without restarting
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use panel_sensors::{RefreshScheduler, SamplerSet, SensorConfig, SystemReader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SensorConfig::default();
//!     let reader = SystemReader::new(config.command_timeout());
//!     let (handle, mut snapshots) = RefreshScheduler::start(SamplerSet::new(reader), config);
//!
//!     while let Some(snapshot) = snapshots.next().await {
//!         println!("{}", snapshot);
//!     }
//!     handle.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod scheduler;

// Re-export public API
pub use config::SensorConfig;
pub use error::{FailureCategory, Result, SensorError};
pub use metrics::{
    cpu::{CpuSampler, CpuUsageCalculator},
    data::{CpuCounterSample, MetricSnapshot, Reading, SampleOutcome, SensorKind},
    gpu::GpuSampler,
    memory::RamSampler,
    sampler::{SamplerSet, SensorSampler},
    source::{SourceReader, SystemReader},
    temperature::TemperatureProbe,
};
pub use scheduler::{RefreshScheduler, SchedulerHandle, SchedulerStats};

/// The default refresh interval in milliseconds
pub const DEFAULT_INTERVAL_MS: u64 = 1000;
