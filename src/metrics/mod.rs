//! Sensor sampling: raw sources, parsers, derived metrics and per-sensor samplers.
//!
//! Each tick the [`sampler::SamplerSet`] reads the raw sources through a
//! [`source::SourceReader`], parses them, and produces one
//! [`data::MetricSnapshot`] per enabled sensor.

pub mod cpu;
pub mod data;
pub mod gpu;
pub mod memory;
pub mod parser;
pub mod sampler;
pub mod source;
pub mod temperature;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used items
pub use data::{MetricSnapshot, Reading, SensorKind};
pub use sampler::{SamplerSet, SensorSampler};
pub use source::{SourceReader, SystemReader};
