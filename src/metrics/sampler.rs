//! Per-sensor sampling and the set of samplers driven by each tick.

use crate::config::SensorConfig;
use crate::error::{FailureCategory, SensorError};
use crate::metrics::cpu::CpuSampler;
use crate::metrics::data::{MetricSnapshot, SensorKind};
use crate::metrics::gpu::GpuSampler;
use crate::metrics::memory::RamSampler;
use crate::metrics::source::SourceReader;
use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use tracing::{debug, warn};

/// One sensor's "sample now" operation.
///
/// Sampling never fails as a whole: every source failure becomes an
/// unavailable field in the returned snapshot.
pub trait SensorSampler<R: SourceReader> {
    fn kind(&self) -> SensorKind;

    fn sample(
        &mut self,
        reader: &R,
        config: &SensorConfig,
    ) -> impl Future<Output = MetricSnapshot> + Send;
}

/// Rate limiter for failure logs.
///
/// Parse failures warn once per field until that field succeeds again.
/// Unavailable sources are only ever logged at debug level.
#[derive(Debug, Default)]
pub(crate) struct FailureLog {
    warned: HashSet<&'static str>,
}

impl FailureLog {
    pub(crate) fn record(&mut self, kind: SensorKind, field: &'static str, err: &SensorError) {
        match err.category() {
            FailureCategory::ParseFailure if self.warned.insert(field) => {
                warn!(sensor = %kind, field, "unexpected sensor data: {}", err);
            }
            _ => debug!(sensor = %kind, field, "not available: {}", err),
        }
    }

    pub(crate) fn clear(&mut self, field: &'static str) {
        self.warned.remove(field);
    }
}

/// The three samplers plus the reader they share.
pub struct SamplerSet<R> {
    reader: R,
    cpu: CpuSampler,
    ram: RamSampler,
    gpu: GpuSampler,
}

impl<R: SourceReader> SamplerSet<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            cpu: CpuSampler::new(),
            ram: RamSampler::new(),
            gpu: GpuSampler::new(),
        }
    }

    /// Use a custom CPU sampler, e.g. with different temperature candidates.
    pub fn with_cpu_sampler(mut self, cpu: CpuSampler) -> Self {
        self.cpu = cpu;
        self
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Sample every enabled sensor once, in display order.
    pub async fn sample_all(&mut self, config: &SensorConfig) -> Vec<MetricSnapshot> {
        let mut snapshots = Vec::with_capacity(SensorKind::ALL.len());
        for kind in config.enabled_kinds() {
            let snapshot = match kind {
                SensorKind::Cpu => self.cpu.sample(&self.reader, config).await,
                SensorKind::Ram => self.ram.sample(&self.reader, config).await,
                SensorKind::Gpu => self.gpu.sample(&self.reader, config).await,
            };
            debug!(sensor = %kind, outcome = ?snapshot.outcome(), "{}", snapshot);
            snapshots.push(snapshot);
        }
        snapshots
    }

    /// Forget the resolved CPU temperature path.
    pub fn invalidate_temperature_path(&mut self) {
        self.cpu.probe_mut().invalidate();
    }

    /// Resolve the CPU temperature path now and return it.
    pub async fn resolve_temperature_path(&mut self, config: &SensorConfig) -> Option<&Path> {
        self.cpu
            .probe_mut()
            .ensure_resolved(&self.reader, config.cpu_temp_override())
            .await
    }
}
