//! CPU usage from cumulative kernel counters, plus CPU temperature.

use crate::config::SensorConfig;
use crate::metrics::data::{CpuCounterSample, MetricSnapshot, Reading, SensorKind};
use crate::metrics::parser;
use crate::metrics::sampler::{FailureLog, SensorSampler};
use crate::metrics::source::SourceReader;
use crate::metrics::temperature::TemperatureProbe;
use std::path::PathBuf;

/// Kernel CPU counters.
pub const PROC_STAT: &str = "/proc/stat";

/// Turns successive cumulative counter samples into a busy percentage.
#[derive(Debug, Default, Clone)]
pub struct CpuUsageCalculator {
    previous: Option<CpuCounterSample>,
}

impl CpuUsageCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample and return usage since the previous one.
    ///
    /// Returns `None` for the first sample. A counter reset (no forward
    /// progress in the total) reports exactly 0%. The stored sample is
    /// always replaced.
    pub fn update(&mut self, sample: CpuCounterSample) -> Option<f64> {
        self.previous.replace(sample).map(|previous| {
            let total_diff = sample.total as i128 - previous.total as i128;
            let idle_diff = sample.idle_combined as i128 - previous.idle_combined as i128;
            if total_diff > 0 {
                (total_diff - idle_diff) as f64 / total_diff as f64 * 100.0
            } else {
                0.0
            }
        })
    }

    pub fn previous(&self) -> Option<CpuCounterSample> {
        self.previous
    }
}

/// CPU sensor: usage from counters, temperature from [`TemperatureProbe`].
#[derive(Debug)]
pub struct CpuSampler {
    stat_path: PathBuf,
    calculator: CpuUsageCalculator,
    probe: TemperatureProbe,
    failures: FailureLog,
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuSampler {
    pub fn new() -> Self {
        Self::with_sources(PathBuf::from(PROC_STAT), TemperatureProbe::new())
    }

    pub fn with_sources(stat_path: PathBuf, probe: TemperatureProbe) -> Self {
        Self {
            stat_path,
            calculator: CpuUsageCalculator::new(),
            probe,
            failures: FailureLog::default(),
        }
    }

    pub fn probe(&self) -> &TemperatureProbe {
        &self.probe
    }

    pub(crate) fn probe_mut(&mut self) -> &mut TemperatureProbe {
        &mut self.probe
    }

    async fn usage<R: SourceReader>(&mut self, reader: &R) -> Reading {
        let counters = reader
            .read_file(&self.stat_path)
            .await
            .and_then(|text| parser::parse_cpu_counters(&text));

        match counters {
            Ok(sample) => {
                self.failures.clear("usage");
                match self.calculator.update(sample) {
                    Some(usage) => Reading::Value(usage),
                    None => Reading::Pending,
                }
            }
            Err(err) => {
                self.failures.record(SensorKind::Cpu, "usage", &err);
                Reading::Unavailable
            }
        }
    }

    async fn temperature<R: SourceReader>(&mut self, reader: &R, config: &SensorConfig) -> Reading {
        self.probe
            .ensure_resolved(reader, config.cpu_temp_override())
            .await;

        match self.probe.read(reader, &config.sensors_command).await {
            Ok(celsius) => {
                self.failures.clear("temperature");
                Reading::Value(celsius)
            }
            Err(err) => {
                self.failures.record(SensorKind::Cpu, "temperature", &err);
                Reading::Unavailable
            }
        }
    }
}

impl<R: SourceReader> SensorSampler<R> for CpuSampler {
    fn kind(&self) -> SensorKind {
        SensorKind::Cpu
    }

    async fn sample(&mut self, reader: &R, config: &SensorConfig) -> MetricSnapshot {
        let usage = self.usage(reader).await;
        let snapshot = MetricSnapshot::new(SensorKind::Cpu, usage);

        if config.show_cpu_temp {
            let temperature = self.temperature(reader, config).await;
            snapshot.with_temperature(temperature)
        } else {
            snapshot
        }
    }
}
