//! GPU utilization and temperature from a vendor query tool, plus the
//! auxiliary fan (water pump) channel from the sensor-query command.

use crate::config::SensorConfig;
use crate::metrics::data::{MetricSnapshot, Reading, SensorKind};
use crate::metrics::parser;
use crate::metrics::sampler::{FailureLog, SensorSampler};
use crate::metrics::source::SourceReader;

/// Query used when no override command is configured.
pub const DEFAULT_GPU_COMMAND: &str =
    "nvidia-smi --query-gpu=utilization.gpu,temperature.gpu --format=csv,noheader,nounits";

/// GPU sensor.
///
/// Query output is trusted verbatim. Any query failure marks utilization and
/// temperature unavailable so earlier values do not linger on the panel.
#[derive(Debug, Default)]
pub struct GpuSampler {
    failures: FailureLog,
}

impl GpuSampler {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fan<R: SourceReader>(&mut self, reader: &R, config: &SensorConfig) -> Reading {
        let rpm = reader
            .run_command(&config.sensors_command)
            .await
            .and_then(|output| parser::parse_fan_rpm(&output));

        match rpm {
            Ok(rpm) => {
                self.failures.clear("fan");
                Reading::Value(f64::from(rpm))
            }
            Err(err) => {
                self.failures.record(SensorKind::Gpu, "fan", &err);
                Reading::Unavailable
            }
        }
    }
}

impl<R: SourceReader> SensorSampler<R> for GpuSampler {
    fn kind(&self) -> SensorKind {
        SensorKind::Gpu
    }

    async fn sample(&mut self, reader: &R, config: &SensorConfig) -> MetricSnapshot {
        let command = config.gpu_command_override().unwrap_or(DEFAULT_GPU_COMMAND);
        let fields = reader
            .run_command(command)
            .await
            .and_then(|output| parser::parse_gpu_line(&output));

        let (usage, temperature) = match fields {
            Ok(fields) => {
                self.failures.clear("query");
                let temperature = fields
                    .temperature
                    .map(Reading::Verbatim)
                    .unwrap_or(Reading::Unavailable);
                (Reading::Verbatim(fields.utilization), temperature)
            }
            Err(err) => {
                self.failures.record(SensorKind::Gpu, "query", &err);
                (Reading::Unavailable, Reading::Unavailable)
            }
        };

        let mut snapshot = MetricSnapshot::new(SensorKind::Gpu, usage);
        if config.show_gpu_temp {
            snapshot = snapshot.with_temperature(temperature);
        }
        if config.show_gpu_fan {
            let fan = self.fan(reader, config).await;
            snapshot = snapshot.with_fan(fan);
        }
        snapshot
    }
}
