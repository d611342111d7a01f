//! RAM usage from the kernel memory info.

use crate::config::SensorConfig;
use crate::metrics::data::{MetricSnapshot, Reading, SensorKind};
use crate::metrics::parser;
use crate::metrics::sampler::{FailureLog, SensorSampler};
use crate::metrics::source::SourceReader;
use std::path::Path;

/// Default memory info source.
pub const PROC_MEMINFO: &str = "/proc/meminfo";

/// RAM sensor. Stateless apart from failure logging.
#[derive(Debug, Default)]
pub struct RamSampler {
    failures: FailureLog,
}

impl RamSampler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: SourceReader> SensorSampler<R> for RamSampler {
    fn kind(&self) -> SensorKind {
        SensorKind::Ram
    }

    async fn sample(&mut self, reader: &R, config: &SensorConfig) -> MetricSnapshot {
        let path = config
            .ram_override()
            .unwrap_or_else(|| Path::new(PROC_MEMINFO));

        let used = reader
            .read_file(path)
            .await
            .and_then(|text| parser::parse_meminfo(&text))
            .and_then(|totals| totals.used_percent());

        let usage = match used {
            Ok(percent) => {
                self.failures.clear("usage");
                Reading::Value(percent)
            }
            Err(err) => {
                self.failures.record(SensorKind::Ram, "usage", &err);
                Reading::Unavailable
            }
        };

        MetricSnapshot::new(SensorKind::Ram, usage)
    }
}
