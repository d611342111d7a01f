//! CPU temperature path resolution and reading.

use crate::error::Result;
use crate::metrics::parser;
use crate::metrics::source::SourceReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Pseudo-files probed, in order, when no override path is configured.
pub const THERMAL_CANDIDATES: [&str; 4] = [
    "/sys/class/thermal/thermal_zone0/temp",
    "/sys/class/hwmon/hwmon0/temp1_input",
    "/sys/class/hwmon/hwmon1/temp1_input",
    "/sys/class/hwmon/hwmon2/temp1_input",
];

/// Resolves the CPU temperature file once and reads it every tick,
/// falling back to the sensor-query command.
#[derive(Debug, Clone)]
pub struct TemperatureProbe {
    candidates: Vec<PathBuf>,
    resolved: Option<PathBuf>,
    needs_resolution: bool,
}

impl Default for TemperatureProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl TemperatureProbe {
    pub fn new() -> Self {
        Self::with_candidates(THERMAL_CANDIDATES.iter().map(PathBuf::from).collect())
    }

    pub fn with_candidates(candidates: Vec<PathBuf>) -> Self {
        Self {
            candidates,
            resolved: None,
            needs_resolution: true,
        }
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// The cached path, if resolution has run and found one.
    pub fn resolved_path(&self) -> Option<&Path> {
        self.resolved.as_deref()
    }

    /// Drop the cached path; the next read resolves again.
    pub fn invalidate(&mut self) {
        self.needs_resolution = true;
        self.resolved = None;
    }

    /// Resolve the path if it has not been resolved since the last invalidation.
    ///
    /// A configured override is taken as-is without checking that it exists.
    pub async fn ensure_resolved<R: SourceReader>(
        &mut self,
        reader: &R,
        override_path: Option<&Path>,
    ) -> Option<&Path> {
        if self.needs_resolution {
            self.resolved = match override_path {
                Some(path) => Some(path.to_path_buf()),
                None => self.detect(reader).await,
            };
            self.needs_resolution = false;
            debug!(path = ?self.resolved, "resolved CPU temperature source");
        }
        self.resolved.as_deref()
    }

    async fn detect<R: SourceReader>(&self, reader: &R) -> Option<PathBuf> {
        for candidate in &self.candidates {
            if reader.exists(candidate).await {
                return Some(candidate.clone());
            }
        }
        None
    }

    /// Read the temperature in Celsius.
    ///
    /// The resolved file is tried first. The sensor-query command is used
    /// whenever that read fails or no file is resolved.
    pub async fn read<R: SourceReader>(&self, reader: &R, sensors_command: &str) -> Result<f64> {
        if let Some(path) = &self.resolved {
            let from_file = reader
                .read_file(path)
                .await
                .and_then(|text| parser::parse_millidegrees(&text));
            match from_file {
                Ok(celsius) => return Ok(celsius),
                Err(err) => debug!(path = %path.display(), "temperature file unusable: {}", err),
            }
        }

        let output = reader.run_command(sensors_command).await?;
        parser::parse_sensors_temperature(&output)
    }
}
