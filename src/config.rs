//! Sensor configuration supplied by the panel host.

use crate::error::{Result, SensorError};
use crate::metrics::data::SensorKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Bounds accepted for the refresh interval, in milliseconds.
pub const MIN_INTERVAL_MS: u64 = 500;
pub const MAX_INTERVAL_MS: u64 = 10_000;

/// Default sensor-query command for temperatures and fans.
pub const DEFAULT_SENSORS_COMMAND: &str = "sensors";

/// Live configuration for the sampling core.
///
/// Empty override strings count as unset, matching how the panel stores them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub show_cpu: bool,
    pub show_ram: bool,
    pub show_gpu: bool,
    pub show_cpu_temp: bool,
    pub show_gpu_temp: bool,
    pub show_gpu_fan: bool,
    /// Refresh interval in milliseconds
    pub refresh_interval_ms: u64,
    /// Override file for the CPU temperature
    pub cpu_temp_path: Option<PathBuf>,
    /// Override file for memory info
    pub ram_path: Option<PathBuf>,
    /// Override GPU query command line
    pub gpu_command: Option<String>,
    /// Sensor-query command used for CPU temperature fallback and fans
    pub sensors_command: String,
    /// Upper bound for any single external command
    pub command_timeout_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            show_cpu: true,
            show_ram: true,
            show_gpu: true,
            show_cpu_temp: true,
            show_gpu_temp: true,
            show_gpu_fan: true,
            refresh_interval_ms: crate::DEFAULT_INTERVAL_MS,
            cpu_temp_path: None,
            ram_path: None,
            gpu_command: None,
            sensors_command: DEFAULT_SENSORS_COMMAND.to_string(),
            command_timeout_ms: crate::metrics::source::DEFAULT_COMMAND_TIMEOUT_MS,
        }
    }
}

/// What changed between two configurations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigDelta {
    pub interval_changed: bool,
    pub cpu_temp_path_changed: bool,
}

impl SensorConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SensorConfig = toml::from_str(text)
            .map_err(|e| SensorError::config_error(format!("invalid config: {}", e)))?;
        Ok(config.validated())
    }

    /// Load a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            SensorError::config_error(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Load the user's config file if it exists, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load(path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Clamp out-of-range values.
    pub fn validated(mut self) -> Self {
        let clamped = self
            .refresh_interval_ms
            .clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS);
        if clamped != self.refresh_interval_ms {
            warn!(
                "refresh interval {}ms out of range, using {}ms",
                self.refresh_interval_ms, clamped
            );
            self.refresh_interval_ms = clamped;
        }
        if self.command_timeout_ms == 0 {
            warn!("command timeout of 0ms ignored");
            self.command_timeout_ms = crate::metrics::source::DEFAULT_COMMAND_TIMEOUT_MS;
        }
        if self.sensors_command.trim().is_empty() {
            self.sensors_command = DEFAULT_SENSORS_COMMAND.to_string();
        }
        self
    }

    /// Set the refresh interval, clamped to the accepted range.
    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.refresh_interval_ms = interval_ms;
        self.validated()
    }

    /// Set the CPU temperature override path.
    pub fn with_cpu_temp_path(mut self, path: Option<PathBuf>) -> Self {
        self.cpu_temp_path = path;
        self
    }

    /// Set the memory info override path.
    pub fn with_ram_path(mut self, path: Option<PathBuf>) -> Self {
        self.ram_path = path;
        self
    }

    /// Set the GPU query override command.
    pub fn with_gpu_command(mut self, command: Option<String>) -> Self {
        self.gpu_command = command;
        self
    }

    /// Show or hide a whole sensor.
    pub fn with_sensor(mut self, kind: SensorKind, shown: bool) -> Self {
        match kind {
            SensorKind::Cpu => self.show_cpu = shown,
            SensorKind::Ram => self.show_ram = shown,
            SensorKind::Gpu => self.show_gpu = shown,
        }
        self
    }

    pub fn is_enabled(&self, kind: SensorKind) -> bool {
        match kind {
            SensorKind::Cpu => self.show_cpu,
            SensorKind::Ram => self.show_ram,
            SensorKind::Gpu => self.show_gpu,
        }
    }

    /// Enabled kinds in display order.
    pub fn enabled_kinds(&self) -> Vec<SensorKind> {
        SensorKind::ALL
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn cpu_temp_override(&self) -> Option<&Path> {
        non_empty_path(&self.cpu_temp_path)
    }

    pub fn ram_override(&self) -> Option<&Path> {
        non_empty_path(&self.ram_path)
    }

    pub fn gpu_command_override(&self) -> Option<&str> {
        self.gpu_command
            .as_deref()
            .filter(|command| !command.trim().is_empty())
    }

    /// Compare against a newer configuration.
    pub fn diff(&self, next: &SensorConfig) -> ConfigDelta {
        ConfigDelta {
            interval_changed: self.refresh_interval_ms != next.refresh_interval_ms,
            cpu_temp_path_changed: self.cpu_temp_override() != next.cpu_temp_override(),
        }
    }
}

fn non_empty_path(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref()
        .filter(|path| !path.as_os_str().is_empty())
}

/// `$XDG_CONFIG_HOME/panel-sensors/config.toml` or the platform equivalent.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("panel-sensors").join("config.toml"))
}
