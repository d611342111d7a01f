//! Data structures for sensor snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of sensor shown on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Cpu,
    Ram,
    Gpu,
}

impl SensorKind {
    /// All kinds, in display order.
    pub const ALL: [SensorKind; 3] = [SensorKind::Cpu, SensorKind::Ram, SensorKind::Gpu];

    /// Whether this kind carries a temperature sub-display.
    pub fn has_temperature(self) -> bool {
        matches!(self, SensorKind::Cpu | SensorKind::Gpu)
    }

    /// Whether this kind carries a fan sub-display.
    pub fn has_fan(self) -> bool {
        matches!(self, SensorKind::Gpu)
    }

    /// Position on the panel, left to right.
    pub fn order(self) -> u8 {
        match self {
            SensorKind::Cpu => 0,
            SensorKind::Ram => 1,
            SensorKind::Gpu => 2,
        }
    }

    /// Short identifier used in settings keys.
    pub fn id(self) -> &'static str {
        match self {
            SensorKind::Cpu => "cpu",
            SensorKind::Ram => "ram",
            SensorKind::Gpu => "gpu",
        }
    }

    /// Label shown next to the value.
    pub fn name(self) -> &'static str {
        match self {
            SensorKind::Cpu => "CPU",
            SensorKind::Ram => "RAM",
            SensorKind::Gpu => "GPU",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cumulative CPU time counters from one read of the kernel counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuCounterSample {
    /// Sum of user, nice, system, idle, iowait, irq, softirq and steal
    pub total: u64,
    /// idle + iowait
    pub idle_combined: u64,
}

/// State of one displayed field for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Reading {
    /// No value yet; the label keeps its placeholder.
    Pending,
    /// Parsed numeric value.
    Value(f64),
    /// Text taken from the source without numeric validation.
    Verbatim(String),
    /// Source confirmed unavailable this tick.
    Unavailable,
}

impl Reading {
    /// Numeric view of the reading. Verbatim text is parsed leniently.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Reading::Value(v) => Some(*v),
            Reading::Verbatim(text) => text.trim().parse().ok(),
            Reading::Pending | Reading::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Reading::Value(_) | Reading::Verbatim(_))
    }

    fn render(&self, unit: &str, precision: usize) -> String {
        match self {
            Reading::Pending => format!("---{}", unit),
            Reading::Value(v) => format!("{:.*}{}", precision, v, unit),
            Reading::Verbatim(text) => format!("{}{}", text, unit),
            Reading::Unavailable => "N/A".to_string(),
        }
    }
}

/// How a sampling attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleOutcome {
    /// Every tracked field has a value (or is legitimately pending).
    Success,
    /// Some tracked fields are unavailable.
    PartialFailure,
    /// No tracked field is available.
    TotalFailure,
}

/// One sensor's result for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    /// Which sensor this snapshot belongs to
    pub kind: SensorKind,
    /// Timestamp when this snapshot was taken (Unix timestamp in milliseconds)
    pub timestamp: u64,
    /// Utilization percentage
    pub usage: Reading,
    /// Temperature in Celsius, `None` when not tracked
    pub temperature: Option<Reading>,
    /// Fan speed in RPM, `None` when not tracked
    pub fan: Option<Reading>,
}

impl MetricSnapshot {
    /// Create a snapshot with the current timestamp and no sub-readings.
    pub fn new(kind: SensorKind, usage: Reading) -> Self {
        Self {
            kind,
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            usage,
            temperature: None,
            fan: None,
        }
    }

    /// Attach a temperature reading. Ignored for kinds without a temperature sensor.
    pub fn with_temperature(mut self, reading: Reading) -> Self {
        if self.kind.has_temperature() {
            self.temperature = Some(reading);
        }
        self
    }

    /// Attach a fan reading. Ignored for kinds without a fan.
    pub fn with_fan(mut self, reading: Reading) -> Self {
        if self.kind.has_fan() {
            self.fan = Some(reading);
        }
        self
    }

    pub fn usage_percent(&self) -> Option<f64> {
        self.usage.as_f64()
    }

    pub fn temperature_c(&self) -> Option<f64> {
        self.temperature.as_ref().and_then(Reading::as_f64)
    }

    pub fn fan_rpm(&self) -> Option<u32> {
        self.fan
            .as_ref()
            .and_then(Reading::as_f64)
            .filter(|rpm| *rpm >= 0.0)
            .map(|rpm| rpm.round() as u32)
    }

    /// Classify the attempt. `Pending` usage counts as a success.
    pub fn outcome(&self) -> SampleOutcome {
        let fields = std::iter::once(&self.usage)
            .chain(self.temperature.iter())
            .chain(self.fan.iter());

        let (mut ok, mut failed) = (0, 0);
        for reading in fields {
            match reading {
                Reading::Unavailable => failed += 1,
                _ => ok += 1,
            }
        }

        match (ok, failed) {
            (_, 0) => SampleOutcome::Success,
            (0, _) => SampleOutcome::TotalFailure,
            _ => SampleOutcome::PartialFailure,
        }
    }

    /// Value label, e.g. `12.3%`, `---%` or `N/A`.
    pub fn usage_label(&self) -> String {
        self.usage.render("%", 1)
    }

    /// Temperature label, e.g. `45.0°C`.
    pub fn temperature_label(&self) -> Option<String> {
        self.temperature.as_ref().map(|t| t.render("°C", 1))
    }

    /// Fan label, e.g. `1200 RPM`.
    pub fn fan_label(&self) -> Option<String> {
        self.fan.as_ref().map(|f| f.render(" RPM", 0))
    }
}

impl fmt::Display for MetricSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.usage_label())?;
        if let Some(temp) = self.temperature_label() {
            write!(f, " {}", temp)?;
        }
        if let Some(fan) = self.fan_label() {
            write!(f, " {}", fan)?;
        }
        Ok(())
    }
}
