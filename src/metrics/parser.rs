//! Fixed-format extraction of sensor values from raw source text.

use crate::error::{Result, SensorError};
use crate::metrics::data::CpuCounterSample;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CPU_TEMP: Regex = Regex::new(r"(?:Core 0|Package id 0):\s+\+?([\d.]+)°C")
        .expect("valid CPU temperature pattern");
    static ref MEM_TOTAL: Regex = Regex::new(r"MemTotal:\s+(\d+)").expect("valid MemTotal pattern");
    static ref MEM_AVAILABLE: Regex =
        Regex::new(r"MemAvailable:\s+(\d+)").expect("valid MemAvailable pattern");
    static ref FAN5: Regex = Regex::new(r"(?i)fan5:\s+(\d+)\s*RPM").expect("valid fan pattern");
}

/// Memory totals in kB as reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryTotals {
    pub total_kb: u64,
    pub available_kb: u64,
}

impl MemoryTotals {
    /// Used memory as a percentage of the total.
    pub fn used_percent(&self) -> Result<f64> {
        if self.total_kb == 0 {
            return Err(SensorError::parse_error("MemTotal is zero"));
        }
        let used = self.total_kb.saturating_sub(self.available_kb);
        Ok(used as f64 / self.total_kb as f64 * 100.0)
    }
}

/// Utilization and temperature columns of one GPU query line, untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuFields {
    pub utilization: String,
    pub temperature: Option<String>,
}

/// Parse the aggregate line of the kernel CPU counters.
///
/// Fields 1-4 (user, nice, system, idle) are required. Fields 5-8 (iowait,
/// irq, softirq, steal) default to zero for older counter formats.
pub fn parse_cpu_counters(text: &str) -> Result<CpuCounterSample> {
    let line = text
        .lines()
        .next()
        .ok_or_else(|| SensorError::parse_error("CPU counters are empty"))?;
    let fields: Vec<&str> = line.split_whitespace().collect();

    let required = |index: usize| -> Result<u64> {
        fields
            .get(index)
            .and_then(|field| field.parse::<u64>().ok())
            .ok_or_else(|| {
                SensorError::parse_error(format!("missing CPU counter at position {}", index))
            })
    };
    let optional = |index: usize| -> u64 {
        fields
            .get(index)
            .and_then(|field| field.parse::<u64>().ok())
            .unwrap_or(0)
    };

    let user = required(1)?;
    let nice = required(2)?;
    let system = required(3)?;
    let idle = required(4)?;
    let iowait = optional(5);
    let irq = optional(6);
    let softirq = optional(7);
    let steal = optional(8);

    Ok(CpuCounterSample {
        total: user + nice + system + idle + iowait + irq + softirq + steal,
        idle_combined: idle + iowait,
    })
}

/// Parse `MemTotal` and `MemAvailable` from a meminfo blob. Both are required.
pub fn parse_meminfo(text: &str) -> Result<MemoryTotals> {
    let capture = |pattern: &Regex, name: &str| -> Result<u64> {
        pattern
            .captures(text)
            .and_then(|caps| caps[1].parse::<u64>().ok())
            .ok_or_else(|| SensorError::parse_error(format!("no {} line", name)))
    };

    Ok(MemoryTotals {
        total_kb: capture(&MEM_TOTAL, "MemTotal")?,
        available_kb: capture(&MEM_AVAILABLE, "MemAvailable")?,
    })
}

/// Parse a thermal-zone style file holding millidegrees Celsius.
pub fn parse_millidegrees(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    trimmed
        .parse::<i64>()
        .map(|milli| milli as f64 / 1000.0)
        .map_err(|_| SensorError::parse_error(format!("invalid millidegree value '{}'", trimmed)))
}

/// Find the first core/package temperature line in sensor-query output.
pub fn parse_sensors_temperature(output: &str) -> Result<f64> {
    CPU_TEMP
        .captures(output)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .ok_or_else(|| SensorError::parse_error("no Core 0 or Package id 0 temperature"))
}

/// Find the first `fan5` RPM reading in sensor-query output.
pub fn parse_fan_rpm(output: &str) -> Result<u32> {
    FAN5.captures(output)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .ok_or_else(|| SensorError::parse_error("no fan5 reading"))
}

/// Split the first line of GPU query output into its columns.
///
/// Values are trimmed and otherwise kept as text.
pub fn parse_gpu_line(output: &str) -> Result<GpuFields> {
    let line = output.trim().lines().next().unwrap_or("");
    let mut parts = line.split(',').map(str::trim);

    let utilization = parts
        .next()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| SensorError::parse_error("empty GPU query line"))?;
    let temperature = parts.next().filter(|value| !value.is_empty());

    Ok(GpuFields {
        utilization: utilization.to_string(),
        temperature: temperature.map(str::to_string),
    })
}
