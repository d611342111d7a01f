use futures_util::StreamExt;
use panel_sensors::{
    error::SensorError,
    metrics::{parser, temperature::TemperatureProbe},
    CpuSampler, MetricSnapshot, Reading, RefreshScheduler, SampleOutcome, SamplerSet,
    SensorConfig, SensorKind, SensorSampler, SystemReader,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MEMINFO: &str = "MemTotal:       16000000 kB\nMemFree:         2000000 kB\nMemAvailable:    8000000 kB\n";

/// Sources laid out in a temporary directory.
struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            dir: tempfile::tempdir().expect("Should create temp dir"),
        };
        fixture.write("stat", "cpu  100 0 100 800 0 0 0 0\n");
        fixture.write("meminfo", MEMINFO);
        fixture
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, contents: &str) {
        fs::write(self.path(name), contents).expect("Should write fixture file");
    }

    /// A sampler set reading only from this fixture.
    fn samplers(&self) -> SamplerSet<SystemReader> {
        let probe = TemperatureProbe::with_candidates(vec![
            self.path("thermal_zone0"),
            self.path("hwmon0"),
        ]);
        SamplerSet::new(SystemReader::new(Duration::from_secs(2)))
            .with_cpu_sampler(CpuSampler::with_sources(self.path("stat"), probe))
    }

    fn config(&self) -> SensorConfig {
        SensorConfig::default()
            .with_ram_path(Some(self.path("meminfo")))
            .with_gpu_command(Some("panel-sensors-missing-gpu-tool".to_string()))
    }
}

/// Test MetricSnapshot serialization and deserialization
#[test]
fn test_snapshot_serialization() {
    let snapshot = MetricSnapshot::new(SensorKind::Gpu, Reading::Verbatim("23".to_string()))
        .with_temperature(Reading::Value(61.0))
        .with_fan(Reading::Unavailable);

    let json = serde_json::to_string_pretty(&snapshot).expect("Should serialize to JSON");
    assert!(json.contains("\"gpu\""));
    assert!(json.contains("verbatim"));
    assert!(json.contains("unavailable"));

    let deserialized: MetricSnapshot =
        serde_json::from_str(&json).expect("Should deserialize from JSON");
    assert_eq!(deserialized, snapshot);
}

/// Test JSON shape consumed by the display
#[test]
fn test_json_schema_validation() {
    let snapshot = MetricSnapshot::new(SensorKind::Ram, Reading::Value(42.0));
    let json_value = serde_json::to_value(&snapshot).expect("Should serialize");

    assert!(json_value.get("kind").is_some());
    assert!(json_value.get("timestamp").is_some());
    assert!(json_value.get("usage").is_some());
    assert_eq!(json_value["usage"]["state"], "value");
    assert_eq!(json_value["usage"]["value"], 42.0);
    assert!(json_value["temperature"].is_null());
    assert!(json_value["fan"].is_null());
}

/// Test the documented parse examples
#[test]
fn test_parse_examples() {
    let totals = parser::parse_meminfo(MEMINFO).unwrap();
    assert_eq!(totals.used_percent().unwrap(), 50.0);
    assert_eq!(parser::parse_millidegrees("45000").unwrap(), 45.0);
    assert_eq!(
        parser::parse_sensors_temperature("Package id 0:   +52.0°C").unwrap(),
        52.0
    );
    let gpu = parser::parse_gpu_line("23, 61").unwrap();
    assert_eq!(gpu.utilization, "23");
    assert_eq!(gpu.temperature.as_deref(), Some("61"));
}

/// Test SensorError creation and formatting
#[test]
fn test_sensor_error_types() {
    let parse_error = SensorError::parse_error("Failed to parse data");
    assert!(format!("{}", parse_error).contains("Failed to parse data"));

    let config_error = SensorError::config_error("Invalid configuration");
    assert!(format!("{}", config_error).contains("Invalid configuration"));

    let not_found = SensorError::CommandNotFound("nvidia-smi".to_string());
    assert!(not_found.is_source_unavailable());
}

/// Test SensorConfig builder pattern
#[test]
fn test_sensor_config() {
    let config = SensorConfig::default()
        .with_interval_ms(2000)
        .with_sensor(SensorKind::Ram, false)
        .with_gpu_command(Some("rocm-smi --csv".to_string()));

    assert_eq!(config.refresh_interval(), Duration::from_millis(2000));
    assert_eq!(config.enabled_kinds(), vec![SensorKind::Cpu, SensorKind::Gpu]);
    assert_eq!(config.gpu_command_override(), Some("rocm-smi --csv"));
}

/// Test RAM usage from a real file
#[tokio::test]
async fn test_ram_from_override_file() {
    let fixture = Fixture::new();
    let mut samplers = fixture.samplers();
    let config = fixture.config().with_sensor(SensorKind::Cpu, false).with_sensor(SensorKind::Gpu, false);

    let snapshots = samplers.sample_all(&config).await;
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].usage_percent(), Some(50.0));
    assert_eq!(snapshots[0].outcome(), SampleOutcome::Success);
}

/// Test CPU usage across two counter reads and temperature from a candidate file
#[tokio::test]
async fn test_cpu_usage_and_temperature() {
    let fixture = Fixture::new();
    fixture.write("hwmon0", "47500\n");
    let mut samplers = fixture.samplers();
    let config = fixture.config().with_sensor(SensorKind::Ram, false).with_sensor(SensorKind::Gpu, false);

    let first = samplers.sample_all(&config).await;
    assert_eq!(first[0].usage, Reading::Pending);
    assert_eq!(first[0].temperature_c(), Some(47.5));

    fixture.write("stat", "cpu  175 0 175 850 0 0 0 0\n");
    let second = samplers.sample_all(&config).await;
    // 200 ticks elapsed, 50 idle
    assert_eq!(second[0].usage_percent(), Some(75.0));
    assert_eq!(second[0].to_string(), "CPU 75.0% 47.5°C");
}

/// Test GPU command unavailable renders N/A, never stale values
#[tokio::test]
async fn test_gpu_command_not_found() {
    let fixture = Fixture::new();
    let mut samplers = fixture.samplers();
    let mut config = fixture.config().with_sensor(SensorKind::Cpu, false).with_sensor(SensorKind::Ram, false);
    config.sensors_command = "panel-sensors-missing-sensors-tool".to_string();

    let snapshot = &samplers.sample_all(&config).await[0];
    assert_eq!(snapshot.usage_label(), "N/A");
    assert_eq!(snapshot.temperature_label().as_deref(), Some("N/A"));
    assert_eq!(snapshot.fan_label().as_deref(), Some("N/A"));
    assert_eq!(snapshot.outcome(), SampleOutcome::TotalFailure);
}

#[cfg(unix)]
#[tokio::test]
async fn test_gpu_and_fan_from_commands() {
    let fixture = Fixture::new();
    let mut samplers = fixture.samplers();
    let mut config = fixture
        .config()
        .with_sensor(SensorKind::Cpu, false)
        .with_sensor(SensorKind::Ram, false)
        .with_gpu_command(Some("echo 23, 61".to_string()));
    config.sensors_command = "echo fan5: 1500 RPM".to_string();

    let snapshot = &samplers.sample_all(&config).await[0];
    assert_eq!(snapshot.to_string(), "GPU 23% 61°C 1500 RPM");
}

#[cfg(unix)]
#[tokio::test]
async fn test_cpu_temperature_command_fallback() {
    let fixture = Fixture::new();
    let reader = SystemReader::new(Duration::from_secs(2));
    let mut sampler = CpuSampler::with_sources(
        fixture.path("stat"),
        TemperatureProbe::with_candidates(vec![fixture.path("absent")]),
    );
    let mut config = fixture.config();
    config.sensors_command = "echo Package id 0: +52.0°C".to_string();

    let snapshot = sampler.sample(&reader, &config).await;
    assert_eq!(snapshot.temperature_c(), Some(52.0));
    assert!(sampler.probe().resolved_path().is_none());
}

/// Test the scheduler end to end against real files
#[tokio::test]
async fn test_scheduler_stream() {
    let fixture = Fixture::new();
    let config = fixture
        .config()
        .with_sensor(SensorKind::Gpu, false)
        .with_interval_ms(10_000);
    let (handle, mut stream) = RefreshScheduler::start(fixture.samplers(), config.clone());

    let cpu = stream.next().await.expect("CPU snapshot");
    let ram = stream.next().await.expect("RAM snapshot");
    assert_eq!(cpu.kind, SensorKind::Cpu);
    assert_eq!(ram.usage_percent(), Some(50.0));

    fixture.write("meminfo", "MemTotal: 1000 kB\nMemAvailable: 250 kB\n");
    handle
        .reconfigure(config.with_sensor(SensorKind::Cpu, false).with_interval_ms(5_000))
        .await
        .unwrap();
    let ram = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("re-armed timer fires")
        .expect("RAM snapshot");
    assert_eq!(ram.kind, SensorKind::Ram);
    assert_eq!(ram.usage_percent(), Some(75.0));

    handle.shutdown().await.unwrap();
    assert!(stream.next().await.is_none());
}

/// Test config loading from a TOML file
#[test]
fn test_config_file() {
    let fixture = Fixture::new();
    fixture.write(
        "config.toml",
        "show_gpu_fan = false\nrefresh_interval_ms = 100\ncpu_temp_path = \"/sys/class/hwmon/hwmon4/temp1_input\"\n",
    );

    let config = SensorConfig::load(fixture.path("config.toml")).unwrap();
    assert!(!config.show_gpu_fan);
    assert_eq!(config.refresh_interval_ms, 500);
    assert_eq!(
        config.cpu_temp_override(),
        Some(Path::new("/sys/class/hwmon/hwmon4/temp1_input"))
    );
}
