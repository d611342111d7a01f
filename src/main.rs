//! Panel Sensors binary
//!
//! Feeds sensor labels to a status bar: one line per refresh on stdout.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use futures_util::StreamExt;
use panel_sensors::config::default_config_path;
use panel_sensors::metrics::temperature::THERMAL_CANDIDATES;
use panel_sensors::{
    MetricSnapshot, RefreshScheduler, SamplerSet, SensorConfig, SensorKind, SourceReader,
    SystemReader,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "panel_sensors")]
#[command(about = "Status-bar sensor feed: CPU, RAM and GPU usage, temperatures and fan speed")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Samples local sensors on a timer and prints panel labels. \
Send SIGHUP to reload the config file.")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (defaults to ~/.config/panel-sensors/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Refresh interval in milliseconds, overrides the config file
    #[arg(short, long)]
    interval: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print labels on every refresh (default)
    Watch(WatchArgs),

    /// Sample every sensor once and exit
    Snapshot(SnapshotArgs),

    /// Show which sources were detected
    Probe,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Pretty,
    Json,
}

#[derive(Args)]
struct WatchArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,
}

#[derive(Args)]
struct SnapshotArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    /// Delay between the two CPU counter reads, in milliseconds
    #[arg(long, default_value_t = 250)]
    settle_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    match &cli.command {
        Some(Commands::Watch(args)) => watch_command(&cli, args).await?,
        Some(Commands::Snapshot(args)) => snapshot_command(&cli, args).await?,
        Some(Commands::Probe) => probe_command(&cli).await?,
        None => {
            let args = WatchArgs {
                format: OutputFormat::Pretty,
            };
            watch_command(&cli, &args).await?;
        }
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    // stdout carries the label feed
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<SensorConfig> {
    let mut config = SensorConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(interval) = cli.interval {
        config = config.with_interval_ms(interval);
    }
    Ok(config)
}

async fn watch_command(cli: &Cli, args: &WatchArgs) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    info!(
        "Starting sensor feed with {}ms interval",
        config.refresh_interval_ms
    );

    let reader = SystemReader::new(config.command_timeout());
    let mut line = PanelLine::new(config.enabled_kinds().len());
    let (handle, mut snapshots) = RefreshScheduler::start(SamplerSet::new(reader), config);

    let mut reload = ReloadSignal::new()?;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            snapshot = snapshots.next() => match snapshot {
                Some(snapshot) => emit(&mut line, snapshot, args.format)?,
                None => break,
            },
            _ = reload.recv() => match load_config(cli) {
                Ok(config) => {
                    info!("Reloaded configuration");
                    line = PanelLine::new(config.enabled_kinds().len());
                    handle.reconfigure(config).await?;
                }
                Err(err) => warn!("Keeping previous configuration: {:#}", err),
            },
            _ = &mut shutdown => {
                info!("Interrupted, stopping");
                break;
            }
        }
    }

    handle.shutdown().await?;
    Ok(())
}

fn emit(line: &mut PanelLine, snapshot: MetricSnapshot, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&snapshot)?),
        OutputFormat::Pretty => {
            if let Some(text) = line.push(snapshot) {
                println!("{}", text);
            }
        }
    }
    Ok(())
}

/// Collects one tick's snapshots into a single panel row.
struct PanelLine {
    expected: usize,
    pending: Vec<MetricSnapshot>,
}

impl PanelLine {
    fn new(expected: usize) -> Self {
        Self {
            expected,
            pending: Vec::with_capacity(expected),
        }
    }

    /// Returns the finished row once every enabled sensor has reported.
    fn push(&mut self, snapshot: MetricSnapshot) -> Option<String> {
        if let Some(last) = self.pending.last() {
            // a new tick started before the row filled up
            if snapshot.kind.order() <= last.kind.order() {
                self.pending.clear();
            }
        }
        self.pending.push(snapshot);

        if self.pending.len() < self.expected {
            return None;
        }
        let row = self
            .pending
            .drain(..)
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" | ");
        Some(row)
    }
}

async fn snapshot_command(cli: &Cli, args: &SnapshotArgs) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let mut samplers = SamplerSet::new(SystemReader::new(config.command_timeout()));

    // the first pass only primes the CPU counters
    samplers.sample_all(&config).await;
    tokio::time::sleep(Duration::from_millis(args.settle_ms)).await;
    let snapshots = samplers.sample_all(&config).await;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshots)?),
        OutputFormat::Pretty => print_pretty_snapshots(&snapshots),
    }

    Ok(())
}

fn print_pretty_snapshots(snapshots: &[MetricSnapshot]) {
    println!(
        "Sensor Snapshot ({})",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    println!("==========================================");

    for snapshot in snapshots {
        println!();
        println!("{}:", snapshot.kind);
        println!("  Usage: {}", snapshot.usage_label());
        if let Some(temp) = snapshot.temperature_label() {
            println!("  Temperature: {}", temp);
        }
        if let Some(fan) = snapshot.fan_label() {
            println!("  Fan: {}", fan);
        }
        println!("  Outcome: {:?}", snapshot.outcome());
    }
}

async fn probe_command(cli: &Cli) -> anyhow::Result<()> {
    print_banner();

    let config = load_config(cli)?;
    let reader = SystemReader::new(config.command_timeout());

    println!("Configuration:");
    match cli.config.clone().or_else(default_config_path) {
        Some(path) if path.exists() => println!("  File: {}", path.display()),
        Some(path) => println!("  File: {} (not found, using defaults)", path.display()),
        None => println!("  File: none (using defaults)"),
    }
    println!("  Interval: {}ms", config.refresh_interval_ms);
    let enabled: Vec<&str> = config.enabled_kinds().iter().map(|k| k.name()).collect();
    println!("  Sensors: {}", enabled.join(", "));
    println!();

    println!("CPU temperature candidates:");
    for candidate in THERMAL_CANDIDATES {
        println!("  {} {}", mark(reader.exists(Path::new(candidate)).await), candidate);
    }

    let mut samplers = SamplerSet::new(reader.clone());
    match samplers.resolve_temperature_path(&config).await {
        Some(path) => println!("  Resolved: {}", path.display()),
        None => println!("  Resolved: none, using `{}`", config.sensors_command),
    }
    println!();

    println!("Sources:");
    println!("  {} /proc/stat", mark(reader.exists(Path::new("/proc/stat")).await));
    let meminfo = config
        .ram_override()
        .unwrap_or_else(|| Path::new(panel_sensors::metrics::memory::PROC_MEMINFO));
    println!("  {} {}", mark(reader.exists(meminfo).await), meminfo.display());

    let gpu_command = config
        .gpu_command_override()
        .unwrap_or(panel_sensors::metrics::gpu::DEFAULT_GPU_COMMAND);
    report_command(&reader, gpu_command).await;
    report_command(&reader, &config.sensors_command).await;
    println!();

    println!("Capabilities:");
    for kind in SensorKind::ALL {
        println!(
            "  {}: temperature {}, fan {}",
            kind,
            mark(kind.has_temperature()),
            mark(kind.has_fan())
        );
    }

    Ok(())
}

async fn report_command(reader: &SystemReader, command: &str) {
    match reader.run_command(command).await {
        Ok(_) => println!("  {} {}", mark(true), command),
        Err(err) => println!("  {} {} ({})", mark(false), command, err),
    }
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "✓"
    } else {
        "✗"
    }
}

fn print_banner() {
    println!("Panel Sensors - status-bar sensor feed");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
}

/// Configuration reload requests from the host (SIGHUP).
#[cfg(unix)]
struct ReloadSignal(tokio::signal::unix::Signal);

#[cfg(unix)]
impl ReloadSignal {
    fn new() -> anyhow::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self(signal(SignalKind::hangup())?))
    }

    async fn recv(&mut self) {
        if self.0.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
struct ReloadSignal;

#[cfg(not(unix))]
impl ReloadSignal {
    fn new() -> anyhow::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) {
        std::future::pending::<()>().await;
    }
}
