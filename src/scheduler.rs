//! Repeating refresh timer that drives the sampler set.
//!
//! A single control task owns the scheduler. On each tick it hands the
//! [`SamplerSet`] to a worker task, which samples every enabled sensor and
//! hands the set back together with its snapshots. While the set is out,
//! further ticks are skipped, so two passes never run at once. Control
//! messages are still served while a pass is running, and publishing never
//! waits on a slow consumer.

use crate::config::SensorConfig;
use crate::error::{Result, SensorError};
use crate::metrics::data::MetricSnapshot;
use crate::metrics::sampler::SamplerSet;
use crate::metrics::source::SourceReader;
use futures_util::stream::BoxStream;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Interval, MissedTickBehavior};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

const CONTROL_BUFFER: usize = 16;
const SNAPSHOT_BUFFER: usize = 32;

/// Messages understood by a running scheduler.
#[derive(Debug)]
pub enum Control {
    /// Replace the live configuration. Interval changes re-arm the timer.
    Reconfigure(Box<SensorConfig>),
    /// Run a pass now, subject to the overlap guard.
    Trigger,
    /// Report counters.
    Stats(oneshot::Sender<SchedulerStats>),
    /// Stop the timer and exit.
    Shutdown,
}

/// Scheduler counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub passes_started: u64,
    pub passes_completed: u64,
    /// Passes whose worker panicked; the sampler set was rebuilt
    pub passes_lost: u64,
    /// Ticks dropped because the previous pass had not finished
    pub ticks_skipped: u64,
    pub snapshots_published: u64,
    /// Snapshots discarded because the display channel was full
    pub snapshots_dropped: u64,
}

type PassResult<R> = (SamplerSet<R>, Vec<MetricSnapshot>);

/// Periodic sampler driver.
pub struct RefreshScheduler<R> {
    /// `None` while a pass is running.
    samplers: Option<SamplerSet<R>>,
    /// The worker holding the sampler set, if any.
    pass: Option<JoinHandle<PassResult<R>>>,
    /// Used to rebuild the sampler set after a lost pass.
    reader: R,
    config: Arc<SensorConfig>,
    sink: mpsc::Sender<MetricSnapshot>,
    stats: SchedulerStats,
    invalidate_on_return: bool,
}

impl<R: SourceReader + Clone> RefreshScheduler<R> {
    /// Create a scheduler that publishes snapshots into `sink`.
    pub fn new(
        samplers: SamplerSet<R>,
        config: SensorConfig,
        sink: mpsc::Sender<MetricSnapshot>,
    ) -> Self {
        Self {
            reader: samplers.reader().clone(),
            samplers: Some(samplers),
            pass: None,
            config: Arc::new(config.validated()),
            sink,
            stats: SchedulerStats::default(),
            invalidate_on_return: false,
        }
    }

    /// Start a scheduler and return its handle and the snapshot stream.
    pub fn start(
        samplers: SamplerSet<R>,
        config: SensorConfig,
    ) -> (SchedulerHandle, BoxStream<'static, MetricSnapshot>) {
        let (sink, snapshots) = mpsc::channel(SNAPSHOT_BUFFER);
        let handle = Self::new(samplers, config, sink).spawn();
        (handle, Box::pin(ReceiverStream::new(snapshots)))
    }

    /// Run the scheduler on the current tokio runtime.
    pub fn spawn(self) -> SchedulerHandle {
        let (control, control_rx) = mpsc::channel(CONTROL_BUFFER);
        let task = tokio::spawn(self.run(control_rx));
        SchedulerHandle { control, task }
    }

    async fn run(mut self, mut control: mpsc::Receiver<Control>) {
        let mut ticker = new_ticker(self.config.refresh_interval());
        info!(
            interval_ms = self.config.refresh_interval_ms,
            "refresh scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => self.start_pass(),
                joined = join_pass(&mut self.pass) => {
                    self.pass = None;
                    if !self.finish_pass(joined) {
                        info!("display channel closed");
                        break;
                    }
                }
                message = control.recv() => match message {
                    Some(Control::Trigger) => self.start_pass(),
                    Some(Control::Reconfigure(config)) => {
                        if self.apply_config(*config) {
                            ticker = new_ticker(self.config.refresh_interval());
                        }
                    }
                    Some(Control::Stats(reply)) => {
                        let _ = reply.send(self.stats);
                    }
                    Some(Control::Shutdown) | None => break,
                },
            }
        }

        if let Some(pass) = self.pass.take() {
            pass.abort();
        }
        info!(stats = ?self.stats, "refresh scheduler stopped");
    }

    fn start_pass(&mut self) {
        let Some(mut samplers) = self.samplers.take() else {
            self.stats.ticks_skipped += 1;
            debug!("previous sampling pass still running, skipping tick");
            return;
        };

        self.stats.passes_started += 1;
        let config = Arc::clone(&self.config);
        self.pass = Some(tokio::spawn(async move {
            let snapshots = samplers.sample_all(&config).await;
            (samplers, snapshots)
        }));
    }

    /// Take the sampler set back and publish. Returns false once the sink is gone.
    ///
    /// Publishing never waits: snapshots that do not fit in a full display
    /// channel are dropped and counted.
    fn finish_pass(&mut self, joined: std::result::Result<PassResult<R>, JoinError>) -> bool {
        let (mut samplers, snapshots) = match joined {
            Ok(result) => result,
            Err(err) => {
                warn!("sampling pass lost, rebuilding samplers: {}", err);
                self.stats.passes_lost += 1;
                self.invalidate_on_return = false;
                self.samplers = Some(SamplerSet::new(self.reader.clone()));
                return true;
            }
        };

        if std::mem::take(&mut self.invalidate_on_return) {
            samplers.invalidate_temperature_path();
        }
        self.samplers = Some(samplers);
        self.stats.passes_completed += 1;

        for snapshot in snapshots {
            match self.sink.try_send(snapshot) {
                Ok(()) => self.stats.snapshots_published += 1,
                Err(TrySendError::Full(snapshot)) => {
                    self.stats.snapshots_dropped += 1;
                    debug!(sensor = %snapshot.kind, "display channel full, dropping snapshot");
                }
                Err(TrySendError::Closed(_)) => return false,
            }
        }
        true
    }

    /// Install a new configuration. Returns true when the timer must be re-armed.
    fn apply_config(&mut self, next: SensorConfig) -> bool {
        let next = next.validated();
        let delta = self.config.diff(&next);

        if delta.cpu_temp_path_changed {
            info!(path = ?next.cpu_temp_override(), "CPU temperature source changed");
            match self.samplers.as_mut() {
                Some(samplers) => samplers.invalidate_temperature_path(),
                None => self.invalidate_on_return = true,
            }
        }
        if delta.interval_changed {
            info!(
                interval_ms = next.refresh_interval_ms,
                "refresh interval changed, restarting timer"
            );
        }

        self.config = Arc::new(next);
        delta.interval_changed
    }
}

/// Wait for the running pass, or forever when there is none.
async fn join_pass<T>(pass: &mut Option<JoinHandle<T>>) -> std::result::Result<T, JoinError> {
    match pass {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

/// First tick fires immediately; late ticks are dropped rather than bunched.
fn new_ticker(period: Duration) -> Interval {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Handle to a running [`RefreshScheduler`].
#[derive(Debug)]
pub struct SchedulerHandle {
    control: mpsc::Sender<Control>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Push a changed configuration.
    pub async fn reconfigure(&self, config: SensorConfig) -> Result<()> {
        self.send(Control::Reconfigure(Box::new(config))).await
    }

    /// Request an immediate pass.
    pub async fn trigger(&self) -> Result<()> {
        self.send(Control::Trigger).await
    }

    pub async fn stats(&self) -> Result<SchedulerStats> {
        let (reply, response) = oneshot::channel();
        self.send(Control::Stats(reply)).await?;
        response.await.map_err(|_| SensorError::SchedulerStopped)
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the scheduler and wait for its control task to exit.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.control.send(Control::Shutdown).await;
        self.task.await.map_err(|_| SensorError::SchedulerStopped)
    }

    async fn send(&self, message: Control) -> Result<()> {
        self.control
            .send(message)
            .await
            .map_err(|_| SensorError::SchedulerStopped)
    }
}
