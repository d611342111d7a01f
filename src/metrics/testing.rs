//! In-memory source reader for unit tests.

use crate::error::{Result, SensorError};
use crate::metrics::source::SourceReader;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

#[derive(Default)]
struct FakeState {
    /// Successive contents; the last entry repeats once the queue drains.
    files: HashMap<PathBuf, VecDeque<String>>,
    commands: HashMap<String, String>,
    commands_run: Vec<String>,
}

/// Serves canned file contents and command output.
///
/// Unknown files are missing and unknown programs are not installed. With a
/// gate installed every read waits for a permit, which holds a sampling pass
/// open until the test releases it.
#[derive(Clone, Default)]
pub(crate) struct FakeReader {
    state: Arc<Mutex<FakeState>>,
    gate: Option<Arc<Semaphore>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
    panic_once: Arc<AtomicBool>,
}

impl FakeReader {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_file(self, path: &str, contents: &str) -> Self {
        self.with_file_sequence(path, &[contents])
    }

    pub(crate) fn with_file_sequence(self, path: &str, contents: &[&str]) -> Self {
        self.lock().files.insert(
            PathBuf::from(path),
            contents.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    pub(crate) fn with_command(self, command_line: &str, output: &str) -> Self {
        self.lock()
            .commands
            .insert(command_line.to_string(), output.to_string());
        self
    }

    pub(crate) fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Make the next file read panic, as a broken reader would.
    pub(crate) fn with_panic_once(self) -> Self {
        self.panic_once.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn commands_run(&self) -> Vec<String> {
        self.lock().commands_run.clone()
    }

    /// Number of reads and commands started so far.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of reads or commands observed in flight at once.
    pub(crate) fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SourceReader for FakeReader {
    async fn read_file(&self, path: &Path) -> Result<String> {
        if self.panic_once.swap(false, Ordering::SeqCst) {
            panic!("reader failed on {}", path.display());
        }
        self.enter().await;
        let result = {
            let mut state = self.lock();
            match state.files.get_mut(path) {
                Some(queue) if queue.len() > 1 => Ok(queue.pop_front().unwrap_or_default()),
                Some(queue) => Ok(queue.front().cloned().unwrap_or_default()),
                None => Err(SensorError::Io(std::io::Error::from(
                    std::io::ErrorKind::NotFound,
                ))),
            }
        };
        self.leave();
        result
    }

    async fn run_command(&self, command_line: &str) -> Result<String> {
        self.enter().await;
        let result = {
            let mut state = self.lock();
            state.commands_run.push(command_line.to_string());
            match state.commands.get(command_line) {
                Some(output) => Ok(output.clone()),
                None => Err(SensorError::CommandNotFound(command_line.to_string())),
            }
        };
        self.leave();
        result
    }

    async fn exists(&self, path: &Path) -> bool {
        self.lock().files.contains_key(path)
    }
}
