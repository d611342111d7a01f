//! Raw data sources: pseudo-files and external commands.
//!
//! Readers return text only. Interpretation lives in [`crate::metrics::parser`].

use crate::error::{Result, SensorError};
use std::future::Future;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time;

/// Default bound on a single external command.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 2000;

/// Access to raw sensor sources.
///
/// All operations are async so a slow source suspends only the sampling pass
/// that asked for it.
pub trait SourceReader: Send + Sync + 'static {
    /// Read a whole text file.
    fn read_file(&self, path: &Path) -> impl Future<Output = Result<String>> + Send;

    /// Run a whitespace-separated command line and return its stdout.
    fn run_command(&self, command_line: &str) -> impl Future<Output = Result<String>> + Send;

    /// Whether a path exists on the filesystem.
    fn exists(&self, path: &Path) -> impl Future<Output = bool> + Send;
}

/// Split a command line into program and arguments on whitespace.
///
/// No quoting or escaping is supported.
pub fn split_command_line(command_line: &str) -> Option<(&str, Vec<&str>)> {
    let mut parts = command_line.split_whitespace();
    let program = parts.next()?;
    Some((program, parts.collect()))
}

/// Reads from the live system using tokio file and process I/O.
#[derive(Debug, Clone)]
pub struct SystemReader {
    command_timeout: Duration,
}

impl Default for SystemReader {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS))
    }
}

impl SystemReader {
    pub fn new(command_timeout: Duration) -> Self {
        Self { command_timeout }
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }
}

impl SourceReader for SystemReader {
    async fn read_file(&self, path: &Path) -> Result<String> {
        Ok(tokio::fs::read_to_string(path).await?)
    }

    async fn run_command(&self, command_line: &str) -> Result<String> {
        let (program, args) = split_command_line(command_line)
            .ok_or_else(|| SensorError::config_error("empty command line"))?;

        let mut command = Command::new(program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match time::timeout(self.command_timeout, command.output()).await {
            Ok(result) => result.map_err(|err| match err.kind() {
                ErrorKind::NotFound => SensorError::CommandNotFound(program.to_string()),
                _ => SensorError::Io(err),
            })?,
            Err(_) => {
                return Err(SensorError::Timeout {
                    command: command_line.to_string(),
                    timeout_ms: self.command_timeout.as_millis() as u64,
                })
            }
        };

        if !output.status.success() {
            return Err(SensorError::CommandFailed {
                command: command_line.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.trim().is_empty() {
            return Err(SensorError::EmptyOutput(command_line.to_string()));
        }

        Ok(stdout)
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}
