//! Error handling for the panel sensors crate.

/// A specialized `Result` type for sensor sampling operations.
pub type Result<T> = std::result::Result<T, SensorError>;

/// The main error type for sensor sampling.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// External program is not installed or not on PATH
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    /// External program exited unsuccessfully
    #[error("Command '{command}' failed with exit code {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// External program succeeded but printed nothing
    #[error("Command '{0}' produced no output")]
    EmptyOutput(String),

    /// External program did not finish in time
    #[error("Command '{command}' timed out after {timeout_ms}ms")]
    Timeout { command: String, timeout_ms: u64 },

    /// Raw source text did not match the expected format
    #[error("Failed to parse sensor data: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The refresh scheduler is no longer running
    #[error("Refresh scheduler has stopped")]
    SchedulerStopped,
}

/// How a failure is treated by the sampling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// Missing file, absent tool, failed or silent command. Expected in steady state.
    SourceUnavailable,
    /// Source was read but its content did not match.
    ParseFailure,
    /// Invalid override path or command. Surfaces like `SourceUnavailable`.
    Configuration,
    /// Anything outside the sampling taxonomy.
    Internal,
}

impl SensorError {
    /// Create a new parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Classify this error for logging and display.
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::Io(_)
            | Self::CommandNotFound(_)
            | Self::CommandFailed { .. }
            | Self::EmptyOutput(_)
            | Self::Timeout { .. } => FailureCategory::SourceUnavailable,
            Self::Parse(_) => FailureCategory::ParseFailure,
            Self::Config(_) => FailureCategory::Configuration,
            Self::SchedulerStopped => FailureCategory::Internal,
        }
    }

    /// True when the failure should simply render as "not available".
    pub fn is_source_unavailable(&self) -> bool {
        matches!(
            self.category(),
            FailureCategory::SourceUnavailable | FailureCategory::Configuration
        )
    }
}
