//! Error types shared across Playcast crates.

/// Top-level error type for Playcast operations.
///
/// None of these are process-fatal: every failure path returns control to
/// the caller with the affected subsystem back in its idle state.
#[derive(Debug, thiserror::Error)]
pub enum PlaycastError {
    #[error("Executable not found on PATH: {name}")]
    MissingExecutable { name: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported platform: {message}")]
    UnsupportedPlatform { message: String },

    #[error("Failed to stop process: {message}")]
    StopFailure { message: String },

    #[error("Pipeline error: {message}")]
    Pipeline { message: String },

    #[error("State error: {message}")]
    State { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using PlaycastError.
pub type PlaycastResult<T> = Result<T, PlaycastError>;

impl PlaycastError {
    pub fn missing_executable(name: impl Into<String>) -> Self {
        Self::MissingExecutable { name: name.into() }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn unsupported_platform(msg: impl Into<String>) -> Self {
        Self::UnsupportedPlatform {
            message: msg.into(),
        }
    }

    pub fn stop_failure(msg: impl Into<String>) -> Self {
        Self::StopFailure {
            message: msg.into(),
        }
    }

    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::Pipeline {
            message: msg.into(),
        }
    }

    pub fn state(msg: impl Into<String>) -> Self {
        Self::State {
            message: msg.into(),
        }
    }
}
