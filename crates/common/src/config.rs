//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default recording settings.
    pub recording: RecordingDefaults,

    /// Shutdown timeouts for supervised external processes.
    pub shutdown: ShutdownTimeouts,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default recording parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingDefaults {
    /// Default frame rate for screen recording.
    pub screen_frame_rate: u32,

    /// Default container extension for decrypting stream recordings.
    pub stream_extension: String,

    /// Default container extension for in-process and screen recordings.
    pub video_extension: String,
}

/// How long to wait for graceful exit before force-killing, per process
/// kind. Encoders get longer: they flush buffers and write container
/// trailers on the way out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownTimeouts {
    /// Graceful-exit wait for the external playback process (seconds).
    pub playback_secs: u64,

    /// Graceful-exit wait for the decrypting stream encoder (seconds).
    pub stream_record_secs: u64,

    /// Graceful-exit wait for the screen-capture encoder (seconds).
    pub screen_record_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "playcast=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            recording: RecordingDefaults::default(),
            shutdown: ShutdownTimeouts::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RecordingDefaults {
    fn default() -> Self {
        Self {
            screen_frame_rate: 25,
            stream_extension: "ts".to_string(),
            video_extension: "mp4".to_string(),
        }
    }
}

impl Default for ShutdownTimeouts {
    fn default() -> Self {
        Self {
            playback_secs: 3,
            stream_record_secs: 5,
            screen_record_secs: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("playcast").join("config.json")
}
