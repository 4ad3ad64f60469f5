//! Playcast Engine
//!
//! Orchestrates playback and recording of streamed media across two
//! mutually exclusive pipelines: an in-process GStreamer pipeline for
//! unencrypted sources, and externally launched ffplay/ffmpeg processes
//! when a decryption key is supplied. A third, independent subsystem
//! records a screen region through an external capture encoder.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │                  Controller                     │
//! │  ┌───────────┐ ┌───────────────┐ ┌───────────┐ │
//! │  │   Mode    │ │    Stream     │ │  Screen   │ │
//! │  │  Arbiter  │ │   Recorder    │ │ Recorder  │ │
//! │  └─────┬─────┘ └──────┬────────┘ └─────┬─────┘ │
//! │        │              │                │        │
//! │        ▼              ▼                ▼        │
//! │  ┌───────────┐  ┌────────────────────────────┐ │
//! │  │ In-process│  │     Process Supervisor      │ │
//! │  │  player   │  │  (one live child per kind)  │ │
//! │  └───────────┘  └────────────────────────────┘ │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! The engine never decodes media, decrypts segments, or touches pixel
//! data itself; it builds commands, launches processes, and tears them
//! down deterministically.

pub mod arbiter;
pub mod controller;
pub mod invocation;
pub mod player;
pub mod recording;
pub mod supervisor;
pub mod target;

pub use arbiter::{ModeArbiter, PlaybackState};
pub use controller::{Controller, PlaybackPosition, TICK_INTERVAL};
pub use invocation::{CaptureRegion, Invocation, ENCODER_BIN, PLAYER_BIN};
pub use player::{GstPlayer, PlayerPipeline};
pub use recording::{ScreenRecorder, StreamRecorder};
pub use supervisor::{
    Launcher, ManagedChild, ProcessKind, StopOutcome, Supervisor, SystemLauncher,
};
pub use target::{PipelineMode, StreamTarget};
