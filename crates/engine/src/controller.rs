//! The event surface the UI layer drives.
//!
//! One controller instance per application, driven from a single control
//! thread. Every entry point performs a complete state transition and
//! returns either a human-readable status line or a typed error for the
//! caller to surface. The periodic tick only reads position; it never
//! transitions state.

use std::path::PathBuf;
use std::time::Duration;

use playcast_common::config::AppConfig;
use playcast_common::error::{PlaycastError, PlaycastResult};
use playcast_platform::probe::{ExecutableProbe, SystemProbe};
use playcast_platform::OsKind;

use crate::arbiter::{ModeArbiter, PlaybackState};
use crate::invocation::CaptureRegion;
use crate::player::{GstPlayer, PlayerPipeline};
use crate::recording::{ScreenRecorder, StreamRecorder};
use crate::supervisor::{Launcher, ProcessKind, Supervisor, SystemLauncher};
use crate::target::{PipelineMode, StreamTarget};

/// Cadence of the position/duration refresh for the in-process pipeline.
pub const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Snapshot of in-process playback progress, produced by [`Controller::tick`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackPosition {
    /// Position as a fraction of the duration, 0.0–1.0.
    pub fraction: f64,
    pub elapsed: Duration,
    pub duration: Option<Duration>,
}

impl PlaybackPosition {
    /// `MM:SS / MM:SS` display line (hours appear past the first hour).
    pub fn clock(&self) -> String {
        format!(
            "{} / {}",
            format_clock(self.elapsed),
            format_clock(self.duration.unwrap_or_default())
        )
    }
}

/// Render a duration as `MM:SS`, or `HH:MM:SS` from one hour up.
pub fn format_clock(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

pub struct Controller {
    config: AppConfig,
    os: OsKind,
    probe: Box<dyn ExecutableProbe>,
    supervisor: Supervisor,
    arbiter: ModeArbiter,
    stream_recorder: StreamRecorder,
    screen_recorder: ScreenRecorder,
    seek_active: bool,
}

impl Controller {
    /// Controller wired to the real GStreamer player and OS processes.
    pub fn new(config: AppConfig) -> Self {
        Self::with_parts(
            config,
            Box::new(GstPlayer::new()),
            Box::new(SystemLauncher),
            Box::new(SystemProbe),
            OsKind::current(),
        )
    }

    /// Fully injectable constructor; what the tests use.
    pub fn with_parts(
        config: AppConfig,
        player: Box<dyn PlayerPipeline>,
        launcher: Box<dyn Launcher>,
        probe: Box<dyn ExecutableProbe>,
        os: OsKind,
    ) -> Self {
        let supervisor = Supervisor::with_launcher(launcher, config.shutdown.clone());
        Self {
            config,
            os,
            probe,
            supervisor,
            arbiter: ModeArbiter::new(player),
            stream_recorder: StreamRecorder::new(),
            screen_recorder: ScreenRecorder::new(),
            seek_active: false,
        }
    }

    /// Play the given source through whichever pipeline its key selects.
    pub fn on_play_requested(
        &mut self,
        url_text: &str,
        kid_key_text: &str,
    ) -> PlaycastResult<String> {
        if url_text.trim().is_empty() {
            return Err(PlaycastError::invalid_input("Enter a stream URL"));
        }
        let target = StreamTarget::from_input(url_text, kid_key_text);
        // Input in the key field that parses to no key is worth a note,
        // not a refusal: playback proceeds in-process.
        let malformed_key_note =
            !kid_key_text.trim().is_empty() && target.decryption_key.is_none();

        let sink = self.stream_recorder.in_process_sink();
        let mode = target.mode();
        let mut status =
            self.arbiter
                .request_play(target, sink, self.probe.as_ref(), &mut self.supervisor)?;

        if malformed_key_note && mode == PipelineMode::InProcess {
            status.push_str(" (KID:KEY input was not in KID:KEY form; playing without a key)");
        }
        Ok(status)
    }

    /// Toggle pause for the in-process pipeline. The external player
    /// reports explicitly that pause is unavailable.
    pub fn on_pause_requested(&mut self) -> PlaycastResult<String> {
        self.arbiter.request_pause()
    }

    /// Stop playback and cascade into both recorders: the main stop
    /// action must leave no child processes behind.
    pub fn on_stop_requested(&mut self) -> PlaycastResult<String> {
        let playback = self.arbiter.request_stop(&mut self.supervisor);
        let stream = self.stream_recorder.cancel(&mut self.supervisor);
        let screen = self.screen_recorder.cancel(&mut self.supervisor);
        self.seek_active = false;

        playback?;
        stream?;
        screen?;
        Ok("Stopped".to_string())
    }

    /// Toggle stream recording, keyed by key presence at this moment.
    pub fn on_record_toggle_requested(
        &mut self,
        url_text: &str,
        kid_key_text: &str,
        output: Option<PathBuf>,
    ) -> PlaycastResult<String> {
        let target = StreamTarget::from_input(url_text, kid_key_text);
        self.stream_recorder.toggle(
            &target,
            output,
            &self.config.recording,
            self.probe.as_ref(),
            &mut self.arbiter,
            &mut self.supervisor,
        )
    }

    /// Toggle screen recording of the given region.
    pub fn on_screen_record_toggle_requested(
        &mut self,
        region: CaptureRegion,
        output: Option<PathBuf>,
    ) -> PlaycastResult<String> {
        self.screen_recorder.toggle(
            region,
            output,
            self.os,
            &self.config.recording,
            self.probe.as_ref(),
            &mut self.supervisor,
        )
    }

    /// A seek gesture started; suspend the tick until it commits.
    pub fn seek_begin(&mut self) {
        self.seek_active = true;
    }

    /// Commit a seek to a fraction of the duration and resume the tick.
    pub fn on_seek_requested(&mut self, fraction: f64) -> PlaycastResult<()> {
        let result = self.arbiter.seek(fraction.clamp(0.0, 1.0));
        self.seek_active = false;
        result
    }

    /// Position refresh for the in-process pipeline. Suspended while a
    /// seek is in progress; never transitions state.
    pub fn tick(&self) -> Option<PlaybackPosition> {
        if self.seek_active {
            return None;
        }
        if self.arbiter.state() != PlaybackState::PlayingInProcess {
            return None;
        }
        Some(PlaybackPosition {
            fraction: self.arbiter.position().unwrap_or(0.0),
            elapsed: self.arbiter.elapsed().unwrap_or_default(),
            duration: self.arbiter.duration(),
        })
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.arbiter.state()
    }

    pub fn record_label(&self) -> &'static str {
        if self.stream_recorder.is_recording() {
            "Stop Rec"
        } else {
            "Record"
        }
    }

    pub fn screen_record_label(&self) -> &'static str {
        if self.screen_recorder.is_recording() {
            "Stop ScreenRec"
        } else {
            "Screen Rec"
        }
    }

    pub fn is_stream_recording(&self) -> bool {
        self.stream_recorder.is_recording()
    }

    pub fn is_screen_recording(&self) -> bool {
        self.screen_recorder.is_recording()
    }

    /// Non-blocking liveness of a supervised slot.
    pub fn is_process_running(&mut self, kind: ProcessKind) -> bool {
        self.supervisor.is_running(kind)
    }

    /// Pid of a supervised slot's live process.
    pub fn process_pid(&self, kind: ProcessKind) -> Option<u32> {
        self.supervisor.pid(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_formats_minutes_and_hours() {
        assert_eq!(format_clock(Duration::from_secs(0)), "00:00");
        assert_eq!(format_clock(Duration::from_secs(75)), "01:15");
        assert_eq!(format_clock(Duration::from_secs(3600)), "01:00:00");
        assert_eq!(format_clock(Duration::from_secs(3725)), "01:02:05");
    }

    #[test]
    fn position_clock_line() {
        let position = PlaybackPosition {
            fraction: 0.5,
            elapsed: Duration::from_secs(30),
            duration: Some(Duration::from_secs(60)),
        };
        assert_eq!(position.clock(), "00:30 / 01:00");

        let unknown = PlaybackPosition {
            fraction: 0.0,
            elapsed: Duration::from_secs(5),
            duration: None,
        };
        assert_eq!(unknown.clock(), "00:05 / 00:00");
    }
}
