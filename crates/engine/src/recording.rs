//! Recording session state machines.
//!
//! Two independent toggles: stream recording (decrypting encoder or
//! in-process output-duplication, keyed by whether a decryption key is
//! present when toggled) and screen recording (always an external
//! capture encoder). Each remembers at start time which way it was
//! started, so the stop path never depends on what the operator has
//! typed since.

use std::path::{Path, PathBuf};

use playcast_common::config::RecordingDefaults;
use playcast_common::error::{PlaycastError, PlaycastResult};
use playcast_platform::probe::ExecutableProbe;
use playcast_platform::OsKind;

use crate::arbiter::ModeArbiter;
use crate::invocation::{
    decrypting_record_command, screen_capture_command, CaptureRegion, ENCODER_BIN,
};
use crate::supervisor::{ProcessKind, Supervisor};
use crate::target::{resolve_output_path, PipelineMode, StreamTarget};

enum StreamSession {
    Idle,
    /// Decrypting encoder process is writing the stream.
    External { output: PathBuf },
    /// In-process pipeline is (or will be) duplicating output to a file.
    InProcess { output: PathBuf },
}

/// Stream-recording toggle.
pub struct StreamRecorder {
    session: StreamSession,
}

impl StreamRecorder {
    pub fn new() -> Self {
        Self {
            session: StreamSession::Idle,
        }
    }

    pub fn is_recording(&self) -> bool {
        !matches!(self.session, StreamSession::Idle)
    }

    pub fn output(&self) -> Option<&Path> {
        match &self.session {
            StreamSession::Idle => None,
            StreamSession::External { output } | StreamSession::InProcess { output } => {
                Some(output)
            }
        }
    }

    /// Sink to attach when in-process playback starts while this session
    /// is armed. External recording runs independently and attaches
    /// nothing.
    pub fn in_process_sink(&self) -> Option<&Path> {
        match &self.session {
            StreamSession::InProcess { output } => Some(output),
            _ => None,
        }
    }

    /// Toggle recording on or off.
    pub fn toggle(
        &mut self,
        target: &StreamTarget,
        requested_output: Option<PathBuf>,
        defaults: &RecordingDefaults,
        probe: &dyn ExecutableProbe,
        arbiter: &mut ModeArbiter,
        supervisor: &mut Supervisor,
    ) -> PlaycastResult<String> {
        if self.is_recording() {
            return self.stop(arbiter, supervisor);
        }
        self.start(target, requested_output, defaults, probe, arbiter, supervisor)
    }

    fn start(
        &mut self,
        target: &StreamTarget,
        requested_output: Option<PathBuf>,
        defaults: &RecordingDefaults,
        probe: &dyn ExecutableProbe,
        arbiter: &mut ModeArbiter,
        supervisor: &mut Supervisor,
    ) -> PlaycastResult<String> {
        match target.mode() {
            PipelineMode::ExternalDecrypting => {
                if !probe.is_available(ENCODER_BIN) {
                    return Err(PlaycastError::missing_executable(ENCODER_BIN));
                }
                if !target.is_manifest_url() {
                    return Err(PlaycastError::invalid_input(
                        "Stream recording needs a manifest URL (containing .mpd)",
                    ));
                }
                let output = resolve_output_path(
                    requested_output,
                    "stream-recording",
                    &defaults.stream_extension,
                );
                let invocation = decrypting_record_command(target, &output)?;
                supervisor.spawn(
                    ProcessKind::StreamRecording,
                    invocation,
                    Some(output.clone()),
                )?;
                let status = format!("Recording (decrypting encoder) -> {}", output.display());
                self.session = StreamSession::External { output };
                Ok(status)
            }
            PipelineMode::InProcess => {
                let output =
                    resolve_output_path(requested_output, "recording", &defaults.video_extension);
                let status = if arbiter.is_in_process_playing() {
                    arbiter.restart_in_process(Some(&output))?;
                    format!("Recording (in-process) -> {}", output.display())
                } else {
                    format!("Armed for in-process recording -> {}", output.display())
                };
                self.session = StreamSession::InProcess { output };
                Ok(status)
            }
        }
    }

    fn stop(
        &mut self,
        arbiter: &mut ModeArbiter,
        supervisor: &mut Supervisor,
    ) -> PlaycastResult<String> {
        match std::mem::replace(&mut self.session, StreamSession::Idle) {
            StreamSession::Idle => Ok("Not recording".to_string()),
            StreamSession::External { output } => {
                supervisor.stop(ProcessKind::StreamRecording)?;
                Ok(format!(
                    "Stream recording stopped. File: {}",
                    output.display()
                ))
            }
            StreamSession::InProcess { output } => {
                if arbiter.is_in_process_playing() {
                    // Plain playback resumes without the file sink.
                    arbiter.restart_in_process(None)?;
                    Ok(format!("Recording stopped. File: {}", output.display()))
                } else {
                    Ok("Recording disarmed".to_string())
                }
            }
        }
    }

    /// Tear the session down without touching playback. Used when a
    /// playback stop cascades into the recorders.
    pub fn cancel(&mut self, supervisor: &mut Supervisor) -> PlaycastResult<()> {
        match std::mem::replace(&mut self.session, StreamSession::Idle) {
            StreamSession::External { .. } => {
                supervisor.stop(ProcessKind::StreamRecording)?;
            }
            StreamSession::Idle | StreamSession::InProcess { .. } => {}
        }
        Ok(())
    }
}

impl Default for StreamRecorder {
    fn default() -> Self {
        Self::new()
    }
}

enum ScreenSession {
    Idle,
    Recording { output: PathBuf },
}

/// Screen-recording toggle, fully independent of playback and stream
/// recording.
pub struct ScreenRecorder {
    session: ScreenSession,
}

impl ScreenRecorder {
    pub fn new() -> Self {
        Self {
            session: ScreenSession::Idle,
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.session, ScreenSession::Recording { .. })
    }

    pub fn output(&self) -> Option<&Path> {
        match &self.session {
            ScreenSession::Recording { output } => Some(output),
            ScreenSession::Idle => None,
        }
    }

    /// Toggle screen recording on or off. The region and frame rate are
    /// captured here, once; geometry changes mid-recording are not
    /// tracked.
    pub fn toggle(
        &mut self,
        region: CaptureRegion,
        requested_output: Option<PathBuf>,
        os: OsKind,
        defaults: &RecordingDefaults,
        probe: &dyn ExecutableProbe,
        supervisor: &mut Supervisor,
    ) -> PlaycastResult<String> {
        if let ScreenSession::Recording { .. } = &self.session {
            let output = match std::mem::replace(&mut self.session, ScreenSession::Idle) {
                ScreenSession::Recording { output } => output,
                ScreenSession::Idle => unreachable!(),
            };
            supervisor.stop(ProcessKind::ScreenRecording)?;
            return Ok(format!(
                "Screen recording saved to {}",
                output.display()
            ));
        }

        if !probe.is_available(ENCODER_BIN) {
            return Err(PlaycastError::missing_executable(ENCODER_BIN));
        }
        let output = resolve_output_path(
            requested_output,
            "screen-recording",
            &defaults.video_extension,
        );
        let invocation = screen_capture_command(&region, &output, os)?;
        supervisor.spawn(
            ProcessKind::ScreenRecording,
            invocation,
            Some(output.clone()),
        )?;
        let status = format!("Recording screen -> {}", output.display());
        self.session = ScreenSession::Recording { output };
        Ok(status)
    }

    /// Tear the session down as part of a cascaded stop.
    pub fn cancel(&mut self, supervisor: &mut Supervisor) -> PlaycastResult<()> {
        if let ScreenSession::Recording { .. } = &self.session {
            self.session = ScreenSession::Idle;
            supervisor.stop(ProcessKind::ScreenRecording)?;
        }
        Ok(())
    }
}

impl Default for ScreenRecorder {
    fn default() -> Self {
        Self::new()
    }
}
