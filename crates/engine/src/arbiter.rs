//! Playback mode arbitration.
//!
//! Decides which of the two mutually exclusive playback pipelines is
//! legal for a target and routes start/stop/pause to it. The target is
//! bound to the session when playback starts: editing the key field
//! mid-playback cannot retarget a later pause or stop. Only an explicit
//! stop releases the binding.

use std::path::Path;

use playcast_common::error::{PlaycastError, PlaycastResult};
use playcast_platform::probe::ExecutableProbe;
use serde::{Deserialize, Serialize};

use crate::invocation::{decrypting_play_command, PLAYER_BIN};
use crate::player::PlayerPipeline;
use crate::supervisor::{ProcessKind, Supervisor};
use crate::target::{PipelineMode, StreamTarget};

/// Arbiter state, one session at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Stopped,
    PlayingInProcess,
    PlayingExternal,
}

pub struct ModeArbiter {
    state: PlaybackState,
    player: Box<dyn PlayerPipeline>,
    active_target: Option<StreamTarget>,
    paused: bool,
}

impl ModeArbiter {
    pub fn new(player: Box<dyn PlayerPipeline>) -> Self {
        Self {
            state: PlaybackState::Stopped,
            player,
            active_target: None,
            paused: false,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// The target bound at start time, while a session is active.
    pub fn active_target(&self) -> Option<&StreamTarget> {
        self.active_target.as_ref()
    }

    /// Start playback of `target` through whichever pipeline its key
    /// makes legal. `record_sink` attaches output-duplication to the
    /// in-process pipeline when a stream-recording session is armed.
    pub fn request_play(
        &mut self,
        target: StreamTarget,
        record_sink: Option<&Path>,
        probe: &dyn ExecutableProbe,
        supervisor: &mut Supervisor,
    ) -> PlaycastResult<String> {
        if self.state == PlaybackState::PlayingExternal
            && supervisor.is_running(ProcessKind::Playback)
        {
            return Err(PlaycastError::state(
                "External playback is already running; stop it first",
            ));
        }
        // The session's mode is bound at start; switching pipeline
        // families requires an explicit stop.
        if self.state == PlaybackState::PlayingInProcess
            && target.mode() == PipelineMode::ExternalDecrypting
        {
            return Err(PlaycastError::state(
                "Stop in-process playback before starting the decrypting player",
            ));
        }

        match target.mode() {
            PipelineMode::ExternalDecrypting => {
                if !probe.is_available(PLAYER_BIN) {
                    return Err(PlaycastError::missing_executable(PLAYER_BIN));
                }
                let invocation = decrypting_play_command(&target)?;
                let pid = supervisor.spawn(ProcessKind::Playback, invocation, None)?;
                self.state = PlaybackState::PlayingExternal;
                self.paused = false;
                let url = target.url.clone();
                self.active_target = Some(target);
                Ok(format!(
                    "Playing (external decrypting player, pid {pid}): {url}"
                ))
            }
            PipelineMode::InProcess => {
                // Restarting an in-process session rebinds it to the new
                // target; the pipeline handles the teardown.
                self.player.play(&target.url, record_sink)?;
                self.state = PlaybackState::PlayingInProcess;
                self.paused = false;
                let url = target.url.clone();
                self.active_target = Some(target);
                match record_sink {
                    Some(sink) => Ok(format!(
                        "Playing (in-process): {url} (recording -> {})",
                        sink.display()
                    )),
                    None => Ok(format!("Playing (in-process): {url}")),
                }
            }
        }
    }

    /// Stop whatever session is active. Idempotent from `Stopped`.
    pub fn request_stop(&mut self, supervisor: &mut Supervisor) -> PlaycastResult<()> {
        match self.state {
            PlaybackState::PlayingExternal => {
                supervisor.stop(ProcessKind::Playback)?;
            }
            PlaybackState::PlayingInProcess => {
                self.player.stop()?;
            }
            PlaybackState::Stopped => {}
        }
        self.state = PlaybackState::Stopped;
        self.active_target = None;
        self.paused = false;
        Ok(())
    }

    /// Toggle pause. Only the in-process pipeline supports it; the
    /// external player is told apart explicitly rather than silently
    /// ignored.
    pub fn request_pause(&mut self) -> PlaycastResult<String> {
        match self.state {
            PlaybackState::PlayingExternal => Err(PlaycastError::state(
                "Pause is not available for the external player; use its own window",
            )),
            PlaybackState::Stopped => Err(PlaycastError::state("Nothing is playing")),
            PlaybackState::PlayingInProcess => {
                if self.paused {
                    self.player.resume()?;
                    self.paused = false;
                    Ok("Resumed".to_string())
                } else {
                    self.player.pause()?;
                    self.paused = true;
                    Ok("Paused".to_string())
                }
            }
        }
    }

    /// Whether the in-process pipeline is currently rendering.
    pub fn is_in_process_playing(&self) -> bool {
        self.state == PlaybackState::PlayingInProcess && self.player.is_playing()
    }

    /// Restart the bound in-process session with a different
    /// output-duplication configuration. Used when stream recording is
    /// toggled mid-playback; the operator sees a brief re-buffer.
    pub fn restart_in_process(&mut self, record_sink: Option<&Path>) -> PlaycastResult<()> {
        if self.state != PlaybackState::PlayingInProcess {
            return Err(PlaycastError::state(
                "In-process playback is not active",
            ));
        }
        let url = self
            .active_target
            .as_ref()
            .map(|t| t.url.clone())
            .ok_or_else(|| PlaycastError::state("No active playback target"))?;

        self.player.stop()?;
        self.player.play(&url, record_sink)?;
        self.paused = false;
        Ok(())
    }

    pub fn seek(&mut self, fraction: f64) -> PlaycastResult<()> {
        if self.state != PlaybackState::PlayingInProcess {
            return Err(PlaycastError::state(
                "Seeking is only available for in-process playback",
            ));
        }
        self.player.seek(fraction)
    }

    pub fn position(&self) -> Option<f64> {
        self.player.position()
    }

    pub fn elapsed(&self) -> Option<std::time::Duration> {
        self.player.elapsed()
    }

    pub fn duration(&self) -> Option<std::time::Duration> {
        self.player.duration()
    }
}
