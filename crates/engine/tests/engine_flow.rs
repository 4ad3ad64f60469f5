//! End-to-end engine scenarios over fake collaborators.
//!
//! The fakes record every spawn/terminate/kill and every player call, so
//! these tests can assert process identity and pipeline selection without
//! launching anything real.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use playcast_common::config::AppConfig;
use playcast_common::error::PlaycastError;
use playcast_engine::{
    CaptureRegion, Controller, Invocation, Launcher, ManagedChild, PlaybackState, PlayerPipeline,
    ProcessKind,
};
use playcast_platform::probe::ExecutableProbe;
use playcast_platform::OsKind;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ProcessEvent {
    Spawned { pid: u32, program: String },
    Terminated { pid: u32 },
    Killed { pid: u32 },
}

#[derive(Default)]
struct ProcessLog {
    events: Mutex<Vec<ProcessEvent>>,
    next_pid: AtomicU32,
}

impl ProcessLog {
    fn events(&self) -> Vec<ProcessEvent> {
        self.events.lock().unwrap().clone()
    }

    fn spawned_pids(&self) -> Vec<u32> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                ProcessEvent::Spawned { pid, .. } => Some(*pid),
                _ => None,
            })
            .collect()
    }

    fn terminated_pids(&self) -> Vec<u32> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                ProcessEvent::Terminated { pid } => Some(*pid),
                _ => None,
            })
            .collect()
    }
}

struct FakeLauncher {
    log: Arc<ProcessLog>,
}

impl Launcher for FakeLauncher {
    fn launch(&self, invocation: &Invocation) -> io::Result<Box<dyn ManagedChild>> {
        let pid = self.log.next_pid.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.events.lock().unwrap().push(ProcessEvent::Spawned {
            pid,
            program: invocation.program.clone(),
        });
        Ok(Box::new(FakeChild {
            pid,
            exited: false,
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakeChild {
    pid: u32,
    exited: bool,
    log: Arc<ProcessLog>,
}

impl ManagedChild for FakeChild {
    fn id(&self) -> u32 {
        self.pid
    }

    fn poll_exited(&mut self) -> io::Result<bool> {
        Ok(self.exited)
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.log
            .events
            .lock()
            .unwrap()
            .push(ProcessEvent::Terminated { pid: self.pid });
        self.exited = true;
        Ok(())
    }

    fn kill(&mut self) -> io::Result<()> {
        self.log
            .events
            .lock()
            .unwrap()
            .push(ProcessEvent::Killed { pid: self.pid });
        self.exited = true;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PlayerEvent {
    Play { url: String, sink: Option<PathBuf> },
    Stop,
    Pause,
    Resume,
    Seek(f64),
}

#[derive(Default)]
struct PlayerLog {
    events: Mutex<Vec<PlayerEvent>>,
}

struct FakePlayer {
    log: Arc<PlayerLog>,
    active: bool,
    paused: bool,
}

impl FakePlayer {
    fn new(log: Arc<PlayerLog>) -> Self {
        Self {
            log,
            active: false,
            paused: false,
        }
    }
}

impl PlayerPipeline for FakePlayer {
    fn play(
        &mut self,
        url: &str,
        record_sink: Option<&Path>,
    ) -> playcast_common::error::PlaycastResult<()> {
        self.log.events.lock().unwrap().push(PlayerEvent::Play {
            url: url.to_string(),
            sink: record_sink.map(Path::to_path_buf),
        });
        self.active = true;
        self.paused = false;
        Ok(())
    }

    fn stop(&mut self) -> playcast_common::error::PlaycastResult<()> {
        if self.active {
            self.log.events.lock().unwrap().push(PlayerEvent::Stop);
        }
        self.active = false;
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) -> playcast_common::error::PlaycastResult<()> {
        self.log.events.lock().unwrap().push(PlayerEvent::Pause);
        self.paused = true;
        Ok(())
    }

    fn resume(&mut self) -> playcast_common::error::PlaycastResult<()> {
        self.log.events.lock().unwrap().push(PlayerEvent::Resume);
        self.paused = false;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.active && !self.paused
    }

    fn position(&self) -> Option<f64> {
        self.active.then_some(0.25)
    }

    fn elapsed(&self) -> Option<Duration> {
        self.active.then_some(Duration::from_secs(30))
    }

    fn duration(&self) -> Option<Duration> {
        self.active.then_some(Duration::from_secs(120))
    }

    fn seek(&mut self, fraction: f64) -> playcast_common::error::PlaycastResult<()> {
        self.log
            .events
            .lock()
            .unwrap()
            .push(PlayerEvent::Seek(fraction));
        Ok(())
    }
}

struct ProbeAllPresent;

impl ExecutableProbe for ProbeAllPresent {
    fn is_available(&self, _name: &str) -> bool {
        true
    }
}

struct ProbeNothingPresent;

impl ExecutableProbe for ProbeNothingPresent {
    fn is_available(&self, _name: &str) -> bool {
        false
    }
}

struct Harness {
    controller: Controller,
    processes: Arc<ProcessLog>,
    player: Arc<PlayerLog>,
}

fn harness() -> Harness {
    harness_with_probe(Box::new(ProbeAllPresent))
}

fn harness_with_probe(probe: Box<dyn ExecutableProbe>) -> Harness {
    let processes = Arc::new(ProcessLog::default());
    let player = Arc::new(PlayerLog::default());
    let controller = Controller::with_parts(
        AppConfig::default(),
        Box::new(FakePlayer::new(Arc::clone(&player))),
        Box::new(FakeLauncher {
            log: Arc::clone(&processes),
        }),
        probe,
        OsKind::Linux,
    );
    Harness {
        controller,
        processes,
        player,
    }
}

const MANIFEST_URL: &str = "https://x/manifest.mpd";

#[test]
fn plain_target_plays_in_process_without_spawning() {
    let mut h = harness();

    h.controller.on_play_requested(MANIFEST_URL, "").unwrap();
    assert_eq!(h.controller.playback_state(), PlaybackState::PlayingInProcess);
    assert!(h.processes.events().is_empty());

    h.controller.on_stop_requested().unwrap();
    assert_eq!(h.controller.playback_state(), PlaybackState::Stopped);
    assert!(h.processes.events().is_empty());
    assert_eq!(
        h.player.events.lock().unwrap().as_slice(),
        &[
            PlayerEvent::Play {
                url: MANIFEST_URL.to_string(),
                sink: None
            },
            PlayerEvent::Stop,
        ]
    );
}

#[test]
fn keyed_target_plays_through_external_process() {
    let mut h = harness();

    h.controller
        .on_play_requested(MANIFEST_URL, "KID:ABCDEF")
        .unwrap();
    assert_eq!(h.controller.playback_state(), PlaybackState::PlayingExternal);
    assert!(h.controller.is_process_running(ProcessKind::Playback));
    assert_eq!(h.processes.spawned_pids().len(), 1);
    // The in-process pipeline stays untouched.
    assert!(h.player.events.lock().unwrap().is_empty());

    h.controller.on_stop_requested().unwrap();
    assert_eq!(h.controller.playback_state(), PlaybackState::Stopped);
    assert!(!h.controller.is_process_running(ProcessKind::Playback));

    let pid = h.processes.spawned_pids()[0];
    assert_eq!(h.processes.terminated_pids(), vec![pid]);
}

#[test]
fn second_external_play_is_refused_leaving_one_process() {
    let mut h = harness();

    h.controller
        .on_play_requested(MANIFEST_URL, "KID:ABCDEF")
        .unwrap();
    let err = h
        .controller
        .on_play_requested(MANIFEST_URL, "KID:ABCDEF")
        .unwrap_err();
    assert!(matches!(err, PlaycastError::State { .. }));
    assert_eq!(h.processes.spawned_pids().len(), 1);
    assert!(h.controller.is_process_running(ProcessKind::Playback));
}

#[test]
fn stop_is_idempotent() {
    let mut h = harness();
    h.controller.on_stop_requested().unwrap();
    h.controller.on_stop_requested().unwrap();
    assert_eq!(h.controller.playback_state(), PlaybackState::Stopped);
}

#[test]
fn missing_player_binary_aborts_without_state_change() {
    let mut h = harness_with_probe(Box::new(ProbeNothingPresent));

    let err = h
        .controller
        .on_play_requested(MANIFEST_URL, "KID:ABCDEF")
        .unwrap_err();
    assert!(matches!(err, PlaycastError::MissingExecutable { .. }));
    assert_eq!(h.controller.playback_state(), PlaybackState::Stopped);
    assert!(h.processes.events().is_empty());
}

#[test]
fn pause_is_refused_for_the_external_player() {
    let mut h = harness();
    h.controller
        .on_play_requested(MANIFEST_URL, "KID:ABCDEF")
        .unwrap();

    let err = h.controller.on_pause_requested().unwrap_err();
    assert!(matches!(err, PlaycastError::State { .. }));
    // Still playing; the refusal is informational.
    assert_eq!(h.controller.playback_state(), PlaybackState::PlayingExternal);
}

#[test]
fn pause_toggles_the_in_process_pipeline() {
    let mut h = harness();
    h.controller.on_play_requested(MANIFEST_URL, "").unwrap();

    assert_eq!(h.controller.on_pause_requested().unwrap(), "Paused");
    assert_eq!(h.controller.on_pause_requested().unwrap(), "Resumed");
    let events = h.player.events.lock().unwrap();
    assert!(events.contains(&PlayerEvent::Pause));
    assert!(events.contains(&PlayerEvent::Resume));
}

#[test]
fn in_process_record_round_trip_restores_playback() {
    let mut h = harness();
    h.controller.on_play_requested(MANIFEST_URL, "").unwrap();

    let status = h
        .controller
        .on_record_toggle_requested(MANIFEST_URL, "", Some(PathBuf::from("out.mp4")))
        .unwrap();
    assert!(status.contains("out.mp4"));
    assert_eq!(h.controller.record_label(), "Stop Rec");
    assert_eq!(h.controller.playback_state(), PlaybackState::PlayingInProcess);

    h.controller
        .on_record_toggle_requested(MANIFEST_URL, "", None)
        .unwrap();
    assert_eq!(h.controller.record_label(), "Record");
    assert_eq!(h.controller.playback_state(), PlaybackState::PlayingInProcess);

    // Restarted with the sink attached, then restarted plain.
    let events = h.player.events.lock().unwrap();
    assert_eq!(
        events.as_slice(),
        &[
            PlayerEvent::Play {
                url: MANIFEST_URL.to_string(),
                sink: None
            },
            PlayerEvent::Stop,
            PlayerEvent::Play {
                url: MANIFEST_URL.to_string(),
                sink: Some(PathBuf::from("out.mp4"))
            },
            PlayerEvent::Stop,
            PlayerEvent::Play {
                url: MANIFEST_URL.to_string(),
                sink: None
            },
        ]
    );
    // No external process was ever involved.
    assert!(h.processes.events().is_empty());
}

#[test]
fn armed_recording_attaches_sink_when_playback_starts() {
    let mut h = harness();

    // Arm while stopped, then play.
    h.controller
        .on_record_toggle_requested(MANIFEST_URL, "", Some(PathBuf::from("armed.mp4")))
        .unwrap();
    assert_eq!(h.controller.playback_state(), PlaybackState::Stopped);

    h.controller.on_play_requested(MANIFEST_URL, "").unwrap();
    let events = h.player.events.lock().unwrap();
    assert_eq!(
        events.last().unwrap(),
        &PlayerEvent::Play {
            url: MANIFEST_URL.to_string(),
            sink: Some(PathBuf::from("armed.mp4"))
        }
    );
}

#[test]
fn keyed_record_toggle_spawns_and_stops_the_encoder() {
    let mut h = harness();

    let status = h
        .controller
        .on_record_toggle_requested(MANIFEST_URL, "KID:ABCDEF", Some(PathBuf::from("cap.ts")))
        .unwrap();
    assert!(status.contains("cap.ts"));
    assert!(h.controller.is_process_running(ProcessKind::StreamRecording));
    assert_eq!(h.controller.record_label(), "Stop Rec");

    h.controller
        .on_record_toggle_requested(MANIFEST_URL, "KID:ABCDEF", None)
        .unwrap();
    assert!(!h.controller.is_process_running(ProcessKind::StreamRecording));

    let pid = h.processes.spawned_pids()[0];
    assert_eq!(h.processes.terminated_pids(), vec![pid]);
}

#[test]
fn keyed_record_requires_a_manifest_url() {
    let mut h = harness();
    let err = h
        .controller
        .on_record_toggle_requested("https://x/video.m3u8", "KID:ABCDEF", None)
        .unwrap_err();
    assert!(matches!(err, PlaycastError::InvalidInput { .. }));
    assert!(h.processes.events().is_empty());
    assert_eq!(h.controller.record_label(), "Record");
}

#[test]
fn screen_toggle_twice_is_one_spawn_one_stop_on_the_same_process() {
    let mut h = harness();
    let region = CaptureRegion {
        x: 10,
        y: 20,
        width: 640,
        height: 480,
        frame_rate: 25,
    };

    h.controller
        .on_screen_record_toggle_requested(region, Some(PathBuf::from("screen.mp4")))
        .unwrap();
    assert_eq!(h.controller.screen_record_label(), "Stop ScreenRec");

    h.controller
        .on_screen_record_toggle_requested(region, None)
        .unwrap();
    assert_eq!(h.controller.screen_record_label(), "Screen Rec");

    let events = h.processes.events();
    assert_eq!(events.len(), 2);
    let ProcessEvent::Spawned { pid, .. } = &events[0] else {
        panic!("expected spawn first, got {events:?}");
    };
    assert_eq!(events[1], ProcessEvent::Terminated { pid: *pid });
}

#[test]
fn screen_recording_failure_leaves_playback_untouched() {
    let mut h = harness();
    h.controller.on_play_requested(MANIFEST_URL, "").unwrap();

    let mut no_tools = harness_with_probe(Box::new(ProbeNothingPresent));
    let region = CaptureRegion {
        x: 0,
        y: 0,
        width: 100,
        height: 100,
        frame_rate: 25,
    };
    let err = no_tools
        .controller
        .on_screen_record_toggle_requested(region, None)
        .unwrap_err();
    assert!(matches!(err, PlaycastError::MissingExecutable { .. }));

    // The first controller's playback session is independent and intact.
    assert_eq!(h.controller.playback_state(), PlaybackState::PlayingInProcess);
}

#[test]
fn all_three_kinds_run_simultaneously() {
    let mut h = harness();

    h.controller
        .on_play_requested(MANIFEST_URL, "KID:ABCDEF")
        .unwrap();
    h.controller
        .on_record_toggle_requested(MANIFEST_URL, "KID:ABCDEF", None)
        .unwrap();
    let region = CaptureRegion {
        x: 0,
        y: 0,
        width: 800,
        height: 600,
        frame_rate: 25,
    };
    h.controller
        .on_screen_record_toggle_requested(region, None)
        .unwrap();

    assert!(h.controller.is_process_running(ProcessKind::Playback));
    assert!(h.controller.is_process_running(ProcessKind::StreamRecording));
    assert!(h.controller.is_process_running(ProcessKind::ScreenRecording));

    // One stop action tears all of them down.
    h.controller.on_stop_requested().unwrap();
    assert!(!h.controller.is_process_running(ProcessKind::Playback));
    assert!(!h.controller.is_process_running(ProcessKind::StreamRecording));
    assert!(!h.controller.is_process_running(ProcessKind::ScreenRecording));
}

#[test]
fn tick_reports_position_and_suspends_during_seek() {
    let mut h = harness();
    assert!(h.controller.tick().is_none());

    h.controller.on_play_requested(MANIFEST_URL, "").unwrap();
    let position = h.controller.tick().expect("position while playing");
    assert!((position.fraction - 0.25).abs() < f64::EPSILON);
    assert_eq!(position.clock(), "00:30 / 02:00");

    h.controller.seek_begin();
    assert!(h.controller.tick().is_none());

    h.controller.on_seek_requested(0.5).unwrap();
    assert!(h.controller.tick().is_some());
    assert!(h
        .player
        .events
        .lock()
        .unwrap()
        .contains(&PlayerEvent::Seek(0.5)));
}

#[test]
fn switching_pipeline_families_requires_a_stop() {
    let mut h = harness();
    h.controller.on_play_requested(MANIFEST_URL, "").unwrap();

    let err = h
        .controller
        .on_play_requested(MANIFEST_URL, "KID:ABCDEF")
        .unwrap_err();
    assert!(matches!(err, PlaycastError::State { .. }));
    assert!(h.processes.events().is_empty());

    h.controller.on_stop_requested().unwrap();
    h.controller
        .on_play_requested(MANIFEST_URL, "KID:ABCDEF")
        .unwrap();
    assert_eq!(h.controller.playback_state(), PlaybackState::PlayingExternal);
}
