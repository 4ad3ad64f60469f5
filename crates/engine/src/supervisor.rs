//! Process supervision.
//!
//! Owns every long-lived external child the engine launches, keyed by
//! [`ProcessKind`] so the one-live-process-per-kind rule is enforced
//! structurally instead of by scattered null checks. Stop follows the
//! graceful-terminate-then-force-kill protocol with a per-kind timeout.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use playcast_common::config::ShutdownTimeouts;
use playcast_common::error::{PlaycastError, PlaycastResult};

use crate::invocation::Invocation;

/// How often the stop loop re-checks the child while waiting.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to wait for the child to disappear after a force kill.
const FORCE_KILL_WAIT: Duration = Duration::from_secs(2);

/// The three independent process slots the engine manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessKind {
    Playback,
    StreamRecording,
    ScreenRecording,
}

impl ProcessKind {
    pub fn label(&self) -> &'static str {
        match self {
            ProcessKind::Playback => "playback",
            ProcessKind::StreamRecording => "stream recording",
            ProcessKind::ScreenRecording => "screen recording",
        }
    }
}

/// How a supervised process went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Exited within the timeout after the graceful request.
    Graceful,
    /// Had to be force-killed.
    Forced,
}

/// Handle to a launched child. The system implementation wraps
/// [`std::process::Child`]; tests substitute fakes through [`Launcher`].
pub trait ManagedChild: Send {
    /// OS process id (or a synthetic id for fakes).
    fn id(&self) -> u32;

    /// Non-blocking liveness check. `Ok(true)` once the child has exited.
    fn poll_exited(&mut self) -> io::Result<bool>;

    /// Request graceful termination: SIGTERM on POSIX, a `q` keystroke on
    /// the child's stdin on the Windows family (the clean-shutdown request
    /// an ffmpeg-family encoder expects there).
    fn terminate(&mut self) -> io::Result<()>;

    /// Force kill.
    fn kill(&mut self) -> io::Result<()>;
}

/// Spawns children from invocations. The seam that keeps the supervisor
/// and everything above it testable without real processes.
pub trait Launcher: Send {
    fn launch(&self, invocation: &Invocation) -> io::Result<Box<dyn ManagedChild>>;
}

/// Launches real OS processes with stdio suppressed.
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn launch(&self, invocation: &Invocation) -> io::Result<Box<dyn ManagedChild>> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        // Graceful shutdown on the Windows family goes through stdin.
        if cfg!(windows) {
            command.stdin(Stdio::piped());
        } else {
            command.stdin(Stdio::null());
        }
        let child = command.spawn()?;
        Ok(Box::new(OsChild { child }))
    }
}

struct OsChild {
    child: std::process::Child,
}

impl ManagedChild for OsChild {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn poll_exited(&mut self) -> io::Result<bool> {
        Ok(self.child.try_wait()?.is_some())
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> io::Result<()> {
        let rc = unsafe { libc::kill(self.child.id() as libc::pid_t, libc::SIGTERM) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> io::Result<()> {
        use std::io::Write;
        match self.child.stdin.as_mut() {
            Some(stdin) => stdin.write_all(b"q"),
            None => self.child.kill(),
        }
    }

    fn kill(&mut self) -> io::Result<()> {
        self.child.kill()
    }
}

/// A live supervised process and what it was launched for.
pub struct ManagedProcess {
    handle: Box<dyn ManagedChild>,
    pub invocation: Invocation,
    pub output_path: Option<PathBuf>,
    pub kind: ProcessKind,
}

impl ManagedProcess {
    pub fn pid(&self) -> u32 {
        self.handle.id()
    }
}

/// Registry of supervised children, at most one live per kind.
pub struct Supervisor {
    launcher: Box<dyn Launcher>,
    slots: HashMap<ProcessKind, ManagedProcess>,
    stopping: HashSet<ProcessKind>,
    timeouts: ShutdownTimeouts,
}

impl Supervisor {
    pub fn new(timeouts: ShutdownTimeouts) -> Self {
        Self::with_launcher(Box::new(SystemLauncher), timeouts)
    }

    pub fn with_launcher(launcher: Box<dyn Launcher>, timeouts: ShutdownTimeouts) -> Self {
        Self {
            launcher,
            slots: HashMap::new(),
            stopping: HashSet::new(),
            timeouts,
        }
    }

    /// Launch a process into the given slot.
    ///
    /// Refused while a process of the same kind is live or still being
    /// stopped; a new spawn must never race a pending teardown. Launch
    /// failure is surfaced with the underlying OS error and not retried.
    pub fn spawn(
        &mut self,
        kind: ProcessKind,
        invocation: Invocation,
        output_path: Option<PathBuf>,
    ) -> PlaycastResult<u32> {
        if self.stopping.contains(&kind) {
            return Err(PlaycastError::state(format!(
                "A {} process is still stopping",
                kind.label()
            )));
        }
        if self.is_running(kind) {
            return Err(PlaycastError::state(format!(
                "A {} process is already running",
                kind.label()
            )));
        }

        tracing::info!(kind = kind.label(), command = %invocation, "Spawning external process");
        let handle = self
            .launcher
            .launch(&invocation)
            .map_err(|source| PlaycastError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;
        let pid = handle.id();
        tracing::info!(kind = kind.label(), pid, "External process started");

        self.slots.insert(
            kind,
            ManagedProcess {
                handle,
                invocation,
                output_path,
                kind,
            },
        );
        Ok(pid)
    }

    /// Stop the process in the given slot, graceful first, forced after
    /// the kind's timeout.
    ///
    /// Idempotent: an empty slot is a successful no-op. After `Ok`, the
    /// slot is free and the child is confirmed not running; recording
    /// outputs are finalized by the child itself on exit.
    pub fn stop(&mut self, kind: ProcessKind) -> PlaycastResult<StopOutcome> {
        let Some(mut process) = self.slots.remove(&kind) else {
            return Ok(StopOutcome::Graceful);
        };

        self.stopping.insert(kind);
        let result = stop_process(&mut process, self.timeout_for(kind));
        self.stopping.remove(&kind);

        match &result {
            Ok(outcome) => {
                tracing::info!(kind = kind.label(), pid = process.pid(), ?outcome, "External process stopped");
            }
            Err(e) => {
                // The child may still be alive; the record is dropped and
                // the resources are considered leaked.
                tracing::error!(kind = kind.label(), pid = process.pid(), error = %e, "Failed to stop external process");
            }
        }
        result
    }

    /// Non-blocking liveness check. Reaps the slot when the child exited
    /// on its own.
    pub fn is_running(&mut self, kind: ProcessKind) -> bool {
        let Some(process) = self.slots.get_mut(&kind) else {
            return false;
        };
        match process.handle.poll_exited() {
            Ok(true) => {
                tracing::info!(kind = kind.label(), pid = process.pid(), "External process exited on its own");
                self.slots.remove(&kind);
                false
            }
            Ok(false) => true,
            // Can't tell; assume alive rather than double-spawn.
            Err(_) => true,
        }
    }

    /// Output path registered for the slot's live process, if any.
    pub fn output_path(&self, kind: ProcessKind) -> Option<&Path> {
        self.slots
            .get(&kind)
            .and_then(|p| p.output_path.as_deref())
    }

    /// Pid of the slot's live process, if any.
    pub fn pid(&self, kind: ProcessKind) -> Option<u32> {
        self.slots.get(&kind).map(|p| p.pid())
    }

    fn timeout_for(&self, kind: ProcessKind) -> Duration {
        let secs = match kind {
            ProcessKind::Playback => self.timeouts.playback_secs,
            ProcessKind::StreamRecording => self.timeouts.stream_record_secs,
            ProcessKind::ScreenRecording => self.timeouts.screen_record_secs,
        };
        Duration::from_secs(secs)
    }
}

fn stop_process(process: &mut ManagedProcess, timeout: Duration) -> PlaycastResult<StopOutcome> {
    if process.handle.poll_exited().unwrap_or(false) {
        return Ok(StopOutcome::Graceful);
    }

    if let Err(e) = process.handle.terminate() {
        tracing::warn!(pid = process.pid(), error = %e, "Graceful termination request failed");
    }

    if wait_for_exit(process, timeout) {
        return Ok(StopOutcome::Graceful);
    }

    tracing::warn!(
        pid = process.pid(),
        timeout_secs = timeout.as_secs(),
        "Graceful shutdown timed out; force-killing"
    );
    process.handle.kill().map_err(|e| {
        PlaycastError::stop_failure(format!(
            "Force kill of pid {} failed: {e}",
            process.pid()
        ))
    })?;

    if wait_for_exit(process, FORCE_KILL_WAIT) {
        Ok(StopOutcome::Forced)
    } else {
        Err(PlaycastError::stop_failure(format!(
            "Pid {} did not exit after force kill",
            process.pid()
        )))
    }
}

fn wait_for_exit(process: &mut ManagedProcess, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if process.handle.poll_exited().unwrap_or(false) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(STOP_POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_timeouts() -> ShutdownTimeouts {
        ShutdownTimeouts {
            playback_secs: 1,
            stream_record_secs: 1,
            screen_record_secs: 1,
        }
    }

    #[test]
    fn stop_on_empty_slot_is_a_noop() {
        let mut supervisor = Supervisor::new(fast_timeouts());
        assert_eq!(
            supervisor.stop(ProcessKind::Playback).unwrap(),
            StopOutcome::Graceful
        );
        assert!(!supervisor.is_running(ProcessKind::Playback));
    }

    #[cfg(unix)]
    #[test]
    fn graceful_stop_of_a_cooperative_child() {
        let mut supervisor = Supervisor::new(fast_timeouts());
        supervisor
            .spawn(
                ProcessKind::Playback,
                Invocation::new("sleep").arg("30"),
                None,
            )
            .unwrap();
        assert!(supervisor.is_running(ProcessKind::Playback));

        let outcome = supervisor.stop(ProcessKind::Playback).unwrap();
        assert_eq!(outcome, StopOutcome::Graceful);
        assert!(!supervisor.is_running(ProcessKind::Playback));
    }

    #[cfg(unix)]
    #[test]
    fn stubborn_child_is_force_killed() {
        let mut supervisor = Supervisor::new(fast_timeouts());
        supervisor
            .spawn(
                ProcessKind::ScreenRecording,
                Invocation::new("sh").args(["-c", "trap '' TERM; sleep 30"]),
                None,
            )
            .unwrap();
        // Give the shell a moment to install the trap.
        std::thread::sleep(Duration::from_millis(200));

        let outcome = supervisor.stop(ProcessKind::ScreenRecording).unwrap();
        assert_eq!(outcome, StopOutcome::Forced);
        assert!(!supervisor.is_running(ProcessKind::ScreenRecording));
    }

    #[cfg(unix)]
    #[test]
    fn second_spawn_of_same_kind_is_refused() {
        let mut supervisor = Supervisor::new(fast_timeouts());
        supervisor
            .spawn(
                ProcessKind::Playback,
                Invocation::new("sleep").arg("30"),
                None,
            )
            .unwrap();

        let err = supervisor
            .spawn(
                ProcessKind::Playback,
                Invocation::new("sleep").arg("30"),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, PlaycastError::State { .. }));

        // Independent kinds are unaffected.
        supervisor
            .spawn(
                ProcessKind::StreamRecording,
                Invocation::new("sleep").arg("30"),
                None,
            )
            .unwrap();

        supervisor.stop(ProcessKind::Playback).unwrap();
        supervisor.stop(ProcessKind::StreamRecording).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn exited_child_is_reaped_by_liveness_check() {
        let mut supervisor = Supervisor::new(fast_timeouts());
        supervisor
            .spawn(ProcessKind::Playback, Invocation::new("true"), None)
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while supervisor.is_running(ProcessKind::Playback) {
            assert!(Instant::now() < deadline, "child never exited");
            std::thread::sleep(Duration::from_millis(20));
        }

        // Slot is free again.
        supervisor
            .spawn(ProcessKind::Playback, Invocation::new("true"), None)
            .unwrap();
        supervisor.stop(ProcessKind::Playback).unwrap();
    }

    #[test]
    fn spawn_failure_reports_the_program() {
        let mut supervisor = Supervisor::new(fast_timeouts());
        let err = supervisor
            .spawn(
                ProcessKind::Playback,
                Invocation::new("playcast-no-such-binary"),
                None,
            )
            .unwrap_err();
        match err {
            PlaycastError::Spawn { program, .. } => {
                assert_eq!(program, "playcast-no-such-binary")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!supervisor.is_running(ProcessKind::Playback));
    }
}
