//! External command construction.
//!
//! Pure builders mapping engine state to [`Invocation`] values. Nothing
//! here spawns anything; the supervisor does that. Branching on
//! [`OsKind`] instead of `cfg` keeps every platform's argument list
//! testable from any host.

use std::fmt;
use std::path::Path;

use playcast_common::error::{PlaycastError, PlaycastResult};
use playcast_platform::{display_address, OsKind};
use serde::{Deserialize, Serialize};

use crate::target::StreamTarget;

/// External program that plays an encrypted manifest in its own window.
pub const PLAYER_BIN: &str = "ffplay";

/// External program used for both decrypting stream recording and screen
/// capture.
pub const ENCODER_BIN: &str = "ffmpeg";

/// A fully described external command: program plus ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.program, self.args.join(" "))
    }
}

/// Rectangular screen region plus capture frame rate, in screen
/// coordinates. Read once at recording start and never re-queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

/// Build the screen-grab-and-encode command for the given OS family.
///
/// Every branch overwrites an existing output file without prompting and
/// suppresses non-essential encoder logging. Width, height, and offsets
/// are passed through exactly as given.
pub fn screen_capture_command(
    region: &CaptureRegion,
    output: &Path,
    os: OsKind,
) -> PlaycastResult<Invocation> {
    let out = output.to_string_lossy().into_owned();
    let size = format!("{}x{}", region.width, region.height);

    let invocation = match os {
        OsKind::Windows => Invocation::new(ENCODER_BIN)
            .args(["-y", "-loglevel", "error"])
            .args(["-f", "gdigrab"])
            .arg("-framerate")
            .arg(region.frame_rate.to_string())
            .arg("-offset_x")
            .arg(region.x.to_string())
            .arg("-offset_y")
            .arg(region.y.to_string())
            .arg("-video_size")
            .arg(size)
            .args(["-i", "desktop"])
            .args(encoder_policy())
            .arg(out),
        OsKind::Linux => {
            let input = format!("{}+{},{}", display_address(), region.x, region.y);
            Invocation::new(ENCODER_BIN)
                .args(["-y", "-loglevel", "error"])
                .args(["-f", "x11grab"])
                .arg("-framerate")
                .arg(region.frame_rate.to_string())
                .arg("-video_size")
                .arg(size)
                .arg("-i")
                .arg(input)
                .args(encoder_policy())
                .arg(out)
        }
        OsKind::MacOs => {
            // avfoundation grabs the whole screen from a fixed device
            // index; the crop filter selects the requested sub-region.
            let crop = format!(
                "crop={}:{}:{}:{}",
                region.width, region.height, region.x, region.y
            );
            Invocation::new(ENCODER_BIN)
                .args(["-y", "-loglevel", "error"])
                .args(["-f", "avfoundation"])
                .arg("-framerate")
                .arg(region.frame_rate.to_string())
                .args(["-i", "1"])
                .arg("-vf")
                .arg(crop)
                .args(encoder_policy())
                .arg(out)
        }
        OsKind::Other => {
            return Err(PlaycastError::unsupported_platform(
                "Screen recording has no capture source on this operating system",
            ));
        }
    };

    Ok(invocation)
}

/// Software H.264 at a fixed quality, constant pixel format. Shared by
/// all capture branches.
fn encoder_policy() -> [&'static str; 8] {
    [
        "-pix_fmt", "yuv420p", "-c:v", "libx264", "-preset", "fast", "-crf", "23",
    ]
}

/// Play-and-render command for an encrypted manifest. The player opens
/// its own display surface; no window embedding.
pub fn decrypting_play_command(target: &StreamTarget) -> PlaycastResult<Invocation> {
    let key = require_key(target)?;
    Ok(Invocation::new(PLAYER_BIN)
        .args(["-loglevel", "error"])
        .arg("-cenc_decryption_key")
        .arg(key)
        .arg("-i")
        .arg(target.url.as_str()))
}

/// Decrypt-and-record command: first video stream, all audio streams,
/// codecs copied without re-encoding, muxed into a transport stream.
pub fn decrypting_record_command(
    target: &StreamTarget,
    output: &Path,
) -> PlaycastResult<Invocation> {
    let key = require_key(target)?;
    Ok(Invocation::new(ENCODER_BIN)
        .args(["-y", "-loglevel", "error"])
        .arg("-cenc_decryption_key")
        .arg(key)
        .arg("-i")
        .arg(target.url.as_str())
        .args(["-map", "0:v:0", "-map", "0:a"])
        .args(["-c", "copy", "-f", "mpegts"])
        .arg(output.to_string_lossy().into_owned()))
}

fn require_key(target: &StreamTarget) -> PlaycastResult<&str> {
    target
        .decryption_key
        .as_deref()
        .ok_or_else(|| PlaycastError::invalid_input("A decryption key is required here"))
}
