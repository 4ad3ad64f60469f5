//! Playcast platform integration.
//!
//! Identifies the operating-system family the process runs on and locates
//! the external executables the engine delegates to. Command construction
//! branches on [`OsKind`] rather than `cfg` so that every branch stays
//! testable from any host.

use serde::{Deserialize, Serialize};

pub mod probe;

pub use probe::{
    check_capabilities, find_executable, is_available, Capability, ExecutableProbe, SystemProbe,
};

/// Operating-system family, as far as command construction cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OsKind {
    Windows,
    Linux,
    MacOs,
    /// Anything else: screen capture has no mapping here.
    Other,
}

impl OsKind {
    /// The family this binary was compiled for.
    pub fn current() -> Self {
        #[cfg(target_os = "windows")]
        {
            OsKind::Windows
        }
        #[cfg(target_os = "linux")]
        {
            OsKind::Linux
        }
        #[cfg(target_os = "macos")]
        {
            OsKind::MacOs
        }
        #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
        {
            OsKind::Other
        }
    }
}

/// X11 display address for screen capture, falling back to `:0.0` when the
/// environment does not provide one.
pub fn display_address() -> String {
    std::env::var("DISPLAY").unwrap_or_else(|_| ":0.0".to_string())
}
