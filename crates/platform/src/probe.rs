//! Executable probing and capability reporting.
//!
//! Every action that launches an external program preflights it here
//! first, so a missing dependency surfaces as a user-facing warning
//! instead of a spawn failure halfway through a state transition.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Search the process's `PATH` for an executable with the given name.
///
/// On the Windows family the `.exe` suffix is also tried, matching what
/// the shell itself would resolve. No side effects.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;

    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if is_executable_file(&candidate) {
            return Some(candidate);
        }
        if cfg!(windows) {
            let candidate_exe = dir.join(format!("{name}.exe"));
            if is_executable_file(&candidate_exe) {
                return Some(candidate_exe);
            }
        }
    }
    None
}

/// Whether an executable with the given name is reachable on `PATH`.
pub fn is_available(name: &str) -> bool {
    find_executable(name).is_some()
}

/// Preflight seam: callers that gate actions on executable presence go
/// through this trait so they stay testable on machines without the
/// real binaries.
pub trait ExecutableProbe: Send + Sync {
    fn is_available(&self, name: &str) -> bool;
}

/// Probes the real search path.
pub struct SystemProbe;

impl ExecutableProbe for SystemProbe {
    fn is_available(&self, name: &str) -> bool {
        is_available(name)
    }
}

fn is_executable_file(path: &Path) -> bool {
    let Ok(metadata) = path.metadata() else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// A system capability Playcast may need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub description: String,
    pub available: bool,
    pub required: bool,
    pub fix_instructions: Option<String>,
}

/// Check all capabilities and report status.
pub fn check_capabilities() -> Vec<Capability> {
    vec![
        check_executable(
            "ffplay",
            "Decrypting playback of encrypted manifests",
            true,
            "Install ffmpeg (the package includes ffplay)",
        ),
        check_executable(
            "ffmpeg",
            "Decrypting stream recording and screen capture",
            true,
            "Install ffmpeg",
        ),
        check_display(),
    ]
}

fn check_executable(name: &str, description: &str, required: bool, fix: &str) -> Capability {
    let available = is_available(name);
    Capability {
        name: name.to_string(),
        description: description.to_string(),
        available,
        required,
        fix_instructions: if available {
            None
        } else {
            Some(fix.to_string())
        },
    }
}

/// Screen capture on X11 needs a display to address.
fn check_display() -> Capability {
    let available = std::env::var("DISPLAY").is_ok()
        || std::env::var("WAYLAND_DISPLAY").is_ok()
        || !cfg!(target_os = "linux");

    Capability {
        name: "Display".to_string(),
        description: "Graphical session for screen capture".to_string(),
        available,
        required: false,
        fix_instructions: if available {
            None
        } else {
            Some("Run inside a graphical desktop session".to_string())
        },
    }
}

/// Print a user-friendly capability report.
pub fn print_capability_report(capabilities: &[Capability]) {
    println!("Playcast System Capabilities:");
    println!("{}", "-".repeat(60));

    for cap in capabilities {
        let status = if cap.available {
            "[OK]"
        } else if cap.required {
            "[MISSING - REQUIRED]"
        } else {
            "[MISSING - OPTIONAL]"
        };

        println!("  {} {}: {}", status, cap.name, cap.description);

        if let Some(ref fix) = cap.fix_instructions {
            println!("    Fix: {fix}");
        }
    }
}
