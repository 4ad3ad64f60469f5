//! Check system capabilities.

use playcast_platform::{check_capabilities, probe::print_capability_report, OsKind};

pub fn run() -> anyhow::Result<()> {
    println!("Playcast System Check");
    println!("{}", "=".repeat(50));

    match OsKind::current() {
        OsKind::Windows => println!("[OK] Operating system: Windows (gdigrab capture)"),
        OsKind::Linux => println!("[OK] Operating system: Linux (x11grab capture)"),
        OsKind::MacOs => println!("[OK] Operating system: macOS (avfoundation capture)"),
        OsKind::Other => println!("[WARN] Operating system: unsupported for screen capture"),
    }

    let capabilities = check_capabilities();
    println!();
    print_capability_report(&capabilities);

    let all_required_ok = capabilities
        .iter()
        .filter(|c| c.required)
        .all(|c| c.available);

    println!();
    if all_required_ok {
        println!("All required capabilities are available. Playcast is ready.");
    } else {
        println!("Some required capabilities are missing. See above for fixes.");
    }

    Ok(())
}
