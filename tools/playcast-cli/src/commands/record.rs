//! Record a stream until interrupted.

use std::path::PathBuf;

use playcast_common::config::AppConfig;
use playcast_engine::{Controller, ProcessKind, TICK_INTERVAL};

pub async fn run(url: String, key: Option<String>, output: Option<PathBuf>) -> anyhow::Result<()> {
    let config = AppConfig::load();
    let mut controller = Controller::new(config);
    let key_text = key.as_deref().unwrap_or("");

    let status = controller.on_record_toggle_requested(&url, key_text, output)?;
    println!("{status}");

    let external = controller.is_process_running(ProcessKind::StreamRecording);
    if !external {
        // No key: the recording rides on the in-process pipeline, so
        // start playback to drive it.
        let status = controller.on_play_requested(&url, key_text)?;
        println!("{status}");
    }
    println!("Press Ctrl+C to stop recording...");

    if external {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = ticker.tick() => {
                    if !controller.is_process_running(ProcessKind::StreamRecording) {
                        println!("Encoder exited on its own");
                        break;
                    }
                }
            }
        }
        let status = controller.on_record_toggle_requested(&url, key_text, None)?;
        println!("{status}");
    } else {
        tokio::signal::ctrl_c().await?;
        println!();
        // Stop cascades into the armed recording session.
        let status = controller.on_stop_requested()?;
        println!("{status}");
    }

    Ok(())
}
