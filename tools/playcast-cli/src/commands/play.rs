//! Play a stream until interrupted.

use std::io::Write;

use playcast_common::config::AppConfig;
use playcast_engine::{Controller, PlaybackState, ProcessKind, TICK_INTERVAL};

pub async fn run(url: String, key: Option<String>) -> anyhow::Result<()> {
    let config = AppConfig::load();
    let mut controller = Controller::new(config);

    let status = controller.on_play_requested(&url, key.as_deref().unwrap_or(""))?;
    println!("{status}");
    println!("Press Ctrl+C to stop...");

    match controller.playback_state() {
        PlaybackState::PlayingInProcess => {
            let mut ticker = tokio::time::interval(TICK_INTERVAL);
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    _ = ticker.tick() => {
                        if let Some(position) = controller.tick() {
                            print!("\r{}   ", position.clock());
                            let _ = std::io::stdout().flush();
                        }
                    }
                }
            }
            println!();
        }
        PlaybackState::PlayingExternal => {
            // The player owns its own window; watch for it closing.
            let mut ticker = tokio::time::interval(TICK_INTERVAL);
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    _ = ticker.tick() => {
                        if !controller.is_process_running(ProcessKind::Playback) {
                            println!("External player exited");
                            break;
                        }
                    }
                }
            }
        }
        PlaybackState::Stopped => {}
    }

    let status = controller.on_stop_requested()?;
    println!("{status}");
    Ok(())
}
