//! Record a screen region until interrupted.

use std::path::PathBuf;

use playcast_common::config::AppConfig;
use playcast_engine::{CaptureRegion, Controller};

pub async fn run(
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    fps: Option<u32>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = AppConfig::load();
    let frame_rate = fps.unwrap_or(config.recording.screen_frame_rate);
    let mut controller = Controller::new(config);

    let region = CaptureRegion {
        x,
        y,
        width,
        height,
        frame_rate,
    };

    let status = controller.on_screen_record_toggle_requested(region, output)?;
    println!("{status}");
    println!("Press Ctrl+C to stop recording...");

    tokio::signal::ctrl_c().await?;
    println!();

    let status = controller.on_screen_record_toggle_requested(region, None)?;
    println!("{status}");
    Ok(())
}
