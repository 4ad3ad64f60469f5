//! Playcast CLI — command-line front-end for the playback/recording engine.
//!
//! Usage:
//!   playcast play <URL> [--key KID:KEY]     Play a stream
//!   playcast record <URL> [OPTIONS]         Record a stream
//!   playcast screen [OPTIONS]               Record a screen region
//!   playcast check                          Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "playcast",
    about = "Play and record streamed media, with optional decryption via external tools",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a stream (in-process, or through the external decrypting
    /// player when a key is given)
    Play {
        /// Stream URL (e.g. https://.../manifest.mpd)
        url: String,

        /// Decryption key as KID:KEY; presence selects the external player
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Record a stream to a file
    Record {
        /// Stream URL; must contain .mpd when a key is given
        url: String,

        /// Decryption key as KID:KEY; presence selects the external encoder
        #[arg(short, long)]
        key: Option<String>,

        /// Output file (defaults to a timestamped name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Record a rectangular screen region to a video file
    Screen {
        /// Region left edge in screen coordinates
        #[arg(long, default_value = "0")]
        x: i32,

        /// Region top edge in screen coordinates
        #[arg(long, default_value = "0")]
        y: i32,

        /// Region width in pixels
        #[arg(long, default_value = "1280")]
        width: u32,

        /// Region height in pixels
        #[arg(long, default_value = "720")]
        height: u32,

        /// Capture frame rate
        #[arg(long)]
        fps: Option<u32>,

        /// Output file (defaults to a timestamped name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    playcast_common::logging::init_logging(&playcast_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    match cli.command {
        Commands::Play { url, key } => commands::play::run(url, key).await,
        Commands::Record { url, key, output } => commands::record::run(url, key, output).await,
        Commands::Screen {
            x,
            y,
            width,
            height,
            fps,
            output,
        } => commands::screen::run(x, y, width, height, fps, output).await,
        Commands::Check => commands::check::run(),
    }
}
