use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "vidmark",
    version,
    about = "Launch mpv on a local video and resume where you left off"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Play a video file, restoring any saved position and rate
    Play {
        /// Path to the video file
        file: PathBuf,
    },
    /// Show all saved playback positions
    List,
    /// Delete the saved position for a video file
    Forget {
        /// Path to the video file
        file: PathBuf,
    },
    /// Report what the expiry sweep removed
    Sweep,
    Tui,
}
