use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "chaptrack",
    version,
    about = "Play course chapters with mpv and track watch progress"
)]
pub struct Cli {
    /// Chapter manifest (defaults to chapters.json in the current directory)
    #[arg(long, global = true)]
    pub manifest: Option<PathBuf>,

    /// Watched percentage at which a chapter is latched as completed
    #[arg(long, global = true, default_value_t = 95.0)]
    pub watched_threshold: f64,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Play the active chapter, resuming from the stored position
    Play,
    /// Advance to the next chapter without playing
    Next,
    /// Select a chapter by its position in the list (1-based)
    Goto { position: usize },
    /// List chapters with their watch status
    List,
    /// Show aggregate completion statistics
    Stats,
    /// Discard all recorded progress and start over
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}
