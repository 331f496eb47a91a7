use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging and show stage output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Caption, burn and trim every audio file, resuming from earlier runs
    Batch(BatchArgs),

    /// Inspect or retire stored clip records
    Clips {
        #[command(subcommand)]
        action: ClipsAction,
    },

    /// Print the content fingerprint used to identify a clip
    Fingerprint {
        /// Audio file to hash
        file: PathBuf,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags override the `[pipeline]` section of the config file.
#[derive(clap::Args, Debug, Clone)]
pub struct BatchArgs {
    /// Audio directory, or a single audio file
    #[arg(short, long)]
    pub audio_path: PathBuf,

    /// Video directory to pick backgrounds from, or a single video file
    #[arg(short, long)]
    pub video_path: PathBuf,

    /// Output directory for generated artifacts
    #[arg(short, long)]
    pub output: PathBuf,

    /// Transcription model
    #[arg(short, long)]
    pub model: Option<String>,

    /// Clip start in seconds
    #[arg(short, long)]
    pub start_time: Option<u32>,

    /// Clip end in seconds
    #[arg(short, long)]
    pub end_time: Option<u32>,

    /// Fade-out length in seconds
    #[arg(long)]
    pub fade_duration: Option<u32>,

    /// Burned video width
    #[arg(long)]
    pub width: Option<u32>,

    /// Burned video height
    #[arg(long)]
    pub height: Option<u32>,

    /// Never pause for caption edits
    #[arg(short, long)]
    pub no_interact: bool,

    /// Do not generate captions
    #[arg(long)]
    pub skip_captions_gen: bool,

    /// Do not burn or trim video
    #[arg(long)]
    pub skip_video_gen: bool,
}

#[derive(Subcommand)]
pub enum ClipsAction {
    /// List stored records
    List {
        /// Include soft-deleted records
        #[arg(long)]
        all: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one record, deleted or not
    Show {
        id: i64,
    },

    /// Soft-delete a record so the next batch starts that audio from scratch
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write the default configuration
    Init {
        /// Destination file
        #[arg(short, long, default_value = "captioner.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
