//! CLI module for Reelcast.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::error::ReelcastError;
use clap::{Parser, Subcommand};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Reelcast - documents to avatar videos
///
/// Extracts a PDF, has an avatar read it out with HeyGen and publishes the
/// result to YouTube.
#[derive(Parser, Debug)]
#[command(name = "reelcast")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the whole pipeline: extract, (narrate), generate, (upload)
    Run {
        /// URL of the PDF document
        source: String,

        /// Narrate the text to MP3 even if disabled in the config
        #[arg(long, conflicts_with = "no_narrate")]
        narrate: bool,

        /// Skip narration even if enabled in the config
        #[arg(long)]
        no_narrate: bool,

        /// Skip the YouTube upload
        #[arg(long)]
        no_upload: bool,

        /// Video title (defaults to the document name)
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Download a PDF and extract its text
    Extract {
        /// URL (or local path) of the PDF document
        source: String,
    },

    /// Narrate a text file to MP3
    Narrate {
        /// Text file to narrate
        text_file: String,

        /// Voice name (defaults to the configured voice)
        #[arg(long)]
        voice: Option<String>,
    },

    /// Generate an avatar video from a text file and download it
    Generate {
        /// Text file with the script
        text_file: String,

        /// Give up after this many seconds (defaults to the configured timeout)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Show the status of a video generation job
    Status {
        /// HeyGen video id
        job_id: String,

        /// Wait for the job to finish and download its artifacts
        #[arg(short, long)]
        wait: bool,
    },

    /// Upload a video to YouTube
    Upload {
        /// Video file
        video: String,

        /// Thumbnail image
        #[arg(long)]
        thumbnail: Option<String>,

        /// Video title
        #[arg(short, long)]
        title: String,
    },

    /// Check configuration and credentials
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file (and HeyGen settings template)
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },
}

/// Tracing filter for a `-v` count. Without `-v` the configured level is used.
pub fn log_filter(verbose: u8, configured: &str) -> String {
    let level = match verbose {
        0 => configured,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("reelcast={}", level)
}

/// Drive a command to completion, abandoning it once `cancel` fires.
pub async fn until_cancelled(
    cancel: &CancellationToken,
    command: impl Future<Output = anyhow::Result<()>>,
) -> anyhow::Result<()> {
    tokio::select! {
        biased;
        result = command => result,
        _ = cancel.cancelled() => {
            Output::warning("Interrupted.");
            Err(ReelcastError::Cancelled.into())
        }
    }
}
