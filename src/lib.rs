//! Reelcast - documents to avatar videos
//!
//! Turns a published PDF into a talking-avatar video and publishes it.
//!
//! # Overview
//!
//! Reelcast allows you to:
//! - Extract the text of a PDF reachable by URL
//! - Narrate the text to MP3 with a text-to-speech service
//! - Generate an avatar video with HeyGen and wait for it to finish
//! - Upload the video and its thumbnail to YouTube
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `document` - PDF download and text extraction
//! - `speech` - Text-to-speech narration
//! - `job` - Remote job submission, polling and artifact download
//! - `upload` - YouTube upload
//! - `pipeline` - Sequential task runner
//! - `orchestrator` - Pipeline assembly from settings
//!
//! # Example
//!
//! ```rust,no_run
//! use reelcast::config::Settings;
//! use reelcast::orchestrator::{Orchestrator, RunOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let options = RunOptions::from_settings(&settings);
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let report = orchestrator
//!         .run("https://example.com/report.pdf", &options, &CancellationToken::new())
//!         .await?;
//!     for step in &report.steps {
//!         println!("{}", step);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod pipeline;
pub mod speech;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use error::{ReelcastError, Result};
