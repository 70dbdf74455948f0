//! Upload command implementation.

use super::preflight_or_hint;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::Path;

/// Run the upload command.
pub async fn run_upload(video: &str, thumbnail: Option<&str>, title: &str, settings: Settings) -> Result<()> {
    preflight_or_hint(&[Operation::Upload], &settings)?;

    let orchestrator = Orchestrator::new(settings)?;
    let uploader = orchestrator.uploader()?;
    let metadata = orchestrator.video_metadata(title);

    let spinner = Output::spinner(&format!("Uploading {}...", video));
    let result = uploader
        .upload(Path::new(video), thumbnail.map(Path::new), &metadata)
        .await;
    spinner.finish_and_clear();

    let video_id = result?;
    Output::success(&format!("Uploaded: https://www.youtube.com/watch?v={}", video_id));
    Output::kv("privacy", &metadata.privacy_status);
    Ok(())
}
