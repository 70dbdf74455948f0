//! Generate command - submit a script and wait for the video.

use super::preflight_or_hint;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::job::{ArtifactSet, GenerationRequest};
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Run the generate command.
pub async fn run_generate(
    text_file: &str,
    timeout: Option<u64>,
    settings: Settings,
    cancel: &CancellationToken,
) -> Result<()> {
    preflight_or_hint(&[Operation::Generate], &settings)?;

    let text = std::fs::read_to_string(text_file)?;
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("{} contains no text", text_file);
    }

    let interval = settings.poller.interval();
    let timeout = timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| settings.poller.timeout());

    let orchestrator = Orchestrator::new(settings)?;
    let heygen = orchestrator.heygen_settings()?;
    let poller = orchestrator.poller(&heygen)?;

    let request = GenerationRequest::from_settings(text, &heygen);
    let handle = poller.submit(&request).await?;
    Output::info(&format!("Submitted job {}", handle));
    Output::info(&format!("Resume later with: reelcast status {} --wait", handle));

    let spinner = Output::spinner(&format!("Waiting for job {}...", handle));
    let result = poller.await_completion(&handle, interval, timeout, cancel).await;
    spinner.finish_and_clear();

    print_artifacts(&result?);
    Ok(())
}

/// Print the downloaded files of a completed job.
pub(super) fn print_artifacts(artifacts: &ArtifactSet) {
    Output::success(&format!("Job {} completed", artifacts.job));
    Output::kv("video", &artifacts.video.display().to_string());
    if let Some(thumbnail) = &artifacts.thumbnail {
        Output::kv("thumbnail", &thumbnail.display().to_string());
    }
}
