//! Status command implementation.

use super::generate::print_artifacts;
use super::preflight_or_hint;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::job::{JobHandle, JobStatus};
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use tokio_util::sync::CancellationToken;

/// Run the status command.
pub async fn run_status(job_id: &str, wait: bool, settings: Settings, cancel: &CancellationToken) -> Result<()> {
    preflight_or_hint(&[Operation::Generate], &settings)?;

    let interval = settings.poller.interval();
    let timeout = settings.poller.timeout();

    let orchestrator = Orchestrator::new(settings)?;
    let heygen = orchestrator.heygen_settings()?;
    let poller = orchestrator.poller(&heygen)?;
    let handle = JobHandle::new(job_id);

    if wait {
        let spinner = Output::spinner(&format!("Waiting for job {}...", handle));
        let result = poller.await_completion(&handle, interval, timeout, cancel).await;
        spinner.finish_and_clear();
        print_artifacts(&result?);
        return Ok(());
    }

    let status = poller.poll(&handle).await?;
    Output::kv("job", handle.as_str());
    Output::kv("status", status.label());
    match &status {
        JobStatus::Completed {
            video_url,
            thumbnail_url,
        } => {
            Output::kv("video_url", video_url);
            if let Some(url) = thumbnail_url {
                Output::kv("thumbnail_url", url);
            }
        }
        JobStatus::Failed { diagnostic } => {
            Output::kv("error", diagnostic);
        }
        JobStatus::Pending | JobStatus::Processing => {}
    }

    Ok(())
}
