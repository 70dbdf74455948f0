//! Run command - the whole document-to-video pipeline.

use super::preflight_or_hint;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, RunOptions};
use anyhow::Result;
use tokio_util::sync::CancellationToken;

/// Run the pipeline command.
pub async fn run_pipeline(
    source: &str,
    narrate: bool,
    no_narrate: bool,
    no_upload: bool,
    title: Option<String>,
    settings: Settings,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut options = RunOptions::from_settings(&settings);
    if narrate {
        options.narrate = true;
    }
    if no_narrate {
        options.narrate = false;
    }
    if no_upload {
        options.upload = false;
    }
    options.title = title;

    let mut operations = vec![Operation::Generate];
    if options.narrate {
        operations.push(Operation::Narrate);
    }
    if options.upload {
        operations.push(Operation::Upload);
    }
    preflight_or_hint(&operations, &settings)?;

    Output::info(&format!("Processing: {}", source));

    let orchestrator = Orchestrator::new(settings)?;
    let spinner = Output::spinner("Running pipeline (video generation can take several minutes)...");
    let report = orchestrator.run(source, &options, cancel).await;
    spinner.finish_and_clear();
    let report = report?;

    Output::header("Pipeline");
    for step in &report.steps {
        Output::step(step);
    }
    println!();

    if report.cancelled {
        Output::warning("Cancelled; no artifacts were kept for the interrupted step.");
        anyhow::bail!("pipeline cancelled");
    }

    if let Some(failed) = report.failure() {
        Output::error(&format!("Step '{}' failed.", failed.name));
        anyhow::bail!("pipeline stopped at step '{}'", failed.name);
    }

    if let Some(output) = &report.output {
        Output::success(&format!("Done: {}", output.primary));
        for (name, path) in &output.attachments {
            Output::kv(name, &path.display().to_string());
        }
    }

    Ok(())
}
