//! Narrate command implementation.

use super::preflight_or_hint;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::Path;

/// Run the narrate command.
pub async fn run_narrate(text_file: &str, voice: Option<String>, settings: Settings) -> Result<()> {
    preflight_or_hint(&[Operation::Narrate], &settings)?;

    let voice = voice.unwrap_or_else(|| settings.speech.voice.clone());
    Output::info(&format!("Narrating {} with {}", text_file, voice));

    let orchestrator = Orchestrator::new(settings)?;
    let synthesizer = orchestrator.synthesizer()?;

    let spinner = Output::spinner("Synthesizing speech...");
    let result = synthesizer.synthesize(Path::new(text_file), &voice).await;
    spinner.finish_and_clear();

    let audio = result?;
    Output::success(&format!("Audio saved to {}", audio.display()));
    Ok(())
}
