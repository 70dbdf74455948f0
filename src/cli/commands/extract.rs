//! Extract command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the extract command.
pub async fn run_extract(source: &str, settings: Settings) -> Result<()> {
    Output::info(&format!("Extracting: {}", source));

    let orchestrator = Orchestrator::new(settings)?;
    let spinner = Output::spinner("Downloading and parsing PDF...");
    let result = orchestrator.extractor().extract(source).await;
    spinner.finish_and_clear();

    match result {
        Ok(document) => {
            Output::success(&format!(
                "Extracted {} characters to {}",
                document.text.chars().count(),
                document.path.display()
            ));
            Ok(())
        }
        Err(e) => {
            Output::error(&e.to_string());
            Err(e.into())
        }
    }
}
