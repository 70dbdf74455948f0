//! CLI command implementations.

mod config;
mod doctor;
mod extract;
mod generate;
mod narrate;
mod run;
mod status;
mod upload;

pub use config::run_config;
pub use doctor::run_doctor;
pub use extract::run_extract;
pub use generate::run_generate;
pub use narrate::run_narrate;
pub use run::run_pipeline;
pub use status::run_status;
pub use upload::run_upload;

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;

/// Run pre-flight checks, printing a hint when one fails.
fn preflight_or_hint(operations: &[Operation], settings: &Settings) -> anyhow::Result<()> {
    for operation in operations {
        if let Err(e) = preflight::check(*operation, settings) {
            Output::error(&format!("{}", e));
            Output::info("Run 'reelcast doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    }
    Ok(())
}
