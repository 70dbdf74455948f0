//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration and credentials are available
//! before starting operations that would otherwise fail midway.

use crate::config::{HeygenSettings, Settings};
use crate::error::{ReelcastError, Result};
use crate::speech::TTS_API_KEY_ENV;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Video generation requires the HeyGen profile and key.
    Generate,
    /// Narration requires a text-to-speech key.
    Narrate,
    /// Upload requires stored YouTube credentials.
    Upload,
    /// Extraction has no configuration requirements.
    Extract,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Generate => {
            HeygenSettings::load(&settings.heygen)?;
        }
        Operation::Narrate => {
            check_speech_key(settings)?;
        }
        Operation::Upload => {
            check_youtube_credentials(settings)?;
        }
        Operation::Extract => {
            // Nothing beyond network access
        }
    }
    Ok(())
}

/// Check that a text-to-speech key is configured.
fn check_speech_key(settings: &Settings) -> Result<()> {
    let configured = settings
        .speech
        .api_key
        .as_deref()
        .is_some_and(|k| !k.trim().is_empty());
    let from_env = std::env::var(TTS_API_KEY_ENV).is_ok_and(|k| !k.trim().is_empty());

    if configured || from_env {
        Ok(())
    } else {
        Err(ReelcastError::ConfigurationMissing(format!(
            "speech.api_key not set. Set it in the config or with: export {}='...'",
            TTS_API_KEY_ENV
        )))
    }
}

/// Check that the YouTube credentials file exists.
fn check_youtube_credentials(settings: &Settings) -> Result<()> {
    let path = settings.youtube_credentials_path();
    if path.exists() {
        Ok(())
    } else {
        Err(ReelcastError::ConfigurationMissing(format!(
            "YouTube credentials not found at {}",
            path.display()
        )))
    }
}
