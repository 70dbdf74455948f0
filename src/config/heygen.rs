//! HeyGen generation settings.
//!
//! The avatar, voice and layout selectors are read from a `heygen_settings.json`
//! file when one exists, falling back to the `[heygen]` section of the main
//! config. The API key falls back to the `HEYGEN_API_KEY` environment variable.
//! Required fields are validated up front; nothing is silently defaulted.

use super::settings::{HeygenSection, Settings};
use crate::error::{ReelcastError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable consulted when no API key is configured.
pub const HEYGEN_API_KEY_ENV: &str = "HEYGEN_API_KEY";

/// File name searched for in the config directory and the working directory.
pub const HEYGEN_SETTINGS_FILE: &str = "heygen_settings.json";

/// Raw, possibly incomplete generation selectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeygenProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl HeygenProfile {
    /// Read a profile from a JSON settings file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            ReelcastError::Config(format!("Invalid HeyGen settings file {}: {}", path.display(), e))
        })
    }

    /// Fill every unset (or blank) field from `fallback`.
    pub fn or(self, fallback: &HeygenProfile) -> Self {
        let pick = |own: Option<String>, other: &Option<String>| non_empty(own).or_else(|| other.clone());
        Self {
            avatar_id: pick(self.avatar_id, &fallback.avatar_id),
            avatar_style: pick(self.avatar_style, &fallback.avatar_style),
            voice_id: pick(self.voice_id, &fallback.voice_id),
            background_color: pick(self.background_color, &fallback.background_color),
            width: self.width.or(fallback.width),
            height: self.height.or(fallback.height),
            api_key: pick(self.api_key, &fallback.api_key),
        }
    }
}

/// Validated generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct HeygenSettings {
    pub avatar_id: String,
    pub avatar_style: String,
    pub voice_id: String,
    pub background_color: String,
    pub width: u32,
    pub height: u32,
    pub api_key: String,
}

impl HeygenSettings {
    /// Resolve settings from the JSON file (if any), the config section and the environment.
    pub fn load(section: &HeygenSection) -> Result<Self> {
        let file_profile = match locate_settings_file(section)? {
            Some(path) => {
                debug!("Loading HeyGen settings from {}", path.display());
                HeygenProfile::from_file(&path)?
            }
            None => HeygenProfile::default(),
        };

        let profile = file_profile.or(&section.profile);
        Self::from_profile(profile, std::env::var(HEYGEN_API_KEY_ENV).ok())
    }

    /// Validate a merged profile. `env_api_key` is used only when the profile has no key.
    pub fn from_profile(profile: HeygenProfile, env_api_key: Option<String>) -> Result<Self> {
        let api_key = non_empty(profile.api_key)
            .or_else(|| non_empty(env_api_key))
            .ok_or_else(|| {
                ReelcastError::ConfigurationMissing(format!(
                    "api_key (set it in {} or export {})",
                    HEYGEN_SETTINGS_FILE, HEYGEN_API_KEY_ENV
                ))
            })?;

        let avatar_id = require(profile.avatar_id, "avatar_id")?;
        let voice_id = require(profile.voice_id, "voice_id")?;

        let width = profile.width.unwrap_or(1280);
        let height = profile.height.unwrap_or(720);
        if width == 0 || height == 0 {
            return Err(ReelcastError::Config(format!(
                "Invalid output dimensions {}x{}",
                width, height
            )));
        }

        Ok(Self {
            avatar_id,
            avatar_style: non_empty(profile.avatar_style).unwrap_or_else(|| "normal".to_string()),
            voice_id,
            background_color: non_empty(profile.background_color)
                .unwrap_or_else(|| "#ffffff".to_string()),
            width,
            height,
            api_key,
        })
    }
}

/// Find the JSON settings file: explicit path first, then the standard locations.
fn locate_settings_file(section: &HeygenSection) -> Result<Option<PathBuf>> {
    if let Some(explicit) = &section.settings_file {
        let path = Settings::expand_path(explicit);
        if !path.exists() {
            return Err(ReelcastError::ConfigurationMissing(format!(
                "HeyGen settings file not found: {}",
                path.display()
            )));
        }
        return Ok(Some(path));
    }

    let candidates = [
        Settings::config_dir().join(HEYGEN_SETTINGS_FILE),
        PathBuf::from(HEYGEN_SETTINGS_FILE),
    ];

    Ok(candidates.into_iter().find(|p| p.exists()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn require(value: Option<String>, field: &str) -> Result<String> {
    non_empty(value).ok_or_else(|| ReelcastError::ConfigurationMissing(field.to_string()))
}
