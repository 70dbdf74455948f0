//! Configuration settings for Reelcast.

use super::heygen::HeygenProfile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub heygen: HeygenSection,
    pub poller: PollerSettings,
    pub retry: RetrySettings,
    pub speech: SpeechSettings,
    pub youtube: YoutubeSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for extracted text and narration audio.
    pub data_dir: String,
    /// Directory for downloaded video artifacts.
    pub output_dir: String,
    /// Log level used when no `-v` flag is given (trace, debug, info, warn, error).
    pub log_level: String,
    /// Overall limit for a single HTTP request (downloads and uploads).
    pub request_timeout_seconds: u64,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.reelcast/data".to_string(),
            output_dir: "~/.reelcast/output".to_string(),
            log_level: "warn".to_string(),
            request_timeout_seconds: 900,
        }
    }
}

/// HeyGen API settings.
///
/// The avatar/voice selectors may live here or in a separate JSON
/// settings file; the file wins field by field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeygenSection {
    /// API base URL.
    pub base_url: String,
    /// Explicit path to a `heygen_settings.json` file.
    pub settings_file: Option<String>,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_seconds: u64,
    #[serde(flatten)]
    pub profile: HeygenProfile,
}

impl Default for HeygenSection {
    fn default() -> Self {
        Self {
            base_url: "https://api.heygen.com".to_string(),
            settings_file: None,
            request_timeout_seconds: 60,
            profile: HeygenProfile::default(),
        }
    }
}

/// Remote job polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerSettings {
    /// Delay between status checks.
    pub interval_seconds: u64,
    /// Give up on a job after this long.
    pub timeout_seconds: u64,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval_seconds: 10,
            timeout_seconds: 1200, // 20 minutes
        }
    }
}

impl PollerSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Retry settings for transient network faults on status checks and downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum retries after the first attempt.
    pub max_retries: u32,
    /// Initial backoff in milliseconds (doubles each retry).
    pub base_delay_ms: u64,
    /// Backoff ceiling in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
        }
    }
}

/// Text-to-speech settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// Narrate the extracted text as part of `run`.
    pub enabled: bool,
    /// Google Cloud Text-to-Speech base URL.
    pub base_url: String,
    /// API key (falls back to GOOGLE_TTS_API_KEY).
    pub api_key: Option<String>,
    /// Voice name.
    pub voice: String,
    /// BCP-47 language code.
    pub language_code: String,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://texttospeech.googleapis.com".to_string(),
            api_key: None,
            voice: "en-US-Neural2-F".to_string(),
            language_code: "en-US".to_string(),
        }
    }
}

/// YouTube upload settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeSettings {
    /// Upload the generated video as part of `run`.
    pub enabled: bool,
    /// Stored OAuth2 credentials (JSON).
    pub credentials_path: String,
    /// Base URL for the upload API.
    pub upload_base_url: String,
    /// OAuth2 token endpoint used when refreshing.
    pub token_uri: String,
    /// private, unlisted or public.
    pub privacy_status: String,
    /// YouTube category id (27 = Education).
    pub category_id: String,
    /// Description used when none is given.
    pub description: String,
    /// Tags applied to every upload.
    pub tags: Vec<String>,
}

impl Default for YoutubeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            credentials_path: "~/.reelcast/youtube_credentials.json".to_string(),
            upload_base_url: "https://www.googleapis.com".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            privacy_status: "private".to_string(),
            category_id: "27".to_string(),
            description: String::new(),
            tags: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ReelcastError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Directory holding Reelcast configuration files.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reelcast")
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded artifact output directory path.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }

    /// Overall per-request HTTP timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.general.request_timeout_seconds)
    }

    /// Get the expanded YouTube credentials path.
    pub fn youtube_credentials_path(&self) -> PathBuf {
        Self::expand_path(&self.youtube.credentials_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.poller.interval(), Duration::from_secs(10));
        assert_eq!(settings.poller.timeout(), Duration::from_secs(1200));
        assert_eq!(settings.retry.max_retries, 3);
        assert_eq!(settings.speech.voice, "en-US-Neural2-F");
        assert!(!settings.speech.enabled);
        assert_eq!(settings.youtube.privacy_status, "private");
        assert_eq!(settings.general.log_level, "warn");
        assert_eq!(settings.request_timeout(), Duration::from_secs(900));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [poller]
            interval_seconds = 5

            [heygen]
            avatar_id = "A1"
            width = 1920
            "#,
        )
        .unwrap();

        assert_eq!(settings.poller.interval_seconds, 5);
        assert_eq!(settings.poller.timeout_seconds, 1200);
        assert_eq!(settings.heygen.base_url, "https://api.heygen.com");
        assert_eq!(settings.heygen.profile.avatar_id.as_deref(), Some("A1"));
        assert_eq!(settings.heygen.profile.width, Some(1920));
        assert_eq!(settings.heygen.profile.voice_id, None);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.general.output_dir = "/tmp/reelcast-out".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.general.output_dir, "/tmp/reelcast-out");
        assert_eq!(loaded.output_dir(), PathBuf::from("/tmp/reelcast-out"));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Settings::load_from(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(loaded.poller.interval_seconds, 10);
    }
}
