//! Text-to-speech narration via the Google Cloud Text-to-Speech REST API.

use crate::config::SpeechSettings;
use crate::error::{ReelcastError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Environment variable consulted when no API key is configured.
pub const TTS_API_KEY_ENV: &str = "GOOGLE_TTS_API_KEY";

/// The synthesize endpoint rejects inputs above 5000 bytes.
const MAX_REQUEST_BYTES: usize = 4500;

/// Converts text files into MP3 narration.
pub struct SpeechSynthesizer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    language_code: String,
    data_dir: PathBuf,
}

impl SpeechSynthesizer {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: &str,
        language_code: &str,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            language_code: language_code.to_string(),
            data_dir: data_dir.into(),
        }
    }

    /// Build a synthesizer from settings, falling back to `GOOGLE_TTS_API_KEY`.
    pub fn from_settings(client: reqwest::Client, settings: &SpeechSettings, data_dir: &Path) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .or_else(|| std::env::var(TTS_API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ReelcastError::ConfigurationMissing(format!(
                    "speech.api_key (or export {})",
                    TTS_API_KEY_ENV
                ))
            })?;

        Ok(Self::new(
            client,
            &settings.base_url,
            &api_key,
            &settings.language_code,
            data_dir,
        ))
    }

    /// Narrate a text file; the MP3 is written next to other data as `<stem>.mp3`.
    #[instrument(skip(self), fields(text_path = %text_path.display()))]
    pub async fn synthesize(&self, text_path: &Path, voice: &str) -> Result<PathBuf> {
        let text = tokio::fs::read_to_string(text_path)
            .await
            .map_err(|e| ReelcastError::Speech(format!("Cannot read {}: {}", text_path.display(), e)))?;

        if text.trim().is_empty() {
            return Err(ReelcastError::Speech(format!("{} is empty", text_path.display())));
        }

        let pieces = split_for_synthesis(&text, MAX_REQUEST_BYTES);
        debug!("Synthesizing {} piece(s)", pieces.len());

        let mut audio = Vec::new();
        for piece in &pieces {
            audio.extend(self.synthesize_piece(piece, voice).await?);
        }

        std::fs::create_dir_all(&self.data_dir)?;
        let stem = text_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "narration".to_string());
        let audio_path = self.data_dir.join(format!("{}.mp3", stem));
        tokio::fs::write(&audio_path, &audio).await?;

        info!("Wrote {} bytes of audio to {}", audio.len(), audio_path.display());
        Ok(audio_path)
    }

    async fn synthesize_piece(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        let url = format!("{}/v1/text:synthesize", self.base_url);
        let body = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &self.language_code,
                name: voice,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ReelcastError::Speech(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReelcastError::Speech(format!("TTS returned {}: {}", status, body)));
        }

        let parsed: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| ReelcastError::Speech(format!("invalid response: {}", e)))?;

        base64::engine::general_purpose::STANDARD
            .decode(parsed.audio_content)
            .map_err(|e| ReelcastError::Speech(format!("invalid audio payload: {}", e)))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// Split text into pieces of at most `max_bytes`, preferring sentence and
/// word boundaries. Words longer than the limit are cut at char boundaries.
pub fn split_for_synthesis(text: &str, max_bytes: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for sentence in text.split_inclusive(['.', '!', '?', '\n']) {
        if current.len() + sentence.len() <= max_bytes {
            current.push_str(sentence);
            continue;
        }

        if !current.trim().is_empty() {
            pieces.push(std::mem::take(&mut current));
        }
        current.clear();

        if sentence.len() <= max_bytes {
            current.push_str(sentence);
            continue;
        }

        for word in sentence.split_inclusive(' ') {
            if current.len() + word.len() > max_bytes && !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            if word.len() <= max_bytes {
                current.push_str(word);
                continue;
            }
            for ch in word.chars() {
                if current.len() + ch.len_utf8() > max_bytes {
                    pieces.push(std::mem::take(&mut current));
                }
                current.push(ch);
            }
        }
    }

    if !current.trim().is_empty() {
        pieces.push(current);
    }

    pieces
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}
