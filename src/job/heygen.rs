//! HeyGen avatar-video API client.

use super::{GenerationRequest, JobHandle, JobService, JobStatus};
use crate::config::{HeygenSection, HeygenSettings};
use crate::error::{is_transient_status, ReelcastError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Client for the HeyGen video generation and status endpoints.
pub struct HeygenClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HeygenClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReelcastError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_settings(section: &HeygenSection, settings: &HeygenSettings) -> Result<Self> {
        Self::new(
            &section.base_url,
            &settings.api_key,
            Duration::from_secs(section.request_timeout_seconds),
        )
    }

    /// The underlying HTTP client, shared with the artifact store.
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl JobService for HeygenClient {
    #[instrument(skip(self, request), fields(avatar = %request.avatar_id()))]
    async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle> {
        let url = format!("{}/v2/video/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("X-Api-Key", &self.api_key)
            .json(&GenerateBody::from(request))
            .send()
            .await
            .map_err(|e| ReelcastError::Submission(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReelcastError::Submission(format!(
                "HeyGen returned {}: {}",
                status, body
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ReelcastError::Submission(format!("invalid response: {}", e)))?;

        match parsed.data.and_then(|d| d.video_id).filter(|id| !id.is_empty()) {
            Some(id) => Ok(JobHandle::new(id)),
            None => Err(ReelcastError::Submission(format!(
                "response carried no video id{}",
                parsed
                    .error
                    .map(|e| format!(" ({})", diagnostic_text(&e)))
                    .unwrap_or_default()
            ))),
        }
    }

    #[instrument(skip(self), fields(job = %handle))]
    async fn poll(&self, handle: &JobHandle) -> Result<JobStatus> {
        let url = format!("{}/v1/video_status.get", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("video_id", handle.as_str())])
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| ReelcastError::Poll {
                message: format!("request failed: {}", e),
                transient: true,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReelcastError::Poll {
                message: format!("HeyGen returned {}: {}", status, body),
                transient: is_transient_status(status),
            });
        }

        let parsed: StatusResponse = response.json().await.map_err(|e| ReelcastError::Poll {
            message: format!("invalid response: {}", e),
            transient: false,
        })?;

        let data = parsed.data.ok_or_else(|| ReelcastError::Poll {
            message: "response carried no status data".to_string(),
            transient: false,
        })?;

        debug!("HeyGen reports status '{}'", data.status);
        data.into_status()
    }
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    video_inputs: Vec<VideoInput<'a>>,
    dimension: Dimension,
}

#[derive(Debug, Serialize)]
struct VideoInput<'a> {
    character: Character<'a>,
    voice: Voice<'a>,
    background: Background<'a>,
}

#[derive(Debug, Serialize)]
struct Character<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    avatar_id: &'a str,
    avatar_style: &'a str,
}

#[derive(Debug, Serialize)]
struct Voice<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    input_text: &'a str,
    voice_id: &'a str,
}

#[derive(Debug, Serialize)]
struct Background<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct Dimension {
    width: u32,
    height: u32,
}

impl<'a> From<&'a GenerationRequest> for GenerateBody<'a> {
    fn from(request: &'a GenerationRequest) -> Self {
        let (width, height) = request.dimensions();
        Self {
            video_inputs: vec![VideoInput {
                character: Character {
                    kind: "avatar",
                    avatar_id: request.avatar_id(),
                    avatar_style: request.avatar_style(),
                },
                voice: Voice {
                    kind: "text",
                    input_text: request.text(),
                    voice_id: request.voice_id(),
                },
                background: Background {
                    kind: "color",
                    value: request.background_color(),
                },
            }],
            dimension: Dimension { width, height },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    data: Option<GenerateData>,
}

#[derive(Debug, Deserialize)]
struct GenerateData {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    data: Option<StatusData>,
}

#[derive(Debug, Deserialize)]
struct StatusData {
    status: String,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl StatusData {
    fn into_status(self) -> Result<JobStatus> {
        match self.status.as_str() {
            "waiting" | "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => {
                let video_url = self.video_url.filter(|u| !u.is_empty()).ok_or_else(|| ReelcastError::Poll {
                    message: "completed status without a video URL".to_string(),
                    transient: false,
                })?;
                Ok(JobStatus::Completed {
                    video_url,
                    thumbnail_url: self.thumbnail_url.filter(|u| !u.is_empty()),
                })
            }
            "failed" => Ok(JobStatus::Failed {
                diagnostic: self
                    .error
                    .as_ref()
                    .map(diagnostic_text)
                    .unwrap_or_else(|| "no diagnostic provided".to_string()),
            }),
            other => Err(ReelcastError::Poll {
                message: format!("unknown job status '{}'", other),
                transient: false,
            }),
        }
    }
}

/// Human-readable text for an error payload of unknown shape.
fn diagnostic_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(map) => {
            let message = map
                .get("message")
                .or_else(|| map.get("detail"))
                .and_then(|m| m.as_str());
            let code = map.get("code").map(|c| match c {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            });
            match (code, message) {
                (Some(code), Some(message)) => format!("{}: {}", code, message),
                (None, Some(message)) => message.to_string(),
                _ => value.to_string(),
            }
        }
        serde_json::Value::Null => "no diagnostic provided".to_string(),
        other => other.to_string(),
    }
}
