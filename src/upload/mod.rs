//! YouTube upload using stored OAuth2 credentials.
//!
//! The video goes up as a single `multipart/related` request (JSON metadata
//! plus media); the thumbnail is set afterwards on the new video id.

use crate::config::YoutubeSettings;
use crate::error::{ReelcastError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// OAuth2 credentials as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredCredentials {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Overrides the configured token endpoint.
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl StoredCredentials {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ReelcastError::ConfigurationMissing(format!(
                "YouTube credentials file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            ReelcastError::Config(format!("Invalid credentials file {}: {}", path.display(), e))
        })
    }

    fn refresh_material(&self) -> Option<(&str, &str, &str)> {
        match (&self.refresh_token, &self.client_id, &self.client_secret) {
            (Some(token), Some(id), Some(secret)) if !token.is_empty() => {
                Some((token.as_str(), id.as_str(), secret.as_str()))
            }
            _ => None,
        }
    }
}

/// Metadata attached to an uploaded video.
#[derive(Debug, Clone)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy_status: String,
}

impl VideoMetadata {
    /// Metadata with the configured defaults and the given title.
    pub fn from_settings(title: &str, settings: &YoutubeSettings) -> Self {
        Self {
            title: title.to_string(),
            description: settings.description.clone(),
            tags: settings.tags.clone(),
            category_id: settings.category_id.clone(),
            privacy_status: settings.privacy_status.clone(),
        }
    }
}

/// Uploads videos and thumbnails to YouTube.
pub struct YoutubeUploader {
    client: reqwest::Client,
    base_url: String,
    token_uri: String,
    credentials: StoredCredentials,
}

impl YoutubeUploader {
    pub fn new(client: reqwest::Client, base_url: &str, token_uri: &str, credentials: StoredCredentials) -> Self {
        let token_uri = credentials
            .token_uri
            .clone()
            .unwrap_or_else(|| token_uri.to_string());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token_uri,
            credentials,
        }
    }

    pub fn from_settings(client: reqwest::Client, settings: &YoutubeSettings, credentials_path: &Path) -> Result<Self> {
        let credentials = StoredCredentials::load(credentials_path)?;
        Ok(Self::new(client, &settings.upload_base_url, &settings.token_uri, credentials))
    }

    /// Bearer token: refreshed when refresh material is stored, otherwise the stored token.
    pub async fn access_token(&self) -> Result<String> {
        if let Some((refresh_token, client_id, client_secret)) = self.credentials.refresh_material() {
            debug!("Refreshing access token via {}", self.token_uri);
            return self.refresh(refresh_token, client_id, client_secret).await;
        }

        self.credentials
            .access_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ReelcastError::ConfigurationMissing(
                    "YouTube credentials hold neither an access token nor refresh material".to_string(),
                )
            })
    }

    async fn refresh(&self, refresh_token: &str, client_id: &str, client_secret: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.token_uri)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| ReelcastError::Upload(format!("token refresh failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReelcastError::Upload(format!(
                "token refresh returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ReelcastError::Upload(format!("invalid token response: {}", e)))?;
        Ok(token.access_token)
    }

    /// Upload a video (and optionally its thumbnail). Returns the YouTube video id.
    #[instrument(skip(self, metadata), fields(video = %video.display(), title = %metadata.title))]
    pub async fn upload(&self, video: &Path, thumbnail: Option<&Path>, metadata: &VideoMetadata) -> Result<String> {
        let token = self.access_token().await?;

        let bytes = tokio::fs::read(video)
            .await
            .map_err(|e| ReelcastError::Upload(format!("Cannot read {}: {}", video.display(), e)))?;

        let video_id = self.upload_video(&token, bytes, media_type(video), metadata).await?;
        info!("Uploaded video {}", video_id);

        if let Some(thumbnail) = thumbnail {
            self.set_thumbnail(&token, &video_id, thumbnail).await?;
        } else {
            warn!("No thumbnail for video {}", video_id);
        }

        Ok(video_id)
    }

    async fn upload_video(
        &self,
        token: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: &VideoMetadata,
    ) -> Result<String> {
        let url = format!("{}/upload/youtube/v3/videos", self.base_url);
        let resource = serde_json::to_vec(&VideoResource::from(metadata))?;

        let boundary = format!("reelcast-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related(&boundary, &resource, content_type, &bytes);

        let response = self
            .client
            .post(&url)
            .query(&[("uploadType", "multipart"), ("part", "snippet,status")])
            .bearer_auth(token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| ReelcastError::Upload(format!("video upload failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReelcastError::Upload(format!("YouTube returned {}: {}", status, body)));
        }

        let uploaded: UploadedVideo = response
            .json()
            .await
            .map_err(|e| ReelcastError::Upload(format!("invalid upload response: {}", e)))?;
        Ok(uploaded.id)
    }

    async fn set_thumbnail(&self, token: &str, video_id: &str, thumbnail: &Path) -> Result<()> {
        let url = format!("{}/upload/youtube/v3/thumbnails/set", self.base_url);
        let bytes = tokio::fs::read(thumbnail)
            .await
            .map_err(|e| ReelcastError::Upload(format!("Cannot read {}: {}", thumbnail.display(), e)))?;

        let response = self
            .client
            .post(&url)
            .query(&[("videoId", video_id)])
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, media_type(thumbnail))
            .body(bytes)
            .send()
            .await
            .map_err(|e| ReelcastError::Upload(format!("thumbnail upload failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReelcastError::Upload(format!(
                "thumbnail for {} rejected ({}): {}",
                video_id, status, body
            )));
        }

        debug!("Thumbnail set for {}", video_id);
        Ok(())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UploadedVideo {
    id: String,
}

#[derive(Serialize)]
struct VideoResource<'a> {
    snippet: Snippet<'a>,
    status: Status<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Snippet<'a> {
    title: &'a str,
    description: &'a str,
    tags: &'a [String],
    category_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Status<'a> {
    privacy_status: &'a str,
}

impl<'a> From<&'a VideoMetadata> for VideoResource<'a> {
    fn from(metadata: &'a VideoMetadata) -> Self {
        Self {
            snippet: Snippet {
                title: &metadata.title,
                description: &metadata.description,
                tags: &metadata.tags,
                category_id: &metadata.category_id,
            },
            status: Status {
                privacy_status: &metadata.privacy_status,
            },
        }
    }
}

fn media_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

/// Body of a two-part `multipart/related` request: JSON metadata, then media.
fn multipart_related(boundary: &str, metadata: &[u8], media_type: &str, media: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata.len() + media.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", media_type).as_bytes());
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}
