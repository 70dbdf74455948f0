//! Remote job submission, polling and artifact download.
//!
//! A remote generation job moves through `pending`/`processing` to exactly one
//! terminal status. [`JobPoller`] drives a [`JobService`] until that happens,
//! bounded by a timeout and a cancellation token, and on success downloads the
//! produced artifacts all-or-nothing through an [`ArtifactStore`].

mod artifacts;
mod heygen;
mod poller;
mod retry;

pub use artifacts::{artifact_file_name, safe_file_component, ArtifactKind, ArtifactStore};
pub use heygen::HeygenClient;
pub use poller::JobPoller;
pub use retry::RetryPolicy;

use crate::config::HeygenSettings;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single video generation request. Built once, never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    text: String,
    avatar_id: String,
    avatar_style: String,
    voice_id: String,
    background_color: String,
    width: u32,
    height: u32,
}

impl GenerationRequest {
    /// Create a request with default style, white background and 1280x720 output.
    pub fn new(text: impl Into<String>, avatar_id: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            avatar_id: avatar_id.into(),
            avatar_style: "normal".to_string(),
            voice_id: voice_id.into(),
            background_color: "#ffffff".to_string(),
            width: 1280,
            height: 720,
        }
    }

    /// Create a request using the configured selectors.
    pub fn from_settings(text: impl Into<String>, settings: &HeygenSettings) -> Self {
        Self {
            text: text.into(),
            avatar_id: settings.avatar_id.clone(),
            avatar_style: settings.avatar_style.clone(),
            voice_id: settings.voice_id.clone(),
            background_color: settings.background_color.clone(),
            width: settings.width,
            height: settings.height,
        }
    }

    pub fn with_style(self, avatar_style: impl Into<String>) -> Self {
        Self {
            avatar_style: avatar_style.into(),
            ..self
        }
    }

    pub fn with_background(self, color: impl Into<String>) -> Self {
        Self {
            background_color: color.into(),
            ..self
        }
    }

    pub fn with_dimensions(self, width: u32, height: u32) -> Self {
        Self { width, height, ..self }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn avatar_id(&self) -> &str {
        &self.avatar_id
    }

    pub fn avatar_style(&self) -> &str {
        &self.avatar_style
    }

    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    pub fn background_color(&self) -> &str {
        &self.background_color
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Identifier the remote service assigned to a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a remote job as reported by one poll.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed {
        video_url: String,
        thumbnail_url: Option<String>,
    },
    Failed {
        diagnostic: String,
    },
}

impl JobStatus {
    /// Terminal statuses never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed { .. } | JobStatus::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed { .. } => "completed",
            JobStatus::Failed { .. } => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Artifacts downloaded for a completed job.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSet {
    /// Job the artifacts belong to.
    pub job: JobHandle,
    /// Local path of the video.
    pub video: PathBuf,
    /// Local path of the thumbnail, when the service offered one.
    pub thumbnail: Option<PathBuf>,
}

impl ArtifactSet {
    /// All local files in this set.
    pub fn paths(&self) -> Vec<&PathBuf> {
        std::iter::once(&self.video).chain(self.thumbnail.iter()).collect()
    }
}

/// A remote service that runs generation jobs asynchronously.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Submit a request. Not idempotent; callers must not retry it blindly.
    async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle>;

    /// Fetch the current status of a job. A remote failure is a status, not an error.
    async fn poll(&self, handle: &JobHandle) -> Result<JobStatus>;
}
