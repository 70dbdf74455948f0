//! Local storage for downloaded job artifacts.

use super::{ArtifactSet, JobHandle, RetryPolicy};
use crate::error::{is_transient_status, ReelcastError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

/// Kind of artifact a completed job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Video,
    Thumbnail,
}

impl ArtifactKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            ArtifactKind::Video => "video",
            ArtifactKind::Thumbnail => "thumbnail",
        }
    }

    /// Extension used when the URL does not carry one.
    pub fn default_extension(&self) -> &'static str {
        match self {
            ArtifactKind::Video => "mp4",
            ArtifactKind::Thumbnail => "jpg",
        }
    }
}

/// Replace anything outside `[A-Za-z0-9._-]` so the value is safe in a file name.
pub fn safe_file_component(value: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let unsafe_chars = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid regex"));
    unsafe_chars
        .replace_all(value, "_")
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

/// Deterministic artifact name: `<kind>_<timestamp>_<job>.<ext>`.
///
/// The job id keeps names from two jobs finishing in the same second apart.
pub fn artifact_file_name(kind: ArtifactKind, job: &JobHandle, at: DateTime<Utc>, ext: &str) -> String {
    let job_part = match safe_file_component(job.as_str()) {
        s if s.is_empty() => "job".to_string(),
        s => s,
    };
    format!("{}_{}_{}.{}", kind.prefix(), at.format("%Y%m%d_%H%M%S"), job_part, ext)
}

/// File extension from the last path segment of a URL, if it looks like one.
fn extension_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.next_back()?.to_string();
    let ext = Path::new(&segment).extension()?.to_str()?.to_ascii_lowercase();

    if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext)
    } else {
        None
    }
}

/// Downloads artifacts into an output directory, all-or-nothing.
pub struct ArtifactStore {
    client: reqwest::Client,
    output_dir: PathBuf,
    retry: RetryPolicy,
}

impl ArtifactStore {
    pub fn new(client: reqwest::Client, output_dir: impl Into<PathBuf>, retry: RetryPolicy) -> Self {
        Self {
            client,
            output_dir: output_dir.into(),
            retry,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Download the artifacts of a completed job.
    ///
    /// Both downloads land in temporary files first; final names appear only
    /// once every download succeeded. On failure nothing is left behind.
    #[instrument(skip(self), fields(job = %job))]
    pub async fn store(
        &self,
        job: &JobHandle,
        video_url: &str,
        thumbnail_url: Option<&str>,
    ) -> Result<ArtifactSet> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| ReelcastError::ArtifactDownload {
                message: format!("Cannot create {}: {}", self.output_dir.display(), e),
                transient: false,
            })?;

        let thumbnail = async {
            match thumbnail_url {
                Some(url) => self.fetch_to_temp(url).await.map(Some),
                None => Ok(None),
            }
        };

        let (video_tmp, thumbnail_tmp) =
            futures::future::try_join(self.fetch_to_temp(video_url), thumbnail).await?;

        let now = Utc::now();
        let video_path = self.output_dir.join(artifact_file_name(
            ArtifactKind::Video,
            job,
            now,
            &extension_from_url(video_url).unwrap_or_else(|| ArtifactKind::Video.default_extension().into()),
        ));

        persist(video_tmp, &video_path)?;

        let thumbnail_path = match (thumbnail_tmp, thumbnail_url) {
            (Some(tmp), Some(url)) => {
                let path = self.output_dir.join(artifact_file_name(
                    ArtifactKind::Thumbnail,
                    job,
                    now,
                    &extension_from_url(url)
                        .unwrap_or_else(|| ArtifactKind::Thumbnail.default_extension().into()),
                ));
                if let Err(e) = persist(tmp, &path) {
                    if let Err(cleanup) = std::fs::remove_file(&video_path) {
                        warn!("Failed to remove {}: {}", video_path.display(), cleanup);
                    }
                    return Err(e);
                }
                Some(path)
            }
            _ => None,
        };

        info!("Stored artifacts for job {} in {}", job, self.output_dir.display());

        Ok(ArtifactSet {
            job: job.clone(),
            video: video_path,
            thumbnail: thumbnail_path,
        })
    }

    /// Download a URL into a temporary file inside the output directory.
    async fn fetch_to_temp(&self, url: &str) -> Result<NamedTempFile> {
        self.retry.run("artifact download", || self.fetch_once(url)).await
    }

    async fn fetch_once(&self, url: &str) -> Result<NamedTempFile> {
        let response = self.client.get(url).send().await.map_err(|e| ReelcastError::ArtifactDownload {
            message: format!("{}: {}", url, e),
            transient: true,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReelcastError::ArtifactDownload {
                message: format!("{} returned {}", url, status),
                transient: is_transient_status(status),
            });
        }

        let bytes = response.bytes().await.map_err(|e| ReelcastError::ArtifactDownload {
            message: format!("{}: {}", url, e),
            transient: true,
        })?;
        let len = bytes.len();

        // The temp file is deleted on drop, including when the task result is discarded.
        let dir = self.output_dir.clone();
        let source = url.to_string();
        let file = tokio::task::spawn_blocking(move || -> Result<NamedTempFile> {
            let mut file = NamedTempFile::new_in(&dir).map_err(|e| write_error(&source, e))?;
            file.write_all(&bytes).map_err(|e| write_error(&source, e))?;
            file.flush().map_err(|e| write_error(&source, e))?;
            Ok(file)
        })
        .await
        .map_err(|e| ReelcastError::ArtifactDownload {
            message: format!("Cannot save {}: writer aborted ({})", url, e),
            transient: false,
        })??;

        debug!("Downloaded {} bytes from {}", len, url);
        Ok(file)
    }
}

fn persist(tmp: NamedTempFile, path: &Path) -> Result<()> {
    tmp.persist(path).map_err(|e| ReelcastError::ArtifactDownload {
        message: format!("Cannot write {}: {}", path.display(), e.error),
        transient: false,
    })?;
    Ok(())
}

fn write_error(url: &str, e: std::io::Error) -> ReelcastError {
    ReelcastError::ArtifactDownload {
        message: format!("Cannot save {}: {}", url, e),
        transient: false,
    }
}
