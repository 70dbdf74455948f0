//! Built-in pipeline steps.

use super::{until_cancelled, Handoff, Step};
use crate::config::HeygenSettings;
use crate::document::DocumentExtractor;
use crate::error::{ReelcastError, Result};
use crate::job::{GenerationRequest, JobPoller, JobService};
use crate::speech::SpeechSynthesizer;
use crate::upload::{VideoMetadata, YoutubeUploader};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Document URL → extracted text file.
pub struct ExtractStep {
    extractor: DocumentExtractor,
}

impl ExtractStep {
    pub fn new(extractor: DocumentExtractor) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl Step for ExtractStep {
    fn name(&self) -> &str {
        "extract"
    }

    async fn run(&self, input: Handoff, cancel: &CancellationToken) -> Result<Handoff> {
        let document = until_cancelled(cancel, self.extractor.extract(&input.primary)).await?;
        Ok(input.with_primary(document.path.to_string_lossy()))
    }
}

/// Text file → MP3 narration. Passes the text file through and attaches `audio`.
pub struct NarrateStep {
    synthesizer: SpeechSynthesizer,
    voice: String,
}

impl NarrateStep {
    pub fn new(synthesizer: SpeechSynthesizer, voice: impl Into<String>) -> Self {
        Self {
            synthesizer,
            voice: voice.into(),
        }
    }
}

#[async_trait]
impl Step for NarrateStep {
    fn name(&self) -> &str {
        "narrate"
    }

    async fn run(&self, input: Handoff, cancel: &CancellationToken) -> Result<Handoff> {
        let audio = until_cancelled(
            cancel,
            self.synthesizer.synthesize(input.primary_path(), &self.voice),
        )
        .await?;
        Ok(input.attach("audio", audio))
    }
}

/// Text file → avatar video, with the thumbnail attached as `thumbnail`.
pub struct GenerateStep<S> {
    poller: Arc<JobPoller<S>>,
    settings: HeygenSettings,
}

impl<S: JobService> GenerateStep<S> {
    pub fn new(poller: Arc<JobPoller<S>>, settings: HeygenSettings) -> Self {
        Self { poller, settings }
    }
}

#[async_trait]
impl<S: JobService + 'static> Step for GenerateStep<S> {
    fn name(&self) -> &str {
        "generate"
    }

    async fn run(&self, input: Handoff, cancel: &CancellationToken) -> Result<Handoff> {
        let text = tokio::fs::read_to_string(input.primary_path()).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ReelcastError::InvalidInput(format!(
                "{} contains no text to narrate",
                input.primary
            )));
        }

        let request = GenerationRequest::from_settings(text, &self.settings);
        let artifacts = self.poller.run(&request, cancel).await?;

        let mut next = input.with_primary(artifacts.video.to_string_lossy());
        if let Some(thumbnail) = artifacts.thumbnail {
            next = next.attach("thumbnail", thumbnail);
        }
        Ok(next)
    }
}

/// Video file (+ `thumbnail` attachment) → YouTube video id.
pub struct UploadStep {
    uploader: YoutubeUploader,
    metadata: VideoMetadata,
}

impl UploadStep {
    pub fn new(uploader: YoutubeUploader, metadata: VideoMetadata) -> Self {
        Self { uploader, metadata }
    }
}

#[async_trait]
impl Step for UploadStep {
    fn name(&self) -> &str {
        "upload"
    }

    async fn run(&self, input: Handoff, cancel: &CancellationToken) -> Result<Handoff> {
        let video_id = until_cancelled(
            cancel,
            self.uploader
                .upload(input.primary_path(), input.attachment("thumbnail"), &self.metadata),
        )
        .await?;
        Ok(input.with_primary(video_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PollerSettings, YoutubeSettings};
    use crate::job::{ArtifactStore, JobHandle, JobStatus, RetryPolicy};
    use crate::upload::StoredCredentials;
    use httpmock::prelude::*;
    use std::sync::Mutex;

    /// Records the submitted text and completes on the first poll.
    struct InstantService {
        video_url: String,
        submitted: Mutex<Option<String>>,
    }

    #[async_trait]
    impl JobService for InstantService {
        async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle> {
            *self.submitted.lock().unwrap() = Some(request.text().to_string());
            Ok(JobHandle::new("job-7"))
        }

        async fn poll(&self, _handle: &JobHandle) -> Result<JobStatus> {
            Ok(JobStatus::Completed {
                video_url: self.video_url.clone(),
                thumbnail_url: None,
            })
        }
    }

    fn heygen_settings() -> HeygenSettings {
        HeygenSettings {
            avatar_id: "A1".to_string(),
            avatar_style: "normal".to_string(),
            voice_id: "V1".to_string(),
            background_color: "#ffffff".to_string(),
            width: 1280,
            height: 720,
            api_key: "k".to_string(),
        }
    }

    #[tokio::test]
    async fn test_generate_step_reads_text_and_returns_video() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v.mp4");
                then.status(200).body("VIDEO");
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let text_path = dir.path().join("doc.txt");
        std::fs::write(&text_path, "  hello world \n").unwrap();

        let service = InstantService {
            video_url: server.url("/v.mp4"),
            submitted: Mutex::new(None),
        };
        let store = ArtifactStore::new(reqwest::Client::new(), dir.path().join("out"), RetryPolicy::none());
        let poller = Arc::new(JobPoller::new(service, store, &PollerSettings::default()));
        let step = GenerateStep::new(poller.clone(), heygen_settings());

        let out = step
            .run(Handoff::new(text_path.to_string_lossy()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            poller.service().submitted.lock().unwrap().as_deref(),
            Some("hello world")
        );
        assert_eq!(std::fs::read_to_string(out.primary_path()).unwrap(), "VIDEO");
        assert!(out.attachment("thumbnail").is_none());
    }

    #[tokio::test]
    async fn test_generate_step_rejects_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        let text_path = dir.path().join("empty.txt");
        std::fs::write(&text_path, "\n\n").unwrap();

        let service = InstantService {
            video_url: "http://127.0.0.1:9/v.mp4".to_string(),
            submitted: Mutex::new(None),
        };
        let store = ArtifactStore::new(reqwest::Client::new(), dir.path(), RetryPolicy::none());
        let poller = Arc::new(JobPoller::new(service, store, &PollerSettings::default()));
        let step = GenerateStep::new(poller.clone(), heygen_settings());

        let err = step
            .run(Handoff::new(text_path.to_string_lossy()), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ReelcastError::InvalidInput(_)));
        assert!(poller.service().submitted.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_extract_step_failure_is_descriptive() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/doc.pdf");
                then.status(500);
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let step = ExtractStep::new(DocumentExtractor::new(reqwest::Client::new(), dir.path()));

        let err = step
            .run(Handoff::new(server.url("/doc.pdf")), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Error downloading PDF"));
    }

    #[tokio::test]
    async fn test_extract_step_stops_when_cancelled() {
        let silent = crate::test_support::silent_server().await;
        let dir = tempfile::tempdir().unwrap();
        let step = ExtractStep::new(DocumentExtractor::new(reqwest::Client::new(), dir.path()));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            step.run(Handoff::new(format!("{}/doc.pdf", silent)), &cancel),
        )
        .await
        .expect("extract must stop once cancelled");

        assert!(matches!(result, Err(ReelcastError::Cancelled)));
    }

    #[tokio::test]
    async fn test_narrate_step_attaches_audio() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/text:synthesize");
                then.status(200).json_body(serde_json::json!({"audioContent": "SUQz"}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let text_path = dir.path().join("doc.txt");
        std::fs::write(&text_path, "Read me.").unwrap();

        let synthesizer = SpeechSynthesizer::new(reqwest::Client::new(), &server.base_url(), "k", "en-US", dir.path());
        let step = NarrateStep::new(synthesizer, "en-US-Neural2-F");

        let out = step
            .run(Handoff::new(text_path.to_string_lossy()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out.primary_path(), text_path.as_path());
        assert_eq!(out.attachment("audio"), Some(dir.path().join("doc.mp3").as_path()));
        assert_eq!(std::fs::read(dir.path().join("doc.mp3")).unwrap(), b"ID3");
    }

    #[tokio::test]
    async fn test_upload_step_returns_video_id() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/upload/youtube/v3/videos");
                then.status(200).json_body(serde_json::json!({"id": "yt-9"}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("video.mp4");
        std::fs::write(&video, "VIDEO").unwrap();

        let uploader = YoutubeUploader::new(
            reqwest::Client::new(),
            &server.base_url(),
            &server.url("/token"),
            StoredCredentials {
                access_token: Some("t".into()),
                ..Default::default()
            },
        );
        let metadata = VideoMetadata::from_settings("Title", &YoutubeSettings::default());
        let step = UploadStep::new(uploader, metadata);

        let out = step
            .run(Handoff::new(video.to_string_lossy()), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.primary, "yt-9");
    }
}
