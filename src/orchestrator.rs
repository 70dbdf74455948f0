//! Pipeline orchestrator for Reelcast.
//!
//! Wires settings into concrete components and assembles the
//! extract → narrate → generate → upload pipeline.

use crate::config::{HeygenSettings, Settings};
use crate::document::{text_file_name, DocumentExtractor};
use crate::error::Result;
use crate::job::{ArtifactStore, HeygenClient, JobPoller, RetryPolicy};
use crate::pipeline::{
    ExtractStep, GenerateStep, Handoff, NarrateStep, Pipeline, PipelineReport, UploadStep,
};
use crate::speech::SpeechSynthesizer;
use crate::upload::{VideoMetadata, YoutubeUploader};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Which optional steps a run includes.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Narrate the extracted text to MP3.
    pub narrate: bool,
    /// Upload the generated video to YouTube.
    pub upload: bool,
    /// Video title; derived from the document name when absent.
    pub title: Option<String>,
}

impl RunOptions {
    /// Options as configured in the settings file.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            narrate: settings.speech.enabled,
            upload: settings.youtube.enabled,
            title: None,
        }
    }
}

/// Builds Reelcast components from settings.
pub struct Orchestrator {
    settings: Settings,
    client: reqwest::Client,
}

impl Orchestrator {
    /// Create a new orchestrator. Downloads and uploads share one HTTP client.
    pub fn new(settings: Settings) -> Result<Self> {
        let client = http_client(&settings)?;
        Ok(Self { settings, client })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn extractor(&self) -> DocumentExtractor {
        DocumentExtractor::new(self.client.clone(), self.settings.data_dir())
    }

    pub fn synthesizer(&self) -> Result<SpeechSynthesizer> {
        SpeechSynthesizer::from_settings(self.client.clone(), &self.settings.speech, &self.settings.data_dir())
    }

    /// Resolve the generation settings (JSON file, config section, environment).
    pub fn heygen_settings(&self) -> Result<HeygenSettings> {
        HeygenSettings::load(&self.settings.heygen)
    }

    /// A poller bound to the HeyGen API with the configured timing and retry.
    pub fn poller(&self, heygen: &HeygenSettings) -> Result<JobPoller<HeygenClient>> {
        let service = HeygenClient::from_settings(&self.settings.heygen, heygen)?;
        let retry = RetryPolicy::from_settings(&self.settings.retry);
        let store = ArtifactStore::new(self.client.clone(), self.settings.output_dir(), retry.clone());
        Ok(JobPoller::new(service, store, &self.settings.poller).with_retry(retry))
    }

    pub fn uploader(&self) -> Result<YoutubeUploader> {
        YoutubeUploader::from_settings(
            self.client.clone(),
            &self.settings.youtube,
            &self.settings.youtube_credentials_path(),
        )
    }

    /// Metadata for an upload with the configured defaults.
    pub fn video_metadata(&self, title: &str) -> VideoMetadata {
        VideoMetadata::from_settings(title, &self.settings.youtube)
    }

    /// Assemble the pipeline for a document.
    ///
    /// All configuration is resolved up front so a missing key fails before
    /// any work starts.
    pub fn build_pipeline(&self, source: &str, options: &RunOptions) -> Result<Pipeline> {
        let heygen = self.heygen_settings()?;

        let mut pipeline = Pipeline::new().step(Arc::new(ExtractStep::new(self.extractor())));

        if options.narrate {
            pipeline = pipeline.step(Arc::new(NarrateStep::new(
                self.synthesizer()?,
                self.settings.speech.voice.clone(),
            )));
        }

        let poller = Arc::new(self.poller(&heygen)?);
        pipeline = pipeline.step(Arc::new(GenerateStep::new(poller, heygen)));

        if options.upload {
            let title = options
                .title
                .clone()
                .unwrap_or_else(|| default_title(source));
            pipeline = pipeline.step(Arc::new(UploadStep::new(
                self.uploader()?,
                self.video_metadata(&title),
            )));
        }

        Ok(pipeline)
    }

    /// Run the full pipeline for a document URL.
    #[instrument(skip(self, options, cancel))]
    pub async fn run(&self, source: &str, options: &RunOptions, cancel: &CancellationToken) -> Result<PipelineReport> {
        let pipeline = self.build_pipeline(source, options)?;
        info!("Running pipeline: {}", pipeline.step_names().join(" -> "));
        Ok(pipeline.run(Handoff::new(source), cancel).await)
    }
}

/// HTTP client for downloads and uploads, bounded by the configured request timeout.
pub fn http_client(settings: &Settings) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .timeout(settings.request_timeout())
        .build()?)
}

/// Title derived from a document reference, e.g. `sales_report` for `.../sales_report.pdf`.
pub fn default_title(source: &str) -> String {
    let name = text_file_name(source);
    name.trim_end_matches(".txt").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeygenSection;

    fn settings_with_profile(dir: &std::path::Path) -> Settings {
        let mut settings = Settings::default();
        settings.general.data_dir = dir.join("data").to_string_lossy().to_string();
        settings.general.output_dir = dir.join("out").to_string_lossy().to_string();

        let profile_path = dir.join("heygen_settings.json");
        std::fs::write(
            &profile_path,
            r#"{"avatar_id": "A1", "voice_id": "V1", "api_key": "key"}"#,
        )
        .unwrap();
        settings.heygen = HeygenSection {
            settings_file: Some(profile_path.to_string_lossy().to_string()),
            ..HeygenSection::default()
        };
        settings
    }

    #[test]
    fn test_default_title() {
        assert_eq!(default_title("https://example.com/docs/sales_report.pdf"), "sales_report");
        assert_eq!(default_title("https://example.com/"), "extracted");
    }

    #[test]
    fn test_pipeline_without_optional_steps() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(settings_with_profile(dir.path())).unwrap();

        let options = RunOptions {
            narrate: false,
            upload: false,
            title: None,
        };
        let pipeline = orchestrator
            .build_pipeline("https://example.com/a.pdf", &options)
            .unwrap();
        assert_eq!(pipeline.step_names(), vec!["extract", "generate"]);
    }

    #[test]
    fn test_upload_requires_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_with_profile(dir.path());
        settings.youtube.credentials_path = dir.path().join("missing.json").to_string_lossy().to_string();
        let orchestrator = Orchestrator::new(settings).unwrap();

        let options = RunOptions {
            narrate: false,
            upload: true,
            title: Some("Title".to_string()),
        };
        let err = orchestrator
            .build_pipeline("https://example.com/a.pdf", &options)
            .err()
            .unwrap();
        assert!(matches!(err, crate::ReelcastError::ConfigurationMissing(_)));
    }

    #[tokio::test]
    async fn test_stalled_download_hits_request_timeout() {
        let silent = crate::test_support::silent_server().await;
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_with_profile(dir.path());
        settings.general.request_timeout_seconds = 1;
        let orchestrator = Orchestrator::new(settings).unwrap();

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            orchestrator.extractor().extract(&format!("{}/doc.pdf", silent)),
        )
        .await
        .expect("request timeout must end the download")
        .unwrap_err();

        assert!(matches!(err, crate::ReelcastError::Extraction(_)));
        assert!(err.to_string().starts_with("Error downloading PDF"));
    }

    #[test]
    fn test_full_pipeline_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_with_profile(dir.path());
        settings.speech.api_key = Some("tts".to_string());

        let credentials = dir.path().join("yt.json");
        std::fs::write(&credentials, r#"{"access_token": "t"}"#).unwrap();
        settings.youtube.credentials_path = credentials.to_string_lossy().to_string();

        let orchestrator = Orchestrator::new(settings).unwrap();
        let options = RunOptions {
            narrate: true,
            upload: true,
            title: None,
        };
        let pipeline = orchestrator
            .build_pipeline("https://example.com/a.pdf", &options)
            .unwrap();
        assert_eq!(pipeline.step_names(), vec!["extract", "narrate", "generate", "upload"]);
    }
}
