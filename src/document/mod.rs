//! PDF download and text extraction.
//!
//! Turns a document reference into a plain-text file in the data directory.
//! Every failure comes back as a descriptive error; a broken PDF never takes
//! the caller down.

use crate::error::{ReelcastError, Result};
use crate::job::safe_file_component;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Text pulled out of a document, and where it was written.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub text: String,
    pub path: PathBuf,
}

/// Downloads PDFs and writes their text to `<data_dir>/<name>.txt`.
pub struct DocumentExtractor {
    client: reqwest::Client,
    data_dir: PathBuf,
}

impl DocumentExtractor {
    pub fn new(client: reqwest::Client, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            data_dir: data_dir.into(),
        }
    }

    /// Extract text from a PDF given by URL (or local path).
    #[instrument(skip(self))]
    pub async fn extract(&self, source: &str) -> Result<ExtractedDocument> {
        let bytes = self.load(source).await?;
        debug!("Loaded {} bytes of PDF", bytes.len());

        let text = parse_pdf(bytes).await?;

        std::fs::create_dir_all(&self.data_dir)?;
        let path = self.data_dir.join(text_file_name(source));
        tokio::fs::write(&path, &text).await?;

        info!("Extracted {} characters to {}", text.len(), path.display());
        Ok(ExtractedDocument { text, path })
    }

    async fn load(&self, source: &str) -> Result<Vec<u8>> {
        if is_remote(source) {
            return self.download(source).await;
        }

        tokio::fs::read(source)
            .await
            .map_err(|e| ReelcastError::Extraction(format!("Error reading PDF {}: {}", source, e)))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let download_error = |e: String| ReelcastError::Extraction(format!("Error downloading PDF: {}", e));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(download_error(format!("{} returned {}", url, status)));
        }

        let bytes = response.bytes().await.map_err(|e| download_error(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

fn is_remote(source: &str) -> bool {
    url::Url::parse(source)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Parse PDF bytes off the async runtime. Parser panics become errors.
async fn parse_pdf(bytes: Vec<u8>) -> Result<String> {
    let parsed = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| ReelcastError::Extraction(format!("Error parsing PDF: parser aborted ({})", e)))?;

    parsed.map_err(|e| ReelcastError::Extraction(format!("Error parsing PDF: {}", e)))
}

/// Name of the text file for a document: its last path segment with `.pdf`
/// swapped for `.txt`, or `extracted.txt` when nothing usable remains.
pub fn text_file_name(source: &str) -> String {
    let segment = match url::Url::parse(source) {
        Ok(url) if is_remote(source) => url
            .path_segments()
            .and_then(|mut s| s.next_back())
            .unwrap_or_default()
            .to_string(),
        _ => Path::new(source)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
    };

    let stem = if segment.to_ascii_lowercase().ends_with(".pdf") {
        &segment[..segment.len() - 4]
    } else {
        segment.as_str()
    };

    match safe_file_component(stem) {
        s if s.is_empty() => "extracted.txt".to_string(),
        s => format!("{}.txt", s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_text_file_name() {
        assert_eq!(text_file_name("https://example.com/books/sales.pdf"), "sales.txt");
        assert_eq!(text_file_name("https://example.com/books/Sales.PDF?dl=1"), "Sales.txt");
        assert_eq!(text_file_name("https://example.com/download"), "download.txt");
        assert_eq!(text_file_name("https://example.com/"), "extracted.txt");
        assert_eq!(text_file_name("/tmp/my book.pdf"), "my_book.txt");
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://example.com/a.pdf"));
        assert!(is_remote("http://example.com/a.pdf"));
        assert!(!is_remote("/tmp/a.pdf"));
        assert!(!is_remote("file:///tmp/a.pdf"));
    }

    #[tokio::test]
    async fn test_download_failure_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.pdf");
                then.status(404);
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let extractor = DocumentExtractor::new(reqwest::Client::new(), dir.path());

        let err = extractor.extract(&server.url("/missing.pdf")).await.unwrap_err();
        assert!(err.to_string().starts_with("Error downloading PDF"));
    }

    #[tokio::test]
    async fn test_invalid_pdf_is_parse_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/broken.pdf");
                then.status(200).body("this is not a pdf");
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let extractor = DocumentExtractor::new(reqwest::Client::new(), dir.path().join("data"));

        let err = extractor.extract(&server.url("/broken.pdf")).await.unwrap_err();
        assert!(err.to_string().starts_with("Error parsing PDF"));
        assert!(!dir.path().join("data").join("broken.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = DocumentExtractor::new(reqwest::Client::new(), dir.path());

        let err = extractor
            .extract(&dir.path().join("nope.pdf").to_string_lossy())
            .await
            .unwrap_err();
        assert!(matches!(err, ReelcastError::Extraction(_)));
    }
}
