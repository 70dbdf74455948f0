//! Drives a remote job from submission to a terminal outcome.

use super::{ArtifactSet, ArtifactStore, GenerationRequest, JobHandle, JobService, JobStatus, RetryPolicy};
use crate::config::PollerSettings;
use crate::error::{ReelcastError, Result};
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Submits jobs, waits for them and collects their artifacts.
pub struct JobPoller<S> {
    service: S,
    store: ArtifactStore,
    retry: RetryPolicy,
    interval: Duration,
    timeout: Duration,
}

impl<S: JobService> JobPoller<S> {
    /// Create a poller using the configured interval and timeout.
    pub fn new(service: S, store: ArtifactStore, settings: &PollerSettings) -> Self {
        Self {
            service,
            store,
            retry: RetryPolicy::default(),
            interval: settings.interval(),
            timeout: settings.timeout(),
        }
    }

    /// Set the retry policy used for status checks.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Submit a request. Rejections are returned as-is and never retried.
    pub async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle> {
        let handle = self.service.submit(request).await?;
        info!("Submitted job {}", handle);
        Ok(handle)
    }

    /// Check a job's status once, retrying transient faults.
    pub async fn poll(&self, handle: &JobHandle) -> Result<JobStatus> {
        self.retry
            .run("status check", || self.service.poll(handle))
            .await
    }

    /// Submit a request and wait for its artifacts with the configured timing.
    pub async fn run(&self, request: &GenerationRequest, cancel: &CancellationToken) -> Result<ArtifactSet> {
        let handle = self.submit(request).await?;
        self.await_completion(&handle, self.interval, self.timeout, cancel)
            .await
    }

    /// Poll until the job reaches a terminal status, then download its artifacts.
    ///
    /// Sleeps `interval` between checks. Once `timeout` has elapsed no further
    /// poll is issued and [`ReelcastError::PollTimeout`] is returned; the deadline
    /// also bounds the artifact download. A cancelled token aborts the wait, or
    /// an in-flight download, without leaving files.
    #[instrument(skip(self, cancel), fields(job = %handle))]
    pub async fn await_completion(
        &self,
        handle: &JobHandle,
        interval: Duration,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ArtifactSet> {
        let started = Instant::now();
        // Effectively unbounded when the timeout overflows the clock.
        let deadline = started
            .checked_add(timeout)
            .unwrap_or_else(|| started + Duration::from_secs(60 * 60 * 24 * 365));
        let timed_out = || ReelcastError::PollTimeout {
            job: handle.to_string(),
            waited: started.elapsed(),
        };

        let mut polls = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(ReelcastError::Cancelled);
            }
            if Instant::now() >= deadline {
                warn!("Giving up on job {} after {} polls", handle, polls);
                return Err(timed_out());
            }

            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ReelcastError::Cancelled),
                _ = sleep_until(deadline) => return Err(timed_out()),
                status = self.poll(handle) => status?,
            };
            polls += 1;
            debug!("Poll {}: job {} is {}", polls, handle, status);

            match status {
                JobStatus::Completed {
                    video_url,
                    thumbnail_url,
                } => {
                    info!(
                        "Job {} completed after {} polls ({:?})",
                        handle,
                        polls,
                        started.elapsed()
                    );
                    return tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Err(ReelcastError::Cancelled),
                        _ = sleep_until(deadline) => {
                            warn!("Artifact download for job {} outlived the deadline", handle);
                            Err(timed_out())
                        }
                        set = self.store.store(handle, &video_url, thumbnail_url.as_deref()) => set,
                    };
                }
                JobStatus::Failed { diagnostic } => {
                    warn!("Job {} failed: {}", handle, diagnostic);
                    return Err(ReelcastError::RemoteJobFailed(diagnostic));
                }
                JobStatus::Pending | JobStatus::Processing => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(ReelcastError::Cancelled),
                        _ = sleep(interval.min(remaining)) => {}
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use httpmock::prelude::*;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio_test::assert_err;

    /// Replays a scripted status sequence; the last entry repeats forever.
    struct ScriptedService {
        handle: String,
        statuses: Mutex<VecDeque<JobStatus>>,
        polls: Arc<AtomicUsize>,
        polled_at: Arc<Mutex<Vec<Instant>>>,
    }

    impl ScriptedService {
        fn new(handle: &str, statuses: Vec<JobStatus>) -> Self {
            Self {
                handle: handle.to_string(),
                statuses: Mutex::new(statuses.into()),
                polls: Arc::new(AtomicUsize::new(0)),
                polled_at: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl JobService for ScriptedService {
        async fn submit(&self, _request: &GenerationRequest) -> Result<JobHandle> {
            Ok(JobHandle::new(self.handle.clone()))
        }

        async fn poll(&self, _handle: &JobHandle) -> Result<JobStatus> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            self.polled_at.lock().unwrap().push(Instant::now());
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                Ok(statuses.pop_front().unwrap())
            } else {
                Ok(statuses.front().cloned().unwrap_or(JobStatus::Pending))
            }
        }
    }

    /// Fails the first `failures` polls with a transient error, then completes.
    struct FlakyService {
        failures: usize,
        polls: AtomicUsize,
        video_url: String,
    }

    #[async_trait]
    impl JobService for FlakyService {
        async fn submit(&self, _request: &GenerationRequest) -> Result<JobHandle> {
            Ok(JobHandle::new("flaky"))
        }

        async fn poll(&self, _handle: &JobHandle) -> Result<JobStatus> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(ReelcastError::Poll {
                    message: "502 Bad Gateway".into(),
                    transient: true,
                })
            } else {
                Ok(JobStatus::Completed {
                    video_url: self.video_url.clone(),
                    thumbnail_url: None,
                })
            }
        }
    }

    fn poller<S: JobService>(service: S, out: &Path) -> JobPoller<S> {
        let store = ArtifactStore::new(reqwest::Client::new(), out, RetryPolicy::none());
        JobPoller::new(service, store, &PollerSettings::default()).with_retry(RetryPolicy::none())
    }

    fn completed(server: &MockServer) -> JobStatus {
        JobStatus::Completed {
            video_url: server.url("/v.mp4"),
            thumbnail_url: Some(server.url("/t.jpg")),
        }
    }

    async fn artifact_server() -> MockServer {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v.mp4");
                then.status(200).body("video");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/t.jpg");
                then.status(200).body("thumb");
            })
            .await;
        server
    }

    const INTERVAL: Duration = Duration::from_millis(10);
    const LONG: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn test_pending_pending_completed_sleeps_twice() {
        let server = artifact_server().await;
        let service = ScriptedService::new(
            "job-1",
            vec![JobStatus::Pending, JobStatus::Pending, completed(&server)],
        );
        let polls = service.polls.clone();
        let polled_at = service.polled_at.clone();

        let dir = tempfile::tempdir().unwrap();
        let poller = poller(service, dir.path());

        let set = poller
            .await_completion(&JobHandle::new("job-1"), INTERVAL, LONG, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(polls.load(Ordering::SeqCst), 3);
        let polled_at = polled_at.lock().unwrap().clone();
        assert!(polled_at.windows(2).all(|w| w[1] - w[0] >= INTERVAL));
        assert_eq!(std::fs::read(&set.video).unwrap(), b"video");
        assert_eq!(std::fs::read(set.thumbnail.as_ref().unwrap()).unwrap(), b"thumb");
        assert_eq!(set.job, JobHandle::new("job-1"));
    }

    #[tokio::test]
    async fn test_failed_status_is_remote_job_failed_without_download() {
        let server = MockServer::start_async().await;
        let download = server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200).body("should not be fetched");
            })
            .await;

        let service = ScriptedService::new(
            "job-2",
            vec![
                JobStatus::Processing,
                JobStatus::Failed {
                    diagnostic: "avatar not found".into(),
                },
            ],
        );
        let polls = service.polls.clone();

        let dir = tempfile::tempdir().unwrap();
        let poller = poller(service, &dir.path().join("out"));

        let err = poller
            .await_completion(&JobHandle::new("job-2"), INTERVAL, LONG, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            ReelcastError::RemoteJobFailed(diagnostic) => assert_eq!(diagnostic, "avatar not found"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(polls.load(Ordering::SeqCst), 2);
        download.assert_hits_async(0).await;
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_pending_statuses_sleep_exactly_twice() {
        let service = ScriptedService::new(
            "job-1",
            vec![
                JobStatus::Pending,
                JobStatus::Pending,
                JobStatus::Failed {
                    diagnostic: "stop".into(),
                },
            ],
        );
        let polled_at = service.polled_at.clone();
        let dir = tempfile::tempdir().unwrap();
        let poller = poller(service, dir.path());

        let interval = Duration::from_secs(10);
        let start = Instant::now();
        let result = poller
            .await_completion(&JobHandle::new("job-1"), interval, LONG * 100, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ReelcastError::RemoteJobFailed(_))));
        assert_eq!(Instant::now() - start, 2 * interval);
        let polled_at = polled_at.lock().unwrap().clone();
        assert_eq!(
            polled_at.iter().map(|t| *t - start).collect::<Vec<_>>(),
            vec![Duration::ZERO, interval, 2 * interval]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_stops_polling() {
        let service = ScriptedService::new("job-3", vec![JobStatus::Processing]);
        let polls = service.polls.clone();

        let dir = tempfile::tempdir().unwrap();
        let poller = poller(service, dir.path());

        let start = Instant::now();
        let err = poller
            .await_completion(
                &JobHandle::new("job-3"),
                Duration::from_millis(20),
                Duration::from_millis(70),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ReelcastError::PollTimeout { ref job, .. } if job == "job-3"));

        // Polls at 0, 20, 40 and 60ms; the last wait is clamped to the deadline.
        assert_eq!(polls.load(Ordering::SeqCst), 4);
        assert_eq!(Instant::now() - start, Duration::from_millis(70));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_never_polls() {
        let service = ScriptedService::new("job-0", vec![JobStatus::Pending]);
        let polls = service.polls.clone();
        let dir = tempfile::tempdir().unwrap();
        let poller = poller(service, dir.path());

        let err = poller
            .await_completion(&JobHandle::new("job-0"), INTERVAL, Duration::ZERO, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ReelcastError::PollTimeout { .. }));
        assert_eq!(polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stalled_download_is_bounded_by_timeout() {
        let silent = crate::test_support::silent_server().await;
        let service = ScriptedService::new(
            "job-6",
            vec![JobStatus::Completed {
                video_url: format!("{}/v.mp4", silent),
                thumbnail_url: None,
            }],
        );
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let poller = poller(service, &out);

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            poller.await_completion(
                &JobHandle::new("job-6"),
                INTERVAL,
                Duration::from_millis(200),
                &CancellationToken::new(),
            ),
        )
        .await
        .expect("download stall must not outlive the poll timeout");

        assert!(matches!(result, Err(ReelcastError::PollTimeout { .. })));
        let leftovers = std::fs::read_dir(&out).map(|d| d.count()).unwrap_or(0);
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_wait() {
        let service = ScriptedService::new("job-4", vec![JobStatus::Pending]);
        let dir = tempfile::tempdir().unwrap();
        let poller = poller(service, &dir.path().join("out"));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let result = poller
            .await_completion(&JobHandle::new("job-4"), Duration::from_secs(5), LONG, &cancel)
            .await;

        let err = assert_err!(result);
        assert!(matches!(err, ReelcastError::Cancelled));
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_already_cancelled_never_polls() {
        let service = ScriptedService::new("job-5", vec![JobStatus::Pending]);
        let polls = service.polls.clone();
        let dir = tempfile::tempdir().unwrap();
        let poller = poller(service, dir.path());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = poller
            .await_completion(&JobHandle::new("job-5"), INTERVAL, LONG, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, ReelcastError::Cancelled));
        assert_eq!(polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transient_poll_errors_are_retried() {
        let server = artifact_server().await;
        let service = FlakyService {
            failures: 2,
            polls: AtomicUsize::new(0),
            video_url: server.url("/v.mp4"),
        };

        let dir = tempfile::tempdir().unwrap();
        let poller = poller(service, dir.path()).with_retry(RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        });

        let set = poller
            .await_completion(&JobHandle::new("flaky"), INTERVAL, LONG, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(poller.service().polls.load(Ordering::SeqCst), 3);
        assert!(set.thumbnail.is_none());
    }

    #[tokio::test]
    async fn test_distinct_jobs_get_distinct_files() {
        let server = artifact_server().await;
        let dir = tempfile::tempdir().unwrap();

        let first = poller(ScriptedService::new("job-a", vec![completed(&server)]), dir.path());
        let second = poller(ScriptedService::new("job-b", vec![completed(&server)]), dir.path());
        let cancel = CancellationToken::new();

        let a = first
            .await_completion(&JobHandle::new("job-a"), INTERVAL, LONG, &cancel)
            .await
            .unwrap();
        let b = second
            .await_completion(&JobHandle::new("job-b"), INTERVAL, LONG, &cancel)
            .await
            .unwrap();

        assert_ne!(a.video, b.video);
        assert_ne!(a.thumbnail, b.thumbnail);
        assert!(a.video.exists() && b.video.exists());
    }
}
