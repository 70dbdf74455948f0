//! Sequential task runner.
//!
//! A [`Pipeline`] runs its steps strictly in order; each step receives the
//! [`Handoff`] produced by the one before it. The first failure stops the run
//! and is recorded as a readable step record rather than propagated.

mod steps;

pub use steps::{ExtractStep, GenerateStep, NarrateStep, UploadStep};

use crate::error::{ReelcastError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Value passed from one step to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Handoff {
    /// The main output of the previous step (URL, path or id).
    pub primary: String,
    /// Side outputs keyed by name, e.g. `thumbnail` or `audio`.
    pub attachments: BTreeMap<String, PathBuf>,
}

impl Handoff {
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            attachments: BTreeMap::new(),
        }
    }

    /// Replace the primary value, keeping attachments.
    pub fn with_primary(self, primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            ..self
        }
    }

    pub fn attach(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.attachments.insert(name.to_string(), path.into());
        self
    }

    pub fn attachment(&self, name: &str) -> Option<&Path> {
        self.attachments.get(name).map(PathBuf::as_path)
    }

    pub fn primary_path(&self) -> &Path {
        Path::new(&self.primary)
    }
}

/// One unit of work in a pipeline.
#[async_trait]
pub trait Step: Send + Sync {
    /// Short name used in reports.
    fn name(&self) -> &str;

    /// Transform the previous handoff into the next one.
    async fn run(&self, input: Handoff, cancel: &CancellationToken) -> Result<Handoff>;
}

/// Await `work` unless `cancel` fires first, in which case `work` is dropped.
pub async fn until_cancelled<T>(
    cancel: &CancellationToken,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ReelcastError::Cancelled),
        result = work => result,
    }
}

/// How a step ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Succeeded(String),
    Failed(String),
}

/// Record of a single step execution.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub name: String,
    pub outcome: StepOutcome,
    pub elapsed: Duration,
}

impl StepRecord {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, StepOutcome::Succeeded(_))
    }
}

impl std::fmt::Display for StepRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            StepOutcome::Succeeded(output) => {
                write!(f, "{} ({:.1}s): {}", self.name, self.elapsed.as_secs_f64(), output)
            }
            StepOutcome::Failed(error) => {
                write!(f, "{} failed ({:.1}s): {}", self.name, self.elapsed.as_secs_f64(), error)
            }
        }
    }
}

/// Result of a pipeline run.
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// Records for the steps that ran, in order.
    pub steps: Vec<StepRecord>,
    /// Final handoff, present only when every step succeeded.
    pub output: Option<Handoff>,
    /// Whether the run stopped because it was cancelled.
    pub cancelled: bool,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.output.is_some()
    }

    /// The first failed step, if any.
    pub fn failure(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|s| !s.succeeded())
    }
}

/// An ordered list of steps.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Arc<dyn Step>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: Arc<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order, stopping at the first failure or on cancellation.
    pub async fn run(&self, input: Handoff, cancel: &CancellationToken) -> PipelineReport {
        let mut report = PipelineReport::default();
        let mut current = input;

        for step in &self.steps {
            if cancel.is_cancelled() {
                warn!("Pipeline cancelled before step {}", step.name());
                report.cancelled = true;
                return report;
            }

            info!("Running step {}", step.name());
            let started = Instant::now();
            let result = step.run(current, cancel).await;
            let elapsed = started.elapsed();

            match result {
                Ok(next) => {
                    report.steps.push(StepRecord {
                        name: step.name().to_string(),
                        outcome: StepOutcome::Succeeded(next.primary.clone()),
                        elapsed,
                    });
                    current = next;
                }
                Err(e) => {
                    warn!("Step {} failed: {}", step.name(), e);
                    report.cancelled = matches!(e, ReelcastError::Cancelled);
                    report.steps.push(StepRecord {
                        name: step.name().to_string(),
                        outcome: StepOutcome::Failed(e.to_string()),
                        elapsed,
                    });
                    return report;
                }
            }
        }

        report.output = Some(current);
        report
    }
}
