//! Task identities, outcomes and per-task step records.

use crate::error::{ReleaseError, Result};
use crate::tag::Platform;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::future::Future;

/// Dependency level of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Independent per-platform build-and-push
    PlatformBuild,
    /// Manifest composition and cleanup
    Merge,
}

/// The three tasks of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskId {
    /// Build and push `<tag>-windows`
    BuildWindows,
    /// Build and push `<tag>-linux`
    BuildLinux,
    /// Compose `<tag>` and `latest`, delete platform tags
    Merge,
}

impl TaskId {
    /// Build task for a platform
    pub fn build(platform: Platform) -> Self {
        match platform {
            Platform::Windows => TaskId::BuildWindows,
            Platform::Linux => TaskId::BuildLinux,
        }
    }

    /// Stable task name
    pub fn name(self) -> &'static str {
        match self {
            TaskId::BuildWindows => "build-windows",
            TaskId::BuildLinux => "build-linux",
            TaskId::Merge => "merge",
        }
    }

    /// Stage the task belongs to
    pub fn stage(self) -> Stage {
        match self {
            TaskId::BuildWindows | TaskId::BuildLinux => Stage::PlatformBuild,
            TaskId::Merge => Stage::Merge,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Terminal state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskOutcome {
    /// Every step succeeded
    Succeeded,
    /// A step failed
    Failed,
    /// Not started because a predecessor did not succeed
    Skipped,
}

/// One executed step
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// Step description, e.g. `push reg.io/app:v1-linux`
    pub name: String,
    /// Whether the step succeeded
    pub succeeded: bool,
    /// Error message when it failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Final record of one task
#[derive(Debug, Serialize)]
pub struct TaskReport {
    /// Task identity
    pub id: TaskId,
    /// Dependency level
    pub stage: Stage,
    /// Terminal state
    pub outcome: TaskOutcome,
    /// Steps in execution order
    pub steps: Vec<StepRecord>,
    /// Why the task failed or was skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Start time (absent for skipped tasks)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Completion time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// The error that failed the task
    #[serde(skip)]
    pub failure: Option<ReleaseError>,
}

impl TaskReport {
    /// Record a task that never started
    pub fn skipped(id: TaskId, reason: impl Into<String>) -> Self {
        Self {
            id,
            stage: id.stage(),
            outcome: TaskOutcome::Skipped,
            steps: Vec::new(),
            reason: Some(reason.into()),
            started_at: None,
            finished_at: None,
            failure: None,
        }
    }

    /// Whether the task reached `Succeeded`
    pub fn succeeded(&self) -> bool {
        self.outcome == TaskOutcome::Succeeded
    }
}

/// A task in progress, collecting step records
#[derive(Debug)]
pub struct TaskRun {
    id: TaskId,
    started_at: DateTime<Utc>,
    steps: Vec<StepRecord>,
}

impl TaskRun {
    /// Start a task
    pub fn start(id: TaskId) -> Self {
        log::info!("[{id}] started");
        Self {
            id,
            started_at: Utc::now(),
            steps: Vec::new(),
        }
    }

    /// Run one step and record its result
    pub async fn step<F>(&mut self, name: impl Into<String>, step: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        let name = name.into();
        log::debug!("[{}] {}", self.id, name);
        let result = step.await;
        self.record(name, &result);
        result
    }

    /// Record the result of a step that ran elsewhere
    pub fn record(&mut self, name: impl Into<String>, result: &Result<()>) {
        let name = name.into();
        let error = result.as_ref().err().map(ToString::to_string);
        if let Some(error) = &error {
            log::warn!("[{}] {} failed: {}", self.id, name, error);
        }
        self.steps.push(StepRecord {
            name,
            succeeded: error.is_none(),
            error,
        });
    }

    /// Close the task with its overall result
    pub fn finish(self, result: Result<()>) -> TaskReport {
        let (outcome, reason, failure) = match result {
            Ok(()) => (TaskOutcome::Succeeded, None, None),
            Err(e) => (TaskOutcome::Failed, Some(e.to_string()), Some(e)),
        };
        log::info!("[{}] {:?}", self.id, outcome);

        TaskReport {
            id: self.id,
            stage: self.id.stage(),
            outcome,
            steps: self.steps,
            reason,
            started_at: Some(self.started_at),
            finished_at: Some(Utc::now()),
            failure,
        }
    }
}
