//! Run report for one pipeline execution.

use super::task::{TaskId, TaskOutcome, TaskReport};
use crate::error::Result;
use crate::tag::{ReleaseTag, TagSet};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

/// Outcome of every task in one run
#[derive(Debug, Serialize)]
pub struct PipelineReport {
    /// Unique ID for this run
    pub run_id: Uuid,
    /// Release tag from the trigger
    pub release_tag: String,
    /// Registry tags derived from the release tag
    pub tags: TagSet,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the last task reached a terminal state
    pub finished_at: Option<DateTime<Utc>>,
    /// Tasks in graph order
    pub tasks: Vec<TaskReport>,
}

impl PipelineReport {
    /// Begin a report for a run
    pub fn start(tag: &ReleaseTag, tags: &TagSet) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            release_tag: tag.to_string(),
            tags: tags.clone(),
            started_at: Utc::now(),
            finished_at: None,
            tasks: Vec::new(),
        }
    }

    /// Append a finished task
    pub fn push(&mut self, task: TaskReport) {
        self.tasks.push(task);
    }

    /// Mark the run complete
    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    /// Report for one task
    pub fn task(&self, id: TaskId) -> Option<&TaskReport> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Outcome of one task, `None` if it was never recorded
    pub fn outcome(&self, id: TaskId) -> Option<TaskOutcome> {
        self.task(id).map(|task| task.outcome)
    }

    /// Logical AND of every task's success
    pub fn succeeded(&self) -> bool {
        !self.tasks.is_empty() && self.tasks.iter().all(TaskReport::succeeded)
    }

    /// Process exit code for this run
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() { 0 } else { 1 }
    }

    /// Tasks that failed
    pub fn failures(&self) -> impl Iterator<Item = &TaskReport> {
        self.tasks
            .iter()
            .filter(|task| task.outcome == TaskOutcome::Failed)
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run report to {}", path.display()))?;
        log::debug!("Wrote run report to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::TaskRun;

    fn report() -> PipelineReport {
        let tag = ReleaseTag::parse("v1.2.0").unwrap();
        PipelineReport::start(&tag, &tag.derive())
    }

    #[test]
    fn test_empty_report_is_not_success() {
        assert!(!report().succeeded());
        assert_eq!(report().exit_code(), 1);
    }

    #[test]
    fn test_exit_code_is_and_of_tasks() {
        let mut all_ok = report();
        for id in [TaskId::BuildWindows, TaskId::BuildLinux, TaskId::Merge] {
            all_ok.push(TaskRun::start(id).finish(Ok(())));
        }
        assert_eq!(all_ok.finish().exit_code(), 0);

        let mut one_skipped = report();
        one_skipped.push(TaskRun::start(TaskId::BuildWindows).finish(Ok(())));
        one_skipped.push(TaskReport::skipped(TaskId::Merge, "x"));
        assert_eq!(one_skipped.exit_code(), 1);
        assert_eq!(one_skipped.outcome(TaskId::Merge), Some(TaskOutcome::Skipped));
        assert_eq!(one_skipped.failures().count(), 0);
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut run = report();
        run.push(TaskReport::skipped(TaskId::Merge, "build-linux did not succeed"));
        run.finish().write_json(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["release_tag"], "v1.2.0");
        assert_eq!(json["tags"]["windows"], "v1.2.0-windows");
        assert_eq!(json["tags"]["latest"], "latest");
        assert_eq!(json["tasks"][0]["outcome"], "skipped");
        assert!(json["finished_at"].is_string());
    }
}
