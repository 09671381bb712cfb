//! Recording collaborators for dry runs.
//!
//! `RecordingToolchain` and `RecordingDeleter` succeed without touching
//! docker or the registry, recording what would have run. Driving the real
//! orchestrator with them simulates a release end to end.

use super::task::TaskId;
use crate::config::{BuildDescriptor, RegistryAccess, RegistryApiConfig};
use crate::error::Result;
use crate::registry::{TagDeleter, tag_url};
use crate::tag::{ImageRef, Platform};
use crate::toolchain::{ContainerToolchain, Invocation, TaskScope};
use std::sync::{Arc, Mutex, PoisonError};

/// One command or request a task would have issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Task that issued it
    pub task: String,
    /// Rendered command line or HTTP request
    pub command: String,
}

/// Shared, ordered log of recorded calls
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl Recorder {
    fn record(&self, task: &str, command: String) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                task: task.to_string(),
                command,
            });
    }

    /// Every recorded call in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Commands issued by one task, in order
    pub fn commands_for(&self, task: TaskId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.task == task.name())
            .map(|call| call.command)
            .collect()
    }
}

/// Render an invocation without the throwaway config directory
fn describe(scope: &TaskScope, invocation: &Invocation) -> String {
    let mut line = String::from("docker");
    if let Some(context) = scope.docker_context() {
        line.push_str(" --context ");
        line.push_str(context);
    }
    for arg in &invocation.args {
        line.push(' ');
        line.push_str(arg);
    }
    if invocation.stdin.is_some() {
        line.push_str(" < (stdin)");
    }
    line
}

/// Toolchain that records docker invocations instead of running them
#[derive(Debug, Clone, Default)]
pub struct RecordingToolchain {
    recorder: Recorder,
}

impl RecordingToolchain {
    /// Record into `recorder`
    pub fn new(recorder: Recorder) -> Self {
        Self { recorder }
    }

    fn record(&self, scope: &TaskScope, invocation: Invocation) {
        self.recorder
            .record(scope.name(), describe(scope, &invocation));
    }
}

impl ContainerToolchain for RecordingToolchain {
    async fn login(&self, scope: &TaskScope, access: &RegistryAccess) -> Result<()> {
        self.record(scope, Invocation::login(scope, access));
        Ok(())
    }

    async fn build(
        &self,
        scope: &TaskScope,
        platform: Platform,
        descriptor: &BuildDescriptor,
        image: &ImageRef,
    ) -> Result<()> {
        self.record(scope, Invocation::build(scope, platform, descriptor, image));
        Ok(())
    }

    async fn push(&self, scope: &TaskScope, image: &ImageRef) -> Result<()> {
        self.record(scope, Invocation::push(scope, image));
        Ok(())
    }

    async fn compose_manifest(
        &self,
        scope: &TaskScope,
        target: &ImageRef,
        sources: &[ImageRef],
    ) -> Result<()> {
        self.record(scope, Invocation::manifest_create(scope, target, sources));
        self.record(scope, Invocation::manifest_push(scope, target));
        Ok(())
    }

    async fn logout(&self, scope: &TaskScope, access: &RegistryAccess) -> Result<()> {
        self.record(scope, Invocation::logout(scope, access));
        Ok(())
    }
}

/// Tag deleter that records the HTTP requests it would send
#[derive(Debug, Clone)]
pub struct RecordingDeleter {
    recorder: Recorder,
    api: RegistryApiConfig,
    login_server: String,
}

impl RecordingDeleter {
    /// Record into `recorder`, rendering URLs for `login_server`
    pub fn new(recorder: Recorder, api: RegistryApiConfig, login_server: impl Into<String>) -> Self {
        Self {
            recorder,
            api,
            login_server: login_server.into(),
        }
    }
}

impl TagDeleter for RecordingDeleter {
    async fn delete_tag(&self, repository: &str, tag: &str) -> Result<()> {
        let url = tag_url(&self.api, &self.login_server, repository, tag)?;
        self.recorder
            .record(TaskId::Merge.name(), format!("DELETE {url}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PlatformsConfig, Secret};
    use crate::pipeline::Orchestrator;
    use crate::tag::ReleaseTag;

    #[tokio::test]
    async fn test_dry_run_scenario() {
        let recorder = Recorder::default();
        let toolchain = RecordingToolchain::new(recorder.clone());
        let deleter =
            RecordingDeleter::new(recorder.clone(), RegistryApiConfig::default(), "reg.io");
        let access = RegistryAccess::new("reg.io", "app", "ci", Secret::new("pw"));
        let platforms = PlatformsConfig::default();

        let tag = ReleaseTag::parse("v1.2.0").unwrap();
        let report = Orchestrator::new(&toolchain, &deleter, &access, &platforms)
            .run(&tag)
            .await;
        assert!(report.succeeded());

        assert_eq!(
            recorder.commands_for(TaskId::BuildLinux),
            [
                "docker login reg.io --username ci --password-stdin < (stdin)",
                "docker build --file Dockerfile --tag reg.io/app:v1.2.0-linux .",
                "docker push reg.io/app:v1.2.0-linux",
                "docker logout reg.io",
            ]
        );
        assert_eq!(
            recorder.commands_for(TaskId::Merge),
            [
                "docker login reg.io --username ci --password-stdin < (stdin)",
                "docker manifest create --amend reg.io/app:v1.2.0 reg.io/app:v1.2.0-windows reg.io/app:v1.2.0-linux",
                "docker manifest push --purge reg.io/app:v1.2.0",
                "docker manifest create --amend reg.io/app:latest reg.io/app:v1.2.0-windows reg.io/app:v1.2.0-linux",
                "docker manifest push --purge reg.io/app:latest",
                "DELETE https://reg.io/acr/v1/app/_tags/v1.2.0-windows",
                "DELETE https://reg.io/acr/v1/app/_tags/v1.2.0-linux",
                "docker logout reg.io",
            ]
        );
    }

    #[tokio::test]
    async fn test_docker_context_is_shown() {
        let recorder = Recorder::default();
        let toolchain = RecordingToolchain::new(recorder.clone());
        let scope = TaskScope::new("build-windows", Some("win".to_string())).unwrap();
        let image = ImageRef::new("reg.io", "app", "v1-windows");
        toolchain.push(&scope, &image).await.unwrap();
        assert_eq!(
            recorder.commands_for(TaskId::BuildWindows),
            ["docker --context win push reg.io/app:v1-windows"]
        );
    }
}
