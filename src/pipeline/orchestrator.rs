//! Fan-in release orchestrator.

use super::report::PipelineReport;
use super::task::{TaskId, TaskReport, TaskRun};
use crate::config::{PlatformsConfig, RegistryAccess};
use crate::error::Result;
use crate::registry::TagDeleter;
use crate::tag::{ImageRef, Platform, ReleaseTag, TagSet};
use crate::toolchain::{ContainerToolchain, TaskScope};

/// Drives one release through the three-task graph
pub struct Orchestrator<'a, T, D> {
    toolchain: &'a T,
    deleter: &'a D,
    access: &'a RegistryAccess,
    platforms: &'a PlatformsConfig,
}

impl<'a, T, D> Orchestrator<'a, T, D>
where
    T: ContainerToolchain,
    D: TagDeleter,
{
    /// Create an orchestrator over the given collaborators
    pub fn new(
        toolchain: &'a T,
        deleter: &'a D,
        access: &'a RegistryAccess,
        platforms: &'a PlatformsConfig,
    ) -> Self {
        Self {
            toolchain,
            deleter,
            access,
            platforms,
        }
    }

    /// Run the full pipeline for `tag`.
    ///
    /// Never returns early: every task ends in a terminal state recorded in
    /// the report, and the merge task is skipped unless both builds succeed.
    pub async fn run(&self, tag: &ReleaseTag) -> PipelineReport {
        let tags = tag.derive();
        let mut report = PipelineReport::start(tag, &tags);

        let (windows, linux) = tokio::join!(
            self.build_platform(Platform::Windows, &tags),
            self.build_platform(Platform::Linux, &tags),
        );

        let blocked: Vec<&str> = [&windows, &linux]
            .iter()
            .filter(|task| !task.succeeded())
            .map(|task| task.id.name())
            .collect();
        let gate_open = blocked.is_empty();
        report.push(windows);
        report.push(linux);

        let merge = if gate_open {
            self.merge(&tags).await
        } else {
            log::warn!("[merge] skipped: {} did not succeed", blocked.join(", "));
            TaskReport::skipped(
                TaskId::Merge,
                format!("{} did not succeed", blocked.join(" and ")),
            )
        };
        report.push(merge);

        report.finish()
    }

    /// Stage A task: login, build, push, logout
    async fn build_platform(&self, platform: Platform, tags: &TagSet) -> TaskReport {
        let id = TaskId::build(platform);
        let descriptor = self.platforms.descriptor(platform);
        let mut task = TaskRun::start(id);

        let scope = match TaskScope::new(id.name(), descriptor.docker_context.clone()) {
            Ok(scope) => scope,
            Err(e) => return task.finish(Err(e)),
        };
        let image = self.image(tags.platform(platform));

        let body = async {
            task.step(
                format!("login {}", self.access.login_server),
                self.toolchain.login(&scope, self.access),
            )
            .await?;
            task.step(
                format!("build {image}"),
                self.toolchain.build(&scope, platform, descriptor, &image),
            )
            .await?;
            task.step(format!("push {image}"), self.toolchain.push(&scope, &image))
                .await
        }
        .await;

        let result = self.logout(&mut task, &scope, body).await;
        task.finish(result)
    }

    /// Stage B task: login, compose `<tag>` and `latest`, delete platform tags, logout
    async fn merge(&self, tags: &TagSet) -> TaskReport {
        let mut task = TaskRun::start(TaskId::Merge);

        let scope = match TaskScope::new(TaskId::Merge.name(), None) {
            Ok(scope) => scope,
            Err(e) => return task.finish(Err(e)),
        };
        let sources: Vec<ImageRef> = tags
            .platform_tags()
            .iter()
            .map(|tag| self.image(tag))
            .collect();

        let body = async {
            task.step(
                format!("login {}", self.access.login_server),
                self.toolchain.login(&scope, self.access),
            )
            .await?;

            for target in tags.manifest_targets() {
                let target = self.image(target);
                task.step(
                    format!("compose {target}"),
                    self.toolchain.compose_manifest(&scope, &target, &sources),
                )
                .await?;
            }

            // Both deletions are attempted regardless of the other's outcome
            let repository = self.access.repository.as_str();
            let [windows, linux] = tags.platform_tags();
            let (windows_deleted, linux_deleted) = tokio::join!(
                self.deleter.delete_tag(repository, windows),
                self.deleter.delete_tag(repository, linux),
            );
            task.record(format!("delete {repository}:{windows}"), &windows_deleted);
            task.record(format!("delete {repository}:{linux}"), &linux_deleted);
            windows_deleted.and(linux_deleted)
        }
        .await;

        let result = self.logout(&mut task, &scope, body).await;
        task.finish(result)
    }

    /// De-authenticate after the task body, keeping the body's error first
    async fn logout(&self, task: &mut TaskRun, scope: &TaskScope, body: Result<()>) -> Result<()> {
        let logout = task
            .step(
                format!("logout {}", self.access.login_server),
                self.toolchain.logout(scope, self.access),
            )
            .await;
        body.and(logout)
    }

    fn image(&self, tag: &str) -> ImageRef {
        ImageRef::new(&self.access.login_server, &self.access.repository, tag)
    }
}
