//! `release` command: run the pipeline against docker and the registry.

use super::helpers::{load_pipeline_config, print_report, write_report};
use crate::cli::{Args, RuntimeConfig, TriggerArgs};
use crate::error::Result;
use crate::pipeline::Orchestrator;
use crate::registry::RegistryClient;
use crate::toolchain::DockerCli;

/// Execute release command
pub(super) async fn execute_release(
    args: &Args,
    trigger: &TriggerArgs,
    config: &RuntimeConfig,
) -> Result<i32> {
    let pipeline = load_pipeline_config(args)?;
    let tag = trigger.trigger().resolve(&pipeline.trigger)?;
    let access = args.registry.access()?;

    let tags = tag.derive();
    config.info_println(&format!(
        "Releasing {}/{}:{} (platform tags {}, {})",
        access.login_server, access.repository, tags.release, tags.windows, tags.linux
    ));

    let docker = DockerCli::locate()?;
    config.verbose_println(&format!("Using docker at {}", docker.program().display()));
    let registry = RegistryClient::new(&access, &pipeline.registry)?;

    let report = Orchestrator::new(&docker, &registry, &access, &pipeline.platforms)
        .run(&tag)
        .await;

    print_report(config, &report);
    write_report(args, config, &report)?;

    if report.succeeded() {
        config.success_println(&format!(
            "🎉 Published {} and {}",
            tags.release, tags.latest
        ));
    }
    Ok(report.exit_code())
}
