//! `plan` command: dry-run the pipeline and print what it would do.

use super::helpers::{load_pipeline_config, write_report};
use crate::cli::{Args, RuntimeConfig, TriggerArgs};
use crate::error::Result;
use crate::pipeline::{Orchestrator, Recorder, RecordingDeleter, RecordingToolchain, TaskId};

/// Execute plan command
pub(super) async fn execute_plan(
    args: &Args,
    trigger: &TriggerArgs,
    config: &RuntimeConfig,
) -> Result<i32> {
    let pipeline = load_pipeline_config(args)?;
    let tag = trigger.trigger().resolve(&pipeline.trigger)?;
    let access = args.registry.plan_access()?;

    let recorder = Recorder::default();
    let toolchain = RecordingToolchain::new(recorder.clone());
    let deleter = RecordingDeleter::new(
        recorder.clone(),
        pipeline.registry.clone(),
        access.login_server.clone(),
    );

    let report = Orchestrator::new(&toolchain, &deleter, &access, &pipeline.platforms)
        .run(&tag)
        .await;

    let tags = &report.tags;
    config.section(&format!("Plan for {}", report.release_tag));
    config.println(&format!(
        "Tags: {}, {}, {}, {}",
        tags.windows, tags.linux, tags.release, tags.latest
    ));

    for (stage, ids) in [
        ("Stage A (parallel)", &[TaskId::BuildWindows, TaskId::BuildLinux][..]),
        ("Stage B (after both succeed)", &[TaskId::Merge][..]),
    ] {
        config.println("");
        config.println(stage);
        for &id in ids {
            config.println(&format!("  {id}:"));
            for command in recorder.commands_for(id) {
                config.indent(&command);
            }
        }
    }

    write_report(args, config, &report)?;

    Ok(report.exit_code())
}
