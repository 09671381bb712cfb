//! Shared helpers for command execution.

use crate::cli::{Args, RuntimeConfig};
use crate::config::PipelineConfig;
use crate::error::{ReleaseError, Result};
use crate::pipeline::{PipelineReport, TaskOutcome};

/// Load the pipeline config named by `--config`, or discover one in the working directory
pub(super) fn load_pipeline_config(args: &Args) -> Result<PipelineConfig> {
    let cwd = std::env::current_dir()?;
    PipelineConfig::discover(args.config.as_deref(), &cwd)
}

/// Print recovery suggestions for an error
pub(super) fn print_suggestions(config: &RuntimeConfig, error: &ReleaseError) {
    let suggestions = error.recovery_suggestions();
    if suggestions.is_empty() || config.is_quiet() {
        return;
    }
    config.println("\n💡 Recovery suggestions:");
    for suggestion in suggestions {
        config.indent(&format!("• {suggestion}"));
    }
}

/// Print the per-task summary of a run
pub(super) fn print_report(config: &RuntimeConfig, report: &PipelineReport) {
    config.section(&format!("Release {}", report.release_tag));

    for task in &report.tasks {
        match task.outcome {
            TaskOutcome::Succeeded => config.success_println(&format!("{} succeeded", task.id)),
            TaskOutcome::Skipped => config.warning_println(&format!(
                "{} skipped: {}",
                task.id,
                task.reason.as_deref().unwrap_or("predecessor did not succeed")
            )),
            TaskOutcome::Failed => config.error_println(&format!(
                "{} failed: {}",
                task.id,
                task.reason.as_deref().unwrap_or("unknown error")
            )),
        }

        if config.is_verbose() {
            for step in &task.steps {
                let mark = if step.succeeded { "✓" } else { "✗" };
                config.indent(&format!("{mark} {}", step.name));
            }
        }
    }

    for failed in report.failures() {
        if let Some(error) = &failed.failure {
            print_suggestions(config, error);
        }
    }
}

/// Write the JSON run report if `--report` was given
pub(super) fn write_report(args: &Args, config: &RuntimeConfig, report: &PipelineReport) -> Result<()> {
    if let Some(path) = &args.report {
        report.write_json(path)?;
        config.verbose_println(&format!("Run report written to {}", path.display()));
    }
    Ok(())
}
