//! Command execution.
//!
//! Each command resolves its configuration, runs, and returns the process
//! exit code. Errors are reported here with recovery suggestions.

mod cleanup;
mod helpers;
mod plan;
mod release;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::Result;

use cleanup::execute_cleanup;
use plan::execute_plan;
use release::execute_release;

/// Execute the command selected by `args`
pub async fn execute_command(args: Args) -> Result<i32> {
    let config = RuntimeConfig::from(&args);

    if let Err(validation_error) = args.validate() {
        config.error_println(&format!("Invalid arguments: {validation_error}"));
        return Ok(1);
    }

    let result = match &args.command {
        Command::Release(trigger) => execute_release(&args, trigger, &config).await,
        Command::Plan(trigger) => execute_plan(&args, trigger, &config).await,
        Command::Cleanup { tag } => execute_cleanup(&args, tag, &config).await,
    };

    match result {
        Ok(exit_code) => Ok(exit_code),
        Err(e) => {
            config.error_println(&format!(
                "Command '{}' failed: {}",
                args.command.name(),
                e
            ));
            helpers::print_suggestions(&config, &e);
            Ok(1)
        }
    }
}
