//! `cleanup` command: delete orphaned per-platform tags by hand.

use super::helpers::load_pipeline_config;
use crate::cli::{Args, RuntimeConfig};
use crate::error::Result;
use crate::registry::{RegistryClient, TagDeleter};
use crate::tag::{ReleaseTag, TagSet};

/// Execute cleanup command
pub(super) async fn execute_cleanup(args: &Args, raw_tag: &str, config: &RuntimeConfig) -> Result<i32> {
    let pipeline = load_pipeline_config(args)?;
    let tag = ReleaseTag::parse(raw_tag)?;
    let access = args.registry.access()?;
    let client = RegistryClient::new(&access, &pipeline.registry)?;

    let tags = tag.derive();
    let [windows, linux] = tags.platform_tags();
    config.info_println(&format!(
        "Deleting {windows} and {linux} from {}/{}",
        access.login_server, access.repository
    ));

    Ok(delete_platform_tags(&client, &access.repository, &tags, config).await)
}

/// Delete both platform tags, attempting each regardless of the other.
///
/// Returns the exit code: 0 when both deletions succeeded, otherwise 1.
async fn delete_platform_tags<D: TagDeleter>(
    deleter: &D,
    repository: &str,
    tags: &TagSet,
    config: &RuntimeConfig,
) -> i32 {
    let [windows, linux] = tags.platform_tags();
    let (windows_deleted, linux_deleted) = tokio::join!(
        deleter.delete_tag(repository, windows),
        deleter.delete_tag(repository, linux),
    );

    let mut exit_code = 0;
    for (name, result) in [(windows, windows_deleted), (linux, linux_deleted)] {
        match result {
            Ok(()) => config.success_println(&format!("Deleted {name}")),
            Err(e) => {
                config.error_println(&format!("Could not delete {name}: {e}"));
                exit_code = 1;
            }
        }
    }
    exit_code
}
