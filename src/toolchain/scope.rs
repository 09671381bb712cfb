//! Per-task docker client configuration.

use crate::error::Result;
use std::path::Path;
use tempfile::TempDir;

/// Isolated docker client state for one pipeline task.
///
/// Credentials written by `docker login` land in a private config
/// directory that is removed when the scope is dropped.
#[derive(Debug)]
pub struct TaskScope {
    name: String,
    docker_context: Option<String>,
    config_dir: TempDir,
}

impl TaskScope {
    /// Create a scope with a fresh config directory
    pub fn new(name: &str, docker_context: Option<String>) -> Result<Self> {
        let config_dir = tempfile::Builder::new()
            .prefix(&format!("container-release-{name}-"))
            .tempdir()?;
        log::debug!(
            "Task '{}' uses docker config {}",
            name,
            config_dir.path().display()
        );

        Ok(Self {
            name: name.to_string(),
            docker_context,
            config_dir,
        })
    }

    /// Task name, used to label output
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Docker context the task builds and pushes with
    pub fn docker_context(&self) -> Option<&str> {
        self.docker_context.as_deref()
    }

    /// Private docker config directory
    pub fn config_dir(&self) -> &Path {
        self.config_dir.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_do_not_share_config() {
        let a = TaskScope::new("build-windows", Some("win".to_string())).unwrap();
        let b = TaskScope::new("build-linux", None).unwrap();
        assert_ne!(a.config_dir(), b.config_dir());
        assert_eq!(a.docker_context(), Some("win"));
        assert_eq!(b.docker_context(), None);
    }

    #[test]
    fn test_config_removed_on_drop() {
        let scope = TaskScope::new("merge", None).unwrap();
        let dir = scope.config_dir().to_path_buf();
        assert!(dir.is_dir());
        drop(scope);
        assert!(!dir.exists());
    }
}
