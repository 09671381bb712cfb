//! Error types for container_release operations.
//!
//! Every failure carries enough context to act on, and `ReleaseError`
//! exposes recovery suggestions for the CLI.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for container_release operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all container_release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Release tag errors
    #[error("Tag error: {0}")]
    Tag(#[from] TagError),

    /// Trigger payload errors
    #[error("Trigger error: {0}")]
    Trigger(#[from] TriggerError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Container toolchain errors (login, build, push, manifest)
    #[error("Toolchain error: {0}")]
    Toolchain(#[from] ToolchainError),

    /// Registry HTTP API errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Release tag validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    /// Tag is empty after trimming
    #[error("Release tag is empty")]
    Empty,

    /// Tag contains characters a registry tag cannot hold
    #[error(
        "Release tag '{tag}' is not a valid registry tag (allowed: letters, digits, '_', '.', '-'; must not start with '.' or '-')"
    )]
    InvalidCharacters {
        /// Offending tag
        tag: String,
    },

    /// Derived platform tag would exceed the registry limit
    #[error("Release tag '{tag}' is too long: derived tags must fit in {max} characters")]
    TooLong {
        /// Offending tag
        tag: String,
        /// Maximum release tag length
        max: usize,
    },

    /// Tag collides with a floating tag managed by the pipeline
    #[error("Release tag '{tag}' is reserved by the pipeline")]
    Reserved {
        /// Offending tag
        tag: String,
    },
}

/// Release trigger errors
#[derive(Error, Debug)]
pub enum TriggerError {
    /// Event file could not be read
    #[error("Failed to read release event at {path}: {reason}")]
    Unreadable {
        /// Event file path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Event payload is not a release event
    #[error("Release event at {path} is malformed: {reason}")]
    Malformed {
        /// Event file path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Release action other than "published"
    #[error("Release action '{action}' does not trigger a release (expected 'published')")]
    UnsupportedAction {
        /// Action carried by the event
        action: String,
    },

    /// Release targets a different branch
    #[error("Release targets '{found}', but releases are only cut from '{expected}'")]
    WrongBranch {
        /// Configured branch
        expected: String,
        /// Branch carried by the event
        found: String,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required credential or registry setting is absent
    #[error("Missing required setting '{name}' (flag --{flag} or environment variable {env})")]
    Missing {
        /// Setting name
        name: String,
        /// CLI flag
        flag: String,
        /// Environment variable
        env: String,
    },

    /// Pipeline config file is invalid
    #[error("Invalid pipeline config at {path}: {reason}")]
    Invalid {
        /// Config file path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Tag endpoint template cannot produce a usable URL
    #[error("Invalid tag endpoint '{template}': {reason}")]
    InvalidEndpoint {
        /// Endpoint template
        template: String,
        /// Reason for the error
        reason: String,
    },
}

/// Container toolchain errors
#[derive(Error, Debug)]
pub enum ToolchainError {
    /// The docker binary could not be located
    #[error("Container toolchain '{program}' not found: {reason}")]
    NotFound {
        /// Program name
        program: String,
        /// Reason for the error
        reason: String,
    },

    /// Registry login failed
    #[error("Login to '{server}' failed: {reason}")]
    LoginFailed {
        /// Registry login server
        server: String,
        /// Reason for the error
        reason: String,
    },

    /// Registry logout failed
    #[error("Logout from '{server}' failed: {reason}")]
    LogoutFailed {
        /// Registry login server
        server: String,
        /// Reason for the error
        reason: String,
    },

    /// Image build failed
    #[error("Build of '{image}' failed: {reason}")]
    BuildFailed {
        /// Image reference
        image: String,
        /// Reason for the error
        reason: String,
    },

    /// Image push failed
    #[error("Push of '{image}' failed: {reason}")]
    PushFailed {
        /// Image reference
        image: String,
        /// Reason for the error
        reason: String,
    },

    /// Manifest list composition failed
    #[error("Manifest composition for '{target}' failed: {reason}")]
    ManifestFailed {
        /// Target manifest reference
        target: String,
        /// Reason for the error
        reason: String,
    },

    /// A toolchain command exceeded its deadline
    #[error("'{command}' timed out after {seconds} seconds")]
    TimedOut {
        /// Command line that timed out
        command: String,
        /// Timeout in seconds
        seconds: u64,
    },
}

/// Registry HTTP API errors
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Registry answered the deletion with a non-success status
    #[error("Deleting tag '{tag}' from '{repository}' failed with HTTP {status}: {body}")]
    DeleteFailed {
        /// Repository name
        repository: String,
        /// Tag name
        tag: String,
        /// HTTP status code
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// Request could not be sent or completed
    #[error("Request to '{url}' failed: {reason}")]
    RequestFailed {
        /// Request URL
        url: String,
        /// Reason for the error
        reason: String,
    },
}

impl ReleaseError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Config(ConfigError::Missing { flag, env, .. }) => vec![
                format!("Pass --{flag} on the command line"),
                format!("Or export {env} in the environment"),
            ],
            ReleaseError::Toolchain(ToolchainError::NotFound { .. }) => vec![
                "Install Docker: https://docs.docker.com/get-docker/".to_string(),
                "Ensure 'docker' is on PATH".to_string(),
            ],
            ReleaseError::Toolchain(ToolchainError::LoginFailed { .. }) => vec![
                "Verify REGISTRY_USERNAME and REGISTRY_PASSWORD".to_string(),
                "Check that the login server address is correct".to_string(),
            ],
            ReleaseError::Registry(RegistryError::DeleteFailed { tag, .. }) => vec![
                format!("Tag '{tag}' may be left behind in the registry"),
                "Retry the deletion with the 'cleanup' command".to_string(),
            ],
            ReleaseError::Trigger(TriggerError::WrongBranch { expected, .. }) => vec![
                format!("Publish the release from '{expected}'"),
                "Or set [trigger] branch in the pipeline config".to_string(),
            ],
            ReleaseError::Tag(TagError::Reserved { .. }) => {
                vec!["Choose a release tag other than 'latest'".to_string()]
            }
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}
