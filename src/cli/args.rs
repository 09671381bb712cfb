//! Command line argument parsing and validation.

use crate::config::{RegistryAccess, Secret};
use crate::error::{ConfigError, Result};
use crate::trigger::Trigger;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Multi-platform container image release tool
#[derive(Parser, Debug)]
#[command(
    name = "container_release",
    version,
    about = "Build, push and merge Windows and Linux container images into one release tag",
    long_about = "Release a container image for Windows and Linux as one multi-platform tag.

Stage A builds and pushes <tag>-windows and <tag>-linux in parallel.
Stage B, only when both succeeded, composes manifest lists <tag> and latest
from the two platform tags and deletes the intermediate platform tags.

Usage:
  container_release release v1.2.0
  container_release release --event \"$GITHUB_EVENT_PATH\"
  container_release plan v1.2.0
  container_release cleanup v1.2.0"
)]
pub struct Args {
    /// Command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Registry address and credentials
    #[command(flatten)]
    pub registry: RegistryArgs,

    /// Pipeline config file (defaults to ./release.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write a JSON run report to this path
    #[arg(long, global = true, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Show step-by-step progress
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the full release pipeline
    Release(TriggerArgs),

    /// Show every command and request a release would issue, without running them
    Plan(TriggerArgs),

    /// Delete the per-platform tags of a release left behind by a failed cleanup
    Cleanup {
        /// Release tag whose <tag>-windows and <tag>-linux should be deleted
        #[arg(value_name = "TAG")]
        tag: String,
    },
}

impl Command {
    /// Command name for messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Release(_) => "release",
            Command::Plan(_) => "plan",
            Command::Cleanup { .. } => "cleanup",
        }
    }
}

/// Where the release tag comes from
#[derive(clap::Args, Debug, Clone)]
pub struct TriggerArgs {
    /// Release tag, e.g. v1.2.0
    #[arg(value_name = "TAG", required_unless_present = "event", conflicts_with = "event")]
    pub tag: Option<String>,

    /// GitHub release event payload to take the tag from
    #[arg(long, value_name = "PATH")]
    pub event: Option<PathBuf>,
}

impl TriggerArgs {
    /// Trigger described by these arguments.
    ///
    /// clap guarantees exactly one of TAG and `--event`; an event path wins.
    pub fn trigger(&self) -> Trigger {
        match &self.event {
            Some(path) => Trigger::Event(path.clone()),
            None => Trigger::Tag(self.tag.clone().unwrap_or_default()),
        }
    }
}

/// Registry settings, injected by flag or environment
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RegistryArgs {
    /// Registry login server, e.g. myregistry.azurecr.io
    #[arg(long, global = true, env = "REGISTRY_LOGIN_SERVER", value_name = "HOST")]
    pub login_server: Option<String>,

    /// Repository name inside the registry
    #[arg(long, global = true, env = "REGISTRY_REPOSITORY", value_name = "NAME")]
    pub repository: Option<String>,

    /// Registry username
    #[arg(long, global = true, env = "REGISTRY_USERNAME", value_name = "USER")]
    pub username: Option<String>,

    /// Registry password or token
    #[arg(
        long,
        global = true,
        env = "REGISTRY_PASSWORD",
        hide_env_values = true,
        value_name = "PASSWORD"
    )]
    pub password: Option<String>,
}

/// Placeholder shown for credentials not needed by a dry run
const PLAN_USERNAME_PLACEHOLDER: &str = "$REGISTRY_USERNAME";

impl RegistryArgs {
    /// Registry access for a real run: every setting is required
    pub fn access(&self) -> Result<RegistryAccess> {
        Ok(RegistryAccess::new(
            required(&self.login_server, "login server", "login-server", "REGISTRY_LOGIN_SERVER")?,
            required(&self.repository, "repository", "repository", "REGISTRY_REPOSITORY")?,
            required(&self.username, "username", "username", "REGISTRY_USERNAME")?,
            Secret::new(required(&self.password, "password", "password", "REGISTRY_PASSWORD")?),
        ))
    }

    /// Registry access for a dry run: credentials may be absent
    pub fn plan_access(&self) -> Result<RegistryAccess> {
        Ok(RegistryAccess::new(
            required(&self.login_server, "login server", "login-server", "REGISTRY_LOGIN_SERVER")?,
            required(&self.repository, "repository", "repository", "REGISTRY_REPOSITORY")?,
            self.username
                .clone()
                .unwrap_or_else(|| PLAN_USERNAME_PLACEHOLDER.to_string()),
            Secret::new(self.password.clone().unwrap_or_default()),
        ))
    }
}

fn required(value: &Option<String>, name: &str, flag: &str, env: &str) -> Result<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            ConfigError::Missing {
                name: name.to_string(),
                flag: flag.to_string(),
                env: env.to_string(),
            }
            .into()
        })
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(server) = &self.registry.login_server {
            let host = server
                .trim()
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/');
            if host.contains('/') || host.chars().any(char::is_whitespace) {
                return Err(format!(
                    "--login-server must be a host name, got '{server}'"
                ));
            }
        }

        if let Some(report) = &self.report
            && report.is_dir()
        {
            return Err(format!(
                "--report must be a file path, '{}' is a directory",
                report.display()
            ));
        }

        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            output: super::OutputManager::new(verbose, quiet),
        }
    }

    /// Print message
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print info message
    pub fn info_println(&self, message: &str) {
        let _ = self.output.info(message);
    }

    /// Print message only in verbose mode
    pub fn verbose_println(&self, message: &str) {
        let _ = self.output.verbose(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print section header
    pub fn section(&self, title: &str) {
        let _ = self.output.section(title);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }

    /// Check if verbose output is enabled
    pub fn is_verbose(&self) -> bool {
        self.output.is_verbose()
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.output.is_quiet()
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new(false, false)
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self::new(args.verbose, args.quiet)
    }
}
