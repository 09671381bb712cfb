//! Release triggers.
//!
//! A run starts from a tag given on the command line or from a GitHub
//! "release" event payload. Only published releases on the configured
//! branch start a run.

use crate::config::TriggerConfig;
use crate::error::{Result, TriggerError};
use crate::tag::ReleaseTag;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Action that starts a release run
pub const PUBLISHED_ACTION: &str = "published";

/// Where the release tag comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Tag passed directly
    Tag(String),
    /// Path to a GitHub release event payload
    Event(PathBuf),
}

impl Trigger {
    /// Resolve the trigger into a validated release tag
    pub fn resolve(&self, config: &TriggerConfig) -> Result<ReleaseTag> {
        match self {
            Trigger::Tag(raw) => Ok(ReleaseTag::parse(raw)?),
            Trigger::Event(path) => ReleaseEvent::load(path)?.release_tag(config),
        }
    }
}

/// Subset of the GitHub `release` webhook payload
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseEvent {
    /// Event action (`published`, `created`, `edited`, ...)
    pub action: String,
    /// Release object
    pub release: ReleasePayload,
}

/// Release object inside the event payload
#[derive(Debug, Clone, Deserialize)]
pub struct ReleasePayload {
    /// Tag the release points at
    pub tag_name: String,
    /// Branch or commit the release was cut from
    #[serde(default)]
    pub target_commitish: Option<String>,
}

impl ReleaseEvent {
    /// Read an event payload from disk
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| TriggerError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json(&text, path)
    }

    /// Parse an event payload
    pub fn from_json(text: &str, origin: &Path) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| {
            TriggerError::Malformed {
                path: origin.to_path_buf(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Validate the event against the trigger filter and extract the tag
    pub fn release_tag(&self, config: &TriggerConfig) -> Result<ReleaseTag> {
        if self.action != PUBLISHED_ACTION {
            return Err(TriggerError::UnsupportedAction {
                action: self.action.clone(),
            }
            .into());
        }

        if let Some(target) = self.release.target_commitish.as_deref() {
            let branch = target.strip_prefix("refs/heads/").unwrap_or(target);
            if branch != config.branch {
                return Err(TriggerError::WrongBranch {
                    expected: config.branch.clone(),
                    found: target.to_string(),
                }
                .into());
            }
        }

        Ok(ReleaseTag::parse(&self.release.tag_name)?)
    }
}
