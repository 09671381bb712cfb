//! Pipeline configuration file (`release.toml`).

use crate::error::{ConfigError, Result};
use crate::tag::Platform;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "release.toml";

/// Azure Container Registry tag-management endpoint
pub const DEFAULT_TAG_ENDPOINT: &str = "/acr/v1/{repository}/_tags/{tag}";

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Trigger filtering
    pub trigger: TriggerConfig,
    /// Registry HTTP API settings
    pub registry: RegistryApiConfig,
    /// Per-platform build descriptors
    pub platforms: PlatformsConfig,
}

/// Which release events start a run
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriggerConfig {
    /// Branch releases must target
    pub branch: String,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            branch: "main".to_string(),
        }
    }
}

/// Registry HTTP API settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryApiConfig {
    /// URL scheme for the tag-management API
    pub scheme: String,
    /// Path template with `{repository}` and `{tag}` placeholders
    pub tag_endpoint: String,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RegistryApiConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            tag_endpoint: DEFAULT_TAG_ENDPOINT.to_string(),
            timeout_secs: 60,
        }
    }
}

/// Build descriptors for both platforms
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformsConfig {
    /// Windows image
    pub windows: BuildDescriptor,
    /// Linux image
    pub linux: BuildDescriptor,
}

/// How to build one platform image
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BuildDescriptor {
    /// Dockerfile path, relative to the working directory
    pub dockerfile: Option<PathBuf>,
    /// Build context directory
    pub context: Option<PathBuf>,
    /// Docker context (daemon) to build and push with
    pub docker_context: Option<String>,
    /// `--build-arg` values
    pub build_args: BTreeMap<String, String>,
}

impl BuildDescriptor {
    /// Dockerfile, falling back to the platform default
    pub fn dockerfile_for(&self, platform: Platform) -> PathBuf {
        self.dockerfile.clone().unwrap_or_else(|| match platform {
            Platform::Windows => PathBuf::from("Dockerfile.windows"),
            Platform::Linux => PathBuf::from("Dockerfile"),
        })
    }

    /// Build context, defaulting to the working directory
    pub fn context_dir(&self) -> PathBuf {
        self.context.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

impl PlatformsConfig {
    /// Descriptor for one platform
    pub fn descriptor(&self, platform: Platform) -> &BuildDescriptor {
        match platform {
            Platform::Windows => &self.windows,
            Platform::Linux => &self.linux,
        }
    }
}

impl PipelineConfig {
    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(text).map_err(|e| ConfigError::Invalid {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate(origin)?;
        Ok(config)
    }

    /// Load a config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Load the explicit config, else `release.toml` in `dir` if present, else defaults
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            log::debug!("Using pipeline config {}", candidate.display());
            Self::load(&candidate)
        } else {
            log::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
            Ok(Self::default())
        }
    }

    fn validate(&self, origin: &Path) -> Result<()> {
        let invalid = |reason: String| ConfigError::Invalid {
            path: origin.to_path_buf(),
            reason,
        };

        if self.trigger.branch.trim().is_empty() {
            return Err(invalid("[trigger] branch must not be empty".to_string()).into());
        }
        if !matches!(self.registry.scheme.as_str(), "http" | "https") {
            return Err(invalid(format!(
                "[registry] scheme must be 'http' or 'https', got '{}'",
                self.registry.scheme
            ))
            .into());
        }
        if self.registry.timeout_secs == 0 {
            return Err(invalid("[registry] timeout_secs must be at least 1".to_string()).into());
        }

        let endpoint = &self.registry.tag_endpoint;
        if !endpoint.starts_with('/') {
            return Err(ConfigError::InvalidEndpoint {
                template: endpoint.clone(),
                reason: "must start with '/'".to_string(),
            }
            .into());
        }
        for placeholder in ["{repository}", "{tag}"] {
            if !endpoint.contains(placeholder) {
                return Err(ConfigError::InvalidEndpoint {
                    template: endpoint.clone(),
                    reason: format!("missing {placeholder} placeholder"),
                }
                .into());
            }
        }

        Ok(())
    }
}
