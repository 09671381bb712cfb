//! Configuration for release runs.
//!
//! Two sources feed a run:
//! - `credentials`: registry address and credential pair, injected through
//!   CLI flags or environment variables only
//! - `pipeline`: optional TOML file describing build descriptors, the
//!   release branch and the registry tag endpoint

mod credentials;
mod pipeline;

pub use credentials::{RegistryAccess, Secret};
pub use pipeline::{
    BuildDescriptor, DEFAULT_CONFIG_FILE, DEFAULT_TAG_ENDPOINT, PipelineConfig, PlatformsConfig,
    RegistryApiConfig, TriggerConfig,
};
