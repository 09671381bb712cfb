//! # Container Release
//!
//! Release orchestration for multi-platform container images.
//!
//! A release tag `T` drives a fixed job graph:
//!
//! - **Stage A** (concurrent): build and push `T-windows` and `T-linux`,
//!   each inside its own authenticated docker scope
//! - **Stage B** (only if both succeeded): compose manifest lists `T` and
//!   `latest` from the platform tags, then delete both platform tags via
//!   the registry's tag-management API
//!
//! Building, pushing and manifest composition are delegated to the `docker`
//! CLI; tag deletion is an authenticated HTTP `DELETE`. The crate owns only
//! the sequencing, the success gate between stages, and reporting.
//!
//! ## Usage
//!
//! ```bash
//! container_release release v1.2.0           # run the pipeline
//! container_release release --event event.json
//! container_release plan v1.2.0              # dry run, print every command
//! container_release cleanup v1.2.0           # delete orphaned platform tags
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod tag;
pub mod toolchain;
pub mod trigger;

pub use cli::Args;
pub use config::{PipelineConfig, RegistryAccess, Secret};
pub use error::{ReleaseError, Result};
pub use pipeline::{Orchestrator, PipelineReport, TaskId, TaskOutcome};
pub use registry::{RegistryClient, TagDeleter};
pub use tag::{ImageRef, Platform, ReleaseTag, TagSet};
pub use toolchain::{ContainerToolchain, DockerCli, TaskScope};
pub use trigger::Trigger;
