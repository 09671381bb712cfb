//! Container toolchain integration.
//!
//! Building, pushing, authenticating and composing manifest lists are owned
//! by the external `docker` CLI. This module defines the seam the pipeline
//! drives (`ContainerToolchain`) and the docker-backed implementation.
//!
//! # Module Structure
//!
//! - `invocation` - Docker command lines for every pipeline step
//! - `docker` - Runs invocations as child processes with timeouts
//! - `scope` - Per-task isolated docker client configuration

mod docker;
mod invocation;
mod scope;

pub use docker::{DockerCli, Timeouts};
pub use invocation::{Invocation, StepKind};
pub use scope::TaskScope;

use crate::config::{BuildDescriptor, RegistryAccess};
use crate::error::Result;
use crate::tag::{ImageRef, Platform};
use std::future::Future;

/// Operations the release pipeline needs from a container toolchain.
///
/// Every call runs inside a `TaskScope`, so concurrent tasks never share
/// registry credentials.
pub trait ContainerToolchain: Sync {
    /// Authenticate the scope against the registry
    fn login(
        &self,
        scope: &TaskScope,
        access: &RegistryAccess,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Build a platform image and tag it as `image`
    fn build(
        &self,
        scope: &TaskScope,
        platform: Platform,
        descriptor: &BuildDescriptor,
        image: &ImageRef,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Push a tagged image to the registry
    fn push(&self, scope: &TaskScope, image: &ImageRef) -> impl Future<Output = Result<()>> + Send;

    /// Compose a multi-platform manifest list under `target` from `sources`
    fn compose_manifest(
        &self,
        scope: &TaskScope,
        target: &ImageRef,
        sources: &[ImageRef],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Drop the scope's registry credentials
    fn logout(
        &self,
        scope: &TaskScope,
        access: &RegistryAccess,
    ) -> impl Future<Output = Result<()>> + Send;
}
