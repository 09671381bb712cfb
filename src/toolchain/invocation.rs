//! Docker command lines for each pipeline step.

use super::TaskScope;
use crate::config::{BuildDescriptor, RegistryAccess, Secret};
use crate::tag::{ImageRef, Platform};
use std::fmt;

/// Kind of toolchain step, used to pick timeouts and error variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// `docker login`
    Login,
    /// `docker build`
    Build,
    /// `docker push`
    Push,
    /// `docker manifest create`
    ManifestCreate,
    /// `docker manifest push`
    ManifestPush,
    /// `docker logout`
    Logout,
}

/// A single docker command line
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Step this invocation performs
    pub kind: StepKind,
    /// Global flags selecting the task's config directory and docker context
    pub globals: Vec<String>,
    /// Subcommand and its arguments
    pub args: Vec<String>,
    /// Data piped to stdin (the registry password for login)
    pub stdin: Option<Secret>,
}

impl Invocation {
    fn new(kind: StepKind, scope: &TaskScope) -> Self {
        let mut globals = vec![
            "--config".to_string(),
            scope.config_dir().display().to_string(),
        ];
        if let Some(context) = scope.docker_context() {
            globals.push("--context".to_string());
            globals.push(context.to_string());
        }

        Self {
            kind,
            globals,
            args: Vec::new(),
            stdin: None,
        }
    }

    fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `docker login SERVER --username USER --password-stdin`
    pub fn login(scope: &TaskScope, access: &RegistryAccess) -> Self {
        let mut invocation = Self::new(StepKind::Login, scope)
            .arg("login")
            .arg(&access.login_server)
            .arg("--username")
            .arg(&access.username)
            .arg("--password-stdin");
        invocation.stdin = Some(access.password.clone());
        invocation
    }

    /// `docker logout SERVER`
    pub fn logout(scope: &TaskScope, access: &RegistryAccess) -> Self {
        Self::new(StepKind::Logout, scope)
            .arg("logout")
            .arg(&access.login_server)
    }

    /// `docker build --file F --tag IMAGE [--build-arg K=V]... CONTEXT`
    pub fn build(
        scope: &TaskScope,
        platform: Platform,
        descriptor: &BuildDescriptor,
        image: &ImageRef,
    ) -> Self {
        let mut invocation = Self::new(StepKind::Build, scope)
            .arg("build")
            .arg("--file")
            .arg(descriptor.dockerfile_for(platform).display().to_string())
            .arg("--tag")
            .arg(image.to_string());
        for (key, value) in &descriptor.build_args {
            invocation = invocation.arg("--build-arg").arg(format!("{key}={value}"));
        }
        invocation.arg(descriptor.context_dir().display().to_string())
    }

    /// `docker push IMAGE`
    pub fn push(scope: &TaskScope, image: &ImageRef) -> Self {
        Self::new(StepKind::Push, scope)
            .arg("push")
            .arg(image.to_string())
    }

    /// `docker manifest create --amend TARGET SOURCE...`
    pub fn manifest_create(scope: &TaskScope, target: &ImageRef, sources: &[ImageRef]) -> Self {
        let invocation = Self::new(StepKind::ManifestCreate, scope)
            .arg("manifest")
            .arg("create")
            .arg("--amend")
            .arg(target.to_string());
        sources
            .iter()
            .fold(invocation, |inv, source| inv.arg(source.to_string()))
    }

    /// `docker manifest push --purge TARGET`
    pub fn manifest_push(scope: &TaskScope, target: &ImageRef) -> Self {
        Self::new(StepKind::ManifestPush, scope)
            .arg("manifest")
            .arg("push")
            .arg("--purge")
            .arg(target.to_string())
    }

    /// Full argument list passed to the docker binary
    pub fn argv(&self) -> impl Iterator<Item = &str> {
        self.globals.iter().chain(&self.args).map(String::as_str)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "docker {}", self.argv().collect::<Vec<_>>().join(" "))?;
        if self.stdin.is_some() {
            write!(f, " < (stdin)")?;
        }
        Ok(())
    }
}
