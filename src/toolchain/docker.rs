//! Docker CLI backed toolchain.
//!
//! Each invocation runs as a child process. Stdout is streamed to the log
//! line by line, stderr is captured for error reports, and a per-step
//! timeout kills the child if it hangs.

use super::{ContainerToolchain, Invocation, StepKind, TaskScope};
use crate::config::{BuildDescriptor, RegistryAccess};
use crate::error::{ReleaseError, Result, ToolchainError};
use crate::tag::{ImageRef, Platform};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;

/// Number of stderr lines kept in error messages
const STDERR_TAIL_LINES: usize = 20;

/// Deadlines for toolchain steps
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Image builds (base image pulls and layer builds are slow)
    pub build: Duration,
    /// Image pushes
    pub push: Duration,
    /// Login, logout and manifest operations
    pub default: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            build: Duration::from_secs(1800),
            push: Duration::from_secs(1800),
            default: Duration::from_secs(300),
        }
    }
}

impl Timeouts {
    fn for_step(&self, kind: StepKind) -> Duration {
        match kind {
            StepKind::Build => self.build,
            StepKind::Push => self.push,
            _ => self.default,
        }
    }
}

/// Why a child process did not succeed
#[derive(Debug)]
enum RunFailure {
    /// Could not start or wait for the process
    Process(String),
    /// Non-zero exit
    Exit { code: Option<i32>, stderr: String },
    /// Deadline exceeded, process killed
    TimedOut(Duration),
}

impl RunFailure {
    fn into_error(
        self,
        invocation: &Invocation,
        step_error: impl FnOnce(String) -> ToolchainError,
    ) -> ReleaseError {
        let error = match self {
            RunFailure::TimedOut(after) => ToolchainError::TimedOut {
                command: invocation.to_string(),
                seconds: after.as_secs(),
            },
            RunFailure::Process(reason) => step_error(reason),
            RunFailure::Exit { code, stderr } => {
                let status = match code {
                    Some(code) => format!("exit code {code}"),
                    None => "terminated by signal".to_string(),
                };
                if stderr.is_empty() {
                    step_error(status)
                } else {
                    step_error(format!("{status}: {stderr}"))
                }
            }
        };
        error.into()
    }
}

/// Toolchain that shells out to the `docker` binary
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: PathBuf,
    timeouts: Timeouts,
}

impl DockerCli {
    /// Locate `docker` on PATH
    pub fn locate() -> Result<Self> {
        let program = which::which("docker").map_err(|e| ToolchainError::NotFound {
            program: "docker".to_string(),
            reason: e.to_string(),
        })?;
        log::debug!("Using docker at {}", program.display());
        Ok(Self::with_program(program))
    }

    /// Use an explicit docker binary
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeouts: Timeouts::default(),
        }
    }

    /// Override step timeouts
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Path of the docker binary
    pub fn program(&self) -> &Path {
        &self.program
    }

    async fn run(
        &self,
        scope: &TaskScope,
        invocation: &Invocation,
    ) -> std::result::Result<(), RunFailure> {
        log::info!("[{}] {}", scope.name(), invocation);

        let mut child = Command::new(&self.program)
            .args(invocation.argv())
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RunFailure::Process(format!("failed to start docker: {e}")))?;

        if let (Some(secret), Some(mut stdin)) = (&invocation.stdin, child.stdin.take()) {
            stdin
                .write_all(secret.expose().as_bytes())
                .await
                .map_err(|e| RunFailure::Process(format!("failed to write stdin: {e}")))?;
            // Dropping stdin closes the pipe so docker sees EOF
        }

        let stderr_reader = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut captured = Vec::new();
                if let Err(e) = stderr.read_to_end(&mut captured).await {
                    log::debug!("Failed to read docker stderr: {e}");
                }
                String::from_utf8_lossy(&captured).into_owned()
            })
        });

        let stdout = child.stdout.take();
        let task = scope.name().to_string();
        let deadline = self.timeouts.for_step(invocation.kind);

        let waited = timeout(deadline, async {
            if let Some(stdout) = stdout {
                stream_lines(BufReader::new(stdout), &task).await;
            }
            child.wait().await
        })
        .await;

        let status = match waited {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(RunFailure::Process(e.to_string())),
            Err(_elapsed) => {
                log::warn!("[{}] {} timed out, killing", scope.name(), invocation);
                if let Err(e) = child.kill().await {
                    log::warn!("Failed to kill docker process: {e}");
                }
                if let Some(reader) = stderr_reader {
                    reader.abort();
                }
                return Err(RunFailure::TimedOut(deadline));
            }
        };

        let stderr = match stderr_reader {
            Some(reader) => reader.await.unwrap_or_default(),
            None => String::new(),
        };
        for line in stderr.lines() {
            log::debug!("[{}] {}", scope.name(), line);
        }

        if status.success() {
            Ok(())
        } else {
            Err(RunFailure::Exit {
                code: status.code(),
                stderr: tail(&stderr, STDERR_TAIL_LINES),
            })
        }
    }
}

/// Log every line of `reader` until EOF.
///
/// Output is decoded lossily and the pipe is drained even after a read
/// error, so docker never sees a closed stdout while it is still running.
async fn stream_lines<R>(mut reader: R, task: &str)
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => log::debug!("[{task}] {}", String::from_utf8_lossy(&line).trim_end()),
            Err(e) => {
                log::debug!("[{task}] stdout read failed: {e}");
                if let Err(e) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
                    log::debug!("[{task}] stdout drain failed: {e}");
                }
                break;
            }
        }
    }
}

/// Last `n` non-empty lines of `text`
fn tail(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

impl ContainerToolchain for DockerCli {
    async fn login(&self, scope: &TaskScope, access: &RegistryAccess) -> Result<()> {
        let invocation = Invocation::login(scope, access);
        self.run(scope, &invocation).await.map_err(|failure| {
            failure.into_error(&invocation, |reason| ToolchainError::LoginFailed {
                server: access.login_server.clone(),
                reason,
            })
        })
    }

    async fn build(
        &self,
        scope: &TaskScope,
        platform: Platform,
        descriptor: &BuildDescriptor,
        image: &ImageRef,
    ) -> Result<()> {
        let invocation = Invocation::build(scope, platform, descriptor, image);
        self.run(scope, &invocation).await.map_err(|failure| {
            failure.into_error(&invocation, |reason| ToolchainError::BuildFailed {
                image: image.to_string(),
                reason,
            })
        })
    }

    async fn push(&self, scope: &TaskScope, image: &ImageRef) -> Result<()> {
        let invocation = Invocation::push(scope, image);
        self.run(scope, &invocation).await.map_err(|failure| {
            failure.into_error(&invocation, |reason| ToolchainError::PushFailed {
                image: image.to_string(),
                reason,
            })
        })
    }

    async fn compose_manifest(
        &self,
        scope: &TaskScope,
        target: &ImageRef,
        sources: &[ImageRef],
    ) -> Result<()> {
        for invocation in [
            Invocation::manifest_create(scope, target, sources),
            Invocation::manifest_push(scope, target),
        ] {
            self.run(scope, &invocation).await.map_err(|failure| {
                failure.into_error(&invocation, |reason| ToolchainError::ManifestFailed {
                    target: target.to_string(),
                    reason,
                })
            })?;
        }
        Ok(())
    }

    async fn logout(&self, scope: &TaskScope, access: &RegistryAccess) -> Result<()> {
        let invocation = Invocation::logout(scope, access);
        self.run(scope, &invocation).await.map_err(|failure| {
            failure.into_error(&invocation, |reason| ToolchainError::LogoutFailed {
                server: access.login_server.clone(),
                reason,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;

    /// Write an executable `docker` shell script running `body`
    #[cfg(unix)]
    fn fake_docker(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let fake = dir.path().join("docker");
        std::fs::write(&fake, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();
        fake
    }

    #[test]
    fn test_tail_keeps_last_lines() {
        let text = "a\n\nb\nc\n  \nd\n";
        assert_eq!(tail(text, 2), "c\nd");
        assert_eq!(tail(text, 10), "a\nb\nc\nd");
        assert_eq!(tail("", 3), "");
    }

    #[test]
    fn test_step_timeouts() {
        let timeouts = Timeouts::default();
        assert_eq!(timeouts.for_step(StepKind::Build), Duration::from_secs(1800));
        assert_eq!(timeouts.for_step(StepKind::Push), Duration::from_secs(1800));
        assert_eq!(timeouts.for_step(StepKind::Login), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_missing_binary_fails_login() {
        let docker = DockerCli::with_program("/nonexistent/docker-binary");
        let scope = TaskScope::new("t", None).unwrap();
        let access = RegistryAccess::new("reg.io", "app", "ci", Secret::new("pw"));
        let err = docker.login(&scope, &access).await.unwrap_err();
        assert!(matches!(
            err,
            ReleaseError::Toolchain(ToolchainError::LoginFailed { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let fake = fake_docker(&dir, "echo 'denied: requested access' >&2\nexit 3");

        let docker = DockerCli::with_program(&fake);
        let scope = TaskScope::new("t", None).unwrap();
        let image = ImageRef::new("reg.io", "app", "v1-linux");
        let err = docker.push(&scope, &image).await.unwrap_err();
        match err {
            ReleaseError::Toolchain(ToolchainError::PushFailed { image, reason }) => {
                assert_eq!(image, "reg.io/app:v1-linux");
                assert!(reason.contains("exit code 3"));
                assert!(reason.contains("denied: requested access"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_process_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let fake = fake_docker(&dir, "sleep 30");

        let docker = DockerCli::with_program(&fake).with_timeouts(Timeouts {
            build: Duration::from_millis(200),
            push: Duration::from_millis(200),
            default: Duration::from_millis(200),
        });
        let scope = TaskScope::new("t", None).unwrap();
        let access = RegistryAccess::new("reg.io", "app", "ci", Secret::new("pw"));
        let err = docker.logout(&scope, &access).await.unwrap_err();
        assert!(matches!(
            err,
            ReleaseError::Toolchain(ToolchainError::TimedOut { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_stdout_does_not_fail_step() {
        let dir = tempfile::tempdir().unwrap();
        let fake = fake_docker(
            &dir,
            "printf 'caf\\351\\n'\nsleep 1\necho 'layer pushed'\necho 'digest: sha256:abc'\nexit 0",
        );

        let docker = DockerCli::with_program(&fake);
        let scope = TaskScope::new("t", None).unwrap();
        let image = ImageRef::new("reg.io", "app", "v1-windows");
        docker.push(&scope, &image).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_stderr_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let fake = fake_docker(&dir, "printf 'unauthorized: caf\\351\\n' >&2\nexit 1");

        let docker = DockerCli::with_program(&fake);
        let scope = TaskScope::new("t", None).unwrap();
        let access = RegistryAccess::new("reg.io", "app", "ci", Secret::new("pw"));
        match docker.login(&scope, &access).await.unwrap_err() {
            ReleaseError::Toolchain(ToolchainError::LoginFailed { reason, .. }) => {
                assert!(reason.starts_with("exit code 1"));
                assert!(reason.contains("unauthorized: caf"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_signal_termination_message() {
        let dir = tempfile::tempdir().unwrap();
        let fake = fake_docker(&dir, "kill -9 $$");

        let docker = DockerCli::with_program(&fake);
        let scope = TaskScope::new("t", None).unwrap();
        let image = ImageRef::new("reg.io", "app", "v1-linux");
        match docker.push(&scope, &image).await.unwrap_err() {
            ReleaseError::Toolchain(ToolchainError::PushFailed { reason, .. }) => {
                assert_eq!(reason, "terminated by signal");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
