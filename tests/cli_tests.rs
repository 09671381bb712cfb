//! End-to-end tests of the command line surface.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Binary run in an empty directory with no registry settings inherited
fn container_release(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("container_release").unwrap();
    cmd.current_dir(workdir.path())
        .env("NO_COLOR", "1")
        .env_remove("REGISTRY_LOGIN_SERVER")
        .env_remove("REGISTRY_REPOSITORY")
        .env_remove("REGISTRY_USERNAME")
        .env_remove("REGISTRY_PASSWORD");
    cmd
}

#[test]
fn test_plan_prints_release_graph() {
    let workdir = TempDir::new().unwrap();
    container_release(&workdir)
        .args(["plan", "v1.2.0", "--login-server", "reg.io", "--repository", "app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Plan for v1.2.0"))
        .stdout(predicate::str::contains(
            "Tags: v1.2.0-windows, v1.2.0-linux, v1.2.0, latest",
        ))
        .stdout(predicate::str::contains("Stage A (parallel)"))
        .stdout(predicate::str::contains("Stage B (after both succeed)"))
        .stdout(predicate::str::contains(
            "docker build --file Dockerfile.windows --tag reg.io/app:v1.2.0-windows .",
        ))
        .stdout(predicate::str::contains(
            "docker build --file Dockerfile --tag reg.io/app:v1.2.0-linux .",
        ))
        .stdout(predicate::str::contains(
            "docker manifest create --amend reg.io/app:latest reg.io/app:v1.2.0-windows reg.io/app:v1.2.0-linux",
        ))
        .stdout(predicate::str::contains(
            "DELETE https://reg.io/acr/v1/app/_tags/v1.2.0-windows",
        ))
        .stdout(predicate::str::contains(
            "DELETE https://reg.io/acr/v1/app/_tags/v1.2.0-linux",
        ));
}

#[test]
fn test_plan_never_shows_password() {
    let workdir = TempDir::new().unwrap();
    container_release(&workdir)
        .args(["plan", "v2", "--login-server", "reg.io", "--repository", "app"])
        .env("REGISTRY_USERNAME", "ci")
        .env("REGISTRY_PASSWORD", "hunter2")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "docker login reg.io --username ci --password-stdin < (stdin)",
        ))
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_plan_from_event_and_config() {
    let workdir = TempDir::new().unwrap();
    let config = fixture("release.toml");
    let event = fixture("release_event.json");
    container_release(&workdir)
        .arg("plan")
        .arg("--event")
        .arg(&event)
        .arg("--config")
        .arg(&config)
        .env("REGISTRY_LOGIN_SERVER", "myreg.azurecr.io")
        .env("REGISTRY_REPOSITORY", "app")
        .assert()
        .success()
        .stdout(predicate::str::contains("Plan for v1.2.0"))
        .stdout(predicate::str::contains(
            "docker --context windows-builder build --file docker/Dockerfile.windows --tag myreg.azurecr.io/app:v1.2.0-windows .",
        ))
        .stdout(predicate::str::contains(
            "docker build --file docker/Dockerfile.linux --tag myreg.azurecr.io/app:v1.2.0-linux --build-arg CHANNEL=stable .",
        ));
}

#[test]
fn test_plan_discovers_release_toml() {
    let workdir = TempDir::new().unwrap();
    std::fs::write(
        workdir.path().join("release.toml"),
        "[registry]\ntag_endpoint = \"/v2/{repository}/tags/{tag}\"\n",
    )
    .unwrap();
    container_release(&workdir)
        .args(["plan", "v3", "--login-server", "reg.io", "--repository", "app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DELETE https://reg.io/v2/app/tags/v3-linux"));
}

#[test]
fn test_plan_writes_report() {
    let workdir = TempDir::new().unwrap();
    let report = workdir.path().join("report.json");
    container_release(&workdir)
        .args(["plan", "v1.2.0", "--login-server", "reg.io", "--repository", "app", "--quiet"])
        .arg("--report")
        .arg(&report)
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["release_tag"], "v1.2.0");
    assert_eq!(json["tags"]["windows"], "v1.2.0-windows");
    let outcomes: Vec<&str> = json["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["outcome"].as_str().unwrap())
        .collect();
    assert_eq!(outcomes, ["succeeded", "succeeded", "succeeded"]);
}

#[test]
fn test_reserved_tag_rejected() {
    let workdir = TempDir::new().unwrap();
    container_release(&workdir)
        .args(["plan", "latest", "--login-server", "reg.io", "--repository", "app"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("reserved"));
}

#[test]
fn test_wrong_branch_event_rejected() {
    let workdir = TempDir::new().unwrap();
    let event = workdir.path().join("event.json");
    std::fs::write(
        &event,
        r#"{"action":"published","release":{"tag_name":"v1","target_commitish":"develop"}}"#,
    )
    .unwrap();
    container_release(&workdir)
        .args(["plan", "--login-server", "reg.io", "--repository", "app", "--event"])
        .arg(&event)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("develop"));
}

#[test]
fn test_release_requires_credentials() {
    let workdir = TempDir::new().unwrap();
    container_release(&workdir)
        .args(["release", "v1.2.0", "--login-server", "reg.io", "--repository", "app"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("REGISTRY_USERNAME"));
}

#[test]
fn test_cleanup_requires_credentials() {
    let workdir = TempDir::new().unwrap();
    container_release(&workdir)
        .args(["cleanup", "v1.2.0", "--login-server", "reg.io", "--repository", "app"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Missing required setting"));
}

/// Answer `count` HTTP requests on a local port, returning the request lines
fn serve_registry(
    count: usize,
    status_for: fn(&str) -> &'static str,
) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let handle = thread::spawn(move || {
        let mut request_lines = Vec::new();
        for _ in 0..count {
            let (mut socket, _) = listener.accept().unwrap();
            socket.set_read_timeout(Some(Duration::from_secs(10))).unwrap();

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let text = String::from_utf8_lossy(&request).to_string();
            let line = text.lines().next().unwrap_or_default().to_string();
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                status_for(&line)
            );
            socket.write_all(response.as_bytes()).unwrap();
            request_lines.push(line);
        }
        request_lines.sort();
        request_lines
    });

    (address, handle)
}

fn cleanup_against(workdir: &TempDir, address: &str) -> Command {
    std::fs::write(
        workdir.path().join("release.toml"),
        "[registry]\nscheme = \"http\"\n",
    )
    .unwrap();
    let mut cmd = container_release(workdir);
    cmd.args(["cleanup", "v1.2.0", "--repository", "app", "--login-server", address])
        .env("REGISTRY_USERNAME", "ci")
        .env("REGISTRY_PASSWORD", "hunter2");
    cmd
}

#[test]
fn test_cleanup_deletes_both_platform_tags() {
    let workdir = TempDir::new().unwrap();
    let (address, server) = serve_registry(2, |_| "202 Accepted");

    cleanup_against(&workdir, &address)
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted v1.2.0-windows"))
        .stdout(predicate::str::contains("Deleted v1.2.0-linux"));

    assert_eq!(
        server.join().unwrap(),
        [
            "DELETE /acr/v1/app/_tags/v1.2.0-linux HTTP/1.1",
            "DELETE /acr/v1/app/_tags/v1.2.0-windows HTTP/1.1",
        ]
    );
}

#[test]
fn test_cleanup_failure_still_attempts_other_tag() {
    let workdir = TempDir::new().unwrap();
    let (address, server) = serve_registry(2, |line| {
        if line.contains("-windows") {
            "404 Not Found"
        } else {
            "200 OK"
        }
    });

    cleanup_against(&workdir, &address)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Deleted v1.2.0-linux"))
        .stderr(predicate::str::contains("Could not delete v1.2.0-windows"));

    assert_eq!(server.join().unwrap().len(), 2);
}

#[test]
fn test_tag_and_event_are_exclusive() {
    let workdir = TempDir::new().unwrap();
    container_release(&workdir)
        .args(["plan", "v1", "--event", "event.json"])
        .assert()
        .failure();
}

#[test]
fn test_help_lists_commands() {
    let workdir = TempDir::new().unwrap();
    container_release(&workdir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("release"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("cleanup"));
}
