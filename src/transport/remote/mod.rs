//! Container CLI bridge for remote hosts
//!
//! Used when the container host is only reachable through `DOCKER_HOST=ssh://...`
//! or `tcp://...`. Each primitive shells out to the CLI; failures are classified
//! from the CLI's stderr.

pub mod command;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::process::Command;

use super::{ContainerSpec, Teardown, exec_outcome};
use crate::error::{ContainerError, Result};
use crate::types::{ContainerId, TransferDirection};

pub use command::CommandBuilder;

/// Captured result of one CLI invocation
struct CliOutput {
    success: bool,
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl CliOutput {
    fn stderr_mentions(&self, needle: &str) -> bool {
        self.stderr.to_lowercase().contains(needle)
    }

    fn detail(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("exit status {}", self.code.map_or("unknown".to_string(), |c| c.to_string()))
        } else {
            stderr.to_string()
        }
    }
}

/// Container CLI driver
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: PathBuf,
    host: String,
}

impl DockerCli {
    /// Bridge to `host` using a known CLI binary
    pub fn new(binary: impl Into<PathBuf>, host: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            host: host.into(),
        }
    }

    /// Bridge to `host`, using `explicit` or the first `docker` on `PATH`
    ///
    /// # Errors
    /// Returns `InvalidConfig` if no CLI binary can be found
    pub fn locate(explicit: Option<PathBuf>, host: &str) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path, host));
        }
        let binary = which::which("docker").map_err(|e| {
            ContainerError::invalid_config(format!(
                "DOCKER_HOST={host} requires the docker CLI, but it was not found: {e}"
            ))
        })?;
        Ok(Self::new(binary, host))
    }

    /// CLI binary in use
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .env("DOCKER_HOST", &self.host)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn output(mut cmd: Command) -> std::io::Result<CliOutput> {
        let output = cmd.output().await?;
        Ok(CliOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn run(&self, args: &[String]) -> std::io::Result<CliOutput> {
        debug!("{} {}", self.binary.display(), args.join(" "));
        Self::output(self.command(args)).await
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    async fn ensure_image(&self, image: &str) -> Result<()> {
        let inspect = self
            .run(&CommandBuilder::inspect_image(image))
            .await
            .map_err(|e| ContainerError::provisioning(format!("inspect image {image}: {e}")))?;

        if inspect.success {
            return Ok(());
        }
        if !inspect.stderr_mentions("no such image") {
            return Err(ContainerError::provisioning(format!(
                "inspect image {image}: {}",
                inspect.detail()
            )));
        }

        info!("Pulling image {image}");
        let pull = self
            .run(&CommandBuilder::pull(image))
            .await
            .map_err(|e| ContainerError::provisioning(format!("pull {image}: {e}")))?;
        if !pull.success {
            return Err(ContainerError::provisioning(format!(
                "pull {image}: {}",
                pull.detail()
            )));
        }
        info!("Pulled image {image}");
        Ok(())
    }

    /// Ensure the image and create the container
    ///
    /// # Errors
    /// Returns `Provisioning` if the pull or create fails
    pub async fn create(&self, spec: &ContainerSpec) -> Result<ContainerId> {
        self.ensure_image(&spec.image).await?;

        let args = CommandBuilder::create(spec);
        debug!("{} {}", self.binary.display(), args.join(" "));
        let mut cmd = self.command(&args);
        for (key, value) in spec.env.iter() {
            cmd.env(key, value);
        }

        let out = Self::output(cmd)
            .await
            .map_err(|e| ContainerError::provisioning(format!("create {}: {e}", spec.name)))?;
        if !out.success {
            return Err(ContainerError::provisioning(format!(
                "create {}: {}",
                spec.name,
                out.detail()
            )));
        }

        let id = out.stdout.trim();
        if id.is_empty() {
            return Err(ContainerError::provisioning(format!(
                "create {}: CLI printed no container id",
                spec.name
            )));
        }
        Ok(ContainerId::new(id))
    }

    /// Start a created container
    ///
    /// # Errors
    /// Returns `Provisioning` if the CLI fails
    pub async fn start(&self, id: &ContainerId) -> Result<()> {
        let out = self
            .run(&CommandBuilder::start(id))
            .await
            .map_err(|e| ContainerError::provisioning(format!("start {}: {e}", id.short())))?;
        if !out.success {
            return Err(ContainerError::provisioning(format!(
                "start {}: {}",
                id.short(),
                out.detail()
            )));
        }
        Ok(())
    }

    /// Run a command and return stdout
    ///
    /// # Errors
    /// Returns `Execution` or `Timeout`
    pub async fn exec(&self, id: &ContainerId, command: &[String], timeout: Duration) -> Result<String> {
        let args = CommandBuilder::exec(id, command);
        let out = tokio::time::timeout(timeout, self.run(&args))
            .await
            .map_err(|_| ContainerError::timeout(format!("exec in container {}", id.short()), timeout))?
            .map_err(|e| ContainerError::execution(format!("exec in {}: {e}", id.short())))?;

        if !out.success
            && (out.stderr_mentions("no such container") || out.stderr_mentions("is not running"))
        {
            return Err(ContainerError::execution_with_output(
                format!("exec in {}: {}", id.short(), out.stderr.trim()),
                out.stdout,
                out.stderr,
            ));
        }

        let code = if out.success { Some(0) } else { out.code.map(i64::from).or(Some(-1)) };
        exec_outcome(id, out.stdout, out.stderr, code)
    }

    /// Copy between host and container
    ///
    /// # Errors
    /// Returns `Transfer` on failure
    pub async fn copy(
        &self,
        id: &ContainerId,
        direction: TransferDirection,
        source: &str,
        dest: &str,
    ) -> Result<()> {
        let out = self
            .run(&CommandBuilder::copy(id, direction, source, dest))
            .await
            .map_err(|e| ContainerError::transfer(format!("copy {source} -> {dest}: {e}")))?;
        if !out.success {
            return Err(ContainerError::transfer(format!(
                "copy {source} -> {dest}: {}",
                out.detail()
            )));
        }
        Ok(())
    }

    /// Whether the container is running; errors read as `false`
    pub async fn is_running(&self, id: &ContainerId) -> bool {
        match self.run(&CommandBuilder::inspect_running(id)).await {
            Ok(out) if out.success => out.stdout.trim() == "true",
            Ok(out) => {
                debug!("Inspect of {} failed: {}", id.short(), out.detail());
                false
            }
            Err(e) => {
                warn!("Inspect of {} failed: {e}", id.short());
                false
            }
        }
    }

    /// Stop the container
    ///
    /// # Errors
    /// Returns `Teardown` unless the container is stopped or absent
    pub async fn stop(&self, id: &ContainerId) -> Result<Teardown> {
        let out = self
            .run(&CommandBuilder::stop(id))
            .await
            .map_err(|e| ContainerError::teardown(format!("stop {}: {e}", id.short())))?;
        classify_teardown(&out, "stop", id)
    }

    /// Remove the container
    ///
    /// # Errors
    /// Returns `Teardown` unless the container is absent
    pub async fn remove(&self, id: &ContainerId) -> Result<Teardown> {
        let out = self
            .run(&CommandBuilder::remove(id))
            .await
            .map_err(|e| ContainerError::teardown(format!("remove {}: {e}", id.short())))?;
        classify_teardown(&out, "remove", id)
    }

    /// Fetch the log tail
    ///
    /// # Errors
    /// Returns `Execution` if the container is gone
    pub async fn logs(&self, id: &ContainerId, tail: u32) -> Result<String> {
        let out = self
            .run(&CommandBuilder::logs(id, tail))
            .await
            .map_err(|e| ContainerError::execution(format!("logs of {}: {e}", id.short())))?;
        if !out.success {
            return Err(ContainerError::execution(format!(
                "logs of {}: {}",
                id.short(),
                out.detail()
            )));
        }
        // The CLI replays the container's stderr on its own stderr.
        Ok(format!("{}{}", out.stdout, out.stderr))
    }
}

fn classify_teardown(out: &CliOutput, action: &str, id: &ContainerId) -> Result<Teardown> {
    if out.success {
        return Ok(Teardown::Done);
    }
    if out.stderr_mentions("no such container") {
        return Ok(Teardown::Missing);
    }
    if out.stderr_mentions("is not running") {
        return Ok(Teardown::AlreadyStopped);
    }
    Err(ContainerError::teardown(format!(
        "{action} {}: {}",
        id.short(),
        out.detail()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(stderr: &str) -> CliOutput {
        CliOutput {
            success: false,
            code: Some(1),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn absent_container_is_not_a_teardown_failure() {
        let id = ContainerId::new("abc");
        assert_eq!(
            classify_teardown(&failed("Error: No such container: abc"), "rm", &id).unwrap(),
            Teardown::Missing
        );
        assert_eq!(
            classify_teardown(&failed("Container abc is not running"), "stop", &id).unwrap(),
            Teardown::AlreadyStopped
        );
        assert!(classify_teardown(&failed("permission denied"), "rm", &id).is_err());
    }

    #[test]
    fn empty_stderr_reports_exit_status() {
        assert_eq!(failed("").detail(), "exit status 1");
    }

    /// Stand-in CLI: a shell script that ignores its `exec <id> ...` arguments
    #[cfg(unix)]
    fn fake_cli(dir: &tempfile::TempDir, body: &str) -> DockerCli {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.path().join("docker");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        DockerCli::new(path, "ssh://nowhere")
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exec_timeout_is_distinguishable() {
        let dir = tempfile::tempdir().unwrap();
        let cli = fake_cli(&dir, "sleep 5");
        let err = cli
            .exec(&ContainerId::new("abc"), &["true".to_string()], Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ContainerError::Timeout { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exec_returns_stdout_from_cli() {
        let dir = tempfile::tempdir().unwrap();
        let cli = fake_cli(&dir, "echo hi");
        let out = cli
            .exec(&ContainerId::new("abc"), &["true".to_string()], Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(out, "hi\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn vanished_container_is_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let cli = fake_cli(&dir, "echo 'Error: No such container: abc' >&2; exit 1");
        let err = cli
            .exec(&ContainerId::new("abc"), &["true".to_string()], Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, ContainerError::Execution { .. }));
        assert!(err.indicates_absent_container());
    }
}
