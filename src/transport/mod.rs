//! Transport layer for controlling session containers
//!
//! [`ContainerBackend`] is the capability set every session operation is built
//! on. Two implementations exist: [`local::EngineClient`] talks to the Engine API
//! over a Unix socket, and [`remote::DockerCli`] drives the container CLI for hosts
//! reachable only through `ssh://` or `tcp://`. [`DockerTransport`] picks one of
//! them once, at construction.

pub mod local;
pub mod remote;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use log::{info, warn};

use crate::config::{
    CONTAINER_WORKDIR, NPM_CACHE_PATH, NPM_CACHE_VOLUME, ServerConfig, TransportMode,
};
use crate::error::{ContainerError, Result};
use crate::types::{ContainerId, MountSpec, TransferDirection};

pub use local::EngineClient;
pub use remote::DockerCli;

// ============================================================================
// CONTAINER SPEC
// ============================================================================

/// Environment injected into a container.
///
/// `Debug` prints variable names only; values may be credentials.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ContainerEnv(Vec<(String, String)>);

impl ContainerEnv {
    /// Append a variable
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Iterate over `(name, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Variable names, safe to log
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    /// Value of a variable, if set
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// `NAME=value` entries in Engine API form
    #[must_use]
    pub fn to_assignments(&self) -> Vec<String> {
        self.0.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }
}

impl From<Vec<(String, String)>> for ContainerEnv {
    fn from(vars: Vec<(String, String)>) -> Self {
        Self(vars)
    }
}

impl fmt::Debug for ContainerEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Everything needed to create one session container
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    /// Container name
    pub name: String,
    /// Image reference
    pub image: String,
    /// Host directory bound read-write at the working directory
    pub project_path: String,
    /// Additional bindings, in order
    pub mounts: Vec<MountSpec>,
    /// Injected environment
    pub env: ContainerEnv,
    /// Main process
    pub command: Vec<String>,
}

impl ContainerSpec {
    /// Bind strings in `host:container[:ro]` form: project, npm cache, then extra mounts
    #[must_use]
    pub fn binds(&self) -> Vec<String> {
        let mut binds = vec![
            format!("{}:{CONTAINER_WORKDIR}", self.project_path),
            format!("{NPM_CACHE_VOLUME}:{NPM_CACHE_PATH}"),
        ];
        binds.extend(self.mounts.iter().map(MountSpec::bind_spec));
        binds
    }
}

/// Result of a stop or remove call that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// The call took effect
    Done,
    /// The container was already stopped
    AlreadyStopped,
    /// No such container
    Missing,
}

// ============================================================================
// BACKEND TRAIT
// ============================================================================

/// Container lifecycle primitives shared by both transports
///
/// Every method has the same contract on both implementations.
pub trait ContainerBackend: Send + Sync + 'static {
    /// Ensure the image is present (pulling on "no such image") and create the container
    ///
    /// # Errors
    /// Returns `Provisioning` if the pull or create fails
    fn create(&self, spec: &ContainerSpec) -> impl Future<Output = Result<ContainerId>> + Send;

    /// Start a created container
    ///
    /// # Errors
    /// Returns `Provisioning` if the container cannot be started
    fn start(&self, id: &ContainerId) -> impl Future<Output = Result<()>> + Send;

    /// Run `command` in the container and return its standard output
    ///
    /// # Errors
    /// Returns `Execution` carrying partial output, or `Timeout` when `timeout` expires
    fn exec(
        &self,
        id: &ContainerId,
        command: &[String],
        timeout: Duration,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Copy a file or directory between host and container
    ///
    /// # Errors
    /// Returns `Transfer` on failure
    fn copy(
        &self,
        id: &ContainerId,
        direction: TransferDirection,
        source: &str,
        dest: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Liveness check; any inspection failure reads as "not running"
    fn is_running(&self, id: &ContainerId) -> impl Future<Output = bool> + Send;

    /// Stop the container
    ///
    /// # Errors
    /// Returns `Teardown` for failures other than an absent or stopped container
    fn stop(&self, id: &ContainerId) -> impl Future<Output = Result<Teardown>> + Send;

    /// Remove the container
    ///
    /// # Errors
    /// Returns `Teardown` for failures other than an absent container
    fn remove(&self, id: &ContainerId) -> impl Future<Output = Result<Teardown>> + Send;

    /// Most recent `tail` log lines with timestamps
    ///
    /// # Errors
    /// Returns `Execution` if the container is gone
    fn logs(&self, id: &ContainerId, tail: u32) -> impl Future<Output = Result<String>> + Send;
}

// ============================================================================
// MODE SELECTION
// ============================================================================

/// Backend chosen once from configuration
pub enum DockerTransport {
    /// Engine API over a Unix socket
    Local(EngineClient),
    /// Container CLI bridging to a remote host
    Remote(DockerCli),
}

impl DockerTransport {
    /// Build the backend named by `config.transport`
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the remote mode is selected and no CLI binary is found
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        match &config.transport {
            TransportMode::Local { socket } => {
                info!("Using Engine API at {}", socket.display());
                Ok(Self::Local(EngineClient::new(socket)))
            }
            TransportMode::Remote { host } => {
                let cli = DockerCli::locate(config.docker_cli.clone(), host)?;
                info!("Using container CLI {} for {host}", cli.binary().display());
                Ok(Self::Remote(cli))
            }
        }
    }
}

impl ContainerBackend for DockerTransport {
    async fn create(&self, spec: &ContainerSpec) -> Result<ContainerId> {
        match self {
            Self::Local(engine) => engine.create(spec).await,
            Self::Remote(cli) => cli.create(spec).await,
        }
    }

    async fn start(&self, id: &ContainerId) -> Result<()> {
        match self {
            Self::Local(engine) => engine.start(id).await,
            Self::Remote(cli) => cli.start(id).await,
        }
    }

    async fn exec(&self, id: &ContainerId, command: &[String], timeout: Duration) -> Result<String> {
        match self {
            Self::Local(engine) => engine.exec(id, command, timeout).await,
            Self::Remote(cli) => cli.exec(id, command, timeout).await,
        }
    }

    async fn copy(
        &self,
        id: &ContainerId,
        direction: TransferDirection,
        source: &str,
        dest: &str,
    ) -> Result<()> {
        match self {
            Self::Local(engine) => engine.copy(id, direction, source, dest).await,
            Self::Remote(cli) => cli.copy(id, direction, source, dest).await,
        }
    }

    async fn is_running(&self, id: &ContainerId) -> bool {
        match self {
            Self::Local(engine) => engine.is_running(id).await,
            Self::Remote(cli) => cli.is_running(id).await,
        }
    }

    async fn stop(&self, id: &ContainerId) -> Result<Teardown> {
        match self {
            Self::Local(engine) => engine.stop(id).await,
            Self::Remote(cli) => cli.stop(id).await,
        }
    }

    async fn remove(&self, id: &ContainerId) -> Result<Teardown> {
        match self {
            Self::Local(engine) => engine.remove(id).await,
            Self::Remote(cli) => cli.remove(id).await,
        }
    }

    async fn logs(&self, id: &ContainerId, tail: u32) -> Result<String> {
        match self {
            Self::Local(engine) => engine.logs(id, tail).await,
            Self::Remote(cli) => cli.logs(id, tail).await,
        }
    }
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// Settle a finished exec into its caller-visible result.
///
/// Standard output wins whenever there is any; a non-zero exit only fails the
/// call when it produced nothing on stdout.
pub(crate) fn exec_outcome(
    id: &ContainerId,
    stdout: String,
    stderr: String,
    exit_code: Option<i64>,
) -> Result<String> {
    match exit_code {
        None | Some(0) => Ok(stdout),
        Some(code) if !stdout.trim().is_empty() => {
            warn!(
                "Command in container {} exited with status {code}; returning its output",
                id.short()
            );
            Ok(stdout)
        }
        Some(code) => {
            let detail = stderr.trim();
            let message = if detail.is_empty() {
                format!("Command exited with status {code}")
            } else {
                format!("Command exited with status {code}: {detail}")
            };
            Err(ContainerError::execution_with_output(message, stdout, stderr))
        }
    }
}

/// Split a POSIX container path into `(parent, file name)`.
///
/// A trailing slash means "into this directory", keeping `fallback_name`.
pub(crate) fn split_container_path<'a>(path: &'a str, fallback_name: &'a str) -> (&'a str, &'a str) {
    if path.ends_with('/') {
        let dir = path.trim_end_matches('/');
        return (if dir.is_empty() { "/" } else { dir }, fallback_name);
    }
    match path.rsplit_once('/') {
        Some(("", name)) => ("/", name),
        Some((parent, name)) => (parent, name),
        None => (".", path),
    }
}
