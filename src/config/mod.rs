//! Process configuration
//!
//! Everything here is read once at startup from the environment and then passed
//! down by value. Per-session values (credentials, models) live in [`credentials`].

pub mod credentials;

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ContainerError, Result};

pub use credentials::{
    CredentialOptions, CredentialSummary, ModelDefaults, ModelMode, ResolvedCredentials,
};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Image used when a session does not name one
pub const DEFAULT_IMAGE: &str = "ghcr.io/zeeno-atl/claude-code:latest";

/// Local container host socket when `DOCKER_HOST` is unset
pub const DEFAULT_DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Working directory and project mount point inside every session container
pub const CONTAINER_WORKDIR: &str = "/app";

/// Named volume shared by all sessions for the npm cache
pub const NPM_CACHE_VOLUME: &str = "claude-code-npm-cache";

/// Mount point of [`NPM_CACHE_VOLUME`]
pub const NPM_CACHE_PATH: &str = "/npm-cache";

/// Entry point that launches the agent inside the container
pub const AGENT_WRAPPER: &str = "/claude-wrapper.sh";

/// Flag that disables the agent's interactive permission prompts
pub const SKIP_PERMISSIONS_FLAG: &str = "--dangerously-skip-permissions";

/// Container main process; keeps the container alive between execs
pub const KEEPALIVE_COMMAND: &[&str] = &["tail", "-f", "/dev/null"];

/// Log lines returned when the caller does not ask for a specific count
pub const DEFAULT_LOG_TAIL: u32 = 100;

/// Deadline for a single agent or shell exec
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Destroyed session identifiers remembered for idempotent destroy
pub const DEFAULT_RETIRED_CAPACITY: usize = 1024;

// ============================================================================
// TRANSPORT MODE
// ============================================================================

/// How the container host is reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMode {
    /// Engine API over a local Unix socket
    Local {
        /// Socket path
        socket: PathBuf,
    },
    /// Container CLI bridging to a remote host (`ssh://` or `tcp://`)
    Remote {
        /// Value of `DOCKER_HOST`
        host: String,
    },
}

impl TransportMode {
    /// Classify a `DOCKER_HOST` value
    ///
    /// # Errors
    /// Returns `InvalidConfig` for schemes other than `unix`, `ssh` and `tcp`
    pub fn from_docker_host(docker_host: Option<&str>) -> Result<Self> {
        let Some(host) = docker_host.filter(|h| !h.is_empty()) else {
            return Ok(Self::Local {
                socket: PathBuf::from(DEFAULT_DOCKER_SOCKET),
            });
        };

        if let Some(path) = host.strip_prefix("unix://") {
            return Ok(Self::Local {
                socket: PathBuf::from(path),
            });
        }

        if host.starts_with("ssh://") || host.starts_with("tcp://") {
            return Ok(Self::Remote {
                host: host.to_string(),
            });
        }

        Err(ContainerError::invalid_config(format!(
            "DOCKER_HOST has unsupported scheme: {host}"
        )))
    }
}

impl Default for TransportMode {
    fn default() -> Self {
        Self::Local {
            socket: PathBuf::from(DEFAULT_DOCKER_SOCKET),
        }
    }
}

// ============================================================================
// PROBE
// ============================================================================

/// Readiness probe parameters
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Pause after start before the first attempt
    pub settle: Duration,
    /// Maximum number of attempts
    pub attempts: u32,
    /// Pause between failed attempts
    pub interval: Duration,
    /// Deadline for each probe exec
    pub exec_timeout: Duration,
    /// Substring that marks a successful probe
    pub marker: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(2),
            attempts: 60,
            interval: Duration::from_secs(2),
            exec_timeout: Duration::from_secs(30),
            marker: "Claude Code".to_string(),
        }
    }
}

impl ProbeConfig {
    /// Probe command run inside the container
    #[must_use]
    pub fn command() -> Vec<String> {
        vec![AGENT_WRAPPER.to_string(), "--version".to_string()]
    }
}

// ============================================================================
// SERVER
// ============================================================================

/// Top-level server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Image used when a session does not name one
    pub default_image: String,
    /// Container host access mode
    pub transport: TransportMode,
    /// Explicit container CLI path for the remote mode
    pub docker_cli: Option<PathBuf>,
    /// Credential and model defaults
    pub model_defaults: ModelDefaults,
    /// Readiness probe parameters
    pub probe: ProbeConfig,
    /// Deadline for agent and shell execs
    pub exec_timeout: Duration,
    /// Serialize exec and transfer calls per session
    pub serialize_session_ops: bool,
    /// Tear down all sessions when the server exits
    pub cleanup_on_exit: bool,
    /// How many destroyed identifiers are remembered; older ones read as unknown
    pub retired_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_image: DEFAULT_IMAGE.to_string(),
            transport: TransportMode::default(),
            docker_cli: None,
            model_defaults: ModelDefaults::default(),
            probe: ProbeConfig::default(),
            exec_timeout: DEFAULT_EXEC_TIMEOUT,
            serialize_session_ops: false,
            cleanup_on_exit: true,
            retired_capacity: DEFAULT_RETIRED_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Build configuration from the process environment
    ///
    /// # Errors
    /// Returns `InvalidConfig` if a variable is present but malformed
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration through an arbitrary key lookup
    ///
    /// # Errors
    /// Returns `InvalidConfig` if a variable is present but malformed
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let mut probe = ProbeConfig::default();
        if let Some(raw) = get("CLAUDE_CONTAINER_PROBE_ATTEMPTS") {
            probe.attempts = parse_number("CLAUDE_CONTAINER_PROBE_ATTEMPTS", &raw)?;
            if probe.attempts == 0 {
                return Err(ContainerError::invalid_config(
                    "CLAUDE_CONTAINER_PROBE_ATTEMPTS must be at least 1",
                ));
            }
        }
        if let Some(raw) = get("CLAUDE_CONTAINER_PROBE_INTERVAL_SECS") {
            probe.interval = Duration::from_secs(parse_number(
                "CLAUDE_CONTAINER_PROBE_INTERVAL_SECS",
                &raw,
            )?);
        }

        let exec_timeout = match get("CLAUDE_CONTAINER_EXEC_TIMEOUT_SECS") {
            Some(raw) => {
                Duration::from_secs(parse_number("CLAUDE_CONTAINER_EXEC_TIMEOUT_SECS", &raw)?)
            }
            None => defaults.exec_timeout,
        };

        let serialize_session_ops = match get("CLAUDE_CONTAINER_SERIALIZE_SESSIONS") {
            Some(raw) => parse_flag("CLAUDE_CONTAINER_SERIALIZE_SESSIONS", &raw)?,
            None => defaults.serialize_session_ops,
        };

        let cleanup_on_exit = match get("CLAUDE_CONTAINER_CLEANUP_ON_EXIT") {
            Some(raw) => parse_flag("CLAUDE_CONTAINER_CLEANUP_ON_EXIT", &raw)?,
            None => defaults.cleanup_on_exit,
        };

        let retired_capacity = match get("CLAUDE_CONTAINER_RETIRED_CAPACITY") {
            Some(raw) => parse_number("CLAUDE_CONTAINER_RETIRED_CAPACITY", &raw)?,
            None => defaults.retired_capacity,
        };

        Ok(Self {
            default_image: get("DEFAULT_CLAUDE_IMAGE").unwrap_or(defaults.default_image),
            transport: TransportMode::from_docker_host(get("DOCKER_HOST").as_deref())?,
            docker_cli: get("DOCKER_CLI_PATH").map(PathBuf::from),
            model_defaults: ModelDefaults::from_lookup(&lookup)?,
            probe,
            exec_timeout,
            serialize_session_ops,
            cleanup_on_exit,
            retired_capacity,
        })
    }
}

// ============================================================================
// PARSING HELPERS
// ============================================================================

pub(crate) fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ContainerError::invalid_config(format!(
            "{key} must be a boolean, got {other:?}"
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        ContainerError::invalid_config(format!("{key} must be a non-negative integer, got {raw:?}"))
    })
}
