//! # Containerized Claude Code sessions over MCP
//!
//! Runs Claude Code agents inside isolated, per-session containers and exposes
//! their lifecycle as seven MCP tools: `create_session`, `execute_in_session`,
//! `execute_command`, `transfer_files`, `get_session_logs`, `list_sessions` and
//! `destroy_session`.
//!
//! ## Architecture
//!
//! - [`transport`]: the [`ContainerBackend`] capability set, with an Engine API
//!   client for the local Unix socket and a container CLI bridge for remote hosts.
//! - [`registry`]: the [`SessionRegistry`], sole owner of the session map.
//! - [`probe`]: readiness polling between "container started" and "agent answers".
//! - [`tools`]: one handler per operation.
//! - [`server`]: the MCP front end dispatching calls to the handlers.
//! - [`config`]: startup configuration and per-session credential resolution.
//!
//! ## Embedding
//!
//! ```no_run
//! use kodegen_claude_container::{ServerConfig, serve_stdio};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     serve_stdio(ServerConfig::from_env()?).await
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod probe;
pub mod registry;
pub mod server;
pub mod tools;
pub mod transport;
pub mod types;

use std::sync::Arc;

use log::info;
use rmcp::ServiceExt;

pub use config::{ModelMode, ResolvedCredentials, ServerConfig, TransportMode};
pub use error::{ContainerError, Result};
pub use probe::ReadinessProber;
pub use registry::{DestroyOutcome, SessionRegistry};
pub use server::ContainerServer;
pub use transport::{ContainerBackend, ContainerEnv, ContainerSpec, DockerTransport, Teardown};
pub use types::{ContainerId, MountSpec, Session, SessionId};

/// Version of the server
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// STDIO SERVER
// ============================================================================

/// Serve the session tools over standard input/output until the client leaves.
///
/// When `cleanup_on_exit` is set, every live session is destroyed before returning.
///
/// # Errors
/// Returns an error if the transport cannot be built or the MCP handshake fails
pub async fn serve_stdio(config: ServerConfig) -> anyhow::Result<()> {
    let backend = Arc::new(DockerTransport::from_config(&config)?);
    let cleanup_on_exit = config.cleanup_on_exit;
    info!(
        "kodegen-claude-container {VERSION} starting (image {}, exec timeout {}s)",
        config.default_image,
        config.exec_timeout.as_secs()
    );

    let registry = Arc::new(SessionRegistry::new(backend, config));
    let service = ContainerServer::new(Arc::clone(&registry))
        .serve(rmcp::transport::stdio())
        .await?;

    tokio::select! {
        reason = service.waiting() => info!("MCP session ended: {:?}", reason?),
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    if cleanup_on_exit {
        registry.shutdown().await;
    } else if !registry.is_empty() {
        info!("Leaving {} session container(s) running", registry.len());
    }

    Ok(())
}
