//! Session creation
//!
//! Provisioning is all-or-nothing: a session is inserted only after its
//! container was created, started and answered the readiness probe. A container
//! that fails after creation is removed before the error propagates.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use log::{info, warn};

use super::core::SessionRegistry;
use crate::config::{KEEPALIVE_COMMAND, ResolvedCredentials};
use crate::error::Result;
use crate::probe::ReadinessProber;
use crate::transport::{ContainerBackend, ContainerEnv, ContainerSpec};
use crate::types::session::default_session_name;
use crate::types::{ContainerId, CreateSessionArgs, McpConfig, Session, SessionId};

/// `MCP_CONFIG` value: base64 of the configuration's JSON
pub(crate) fn encode_mcp_config(config: &McpConfig) -> Result<String> {
    Ok(STANDARD.encode(serde_json::to_vec(config)?))
}

impl<B: ContainerBackend> SessionRegistry<B> {
    /// Provision a container, wait for its agent, and register the session
    ///
    /// # Errors
    /// Returns `InvalidArguments`, `Provisioning` or `ReadinessTimeout`. No session
    /// is registered on error.
    pub async fn create(&self, args: &CreateSessionArgs) -> Result<Arc<Session>> {
        args.validate()?;

        let id = SessionId::generate();
        let container_name = id.container_name();
        let name = args
            .session_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| default_session_name(Utc::now()));

        let credentials =
            ResolvedCredentials::resolve(&args.credential_options(), &self.config.model_defaults);
        info!(
            "Creating session {id} ({name}) in {container_name}: {}",
            credentials.summary()
        );

        let mut env = ContainerEnv::from(credentials.container_env());
        if let Some(mcp_config) = &args.mcp_config {
            env.push("MCP_CONFIG", encode_mcp_config(mcp_config)?);
        }

        let spec = ContainerSpec {
            name: container_name.clone(),
            image: self.config.default_image.clone(),
            project_path: args.project_path.clone(),
            mounts: args.mcp_mounts.clone(),
            env,
            command: KEEPALIVE_COMMAND.iter().map(|s| (*s).to_string()).collect(),
        };

        let container_id = self.backend.create(&spec).await?;
        info!("Created container {container_name} ({})", container_id.short());

        if let Err(e) = self.bring_up(&container_id).await {
            warn!("Session {id} failed to come up: {e}");
            self.discard(&container_id).await;
            return Err(e);
        }

        let session = Arc::new(Session::new(
            id.clone(),
            name,
            container_id,
            args.project_path.clone(),
            args.mcp_mounts.clone(),
            args.strict_permissions,
            credentials.mode(),
            self.config.serialize_session_ops,
        ));

        self.sessions.write().insert(id, Arc::clone(&session));
        info!("Session {} ready in {}", session.id, session.container_name);
        Ok(session)
    }

    async fn bring_up(&self, container_id: &ContainerId) -> Result<()> {
        self.backend.start(container_id).await?;
        ReadinessProber::new(self.backend.as_ref(), &self.config.probe)
            .wait_ready(container_id)
            .await
    }

    /// Best-effort removal of a container that never became a session
    async fn discard(&self, container_id: &ContainerId) {
        if let Err(e) = self.backend.stop(container_id).await {
            warn!("Failed to stop abandoned container {}: {e}", container_id.short());
        }
        if let Err(e) = self.backend.remove(container_id).await {
            warn!(
                "Failed to remove abandoned container {}: {e}",
                container_id.short()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn mcp_config_is_base64_json() {
        let mut servers = BTreeMap::new();
        servers.insert("fs".to_string(), serde_json::json!({"command": "mcp-fs"}));
        let encoded = encode_mcp_config(&McpConfig { mcp_servers: servers }).unwrap();

        let decoded = STANDARD.decode(encoded).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(value["mcpServers"]["fs"]["command"], "mcp-fs");
    }
}
