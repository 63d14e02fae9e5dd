use std::sync::Arc;

use serde_json::{Map, Value, json};

use super::{CREATE_SESSION, Tool};
use crate::error::Result;
use crate::registry::SessionRegistry;
use crate::transport::ContainerBackend;
use crate::types::CreateSessionArgs;

// ============================================================================
// TOOL STRUCT
// ============================================================================

/// MCP tool for provisioning a new containerized agent session
pub struct CreateSessionTool<B: ContainerBackend> {
    registry: Arc<SessionRegistry<B>>,
}

impl<B: ContainerBackend> CreateSessionTool<B> {
    /// Create the tool over a shared registry
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry<B>>) -> Self {
        Self { registry }
    }
}

// ============================================================================
// TOOL TRAIT IMPLEMENTATION
// ============================================================================

impl<B: ContainerBackend> Tool for CreateSessionTool<B> {
    type Args = CreateSessionArgs;

    fn name() -> &'static str {
        CREATE_SESSION
    }

    fn description() -> &'static str {
        "Create a new Claude Code session in an isolated container. The project \
         directory is mounted read-write at /app; extra directories can be mounted \
         with mcpMounts (read-only unless readOnly is false). Credentials default to \
         the server environment. Returns the session ID used by every other tool."
    }

    fn read_only() -> bool {
        false
    }

    fn destructive() -> bool {
        false
    }

    fn idempotent() -> bool {
        false
    }

    fn open_world() -> bool {
        true
    }

    fn failure_context() -> &'static str {
        "Failed to create session"
    }

    async fn execute(&self, args: Self::Args) -> Result<String> {
        let session = self.registry.create(&args).await?;

        let mut reply = Map::new();
        reply.insert(
            "message".into(),
            json!(format!(
                "Session created successfully ({})",
                session.model_mode.label()
            )),
        );
        reply.insert("sessionId".into(), json!(session.id));
        reply.insert("containerName".into(), json!(session.container_name));
        reply.insert("projectPath".into(), json!(session.project_path));
        reply.insert("useBedrock".into(), json!(session.model_mode.is_bedrock()));
        if let crate::config::ModelMode::Bedrock { region } = &session.model_mode {
            reply.insert("awsRegion".into(), json!(region));
        }
        if !session.mounts.is_empty() {
            reply.insert("mcpMounts".into(), json!(session.mounts));
        }
        reply.insert("strictPermissions".into(), json!(session.strict_permissions));

        Ok(serde_json::to_string_pretty(&Value::Object(reply))?)
    }
}
