use std::sync::Arc;

use super::{GET_SESSION_LOGS, Tool};
use crate::error::Result;
use crate::registry::SessionRegistry;
use crate::transport::ContainerBackend;
use crate::types::{GetSessionLogsArgs, SessionId};

/// Reply when the container has logged nothing
pub const NO_LOGS: &str = "No logs available";

/// MCP tool for reading a session container's log tail
pub struct GetSessionLogsTool<B: ContainerBackend> {
    registry: Arc<SessionRegistry<B>>,
}

impl<B: ContainerBackend> GetSessionLogsTool<B> {
    /// Create the tool over a shared registry
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry<B>>) -> Self {
        Self { registry }
    }
}

impl<B: ContainerBackend> Tool for GetSessionLogsTool<B> {
    type Args = GetSessionLogsArgs;

    fn name() -> &'static str {
        GET_SESSION_LOGS
    }

    fn description() -> &'static str {
        "Return the most recent log lines (with timestamps) of a session's \
         container. tail defaults to 100."
    }

    fn read_only() -> bool {
        true
    }

    fn destructive() -> bool {
        false
    }

    fn idempotent() -> bool {
        true
    }

    fn open_world() -> bool {
        false
    }

    fn failure_context() -> &'static str {
        "Failed to get logs"
    }

    async fn execute(&self, args: Self::Args) -> Result<String> {
        args.validate()?;
        let session = self.registry.require(&SessionId::from(args.session_id))?;

        let logs = self
            .registry
            .backend()
            .logs(&session.container_id, args.tail)
            .await?;

        if logs.trim().is_empty() {
            Ok(NO_LOGS.to_string())
        } else {
            Ok(logs)
        }
    }
}
