use std::sync::Arc;

use super::{LIST_SESSIONS, Tool};
use crate::error::Result;
use crate::registry::SessionRegistry;
use crate::transport::ContainerBackend;
use crate::types::ListSessionsArgs;

/// Reply when the registry is empty
pub const NO_SESSIONS: &str = "No active sessions";

/// MCP tool for enumerating live sessions
pub struct ListSessionsTool<B: ContainerBackend> {
    registry: Arc<SessionRegistry<B>>,
}

impl<B: ContainerBackend> ListSessionsTool<B> {
    /// Create the tool over a shared registry
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry<B>>) -> Self {
        Self { registry }
    }
}

impl<B: ContainerBackend> Tool for ListSessionsTool<B> {
    type Args = ListSessionsArgs;

    fn name() -> &'static str {
        LIST_SESSIONS
    }

    fn description() -> &'static str {
        "List active sessions as id, name and container name. Set sorted to order \
         them by creation time."
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
        "Failed to list sessions"
    }

    async fn execute(&self, args: Self::Args) -> Result<String> {
        let mut sessions = self.registry.list();
        if sessions.is_empty() {
            return Ok(NO_SESSIONS.to_string());
        }

        if args.sorted {
            sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        }

        let lines: Vec<String> = sessions
            .iter()
            .map(|s| format!("- {}: {} ({})", s.id, s.name, s.container_name))
            .collect();
        Ok(format!("Active sessions:\n{}", lines.join("\n")))
    }
}
