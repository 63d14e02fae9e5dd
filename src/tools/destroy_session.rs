use std::sync::Arc;

use log::info;

use super::{DESTROY_SESSION, Tool};
use crate::error::Result;
use crate::registry::{DestroyOutcome, SessionRegistry};
use crate::transport::ContainerBackend;
use crate::types::{DestroySessionArgs, SessionId};

/// MCP tool for tearing down a session and its container
pub struct DestroySessionTool<B: ContainerBackend> {
    registry: Arc<SessionRegistry<B>>,
}

impl<B: ContainerBackend> DestroySessionTool<B> {
    /// Create the tool over a shared registry
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry<B>>) -> Self {
        Self { registry }
    }
}

fn cleaned_up(id: &SessionId) -> String {
    format!("Session {id} cleaned up (container was already removed)")
}

impl<B: ContainerBackend> Tool for DestroySessionTool<B> {
    type Args = DestroySessionArgs;

    fn name() -> &'static str {
        DESTROY_SESSION
    }

    fn description() -> &'static str {
        "Stop and remove a session's container and forget the session. Succeeds \
         even if the container is already gone."
    }

    fn read_only() -> bool {
        false
    }

    fn destructive() -> bool {
        true
    }

    fn idempotent() -> bool {
        true
    }

    fn open_world() -> bool {
        false
    }

    fn failure_context() -> &'static str {
        "Failed to destroy session"
    }

    async fn execute(&self, args: Self::Args) -> Result<String> {
        args.validate()?;
        let id = SessionId::from(args.session_id);

        match self.registry.destroy(&id).await {
            Ok(DestroyOutcome::Destroyed) => Ok(format!("Session {id} destroyed successfully")),
            Ok(DestroyOutcome::AlreadyGone) => Ok(cleaned_up(&id)),
            Err(e) if e.indicates_absent_container() => {
                info!("Session {id} container already absent: {e}");
                Ok(cleaned_up(&id))
            }
            Err(e) => Err(e),
        }
    }
}
