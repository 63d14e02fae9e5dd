use std::sync::Arc;

use log::info;

use super::{EXECUTE_IN_SESSION, Tool, with_liveness};
use crate::error::Result;
use crate::registry::SessionRegistry;
use crate::transport::ContainerBackend;
use crate::types::{ExecuteInSessionArgs, SessionId};

/// MCP tool for running the agent on a prompt inside a session
pub struct ExecuteInSessionTool<B: ContainerBackend> {
    registry: Arc<SessionRegistry<B>>,
}

impl<B: ContainerBackend> ExecuteInSessionTool<B> {
    /// Create the tool over a shared registry
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry<B>>) -> Self {
        Self { registry }
    }
}

impl<B: ContainerBackend> Tool for ExecuteInSessionTool<B> {
    type Args = ExecuteInSessionArgs;

    fn name() -> &'static str {
        EXECUTE_IN_SESSION
    }

    fn description() -> &'static str {
        "Run Claude Code on a prompt inside an existing session's container and \
         return its output. Permission prompts are skipped unless the session was \
         created with strictPermissions."
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
        "Failed to execute in session"
    }

    async fn execute(&self, args: Self::Args) -> Result<String> {
        args.validate()?;
        let session = self.registry.require(&SessionId::from(args.session_id))?;
        let _guard = session.serialize().await;

        info!(
            "Running agent in session {} ({} prompt chars)",
            session.id,
            args.prompt.chars().count()
        );
        let command = session.agent_command(&args.prompt);
        let backend = self.registry.backend();

        match backend
            .exec(&session.container_id, &command, self.registry.config().exec_timeout)
            .await
        {
            Ok(output) => Ok(output),
            Err(e) => Err(with_liveness(backend.as_ref(), &session, e).await),
        }
    }
}
