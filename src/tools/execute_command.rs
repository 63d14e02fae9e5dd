use std::sync::Arc;

use log::debug;

use super::{EXECUTE_COMMAND, Tool, with_liveness};
use crate::error::Result;
use crate::registry::SessionRegistry;
use crate::transport::ContainerBackend;
use crate::types::{ExecuteCommandArgs, SessionId};

/// Reply when a command succeeds without printing anything
pub const NO_OUTPUT: &str = "Command executed successfully (no output)";

/// MCP tool for running a shell command inside a session
pub struct ExecuteCommandTool<B: ContainerBackend> {
    registry: Arc<SessionRegistry<B>>,
}

impl<B: ContainerBackend> ExecuteCommandTool<B> {
    /// Create the tool over a shared registry
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry<B>>) -> Self {
        Self { registry }
    }
}

impl<B: ContainerBackend> Tool for ExecuteCommandTool<B> {
    type Args = ExecuteCommandArgs;

    fn name() -> &'static str {
        EXECUTE_COMMAND
    }

    fn description() -> &'static str {
        "Run a shell command (sh -c) inside a session's container and return its \
         standard output."
    }

    fn read_only() -> bool {
        false
    }

    fn destructive() -> bool {
        true
    }

    fn idempotent() -> bool {
        false
    }

    fn open_world() -> bool {
        false
    }

    fn failure_context() -> &'static str {
        "Failed to execute command"
    }

    async fn execute(&self, args: Self::Args) -> Result<String> {
        args.validate()?;
        let session = self.registry.require(&SessionId::from(args.session_id))?;
        let _guard = session.serialize().await;

        debug!("Running command in session {}", session.id);
        let command = vec!["sh".to_string(), "-c".to_string(), args.command];
        let backend = self.registry.backend();

        match backend
            .exec(&session.container_id, &command, self.registry.config().exec_timeout)
            .await
        {
            Ok(output) if output.is_empty() => Ok(NO_OUTPUT.to_string()),
            Ok(output) => Ok(output),
            Err(e) => Err(with_liveness(backend.as_ref(), &session, e).await),
        }
    }
}
