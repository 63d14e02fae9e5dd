use std::sync::Arc;

use log::info;

use super::{TRANSFER_FILES, Tool};
use crate::error::Result;
use crate::registry::SessionRegistry;
use crate::transport::ContainerBackend;
use crate::types::{SessionId, TransferFilesArgs};

/// MCP tool for copying files between the host and a session container
pub struct TransferFilesTool<B: ContainerBackend> {
    registry: Arc<SessionRegistry<B>>,
}

impl<B: ContainerBackend> TransferFilesTool<B> {
    /// Create the tool over a shared registry
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry<B>>) -> Self {
        Self { registry }
    }
}

impl<B: ContainerBackend> Tool for TransferFilesTool<B> {
    type Args = TransferFilesArgs;

    fn name() -> &'static str {
        TRANSFER_FILES
    }

    fn description() -> &'static str {
        "Copy a file or directory into (to_container) or out of (from_container) \
         a session's container."
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
        "Failed to transfer files"
    }

    async fn execute(&self, args: Self::Args) -> Result<String> {
        args.validate()?;
        let session = self.registry.require(&SessionId::from(args.session_id))?;
        let _guard = session.serialize().await;

        self.registry
            .backend()
            .copy(
                &session.container_id,
                args.direction,
                &args.source_path,
                &args.dest_path,
            )
            .await?;

        info!(
            "Session {}: copied {} -> {} ({:?})",
            session.id, args.source_path, args.dest_path, args.direction
        );
        Ok(format!(
            "Files transferred successfully from {} to {}",
            args.source_path, args.dest_path
        ))
    }
}
