//! Tools for managing containerized agent sessions
//!
//! Each tool validates its arguments, resolves the target session through the
//! registry, makes one transport call and shapes the text reply.

mod create_session;
mod destroy_session;
mod execute_command;
mod execute_in_session;
mod get_session_logs;
mod list_sessions;
mod transfer_files;

use std::future::Future;
use std::sync::Arc;

use rmcp::model::{JsonObject, Tool as ToolDefinition, ToolAnnotations};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::error::{ContainerError, Result};
use crate::transport::ContainerBackend;
use crate::types::Session;

pub use create_session::CreateSessionTool;
pub use destroy_session::DestroySessionTool;
pub use execute_command::ExecuteCommandTool;
pub use execute_in_session::ExecuteInSessionTool;
pub use get_session_logs::GetSessionLogsTool;
pub use list_sessions::ListSessionsTool;
pub use transfer_files::TransferFilesTool;

pub use execute_command::NO_OUTPUT;
pub use get_session_logs::NO_LOGS;
pub use list_sessions::NO_SESSIONS;

// ============================================================================
// TOOL NAMES
// ============================================================================

/// `create_session`
pub const CREATE_SESSION: &str = "create_session";
/// `execute_in_session`
pub const EXECUTE_IN_SESSION: &str = "execute_in_session";
/// `execute_command`
pub const EXECUTE_COMMAND: &str = "execute_command";
/// `transfer_files`
pub const TRANSFER_FILES: &str = "transfer_files";
/// `get_session_logs`
pub const GET_SESSION_LOGS: &str = "get_session_logs";
/// `list_sessions`
pub const LIST_SESSIONS: &str = "list_sessions";
/// `destroy_session`
pub const DESTROY_SESSION: &str = "destroy_session";

// ============================================================================
// TOOL TRAIT
// ============================================================================

/// One externally visible operation
pub trait Tool: Send + Sync + 'static {
    /// Argument schema
    type Args: DeserializeOwned + JsonSchema + Send;

    /// Protocol name
    fn name() -> &'static str;

    /// Description shown to clients
    fn description() -> &'static str;

    /// Never modifies state
    fn read_only() -> bool;

    /// May destroy state
    fn destructive() -> bool;

    /// Repeated calls have no further effect
    fn idempotent() -> bool;

    /// Interacts with things outside the server
    fn open_world() -> bool;

    /// Prefix for error messages, e.g. "Failed to execute in session"
    fn failure_context() -> &'static str;

    /// Run the operation and return its text reply
    fn execute(&self, args: Self::Args) -> impl Future<Output = Result<String>> + Send;

    /// Listing entry: name, description, input schema and annotations
    fn definition() -> ToolDefinition {
        let schema = Arc::new(input_schema::<Self::Args>());
        let mut tool = ToolDefinition::new(Self::name(), Self::description(), schema);
        tool.annotations = Some(ToolAnnotations {
            read_only_hint: Some(Self::read_only()),
            destructive_hint: Some(Self::destructive()),
            idempotent_hint: Some(Self::idempotent()),
            open_world_hint: Some(Self::open_world()),
            ..Default::default()
        });
        tool
    }

    /// Decode raw call arguments
    ///
    /// # Errors
    /// Returns `InvalidArguments` if the arguments do not match the schema
    fn parse_args(arguments: Option<JsonObject>) -> Result<Self::Args> {
        let value = serde_json::Value::Object(arguments.unwrap_or_default());
        serde_json::from_value(value).map_err(|e| ContainerError::invalid_arguments(e.to_string()))
    }
}

/// JSON Schema object for an argument type
fn input_schema<T: JsonSchema>() -> JsonObject {
    match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(serde_json::Value::Object(object)) => object,
        _ => JsonObject::new(),
    }
}

/// Add liveness context to a failed exec.
///
/// An execution error on a container that is no longer running says so; any
/// other error passes through unchanged.
pub(crate) async fn with_liveness<B: ContainerBackend>(
    backend: &B,
    session: &Session,
    err: ContainerError,
) -> ContainerError {
    match err {
        ContainerError::Execution {
            message,
            stdout,
            stderr,
        } => {
            let message = if backend.is_running(&session.container_id).await {
                message
            } else {
                format!(
                    "{message} (container {} is no longer running)",
                    session.container_name
                )
            };
            ContainerError::Execution {
                message,
                stdout,
                stderr,
            }
        }
        other => other,
    }
}
