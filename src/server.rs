//! MCP server dispatching the session tools
//!
//! [`ContainerServer`] lists the seven tools and routes each call to its
//! handler. Handler errors become protocol errors scoped to the failed operation.

use std::sync::Arc;

use log::{debug, warn};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ErrorCode, Implementation, JsonObject,
    ListToolsResult, PaginatedRequestParam, ServerCapabilities, ServerInfo,
    Tool as ToolDefinition,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};

use crate::registry::SessionRegistry;
use crate::tools::{
    CREATE_SESSION, CreateSessionTool, DESTROY_SESSION, DestroySessionTool, EXECUTE_COMMAND,
    EXECUTE_IN_SESSION, ExecuteCommandTool, ExecuteInSessionTool, GET_SESSION_LOGS,
    GetSessionLogsTool, LIST_SESSIONS, ListSessionsTool, TRANSFER_FILES, Tool, TransferFilesTool,
};
use crate::transport::ContainerBackend;

const INSTRUCTIONS: &str = "Runs Claude Code agents inside isolated containers. Call \
create_session with a host project path to get a session ID, then use execute_in_session \
for agent prompts, execute_command for shell commands, transfer_files to move files and \
get_session_logs to inspect output. Call destroy_session when done.";

/// Protocol front end over a shared session registry
pub struct ContainerServer<B: ContainerBackend> {
    registry: Arc<SessionRegistry<B>>,
    create_session: CreateSessionTool<B>,
    execute_in_session: ExecuteInSessionTool<B>,
    execute_command: ExecuteCommandTool<B>,
    transfer_files: TransferFilesTool<B>,
    get_session_logs: GetSessionLogsTool<B>,
    list_sessions: ListSessionsTool<B>,
    destroy_session: DestroySessionTool<B>,
}

impl<B: ContainerBackend> ContainerServer<B> {
    /// Build the server and all its tools over `registry`
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry<B>>) -> Self {
        Self {
            create_session: CreateSessionTool::new(Arc::clone(&registry)),
            execute_in_session: ExecuteInSessionTool::new(Arc::clone(&registry)),
            execute_command: ExecuteCommandTool::new(Arc::clone(&registry)),
            transfer_files: TransferFilesTool::new(Arc::clone(&registry)),
            get_session_logs: GetSessionLogsTool::new(Arc::clone(&registry)),
            list_sessions: ListSessionsTool::new(Arc::clone(&registry)),
            destroy_session: DestroySessionTool::new(Arc::clone(&registry)),
            registry,
        }
    }

    /// Registry shared by the tools
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry<B>> {
        &self.registry
    }

    /// Listing entries for every tool
    #[must_use]
    pub fn tool_definitions() -> Vec<ToolDefinition> {
        vec![
            CreateSessionTool::<B>::definition(),
            ExecuteInSessionTool::<B>::definition(),
            ExecuteCommandTool::<B>::definition(),
            TransferFilesTool::<B>::definition(),
            GetSessionLogsTool::<B>::definition(),
            ListSessionsTool::<B>::definition(),
            DestroySessionTool::<B>::definition(),
        ]
    }

    /// Route one call by tool name
    ///
    /// # Errors
    /// Returns a protocol error for unknown tools, bad arguments or failed operations
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<String, ErrorData> {
        debug!("Tool call: {name}");
        match name {
            CREATE_SESSION => run(&self.create_session, arguments).await,
            EXECUTE_IN_SESSION => run(&self.execute_in_session, arguments).await,
            EXECUTE_COMMAND => run(&self.execute_command, arguments).await,
            TRANSFER_FILES => run(&self.transfer_files, arguments).await,
            GET_SESSION_LOGS => run(&self.get_session_logs, arguments).await,
            LIST_SESSIONS => run(&self.list_sessions, arguments).await,
            DESTROY_SESSION => run(&self.destroy_session, arguments).await,
            other => Err(ErrorData::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("Unknown tool: {other}"),
                None,
            )),
        }
    }
}

async fn run<T: Tool>(tool: &T, arguments: Option<JsonObject>) -> Result<String, ErrorData> {
    let args = T::parse_args(arguments).map_err(|e| e.into_error_data(T::failure_context()))?;
    tool.execute(args).await.map_err(|e| {
        warn!("{} failed: {e}", T::name());
        e.into_error_data(T::failure_context())
    })
}

impl<B: ContainerBackend> ServerHandler for ContainerServer<B> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(Self::tool_definitions()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let text = self.dispatch(request.name.as_ref(), request.arguments).await?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}
