//! Argument schemas for the session tools
//!
//! Field names are camelCase on the wire. Schemas are generated with `schemars`
//! and advertised in the tool listing.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::mounts::MountSpec;
use crate::config::{CredentialOptions, DEFAULT_LOG_TAIL};
use crate::error::{ContainerError, Result};

fn default_tail() -> u32 {
    DEFAULT_LOG_TAIL
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ContainerError::invalid_arguments(format!(
            "{field} is required"
        )));
    }
    Ok(())
}

// ============================================================================
// CREATE
// ============================================================================

/// MCP server configuration forwarded to the agent inside the container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct McpConfig {
    /// Server definitions keyed by server name
    #[serde(default)]
    pub mcp_servers: BTreeMap<String, serde_json::Value>,
}

/// Arguments for `create_session`
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionArgs {
    /// Host directory mounted read-write at /app
    pub project_path: String,
    /// Human-readable session name
    #[serde(default)]
    pub session_name: Option<String>,
    /// Anthropic API key
    #[serde(default)]
    pub api_key: Option<String>,
    /// Use AWS Bedrock instead of the Anthropic API
    #[serde(default)]
    pub use_bedrock: Option<bool>,
    /// AWS region for Bedrock
    #[serde(default)]
    pub aws_region: Option<String>,
    /// AWS access key ID
    #[serde(default)]
    pub aws_access_key_id: Option<String>,
    /// AWS secret access key
    #[serde(default)]
    pub aws_secret_access_key: Option<String>,
    /// AWS session token
    #[serde(default)]
    pub aws_session_token: Option<String>,
    /// Bedrock model ID
    #[serde(default)]
    pub bedrock_model: Option<String>,
    /// Bedrock small/fast model ID
    #[serde(default)]
    pub bedrock_small_model: Option<String>,
    /// Additional host directories to mount (read-only unless readOnly is false)
    #[serde(default)]
    pub mcp_mounts: Vec<MountSpec>,
    /// MCP configuration passed to the agent
    #[serde(default)]
    pub mcp_config: Option<McpConfig>,
    /// Run the agent with permission prompts enabled
    #[serde(default)]
    pub strict_permissions: bool,
}

impl CreateSessionArgs {
    /// Minimal arguments for a project directory
    pub fn for_project(project_path: impl Into<String>) -> Self {
        Self {
            project_path: project_path.into(),
            ..Default::default()
        }
    }

    /// Check required fields
    ///
    /// # Errors
    /// Returns `InvalidArguments` if a required field is empty
    pub fn validate(&self) -> Result<()> {
        require("projectPath", &self.project_path)?;
        for mount in &self.mcp_mounts {
            require("mcpMounts[].hostPath", &mount.host_path)?;
            require("mcpMounts[].containerPath", &mount.container_path)?;
        }
        Ok(())
    }

    /// Per-session credential fields
    #[must_use]
    pub fn credential_options(&self) -> CredentialOptions {
        CredentialOptions {
            api_key: self.api_key.clone(),
            use_bedrock: self.use_bedrock,
            aws_region: self.aws_region.clone(),
            aws_access_key_id: self.aws_access_key_id.clone(),
            aws_secret_access_key: self.aws_secret_access_key.clone(),
            aws_session_token: self.aws_session_token.clone(),
            bedrock_model: self.bedrock_model.clone(),
            bedrock_small_model: self.bedrock_small_model.clone(),
        }
    }
}

// ============================================================================
// EXECUTE
// ============================================================================

/// Arguments for `execute_in_session`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteInSessionArgs {
    /// Target session
    pub session_id: String,
    /// Prompt for the agent
    pub prompt: String,
}

impl ExecuteInSessionArgs {
    /// Check required fields
    ///
    /// # Errors
    /// Returns `InvalidArguments` if a required field is empty
    pub fn validate(&self) -> Result<()> {
        require("sessionId", &self.session_id)?;
        require("prompt", &self.prompt)
    }
}

/// Arguments for `execute_command`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCommandArgs {
    /// Target session
    pub session_id: String,
    /// Shell command, run with `sh -c`
    pub command: String,
}

impl ExecuteCommandArgs {
    /// Check required fields
    ///
    /// # Errors
    /// Returns `InvalidArguments` if a required field is empty
    pub fn validate(&self) -> Result<()> {
        require("sessionId", &self.session_id)?;
        require("command", &self.command)
    }
}

// ============================================================================
// TRANSFER
// ============================================================================

/// Copy direction relative to the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransferDirection {
    /// Host to container
    ToContainer,
    /// Container to host
    FromContainer,
}

/// Arguments for `transfer_files`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferFilesArgs {
    /// Target session
    pub session_id: String,
    /// Copy direction
    pub direction: TransferDirection,
    /// Source path (host path for to_container, container path for from_container)
    pub source_path: String,
    /// Destination path
    pub dest_path: String,
}

impl TransferFilesArgs {
    /// Check required fields
    ///
    /// # Errors
    /// Returns `InvalidArguments` if a required field is empty
    pub fn validate(&self) -> Result<()> {
        require("sessionId", &self.session_id)?;
        require("sourcePath", &self.source_path)?;
        require("destPath", &self.dest_path)
    }
}

// ============================================================================
// LOGS / LIST / DESTROY
// ============================================================================

/// Arguments for `get_session_logs`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetSessionLogsArgs {
    /// Target session
    pub session_id: String,
    /// Number of trailing log lines (default 100)
    #[serde(default = "default_tail")]
    pub tail: u32,
}

impl GetSessionLogsArgs {
    /// Check required fields
    ///
    /// # Errors
    /// Returns `InvalidArguments` if a required field is empty
    pub fn validate(&self) -> Result<()> {
        require("sessionId", &self.session_id)
    }
}

/// Arguments for `list_sessions`
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListSessionsArgs {
    /// Sort by creation time
    #[serde(default)]
    pub sorted: bool,
}

/// Arguments for `destroy_session`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DestroySessionArgs {
    /// Target session
    pub session_id: String,
}

impl DestroySessionArgs {
    /// Check required fields
    ///
    /// # Errors
    /// Returns `InvalidArguments` if a required field is empty
    pub fn validate(&self) -> Result<()> {
        require("sessionId", &self.session_id)
    }
}
