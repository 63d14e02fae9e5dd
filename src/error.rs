//! Error types for container session orchestration

use std::time::Duration;

use rmcp::ErrorData;
use rmcp::model::ErrorCode;
use thiserror::Error;

/// Main error type for container session orchestration
#[derive(Error, Debug)]
pub enum ContainerError {
    /// Image pull, container create or container start failed
    #[error("Provisioning failed: {0}")]
    Provisioning(String),

    /// Container started but the agent never answered the version probe
    #[error("Container {container} failed to become ready after {attempts} attempts")]
    ReadinessTimeout {
        /// Container identity that was probed
        container: String,
        /// Number of probe attempts made
        attempts: u32,
    },

    /// Referenced session identifier has no registry entry
    #[error("Session {0} not found")]
    SessionNotFound(String),

    /// A command inside a container failed, or the container vanished mid-call
    #[error("{message}")]
    Execution {
        /// Error message
        message: String,
        /// Standard output captured before the failure
        stdout: String,
        /// Standard error captured before the failure
        stderr: String,
    },

    /// File copy in either direction failed
    #[error("{0}")]
    Transfer(String),

    /// Stop/remove failed for a reason other than the container being absent
    #[error("{0}")]
    Teardown(String),

    /// An exec-class call exceeded its deadline
    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout {
        /// What was running when the deadline hit
        operation: String,
        /// The deadline that expired
        after: Duration,
    },

    /// Tool arguments failed schema or required-field validation
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Invalid process configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for container orchestration
pub type Result<T> = std::result::Result<T, ContainerError>;

impl ContainerError {
    /// Create a provisioning error
    pub fn provisioning(msg: impl Into<String>) -> Self {
        Self::Provisioning(msg.into())
    }

    /// Create a readiness timeout error
    pub fn readiness_timeout(container: impl Into<String>, attempts: u32) -> Self {
        Self::ReadinessTimeout {
            container: container.into(),
            attempts,
        }
    }

    /// Create a session not found error
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound(session_id.into())
    }

    /// Create an execution error with no captured output
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution {
            message: msg.into(),
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Create an execution error carrying the partial output of the command
    pub fn execution_with_output(
        msg: impl Into<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::Execution {
            message: msg.into(),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a transfer error
    pub fn transfer(msg: impl Into<String>) -> Self {
        Self::Transfer(msg.into())
    }

    /// Create a teardown error
    pub fn teardown(msg: impl Into<String>) -> Self {
        Self::Teardown(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// Create an invalid arguments error
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// True for errors reporting that the container no longer exists or is not running.
    ///
    /// Teardown treats these as success; the destroy operation reports them as
    /// "already cleaned up".
    #[must_use]
    pub fn indicates_absent_container(&self) -> bool {
        let text = self.to_string().to_lowercase();
        text.contains("no such container") || text.contains("is not running")
    }

    /// Convert into a protocol error, scoping the message to the failed operation.
    ///
    /// `context` is the operation prefix, e.g. `"Failed to execute in session"`.
    #[must_use]
    pub fn into_error_data(self, context: &str) -> ErrorData {
        match self {
            Self::SessionNotFound(_) => {
                ErrorData::new(ErrorCode::RESOURCE_NOT_FOUND, self.to_string(), None)
            }
            Self::InvalidArguments(_) => {
                ErrorData::new(ErrorCode::INVALID_PARAMS, self.to_string(), None)
            }
            Self::Execution {
                ref message,
                ref stdout,
                ref stderr,
            } => {
                let data = serde_json::json!({
                    "stdout": stdout,
                    "stderr": stderr,
                });
                ErrorData::new(
                    ErrorCode::INTERNAL_ERROR,
                    format!("{context}: {message}"),
                    Some(data),
                )
            }
            other => ErrorData::new(ErrorCode::INTERNAL_ERROR, format!("{context}: {other}"), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_container_detection_is_case_insensitive() {
        let gone = ContainerError::teardown("Error response from daemon: No such container: abc");
        assert!(gone.indicates_absent_container());

        let stopped = ContainerError::teardown("container abc is not running");
        assert!(stopped.indicates_absent_container());

        let other = ContainerError::teardown("permission denied");
        assert!(!other.indicates_absent_container());
    }

    #[test]
    fn execution_error_carries_output_as_data() {
        let err = ContainerError::execution_with_output("exit status 2", "partial", "boom");
        let data = err.into_error_data("Failed to execute command");
        assert_eq!(data.code, ErrorCode::INTERNAL_ERROR);
        assert_eq!(data.message, "Failed to execute command: exit status 2");
        let payload = data.data.expect("structured output");
        assert_eq!(payload["stdout"], "partial");
        assert_eq!(payload["stderr"], "boom");
    }

    #[test]
    fn not_found_maps_to_resource_not_found() {
        let data = ContainerError::session_not_found("abc").into_error_data("ignored");
        assert_eq!(data.code, ErrorCode::RESOURCE_NOT_FOUND);
        assert_eq!(data.message, "Session abc not found");
    }

    #[test]
    fn timeout_keeps_operation_context() {
        let err = ContainerError::timeout("exec in container abc", Duration::from_secs(30));
        let data = err.into_error_data("Failed to execute command");
        assert_eq!(data.code, ErrorCode::INTERNAL_ERROR);
        assert_eq!(
            data.message,
            "Failed to execute command: exec in container abc timed out after 30s"
        );
    }
}
