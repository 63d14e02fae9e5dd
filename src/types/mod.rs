//! Type definitions for container sessions
//!
//! - [`identifiers`] - Type-safe ID wrappers (`SessionId`, `ContainerId`)
//! - [`mounts`] - Host-to-container directory bindings
//! - [`session`] - The registry's session record
//! - [`args`] - Tool argument schemas

pub mod args;
pub mod identifiers;
pub mod mounts;
pub mod session;

pub use args::{
    CreateSessionArgs, DestroySessionArgs, ExecuteCommandArgs, ExecuteInSessionArgs,
    GetSessionLogsArgs, ListSessionsArgs, McpConfig, TransferDirection, TransferFilesArgs,
};
pub use identifiers::{ContainerId, SessionId};
pub use mounts::MountSpec;
pub use session::Session;
