//! Session registry implementation
//!
//! This module is organized into logical submodules:
//! - `core`: Registry struct, constructors, and lookups
//! - `create`: Container provisioning and session registration
//! - `destroy`: Teardown, eviction, and shutdown

mod core;
mod create;
mod destroy;

// Re-export public API
pub use self::core::SessionRegistry;
pub use destroy::DestroyOutcome;
