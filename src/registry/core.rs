//! Core registry structure and lookups
//!
//! The registry owns the identifier-to-session map and is its only mutator. Map
//! locks are scoped to a single insert, lookup or removal and are never held
//! across a transport call.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::config::ServerConfig;
use crate::error::{ContainerError, Result};
use crate::transport::ContainerBackend;
use crate::types::{Session, SessionId};

// ============================================================================
// SESSION REGISTRY CORE
// ============================================================================

/// Owner of all live sessions
///
/// Shared between tool handlers through an `Arc`. Every operation is safe to
/// call concurrently.
pub struct SessionRegistry<B: ContainerBackend> {
    pub(crate) backend: Arc<B>,
    pub(crate) config: ServerConfig,
    pub(crate) sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    /// Most recently destroyed identifiers, oldest first, with the time of destruction
    pub(crate) retired: RwLock<VecDeque<(SessionId, DateTime<Utc>)>>,
}

impl<B: ContainerBackend> SessionRegistry<B> {
    /// Create an empty registry over `backend`
    pub fn new(backend: Arc<B>, config: ServerConfig) -> Self {
        Self {
            backend,
            config,
            sessions: RwLock::new(HashMap::new()),
            retired: RwLock::new(VecDeque::new()),
        }
    }

    /// Container backend shared with the handlers
    #[must_use]
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Process configuration
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Look up a live session
    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Look up a live session, failing when absent
    ///
    /// # Errors
    /// Returns `SessionNotFound` if `id` is not registered
    pub fn require(&self, id: &SessionId) -> Result<Arc<Session>> {
        self.get(id)
            .ok_or_else(|| ContainerError::session_not_found(id.as_str()))
    }

    /// Snapshot of every live session, in no particular order
    #[must_use]
    pub fn list(&self) -> Vec<Arc<Session>> {
        self.sessions.read().values().cloned().collect()
    }

    /// Number of live sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// True when no session is live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// When `id` was destroyed, if it was
    #[must_use]
    pub fn retired_at(&self, id: &SessionId) -> Option<DateTime<Utc>> {
        self.retired
            .read()
            .iter()
            .find(|(retired, _)| retired == id)
            .map(|(_, at)| *at)
    }
}
