//! Session teardown and shutdown

use futures::future::join_all;
use log::{info, warn};

use super::core::SessionRegistry;
use crate::error::{ContainerError, Result};
use crate::transport::{ContainerBackend, Teardown};
use crate::types::{Session, SessionId};

/// How a destroy call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    /// The container was stopped and removed
    Destroyed,
    /// The container was already gone, or the session was destroyed before
    AlreadyGone,
}

impl<B: ContainerBackend> SessionRegistry<B> {
    /// Stop and remove a session's container, then evict the session.
    ///
    /// Eviction happens even when teardown fails. Destroying an identifier that
    /// was already destroyed reports [`DestroyOutcome::AlreadyGone`].
    ///
    /// # Errors
    /// Returns `SessionNotFound` for identifiers never registered, or `Teardown`
    /// for failures other than an absent container
    pub async fn destroy(&self, id: &SessionId) -> Result<DestroyOutcome> {
        let Some(session) = self.get(id) else {
            if self.retired_at(id).is_some() {
                return Ok(DestroyOutcome::AlreadyGone);
            }
            return Err(ContainerError::session_not_found(id.as_str()));
        };

        let result = self.teardown(&session).await;

        self.sessions.write().remove(id);
        self.retire(id);

        match result {
            Ok(outcome) => {
                info!("Session {id} destroyed ({outcome:?})");
                Ok(outcome)
            }
            Err(e) => {
                warn!(
                    "Session {id} evicted but container {} may remain: {e}",
                    session.container_id
                );
                Err(e)
            }
        }
    }

    /// Remember `id` as destroyed, forgetting the oldest entries past capacity
    fn retire(&self, id: &SessionId) {
        let mut retired = self.retired.write();
        retired.retain(|(existing, _)| existing != id);
        retired.push_back((id.clone(), chrono::Utc::now()));
        while retired.len() > self.config.retired_capacity {
            retired.pop_front();
        }
    }

    async fn teardown(&self, session: &Session) -> Result<DestroyOutcome> {
        let stopped = self.backend.stop(&session.container_id).await?;
        let removed = self.backend.remove(&session.container_id).await?;

        if stopped == Teardown::Missing || removed == Teardown::Missing {
            Ok(DestroyOutcome::AlreadyGone)
        } else {
            Ok(DestroyOutcome::Destroyed)
        }
    }

    /// Destroy every live session concurrently.
    ///
    /// Failures are logged, not returned.
    pub async fn shutdown(&self) {
        let ids: Vec<SessionId> = self.sessions.read().keys().cloned().collect();
        if ids.is_empty() {
            return;
        }

        info!("Destroying {} session(s) on shutdown", ids.len());
        let results = join_all(ids.iter().map(|id| self.destroy(id))).await;

        for (id, result) in ids.iter().zip(results) {
            if let Err(e) = result {
                warn!("Failed to destroy session {id} on shutdown: {e}");
            }
        }
        info!("Session shutdown complete");
    }
}
