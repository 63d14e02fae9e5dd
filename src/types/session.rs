//! Session record held by the registry

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};

use super::identifiers::{ContainerId, SessionId};
use super::mounts::MountSpec;
use crate::config::{AGENT_WRAPPER, ModelMode, SKIP_PERMISSIONS_FLAG};

/// One live agent session bound to one container.
///
/// Immutable after creation apart from the optional operation lock. The record
/// never holds credential values, only the non-secret [`ModelMode`].
#[derive(Debug)]
pub struct Session {
    /// Globally unique identifier
    pub id: SessionId,
    /// Human-readable name
    pub name: String,
    /// Deterministic container name derived from `id`
    pub container_name: String,
    /// Identity assigned by the container host
    pub container_id: ContainerId,
    /// Host directory bound at the container working directory
    pub project_path: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Additional bindings requested at creation
    pub mounts: Vec<MountSpec>,
    /// Strict mode: agent runs with its permission prompts enabled
    pub strict_permissions: bool,
    /// Provider the agent is configured for
    pub model_mode: ModelMode,
    op_lock: Option<Mutex<()>>,
}

impl Session {
    /// Assemble a record for a container that has passed its readiness probe
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: SessionId,
        name: String,
        container_id: ContainerId,
        project_path: String,
        mounts: Vec<MountSpec>,
        strict_permissions: bool,
        model_mode: ModelMode,
        serialize_ops: bool,
    ) -> Self {
        Self {
            container_name: id.container_name(),
            id,
            name,
            container_id,
            project_path,
            created_at: Utc::now(),
            mounts,
            strict_permissions,
            model_mode,
            op_lock: serialize_ops.then(|| Mutex::new(())),
        }
    }

    /// Argument vector that runs the agent on `prompt` inside the container
    #[must_use]
    pub fn agent_command(&self, prompt: &str) -> Vec<String> {
        let mut command = vec![AGENT_WRAPPER.to_string()];
        if !self.strict_permissions {
            command.push(SKIP_PERMISSIONS_FLAG.to_string());
        }
        command.push(prompt.to_string());
        command
    }

    /// Acquire the per-session operation lock when serialization is enabled.
    ///
    /// Returns `None` immediately when sessions run operations concurrently.
    pub async fn serialize(&self) -> Option<MutexGuard<'_, ()>> {
        match &self.op_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }
}

/// Default session name when the caller supplies none
#[must_use]
pub fn default_session_name(now: DateTime<Utc>) -> String {
    format!("claude-session-{}", now.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(strict: bool, serialize: bool) -> Session {
        Session::new(
            SessionId::new("abcdef0123456789"),
            "demo".into(),
            ContainerId::new("c0ffee"),
            "/proj".into(),
            Vec::new(),
            strict,
            ModelMode::Anthropic,
            serialize,
        )
    }

    #[test]
    fn relaxed_session_skips_permission_prompts() {
        let command = session(false, false).agent_command("fix the build");
        assert_eq!(
            command,
            vec![AGENT_WRAPPER, SKIP_PERMISSIONS_FLAG, "fix the build"]
        );
    }

    #[test]
    fn strict_session_omits_skip_flag() {
        let command = session(true, false).agent_command("it's \"quoted\"");
        assert_eq!(command, vec![AGENT_WRAPPER, "it's \"quoted\""]);
    }

    #[test]
    fn container_name_follows_session_id() {
        assert_eq!(session(false, false).container_name, "claude-code-abcdef01");
    }

    #[tokio::test]
    async fn serialize_is_noop_unless_enabled() {
        assert!(session(false, false).serialize().await.is_none());

        let locked = session(false, true);
        let guard = locked.serialize().await;
        assert!(guard.is_some());
        assert!(locked.op_lock.as_ref().is_some_and(|l| l.try_lock().is_err()));
    }

    #[test]
    fn default_name_uses_millis() {
        let now = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        assert_eq!(default_session_name(now), "claude-session-1700000000123");
    }
}
