//! Host-to-container directory bindings

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn default_read_only() -> bool {
    true
}

/// One additional host directory bound into a session container.
///
/// Mounts are read-only unless the caller explicitly sets `readOnly: false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MountSpec {
    /// Path on the container host
    pub host_path: String,
    /// Path inside the container
    pub container_path: String,
    /// Mount as read-only (default: true)
    #[serde(default = "default_read_only")]
    pub read_only: bool,
}

impl MountSpec {
    /// Read-only mount
    pub fn read_only(host_path: impl Into<String>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
            read_only: true,
        }
    }

    /// Read-write mount
    pub fn read_write(host_path: impl Into<String>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
            read_only: false,
        }
    }

    /// Bind string in `host:container[:ro]` form, as accepted by both the Engine
    /// API `HostConfig.Binds` field and `docker create -v`.
    #[must_use]
    pub fn bind_spec(&self) -> String {
        if self.read_only {
            format!("{}:{}:ro", self.host_path, self.container_path)
        } else {
            format!("{}:{}", self.host_path, self.container_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_read_only_defaults_to_true() {
        let mount: MountSpec =
            serde_json::from_str(r#"{"hostPath":"/data","containerPath":"/in"}"#).unwrap();
        assert!(mount.read_only);
        assert_eq!(mount.bind_spec(), "/data:/in:ro");
    }

    #[test]
    fn explicit_read_write_has_no_suffix() {
        let mount: MountSpec = serde_json::from_str(
            r#"{"hostPath":"/data","containerPath":"/in","readOnly":false}"#,
        )
        .unwrap();
        assert_eq!(mount.bind_spec(), "/data:/in");
    }
}
