//! Argument building for the container CLI

use crate::config::CONTAINER_WORKDIR;
use crate::transport::ContainerSpec;
use crate::types::{ContainerId, TransferDirection};

/// Argument vectors for each CLI subcommand the bridge issues.
///
/// Environment values are never placed in argv: `create` emits `-e NAME` and
/// the caller supplies the value through the child process environment.
pub struct CommandBuilder;

impl CommandBuilder {
    /// `image inspect <image>`
    #[must_use]
    pub fn inspect_image(image: &str) -> Vec<String> {
        vec!["image".into(), "inspect".into(), image.into()]
    }

    /// `pull <image>`
    #[must_use]
    pub fn pull(image: &str) -> Vec<String> {
        vec!["pull".into(), image.into()]
    }

    /// `create --name N -w /app -v ... -e NAME ... image cmd...`
    #[must_use]
    pub fn create(spec: &ContainerSpec) -> Vec<String> {
        let mut args = vec![
            "create".to_string(),
            "--name".to_string(),
            spec.name.clone(),
            "-w".to_string(),
            CONTAINER_WORKDIR.to_string(),
        ];

        for bind in spec.binds() {
            args.push("-v".to_string());
            args.push(bind);
        }

        for name in spec.env.names() {
            args.push("-e".to_string());
            args.push(name.to_string());
        }

        args.push(spec.image.clone());
        args.extend(spec.command.iter().cloned());
        args
    }

    /// `start <id>`
    #[must_use]
    pub fn start(id: &ContainerId) -> Vec<String> {
        vec!["start".into(), id.to_string()]
    }

    /// `exec <id> cmd...`
    #[must_use]
    pub fn exec(id: &ContainerId, command: &[String]) -> Vec<String> {
        let mut args = vec!["exec".to_string(), id.to_string()];
        args.extend(command.iter().cloned());
        args
    }

    /// `cp <src> <id>:<dest>` or `cp <id>:<src> <dest>`
    #[must_use]
    pub fn copy(
        id: &ContainerId,
        direction: TransferDirection,
        source: &str,
        dest: &str,
    ) -> Vec<String> {
        let (from, to) = match direction {
            TransferDirection::ToContainer => (source.to_string(), format!("{id}:{dest}")),
            TransferDirection::FromContainer => (format!("{id}:{source}"), dest.to_string()),
        };
        vec!["cp".into(), from, to]
    }

    /// `inspect -f {{.State.Running}} <id>`
    #[must_use]
    pub fn inspect_running(id: &ContainerId) -> Vec<String> {
        vec![
            "inspect".into(),
            "-f".into(),
            "{{.State.Running}}".into(),
            id.to_string(),
        ]
    }

    /// `stop <id>`
    #[must_use]
    pub fn stop(id: &ContainerId) -> Vec<String> {
        vec!["stop".into(), id.to_string()]
    }

    /// `rm <id>`
    #[must_use]
    pub fn remove(id: &ContainerId) -> Vec<String> {
        vec!["rm".into(), id.to_string()]
    }

    /// `logs --tail N --timestamps <id>`
    #[must_use]
    pub fn logs(id: &ContainerId, tail: u32) -> Vec<String> {
        vec![
            "logs".into(),
            "--tail".into(),
            tail.to_string(),
            "--timestamps".into(),
            id.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ContainerEnv;
    use crate::types::MountSpec;

    #[test]
    fn create_keeps_secret_values_out_of_argv() {
        let mut env = ContainerEnv::default();
        env.push("ANTHROPIC_API_KEY", "sk-secret");
        let spec = ContainerSpec {
            name: "claude-code-abcd1234".into(),
            image: "ghcr.io/zeeno-atl/claude-code:latest".into(),
            project_path: "/proj".into(),
            mounts: vec![MountSpec::read_only("/data", "/in")],
            env,
            command: vec!["tail".into(), "-f".into(), "/dev/null".into()],
        };

        let args = CommandBuilder::create(&spec);
        assert_eq!(
            args,
            vec![
                "create",
                "--name",
                "claude-code-abcd1234",
                "-w",
                "/app",
                "-v",
                "/proj:/app",
                "-v",
                "claude-code-npm-cache:/npm-cache",
                "-v",
                "/data:/in:ro",
                "-e",
                "ANTHROPIC_API_KEY",
                "ghcr.io/zeeno-atl/claude-code:latest",
                "tail",
                "-f",
                "/dev/null",
            ]
        );
        assert!(!args.iter().any(|a| a.contains("sk-secret")));
    }

    #[test]
    fn copy_prefixes_container_side() {
        let id = ContainerId::new("abc");
        assert_eq!(
            CommandBuilder::copy(&id, TransferDirection::ToContainer, "/host/a", "/app/a"),
            vec!["cp", "/host/a", "abc:/app/a"]
        );
        assert_eq!(
            CommandBuilder::copy(&id, TransferDirection::FromContainer, "/app/b", "/host/b"),
            vec!["cp", "abc:/app/b", "/host/b"]
        );
    }

    #[test]
    fn exec_passes_argv_verbatim() {
        let id = ContainerId::new("abc");
        let command = vec!["sh".to_string(), "-c".to_string(), "echo 'hi there'".to_string()];
        assert_eq!(
            CommandBuilder::exec(&id, &command),
            vec!["exec", "abc", "sh", "-c", "echo 'hi there'"]
        );
    }
}
