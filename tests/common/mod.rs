//! In-memory container backend shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use kodegen_claude_container::config::{ModelDefaults, ProbeConfig};
use kodegen_claude_container::types::TransferDirection;
use kodegen_claude_container::{
    ContainerBackend, ContainerError, ContainerId, ContainerSpec, Result, ServerConfig,
    SessionRegistry, Teardown,
};

/// Version string the fake agent prints once ready
pub const VERSION_OUTPUT: &str = "1.0.0 (Claude Code)\n";

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub spec: ContainerSpec,
    pub running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyCall {
    pub container: ContainerId,
    pub direction: TransferDirection,
    pub source: String,
    pub dest: String,
}

#[derive(Default)]
struct State {
    next_id: u64,
    containers: HashMap<ContainerId, FakeContainer>,
    created: Vec<ContainerSpec>,
    execs: Vec<(ContainerId, Vec<String>)>,
    copies: Vec<CopyCall>,
    logs: HashMap<ContainerId, String>,
    failing_exec: HashSet<ContainerId>,
    failing_teardown: HashSet<ContainerId>,
    agent_reply: String,
}

/// Container host double: records every call and lets tests inject failures
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<State>,
    exec_delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every non-probe exec in `id` fails and stops the container
    pub fn crash_on_exec(&self, id: &ContainerId) {
        self.state.lock().failing_exec.insert(id.clone());
    }

    /// Stop calls for `id` fail with a daemon error
    pub fn fail_teardown(&self, id: &ContainerId) {
        self.state.lock().failing_teardown.insert(id.clone());
    }

    /// Remove `id` behind the registry's back
    pub fn vanish(&self, id: &ContainerId) {
        self.state.lock().containers.remove(id);
    }

    pub fn set_logs(&self, id: &ContainerId, logs: &str) {
        self.state.lock().logs.insert(id.clone(), logs.to_string());
    }

    pub fn set_agent_reply(&self, reply: &str) {
        self.state.lock().agent_reply = reply.to_string();
    }

    pub fn set_exec_delay(&self, delay: Duration) {
        *self.exec_delay.lock() = delay;
    }

    pub fn created(&self) -> Vec<ContainerSpec> {
        self.state.lock().created.clone()
    }

    pub fn container(&self, id: &ContainerId) -> Option<FakeContainer> {
        self.state.lock().containers.get(id).cloned()
    }

    pub fn container_count(&self) -> usize {
        self.state.lock().containers.len()
    }

    /// Non-probe exec commands, in call order
    pub fn commands(&self) -> Vec<(ContainerId, Vec<String>)> {
        let probe = ProbeConfig::command();
        self.state
            .lock()
            .execs
            .iter()
            .filter(|(_, command)| *command != probe)
            .cloned()
            .collect()
    }

    pub fn copies(&self) -> Vec<CopyCall> {
        self.state.lock().copies.clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn reply(&self, id: &ContainerId, command: &[String]) -> Result<String> {
        let mut state = self.state.lock();
        state.execs.push((id.clone(), command.to_vec()));

        let Some(container) = state.containers.get(id) else {
            return Err(ContainerError::execution(format!(
                "Error response from daemon: No such container: {id}"
            )));
        };
        if !container.running {
            return Err(ContainerError::execution(format!(
                "Error response from daemon: container {id} is not running"
            )));
        }

        if command == ProbeConfig::command().as_slice() {
            return Ok(VERSION_OUTPUT.to_string());
        }

        if state.failing_exec.contains(id) {
            if let Some(container) = state.containers.get_mut(id) {
                container.running = false;
            }
            return Err(ContainerError::execution_with_output(
                "Command exited with status 137",
                "",
                "Killed",
            ));
        }

        match command {
            [sh, flag, script] if sh == "sh" && flag == "-c" => Ok(run_script(script)),
            _ => Ok(state.agent_reply.clone()),
        }
    }
}

/// Tiny shell stand-in: `echo` prints, anything else is silent
fn run_script(script: &str) -> String {
    match script.strip_prefix("echo ") {
        Some(text) => format!("{}\n", text.trim_matches('\'')),
        None => String::new(),
    }
}

impl ContainerBackend for FakeBackend {
    async fn create(&self, spec: &ContainerSpec) -> Result<ContainerId> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = ContainerId::new(format!("{:064x}", state.next_id));
        state.created.push(spec.clone());
        state.containers.insert(
            id.clone(),
            FakeContainer {
                spec: spec.clone(),
                running: false,
            },
        );
        Ok(id)
    }

    async fn start(&self, id: &ContainerId) -> Result<()> {
        let mut state = self.state.lock();
        match state.containers.get_mut(id) {
            Some(container) => {
                container.running = true;
                Ok(())
            }
            None => Err(ContainerError::provisioning(format!("No such container: {id}"))),
        }
    }

    async fn exec(&self, id: &ContainerId, command: &[String], _timeout: Duration) -> Result<String> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = *self.exec_delay.lock();
        if !delay.is_zero() && command != ProbeConfig::command().as_slice() {
            tokio::time::sleep(delay).await;
        }

        let result = self.reply(id, command);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn copy(
        &self,
        id: &ContainerId,
        direction: TransferDirection,
        source: &str,
        dest: &str,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if !state.containers.contains_key(id) {
            return Err(ContainerError::transfer(format!("No such container: {id}")));
        }
        state.copies.push(CopyCall {
            container: id.clone(),
            direction,
            source: source.to_string(),
            dest: dest.to_string(),
        });
        Ok(())
    }

    async fn is_running(&self, id: &ContainerId) -> bool {
        self.state
            .lock()
            .containers
            .get(id)
            .is_some_and(|c| c.running)
    }

    async fn stop(&self, id: &ContainerId) -> Result<Teardown> {
        let mut state = self.state.lock();
        if state.failing_teardown.contains(id) {
            return Err(ContainerError::teardown(
                "Error response from daemon: permission denied",
            ));
        }
        match state.containers.get_mut(id) {
            None => Ok(Teardown::Missing),
            Some(container) if !container.running => Ok(Teardown::AlreadyStopped),
            Some(container) => {
                container.running = false;
                Ok(Teardown::Done)
            }
        }
    }

    async fn remove(&self, id: &ContainerId) -> Result<Teardown> {
        match self.state.lock().containers.remove(id) {
            Some(_) => Ok(Teardown::Done),
            None => Ok(Teardown::Missing),
        }
    }

    async fn logs(&self, id: &ContainerId, tail: u32) -> Result<String> {
        let state = self.state.lock();
        if !state.containers.contains_key(id) {
            return Err(ContainerError::execution(format!("No such container: {id}")));
        }
        let logs = state.logs.get(id).cloned().unwrap_or_default();
        let lines: Vec<&str> = logs.lines().collect();
        let start = lines.len().saturating_sub(tail as usize);
        Ok(lines[start..].join("\n"))
    }
}

/// Configuration with an instant probe and no credentials in scope
pub fn test_config() -> ServerConfig {
    ServerConfig {
        probe: ProbeConfig {
            settle: Duration::ZERO,
            attempts: 3,
            interval: Duration::ZERO,
            exec_timeout: Duration::from_secs(1),
            marker: "Claude Code".to_string(),
        },
        model_defaults: ModelDefaults::default(),
        ..ServerConfig::default()
    }
}

pub fn registry_with(
    backend: Arc<FakeBackend>,
    config: ServerConfig,
) -> Arc<SessionRegistry<FakeBackend>> {
    Arc::new(SessionRegistry::new(backend, config))
}

pub fn registry() -> (Arc<FakeBackend>, Arc<SessionRegistry<FakeBackend>>) {
    let backend = Arc::new(FakeBackend::new());
    let registry = registry_with(Arc::clone(&backend), test_config());
    (backend, registry)
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
