//! Readiness probing for freshly started containers
//!
//! A started container is not yet a usable session: the agent inside needs a
//! moment before it answers. The prober polls the agent's version command until
//! the output carries the expected marker or the attempt budget runs out.

use log::{debug, info};

use crate::config::ProbeConfig;
use crate::error::{ContainerError, Result};
use crate::transport::ContainerBackend;
use crate::types::ContainerId;

/// Polls a container until its agent answers
pub struct ReadinessProber<'a, B: ContainerBackend> {
    backend: &'a B,
    config: &'a ProbeConfig,
}

impl<'a, B: ContainerBackend> ReadinessProber<'a, B> {
    /// Prober for `backend` with the given budget
    pub fn new(backend: &'a B, config: &'a ProbeConfig) -> Self {
        Self { backend, config }
    }

    /// Wait for the agent in `container` to answer.
    ///
    /// Probe exec failures count as failed attempts; only exhausting the budget
    /// is an error.
    ///
    /// # Errors
    /// Returns `ReadinessTimeout` after `attempts` unsuccessful probes
    pub async fn wait_ready(&self, container: &ContainerId) -> Result<()> {
        tokio::time::sleep(self.config.settle).await;

        let command = ProbeConfig::command();
        for attempt in 1..=self.config.attempts {
            match self
                .backend
                .exec(container, &command, self.config.exec_timeout)
                .await
            {
                Ok(output) if output.contains(&self.config.marker) => {
                    info!(
                        "Container {} ready after {attempt} attempt(s): {}",
                        container.short(),
                        output.trim()
                    );
                    return Ok(());
                }
                Ok(output) => debug!(
                    "Probe {attempt}/{} of {}: unexpected output {:?}",
                    self.config.attempts,
                    container.short(),
                    output.trim()
                ),
                Err(e) => debug!(
                    "Probe {attempt}/{} of {} failed: {e}",
                    self.config.attempts,
                    container.short()
                ),
            }

            if attempt < self.config.attempts {
                tokio::time::sleep(self.config.interval).await;
            }
        }

        Err(ContainerError::readiness_timeout(
            container.short(),
            self.config.attempts,
        ))
    }
}
