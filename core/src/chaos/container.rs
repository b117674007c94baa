use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use havoc_common::{ChaosError, TargetSpec};

use crate::client::{Container, ContainerClient, RemoveOptions};
use crate::command::OneShot;

/// Signals accepted by `kill`, with or without the `SIG` prefix.
const SIGNALS: &[&str] = &[
    "SIGABRT", "SIGALRM", "SIGBUS", "SIGCHLD", "SIGCONT", "SIGFPE", "SIGHUP", "SIGILL", "SIGINT",
    "SIGIO", "SIGKILL", "SIGPIPE", "SIGPROF", "SIGPWR", "SIGQUIT", "SIGSEGV", "SIGSTKFLT",
    "SIGSTOP", "SIGSYS", "SIGTERM", "SIGTRAP", "SIGTSTP", "SIGTTIN", "SIGTTOU", "SIGURG",
    "SIGUSR1", "SIGUSR2", "SIGVTALRM", "SIGWINCH", "SIGXCPU", "SIGXFSZ",
];

pub const DEFAULT_SIGNAL: &str = "SIGKILL";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContainerAction {
    Kill { signal: String },
    Stop { timeout: Duration },
    Pause,
    Remove(RemoveOptions),
}

impl ContainerAction {
    /// Builds a kill action, normalising and validating the signal name.
    pub fn kill(signal: &str) -> Result<Self, ChaosError> {
        let upper = signal.trim().to_ascii_uppercase();
        let normalized = if upper.starts_with("SIG") {
            upper
        } else {
            format!("SIG{upper}")
        };
        if !SIGNALS.contains(&normalized.as_str()) {
            return Err(ChaosError::config(format!("unexpected signal '{signal}'")));
        }
        Ok(Self::Kill { signal: normalized })
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Kill { .. } => "kill",
            Self::Stop { .. } => "stop",
            Self::Pause => "pause",
            Self::Remove(_) => "remove",
        }
    }
}

/// Kill, stop, pause or remove the matching containers.
pub struct ContainerChaos {
    client: Arc<dyn ContainerClient>,
    targets: TargetSpec,
    action: ContainerAction,
}

impl ContainerChaos {
    pub fn new(client: Arc<dyn ContainerClient>, targets: TargetSpec, action: ContainerAction) -> Self {
        Self {
            client,
            targets,
            action,
        }
    }
}

#[async_trait]
impl OneShot for ContainerChaos {
    type Target = Container;

    fn action(&self) -> &str {
        self.action.label()
    }

    async fn list_targets(&self) -> anyhow::Result<Vec<Container>> {
        let containers = self.client.list_containers().await?;
        Ok(self.targets.filter(containers, |c| c.name.as_str()))
    }

    async fn apply(&self, target: &Container) -> anyhow::Result<()> {
        match &self.action {
            ContainerAction::Kill { signal } => self.client.kill(target, signal).await,
            ContainerAction::Stop { timeout } => self.client.stop(target, *timeout).await,
            ContainerAction::Pause => self.client.pause(target).await,
            ContainerAction::Remove(opts) => self.client.remove(target, *opts).await,
        }
    }
}
