//! The **collaborator contracts** every chaos command is written against.
//!
//! Commands never talk to Docker or Kubernetes directly. They receive one of the
//! client traits below at construction time, which keeps them testable with
//! in-memory clients and keeps backend shapes out of the engine.
//!
//! The concrete clients in this module drive the `docker` and `kubectl` command
//! line tools, so connection settings (TLS material, kubeconfig) are handled by
//! those tools.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use havoc_common::ChaosError;
use serde::{Deserialize, Serialize};

mod docker;
mod kubectl;
mod process;

pub use docker::{DockerCli, DockerOptions};
pub use kubectl::{KubectlCli, KubectlOptions};

/// Anything a perturbation can be applied to.
pub trait Descriptor {
    fn name(&self) -> &str;
}

/// A running container as reported by the container runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Container {
    pub id: String,
    pub name: String,
    pub image: String,
}

impl Descriptor for Container {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Kill a running container before removing it.
    pub force: bool,
    /// Remove the container's links.
    pub links: bool,
    /// Remove the container's anonymous volumes.
    pub volumes: bool,
}

impl Default for RemoveOptions {
    fn default() -> Self {
        Self {
            force: true,
            links: false,
            volumes: true,
        }
    }
}

/// Container runtime operations used by the container chaos commands.
#[async_trait]
pub trait ContainerClient: Send + Sync {
    /// Lists running containers, in the order the runtime reports them.
    async fn list_containers(&self) -> anyhow::Result<Vec<Container>>;

    async fn kill(&self, container: &Container, signal: &str) -> anyhow::Result<()>;

    /// Sends SIGTERM, then SIGKILL after `timeout`.
    async fn stop(&self, container: &Container, timeout: Duration) -> anyhow::Result<()>;

    async fn pause(&self, container: &Container) -> anyhow::Result<()>;

    async fn remove(&self, container: &Container, opts: RemoveOptions) -> anyhow::Result<()>;

    /// Runs `argv` inside the container and waits for it to exit successfully.
    async fn exec(&self, container: &Container, argv: &[String]) -> anyhow::Result<()>;

    /// Runs `argv` in a throwaway container from `image` that joins the
    /// target's network namespace with `NET_ADMIN`, and removes it afterwards.
    async fn run_sidecar(&self, container: &Container, image: &str, argv: &[String])
    -> anyhow::Result<()>;
}

/// Scalable cluster workload kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Deployment,
    ReplicaSet,
    ReplicationController,
    StatefulSet,
}

impl ResourceKind {
    /// Plural resource name as understood by the cluster API.
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Deployment => "deployments",
            Self::ReplicaSet => "replicasets",
            Self::ReplicationController => "replicationcontrollers",
            Self::StatefulSet => "statefulsets",
        }
    }
}

impl FromStr for ResourceKind {
    type Err = ChaosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deployment" | "deployments" | "deploy" => Ok(Self::Deployment),
            "replicaset" | "replicasets" | "rs" => Ok(Self::ReplicaSet),
            "replicationcontroller" | "replicationcontrollers" | "rc" => {
                Ok(Self::ReplicationController)
            }
            "statefulset" | "statefulsets" | "sts" => Ok(Self::StatefulSet),
            _ => Err(ChaosError::config(format!("unsupported resource kind '{s}'"))),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Deployment => "deployment",
            Self::ReplicaSet => "replicaset",
            Self::ReplicationController => "replicationcontroller",
            Self::StatefulSet => "statefulset",
        };
        f.write_str(name)
    }
}

/// A namespaced, scalable cluster object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    pub namespace: String,
    /// `spec.replicas`, if the object sets it.
    pub replicas: Option<u32>,
}

impl Descriptor for Resource {
    fn name(&self) -> &str {
        &self.name
    }
}

/// One RFC 6902 JSON patch operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub op: String,
    pub path: String,
    pub value: serde_json::Value,
}

impl PatchOp {
    pub fn replace(path: &str, value: impl Into<serde_json::Value>) -> Self {
        Self {
            op: "replace".to_string(),
            path: path.to_string(),
            value: value.into(),
        }
    }
}

/// Cluster operations used by the workload chaos commands.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn list(&self, kind: ResourceKind, namespace: &str) -> anyhow::Result<Vec<Resource>>;

    async fn get(&self, kind: ResourceKind, namespace: &str, name: &str)
    -> anyhow::Result<Resource>;

    async fn patch(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        patch: &[PatchOp],
    ) -> anyhow::Result<()>;
}
