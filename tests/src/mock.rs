//! In-memory clients that record every call with the virtual time it was made at.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use havoc_core::client::{
    ClusterClient, Container, ContainerClient, PatchOp, RemoveOptions, Resource, ResourceKind,
};
use tokio::time::Instant;

/// One recorded client call.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    /// Offset from when the client was created.
    pub at: Duration,
    pub op: &'static str,
    pub name: String,
    pub args: Vec<String>,
}

type FailRule = Box<dyn Fn(&Call) -> bool + Send + Sync>;

struct Journal {
    start: Instant,
    calls: Mutex<Vec<Call>>,
    fail_list: bool,
    rules: Vec<FailRule>,
}

impl Journal {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            calls: Mutex::new(Vec::new()),
            fail_list: false,
            rules: Vec::new(),
        }
    }

    fn record(&self, op: &'static str, name: &str, args: Vec<String>) -> anyhow::Result<()> {
        let call = Call {
            at: self.start.elapsed(),
            op,
            name: name.to_string(),
            args,
        };
        let failed = self.rules.iter().any(|rule| rule(&call));
        self.calls.lock().unwrap().push(call);
        if failed {
            anyhow::bail!("injected {op} failure on {name}");
        }
        Ok(())
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

pub struct FakeDocker {
    containers: Vec<Container>,
    journal: Journal,
}

impl FakeDocker {
    pub fn with_containers(names: &[&str]) -> Self {
        let containers = names
            .iter()
            .enumerate()
            .map(|(i, name)| Container {
                id: format!("{i:012x}"),
                name: name.to_string(),
                image: "alpine:3".to_string(),
            })
            .collect();
        Self {
            containers,
            journal: Journal::new(),
        }
    }

    /// Makes every call matching `rule` fail after it has been recorded.
    pub fn fail_when(mut self, rule: impl Fn(&Call) -> bool + Send + Sync + 'static) -> Self {
        self.journal.rules.push(Box::new(rule));
        self
    }

    pub fn fail_listing(mut self) -> Self {
        self.journal.fail_list = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.journal.calls()
    }

    /// Calls other than listing, in order.
    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.op != "list").collect()
    }
}

#[async_trait]
impl ContainerClient for FakeDocker {
    async fn list_containers(&self) -> anyhow::Result<Vec<Container>> {
        self.journal.record("list", "", Vec::new())?;
        if self.journal.fail_list {
            anyhow::bail!("daemon unreachable");
        }
        Ok(self.containers.clone())
    }

    async fn kill(&self, container: &Container, signal: &str) -> anyhow::Result<()> {
        self.journal
            .record("kill", &container.name, vec![signal.to_string()])
    }

    async fn stop(&self, container: &Container, timeout: Duration) -> anyhow::Result<()> {
        self.journal
            .record("stop", &container.name, vec![timeout.as_secs().to_string()])
    }

    async fn pause(&self, container: &Container) -> anyhow::Result<()> {
        self.journal.record("pause", &container.name, Vec::new())
    }

    async fn remove(&self, container: &Container, opts: RemoveOptions) -> anyhow::Result<()> {
        self.journal
            .record("remove", &container.name, vec![format!("{opts:?}")])
    }

    async fn exec(&self, container: &Container, argv: &[String]) -> anyhow::Result<()> {
        self.journal.record("exec", &container.name, argv.to_vec())
    }

    async fn run_sidecar(
        &self,
        container: &Container,
        _image: &str,
        argv: &[String],
    ) -> anyhow::Result<()> {
        self.journal.record("sidecar", &container.name, argv.to_vec())
    }
}

/// A cluster whose objects really change replica counts when patched.
pub struct FakeCluster {
    objects: Mutex<Vec<Resource>>,
    journal: Journal,
}

impl FakeCluster {
    pub fn with_deployments(objects: &[(&str, u32)]) -> Self {
        let objects = objects
            .iter()
            .map(|(name, replicas)| Resource {
                name: name.to_string(),
                namespace: "default".to_string(),
                replicas: Some(*replicas),
            })
            .collect();
        Self {
            objects: Mutex::new(objects),
            journal: Journal::new(),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.journal.calls()
    }

    pub fn patches(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.op == "patch").collect()
    }

    pub fn replicas(&self, name: &str) -> Option<u32> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.name == name)
            .and_then(|r| r.replicas)
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn list(&self, kind: ResourceKind, namespace: &str) -> anyhow::Result<Vec<Resource>> {
        self.journal.record("list", "", vec![kind.to_string()])?;
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn get(&self, kind: ResourceKind, namespace: &str, name: &str) -> anyhow::Result<Resource> {
        self.journal.record("get", name, vec![kind.to_string()])?;
        self.objects
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.namespace == namespace && r.name == name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("{kind} {namespace}/{name} not found"))
    }

    async fn patch(
        &self,
        _kind: ResourceKind,
        _namespace: &str,
        name: &str,
        patch: &[PatchOp],
    ) -> anyhow::Result<()> {
        let args = patch.iter().map(|op| op.value.to_string()).collect();
        self.journal.record("patch", name, args)?;

        let mut objects = self.objects.lock().unwrap();
        let object = objects
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| anyhow::anyhow!("{name} not found"))?;
        for op in patch {
            if op.path == "/spec/replicas" {
                object.replicas = op.value.as_u64().map(|n| n as u32);
            }
        }
        Ok(())
    }
}
