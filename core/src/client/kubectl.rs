//! [`ClusterClient`] backed by the `kubectl` command line.

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::process;
use super::{ClusterClient, PatchOp, Resource, ResourceKind};

const KUBECTL: &str = "kubectl";

#[derive(Clone, Debug, Default)]
pub struct KubectlOptions {
    pub kubeconfig: Option<String>,
    pub context: Option<String>,
}

pub struct KubectlCli {
    global_args: Vec<String>,
}

impl KubectlCli {
    pub fn new(opts: &KubectlOptions) -> Self {
        let mut global_args: Vec<String> = Vec::new();
        if let Some(path) = &opts.kubeconfig {
            global_args.extend(["--kubeconfig".to_string(), path.clone()]);
        }
        if let Some(ctx) = &opts.context {
            global_args.extend(["--context".to_string(), ctx.clone()]);
        }
        Self { global_args }
    }

    async fn kubectl(&self, args: &[&str]) -> anyhow::Result<String> {
        let mut argv: Vec<String> = self.global_args.clone();
        argv.extend(args.iter().map(|arg| arg.to_string()));
        process::run(KUBECTL, &argv).await
    }
}

#[async_trait]
impl ClusterClient for KubectlCli {
    async fn list(&self, kind: ResourceKind, namespace: &str) -> anyhow::Result<Vec<Resource>> {
        let out = self
            .kubectl(&["get", kind.plural(), "--namespace", namespace, "--output", "json"])
            .await?;
        parse_list(&out)
    }

    async fn get(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> anyhow::Result<Resource> {
        let out = self
            .kubectl(&["get", kind.plural(), name, "--namespace", namespace, "--output", "json"])
            .await?;
        let object: Object =
            serde_json::from_str(&out).with_context(|| format!("unexpected {kind} '{name}'"))?;
        Ok(object.into())
    }

    async fn patch(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        patch: &[PatchOp],
    ) -> anyhow::Result<()> {
        let body = serde_json::to_string(patch).context("encoding json patch")?;
        debug!(name, namespace, %kind, patch = %body, "kubectl patch");
        self.kubectl(&[
            "patch",
            kind.plural(),
            name,
            "--namespace",
            namespace,
            "--type",
            "json",
            "--patch",
            body.as_str(),
        ])
        .await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct ObjectList {
    #[serde(default)]
    items: Vec<Object>,
}

#[derive(Deserialize)]
struct Object {
    metadata: Metadata,
    #[serde(default)]
    spec: Spec,
}

#[derive(Deserialize)]
struct Metadata {
    name: String,
    #[serde(default)]
    namespace: String,
}

#[derive(Default, Deserialize)]
struct Spec {
    replicas: Option<u32>,
}

impl From<Object> for Resource {
    fn from(object: Object) -> Self {
        Self {
            name: object.metadata.name,
            namespace: object.metadata.namespace,
            replicas: object.spec.replicas,
        }
    }
}

fn parse_list(json: &str) -> anyhow::Result<Vec<Resource>> {
    let list: ObjectList = serde_json::from_str(json).context("unexpected kubectl list output")?;
    Ok(list.items.into_iter().map(Resource::from).collect())
}
