use std::sync::Arc;

use async_trait::async_trait;
use havoc_common::TargetSpec;
use tracing::debug;

use crate::client::{ClusterClient, PatchOp, Resource, ResourceKind};
use crate::command::Revertible;

const REPLICAS_PATH: &str = "/spec/replicas";

/// Replica count restored when the object does not declare one.
const FALLBACK_REPLICAS: u32 = 1;

/// Scales matching workloads to zero replicas and restores them afterwards.
pub struct ScaleToZero {
    client: Arc<dyn ClusterClient>,
    kind: ResourceKind,
    namespace: String,
    targets: TargetSpec,
}

impl ScaleToZero {
    pub fn new(
        client: Arc<dyn ClusterClient>,
        kind: ResourceKind,
        namespace: &str,
        targets: TargetSpec,
    ) -> Self {
        Self {
            client,
            kind,
            namespace: namespace.to_string(),
            targets,
        }
    }
}

#[async_trait]
impl Revertible for ScaleToZero {
    type Target = Resource;
    type Payload = Vec<PatchOp>;

    fn action(&self) -> &str {
        "scale-to-zero"
    }

    async fn list_targets(&self) -> anyhow::Result<Vec<Resource>> {
        let resources = self.client.list(self.kind, &self.namespace).await?;
        Ok(self.targets.filter(resources, |r| r.name.as_str()))
    }

    /// Re-reads the object so the revert restores the count live right before the patch.
    async fn payloads(&self, target: &Resource) -> anyhow::Result<(Vec<PatchOp>, Vec<PatchOp>)> {
        let live = self
            .client
            .get(self.kind, &target.namespace, &target.name)
            .await?;
        let previous = live.replicas.unwrap_or(FALLBACK_REPLICAS);
        debug!(name = %target.name, kind = %self.kind, previous, "captured replica count");
        Ok((
            vec![PatchOp::replace(REPLICAS_PATH, 0)],
            vec![PatchOp::replace(REPLICAS_PATH, previous)],
        ))
    }

    async fn apply(&self, target: &Resource, payload: &Vec<PatchOp>) -> anyhow::Result<()> {
        self.client
            .patch(self.kind, &target.namespace, &target.name, payload)
            .await
    }

    async fn revert(&self, target: &Resource, payload: &Vec<PatchOp>) -> anyhow::Result<()> {
        self.client
            .patch(self.kind, &target.namespace, &target.name, payload)
            .await
    }
}
