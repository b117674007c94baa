use std::sync::Arc;
use std::time::Duration;

use havoc_common::config::Config;
use havoc_common::{ChaosError, TargetSpec, Timing};
use havoc_core::chaos::ScaleToZero;
use havoc_core::client::{ClusterClient, KubectlCli, KubectlOptions, ResourceKind};
use havoc_core::{ChaosCommand, RevertibleCommand, schedule};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::commands::{KubeAction, KubeArgs};

pub async fn kube(args: KubeArgs, cfg: &Config, abort: &CancellationToken) -> anyhow::Result<()> {
    let client: Arc<dyn ClusterClient> = Arc::new(KubectlCli::new(&KubectlOptions {
        kubeconfig: args.kubeconfig.clone(),
        context: args.context.clone(),
    }));
    let (command, interval) = build(args.action, &args.duration, cfg, client)?;
    info!(command = command.name(), dry_run = cfg.dry_run, "starting kubernetes chaos");
    schedule(abort, command.as_ref(), interval, cfg.random).await?;
    Ok(())
}

fn build(
    action: KubeAction,
    duration: &str,
    cfg: &Config,
    client: Arc<dyn ClusterClient>,
) -> Result<(Box<dyn ChaosCommand>, Option<Duration>), ChaosError> {
    let timing = Timing::parse(&cfg.interval, duration)?;
    match action {
        KubeAction::ScaleToZero {
            kind,
            namespace,
            targets,
        } => {
            let kind: ResourceKind = kind.parse()?;
            let chaos = ScaleToZero::new(client, kind, &namespace, TargetSpec::resolve(&targets)?);
            let command: Box<dyn ChaosCommand> =
                Box::new(RevertibleCommand::new(chaos, &timing, cfg.dry_run)?);
            Ok((command, timing.interval))
        }
    }
}
