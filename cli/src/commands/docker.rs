use std::sync::Arc;
use std::time::Duration;

use havoc_common::config::Config;
use havoc_common::timing::{self, Timing};
use havoc_common::{ChaosError, TargetSpec};
use havoc_core::chaos::{ContainerAction, ContainerChaos, Emulation, NetemChaos};
use havoc_core::client::{ContainerClient, DockerCli, DockerOptions, RemoveOptions};
use havoc_core::{ChaosCommand, OneShotCommand, RevertibleCommand, schedule};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::commands::{DockerAction, DockerArgs, NetemCommand};

pub async fn docker(args: DockerArgs, cfg: &Config, abort: &CancellationToken) -> anyhow::Result<()> {
    let client: Arc<dyn ContainerClient> = Arc::new(DockerCli::new(&options(&args)));
    let (command, interval) = build(args.action, cfg, client)?;
    info!(command = command.name(), dry_run = cfg.dry_run, "starting docker chaos");
    schedule(abort, command.as_ref(), interval, cfg.random).await?;
    Ok(())
}

fn options(args: &DockerArgs) -> DockerOptions {
    DockerOptions {
        host: Some(args.host.clone()),
        tls: args.tls,
        tls_verify: args.tls_verify,
        tls_ca_cert: args.tls_ca_cert.clone(),
        tls_cert: args.tls_cert.clone(),
        tls_key: args.tls_key.clone(),
    }
}

type Built = (Box<dyn ChaosCommand>, Option<Duration>);

/// Turns the parsed sub-command into a runnable chaos command and its interval.
fn build(
    action: DockerAction,
    cfg: &Config,
    client: Arc<dyn ContainerClient>,
) -> Result<Built, ChaosError> {
    let one_shot = |targets: Vec<String>, action: ContainerAction| -> Result<Built, ChaosError> {
        let chaos = ContainerChaos::new(client.clone(), TargetSpec::resolve(&targets)?, action);
        let interval = timing::parse_interval(&cfg.interval)?;
        let command: Box<dyn ChaosCommand> = Box::new(OneShotCommand::new(chaos, cfg.dry_run));
        Ok((command, interval))
    };

    match action {
        DockerAction::Kill { signal, targets } => one_shot(targets, ContainerAction::kill(&signal)?),
        DockerAction::Stop { time, targets } => one_shot(
            targets,
            ContainerAction::Stop {
                timeout: Duration::from_secs(time),
            },
        ),
        DockerAction::Pause { targets } => one_shot(targets, ContainerAction::Pause),
        DockerAction::Rm {
            force,
            links,
            volumes,
            targets,
        } => one_shot(
            targets,
            ContainerAction::Remove(RemoveOptions {
                force,
                links,
                volumes,
            }),
        ),
        DockerAction::Netem(netem) => {
            let timing = Timing::parse(&cfg.interval, &netem.duration)?;
            let (emulation, targets) = split_emulation(netem.emulation);
            let chaos = NetemChaos::new(
                client.clone(),
                TargetSpec::resolve(&targets)?,
                &netem.interface,
                emulation,
            )?
            .with_ip_filter(netem.target)
            .with_tc_image(netem.tc_image);
            let command: Box<dyn ChaosCommand> =
                Box::new(RevertibleCommand::new(chaos, &timing, cfg.dry_run)?);
            Ok((command, timing.interval))
        }
    }
}

fn split_emulation(cmd: NetemCommand) -> (Emulation, Vec<String>) {
    match cmd {
        NetemCommand::Delay {
            time,
            jitter,
            correlation,
            targets,
        } => (
            Emulation::Delay {
                time: Duration::from_millis(time),
                jitter: Duration::from_millis(jitter),
                correlation,
            },
            targets,
        ),
        NetemCommand::Loss {
            percent,
            correlation,
            targets,
        } => (
            Emulation::Loss {
                percent,
                correlation,
            },
            targets,
        ),
        NetemCommand::Duplicate {
            percent,
            correlation,
            targets,
        } => (
            Emulation::Duplicate {
                percent,
                correlation,
            },
            targets,
        ),
        NetemCommand::Corrupt {
            percent,
            correlation,
            targets,
        } => (
            Emulation::Corrupt {
                percent,
                correlation,
            },
            targets,
        ),
        NetemCommand::Rate { rate, targets } => (Emulation::Rate { rate }, targets),
        NetemCommand::LossState {
            p13,
            p31,
            p32,
            p23,
            p14,
            targets,
        } => (
            Emulation::LossState {
                p13,
                p31,
                p32,
                p23,
                p14,
            },
            targets,
        ),
        NetemCommand::LossGemodel {
            pg,
            pb,
            one_h,
            one_k,
            targets,
        } => (Emulation::LossGeModel { pg, pb, one_h, one_k }, targets),
    }
}
