mod commands;
mod signals;
mod terminal;

use std::process::ExitCode;

use commands::{CommandLine, Commands, docker, kube};
use havoc_common::config::Config;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::terminal::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let commands = CommandLine::parse_args();

    logging::init_logging(&commands.log_level, commands.json);

    ExitCode::from(report(run(commands).await))
}

async fn run(commands: CommandLine) -> anyhow::Result<()> {
    let cfg = Config {
        random: commands.random,
        dry_run: commands.dry_run,
        interval: commands.interval,
    };

    let abort = CancellationToken::new();
    signals::cancel_on_signal(abort.clone())?;

    match commands.command {
        Commands::Docker(args) => docker::docker(args, &cfg, &abort).await,
        Commands::Kube(args) => kube::kube(args, &cfg, &abort).await,
    }
}

/// Logs a failed run once and maps it to the process exit status.
fn report(result: anyhow::Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            error!("{err:#}");
            1
        }
    }
}
