pub mod docker;
pub mod kube;

use std::net::IpAddr;
use std::sync::LazyLock;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use havoc_core::chaos::{DEFAULT_INTERFACE, DEFAULT_SIGNAL};

/// `<version> - <short commit> (<branch>) <build time>`, stamped at build time.
static VERSION: LazyLock<String> = LazyLock::new(|| {
    let commit = option_env!("HAVOC_GIT_COMMIT").unwrap_or("none");
    let short = commit.get(..7).unwrap_or(commit);
    format!(
        "{} - {} ({}) {}",
        env!("CARGO_PKG_VERSION"),
        short,
        option_env!("HAVOC_GIT_BRANCH").unwrap_or("none"),
        option_env!("HAVOC_BUILD_TIME").unwrap_or("none"),
    )
});

#[derive(Parser)]
#[command(name = "havoc")]
#[command(about = "Chaos testing for containers and cluster workloads.")]
#[command(version = VERSION.as_str())]
pub struct CommandLine {
    /// Log level: debug, info, warning, error, fatal or panic
    #[arg(short = 'l', long, env = "LOG_LEVEL", default_value = "warning")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(short, long, env = "LOG_JSON", value_parser = BoolishValueParser::new())]
    pub json: bool,

    /// Recurring interval for the chaos command, e.g. 30s, 5m, 1h
    #[arg(short, long, default_value = "")]
    pub interval: String,

    /// Pick one random target out of the matching ones on every run
    #[arg(short, long)]
    pub random: bool,

    /// Log the planned chaos without touching anything
    #[arg(long, env = "DRY_RUN", value_parser = BoolishValueParser::new())]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Chaos for Docker containers
    #[command(alias = "d")]
    Docker(DockerArgs),
    /// Chaos for Kubernetes workloads
    #[command(alias = "k")]
    Kube(KubeArgs),
}

#[derive(Args)]
pub struct DockerArgs {
    /// Daemon socket to connect to
    #[arg(short = 'H', long, env = "DOCKER_HOST", default_value = "unix:///var/run/docker.sock")]
    pub host: String,

    /// Use TLS; implied by --tlsverify
    #[arg(long)]
    pub tls: bool,

    /// Use TLS and verify the remote
    #[arg(long = "tlsverify", env = "DOCKER_TLS_VERIFY", value_parser = BoolishValueParser::new())]
    pub tls_verify: bool,

    /// Trust certs signed only by this CA
    #[arg(long = "tlscacert")]
    pub tls_ca_cert: Option<String>,

    /// TLS certificate file
    #[arg(long = "tlscert")]
    pub tls_cert: Option<String>,

    /// TLS key file
    #[arg(long = "tlskey")]
    pub tls_key: Option<String>,

    #[command(subcommand)]
    pub action: DockerAction,
}

#[derive(Subcommand)]
pub enum DockerAction {
    /// Send a signal to the main process of matching containers
    Kill {
        #[arg(short, long, default_value = DEFAULT_SIGNAL)]
        signal: String,
        /// Container names, or a single `re2:` pattern
        targets: Vec<String>,
    },
    /// Stop matching containers
    Stop {
        /// Seconds to wait for stop before killing
        #[arg(short, long, default_value_t = 10)]
        time: u64,
        targets: Vec<String>,
    },
    /// Pause all processes in matching containers
    Pause { targets: Vec<String> },
    /// Remove matching containers
    Rm {
        /// Force removal of running containers
        #[arg(short, long, default_value_t = true, action = ArgAction::Set)]
        force: bool,
        /// Remove container links
        #[arg(short, long)]
        links: bool,
        /// Remove anonymous volumes
        #[arg(short, long, default_value_t = true, action = ArgAction::Set)]
        volumes: bool,
        targets: Vec<String>,
    },
    /// Emulate network problems inside matching containers
    Netem(NetemArgs),
}

#[derive(Args)]
pub struct NetemArgs {
    /// How long the emulation is held before it is removed; defaults to --interval
    #[arg(short, long, default_value = "")]
    pub duration: String,

    /// Network interface to apply the emulation on
    #[arg(short, long, default_value = DEFAULT_INTERFACE)]
    pub interface: String,

    /// Only emulate traffic to this destination IP; repeat for several
    #[arg(short = 't', long = "target")]
    pub target: Vec<IpAddr>,

    /// Image with tc (iproute2) to run it from when targets lack it, e.g. gaiadocker/iproute2
    #[arg(long)]
    pub tc_image: Option<String>,

    #[command(subcommand)]
    pub emulation: NetemCommand,
}

#[derive(Subcommand)]
pub enum NetemCommand {
    /// Delay egress traffic
    Delay {
        /// Delay in milliseconds
        #[arg(short, long, default_value_t = 100)]
        time: u64,
        /// Random variation in milliseconds
        #[arg(short, long, default_value_t = 10)]
        jitter: u64,
        /// Correlation with the previous delay, in percent
        #[arg(short, long, default_value_t = 20.0)]
        correlation: f64,
        targets: Vec<String>,
    },
    /// Drop a percentage of packets
    Loss {
        #[arg(short, long, default_value_t = 0.0)]
        percent: f64,
        #[arg(short, long, default_value_t = 0.0)]
        correlation: f64,
        targets: Vec<String>,
    },
    /// Duplicate a percentage of packets
    Duplicate {
        #[arg(short, long, default_value_t = 0.0)]
        percent: f64,
        #[arg(short, long, default_value_t = 0.0)]
        correlation: f64,
        targets: Vec<String>,
    },
    /// Corrupt a percentage of packets
    Corrupt {
        #[arg(short, long, default_value_t = 0.0)]
        percent: f64,
        #[arg(short, long, default_value_t = 0.0)]
        correlation: f64,
        targets: Vec<String>,
    },
    /// Limit egress bandwidth
    Rate {
        /// Rate with unit, e.g. 100kbit
        #[arg(short, long, default_value = "100kbit")]
        rate: String,
        targets: Vec<String>,
    },
    /// Drop packets following a 4-state Markov model
    LossState {
        /// Probability to go from good reception to burst losses
        #[arg(long, default_value_t = 0.0)]
        p13: f64,
        /// Probability to go from burst losses back to good reception
        #[arg(long, default_value_t = 100.0)]
        p31: f64,
        /// Probability to go from burst losses to good reception within a burst
        #[arg(long, default_value_t = 0.0)]
        p32: f64,
        /// Probability to go from good reception within a burst back to burst losses
        #[arg(long, default_value_t = 100.0)]
        p23: f64,
        /// Probability to go from good reception to isolated losses
        #[arg(long, default_value_t = 0.0)]
        p14: f64,
        targets: Vec<String>,
    },
    /// Drop packets following the Gilbert-Elliot model
    LossGemodel {
        /// Transition probability into the bad state
        #[arg(long, default_value_t = 0.0)]
        pg: f64,
        /// Transition probability into the good state
        #[arg(long, default_value_t = 100.0)]
        pb: f64,
        /// Loss probability in the good state is 100 minus this
        #[arg(long = "one-h", default_value_t = 100.0)]
        one_h: f64,
        /// Loss probability in the bad state is 100 minus this
        #[arg(long = "one-k", default_value_t = 0.0)]
        one_k: f64,
        targets: Vec<String>,
    },
}

#[derive(Args)]
pub struct KubeArgs {
    /// Path to a single kubeconfig file; kubectl reads $KUBECONFIG on its own
    #[arg(long)]
    pub kubeconfig: Option<String>,

    /// Kubeconfig context to use
    #[arg(long)]
    pub context: Option<String>,

    /// How long the workload stays scaled down; defaults to --interval
    #[arg(short, long, default_value = "")]
    pub duration: String,

    #[command(subcommand)]
    pub action: KubeAction,
}

#[derive(Subcommand)]
pub enum KubeAction {
    /// Scale matching workloads to zero replicas, then restore them
    ScaleToZero {
        /// deployment, replicaset, replicationcontroller or statefulset
        #[arg(short, long, default_value = "deployment")]
        kind: String,
        #[arg(short, long, default_value = "default")]
        namespace: String,
        targets: Vec<String>,
    },
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
