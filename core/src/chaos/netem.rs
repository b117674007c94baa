//! Network emulation inside containers via `tc qdisc … netem`.
//!
//! The qdisc is added on apply and deleted on revert, so the revert payload is
//! independent of what the emulation was. With an IP filter the netem qdisc
//! hangs off a `prio` root instead, and only traffic to the listed
//! destinations is steered into it.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use havoc_common::{ChaosError, TargetSpec};

use crate::client::{Container, ContainerClient};
use crate::command::Revertible;

pub const DEFAULT_INTERFACE: &str = "eth0";

const MAX_INTERFACE_LEN: usize = 15;
const RATE_UNITS: &[&str] = &[
    "tbit", "gbit", "mbit", "kbit", "bit", "tbps", "gbps", "mbps", "kbps", "bps",
];

#[derive(Clone, Debug, PartialEq)]
pub enum Emulation {
    /// Delay egress packets by `time`, plus or minus `jitter`.
    Delay {
        time: Duration,
        jitter: Duration,
        correlation: f64,
    },
    Loss {
        percent: f64,
        correlation: f64,
    },
    Duplicate {
        percent: f64,
        correlation: f64,
    },
    Corrupt {
        percent: f64,
        correlation: f64,
    },
    /// Limit egress bandwidth, e.g. `100kbit`.
    Rate { rate: String },
    /// Four state Markov loss model, transition probabilities in percent.
    LossState {
        p13: f64,
        p31: f64,
        p32: f64,
        p23: f64,
        p14: f64,
    },
    /// Gilbert-Elliot loss model, probabilities in percent.
    LossGeModel {
        pg: f64,
        pb: f64,
        one_h: f64,
        one_k: f64,
    },
}

impl Emulation {
    fn label(&self) -> &'static str {
        match self {
            Self::Delay { .. } => "netem delay",
            Self::Loss { .. } => "netem loss",
            Self::Duplicate { .. } => "netem duplicate",
            Self::Corrupt { .. } => "netem corrupt",
            Self::Rate { .. } => "netem rate",
            Self::LossState { .. } => "netem loss-state",
            Self::LossGeModel { .. } => "netem loss-gemodel",
        }
    }

    fn validate(&self) -> Result<(), ChaosError> {
        match self {
            Self::Delay {
                time, correlation, ..
            } => {
                if time.is_zero() {
                    return Err(ChaosError::config("delay time must be greater than zero"));
                }
                check_percent("delay correlation", *correlation)
            }
            Self::Loss {
                percent,
                correlation,
            }
            | Self::Duplicate {
                percent,
                correlation,
            }
            | Self::Corrupt {
                percent,
                correlation,
            } => {
                check_percent("percent", *percent)?;
                check_percent("correlation", *correlation)
            }
            Self::Rate { rate } => check_rate(rate),
            Self::LossState {
                p13,
                p31,
                p32,
                p23,
                p14,
            } => [("p13", p13), ("p31", p31), ("p32", p32), ("p23", p23), ("p14", p14)]
                .into_iter()
                .try_for_each(|(what, value)| check_percent(what, *value)),
            Self::LossGeModel { pg, pb, one_h, one_k } => {
                [("pg", pg), ("pb", pb), ("one-h", one_h), ("one-k", one_k)]
                    .into_iter()
                    .try_for_each(|(what, value)| check_percent(what, *value))
            }
        }
    }

    /// Arguments following `netem` on the `tc` command line.
    fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        match self {
            Self::Delay {
                time,
                jitter,
                correlation,
            } => {
                args.push("delay".to_string());
                args.push(format!("{}ms", time.as_millis()));
                if !jitter.is_zero() {
                    args.push(format!("{}ms", jitter.as_millis()));
                    if *correlation > 0.0 {
                        args.push(format!("{correlation:.2}%"));
                    }
                }
            }
            Self::Loss {
                percent,
                correlation,
            } => push_percentages(&mut args, "loss", *percent, *correlation),
            Self::Duplicate {
                percent,
                correlation,
            } => push_percentages(&mut args, "duplicate", *percent, *correlation),
            Self::Corrupt {
                percent,
                correlation,
            } => push_percentages(&mut args, "corrupt", *percent, *correlation),
            Self::Rate { rate } => {
                args.push("rate".to_string());
                args.push(rate.clone());
            }
            Self::LossState {
                p13,
                p31,
                p32,
                p23,
                p14,
            } => {
                args.extend(["loss".to_string(), "state".to_string()]);
                args.extend([p13, p31, p32, p23, p14].map(|p| format!("{p:.2}%")));
            }
            Self::LossGeModel { pg, pb, one_h, one_k } => {
                args.extend(["loss".to_string(), "gemodel".to_string()]);
                args.extend([pg, pb, one_h, one_k].map(|p| format!("{p:.2}%")));
            }
        }
        args
    }
}

fn push_percentages(args: &mut Vec<String>, name: &str, percent: f64, correlation: f64) {
    args.push(name.to_string());
    args.push(format!("{percent:.2}%"));
    if correlation > 0.0 {
        args.push(format!("{correlation:.2}%"));
    }
}

fn check_percent(what: &str, value: f64) -> Result<(), ChaosError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(ChaosError::config(format!(
            "{what} must be between 0 and 100, got {value}"
        )));
    }
    Ok(())
}

fn check_rate(rate: &str) -> Result<(), ChaosError> {
    let lower = rate.to_ascii_lowercase();
    let valid = RATE_UNITS.iter().any(|unit| {
        lower
            .strip_suffix(unit)
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
    });
    if !valid {
        return Err(ChaosError::config(format!("invalid rate '{rate}'")));
    }
    Ok(())
}

fn check_interface(name: &str) -> Result<(), ChaosError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_INTERFACE_LEN
        && name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !valid {
        return Err(ChaosError::config(format!("bad network interface name '{name}'")));
    }
    Ok(())
}

fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|s| s.to_string()).collect()
}

/// Degrades egress traffic of the matching containers for the hold duration.
pub struct NetemChaos {
    client: Arc<dyn ContainerClient>,
    targets: TargetSpec,
    interface: String,
    emulation: Emulation,
    destinations: Vec<IpAddr>,
    tc_image: Option<String>,
}

impl NetemChaos {
    pub fn new(
        client: Arc<dyn ContainerClient>,
        targets: TargetSpec,
        interface: &str,
        emulation: Emulation,
    ) -> Result<Self, ChaosError> {
        check_interface(interface)?;
        emulation.validate()?;
        Ok(Self {
            client,
            targets,
            interface: interface.to_string(),
            emulation,
            destinations: Vec::new(),
            tc_image: None,
        })
    }

    /// Limits the emulation to traffic towards `destinations`. Empty means all traffic.
    pub fn with_ip_filter(mut self, destinations: Vec<IpAddr>) -> Self {
        self.destinations = destinations;
        self
    }

    /// Runs `tc` from a helper container built from `image` sharing the
    /// target's network namespace, for targets that do not ship `tc`.
    pub fn with_tc_image(mut self, image: Option<String>) -> Self {
        self.tc_image = image.filter(|image| !image.trim().is_empty());
        self
    }

    /// Commands that install the emulation, run in order.
    fn install(&self) -> Vec<Vec<String>> {
        let dev = self.interface.as_str();
        if self.destinations.is_empty() {
            let mut add = strings(&["tc", "qdisc", "add", "dev", dev, "root", "netem"]);
            add.extend(self.emulation.args());
            return vec![add];
        }

        let mut netem = strings(&["tc", "qdisc", "add", "dev", dev, "parent", "1:3", "netem"]);
        netem.extend(self.emulation.args());
        let mut script = vec![
            strings(&["tc", "qdisc", "add", "dev", dev, "root", "handle", "1:", "prio"]),
            netem,
        ];
        for ip in &self.destinations {
            let (protocol, selector) = match ip {
                IpAddr::V4(_) => ("ip", "ip"),
                IpAddr::V6(_) => ("ipv6", "ip6"),
            };
            let ip = ip.to_string();
            script.push(strings(&[
                "tc", "filter", "add", "dev", dev, "protocol", protocol, "parent", "1:0", "prio",
                "1", "u32", "match", selector, "dst", ip.as_str(), "flowid", "1:3",
            ]));
        }
        script
    }

    /// Commands that remove everything `install` added.
    fn uninstall(&self) -> Vec<Vec<String>> {
        let dev = self.interface.as_str();
        if self.destinations.is_empty() {
            vec![strings(&["tc", "qdisc", "del", "dev", dev, "root", "netem"])]
        } else {
            // deleting the prio root takes its children and filters with it
            vec![strings(&["tc", "qdisc", "del", "dev", dev, "root"])]
        }
    }

    async fn run_all(&self, target: &Container, script: &[Vec<String>]) -> anyhow::Result<()> {
        for argv in script {
            match &self.tc_image {
                Some(image) => self.client.run_sidecar(target, image, argv).await?,
                None => self.client.exec(target, argv).await?,
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Revertible for NetemChaos {
    type Target = Container;
    type Payload = Vec<Vec<String>>;

    fn action(&self) -> &str {
        self.emulation.label()
    }

    async fn list_targets(&self) -> anyhow::Result<Vec<Container>> {
        let containers = self.client.list_containers().await?;
        Ok(self.targets.filter(containers, |c| c.name.as_str()))
    }

    async fn payloads(
        &self,
        _target: &Container,
    ) -> anyhow::Result<(Vec<Vec<String>>, Vec<Vec<String>>)> {
        Ok((self.install(), self.uninstall()))
    }

    async fn apply(&self, target: &Container, payload: &Vec<Vec<String>>) -> anyhow::Result<()> {
        self.run_all(target, payload).await
    }

    async fn revert(&self, target: &Container, payload: &Vec<Vec<String>>) -> anyhow::Result<()> {
        self.run_all(target, payload).await
    }
}
