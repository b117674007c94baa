//! [`ContainerClient`] backed by the `docker` command line.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::process;
use super::{Container, ContainerClient, RemoveOptions};

const DOCKER: &str = "docker";

/// Connection settings, passed through to every `docker` invocation.
#[derive(Clone, Debug, Default)]
pub struct DockerOptions {
    pub host: Option<String>,
    pub tls: bool,
    pub tls_verify: bool,
    pub tls_ca_cert: Option<String>,
    pub tls_cert: Option<String>,
    pub tls_key: Option<String>,
}

pub struct DockerCli {
    global_args: Vec<String>,
}

impl DockerCli {
    pub fn new(opts: &DockerOptions) -> Self {
        let mut global_args: Vec<String> = Vec::new();

        if let Some(host) = &opts.host {
            global_args.extend(["--host".to_string(), host.clone()]);
        }

        // certificate flags only make sense once TLS is on
        if opts.tls || opts.tls_verify {
            let mode = if opts.tls_verify { "--tlsverify" } else { "--tls" };
            global_args.push(mode.to_string());
            let files = [
                ("--tlscacert", &opts.tls_ca_cert),
                ("--tlscert", &opts.tls_cert),
                ("--tlskey", &opts.tls_key),
            ];
            for (flag, value) in files {
                if let Some(path) = value {
                    global_args.extend([flag.to_string(), path.clone()]);
                }
            }
        }

        Self { global_args }
    }

    async fn docker<I, S>(&self, args: I) -> anyhow::Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv: Vec<String> = self.global_args.clone();
        argv.extend(args.into_iter().map(Into::into));
        process::run(DOCKER, &argv).await
    }
}

#[async_trait]
impl ContainerClient for DockerCli {
    async fn list_containers(&self) -> anyhow::Result<Vec<Container>> {
        let out = self
            .docker(["ps", "--no-trunc", "--format", "{{json .}}"])
            .await?;
        out.lines()
            .filter(|line| !line.trim().is_empty())
            .map(parse_ps_line)
            .collect()
    }

    async fn kill(&self, container: &Container, signal: &str) -> anyhow::Result<()> {
        debug!(name = %container.name, signal, "docker kill");
        self.docker(["kill", "--signal", signal, container.id.as_str()]).await?;
        Ok(())
    }

    async fn stop(&self, container: &Container, timeout: Duration) -> anyhow::Result<()> {
        debug!(name = %container.name, timeout = ?timeout, "docker stop");
        let secs = timeout.as_secs().to_string();
        self.docker(["stop", "--time", secs.as_str(), container.id.as_str()]).await?;
        Ok(())
    }

    async fn pause(&self, container: &Container) -> anyhow::Result<()> {
        debug!(name = %container.name, "docker pause");
        self.docker(["pause", container.id.as_str()]).await?;
        Ok(())
    }

    async fn remove(&self, container: &Container, opts: RemoveOptions) -> anyhow::Result<()> {
        debug!(name = %container.name, ?opts, "docker rm");
        self.docker(rm_args(&container.id, opts)).await?;
        Ok(())
    }

    async fn exec(&self, container: &Container, argv: &[String]) -> anyhow::Result<()> {
        debug!(name = %container.name, argv = ?argv, "docker exec");
        let mut args: Vec<String> = vec!["exec".to_string(), container.id.clone()];
        args.extend_from_slice(argv);
        self.docker(args).await?;
        Ok(())
    }

    async fn run_sidecar(
        &self,
        container: &Container,
        image: &str,
        argv: &[String],
    ) -> anyhow::Result<()> {
        debug!(name = %container.name, image, argv = ?argv, "docker run sidecar");
        self.docker(sidecar_args(&container.id, image, argv)?).await?;
        Ok(())
    }
}

/// `docker run` arguments for a one-off helper sharing `id`'s network stack.
fn sidecar_args(id: &str, image: &str, argv: &[String]) -> anyhow::Result<Vec<String>> {
    let (entrypoint, rest) = argv
        .split_first()
        .context("sidecar needs a command to run")?;
    let mut args: Vec<String> = [
        "run",
        "--rm",
        "--network",
        format!("container:{id}").as_str(),
        "--cap-add",
        "NET_ADMIN",
        "--entrypoint",
        entrypoint.as_str(),
        image,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.extend_from_slice(rest);
    Ok(args)
}

#[derive(Deserialize)]
struct PsLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names")]
    names: String,
    #[serde(rename = "Image", default)]
    image: String,
}

/// Parses one line of `docker ps --format '{{json .}}'`.
fn parse_ps_line(line: &str) -> anyhow::Result<Container> {
    let ps: PsLine =
        serde_json::from_str(line).with_context(|| format!("unexpected docker ps output: {line}"))?;
    // linked containers report several comma separated names; the first is canonical
    let name = ps.names.split(',').next().unwrap_or_default().to_string();
    Ok(Container {
        id: ps.id,
        name,
        image: ps.image,
    })
}

fn rm_args(id: &str, opts: RemoveOptions) -> Vec<String> {
    let mut args = vec!["rm".to_string()];
    if opts.force {
        args.push("--force".to_string());
    }
    if opts.links {
        args.push("--link".to_string());
    }
    if opts.volumes {
        args.push("--volumes".to_string());
    }
    args.push(id.to_string());
    args
}
