use std::process::Stdio;

use anyhow::{Context, bail};
use tokio::process::Command;
use tracing::trace;

/// Runs `program` with `args` to completion and returns its stdout.
///
/// A non-zero exit is an error carrying the trimmed stderr.
pub(crate) async fn run(program: &str, args: &[String]) -> anyhow::Result<String> {
    trace!(program, args = ?args, "spawning");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("failed to spawn '{program}'"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        bail!(
            "'{program} {}' exited with {code}: {}",
            args.first().map(String::as_str).unwrap_or_default(),
            stderr.trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
