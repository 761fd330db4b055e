//! Production collaborators: shell commands, HTTP and DNS on the real host.

mod deploy;
mod network;
mod os;
mod packages;
mod registry;
mod runtime;
mod swap;

pub use deploy::{render_values, HelmDeployer};
pub use network::{cidr_for, HostProbe};
pub use os::ReleaseFileDetector;
pub use packages::SystemPackages;
pub use registry::{parse_bearer_challenge, BearerChallenge, HttpRegistryChecker};
pub use runtime::{CiliumInstaller, K3sRuntime};
pub use swap::{fstab_with_swap, swaps_active, FileSwap};

use crate::tasks::Collaborators;
use anyhow::{bail, Context, Result};
use nodeup_shared::config::InstallerConfig;
use nodeup_shared::progress::LogCallback;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Wire every production collaborator from the loaded configuration.
pub fn collaborators(config: &InstallerConfig) -> Result<Collaborators> {
    let probe = Arc::new(HostProbe::new(
        config.network.external_ip_url.clone(),
        config.timeouts.probe_http(),
    )?);
    let registry = Arc::new(HttpRegistryChecker::new(config.timeouts.registry_http())?);
    Ok(Collaborators {
        os: Arc::new(ReleaseFileDetector::default()),
        packages: Arc::new(SystemPackages),
        runtime: Arc::new(K3sRuntime::default()),
        networking: Arc::new(CiliumInstaller::new(config.deployment.cilium_version.clone())),
        deployment: Arc::new(HelmDeployer::new(config.deployment.clone())),
        probe,
        swap: Arc::new(FileSwap::new(config.swap.path.clone())),
        registry,
    })
}

/// Run a command, forwarding each output line to `on_line`. Fails on a non-zero exit.
pub(crate) async fn run_streaming(
    program: &str,
    args: &[&str],
    envs: &[(&str, &str)],
    mut on_line: impl FnMut(String) + Send,
) -> Result<()> {
    tracing::debug!(program, ?args, "running");
    let mut child = Command::new(program)
        .args(args)
        .envs(envs.iter().copied())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to start {program}"))?;

    let stdout = child.stdout.take().context("stdout not captured")?;
    let stderr = child.stderr.take().context("stderr not captured")?;
    let mut out = BufReader::new(stdout).lines();
    let mut err = BufReader::new(stderr).lines();
    let mut tail = Vec::new();

    let (mut out_open, mut err_open) = (true, true);
    while out_open || err_open {
        tokio::select! {
            line = out.next_line(), if out_open => match line? {
                Some(line) => on_line(line),
                None => out_open = false,
            },
            line = err.next_line(), if err_open => match line? {
                Some(line) => {
                    if tail.len() == 5 {
                        tail.remove(0);
                    }
                    tail.push(line.clone());
                    on_line(line);
                }
                None => err_open = false,
            },
        }
    }

    let status = child.wait().await?;
    if !status.success() {
        bail!("{program} exited with {status}: {}", tail.join(" | "));
    }
    Ok(())
}

/// Like [`run_streaming`], but lines go to a log callback.
pub(crate) async fn run_logged(program: &str, args: &[&str], on_log: &LogCallback) -> Result<()> {
    let log = on_log.clone();
    run_streaming(program, args, &[], move |line| log(line)).await
}

/// Run a command and capture stdout.
pub(crate) async fn capture(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("failed to start {program}"))?;
    if !output.status.success() {
        bail!(
            "{program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
