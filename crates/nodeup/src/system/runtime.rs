//! k3s cluster runtime and the Cilium networking layer.

use super::{run_logged, run_streaming};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use nodeup_shared::collaborators::{NetworkingInstaller, RuntimeInstaller};
use nodeup_shared::progress::{LogCallback, ProgressCallback, StepProgress};
use std::path::{Path, PathBuf};

const K3S_BINARY: &str = "/usr/local/bin/k3s";
const K3S_UNINSTALL: &str = "/usr/local/bin/k3s-uninstall.sh";
pub const K3S_KUBECONFIG: &str = "/etc/rancher/k3s/k3s.yaml";

/// Flannel and the bundled network policy controller are replaced by Cilium.
const K3S_EXEC: &str = "server --flannel-backend=none --disable-network-policy --disable=traefik";

/// Install-script lines that mark a step, with the fraction reached once seen.
const K3S_STEPS: &[(&str, f64)] = &[
    ("Finding release", 0.1),
    ("Downloading hash", 0.2),
    ("Downloading binary", 0.3),
    ("Verifying binary", 0.5),
    ("Installing k3s", 0.6),
    ("Creating", 0.7),
    ("systemd: Enabling", 0.8),
    ("systemd: Starting", 0.9),
];

pub struct K3sRuntime {
    binary: PathBuf,
    kubeconfig: PathBuf,
}

impl Default for K3sRuntime {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(K3S_BINARY),
            kubeconfig: PathBuf::from(K3S_KUBECONFIG),
        }
    }
}

#[async_trait]
impl RuntimeInstaller for K3sRuntime {
    async fn is_installed(&self) -> Result<bool> {
        Ok(tokio::fs::try_exists(&self.binary).await?)
    }

    async fn uninstall(&self, on_log: LogCallback) -> Result<()> {
        if !Path::new(K3S_UNINSTALL).exists() {
            bail!("{K3S_UNINSTALL} not found; remove the existing runtime manually");
        }
        on_log("removing existing k3s installation".to_string());
        run_logged(K3S_UNINSTALL, &[], &on_log).await
    }

    async fn install(&self, on_progress: ProgressCallback) -> Result<PathBuf> {
        on_progress(StepProgress::new(0.05, "fetching k3s install script"));
        let progress = on_progress.clone();
        run_streaming(
            "sh",
            &["-c", "curl -sfL https://get.k3s.io | sh -"],
            &[("INSTALL_K3S_EXEC", K3S_EXEC)],
            move |line| {
                tracing::debug!(target: "nodeup::k3s", "{}", line);
                if let Some((_, fraction)) = K3S_STEPS.iter().find(|(m, _)| line.contains(m)) {
                    let step = line.trim_start_matches("[INFO]").trim();
                    progress(StepProgress::new(*fraction, step));
                }
            },
        )
        .await
        .context("k3s install script failed")?;

        if !tokio::fs::try_exists(&self.kubeconfig).await? {
            bail!("k3s did not write {}", self.kubeconfig.display());
        }
        on_progress(StepProgress::done("k3s running"));
        Ok(self.kubeconfig.clone())
    }
}

pub struct CiliumInstaller {
    version: String,
}

impl CiliumInstaller {
    pub fn new(version: String) -> Self {
        Self { version }
    }
}

#[async_trait]
impl NetworkingInstaller for CiliumInstaller {
    async fn install(
        &self,
        on_progress: ProgressCallback,
        internal_ip: &str,
        cidr: &str,
    ) -> Result<()> {
        let envs = [("KUBECONFIG", K3S_KUBECONFIG)];
        let service_host = format!("k8sServiceHost={internal_ip}");
        let native_cidr = format!("ipv4NativeRoutingCIDR={cidr}");

        on_progress(StepProgress::new(0.1, format!("installing cilium {}", self.version)));
        run_streaming(
            "cilium",
            &[
                "install",
                "--version",
                &self.version,
                "--set",
                &service_host,
                "--set",
                "k8sServicePort=6443",
                "--set",
                &native_cidr,
                "--set",
                "kubeProxyReplacement=true",
            ],
            &envs,
            |line| tracing::debug!(target: "nodeup::cilium", "{}", line),
        )
        .await
        .context("cilium install failed")?;

        on_progress(StepProgress::new(0.6, "waiting for cilium to become ready"));
        run_streaming("cilium", &["status", "--wait"], &envs, |line| {
            tracing::debug!(target: "nodeup::cilium", "{}", line)
        })
        .await
        .context("cilium did not become ready")?;

        on_progress(StepProgress::done("cilium ready"));
        Ok(())
    }
}
