//! Platform deployment through a helm release.

use super::runtime::K3S_KUBECONFIG;
use super::run_streaming;
use anyhow::{Context, Result};
use async_trait::async_trait;
use nodeup_shared::collaborators::{DeployOptions, DeploymentSyncer, RegistryTarget};
use nodeup_shared::config::DeploymentSettings;
use nodeup_shared::progress::{ProgressCallback, StepProgress};
use serde::Serialize;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

#[derive(Debug, Serialize)]
struct Values<'a> {
    global: Global<'a>,
    registry: RegistryValues<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Global<'a> {
    base_domain: &'a str,
    app_domain: &'a str,
    wildcard: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
enum RegistryValues<'a> {
    SelfHosted {
        domain: &'a str,
    },
    External {
        host: &'a str,
        username: &'a str,
        password: &'a str,
    },
}

/// Render the helm values file for `options`.
pub fn render_values(options: &DeployOptions) -> Result<String> {
    let registry = match &options.registry {
        RegistryTarget::SelfHosted { domain } => RegistryValues::SelfHosted { domain },
        RegistryTarget::External(external) => RegistryValues::External {
            host: &external.host,
            username: &external.username,
            password: &external.password,
        },
    };
    let values = Values {
        global: Global {
            base_domain: &options.base_domain,
            app_domain: &options.app_domain,
            wildcard: options.wildcard,
        },
        registry,
    };
    serde_yaml::to_string(&values).context("failed to render helm values")
}

pub struct HelmDeployer {
    settings: DeploymentSettings,
}

impl HelmDeployer {
    pub fn new(settings: DeploymentSettings) -> Self {
        Self { settings }
    }

    async fn write_values(&self, options: &DeployOptions) -> Result<()> {
        let path = Path::new(&self.settings.values_path);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("cannot create {}", dir.display()))?;
        }
        tokio::fs::write(path, render_values(options)?)
            .await
            .with_context(|| format!("cannot write {}", path.display()))?;
        // May hold registry credentials.
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
        Ok(())
    }
}

#[async_trait]
impl DeploymentSyncer for HelmDeployer {
    async fn sync(&self, options: &DeployOptions, on_progress: ProgressCallback) -> Result<()> {
        on_progress(StepProgress::new(0.1, "rendering values"));
        self.write_values(options).await?;

        on_progress(StepProgress::new(0.3, format!("installing {}", self.settings.chart)));
        let s = &self.settings;
        run_streaming(
            "helm",
            &[
                "upgrade",
                "--install",
                &s.release,
                &s.chart,
                "--namespace",
                &s.namespace,
                "--create-namespace",
                "--values",
                &s.values_path,
                "--wait",
                "--timeout",
                "25m",
            ],
            &[("KUBECONFIG", K3S_KUBECONFIG)],
            |line| tracing::debug!(target: "nodeup::helm", "{}", line),
        )
        .await
        .context("helm upgrade failed")?;

        on_progress(StepProgress::done(format!("release {} deployed", s.release)));
        Ok(())
    }
}
