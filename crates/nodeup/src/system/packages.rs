use super::run_streaming;
use anyhow::{bail, Result};
use async_trait::async_trait;
use nodeup_shared::collaborators::PackageInstaller;
use nodeup_shared::os::{OsFamily, OsInfo};
use nodeup_shared::progress::{ProgressCallback, StepProgress};

/// Installs packages with the distribution's package manager.
pub struct SystemPackages;

#[async_trait]
impl PackageInstaller for SystemPackages {
    async fn install(
        &self,
        os: &OsInfo,
        packages: &[String],
        on_progress: ProgressCallback,
    ) -> Result<()> {
        let manager = match os.family {
            OsFamily::Debian => "apt-get",
            OsFamily::Rhel => "dnf",
            OsFamily::Unknown => bail!("no package manager known for {}", os.id),
        };

        let envs: &[(&str, &str)] = &[("DEBIAN_FRONTEND", "noninteractive")];
        if os.family == OsFamily::Debian {
            on_progress(StepProgress::new(0.05, "refreshing package index"));
            run_streaming(manager, &["update", "-q"], envs, |_| {}).await?;
        }

        let total = packages.len().max(1) as f64;
        for (i, package) in packages.iter().enumerate() {
            on_progress(StepProgress::new(
                0.1 + 0.9 * (i as f64 / total),
                format!("installing {package}"),
            ));
            run_streaming(manager, &["install", "-y", "-q", package.as_str()], envs, |line| {
                tracing::debug!(target: "nodeup::packages", "{}", line);
            })
            .await?;
        }
        on_progress(StepProgress::done(format!("{} packages installed", packages.len())));
        Ok(())
    }
}
