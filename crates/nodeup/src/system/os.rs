use async_trait::async_trait;
use nodeup_shared::collaborators::OsDetector;
use nodeup_shared::os::{self, OsInfo};
use nodeup_shared::InstallerError;
use std::path::PathBuf;

/// Reads `/etc/os-release` and checks the process runs as root.
pub struct ReleaseFileDetector {
    path: PathBuf,
}

impl Default for ReleaseFileDetector {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/etc/os-release"),
        }
    }
}

#[async_trait]
impl OsDetector for ReleaseFileDetector {
    async fn detect(&self) -> Result<OsInfo, InstallerError> {
        // SAFETY: geteuid has no preconditions and cannot fail.
        let euid = unsafe { libc::geteuid() };
        if euid != 0 {
            return Err(InstallerError::Permission(
                "the installer must run as root (try sudo)".to_string(),
            ));
        }

        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            InstallerError::Environment(format!("cannot read {}: {e}", self.path.display()))
        })?;
        let info = os::parse_os_release(&contents, std::env::consts::ARCH);
        tracing::info!(os = %info.summary(), "operating system detected");
        os::check_supported(&info)?;
        Ok(info)
    }
}
