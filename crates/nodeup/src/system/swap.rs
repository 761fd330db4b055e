use super::run_logged;
use anyhow::{Context, Result};
use async_trait::async_trait;
use nodeup_shared::collaborators::SwapManager;
use nodeup_shared::progress::LogCallback;
use std::fs::Permissions;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use sysinfo::Disks;

/// Swap file management through `/proc/swaps` and the util-linux tools.
pub struct FileSwap {
    path: String,
}

impl FileSwap {
    pub fn new(path: String) -> Self {
        Self { path }
    }
}

/// True when `/proc/swaps` lists at least one device.
pub fn swaps_active(proc_swaps: &str) -> bool {
    proc_swaps.lines().skip(1).any(|line| !line.trim().is_empty())
}

/// fstab contents with a swap entry for `path` appended, or `None` if one is already there.
pub fn fstab_with_swap(fstab: &str, path: &str) -> Option<String> {
    let present = fstab
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .any(|line| line.split_whitespace().next() == Some(path));
    if present {
        return None;
    }
    let mut updated = fstab.to_string();
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&format!("{path} none swap sw 0 0\n"));
    Some(updated)
}

#[async_trait]
impl SwapManager for FileSwap {
    async fn check_active(&self) -> Result<bool> {
        let swaps = tokio::fs::read_to_string("/proc/swaps")
            .await
            .context("cannot read /proc/swaps")?;
        Ok(swaps_active(&swaps))
    }

    async fn available_disk_gb(&self) -> Result<f64> {
        let target = Path::new(&self.path)
            .parent()
            .unwrap_or_else(|| Path::new("/"))
            .to_path_buf();
        let disks = Disks::new_with_refreshed_list();
        // Longest mount point that contains the swap file's directory.
        let disk = disks
            .list()
            .iter()
            .filter(|d| target.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .context("no disk found for the swap file location")?;
        Ok(disk.available_space() as f64 / 1024f64.powi(3))
    }

    async fn create_swap_file(&self, size_gb: u32, on_log: LogCallback) -> Result<()> {
        let size = format!("{size_gb}G");
        on_log(format!("allocating {size} at {}", self.path));
        run_logged("fallocate", &["-l", &size, &self.path], &on_log).await?;
        tokio::fs::set_permissions(&self.path, Permissions::from_mode(0o600))
            .await
            .with_context(|| format!("cannot restrict permissions on {}", self.path))?;
        run_logged("mkswap", &[&self.path], &on_log).await?;
        run_logged("swapon", &[&self.path], &on_log).await?;

        let fstab = tokio::fs::read_to_string("/etc/fstab").await.unwrap_or_default();
        if let Some(updated) = fstab_with_swap(&fstab, &self.path) {
            tokio::fs::write("/etc/fstab", updated)
                .await
                .context("cannot update /etc/fstab")?;
            on_log("added swap entry to /etc/fstab".to_string());
        }
        on_log(format!("swap enabled ({size})"));
        Ok(())
    }
}
