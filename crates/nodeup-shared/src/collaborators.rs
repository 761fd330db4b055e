//! Collaborator seams driven by the installer.
//!
//! Production implementations shell out or talk HTTP; tests plug in fakes.
//! Probe-style methods return plain booleans: a network error is a negative answer.

use crate::error::InstallerError;
use crate::os::OsInfo;
use crate::progress::{LogCallback, ProgressCallback};
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkAddresses {
    pub internal_ip: String,
    pub external_ip: String,
    pub cidr: String,
}

/// Credentials for an external registry. The password never shows up in `Debug`.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ExternalRegistry {
    pub host: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ExternalRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalRegistry")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryTarget {
    SelfHosted { domain: String },
    External(ExternalRegistry),
}

/// Inputs the deployment sync needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOptions {
    pub base_domain: String,
    pub app_domain: String,
    pub registry_domain: String,
    pub wildcard: bool,
    pub registry: RegistryTarget,
}

#[async_trait]
pub trait OsDetector: Send + Sync {
    /// Identify the host and reject unsupported or unprivileged environments.
    async fn detect(&self) -> Result<OsInfo, InstallerError>;
}

#[async_trait]
pub trait PackageInstaller: Send + Sync {
    async fn install(
        &self,
        os: &OsInfo,
        packages: &[String],
        on_progress: ProgressCallback,
    ) -> Result<()>;
}

#[async_trait]
pub trait RuntimeInstaller: Send + Sync {
    async fn is_installed(&self) -> Result<bool>;

    async fn uninstall(&self, on_log: LogCallback) -> Result<()>;

    /// Install the cluster runtime and return the kubeconfig path it wrote.
    async fn install(&self, on_progress: ProgressCallback) -> Result<PathBuf>;
}

#[async_trait]
pub trait NetworkingInstaller: Send + Sync {
    async fn install(
        &self,
        on_progress: ProgressCallback,
        internal_ip: &str,
        cidr: &str,
    ) -> Result<()>;
}

#[async_trait]
pub trait DeploymentSyncer: Send + Sync {
    async fn sync(&self, options: &DeployOptions, on_progress: ProgressCallback) -> Result<()>;
}

#[async_trait]
pub trait NetworkProbe: Send + Sync {
    async fn detect_addresses(&self) -> Result<NetworkAddresses>;

    async fn resolves_to(&self, domain: &str, ip: &str) -> bool;

    async fn is_behind_proxy(&self, domain: &str) -> bool;
}

#[async_trait]
pub trait SwapManager: Send + Sync {
    async fn check_active(&self) -> Result<bool>;

    async fn available_disk_gb(&self) -> Result<f64>;

    async fn create_swap_file(&self, size_gb: u32, on_log: LogCallback) -> Result<()>;
}

#[async_trait]
pub trait RegistryAuthChecker: Send + Sync {
    async fn validate(&self, host: &str, username: &str, password: &str) -> bool;
}
