//! Installer configuration.
//!
//! Configuration lives in /etc/nodeup/config.toml. Every field has a default, so
//! a missing file or a partial file both work.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/nodeup/config.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InstallerConfig {
    #[serde(default)]
    pub timeouts: TimeoutSettings,

    #[serde(default)]
    pub ui: UiSettings,

    #[serde(default)]
    pub queues: QueueSettings,

    #[serde(default)]
    pub packages: PackageSettings,

    #[serde(default)]
    pub swap: SwapSettings,

    #[serde(default)]
    pub network: NetworkSettings,

    #[serde(default)]
    pub deployment: DeploymentSettings,
}

/// Deadlines for background operations (seconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutSettings {
    /// Cluster bootstrap, networking layer and deployment sync
    #[serde(default = "default_heavy_install_secs")]
    pub heavy_install_secs: u64,

    /// Registry credential checks
    #[serde(default = "default_registry_http_secs")]
    pub registry_http_secs: u64,

    /// DNS validation race timer
    #[serde(default = "default_dns_validation_secs")]
    pub dns_validation_secs: u64,

    /// Single proxy-detection HTTP request
    #[serde(default = "default_probe_http_secs")]
    pub probe_http_secs: u64,
}

fn default_heavy_install_secs() -> u64 {
    30 * 60
}

fn default_registry_http_secs() -> u64 {
    10
}

fn default_dns_validation_secs() -> u64 {
    30
}

fn default_probe_http_secs() -> u64 {
    5
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            heavy_install_secs: default_heavy_install_secs(),
            registry_http_secs: default_registry_http_secs(),
            dns_validation_secs: default_dns_validation_secs(),
            probe_http_secs: default_probe_http_secs(),
        }
    }
}

impl TimeoutSettings {
    pub fn heavy_install(&self) -> Duration {
        Duration::from_secs(self.heavy_install_secs)
    }

    pub fn registry_http(&self) -> Duration {
        Duration::from_secs(self.registry_http_secs)
    }

    pub fn dns_validation(&self) -> Duration {
        Duration::from_secs(self.dns_validation_secs)
    }

    pub fn probe_http(&self) -> Duration {
        Duration::from_secs(self.probe_http_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiSettings {
    /// Delay before a finished screen advances on its own (1-3 seconds)
    #[serde(default = "default_auto_advance_secs")]
    pub auto_advance_secs: u64,

    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Lines kept in the on-screen log buffer
    #[serde(default = "default_log_buffer_lines")]
    pub log_buffer_lines: usize,
}

fn default_auto_advance_secs() -> u64 {
    2
}

fn default_tick_ms() -> u64 {
    100
}

fn default_log_buffer_lines() -> usize {
    500
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            auto_advance_secs: default_auto_advance_secs(),
            tick_ms: default_tick_ms(),
            log_buffer_lines: default_log_buffer_lines(),
        }
    }
}

impl UiSettings {
    pub fn auto_advance(&self) -> Duration {
        Duration::from_secs(self.auto_advance_secs.clamp(1, 3))
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(10))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    #[serde(default = "default_progress_capacity")]
    pub progress_capacity: usize,

    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

fn default_progress_capacity() -> usize {
    64
}

fn default_log_capacity() -> usize {
    256
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            progress_capacity: default_progress_capacity(),
            log_capacity: default_log_capacity(),
        }
    }
}

/// Packages per distribution family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSettings {
    #[serde(default = "default_debian_packages")]
    pub debian: Vec<String>,

    #[serde(default = "default_rhel_packages")]
    pub rhel: Vec<String>,
}

fn default_debian_packages() -> Vec<String> {
    ["curl", "ca-certificates", "iptables", "open-iscsi", "nfs-common", "jq"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn default_rhel_packages() -> Vec<String> {
    ["curl", "ca-certificates", "iptables", "iscsi-initiator-utils", "nfs-utils", "jq"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

impl Default for PackageSettings {
    fn default() -> Self {
        Self {
            debian: default_debian_packages(),
            rhel: default_rhel_packages(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapSettings {
    #[serde(default = "default_swap_path")]
    pub path: String,

    #[serde(default = "default_swap_gb")]
    pub default_gb: u32,

    #[serde(default = "default_max_swap_gb")]
    pub max_gb: u32,

    /// Disk space that must stay free after the swap file is created
    #[serde(default = "default_min_free_gb")]
    pub min_free_gb: f64,
}

fn default_swap_path() -> String {
    "/swapfile".to_string()
}

fn default_swap_gb() -> u32 {
    4
}

fn default_max_swap_gb() -> u32 {
    64
}

fn default_min_free_gb() -> f64 {
    10.0
}

impl Default for SwapSettings {
    fn default() -> Self {
        Self {
            path: default_swap_path(),
            default_gb: default_swap_gb(),
            max_gb: default_max_swap_gb(),
            min_free_gb: default_min_free_gb(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Plain-text endpoint that echoes the caller's public address
    #[serde(default = "default_external_ip_url")]
    pub external_ip_url: String,
}

fn default_external_ip_url() -> String {
    "https://api.ipify.org".to_string()
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            external_ip_url: default_external_ip_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentSettings {
    #[serde(default = "default_chart")]
    pub chart: String,

    #[serde(default = "default_release")]
    pub release: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_values_path")]
    pub values_path: String,

    #[serde(default = "default_cilium_version")]
    pub cilium_version: String,
}

fn default_chart() -> String {
    "oci://ghcr.io/nodeup/charts/platform".to_string()
}

fn default_release() -> String {
    "platform".to_string()
}

fn default_namespace() -> String {
    "platform".to_string()
}

fn default_values_path() -> String {
    "/etc/nodeup/values.yaml".to_string()
}

fn default_cilium_version() -> String {
    "1.15.6".to_string()
}

impl Default for DeploymentSettings {
    fn default() -> Self {
        Self {
            chart: default_chart(),
            release: default_release(),
            namespace: default_namespace(),
            values_path: default_values_path(),
            cilium_version: default_cilium_version(),
        }
    }
}

impl InstallerConfig {
    /// Load from `path`, falling back to defaults when the file is missing or invalid.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring config file: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }
}
