//! Shared helpers for the installer integration tests.
#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use nodeup::command::Command;
use nodeup::event::Event;
use nodeup::model::Model;
use nodeup::phase::Phase;
use nodeup::relay::{LogSender, RelaySenders};
use nodeup::tasks::Collaborators;
use nodeup_shared::collaborators::{
    DeployOptions, DeploymentSyncer, NetworkAddresses, NetworkProbe, NetworkingInstaller,
    OsDetector, PackageInstaller, RegistryAuthChecker, RuntimeInstaller, SwapManager,
};
use nodeup_shared::config::InstallerConfig;
use nodeup_shared::dns::DnsVerdict;
use nodeup_shared::os::{OsFamily, OsInfo};
use nodeup_shared::progress::{LogCallback, ProgressCallback, StepProgress};
use nodeup_shared::InstallerError;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const EXTERNAL_IP: &str = "203.0.113.10";

// ============================================================================
// Engine helpers
// ============================================================================

pub struct Harness {
    pub model: Model,
    pub relays: RelaySenders,
    pub log: LogSender,
}

pub fn harness() -> Harness {
    let (model, relays, log) = Model::with_channels(&InstallerConfig::default());
    Harness { model, relays, log }
}

/// A model already sitting in `phase`, as if the pipeline had walked there.
pub fn model_in(phase: Phase) -> Harness {
    let mut h = harness();
    h.model.phase = phase;
    h.model.os = Some(ubuntu());
    h.model.dns.internal_ip = "10.0.0.5".into();
    h.model.dns.external_ip = EXTERNAL_IP.into();
    h.model.dns.cidr = "10.0.0.0/24".into();
    h
}

pub fn key(code: KeyCode) -> Event {
    Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

pub fn ch(c: char) -> Event {
    key(KeyCode::Char(c))
}

pub fn ctrl(c: char) -> Event {
    Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
}

pub fn enter() -> Event {
    key(KeyCode::Enter)
}

pub fn type_text(model: &mut Model, text: &str) {
    for c in text.chars() {
        let commands = model.update(ch(c));
        assert!(commands.is_empty(), "typing '{c}' produced {commands:?}");
    }
}

pub fn names(commands: &[Command]) -> Vec<&'static str> {
    commands.iter().map(Command::name).collect()
}

pub fn ubuntu() -> OsInfo {
    OsInfo {
        id: "ubuntu".into(),
        name: "Ubuntu".into(),
        version: "22.04".into(),
        family: OsFamily::Debian,
        arch: "x86_64".into(),
    }
}

pub fn verdict(success: bool) -> DnsVerdict {
    DnsVerdict {
        success,
        message: if success { "ok".into() } else { "no records".into() },
        ..DnsVerdict::default()
    }
}

/// The validation attempt id carried by the first validate command.
pub fn attempt_of(commands: &[Command]) -> u32 {
    commands
        .iter()
        .find_map(|c| match c {
            Command::ValidatePlatformDomain { attempt, .. }
            | Command::ValidateRegistryDomain { attempt, .. } => Some(*attempt),
            _ => None,
        })
        .expect("no validation command issued")
}

// ============================================================================
// Fake host
// ============================================================================

/// Scriptable stand-in for every collaborator.
#[derive(Default)]
pub struct FakeHost {
    pub runtime_installed: bool,
    pub swap_active: bool,
    pub disk_unreadable: bool,
    pub fail_packages: Option<String>,
    pub runtime_delay: Option<Duration>,
    pub registry_valid: bool,
    pub registry_delay: Option<Duration>,
    pub proxied: HashSet<String>,
    pub resolving: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeHost {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn resolving(mut self, domain: &str) -> Self {
        self.resolving.insert(domain.to_string());
        self
    }

    pub fn proxied(mut self, domain: &str) -> Self {
        self.proxied.insert(domain.to_string());
        self
    }
}

pub fn collaborators(host: Arc<FakeHost>) -> Collaborators {
    Collaborators {
        os: host.clone(),
        packages: host.clone(),
        runtime: host.clone(),
        networking: host.clone(),
        deployment: host.clone(),
        probe: host.clone(),
        swap: host.clone(),
        registry: host,
    }
}

#[async_trait]
impl OsDetector for FakeHost {
    async fn detect(&self) -> Result<OsInfo, InstallerError> {
        self.record("detect");
        Ok(ubuntu())
    }
}

#[async_trait]
impl PackageInstaller for FakeHost {
    async fn install(
        &self,
        _os: &OsInfo,
        packages: &[String],
        on_progress: ProgressCallback,
    ) -> Result<()> {
        self.record(format!("packages:{}", packages.join(",")));
        on_progress(StepProgress::new(0.5, "halfway"));
        if let Some(message) = &self.fail_packages {
            bail!("{message}");
        }
        on_progress(StepProgress::done("packages installed"));
        Ok(())
    }
}

#[async_trait]
impl RuntimeInstaller for FakeHost {
    async fn is_installed(&self) -> Result<bool> {
        Ok(self.runtime_installed)
    }

    async fn uninstall(&self, on_log: LogCallback) -> Result<()> {
        self.record("uninstall");
        on_log("uninstalled".to_string());
        Ok(())
    }

    async fn install(&self, on_progress: ProgressCallback) -> Result<PathBuf> {
        self.record("runtime");
        if let Some(delay) = self.runtime_delay {
            tokio::time::sleep(delay).await;
        }
        on_progress(StepProgress::new(0.3, "k3s"));
        Ok(PathBuf::from("/etc/rancher/k3s/k3s.yaml"))
    }
}

#[async_trait]
impl NetworkingInstaller for FakeHost {
    async fn install(
        &self,
        on_progress: ProgressCallback,
        internal_ip: &str,
        cidr: &str,
    ) -> Result<()> {
        self.record(format!("networking:{internal_ip}:{cidr}"));
        on_progress(StepProgress::new(0.5, "cilium"));
        Ok(())
    }
}

#[async_trait]
impl DeploymentSyncer for FakeHost {
    async fn sync(&self, options: &DeployOptions, on_progress: ProgressCallback) -> Result<()> {
        self.record(format!("sync:{}", options.app_domain));
        on_progress(StepProgress::new(0.5, "helm"));
        Ok(())
    }
}

#[async_trait]
impl NetworkProbe for FakeHost {
    async fn detect_addresses(&self) -> Result<NetworkAddresses> {
        Ok(NetworkAddresses {
            internal_ip: "10.0.0.5".into(),
            external_ip: EXTERNAL_IP.into(),
            cidr: "10.0.0.0/24".into(),
        })
    }

    async fn resolves_to(&self, domain: &str, ip: &str) -> bool {
        ip == EXTERNAL_IP && self.resolving.contains(domain)
    }

    async fn is_behind_proxy(&self, domain: &str) -> bool {
        self.proxied.contains(domain)
    }
}

#[async_trait]
impl SwapManager for FakeHost {
    async fn check_active(&self) -> Result<bool> {
        Ok(self.swap_active)
    }

    async fn available_disk_gb(&self) -> Result<f64> {
        if self.disk_unreadable {
            bail!("no mount point matches /");
        }
        Ok(120.0)
    }

    async fn create_swap_file(&self, size_gb: u32, on_log: LogCallback) -> Result<()> {
        self.record(format!("swap:{size_gb}"));
        on_log(format!("swap {size_gb}G"));
        Ok(())
    }
}

#[async_trait]
impl RegistryAuthChecker for FakeHost {
    async fn validate(&self, host: &str, _username: &str, _password: &str) -> bool {
        self.record(format!("registry:{host}"));
        if let Some(delay) = self.registry_delay {
            tokio::time::sleep(delay).await;
        }
        self.registry_valid
    }
}
