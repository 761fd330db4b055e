//! Installer model - the single source of truth, owned by the event loop.

use crate::phase::Phase;
use crate::relay::{self, LogReceiver, LogSender, ProgressRelay, RelaySenders};
use nodeup_shared::collaborators::{DeployOptions, ExternalRegistry, RegistryTarget};
use nodeup_shared::config::{InstallerConfig, PackageSettings, SwapSettings};
use nodeup_shared::dns::{self, DnsVerdict};
use nodeup_shared::os::{OsFamily, OsInfo};
use nodeup_shared::{InstallerError, ProgressSnapshot, ProgressUpdate, Subsystem};
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Single-line text input with its validation message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    pub value: String,
    pub error: Option<String>,
}

impl TextInput {
    pub fn push(&mut self, c: char) {
        self.value.push(c);
        self.error = None;
    }

    pub fn backspace(&mut self) {
        self.value.pop();
        self.error = None;
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.error = None;
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.error = None;
    }

    pub fn reject(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryType {
    SelfHosted,
    External,
}

impl RegistryType {
    pub fn toggle(self) -> Self {
        match self {
            RegistryType::SelfHosted => RegistryType::External,
            RegistryType::External => RegistryType::SelfHosted,
        }
    }
}

/// Input focus on the external registry screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalField {
    Host,
    Username,
    Password,
}

impl ExternalField {
    pub fn next(self) -> Self {
        match self {
            ExternalField::Host => ExternalField::Username,
            ExternalField::Username => ExternalField::Password,
            ExternalField::Password => ExternalField::Host,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            ExternalField::Host => ExternalField::Password,
            ExternalField::Username => ExternalField::Host,
            ExternalField::Password => ExternalField::Username,
        }
    }
}

/// DNS and registry configuration gathered across the DNS/registry screens.
#[derive(Debug, Clone, Default)]
pub struct DnsConfig {
    pub domain: String,
    pub app_domain: String,
    pub registry_domain: String,
    pub wildcard: bool,
    pub internal_ip: String,
    pub external_ip: String,
    pub cidr: String,
    pub registry_type: Option<RegistryType>,
    pub external: Option<ExternalRegistry>,
    /// A validation is in flight.
    pub validation_started: bool,
    pub validation_success: bool,
    pub cloudflare: bool,
    pub registry_issue: bool,
    pub validation_started_at: Option<Instant>,
    pub validation_duration: Option<Duration>,
    pub attempt: u32,
    /// Human-readable outcome of the last validation.
    pub last_message: String,
}

impl DnsConfig {
    /// Store the platform domain and derive its app/registry subdomains.
    pub fn set_domain(&mut self, domain: &str) {
        let base = dns::base_domain(domain).to_string();
        self.app_domain = dns::app_domain(&base);
        self.registry_domain = dns::registry_domain(&base);
        self.domain = domain.trim().to_string();
    }

    pub fn base_domain(&self) -> &str {
        dns::base_domain(&self.domain)
    }

    /// Open a new attempt and return its id.
    pub fn begin_validation(&mut self) -> u32 {
        self.attempt += 1;
        self.validation_started = true;
        self.validation_success = false;
        self.validation_started_at = Some(Instant::now());
        self.validation_duration = None;
        self.last_message.clear();
        self.attempt
    }

    /// Close the current attempt. Returns false for stale or repeated results.
    pub fn finish_validation(&mut self, attempt: u32, success: bool) -> bool {
        if !self.validation_started || attempt != self.attempt {
            return false;
        }
        self.validation_started = false;
        self.validation_success = success;
        self.validation_duration = self.validation_started_at.map(|t| t.elapsed());
        true
    }

    pub fn apply_platform_verdict(&mut self, verdict: &DnsVerdict) {
        self.wildcard = verdict.wildcard;
        self.cloudflare = verdict.cloudflare;
        self.registry_issue = verdict.registry_issue;
        self.last_message = verdict.message.clone();
    }

    pub fn deploy_options(&self) -> DeployOptions {
        let registry = match (self.registry_type, &self.external) {
            (Some(RegistryType::External), Some(external)) => {
                RegistryTarget::External(external.clone())
            }
            _ => RegistryTarget::SelfHosted {
                domain: self.registry_domain.clone(),
            },
        };
        DeployOptions {
            base_domain: self.base_domain().to_string(),
            app_domain: self.app_domain.clone(),
            registry_domain: self.registry_domain.clone(),
            wildcard: self.wildcard,
            registry,
        }
    }
}

/// The error shown on the Error screen, with the phase it happened in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub phase: Phase,
    pub error: InstallerError,
}

/// Settings the handlers consult.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub auto_advance: Duration,
    pub dns_timeout: Duration,
    pub log_capacity: usize,
    pub swap: SwapSettings,
    pub packages: PackageSettings,
}

impl EngineSettings {
    pub fn from_config(config: &InstallerConfig) -> Self {
        Self {
            auto_advance: config.ui.auto_advance(),
            dns_timeout: config.timeouts.dns_validation(),
            log_capacity: config.ui.log_buffer_lines.max(1),
            swap: config.swap.clone(),
            packages: config.packages.clone(),
        }
    }

    pub fn packages_for(&self, os: &OsInfo) -> Vec<String> {
        match os.family {
            OsFamily::Rhel => self.packages.rhel.clone(),
            _ => self.packages.debian.clone(),
        }
    }
}

pub struct Model {
    pub phase: Phase,
    /// Set while the debug overlay is open: the phase it was opened from.
    pub previous_phase: Option<Phase>,
    pub os: Option<OsInfo>,
    pub error: Option<FailureRecord>,
    pub progress: BTreeMap<Subsystem, ProgressSnapshot>,
    pub dns: DnsConfig,

    pub domain_input: TextInput,
    pub registry_domain_input: TextInput,
    pub host_input: TextInput,
    pub username_input: TextInput,
    pub password_input: TextInput,
    pub swap_input: TextInput,
    pub external_focus: ExternalField,
    pub registry_cursor: RegistryType,

    pub swap_available_gb: Option<f64>,
    pub kubeconfig: Option<PathBuf>,

    pub logs: VecDeque<String>,
    pub spinner_frame: usize,
    pub size: (u16, u16),
    pub should_quit: bool,

    pub relay: ProgressRelay,
    pub log_rx: LogReceiver,
    pub settings: EngineSettings,
}

impl Model {
    pub fn new(settings: EngineSettings, relay: ProgressRelay, log_rx: LogReceiver) -> Self {
        Self {
            phase: Phase::Welcome,
            previous_phase: None,
            os: None,
            error: None,
            progress: BTreeMap::new(),
            dns: DnsConfig::default(),
            domain_input: TextInput::default(),
            registry_domain_input: TextInput::default(),
            host_input: TextInput::default(),
            username_input: TextInput::default(),
            password_input: TextInput::default(),
            swap_input: TextInput::default(),
            external_focus: ExternalField::Host,
            registry_cursor: RegistryType::SelfHosted,
            swap_available_gb: None,
            kubeconfig: None,
            logs: VecDeque::new(),
            spinner_frame: 0,
            size: (80, 24),
            should_quit: false,
            relay,
            log_rx,
            settings,
        }
    }

    /// Build a model together with the producer handles its queues pair with.
    pub fn with_channels(config: &InstallerConfig) -> (Self, RelaySenders, LogSender) {
        let (log_tx, log_rx) = relay::log_channel(config.queues.log_capacity);
        let (senders, progress) =
            relay::relay_channels(config.queues.progress_capacity, log_tx.clone());
        let model = Self::new(EngineSettings::from_config(config), progress, log_rx);
        (model, senders, log_tx)
    }

    pub fn push_log(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!(target: "nodeup::session", "{}", line);
        if self.logs.len() >= self.settings.log_capacity {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    pub fn snapshot(&self, subsystem: Subsystem) -> Option<&ProgressSnapshot> {
        self.progress.get(&subsystem)
    }

    /// Fold a progress update into its snapshot, logging milestones.
    pub fn apply_progress(&mut self, update: &ProgressUpdate) {
        let lines = self
            .progress
            .entry(update.subsystem)
            .or_insert_with(|| ProgressSnapshot::new(update.subsystem))
            .apply(update);
        for line in lines {
            self.push_log(line);
        }
    }

    /// Fresh snapshot and relay for a new attempt of `subsystem`.
    pub fn begin_progress(&mut self, subsystem: Subsystem) {
        self.relay.rearm(subsystem);
        self.progress.insert(subsystem, ProgressSnapshot::new(subsystem));
    }

    /// Fold whatever the relay still holds for `subsystem` and close the snapshot.
    pub fn settle_progress(&mut self, subsystem: Subsystem) {
        for update in self.relay.flush(subsystem) {
            self.apply_progress(&update);
        }
        let open = self
            .snapshot(subsystem)
            .map_or(true, |snap| !snap.status.is_terminal());
        if open {
            self.apply_progress(&ProgressUpdate::completed(subsystem, "done"));
        }
    }

    /// Log lines the debug overlay shows, newest last.
    pub fn recent_logs(&self, count: usize) -> impl Iterator<Item = &String> {
        let skip = self.logs.len().saturating_sub(count);
        self.logs.iter().skip(skip)
    }
}
