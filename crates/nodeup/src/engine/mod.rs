//! Transition engine - `Model::update(event) -> commands`.
//!
//! Global events are handled here first; everything else goes to the handler
//! registered for the current phase in [`HANDLERS`].

mod deploy;
mod dns;
mod packages;
mod preflight;
mod registry;
mod swap;

pub use registry::PROVIDERS;

use crate::command::Command;
use crate::event::Event;
use crate::keys;
use crate::model::{FailureRecord, Model};
use crate::phase::Phase;
use crate::relay;
use nodeup_shared::InstallerError;
use tracing::{debug, error, info, warn};

/// A phase handler: consume one event, maybe transition, return commands.
pub type Handler = fn(&mut Model, Event) -> Vec<Command>;

pub const HANDLERS: [(Phase, Handler); 26] = [
    (Phase::Welcome, preflight::welcome),
    (Phase::CheckRuntime, preflight::check_runtime),
    (Phase::ConfirmUninstall, preflight::confirm_uninstall),
    (Phase::Uninstalling, preflight::uninstalling),
    (Phase::OsDetect, preflight::os_detect),
    (Phase::CheckingSwap, swap::checking_swap),
    (Phase::ConfirmCreateSwap, swap::confirm_create_swap),
    (Phase::EnterSwapSize, swap::enter_swap_size),
    (Phase::CreatingSwap, swap::creating_swap),
    (Phase::SwapCreated, swap::swap_created),
    (Phase::InstallingPackages, packages::installing_packages),
    (Phase::InstallComplete, packages::install_complete),
    (Phase::DetectingIps, packages::detecting_ips),
    (Phase::DnsConfig, dns::dns_config),
    (Phase::DnsValidation, dns::dns_validation),
    (Phase::DnsSuccess, dns::dns_success),
    (Phase::DnsFailed, dns::dns_failed),
    (Phase::RegistryTypeSelection, registry::registry_type_selection),
    (Phase::RegistryDomainInput, registry::registry_domain_input),
    (Phase::RegistryDnsValidation, registry::registry_dns_validation),
    (Phase::ExternalRegistryInput, registry::external_registry_input),
    (Phase::ExternalRegistryValidation, registry::external_registry_validation),
    (Phase::InstallingRuntime, deploy::installing_runtime),
    (Phase::InstallingDeployment, deploy::installing_deployment),
    (Phase::InstallationComplete, deploy::installation_complete),
    (Phase::Error, deploy::error),
];

fn ignore(_: &mut Model, _: Event) -> Vec<Command> {
    Vec::new()
}

pub fn handler_for(phase: Phase) -> Handler {
    HANDLERS
        .iter()
        .find(|(p, _)| *p == phase)
        .map(|(_, handler)| *handler)
        .unwrap_or(ignore)
}

impl Model {
    pub fn update(&mut self, event: Event) -> Vec<Command> {
        match event {
            Event::Key(key) if keys::is_quit(&key) => {
                self.should_quit = true;
                vec![Command::Quit]
            }
            Event::Key(key) if keys::is_debug_toggle(&key) => {
                self.toggle_debug_overlay();
                Vec::new()
            }
            Event::Key(key) if self.previous_phase.is_some() => {
                if keys::is_esc(&key) {
                    self.toggle_debug_overlay();
                }
                Vec::new()
            }
            Event::Resize { width, height } => {
                self.size = (width, height);
                Vec::new()
            }
            Event::Tick => self.on_tick(),
            Event::Log(line) => {
                self.push_log(line);
                Vec::new()
            }
            Event::Advance(phase) if phase != self.phase => {
                debug!(%phase, current = %self.phase, "dropping stale auto-advance");
                Vec::new()
            }
            Event::Progress(update) => {
                self.apply_progress(&update);
                Vec::new()
            }
            Event::RelayCompleted(subsystem) => {
                debug!(%subsystem, "relay completed");
                Vec::new()
            }
            Event::Failed(err) => {
                self.fail(err);
                Vec::new()
            }
            event => handler_for(self.phase)(self, event),
        }
    }

    fn on_tick(&mut self) -> Vec<Command> {
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
        for line in self.log_rx.drain() {
            self.push_log(line);
        }
        let mut commands = Vec::new();
        for event in self.relay.drain(self.phase) {
            commands.extend(self.update(event));
        }
        commands
    }

    /// Move to `to`, recording the change.
    pub fn transition(&mut self, to: Phase) {
        let from = self.phase;
        if from == to {
            return;
        }
        info!(%from, %to, "phase transition");
        self.push_log(format!("phase {from} -> {to}"));
        self.phase = to;
    }

    /// Enter the terminal Error phase. The first error wins.
    pub fn fail(&mut self, err: InstallerError) {
        if self.phase == Phase::Error {
            warn!("ignoring error while already failed: {}", err);
            return;
        }
        for subsystem in relay::subsystems_for(self.phase) {
            for update in self.relay.flush(*subsystem) {
                self.apply_progress(&update);
            }
        }
        error!(phase = %self.phase, category = err.category(), "{}", err);
        self.push_log(format!("error in {}: {}", self.phase, err));
        self.error = Some(FailureRecord {
            phase: self.phase,
            error: err,
        });
        self.transition(Phase::Error);
    }

    fn toggle_debug_overlay(&mut self) {
        self.previous_phase = match self.previous_phase {
            Some(_) => None,
            None => Some(self.phase),
        };
    }

    pub fn debug_overlay_open(&self) -> bool {
        self.previous_phase.is_some()
    }
}
