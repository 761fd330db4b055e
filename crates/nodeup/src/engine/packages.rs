//! Package installation and address detection.

use crate::command::Command;
use crate::event::Event;
use crate::keys;
use crate::model::Model;
use crate::phase::Phase;
use nodeup_shared::{InstallerError, Subsystem};

pub(crate) fn start_packages(model: &mut Model) -> Vec<Command> {
    let Some(os) = model.os.clone() else {
        model.fail(InstallerError::Environment(
            "operating system was not detected".to_string(),
        ));
        return Vec::new();
    };
    let packages = model.settings.packages_for(&os);
    model.begin_progress(Subsystem::Packages);
    model.transition(Phase::InstallingPackages);
    vec![Command::InstallPackages { os, packages }]
}

pub(crate) fn installing_packages(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::PackagesInstalled => {
            model.settle_progress(Subsystem::Packages);
            model.transition(Phase::InstallComplete);
            vec![Command::AdvanceAfter {
                phase: Phase::InstallComplete,
                delay: model.settings.auto_advance,
            }]
        }
        _ => Vec::new(),
    }
}

pub(crate) fn install_complete(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::Key(key) if keys::is_enter(&key) => detect_addresses(model),
        Event::Advance(_) => detect_addresses(model),
        _ => Vec::new(),
    }
}

fn detect_addresses(model: &mut Model) -> Vec<Command> {
    model.transition(Phase::DetectingIps);
    vec![Command::DetectAddresses]
}

pub(crate) fn detecting_ips(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::AddressesDetected(addresses) => {
            model.push_log(format!(
                "internal {} / external {} / network {}",
                addresses.internal_ip, addresses.external_ip, addresses.cidr
            ));
            model.dns.internal_ip = addresses.internal_ip;
            model.dns.external_ip = addresses.external_ip;
            model.dns.cidr = addresses.cidr;
            model.transition(Phase::DnsConfig);
            Vec::new()
        }
        _ => Vec::new(),
    }
}
