//! Commands issued by phase handlers.
//!
//! A command is inert data. [`crate::tasks::TaskRunner`] turns each one into a
//! background task that reports back with exactly one terminal event.

use crate::event::ValidationKind;
use crate::phase::Phase;
use nodeup_shared::collaborators::{DeployOptions, ExternalRegistry};
use nodeup_shared::os::OsInfo;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CheckRuntime,
    UninstallRuntime,
    DetectOs,
    CheckSwap,
    CreateSwap { size_gb: u32 },
    InstallPackages { os: OsInfo, packages: Vec<String> },
    DetectAddresses,
    ValidatePlatformDomain {
        attempt: u32,
        domain: String,
        external_ip: String,
    },
    ValidateRegistryDomain {
        attempt: u32,
        domain: String,
        external_ip: String,
    },
    /// Races a validation; fires `ValidationTimedOut` when it wins.
    ValidationTimer {
        kind: ValidationKind,
        attempt: u32,
        after: Duration,
    },
    ValidateExternalRegistry(ExternalRegistry),
    InstallRuntime { internal_ip: String, cidr: String },
    SyncDeployment(DeployOptions),
    AdvanceAfter { phase: Phase, delay: Duration },
    Quit,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::CheckRuntime => "check-runtime",
            Command::UninstallRuntime => "uninstall-runtime",
            Command::DetectOs => "detect-os",
            Command::CheckSwap => "check-swap",
            Command::CreateSwap { .. } => "create-swap",
            Command::InstallPackages { .. } => "install-packages",
            Command::DetectAddresses => "detect-addresses",
            Command::ValidatePlatformDomain { .. } => "validate-domain",
            Command::ValidateRegistryDomain { .. } => "validate-registry-domain",
            Command::ValidationTimer { .. } => "validation-timer",
            Command::ValidateExternalRegistry(_) => "validate-external-registry",
            Command::InstallRuntime { .. } => "install-runtime",
            Command::SyncDeployment(_) => "sync-deployment",
            Command::AdvanceAfter { .. } => "advance-after",
            Command::Quit => "quit",
        }
    }
}
