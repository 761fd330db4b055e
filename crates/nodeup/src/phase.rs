//! Installer phases - one per screen.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Welcome,
    CheckRuntime,
    ConfirmUninstall,
    Uninstalling,
    OsDetect,
    CheckingSwap,
    ConfirmCreateSwap,
    EnterSwapSize,
    CreatingSwap,
    SwapCreated,
    InstallingPackages,
    InstallComplete,
    DetectingIps,
    DnsConfig,
    DnsValidation,
    DnsSuccess,
    DnsFailed,
    RegistryTypeSelection,
    RegistryDomainInput,
    RegistryDnsValidation,
    ExternalRegistryInput,
    ExternalRegistryValidation,
    InstallingRuntime,
    InstallingDeployment,
    InstallationComplete,
    Error,
}

impl Phase {
    pub const ALL: [Phase; 26] = [
        Phase::Welcome,
        Phase::CheckRuntime,
        Phase::ConfirmUninstall,
        Phase::Uninstalling,
        Phase::OsDetect,
        Phase::CheckingSwap,
        Phase::ConfirmCreateSwap,
        Phase::EnterSwapSize,
        Phase::CreatingSwap,
        Phase::SwapCreated,
        Phase::InstallingPackages,
        Phase::InstallComplete,
        Phase::DetectingIps,
        Phase::DnsConfig,
        Phase::DnsValidation,
        Phase::DnsSuccess,
        Phase::DnsFailed,
        Phase::RegistryTypeSelection,
        Phase::RegistryDomainInput,
        Phase::RegistryDnsValidation,
        Phase::ExternalRegistryInput,
        Phase::ExternalRegistryValidation,
        Phase::InstallingRuntime,
        Phase::InstallingDeployment,
        Phase::InstallationComplete,
        Phase::Error,
    ];

    /// Screen title
    pub fn title(&self) -> &'static str {
        match self {
            Phase::Welcome => "Welcome",
            Phase::CheckRuntime => "Checking for an existing cluster",
            Phase::ConfirmUninstall => "Existing cluster found",
            Phase::Uninstalling => "Removing existing cluster",
            Phase::OsDetect => "Detecting operating system",
            Phase::CheckingSwap => "Checking swap",
            Phase::ConfirmCreateSwap => "No swap configured",
            Phase::EnterSwapSize => "Swap size",
            Phase::CreatingSwap => "Creating swap file",
            Phase::SwapCreated => "Swap ready",
            Phase::InstallingPackages => "Installing packages",
            Phase::InstallComplete => "Packages installed",
            Phase::DetectingIps => "Detecting network addresses",
            Phase::DnsConfig => "Domain",
            Phase::DnsValidation => "Validating DNS",
            Phase::DnsSuccess => "DNS and registry ready",
            Phase::DnsFailed => "DNS validation failed",
            Phase::RegistryTypeSelection => "Container registry",
            Phase::RegistryDomainInput => "Registry domain",
            Phase::RegistryDnsValidation => "Validating registry domain",
            Phase::ExternalRegistryInput => "External registry",
            Phase::ExternalRegistryValidation => "Checking registry credentials",
            Phase::InstallingRuntime => "Installing cluster runtime",
            Phase::InstallingDeployment => "Deploying platform",
            Phase::InstallationComplete => "Installation complete",
            Phase::Error => "Installation failed",
        }
    }

    /// Phases that accept free-text input (plain letters are not shortcuts there).
    pub fn takes_text(&self) -> bool {
        matches!(
            self,
            Phase::EnterSwapSize
                | Phase::DnsConfig
                | Phase::RegistryDomainInput
                | Phase::ExternalRegistryInput
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
