//! Events consumed by the transition engine.
//!
//! Everything the loop reacts to arrives as an [`Event`]: key presses, timer
//! expiries, drained progress and the single terminal result of each task.

use crate::phase::Phase;
use crossterm::event::KeyEvent;
use nodeup_shared::collaborators::NetworkAddresses;
use nodeup_shared::dns::DnsVerdict;
use nodeup_shared::os::OsInfo;
use nodeup_shared::{InstallerError, ProgressUpdate, Subsystem};
use std::path::PathBuf;

/// Which validation a result or timeout belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    Platform,
    Registry,
}

#[derive(Debug)]
pub enum Event {
    Key(KeyEvent),
    Resize { width: u16, height: u16 },
    Tick,
    Log(String),

    /// Auto-advance timer fired for the given phase.
    Advance(Phase),

    RuntimeChecked { installed: bool },
    RuntimeUninstalled,
    OsDetected(OsInfo),
    SwapChecked {
        active: bool,
        /// `None` when free space could not be read.
        available_disk_gb: Option<f64>,
    },
    SwapCreated,
    PackagesInstalled,
    AddressesDetected(NetworkAddresses),
    Validated {
        kind: ValidationKind,
        attempt: u32,
        verdict: DnsVerdict,
    },
    ValidationTimedOut { kind: ValidationKind, attempt: u32 },
    ExternalRegistryValidated { valid: bool },
    RuntimeInstalled { kubeconfig: PathBuf },
    DeploymentSynced,

    Progress(ProgressUpdate),
    /// A relay delivered its terminal update; its queue is no longer polled.
    RelayCompleted(Subsystem),

    /// Unrecoverable failure from a background task.
    Failed(InstallerError),
}
