//! Shared types for the nodeup installer.
//!
//! Everything here is free of terminal and process concerns: the error taxonomy,
//! progress records, the DNS decision logic and the collaborator traits the
//! orchestrator drives.

pub mod collaborators;
pub mod config;
pub mod dns;
pub mod error;
pub mod os;
pub mod progress;

pub use error::InstallerError;
pub use progress::{ProgressSnapshot, ProgressStatus, ProgressUpdate, StepProgress, Subsystem};
