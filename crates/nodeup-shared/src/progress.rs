//! Progress records for long-running subsystems.
//!
//! Background tasks emit [`ProgressUpdate`] messages; the event loop folds them
//! into one [`ProgressSnapshot`] per subsystem.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Milestones (percent) that produce a log line when first crossed.
const MILESTONES: [u8; 5] = [0, 25, 50, 75, 100];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subsystem {
    Packages,
    Runtime,
    Networking,
    Deployment,
}

impl Subsystem {
    pub const ALL: [Subsystem; 4] = [
        Subsystem::Packages,
        Subsystem::Runtime,
        Subsystem::Networking,
        Subsystem::Deployment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subsystem::Packages => "packages",
            Subsystem::Runtime => "runtime",
            Subsystem::Networking => "networking",
            Subsystem::Deployment => "deployment",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Pending,
    Installing,
    Completed,
    Failed,
}

impl ProgressStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressStatus::Completed | ProgressStatus::Failed)
    }
}

/// What a collaborator reports through its progress callback.
#[derive(Debug, Clone, PartialEq)]
pub struct StepProgress {
    pub fraction: f64,
    pub step: String,
    pub done: bool,
}

impl StepProgress {
    pub fn new(fraction: f64, step: impl Into<String>) -> Self {
        Self {
            fraction,
            step: step.into(),
            done: false,
        }
    }

    pub fn done(step: impl Into<String>) -> Self {
        Self {
            fraction: 1.0,
            step: step.into(),
            done: true,
        }
    }
}

/// Progress callback handed to collaborators.
pub type ProgressCallback = Arc<dyn Fn(StepProgress) + Send + Sync>;

/// Log callback handed to collaborators that only narrate.
pub type LogCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Message sent through a relay queue.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub subsystem: Subsystem,
    pub status: ProgressStatus,
    pub fraction: f64,
    pub step: String,
    pub error: Option<String>,
}

impl ProgressUpdate {
    pub fn installing(subsystem: Subsystem, fraction: f64, step: impl Into<String>) -> Self {
        Self {
            subsystem,
            status: ProgressStatus::Installing,
            fraction,
            step: step.into(),
            error: None,
        }
    }

    pub fn completed(subsystem: Subsystem, step: impl Into<String>) -> Self {
        Self {
            subsystem,
            status: ProgressStatus::Completed,
            fraction: 1.0,
            step: step.into(),
            error: None,
        }
    }

    pub fn failed(subsystem: Subsystem, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            subsystem,
            status: ProgressStatus::Failed,
            fraction: 0.0,
            step: "failed".to_string(),
            error: Some(error),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Latest known state of one subsystem within a single attempt.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub subsystem: Subsystem,
    pub status: ProgressStatus,
    pub fraction: f64,
    pub step: String,
    pub history: Vec<String>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    last_milestone: Option<u8>,
}

impl ProgressSnapshot {
    pub fn new(subsystem: Subsystem) -> Self {
        Self {
            subsystem,
            status: ProgressStatus::Pending,
            fraction: 0.0,
            step: String::new(),
            history: Vec::new(),
            error: None,
            started_at: None,
            ended_at: None,
            last_milestone: None,
        }
    }

    /// Record a step description, coalescing consecutive duplicates.
    pub fn push_step(&mut self, step: &str) {
        if step.is_empty() {
            return;
        }
        if self.history.last().map(String::as_str) != Some(step) {
            self.history.push(step.to_string());
        }
    }

    /// Fold an update into the snapshot and return the log lines it warrants.
    ///
    /// Updates arriving after the snapshot reached a terminal status are ignored.
    pub fn apply(&mut self, update: &ProgressUpdate) -> Vec<String> {
        let mut lines = Vec::new();
        if self.ended_at.is_some() {
            return lines;
        }

        let now = Utc::now();
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }

        let fraction = if update.status == ProgressStatus::Completed {
            1.0
        } else {
            update.fraction.clamp(0.0, 1.0)
        };
        if fraction > self.fraction {
            self.fraction = fraction;
        }
        if !update.step.is_empty() {
            self.step = update.step.clone();
        }
        self.push_step(&update.step);

        let previous = self.status;
        self.status = update.status;

        if !update.status.is_terminal() {
            let percent = (self.fraction * 100.0).floor() as u8;
            let reached = MILESTONES.iter().rev().find(|m| percent >= **m).copied();
            if let Some(milestone) = reached {
                if self.last_milestone.map_or(true, |last| milestone > last) {
                    self.last_milestone = Some(milestone);
                    lines.push(format!("[{}] {}% {}", self.subsystem, milestone, self.step));
                }
            }
        }

        if update.status.is_terminal() && previous != update.status {
            self.ended_at = Some(now);
            match update.status {
                ProgressStatus::Completed => {
                    if self.last_milestone != Some(100) {
                        self.last_milestone = Some(100);
                        lines.push(format!("[{}] 100% {}", self.subsystem, self.step));
                    }
                    lines.push(format!("[{}] completed", self.subsystem));
                }
                _ => {
                    self.error = update.error.clone();
                    lines.push(format!(
                        "[{}] failed: {}",
                        self.subsystem,
                        update.error.as_deref().unwrap_or("unknown error")
                    ));
                }
            }
        }

        lines
    }

    pub fn elapsed_secs(&self) -> Option<i64> {
        let start = self.started_at?;
        let end = self.ended_at.unwrap_or_else(Utc::now);
        Some((end - start).num_seconds())
    }
}
