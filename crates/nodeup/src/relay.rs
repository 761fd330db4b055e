//! Progress relay - bounded per-subsystem queues between tasks and the loop.
//!
//! Tasks push with `try_send` and never block. The loop polls once per tick,
//! taking at most one update per queue the current phase cares about.

use crate::event::Event;
use crate::phase::Phase;
use nodeup_shared::progress::ProgressCallback;
use nodeup_shared::{ProgressUpdate, StepProgress, Subsystem};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Which relay queues are drained while a phase is current.
const RELAY_TABLE: &[(Phase, &[Subsystem])] = &[
    (Phase::InstallingPackages, &[Subsystem::Packages]),
    (
        Phase::InstallingRuntime,
        &[Subsystem::Runtime, Subsystem::Networking],
    ),
    (Phase::InstallingDeployment, &[Subsystem::Deployment]),
];

pub fn subsystems_for(phase: Phase) -> &'static [Subsystem] {
    RELAY_TABLE
        .iter()
        .find(|(p, _)| *p == phase)
        .map(|(_, subsystems)| *subsystems)
        .unwrap_or(&[])
}

// ============================================================================
// Log queue
// ============================================================================

/// Producer side of the log queue. Cloned into every task.
#[derive(Clone)]
pub struct LogSender {
    tx: mpsc::Sender<String>,
    dropped: Arc<AtomicUsize>,
}

impl LogSender {
    /// Enqueue a line. A full queue drops the line instead of blocking.
    pub fn push(&self, line: impl Into<String>) {
        match self.tx.try_send(line.into()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                if self.dropped.fetch_add(1, Ordering::Relaxed) == 0 {
                    tracing::warn!("log queue full, dropping lines until the next drain");
                }
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    pub fn callback(&self) -> nodeup_shared::progress::LogCallback {
        let sender = self.clone();
        Arc::new(move |line: String| sender.push(line))
    }
}

pub struct LogReceiver {
    rx: mpsc::Receiver<String>,
    dropped: Arc<AtomicUsize>,
}

impl LogReceiver {
    /// Take every queued line in arrival order, plus one warning if lines were lost.
    pub fn drain(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = self.rx.try_recv() {
            lines.push(line);
        }
        let dropped = self.dropped.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            lines.push(format!("warning: {dropped} log lines dropped (queue full)"));
        }
        lines
    }
}

pub fn log_channel(capacity: usize) -> (LogSender, LogReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let dropped = Arc::new(AtomicUsize::new(0));
    (
        LogSender {
            tx,
            dropped: dropped.clone(),
        },
        LogReceiver { rx, dropped },
    )
}

// ============================================================================
// Progress queues
// ============================================================================

#[derive(Clone)]
pub struct RelaySender {
    subsystem: Subsystem,
    tx: mpsc::Sender<ProgressUpdate>,
    log: LogSender,
}

impl RelaySender {
    pub fn send(&self, update: ProgressUpdate) {
        match self.tx.try_send(update) {
            Ok(()) => {}
            Err(TrySendError::Full(update)) => {
                self.log.push(format!(
                    "warning: {} progress queue full, dropped '{}'",
                    self.subsystem, update.step
                ));
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Adapt the relay into a collaborator progress callback.
    ///
    /// Collaborators never end an attempt themselves; the task sends the
    /// terminal update once the collaborator call returns.
    pub fn callback(&self) -> ProgressCallback {
        let sender = self.clone();
        Arc::new(move |progress: StepProgress| {
            let fraction = if progress.done { 1.0 } else { progress.fraction };
            sender.send(ProgressUpdate::installing(
                sender.subsystem,
                fraction,
                progress.step,
            ));
        })
    }
}

/// Producer handles for every subsystem.
#[derive(Clone)]
pub struct RelaySenders {
    packages: RelaySender,
    runtime: RelaySender,
    networking: RelaySender,
    deployment: RelaySender,
}

impl RelaySenders {
    pub fn get(&self, subsystem: Subsystem) -> &RelaySender {
        match subsystem {
            Subsystem::Packages => &self.packages,
            Subsystem::Runtime => &self.runtime,
            Subsystem::Networking => &self.networking,
            Subsystem::Deployment => &self.deployment,
        }
    }
}

struct RelayQueue {
    subsystem: Subsystem,
    rx: mpsc::Receiver<ProgressUpdate>,
    completed: bool,
}

/// Consumer side, owned by the model.
pub struct ProgressRelay {
    queues: Vec<RelayQueue>,
}

impl ProgressRelay {
    fn queue_mut(&mut self, subsystem: Subsystem) -> Option<&mut RelayQueue> {
        self.queues.iter_mut().find(|q| q.subsystem == subsystem)
    }

    /// One non-blocking receive per queue implicated by `phase`.
    pub fn drain(&mut self, phase: Phase) -> Vec<Event> {
        let mut events = Vec::new();
        for subsystem in subsystems_for(phase) {
            let Some(queue) = self.queue_mut(*subsystem) else {
                continue;
            };
            if queue.completed {
                continue;
            }
            if let Ok(update) = queue.rx.try_recv() {
                let terminal = update.is_terminal();
                events.push(Event::Progress(update));
                if terminal {
                    queue.completed = true;
                    events.push(Event::RelayCompleted(*subsystem));
                }
            }
        }
        events
    }

    /// Take everything left in one queue, stopping after a terminal update.
    pub fn flush(&mut self, subsystem: Subsystem) -> Vec<ProgressUpdate> {
        let mut updates = Vec::new();
        let Some(queue) = self.queue_mut(subsystem) else {
            return updates;
        };
        while !queue.completed {
            match queue.rx.try_recv() {
                Ok(update) => {
                    queue.completed = update.is_terminal();
                    updates.push(update);
                }
                Err(_) => break,
            }
        }
        updates
    }

    /// Start a fresh attempt: forget completion and discard stale updates.
    pub fn rearm(&mut self, subsystem: Subsystem) {
        if let Some(queue) = self.queue_mut(subsystem) {
            queue.completed = false;
            while queue.rx.try_recv().is_ok() {}
        }
    }

    pub fn is_completed(&self, subsystem: Subsystem) -> bool {
        self.queues
            .iter()
            .any(|q| q.subsystem == subsystem && q.completed)
    }
}

pub fn relay_channels(capacity: usize, log: LogSender) -> (RelaySenders, ProgressRelay) {
    let mut queues = Vec::with_capacity(Subsystem::ALL.len());
    let mut make = |subsystem: Subsystem| {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        queues.push(RelayQueue {
            subsystem,
            rx,
            completed: false,
        });
        RelaySender {
            subsystem,
            tx,
            log: log.clone(),
        }
    };
    let senders = RelaySenders {
        packages: make(Subsystem::Packages),
        runtime: make(Subsystem::Runtime),
        networking: make(Subsystem::Networking),
        deployment: make(Subsystem::Deployment),
    };
    (senders, ProgressRelay { queues })
}
