use serde::Serialize;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

/// One progress notification pushed by the orchestrator after each stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    /// Completion percentage (0 to 100)
    pub percent: u8,
    /// Human-readable status line
    pub status: String,
    /// Zero-based index of the stage that produced this update, if any
    pub stage_index: Option<usize>,
}

/// Receiver side of pipeline progress. Frontends implement this to surface status.
pub trait ProgressSink {
    fn report(&self, update: ProgressUpdate);
}

/// A no-op progress sink.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _update: ProgressUpdate) {}
}

impl ProgressSink for Sender<ProgressUpdate> {
    fn report(&self, update: ProgressUpdate) {
        // A dropped receiver just means nobody is watching any more
        let _ = self.send(update);
    }
}

/// Display state of a single step in a progress indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepState {
    Pending,
    Active,
    Completed,
}

/// Latest progress state, readable at any time by a poller
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProgressSnapshot {
    pub percent: u8,
    pub status_lines: Vec<String>,
}

impl ProgressSnapshot {
    /// Map the current percentage onto `total` step indicators
    pub fn step_states(&self, total: usize) -> Vec<StepState> {
        if total == 0 {
            return Vec::new();
        }
        if self.percent >= 100 {
            return vec![StepState::Completed; total];
        }

        let completed = (self.percent as usize * total) / 100;
        (0..total)
            .map(|i| {
                if i < completed {
                    StepState::Completed
                } else if i == completed {
                    StepState::Active
                } else {
                    StepState::Pending
                }
            })
            .collect()
    }

    pub fn is_finished(&self) -> bool {
        self.percent >= 100
    }
}

/// Shared, pollable progress record
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    inner: Arc<Mutex<ProgressSnapshot>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn reset(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = ProgressSnapshot::default();
        }
    }
}

impl ProgressSink for ProgressTracker {
    fn report(&self, update: ProgressUpdate) {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.percent = update.percent.min(100);
        guard.status_lines.push(update.status);
    }
}
