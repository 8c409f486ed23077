//! Debounced commit scheduling with an injected clock.
//!
//! The host calls `schedule_commit` after every structural mutation and
//! `poll` from its own timer or frame callback. A commit becomes due once
//! the quiescence window has passed since the most recent schedule.

#[derive(Debug, Clone)]
pub struct CommitScheduler {
    delay_ms: f64,
    due_at_ms: Option<f64>,
}

impl CommitScheduler {
    pub fn new(delay_ms: f64) -> Self {
        Self {
            delay_ms,
            due_at_ms: None,
        }
    }

    /// (Re)start the quiescence window at `now_ms`.
    pub fn schedule_commit(&mut self, now_ms: f64) {
        self.due_at_ms = Some(now_ms + self.delay_ms);
    }

    /// True exactly once per window, when it has elapsed.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.due_at_ms {
            Some(due) if now_ms >= due => {
                self.due_at_ms = None;
                true
            }
            _ => false,
        }
    }

    /// Fire immediately if anything is pending (e.g. on page hide).
    pub fn flush(&mut self) -> bool {
        self.due_at_ms.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.due_at_ms.is_some()
    }

    /// When the pending commit falls due.
    pub fn due_at(&self) -> Option<f64> {
        self.due_at_ms
    }
}
