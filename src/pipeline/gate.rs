//! Global cooldown gate for recognized intents.
//!
//! One timer for all labels: after an admission, nothing is admitted until
//! strictly more than `cooldown` has elapsed, whatever the new label is.
//! The gate is owned by the orchestrator, its only caller, so check-and-update
//! needs no synchronization.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct EventGate {
    cooldown: Duration,
    last_admitted: Option<Instant>,
}

impl EventGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_admitted: None,
        }
    }

    /// Admit an intent observed at `now`, recording the admission time.
    ///
    /// Returns false while the cooldown since the last admission has not
    /// fully elapsed. A `now` earlier than the last admission is treated as
    /// zero elapsed time.
    pub fn admit(&mut self, now: Instant) -> bool {
        let open = match self.last_admitted {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.cooldown,
        };
        if open {
            self.last_admitted = Some(now);
        }
        open
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn last_admitted(&self) -> Option<Instant> {
        self.last_admitted
    }
}
