//! Reset-on-idle rolling rate (damage or healing per second)

use chrono::NaiveDateTime;
use serde::Serialize;
use std::time::Duration;

/// Running total over the current activity window.
///
/// The window restarts whenever more than `idle_reset` passes between two
/// contributing events. The rate divides by at least one second so the first
/// sample of a window does not overshoot.
#[derive(Debug, Clone, Serialize)]
pub struct RateMeter {
    idle_reset_secs: i64,
    window_start: Option<NaiveDateTime>,
    last_event: Option<NaiveDateTime>,
    total: i64,
}

impl RateMeter {
    pub fn new(idle_reset: Duration) -> Self {
        Self {
            idle_reset_secs: idle_reset.as_secs() as i64,
            window_start: None,
            last_event: None,
            total: 0,
        }
    }

    pub fn add(&mut self, amount: i64, at: NaiveDateTime) {
        let idle = match self.last_event {
            Some(last) => (at - last).num_seconds() > self.idle_reset_secs,
            None => true,
        };
        if idle {
            self.window_start = Some(at);
            self.total = 0;
        }

        self.total = self.total.saturating_add(amount);
        self.last_event = Some(at);
    }

    /// Per-second rate as of `now`; 0 once the window has gone idle
    pub fn rate_at(&self, now: NaiveDateTime) -> f64 {
        let (Some(start), Some(last)) = (self.window_start, self.last_event) else {
            return 0.0;
        };
        if (now - last).num_seconds() > self.idle_reset_secs {
            return 0.0;
        }

        let elapsed = (now - start).num_seconds().max(1);
        self.total as f64 / elapsed as f64
    }

    /// Total accumulated in the current window
    pub fn window_total(&self) -> i64 {
        self.total
    }

    pub fn reset(&mut self) {
        self.window_start = None;
        self.last_event = None;
        self.total = 0;
    }
}
