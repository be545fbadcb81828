// src/engine/debounce.rs

//! Pure debounce window.
//!
//! The window is driven by periodic polls rather than by event arrival: it
//! opens at the first poll that sees a non-empty queue and fires at the first
//! poll after the quiet period has elapsed. No Tokio, no clocks of its own;
//! callers pass `now` in.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct DebounceWindow {
    quiet_period: Duration,
    opened_at: Option<Instant>,
}

impl DebounceWindow {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            opened_at: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    pub fn is_open(&self) -> bool {
        self.opened_at.is_some()
    }

    /// Advance the window. Returns `true` when the pending batch should be
    /// flushed now; the window is reset in that case.
    pub fn poll(&mut self, now: Instant, has_pending: bool) -> bool {
        if !has_pending {
            self.opened_at = None;
            return false;
        }

        match self.opened_at {
            None => {
                self.opened_at = Some(now);
                false
            }
            Some(opened) if now.saturating_duration_since(opened) > self.quiet_period => {
                self.opened_at = None;
                true
            }
            Some(_) => false,
        }
    }

    pub fn reset(&mut self) {
        self.opened_at = None;
    }
}
