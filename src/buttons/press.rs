//! Press-duration gesture on the reset button.

use std::time::{Duration, Instant};

/// Edge-triggered state of a long-press-capable button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PressState {
    /// Not pressed.
    #[default]
    Idle,
    /// Pressed since the given instant.
    Pressed {
        /// When the press edge was seen.
        since: Instant,
    },
}

/// What a completed press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Held at least the threshold: remember the current angles as zero.
    StoreZero,
    /// Released early: drive both axes back to their zero.
    RestoreZero,
}

/// Turns a sampled button level into gestures on release.
#[derive(Debug, Clone)]
pub struct PressTracker {
    state: PressState,
    long_press: Duration,
}

impl PressTracker {
    /// Create a tracker with the given long-press threshold.
    pub fn new(long_press: Duration) -> Self {
        Self {
            state: PressState::Idle,
            long_press,
        }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> PressState {
        self.state
    }

    /// Feed one sample taken at `now`. Returns a gesture on the release edge.
    pub fn update(&mut self, pressed: bool, now: Instant) -> Option<Gesture> {
        match (self.state, pressed) {
            (PressState::Idle, true) => {
                self.state = PressState::Pressed { since: now };
                None
            }
            (PressState::Pressed { since }, false) => {
                self.state = PressState::Idle;
                if now.saturating_duration_since(since) >= self.long_press {
                    Some(Gesture::StoreZero)
                } else {
                    Some(Gesture::RestoreZero)
                }
            }
            _ => None,
        }
    }
}
