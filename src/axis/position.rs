//! Angle tracking for one axis.
//!
//! Positions are kept in steps, wrapped to a single revolution.

use crate::config::units::{Degrees, Resolution, Steps};

/// Current angle and stored zero reference of one axis.
///
/// Both values always lie in `[0, full_turn)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AngleState {
    /// Current angle in steps from the mechanical origin.
    current: Steps,
    /// Operator-set home angle in steps.
    zero_reference: Steps,
    /// Set when an emission failed; the physical position is unknown.
    faulted: bool,
    /// Bumped on every fault. Plans made before a fault carry an older value.
    epoch: u32,
}

impl AngleState {
    /// Create a state at the origin with a zero reference of 0.
    #[inline]
    pub const fn new() -> Self {
        Self {
            current: Steps(0),
            zero_reference: Steps(0),
            faulted: false,
            epoch: 0,
        }
    }

    /// Current angle in steps.
    #[inline]
    pub fn current(&self) -> Steps {
        self.current
    }

    /// Current angle in degrees.
    #[inline]
    pub fn degrees(&self, resolution: Resolution) -> Degrees {
        resolution.to_degrees(self.current)
    }

    /// Stored zero reference in steps.
    #[inline]
    pub fn zero_reference(&self) -> Steps {
        self.zero_reference
    }

    /// Whether the axis lost track of its position.
    #[inline]
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Fault epoch, changed by every [`AngleState::set_faulted`].
    #[inline]
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Replace the current angle.
    #[inline]
    pub fn set_current(&mut self, steps: Steps, resolution: Resolution) {
        self.current = resolution.normalize(steps);
    }

    /// Move the current angle by a signed number of steps.
    #[inline]
    pub fn move_steps(&mut self, delta: i64, resolution: Resolution) {
        self.current = resolution.normalize(Steps(self.current.0 + delta));
    }

    /// Replace the zero reference.
    #[inline]
    pub fn set_zero_reference(&mut self, steps: Steps, resolution: Resolution) {
        self.zero_reference = resolution.normalize(steps);
    }

    /// Flag the axis as faulted.
    #[inline]
    pub fn set_faulted(&mut self) {
        self.faulted = true;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Clear the fault flag and declare where the axis actually is.
    #[inline]
    pub fn recover(&mut self, steps: Steps, resolution: Resolution) {
        self.faulted = false;
        self.set_current(steps, resolution);
    }
}
