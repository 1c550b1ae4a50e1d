//! Unit types for physical quantities.
//!
//! Provides type-safe representations of angles and motor steps to prevent
//! unit confusion at compile time.

use core::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Degrees in one full revolution.
pub const FULL_TURN_DEGREES: i64 = 360;

/// Angular position in degrees.
///
/// Used for reporting. Angle state itself is kept in [`Steps`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Degrees(pub f32);

impl Degrees {
    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f32 {
        self.0
    }
}

/// Motor position or distance in steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Steps(pub i64);

impl Steps {
    /// Create a new Steps value.
    #[inline]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl Add for Steps {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Steps {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

/// Angular resolution of an axis: how many steps make one degree.
///
/// All angle arithmetic goes through here so that wrapping at a full turn is
/// done in one place, on integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    steps_per_degree: u32,
}

impl Resolution {
    /// Create a resolution. `steps_per_degree` must be at least 1.
    #[inline]
    pub const fn new(steps_per_degree: u32) -> Self {
        Self { steps_per_degree }
    }

    /// Steps needed to move one degree.
    #[inline]
    pub const fn steps_per_degree(self) -> u32 {
        self.steps_per_degree
    }

    /// Steps in one full revolution.
    #[inline]
    pub const fn full_turn(self) -> Steps {
        Steps(FULL_TURN_DEGREES * self.steps_per_degree as i64)
    }

    /// Steps in half a revolution.
    #[inline]
    pub const fn half_turn(self) -> Steps {
        Steps(FULL_TURN_DEGREES / 2 * self.steps_per_degree as i64)
    }

    /// Convert whole degrees to steps (no wrapping).
    #[inline]
    pub const fn steps(self, degrees: i64) -> Steps {
        Steps(degrees * self.steps_per_degree as i64)
    }

    /// Wrap a step position into `[0, full_turn)`. Negative values wrap
    /// around from the top.
    #[inline]
    pub fn normalize(self, steps: Steps) -> Steps {
        Steps(steps.0.rem_euclid(self.full_turn().0))
    }

    /// Wrap whole degrees into `[0, 360)` and convert to steps.
    #[inline]
    pub fn normalize_degrees(self, degrees: i64) -> Steps {
        self.steps(degrees.rem_euclid(FULL_TURN_DEGREES))
    }

    /// Convert steps to degrees.
    #[inline]
    pub fn to_degrees(self, steps: Steps) -> Degrees {
        Degrees(steps.0 as f32 / self.steps_per_degree as f32)
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_and_half_turn() {
        let res = Resolution::new(32);
        assert_eq!(res.full_turn(), Steps(11520));
        assert_eq!(res.half_turn(), Steps(5760));
    }

    #[test]
    fn test_normalize_wraps_both_ways() {
        let res = Resolution::new(32);
        assert_eq!(res.normalize(Steps(11520)), Steps(0));
        assert_eq!(res.normalize(Steps(11521)), Steps(1));
        assert_eq!(res.normalize(Steps(-1)), Steps(11519));
        assert_eq!(res.normalize_degrees(-10), res.steps(350));
        assert_eq!(res.normalize_degrees(725), res.steps(5));
    }

    #[test]
    fn test_steps_to_degrees() {
        let res = Resolution::new(32);
        assert_eq!(res.to_degrees(Steps(2880)).value(), 90.0);
        assert_eq!(res.to_degrees(Steps(16)).value(), 0.5);
    }
}
