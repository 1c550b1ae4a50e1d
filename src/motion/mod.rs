//! Motion module for turntable-motion.
//!
//! Planning of single-axis moves, step pulse generation, and the executor
//! that runs moves in the background and commits their result.

mod executor;
mod planner;
mod pulse;

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub use executor::{AxisDriver, MotionExecutor, MotionFault, NudgeOutcome};
pub use planner::{plan, shortest_arc, MotionPlan, MotionRequest};
pub use pulse::PulseGenerator;

/// Direction of motor motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Direction {
    /// Clockwise (increasing angle, DIR line HIGH).
    #[serde(rename = "cw")]
    Clockwise,
    /// Counter-clockwise (decreasing angle, DIR line LOW).
    #[serde(rename = "ccw")]
    CounterClockwise,
}

impl Direction {
    /// Get direction from a clockwise flag.
    #[inline]
    pub fn from_clockwise(clockwise: bool) -> Self {
        if clockwise {
            Direction::Clockwise
        } else {
            Direction::CounterClockwise
        }
    }

    /// Whether this is clockwise.
    #[inline]
    pub fn is_clockwise(self) -> bool {
        self == Direction::Clockwise
    }

    /// Get the sign multiplier.
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Direction::Clockwise => 1,
            Direction::CounterClockwise => -1,
        }
    }

    /// Short name, `cw` or `ccw`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Clockwise => "cw",
            Direction::CounterClockwise => "ccw",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cw" => Ok(Direction::Clockwise),
            "ccw" => Ok(Direction::CounterClockwise),
            other => Err(ValidationError::UnknownDirection(other.to_string())),
        }
    }
}
