//! Motion planning.
//!
//! Pure functions: a current angle and a request in, a step count and
//! direction out. Nothing here touches shared state or hardware.

use serde::Serialize;

use crate::axis::Axis;
use crate::config::units::{Resolution, Steps};

use super::Direction;

/// One commanded move, consumed once by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionRequest {
    /// Turn by a number of whole degrees in a given direction.
    Relative {
        /// Axis to move.
        axis: Axis,
        /// Degrees to turn, `0..=360`.
        degrees: u16,
        /// Rotation direction.
        direction: Direction,
    },
    /// Turn to an absolute angle along the shorter arc.
    Absolute {
        /// Axis to move.
        axis: Axis,
        /// Target angle in steps. Wrapped to one revolution when planned.
        target: Steps,
    },
}

impl MotionRequest {
    /// Axis the request moves.
    #[inline]
    pub fn axis(&self) -> Axis {
        match *self {
            MotionRequest::Relative { axis, .. } | MotionRequest::Absolute { axis, .. } => axis,
        }
    }
}

/// Derived plan for one move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MotionPlan {
    /// Axis to move.
    pub axis: Axis,
    /// Rotation direction.
    pub direction: Direction,
    /// Number of step pulses to emit.
    pub step_count: u32,
    /// Angle the plan was computed from, in steps.
    pub origin: Steps,
    /// Angle the axis ends at, in steps within one revolution.
    ///
    /// For absolute requests this is the requested target itself, so no
    /// rounding accumulates over repeated moves.
    pub target: Steps,
}

impl MotionPlan {
    /// A plan that emits no pulses.
    #[inline]
    pub fn is_noop(&self) -> bool {
        self.step_count == 0
    }
}

/// Plan a move from `current`.
pub fn plan(resolution: Resolution, current: Steps, request: &MotionRequest) -> MotionPlan {
    let current = resolution.normalize(current);

    match *request {
        MotionRequest::Relative {
            axis,
            degrees,
            direction,
        } => {
            let distance = resolution.steps(degrees as i64);
            MotionPlan {
                axis,
                direction,
                step_count: distance.0 as u32,
                origin: current,
                target: resolution.normalize(Steps(current.0 + direction.sign() * distance.0)),
            }
        }
        MotionRequest::Absolute { axis, target } => {
            let target = resolution.normalize(target);
            let (direction, distance) = shortest_arc(resolution, current, target);
            MotionPlan {
                axis,
                direction,
                step_count: distance.0 as u32,
                origin: current,
                target,
            }
        }
    }
}

/// Direction and distance of the shorter arc from `current` to `target`.
///
/// The clockwise distance is `(target - current) mod full_turn`. Up to and
/// including half a turn the move goes clockwise; beyond that it goes
/// counter-clockwise the other way round. An exact half turn is clockwise.
pub fn shortest_arc(resolution: Resolution, current: Steps, target: Steps) -> (Direction, Steps) {
    let diff = resolution.normalize(target - current);

    if diff <= resolution.half_turn() {
        (Direction::Clockwise, diff)
    } else {
        (Direction::CounterClockwise, resolution.full_turn() - diff)
    }
}
