//! Error types for turntable-motion.
//!
//! Splits failures by who can act on them: configuration errors stop startup,
//! validation errors are returned to the caller before anything moves, and
//! hardware errors are raised from inside a running motion.

use thiserror::Error;

use crate::axis::Axis;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all turntable operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Configuration parsing, validation or line acquisition error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Rejected request, nothing was dispatched
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),
    /// Digital I/O failed while driving or reading a line
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),
    /// Motion could not be dispatched
    #[error("Motion error: {0}")]
    Motion(#[from] MotionError),
}

/// Configuration-related errors. All of them are fatal at startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    #[error("Parse error: {0}")]
    ParseError(String),
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(String),
    /// Steps per degree out of range
    #[error("Invalid steps per degree: {0}. Must be 1-65536")]
    InvalidStepsPerDegree(u32),
    /// Pulse high or low phase has zero length
    #[error("Invalid pulse width: high {high_us}us, low {low_us}us. Both must be > 0")]
    InvalidPulseWidth {
        /// High phase in microseconds
        high_us: u32,
        /// Low phase in microseconds
        low_us: u32,
    },
    /// The same line number is assigned to two roles
    #[error("Line {line} is assigned to both '{first}' and '{second}'")]
    DuplicateLine {
        /// Offending line number
        line: u32,
        /// First role using the line
        first: &'static str,
        /// Second role using the line
        second: &'static str,
    },
    /// Button poll interval must be > 0
    #[error("Invalid poll interval: {0}ms. Must be > 0")]
    InvalidPollInterval(u32),
    /// Long-press threshold must exceed the poll interval
    #[error("Invalid long-press threshold: {threshold_ms}ms. Must be > poll interval ({poll_ms}ms)")]
    InvalidLongPress {
        /// Configured threshold
        threshold_ms: u32,
        /// Configured poll interval
        poll_ms: u32,
    },
    /// The line provider is not the chip the configuration names
    #[error("Configured for chip '{expected}' but lines come from '{found}'")]
    ChipMismatch {
        /// Chip named in the configuration
        expected: String,
        /// Chip behind the line provider
        found: String,
    },
    /// Requested line does not exist on the chip
    #[error("Line {line} ({consumer}) is unavailable")]
    LineUnavailable {
        /// Requested line number
        line: u32,
        /// Consumer label of the request
        consumer: String,
    },
    /// Requested line is held by another consumer
    #[error("Line {line} is already claimed by '{holder}'")]
    LineClaimed {
        /// Requested line number
        line: u32,
        /// Consumer currently holding the line
        holder: String,
    },
}

/// Request validation errors, returned before any hardware side effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Angle argument outside its legal range
    #[error("Angle {angle} out of range [{min}, {max}]")]
    AngleOutOfRange {
        /// Requested angle in degrees
        angle: i64,
        /// Smallest accepted angle
        min: i64,
        /// Largest accepted angle
        max: i64,
    },
    /// Axis identifier not recognised
    #[error("Unknown axis '{0}'. Expected 'horizontal' or 'vertical'")]
    UnknownAxis(String),
    /// Direction identifier not recognised
    #[error("Unknown direction '{0}'. Expected 'cw' or 'ccw'")]
    UnknownDirection(String),
}

/// Which line of an axis or button failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    /// Direction output
    Direction,
    /// Step output
    Step,
    /// Button input
    Button,
}

impl core::fmt::Display for LineRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LineRole::Direction => write!(f, "direction"),
            LineRole::Step => write!(f, "step"),
            LineRole::Button => write!(f, "button"),
        }
    }
}

/// A digital I/O operation failed.
///
/// For outputs, `pulses_emitted` is how many complete pulses made it onto the
/// wire before the failure. The physical position after a partial train is
/// unknown; the count is for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{role} line failed{}: {kind:?} after {pulses_emitted} pulses", axis_suffix(.axis))]
pub struct HardwareError {
    /// Axis the line belongs to (none for button inputs)
    pub axis: Option<Axis>,
    /// Role of the failing line
    pub role: LineRole,
    /// Complete pulses emitted before the failure
    pub pulses_emitted: u32,
    /// embedded-hal error kind reported by the line
    pub kind: embedded_hal::digital::ErrorKind,
}

fn axis_suffix(axis: &Option<Axis>) -> String {
    match axis {
        Some(axis) => format!(" on {axis} axis"),
        None => String::new(),
    }
}

/// Motion dispatch errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MotionError {
    /// A previous emission failed; the tracked angle is frozen until cleared
    #[error("{0} axis is faulted; clear the fault before moving it")]
    AxisFaulted(Axis),
    /// Executor no longer accepts work
    #[error("Executor is shutting down")]
    ShuttingDown,
    /// The OS refused to start a worker thread
    #[error("Failed to spawn worker thread")]
    SpawnFailed,
}
