//! # turntable-motion
//!
//! Pan/tilt stepper turntable control with embedded-hal 1.0 support.
//!
//! ## Features
//!
//! - **Configuration-driven**: Line numbers, resolution and timing from TOML
//! - **embedded-hal 1.0**: Uses `OutputPin` for STEP/DIR, `InputPin` for
//!   buttons, `DelayNs` for pulse timing
//! - **Background motion**: Moves run on worker threads; callers get the plan
//!   back immediately
//! - **Shared angle state**: Both axes tracked in whole steps, wrapped to one
//!   revolution
//! - **Operator buttons**: Hold-to-step nudges and a press-duration zero
//!   gesture
//! - **Fault freeze**: An axis whose pulse train failed stops accepting moves
//!   until its position is declared again
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use turntable_motion::{Axis, Direction, Turntable};
//! use turntable_motion::gpio::{SimulatedChip, ThreadSleep};
//!
//! let config = turntable_motion::load_config("turntable.toml")?;
//! let mut turntable = Turntable::new(config, SimulatedChip::default(), ThreadSleep)?;
//! turntable.start_buttons()?;
//!
//! turntable.rotate_absolute(Axis::Horizontal, 10)?;
//! turntable.rotate_relative(Axis::Vertical, 45, Direction::Clockwise)?;
//! println!("{:?}", turntable.status());
//!
//! turntable.shutdown(Duration::from_secs(5));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

// Core modules
pub mod axis;
pub mod buttons;
pub mod config;
pub mod error;
pub mod gpio;
pub mod motion;
pub mod turntable;

// Re-exports for ergonomic API
pub use axis::{Axis, AxisStateStore, AxisStatus};
pub use config::{load_config, parse_config, validate_config, TurntableConfig};
pub use error::{Error, Result};
pub use motion::{Direction, MotionFault, MotionPlan, MotionRequest};
pub use turntable::{AbsoluteMove, RelativeMove, Status, Turntable, ZeroReferences};

// Unit types
pub use config::units::{Degrees, Resolution, Steps};
