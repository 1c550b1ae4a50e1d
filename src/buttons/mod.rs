//! Operator buttons.
//!
//! Two hold-to-step buttons nudge the axes clockwise one step per poll while
//! held. A third button stores or restores the zero references depending on
//! how long it was held.

mod monitor;
mod press;

pub use monitor::{Button, ButtonMonitor, MonitorHandle, PollReport};
pub use press::{Gesture, PressState, PressTracker};
