//! Operator button configuration.

use serde::Deserialize;

/// Input lines and timing of the button monitor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ButtonConfig {
    /// Held: nudge the horizontal axis one step per poll.
    pub horizontal_line: u32,

    /// Held: nudge the vertical axis one step per poll.
    pub vertical_line: u32,

    /// Press gesture: short press restores zero, long press stores it.
    pub reset_line: u32,

    /// Buttons pull the line LOW when pressed.
    #[serde(default)]
    pub active_low: bool,

    /// Poll period in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u32,

    /// Minimum hold time of the reset button that counts as a long press.
    #[serde(default = "default_long_press_ms")]
    pub long_press_ms: u32,
}

impl ButtonConfig {
    /// Create a button configuration with reference timing.
    pub const fn new(horizontal_line: u32, vertical_line: u32, reset_line: u32) -> Self {
        Self {
            horizontal_line,
            vertical_line,
            reset_line,
            active_low: false,
            poll_interval_ms: 10,
            long_press_ms: 3000,
        }
    }
}

fn default_poll_interval_ms() -> u32 {
    10
}

fn default_long_press_ms() -> u32 {
    3000
}
