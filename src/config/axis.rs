//! Per-axis line assignment from TOML.

use serde::Deserialize;

use crate::axis::Axis;

/// Direction and step line numbers of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AxisConfig {
    /// Line driving the driver's DIR input.
    pub dir_line: u32,

    /// Line driving the driver's STEP input.
    pub step_line: u32,

    /// Invert direction pin logic (LOW = clockwise).
    #[serde(default)]
    pub invert_direction: bool,
}

impl AxisConfig {
    /// Create an axis configuration with normal direction logic.
    pub const fn new(dir_line: u32, step_line: u32) -> Self {
        Self {
            dir_line,
            step_line,
            invert_direction: false,
        }
    }
}

/// Both axes of the turntable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AxesConfig {
    /// Pan axis.
    #[serde(default = "default_horizontal")]
    pub horizontal: AxisConfig,

    /// Tilt axis.
    #[serde(default = "default_vertical")]
    pub vertical: AxisConfig,
}

impl AxesConfig {
    /// Get the configuration of one axis.
    pub fn get(&self, axis: Axis) -> &AxisConfig {
        match axis {
            Axis::Horizontal => &self.horizontal,
            Axis::Vertical => &self.vertical,
        }
    }
}

impl Default for AxesConfig {
    fn default() -> Self {
        Self {
            horizontal: default_horizontal(),
            vertical: default_vertical(),
        }
    }
}

fn default_horizontal() -> AxisConfig {
    AxisConfig::new(19, 26)
}

fn default_vertical() -> AxisConfig {
    AxisConfig::new(20, 21)
}
