//! Configuration module for turntable-motion.
//!
//! Provides types for loading and validating the turntable's hardware
//! constants from TOML files or pre-parsed data.

mod axis;
mod buttons;
mod loader;
mod pulse;
mod system;
pub mod units;
mod validation;

pub use axis::{AxesConfig, AxisConfig};
pub use buttons::ButtonConfig;
pub use loader::{load_config, parse_config};
pub use pulse::PulseConfig;
pub use system::TurntableConfig;
pub use validation::validate_config;

// Re-export unit types at config level
pub use units::{Degrees, Resolution, Steps};
