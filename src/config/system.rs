//! System configuration - root configuration structure.

use heapless::String;
use serde::Deserialize;

use super::axis::AxesConfig;
use super::buttons::ButtonConfig;
use super::pulse::PulseConfig;
use super::units::Resolution;

/// Root configuration structure from TOML.
///
/// Hardware constants are fixed once the turntable is built; nothing here
/// is changed at runtime.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TurntableConfig {
    /// GPIO chip holding every line (e.g. `gpiochip4` on a Raspberry Pi 5).
    #[serde(default = "default_chip")]
    pub chip: String<32>,

    /// Steps needed to move either axis one degree.
    #[serde(default = "default_steps_per_degree")]
    pub steps_per_degree: u32,

    /// Step pulse timing.
    #[serde(default)]
    pub pulse: PulseConfig,

    /// Line assignment of both axes.
    #[serde(default)]
    pub axes: AxesConfig,

    /// Operator buttons, if fitted.
    #[serde(default)]
    pub buttons: Option<ButtonConfig>,
}

impl TurntableConfig {
    /// Angular resolution shared by both axes.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.steps_per_degree)
    }

    /// Every line in use, labelled with its role.
    pub fn lines(&self) -> impl Iterator<Item = (&'static str, u32)> {
        let axes = [
            ("h_dir", self.axes.horizontal.dir_line),
            ("h_step", self.axes.horizontal.step_line),
            ("v_dir", self.axes.vertical.dir_line),
            ("v_step", self.axes.vertical.step_line),
        ];
        let buttons = self.buttons.as_ref().map(|b| {
            [
                ("h_button", b.horizontal_line),
                ("v_button", b.vertical_line),
                ("reset_button", b.reset_line),
            ]
        });
        axes.into_iter().chain(buttons.into_iter().flatten())
    }
}

impl Default for TurntableConfig {
    fn default() -> Self {
        Self {
            chip: default_chip(),
            steps_per_degree: default_steps_per_degree(),
            pulse: PulseConfig::default(),
            axes: AxesConfig::default(),
            buttons: None,
        }
    }
}

fn default_chip() -> String<32> {
    let mut chip = String::new();
    let _ = chip.push_str("gpiochip4");
    chip
}

fn default_steps_per_degree() -> u32 {
    32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ButtonConfig;

    #[test]
    fn test_reference_defaults() {
        let config = TurntableConfig::default();
        assert_eq!(config.chip.as_str(), "gpiochip4");
        assert_eq!(config.steps_per_degree, 32);
        assert_eq!(config.axes.horizontal.dir_line, 19);
        assert_eq!(config.axes.horizontal.step_line, 26);
        assert_eq!(config.axes.vertical.dir_line, 20);
        assert_eq!(config.axes.vertical.step_line, 21);
        assert!(config.buttons.is_none());
    }

    #[test]
    fn test_lines_include_buttons() {
        let mut config = TurntableConfig::default();
        assert_eq!(config.lines().count(), 4);

        config.buttons = Some(ButtonConfig::new(5, 6, 13));
        let lines: Vec<_> = config.lines().collect();
        assert_eq!(lines.len(), 7);
        assert!(lines.contains(&("reset_button", 13)));
    }
}
