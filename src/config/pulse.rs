//! Step pulse timing.

use serde::Deserialize;

/// Length of the HIGH and LOW phase of every step pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PulseConfig {
    /// Time the step line is held HIGH, in microseconds.
    #[serde(default = "default_phase_us")]
    pub high_us: u32,

    /// Time the step line is held LOW, in microseconds.
    #[serde(default = "default_phase_us")]
    pub low_us: u32,
}

impl PulseConfig {
    /// Create a pulse timing.
    pub const fn new(high_us: u32, low_us: u32) -> Self {
        Self { high_us, low_us }
    }

    /// Duration of one full pulse in microseconds.
    #[inline]
    pub fn period_us(&self) -> u64 {
        self.high_us as u64 + self.low_us as u64
    }

    /// Expected wall time of a train of `pulses` pulses, in microseconds.
    #[inline]
    pub fn train_us(&self, pulses: u32) -> u64 {
        self.period_us() * pulses as u64
    }
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self::new(default_phase_us(), default_phase_us())
    }
}

fn default_phase_us() -> u32 {
    800
}
