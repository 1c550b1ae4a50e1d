//! Digital I/O capability.
//!
//! Lines are plain embedded-hal 1.0 pins. A [`LineProvider`] hands them out
//! by line number, which is where a GPIO chip backend plugs in. Dropping a
//! line releases it.

pub mod sim;

use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::ConfigError;

pub use sim::SimulatedChip;

/// Source of exclusively owned digital lines.
pub trait LineProvider {
    /// Output line handle.
    type Output: OutputPin + Send + 'static;
    /// Input line handle.
    type Input: InputPin + Send + 'static;

    /// Name of the chip the lines come from, e.g. `gpiochip4`.
    fn chip(&self) -> &str;

    /// Claim `line` as an output labelled `consumer`.
    ///
    /// # Errors
    ///
    /// `ConfigError::LineUnavailable` if the line does not exist,
    /// `ConfigError::LineClaimed` if someone else holds it.
    fn request_output(&mut self, line: u32, consumer: &str) -> Result<Self::Output, ConfigError>;

    /// Claim `line` as an input labelled `consumer`.
    ///
    /// # Errors
    ///
    /// Same as [`LineProvider::request_output`].
    fn request_input(&mut self, line: u32, consumer: &str) -> Result<Self::Input, ConfigError>;
}

/// `DelayNs` backed by `std::thread::sleep`.
///
/// Sleeps at least the requested time; the OS may add scheduling latency.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl DelayNs for ThreadSleep {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns as u64));
    }

    fn delay_us(&mut self, us: u32) {
        thread::sleep(Duration::from_micros(us as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }
}
