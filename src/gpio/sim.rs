//! In-memory GPIO chip.
//!
//! Behaves like a chip with `num_lines` lines: claims are exclusive, outputs
//! remember their level and count rising edges, inputs read whatever level
//! was injected. Lines can be made to fail to exercise hardware error paths.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, OutputPin};
use tracing::{debug, trace};

use crate::error::ConfigError;

use super::LineProvider;

/// Error returned by a simulated line with an injected fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimLineError {
    /// Line that failed.
    pub line: u32,
}

impl digital::Error for SimLineError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Debug, Default)]
struct LineState {
    holder: Option<String>,
    level: bool,
    rising_edges: u64,
    faulted: bool,
}

#[derive(Debug)]
struct ChipState {
    num_lines: u32,
    lines: HashMap<u32, LineState>,
}

type Shared = Arc<Mutex<ChipState>>;

fn lock(state: &Shared) -> MutexGuard<'_, ChipState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Simulated GPIO chip. Clones share the same lines.
#[derive(Debug, Clone)]
pub struct SimulatedChip {
    name: String,
    state: Shared,
}

impl SimulatedChip {
    /// Create a chip named `gpiochip4` exposing lines `0..num_lines`.
    pub fn new(num_lines: u32) -> Self {
        Self::named("gpiochip4", num_lines)
    }

    /// Create a chip with the given name exposing lines `0..num_lines`.
    pub fn named(name: &str, num_lines: u32) -> Self {
        Self {
            name: name.to_string(),
            state: Arc::new(Mutex::new(ChipState {
                num_lines,
                lines: HashMap::new(),
            })),
        }
    }

    /// Current level of a line (outputs: last written, inputs: injected).
    pub fn level(&self, line: u32) -> bool {
        lock(&self.state).lines.get(&line).map_or(false, |l| l.level)
    }

    /// Rising edges seen on an output line since the chip was created.
    pub fn rising_edges(&self, line: u32) -> u64 {
        lock(&self.state).lines.get(&line).map_or(0, |l| l.rising_edges)
    }

    /// Drive the level an input line will read.
    pub fn set_input(&self, line: u32, high: bool) {
        lock(&self.state).lines.entry(line).or_default().level = high;
    }

    /// Make every operation on `line` fail until [`SimulatedChip::repair`].
    pub fn inject_fault(&self, line: u32) {
        lock(&self.state).lines.entry(line).or_default().faulted = true;
    }

    /// Remove an injected fault.
    pub fn repair(&self, line: u32) {
        if let Some(l) = lock(&self.state).lines.get_mut(&line) {
            l.faulted = false;
        }
    }

    /// Consumer currently holding a line.
    pub fn holder(&self, line: u32) -> Option<String> {
        lock(&self.state).lines.get(&line).and_then(|l| l.holder.clone())
    }

    /// Number of lines currently claimed.
    pub fn claimed_count(&self) -> usize {
        lock(&self.state)
            .lines
            .values()
            .filter(|l| l.holder.is_some())
            .count()
    }

    fn claim(&self, line: u32, consumer: &str) -> Result<SimLine, ConfigError> {
        let mut state = lock(&self.state);
        if line >= state.num_lines {
            return Err(ConfigError::LineUnavailable {
                line,
                consumer: consumer.to_string(),
            });
        }

        let entry = state.lines.entry(line).or_default();
        if let Some(holder) = &entry.holder {
            return Err(ConfigError::LineClaimed {
                line,
                holder: holder.clone(),
            });
        }
        entry.holder = Some(consumer.to_string());
        debug!(line, consumer, "line claimed");

        Ok(SimLine {
            line,
            state: Arc::clone(&self.state),
        })
    }
}

impl Default for SimulatedChip {
    fn default() -> Self {
        Self::new(54)
    }
}

impl LineProvider for SimulatedChip {
    type Output = SimLine;
    type Input = SimLine;

    fn chip(&self) -> &str {
        &self.name
    }

    fn request_output(&mut self, line: u32, consumer: &str) -> Result<SimLine, ConfigError> {
        let handle = self.claim(line, consumer)?;
        // Outputs start LOW
        lock(&self.state).lines.entry(line).or_default().level = false;
        Ok(handle)
    }

    fn request_input(&mut self, line: u32, consumer: &str) -> Result<SimLine, ConfigError> {
        self.claim(line, consumer)
    }
}

/// Claimed line on a [`SimulatedChip`]. Released on drop.
#[derive(Debug)]
pub struct SimLine {
    line: u32,
    state: Shared,
}

impl SimLine {
    /// Line number of this handle.
    pub fn line(&self) -> u32 {
        self.line
    }

    fn write(&mut self, high: bool) -> Result<(), SimLineError> {
        let mut state = lock(&self.state);
        let entry = state.lines.entry(self.line).or_default();
        if entry.faulted {
            return Err(SimLineError { line: self.line });
        }
        if high && !entry.level {
            entry.rising_edges += 1;
        }
        entry.level = high;
        Ok(())
    }

    fn read(&self) -> Result<bool, SimLineError> {
        let state = lock(&self.state);
        match state.lines.get(&self.line) {
            Some(entry) if entry.faulted => Err(SimLineError { line: self.line }),
            Some(entry) => Ok(entry.level),
            None => Ok(false),
        }
    }
}

impl ErrorType for SimLine {
    type Error = SimLineError;
}

impl OutputPin for SimLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

impl InputPin for SimLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.read()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.read().map(|high| !high)
    }
}

impl Drop for SimLine {
    fn drop(&mut self) {
        if let Some(entry) = lock(&self.state).lines.get_mut(&self.line) {
            entry.holder = None;
        }
        trace!(line = self.line, "line released");
    }
}
