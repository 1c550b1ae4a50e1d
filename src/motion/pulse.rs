//! Step pulse generation.
//!
//! Generic over embedded-hal 1.0 pin types. Emitting is the one place the
//! crate blocks on hardware: a train of `n` pulses occupies the calling
//! thread for `n * (high + low)`.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, OutputPin};

use crate::config::PulseConfig;
use crate::error::{HardwareError, LineRole};

use super::Direction;

/// Drives the DIR and STEP lines of one stepper driver.
///
/// Generic over:
/// - `STEP`: STEP pin type (must implement `OutputPin`)
/// - `DIR`: DIR pin type (must implement `OutputPin`)
/// - `DELAY`: Delay provider (must implement `DelayNs`)
pub struct PulseGenerator<STEP, DIR, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    DELAY: DelayNs,
{
    /// STEP pin (pulse to move one step).
    step_pin: STEP,

    /// DIR pin (high = CW, low = CCW, or inverted).
    dir_pin: DIR,

    /// Delay provider for step timing.
    delay: DELAY,

    /// HIGH and LOW phase lengths.
    timing: PulseConfig,

    /// Whether direction pin logic is inverted.
    invert_direction: bool,
}

impl<STEP, DIR, DELAY> PulseGenerator<STEP, DIR, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    DELAY: DelayNs,
{
    /// Create a generator with normal direction logic.
    pub fn new(step_pin: STEP, dir_pin: DIR, delay: DELAY, timing: PulseConfig) -> Self {
        Self {
            step_pin,
            dir_pin,
            delay,
            timing,
            invert_direction: false,
        }
    }

    /// Set direction inversion.
    pub fn invert_direction(mut self, invert: bool) -> Self {
        self.invert_direction = invert;
        self
    }

    /// Pulse timing in use.
    #[inline]
    pub fn timing(&self) -> PulseConfig {
        self.timing
    }

    /// Set the direction line, then emit `pulse_count` step pulses.
    ///
    /// The direction line is written even when `pulse_count` is 0.
    ///
    /// # Errors
    ///
    /// Stops at the first failing line operation. The returned error carries
    /// the number of complete pulses emitted before it; the train is not
    /// retried.
    pub fn emit(&mut self, direction: Direction, pulse_count: u32) -> Result<(), HardwareError> {
        let dir_high = direction.is_clockwise() != self.invert_direction;
        let set_dir = if dir_high {
            self.dir_pin.set_high()
        } else {
            self.dir_pin.set_low()
        };
        set_dir.map_err(|e| line_failure(LineRole::Direction, 0, e.kind()))?;

        for emitted in 0..pulse_count {
            self.step_pin
                .set_high()
                .map_err(|e| line_failure(LineRole::Step, emitted, e.kind()))?;
            self.delay.delay_us(self.timing.high_us);

            self.step_pin
                .set_low()
                .map_err(|e| line_failure(LineRole::Step, emitted, e.kind()))?;
            self.delay.delay_us(self.timing.low_us);
        }

        Ok(())
    }

    /// Give back the pins and delay provider.
    pub fn release(self) -> (STEP, DIR, DELAY) {
        (self.step_pin, self.dir_pin, self.delay)
    }
}

fn line_failure(
    role: LineRole,
    pulses_emitted: u32,
    kind: embedded_hal::digital::ErrorKind,
) -> HardwareError {
    HardwareError {
        axis: None,
        role,
        pulses_emitted,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal::digital::ErrorKind;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};
    use embedded_hal_mock::eh1::MockError;

    use super::*;

    /// Adds up every requested delay.
    #[derive(Debug, Default)]
    struct TotalDelay {
        ns: u64,
    }

    impl DelayNs for TotalDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.ns += ns as u64;
        }
    }

    fn pulses(count: usize) -> Vec<Transaction> {
        (0..count)
            .flat_map(|_| [Transaction::set(State::High), Transaction::set(State::Low)])
            .collect()
    }

    #[test]
    fn test_clockwise_train() {
        let step = PinMock::new(&pulses(3));
        let dir = PinMock::new(&[Transaction::set(State::High)]);

        let mut generator = PulseGenerator::new(step, dir, NoopDelay::new(), PulseConfig::default());
        generator.emit(Direction::Clockwise, 3).unwrap();

        let (mut step, mut dir, _) = generator.release();
        step.done();
        dir.done();
    }

    #[test]
    fn test_counter_clockwise_sets_dir_low() {
        let step = PinMock::new(&pulses(1));
        let dir = PinMock::new(&[Transaction::set(State::Low)]);

        let mut generator = PulseGenerator::new(step, dir, NoopDelay::new(), PulseConfig::default());
        generator.emit(Direction::CounterClockwise, 1).unwrap();

        let (mut step, mut dir, _) = generator.release();
        step.done();
        dir.done();
    }

    #[test]
    fn test_inverted_direction() {
        let step = PinMock::new(&[]);
        let dir = PinMock::new(&[Transaction::set(State::Low), Transaction::set(State::High)]);

        let mut generator = PulseGenerator::new(step, dir, NoopDelay::new(), PulseConfig::default())
            .invert_direction(true);
        generator.emit(Direction::Clockwise, 0).unwrap();
        generator.emit(Direction::CounterClockwise, 0).unwrap();

        let (mut step, mut dir, _) = generator.release();
        step.done();
        dir.done();
    }

    #[test]
    fn test_zero_pulses_still_sets_direction() {
        let step = PinMock::new(&[]);
        let dir = PinMock::new(&[Transaction::set(State::High)]);

        let mut generator = PulseGenerator::new(step, dir, NoopDelay::new(), PulseConfig::default());
        generator.emit(Direction::Clockwise, 0).unwrap();

        let (mut step, mut dir, _) = generator.release();
        step.done();
        dir.done();
    }

    #[test]
    fn test_train_duration() {
        let step = PinMock::new(&pulses(4));
        let dir = PinMock::new(&[Transaction::set(State::High)]);

        let mut generator =
            PulseGenerator::new(step, dir, TotalDelay::default(), PulseConfig::new(300, 500));
        generator.emit(Direction::Clockwise, 4).unwrap();

        let (mut step, mut dir, delay) = generator.release();
        assert_eq!(delay.ns, 4 * 800 * 1000);
        step.done();
        dir.done();
    }

    #[test]
    fn test_step_failure_reports_progress() {
        let mut expectations = pulses(2);
        expectations.push(
            Transaction::set(State::High).with_error(MockError::Io(std::io::ErrorKind::NotConnected)),
        );
        let step = PinMock::new(&expectations);
        let dir = PinMock::new(&[Transaction::set(State::High)]);

        let mut generator = PulseGenerator::new(step, dir, NoopDelay::new(), PulseConfig::default());
        let err = generator.emit(Direction::Clockwise, 10).unwrap_err();

        assert_eq!(err.role, LineRole::Step);
        assert_eq!(err.pulses_emitted, 2);
        assert_eq!(err.kind, ErrorKind::Other);

        let (mut step, mut dir, _) = generator.release();
        step.done();
        dir.done();
    }

    #[test]
    fn test_direction_failure_emits_nothing() {
        let step = PinMock::new(&[]);
        let dir = PinMock::new(&[Transaction::set(State::High)
            .with_error(MockError::Io(std::io::ErrorKind::NotConnected))]);

        let mut generator = PulseGenerator::new(step, dir, NoopDelay::new(), PulseConfig::default());
        let err = generator.emit(Direction::Clockwise, 5).unwrap_err();
        assert_eq!(err.role, LineRole::Direction);
        assert_eq!(err.pulses_emitted, 0);

        let (mut step, mut dir, _) = generator.release();
        step.done();
        dir.done();
    }
}
