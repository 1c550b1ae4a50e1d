//! Button poll loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, InputPin, OutputPin};
use tracing::{debug, error, info, trace, warn};

use crate::axis::Axis;
use crate::config::ButtonConfig;
use crate::error::{HardwareError, LineRole};
use crate::motion::{Direction, MotionExecutor, NudgeOutcome};

use super::press::{Gesture, PressTracker};

/// One input line read with its wiring polarity applied.
#[derive(Debug)]
pub struct Button<I: InputPin> {
    pin: I,
    active_low: bool,
}

impl<I: InputPin> Button<I> {
    /// Wrap an input line. `active_low` buttons read LOW when pressed.
    pub fn new(pin: I, active_low: bool) -> Self {
        Self { pin, active_low }
    }

    /// Whether the button is pressed right now.
    ///
    /// # Errors
    ///
    /// Returns a hardware error if the line cannot be read.
    pub fn is_pressed(&mut self) -> Result<bool, HardwareError> {
        let high = self.pin.is_high().map_err(|e| HardwareError {
            axis: None,
            role: LineRole::Button,
            pulses_emitted: 0,
            kind: e.kind(),
        })?;
        Ok(high != self.active_low)
    }
}

/// What one poll tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollReport {
    /// Nudge result per axis, `None` if the button was not held.
    pub nudges: [Option<NudgeOutcome>; 2],
    /// Gesture completed on this tick.
    pub gesture: Option<Gesture>,
}

/// Polls the three buttons and acts on them.
pub struct ButtonMonitor<I, O, D>
where
    I: InputPin + Send + 'static,
    O: OutputPin + Send + 'static,
    D: DelayNs + Send + 'static,
{
    executor: Arc<MotionExecutor<O, D>>,
    nudge: [Button<I>; 2],
    reset: Button<I>,
    tracker: PressTracker,
    poll_interval: Duration,
}

impl<I, O, D> ButtonMonitor<I, O, D>
where
    I: InputPin + Send + 'static,
    O: OutputPin + Send + 'static,
    D: DelayNs + Send + 'static,
{
    /// Create a monitor from the claimed input lines.
    pub fn new(
        executor: Arc<MotionExecutor<O, D>>,
        horizontal: I,
        vertical: I,
        reset: I,
        config: &ButtonConfig,
    ) -> Self {
        Self {
            executor,
            nudge: [
                Button::new(horizontal, config.active_low),
                Button::new(vertical, config.active_low),
            ],
            reset: Button::new(reset, config.active_low),
            tracker: PressTracker::new(Duration::from_millis(config.long_press_ms as u64)),
            poll_interval: Duration::from_millis(config.poll_interval_ms as u64),
        }
    }

    /// Run one poll tick at `now`.
    ///
    /// Held nudge buttons emit one pulse inline. A reset-button read error
    /// leaves the gesture state untouched for this tick.
    pub fn poll(&mut self, now: Instant) -> PollReport {
        let mut report = PollReport::default();

        for axis in Axis::ALL {
            if !pressed(&mut self.nudge[axis.index()], "nudge") {
                continue;
            }

            let outcome = match self.executor.step_once(axis, Direction::Clockwise) {
                Ok(outcome) => outcome,
                // Already faulted and alerted by the executor
                Err(_) => NudgeOutcome::Faulted,
            };
            if outcome == NudgeOutcome::Busy {
                trace!(%axis, "nudge skipped, axis busy");
            }
            report.nudges[axis.index()] = Some(outcome);
        }

        let reset = match self.reset.is_pressed() {
            Ok(reset) => reset,
            Err(e) => {
                warn!("reset button unreadable: {}", e);
                return report;
            }
        };

        report.gesture = self.tracker.update(reset, now);
        match report.gesture {
            Some(Gesture::StoreZero) => {
                self.executor.store_zero();
            }
            Some(Gesture::RestoreZero) => {
                info!("restoring zero references");
                // Failures are logged per axis by the executor
                let [_horizontal, _vertical] = self.executor.restore_zero();
            }
            None => {}
        }

        report
    }

    /// Run the poll loop on its own thread until the handle is stopped.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be started.
    pub fn spawn(mut self) -> std::io::Result<MonitorHandle> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("button-monitor".into())
            .spawn(move || {
                debug!(interval_ms = self.poll_interval.as_millis() as u64, "button monitor started");
                while !flag.load(Ordering::Acquire) {
                    self.poll(Instant::now());
                    thread::sleep(self.poll_interval);
                }
                debug!("button monitor stopped");
            })?;

        Ok(MonitorHandle {
            stop,
            thread: Some(thread),
        })
    }
}

fn pressed<I: InputPin>(button: &mut Button<I>, name: &str) -> bool {
    match button.is_pressed() {
        Ok(pressed) => pressed,
        Err(e) => {
            warn!(button = name, "button unreadable: {}", e);
            false
        }
    }
}

/// Running button monitor. Stops and joins the thread on drop.
#[derive(Debug)]
pub struct MonitorHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Whether the poll thread is still alive.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Stop the poll loop and wait for the thread to exit.
    ///
    /// Returns after at most one poll tick plus one nudge pulse.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("button monitor panicked");
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
