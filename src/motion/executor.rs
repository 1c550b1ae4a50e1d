//! Motion execution.
//!
//! `execute` reads the axis angle, plans, and hands the pulse train to a
//! worker thread, returning the plan straight away. The worker commits the
//! planned angle once the last pulse is out.
//!
//! Reading and committing are separate steps. Two moves dispatched close
//! together on one axis can plan from the same angle and the later commit
//! wins. Emissions on one axis are serialized by the axis driver lock so
//! the DIR and STEP lines are never driven by two trains at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, LockResult, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use tracing::{debug, error, info, trace, warn};

use crate::axis::{Axis, AxisStateStore};
use crate::config::units::Steps;
use crate::config::PulseConfig;
use crate::error::{Error, HardwareError, MotionError, Result};

use super::planner::{plan, MotionPlan, MotionRequest};
use super::pulse::PulseGenerator;
use super::Direction;

// Guarded data stays usable after a worker panic.
fn recover<T>(result: LockResult<MutexGuard<'_, T>>) -> MutexGuard<'_, T> {
    result.unwrap_or_else(PoisonError::into_inner)
}

/// Pulse generator of one axis behind a lock.
pub struct AxisDriver<O, D>
where
    O: OutputPin,
    D: DelayNs,
{
    axis: Axis,
    timing: PulseConfig,
    generator: Mutex<PulseGenerator<O, O, D>>,
}

impl<O, D> AxisDriver<O, D>
where
    O: OutputPin,
    D: DelayNs,
{
    /// Wrap the generator driving `axis`.
    pub fn new(axis: Axis, generator: PulseGenerator<O, O, D>) -> Self {
        Self {
            axis,
            timing: generator.timing(),
            generator: Mutex::new(generator),
        }
    }

    /// Axis this driver moves.
    #[inline]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Pulse timing of this axis.
    #[inline]
    pub fn timing(&self) -> PulseConfig {
        self.timing
    }

    /// Emit a pulse train, waiting for any train already running on this axis.
    ///
    /// `still_wanted` is asked once the lines are free. If it says no, the
    /// lines are left alone and `None` is returned.
    pub fn emit_when_free(
        &self,
        direction: Direction,
        pulse_count: u32,
        still_wanted: impl FnOnce() -> bool,
    ) -> Option<core::result::Result<(), HardwareError>> {
        let mut generator = recover(self.generator.lock());
        if !still_wanted() {
            return None;
        }
        Some(
            generator
                .emit(direction, pulse_count)
                .map_err(|e| self.tag(e)),
        )
    }

    /// Emit a pulse train only if the axis is idle.
    ///
    /// Returns `None` without touching the lines if a train is running.
    pub fn try_emit(
        &self,
        direction: Direction,
        pulse_count: u32,
    ) -> Option<core::result::Result<(), HardwareError>> {
        let mut generator = match self.generator.try_lock() {
            Ok(generator) => generator,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return None,
        };
        Some(
            generator
                .emit(direction, pulse_count)
                .map_err(|e| self.tag(e)),
        )
    }

    fn tag(&self, error: HardwareError) -> HardwareError {
        HardwareError {
            axis: Some(self.axis),
            ..error
        }
    }
}

/// A move that failed on the wire.
///
/// Sent on the alert channel because the caller that requested the move has
/// already been answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionFault {
    /// The plan that was being executed.
    pub plan: MotionPlan,
    /// What went wrong.
    pub error: HardwareError,
}

/// Result of a single-step nudge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NudgeOutcome {
    /// One pulse emitted and committed; the new angle.
    Stepped(Steps),
    /// A move is running on the axis, nothing was done.
    Busy,
    /// The axis is faulted, nothing was done.
    Faulted,
}

/// Dispatches moves onto worker threads and commits their results.
pub struct MotionExecutor<O, D>
where
    O: OutputPin + Send + 'static,
    D: DelayNs + Send + 'static,
{
    store: Arc<AxisStateStore>,
    drivers: [Arc<AxisDriver<O, D>>; 2],
    alerts: Mutex<Sender<MotionFault>>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
    accepting: AtomicBool,
}

impl<O, D> MotionExecutor<O, D>
where
    O: OutputPin + Send + 'static,
    D: DelayNs + Send + 'static,
{
    /// Create an executor over both axis drivers, horizontal first.
    pub fn new(
        store: Arc<AxisStateStore>,
        horizontal: AxisDriver<O, D>,
        vertical: AxisDriver<O, D>,
        alerts: Sender<MotionFault>,
    ) -> Self {
        Self {
            store,
            drivers: [Arc::new(horizontal), Arc::new(vertical)],
            alerts: Mutex::new(alerts),
            in_flight: Mutex::new(Vec::new()),
            accepting: AtomicBool::new(true),
        }
    }

    /// The angle store this executor commits into.
    #[inline]
    pub fn store(&self) -> &Arc<AxisStateStore> {
        &self.store
    }

    fn driver(&self, axis: Axis) -> &Arc<AxisDriver<O, D>> {
        &self.drivers[axis.index()]
    }

    /// Plan a move and start it in the background.
    ///
    /// Returns the plan as soon as the worker is started. The plan's target
    /// is an estimate: another move on the same axis may commit in between.
    ///
    /// # Errors
    ///
    /// `MotionError::AxisFaulted` if the axis lost its position,
    /// `MotionError::ShuttingDown` after [`MotionExecutor::close`],
    /// `MotionError::SpawnFailed` if no worker could be started.
    pub fn execute(&self, request: MotionRequest) -> Result<MotionPlan> {
        if !self.accepting.load(Ordering::Acquire) {
            return Err(Error::Motion(MotionError::ShuttingDown));
        }

        let axis = request.axis();
        if self.store.is_faulted(axis) {
            return Err(Error::Motion(MotionError::AxisFaulted(axis)));
        }

        let (current, epoch) = self.store.read_for_plan(axis);
        let plan = plan(self.store.resolution(), current, &request);
        debug!(?request, ?plan, epoch, "motion planned");

        let driver = Arc::clone(self.driver(axis));
        let expected_ms = driver.timing().train_us(plan.step_count) / 1000;
        let store = Arc::clone(&self.store);
        let alerts = recover(self.alerts.lock()).clone();

        let handle = thread::Builder::new()
            .name(format!("motion-{axis}"))
            .spawn(move || run_motion(&driver, &store, plan, epoch, &alerts))
            .map_err(|e| {
                error!(%axis, "failed to spawn motion worker: {}", e);
                Error::Motion(MotionError::SpawnFailed)
            })?;

        let mut in_flight = recover(self.in_flight.lock());
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);

        info!(
            %axis,
            direction = %plan.direction,
            steps = plan.step_count,
            expected_ms,
            in_flight = in_flight.len(),
            "motion dispatched"
        );
        Ok(plan)
    }

    /// Emit one pulse on an idle axis and commit it, on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns the hardware error if the pulse failed; the axis is then
    /// faulted and an alert is sent.
    pub fn step_once(
        &self,
        axis: Axis,
        direction: Direction,
    ) -> core::result::Result<NudgeOutcome, HardwareError> {
        if self.store.is_faulted(axis) {
            return Ok(NudgeOutcome::Faulted);
        }

        match self.driver(axis).try_emit(direction, 1) {
            None => Ok(NudgeOutcome::Busy),
            Some(Ok(())) => Ok(match self.store.advance(axis, direction.sign()) {
                Some(angle) => {
                    trace!(%axis, steps = angle.0, "nudged");
                    NudgeOutcome::Stepped(angle)
                }
                None => NudgeOutcome::Faulted,
            }),
            Some(Err(error)) => {
                let origin = self.store.read(axis);
                let plan = MotionPlan {
                    axis,
                    direction,
                    step_count: 1,
                    origin,
                    target: self
                        .store
                        .resolution()
                        .normalize(Steps(origin.0 + direction.sign())),
                };
                let alerts = recover(self.alerts.lock()).clone();
                report_fault(&self.store, &alerts, plan, error.clone());
                Err(error)
            }
        }
    }

    /// Copy the current angle of both axes into their zero references.
    pub fn store_zero(&self) -> [Steps; 2] {
        let zeros = self.store.store_zero_all();
        info!(
            horizontal = zeros[0].0,
            vertical = zeros[1].0,
            "zero references stored"
        );
        zeros
    }

    /// Send both axes back to their zero references along the shorter arc.
    ///
    /// Each axis is dispatched independently; a faulted axis does not stop
    /// the other one.
    pub fn restore_zero(&self) -> [Result<MotionPlan>; 2] {
        Axis::ALL.map(|axis| {
            let target = self.store.read_zero(axis);
            let result = self.execute(MotionRequest::Absolute { axis, target });
            if let Err(ref e) = result {
                warn!(%axis, "zero restore not dispatched: {}", e);
            }
            result
        })
    }

    /// Number of dispatched moves still running.
    pub fn in_flight(&self) -> usize {
        recover(self.in_flight.lock())
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }

    /// Stop accepting new moves. Running moves continue.
    pub fn close(&self) {
        self.accepting.store(false, Ordering::Release);
    }

    /// Wait up to `timeout` for every dispatched move to finish.
    ///
    /// Returns how many were still running at the deadline; those are left
    /// to finish on their own.
    pub fn join_all(&self, timeout: Duration) -> usize {
        let handles = std::mem::take(&mut *recover(self.in_flight.lock()));
        let deadline = Instant::now() + timeout;
        let mut unfinished = 0;

        for handle in handles {
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(1));
            }

            if handle.is_finished() {
                if handle.join().is_err() {
                    warn!("motion worker panicked");
                }
            } else {
                unfinished += 1;
            }
        }

        if unfinished > 0 {
            warn!(unfinished, "motions still running at shutdown deadline");
        }
        unfinished
    }
}

fn run_motion<O, D>(
    driver: &AxisDriver<O, D>,
    store: &AxisStateStore,
    plan: MotionPlan,
    epoch: u32,
    alerts: &Sender<MotionFault>,
) where
    O: OutputPin,
    D: DelayNs,
{
    let axis = driver.axis();
    let emitted = driver.emit_when_free(plan.direction, plan.step_count, || {
        store.plan_is_live(axis, epoch)
    });

    match emitted {
        None => warn!(
            %axis,
            planned = plan.step_count,
            "axis faulted while the move was queued, move dropped"
        ),
        Some(Ok(())) => {
            if store.commit_planned(axis, plan.target, epoch) {
                info!(
                    %axis,
                    angle = store.resolution().to_degrees(plan.target).0,
                    "motion complete"
                );
            }
        }
        Some(Err(error)) => report_fault(store, alerts, plan, error),
    }
}

fn report_fault(
    store: &AxisStateStore,
    alerts: &Sender<MotionFault>,
    plan: MotionPlan,
    error: HardwareError,
) {
    store.mark_faulted(plan.axis);
    error!(
        axis = %plan.axis,
        pulses_emitted = error.pulses_emitted,
        planned = plan.step_count,
        "emission failed, axis position unknown: {}",
        error
    );
    // Nobody listening is fine; the log line above is the alert of record.
    let _ = alerts.send(MotionFault { plan, error });
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{self, Receiver};

    use super::*;
    use crate::config::units::Resolution;
    use crate::gpio::sim::SimLine;
    use crate::gpio::{LineProvider, SimulatedChip, ThreadSleep};

    const RES: Resolution = Resolution::new(2);
    const WAIT: Duration = Duration::from_secs(5);

    type Executor = MotionExecutor<SimLine, ThreadSleep>;

    fn driver(chip: &mut SimulatedChip, axis: Axis, dir: u32, step: u32) -> AxisDriver<SimLine, ThreadSleep> {
        let dir = chip.request_output(dir, "dir").unwrap();
        let step = chip.request_output(step, "step").unwrap();
        AxisDriver::new(
            axis,
            PulseGenerator::new(step, dir, ThreadSleep, PulseConfig::new(1, 1)),
        )
    }

    fn executor() -> (Executor, SimulatedChip, Receiver<MotionFault>) {
        let mut chip = SimulatedChip::new(8);
        let (tx, rx) = mpsc::channel();
        let executor = MotionExecutor::new(
            Arc::new(AxisStateStore::new(RES)),
            driver(&mut chip, Axis::Horizontal, 0, 1),
            driver(&mut chip, Axis::Vertical, 2, 3),
            tx,
        );
        (executor, chip, rx)
    }

    #[test]
    fn test_relative_move_commits_after_emission() {
        let (executor, chip, _alerts) = executor();

        let plan = executor
            .execute(MotionRequest::Relative {
                axis: Axis::Horizontal,
                degrees: 90,
                direction: Direction::Clockwise,
            })
            .unwrap();
        assert_eq!(plan.step_count, 180);

        assert_eq!(executor.join_all(WAIT), 0);
        assert_eq!(executor.store().read_degrees(Axis::Horizontal).value(), 90.0);
        assert_eq!(chip.rising_edges(1), 180);
        assert!(chip.level(0), "clockwise sets DIR high");
        assert_eq!(chip.rising_edges(3), 0);
    }

    #[test]
    fn test_absolute_move_commits_exact_target() {
        let (executor, chip, _alerts) = executor();
        executor.store().commit_degrees(Axis::Vertical, 350);

        let plan = executor
            .execute(MotionRequest::Absolute {
                axis: Axis::Vertical,
                target: RES.steps(10),
            })
            .unwrap();
        assert_eq!(plan.direction, Direction::Clockwise);
        assert_eq!(plan.step_count, 40);

        executor.join_all(WAIT);
        assert_eq!(executor.store().read(Axis::Vertical), RES.steps(10));
        assert_eq!(chip.rising_edges(3), 40);
    }

    #[test]
    fn test_failed_emission_freezes_axis_and_alerts() {
        let (executor, chip, alerts) = executor();
        chip.inject_fault(1);

        executor
            .execute(MotionRequest::Relative {
                axis: Axis::Horizontal,
                degrees: 45,
                direction: Direction::Clockwise,
            })
            .unwrap();
        executor.join_all(WAIT);

        let fault = alerts.recv_timeout(WAIT).unwrap();
        assert_eq!(fault.plan.axis, Axis::Horizontal);
        assert_eq!(fault.error.axis, Some(Axis::Horizontal));
        assert_eq!(fault.error.pulses_emitted, 0);

        // Angle not committed, further moves rejected
        assert_eq!(executor.store().read(Axis::Horizontal), Steps(0));
        assert!(executor.store().is_faulted(Axis::Horizontal));
        assert_eq!(
            executor.execute(MotionRequest::Absolute {
                axis: Axis::Horizontal,
                target: Steps(0),
            }),
            Err(Error::Motion(MotionError::AxisFaulted(Axis::Horizontal)))
        );
        // The other axis is unaffected
        assert!(executor
            .execute(MotionRequest::Absolute {
                axis: Axis::Vertical,
                target: RES.steps(5),
            })
            .is_ok());
        executor.join_all(WAIT);
    }

    #[test]
    fn test_step_once_advances_one_step() {
        let (executor, chip, _alerts) = executor();

        let outcome = executor.step_once(Axis::Vertical, Direction::Clockwise).unwrap();
        assert_eq!(outcome, NudgeOutcome::Stepped(Steps(1)));
        assert_eq!(chip.rising_edges(3), 1);
        assert_eq!(executor.store().read_degrees(Axis::Vertical).value(), 0.5);
    }

    #[test]
    fn test_step_once_skips_busy_axis() {
        let (executor, chip, _alerts) = executor();
        let guard = recover(executor.driver(Axis::Horizontal).generator.lock());

        let outcome = executor.step_once(Axis::Horizontal, Direction::Clockwise).unwrap();
        assert_eq!(outcome, NudgeOutcome::Busy);
        drop(guard);

        assert_eq!(chip.rising_edges(1), 0);
        assert_eq!(executor.store().read(Axis::Horizontal), Steps(0));
    }

    #[test]
    fn test_step_once_failure_faults_axis() {
        let (executor, chip, alerts) = executor();
        chip.inject_fault(3);

        let err = executor.step_once(Axis::Vertical, Direction::Clockwise).unwrap_err();
        assert_eq!(err.axis, Some(Axis::Vertical));
        assert!(executor.store().is_faulted(Axis::Vertical));
        assert!(alerts.try_recv().is_ok());

        assert_eq!(
            executor.step_once(Axis::Vertical, Direction::Clockwise),
            Ok(NudgeOutcome::Faulted)
        );
    }

    #[test]
    fn test_restore_zero_moves_both_axes() {
        let (executor, _chip, _alerts) = executor();
        executor.store().commit_degrees(Axis::Horizontal, 30);
        executor.store().commit_degrees(Axis::Vertical, 200);
        executor.store_zero();
        executor.store().commit_degrees(Axis::Horizontal, 100);
        executor.store().commit_degrees(Axis::Vertical, 10);

        let [horizontal, vertical] = executor.restore_zero();
        assert_eq!(horizontal.unwrap().direction, Direction::CounterClockwise);
        assert_eq!(vertical.unwrap().direction, Direction::CounterClockwise);

        executor.join_all(WAIT);
        assert_eq!(executor.store().read_degrees(Axis::Horizontal).value(), 30.0);
        assert_eq!(executor.store().read_degrees(Axis::Vertical).value(), 200.0);
    }

    #[test]
    fn test_closed_executor_rejects_moves() {
        let (executor, _chip, _alerts) = executor();
        executor.close();

        assert_eq!(
            executor.execute(MotionRequest::Absolute {
                axis: Axis::Horizontal,
                target: Steps(10),
            }),
            Err(Error::Motion(MotionError::ShuttingDown))
        );
        assert_eq!(executor.in_flight(), 0);
    }

    #[test]
    fn test_queued_moves_dropped_after_fault() {
        let (executor, chip, _alerts) = executor();
        let guard = recover(executor.driver(Axis::Horizontal).generator.lock());

        // Both wait behind the held lines
        for degrees in [50, 10] {
            executor
                .execute(MotionRequest::Relative {
                    axis: Axis::Horizontal,
                    degrees,
                    direction: Direction::Clockwise,
                })
                .unwrap();
        }
        executor.store().mark_faulted(Axis::Horizontal);
        executor.store().clear_fault(Axis::Horizontal, RES.steps(45));
        drop(guard);

        assert_eq!(executor.join_all(WAIT), 0);
        assert_eq!(chip.rising_edges(1), 0);
        assert_eq!(executor.store().read(Axis::Horizontal), RES.steps(45));

        // Moves planned after the clear run normally
        executor
            .execute(MotionRequest::Relative {
                axis: Axis::Horizontal,
                degrees: 10,
                direction: Direction::Clockwise,
            })
            .unwrap();
        executor.join_all(WAIT);
        assert_eq!(chip.rising_edges(1), 20);
        assert_eq!(executor.store().read(Axis::Horizontal), RES.steps(55));
    }

    #[test]
    fn test_overlapping_moves_last_commit_wins() {
        let (executor, _chip, _alerts) = executor();

        // Both read the angle before either commits
        let long = executor
            .execute(MotionRequest::Relative {
                axis: Axis::Horizontal,
                degrees: 90,
                direction: Direction::Clockwise,
            })
            .unwrap();
        let short = executor
            .execute(MotionRequest::Relative {
                axis: Axis::Horizontal,
                degrees: 10,
                direction: Direction::Clockwise,
            })
            .unwrap();
        assert_eq!(long.origin, Steps(0));
        assert_eq!(short.origin, Steps(0));

        executor.join_all(WAIT);
        let angle = executor.store().read(Axis::Horizontal);
        assert!(angle == long.target || angle == short.target);
    }
}
