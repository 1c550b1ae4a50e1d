//! Turntable facade.
//!
//! Claims every line named in a [`TurntableConfig`], wires the angle store,
//! executor and button monitor together, and exposes the operations the
//! request layer needs. Arguments are validated here, before anything is
//! dispatched.

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use serde::Serialize;
use tracing::{info, warn};

use crate::axis::{Axis, AxisStateStore, AxisStatus};
use crate::buttons::{ButtonMonitor, MonitorHandle};
use crate::config::units::{Degrees, Resolution, FULL_TURN_DEGREES};
use crate::config::{validate_config, AxisConfig, TurntableConfig};
use crate::error::{ConfigError, Error, MotionError, Result, ValidationError};
use crate::gpio::LineProvider;
use crate::motion::{
    AxisDriver, Direction, MotionExecutor, MotionFault, MotionPlan, MotionRequest, PulseGenerator,
};

/// Largest accepted relative move, one full turn.
pub const MAX_RELATIVE_DEGREES: i64 = FULL_TURN_DEGREES;

/// Largest accepted absolute target. 360 is rejected, use 0.
pub const MAX_ABSOLUTE_DEGREES: i64 = FULL_TURN_DEGREES - 1;

/// Answer to a relative move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RelativeMove {
    /// Axis moved.
    pub axis: Axis,
    /// Requested turn in degrees.
    pub angle_change: u16,
    /// Requested direction.
    pub direction: Direction,
    /// Angle the axis should end at, based on the angle read at dispatch.
    pub new_angle_estimate: Degrees,
}

/// Answer to an absolute move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AbsoluteMove {
    /// Axis moved.
    pub axis: Axis,
    /// Angle read at dispatch.
    pub from_angle: Degrees,
    /// Requested target.
    pub to_angle: Degrees,
    /// Direction of the shorter arc.
    pub direction: Direction,
    /// Step pulses dispatched.
    pub steps: u32,
}

/// Snapshot of both axes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    /// Horizontal angle in degrees.
    pub horizontal_angle: Degrees,
    /// Vertical angle in degrees.
    pub vertical_angle: Degrees,
    /// Axes whose position was lost.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub faulted: Vec<Axis>,
}

/// Stored zero references of both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZeroReferences {
    /// Horizontal zero in degrees.
    pub horizontal: Degrees,
    /// Vertical zero in degrees.
    pub vertical: Degrees,
}

/// Two-axis turntable built from configuration.
///
/// # Example
///
/// ```rust,ignore
/// use turntable_motion::{Axis, Direction, Turntable, TurntableConfig};
/// use turntable_motion::gpio::{SimulatedChip, ThreadSleep};
///
/// let mut turntable = Turntable::new(TurntableConfig::default(), SimulatedChip::default(), ThreadSleep)?;
/// turntable.start_buttons()?;
///
/// let reply = turntable.rotate_relative(Axis::Horizontal, 90, Direction::Clockwise)?;
/// println!("heading for {}", reply.new_angle_estimate.value());
///
/// turntable.shutdown(Duration::from_secs(5));
/// ```
pub struct Turntable<P, D>
where
    P: LineProvider,
    D: DelayNs + Clone + Send + 'static,
{
    config: TurntableConfig,
    executor: Arc<MotionExecutor<P::Output, D>>,
    pending_buttons: Option<ButtonMonitor<P::Input, P::Output, D>>,
    monitor: Option<MonitorHandle>,
    alerts: Option<Receiver<MotionFault>>,
    _provider: P,
}

impl<P, D> Turntable<P, D>
where
    P: LineProvider,
    D: DelayNs + Clone + Send + 'static,
{
    /// Validate `config` and claim every line it names from `provider`.
    ///
    /// The button monitor is built but not started; see
    /// [`Turntable::start_buttons`].
    ///
    /// # Errors
    ///
    /// Any configuration error, including a line that cannot be claimed.
    /// Lines claimed before the failure are released.
    pub fn new(config: TurntableConfig, mut provider: P, delay: D) -> Result<Self> {
        validate_config(&config)?;
        if provider.chip() != config.chip.as_str() {
            return Err(Error::Config(ConfigError::ChipMismatch {
                expected: config.chip.to_string(),
                found: provider.chip().to_string(),
            }));
        }

        let store = Arc::new(AxisStateStore::new(config.resolution()));
        let horizontal = claim_axis(
            &mut provider,
            Axis::Horizontal,
            &config,
            delay.clone(),
            ("h_dir", "h_step"),
        )?;
        let vertical = claim_axis(
            &mut provider,
            Axis::Vertical,
            &config,
            delay,
            ("v_dir", "v_step"),
        )?;

        let (tx, rx) = mpsc::channel();
        let executor = Arc::new(MotionExecutor::new(store, horizontal, vertical, tx));

        let pending_buttons = match &config.buttons {
            Some(buttons) => Some(ButtonMonitor::new(
                Arc::clone(&executor),
                provider.request_input(buttons.horizontal_line, "h_button")?,
                provider.request_input(buttons.vertical_line, "v_button")?,
                provider.request_input(buttons.reset_line, "reset_button")?,
                buttons,
            )),
            None => None,
        };

        info!(
            chip = %config.chip,
            steps_per_degree = config.steps_per_degree,
            lines = config.lines().count(),
            "turntable ready"
        );

        Ok(Self {
            config,
            executor,
            pending_buttons,
            monitor: None,
            alerts: Some(rx),
            _provider: provider,
        })
    }

    /// Configuration in use.
    #[inline]
    pub fn config(&self) -> &TurntableConfig {
        &self.config
    }

    /// Angular resolution of both axes.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.config.resolution()
    }

    fn store(&self) -> &AxisStateStore {
        self.executor.store()
    }

    /// Turn `axis` by `degrees` (`0..=360`) in `direction`.
    ///
    /// Returns once the move is dispatched. The estimate is computed from
    /// the angle read now and may be overtaken by a concurrent move.
    ///
    /// # Errors
    ///
    /// `ValidationError::AngleOutOfRange` for a bad angle, or a
    /// [`MotionError`] if the move could not be dispatched.
    pub fn rotate_relative(
        &self,
        axis: Axis,
        degrees: i64,
        direction: Direction,
    ) -> Result<RelativeMove> {
        let degrees = check_range(degrees, MAX_RELATIVE_DEGREES)?;
        let angle_change = degrees as u16;

        let plan = self.executor.execute(MotionRequest::Relative {
            axis,
            degrees: angle_change,
            direction,
        })?;

        Ok(RelativeMove {
            axis,
            angle_change,
            direction,
            new_angle_estimate: self.resolution().to_degrees(plan.target),
        })
    }

    /// Turn `axis` to `target` degrees (`0..=359`) along the shorter arc.
    ///
    /// # Errors
    ///
    /// `ValidationError::AngleOutOfRange` for a bad target, or a
    /// [`MotionError`] if the move could not be dispatched.
    pub fn rotate_absolute(&self, axis: Axis, target: i64) -> Result<AbsoluteMove> {
        let target = check_range(target, MAX_ABSOLUTE_DEGREES)?;
        let resolution = self.resolution();

        let plan = self.executor.execute(MotionRequest::Absolute {
            axis,
            target: resolution.steps(target),
        })?;

        Ok(AbsoluteMove {
            axis,
            from_angle: resolution.to_degrees(plan.origin),
            to_angle: resolution.to_degrees(plan.target),
            direction: plan.direction,
            steps: plan.step_count,
        })
    }

    /// Current angles of both axes.
    pub fn status(&self) -> Status {
        let snapshot = self.store().snapshot();
        Status {
            horizontal_angle: snapshot[Axis::Horizontal.index()].angle,
            vertical_angle: snapshot[Axis::Vertical.index()].angle,
            faulted: Axis::ALL
                .into_iter()
                .filter(|axis| snapshot[axis.index()].faulted)
                .collect(),
        }
    }

    /// Full state of one axis.
    pub fn axis_status(&self, axis: Axis) -> AxisStatus {
        self.store().snapshot()[axis.index()]
    }

    /// Stored zero references.
    pub fn zero_references(&self) -> ZeroReferences {
        let resolution = self.resolution();
        ZeroReferences {
            horizontal: resolution.to_degrees(self.store().read_zero(Axis::Horizontal)),
            vertical: resolution.to_degrees(self.store().read_zero(Axis::Vertical)),
        }
    }

    /// Remember the current angles as zero references, as a long press does.
    pub fn store_zero(&self) -> ZeroReferences {
        self.executor.store_zero();
        self.zero_references()
    }

    /// Send both axes to their zero references, as a short press does.
    ///
    /// Plans are returned per axis, horizontal first.
    pub fn restore_zero(&self) -> [Result<MotionPlan>; 2] {
        self.executor.restore_zero()
    }

    /// Unfreeze a faulted axis after the operator has re-homed it by hand.
    ///
    /// `degrees` (`0..=359`) is where the axis physically is now.
    ///
    /// # Errors
    ///
    /// `ValidationError::AngleOutOfRange` for a bad angle.
    pub fn clear_fault(&self, axis: Axis, degrees: i64) -> Result<()> {
        let degrees = check_range(degrees, MAX_ABSOLUTE_DEGREES)?;
        let steps = self.resolution().steps(degrees);
        self.store().clear_fault(axis, steps);
        info!(%axis, angle = degrees, "fault cleared");
        Ok(())
    }

    /// Start polling the buttons on a background thread.
    ///
    /// Returns `false` if no buttons are configured. Calling it again while
    /// the monitor runs does nothing.
    ///
    /// # Errors
    ///
    /// `MotionError::SpawnFailed` if the thread could not be started.
    pub fn start_buttons(&mut self) -> Result<bool> {
        if self.monitor.is_some() {
            return Ok(true);
        }
        let Some(monitor) = self.pending_buttons.take() else {
            return Ok(false);
        };

        let handle = monitor.spawn().map_err(|e| {
            warn!("failed to start button monitor: {}", e);
            Error::Motion(MotionError::SpawnFailed)
        })?;
        self.monitor = Some(handle);
        Ok(true)
    }

    /// Whether the button monitor thread is running.
    pub fn buttons_running(&self) -> bool {
        self.monitor.as_ref().map_or(false, MonitorHandle::is_running)
    }

    /// Take the receiving end of the fault alert channel.
    ///
    /// Only the first call gets it.
    pub fn take_alerts(&mut self) -> Option<Receiver<MotionFault>> {
        self.alerts.take()
    }

    /// Number of dispatched moves still running.
    pub fn in_flight(&self) -> usize {
        self.executor.in_flight()
    }

    /// Stop the buttons, wait up to `timeout` for running moves, and release
    /// every line.
    ///
    /// Returns how many moves were still running at the deadline. Their axis
    /// lines are released when they finish.
    pub fn shutdown(mut self, timeout: Duration) -> usize {
        self.stop_monitor();
        self.executor.close();
        let unfinished = self.executor.join_all(timeout);
        info!(unfinished, "turntable shut down");
        unfinished
    }

    fn stop_monitor(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.stop();
        }
        self.pending_buttons = None;
    }
}

impl<P, D> Drop for Turntable<P, D>
where
    P: LineProvider,
    D: DelayNs + Clone + Send + 'static,
{
    fn drop(&mut self) {
        self.stop_monitor();
        self.executor.close();
    }
}

fn claim_axis<P, D>(
    provider: &mut P,
    axis: Axis,
    config: &TurntableConfig,
    delay: D,
    (dir_label, step_label): (&str, &str),
) -> Result<AxisDriver<P::Output, D>>
where
    P: LineProvider,
    D: DelayNs,
{
    let AxisConfig {
        dir_line,
        step_line,
        invert_direction,
    } = *config.axes.get(axis);

    let dir = provider.request_output(dir_line, dir_label)?;
    let step = provider.request_output(step_line, step_label)?;

    let generator =
        PulseGenerator::new(step, dir, delay, config.pulse).invert_direction(invert_direction);
    Ok(AxisDriver::new(axis, generator))
}

fn check_range(angle: i64, max: i64) -> core::result::Result<i64, ValidationError> {
    if (0..=max).contains(&angle) {
        Ok(angle)
    } else {
        Err(ValidationError::AngleOutOfRange { angle, min: 0, max })
    }
}
