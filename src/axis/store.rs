//! Shared angle state of both axes.
//!
//! Every writer (dispatched motions, the button monitor, the zero gesture)
//! goes through this store. Each call takes the lock once, so a single read
//! or commit is atomic. Whole motions are not serialized: two moves on the
//! same axis may both plan from the same reading, and whichever commits last
//! wins.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{trace, warn};

use crate::config::units::{Degrees, Resolution, Steps};

use super::position::AngleState;
use super::Axis;

/// Snapshot of one axis for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisStatus {
    /// Current angle in degrees, in `[0, 360)`.
    pub angle: Degrees,
    /// Stored zero reference in degrees.
    pub zero_reference: Degrees,
    /// Position lost after a failed emission.
    pub faulted: bool,
}

/// Mutex-guarded angle state for both axes.
#[derive(Debug)]
pub struct AxisStateStore {
    resolution: Resolution,
    states: Mutex<[AngleState; 2]>,
}

impl AxisStateStore {
    /// Create a store with both axes at 0 and zero references at 0.
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            states: Mutex::new([AngleState::new(); 2]),
        }
    }

    /// Resolution used to wrap and convert angles.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    // Values are plain integers, a panic mid-update cannot leave them torn.
    fn lock(&self) -> MutexGuard<'_, [AngleState; 2]> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Latest committed angle of an axis, in steps.
    pub fn read(&self, axis: Axis) -> Steps {
        self.lock()[axis.index()].current()
    }

    /// Latest committed angle of an axis, in degrees.
    pub fn read_degrees(&self, axis: Axis) -> Degrees {
        self.resolution.to_degrees(self.read(axis))
    }

    /// Replace the angle of an axis, wrapping it to one revolution.
    ///
    /// Returns `false` without writing if the axis is faulted.
    pub fn commit(&self, axis: Axis, steps: Steps) -> bool {
        let mut states = self.lock();
        let state = &mut states[axis.index()];
        if state.is_faulted() {
            warn!(%axis, steps = steps.0, "axis faulted, commit dropped");
            return false;
        }
        state.set_current(steps, self.resolution);
        trace!(%axis, steps = state.current().0, "angle committed");
        true
    }

    /// Angle of an axis together with its fault epoch, read under one lock.
    ///
    /// The epoch is what a planned move hands back to
    /// [`AxisStateStore::commit_planned`].
    pub fn read_for_plan(&self, axis: Axis) -> (Steps, u32) {
        let state = self.lock()[axis.index()];
        (state.current(), state.epoch())
    }

    /// Whether a move planned at `epoch` may still drive the axis: it is not
    /// faulted and no fault happened since the plan was made.
    pub fn plan_is_live(&self, axis: Axis, epoch: u32) -> bool {
        let state = self.lock()[axis.index()];
        !state.is_faulted() && state.epoch() == epoch
    }

    /// Commit the result of a move planned at `epoch`.
    ///
    /// Returns `false` without writing if the axis is faulted or has faulted
    /// since the plan was made; a position declared by
    /// [`AxisStateStore::clear_fault`] is never overwritten by an older plan.
    pub fn commit_planned(&self, axis: Axis, steps: Steps, epoch: u32) -> bool {
        let mut states = self.lock();
        let state = &mut states[axis.index()];
        if state.is_faulted() || state.epoch() != epoch {
            warn!(%axis, steps = steps.0, epoch, "stale plan, commit dropped");
            return false;
        }
        state.set_current(steps, self.resolution);
        trace!(%axis, steps = state.current().0, "angle committed");
        true
    }

    /// Replace the angle of an axis from whole degrees.
    pub fn commit_degrees(&self, axis: Axis, degrees: i64) -> bool {
        self.commit(axis, self.resolution.normalize_degrees(degrees))
    }

    /// Move the angle of an axis by `delta` steps in one locked update.
    ///
    /// Returns the new angle, or `None` if the axis is faulted.
    pub fn advance(&self, axis: Axis, delta: i64) -> Option<Steps> {
        let mut states = self.lock();
        let state = &mut states[axis.index()];
        if state.is_faulted() {
            return None;
        }
        state.move_steps(delta, self.resolution);
        Some(state.current())
    }

    /// Stored zero reference of an axis.
    pub fn read_zero(&self, axis: Axis) -> Steps {
        self.lock()[axis.index()].zero_reference()
    }

    /// Replace the zero reference of an axis.
    pub fn commit_zero(&self, axis: Axis, steps: Steps) {
        self.lock()[axis.index()].set_zero_reference(steps, self.resolution);
    }

    /// Copy the current angle of both axes into their zero references.
    ///
    /// Both copies happen under one lock so the pair is consistent.
    pub fn store_zero_all(&self) -> [Steps; 2] {
        let mut states = self.lock();
        for state in states.iter_mut() {
            let current = state.current();
            state.set_zero_reference(current, self.resolution);
        }
        [states[0].zero_reference(), states[1].zero_reference()]
    }

    /// Flag an axis whose position is no longer known.
    pub fn mark_faulted(&self, axis: Axis) {
        self.lock()[axis.index()].set_faulted();
    }

    /// Whether an axis is flagged as faulted.
    pub fn is_faulted(&self, axis: Axis) -> bool {
        self.lock()[axis.index()].is_faulted()
    }

    /// Clear a fault, declaring the axis to be at `steps`.
    pub fn clear_fault(&self, axis: Axis, steps: Steps) {
        self.lock()[axis.index()].recover(steps, self.resolution);
    }

    /// Consistent snapshot of both axes.
    pub fn snapshot(&self) -> [AxisStatus; 2] {
        let states = *self.lock();
        states.map(|state| AxisStatus {
            angle: state.degrees(self.resolution),
            zero_reference: self.resolution.to_degrees(state.zero_reference()),
            faulted: state.is_faulted(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use proptest::prelude::*;

    use super::*;

    fn store() -> AxisStateStore {
        AxisStateStore::new(Resolution::new(32))
    }

    #[test]
    fn test_initial_state() {
        let store = store();
        for axis in Axis::ALL {
            assert_eq!(store.read(axis), Steps(0));
            assert_eq!(store.read_zero(axis), Steps(0));
            assert!(!store.is_faulted(axis));
        }
    }

    #[test]
    fn test_commit_is_per_axis() {
        let store = store();
        store.commit_degrees(Axis::Horizontal, 90);
        assert_eq!(store.read_degrees(Axis::Horizontal).value(), 90.0);
        assert_eq!(store.read_degrees(Axis::Vertical).value(), 0.0);
    }

    #[test]
    fn test_store_zero_all_copies_current() {
        let store = store();
        store.commit_degrees(Axis::Horizontal, 45);
        store.commit_degrees(Axis::Vertical, 300);

        let zeros = store.store_zero_all();
        assert_eq!(zeros, [Steps(45 * 32), Steps(300 * 32)]);
        assert_eq!(store.read_zero(Axis::Vertical), Steps(300 * 32));
        // Angles are untouched
        assert_eq!(store.read(Axis::Horizontal), Steps(45 * 32));
    }

    #[test]
    fn test_faulted_axis_is_frozen() {
        let store = store();
        store.commit_degrees(Axis::Vertical, 10);
        store.mark_faulted(Axis::Vertical);

        assert!(!store.commit_degrees(Axis::Vertical, 20));
        assert_eq!(store.advance(Axis::Vertical, 1), None);
        assert_eq!(store.read_degrees(Axis::Vertical).value(), 10.0);

        store.clear_fault(Axis::Vertical, Steps(0));
        assert!(store.commit_degrees(Axis::Vertical, 20));
        assert_eq!(store.read_degrees(Axis::Vertical).value(), 20.0);
    }

    #[test]
    fn test_plan_from_before_a_fault_cannot_commit() {
        let store = store();
        let (_, epoch) = store.read_for_plan(Axis::Horizontal);
        assert!(store.plan_is_live(Axis::Horizontal, epoch));

        store.mark_faulted(Axis::Horizontal);
        assert!(!store.plan_is_live(Axis::Horizontal, epoch));
        store.clear_fault(Axis::Horizontal, Steps(45 * 32));

        assert!(!store.plan_is_live(Axis::Horizontal, epoch));
        assert!(!store.commit_planned(Axis::Horizontal, Steps(10 * 32), epoch));
        assert_eq!(store.read(Axis::Horizontal), Steps(45 * 32));

        let (current, epoch) = store.read_for_plan(Axis::Horizontal);
        assert_eq!(current, Steps(45 * 32));
        assert!(store.commit_planned(Axis::Horizontal, Steps(10 * 32), epoch));
        assert_eq!(store.read(Axis::Horizontal), Steps(10 * 32));
    }

    #[test]
    fn test_advance_wraps() {
        let store = store();
        store.commit(Axis::Horizontal, Steps(11519));
        assert_eq!(store.advance(Axis::Horizontal, 1), Some(Steps(0)));
    }

    #[test]
    fn test_concurrent_commits_never_tear() {
        let store = Arc::new(store());
        let values = [10_i64, 200, 359];

        let handles: Vec<_> = values
            .iter()
            .map(|&degrees| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        store.commit_degrees(Axis::Horizontal, degrees);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let last = store.read(Axis::Horizontal);
        assert!(values.iter().any(|&d| Steps(d * 32) == last));
    }

    #[test]
    fn test_later_commit_wins() {
        let store = store();
        store.commit_degrees(Axis::Horizontal, 90);
        store.commit_degrees(Axis::Horizontal, 30);
        assert_eq!(store.read_degrees(Axis::Horizontal).value(), 30.0);
    }

    proptest! {
        #[test]
        fn prop_commit_reads_back_wrapped(v in -100_000i64..100_000) {
            let store = store();
            store.commit_degrees(Axis::Vertical, v);
            prop_assert_eq!(store.read(Axis::Vertical), Steps(v.rem_euclid(360) * 32));
        }
    }
}
