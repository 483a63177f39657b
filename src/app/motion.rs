//! Smooth-transition planning between two servo angles.
//!
//! A [`MotionPlan`] turns a (start, target) pair into the exact command
//! sequence the servo receives: a run of evenly spaced intermediate
//! angles followed by one final command that lands exactly on the
//! target.  The plan is ephemeral — derived fresh for every slot change
//! and discarded once executed.
//!
//! The intermediate step count is `distance / step_size` (floor) minus
//! one, saturating at zero.  The deliberate under-shoot means the final
//! command may cover more than one step's distance, which guarantees the
//! servo always ends exactly on the calibrated target even when the
//! distance is not a multiple of the step size.  The saturation also
//! covers distances smaller than one step: those plans have no
//! intermediate commands at all and jump straight to the target.

/// Upper bound of the servo's physical range, degrees.
pub const ANGLE_MAX: u8 = 180;

/// An ephemeral description of one smooth transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionPlan {
    start: u8,
    target: u8,
    step_size: u8,
    steps: u8,
    step_delay_ms: u32,
}

impl MotionPlan {
    /// Plan a transition from `start` to `target`, both already known to
    /// be within 0..=180.
    pub fn between(start: u8, target: u8, step_size: u8, step_delay_ms: u32) -> Self {
        let distance = start.abs_diff(target);
        let steps = if step_size == 0 {
            0
        } else {
            (distance / step_size).saturating_sub(1)
        };
        Self {
            start,
            target,
            step_size,
            steps,
            step_delay_ms,
        }
    }

    /// A stationary plan performs no motion at all.
    pub fn is_stationary(&self) -> bool {
        self.start == self.target
    }

    /// Number of intermediate commands before the final jump.
    pub fn step_count(&self) -> u8 {
        self.steps
    }

    /// Pause between intermediate commands, milliseconds.
    pub fn step_delay_ms(&self) -> u32 {
        self.step_delay_ms
    }

    /// The angle the final command lands on.
    pub fn target(&self) -> u8 {
        self.target
    }

    /// Worst-case blocking duration of the transition, milliseconds.
    pub fn duration_ms(&self) -> u32 {
        u32::from(self.steps) * self.step_delay_ms
    }

    /// The evenly spaced intermediate angles, in command order.
    pub fn intermediates(&self) -> impl Iterator<Item = u8> + use<> {
        let Self {
            start,
            target,
            step_size,
            steps,
            ..
        } = *self;
        (1..=u16::from(steps)).map(move |i| {
            let offset = i * u16::from(step_size);
            if target >= start {
                (u16::from(start) + offset) as u8
            } else {
                (u16::from(start) - offset) as u8
            }
        })
    }

    /// The full command sequence: intermediates, then the exact target.
    /// Empty for a stationary plan.
    pub fn commands(&self) -> impl Iterator<Item = u8> + use<> {
        let terminal = if self.is_stationary() {
            None
        } else {
            Some(self.target)
        };
        self.intermediates().chain(terminal)
    }
}
