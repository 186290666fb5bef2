// Velocity state shared between the keyboard reader and the publish timer
//
// The reader is the only writer; the publisher takes a copy every tick.
// The whole record lives behind one mutex so the four intent components
// always change together, and the lock is only held for a copy.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::{INITIAL_SPEED, INITIAL_TURN};

/// Unscaled direction from the most recent recognized key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct VelocityIntent {
    pub x: i8,
    pub y: i8,
    pub z: i8,
    pub th: i8, // yaw
}

impl VelocityIntent {
    pub const STOP: Self = Self::new(0, 0, 0, 0);

    pub const fn new(x: i8, y: i8, z: i8, th: i8) -> Self {
        Self { x, y, z, th }
    }

    pub fn is_stop(&self) -> bool {
        *self == Self::STOP
    }
}

/// Multipliers applied by a speed key: (linear, angular)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub linear: f64,
    pub angular: f64,
}

impl ScaleFactors {
    pub const fn new(linear: f64, angular: f64) -> Self {
        Self { linear, angular }
    }
}

/// Current linear/angular speeds. Never clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedScale {
    pub linear: f64,
    pub angular: f64,
}

impl Default for SpeedScale {
    fn default() -> Self {
        Self {
            linear: INITIAL_SPEED,
            angular: INITIAL_TURN,
        }
    }
}

impl SpeedScale {
    pub fn apply(&mut self, factors: ScaleFactors) {
        self.linear *= factors.linear;
        self.angular *= factors.angular;
    }

    /// Status line printed after every speed change
    pub fn status_line(&self) -> String {
        format!("currently:\tspeed {:.2}\tturn {:.2}", self.linear, self.angular)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VelocityState {
    pub intent: VelocityIntent,
    pub scale: SpeedScale,
}

/// Cloneable handle to the one velocity record of a session
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<VelocityState>>,
}

impl SharedState {
    pub fn new(initial: VelocityState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    // Every critical section is a plain copy, so a panic while holding the
    // lock cannot leave the record half-written.
    fn lock(&self) -> MutexGuard<'_, VelocityState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Consistent copy of intent and scale
    pub fn snapshot(&self) -> VelocityState {
        *self.lock()
    }

    pub fn set_intent(&self, intent: VelocityIntent) {
        self.lock().intent = intent;
    }

    pub fn stop(&self) {
        self.set_intent(VelocityIntent::STOP);
    }

    /// Multiply the scales and return the new values
    pub fn scale_by(&self, factors: ScaleFactors) -> SpeedScale {
        let mut state = self.lock();
        state.scale.apply(factors);
        state.scale
    }
}
