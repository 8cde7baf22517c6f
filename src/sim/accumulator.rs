//! Sustained-condition timers
//!
//! An [`Accumulator`] counts how long a condition has held. Levels tick it
//! with the real time since their previous tick (see [`TickClock`]), never a
//! fixed per-event increment.

use serde::{Deserialize, Serialize};

/// How a false tick affects accumulated time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccumulatorMode {
    /// Any false tick zeroes the elapsed time
    ResetOnBreak,
    /// False ticks are ignored; time only ever grows within a level
    Monotonic,
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorState {
    /// Condition failed and elapsed time was zeroed
    Broken,
    /// Below the requirement
    Building,
    /// Reached the requirement on this tick
    Crossed,
    /// Reached the requirement on an earlier tick
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Accumulator {
    mode: AccumulatorMode,
    required_ms: f64,
    elapsed_ms: f64,
    crossed: bool,
}

impl Accumulator {
    pub fn new(mode: AccumulatorMode, required_ms: f64) -> Self {
        Self {
            mode,
            required_ms,
            elapsed_ms: 0.0,
            crossed: false,
        }
    }

    pub fn reset_on_break(required_ms: f64) -> Self {
        Self::new(AccumulatorMode::ResetOnBreak, required_ms)
    }

    pub fn monotonic(required_ms: f64) -> Self {
        Self::new(AccumulatorMode::Monotonic, required_ms)
    }

    /// Advance by `dt_ms` if `held`. Crossing the requirement is reported
    /// exactly once; the timer freezes afterwards.
    pub fn tick(&mut self, held: bool, dt_ms: f64) -> AccumulatorState {
        if self.crossed {
            return AccumulatorState::Done;
        }

        if !held {
            return match self.mode {
                AccumulatorMode::ResetOnBreak => {
                    self.elapsed_ms = 0.0;
                    AccumulatorState::Broken
                }
                AccumulatorMode::Monotonic => AccumulatorState::Building,
            };
        }

        self.elapsed_ms += dt_ms.max(0.0);
        if self.elapsed_ms >= self.required_ms {
            self.crossed = true;
            AccumulatorState::Crossed
        } else {
            AccumulatorState::Building
        }
    }

    /// Back to zero (level restart)
    pub fn reset(&mut self) {
        self.elapsed_ms = 0.0;
        self.crossed = false;
    }

    pub fn mode(&self) -> AccumulatorMode {
        self.mode
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn required_ms(&self) -> f64 {
        self.required_ms
    }

    pub fn is_complete(&self) -> bool {
        self.crossed
    }

    /// Progress in 0..=1
    pub fn ratio(&self) -> f32 {
        if self.required_ms <= 0.0 {
            return 1.0;
        }
        (self.elapsed_ms / self.required_ms).clamp(0.0, 1.0) as f32
    }
}

/// Measures real time between a level's ticks
#[derive(Debug, Clone)]
pub struct TickClock {
    last_ms: Option<f64>,
    max_dt_ms: f64,
}

impl TickClock {
    /// `max_dt_ms` caps one delta so a stalled tab cannot grant a big jump
    pub fn new(max_dt_ms: f64) -> Self {
        Self {
            last_ms: None,
            max_dt_ms,
        }
    }

    /// No cap, for levels timed purely by sensor events. A hidden tab shuts
    /// those levels down, so a gap here is real time with the sensor live.
    pub fn unclamped() -> Self {
        Self::new(f64::INFINITY)
    }

    /// Anchor the clock at level start
    pub fn start(&mut self, now_ms: f64) {
        self.last_ms = Some(now_ms);
    }

    /// Time since the previous call (0 on the first call)
    pub fn delta(&mut self, now_ms: f64) -> f64 {
        let dt = match self.last_ms {
            Some(last) => (now_ms - last).clamp(0.0, self.max_dt_ms),
            None => 0.0,
        };
        self.last_ms = Some(now_ms);
        dt
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}
