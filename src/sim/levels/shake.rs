//! Level 3: "Wake what sleeps."
//!
//! Shaking time only ever adds up; pausing costs nothing.

use crate::config::ShakeTuning;
use crate::error::Result;
use crate::platform::{Handles, Input, SensorHost, SensorKind};
use crate::sim::accumulator::{Accumulator, AccumulatorState, TickClock};
use crate::sim::detect::ShakeDetector;

use super::{Level, LevelContext, LevelKind, Reveal, Step};

pub struct ShakeLevel {
    digit: String,
    detector: ShakeDetector,
    timer: Accumulator,
    clock: TickClock,
    handles: Handles,
}

impl ShakeLevel {
    pub fn new(digit: String, tuning: &ShakeTuning) -> Self {
        Self {
            digit,
            detector: ShakeDetector::new(tuning.threshold),
            timer: Accumulator::monotonic(tuning.required_ms),
            clock: TickClock::unclamped(),
            handles: Handles::new(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.timer.elapsed_ms()
    }
}

impl Level for ShakeLevel {
    fn kind(&self) -> LevelKind {
        LevelKind::Shake
    }

    fn start(&mut self, ctx: &mut LevelContext<'_>) -> Result<()> {
        self.detector.reset();
        self.timer.reset();
        self.clock.reset();
        self.handles.acquire(ctx.host, SensorKind::Motion)?;
        Ok(())
    }

    fn handle(&mut self, ctx: &mut LevelContext<'_>, input: &Input) -> Step {
        let Input::Motion(sample) = input else {
            return Step::Continue;
        };
        let dt = self.clock.delta(ctx.now_ms);
        let Some(shaking) = self.detector.is_shaking(*sample) else {
            return Step::Continue;
        };

        if ctx.debug {
            log::debug!(
                "Shake: magnitude {:.2}, {:.0}ms",
                self.detector.last_magnitude(),
                self.timer.elapsed_ms()
            );
        }
        match self.timer.tick(shaking, dt) {
            AccumulatorState::Crossed => Step::Complete(Reveal::Digit(self.digit.clone())),
            _ => Step::Continue,
        }
    }

    fn progress(&self) -> f32 {
        self.timer.ratio()
    }

    fn cleanup(&mut self, host: &mut dyn SensorHost) {
        self.handles.release_all(host);
    }
}
