//! Level 1: "Begin where nothing moves..."
//!
//! Frame ticks add real time while the device is still; any moving
//! accelerometer sample zeroes the timer on the spot.

use crate::config::StillnessTuning;
use crate::error::Result;
use crate::platform::{Handles, Input, SensorHost, SensorKind};
use crate::sim::accumulator::{Accumulator, AccumulatorState, TickClock};
use crate::sim::detect::StillnessDetector;

use super::{Level, LevelContext, LevelKind, Reveal, Step};

pub struct StillnessLevel {
    digit: String,
    detector: StillnessDetector,
    timer: Accumulator,
    clock: TickClock,
    handles: Handles,
}

impl StillnessLevel {
    pub fn new(digit: String, tuning: &StillnessTuning, max_tick_ms: f64) -> Self {
        Self {
            digit,
            detector: StillnessDetector::new(tuning.threshold),
            timer: Accumulator::reset_on_break(tuning.required_ms),
            clock: TickClock::new(max_tick_ms),
            handles: Handles::new(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.timer.elapsed_ms()
    }
}

impl Level for StillnessLevel {
    fn kind(&self) -> LevelKind {
        LevelKind::Stillness
    }

    fn start(&mut self, ctx: &mut LevelContext<'_>) -> Result<()> {
        self.detector.reset();
        self.timer.reset();
        self.clock.start(ctx.now_ms);
        self.handles.acquire(ctx.host, SensorKind::Motion)?;
        Ok(())
    }

    fn handle(&mut self, ctx: &mut LevelContext<'_>, input: &Input) -> Step {
        match input {
            Input::Motion(sample) => {
                if self.detector.is_moving(*sample) == Some(true) {
                    if ctx.debug {
                        log::debug!("Stillness broken at {:.0}ms", self.timer.elapsed_ms());
                    }
                    self.timer.tick(false, 0.0);
                    self.clock.start(ctx.now_ms);
                }
                Step::Continue
            }
            Input::Frame => {
                let dt = self.clock.delta(ctx.now_ms);
                match self.timer.tick(true, dt) {
                    AccumulatorState::Crossed => Step::Complete(Reveal::Digit(self.digit.clone())),
                    _ => Step::Continue,
                }
            }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{MotionSample, ScriptedHost};
    use crate::sim::levels::test_support::Harness;

    fn level() -> StillnessLevel {
        StillnessLevel::new("7".into(), &StillnessTuning::default(), 100.0)
    }

    fn frames(h: &mut Harness, level: &mut StillnessLevel, from: f64, to: f64) -> Option<Step> {
        let mut t = from;
        while t <= to {
            let step = h.feed(level, t, Input::Frame);
            if !matches!(step, Step::Continue) {
                return Some(step);
            }
            t += 16.0;
        }
        None
    }

    #[test]
    fn test_still_for_a_second_completes() {
        let mut h = Harness::new(ScriptedHost::new());
        let mut level = level();
        h.start(&mut level, 0.0).unwrap();
        assert!(h.host.is_live(SensorKind::Motion));

        h.feed(&mut level, 5.0, Input::Motion(MotionSample::new(0.0, 9.8, 0.0)));
        match frames(&mut h, &mut level, 16.0, 1100.0) {
            Some(Step::Complete(Reveal::Digit(d))) => assert_eq!(d, "7"),
            other => panic!("expected completion, got {:?}", other),
        }

        level.cleanup(&mut h.host);
        assert_eq!(h.host.live_count(), 0);
    }

    #[test]
    fn test_movement_resets_progress() {
        let mut h = Harness::new(ScriptedHost::new());
        let mut level = level();
        h.start(&mut level, 0.0).unwrap();
        h.feed(&mut level, 1.0, Input::Motion(MotionSample::new(0.0, 9.8, 0.0)));

        assert!(frames(&mut h, &mut level, 16.0, 896.0).is_none());
        assert!(level.elapsed_ms() > 850.0);

        h.feed(&mut level, 900.0, Input::Motion(MotionSample::new(1.0, 9.8, 0.0)));
        assert_eq!(level.elapsed_ms(), 0.0);
        assert_eq!(level.progress(), 0.0);

        // Needs a full second again from the move
        assert!(frames(&mut h, &mut level, 912.0, 1880.0).is_none());
        assert!(frames(&mut h, &mut level, 1896.0, 1950.0).is_some());
    }

    #[test]
    fn test_priming_sample_never_resets() {
        let mut h = Harness::new(ScriptedHost::new());
        let mut level = level();
        h.start(&mut level, 0.0).unwrap();
        frames(&mut h, &mut level, 16.0, 496.0);
        h.feed(&mut level, 500.0, Input::Motion(MotionSample::new(3.0, 9.8, 2.0)));
        assert!(level.elapsed_ms() >= 496.0);
    }
}
