//! Level 2: "Truth hides beneath the world."
//!
//! Hold the phone upside down in portrait. After an arming period the fill
//! starts; leaving the window resets both timers.

use crate::config::InversionTuning;
use crate::error::Result;
use crate::platform::{Handles, Input, SensorHost, SensorKind};
use crate::sim::accumulator::{Accumulator, AccumulatorState, TickClock};
use crate::sim::detect::InversionWindow;

use super::{Level, LevelContext, LevelKind, Reveal, Signal, Step};

pub struct InversionLevel {
    digit: String,
    window: InversionWindow,
    arm_ms: f64,
    armed_for_ms: f64,
    fill: Accumulator,
    clock: TickClock,
    handles: Handles,
}

impl InversionLevel {
    pub fn new(digit: String, tuning: &InversionTuning) -> Self {
        Self {
            digit,
            window: InversionWindow::new(tuning.beta_min, tuning.beta_max),
            arm_ms: tuning.arm_ms,
            armed_for_ms: 0.0,
            fill: Accumulator::reset_on_break(tuning.fill_ms),
            clock: TickClock::unclamped(),
            handles: Handles::new(),
        }
    }

    /// Arming must strictly exceed its requirement
    pub fn is_armed(&self) -> bool {
        self.armed_for_ms > self.arm_ms
    }

    pub fn fill_ms(&self) -> f64 {
        self.fill.elapsed_ms()
    }
}

impl Level for InversionLevel {
    fn kind(&self) -> LevelKind {
        LevelKind::Inversion
    }

    fn start(&mut self, ctx: &mut LevelContext<'_>) -> Result<()> {
        self.armed_for_ms = 0.0;
        self.fill.reset();
        self.clock.reset();
        self.handles.acquire(ctx.host, SensorKind::Orientation)?;
        Ok(())
    }

    fn handle(&mut self, ctx: &mut LevelContext<'_>, input: &Input) -> Step {
        let Input::Orientation(sample) = input else {
            return Step::Continue;
        };
        let dt = self.clock.delta(ctx.now_ms);

        if !self.window.contains(*sample) {
            self.armed_for_ms = 0.0;
            self.fill.tick(false, dt);
            return Step::Continue;
        }

        let was_armed = self.is_armed();
        self.armed_for_ms += dt;
        if !self.is_armed() {
            return Step::Continue;
        }
        if !was_armed {
            ctx.signal(Signal::Armed);
        }

        if ctx.debug {
            log::debug!(
                "Inverted: beta {:?}, fill {:.0}ms",
                sample.beta,
                self.fill.elapsed_ms()
            );
        }
        match self.fill.tick(true, dt) {
            AccumulatorState::Crossed => Step::Complete(Reveal::Digit(self.digit.clone())),
            _ => Step::Continue,
        }
    }

    fn progress(&self) -> f32 {
        self.fill.ratio()
    }

    fn cleanup(&mut self, host: &mut dyn SensorHost) {
        self.handles.release_all(host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{OrientationSample, ScriptedHost};
    use crate::sim::levels::test_support::Harness;

    fn run(h: &mut Harness, level: &mut InversionLevel, beta: f32, from: f64, to: f64) -> bool {
        let mut t = from;
        while t <= to {
            if let Step::Complete(_) = h.feed(level, t, Input::Orientation(OrientationSample::beta(beta))) {
                return true;
            }
            t += 20.0;
        }
        false
    }

    #[test]
    fn test_arms_then_fills() {
        let mut h = Harness::new(ScriptedHost::new());
        let mut level = InversionLevel::new("2".into(), &InversionTuning::default());
        h.start(&mut level, 0.0).unwrap();

        // First sample anchors the clock; exactly 1000ms is not yet armed
        assert!(!run(&mut h, &mut level, -90.0, 0.0, 1000.0));
        assert!(!level.is_armed());
        assert_eq!(level.fill_ms(), 0.0);

        assert!(!run(&mut h, &mut level, -90.0, 1020.0, 1020.0));
        assert!(level.is_armed());
        assert_eq!(h.signals, vec![Signal::Armed]);

        // 20ms from the arming tick, then another 2180ms
        assert!(!run(&mut h, &mut level, -90.0, 1040.0, 3180.0));
        assert!(run(&mut h, &mut level, -90.0, 3200.0, 3200.0));
    }

    #[test]
    fn test_leaving_window_resets_both() {
        let mut h = Harness::new(ScriptedHost::new());
        let mut level = InversionLevel::new("2".into(), &InversionTuning::default());
        h.start(&mut level, 0.0).unwrap();

        run(&mut h, &mut level, -90.0, 0.0, 2000.0);
        assert!(level.fill_ms() > 0.0);

        run(&mut h, &mut level, 80.0, 2020.0, 2020.0);
        assert!(!level.is_armed());
        assert_eq!(level.fill_ms(), 0.0);

        // Missing beta counts as upright
        level.armed_for_ms = 5000.0;
        h.feed(&mut level, 2040.0, Input::Orientation(OrientationSample::default()));
        assert!(!level.is_armed());
    }

    #[test]
    fn test_sparse_orientation_events_count_real_time() {
        let mut h = Harness::new(ScriptedHost::new());
        let mut level = InversionLevel::new("2".into(), &InversionTuning::default());
        h.start(&mut level, 0.0).unwrap();

        let inverted = || Input::Orientation(OrientationSample::beta(-90.0));
        h.feed(&mut level, 0.0, inverted());
        h.feed(&mut level, 500.0, inverted());
        assert!(!level.is_armed());
        h.feed(&mut level, 1500.0, inverted());
        assert!(level.is_armed());
        assert_eq!(level.fill_ms(), 1000.0);
        assert!(matches!(h.feed(&mut level, 3200.0, inverted()), Step::Complete(_)));
    }
}
