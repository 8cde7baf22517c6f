//! Level 4: "Only quiet minds may proceed."

use crate::config::SilenceTuning;
use crate::error::Result;
use crate::platform::{Handles, Input, SensorHost, SensorKind};
use crate::sim::accumulator::{Accumulator, AccumulatorState, TickClock};
use crate::sim::detect::spectrum_average;

use super::{Level, LevelContext, LevelKind, LevelView, Reveal, Step};

pub struct SilenceLevel {
    digit: String,
    threshold: f32,
    timer: Accumulator,
    clock: TickClock,
    handles: Handles,
    last_average: Option<f32>,
}

impl SilenceLevel {
    pub fn new(digit: String, tuning: &SilenceTuning, max_tick_ms: f64) -> Self {
        Self {
            digit,
            threshold: tuning.threshold,
            timer: Accumulator::reset_on_break(tuning.required_ms),
            clock: TickClock::new(max_tick_ms),
            handles: Handles::new(),
            last_average: None,
        }
    }

    /// Most recent spectrum mean, for the volume meter
    pub fn last_average(&self) -> Option<f32> {
        self.last_average
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.timer.elapsed_ms()
    }
}

impl Level for SilenceLevel {
    fn kind(&self) -> LevelKind {
        LevelKind::Silence
    }

    fn start(&mut self, ctx: &mut LevelContext<'_>) -> Result<()> {
        self.timer.reset();
        self.last_average = None;
        self.clock.start(ctx.now_ms);
        self.handles.acquire(ctx.host, SensorKind::Microphone)?;
        Ok(())
    }

    fn handle(&mut self, ctx: &mut LevelContext<'_>, input: &Input) -> Step {
        if let Some(err) = input.sensor_failure(SensorKind::Microphone) {
            return Step::Fail(err);
        }
        if !matches!(input, Input::Frame) {
            return Step::Continue;
        }
        let dt = self.clock.delta(ctx.now_ms);
        let Some(id) = self.handles.get(SensorKind::Microphone) else {
            return Step::Continue;
        };
        let Some(average) = ctx
            .host
            .capture_audio_level(id)
            .and_then(|spectrum| spectrum_average(&spectrum))
        else {
            return Step::Continue;
        };
        self.last_average = Some(average);

        if ctx.debug {
            log::debug!("Silence: average {:.2}, {:.0}ms", average, self.timer.elapsed_ms());
        }
        match self.timer.tick(average < self.threshold, dt) {
            AccumulatorState::Crossed => Step::Complete(Reveal::Digit(self.digit.clone())),
            _ => Step::Continue,
        }
    }

    fn progress(&self) -> f32 {
        self.timer.ratio()
    }

    fn view(&self) -> LevelView {
        LevelView {
            reading: self.last_average,
            ..LevelView::default()
        }
    }

    fn cleanup(&mut self, host: &mut dyn SensorHost) {
        self.handles.release_all(host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::platform::ScriptedHost;
    use crate::sim::levels::test_support::Harness;

    fn level() -> SilenceLevel {
        SilenceLevel::new("9".into(), &SilenceTuning::default(), 100.0)
    }

    #[test]
    fn test_five_quiet_seconds_complete() {
        let mut host = ScriptedHost::new();
        host.set_ambient_spectrum(vec![0; 64]);
        let mut h = Harness::new(host);
        let mut level = level();
        h.start(&mut level, 0.0).unwrap();

        let mut t = 0.0;
        let mut done = false;
        while t < 6000.0 && !done {
            t += 50.0;
            done = matches!(h.feed(&mut level, t, Input::Frame), Step::Complete(_));
        }
        assert!(done);
        assert_eq!(t, 5000.0);
        assert_eq!(level.last_average(), Some(0.0));
    }

    #[test]
    fn test_noise_resets_and_empty_is_skipped() {
        let mut host = ScriptedHost::new();
        host.set_ambient_spectrum(vec![0; 64]);
        let mut h = Harness::new(host);
        let mut level = level();
        h.start(&mut level, 0.0).unwrap();

        h.feed(&mut level, 100.0, Input::Frame);
        h.feed(&mut level, 200.0, Input::Frame);
        assert_eq!(level.elapsed_ms(), 200.0);

        h.host.push_spectrum(Vec::new());
        h.feed(&mut level, 300.0, Input::Frame);
        assert_eq!(level.elapsed_ms(), 200.0);

        h.host.push_spectrum(vec![40; 64]);
        h.feed(&mut level, 400.0, Input::Frame);
        assert_eq!(level.elapsed_ms(), 0.0);
    }

    #[test]
    fn test_missing_microphone_fails_start() {
        let mut h = Harness::new(ScriptedHost::new().deny(SensorKind::Microphone));
        let mut level = level();
        let err = h.start(&mut level, 0.0).unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(SensorKind::Microphone)));
        level.cleanup(&mut h.host);
        assert_eq!(h.host.live_count(), 0);
    }

    #[test]
    fn test_late_microphone_refusal_fails() {
        let mut h = Harness::new(ScriptedHost::new());
        let mut level = level();
        h.start(&mut level, 0.0).unwrap();

        let refused = Input::SensorFailed {
            kind: SensorKind::Microphone,
            denied: true,
        };
        assert!(matches!(
            h.feed(&mut level, 10.0, refused),
            Step::Fail(Error::PermissionDenied(SensorKind::Microphone))
        ));
        let other = Input::SensorFailed {
            kind: SensorKind::Camera,
            denied: false,
        };
        assert!(matches!(h.feed(&mut level, 20.0, other), Step::Continue));
    }
}
