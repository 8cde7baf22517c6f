//! Alternate seventh seal: "The answer waits where you get the food."
//!
//! Watches the position and requires the player to stay within a few meters
//! of a fixed spot. Progress is a hot/cold reading of the distance.

use crate::config::LocationTuning;
use crate::error::{Error, Result};
use crate::platform::{GeoFault, GeoFix, Handles, Input, SensorHost, SensorKind};
use crate::sim::accumulator::{Accumulator, AccumulatorState, TickClock};
use crate::sim::detect::{hot_cold_ratio, ProximityCheck};

use super::{Level, LevelContext, LevelKind, LevelView, Reveal, Signal, Step};

pub struct LocationLevel {
    digit: String,
    check: ProximityCheck,
    hot_cold_range_m: f64,
    timeout_ms: f64,
    hold: Accumulator,
    clock: TickClock,
    handles: Handles,
    in_range: bool,
    last_distance_m: Option<f64>,
    /// Start of the current wait for a fix
    waiting_since: f64,
}

impl LocationLevel {
    pub fn new(digit: String, tuning: &LocationTuning, max_tick_ms: f64) -> Self {
        Self {
            digit,
            check: ProximityCheck {
                target_lat: tuning.target_lat,
                target_lon: tuning.target_lon,
                radius_m: tuning.radius_m,
                max_accuracy_m: tuning.max_accuracy_m,
            },
            hot_cold_range_m: tuning.hot_cold_range_m,
            timeout_ms: tuning.timeout_ms,
            hold: Accumulator::reset_on_break(tuning.hold_ms),
            clock: TickClock::new(max_tick_ms),
            handles: Handles::new(),
            in_range: false,
            last_distance_m: None,
            waiting_since: 0.0,
        }
    }

    pub fn last_distance_m(&self) -> Option<f64> {
        self.last_distance_m
    }

    pub fn in_range(&self) -> bool {
        self.in_range
    }

    pub fn hold_ms(&self) -> f64 {
        self.hold.elapsed_ms()
    }

    fn on_fix(&mut self, ctx: &mut LevelContext<'_>, fix: &GeoFix) {
        self.waiting_since = ctx.now_ms;
        let reading = self.check.evaluate(fix);
        if ctx.debug {
            log::debug!(
                "Fix {:.6},{:.6} ±{:.0}m: {:.1}m away",
                fix.lat,
                fix.lon,
                fix.accuracy,
                reading.distance_m
            );
        }
        // A vague fix cannot confirm the player is still on the spot
        if !reading.trusted {
            self.in_range = false;
            return;
        }
        self.last_distance_m = Some(reading.distance_m);
        self.in_range = reading.in_range;
    }
}

impl Level for LocationLevel {
    fn kind(&self) -> LevelKind {
        LevelKind::Location
    }

    fn start(&mut self, ctx: &mut LevelContext<'_>) -> Result<()> {
        self.hold.reset();
        self.clock.start(ctx.now_ms);
        self.in_range = false;
        self.last_distance_m = None;
        self.waiting_since = ctx.now_ms;
        self.handles.acquire(ctx.host, SensorKind::Geolocation)?;
        Ok(())
    }

    fn handle(&mut self, ctx: &mut LevelContext<'_>, input: &Input) -> Step {
        match input {
            Input::Position(fix) => {
                self.on_fix(ctx, fix);
                Step::Continue
            }
            Input::PositionError(GeoFault::PermissionDenied) => {
                Step::Fail(Error::PermissionDenied(SensorKind::Geolocation))
            }
            Input::PositionError(GeoFault::Unavailable) => {
                log::warn!("Position unavailable");
                self.in_range = false;
                ctx.signal(Signal::PositionUnavailable);
                Step::Continue
            }
            Input::PositionError(GeoFault::Timeout) => {
                self.waiting_since = ctx.now_ms;
                ctx.signal(Signal::LocationTimeout);
                Step::Continue
            }
            Input::Frame => {
                if ctx.now_ms - self.waiting_since >= self.timeout_ms {
                    log::warn!("No position fix for {:.0}ms", self.timeout_ms);
                    self.waiting_since = ctx.now_ms;
                    self.in_range = false;
                    ctx.signal(Signal::LocationTimeout);
                }
                let dt = self.clock.delta(ctx.now_ms);
                match self.hold.tick(self.in_range, dt) {
                    AccumulatorState::Crossed => Step::Complete(Reveal::Digit(self.digit.clone())),
                    _ => Step::Continue,
                }
            }
            _ => Step::Continue,
        }
    }

    fn progress(&self) -> f32 {
        self.last_distance_m
            .map_or(0.0, |d| hot_cold_ratio(d, self.hot_cold_range_m))
    }

    fn view(&self) -> LevelView {
        LevelView {
            reading: self.last_distance_m.map(|d| d as f32),
            ..LevelView::default()
        }
    }

    fn cleanup(&mut self, host: &mut dyn SensorHost) {
        self.handles.release_all(host);
    }
}
