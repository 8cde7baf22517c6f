//! Level 5: "Awake, and rise from the dead, and Christ will give you light."
//!
//! Cover the camera until the picture goes black.

use crate::config::DarknessTuning;
use crate::error::Result;
use crate::platform::{Handles, Input, SensorHost, SensorKind};
use crate::sim::accumulator::{Accumulator, AccumulatorState, TickClock};
use crate::sim::detect::frame_brightness;

use super::{Level, LevelContext, LevelKind, LevelView, Reveal, Step};

pub struct DarknessLevel {
    digit: String,
    threshold: f32,
    timer: Accumulator,
    clock: TickClock,
    handles: Handles,
    last_brightness: Option<f32>,
}

impl DarknessLevel {
    pub fn new(digit: String, tuning: &DarknessTuning, max_tick_ms: f64) -> Self {
        Self {
            digit,
            threshold: tuning.threshold,
            timer: Accumulator::reset_on_break(tuning.required_ms),
            clock: TickClock::new(max_tick_ms),
            handles: Handles::new(),
            last_brightness: None,
        }
    }

    pub fn last_brightness(&self) -> Option<f32> {
        self.last_brightness
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.timer.elapsed_ms()
    }
}

impl Level for DarknessLevel {
    fn kind(&self) -> LevelKind {
        LevelKind::Darkness
    }

    fn start(&mut self, ctx: &mut LevelContext<'_>) -> Result<()> {
        self.timer.reset();
        self.last_brightness = None;
        self.clock.start(ctx.now_ms);
        self.handles.acquire(ctx.host, SensorKind::Camera)?;
        Ok(())
    }

    fn handle(&mut self, ctx: &mut LevelContext<'_>, input: &Input) -> Step {
        if let Some(err) = input.sensor_failure(SensorKind::Camera) {
            return Step::Fail(err);
        }
        if !matches!(input, Input::Frame) {
            return Step::Continue;
        }
        let dt = self.clock.delta(ctx.now_ms);
        let Some(id) = self.handles.get(SensorKind::Camera) else {
            return Step::Continue;
        };
        // Frame not ready yet
        let Some(brightness) = ctx
            .host
            .capture_video_frame(id)
            .and_then(|frame| frame_brightness(&frame))
        else {
            return Step::Continue;
        };
        self.last_brightness = Some(brightness);

        if ctx.debug {
            log::debug!("Darkness: brightness {:.2}, {:.0}ms", brightness, self.timer.elapsed_ms());
        }
        match self.timer.tick(brightness < self.threshold, dt) {
            AccumulatorState::Crossed => Step::Complete(Reveal::Digit(self.digit.clone())),
            _ => Step::Continue,
        }
    }

    fn progress(&self) -> f32 {
        self.timer.ratio()
    }

    fn view(&self) -> LevelView {
        LevelView {
            reading: self.last_brightness,
            ..LevelView::default()
        }
    }

    fn cleanup(&mut self, host: &mut dyn SensorHost) {
        self.handles.release_all(host);
    }
}
