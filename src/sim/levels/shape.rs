//! Level 6: draw a triangle with one finger
//!
//! Only the pointer that started the drag draws. Rejected drawings cost
//! nothing; the player simply tries again.

use crate::config::ShapeTuning;
use crate::error::Result;
use crate::platform::{Handles, Input, SensorHost, SensorKind, TouchPhase};
use crate::sim::detect::{DrawPhase, ShapeVerdict, TriangleDetector};

use super::{Level, LevelContext, LevelKind, LevelView, Reveal, Signal, Step};

pub struct ShapeLevel {
    digit: String,
    tuning: ShapeTuning,
    detector: Option<TriangleDetector>,
    drawing_pointer: Option<i32>,
    handles: Handles,
}

impl ShapeLevel {
    pub fn new(digit: String, tuning: &ShapeTuning) -> Self {
        Self {
            digit,
            tuning: tuning.clone(),
            detector: None,
            drawing_pointer: None,
            handles: Handles::new(),
        }
    }

    pub fn phase(&self) -> DrawPhase {
        self.detector
            .as_ref()
            .map_or(DrawPhase::Idle, TriangleDetector::phase)
    }
}

impl Level for ShapeLevel {
    fn kind(&self) -> LevelKind {
        LevelKind::Shape
    }

    fn start(&mut self, ctx: &mut LevelContext<'_>) -> Result<()> {
        self.detector = Some(TriangleDetector::new(
            self.tuning.clone(),
            ctx.host.surface_size(),
        ));
        self.drawing_pointer = None;
        self.handles.acquire(ctx.host, SensorKind::Touch)?;
        Ok(())
    }

    fn handle(&mut self, ctx: &mut LevelContext<'_>, input: &Input) -> Step {
        let Input::Touch(event) = input else {
            return Step::Continue;
        };
        let Some(detector) = self.detector.as_mut() else {
            return Step::Continue;
        };

        match event.phase {
            TouchPhase::Down => {
                if self.drawing_pointer.is_none() {
                    self.drawing_pointer = Some(event.pointer);
                    detector.begin(event.pos);
                }
                Step::Continue
            }
            TouchPhase::Move if self.drawing_pointer == Some(event.pointer) => {
                detector.extend(event.pos);
                Step::Continue
            }
            TouchPhase::Up if self.drawing_pointer == Some(event.pointer) => {
                self.drawing_pointer = None;
                detector.extend(event.pos);
                match detector.finish() {
                    Some(ShapeVerdict::Accepted { corners, area }) => {
                        log::info!(
                            "Triangle accepted: area {:.0}px², corners {:?}",
                            area,
                            corners.map(|c| c.angle.round())
                        );
                        Step::Complete(Reveal::Digit(self.digit.clone()))
                    }
                    Some(ShapeVerdict::Rejected(reason)) => {
                        log::debug!("Triangle rejected: {}", reason);
                        ctx.signal(Signal::ShapeRejected(reason));
                        Step::Continue
                    }
                    None => Step::Continue,
                }
            }
            TouchPhase::Cancel if self.drawing_pointer == Some(event.pointer) => {
                self.drawing_pointer = None;
                detector.cancel();
                Step::Continue
            }
            _ => Step::Continue,
        }
    }

    fn progress(&self) -> f32 {
        match self.phase() {
            DrawPhase::Accepted => 1.0,
            _ => 0.0,
        }
    }

    fn view(&self) -> LevelView {
        LevelView {
            trail: self
                .detector
                .as_ref()
                .map(|d| d.points().to_vec())
                .unwrap_or_default(),
            ..LevelView::default()
        }
    }

    fn cleanup(&mut self, host: &mut dyn SensorHost) {
        if let Some(detector) = self.detector.as_mut() {
            detector.cancel();
        }
        self.drawing_pointer = None;
        self.handles.release_all(host);
    }
}
