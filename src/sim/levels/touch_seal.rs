//! Level 7: "Touch the rainbow in order."
//!
//! Five fingers on five targets, placed in hidden order and held. The digit
//! appears after a short settle once the last one lands.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg32;

use crate::config::TouchTuning;
use crate::error::Result;
use crate::platform::{Handles, Input, SensorHost, SensorKind};
use crate::sim::detect::touch::{layout_targets, TouchOutcome, TouchSequence, TARGET_COUNT};

use super::{Level, LevelContext, LevelKind, LevelView, Reveal, Signal, Step};

pub struct TouchSealLevel {
    digit: String,
    tuning: TouchTuning,
    sequence: Option<TouchSequence>,
    /// When the last target was held
    settle_from: Option<f64>,
    handles: Handles,
}

impl TouchSealLevel {
    pub fn new(digit: String, tuning: &TouchTuning) -> Self {
        Self {
            digit,
            tuning: tuning.clone(),
            sequence: None,
            settle_from: None,
            handles: Handles::new(),
        }
    }

    pub fn sequence(&self) -> Option<&TouchSequence> {
        self.sequence.as_ref()
    }

    pub fn is_settling(&self) -> bool {
        self.settle_from.is_some()
    }

    fn settled(&self, now_ms: f64) -> bool {
        self.settle_from
            .is_some_and(|from| now_ms - from >= self.tuning.settle_ms)
    }
}

impl Level for TouchSealLevel {
    fn kind(&self) -> LevelKind {
        LevelKind::TouchSeal
    }

    fn start(&mut self, ctx: &mut LevelContext<'_>) -> Result<()> {
        // Derive a layout stream so the shuffle does not depend on how many
        // draws earlier levels made
        let mut rng = Pcg32::seed_from_u64(ctx.rng.next_u64());
        let targets = layout_targets(ctx.host.surface_size(), &self.tuning, &mut rng);
        log::debug!(
            "Touch seal order: {:?}",
            targets.iter().map(|t| t.ordinal).collect::<Vec<_>>()
        );
        self.sequence = Some(TouchSequence::new(
            targets,
            self.tuning.target_radius + self.tuning.touch_buffer,
        ));
        self.settle_from = None;
        self.handles.acquire(ctx.host, SensorKind::Touch)?;
        Ok(())
    }

    fn handle(&mut self, ctx: &mut LevelContext<'_>, input: &Input) -> Step {
        if self.settle_from.is_some() {
            return if self.settled(ctx.now_ms) {
                Step::Complete(Reveal::Digit(self.digit.clone()))
            } else {
                Step::Continue
            };
        }

        let Input::Touch(event) = input else {
            return Step::Continue;
        };
        let Some(sequence) = self.sequence.as_mut() else {
            return Step::Continue;
        };

        match sequence.handle(event) {
            TouchOutcome::Advanced(count) => ctx.signal(Signal::CorrectTouch(count)),
            TouchOutcome::WrongAttempt => ctx.signal(Signal::WrongAttempt),
            TouchOutcome::Reset => ctx.signal(Signal::SequenceReset),
            TouchOutcome::Complete => {
                log::info!("Touch seal held");
                ctx.signal(Signal::CorrectTouch(TARGET_COUNT));
                ctx.signal(Signal::Settling);
                self.settle_from = Some(ctx.now_ms);
                if self.settled(ctx.now_ms) {
                    return Step::Complete(Reveal::Digit(self.digit.clone()));
                }
            }
            TouchOutcome::Ignored => {}
        }
        Step::Continue
    }

    fn progress(&self) -> f32 {
        self.sequence
            .as_ref()
            .map_or(0.0, |s| s.touched_count() as f32 / TARGET_COUNT as f32)
    }

    fn view(&self) -> LevelView {
        let targets = self
            .sequence
            .as_ref()
            .map(|s| {
                s.targets()
                    .iter()
                    .map(|t| (*t, s.is_touched(t.ordinal)))
                    .collect()
            })
            .unwrap_or_default();
        LevelView {
            targets,
            ..LevelView::default()
        }
    }

    fn cleanup(&mut self, host: &mut dyn SensorHost) {
        if let Some(sequence) = self.sequence.as_mut() {
            sequence.touch_cancel();
        }
        self.handles.release_all(host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{ScriptedHost, TouchEvent};
    use crate::sim::levels::test_support::Harness;

    fn spot(level: &TouchSealLevel, ordinal: u8) -> glam::Vec2 {
        level
            .sequence()
            .unwrap()
            .targets()
            .iter()
            .find(|t| t.ordinal == ordinal)
            .unwrap()
            .center
    }

    #[test]
    fn test_hold_all_then_settle() {
        let mut h = Harness::new(ScriptedHost::new());
        let mut level = TouchSealLevel::new("4".into(), &TouchTuning::default());
        h.start(&mut level, 0.0).unwrap();

        for ordinal in 0..5u8 {
            let pos = spot(&level, ordinal);
            let step = h.feed(&mut level, 100.0, Input::Touch(TouchEvent::down(ordinal as i32, pos)));
            assert!(matches!(step, Step::Continue));
        }
        assert!(level.is_settling());
        assert_eq!(level.progress(), 1.0);
        assert!(h.signals.contains(&Signal::Settling));

        // Lifting during the settle is ignored
        let first = spot(&level, 0);
        assert!(matches!(h.feed(&mut level, 900.0, Input::Touch(TouchEvent::up(0, first))), Step::Continue));
        assert!(matches!(h.feed(&mut level, 1500.0, Input::Frame), Step::Continue));
        assert!(matches!(h.feed(&mut level, 1600.0, Input::Frame), Step::Complete(_)));
    }

    #[test]
    fn test_zero_settle_completes_immediately() {
        let tuning = TouchTuning {
            settle_ms: 0.0,
            ..TouchTuning::default()
        };
        let mut h = Harness::new(ScriptedHost::new());
        let mut level = TouchSealLevel::new("4".into(), &tuning);
        h.start(&mut level, 0.0).unwrap();

        let mut last = Step::Continue;
        for ordinal in 0..5u8 {
            let pos = spot(&level, ordinal);
            last = h.feed(&mut level, 10.0, Input::Touch(TouchEvent::down(ordinal as i32, pos)));
        }
        assert!(matches!(last, Step::Complete(Reveal::Digit(_))));
    }

    #[test]
    fn test_wrong_then_reset_signals() {
        let mut h = Harness::new(ScriptedHost::new());
        let mut level = TouchSealLevel::new("4".into(), &TouchTuning::default());
        h.start(&mut level, 0.0).unwrap();

        let (first, third) = (spot(&level, 0), spot(&level, 2));
        h.feed(&mut level, 0.0, Input::Touch(TouchEvent::down(1, third)));
        h.feed(&mut level, 0.0, Input::Touch(TouchEvent::down(2, first)));
        h.feed(&mut level, 0.0, Input::Touch(TouchEvent::up(2, first)));
        assert_eq!(
            h.signals,
            vec![Signal::WrongAttempt, Signal::CorrectTouch(1), Signal::SequenceReset]
        );
        assert_eq!(level.progress(), 0.0);
    }

    #[test]
    fn test_view_marks_held_targets() {
        let mut h = Harness::new(ScriptedHost::new());
        let mut level = TouchSealLevel::new("4".into(), &TouchTuning::default());
        assert!(level.view().targets.is_empty());
        h.start(&mut level, 0.0).unwrap();

        let first = spot(&level, 0);
        h.feed(&mut level, 0.0, Input::Touch(TouchEvent::down(1, first)));
        let view = level.view();
        assert_eq!(view.targets.len(), 5);
        for (target, held) in view.targets {
            assert_eq!(held, target.ordinal == 0);
        }
    }
}
