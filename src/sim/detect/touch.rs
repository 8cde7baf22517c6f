//! Ordered multi-touch seal (level 7)
//!
//! Five targets carry hidden ordinals 0..4. Fingers must land on them in
//! ordinal order and stay down; lifting or sliding off a completed target
//! breaks the seal.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;

use crate::config::TouchTuning;
use crate::platform::{TouchEvent, TouchPhase};

pub const TARGET_COUNT: usize = 5;

/// Display names for each ordinal, in order
pub const ORDINAL_NAMES: [&str; TARGET_COUNT] = ["Red", "Orange", "Yellow", "Green", "Blue"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchTarget {
    pub center: Vec2,
    pub ordinal: u8,
}

/// Three targets along the top, two along the bottom, with ordinals
/// shuffled by `rng`
pub fn layout_targets(surface: Vec2, tuning: &TouchTuning, rng: &mut Pcg32) -> Vec<TouchTarget> {
    let (mx, my) = (tuning.margin_x, tuning.margin_y);
    let (w, h) = (surface.x, surface.y);
    let positions = [
        Vec2::new(mx, my),
        Vec2::new(w / 2.0, my),
        Vec2::new(w - mx, my),
        Vec2::new(mx, h - my),
        Vec2::new(w - mx, h - my),
    ];

    let mut ordinals: Vec<u8> = (0..TARGET_COUNT as u8).collect();
    ordinals.shuffle(rng);

    positions
        .into_iter()
        .zip(ordinals)
        .map(|(center, ordinal)| TouchTarget { center, ordinal })
        .collect()
}

/// What a touch event did to the sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchOutcome {
    /// Nothing relevant happened
    Ignored,
    /// Next ordinal in order was touched; holds the new count
    Advanced(usize),
    /// A target was touched out of order; progress untouched
    WrongAttempt,
    /// A completed target lost its finger; progress cleared
    Reset,
    /// All ordinals held
    Complete,
}

#[derive(Debug, Clone)]
pub struct TouchSequence {
    targets: Vec<TouchTarget>,
    /// Target radius plus slack
    hit_radius: f32,
    /// Pointer id -> index of the target it landed on
    tracking: BTreeMap<i32, usize>,
    correctly_touched: BTreeSet<u8>,
}

impl TouchSequence {
    pub fn new(targets: Vec<TouchTarget>, hit_radius: f32) -> Self {
        Self {
            targets,
            hit_radius,
            tracking: BTreeMap::new(),
            correctly_touched: BTreeSet::new(),
        }
    }

    pub fn targets(&self) -> &[TouchTarget] {
        &self.targets
    }

    pub fn touched_count(&self) -> usize {
        self.correctly_touched.len()
    }

    pub fn is_touched(&self, ordinal: u8) -> bool {
        self.correctly_touched.contains(&ordinal)
    }

    pub fn is_complete(&self) -> bool {
        self.correctly_touched.len() == self.targets.len()
    }

    /// Number of fingers currently tracked on targets
    pub fn tracked_count(&self) -> usize {
        self.tracking.len()
    }

    fn hits(&self, index: usize, pos: Vec2) -> bool {
        self.targets[index].center.distance(pos) <= self.hit_radius
    }

    /// First target under `pos`
    pub fn target_at(&self, pos: Vec2) -> Option<usize> {
        (0..self.targets.len()).find(|&i| self.hits(i, pos))
    }

    pub fn handle(&mut self, event: &TouchEvent) -> TouchOutcome {
        match event.phase {
            TouchPhase::Down => self.touch_down(event.pointer, event.pos),
            TouchPhase::Move => self.touch_move(event.pointer, event.pos),
            TouchPhase::Up => self.touch_up(event.pointer),
            TouchPhase::Cancel => self.touch_cancel(),
        }
    }

    pub fn touch_down(&mut self, pointer: i32, pos: Vec2) -> TouchOutcome {
        if self.is_complete() || self.tracking.contains_key(&pointer) {
            return TouchOutcome::Ignored;
        }
        let Some(index) = self.target_at(pos) else {
            return TouchOutcome::Ignored;
        };
        self.tracking.insert(pointer, index);

        let ordinal = self.targets[index].ordinal;
        let expected = self.correctly_touched.len();
        if ordinal as usize == expected && !self.correctly_touched.contains(&ordinal) {
            self.correctly_touched.insert(ordinal);
            if self.is_complete() {
                TouchOutcome::Complete
            } else {
                TouchOutcome::Advanced(self.correctly_touched.len())
            }
        } else {
            TouchOutcome::WrongAttempt
        }
    }

    pub fn touch_move(&mut self, pointer: i32, pos: Vec2) -> TouchOutcome {
        let Some(&index) = self.tracking.get(&pointer) else {
            return TouchOutcome::Ignored;
        };
        if self.hits(index, pos) {
            return TouchOutcome::Ignored;
        }
        self.release_pointer(pointer, index)
    }

    pub fn touch_up(&mut self, pointer: i32) -> TouchOutcome {
        match self.tracking.get(&pointer) {
            Some(&index) => self.release_pointer(pointer, index),
            None => TouchOutcome::Ignored,
        }
    }

    /// The browser took the touches away; progress survives
    pub fn touch_cancel(&mut self) -> TouchOutcome {
        self.tracking.clear();
        TouchOutcome::Ignored
    }

    fn release_pointer(&mut self, pointer: i32, index: usize) -> TouchOutcome {
        self.tracking.remove(&pointer);
        if self.is_complete() {
            return TouchOutcome::Ignored;
        }
        if self.correctly_touched.contains(&self.targets[index].ordinal) {
            self.reset();
            TouchOutcome::Reset
        } else {
            TouchOutcome::Ignored
        }
    }

    /// Clear progress and every tracked finger
    pub fn reset(&mut self) {
        self.correctly_touched.clear();
        self.tracking.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const SURFACE: Vec2 = Vec2::new(480.0, 640.0);

    fn sequence(seed: u64) -> TouchSequence {
        let tuning = TouchTuning::default();
        let mut rng = Pcg32::seed_from_u64(seed);
        let targets = layout_targets(SURFACE, &tuning, &mut rng);
        TouchSequence::new(targets, tuning.target_radius + tuning.touch_buffer)
    }

    /// Centre of the target carrying `ordinal`
    fn spot(seq: &TouchSequence, ordinal: u8) -> Vec2 {
        seq.targets()
            .iter()
            .find(|t| t.ordinal == ordinal)
            .map(|t| t.center)
            .unwrap()
    }

    #[test]
    fn test_layout_positions_and_ordinals() {
        let seq = sequence(7);
        let centers: Vec<Vec2> = seq.targets().iter().map(|t| t.center).collect();
        assert_eq!(
            centers,
            vec![
                Vec2::new(100.0, 120.0),
                Vec2::new(240.0, 120.0),
                Vec2::new(380.0, 120.0),
                Vec2::new(100.0, 520.0),
                Vec2::new(380.0, 520.0),
            ]
        );
        let mut ordinals: Vec<u8> = seq.targets().iter().map(|t| t.ordinal).collect();
        ordinals.sort();
        assert_eq!(ordinals, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_layout_is_deterministic_per_seed() {
        assert_eq!(sequence(42).targets(), sequence(42).targets());
    }

    #[test]
    fn test_in_order_completes() {
        let mut seq = sequence(3);
        for ordinal in 0..4u8 {
            let outcome = seq.touch_down(ordinal as i32, spot(&seq, ordinal));
            assert_eq!(outcome, TouchOutcome::Advanced(ordinal as usize + 1));
        }
        assert_eq!(seq.touch_down(4, spot(&seq, 4)), TouchOutcome::Complete);
        assert!(seq.is_complete());

        // Lifting after completion changes nothing
        assert_eq!(seq.touch_up(0), TouchOutcome::Ignored);
        assert!(seq.is_complete());
    }

    #[test]
    fn test_out_of_order_never_completes() {
        let mut seq = sequence(3);
        assert_eq!(seq.touch_down(0, spot(&seq, 1)), TouchOutcome::WrongAttempt);
        assert_eq!(seq.touch_down(1, spot(&seq, 0)), TouchOutcome::Advanced(1));
        for (pointer, ordinal) in [(2, 2u8), (3, 3), (4, 4)] {
            assert_eq!(seq.touch_down(pointer, spot(&seq, ordinal)), TouchOutcome::WrongAttempt);
        }
        assert_eq!(seq.touched_count(), 1);
        assert!(!seq.is_complete());
    }

    #[test]
    fn test_sliding_off_completed_target_clears_all() {
        let mut seq = sequence(11);
        seq.touch_down(10, spot(&seq, 0));
        seq.touch_down(11, spot(&seq, 1));
        assert_eq!(seq.touched_count(), 2);

        // Small wiggle inside radius + buffer is fine
        let wiggle = spot(&seq, 1) + Vec2::new(60.0, 0.0);
        assert_eq!(seq.touch_move(11, wiggle), TouchOutcome::Ignored);

        let away = spot(&seq, 1) + Vec2::new(70.0, 0.0);
        assert_eq!(seq.touch_move(11, away), TouchOutcome::Reset);
        assert_eq!(seq.touched_count(), 0);
        assert_eq!(seq.tracked_count(), 0);
    }

    #[test]
    fn test_lifting_wrong_finger_keeps_progress() {
        let mut seq = sequence(5);
        seq.touch_down(1, spot(&seq, 0));
        seq.touch_down(2, spot(&seq, 3));
        assert_eq!(seq.touch_up(2), TouchOutcome::Ignored);
        assert_eq!(seq.touched_count(), 1);

        assert_eq!(seq.touch_up(1), TouchOutcome::Reset);
        assert_eq!(seq.touched_count(), 0);
    }

    #[test]
    fn test_cancel_keeps_progress() {
        let mut seq = sequence(9);
        seq.touch_down(1, spot(&seq, 0));
        seq.touch_cancel();
        assert_eq!(seq.touched_count(), 1);
        assert_eq!(seq.tracked_count(), 0);
        // Pointer is no longer tracked, so lifting it is harmless
        assert_eq!(seq.touch_up(1), TouchOutcome::Ignored);
        assert_eq!(seq.touched_count(), 1);
    }

    #[test]
    fn test_miss_is_ignored() {
        let mut seq = sequence(1);
        assert_eq!(seq.touch_down(1, Vec2::new(240.0, 320.0)), TouchOutcome::Ignored);
        assert_eq!(seq.tracked_count(), 0);
    }
}
