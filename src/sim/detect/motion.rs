//! Accelerometer detectors: stillness (level 1) and shake (level 3)
//!
//! Both compare each sample with the previous one, which cancels gravity.

use glam::Vec3;

use crate::platform::MotionSample;

/// Remembers the last sample and yields per-axis deltas
#[derive(Debug, Clone, Default)]
pub struct DeltaTracker {
    prev: Option<Vec3>,
}

impl DeltaTracker {
    pub fn new() -> Self {
        Self { prev: None }
    }

    /// Delta against the previous sample; `None` while priming
    pub fn delta(&mut self, sample: MotionSample) -> Option<Vec3> {
        let current = Vec3::new(sample.x, sample.y, sample.z);
        let delta = self.prev.map(|prev| current - prev);
        self.prev = Some(current);
        delta
    }

    pub fn reset(&mut self) {
        self.prev = None;
    }
}

/// |Δx| + |Δy| + |Δz|
#[inline]
pub fn total_delta(delta: Vec3) -> f32 {
    delta.abs().element_sum()
}

/// sqrt(Δx² + Δy² + Δz²)
#[inline]
pub fn delta_magnitude(delta: Vec3) -> f32 {
    delta.length()
}

#[derive(Debug, Clone)]
pub struct StillnessDetector {
    tracker: DeltaTracker,
    threshold: f32,
}

impl StillnessDetector {
    pub fn new(threshold: f32) -> Self {
        Self {
            tracker: DeltaTracker::new(),
            threshold,
        }
    }

    /// `Some(true)` when the device moved since the last sample
    pub fn is_moving(&mut self, sample: MotionSample) -> Option<bool> {
        self.tracker
            .delta(sample)
            .map(|d| total_delta(d) > self.threshold)
    }

    pub fn reset(&mut self) {
        self.tracker.reset();
    }
}

#[derive(Debug, Clone)]
pub struct ShakeDetector {
    tracker: DeltaTracker,
    threshold: f32,
    last_magnitude: f32,
}

impl ShakeDetector {
    pub fn new(threshold: f32) -> Self {
        Self {
            tracker: DeltaTracker::new(),
            threshold,
            last_magnitude: 0.0,
        }
    }

    /// `Some(true)` when the change since the last sample is violent enough
    pub fn is_shaking(&mut self, sample: MotionSample) -> Option<bool> {
        let magnitude = delta_magnitude(self.tracker.delta(sample)?);
        self.last_magnitude = magnitude;
        Some(magnitude > self.threshold)
    }

    /// Magnitude of the most recent delta (diagnostics)
    pub fn last_magnitude(&self) -> f32 {
        self.last_magnitude
    }

    pub fn reset(&mut self) {
        self.tracker.reset();
        self.last_magnitude = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_only_primes() {
        let mut still = StillnessDetector::new(0.3);
        assert_eq!(still.is_moving(MotionSample::new(0.0, 9.81, 0.0)), None);
        assert_eq!(still.is_moving(MotionSample::new(0.05, 9.8, 0.02)), Some(false));
    }

    #[test]
    fn test_stillness_sums_axis_deltas() {
        let mut still = StillnessDetector::new(0.3);
        still.is_moving(MotionSample::new(0.0, 0.0, 0.0));
        // 0.1 + 0.1 + 0.15 = 0.35, no single axis over the threshold
        assert_eq!(still.is_moving(MotionSample::new(0.1, -0.1, 0.15)), Some(true));
        // Same reading again: no delta
        assert_eq!(still.is_moving(MotionSample::new(0.1, -0.1, 0.15)), Some(false));
    }

    #[test]
    fn test_shake_uses_euclidean_magnitude() {
        let mut shake = ShakeDetector::new(5.0);
        shake.is_shaking(MotionSample::new(0.0, 0.0, 0.0));
        // |(3, 4, 0)| = 5, not strictly above
        assert_eq!(shake.is_shaking(MotionSample::new(3.0, 4.0, 0.0)), Some(false));
        assert!((shake.last_magnitude() - 5.0).abs() < 1e-5);
        // |(-3, -4, -1)| ≈ 5.1
        assert_eq!(shake.is_shaking(MotionSample::new(0.0, 0.0, -1.0)), Some(true));
    }

    #[test]
    fn test_reset_reprimes() {
        let mut shake = ShakeDetector::new(5.0);
        shake.is_shaking(MotionSample::new(0.0, 0.0, 0.0));
        shake.reset();
        assert_eq!(shake.is_shaking(MotionSample::new(50.0, 0.0, 0.0)), None);
    }
}
