//! Inverted-portrait detection (level 2)

use crate::platform::OrientationSample;

/// Exclusive beta window, in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InversionWindow {
    pub beta_min: f32,
    pub beta_max: f32,
}

impl InversionWindow {
    pub fn new(beta_min: f32, beta_max: f32) -> Self {
        Self { beta_min, beta_max }
    }

    /// Upright portrait reads about +90, inverted portrait about -90.
    /// A missing beta never counts.
    pub fn contains(&self, sample: OrientationSample) -> bool {
        match sample.beta {
            Some(beta) => beta > self.beta_min && beta < self.beta_max,
            None => false,
        }
    }
}
