//! Signal detectors
//!
//! Each module turns raw samples for one challenge into a boolean or scalar
//! signal. They hold at most a previous-sample cache and know nothing about
//! levels or timing.

pub mod audio;
pub mod geo;
pub mod motion;
pub mod orientation;
pub mod shape;
pub mod touch;
pub mod video;

pub use audio::{is_silent, spectrum_average};
pub use geo::{haversine_m, hot_cold_ratio, Proximity, ProximityCheck};
pub use motion::{ShakeDetector, StillnessDetector};
pub use orientation::InversionWindow;
pub use shape::{Corner, DrawPhase, Rejection, ShapeVerdict, TriangleDetector};
pub use touch::{layout_targets, TouchOutcome, TouchSequence, TouchTarget};
pub use video::{frame_brightness, is_dark};
