//! Platform abstraction layer
//!
//! The core never touches browser APIs directly. Everything it needs from the
//! device goes through [`SensorHost`]:
//! - Permission prompts (motion/orientation)
//! - Push streams (motion, orientation, touch, geolocation) delivered as [`Input`]
//! - Pull handles (microphone spectrum, camera frames) sampled on frame ticks
//!
//! Levels record every subscription they open in a [`Handles`] list and
//! release the whole list on teardown.

pub mod scripted;
#[cfg(target_arch = "wasm32")]
pub mod web;

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use scripted::ScriptedHost;
#[cfg(target_arch = "wasm32")]
pub use web::BrowserHost;

/// Device capabilities a level can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SensorKind {
    Motion,
    Orientation,
    Microphone,
    Camera,
    Touch,
    Geolocation,
}

impl SensorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Motion => "motion",
            SensorKind::Orientation => "orientation",
            SensorKind::Microphone => "microphone",
            SensorKind::Camera => "camera",
            SensorKind::Touch => "touch",
            SensorKind::Geolocation => "geolocation",
        }
    }

    /// Streams that are pushed to the game as [`Input`]s, as opposed to
    /// handles the level samples itself
    pub fn is_push_stream(&self) -> bool {
        !matches!(self, SensorKind::Microphone | SensorKind::Camera)
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer to a motion/orientation permission prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// No prompt exists on this platform (everything except iOS 13+)
    Unsupported,
}

impl Permission {
    /// Platforms without a prompt are treated as granted
    pub fn allows(&self) -> bool {
        !matches!(self, Permission::Denied)
    }
}

/// Opaque token for a live subscription or resource handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u32);

/// Accelerometer reading (m/s², gravity included)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl MotionSample {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Device orientation angles in degrees; browsers may report null
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrientationSample {
    /// Front/back tilt, -180..180
    pub beta: Option<f32>,
    /// Left/right tilt, -90..90
    pub gamma: Option<f32>,
}

impl OrientationSample {
    pub fn beta(beta: f32) -> Self {
        Self {
            beta: Some(beta),
            gamma: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// One pointer change in canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub pointer: i32,
    pub phase: TouchPhase,
    pub pos: Vec2,
}

impl TouchEvent {
    pub fn down(pointer: i32, pos: Vec2) -> Self {
        Self {
            pointer,
            phase: TouchPhase::Down,
            pos,
        }
    }

    pub fn moved(pointer: i32, pos: Vec2) -> Self {
        Self {
            pointer,
            phase: TouchPhase::Move,
            pos,
        }
    }

    pub fn up(pointer: i32, pos: Vec2) -> Self {
        Self {
            pointer,
            phase: TouchPhase::Up,
            pos,
        }
    }

    pub fn cancel(pointer: i32) -> Self {
        Self {
            pointer,
            phase: TouchPhase::Cancel,
            pos: Vec2::ZERO,
        }
    }
}

/// Geolocation fix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFix {
    pub lat: f64,
    pub lon: f64,
    /// Accuracy radius in meters
    pub accuracy: f64,
}

/// Geolocation watch failures, mirroring the browser error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoFault {
    PermissionDenied,
    Unavailable,
    Timeout,
}

/// Downsampled RGBA camera frame
#[derive(Debug, Clone, PartialEq)]
pub struct PixelFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl PixelFrame {
    /// Frame filled with one colour
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = (width * height) as usize;
        let mut rgba = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            rgba.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        Self {
            width,
            height,
            rgba,
        }
    }
}

/// Everything the shell delivers to the game, one at a time
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Animation-frame tick; pull-based levels sample their handles here
    Frame,
    Motion(MotionSample),
    Orientation(OrientationSample),
    Touch(TouchEvent),
    Position(GeoFix),
    PositionError(GeoFault),
    /// Text typed into the final-code prompt
    Answer(String),
    /// A handle opened in the background could not be delivered
    SensorFailed { kind: SensorKind, denied: bool },
}

impl Input {
    /// Error for a [`Input::SensorFailed`] on `kind`
    pub fn sensor_failure(&self, kind: SensorKind) -> Option<Error> {
        match *self {
            Input::SensorFailed { kind: k, denied } if k == kind => Some(if denied {
                Error::PermissionDenied(kind)
            } else {
                Error::DeviceUnavailable(kind)
            }),
            _ => None,
        }
    }
}

/// Device access used by the levels
pub trait SensorHost {
    /// Ask for motion and orientation access (iOS 13+ prompt)
    fn request_motion_permission(&mut self) -> Permission;

    /// Start a stream or open a handle for `kind`
    fn subscribe(&mut self, kind: SensorKind) -> Result<SubscriptionId>;

    /// Stop a stream or close a handle. Unknown ids are ignored.
    fn release(&mut self, id: SubscriptionId);

    /// Current byte frequency magnitudes from an open microphone handle
    fn capture_audio_level(&mut self, id: SubscriptionId) -> Option<Vec<u8>>;

    /// Current frame from an open camera handle
    fn capture_video_frame(&mut self, id: SubscriptionId) -> Option<PixelFrame>;

    /// Size of the touch surface in canvas pixels
    fn surface_size(&self) -> Vec2;
}

impl<T: SensorHost + ?Sized> SensorHost for &mut T {
    fn request_motion_permission(&mut self) -> Permission {
        (**self).request_motion_permission()
    }

    fn subscribe(&mut self, kind: SensorKind) -> Result<SubscriptionId> {
        (**self).subscribe(kind)
    }

    fn release(&mut self, id: SubscriptionId) {
        (**self).release(id)
    }

    fn capture_audio_level(&mut self, id: SubscriptionId) -> Option<Vec<u8>> {
        (**self).capture_audio_level(id)
    }

    fn capture_video_frame(&mut self, id: SubscriptionId) -> Option<PixelFrame> {
        (**self).capture_video_frame(id)
    }

    fn surface_size(&self) -> Vec2 {
        (**self).surface_size()
    }
}

/// Subscriptions owned by one level
#[derive(Debug, Default)]
pub struct Handles {
    live: Vec<(SensorKind, SubscriptionId)>,
}

impl Handles {
    pub fn new() -> Self {
        Self { live: Vec::new() }
    }

    /// Subscribe through the host and remember the handle
    pub fn acquire(&mut self, host: &mut dyn SensorHost, kind: SensorKind) -> Result<SubscriptionId> {
        let id = host.subscribe(kind)?;
        log::debug!("Acquired {} handle {:?}", kind, id);
        self.live.push((kind, id));
        Ok(id)
    }

    /// Handle for a sensor this level holds
    pub fn get(&self, kind: SensorKind) -> Option<SubscriptionId> {
        self.live.iter().find(|(k, _)| *k == kind).map(|(_, id)| *id)
    }

    pub fn holds(&self, kind: SensorKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Release everything, newest first. Safe to call repeatedly.
    pub fn release_all(&mut self, host: &mut dyn SensorHost) {
        while let Some((kind, id)) = self.live.pop() {
            host.release(id);
            log::debug!("Released {} handle {:?}", kind, id);
        }
    }
}

impl Drop for Handles {
    fn drop(&mut self) {
        if !self.live.is_empty() {
            log::warn!("{} sensor handle(s) dropped without release", self.live.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_release_all_is_idempotent() {
        let mut host = ScriptedHost::new();
        let mut handles = Handles::new();
        handles.acquire(&mut host, SensorKind::Motion).unwrap();
        handles.acquire(&mut host, SensorKind::Microphone).unwrap();
        assert_eq!(host.live_count(), 2);
        assert!(handles.holds(SensorKind::Microphone));

        handles.release_all(&mut host);
        assert_eq!(host.live_count(), 0);
        assert!(handles.is_empty());

        handles.release_all(&mut host);
        assert_eq!(host.live_count(), 0);
    }

    #[test]
    fn test_failed_acquire_records_nothing() {
        let mut host = ScriptedHost::new().deny(SensorKind::Camera);
        let mut handles = Handles::new();
        assert!(handles.acquire(&mut host, SensorKind::Camera).is_err());
        assert!(handles.is_empty());
        assert_eq!(host.live_count(), 0);
    }

    #[test]
    fn test_unsupported_permission_counts_as_granted() {
        assert!(Permission::Unsupported.allows());
        assert!(Permission::Granted.allows());
        assert!(!Permission::Denied.allows());
    }

    #[test]
    fn test_sensor_failure_matches_kind() {
        let input = Input::SensorFailed {
            kind: SensorKind::Camera,
            denied: true,
        };
        assert!(matches!(
            input.sensor_failure(SensorKind::Camera),
            Some(Error::PermissionDenied(SensorKind::Camera))
        ));
        assert!(input.sensor_failure(SensorKind::Microphone).is_none());
    }

    #[test]
    fn test_solid_frame_layout() {
        let frame = PixelFrame::solid(4, 2, [10, 20, 30]);
        assert_eq!(frame.rgba.len(), 4 * 2 * 4);
        assert_eq!(&frame.rgba[4..8], &[10, 20, 30, 255]);
    }
}
