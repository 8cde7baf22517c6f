//! In-memory sensor host
//!
//! Used by the native walkthrough and by tests. Tracks every subscription so
//! leaks across level transitions are observable, and serves queued audio
//! spectra / camera frames to pull-based levels.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use glam::Vec2;

use super::{Permission, PixelFrame, SensorHost, SensorKind, SubscriptionId};
use crate::error::{Error, Result};

/// Default canvas size for touch levels
pub const DEFAULT_SURFACE: Vec2 = Vec2::new(480.0, 480.0);

#[derive(Debug)]
pub struct ScriptedHost {
    permission: Permission,
    denied: BTreeSet<SensorKind>,
    unavailable: BTreeSet<SensorKind>,
    live: BTreeMap<SubscriptionId, SensorKind>,
    next_id: u32,
    acquisitions: Vec<SensorKind>,
    spectra: VecDeque<Vec<u8>>,
    ambient_spectrum: Option<Vec<u8>>,
    frames: VecDeque<PixelFrame>,
    ambient_frame: Option<PixelFrame>,
    surface: Vec2,
}

impl Default for ScriptedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self {
            permission: Permission::Unsupported,
            denied: BTreeSet::new(),
            unavailable: BTreeSet::new(),
            live: BTreeMap::new(),
            next_id: 1,
            acquisitions: Vec::new(),
            spectra: VecDeque::new(),
            ambient_spectrum: None,
            frames: VecDeque::new(),
            ambient_frame: None,
            surface: DEFAULT_SURFACE,
        }
    }

    /// Answer the motion permission prompt with `permission`
    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }

    /// Refuse subscriptions to `kind`
    pub fn deny(mut self, kind: SensorKind) -> Self {
        self.denied.insert(kind);
        self
    }

    /// Pretend `kind` does not exist on this device
    pub fn without(mut self, kind: SensorKind) -> Self {
        self.unavailable.insert(kind);
        self
    }

    pub fn with_surface(mut self, size: Vec2) -> Self {
        self.surface = size;
        self
    }

    /// Queue one spectrum for the next microphone capture
    pub fn push_spectrum(&mut self, spectrum: Vec<u8>) {
        self.spectra.push_back(spectrum);
    }

    /// Spectrum returned when the queue is empty
    pub fn set_ambient_spectrum(&mut self, spectrum: Vec<u8>) {
        self.ambient_spectrum = Some(spectrum);
    }

    /// Queue one frame for the next camera capture
    pub fn push_frame(&mut self, frame: PixelFrame) {
        self.frames.push_back(frame);
    }

    /// Frame returned when the queue is empty
    pub fn set_ambient_frame(&mut self, frame: PixelFrame) {
        self.ambient_frame = Some(frame);
    }

    /// Number of subscriptions currently open
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, kind: SensorKind) -> bool {
        self.live.values().any(|k| *k == kind)
    }

    /// Every successful subscribe, in order
    pub fn acquisitions(&self) -> &[SensorKind] {
        &self.acquisitions
    }

    fn holds(&self, id: SubscriptionId, kind: SensorKind) -> bool {
        self.live.get(&id) == Some(&kind)
    }
}

impl SensorHost for ScriptedHost {
    fn request_motion_permission(&mut self) -> Permission {
        self.permission
    }

    fn subscribe(&mut self, kind: SensorKind) -> Result<SubscriptionId> {
        if self.unavailable.contains(&kind) {
            return Err(Error::DeviceUnavailable(kind));
        }
        if self.denied.contains(&kind) {
            return Err(Error::PermissionDenied(kind));
        }
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.live.insert(id, kind);
        self.acquisitions.push(kind);
        Ok(id)
    }

    fn release(&mut self, id: SubscriptionId) {
        self.live.remove(&id);
    }

    fn capture_audio_level(&mut self, id: SubscriptionId) -> Option<Vec<u8>> {
        if !self.holds(id, SensorKind::Microphone) {
            log::warn!("Audio capture on closed handle {:?}", id);
            return None;
        }
        self.spectra
            .pop_front()
            .or_else(|| self.ambient_spectrum.clone())
    }

    fn capture_video_frame(&mut self, id: SubscriptionId) -> Option<PixelFrame> {
        if !self.holds(id, SensorKind::Camera) {
            log::warn!("Video capture on closed handle {:?}", id);
            return None;
        }
        self.frames.pop_front().or_else(|| self.ambient_frame.clone())
    }

    fn surface_size(&self) -> Vec2 {
        self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_needs_matching_live_handle() {
        let mut host = ScriptedHost::new();
        host.set_ambient_spectrum(vec![0; 8]);
        let mic = host.subscribe(SensorKind::Microphone).unwrap();
        let motion = host.subscribe(SensorKind::Motion).unwrap();

        assert_eq!(host.capture_audio_level(mic), Some(vec![0; 8]));
        assert_eq!(host.capture_audio_level(motion), None);

        host.release(mic);
        assert_eq!(host.capture_audio_level(mic), None);
    }

    #[test]
    fn test_queued_spectra_before_ambient() {
        let mut host = ScriptedHost::new();
        host.set_ambient_spectrum(vec![0]);
        host.push_spectrum(vec![200]);
        let mic = host.subscribe(SensorKind::Microphone).unwrap();

        assert_eq!(host.capture_audio_level(mic), Some(vec![200]));
        assert_eq!(host.capture_audio_level(mic), Some(vec![0]));
    }

    #[test]
    fn test_unavailable_wins_over_denied() {
        let mut host = ScriptedHost::new()
            .deny(SensorKind::Camera)
            .without(SensorKind::Camera);
        assert!(matches!(
            host.subscribe(SensorKind::Camera),
            Err(Error::DeviceUnavailable(SensorKind::Camera))
        ));
    }
}
