//! Game configuration and detector tuning
//!
//! Every threshold lives here so the shell can override it from JSON.
//! Loaded from LocalStorage on web, from `SEALED_CODE_CONFIG` on native.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sim::levels::LevelDescriptor;

/// Level 1: hold still
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StillnessTuning {
    /// Sum of per-axis deltas above which the device counts as moving
    pub threshold: f32,
    pub required_ms: f64,
}

impl Default for StillnessTuning {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            required_ms: 1000.0,
        }
    }
}

/// Level 2: turn upside down
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InversionTuning {
    /// Exclusive beta window (degrees) for inverted portrait
    pub beta_min: f32,
    pub beta_max: f32,
    /// Time inverted before the fill starts
    pub arm_ms: f64,
    /// Fill duration once armed
    pub fill_ms: f64,
}

impl Default for InversionTuning {
    fn default() -> Self {
        Self {
            beta_min: -130.0,
            beta_max: -50.0,
            arm_ms: 1000.0,
            fill_ms: 2200.0,
        }
    }
}

/// Level 3: shake
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShakeTuning {
    /// Delta magnitude between samples that counts as shaking
    pub threshold: f32,
    pub required_ms: f64,
}

impl Default for ShakeTuning {
    fn default() -> Self {
        Self {
            threshold: 5.0,
            required_ms: 3000.0,
        }
    }
}

/// Level 4: silence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SilenceTuning {
    /// Mean byte magnitude below which the room is silent
    pub threshold: f32,
    pub required_ms: f64,
}

impl Default for SilenceTuning {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            required_ms: 5000.0,
        }
    }
}

/// Level 5: darkness
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DarknessTuning {
    /// Mean luma (0-255) below which the frame is dark
    pub threshold: f32,
    pub required_ms: f64,
    /// Downsampled analysis frame size requested from the camera
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Default for DarknessTuning {
    fn default() -> Self {
        Self {
            threshold: 3.0,
            required_ms: 3000.0,
            frame_width: 160,
            frame_height: 120,
        }
    }
}

/// Level 6: draw a triangle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeTuning {
    /// Decimation distance between buffered points (px)
    pub min_point_distance: f32,
    /// Window half-width for turn angles (points)
    pub look_ahead: usize,
    /// Turn must be this far from straight (degrees)
    pub angle_threshold: f32,
    /// Spacing between accepted corners (px)
    pub min_corner_distance: f32,
    /// Accepted corner angle range, exclusive (degrees)
    pub min_corner_angle: f32,
    pub max_corner_angle: f32,
    /// Start/end gap allowed, as a fraction of the smaller canvas side
    pub closure_ratio: f32,
    /// Smallest accepted triangle (px²)
    pub min_area: f32,
}

impl Default for ShapeTuning {
    fn default() -> Self {
        Self {
            min_point_distance: 20.0,
            look_ahead: 8,
            angle_threshold: 45.0,
            min_corner_distance: 40.0,
            min_corner_angle: 30.0,
            max_corner_angle: 150.0,
            closure_ratio: 0.15,
            min_area: 1000.0,
        }
    }
}

/// Level 7: touch the seal in order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchTuning {
    pub target_radius: f32,
    /// Extra slack around each target
    pub touch_buffer: f32,
    /// Target inset from the left/right canvas edges
    pub margin_x: f32,
    /// Target inset from the top/bottom canvas edges
    pub margin_y: f32,
    /// Pause between the last touch and the reveal
    pub settle_ms: f64,
}

impl Default for TouchTuning {
    fn default() -> Self {
        Self {
            target_radius: 50.0,
            touch_buffer: 15.0,
            margin_x: 100.0,
            margin_y: 120.0,
            settle_ms: 1500.0,
        }
    }
}

/// Alternate seventh seal: reach a place
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationTuning {
    pub target_lat: f64,
    pub target_lon: f64,
    /// Distance counted as "there" (m)
    pub radius_m: f64,
    /// Fixes less accurate than this are ignored (m)
    pub max_accuracy_m: f64,
    /// Time to stay in range
    pub hold_ms: f64,
    /// Longest wait for a fix before a timeout is reported
    pub timeout_ms: f64,
    /// Distance at which the hot/cold ratio bottoms out (m)
    pub hot_cold_range_m: f64,
}

impl Default for LocationTuning {
    fn default() -> Self {
        Self {
            target_lat: 44.4179171,
            target_lon: 26.0019865,
            radius_m: 5.0,
            max_accuracy_m: 50.0,
            hold_ms: 5000.0,
            timeout_ms: 10_000.0,
            hot_cold_range_m: 1000.0,
        }
    }
}

/// Detector thresholds for every level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub stillness: StillnessTuning,
    pub inversion: InversionTuning,
    pub shake: ShakeTuning,
    pub silence: SilenceTuning,
    pub darkness: DarknessTuning,
    pub shape: ShapeTuning,
    pub touch: TouchTuning,
    pub location: LocationTuning,
}

/// Top-level game configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tuning: Tuning,
    /// Level table, played in order
    pub levels: Vec<LevelDescriptor>,
    /// Keep a digit that is already in the unlocked list
    pub allow_duplicate_digits: bool,
    /// Start the next level as soon as one completes
    pub auto_advance: bool,
    /// Longest gap credited in one tick to a frame-driven accumulator
    pub max_tick_ms: f64,
    /// Verbose detector diagnostics
    pub debug_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tuning: Tuning::default(),
            levels: LevelDescriptor::canonical(),
            allow_duplicate_digits: true,
            auto_advance: false,
            max_tick_ms: 100.0,
            debug_mode: false,
        }
    }
}

impl Config {
    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "sealed_code_config";

    /// Environment variable naming a JSON config file (native only)
    pub const ENV_VAR: &'static str = "SEALED_CODE_CONFIG";

    /// Parse a (possibly partial) JSON config; missing fields keep defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load config from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(config) => {
                        log::info!("Loaded config from LocalStorage");
                        return config;
                    }
                    Err(e) => log::warn!("Ignoring stored config: {}", e),
                }
            }
        }

        log::info!("Using default config");
        Self::default()
    }

    /// Save config to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = self.to_json() {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Config saved");
            }
        }
    }

    /// Load config from the file named by `SEALED_CODE_CONFIG`
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        let Ok(path) = std::env::var(Self::ENV_VAR) else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path);
                    config
                }
                Err(e) => {
                    log::warn!("Ignoring config {}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Cannot read config {}: {}", path, e);
                Self::default()
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}
