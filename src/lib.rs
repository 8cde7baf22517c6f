//! Sealed Code - a sensor-driven escape room
//!
//! Eight seals, each broken by doing something to the phone: holding it
//! still, turning it over, shaking it, going quiet, covering the camera,
//! drawing a triangle, touching a rainbow in order. Every seal reveals a
//! digit; the last one asks for their product.
//!
//! Core modules:
//! - `sim`: Levels, detectors and the orchestrator (platform-free)
//! - `platform`: Sensor host abstraction, scripted host, browser host
//! - `feedback`: Sounds and vibration for level signals
//! - `config`: Tuning and the level table

pub mod config;
pub mod error;
pub mod feedback;
pub mod platform;
pub mod sim;

pub use config::Config;
pub use error::{Error, Result};
pub use sim::{Game, GameObserver, GamePhase, GameState};

/// Browser-facing constants
pub mod consts {
    /// FFT size for the microphone analyser (128 frequency bins)
    pub const ANALYSER_FFT_SIZE: u32 = 256;

    /// Ideal camera capture size; frames are downsampled before analysis
    pub const CAMERA_IDEAL_WIDTH: u32 = 320;
    pub const CAMERA_IDEAL_HEIGHT: u32 = 240;

    /// Geolocation watch options
    pub const GEO_TIMEOUT_MS: u32 = 10_000;
    pub const GEO_MAXIMUM_AGE_MS: u32 = 1_000;
}
