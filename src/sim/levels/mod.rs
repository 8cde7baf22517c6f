//! Level state machines
//!
//! Each challenge is one type implementing [`Level`]. A level owns its
//! detectors, accumulators and sensor [`Handles`](crate::platform::Handles);
//! it is started once, fed inputs until it returns a terminal [`Step`], and
//! cleaned up exactly when the orchestrator says so.

pub mod darkness;
pub mod inversion;
pub mod location;
pub mod multiply;
pub mod shake;
pub mod shape;
pub mod silence;
pub mod stillness;
pub mod touch_seal;

use glam::Vec2;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::platform::{Input, SensorHost};
use crate::sim::detect::{Rejection, TouchTarget};

pub use darkness::DarknessLevel;
pub use inversion::InversionLevel;
pub use location::LocationLevel;
pub use multiply::{final_product, MultiplyLevel};
pub use shake::ShakeLevel;
pub use shape::ShapeLevel;
pub use silence::SilenceLevel;
pub use stillness::StillnessLevel;
pub use touch_seal::TouchSealLevel;

/// Every challenge the game knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelKind {
    Stillness,
    Inversion,
    Shake,
    Silence,
    Darkness,
    Shape,
    TouchSeal,
    Location,
    Multiply,
}

impl LevelKind {
    pub fn name(&self) -> &'static str {
        match self {
            LevelKind::Stillness => "Stillness",
            LevelKind::Inversion => "Inversion",
            LevelKind::Shake => "Shake",
            LevelKind::Silence => "Silence",
            LevelKind::Darkness => "Darkness",
            LevelKind::Shape => "Shape",
            LevelKind::TouchSeal => "Touch Seal",
            LevelKind::Location => "Location",
            LevelKind::Multiply => "Multiply",
        }
    }

    /// Digit revealed when no override is configured
    pub fn default_digit(&self) -> &'static str {
        match self {
            LevelKind::Stillness => "7",
            LevelKind::Inversion => "2",
            LevelKind::Shake => "1",
            LevelKind::Silence => "9",
            LevelKind::Darkness => "2",
            LevelKind::Shape => "3",
            LevelKind::TouchSeal => "4",
            LevelKind::Location => "2",
            // Reveals the computed product instead
            LevelKind::Multiply => "",
        }
    }

    /// Construct a fresh, unstarted level
    pub fn build(&self, digit: String, config: &Config) -> Box<dyn Level> {
        let tuning = &config.tuning;
        match self {
            LevelKind::Stillness => Box::new(StillnessLevel::new(digit, &tuning.stillness, config.max_tick_ms)),
            LevelKind::Inversion => Box::new(InversionLevel::new(digit, &tuning.inversion)),
            LevelKind::Shake => Box::new(ShakeLevel::new(digit, &tuning.shake)),
            LevelKind::Silence => Box::new(SilenceLevel::new(digit, &tuning.silence, config.max_tick_ms)),
            LevelKind::Darkness => Box::new(DarknessLevel::new(digit, &tuning.darkness, config.max_tick_ms)),
            LevelKind::Shape => Box::new(ShapeLevel::new(digit, &tuning.shape)),
            LevelKind::TouchSeal => Box::new(TouchSealLevel::new(digit, &tuning.touch)),
            LevelKind::Location => Box::new(LocationLevel::new(digit, &tuning.location, config.max_tick_ms)),
            LevelKind::Multiply => Box::new(MultiplyLevel::new()),
        }
    }
}

/// One row of the level table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDescriptor {
    pub kind: LevelKind,
    /// Overrides the kind's default digit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digit: Option<String>,
}

impl LevelDescriptor {
    pub fn new(kind: LevelKind) -> Self {
        Self { kind, digit: None }
    }

    pub fn with_digit(kind: LevelKind, digit: impl Into<String>) -> Self {
        Self {
            kind,
            digit: Some(digit.into()),
        }
    }

    pub fn digit(&self) -> String {
        self.digit
            .clone()
            .unwrap_or_else(|| self.kind.default_digit().to_string())
    }

    /// Shown above the riddle, by position in the table (1-based)
    pub fn title(position: u32) -> String {
        const ORDINALS: [&str; 10] = [
            "First", "Second", "Third", "Fourth", "Fifth", "Sixth", "Seventh", "Eighth", "Ninth",
            "Tenth",
        ];
        match ORDINALS.get(position.saturating_sub(1) as usize) {
            Some(ordinal) => format!("The {} Key", ordinal),
            None => format!("Key {}", position),
        }
    }

    /// Stillness, inversion, shake, silence, darkness, triangle, touch seal,
    /// then the multiplication riddle
    pub fn canonical() -> Vec<Self> {
        [
            LevelKind::Stillness,
            LevelKind::Inversion,
            LevelKind::Shake,
            LevelKind::Silence,
            LevelKind::Darkness,
            LevelKind::Shape,
            LevelKind::TouchSeal,
            LevelKind::Multiply,
        ]
        .into_iter()
        .map(Self::new)
        .collect()
    }
}

/// What a level wants revealed when it completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reveal {
    /// Appended to the unlocked digits
    Digit(String),
    /// Shown as the final code; not a digit
    FinalCode(String),
}

impl Reveal {
    pub fn symbol(&self) -> &str {
        match self {
            Reveal::Digit(s) | Reveal::FinalCode(s) => s,
        }
    }
}

/// Result of handling one input
#[derive(Debug)]
pub enum Step {
    Continue,
    Complete(Reveal),
    Fail(Error),
}

/// Feedback-worthy moments that don't change the lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Inversion held long enough; the fill is running
    Armed,
    /// Touched the right target
    CorrectTouch(usize),
    /// Touched a target out of order
    WrongAttempt,
    /// Progress on an ordered sequence was lost
    SequenceReset,
    /// All targets held; digit follows after a pause
    Settling,
    ShapeRejected(Rejection),
    /// Final entry was not a number
    InvalidEntry(String),
    WrongAnswer,
    LocationTimeout,
    PositionUnavailable,
}

/// Read-only snapshot for drawing a level
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelView {
    /// Touch targets, each with whether it is held
    pub targets: Vec<(TouchTarget, bool)>,
    /// Stroke being drawn
    pub trail: Vec<Vec2>,
    /// Live detector reading: spectrum mean, luma or meters to target
    pub reading: Option<f32>,
}

/// Everything a level may touch while handling one call
pub struct LevelContext<'a> {
    pub host: &'a mut dyn SensorHost,
    pub now_ms: f64,
    /// Digits unlocked so far, in order
    pub digits: &'a [String],
    pub rng: &'a mut Pcg32,
    pub debug: bool,
    signals: Vec<Signal>,
}

impl<'a> LevelContext<'a> {
    pub fn new(
        host: &'a mut dyn SensorHost,
        now_ms: f64,
        digits: &'a [String],
        rng: &'a mut Pcg32,
    ) -> Self {
        Self {
            host,
            now_ms,
            digits,
            rng,
            debug: false,
            signals: Vec::new(),
        }
    }

    pub fn signal(&mut self, signal: Signal) {
        self.signals.push(signal);
    }

    pub fn take_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }
}

pub trait Level {
    fn kind(&self) -> LevelKind;

    /// Acquire sensors and reset all progress. An error means the level
    /// could not run at all.
    fn start(&mut self, ctx: &mut LevelContext<'_>) -> Result<()>;

    /// Feed one input
    fn handle(&mut self, ctx: &mut LevelContext<'_>, input: &Input) -> Step;

    /// Completion estimate in 0..=1
    fn progress(&self) -> f32;

    fn view(&self) -> LevelView {
        LevelView::default()
    }

    /// Release every handle. Idempotent.
    fn cleanup(&mut self, host: &mut dyn SensorHost);
}
