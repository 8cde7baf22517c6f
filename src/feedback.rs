//! Player feedback for level signals
//!
//! Short procedural tones (Web Audio, no sound files) plus haptic patterns.
//! The cue table is platform-free; only [`FeedbackPlayer`] touches the browser.

use crate::sim::Signal;

/// Oscillator shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

/// One note of a cue
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub freq: f32,
    pub waveform: Waveform,
    /// Peak gain before master volume
    pub gain: f32,
    /// Seconds from cue start
    pub delay: f64,
    /// Seconds until the envelope has decayed
    pub decay: f64,
}

impl Tone {
    const fn note(freq: f32, waveform: Waveform, gain: f32, delay: f64, decay: f64) -> Self {
        Self {
            freq,
            waveform,
            gain,
            delay,
            decay,
        }
    }
}

use Waveform::{Sawtooth, Sine, Square, Triangle};

const TAP: &[Tone] = &[Tone::note(660.0, Sine, 0.3, 0.0, 0.08)];
const WRONG: &[Tone] = &[
    Tone::note(220.0, Square, 0.15, 0.0, 0.12),
    Tone::note(180.0, Square, 0.15, 0.15, 0.12),
];
const RESET: &[Tone] = &[Tone::note(300.0, Sawtooth, 0.15, 0.0, 0.3)];
const SETTLE: &[Tone] = &[
    Tone::note(520.0, Triangle, 0.25, 0.0, 0.2),
    Tone::note(780.0, Triangle, 0.25, 0.08, 0.2),
];
const REJECTED: &[Tone] = &[Tone::note(250.0, Triangle, 0.2, 0.0, 0.15)];
const REVEAL: &[Tone] = &[
    Tone::note(400.0, Triangle, 0.3, 0.0, 0.4),
    Tone::note(500.0, Triangle, 0.3, 0.1, 0.4),
    Tone::note(600.0, Triangle, 0.3, 0.2, 0.4),
    Tone::note(800.0, Triangle, 0.3, 0.3, 0.4),
];
const VICTORY: &[Tone] = &[
    Tone::note(500.0, Triangle, 0.25, 0.0, 0.25),
    Tone::note(600.0, Triangle, 0.25, 0.08, 0.25),
    Tone::note(700.0, Triangle, 0.25, 0.16, 0.25),
    Tone::note(800.0, Triangle, 0.25, 0.24, 0.25),
    Tone::note(1000.0, Triangle, 0.25, 0.32, 0.6),
];
const FAIL: &[Tone] = &[
    Tone::note(400.0, Sine, 0.3, 0.0, 0.3),
    Tone::note(300.0, Sine, 0.3, 0.2, 0.3),
    Tone::note(200.0, Sine, 0.3, 0.4, 0.3),
];

/// Things worth hearing or feeling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// A touch target accepted
    Tap,
    /// Wrong target or wrong answer
    Wrong,
    /// Progress lost
    Reset,
    /// Level armed or settling toward its reveal
    Settle,
    /// Drawing not accepted
    Rejected,
    /// A digit was revealed
    Reveal,
    /// The final code was accepted
    Victory,
    /// A level failed
    Fail,
}

impl Cue {
    /// Cue for a level signal, if it deserves one
    pub fn for_signal(signal: &Signal) -> Option<Cue> {
        match signal {
            Signal::CorrectTouch(_) => Some(Cue::Tap),
            Signal::WrongAttempt | Signal::WrongAnswer => Some(Cue::Wrong),
            Signal::SequenceReset => Some(Cue::Reset),
            Signal::Armed | Signal::Settling => Some(Cue::Settle),
            Signal::ShapeRejected(_) => Some(Cue::Rejected),
            Signal::InvalidEntry(_) | Signal::LocationTimeout | Signal::PositionUnavailable => None,
        }
    }

    /// Vibration pattern in milliseconds, alternating on/off
    pub fn vibration(&self) -> &'static [u32] {
        match self {
            Cue::Tap => &[50],
            Cue::Wrong => &[100, 50, 100],
            Cue::Reset => &[100, 50, 100],
            Cue::Settle | Cue::Reveal => &[50, 30, 50],
            Cue::Rejected => &[80],
            Cue::Victory => &[100, 50, 100, 50, 300],
            Cue::Fail => &[300],
        }
    }

    pub fn tones(&self) -> &'static [Tone] {
        match self {
            Cue::Tap => TAP,
            Cue::Wrong => WRONG,
            Cue::Reset => RESET,
            Cue::Settle => SETTLE,
            Cue::Rejected => REJECTED,
            Cue::Reveal => REVEAL,
            Cue::Victory => VICTORY,
            Cue::Fail => FAIL,
        }
    }

    /// Total length of the cue in seconds
    pub fn duration(&self) -> f64 {
        self.tones()
            .iter()
            .map(|t| t.delay + t.decay)
            .fold(0.0, f64::max)
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::FeedbackPlayer;

#[cfg(target_arch = "wasm32")]
mod web {
    use wasm_bindgen::JsValue;
    use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

    use super::{Cue, Tone, Waveform};

    impl From<Waveform> for OscillatorType {
        fn from(waveform: Waveform) -> Self {
            match waveform {
                Waveform::Sine => OscillatorType::Sine,
                Waveform::Square => OscillatorType::Square,
                Waveform::Triangle => OscillatorType::Triangle,
                Waveform::Sawtooth => OscillatorType::Sawtooth,
            }
        }
    }

    /// Plays cues through Web Audio and the vibration API
    pub struct FeedbackPlayer {
        ctx: Option<AudioContext>,
        volume: f32,
        muted: bool,
        haptics: bool,
    }

    impl Default for FeedbackPlayer {
        fn default() -> Self {
            Self::new()
        }
    }

    impl FeedbackPlayer {
        pub fn new() -> Self {
            // Fails outside a secure context
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - sounds disabled");
            }
            Self {
                ctx,
                volume: 0.8,
                muted: false,
                haptics: true,
            }
        }

        /// Resume audio context (required after user gesture)
        pub fn resume(&self) {
            if let Some(ctx) = &self.ctx {
                let _ = ctx.resume();
            }
        }

        pub fn set_volume(&mut self, volume: f32) {
            self.volume = volume.clamp(0.0, 1.0);
        }

        pub fn set_muted(&mut self, muted: bool) {
            self.muted = muted;
        }

        pub fn set_haptics(&mut self, enabled: bool) {
            self.haptics = enabled;
        }

        pub fn play(&self, cue: Cue) {
            if self.haptics {
                vibrate(cue.vibration());
            }
            if self.muted || self.volume <= 0.0 {
                return;
            }
            let Some(ctx) = &self.ctx else { return };

            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }
            for tone in cue.tones() {
                self.play_tone(ctx, tone);
            }
        }

        /// Create an oscillator with gain envelope
        fn create_osc(
            &self,
            ctx: &AudioContext,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Option<(OscillatorNode, GainNode)> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;

            Some((osc, gain))
        }

        fn play_tone(&self, ctx: &AudioContext, tone: &Tone) {
            let Some((osc, gain)) = self.create_osc(ctx, tone.freq, tone.waveform.into()) else {
                return;
            };
            let t = ctx.current_time() + tone.delay;

            gain.gain().set_value_at_time(self.volume * tone.gain, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + tone.decay)
                .ok();

            osc.start_with_when(t).ok();
            osc.stop_with_when(t + tone.decay + 0.05).ok();
        }
    }

    /// Vibrate if the device supports it; silently ignored otherwise
    fn vibrate(pattern: &[u32]) {
        let Some(window) = web_sys::window() else { return };
        let navigator = window.navigator();
        match pattern {
            [] => {}
            [ms] => {
                navigator.vibrate_with_duration(*ms);
            }
            _ => {
                let array: js_sys::Array = pattern.iter().map(|ms| JsValue::from(*ms)).collect();
                navigator.vibrate_with_pattern(&array);
            }
        }
    }
}
