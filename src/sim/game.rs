//! Level orchestrator
//!
//! [`Game`] walks the level table, keeps exactly one level live at a time,
//! collects revealed digits and reports everything to a [`GameObserver`].
//! Any transition (completion, failure, jump, shutdown) cleans the current
//! level up before anything else happens.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::platform::{Input, SensorHost, SensorKind};
use crate::sim::levels::{
    Level, LevelContext, LevelDescriptor, LevelKind, LevelView, Reveal, Signal, Step,
};

pub use crate::sim::levels::final_product;

/// Where the run is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Nothing started yet
    Idle,
    /// A level is live and accepting input
    Active,
    /// Current level solved; waiting for `next_level`
    Complete,
    /// Current level could not continue; waiting for `retry` or `jump_to`
    Failed,
    /// Last level solved
    Finished,
}

/// Run state owned by the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    /// 1-based index into the level table
    pub current_level: u32,
    /// Revealed digits, in completion order
    pub unlocked_digits: Vec<String>,
    pub is_level_active: bool,
    pub phase: GamePhase,
    /// Set once the last level is solved
    pub final_code: Option<String>,
    /// Why the current level failed
    pub last_failure: Option<String>,
}

impl GameState {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            current_level: 1,
            unlocked_digits: Vec::new(),
            is_level_active: false,
            phase: GamePhase::Idle,
            final_code: None,
            last_failure: None,
        }
    }
}

/// Receives lifecycle notifications. Every method defaults to a no-op.
pub trait GameObserver {
    fn on_level_started(&mut self, _level: u32, _kind: LevelKind, _title: &str) {}

    /// Fired exactly once per solved level
    fn on_digit_revealed(&mut self, _digit: &str) {}

    fn on_level_progress(&mut self, _ratio: f32) {}

    fn on_level_complete(&mut self, _level: u32) {}

    fn on_level_failed(&mut self, _level: u32, _reason: &Error) {}

    fn on_signal(&mut self, _signal: &Signal) {}
}

impl GameObserver for () {}

/// Observer notifications as data
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    LevelStarted { level: u32, kind: LevelKind },
    DigitRevealed(String),
    Progress(f32),
    LevelComplete(u32),
    LevelFailed { level: u32, reason: String },
    Signal(Signal),
}

/// Observer that records every notification
#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<GameEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain recorded events
    pub fn take(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn digits(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                GameEvent::DigitRevealed(d) => Some(d.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn signals(&self) -> Vec<&Signal> {
        self.events
            .iter()
            .filter_map(|e| match e {
                GameEvent::Signal(s) => Some(s),
                _ => None,
            })
            .collect()
    }
}

impl GameObserver for EventLog {
    fn on_level_started(&mut self, level: u32, kind: LevelKind, _title: &str) {
        self.events.push(GameEvent::LevelStarted { level, kind });
    }

    fn on_digit_revealed(&mut self, digit: &str) {
        self.events.push(GameEvent::DigitRevealed(digit.to_string()));
    }

    fn on_level_progress(&mut self, ratio: f32) {
        self.events.push(GameEvent::Progress(ratio));
    }

    fn on_level_complete(&mut self, level: u32) {
        self.events.push(GameEvent::LevelComplete(level));
    }

    fn on_level_failed(&mut self, level: u32, reason: &Error) {
        self.events.push(GameEvent::LevelFailed {
            level,
            reason: reason.to_string(),
        });
    }

    fn on_signal(&mut self, signal: &Signal) {
        self.events.push(GameEvent::Signal(signal.clone()));
    }
}

/// The orchestrator
pub struct Game<H: SensorHost, O: GameObserver> {
    config: Config,
    state: GameState,
    host: H,
    observer: O,
    rng: Pcg32,
    /// The only live level, if any
    active: Option<Box<dyn Level>>,
    last_progress: f32,
}

impl<H: SensorHost, O: GameObserver> Game<H, O> {
    pub fn new(config: Config, host: H, observer: O, seed: u64) -> Self {
        Self {
            config,
            state: GameState::new(seed),
            host,
            observer,
            rng: Pcg32::seed_from_u64(seed),
            active: None,
            last_progress: 0.0,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn level_count(&self) -> u32 {
        self.config.levels.len() as u32
    }

    /// Kind of the live level
    pub fn active_kind(&self) -> Option<LevelKind> {
        self.active.as_ref().map(|level| level.kind())
    }

    /// Descriptor for the current level
    pub fn current_descriptor(&self) -> Option<&LevelDescriptor> {
        self.descriptor(self.state.current_level)
    }

    fn descriptor(&self, level: u32) -> Option<&LevelDescriptor> {
        level
            .checked_sub(1)
            .and_then(|i| self.config.levels.get(i as usize))
    }

    /// Progress of the live level, 0 when none
    pub fn progress(&self) -> f32 {
        self.active.as_ref().map_or(0.0, |level| level.progress())
    }

    /// Drawing snapshot of the live level
    pub fn view(&self) -> LevelView {
        self.active.as_ref().map(|level| level.view()).unwrap_or_default()
    }

    /// Ask for motion access, then start the first level. A denied prompt
    /// fails the run before any level starts.
    pub fn begin(&mut self, now_ms: f64) -> Result<()> {
        let permission = self.host.request_motion_permission();
        log::info!("Motion permission: {:?}", permission);
        if !permission.allows() {
            let reason = Error::PermissionDenied(SensorKind::Motion);
            self.state.phase = GamePhase::Failed;
            self.state.last_failure = Some(reason.to_string());
            self.observer.on_level_failed(self.state.current_level, &reason);
            return Err(reason);
        }
        self.start_level(1, now_ms)
    }

    /// Tear down whatever is live and start `level` (1-based). Only an
    /// unknown level is an error; a level that cannot acquire its sensors
    /// is reported as failed.
    pub fn start_level(&mut self, level: u32, now_ms: f64) -> Result<()> {
        let Some(descriptor) = self.descriptor(level).cloned() else {
            return Err(Error::UnknownLevel(level));
        };
        self.teardown();

        self.state.current_level = level;
        self.state.last_failure = None;
        self.last_progress = 0.0;

        let mut next = descriptor.kind.build(descriptor.digit(), &self.config);
        let mut ctx = LevelContext::new(
            &mut self.host,
            now_ms,
            &self.state.unlocked_digits,
            &mut self.rng,
        );
        ctx.debug = self.config.debug_mode;
        let started = next.start(&mut ctx);
        let signals = ctx.take_signals();
        self.emit(signals);

        match started {
            Ok(()) => {
                let title = LevelDescriptor::title(level);
                log::info!("Level {} started: {} ({})", level, title, descriptor.kind.name());
                self.active = Some(next);
                self.state.is_level_active = true;
                self.state.phase = GamePhase::Active;
                self.observer.on_level_started(level, descriptor.kind, &title);
            }
            Err(e) => {
                next.cleanup(&mut self.host);
                self.fail(e);
            }
        }
        Ok(())
    }

    /// Deliver one timestamped input to the live level
    pub fn handle(&mut self, now_ms: f64, input: Input) {
        let Some(level) = self.active.as_mut() else {
            return;
        };

        let mut ctx = LevelContext::new(
            &mut self.host,
            now_ms,
            &self.state.unlocked_digits,
            &mut self.rng,
        );
        ctx.debug = self.config.debug_mode;
        let step = level.handle(&mut ctx, &input);
        let signals = ctx.take_signals();
        let progress = level.progress();

        self.emit(signals);
        if (progress - self.last_progress).abs() > f32::EPSILON {
            self.last_progress = progress;
            self.observer.on_level_progress(progress);
        }

        match step {
            Step::Continue => {}
            Step::Complete(reveal) => self.complete(reveal, now_ms),
            Step::Fail(e) => {
                self.teardown();
                self.fail(e);
            }
        }
    }

    /// Start the level after the current one, once it is solved
    pub fn next_level(&mut self, now_ms: f64) -> Result<()> {
        match self.state.phase {
            GamePhase::Complete => {}
            GamePhase::Finished => return Err(Error::UnknownLevel(self.state.current_level + 1)),
            _ => return Err(Error::LevelNotComplete(self.state.current_level)),
        }
        self.start_level(self.state.current_level + 1, now_ms)
    }

    /// Debug jump; same cleanup-then-start as any other transition
    pub fn jump_to(&mut self, level: u32, now_ms: f64) -> Result<()> {
        log::info!("Jumping to level {}", level);
        self.start_level(level, now_ms)
    }

    /// Restart the current level from scratch
    pub fn retry(&mut self, now_ms: f64) -> Result<()> {
        self.start_level(self.state.current_level, now_ms)
    }

    /// Release everything; the game can be resumed with `jump_to`
    pub fn shutdown(&mut self) {
        if self.active.is_some() {
            log::info!("Shutting down level {}", self.state.current_level);
        }
        self.teardown();
        if self.state.phase == GamePhase::Active {
            self.state.phase = GamePhase::Idle;
        }
    }

    fn teardown(&mut self) {
        if let Some(mut level) = self.active.take() {
            level.cleanup(&mut self.host);
        }
        self.state.is_level_active = false;
    }

    fn emit(&mut self, signals: Vec<Signal>) {
        for signal in &signals {
            log::debug!("Signal: {:?}", signal);
            self.observer.on_signal(signal);
        }
    }

    fn complete(&mut self, reveal: Reveal, now_ms: f64) {
        self.teardown();
        let level = self.state.current_level;

        match &reveal {
            Reveal::Digit(digit) => {
                let duplicate = self.state.unlocked_digits.contains(digit);
                if self.config.allow_duplicate_digits || !duplicate {
                    self.state.unlocked_digits.push(digit.clone());
                }
            }
            Reveal::FinalCode(code) => {
                self.state.final_code = Some(code.clone());
            }
        }
        log::info!("Level {} complete, revealed {}", level, reveal.symbol());
        self.observer.on_digit_revealed(reveal.symbol());
        self.observer.on_level_complete(level);

        if level >= self.level_count() {
            self.state.phase = GamePhase::Finished;
            log::info!("All seals broken: {:?}", self.state.final_code);
            return;
        }
        self.state.phase = GamePhase::Complete;
        if self.config.auto_advance {
            // Only an unknown level can fail here, and the table was checked
            let _ = self.next_level(now_ms);
        }
    }

    fn fail(&mut self, reason: Error) {
        let level = self.state.current_level;
        log::warn!("Level {} failed: {}", level, reason);
        self.state.phase = GamePhase::Failed;
        self.state.is_level_active = false;
        self.state.last_failure = Some(reason.to_string());
        self.observer.on_level_failed(level, &reason);
    }
}

impl<H: SensorHost, O: GameObserver> Drop for Game<H, O> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{MotionSample, Permission, ScriptedHost};

    fn config(kinds: &[LevelKind]) -> Config {
        Config {
            levels: kinds.iter().copied().map(LevelDescriptor::new).collect(),
            ..Config::default()
        }
    }

    /// Frames every 16ms until the stillness level completes
    fn hold_still<H: SensorHost, O: GameObserver>(game: &mut Game<H, O>, from: f64) -> f64 {
        let mut t = from;
        while game.active_kind() == Some(LevelKind::Stillness) {
            t += 16.0;
            game.handle(t, Input::Frame);
            assert!(t < from + 2000.0, "stillness never completed");
        }
        t
    }

    #[test]
    fn test_final_product_reexport() {
        assert_eq!(final_product(&["7", "2", "1", "9"]).unwrap(), 126);
    }

    #[test]
    fn test_stillness_reveals_one_digit() {
        let mut host = ScriptedHost::new();
        let mut game = Game::new(Config::default(), &mut host, EventLog::new(), 1);
        game.begin(0.0).unwrap();
        assert_eq!(game.state().phase, GamePhase::Active);
        assert!(game.state().is_level_active);

        game.handle(1.0, Input::Motion(MotionSample::new(0.0, 9.8, 0.0)));
        hold_still(&mut game, 0.0);

        assert_eq!(game.state().unlocked_digits, vec!["7"]);
        assert_eq!(game.state().phase, GamePhase::Complete);
        assert!(!game.state().is_level_active);
        assert_eq!(game.observer().digits(), vec!["7"]);
        assert_eq!(game.host().live_count(), 0);
    }

    #[test]
    fn test_denied_motion_fails_run() {
        let mut host = ScriptedHost::new().with_permission(Permission::Denied);
        let mut game = Game::new(Config::default(), &mut host, EventLog::new(), 1);
        assert!(matches!(
            game.begin(0.0),
            Err(Error::PermissionDenied(SensorKind::Motion))
        ));
        assert_eq!(game.state().phase, GamePhase::Failed);
        assert_eq!(game.active_kind(), None);
    }

    #[test]
    fn test_failed_start_releases_and_reports() {
        let mut host = ScriptedHost::new().deny(SensorKind::Microphone);
        let mut game = Game::new(Config::default(), &mut host, EventLog::new(), 1);
        game.jump_to(4, 0.0).unwrap();

        assert_eq!(game.state().phase, GamePhase::Failed);
        assert_eq!(game.active_kind(), None);
        assert_eq!(game.host().live_count(), 0);
        assert_eq!(
            game.observer().events,
            vec![GameEvent::LevelFailed {
                level: 4,
                reason: "microphone access was denied".into()
            }]
        );

        // Input while failed is ignored
        game.handle(10.0, Input::Frame);
        assert_eq!(game.state().phase, GamePhase::Failed);

        // Another level still starts
        game.jump_to(3, 20.0).unwrap();
        assert_eq!(game.active_kind(), Some(LevelKind::Shake));
    }

    #[test]
    fn test_jump_releases_previous_level() {
        let mut host = ScriptedHost::new();
        {
            let mut game = Game::new(Config::default(), &mut host, (), 1);
            for level in 1..=8 {
                game.jump_to(level, 0.0).unwrap();
                let expected = usize::from(!matches!(game.active_kind(), Some(LevelKind::Multiply)));
                assert_eq!(game.host().live_count(), expected, "level {}", level);
            }
            game.jump_to(5, 0.0).unwrap();
            assert_eq!(game.host().live_count(), 1);
        }
        // Dropping the game releases the camera
        assert_eq!(host.live_count(), 0);
        assert!(host.acquisitions().len() >= 8);
    }

    #[test]
    fn test_unknown_level() {
        let mut host = ScriptedHost::new();
        let mut game = Game::new(Config::default(), &mut host, (), 1);
        assert!(matches!(game.jump_to(0, 0.0), Err(Error::UnknownLevel(0))));
        assert!(matches!(game.jump_to(9, 0.0), Err(Error::UnknownLevel(9))));
        assert_eq!(game.state().phase, GamePhase::Idle);
    }

    #[test]
    fn test_duplicate_digits_policy() {
        for (allow, expected) in [(true, 2), (false, 1)] {
            let mut host = ScriptedHost::new();
            let cfg = Config {
                allow_duplicate_digits: allow,
                ..config(&[LevelKind::Stillness, LevelKind::Stillness])
            };
            let mut game = Game::new(cfg, &mut host, EventLog::new(), 1);
            game.begin(0.0).unwrap();
            let t = hold_still(&mut game, 0.0);
            game.next_level(t).unwrap();
            hold_still(&mut game, t);

            assert_eq!(game.state().unlocked_digits.len(), expected);
            // The reveal itself always happens
            assert_eq!(game.observer().digits().len(), 2);
            assert_eq!(game.state().phase, GamePhase::Finished);
        }
    }

    #[test]
    fn test_final_level_reveals_code() {
        let mut host = ScriptedHost::new();
        let cfg = Config {
            auto_advance: true,
            ..config(&[LevelKind::Stillness, LevelKind::Multiply])
        };
        let mut game = Game::new(cfg, &mut host, EventLog::new(), 1);
        game.begin(0.0).unwrap();
        let t = hold_still(&mut game, 0.0);
        assert_eq!(game.active_kind(), Some(LevelKind::Multiply));

        game.handle(t + 10.0, Input::Answer("abc".into()));
        game.handle(t + 20.0, Input::Answer("8".into()));
        assert_eq!(game.state().phase, GamePhase::Active);
        game.handle(t + 30.0, Input::Answer("7".into()));

        assert_eq!(game.state().phase, GamePhase::Finished);
        assert_eq!(game.state().final_code.as_deref(), Some("7"));
        assert_eq!(game.state().unlocked_digits, vec!["7"]);
        assert_eq!(game.observer().digits(), vec!["7", "7"]);
        assert_eq!(
            game.observer().signals(),
            vec![&Signal::InvalidEntry("abc".into()), &Signal::WrongAnswer]
        );
        assert!(game.next_level(t + 40.0).is_err());
    }

    #[test]
    fn test_next_level_waits_for_completion() {
        let mut host = ScriptedHost::new().deny(SensorKind::Orientation);
        let mut game = Game::new(Config::default(), &mut host, (), 1);
        game.begin(0.0).unwrap();
        assert!(matches!(game.next_level(10.0), Err(Error::LevelNotComplete(1))));
        assert_eq!(game.state().current_level, 1);
        assert_eq!(game.state().phase, GamePhase::Active);

        game.jump_to(2, 20.0).unwrap();
        assert_eq!(game.state().phase, GamePhase::Failed);
        assert!(matches!(game.next_level(30.0), Err(Error::LevelNotComplete(2))));
        assert_eq!(game.state().current_level, 2);
        assert_eq!(game.host().live_count(), 0);
    }

    #[test]
    fn test_retry_restarts_from_zero() {
        let mut host = ScriptedHost::new();
        let mut game = Game::new(Config::default(), &mut host, (), 1);
        game.begin(0.0).unwrap();
        game.handle(500.0, Input::Frame);
        assert!(game.progress() > 0.0);

        game.retry(600.0).unwrap();
        assert_eq!(game.progress(), 0.0);
        assert_eq!(game.host().live_count(), 1);
    }

    #[test]
    fn test_shutdown_releases() {
        let mut host = ScriptedHost::new();
        let mut game = Game::new(Config::default(), &mut host, (), 1);
        game.jump_to(7, 0.0).unwrap();
        game.shutdown();
        assert_eq!(game.host().live_count(), 0);
        assert_eq!(game.state().phase, GamePhase::Idle);
        // Idempotent
        game.shutdown();
    }

    #[test]
    fn test_state_serializes() {
        let state = GameState::new(99);
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"phase\":\"Idle\""));
    }
}
