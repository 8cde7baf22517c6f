//! Whole-game runs against the scripted host

use sealed_code::platform::{GeoFault, Input, MotionSample, Permission, ScriptedHost, SensorKind};
use sealed_code::sim::autoplay;
use sealed_code::sim::{EventLog, Game, GameEvent, GamePhase, LevelDescriptor, LevelKind, Signal};
use sealed_code::Config;

fn still() -> Input {
    Input::Motion(MotionSample::new(0.0, 9.8, 0.0))
}

#[test]
fn canonical_run_releases_every_handle() {
    let mut host = ScriptedHost::new();
    {
        let mut game = Game::new(Config::default(), &mut host, EventLog::new(), 42);
        game.begin(0.0).unwrap();

        let mut t = 0.0;
        loop {
            t = autoplay::solve_current(&mut game, t);
            assert_eq!(
                game.host().live_count(),
                0,
                "level {} leaked a handle",
                game.state().current_level
            );
            if game.state().phase == GamePhase::Finished {
                break;
            }
            assert_eq!(game.state().phase, GamePhase::Complete);
            t += 100.0;
            game.next_level(t).unwrap();
        }

        assert_eq!(game.state().unlocked_digits, ["7", "2", "1", "9", "2", "3", "4"]);
        assert_eq!(game.state().final_code.as_deref(), Some("3024"));
        assert!(!game.state().is_level_active);

        let completions = game
            .observer()
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::LevelComplete(_)))
            .count();
        assert_eq!(completions, 8);
    }

    assert_eq!(
        host.acquisitions(),
        &[
            SensorKind::Motion,
            SensorKind::Orientation,
            SensorKind::Motion,
            SensorKind::Microphone,
            SensorKind::Camera,
            SensorKind::Touch,
            SensorKind::Touch,
        ]
    );
    assert_eq!(host.live_count(), 0);
}

#[test]
fn stillness_completes_after_one_second() {
    let mut game = Game::new(Config::default(), ScriptedHost::new(), EventLog::new(), 1);
    game.begin(0.0).unwrap();

    game.handle(0.0, still());
    for i in 1..=9 {
        game.handle(i as f64 * 100.0, still());
        game.handle(i as f64 * 100.0, Input::Frame);
    }
    assert!((game.progress() - 0.9).abs() < 1e-6);
    assert_eq!(game.state().phase, GamePhase::Active);

    game.handle(1000.0, Input::Frame);
    assert_eq!(game.state().phase, GamePhase::Complete);
    assert_eq!(game.state().unlocked_digits, ["7"]);
    assert_eq!(game.observer().digits(), ["7"]);

    // Nothing live, so further input is ignored
    game.handle(1100.0, Input::Frame);
    assert_eq!(game.state().unlocked_digits.len(), 1);
}

#[test]
fn movement_at_nine_tenths_resets_progress() {
    let mut game = Game::new(Config::default(), ScriptedHost::new(), EventLog::new(), 1);
    game.begin(0.0).unwrap();

    game.handle(0.0, still());
    for i in 1..=9 {
        game.handle(i as f64 * 100.0, Input::Frame);
    }
    game.handle(900.0, Input::Motion(MotionSample::new(3.0, 9.8, 0.0)));
    assert_eq!(game.progress(), 0.0);
    assert!(game.observer().events.contains(&GameEvent::Progress(0.0)));

    // A full second of stillness from the jolt
    game.handle(900.0, Input::Motion(MotionSample::new(3.0, 9.8, 0.0)));
    let mut t = 900.0;
    while game.state().phase == GamePhase::Active && t < 3000.0 {
        t += 100.0;
        game.handle(t, Input::Frame);
    }
    assert_eq!(t, 1900.0);
    assert_eq!(game.observer().digits(), ["7"]);
}

#[test]
fn denied_motion_fails_before_any_level() {
    let mut host = ScriptedHost::new().with_permission(Permission::Denied);
    {
        let mut game = Game::new(Config::default(), &mut host, EventLog::new(), 1);
        assert!(game.begin(0.0).is_err());
        assert_eq!(game.state().phase, GamePhase::Failed);
        assert!(game.active_kind().is_none());
    }
    assert!(host.acquisitions().is_empty());
}

#[test]
fn refused_camera_can_be_skipped_with_a_jump() {
    let mut host = ScriptedHost::new().deny(SensorKind::Camera);
    {
        let mut game = Game::new(Config::default(), &mut host, EventLog::new(), 9);
        game.jump_to(5, 0.0).unwrap();
        assert_eq!(game.state().phase, GamePhase::Failed);
        assert_eq!(
            game.state().last_failure.as_deref(),
            Some("camera access was denied")
        );
        assert_eq!(game.host().live_count(), 0);

        game.jump_to(6, 10.0).unwrap();
        assert_eq!(game.active_kind(), Some(LevelKind::Shape));
        assert_eq!(game.state().last_failure, None);
        assert!(game.host().is_live(SensorKind::Touch));
    }
    assert_eq!(host.live_count(), 0);
}

#[test]
fn late_microphone_refusal_fails_the_level() {
    let mut host = ScriptedHost::new();
    {
        let mut game = Game::new(Config::default(), &mut host, EventLog::new(), 9);
        game.jump_to(4, 0.0).unwrap();
        assert!(game.host().is_live(SensorKind::Microphone));

        game.handle(
            50.0,
            Input::SensorFailed {
                kind: SensorKind::Microphone,
                denied: true,
            },
        );
        assert_eq!(game.state().phase, GamePhase::Failed);
        assert_eq!(game.host().live_count(), 0);

        game.retry(100.0).unwrap();
        assert_eq!(game.state().phase, GamePhase::Active);
        assert!(game.host().is_live(SensorKind::Microphone));
    }
    assert_eq!(host.live_count(), 0);
}

#[test]
fn location_variant_survives_timeouts() {
    let mut config = Config::default();
    config.levels[6] = LevelDescriptor::new(LevelKind::Location);
    let mut game = Game::new(config, ScriptedHost::new(), EventLog::new(), 2);
    game.jump_to(7, 0.0).unwrap();

    game.handle(100.0, Input::PositionError(GeoFault::Timeout));
    game.handle(200.0, Input::PositionError(GeoFault::Unavailable));
    assert_eq!(game.state().phase, GamePhase::Active);
    assert_eq!(
        game.observer().signals(),
        [&Signal::LocationTimeout, &Signal::PositionUnavailable]
    );

    game.handle(300.0, Input::PositionError(GeoFault::PermissionDenied));
    assert_eq!(game.state().phase, GamePhase::Failed);
    assert_eq!(game.host().live_count(), 0);
}

#[test]
fn json_overrides_reach_the_levels() {
    let config = Config::from_json(
        r#"{
            "auto_advance": true,
            "levels": [
                { "kind": "Stillness", "digit": "5" },
                { "kind": "Multiply" }
            ],
            "tuning": { "stillness": { "required_ms": 200.0 } }
        }"#,
    )
    .unwrap();
    let mut game = Game::new(config, ScriptedHost::new(), EventLog::new(), 4);
    game.begin(0.0).unwrap();

    game.handle(0.0, still());
    game.handle(100.0, Input::Frame);
    game.handle(200.0, Input::Frame);
    assert_eq!(game.active_kind(), Some(LevelKind::Multiply));

    game.handle(300.0, Input::Answer("5".into()));
    assert_eq!(game.state().phase, GamePhase::Finished);
    assert_eq!(game.state().final_code.as_deref(), Some("5"));
}
