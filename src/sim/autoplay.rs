//! Scripted solutions for every level
//!
//! Drives a [`Game`] running on a [`ScriptedHost`] the way a patient player
//! would: hold still, turn the phone over, shake, stay quiet, cover the
//! lens, draw, touch, walk, multiply. Used by the native walkthrough.

use std::borrow::BorrowMut;

use glam::Vec2;

use crate::platform::{
    GeoFix, Input, MotionSample, OrientationSample, PixelFrame, ScriptedHost, SensorHost,
    TouchEvent,
};
use crate::sim::game::{Game, GameObserver, GamePhase};
use crate::sim::levels::{LevelKind, final_product};

/// Simulated time between inputs
pub const STEP_MS: f64 = 50.0;

/// Give up on a level after this much simulated time
pub const BUDGET_MS: f64 = 30_000.0;

const GRAVITY: f32 = 9.8;

/// Play the live level until it leaves the Active phase or the budget runs
/// out. Returns the simulated clock afterwards.
pub fn solve_current<H, O>(game: &mut Game<H, O>, now_ms: f64) -> f64
where
    H: SensorHost + BorrowMut<ScriptedHost>,
    O: GameObserver,
{
    let Some(kind) = game.active_kind() else {
        return now_ms;
    };
    let level = game.state().current_level;
    log::info!("Autoplay: solving level {} ({})", level, kind.name());

    prepare(game, kind);
    let mut now_ms = now_ms;
    for input in opening_inputs(game, kind) {
        game.handle(now_ms, input);
        if !still_on(game, level) {
            return now_ms;
        }
    }

    let deadline = now_ms + BUDGET_MS;
    let mut tick = 0u32;
    while still_on(game, level) && now_ms < deadline {
        now_ms += STEP_MS;
        for input in tick_inputs(game, kind, tick) {
            game.handle(now_ms, input);
            if !still_on(game, level) {
                break;
            }
        }
        tick += 1;
    }
    if still_on(game, level) {
        log::warn!("Autoplay: level {} still open after {:.0}ms", level, BUDGET_MS);
    }
    now_ms
}

/// Start the run and solve levels until it finishes or stalls
pub fn play_through<H, O>(game: &mut Game<H, O>, now_ms: f64) -> f64
where
    H: SensorHost + BorrowMut<ScriptedHost>,
    O: GameObserver,
{
    let mut now_ms = now_ms;
    if game.state().phase == GamePhase::Idle && game.begin(now_ms).is_err() {
        return now_ms;
    }
    while game.state().phase == GamePhase::Active {
        let level = game.state().current_level;
        now_ms = solve_current(game, now_ms);
        match game.state().phase {
            GamePhase::Complete => {
                now_ms += STEP_MS;
                if game.next_level(now_ms).is_err() {
                    break;
                }
            }
            // Auto-advanced
            GamePhase::Active if game.state().current_level != level => {}
            _ => break,
        }
    }
    now_ms
}

/// A triangle stroke that closes back past its start
pub fn triangle_stroke(surface: Vec2) -> Vec<Vec2> {
    let side = surface.min_element() * 0.75;
    let height = side * 3f32.sqrt() / 2.0;
    let center = surface / 2.0;
    let base_y = center.y + height / 3.0;

    let start = Vec2::new(center.x, base_y);
    let right = Vec2::new(center.x + side / 2.0, base_y);
    let apex = Vec2::new(center.x, base_y - height);
    let left = Vec2::new(center.x - side / 2.0, base_y);
    let end = Vec2::new(center.x + side / 9.0, base_y);

    let mut path = Vec::new();
    for (from, to) in [(start, right), (right, apex), (apex, left), (left, end)] {
        let n = (from.distance(to) / 2.0).max(1.0) as usize;
        path.extend((0..n).map(|k| from.lerp(to, k as f32 / n as f32)));
    }
    path.push(end);
    path
}

fn still_on<H: SensorHost, O: GameObserver>(game: &Game<H, O>, level: u32) -> bool {
    game.state().current_level == level && game.state().phase == GamePhase::Active
}

fn prepare<H, O>(game: &mut Game<H, O>, kind: LevelKind)
where
    H: SensorHost + BorrowMut<ScriptedHost>,
    O: GameObserver,
{
    match kind {
        LevelKind::Silence => {
            BorrowMut::<ScriptedHost>::borrow_mut(game.host_mut())
                .set_ambient_spectrum(vec![0; 128]);
        }
        LevelKind::Darkness => {
            let tuning = game.config().tuning.darkness.clone();
            BorrowMut::<ScriptedHost>::borrow_mut(game.host_mut()).set_ambient_frame(PixelFrame::solid(
                tuning.frame_width,
                tuning.frame_height,
                [0, 0, 0],
            ));
        }
        _ => {}
    }
}

fn opening_inputs<H: SensorHost, O: GameObserver>(game: &Game<H, O>, kind: LevelKind) -> Vec<Input> {
    match kind {
        LevelKind::Shape => {
            let path = triangle_stroke(game.host().surface_size());
            let last = path.len() - 1;
            path.iter()
                .enumerate()
                .map(|(i, &p)| {
                    Input::Touch(match i {
                        0 => TouchEvent::down(0, p),
                        i if i == last => TouchEvent::up(0, p),
                        _ => TouchEvent::moved(0, p),
                    })
                })
                .collect()
        }
        LevelKind::TouchSeal => {
            let mut targets: Vec<_> = game.view().targets.into_iter().map(|(t, _)| t).collect();
            targets.sort_by_key(|t| t.ordinal);
            targets
                .iter()
                .map(|t| Input::Touch(TouchEvent::down(t.ordinal as i32, t.center)))
                .collect()
        }
        LevelKind::Multiply => {
            let answer = final_product(game.state().unlocked_digits.as_slice())
                .map(|p| p.to_string())
                .unwrap_or_default();
            vec![Input::Answer(answer)]
        }
        _ => Vec::new(),
    }
}

fn tick_inputs<H: SensorHost, O: GameObserver>(
    game: &Game<H, O>,
    kind: LevelKind,
    tick: u32,
) -> Vec<Input> {
    match kind {
        LevelKind::Stillness => vec![
            Input::Motion(MotionSample::new(0.0, GRAVITY, 0.0)),
            Input::Frame,
        ],
        LevelKind::Inversion => vec![
            Input::Orientation(OrientationSample::beta(-90.0)),
            Input::Frame,
        ],
        LevelKind::Shake => {
            let x = if tick % 2 == 0 { 12.0 } else { -12.0 };
            vec![Input::Motion(MotionSample::new(x, GRAVITY, 0.0)), Input::Frame]
        }
        LevelKind::Location => {
            let tuning = &game.config().tuning.location;
            vec![
                Input::Position(GeoFix {
                    lat: tuning.target_lat,
                    lon: tuning.target_lon,
                    accuracy: 5.0,
                }),
                Input::Frame,
            ]
        }
        _ => vec![Input::Frame],
    }
}
