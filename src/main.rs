//! Sealed Code entry point
//!
//! Web: wires browser sensors, pointer events and the DOM into the game.
//! Native: plays a scripted walkthrough of the whole level table.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::f64::consts::TAU;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{
        CanvasRenderingContext2d, DeviceMotionEvent, DeviceOrientationEvent, HtmlCanvasElement,
        HtmlInputElement, KeyboardEvent, MouseEvent, PointerEvent,
    };

    use sealed_code::feedback::{Cue, FeedbackPlayer};
    use sealed_code::platform::web::{self as browser, BrowserHost};
    use sealed_code::platform::{
        Input, MotionSample, OrientationSample, Permission, SensorKind, TouchEvent, TouchPhase,
    };
    use sealed_code::sim::{Game, GameObserver, GamePhase, LevelKind, LevelView, Signal};
    use sealed_code::{Config, Error};

    /// Fill colours for touch targets, by ordinal
    const TARGET_COLORS: [&str; 5] = ["#e53935", "#fb8c00", "#fdd835", "#43a047", "#1e88e5"];

    type WebGame = Game<BrowserHost, DomObserver>;

    fn now() -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map_or_else(js_sys::Date::now, |p| p.now())
    }

    fn set_text(id: &str, text: &str) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if let Some(el) = document.get_element_by_id(id) {
            el.set_text_content(Some(text));
        }
    }

    fn set_hidden(id: &str, hidden: bool) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if let Some(el) = document.get_element_by_id(id) {
            let _ = el.set_attribute("class", if hidden { "hidden" } else { "" });
        }
    }

    /// Mirrors game events into the DOM and plays feedback
    struct DomObserver {
        feedback: FeedbackPlayer,
        level_count: u32,
        digits: Vec<String>,
    }

    impl GameObserver for DomObserver {
        fn on_level_started(&mut self, level: u32, kind: LevelKind, title: &str) {
            set_text("level-title", title);
            set_text("level-number", &format!("{} / {}", level, self.level_count));
            set_text("status", "");
            set_text("reading", "");
            set_hidden("answer-panel", kind != LevelKind::Multiply);
            set_hidden("next-btn", true);
            set_hidden("retry-btn", true);
        }

        fn on_digit_revealed(&mut self, digit: &str) {
            self.digits.push(digit.to_string());
            set_text("digits", &self.digits.join(" "));
            set_text("status", &format!("The seal breaks: {}", digit));
        }

        fn on_level_progress(&mut self, ratio: f32) {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            if let Some(bar) = document.get_element_by_id("progress-bar") {
                let _ = bar.set_attribute("style", &format!("width: {:.1}%", ratio * 100.0));
            }
        }

        fn on_level_complete(&mut self, level: u32) {
            if level >= self.level_count {
                self.feedback.play(Cue::Victory);
                set_hidden("answer-panel", true);
            } else {
                self.feedback.play(Cue::Reveal);
                set_hidden("next-btn", false);
            }
        }

        fn on_level_failed(&mut self, _level: u32, reason: &Error) {
            self.feedback.play(Cue::Fail);
            set_text("status", &format!("The seal holds: {}", reason));
            set_hidden("retry-btn", false);
        }

        fn on_signal(&mut self, signal: &Signal) {
            if let Some(cue) = Cue::for_signal(signal) {
                self.feedback.play(cue);
            }
            let message = match signal {
                Signal::InvalidEntry(_) => "Numbers only.",
                Signal::WrongAnswer => "That is not the code.",
                Signal::LocationTimeout => "Still looking for you...",
                Signal::PositionUnavailable => "Position unavailable.",
                Signal::ShapeRejected(_) => "That is not it.",
                _ => return,
            };
            set_text("status", message);
        }
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Sealed Code starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .expect("no canvas")
            .dyn_into()
            .expect("not a canvas");
        let rect = canvas.get_bounding_client_rect();
        canvas.set_width(rect.width().max(1.0) as u32);
        canvas.set_height(rect.height().max(1.0) as u32);

        let config = Config::load();
        if config.debug_mode {
            log::set_max_level(log::LevelFilter::Debug);
        }

        // iOS only shows the motion prompt from a user gesture
        setup_start_button(canvas, config);
    }

    fn setup_start_button(canvas: HtmlCanvasElement, config: Config) {
        let document = web_sys::window().unwrap().document().unwrap();
        let Some(btn) = document.get_element_by_id("start-btn") else {
            log::warn!("No start button; starting without a motion prompt");
            start_game(canvas, config, Permission::Unsupported);
            return;
        };

        let mut started = false;
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
            if started {
                return;
            }
            started = true;
            set_hidden("start-screen", true);
            let canvas = canvas.clone();
            let config = config.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let permission = browser::request_motion_permission().await;
                log::info!("Motion permission: {:?}", permission);
                start_game(canvas, config, permission);
            });
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn start_game(canvas: HtmlCanvasElement, config: Config, permission: Permission) {
        let seed = js_sys::Date::now() as u64;
        let frame = (config.tuning.darkness.frame_width, config.tuning.darkness.frame_height);
        let debug = config.debug_mode;

        let feedback = FeedbackPlayer::new();
        feedback.resume();
        let observer = DomObserver {
            feedback,
            level_count: config.levels.len() as u32,
            digits: Vec::new(),
        };
        let host = BrowserHost::new(canvas.clone(), permission, frame);
        let game = Rc::new(RefCell::new(Game::new(config, host, observer, seed)));
        log::info!("Game created with seed: {}", seed);

        if let Err(e) = game.borrow_mut().begin(now()) {
            log::error!("Cannot start: {}", e);
        }

        setup_sensor_handlers(game.clone());
        setup_pointer_handlers(&canvas, game.clone());
        setup_controls(game.clone(), debug);
        setup_visibility(game.clone());
        request_animation_frame(game, canvas);

        log::info!("Sealed Code running!");
    }

    fn setup_sensor_handlers(game: Rc<RefCell<WebGame>>) {
        let window = web_sys::window().unwrap();

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: DeviceMotionEvent| {
                let mut g = game.borrow_mut();
                if !g.host().is_streaming(SensorKind::Motion) {
                    return;
                }
                let Some(acc) = event.acceleration_including_gravity() else {
                    return;
                };
                let sample = MotionSample::new(
                    acc.x().unwrap_or(0.0) as f32,
                    acc.y().unwrap_or(0.0) as f32,
                    acc.z().unwrap_or(0.0) as f32,
                );
                g.handle(now(), Input::Motion(sample));
            });
            let _ = window
                .add_event_listener_with_callback("devicemotion", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: DeviceOrientationEvent| {
                let mut g = game.borrow_mut();
                if !g.host().is_streaming(SensorKind::Orientation) {
                    return;
                }
                let sample = OrientationSample {
                    beta: event.beta().map(|b| b as f32),
                    gamma: event.gamma().map(|v| v as f32),
                };
                g.handle(now(), Input::Orientation(sample));
            });
            let _ = window.add_event_listener_with_callback(
                "deviceorientation",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }
    }

    fn setup_pointer_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<WebGame>>) {
        let phases = [
            ("pointerdown", TouchPhase::Down),
            ("pointermove", TouchPhase::Move),
            ("pointerup", TouchPhase::Up),
            ("pointercancel", TouchPhase::Cancel),
        ];
        for (name, phase) in phases {
            let game = game.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                let mut g = game.borrow_mut();
                if !g.host().is_streaming(SensorKind::Touch) {
                    return;
                }
                event.prevent_default();
                if phase == TouchPhase::Down {
                    let _ = canvas_clone.set_pointer_capture(event.pointer_id());
                }

                // CSS pixels to canvas pixels
                let rect = canvas_clone.get_bounding_client_rect();
                let scale_x = canvas_clone.width() as f64 / rect.width().max(1.0);
                let scale_y = canvas_clone.height() as f64 / rect.height().max(1.0);
                let pos = Vec2::new(
                    ((event.client_x() as f64 - rect.left()) * scale_x) as f32,
                    ((event.client_y() as f64 - rect.top()) * scale_y) as f32,
                );
                let touch = TouchEvent {
                    pointer: event.pointer_id(),
                    phase,
                    pos,
                };
                g.handle(now(), Input::Touch(touch));
            });
            let _ = canvas.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn submit_answer(game: &Rc<RefCell<WebGame>>) {
        let document = web_sys::window().unwrap().document().unwrap();
        let Some(input) = document
            .get_element_by_id("answer-input")
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        else {
            return;
        };
        let answer = input.value();
        input.set_value("");
        game.borrow_mut().handle(now(), Input::Answer(answer));
    }

    fn setup_controls(game: Rc<RefCell<WebGame>>, debug: bool) {
        let window = web_sys::window().unwrap();
        let document = window.document().unwrap();

        if let Some(btn) = document.get_element_by_id("answer-btn") {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                submit_answer(&game);
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(input) = document.get_element_by_id("answer-input") {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                if event.key() == "Enter" {
                    event.prevent_default();
                    submit_answer(&game);
                }
            });
            let _ = input.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("next-btn") {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                if let Err(e) = game.borrow_mut().next_level(now()) {
                    log::warn!("No next level: {}", e);
                }
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("retry-btn") {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                if let Err(e) = game.borrow_mut().retry(now()) {
                    log::warn!("Retry failed: {}", e);
                }
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Debug: number keys jump straight to a level
        if debug {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let Ok(level) = event.key().parse::<u32>() else {
                    return;
                };
                if let Err(e) = game.borrow_mut().jump_to(level, now()) {
                    log::warn!("Jump failed: {}", e);
                }
            });
            let _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Close the camera and microphone while the tab is hidden
    fn setup_visibility(game: Rc<RefCell<WebGame>>) {
        let document = web_sys::window().unwrap().document().unwrap();
        let document_clone = document.clone();
        let mut suspended = false;
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let mut g = game.borrow_mut();
            if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                if g.state().phase == GamePhase::Active {
                    g.shutdown();
                    suspended = true;
                    log::info!("Level suspended (tab hidden)");
                }
            } else if suspended {
                suspended = false;
                if let Err(e) = g.retry(now()) {
                    log::warn!("Resume failed: {}", e);
                }
            }
        });
        let _ = document
            .add_event_listener_with_callback("visibilitychange", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(game: Rc<RefCell<WebGame>>, canvas: HtmlCanvasElement) {
        let window = web_sys::window().unwrap();
        let closure = Closure::once(move |time: f64| {
            game_loop(game, canvas, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<WebGame>>, canvas: HtmlCanvasElement, time: f64) {
        {
            let mut g = game.borrow_mut();

            // Geolocation fixes and late media failures
            let pending = g.host().take_inbox();
            for input in pending {
                g.handle(time, input);
            }
            g.handle(time, Input::Frame);

            let radius = g.config().tuning.touch.target_radius;
            let view = g.view();
            draw(&canvas, &view, radius);
            update_reading(g.active_kind(), &view);
        }

        request_animation_frame(game, canvas);
    }

    fn update_reading(kind: Option<LevelKind>, view: &LevelView) {
        let text = match (kind, view.reading) {
            (Some(LevelKind::Silence), Some(v)) => format!("Volume {:.1}", v),
            (Some(LevelKind::Darkness), Some(v)) => format!("Light {:.1}", v),
            (Some(LevelKind::Location), Some(v)) => format!("{:.0} m away", v),
            _ => return,
        };
        set_text("reading", &text);
    }

    fn draw(canvas: &HtmlCanvasElement, view: &LevelView, radius: f32) {
        let Some(ctx) = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
        else {
            return;
        };
        let (w, h) = (canvas.width() as f64, canvas.height() as f64);
        ctx.clear_rect(0.0, 0.0, w, h);

        for (target, held) in &view.targets {
            let color = TARGET_COLORS[target.ordinal as usize % TARGET_COLORS.len()];
            ctx.begin_path();
            let _ = ctx.arc(target.center.x as f64, target.center.y as f64, radius as f64, 0.0, TAU);
            ctx.set_global_alpha(if *held { 1.0 } else { 0.45 });
            ctx.set_fill_style_str(color);
            ctx.fill();
            if *held {
                ctx.set_line_width(6.0);
                ctx.set_stroke_style_str("#ffffff");
                ctx.stroke();
            }
        }
        ctx.set_global_alpha(1.0);

        if let Some((first, rest)) = view.trail.split_first() {
            ctx.begin_path();
            ctx.move_to(first.x as f64, first.y as f64);
            for p in rest {
                ctx.line_to(p.x as f64, p.y as f64);
            }
            ctx.set_line_width(4.0);
            ctx.set_stroke_style_str("#f5f5f5");
            ctx.stroke();
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
mod walkthrough {
    use sealed_code::sim::{GameObserver, LevelKind, Signal};
    use sealed_code::Error;

    /// Prints the run as it happens
    #[derive(Default)]
    pub struct Narrator {
        pub signals: usize,
    }

    impl GameObserver for Narrator {
        fn on_level_started(&mut self, level: u32, kind: LevelKind, title: &str) {
            println!("\n{} (level {}, {})", title, level, kind.name());
        }

        fn on_digit_revealed(&mut self, digit: &str) {
            println!("  ✓ revealed {}", digit);
        }

        fn on_level_failed(&mut self, level: u32, reason: &Error) {
            println!("  ✗ level {} failed: {}", level, reason);
        }

        fn on_signal(&mut self, signal: &Signal) {
            self.signals += 1;
            log::debug!("signal {:?}", signal);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use sealed_code::platform::ScriptedHost;
    use sealed_code::sim::{autoplay, Game};
    use sealed_code::Config;

    env_logger::init();
    log::info!("Sealed Code (native) starting...");
    log::info!("Native mode plays a scripted walkthrough - run with `trunk serve` for the web version");

    let config = Config::load();
    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map_or(0, |d| d.as_millis() as u64)
        });
    log::info!("Seed: {}", seed);

    let mut game = Game::new(config, ScriptedHost::new(), walkthrough::Narrator::default(), seed);
    let elapsed = autoplay::play_through(&mut game, 0.0);

    let state = game.state();
    println!(
        "\nDigits: {}  ({} signals, {:.1}s simulated)",
        state.unlocked_digits.join(" "),
        game.observer().signals,
        elapsed / 1000.0
    );
    match &state.final_code {
        Some(code) => println!("All seals broken. The code is {}", code),
        None => {
            println!("The run stopped at level {} ({:?})", state.current_level, state.phase);
            std::process::exit(1);
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
