//! Browser sensor host (wasm32 only)
//!
//! Motion, orientation and touch listeners are attached once by the shell
//! and gated on [`BrowserHost::is_streaming`]. Geolocation watches, the
//! microphone analyser and the camera are real resources opened on
//! subscribe and closed on release.
//!
//! `getUserMedia` is asynchronous, so media handles open in the background.
//! Until the stream arrives captures return `None`; a refusal is queued as
//! [`Input::SensorFailed`] in the inbox the shell drains every frame.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use glam::Vec2;
use js_sys::{Function, Object, Promise, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AnalyserNode, AudioContext, CanvasRenderingContext2d, HtmlCanvasElement, HtmlVideoElement,
    MediaStream, MediaStreamConstraints, MediaStreamTrack,
};

use super::{
    GeoFault, GeoFix, Input, Permission, PixelFrame, SensorHost, SensorKind, SubscriptionId,
};
use crate::consts::{
    ANALYSER_FFT_SIZE, CAMERA_IDEAL_HEIGHT, CAMERA_IDEAL_WIDTH, GEO_MAXIMUM_AGE_MS, GEO_TIMEOUT_MS,
};
use crate::error::{Error, Result};

/// Inputs produced outside the shell's own event listeners
pub type Inbox = Rc<RefCell<VecDeque<Input>>>;

/// Ask for motion and orientation access. Only iOS 13+ exposes a prompt;
/// everywhere else this resolves to [`Permission::Unsupported`].
/// Must be called from a user gesture.
pub async fn request_motion_permission() -> Permission {
    let motion = request_event_permission("DeviceMotionEvent").await;
    let orientation = request_event_permission("DeviceOrientationEvent").await;
    match (motion, orientation) {
        (Permission::Denied, _) | (_, Permission::Denied) => Permission::Denied,
        (Permission::Granted, _) | (_, Permission::Granted) => Permission::Granted,
        _ => Permission::Unsupported,
    }
}

async fn request_event_permission(constructor: &str) -> Permission {
    let Some(window) = web_sys::window() else {
        return Permission::Unsupported;
    };
    let Ok(class) = Reflect::get(&window, &JsValue::from_str(constructor)) else {
        return Permission::Unsupported;
    };
    let request = Reflect::get(&class, &JsValue::from_str("requestPermission"))
        .ok()
        .and_then(|f| f.dyn_into::<Function>().ok());
    let Some(request) = request else {
        return Permission::Unsupported;
    };
    let Ok(promise) = request.call0(&class).and_then(|p| p.dyn_into::<Promise>()) else {
        return Permission::Denied;
    };
    match JsFuture::from(promise).await {
        Ok(answer) if answer.as_string().as_deref() == Some("granted") => Permission::Granted,
        Ok(answer) => {
            log::warn!("{} permission: {:?}", constructor, answer.as_string());
            Permission::Denied
        }
        Err(e) => {
            log::warn!("{} permission request failed: {:?}", constructor, e);
            Permission::Denied
        }
    }
}

/// Media handle that may still be opening
enum Slot<T> {
    Pending,
    Ready(T),
    Released,
}

type SharedSlot<T> = Rc<RefCell<Slot<T>>>;

struct MicTap {
    ctx: AudioContext,
    analyser: AnalyserNode,
    stream: MediaStream,
    bins: Vec<u8>,
}

struct CameraTap {
    stream: MediaStream,
    video: HtmlVideoElement,
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

enum Resource {
    /// Listener owned by the shell, delivered while subscribed
    Stream(SensorKind),
    Watch {
        watch_id: JsValue,
        _on_fix: Closure<dyn FnMut(JsValue)>,
        _on_error: Closure<dyn FnMut(JsValue)>,
    },
    Microphone(SharedSlot<MicTap>),
    Camera(SharedSlot<CameraTap>),
}

impl Resource {
    fn kind(&self) -> SensorKind {
        match self {
            Resource::Stream(kind) => *kind,
            Resource::Watch { .. } => SensorKind::Geolocation,
            Resource::Microphone(_) => SensorKind::Microphone,
            Resource::Camera(_) => SensorKind::Camera,
        }
    }
}

pub struct BrowserHost {
    permission: Permission,
    canvas: HtmlCanvasElement,
    frame_size: (u32, u32),
    inbox: Inbox,
    live: BTreeMap<SubscriptionId, Resource>,
    next_id: u32,
}

impl BrowserHost {
    /// `permission` is the answer from [`request_motion_permission`];
    /// `frame_size` is the camera analysis resolution.
    pub fn new(canvas: HtmlCanvasElement, permission: Permission, frame_size: (u32, u32)) -> Self {
        Self {
            permission,
            canvas,
            frame_size,
            inbox: Rc::new(RefCell::new(VecDeque::new())),
            live: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Whether a level is currently subscribed to `kind`
    pub fn is_streaming(&self, kind: SensorKind) -> bool {
        self.live.values().any(|r| r.kind() == kind)
    }

    /// Queued background inputs, oldest first
    pub fn take_inbox(&self) -> Vec<Input> {
        self.inbox.borrow_mut().drain(..).collect()
    }

    fn watch_position(&self) -> Result<Resource> {
        let unavailable = || Error::DeviceUnavailable(SensorKind::Geolocation);
        let window = web_sys::window().ok_or_else(unavailable)?;
        let geolocation = Reflect::get(&window.navigator(), &JsValue::from_str("geolocation"))
            .ok()
            .filter(|g| !g.is_undefined() && !g.is_null())
            .ok_or_else(unavailable)?;
        let watch = Reflect::get(&geolocation, &JsValue::from_str("watchPosition"))
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok())
            .ok_or_else(unavailable)?;

        let inbox = self.inbox.clone();
        let on_fix = Closure::<dyn FnMut(_)>::new(move |position: JsValue| {
            if let Some(fix) = read_fix(&position) {
                inbox.borrow_mut().push_back(Input::Position(fix));
            }
        });
        let inbox = self.inbox.clone();
        let on_error = Closure::<dyn FnMut(_)>::new(move |error: JsValue| {
            let code = get_number(&error, "code").unwrap_or(2.0) as u32;
            let fault = match code {
                1 => GeoFault::PermissionDenied,
                3 => GeoFault::Timeout,
                _ => GeoFault::Unavailable,
            };
            inbox.borrow_mut().push_back(Input::PositionError(fault));
        });

        let options = Object::new();
        let _ = Reflect::set(&options, &"enableHighAccuracy".into(), &JsValue::TRUE);
        let _ = Reflect::set(&options, &"timeout".into(), &GEO_TIMEOUT_MS.into());
        let _ = Reflect::set(&options, &"maximumAge".into(), &GEO_MAXIMUM_AGE_MS.into());

        let watch_id = watch
            .call3(
                &geolocation,
                on_fix.as_ref(),
                on_error.as_ref(),
                &options,
            )
            .map_err(|_| unavailable())?;
        Ok(Resource::Watch {
            watch_id,
            _on_fix: on_fix,
            _on_error: on_error,
        })
    }

    fn open_microphone(&self) -> Result<Resource> {
        let promise = user_media(SensorKind::Microphone, |c| {
            let _ = Reflect::set(c, &"audio".into(), &JsValue::TRUE);
        })?;
        let slot: SharedSlot<MicTap> = Rc::new(RefCell::new(Slot::Pending));
        let pending = slot.clone();
        let inbox = self.inbox.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let stream = match await_stream(promise).await {
                Ok(stream) => stream,
                Err(denied) => {
                    fail_pending(&pending, &inbox, SensorKind::Microphone, denied);
                    return;
                }
            };
            match build_mic_tap(stream.clone()) {
                Some(tap) => fill_slot(&pending, tap, |tap| close_mic(&tap)),
                None => {
                    stop_stream(&stream);
                    fail_pending(&pending, &inbox, SensorKind::Microphone, false);
                }
            }
        });
        Ok(Resource::Microphone(slot))
    }

    fn open_camera(&self) -> Result<Resource> {
        let promise = user_media(SensorKind::Camera, |c| {
            let video = Object::new();
            let _ = Reflect::set(&video, &"facingMode".into(), &"environment".into());
            let ideal = |v: u32| {
                let o = Object::new();
                let _ = Reflect::set(&o, &"ideal".into(), &v.into());
                o
            };
            let _ = Reflect::set(&video, &"width".into(), &ideal(CAMERA_IDEAL_WIDTH));
            let _ = Reflect::set(&video, &"height".into(), &ideal(CAMERA_IDEAL_HEIGHT));
            let _ = Reflect::set(c, &"video".into(), &video);
        })?;
        let slot: SharedSlot<CameraTap> = Rc::new(RefCell::new(Slot::Pending));
        let pending = slot.clone();
        let inbox = self.inbox.clone();
        let (width, height) = self.frame_size;
        wasm_bindgen_futures::spawn_local(async move {
            let stream = match await_stream(promise).await {
                Ok(stream) => stream,
                Err(denied) => {
                    fail_pending(&pending, &inbox, SensorKind::Camera, denied);
                    return;
                }
            };
            match build_camera_tap(stream.clone(), width, height) {
                Some(tap) => fill_slot(&pending, tap, |tap| stop_stream(&tap.stream)),
                None => {
                    stop_stream(&stream);
                    fail_pending(&pending, &inbox, SensorKind::Camera, false);
                }
            }
        });
        Ok(Resource::Camera(slot))
    }
}

impl SensorHost for BrowserHost {
    fn request_motion_permission(&mut self) -> Permission {
        self.permission
    }

    fn subscribe(&mut self, kind: SensorKind) -> Result<SubscriptionId> {
        let resource = match kind {
            SensorKind::Motion | SensorKind::Orientation => {
                if !self.permission.allows() {
                    return Err(Error::PermissionDenied(kind));
                }
                Resource::Stream(kind)
            }
            SensorKind::Touch => Resource::Stream(kind),
            SensorKind::Geolocation => self.watch_position()?,
            SensorKind::Microphone => self.open_microphone()?,
            SensorKind::Camera => self.open_camera()?,
        };
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.live.insert(id, resource);
        Ok(id)
    }

    fn release(&mut self, id: SubscriptionId) {
        let Some(resource) = self.live.remove(&id) else {
            return;
        };
        match resource {
            Resource::Stream(_) => {}
            Resource::Watch { watch_id, .. } => clear_watch(&watch_id),
            Resource::Microphone(slot) => {
                if let Slot::Ready(tap) = slot.replace(Slot::Released) {
                    close_mic(&tap);
                }
            }
            Resource::Camera(slot) => {
                if let Slot::Ready(tap) = slot.replace(Slot::Released) {
                    stop_stream(&tap.stream);
                    tap.video.set_src_object(None);
                }
            }
        }
    }

    fn capture_audio_level(&mut self, id: SubscriptionId) -> Option<Vec<u8>> {
        let Some(Resource::Microphone(slot)) = self.live.get(&id) else {
            return None;
        };
        let mut slot = slot.borrow_mut();
        let Slot::Ready(tap) = &mut *slot else {
            return None;
        };
        tap.analyser.get_byte_frequency_data(&mut tap.bins);
        Some(tap.bins.clone())
    }

    fn capture_video_frame(&mut self, id: SubscriptionId) -> Option<PixelFrame> {
        let Some(Resource::Camera(slot)) = self.live.get(&id) else {
            return None;
        };
        let slot = slot.borrow();
        let Slot::Ready(tap) = &*slot else {
            return None;
        };
        // HAVE_CURRENT_DATA
        if tap.video.ready_state() < 2 {
            return None;
        }
        let (w, h) = (tap.canvas.width(), tap.canvas.height());
        tap.ctx
            .draw_image_with_html_video_element_and_dw_and_dh(&tap.video, 0.0, 0.0, w as f64, h as f64)
            .ok()?;
        let image = tap.ctx.get_image_data(0.0, 0.0, w as f64, h as f64).ok()?;
        Some(PixelFrame {
            width: w,
            height: h,
            rgba: image.data().0,
        })
    }

    fn surface_size(&self) -> Vec2 {
        Vec2::new(self.canvas.width() as f32, self.canvas.height() as f32)
    }
}

impl Drop for BrowserHost {
    fn drop(&mut self) {
        let ids: Vec<_> = self.live.keys().copied().collect();
        for id in ids {
            self.release(id);
        }
    }
}

fn get_number(target: &JsValue, key: &str) -> Option<f64> {
    Reflect::get(target, &JsValue::from_str(key)).ok()?.as_f64()
}

fn read_fix(position: &JsValue) -> Option<GeoFix> {
    let coords = Reflect::get(position, &JsValue::from_str("coords")).ok()?;
    Some(GeoFix {
        lat: get_number(&coords, "latitude")?,
        lon: get_number(&coords, "longitude")?,
        accuracy: get_number(&coords, "accuracy").unwrap_or(f64::INFINITY),
    })
}

fn clear_watch(watch_id: &JsValue) {
    let Some(window) = web_sys::window() else { return };
    let Ok(geolocation) = Reflect::get(&window.navigator(), &JsValue::from_str("geolocation")) else {
        return;
    };
    if let Some(clear) = Reflect::get(&geolocation, &JsValue::from_str("clearWatch"))
        .ok()
        .and_then(|f| f.dyn_into::<Function>().ok())
    {
        let _ = clear.call1(&geolocation, watch_id);
    }
}

/// Start `getUserMedia` with constraints filled in by `configure`
fn user_media(kind: SensorKind, configure: impl FnOnce(&Object)) -> Result<Promise> {
    let devices = web_sys::window()
        .and_then(|w| w.navigator().media_devices().ok())
        .ok_or(Error::DeviceUnavailable(kind))?;
    let constraints = Object::new();
    configure(&constraints);
    let constraints: MediaStreamConstraints = constraints.unchecked_into();
    devices
        .get_user_media_with_constraints(&constraints)
        .map_err(|_| Error::DeviceUnavailable(kind))
}

/// Resolve a media promise; `Err(true)` when the user refused
async fn await_stream(promise: Promise) -> std::result::Result<MediaStream, bool> {
    match JsFuture::from(promise).await {
        Ok(stream) => stream.dyn_into::<MediaStream>().map_err(|_| false),
        Err(e) => {
            let name = Reflect::get(&e, &JsValue::from_str("name"))
                .ok()
                .and_then(|n| n.as_string())
                .unwrap_or_default();
            log::warn!("getUserMedia failed: {}", name);
            Err(matches!(name.as_str(), "NotAllowedError" | "SecurityError"))
        }
    }
}

/// Store a finished handle, or close it if the level already let go
fn fill_slot<T>(slot: &SharedSlot<T>, tap: T, close: impl FnOnce(T)) {
    let mut slot = slot.borrow_mut();
    if matches!(*slot, Slot::Released) {
        drop(slot);
        close(tap);
        return;
    }
    *slot = Slot::Ready(tap);
}

fn fail_pending<T>(slot: &SharedSlot<T>, inbox: &Inbox, kind: SensorKind, denied: bool) {
    // Nobody is waiting on a released handle
    if matches!(*slot.borrow(), Slot::Released) {
        return;
    }
    inbox
        .borrow_mut()
        .push_back(Input::SensorFailed { kind, denied });
}

fn build_mic_tap(stream: MediaStream) -> Option<MicTap> {
    let ctx = AudioContext::new().ok()?;
    let source = ctx.create_media_stream_source(&stream).ok()?;
    let analyser = ctx.create_analyser().ok()?;
    analyser.set_fft_size(ANALYSER_FFT_SIZE);
    source.connect_with_audio_node(&analyser).ok()?;
    let bins = vec![0; analyser.frequency_bin_count() as usize];
    log::info!("Microphone open ({} bins)", bins.len());
    Some(MicTap {
        ctx,
        analyser,
        stream,
        bins,
    })
}

fn close_mic(tap: &MicTap) {
    stop_stream(&tap.stream);
    let _ = tap.ctx.close();
}

fn build_camera_tap(stream: MediaStream, width: u32, height: u32) -> Option<CameraTap> {
    let document = web_sys::window()?.document()?;
    let video: HtmlVideoElement = document.create_element("video").ok()?.dyn_into().ok()?;
    video.set_muted(true);
    let _ = video.set_attribute("playsinline", "");
    video.set_src_object(Some(&stream));
    let _ = video.play();

    let canvas: HtmlCanvasElement = document.create_element("canvas").ok()?.dyn_into().ok()?;
    canvas.set_width(width);
    canvas.set_height(height);
    let ctx: CanvasRenderingContext2d = canvas.get_context("2d").ok()??.dyn_into().ok()?;
    log::info!("Camera open ({}x{} analysis frame)", width, height);
    Some(CameraTap {
        stream,
        video,
        canvas,
        ctx,
    })
}

fn stop_stream(stream: &MediaStream) {
    for track in stream.get_tracks().iter() {
        if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
            track.stop();
        }
    }
}
