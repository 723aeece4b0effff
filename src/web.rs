//! Browser bindings: DOM listeners, timers, `localStorage`,
//! `requestAnimationFrame` and the canvas, exposed to JavaScript.
//!
//! Everything here is a thin adapter over the native-testable core. Bus
//! events and trigger hooks are forwarded to JS callbacks on a zero-delay
//! timeout, so JS handlers can call back into `EasterEggs` while a detector
//! is still mid-update.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use js_sys::{Array, Function};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, Event, EventTarget, HtmlCanvasElement, KeyboardEvent, Storage,
    Window, window,
};

use crate::anim::{AnimationLoop, Extent, FrameCallback, FrameHandle, FrameScheduler, Surface};
use crate::bus::{EventBus, SubscriptionId};
use crate::config::EggConfig;
use crate::eggs::AchievementManager;
use crate::eggs::store::{KeyValueBackend, KeyedStore, MemoryBackend, StoreError, StoreResult};
use crate::hunt::EggHunt;
use crate::triggers::{CalendarDay, Clock, TerminalAction};

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn browser_window() -> Result<Window, JsValue> {
    window().ok_or_else(|| JsValue::from_str("no window"))
}

// --- Collaborators -----------------------------------------------------------

pub struct LocalStorageBackend {
    storage: Storage,
}

impl LocalStorageBackend {
    /// Fails in privacy modes or sandboxed frames where storage is blocked.
    pub fn from_window() -> StoreResult<Self> {
        let win = window().ok_or_else(|| StoreError::Unavailable("no window".into()))?;
        match win.local_storage() {
            Ok(Some(storage)) => Ok(Self { storage }),
            Ok(None) => Err(StoreError::Unavailable("localStorage missing".into())),
            Err(e) => Err(StoreError::Unavailable(format!("{e:?}"))),
        }
    }
}

impl KeyValueBackend for LocalStorageBackend {
    fn name(&self) -> &str {
        "LocalStorage"
    }

    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|e| StoreError::Unavailable(format!("{e:?}")))
    }

    fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        self.storage
            .set_item(key, value)
            .map_err(|e| StoreError::Unavailable(format!("{e:?}")))
    }

    fn remove_item(&self, key: &str) -> StoreResult<()> {
        self.storage
            .remove_item(key)
            .map_err(|e| StoreError::Unavailable(format!("{e:?}")))
    }
}

/// Local date from JS `Date`.
pub struct BrowserClock;

impl Clock for BrowserClock {
    fn today(&self) -> CalendarDay {
        let now = js_sys::Date::new_0();
        CalendarDay {
            month: now.get_month() + 1,
            day: now.get_date(),
        }
    }
}

type RafClosure = Closure<dyn FnMut(f64)>;

/// `requestAnimationFrame` scheduler. Each request gets its own closure,
/// kept alive until it runs or is cancelled.
pub struct RafScheduler {
    window: Window,
    pending: Rc<RefCell<HashMap<i32, RafClosure>>>,
}

impl RafScheduler {
    pub fn new() -> Result<Self, JsValue> {
        Ok(Self {
            window: browser_window()?,
            pending: Rc::new(RefCell::new(HashMap::new())),
        })
    }
}

impl FrameScheduler for RafScheduler {
    fn request_frame(&self, callback: FrameCallback) -> Option<FrameHandle> {
        let own_id = Rc::new(std::cell::Cell::new(0));
        let id_slot = Rc::clone(&own_id);
        let pending = Rc::downgrade(&self.pending);
        let mut callback = Some(callback);
        let closure = Closure::wrap(Box::new(move |ts: f64| {
            if let Some(cb) = callback.take() {
                cb(ts);
            }
            // wasm-bindgen defers freeing a closure that is still running
            if let Some(pending) = pending.upgrade() {
                let done = pending.borrow_mut().remove(&id_slot.get());
                drop(done);
            }
        }) as Box<dyn FnMut(f64)>);

        match self
            .window
            .request_animation_frame(closure.as_ref().unchecked_ref())
        {
            Ok(id) => {
                own_id.set(id);
                self.pending.borrow_mut().insert(id, closure);
                Some(FrameHandle(i64::from(id)))
            }
            Err(e) => {
                tracing::warn!(error = ?e, "requestAnimationFrame failed");
                None
            }
        }
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        let Ok(id) = i32::try_from(handle.0) else {
            return;
        };
        if let Err(e) = self.window.cancel_animation_frame(id) {
            tracing::warn!(error = ?e, id, "cancelAnimationFrame failed");
        }
        let cancelled = self.pending.borrow_mut().remove(&id);
        drop(cancelled);
    }
}

pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into()?;
        Ok(Self { canvas, ctx })
    }

    pub fn context(&self) -> &CanvasRenderingContext2d {
        &self.ctx
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }
}

impl Surface for CanvasSurface {
    fn measure(&self) -> Option<Extent> {
        if !self.canvas.is_connected() {
            return None;
        }
        let rect = self.canvas.get_bounding_client_rect();
        Some(Extent {
            width: rect.width(),
            height: rect.height(),
        })
    }

    fn device_pixel_ratio(&self) -> f64 {
        window().map(|w| w.device_pixel_ratio()).unwrap_or(1.0)
    }

    fn resize_buffer(&self, pixel_width: u32, pixel_height: u32, ratio: f64) {
        self.canvas.set_width(pixel_width);
        self.canvas.set_height(pixel_height);
        // set_transform rather than scale: restarts must not compound
        if let Err(e) = self.ctx.set_transform(ratio, 0.0, 0.0, ratio, 0.0, 0.0) {
            tracing::warn!(error = ?e, "failed to scale canvas context");
        }
    }
}

// --- Listeners & Timers ------------------------------------------------------

/// DOM listener that is removed when dropped.
pub struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    pub fn new(
        target: &EventTarget,
        kind: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<Self, JsValue> {
        let callback = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        target.add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            kind,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Err(e) = self
            .target
            .remove_event_listener_with_callback(self.kind, self.callback.as_ref().unchecked_ref())
        {
            tracing::debug!(error = ?e, kind = self.kind, "failed to remove listener");
        }
    }
}

fn set_timeout(win: &Window, after_ms: f64, task: impl FnOnce() + 'static) {
    let callback = Closure::once_into_js(task);
    let delay = after_ms.clamp(0.0, i32::MAX as f64) as i32;
    if let Err(e) = win.set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.unchecked_ref(),
        delay,
    ) {
        tracing::warn!(error = ?e, "setTimeout failed");
    }
}

// --- JS Facade ---------------------------------------------------------------

struct Shared {
    window: Window,
    hunt: RefCell<EggHunt>,
    manager: Rc<AchievementManager>,
    trigger_hook: RefCell<Option<Function>>,
}

impl Shared {
    /// Tell the page about a trigger (`konami`, `logo-burst`,
    /// `terminal-open`, `terminal-close`).
    fn notify(&self, name: &'static str) {
        let Some(hook) = self.trigger_hook.borrow().clone() else {
            return;
        };
        set_timeout(&self.window, 0.0, move || {
            if let Err(e) = hook.call1(&JsValue::NULL, &JsValue::from_str(name)) {
                tracing::warn!(error = ?e, trigger = name, "trigger hook threw");
            }
        });
    }

    fn key_down(&self, event: &Event) {
        let Some(key_event) = event.dyn_ref::<KeyboardEvent>() else {
            return;
        };
        let outcome = match self.hunt.try_borrow_mut() {
            Ok(mut hunt) => hunt.key_down(&key_event.code(), &key_event.key()),
            Err(_) => return,
        };
        if outcome.prevent_default {
            event.prevent_default();
        }
        if outcome.konami {
            self.notify("konami");
        }
        match outcome.terminal {
            Some(true) => self.notify("terminal-open"),
            Some(false) => self.notify("terminal-close"),
            None => {}
        }
    }

    fn logo_click(self: &Rc<Self>) {
        let outcome = match self.hunt.try_borrow_mut() {
            Ok(mut hunt) => hunt.logo_click(),
            Err(_) => return,
        };
        if outcome.fired {
            self.notify("logo-burst");
        }
        if let Some(reset) = outcome.schedule {
            let shared: Weak<Shared> = Rc::downgrade(self);
            set_timeout(&self.window, reset.after_ms, move || {
                if let Some(shared) = shared.upgrade() {
                    if let Ok(mut hunt) = shared.hunt.try_borrow_mut() {
                        hunt.click_reset(reset.epoch);
                    }
                }
            });
        }
    }
}

/// The egg hunt as seen from JavaScript.
#[wasm_bindgen]
pub struct EasterEggs {
    shared: Rc<Shared>,
    listeners: Vec<Listener>,
}

#[wasm_bindgen]
impl EasterEggs {
    /// `config_json` is an optional partial [`EggConfig`] object.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<EasterEggs, JsValue> {
        let config = match config_json {
            Some(raw) => EggConfig::from_json(&raw).map_err(js_err)?,
            None => EggConfig::default(),
        };
        let win = browser_window()?;

        let backend: Box<dyn KeyValueBackend> = match LocalStorageBackend::from_window() {
            Ok(b) => Box::new(b),
            Err(e) => {
                tracing::warn!(error = %e, "falling back to in-memory egg storage");
                Box::new(MemoryBackend::new())
            }
        };
        let store = KeyedStore::new(backend, config.storage_key.clone());
        let manager = Rc::new(AchievementManager::new(
            Box::new(store),
            Rc::new(EventBus::new()),
        ));
        let hunt = EggHunt::new(config, Rc::clone(&manager));

        Ok(EasterEggs {
            shared: Rc::new(Shared {
                window: win,
                hunt: RefCell::new(hunt),
                manager,
                trigger_hook: RefCell::new(None),
            }),
            listeners: Vec::new(),
        })
    }

    /// Listen for `keydown` and the page's `logo-clicked` event on `window`.
    /// Calling it again while attached does nothing.
    pub fn attach(&mut self) -> Result<(), JsValue> {
        if !self.listeners.is_empty() {
            return Ok(());
        }
        let target: &EventTarget = &self.shared.window;

        let on_key = Rc::clone(&self.shared);
        let keydown = Listener::new(target, "keydown", move |event| on_key.key_down(&event))?;
        let on_logo = Rc::clone(&self.shared);
        let logo = Listener::new(target, "logo-clicked", move |_| on_logo.logo_click())?;

        self.listeners = vec![keydown, logo];
        Ok(())
    }

    /// Remove all listeners. Safe to call repeatedly.
    pub fn detach(&mut self) {
        self.listeners.clear();
    }

    pub fn is_attached(&self) -> bool {
        !self.listeners.is_empty()
    }

    pub fn logo_clicked(&self) {
        self.shared.logo_click();
    }

    /// `hook(name)` is called for `konami`, `logo-burst`, `terminal-open`
    /// and `terminal-close`.
    pub fn set_trigger_hook(&self, hook: Option<Function>) {
        *self.shared.trigger_hook.borrow_mut() = hook;
    }

    /// JSON object of id -> achievement with its `discovered` flag.
    pub fn achievements(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.shared.manager.all()).map_err(js_err)
    }

    /// JSON `{ "discovered": n, "total": m }`.
    pub fn stats(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.shared.manager.stats()).map_err(js_err)
    }

    pub fn discover(&self, id: &str) -> bool {
        self.shared.manager.discover(id)
    }

    pub fn is_complete(&self) -> bool {
        self.shared.manager.is_complete()
    }

    pub fn reset(&self) {
        self.shared.manager.reset();
    }

    /// `callback(name, detailJson)` for every bus event. Returns an id for
    /// [`EasterEggs::unsubscribe`].
    pub fn subscribe(&self, callback: Function) -> f64 {
        let win = self.shared.window.clone();
        let id = self.shared.manager.bus().subscribe(move |event| {
            let name = event.name();
            let detail = event.detail().to_string();
            let callback = callback.clone();
            set_timeout(&win, 0.0, move || {
                if let Err(e) = callback.call2(
                    &JsValue::NULL,
                    &JsValue::from_str(name),
                    &JsValue::from_str(&detail),
                ) {
                    tracing::warn!(error = ?e, event = name, "event subscriber threw");
                }
            });
        });
        id.as_u64() as f64
    }

    pub fn unsubscribe(&self, id: f64) -> bool {
        if !(id >= 0.0 && id.fract() == 0.0) {
            return false;
        }
        self.shared
            .manager
            .bus()
            .unsubscribe(SubscriptionId::from_u64(id as u64))
    }

    pub fn terminal_open(&self) -> bool {
        self.shared
            .hunt
            .try_borrow()
            .map(|hunt| hunt.is_terminal_open())
            .unwrap_or(false)
    }

    pub fn toggle_terminal(&self) -> Result<bool, JsValue> {
        let open = self
            .shared
            .hunt
            .try_borrow_mut()
            .map_err(js_err)?
            .toggle_terminal();
        Ok(open)
    }

    pub fn close_terminal(&self) -> Result<(), JsValue> {
        self.shared.hunt.try_borrow_mut().map_err(js_err)?.close_terminal();
        Ok(())
    }

    /// Run one terminal line. Returns true when the terminal should close.
    pub fn submit_command(&self, line: &str) -> Result<bool, JsValue> {
        let action = self
            .shared
            .hunt
            .try_borrow_mut()
            .map_err(js_err)?
            .submit_command(line);
        Ok(action == TerminalAction::Close)
    }

    /// JSON array of `{ "kind": ..., "content": ... }` entries.
    pub fn terminal_log(&self) -> Result<String, JsValue> {
        let hunt = self.shared.hunt.try_borrow().map_err(js_err)?;
        serde_json::to_string(hunt.terminal().entries()).map_err(js_err)
    }

    pub fn birthday_greeting(&self) -> Option<String> {
        self.shared
            .hunt
            .try_borrow()
            .ok()
            .and_then(|hunt| hunt.birthday_greeting(&BrowserClock))
    }
}

/// Canvas animation loop for visualization components.
#[wasm_bindgen]
pub struct CanvasLoop {
    inner: AnimationLoop<CanvasSurface>,
}

#[wasm_bindgen]
impl CanvasLoop {
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement) -> Result<CanvasLoop, JsValue> {
        let surface = Rc::new(CanvasSurface::new(canvas)?);
        let scheduler: Rc<dyn FrameScheduler> = Rc::new(RafScheduler::new()?);
        Ok(CanvasLoop {
            inner: AnimationLoop::new(scheduler, surface),
        })
    }

    /// `draw(ctx, width, height, timestamp)` every frame, in CSS pixels.
    /// Returns false if the canvas has no layout size yet.
    pub fn start(&self, draw: Function) -> bool {
        self.inner
            .start(move |surface: &CanvasSurface, extent: Extent, ts: f64| {
                let args = Array::new();
                args.push(surface.context());
                args.push(&JsValue::from_f64(extent.width));
                args.push(&JsValue::from_f64(extent.height));
                args.push(&JsValue::from_f64(ts));
                if let Err(e) = draw.apply(&JsValue::NULL, &args) {
                    tracing::warn!(error = ?e, "draw callback threw");
                }
            })
    }

    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }
}
