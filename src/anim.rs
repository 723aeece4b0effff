//! Per-frame draw loop bound to a canvas-like surface.
//!
//! An [`AnimationLoop`] owns at most one pending frame request. `start`
//! measures the surface, rescales its backing buffer to the device pixel
//! ratio once, and then calls the draw callback every frame until `stop`.
//!
//! Cancellation does not rely on the scheduler alone: every chain carries the
//! generation it was started under, and a frame that fires after `stop` (or
//! after a restart) sees a stale generation and returns without drawing.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

// --- Scheduling --------------------------------------------------------------

pub type FrameCallback = Box<dyn FnOnce(f64)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(pub i64);

/// `requestAnimationFrame` / `cancelAnimationFrame` semantics.
pub trait FrameScheduler {
    /// Returns `None` when the platform refused the request.
    fn request_frame(&self, callback: FrameCallback) -> Option<FrameHandle>;
    fn cancel_frame(&self, handle: FrameHandle);
}

/// Deterministic scheduler: frames run only when [`ManualFrames::tick`] is called.
#[derive(Default)]
pub struct ManualFrames {
    next: Cell<i64>,
    pending: RefCell<BTreeMap<FrameHandle, FrameCallback>>,
}

impl ManualFrames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every frame requested before this call. Returns how many ran.
    pub fn tick(&self, timestamp: f64) -> usize {
        let due = std::mem::take(&mut *self.pending.borrow_mut());
        let ran = due.len();
        for (_, callback) in due {
            callback(timestamp);
        }
        ran
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl FrameScheduler for ManualFrames {
    fn request_frame(&self, callback: FrameCallback) -> Option<FrameHandle> {
        let handle = FrameHandle(self.next.get());
        self.next.set(handle.0 + 1);
        self.pending.borrow_mut().insert(handle, callback);
        Some(handle)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.pending.borrow_mut().remove(&handle);
    }
}

// --- Surface -----------------------------------------------------------------

/// Layout size in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extent {
    pub width: f64,
    pub height: f64,
}

impl Extent {
    pub fn is_drawable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }
}

pub trait Surface {
    /// Current layout size, or `None` if the surface is gone.
    fn measure(&self) -> Option<Extent>;
    fn device_pixel_ratio(&self) -> f64;
    /// Resize the backing buffer to `pixel_width` x `pixel_height` and scale
    /// drawing so callers keep working in CSS pixels.
    fn resize_buffer(&self, pixel_width: u32, pixel_height: u32, ratio: f64);
}

/// Backing-buffer size for a layout extent; non-positive ratios count as 1.
pub fn buffer_size(extent: Extent, ratio: f64) -> (u32, u32, f64) {
    let ratio = if ratio.is_finite() && ratio > 0.0 { ratio } else { 1.0 };
    let w = (extent.width * ratio).round().max(1.0) as u32;
    let h = (extent.height * ratio).round().max(1.0) as u32;
    (w, h, ratio)
}

// --- Loop --------------------------------------------------------------------

#[derive(Default)]
struct ChainState {
    generation: u64,
    running: bool,
    pending: Option<FrameHandle>,
}

struct Chain<S, D> {
    generation: u64,
    extent: Extent,
    state: Rc<RefCell<ChainState>>,
    scheduler: Rc<dyn FrameScheduler>,
    surface: Rc<S>,
    draw: RefCell<D>,
}

impl<S, D> Chain<S, D>
where
    S: Surface + 'static,
    D: FnMut(&S, Extent, f64) + 'static,
{
    fn is_current(&self) -> bool {
        let state = self.state.borrow();
        state.running && state.generation == self.generation
    }

    fn schedule(self: Rc<Self>) {
        let next = Rc::clone(&self);
        let handle = self
            .scheduler
            .request_frame(Box::new(move |ts| next.run(ts)));
        if handle.is_none() {
            tracing::warn!("frame request refused; stopping animation loop");
            self.state.borrow_mut().running = false;
        }
        self.state.borrow_mut().pending = handle;
    }

    fn run(self: Rc<Self>, timestamp: f64) {
        {
            let mut state = self.state.borrow_mut();
            if !state.running || state.generation != self.generation {
                return;
            }
            state.pending = None;
        }
        // draw may stop or restart the loop
        {
            let mut draw = self.draw.borrow_mut();
            (*draw)(&*self.surface, self.extent, timestamp);
        }
        if self.is_current() {
            self.schedule();
        }
    }
}

pub struct AnimationLoop<S> {
    scheduler: Rc<dyn FrameScheduler>,
    surface: Rc<S>,
    state: Rc<RefCell<ChainState>>,
}

impl<S: Surface + 'static> AnimationLoop<S> {
    pub fn new(scheduler: Rc<dyn FrameScheduler>, surface: Rc<S>) -> Self {
        Self {
            scheduler,
            surface,
            state: Rc::new(RefCell::new(ChainState::default())),
        }
    }

    pub fn surface(&self) -> &Rc<S> {
        &self.surface
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    /// Start drawing with `draw(surface, extent, timestamp)`.
    ///
    /// A running loop is stopped first. Returns false (and stays idle) when
    /// the surface is missing or has no area yet.
    pub fn start<D>(&self, draw: D) -> bool
    where
        D: FnMut(&S, Extent, f64) + 'static,
    {
        self.stop();

        let extent = match self.surface.measure() {
            Some(extent) if extent.is_drawable() => extent,
            other => {
                tracing::debug!(?other, "animation surface not measurable yet; loop stays idle");
                return false;
            }
        };
        let (w, h, ratio) = buffer_size(extent, self.surface.device_pixel_ratio());
        self.surface.resize_buffer(w, h, ratio);

        let generation = {
            let mut state = self.state.borrow_mut();
            state.generation += 1;
            state.running = true;
            state.generation
        };
        tracing::debug!(generation, width = extent.width, height = extent.height, "animation loop started");

        let chain = Rc::new(Chain {
            generation,
            extent,
            state: Rc::clone(&self.state),
            scheduler: Rc::clone(&self.scheduler),
            surface: Rc::clone(&self.surface),
            draw: RefCell::new(draw),
        });
        chain.schedule();
        self.is_running()
    }

    /// After this returns the current draw callback is never invoked again.
    pub fn stop(&self) {
        let pending = {
            let mut state = self.state.borrow_mut();
            if !state.running {
                return;
            }
            state.running = false;
            state.generation += 1;
            state.pending.take()
        };
        if let Some(handle) = pending {
            self.scheduler.cancel_frame(handle);
        }
        tracing::debug!("animation loop stopped");
    }
}

impl<S> Drop for AnimationLoop<S> {
    fn drop(&mut self) {
        let pending = {
            let mut state = self.state.borrow_mut();
            state.running = false;
            state.generation += 1;
            state.pending.take()
        };
        if let Some(handle) = pending {
            self.scheduler.cancel_frame(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeSurface {
        extent: Cell<Option<Extent>>,
        ratio: Cell<f64>,
        resizes: RefCell<Vec<(u32, u32, f64)>>,
    }

    impl FakeSurface {
        fn sized(width: f64, height: f64, ratio: f64) -> Rc<Self> {
            let s = Self::default();
            s.extent.set(Some(Extent { width, height }));
            s.ratio.set(ratio);
            Rc::new(s)
        }
    }

    impl Surface for FakeSurface {
        fn measure(&self) -> Option<Extent> {
            self.extent.get()
        }
        fn device_pixel_ratio(&self) -> f64 {
            self.ratio.get()
        }
        fn resize_buffer(&self, w: u32, h: u32, ratio: f64) {
            self.resizes.borrow_mut().push((w, h, ratio));
        }
    }

    fn counter() -> (Rc<Cell<u32>>, impl FnMut(&FakeSurface, Extent, f64) + 'static) {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        (hits, move |_: &FakeSurface, _: Extent, _: f64| h.set(h.get() + 1))
    }

    fn setup(surface: Rc<FakeSurface>) -> (Rc<ManualFrames>, AnimationLoop<FakeSurface>) {
        let frames = Rc::new(ManualFrames::new());
        let scheduler: Rc<dyn FrameScheduler> = frames.clone();
        (frames, AnimationLoop::new(scheduler, surface))
    }

    #[test]
    fn test_draws_each_tick_with_measured_extent() {
        let (frames, anim) = setup(FakeSurface::sized(200.0, 100.0, 2.0));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        assert!(anim.start(move |_, extent, ts| s.borrow_mut().push((extent, ts))));
        frames.tick(16.0);
        frames.tick(32.0);
        let extent = Extent { width: 200.0, height: 100.0 };
        assert_eq!(*seen.borrow(), vec![(extent, 16.0), (extent, 32.0)]);
        assert_eq!(*anim.surface().resizes.borrow(), vec![(400, 200, 2.0)]);
    }

    #[test]
    fn test_stop_right_after_start_never_draws() {
        let (frames, anim) = setup(FakeSurface::sized(10.0, 10.0, 1.0));
        let (hits, draw) = counter();
        anim.start(draw);
        anim.stop();
        assert_eq!(frames.pending(), 0);
        frames.tick(1.0);
        assert_eq!(hits.get(), 0);
        assert!(!anim.is_running());
    }

    #[test]
    fn test_double_start_keeps_single_chain() {
        let (frames, anim) = setup(FakeSurface::sized(10.0, 10.0, 1.0));
        let (first, draw1) = counter();
        let (second, draw2) = counter();
        anim.start(draw1);
        anim.start(draw2);
        assert_eq!(frames.pending(), 1);
        for t in 0..3 {
            assert_eq!(frames.tick(t as f64), 1);
        }
        assert_eq!((first.get(), second.get()), (0, 3));
    }

    #[test]
    fn test_zero_sized_or_missing_surface_is_noop() {
        let (frames, anim) = setup(FakeSurface::sized(0.0, 50.0, 1.0));
        let (hits, draw) = counter();
        assert!(!anim.start(draw));
        assert_eq!(frames.pending(), 0);

        anim.surface().extent.set(None);
        let (_, draw) = counter();
        assert!(!anim.start(draw));
        frames.tick(1.0);
        assert_eq!(hits.get(), 0);
        assert!(anim.surface().resizes.borrow().is_empty());
    }

    #[test]
    fn test_restart_remeasures_surface() {
        let (_frames, anim) = setup(FakeSurface::sized(100.0, 100.0, 1.0));
        let (_, draw) = counter();
        anim.start(draw);
        anim.surface().extent.set(Some(Extent { width: 50.0, height: 25.0 }));
        anim.surface().ratio.set(3.0);
        let (_, draw) = counter();
        anim.start(draw);
        assert_eq!(*anim.surface().resizes.borrow(), vec![(100, 100, 1.0), (150, 75, 3.0)]);
    }

    #[test]
    fn test_frame_already_dequeued_does_not_draw_after_stop() {
        // A scheduler whose cancel is a no-op models a frame the platform
        // had already committed to running.
        struct Uncancellable(ManualFrames);
        impl FrameScheduler for Uncancellable {
            fn request_frame(&self, cb: FrameCallback) -> Option<FrameHandle> {
                self.0.request_frame(cb)
            }
            fn cancel_frame(&self, _: FrameHandle) {}
        }
        let frames = Rc::new(Uncancellable(ManualFrames::new()));
        let scheduler: Rc<dyn FrameScheduler> = frames.clone();
        let anim = AnimationLoop::new(scheduler, FakeSurface::sized(10.0, 10.0, 1.0));
        let (hits, draw) = counter();
        anim.start(draw);
        anim.stop();
        assert_eq!(frames.0.tick(1.0), 1);
        assert_eq!(hits.get(), 0);
        assert_eq!(frames.0.pending(), 0);
    }

    #[test]
    fn test_draw_can_stop_its_own_loop() {
        let frames = Rc::new(ManualFrames::new());
        let scheduler: Rc<dyn FrameScheduler> = frames.clone();
        let anim = Rc::new(AnimationLoop::new(scheduler, FakeSurface::sized(10.0, 10.0, 1.0)));
        let hits = Rc::new(Cell::new(0));
        let (h, weak) = (Rc::clone(&hits), Rc::downgrade(&anim));
        anim.start(move |_, _, _| {
            h.set(h.get() + 1);
            if let Some(anim) = weak.upgrade() {
                anim.stop();
            }
        });
        frames.tick(1.0);
        frames.tick(2.0);
        assert_eq!(hits.get(), 1);
        assert_eq!(frames.pending(), 0);
    }

    #[test]
    fn test_drop_cancels_pending_frame() {
        let (frames, anim) = setup(FakeSurface::sized(10.0, 10.0, 1.0));
        let (hits, draw) = counter();
        anim.start(draw);
        drop(anim);
        assert_eq!(frames.pending(), 0);
        frames.tick(1.0);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_buffer_size_guards_ratio() {
        let e = Extent { width: 10.4, height: 5.0 };
        assert_eq!(buffer_size(e, 0.0), (10, 5, 1.0));
        assert_eq!(buffer_size(e, f64::NAN), (10, 5, 1.0));
        assert_eq!(buffer_size(e, 1.5), (16, 8, 1.5));
    }
}
