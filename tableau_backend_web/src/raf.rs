// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `requestAnimationFrame` frame requester.
//!
//! [`RafRequester`] implements [`FrameRequester`]: each
//! [`request_frame`](FrameRequester::request_frame) registers one
//! `requestAnimationFrame` callback, which converts the
//! [`DOMHighResTimeStamp`][mdn] (milliseconds) into a microsecond [`HostTime`]
//! and hands it to the frame callback installed with
//! [`on_frame`](RafRequester::on_frame).
//!
//! At most one callback is outstanding; repeated requests before it fires
//! are coalesced.
//!
//! [mdn]: https://developer.mozilla.org/en-US/docs/Web/API/DOMHighResTimeStamp

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use tableau_core::backend::FrameRequester;
use tableau_core::time::HostTime;

// Direct global bindings instead of `web_sys::Window` methods; avoids
// fetching (and unwrapping) the Window/Performance objects on every frame.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    pub(crate) fn performance_now() -> f64;

    #[wasm_bindgen(js_name = "requestAnimationFrame")]
    fn request_animation_frame(callback: &JsValue) -> i32;

    #[wasm_bindgen(js_name = "cancelAnimationFrame")]
    fn cancel_animation_frame(id: i32);
}

type RafClosure = Closure<dyn FnMut(f64)>;
type FrameCallback = Box<dyn FnMut(HostTime)>;

/// A [`FrameRequester`] backed by `requestAnimationFrame`.
///
/// Clones share the same registration, so one clone can be handed to the
/// scheduler while the host keeps another to install the frame callback:
///
/// ```rust,ignore
/// let raf = RafRequester::new();
/// let scheduler = FrameScheduler::new(config, surface, renderer)
///     .with_requester(Box::new(raf.clone()));
/// let stage = SharedStage::new(Stage::new(scheduler, ResizeConfig::DEFAULT));
/// let handle = stage.clone();
/// raf.on_frame(move |now| {
///     handle.frame(now);
/// });
/// ```
#[derive(Clone)]
pub struct RafRequester {
    inner: Rc<RafInner>,
}

struct RafInner {
    /// The JS closure registered with `requestAnimationFrame`. It holds only
    /// a weak reference back to this struct.
    closure: RefCell<Option<RafClosure>>,

    /// Receives the converted timestamp of every callback.
    callback: RefCell<Option<FrameCallback>>,

    /// The id of the outstanding `requestAnimationFrame` call.
    pending: Cell<Option<i32>>,
}

impl RafRequester {
    /// Creates a requester with no frame callback installed.
    #[must_use]
    pub fn new() -> Self {
        let inner = Rc::new(RafInner {
            closure: RefCell::new(None),
            callback: RefCell::new(None),
            pending: Cell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let closure = Closure::wrap(Box::new(move |timestamp_ms: f64| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.pending.set(None);
            let now = HostTime::from_millis_f64(timestamp_ms);
            match inner.callback.try_borrow_mut() {
                Ok(mut callback) => {
                    if let Some(callback) = callback.as_mut() {
                        callback(now);
                    }
                }
                Err(_) => tracing::warn!(?now, "frame callback re-entered"),
            }
        }) as Box<dyn FnMut(f64)>);
        *inner.closure.borrow_mut() = Some(closure);

        Self { inner }
    }

    /// Installs the frame callback, replacing any previous one.
    pub fn on_frame(&self, callback: impl FnMut(HostTime) + 'static) {
        match self.inner.callback.try_borrow_mut() {
            Ok(mut slot) => *slot = Some(Box::new(callback)),
            Err(_) => tracing::warn!("frame callback replaced from inside itself; ignored"),
        }
    }

    /// Returns `true` if a callback is outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.pending.get().is_some()
    }
}

impl Default for RafRequester {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameRequester for RafRequester {
    fn request_frame(&mut self) {
        if self.inner.pending.get().is_some() {
            return;
        }
        if let Some(ref closure) = *self.inner.closure.borrow() {
            let id = request_animation_frame(closure.as_ref().unchecked_ref());
            self.inner.pending.set(Some(id));
        }
    }

    fn cancel_frame(&mut self) {
        if let Some(id) = self.inner.pending.take() {
            cancel_animation_frame(id);
        }
    }
}

impl Drop for RafInner {
    fn drop(&mut self) {
        if let Some(id) = self.pending.take() {
            cancel_animation_frame(id);
        }
    }
}

impl core::fmt::Debug for RafRequester {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RafRequester")
            .field("pending", &self.inner.pending.get())
            .field(
                "has_callback",
                &self.inner.callback.try_borrow().map(|c| c.is_some()).ok(),
            )
            .finish_non_exhaustive()
    }
}
