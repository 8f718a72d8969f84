// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Debounced resize handling.
//!
//! A burst of window resize events should produce one rescale, not one per
//! event. [`ResizeController::request`] pauses a running scheduler and
//! (re)arms a debounce deadline. Once the deadline passes,
//! [`poll`](ResizeController::poll) settles the resize:
//!
//! 1. measure the host's available box;
//! 2. compute the uniform fit scale, `min(available / base)` per axis;
//! 3. derive integer canvas dimensions (less a fixed border inset) and the
//!    margins that centre the inset canvas;
//! 4. push the device-pixel size to the surface, renderer and physics;
//! 5. apply `fit scale * device pixel ratio` to every tracked entity;
//! 6. restore the run state that was interrupted;
//! 7. broadcast the [`ResizeDescriptor`] to listeners.
//!
//! Queued state-machine actions are held across the pause.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use kurbo::{Size, Vec2};

use crate::backend::{HostContainer, PixelSize};
use crate::scheduler::{FrameScheduler, ListenerId, RunState};
use crate::time::{Duration, HostTime};
use crate::trace::{ResizeEvent, Tracer};

/// Configuration for the [`ResizeController`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResizeConfig {
    /// Design size of the scene in canvas units.
    pub base: Size,
    /// Quiet period after the last resize event before settling.
    pub debounce: Duration,
    /// Subtracted from each fitted dimension.
    pub border_inset: f64,
}

impl ResizeConfig {
    /// 800×500 base, 250 ms debounce, 2 px inset.
    pub const DEFAULT: Self = Self {
        base: Size::new(800.0, 500.0),
        debounce: Duration::from_millis(250),
        border_inset: 2.0,
    };
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Result of a settled resize.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResizeDescriptor {
    /// Canvas width in CSS pixels.
    pub width: f64,
    /// Canvas height in CSS pixels.
    pub height: f64,
    /// Uniform fit scale.
    pub scale: f64,
    /// Horizontal and vertical margins that centre the canvas.
    pub margin: Vec2,
}

/// Computes the fit of `config.base` into `available`.
///
/// Returns `None` when either box is empty or not finite.
#[must_use]
pub fn fit(available: Size, config: &ResizeConfig) -> Option<ResizeDescriptor> {
    let base = config.base;
    // `f64::min` would hide a NaN axis behind the other one.
    if !is_usable(available) || !is_usable(base) {
        return None;
    }
    let scale = (available.width / base.width).min(available.height / base.height);
    if !(scale.is_finite() && scale > 0.0) {
        return None;
    }
    let fitted = (base * scale).floor();
    let width = (fitted.width - config.border_inset).max(0.0);
    let height = (fitted.height - config.border_inset).max(0.0);
    Some(ResizeDescriptor {
        width,
        height,
        scale,
        margin: Vec2::new(
            (available.width - width) / 2.0,
            (available.height - height) / 2.0,
        ),
    })
}

fn is_usable(size: Size) -> bool {
    size.width.is_finite() && size.height.is_finite() && size.width > 0.0 && size.height > 0.0
}

/// Callback receiving every settled [`ResizeDescriptor`].
pub type ResizeListener = Box<dyn FnMut(&ResizeDescriptor)>;

/// Debounces resize requests and rescales the scene when they settle.
pub struct ResizeController {
    config: ResizeConfig,
    deadline: Option<HostTime>,
    interrupted: Option<RunState>,
    listeners: Vec<(ListenerId, ResizeListener)>,
    next_listener: u64,
    last: Option<ResizeDescriptor>,
}

impl fmt::Debug for ResizeController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResizeController")
            .field("config", &self.config)
            .field("deadline", &self.deadline)
            .field("interrupted", &self.interrupted)
            .field("listeners", &self.listeners.len())
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

impl ResizeController {
    /// Creates an idle controller.
    #[must_use]
    pub fn new(config: ResizeConfig) -> Self {
        Self {
            config,
            deadline: None,
            interrupted: None,
            listeners: Vec::new(),
            next_listener: 0,
            last: None,
        }
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &ResizeConfig {
        &self.config
    }

    /// Whether a resize is waiting to settle.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// The most recently broadcast descriptor.
    #[must_use]
    pub fn last(&self) -> Option<ResizeDescriptor> {
        self.last
    }

    /// Registers a resize listener.
    pub fn on_resize(&mut self, listener: ResizeListener) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.push((id, listener));
        id
    }

    /// Unregisters a resize listener.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    /// Records a resize event at `now`.
    ///
    /// Pauses a running scheduler and pushes the settle deadline out by the
    /// debounce interval.
    pub fn request(&mut self, now: HostTime, scheduler: &mut FrameScheduler) {
        if self.interrupted.is_none() && scheduler.run_state() == RunState::Running {
            self.interrupted = Some(RunState::Running);
            scheduler.set_run_state(RunState::Paused);
        }
        self.deadline = now.checked_add(self.config.debounce);
        tracing::debug!(?now, "resize requested");
    }

    /// Settles the pending resize if its deadline has passed.
    pub fn poll(
        &mut self,
        now: HostTime,
        scheduler: &mut FrameScheduler,
        host: &dyn HostContainer,
        tracer: &mut Tracer<'_>,
    ) -> Option<ResizeDescriptor> {
        match self.deadline {
            Some(deadline) if now >= deadline => self.settle(now, scheduler, host, tracer),
            _ => None,
        }
    }

    /// Settles immediately, ignoring the debounce deadline.
    ///
    /// Used for the initial layout as well as by [`poll`](Self::poll).
    pub fn settle(
        &mut self,
        now: HostTime,
        scheduler: &mut FrameScheduler,
        host: &dyn HostContainer,
        tracer: &mut Tracer<'_>,
    ) -> Option<ResizeDescriptor> {
        self.deadline = None;
        let available = host.available_size();
        let Some(descriptor) = fit(available, &self.config) else {
            tracing::warn!(?available, "host box cannot fit the scene; resize skipped");
            self.resume(scheduler);
            return None;
        };

        let mut dpr = host.device_pixel_ratio();
        if !(dpr.is_finite() && dpr > 0.0) {
            tracing::warn!(dpr, "invalid device pixel ratio; using 1");
            dpr = 1.0;
        }
        scheduler.resize_collaborators(PixelSize {
            width: device_pixels(descriptor.width * dpr),
            height: device_pixels(descriptor.height * dpr),
        });
        let entities = scheduler
            .registry_mut()
            .apply_resolution_scale(descriptor.scale * dpr);
        self.resume(scheduler);

        for (_, listener) in &mut self.listeners {
            listener(&descriptor);
        }
        self.last = Some(descriptor);
        tracer.resize(&ResizeEvent {
            now,
            descriptor,
            entities,
        });
        tracing::info!(
            width = descriptor.width,
            height = descriptor.height,
            scale = descriptor.scale,
            entities,
            "resize settled"
        );
        Some(descriptor)
    }

    fn resume(&mut self, scheduler: &mut FrameScheduler) {
        if let Some(state) = self.interrupted.take()
            && scheduler.run_state() == RunState::Paused
        {
            scheduler.set_run_state(state);
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "canvas dimensions are clamped to the u32 range first"
)]
fn device_pixels(v: f64) -> u32 {
    v.max(0.0).min(f64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::PendingAction;
    use crate::backend::InputKind;
    use crate::entity::{Entity, EntityDefinition, GeometryField};
    use crate::scheduler::SchedulerConfig;
    use crate::testing::{
        FixedHost, RecordingRenderer, RecordingSurface, ScriptedAnimation, SurfaceCall,
    };
    use alloc::rc::Rc;
    use core::cell::RefCell;

    fn scheduler() -> (FrameScheduler, RecordingSurface) {
        let surface = RecordingSurface::default();
        let renderer = RecordingRenderer::default();
        let scheduler = FrameScheduler::new(
            SchedulerConfig::DEFAULT,
            Box::new(surface.clone()),
            Box::new(renderer),
        );
        (scheduler, surface)
    }

    fn ms(v: u64) -> HostTime {
        HostTime(v * 1_000)
    }

    #[test]
    fn fit_halves_800_by_500_into_400_by_300() {
        let d = fit(Size::new(400.0, 300.0), &ResizeConfig::DEFAULT).expect("fits");
        assert_eq!(d.scale, 0.5);
        assert_eq!(d.width, 398.0);
        assert_eq!(d.height, 248.0);
        assert_eq!(d.margin, Vec2::new(1.0, 26.0));
    }

    #[test]
    fn fit_floors_dimensions() {
        let d = fit(Size::new(500.0, 1000.0), &ResizeConfig::DEFAULT).expect("fits");
        assert_eq!(d.scale, 0.625);
        // 500 * 0.625 = 312.5
        assert_eq!(d.height, 310.0);
        assert_eq!(d.width, 498.0);
        assert_eq!(d.margin, Vec2::new(1.0, 345.0));
    }

    #[test]
    fn empty_box_does_not_fit() {
        assert!(fit(Size::ZERO, &ResizeConfig::DEFAULT).is_none());
        assert!(fit(Size::new(f64::NAN, 10.0), &ResizeConfig::DEFAULT).is_none());
        assert!(fit(Size::new(400.0, f64::NAN), &ResizeConfig::DEFAULT).is_none());
        assert!(fit(Size::new(f64::INFINITY, 300.0), &ResizeConfig::DEFAULT).is_none());
        assert!(fit(Size::new(-400.0, 300.0), &ResizeConfig::DEFAULT).is_none());
    }

    #[test]
    fn margins_centre_the_inset_canvas() {
        let config = ResizeConfig {
            border_inset: 10.0,
            ..ResizeConfig::DEFAULT
        };
        let d = fit(Size::new(400.0, 300.0), &config).expect("fits");
        assert_eq!((d.width, d.height), (390.0, 240.0));
        assert_eq!(d.margin, Vec2::new(5.0, 30.0));
        assert_eq!(d.margin.x * 2.0 + d.width, 400.0);
        assert_eq!(d.margin.y * 2.0 + d.height, 300.0);
    }

    #[test]
    fn request_pauses_until_settled() {
        let (mut scheduler, _) = scheduler();
        let host = FixedHost::new(400.0, 300.0, 1.0);
        let mut resize = ResizeController::new(ResizeConfig::DEFAULT);
        scheduler.set_run_state(RunState::Running);

        resize.request(ms(0), &mut scheduler);
        assert_eq!(scheduler.run_state(), RunState::Paused);
        resize.request(ms(100), &mut scheduler);

        let mut tracer = Tracer::none();
        assert!(resize.poll(ms(300), &mut scheduler, &host, &mut tracer).is_none());
        assert_eq!(scheduler.run_state(), RunState::Paused, "debounce restarted");
        assert!(resize.poll(ms(350), &mut scheduler, &host, &mut tracer).is_some());
        assert_eq!(scheduler.run_state(), RunState::Running);
        assert!(!resize.is_pending());
    }

    #[test]
    fn user_pause_is_not_overridden() {
        let (mut scheduler, _) = scheduler();
        let host = FixedHost::new(400.0, 300.0, 1.0);
        let mut resize = ResizeController::new(ResizeConfig::DEFAULT);
        scheduler.set_run_state(RunState::Paused);
        resize.request(ms(0), &mut scheduler);
        resize.settle(ms(0), &mut scheduler, &host, &mut Tracer::none());
        assert_eq!(scheduler.run_state(), RunState::Paused);
    }

    #[test]
    fn settle_pushes_sizes_and_scales_entities() {
        let (mut scheduler, surface) = scheduler();
        let host = FixedHost::new(400.0, 300.0, 2.0);
        let entity =
            Entity::new(EntityDefinition::new().at(10.0, 0.0).size(100.0, 50.0)).into_ref();
        scheduler.registry_mut().add(&entity, None);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut resize = ResizeController::new(ResizeConfig::DEFAULT);
        resize.on_resize(Box::new(move |d| sink.borrow_mut().push(*d)));

        let d = resize
            .settle(ms(0), &mut scheduler, &host, &mut Tracer::none())
            .expect("settled");
        assert_eq!(
            surface.calls.borrow().as_slice(),
            [SurfaceCall::Resize(PixelSize {
                width: 796,
                height: 496,
            })]
        );
        let e = entity.borrow();
        assert_eq!(e.resolution_scale(), Some(1.0));
        assert_eq!(e.transformed(GeometryField::Width), 100.0);
        assert_eq!(seen.borrow().as_slice(), [d]);
        assert_eq!(resize.last(), Some(d));
    }

    #[test]
    fn queued_actions_survive_resize() {
        let (mut scheduler, _) = scheduler();
        let host = FixedHost::new(800.0, 500.0, 1.0);
        let entity = Entity::from_animation(
            EntityDefinition::new(),
            Box::new(ScriptedAnimation::with_inputs(&[("go", InputKind::Trigger)])),
        )
        .into_ref();
        entity.borrow_mut().enqueue(PendingAction::trigger("go"));
        scheduler.registry_mut().add(&entity, None);
        scheduler.set_run_state(RunState::Running);

        let mut resize = ResizeController::new(ResizeConfig::DEFAULT);
        resize.request(ms(0), &mut scheduler);
        resize.poll(ms(250), &mut scheduler, &host, &mut Tracer::none());
        assert_eq!(entity.borrow().pending_actions(), 1);
    }

    #[test]
    fn listeners_can_be_removed() {
        let mut resize = ResizeController::new(ResizeConfig::DEFAULT);
        let id = resize.on_resize(Box::new(|_| {}));
        assert!(resize.remove_listener(id));
        assert!(!resize.remove_listener(id));
    }
}
