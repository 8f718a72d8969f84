// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host-facing façade.
//!
//! [`Stage`] bundles the [`FrameScheduler`] (which owns the registry), the
//! [`ResizeController`] and the host container. Host glue talks to the stage
//! only:
//!
//! ```rust,ignore
//! let stage = SharedStage::new(Stage::new(scheduler, ResizeConfig::DEFAULT).with_host(host));
//! stage.borrow_mut().add_entities(&[hero.clone()], None);
//! stage.borrow_mut().set_run_state(RunState::Running);
//!
//! // From the host's frame callback:
//! stage.frame(now);
//! // From the host's resize event:
//! stage.borrow_mut().window_resized(now);
//! ```
//!
//! [`SharedStage`] is the handle frame callbacks hold. Its
//! [`frame`](SharedStage::frame) refuses to run while another call into the
//! stage is in progress, which is how a frame callback that re-enters the
//! loop is detected.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::{Ref, RefCell, RefMut};
use core::fmt;

use kurbo::Point;

use crate::backend::HostContainer;
use crate::coords::{CanvasOffset, Clamp, MappingTarget, window_to_content};
use crate::entity::EntityRef;
use crate::registry::ObjectRegistry;
use crate::resize::{ResizeConfig, ResizeController, ResizeDescriptor, ResizeListener};
use crate::scheduler::{FrameScheduler, ListenerId, RunState, UpdateListener};
use crate::time::HostTime;
use crate::trace::{TraceSink, Tracer};

/// Scheduler, registry, resize controller and host, driven as one unit.
pub struct Stage {
    scheduler: FrameScheduler,
    resize: ResizeController,
    host: Option<Box<dyn HostContainer>>,
    canvas: CanvasOffset,
    disposed: bool,
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("scheduler", &self.scheduler)
            .field("resize", &self.resize)
            .field("canvas", &self.canvas)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl Stage {
    /// Creates a stage around a configured scheduler.
    #[must_use]
    pub fn new(scheduler: FrameScheduler, resize: ResizeConfig) -> Self {
        Self {
            scheduler,
            resize: ResizeController::new(resize),
            host: None,
            canvas: CanvasOffset::new(),
            disposed: false,
        }
    }

    /// Attaches the host container used for resizing and pointer mapping.
    #[must_use]
    pub fn with_host(mut self, host: Box<dyn HostContainer>) -> Self {
        self.host = Some(host);
        self
    }

    /// The scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// The scheduler, mutably.
    pub fn scheduler_mut(&mut self) -> &mut FrameScheduler {
        &mut self.scheduler
    }

    /// The registry.
    #[must_use]
    pub fn registry(&self) -> &ObjectRegistry {
        self.scheduler.registry()
    }

    /// The resize controller.
    #[must_use]
    pub fn resize_controller(&self) -> &ResizeController {
        &self.resize
    }

    /// Adds entities; returns the same slice for chaining.
    pub fn add_entities<'e>(
        &mut self,
        entities: &'e [EntityRef],
        group: Option<&str>,
    ) -> &'e [EntityRef] {
        self.scheduler.registry_mut().add_all(entities, group);
        entities
    }

    /// Removes and disposes entities.
    pub fn remove_entities(&mut self, entities: &[EntityRef], group: Option<&str>) {
        self.scheduler.registry_mut().remove_all(entities, group);
    }

    /// Sets the run state.
    pub fn set_run_state(&mut self, state: RunState) {
        self.scheduler.set_run_state(state);
    }

    /// Flips between running and paused.
    pub fn toggle_run_state(&mut self) -> RunState {
        self.scheduler.toggle_run_state()
    }

    /// The current run state.
    #[must_use]
    pub fn run_state(&self) -> RunState {
        self.scheduler.run_state()
    }

    /// Registers a per-tick listener.
    pub fn on_update(&mut self, listener: UpdateListener) -> ListenerId {
        self.scheduler.on_update(listener)
    }

    /// Unregisters a per-tick listener.
    pub fn remove_update_listener(&mut self, id: ListenerId) -> bool {
        self.scheduler.remove_update_listener(id)
    }

    /// Registers a resize listener.
    pub fn on_resize(&mut self, listener: ResizeListener) -> ListenerId {
        self.resize.on_resize(listener)
    }

    /// Unregisters a resize listener.
    pub fn remove_resize_listener(&mut self, id: ListenerId) -> bool {
        self.resize.remove_listener(id)
    }

    /// Records a window resize event.
    pub fn window_resized(&mut self, now: HostTime) {
        if self.disposed {
            return;
        }
        if self.host.is_none() {
            tracing::warn!("resize without a host container ignored");
            return;
        }
        self.canvas.invalidate();
        self.resize.request(now, &mut self.scheduler);
    }

    /// Lays the scene out immediately, without debouncing.
    pub fn layout(&mut self, now: HostTime) -> Option<ResizeDescriptor> {
        let host = self.host.as_deref()?;
        self.canvas.invalidate();
        self.resize
            .settle(now, &mut self.scheduler, host, &mut Tracer::none())
    }

    /// Drops the cached canvas origin, e.g. after the page scrolled.
    pub fn invalidate_canvas_offset(&mut self) {
        self.canvas.invalidate();
    }

    /// Maps a window-space pointer position into an entity's content space.
    pub fn pointer_to_content(
        &mut self,
        entity: &EntityRef,
        window: Point,
        clamp: Clamp,
    ) -> Option<Point> {
        let host = self.host.as_deref()?;
        let target = {
            let entity = entity.try_borrow().ok()?;
            MappingTarget::of(&entity)
        };
        Some(window_to_content(
            window,
            &mut self.canvas,
            host,
            &target,
            clamp,
        ))
    }

    /// Handles one host frame callback. Returns `true` if a tick ran.
    pub fn frame(&mut self, time: HostTime) -> bool {
        self.frame_with(time, &mut Tracer::none())
    }

    /// Like [`frame`](Self::frame), reporting to `sink`.
    pub fn frame_traced(&mut self, time: HostTime, sink: &mut dyn TraceSink) -> bool {
        self.frame_with(time, &mut Tracer::new(sink))
    }

    fn frame_with(&mut self, time: HostTime, tracer: &mut Tracer<'_>) -> bool {
        if self.disposed {
            return false;
        }
        if let Some(host) = self.host.as_deref()
            && self
                .resize
                .poll(time, &mut self.scheduler, host, tracer)
                .is_some()
        {
            self.canvas.invalidate();
        }
        self.scheduler.frame(time, tracer)
    }

    /// Tears everything down: cancels the frame request, disposes every
    /// entity and detaches all listeners. Calling it again does nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.scheduler.dispose();
        self.resize = ResizeController::new(*self.resize.config());
        self.host = None;
    }

    /// Whether [`dispose`](Self::dispose) has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

/// Shared handle to a [`Stage`], as held by host callbacks.
#[derive(Clone)]
pub struct SharedStage(Rc<RefCell<Stage>>);

impl fmt::Debug for SharedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(stage) => f.debug_tuple("SharedStage").field(&*stage).finish(),
            Err(_) => f.write_str("SharedStage(<busy>)"),
        }
    }
}

impl SharedStage {
    /// Wraps a stage.
    #[must_use]
    pub fn new(stage: Stage) -> Self {
        Self(Rc::new(RefCell::new(stage)))
    }

    /// Runs one frame callback.
    ///
    /// If the stage is already borrowed (a callback re-entered the loop) the
    /// call is logged and ignored, and `false` is returned.
    pub fn frame(&self, time: HostTime) -> bool {
        match self.0.try_borrow_mut() {
            Ok(mut stage) => stage.frame(time),
            Err(_) => {
                tracing::error!(?time, "frame re-entered; duplicate callback ignored");
                false
            }
        }
    }

    /// Like [`frame`](Self::frame), reporting to `sink`.
    pub fn frame_traced(&self, time: HostTime, sink: &mut dyn TraceSink) -> bool {
        match self.0.try_borrow_mut() {
            Ok(mut stage) => stage.frame_traced(time, sink),
            Err(_) => {
                tracing::error!(?time, "frame re-entered; duplicate callback ignored");
                false
            }
        }
    }

    /// Borrows the stage.
    ///
    /// # Panics
    ///
    /// Panics if the stage is mutably borrowed.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, Stage> {
        self.0.borrow()
    }

    /// Mutably borrows the stage.
    ///
    /// # Panics
    ///
    /// Panics if the stage is already borrowed.
    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, Stage> {
        self.0.borrow_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, EntityDefinition};
    use crate::scheduler::SchedulerConfig;
    use crate::testing::{CountingRequester, FixedHost, RecordingRenderer, RecordingSurface};
    use core::cell::Cell;

    fn stage(host: FixedHost) -> (Stage, CountingRequester) {
        let requester = CountingRequester::default();
        let scheduler = FrameScheduler::new(
            SchedulerConfig::DEFAULT,
            Box::new(RecordingSurface::default()),
            Box::new(RecordingRenderer::default()),
        )
        .with_requester(Box::new(requester.clone()));
        let stage = Stage::new(scheduler, ResizeConfig::DEFAULT).with_host(Box::new(host));
        (stage, requester)
    }

    fn ms(v: u64) -> HostTime {
        HostTime(v * 1_000)
    }

    #[test]
    fn re_entrant_frame_is_ignored() {
        let (stage, _) = stage(FixedHost::new(800.0, 500.0, 1.0));
        let shared = SharedStage::new(stage);
        let inner = shared.clone();
        let nested = Rc::new(Cell::new(None));
        let result = nested.clone();
        shared.borrow_mut().on_update(Box::new(move |info| {
            result.set(Some(inner.frame(info.time)));
        }));
        shared.borrow_mut().set_run_state(RunState::Running);

        assert!(!shared.frame(ms(0)));
        assert!(shared.frame(ms(20)));
        assert_eq!(nested.get(), Some(false), "nested call refused");
        assert_eq!(shared.borrow().scheduler().frame_count(), 1);
    }

    #[test]
    fn window_resize_settles_through_frames() {
        let host = FixedHost::new(400.0, 300.0, 1.0);
        let size = host.size.clone();
        let (mut stage, _) = stage(host);
        let entity = Entity::new(EntityDefinition::new().size(100.0, 100.0)).into_ref();
        stage.add_entities(&[entity.clone()], None);
        stage.set_run_state(RunState::Running);

        let broadcasts = Rc::new(Cell::new(0));
        let counter = broadcasts.clone();
        stage.on_resize(Box::new(move |_| counter.set(counter.get() + 1)));

        size.set(kurbo::Size::new(1600.0, 1000.0));
        stage.window_resized(ms(0));
        stage.window_resized(ms(50));
        assert_eq!(stage.run_state(), RunState::Paused);
        assert!(!stage.frame(ms(100)));
        stage.frame(ms(300));
        assert_eq!(broadcasts.get(), 1, "one broadcast per settled burst");
        assert_eq!(stage.run_state(), RunState::Running);
        assert_eq!(entity.borrow().resolution_scale(), Some(2.0));
    }

    #[test]
    fn add_and_remove_entities() {
        let (mut stage, _) = stage(FixedHost::new(800.0, 500.0, 1.0));
        let a = Entity::new(EntityDefinition::new()).into_ref();
        let b = Entity::new(EntityDefinition::new()).into_ref();
        let batch = [a.clone(), b.clone()];
        let added = stage.add_entities(&batch, Some("layer"));
        assert_eq!(added.len(), 2);
        assert_eq!(stage.registry().len(), 2);
        stage.remove_entities(&[a.clone()], Some("layer"));
        assert!(a.borrow().is_disposed());
        assert_eq!(stage.registry().len(), 1);
    }

    #[test]
    fn pointer_maps_into_entity_content() {
        let host = FixedHost::new(800.0, 500.0, 1.0);
        host.origin.set(Point::new(10.0, 10.0));
        let (mut stage, _) = stage(host);
        let entity =
            Entity::new(EntityDefinition::new().at(100.0, 100.0).size(50.0, 50.0)).into_ref();
        stage.add_entities(&[entity.clone()], None);
        let p = stage
            .pointer_to_content(&entity, Point::new(120.0, 130.0), Clamp::Inset)
            .expect("host attached");
        assert_eq!(p, Point::new(10.0, 20.0));
    }

    #[test]
    fn pointer_mapping_after_layout_ignores_pixel_ratio() {
        for dpr in [1.0, 2.0, 3.0] {
            let host = FixedHost::new(400.0, 250.0, dpr);
            host.origin.set(Point::new(10.0, 10.0));
            let (mut stage, _) = stage(host);
            let entity =
                Entity::new(EntityDefinition::new().at(100.0, 100.0).size(50.0, 50.0)).into_ref();
            stage.add_entities(&[entity.clone()], None);
            stage.layout(ms(0)).expect("fits");
            assert_eq!(entity.borrow().resolution_scale(), Some(0.5 * dpr));

            let p = stage
                .pointer_to_content(&entity, Point::new(70.0, 70.0), Clamp::Bypass)
                .expect("host attached");
            assert!(
                (p.x - 20.0).abs() < 1e-9 && (p.y - 20.0).abs() < 1e-9,
                "dpr {dpr}: {p:?}"
            );
        }
    }

    #[test]
    fn layout_applies_initial_scale() {
        let (mut stage, _) = stage(FixedHost::new(400.0, 250.0, 2.0));
        let d = stage.layout(ms(0)).expect("fits");
        assert_eq!(d.scale, 0.5);
        assert_eq!(stage.registry().resolution_scale(), Some(1.0));
    }

    #[test]
    fn dispose_is_idempotent() {
        let (mut stage, requester) = stage(FixedHost::new(800.0, 500.0, 1.0));
        let entity = Entity::new(EntityDefinition::new()).into_ref();
        stage.add_entities(&[entity.clone()], None);
        stage.on_update(Box::new(|_| {}));
        stage.dispose();
        stage.dispose();
        assert!(stage.is_disposed());
        assert_eq!(requester.cancels.get(), 1);
        assert!(entity.borrow().is_disposed());
        assert!(!stage.frame(ms(100)));
    }
}
