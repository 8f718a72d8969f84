// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collaborator doubles shared by the unit tests.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use kurbo::{Point, Size};

use crate::backend::{
    AnimationInstance, AnimationRuntime, AnimationSource, BodyDesc, BodyHandle, Collision,
    CollisionHandler, DrawItem, FrameRequester, HostContainer, InputKind, PhysicsEngine,
    PixelSize, RenderSurface, SceneRenderer,
};
use crate::entity::EntityId;
use crate::error::{ActionError, LoadError};

/// A single change observed by [`ScriptedAnimation`].
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum InputChange {
    Trigger(String),
    Boolean(String, bool),
    Number(String, f64),
    Enum(String, String),
}

/// Animation instance with a fixed set of inputs that records every change.
#[derive(Debug, Default)]
pub(crate) struct ScriptedAnimation {
    pub(crate) inputs: Vec<(String, InputKind)>,
    pub(crate) log: Vec<InputChange>,
    pub(crate) advanced: Vec<f64>,
    pub(crate) size: Size,
}

impl ScriptedAnimation {
    pub(crate) fn with_inputs(inputs: &[(&str, InputKind)]) -> Self {
        Self {
            inputs: inputs.iter().map(|(n, k)| (n.to_string(), *k)).collect(),
            size: Size::new(100.0, 100.0),
            ..Self::default()
        }
    }

    pub(crate) fn number_history(&self, name: &str) -> Vec<f64> {
        self.log
            .iter()
            .filter_map(|c| match c {
                InputChange::Number(n, v) if n == name => Some(*v),
                _ => None,
            })
            .collect()
    }
}

impl AnimationInstance for ScriptedAnimation {
    fn advance(&mut self, dt: f64) {
        self.advanced.push(dt);
    }

    fn content_size(&self) -> Size {
        self.size
    }

    fn input_kind(&self, name: &str) -> Option<InputKind> {
        self.inputs.iter().find(|(n, _)| n == name).map(|(_, k)| *k)
    }

    fn fire_trigger(&mut self, name: &str) -> Result<(), ActionError> {
        self.log.push(InputChange::Trigger(name.to_string()));
        Ok(())
    }

    fn set_boolean(&mut self, name: &str, value: bool) -> Result<(), ActionError> {
        self.log.push(InputChange::Boolean(name.to_string(), value));
        Ok(())
    }

    fn set_number(&mut self, name: &str, value: f64) -> Result<(), ActionError> {
        self.log.push(InputChange::Number(name.to_string(), value));
        Ok(())
    }

    fn set_enum(&mut self, path: &str, value: &str) -> Result<(), ActionError> {
        if path.is_empty() {
            return Err(ActionError::TargetNotFound(path.to_string()));
        }
        self.log
            .push(InputChange::Enum(path.to_string(), value.to_string()));
        Ok(())
    }
}

/// Animation instance that forwards advances into a shared log, so tests
/// can observe it after the instance moved into an entity.
#[derive(Debug)]
pub(crate) struct SharedAnimation {
    pub(crate) inner: Rc<RefCell<ScriptedAnimation>>,
}

impl AnimationInstance for SharedAnimation {
    fn advance(&mut self, dt: f64) {
        self.inner.borrow_mut().advance(dt);
    }

    fn content_size(&self) -> Size {
        self.inner.borrow().content_size()
    }

    fn input_kind(&self, name: &str) -> Option<InputKind> {
        self.inner.borrow().input_kind(name)
    }

    fn fire_trigger(&mut self, name: &str) -> Result<(), ActionError> {
        self.inner.borrow_mut().fire_trigger(name)
    }

    fn set_boolean(&mut self, name: &str, value: bool) -> Result<(), ActionError> {
        self.inner.borrow_mut().set_boolean(name, value)
    }

    fn set_number(&mut self, name: &str, value: f64) -> Result<(), ActionError> {
        self.inner.borrow_mut().set_number(name, value)
    }

    fn set_enum(&mut self, path: &str, value: &str) -> Result<(), ActionError> {
        self.inner.borrow_mut().set_enum(path, value)
    }
}

/// Runtime that loads [`ScriptedAnimation`]s or fails for `"missing.riv"`.
#[derive(Debug, Default)]
pub(crate) struct FakeRuntime {
    pub(crate) loaded: Vec<String>,
}

impl AnimationRuntime for FakeRuntime {
    fn load(&mut self, source: &AnimationSource) -> Result<Box<dyn AnimationInstance>, LoadError> {
        if source.src == "missing.riv" {
            return Err(LoadError {
                source_name: source.src.clone(),
                reason: "not found".to_string(),
            });
        }
        self.loaded.push(source.src.clone());
        Ok(Box::new(ScriptedAnimation::with_inputs(&[
            ("go", InputKind::Trigger),
            ("on", InputKind::Boolean),
        ])))
    }
}

/// A call observed by [`RecordingSurface`] or [`RecordingRenderer`].
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum SurfaceCall {
    Clear,
    Draw(EntityId),
    Flush,
    Advance(f64),
    Resize(PixelSize),
}

/// Surface that appends every call to a shared log.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingSurface {
    pub(crate) calls: Rc<RefCell<Vec<SurfaceCall>>>,
    pub(crate) items: Rc<RefCell<Vec<DrawItem>>>,
}

impl RenderSurface for RecordingSurface {
    fn clear(&mut self) {
        self.calls.borrow_mut().push(SurfaceCall::Clear);
    }

    fn draw(&mut self, item: &DrawItem) {
        self.calls.borrow_mut().push(SurfaceCall::Draw(item.entity));
        self.items.borrow_mut().push(*item);
    }

    fn flush(&mut self) {
        self.calls.borrow_mut().push(SurfaceCall::Flush);
    }

    fn resize(&mut self, size: PixelSize) {
        self.calls.borrow_mut().push(SurfaceCall::Resize(size));
    }
}

/// Scene renderer sharing a call log with a [`RecordingSurface`].
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingRenderer {
    pub(crate) calls: Rc<RefCell<Vec<SurfaceCall>>>,
}

impl SceneRenderer for RecordingRenderer {
    fn advance(&mut self, dt: f64) {
        self.calls.borrow_mut().push(SurfaceCall::Advance(dt));
    }

    fn resize(&mut self, size: PixelSize) {
        self.calls.borrow_mut().push(SurfaceCall::Resize(size));
    }
}

/// Physics engine that moves every dynamic body by a fixed velocity and
/// reports scripted collisions on the next step.
#[derive(Default)]
pub(crate) struct RecordingPhysics {
    pub(crate) steps: Vec<f64>,
    pub(crate) bodies: Vec<(BodyHandle, Point, bool)>,
    pub(crate) removed: Vec<BodyHandle>,
    pub(crate) velocity: (f64, f64),
    pub(crate) pending_contacts: Vec<Collision>,
    pub(crate) sizes: Vec<PixelSize>,
    pub(crate) handler: Option<CollisionHandler>,
    pub(crate) next: u32,
}

impl core::fmt::Debug for RecordingPhysics {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RecordingPhysics")
            .field("steps", &self.steps)
            .field("bodies", &self.bodies)
            .finish_non_exhaustive()
    }
}

impl PhysicsEngine for RecordingPhysics {
    fn step(&mut self, dt: f64) {
        self.steps.push(dt);
        let (vx, vy) = self.velocity;
        for (_, pos, dynamic) in &mut self.bodies {
            if *dynamic {
                pos.x += vx * dt;
                pos.y += vy * dt;
            }
        }
        let contacts: Vec<Collision> = self.pending_contacts.drain(..).collect();
        if let Some(handler) = &mut self.handler {
            for c in contacts {
                handler(c);
            }
        }
    }

    fn create_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        self.next += 1;
        let handle = BodyHandle(self.next);
        self.bodies.push((handle, desc.position, desc.dynamic));
        handle
    }

    fn remove_body(&mut self, body: BodyHandle) {
        self.bodies.retain(|(h, _, _)| *h != body);
        self.removed.push(body);
    }

    fn body_position(&self, body: BodyHandle) -> Option<Point> {
        self.bodies
            .iter()
            .find(|(h, _, _)| *h == body)
            .map(|(_, p, _)| *p)
    }

    fn set_collision_handler(&mut self, handler: CollisionHandler) {
        self.handler = Some(handler);
    }

    fn resize(&mut self, size: PixelSize) {
        self.sizes.push(size);
    }
}

/// Requester that counts requests and cancellations.
#[derive(Debug, Clone, Default)]
pub(crate) struct CountingRequester {
    pub(crate) requests: Rc<Cell<u32>>,
    pub(crate) cancels: Rc<Cell<u32>>,
}

impl FrameRequester for CountingRequester {
    fn request_frame(&mut self) {
        self.requests.set(self.requests.get() + 1);
    }

    fn cancel_frame(&mut self) {
        self.cancels.set(self.cancels.get() + 1);
    }
}

/// Host with a mutable available box.
#[derive(Debug, Clone)]
pub(crate) struct FixedHost {
    pub(crate) size: Rc<Cell<Size>>,
    pub(crate) dpr: f64,
    pub(crate) origin: Rc<Cell<Point>>,
}

impl FixedHost {
    pub(crate) fn new(width: f64, height: f64, dpr: f64) -> Self {
        Self {
            size: Rc::new(Cell::new(Size::new(width, height))),
            dpr,
            origin: Rc::new(Cell::new(Point::ZERO)),
        }
    }
}

impl HostContainer for FixedHost {
    fn available_size(&self) -> Size {
        self.size.get()
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.dpr
    }

    fn canvas_origin(&self) -> Point {
        self.origin.get()
    }
}

/// Asserts two floats are equal within `1e-9`.
#[track_caller]
pub(crate) fn assert_close(actual: f64, expected: f64) {
    let diff = if actual > expected {
        actual - expected
    } else {
        expected - actual
    };
    assert!(diff < 1e-9, "expected {expected}, got {actual}");
}
