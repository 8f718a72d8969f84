// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless stand-ins for the browser, renderer and physics engine.

use std::cell::Cell;
use std::rc::Rc;

use kurbo::{Point, Size};
use tableau_core::backend::{
    AnimationInstance, AnimationRuntime, AnimationSource, BodyDesc, BodyHandle, Clock, Collision,
    CollisionHandler, DrawItem, FrameRequester, HostContainer, InputKind, PhysicsEngine,
    PixelSize, RenderSurface, SceneRenderer,
};
use tableau_core::error::{ActionError, LoadError};
use tableau_core::time::HostTime;

/// Counts draws per flush.
#[derive(Debug, Default)]
pub(crate) struct CountingSurface {
    pending: u32,
    pub(crate) draws: Rc<Cell<u64>>,
}

impl RenderSurface for CountingSurface {
    fn clear(&mut self) {
        self.pending = 0;
    }

    fn draw(&mut self, item: &DrawItem) {
        self.pending += 1;
        tracing::trace!(entity = %item.entity, z = item.z, "draw");
    }

    fn flush(&mut self) {
        self.draws.set(self.draws.get() + u64::from(self.pending));
    }

    fn resize(&mut self, size: PixelSize) {
        tracing::info!(width = size.width, height = size.height, "surface resized");
    }
}

/// Scene renderer that only tracks advanced time.
#[derive(Debug, Default)]
pub(crate) struct NullRenderer {
    elapsed: f64,
}

impl SceneRenderer for NullRenderer {
    fn advance(&mut self, dt: f64) {
        self.elapsed += dt;
        tracing::trace!(elapsed = self.elapsed, "scene advanced");
    }
}

#[derive(Debug)]
struct Body {
    handle: BodyHandle,
    position: Point,
    size: Size,
    dynamic: bool,
    velocity: f64,
    resting: bool,
}

/// Vertical gravity with bounces off every static body below.
#[derive(Default)]
pub(crate) struct FallingWorld {
    bodies: Vec<Body>,
    handler: Option<CollisionHandler>,
    next: u32,
}

impl std::fmt::Debug for FallingWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallingWorld")
            .field("bodies", &self.bodies)
            .finish_non_exhaustive()
    }
}

const GRAVITY: f64 = 980.0;
const RESTITUTION: f64 = 0.5;

impl PhysicsEngine for FallingWorld {
    fn step(&mut self, dt: f64) {
        let floors: Vec<(BodyHandle, f64)> = self
            .bodies
            .iter()
            .filter(|b| !b.dynamic)
            .map(|b| (b.handle, b.position.y))
            .collect();
        let mut contacts = Vec::new();
        for body in self.bodies.iter_mut().filter(|b| b.dynamic && !b.resting) {
            body.velocity += GRAVITY * dt;
            body.position.y += body.velocity * dt;
            let bottom = body.position.y + body.size.height;
            if let Some(&(floor, top)) = floors.iter().find(|(_, top)| bottom >= *top) {
                body.position.y = top - body.size.height;
                body.velocity = -body.velocity * RESTITUTION;
                if body.velocity.abs() < 20.0 {
                    body.resting = true;
                }
                contacts.push(Collision {
                    a: body.handle,
                    b: floor,
                });
            }
        }
        if let Some(handler) = &mut self.handler {
            for contact in contacts {
                handler(contact);
            }
        }
    }

    fn create_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        self.next += 1;
        let handle = BodyHandle(self.next);
        self.bodies.push(Body {
            handle,
            position: desc.position,
            size: desc.size,
            dynamic: desc.dynamic,
            velocity: 0.0,
            resting: false,
        });
        handle
    }

    fn remove_body(&mut self, body: BodyHandle) {
        self.bodies.retain(|b| b.handle != body);
    }

    fn body_position(&self, body: BodyHandle) -> Option<Point> {
        self.bodies
            .iter()
            .find(|b| b.handle == body)
            .map(|b| b.position)
    }

    fn set_collision_handler(&mut self, handler: CollisionHandler) {
        self.handler = Some(handler);
    }
}

/// A state machine with a trigger, a number and an enum property.
#[derive(Debug, Default)]
pub(crate) struct Puppet {
    waves: u32,
    speed: f64,
    mood: String,
    time: f64,
}

impl AnimationInstance for Puppet {
    fn advance(&mut self, dt: f64) {
        self.time += dt * self.speed.max(1.0);
        tracing::trace!(time = self.time, "puppet advanced");
    }

    fn content_size(&self) -> Size {
        Size::new(120.0, 160.0)
    }

    fn input_kind(&self, name: &str) -> Option<InputKind> {
        match name {
            "wave" => Some(InputKind::Trigger),
            "speed" => Some(InputKind::Number),
            "blink" => Some(InputKind::Boolean),
            _ => None,
        }
    }

    fn fire_trigger(&mut self, name: &str) -> Result<(), ActionError> {
        self.waves += 1;
        tracing::info!(name, waves = self.waves, "puppet trigger");
        Ok(())
    }

    fn set_boolean(&mut self, name: &str, value: bool) -> Result<(), ActionError> {
        tracing::info!(name, value, "puppet boolean");
        Ok(())
    }

    fn set_number(&mut self, name: &str, value: f64) -> Result<(), ActionError> {
        self.speed = value;
        tracing::info!(name, value, "puppet number");
        Ok(())
    }

    fn set_enum(&mut self, path: &str, value: &str) -> Result<(), ActionError> {
        if path != "face/mood" {
            return Err(ActionError::TargetNotFound(path.to_owned()));
        }
        value.clone_into(&mut self.mood);
        tracing::info!(path, mood = %self.mood, "puppet enum");
        Ok(())
    }
}

/// Loads [`Puppet`] for `puppet.riv`.
#[derive(Debug, Default)]
pub(crate) struct PuppetRuntime;

impl AnimationRuntime for PuppetRuntime {
    fn load(
        &mut self,
        source: &AnimationSource,
    ) -> Result<Box<dyn AnimationInstance>, LoadError> {
        if source.src == "puppet.riv" {
            Ok(Box::new(Puppet::default()))
        } else {
            Err(LoadError {
                source_name: source.src.clone(),
                reason: "no such asset".to_owned(),
            })
        }
    }
}

/// A window with a mutable inner size.
#[derive(Debug, Clone)]
pub(crate) struct SimWindow {
    pub(crate) size: Rc<Cell<Size>>,
    pub(crate) dpr: f64,
}

impl HostContainer for SimWindow {
    fn available_size(&self) -> Size {
        self.size.get()
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.dpr
    }

    fn canvas_origin(&self) -> Point {
        Point::new(8.0, 8.0)
    }
}

/// Requester that records whether a callback is outstanding.
#[derive(Debug, Clone, Default)]
pub(crate) struct SimRequester {
    pub(crate) pending: Rc<Cell<bool>>,
}

impl FrameRequester for SimRequester {
    fn request_frame(&mut self) {
        self.pending.set(true);
    }

    fn cancel_frame(&mut self) {
        self.pending.set(false);
    }
}

/// Clock advanced by the simulated loop.
#[derive(Debug, Clone, Default)]
pub(crate) struct SimClock {
    pub(crate) now: Rc<Cell<HostTime>>,
}

impl Clock for SimClock {
    fn now(&self) -> HostTime {
        self.now.get()
    }
}
