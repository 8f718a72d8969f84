// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Optional physics capability for entities.
//!
//! An entity that participates in the simulation carries a boxed
//! [`PhysicsBinding`]. The entity delegates to it at four points:
//!
//! - [`init_physics`](PhysicsBinding::init_physics) once, when the registry
//!   first initializes the entity;
//! - [`update_physics`](PhysicsBinding::update_physics) every update, to
//!   pull the integrated body position back into the entity's state;
//! - [`on_collision`](PhysicsBinding::on_collision) when the scheduler routes
//!   a contact involving the entity's body;
//! - [`dispose`](PhysicsBinding::dispose) when the entity is disposed.
//!
//! [`BodyBinding`] is the stock implementation over a shared
//! [`PhysicsService`].

use alloc::boxed::Box;
use core::fmt;

use kurbo::Point;

use crate::backend::{BodyDesc, BodyHandle, Collision, PhysicsService};

/// Physics behavior attached to an entity.
pub trait PhysicsBinding {
    /// Creates the simulated body. Called once per entity.
    fn init_physics(&mut self, desc: &BodyDesc);

    /// Returns the body's integrated position, if it should drive the
    /// entity.
    fn update_physics(&mut self) -> Option<Point>;

    /// Handles a contact involving this entity's body.
    fn on_collision(&mut self, collision: &Collision);

    /// Releases the simulated body. Must be idempotent.
    fn dispose(&mut self);

    /// The simulated body, once created.
    fn body(&self) -> Option<BodyHandle>;
}

/// Callback invoked for every contact routed to a [`BodyBinding`].
pub type CollisionCallback = Box<dyn FnMut(&Collision)>;

/// [`PhysicsBinding`] that owns one body in a shared engine.
pub struct BodyBinding {
    service: PhysicsService,
    body: Option<BodyHandle>,
    dynamic: bool,
    on_collision: Option<CollisionCallback>,
    contacts: u64,
}

impl fmt::Debug for BodyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyBinding")
            .field("body", &self.body)
            .field("dynamic", &self.dynamic)
            .field("contacts", &self.contacts)
            .finish_non_exhaustive()
    }
}

impl BodyBinding {
    /// Creates a binding for a simulated body.
    #[must_use]
    pub fn dynamic(service: PhysicsService) -> Self {
        Self {
            service,
            body: None,
            dynamic: true,
            on_collision: None,
            contacts: 0,
        }
    }

    /// Creates a binding for a static collider.
    #[must_use]
    pub fn fixed(service: PhysicsService) -> Self {
        Self {
            dynamic: false,
            ..Self::dynamic(service)
        }
    }

    /// Sets the collision callback.
    #[must_use]
    pub fn with_collision_callback(mut self, callback: CollisionCallback) -> Self {
        self.on_collision = Some(callback);
        self
    }

    /// Number of contacts routed to this binding.
    #[must_use]
    pub fn contacts(&self) -> u64 {
        self.contacts
    }
}

impl PhysicsBinding for BodyBinding {
    fn init_physics(&mut self, desc: &BodyDesc) {
        if self.body.is_some() {
            return;
        }
        let desc = BodyDesc {
            dynamic: self.dynamic,
            ..*desc
        };
        match self.service.try_borrow_mut() {
            Ok(mut engine) => self.body = Some(engine.create_body(&desc)),
            Err(_) => tracing::warn!("physics engine busy; body not created"),
        }
    }

    fn update_physics(&mut self) -> Option<Point> {
        if !self.dynamic {
            return None;
        }
        let body = self.body?;
        let engine = self.service.try_borrow().ok()?;
        engine.body_position(body)
    }

    fn on_collision(&mut self, collision: &Collision) {
        self.contacts += 1;
        if let Some(callback) = &mut self.on_collision {
            callback(collision);
        }
    }

    fn dispose(&mut self) {
        let Some(body) = self.body.take() else {
            return;
        };
        match self.service.try_borrow_mut() {
            Ok(mut engine) => engine.remove_body(body),
            Err(_) => tracing::warn!(?body, "physics engine busy; body leaked"),
        }
        self.on_collision = None;
    }

    fn body(&self) -> Option<BodyHandle> {
        self.body
    }
}
