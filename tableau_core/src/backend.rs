// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contracts for external collaborators.
//!
//! The core never draws, integrates bodies, or parses animation files itself.
//! Those jobs belong to collaborators that the host constructs and injects
//! at startup:
//!
//! - **Render surface**: [`RenderSurface`] is cleared, drawn into, and
//!   flushed once per tick by the [`FrameScheduler`].
//! - **Scene renderer**: [`SceneRenderer`] owns the external 2D render
//!   tree and is advanced after every flush.
//! - **Physics**: [`PhysicsEngine`] is stepped once per tick when physics
//!   is enabled. It is shared with entity [`BodyBinding`]s through a
//!   [`PhysicsService`] handle.
//! - **Animation**: [`AnimationRuntime`] loads [`AnimationInstance`]s, which
//!   entities advance and feed state-machine inputs into.
//! - **Host**: [`HostContainer`] answers bounding-box and pixel-ratio
//!   queries for the resize controller and pointer mapping;
//!   [`FrameRequester`] schedules the next frame callback; an optional
//!   [`Clock`] timestamps tick phases for tracing.
//!
//! Every trait is object safe so that test doubles and platform backends can
//! be swapped freely.
//!
//! # Frame loop pseudocode
//!
//! ```rust,ignore
//! fn on_frame(time: HostTime) {
//!     // Drains one action per entity, advances physics, updates entities in
//!     // z-order, and asks the requester for the next callback.
//!     stage.frame(time);
//! }
//! ```
//!
//! [`FrameScheduler`]: crate::scheduler::FrameScheduler
//! [`BodyBinding`]: crate::physics::BodyBinding

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use core::cell::RefCell;
use core::fmt;

use kurbo::{Point, Rect, Size, Vec2};

use crate::entity::EntityId;
use crate::error::{ActionError, LoadError};
use crate::time::HostTime;

/// Integer device-pixel dimensions pushed to collaborators after a resize.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelSize {
    /// Width in device pixels.
    pub width: u32,
    /// Height in device pixels.
    pub height: u32,
}

/// A single entity's contribution to the current frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawItem {
    /// The entity being drawn.
    pub entity: EntityId,
    /// Device-space rectangle (post resolution scale).
    pub rect: Rect,
    /// Depth value used for ordering.
    pub z: f64,
    /// The entity's local scale factors.
    pub scale: Vec2,
}

/// The per-frame drawing surface.
pub trait RenderSurface {
    /// Clears the surface before entities draw.
    fn clear(&mut self);

    /// Draws one entity.
    fn draw(&mut self, item: &DrawItem);

    /// Submits everything drawn since the last [`clear`](Self::clear).
    fn flush(&mut self);

    /// Resizes the backing store to the given device-pixel size.
    fn resize(&mut self, size: PixelSize) {
        _ = size;
    }
}

/// An external 2D renderer that owns its own render tree.
pub trait SceneRenderer {
    /// Advances the renderer after the surface has been flushed.
    fn advance(&mut self, dt: f64);

    /// Resizes the renderer's view to the given device-pixel size.
    fn resize(&mut self, size: PixelSize) {
        _ = size;
    }
}

/// The kind of a state-machine input exposed by an animation instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputKind {
    /// A one-shot trigger.
    Trigger,
    /// A boolean input.
    Boolean,
    /// A numeric input.
    Number,
}

impl InputKind {
    /// Returns a short lowercase name for diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Boolean => "boolean",
            Self::Number => "number",
        }
    }
}

/// A loaded animation with a state machine.
///
/// The instance evaluates its state machine during [`advance`](Self::advance).
/// Input setters return [`ActionError`] when the target is missing or has a
/// different kind.
pub trait AnimationInstance {
    /// Advances animation and state-machine time by `dt` seconds.
    fn advance(&mut self, dt: f64);

    /// Returns the artboard's content size.
    fn content_size(&self) -> Size;

    /// Looks up the kind of a named state-machine input.
    fn input_kind(&self, name: &str) -> Option<InputKind>;

    /// Fires a trigger input.
    fn fire_trigger(&mut self, name: &str) -> Result<(), ActionError>;

    /// Sets a boolean input.
    fn set_boolean(&mut self, name: &str, value: bool) -> Result<(), ActionError>;

    /// Sets a numeric input.
    fn set_number(&mut self, name: &str, value: f64) -> Result<(), ActionError>;

    /// Sets an enum view-model property by path.
    fn set_enum(&mut self, path: &str, value: &str) -> Result<(), ActionError>;
}

/// Identifies the animation asset to load.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnimationSource {
    /// Asset location (path or URL).
    pub src: String,
    /// Artboard name; `None` selects the default artboard.
    pub artboard: Option<String>,
    /// State machine name; `None` selects the default state machine.
    pub state_machine: Option<String>,
}

/// Loads animation assets.
pub trait AnimationRuntime {
    /// Loads the given source into a fresh instance.
    fn load(&mut self, source: &AnimationSource) -> Result<Box<dyn AnimationInstance>, LoadError>;
}

/// Opaque handle to a physics body.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyHandle(pub u32);

impl fmt::Debug for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BodyHandle({})", self.0)
    }
}

/// Parameters for creating a physics body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyDesc {
    /// Initial position (canvas space, pre-scale).
    pub position: Point,
    /// Collider size.
    pub size: Size,
    /// Whether the body is simulated (`false` for static colliders).
    pub dynamic: bool,
}

/// A contact reported by the physics engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Collision {
    /// First body.
    pub a: BodyHandle,
    /// Second body.
    pub b: BodyHandle,
}

impl Collision {
    /// Returns the body on the other side of the contact, if `body` is part
    /// of it.
    #[must_use]
    pub fn other(&self, body: BodyHandle) -> Option<BodyHandle> {
        if self.a == body {
            Some(self.b)
        } else if self.b == body {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Callback slot that a physics engine invokes for every contact.
pub type CollisionHandler = Box<dyn FnMut(Collision)>;

/// An external rigid-body engine.
pub trait PhysicsEngine {
    /// Integrates the world by `dt` seconds, invoking the collision handler
    /// for new contacts.
    fn step(&mut self, dt: f64);

    /// Creates a body and returns its handle.
    fn create_body(&mut self, desc: &BodyDesc) -> BodyHandle;

    /// Removes a body. Unknown handles are ignored.
    fn remove_body(&mut self, body: BodyHandle);

    /// Returns the current position of a body.
    fn body_position(&self, body: BodyHandle) -> Option<Point>;

    /// Registers the collision handler, replacing any previous one.
    fn set_collision_handler(&mut self, handler: CollisionHandler);

    /// Updates world bounds after a resize.
    fn resize(&mut self, size: PixelSize) {
        _ = size;
    }
}

/// Shared handle to the process-wide physics engine.
pub type PhysicsService = Rc<RefCell<dyn PhysicsEngine>>;

/// Geometry queries answered by the host page or window.
pub trait HostContainer {
    /// Size of the box available to the canvas, in CSS pixels.
    fn available_size(&self) -> Size;

    /// Ratio of device pixels to CSS pixels.
    fn device_pixel_ratio(&self) -> f64 {
        1.0
    }

    /// Current top-left corner of the canvas in window coordinates.
    fn canvas_origin(&self) -> Point;
}

/// Schedules frame callbacks on the host.
pub trait FrameRequester {
    /// Requests one more frame callback.
    fn request_frame(&mut self);

    /// Cancels any outstanding frame callback.
    fn cancel_frame(&mut self);
}

/// Monotonic host clock, used to timestamp tick phases.
pub trait Clock {
    /// The current host time.
    fn now(&self) -> HostTime;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_other_side() {
        let c = Collision {
            a: BodyHandle(1),
            b: BodyHandle(2),
        };
        assert_eq!(c.other(BodyHandle(1)), Some(BodyHandle(2)));
        assert_eq!(c.other(BodyHandle(2)), Some(BodyHandle(1)));
        assert_eq!(c.other(BodyHandle(3)), None);
    }

    #[test]
    fn input_kind_names() {
        assert_eq!(InputKind::Trigger.as_str(), "trigger");
        assert_eq!(InputKind::Number.as_str(), "number");
    }
}
