// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene entities.
//!
//! There is one concrete [`Entity`] type. What used to be a family of
//! subclasses (plain visual, animated, container, physics-enabled variants of
//! each) is expressed as optional capabilities selected at construction:
//!
//! - an [`AnimationInstance`] driver ([`Entity::with_animation`]),
//! - a [`PhysicsBinding`] ([`Entity::with_physics`]),
//! - a child list ([`Entity::container`], see [`attach_child`]).
//!
//! Entities are shared as [`EntityRef`] (`Rc<RefCell<Entity>>`). The registry
//! and containers hold strong references; a child's link back to its parent is
//! weak.
//!
//! # Write path
//!
//! Every positional setter runs the same three steps:
//!
//! 1. store the value in [`EntityState`] (equal writes stop here),
//! 2. fire the listener bound to that field with `(old, new)`,
//! 3. if a resolution scale is active, refresh only the affected transformed
//!    field through the [`ResolutionCascade`].
//!
//! A depth change additionally notifies the owning registry so it can
//! re-sort the group.

mod cascade;
mod container;
mod id;
mod state;

pub use cascade::{BaseGeometry, CascadeTarget, GeometryField, ResolutionCascade};
pub use container::{RelativeTransform, attach_child, detach_child};
pub use id::{EntityId, EntityKind};
pub use state::{ChangeListener, EntityState, StateField, StateValue};

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use kurbo::{Point, Rect, Size, Vec2};

use crate::action::{ActionQueue, PendingAction};
use crate::backend::{
    AnimationInstance, AnimationRuntime, AnimationSource, BodyDesc, Collision, DrawItem,
};
use crate::error::SceneError;
use crate::physics::PhysicsBinding;
use crate::scheduler::FrameContext;

use container::ChildLink;

/// Shared handle to an entity.
pub type EntityRef = Rc<RefCell<Entity>>;

/// Non-owning handle to an entity.
pub type WeakEntityRef = Weak<RefCell<Entity>>;

/// Group an entity joins when none is named.
pub const DEFAULT_GROUP: &str = "main";

/// Construction parameters for an [`Entity`].
///
/// Invalid fields are replaced with their defaults (and logged) when the
/// entity is built; a definition is never rejected.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityDefinition {
    /// Human-readable label. Auto-generated per kind when absent.
    pub label: Option<String>,
    /// Group the entity prefers when added without an explicit group.
    pub group: Option<String>,
    /// Horizontal position in canvas units.
    pub x: f64,
    /// Vertical position in canvas units.
    pub y: f64,
    /// Explicit depth. `None` lets the registry assign one.
    pub z: Option<f64>,
    /// Horizontal scale.
    pub x_scale: f64,
    /// Vertical scale.
    pub y_scale: f64,
    /// Width in canvas units. Zero means "use the content size" for animated
    /// entities.
    pub width: f64,
    /// Height in canvas units.
    pub height: f64,
    /// Whether the entity is drawn.
    pub visible: bool,
    /// Whether the scheduler updates the entity.
    pub render: bool,
}

impl Default for EntityDefinition {
    fn default() -> Self {
        Self {
            label: None,
            group: None,
            x: 0.0,
            y: 0.0,
            z: None,
            x_scale: 1.0,
            y_scale: 1.0,
            width: 0.0,
            height: 0.0,
            visible: true,
            render: true,
        }
    }
}

impl EntityDefinition {
    /// A definition with every field at its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the preferred group.
    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Sets the position.
    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Sets an explicit depth.
    #[must_use]
    pub fn z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    /// Sets the size.
    #[must_use]
    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets both scale factors.
    #[must_use]
    pub fn scale(mut self, x_scale: f64, y_scale: f64) -> Self {
        self.x_scale = x_scale;
        self.y_scale = y_scale;
        self
    }

    /// Starts hidden.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Starts excluded from updates.
    #[must_use]
    pub fn inert(mut self) -> Self {
        self.render = false;
        self
    }

    /// Replaces invalid fields with defaults.
    fn normalized(mut self) -> Self {
        let fallback = Self::default();
        if !self.x.is_finite() {
            tracing::warn!(x = self.x, "invalid x in definition; using 0");
            self.x = fallback.x;
        }
        if !self.y.is_finite() {
            tracing::warn!(y = self.y, "invalid y in definition; using 0");
            self.y = fallback.y;
        }
        if self.z.is_some_and(|z| !z.is_finite()) {
            tracing::warn!("invalid z in definition; using auto z");
            self.z = None;
        }
        if !(self.x_scale.is_finite() && self.x_scale > 0.0) {
            tracing::warn!(x_scale = self.x_scale, "invalid x scale in definition; using 1");
            self.x_scale = fallback.x_scale;
        }
        if !(self.y_scale.is_finite() && self.y_scale > 0.0) {
            tracing::warn!(y_scale = self.y_scale, "invalid y scale in definition; using 1");
            self.y_scale = fallback.y_scale;
        }
        if !(self.width.is_finite() && self.width >= 0.0) {
            tracing::warn!(width = self.width, "invalid width in definition; using 0");
            self.width = fallback.width;
        }
        if !(self.height.is_finite() && self.height >= 0.0) {
            tracing::warn!(height = self.height, "invalid height in definition; using 0");
            self.height = fallback.height;
        }
        if self.label.as_deref().is_some_and(str::is_empty) {
            self.label = None;
        }
        if self.group.as_deref().is_some_and(str::is_empty) {
            self.group = None;
        }
        self
    }
}

/// Callbacks the registry installs on entities it tracks.
pub(crate) struct RegistryHooks {
    pub(crate) on_z: Box<dyn FnMut(EntityId, f64)>,
    pub(crate) on_dispose: Box<dyn FnMut(EntityId)>,
}

/// A schedulable scene participant.
pub struct Entity {
    id: EntityId,
    kind: EntityKind,
    label: String,
    group: String,
    state: EntityState,
    width: f64,
    height: f64,
    cascade: ResolutionCascade,
    parent: Option<WeakEntityRef>,
    children: Vec<ChildLink>,
    animation: Option<Box<dyn AnimationInstance>>,
    physics: Option<Box<dyn PhysicsBinding>>,
    actions: ActionQueue,
    definition: Option<EntityDefinition>,
    explicit_z: bool,
    inited: bool,
    disposed: bool,
    tracked: bool,
    hooks: Option<RegistryHooks>,
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("label", &self.label)
            .field("group", &self.group)
            .field("state", &self.state)
            .field("size", &(self.width, self.height))
            .field("resolution_scale", &self.cascade.scale())
            .field("children", &self.children.len())
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl Entity {
    /// Creates a plain visual entity.
    #[must_use]
    pub fn new(definition: EntityDefinition) -> Self {
        Self::build(EntityKind::Visual, definition)
    }

    /// Creates a container that can adopt children.
    #[must_use]
    pub fn container(definition: EntityDefinition) -> Self {
        Self::build(EntityKind::Container, definition)
    }

    /// Loads an animation through `runtime` and wraps it in an entity.
    ///
    /// A zero width or height in `definition` is taken from the animation's
    /// content size.
    pub fn with_animation(
        definition: EntityDefinition,
        runtime: &mut dyn AnimationRuntime,
        source: &AnimationSource,
    ) -> Result<Self, SceneError> {
        let instance = runtime.load(source).map_err(|err| {
            tracing::warn!(src = %source.src, %err, "animation failed to load");
            err
        })?;
        Ok(Self::from_animation(definition, instance))
    }

    /// Wraps an already loaded animation instance.
    #[must_use]
    pub fn from_animation(
        definition: EntityDefinition,
        instance: Box<dyn AnimationInstance>,
    ) -> Self {
        let mut entity = Self::build(EntityKind::Animation, definition);
        let content = instance.content_size();
        if entity.width == 0.0 {
            entity.width = content.width;
        }
        if entity.height == 0.0 {
            entity.height = content.height;
        }
        entity.animation = Some(instance);
        entity
    }

    /// Attaches a physics capability.
    #[must_use]
    pub fn with_physics(mut self, binding: Box<dyn PhysicsBinding>) -> Self {
        self.physics = Some(binding);
        self
    }

    /// Moves the entity into a shared handle.
    #[must_use]
    pub fn into_ref(self) -> EntityRef {
        Rc::new(RefCell::new(self))
    }

    fn build(kind: EntityKind, definition: EntityDefinition) -> Self {
        let definition = definition.normalized();
        let mut state = EntityState::default();
        state.set(StateField::X, StateValue::Number(definition.x));
        state.set(StateField::Y, StateValue::Number(definition.y));
        state.set(StateField::Z, StateValue::Number(definition.z.unwrap_or(0.0)));
        state.set(StateField::XScale, StateValue::Number(definition.x_scale));
        state.set(StateField::YScale, StateValue::Number(definition.y_scale));
        state.set(StateField::Visible, StateValue::Flag(definition.visible));
        state.set(StateField::Render, StateValue::Flag(definition.render));

        Self {
            id: EntityId::next(),
            kind,
            label: definition
                .label
                .clone()
                .unwrap_or_else(|| kind.next_label()),
            group: definition
                .group
                .clone()
                .unwrap_or_else(|| DEFAULT_GROUP.into()),
            state,
            width: definition.width,
            height: definition.height,
            cascade: ResolutionCascade::new(),
            parent: None,
            children: Vec::new(),
            animation: None,
            physics: None,
            actions: ActionQueue::new(),
            explicit_z: definition.z.is_some(),
            definition: Some(definition),
            inited: false,
            disposed: false,
            tracked: false,
            hooks: None,
        }
    }

    /// Globally unique identifier.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Capability variant chosen at construction.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Group the entity belongs to (or will join by default).
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Positional state.
    #[must_use]
    pub fn state(&self) -> &EntityState {
        &self.state
    }

    /// The definition the entity was built from; `None` once disposed.
    #[must_use]
    pub fn definition(&self) -> Option<&EntityDefinition> {
        self.definition.as_ref()
    }

    /// Width in canvas units.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Height in canvas units.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Canvas-space rectangle before any resolution scale.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(
            Point::new(self.state.x(), self.state.y()),
            Size::new(self.width, self.height),
        )
    }

    /// The active resolution scale, `None` until one is applied.
    #[must_use]
    pub fn resolution_scale(&self) -> Option<f64> {
        self.cascade.scale()
    }

    /// Device-space value of a geometric field.
    ///
    /// Before any resolution scale is applied this is the base value.
    #[must_use]
    pub fn transformed(&self, field: GeometryField) -> f64 {
        if self.cascade.is_active() {
            self.cascade.transformed(field)
        } else {
            self.base_geometry().get(field)
        }
    }

    /// Device-space rectangle.
    #[must_use]
    pub fn transformed_rect(&self) -> Rect {
        if self.cascade.is_active() {
            self.cascade.transformed_rect()
        } else {
            self.bounds()
        }
    }

    /// Whether depth came from the definition or a later explicit write.
    #[must_use]
    pub fn has_explicit_z(&self) -> bool {
        self.explicit_z
    }

    /// Whether [`init_visuals`](Self::init_visuals) has run.
    #[must_use]
    pub fn is_inited(&self) -> bool {
        self.inited
    }

    /// Whether [`dispose`](Self::dispose) has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Whether a registry currently tracks the entity.
    #[must_use]
    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    /// The parent container, if attached and still alive.
    #[must_use]
    pub fn parent(&self) -> Option<EntityRef> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Children in attach order. Empty for non-containers.
    pub fn children(&self) -> impl Iterator<Item = &EntityRef> {
        self.children.iter().map(|link| &link.entity)
    }

    /// The physics capability, if any.
    #[must_use]
    pub fn physics(&self) -> Option<&dyn PhysicsBinding> {
        self.physics.as_deref()
    }

    /// Whether an animation instance is attached.
    #[must_use]
    pub fn has_animation(&self) -> bool {
        self.animation.is_some()
    }

    /// Binds a change listener to one field, replacing any previous one.
    pub fn bind(&mut self, field: StateField, listener: ChangeListener) {
        if self.disposed {
            tracing::warn!(entity = %self.id, ?field, "bind on disposed entity ignored");
            return;
        }
        self.state.bind(field, listener);
    }

    /// Removes the listener bound to `field`.
    pub fn unbind(&mut self, field: StateField) {
        self.state.unbind(field);
    }

    /// Sets the horizontal position.
    pub fn set_x(&mut self, x: f64) {
        self.write_geometry(StateField::X, GeometryField::X, x);
    }

    /// Sets the vertical position.
    pub fn set_y(&mut self, y: f64) {
        self.write_geometry(StateField::Y, GeometryField::Y, y);
    }

    /// Sets both coordinates.
    pub fn set_position(&mut self, position: Point) {
        self.set_x(position.x);
        self.set_y(position.y);
    }

    /// Sets the depth and asks the registry to re-sort.
    pub fn set_z(&mut self, z: f64) {
        if !self.state.set(StateField::Z, StateValue::Number(z)) {
            return;
        }
        self.explicit_z = true;
        if let Some(hooks) = &mut self.hooks {
            (hooks.on_z)(self.id, z);
        }
    }

    /// Sets the horizontal scale.
    pub fn set_x_scale(&mut self, x_scale: f64) {
        self.state.set(StateField::XScale, StateValue::Number(x_scale));
    }

    /// Sets the vertical scale.
    pub fn set_y_scale(&mut self, y_scale: f64) {
        self.state.set(StateField::YScale, StateValue::Number(y_scale));
    }

    /// Sets whether the entity is drawn.
    pub fn set_visible(&mut self, visible: bool) {
        self.state.set(StateField::Visible, StateValue::Flag(visible));
    }

    /// Sets whether the scheduler updates the entity.
    pub fn set_render(&mut self, render: bool) {
        self.state.set(StateField::Render, StateValue::Flag(render));
    }

    /// Sets the width.
    pub fn set_width(&mut self, width: f64) {
        if !(width.is_finite() && width >= 0.0) {
            tracing::warn!(entity = %self.id, width, "rejecting invalid width");
            return;
        }
        if self.width != width {
            self.width = width;
            self.cascade.refresh(GeometryField::Width, &self.base_geometry());
        }
    }

    /// Sets the height.
    pub fn set_height(&mut self, height: f64) {
        if !(height.is_finite() && height >= 0.0) {
            tracing::warn!(entity = %self.id, height, "rejecting invalid height");
            return;
        }
        if self.height != height {
            self.height = height;
            self.cascade.refresh(GeometryField::Height, &self.base_geometry());
        }
    }

    fn write_geometry(&mut self, field: StateField, geometry: GeometryField, value: f64) {
        if self.state.set(field, StateValue::Number(value)) {
            self.cascade.refresh(geometry, &self.base_geometry());
        }
    }

    fn base_geometry(&self) -> BaseGeometry {
        BaseGeometry {
            x: self.state.x(),
            y: self.state.y(),
            width: self.width,
            height: self.height,
        }
    }

    /// Applies a resolution scale through the cascade and pushes it to every
    /// child.
    ///
    /// Returns the number of this entity's transformed fields recomputed.
    pub fn apply_resolution_scale(&mut self, scale: f64, target: CascadeTarget) -> usize {
        let recomputed = self.cascade.apply(scale, target, &self.base_geometry());
        for link in &self.children {
            match link.entity.try_borrow_mut() {
                Ok(mut child) => {
                    child.apply_resolution_scale(scale, CascadeTarget::All);
                }
                Err(_) => tracing::warn!(parent = %self.id, "child busy; resolution scale skipped"),
            }
        }
        recomputed
    }

    /// One-time initialization when first added to a registry.
    ///
    /// Returns `false` if the entity was already initialized.
    pub fn init_visuals(&mut self) -> bool {
        if self.inited {
            return false;
        }
        self.inited = true;
        if let Some(physics) = &mut self.physics {
            let desc = BodyDesc {
                position: Point::new(self.state.x(), self.state.y()),
                size: Size::new(self.width, self.height),
                dynamic: true,
            };
            physics.init_physics(&desc);
        }
        tracing::debug!(entity = %self.id, label = %self.label, "initialized");
        true
    }

    /// Queues a state-machine command for a later frame.
    pub fn enqueue(&mut self, action: PendingAction) {
        if self.disposed {
            tracing::warn!(entity = %self.id, "enqueue on disposed entity ignored");
            return;
        }
        self.actions.enqueue(action);
    }

    /// Number of queued state-machine commands.
    #[must_use]
    pub fn pending_actions(&self) -> usize {
        self.actions.len()
    }

    /// Advances the entity by one scheduler tick.
    ///
    /// Drains at most one queued action, advances the animation, pulls the
    /// physics pose, re-derives container children and finally draws into the
    /// frame surface when visible.
    pub fn update(&mut self, ctx: &mut FrameContext<'_>) {
        if self.disposed {
            tracing::warn!(entity = %self.id, "update after dispose ignored");
            return;
        }

        if self.tracked {
            self.follow_parent();
        }

        self.actions.begin_frame();
        if let Some(outcome) = self.actions.process_next(self.animation.as_deref_mut()) {
            ctx.outcomes.push((self.id, outcome));
        }

        if let Some(animation) = &mut self.animation {
            animation.advance(ctx.dt);
        }

        let pose = self.physics.as_mut().and_then(|p| p.update_physics());
        if let Some(position) = pose {
            self.set_position(position);
        }

        if !self.children.is_empty() {
            self.update_children(ctx);
        }

        if self.state.visible() {
            ctx.surface.draw(&DrawItem {
                entity: self.id,
                rect: self.transformed_rect(),
                z: self.state.z(),
                scale: Vec2::new(self.state.x_scale(), self.state.y_scale()),
            });
        }
    }

    /// Routes a contact to the physics capability.
    pub fn on_collision(&mut self, collision: &Collision) {
        if self.disposed {
            return;
        }
        if let Some(physics) = &mut self.physics {
            physics.on_collision(collision);
        }
    }

    /// Releases everything the entity holds.
    ///
    /// Clears listeners, queued actions and the definition, disposes the
    /// physics body, detaches from the parent, disposes untracked children and
    /// tells the registry to stop tracking the entity. Calling it again does
    /// nothing and returns `false`.
    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        self.state.clear_listeners();
        self.actions.clear();
        self.definition = None;
        self.animation = None;
        if let Some(physics) = &mut self.physics {
            physics.dispose();
        }

        if let Some(parent) = self.parent.take().and_then(|p| p.upgrade()) {
            // The parent may be mid-update; it prunes disposed children itself.
            if let Ok(mut parent) = parent.try_borrow_mut() {
                parent.forget_child(self.id);
            }
        }
        for link in core::mem::take(&mut self.children) {
            let Ok(mut child) = link.entity.try_borrow_mut() else {
                continue;
            };
            child.parent = None;
            if !child.tracked {
                child.dispose();
            }
        }

        if let Some(mut hooks) = self.hooks.take() {
            (hooks.on_dispose)(self.id);
        }
        self.tracked = false;
        tracing::debug!(entity = %self.id, label = %self.label, "disposed");
        true
    }

    pub(crate) fn set_group(&mut self, group: &str) {
        if self.group != group {
            self.group = group.into();
        }
    }

    /// Writes a registry-assigned depth without marking it explicit or
    /// calling back into the registry.
    pub(crate) fn assign_auto_z(&mut self, z: f64) {
        self.state.set(StateField::Z, StateValue::Number(z));
    }

    pub(crate) fn attach_registry(&mut self, hooks: RegistryHooks) {
        self.hooks = Some(hooks);
        self.tracked = true;
    }

    pub(crate) fn detach_registry(&mut self) {
        self.hooks = None;
        self.tracked = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{InputKind, PhysicsEngine};
    use crate::physics::BodyBinding;
    use crate::testing::{
        FakeRuntime, RecordingPhysics, RecordingSurface, ScriptedAnimation, SharedAnimation,
        SurfaceCall, assert_close,
    };
    use crate::time::HostTime;
    use core::cell::Cell;

    fn frame<'a>(surface: &'a mut RecordingSurface) -> FrameContext<'a> {
        FrameContext::new(HostTime(16_000), 0.016, 1, false, surface)
    }

    #[test]
    fn definition_defaults_apply() {
        let entity = Entity::new(EntityDefinition::new());
        assert_eq!(entity.group(), DEFAULT_GROUP);
        assert_eq!(entity.state().x_scale(), 1.0);
        assert!(entity.state().visible());
        assert!(entity.state().render());
        assert!(!entity.has_explicit_z());
        assert!(entity.label().starts_with("visual-"));
    }

    #[test]
    fn invalid_definition_fields_fall_back() {
        let def = EntityDefinition::new()
            .at(f64::NAN, 4.0)
            .scale(0.0, -1.0)
            .size(-5.0, 10.0)
            .label("");
        let entity = Entity::new(def);
        assert_eq!(entity.state().x(), 0.0);
        assert_eq!(entity.state().y(), 4.0);
        assert_eq!(entity.state().x_scale(), 1.0);
        assert_eq!(entity.state().y_scale(), 1.0);
        assert_eq!(entity.width(), 0.0);
        assert_eq!(entity.height(), 10.0);
        assert!(!entity.label().is_empty());
    }

    #[test]
    fn listener_fires_before_cascade_and_only_on_change() {
        let mut entity = Entity::new(EntityDefinition::new().size(100.0, 50.0));
        entity.apply_resolution_scale(2.0, CascadeTarget::All);
        let seen = Rc::new(Cell::new(0));
        let counter = seen.clone();
        entity.bind(
            StateField::X,
            Box::new(move |_, _| counter.set(counter.get() + 1)),
        );

        entity.set_x(10.0);
        entity.set_x(10.0);
        assert_eq!(seen.get(), 1);
        assert_eq!(entity.transformed(GeometryField::X), 20.0);
        assert_eq!(entity.transformed(GeometryField::Width), 200.0);
    }

    #[test]
    fn transformed_equals_base_without_scale() {
        let entity = Entity::new(EntityDefinition::new().at(3.0, 4.0).size(5.0, 6.0));
        assert_eq!(entity.resolution_scale(), None);
        assert_eq!(entity.transformed_rect(), Rect::new(3.0, 4.0, 8.0, 10.0));
    }

    #[test]
    fn resize_then_write_only_refreshes_one_field() {
        let mut entity = Entity::new(EntityDefinition::new().size(10.0, 10.0));
        entity.apply_resolution_scale(0.5, CascadeTarget::All);
        entity.set_height(40.0);
        assert_close(entity.transformed(GeometryField::Height), 20.0);
        assert_close(entity.transformed(GeometryField::Width), 5.0);
    }

    #[test]
    fn update_drains_one_action_and_draws() {
        let anim = Rc::new(RefCell::new(ScriptedAnimation::with_inputs(&[(
            "go",
            InputKind::Trigger,
        )])));
        let mut entity = Entity::from_animation(
            EntityDefinition::new(),
            Box::new(SharedAnimation { inner: anim.clone() }),
        );
        assert_eq!(entity.width(), 100.0, "size taken from content");
        entity.enqueue(PendingAction::trigger("go"));
        entity.enqueue(PendingAction::trigger("go"));

        let mut surface = RecordingSurface::default();
        let mut ctx = frame(&mut surface);
        entity.update(&mut ctx);
        assert_eq!(ctx.outcomes.len(), 1);
        drop(ctx);

        assert_eq!(anim.borrow().log.len(), 1);
        assert_eq!(anim.borrow().advanced, [0.016]);
        assert_eq!(entity.pending_actions(), 1);
        assert_eq!(
            surface.calls.borrow().as_slice(),
            [SurfaceCall::Draw(entity.id())]
        );
    }

    #[test]
    fn hidden_entity_updates_without_drawing() {
        let mut entity = Entity::new(EntityDefinition::new().hidden());
        let mut surface = RecordingSurface::default();
        entity.update(&mut frame(&mut surface));
        assert!(surface.calls.borrow().is_empty());
    }

    #[test]
    fn load_failure_is_returned() {
        let mut runtime = FakeRuntime::default();
        let source = AnimationSource {
            src: "missing.riv".into(),
            artboard: None,
            state_machine: None,
        };
        let err = Entity::with_animation(EntityDefinition::new(), &mut runtime, &source)
            .unwrap_err();
        assert!(matches!(err, SceneError::Load(_)));

        let ok = AnimationSource {
            src: "hero.riv".into(),
            ..source
        };
        let entity =
            Entity::with_animation(EntityDefinition::new(), &mut runtime, &ok).expect("loads");
        assert_eq!(entity.kind(), EntityKind::Animation);
        assert_eq!(runtime.loaded, ["hero.riv"]);
    }

    #[test]
    fn physics_pose_drives_position() {
        let engine = Rc::new(RefCell::new(RecordingPhysics {
            velocity: (100.0, 0.0),
            ..RecordingPhysics::default()
        }));
        let mut entity = Entity::new(EntityDefinition::new().at(1.0, 2.0))
            .with_physics(Box::new(BodyBinding::dynamic(engine.clone())));
        assert!(entity.init_visuals());
        assert!(!entity.init_visuals());
        engine.borrow_mut().step(0.5);

        let mut surface = RecordingSurface::default();
        entity.update(&mut frame(&mut surface));
        assert_eq!(entity.state().x(), 51.0);
        assert_eq!(entity.state().y(), 2.0);
    }

    #[test]
    fn dispose_is_idempotent_and_fires_hook_once() {
        let disposed = Rc::new(Cell::new(0));
        let counter = disposed.clone();
        let mut entity = Entity::new(EntityDefinition::new());
        entity.attach_registry(RegistryHooks {
            on_z: Box::new(|_, _| {}),
            on_dispose: Box::new(move |_| counter.set(counter.get() + 1)),
        });
        entity.enqueue(PendingAction::trigger("go"));
        entity.bind(StateField::Y, Box::new(|_, _| {}));

        assert!(entity.dispose());
        assert!(!entity.dispose());
        assert_eq!(disposed.get(), 1);
        assert_eq!(entity.pending_actions(), 0);
        assert!(entity.definition().is_none());
        assert!(!entity.state().is_bound(StateField::Y));
        assert!(!entity.is_tracked());
    }

    #[test]
    fn update_after_dispose_is_noop() {
        let mut entity = Entity::new(EntityDefinition::new());
        entity.dispose();
        let mut surface = RecordingSurface::default();
        entity.update(&mut frame(&mut surface));
        assert!(surface.calls.borrow().is_empty());
    }

    #[test]
    fn set_z_marks_explicit_and_notifies() {
        let seen = Rc::new(Cell::new(0.0));
        let sink = seen.clone();
        let mut entity = Entity::new(EntityDefinition::new());
        entity.attach_registry(RegistryHooks {
            on_z: Box::new(move |_, z| sink.set(z)),
            on_dispose: Box::new(|_| {}),
        });
        entity.assign_auto_z(3.0);
        assert!(!entity.has_explicit_z());
        assert_eq!(seen.get(), 0.0, "auto z does not call back");
        entity.set_z(7.0);
        assert!(entity.has_explicit_z());
        assert_eq!(seen.get(), 7.0);
    }
}
