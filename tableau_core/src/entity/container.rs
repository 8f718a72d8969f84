// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parent/child links for container entities.
//!
//! A child's transform is stored relative to its container at the moment it
//! was attached. Each tick the container re-derives the absolute transform:
//!
//! ```text
//! child.x       = container.x + relative.x * container.x_scale
//! child.x_scale = relative.x_scale * container.x_scale
//! ```
//!
//! and the same for `y`. Re-parenting recomputes the relative record from the
//! child's current absolute values against the new parent.

use alloc::rc::Rc;

use kurbo::{Point, Vec2};

use super::{CascadeTarget, Entity, EntityId, EntityKind, EntityRef};
use crate::error::SceneError;
use crate::scheduler::FrameContext;

/// A child's transform relative to its container.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RelativeTransform {
    /// Horizontal offset in container units.
    pub x: f64,
    /// Vertical offset in container units.
    pub y: f64,
    /// Horizontal scale relative to the container.
    pub x_scale: f64,
    /// Vertical scale relative to the container.
    pub y_scale: f64,
}

impl RelativeTransform {
    fn between(parent: &Entity, child: &Entity) -> Self {
        let p = parent.state();
        let c = child.state();
        Self {
            x: (c.x() - p.x()) / nonzero(p.x_scale()),
            y: (c.y() - p.y()) / nonzero(p.y_scale()),
            x_scale: c.x_scale() / nonzero(p.x_scale()),
            y_scale: c.y_scale() / nonzero(p.y_scale()),
        }
    }

    /// Writes the absolute transform under a container at `origin` with `scale`.
    fn place(self, child: &mut Entity, origin: Point, scale: Vec2) {
        child.set_x(origin.x + self.x * scale.x);
        child.set_y(origin.y + self.y * scale.y);
        child.set_x_scale(self.x_scale * scale.x);
        child.set_y_scale(self.y_scale * scale.y);
    }
}

fn nonzero(scale: f64) -> f64 {
    if scale == 0.0 { 1.0 } else { scale }
}

pub(crate) struct ChildLink {
    pub(crate) id: EntityId,
    pub(crate) entity: EntityRef,
    pub(crate) relative: RelativeTransform,
}

/// Makes `child` a child of `parent`.
///
/// Detaches `child` from any previous parent first. Rejects non-container
/// parents, self-adoption and links that would form a cycle; rejections are
/// logged and leave both entities untouched.
pub fn attach_child(parent: &EntityRef, child: &EntityRef) -> Result<(), SceneError> {
    let (parent_id, kind, parent_disposed) = {
        let p = parent.borrow();
        (p.id(), p.kind(), p.is_disposed())
    };
    let (child_id, child_disposed) = {
        let c = child.borrow();
        (c.id(), c.is_disposed())
    };

    if parent_disposed || child_disposed {
        let id = if parent_disposed { parent_id } else { child_id };
        tracing::warn!(entity = %id, "cannot link disposed entity");
        return Err(SceneError::Disposed(id));
    }
    if kind != EntityKind::Container {
        tracing::warn!(entity = %parent_id, "attach to non-container ignored");
        return Err(SceneError::NotAContainer(parent_id));
    }
    let cycle = Rc::ptr_eq(parent, child) || is_ancestor(child, parent);
    if cycle {
        tracing::warn!(parent = %parent_id, child = %child_id, "attach would form a cycle");
        return Err(SceneError::InvalidParent {
            parent: parent_id,
            child: child_id,
        });
    }

    detach_child(child);

    let relative = RelativeTransform::between(&parent.borrow(), &child.borrow());
    let scale = parent.borrow().resolution_scale();
    {
        let mut c = child.borrow_mut();
        c.parent = Some(Rc::downgrade(parent));
        if let Some(scale) = scale {
            c.apply_resolution_scale(scale, CascadeTarget::All);
        }
    }
    parent.borrow_mut().children.push(ChildLink {
        id: child_id,
        entity: Rc::clone(child),
        relative,
    });
    tracing::debug!(parent = %parent_id, child = %child_id, "child attached");
    Ok(())
}

/// Detaches `child` from its parent. Returns `false` if it had none.
pub fn detach_child(child: &EntityRef) -> bool {
    let Some(parent) = child.borrow_mut().parent.take() else {
        return false;
    };
    let Some(parent) = parent.upgrade() else {
        return false;
    };
    let id = child.borrow().id();
    parent.borrow_mut().forget_child(id);
    true
}

/// Whether `candidate` is `of` or one of its ancestors.
fn is_ancestor(candidate: &EntityRef, of: &EntityRef) -> bool {
    let mut cursor = of.borrow().parent();
    while let Some(node) = cursor {
        if Rc::ptr_eq(&node, candidate) {
            return true;
        }
        cursor = node.borrow().parent();
    }
    false
}

impl Entity {
    /// The relative transform recorded for a child, by id.
    #[must_use]
    pub fn relative_transform(&self, child: EntityId) -> Option<RelativeTransform> {
        self.children
            .iter()
            .find(|link| link.id == child)
            .map(|link| link.relative)
    }

    /// Re-derives a registry-tracked child's transform from its container's
    /// current one. The registry may visit the child first. No-op while the
    /// container is borrowed.
    pub(super) fn follow_parent(&mut self) {
        let Some(parent) = self.parent() else {
            return;
        };
        let Ok(parent) = parent.try_borrow() else {
            return;
        };
        let Some(rel) = parent.relative_transform(self.id) else {
            return;
        };
        let (origin, scale) = parent.anchor();
        drop(parent);
        rel.place(self, origin, scale);
    }

    fn anchor(&self) -> (Point, Vec2) {
        let state = self.state();
        (
            Point::new(state.x(), state.y()),
            Vec2::new(state.x_scale(), state.y_scale()),
        )
    }

    pub(super) fn forget_child(&mut self, id: EntityId) {
        self.children.retain(|link| link.id != id);
    }

    /// Re-derives every child's absolute transform, pushes the resolution
    /// scale down, and updates children the registry does not visit itself.
    pub(super) fn update_children(&mut self, ctx: &mut FrameContext<'_>) {
        self.children
            .retain(|link| link.entity.try_borrow().map_or(true, |c| !c.is_disposed()));

        let (origin, anchor_scale) = self.anchor();
        let scale = self.resolution_scale();

        for link in &self.children {
            let Ok(mut child) = link.entity.try_borrow_mut() else {
                tracing::warn!(parent = %self.id, "child busy; skipped this frame");
                continue;
            };
            link.relative.place(&mut child, origin, anchor_scale);
            if let Some(scale) = scale
                && child.resolution_scale() != Some(scale)
            {
                child.apply_resolution_scale(scale, CascadeTarget::All);
            }
            if !child.is_tracked() && child.state().render() {
                child.update(ctx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityDefinition, GeometryField};
    use crate::testing::{RecordingSurface, SurfaceCall};
    use crate::time::HostTime;

    fn container(x: f64, y: f64, scale: f64) -> EntityRef {
        Entity::container(EntityDefinition::new().at(x, y).scale(scale, scale)).into_ref()
    }

    fn tick(entity: &EntityRef, surface: &mut RecordingSurface) {
        let mut ctx = FrameContext::new(HostTime(0), 0.016, 1, false, surface);
        entity.borrow_mut().update(&mut ctx);
    }

    #[test]
    fn child_follows_container() {
        let parent = container(100.0, 100.0, 2.0);
        let child = Entity::new(EntityDefinition::new().at(110.0, 120.0)).into_ref();
        attach_child(&parent, &child).expect("attach");
        assert_eq!(
            parent.borrow().relative_transform(child.borrow().id()),
            Some(RelativeTransform {
                x: 5.0,
                y: 10.0,
                x_scale: 0.5,
                y_scale: 0.5,
            })
        );

        parent.borrow_mut().set_position(kurbo::Point::new(0.0, 0.0));
        let mut surface = RecordingSurface::default();
        tick(&parent, &mut surface);

        let c = child.borrow();
        assert_eq!(c.state().x(), 10.0);
        assert_eq!(c.state().y(), 20.0);
        assert_eq!(c.state().x_scale(), 1.0);
        // Untracked children are updated and drawn by the container.
        assert!(surface.calls.borrow().contains(&SurfaceCall::Draw(c.id())));
    }

    #[test]
    fn tracked_children_are_not_double_updated() {
        let parent = container(0.0, 0.0, 1.0);
        let child = Entity::new(EntityDefinition::new()).into_ref();
        attach_child(&parent, &child).expect("attach");
        child.borrow_mut().tracked = true;

        let mut surface = RecordingSurface::default();
        tick(&parent, &mut surface);
        let draws = surface
            .calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, SurfaceCall::Draw(_)))
            .count();
        assert_eq!(draws, 1, "only the container draws");
    }

    #[test]
    fn reparent_uses_new_parent_current_transform() {
        let a = container(0.0, 0.0, 1.0);
        let b = container(50.0, 50.0, 1.0);
        let child = Entity::new(EntityDefinition::new().at(60.0, 70.0)).into_ref();
        attach_child(&a, &child).expect("attach a");
        b.borrow_mut().set_x(40.0);
        attach_child(&b, &child).expect("attach b");

        assert_eq!(a.borrow().children().count(), 0);
        let rel = b
            .borrow()
            .relative_transform(child.borrow().id())
            .expect("linked");
        assert_eq!((rel.x, rel.y), (20.0, 20.0));
        assert!(Rc::ptr_eq(&child.borrow().parent().expect("parent"), &b));
    }

    #[test]
    fn cycles_and_self_links_are_rejected() {
        let a = container(0.0, 0.0, 1.0);
        let b = container(0.0, 0.0, 1.0);
        attach_child(&a, &b).expect("attach");
        assert!(matches!(
            attach_child(&b, &a),
            Err(SceneError::InvalidParent { .. })
        ));
        assert!(matches!(
            attach_child(&a, &a),
            Err(SceneError::InvalidParent { .. })
        ));
        assert!(b.borrow().parent().is_some());
    }

    #[test]
    fn non_container_cannot_adopt() {
        let plain = Entity::new(EntityDefinition::new()).into_ref();
        let child = Entity::new(EntityDefinition::new()).into_ref();
        assert!(matches!(
            attach_child(&plain, &child),
            Err(SceneError::NotAContainer(_))
        ));
    }

    #[test]
    fn resolution_scale_propagates_to_children() {
        let parent = container(0.0, 0.0, 1.0);
        let child = Entity::new(EntityDefinition::new().at(10.0, 10.0).size(4.0, 4.0)).into_ref();
        attach_child(&parent, &child).expect("attach");
        parent
            .borrow_mut()
            .apply_resolution_scale(3.0, CascadeTarget::All);
        assert_eq!(child.borrow().transformed(GeometryField::Width), 12.0);
    }

    #[test]
    fn disposing_container_disposes_untracked_children() {
        let parent = container(0.0, 0.0, 1.0);
        let child = Entity::new(EntityDefinition::new()).into_ref();
        attach_child(&parent, &child).expect("attach");
        parent.borrow_mut().dispose();
        assert!(child.borrow().is_disposed());
        assert!(child.borrow().parent().is_none());
    }

    #[test]
    fn disposing_child_unlinks_it() {
        let parent = container(0.0, 0.0, 1.0);
        let child = Entity::new(EntityDefinition::new()).into_ref();
        attach_child(&parent, &child).expect("attach");
        child.borrow_mut().dispose();
        assert_eq!(parent.borrow().children().count(), 0);
        assert!(!detach_child(&child));
    }
}
