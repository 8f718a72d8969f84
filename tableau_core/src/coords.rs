// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer mapping between window, canvas and content space.
//!
//! - **Window space**: viewport coordinates in CSS pixels, as reported by
//!   pointer events.
//! - **Canvas space**: relative to the canvas's top-left corner, in the
//!   device-scaled units entities are drawn in.
//! - **Content space**: the entity's own coordinate space, `0..width` by
//!   `0..height`, independent of any scale.
//!
//! The forward (model → screen) transform applies the entity's local scale
//! first and the global resolution scale last, so the mapping back divides
//! them out in the reverse order.
//!
//! Points that fall outside the content box are clamped one unit inside it
//! (to `1` or `dimension - 1`) unless [`Clamp::Bypass`] is requested.

use kurbo::{Point, Rect, Vec2};

use crate::backend::HostContainer;
use crate::entity::Entity;

/// What to do with points outside the content box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Clamp {
    /// Clamp one unit inside the box.
    #[default]
    Inset,
    /// Return the raw coordinate, for hit tests that need to see misses.
    Bypass,
}

/// The geometry a pointer is mapped against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MappingTarget {
    /// Canvas-space rectangle before any scale.
    pub bounds: Rect,
    /// The entity's local scale.
    pub scale: Vec2,
    /// Global resolution scale, `1.0` when none is active.
    pub resolution_scale: f64,
}

impl MappingTarget {
    /// Captures the mapping geometry of an entity.
    #[must_use]
    pub fn of(entity: &Entity) -> Self {
        let state = entity.state();
        Self {
            bounds: entity.bounds(),
            scale: Vec2::new(state.x_scale(), state.y_scale()),
            resolution_scale: entity.resolution_scale().unwrap_or(1.0),
        }
    }
}

/// Maps a canvas-space point into the target's content space.
#[must_use]
pub fn canvas_to_content(point: Point, target: &MappingTarget, clamp: Clamp) -> Point {
    let res = nonzero(target.resolution_scale);
    let origin = Point::new(target.bounds.x0 * res, target.bounds.y0 * res);
    let local = point - origin;
    // Local scale first, then resolution scale.
    let x = local.x / nonzero(target.scale.x) / res;
    let y = local.y / nonzero(target.scale.y) / res;
    match clamp {
        Clamp::Inset => Point::new(
            inset(x, target.bounds.width()),
            inset(y, target.bounds.height()),
        ),
        Clamp::Bypass => Point::new(x, y),
    }
}

/// Maps a content-space point back to canvas space.
#[must_use]
pub fn content_to_canvas(point: Point, target: &MappingTarget) -> Point {
    let res = nonzero(target.resolution_scale);
    Point::new(
        (point.x * target.scale.x + target.bounds.x0) * res,
        (point.y * target.scale.y + target.bounds.y0) * res,
    )
}

/// Maps a window-space point into the target's content space.
///
/// Window coordinates and the canvas origin are CSS pixels; the offset is
/// scaled by the host's device pixel ratio to reach canvas space.
pub fn window_to_content(
    point: Point,
    canvas: &mut CanvasOffset,
    host: &dyn HostContainer,
    target: &MappingTarget,
    clamp: Clamp,
) -> Point {
    let origin = canvas.origin(host);
    let dpr = nonzero(host.device_pixel_ratio());
    let local = (point - origin) * dpr;
    canvas_to_content(local.to_point(), target, clamp)
}

fn inset(v: f64, dimension: f64) -> f64 {
    if v < 0.0 {
        1.0
    } else if v > dimension {
        dimension - 1.0
    } else {
        v
    }
}

fn nonzero(scale: f64) -> f64 {
    if scale == 0.0 || !scale.is_finite() {
        1.0
    } else {
        scale
    }
}

/// Cached canvas origin in window space.
///
/// Querying the host's bounding box can force layout, so the origin is read
/// once and reused until [`invalidate`](Self::invalidate) is called on scroll
/// or resize.
#[derive(Clone, Copy, Debug, Default)]
pub struct CanvasOffset {
    cached: Option<Point>,
}

impl CanvasOffset {
    /// Creates an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self { cached: None }
    }

    /// The canvas origin, queried from `host` if not cached.
    pub fn origin(&mut self, host: &dyn HostContainer) -> Point {
        *self.cached.get_or_insert_with(|| host.canvas_origin())
    }

    /// Drops the cached origin.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Whether an origin is cached.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{CascadeTarget, EntityDefinition};
    use alloc::vec::Vec;
    use crate::testing::{FixedHost, assert_close};

    fn target() -> MappingTarget {
        MappingTarget {
            bounds: Rect::new(100.0, 50.0, 300.0, 150.0),
            scale: Vec2::new(2.0, 0.5),
            resolution_scale: 1.5,
        }
    }

    #[test]
    fn interior_points_round_trip() {
        let t = target();
        for p in [Point::new(10.0, 20.0), Point::new(150.5, 99.0), Point::new(1.25, 3.75)] {
            let canvas = content_to_canvas(p, &t);
            let back = canvas_to_content(canvas, &t, Clamp::Inset);
            assert_close(back.x, p.x);
            assert_close(back.y, p.y);
        }
    }

    #[test]
    fn outside_points_are_inset_clamped() {
        let t = target();
        let left_above = content_to_canvas(Point::new(-5.0, -5.0), &t);
        assert_eq!(
            canvas_to_content(left_above, &t, Clamp::Inset),
            Point::new(1.0, 1.0)
        );
        let right_below = content_to_canvas(Point::new(500.0, 500.0), &t);
        assert_eq!(
            canvas_to_content(right_below, &t, Clamp::Inset),
            Point::new(199.0, 99.0)
        );
    }

    #[test]
    fn bypass_returns_raw_coordinates() {
        let t = target();
        let p = content_to_canvas(Point::new(-5.0, 250.0), &t);
        let raw = canvas_to_content(p, &t, Clamp::Bypass);
        assert_close(raw.x, -5.0);
        assert_close(raw.y, 250.0);
    }

    #[test]
    fn window_mapping_subtracts_cached_origin() {
        let host = FixedHost::new(800.0, 600.0, 1.0);
        host.origin.set(Point::new(40.0, 30.0));
        let mut offset = CanvasOffset::new();
        let t = MappingTarget {
            bounds: Rect::new(0.0, 0.0, 100.0, 100.0),
            scale: Vec2::new(1.0, 1.0),
            resolution_scale: 1.0,
        };
        let p = window_to_content(Point::new(50.0, 50.0), &mut offset, &host, &t, Clamp::Inset);
        assert_eq!(p, Point::new(10.0, 20.0));

        // Stale until invalidated.
        host.origin.set(Point::new(0.0, 0.0));
        let stale = window_to_content(Point::new(50.0, 50.0), &mut offset, &host, &t, Clamp::Inset);
        assert_eq!(stale, p);
        offset.invalidate();
        assert!(!offset.is_cached());
        let fresh = window_to_content(Point::new(50.0, 50.0), &mut offset, &host, &t, Clamp::Inset);
        assert_eq!(fresh, Point::new(50.0, 50.0));
    }

    #[test]
    fn window_mapping_is_independent_of_pixel_ratio() {
        // Same CSS layout: an 800x500 scene fitted at 0.5, so the resolution
        // scale is 0.5 at dpr 1 and 1.0 at dpr 2.
        let mut mapped = Vec::new();
        for dpr in [1.0, 2.0] {
            let host = FixedHost::new(400.0, 250.0, dpr);
            let t = MappingTarget {
                bounds: Rect::new(100.0, 100.0, 150.0, 150.0),
                scale: Vec2::new(1.0, 1.0),
                resolution_scale: 0.5 * dpr,
            };
            let mut offset = CanvasOffset::new();
            mapped.push(window_to_content(
                Point::new(60.0, 60.0),
                &mut offset,
                &host,
                &t,
                Clamp::Bypass,
            ));
        }
        assert_eq!(mapped, [Point::new(20.0, 20.0), Point::new(20.0, 20.0)]);
    }

    #[test]
    fn target_reads_entity_geometry() {
        let mut entity = Entity::new(
            EntityDefinition::new()
                .at(10.0, 20.0)
                .size(30.0, 40.0)
                .scale(2.0, 2.0),
        );
        assert_eq!(MappingTarget::of(&entity).resolution_scale, 1.0);
        entity.apply_resolution_scale(0.5, CascadeTarget::All);
        let t = MappingTarget::of(&entity);
        assert_eq!(t.bounds, Rect::new(10.0, 20.0, 40.0, 60.0));
        assert_eq!(t.scale, Vec2::new(2.0, 2.0));
        assert_eq!(t.resolution_scale, 0.5);
    }
}
