// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resolution-scale cascade.
//!
//! An entity's base geometry (`x`, `y`, `width`, `height`) lives in
//! resolution-independent canvas units. The cascade keeps a *transformed*
//! copy of each field in device space, `transformed = base * scale`, where
//! `scale` is the global resolution scale pushed by the resize controller or
//! a parent container.
//!
//! Recomputation is incremental. A single-field write only refreshes that
//! field, and only when its base value differs from the value last used for
//! it. A scale change (including the first scale ever applied) refreshes
//! all four fields.

use kurbo::Rect;

/// A geometric field tracked by the cascade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeometryField {
    /// Horizontal position.
    X,
    /// Vertical position.
    Y,
    /// Width.
    Width,
    /// Height.
    Height,
}

impl GeometryField {
    /// All fields, in storage order.
    pub const ALL: [Self; 4] = [Self::X, Self::Y, Self::Width, Self::Height];

    const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Width => 2,
            Self::Height => 3,
        }
    }
}

/// Which transformed fields a cascade pass should consider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CascadeTarget {
    /// Recompute every field unconditionally.
    All,
    /// Recompute one field if its base value moved since it was last applied.
    Field(GeometryField),
}

/// Base geometry values in canvas units, indexed like [`GeometryField::ALL`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BaseGeometry {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl BaseGeometry {
    /// Value of one field.
    #[must_use]
    pub fn get(&self, field: GeometryField) -> f64 {
        match field {
            GeometryField::X => self.x,
            GeometryField::Y => self.y,
            GeometryField::Width => self.width,
            GeometryField::Height => self.height,
        }
    }
}

/// Device-space mirror of an entity's base geometry.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ResolutionCascade {
    scale: Option<f64>,
    transformed: [f64; 4],
    last_applied: [Option<f64>; 4],
}

impl ResolutionCascade {
    /// Creates a cascade with no scale applied.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            scale: None,
            transformed: [0.0; 4],
            last_applied: [None; 4],
        }
    }

    /// The active resolution scale, or `None` before the first application.
    #[must_use]
    pub const fn scale(&self) -> Option<f64> {
        self.scale
    }

    /// Returns whether a scale has been applied.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.scale.is_some()
    }

    /// Applies `scale` to `base`, recomputing the fields selected by
    /// `target`.
    ///
    /// A scale that differs from the active one (or the first scale ever
    /// applied) widens the pass to [`CascadeTarget::All`]. Returns the number
    /// of fields recomputed.
    pub fn apply(&mut self, scale: f64, target: CascadeTarget, base: &BaseGeometry) -> usize {
        if !scale.is_finite() {
            tracing::warn!(scale, "ignoring non-finite resolution scale");
            return 0;
        }
        let mut target = target;
        if self.scale != Some(scale) {
            target = CascadeTarget::All;
            self.scale = Some(scale);
        }

        let mut recomputed = 0;
        for field in GeometryField::ALL {
            let i = field.index();
            let current = base.get(field);
            let selected = match target {
                CascadeTarget::All => true,
                CascadeTarget::Field(f) => f == field && self.last_applied[i] != Some(current),
            };
            if selected {
                self.transformed[i] = current * scale;
                self.last_applied[i] = Some(current);
                recomputed += 1;
            }
        }
        recomputed
    }

    /// Re-applies the active scale to one field after a base write.
    ///
    /// Does nothing while no scale is active.
    pub fn refresh(&mut self, field: GeometryField, base: &BaseGeometry) -> usize {
        match self.scale {
            Some(scale) => self.apply(scale, CascadeTarget::Field(field), base),
            None => 0,
        }
    }

    /// Device-space value of `field`.
    #[must_use]
    pub fn transformed(&self, field: GeometryField) -> f64 {
        self.transformed[field.index()]
    }

    /// Device-space rectangle built from the transformed fields.
    #[must_use]
    pub fn transformed_rect(&self) -> Rect {
        let [x, y, w, h] = self.transformed;
        Rect::new(x, y, x + w, y + h)
    }
}
