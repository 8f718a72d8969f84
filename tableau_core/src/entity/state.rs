// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-entity positional state with change notification.
//!
//! Every write goes through [`EntityState::set`], which compares the old and
//! new value and, only when they differ, stores the new value and invokes the
//! listener bound to that field with `(old, new)`. Writes of equal values are
//! suppressed entirely.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use core::fmt;

/// A field of [`EntityState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StateField {
    /// Horizontal position.
    X,
    /// Vertical position.
    Y,
    /// Depth.
    Z,
    /// Horizontal scale.
    XScale,
    /// Vertical scale.
    YScale,
    /// Whether the entity is drawn.
    Visible,
    /// Whether the scheduler updates the entity.
    Render,
}

impl StateField {
    /// Returns `true` for boolean fields.
    #[must_use]
    pub const fn is_flag(self) -> bool {
        matches!(self, Self::Visible | Self::Render)
    }
}

/// A value carried by a [`StateField`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StateValue {
    /// Value of a numeric field.
    Number(f64),
    /// Value of a boolean field.
    Flag(bool),
}

impl StateValue {
    /// Returns the numeric payload, if any.
    #[must_use]
    pub const fn as_number(self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(v),
            Self::Flag(_) => None,
        }
    }

    /// Returns the boolean payload, if any.
    #[must_use]
    pub const fn as_flag(self) -> Option<bool> {
        match self {
            Self::Flag(v) => Some(v),
            Self::Number(_) => None,
        }
    }
}

/// Callback invoked with `(old, new)` when a field changes.
pub type ChangeListener = Box<dyn FnMut(StateValue, StateValue)>;

/// Canonical position, depth, scale, and visibility of one entity.
pub struct EntityState {
    x: f64,
    y: f64,
    z: f64,
    x_scale: f64,
    y_scale: f64,
    visible: bool,
    render: bool,
    listeners: BTreeMap<StateField, ChangeListener>,
}

impl fmt::Debug for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityState")
            .field("x", &self.x)
            .field("y", &self.y)
            .field("z", &self.z)
            .field("x_scale", &self.x_scale)
            .field("y_scale", &self.y_scale)
            .field("visible", &self.visible)
            .field("render", &self.render)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for EntityState {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            x_scale: 1.0,
            y_scale: 1.0,
            visible: true,
            render: true,
            listeners: BTreeMap::new(),
        }
    }
}

impl EntityState {
    /// Returns the current value of a field.
    #[must_use]
    pub fn get(&self, field: StateField) -> StateValue {
        match field {
            StateField::X => StateValue::Number(self.x),
            StateField::Y => StateValue::Number(self.y),
            StateField::Z => StateValue::Number(self.z),
            StateField::XScale => StateValue::Number(self.x_scale),
            StateField::YScale => StateValue::Number(self.y_scale),
            StateField::Visible => StateValue::Flag(self.visible),
            StateField::Render => StateValue::Flag(self.render),
        }
    }

    /// Writes a field, firing its listener if the value changed.
    ///
    /// Returns `true` if the value changed. Non-finite numbers and values of
    /// the wrong kind are rejected with a warning and leave the state
    /// untouched.
    pub fn set(&mut self, field: StateField, value: StateValue) -> bool {
        let old = self.get(field);
        let accepted = match (field.is_flag(), value) {
            (false, StateValue::Number(v)) if v.is_finite() => true,
            (true, StateValue::Flag(_)) => true,
            _ => false,
        };
        if !accepted {
            tracing::warn!(?field, ?value, "rejected state write");
            return false;
        }
        if old == value {
            return false;
        }

        match (field, value) {
            (StateField::X, StateValue::Number(v)) => self.x = v,
            (StateField::Y, StateValue::Number(v)) => self.y = v,
            (StateField::Z, StateValue::Number(v)) => self.z = v,
            (StateField::XScale, StateValue::Number(v)) => self.x_scale = v,
            (StateField::YScale, StateValue::Number(v)) => self.y_scale = v,
            (StateField::Visible, StateValue::Flag(v)) => self.visible = v,
            (StateField::Render, StateValue::Flag(v)) => self.render = v,
            _ => return false,
        }

        if let Some(listener) = self.listeners.get_mut(&field) {
            listener(old, value);
        }
        true
    }

    /// Binds the listener for `field`, returning the one it replaces.
    pub fn bind(&mut self, field: StateField, listener: ChangeListener) -> Option<ChangeListener> {
        self.listeners.insert(field, listener)
    }

    /// Removes the listener for `field`.
    pub fn unbind(&mut self, field: StateField) -> Option<ChangeListener> {
        self.listeners.remove(&field)
    }

    /// Removes every listener.
    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    /// Returns whether a listener is bound to `field`.
    #[must_use]
    pub fn is_bound(&self, field: StateField) -> bool {
        self.listeners.contains_key(&field)
    }

    /// Horizontal position.
    #[must_use]
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Vertical position.
    #[must_use]
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Depth.
    #[must_use]
    pub fn z(&self) -> f64 {
        self.z
    }

    /// Horizontal scale.
    #[must_use]
    pub fn x_scale(&self) -> f64 {
        self.x_scale
    }

    /// Vertical scale.
    #[must_use]
    pub fn y_scale(&self) -> f64 {
        self.y_scale
    }

    /// Whether the entity is drawn.
    #[must_use]
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Whether the scheduler updates the entity.
    #[must_use]
    pub fn render(&self) -> bool {
        self.render
    }
}
