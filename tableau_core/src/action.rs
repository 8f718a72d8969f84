// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-entity serialization of state-machine mutations.
//!
//! The external state machine only evaluates transitions correctly when it
//! sees one input change per advance. [`ActionQueue`] therefore holds pending
//! commands in FIFO order and releases at most one per frame:
//!
//! 1. [`begin_frame`](ActionQueue::begin_frame) clears the
//!    "processed this frame" flag at the start of the entity's update.
//! 2. [`process_next`](ActionQueue::process_next) dequeues and applies one
//!    command and sets the flag, so later calls in the same frame do nothing.
//!
//! A command that fails to apply is logged and dropped; the queue moves on to
//! the next command on the next frame.

use alloc::collections::VecDeque;
use alloc::string::String;

use crate::backend::{AnimationInstance, InputKind};
use crate::error::ActionError;

/// A state-machine command waiting to be applied.
#[derive(Clone, Debug, PartialEq)]
pub enum PendingAction {
    /// Set an enum view-model property.
    Enum {
        /// Property path.
        path: String,
        /// New enum value.
        value: String,
    },
    /// Fire a trigger input.
    Trigger {
        /// Input name.
        name: String,
    },
    /// Set a boolean input.
    Boolean {
        /// Input name.
        name: String,
        /// New value.
        value: bool,
    },
    /// Set a numeric input.
    Number {
        /// Input name.
        name: String,
        /// New value.
        value: f64,
    },
}

impl PendingAction {
    /// Fires the named trigger.
    #[must_use]
    pub fn trigger(name: impl Into<String>) -> Self {
        Self::Trigger { name: name.into() }
    }

    /// Sets the named boolean input.
    #[must_use]
    pub fn boolean(name: impl Into<String>, value: bool) -> Self {
        Self::Boolean {
            name: name.into(),
            value,
        }
    }

    /// Sets the named numeric input.
    #[must_use]
    pub fn number(name: impl Into<String>, value: f64) -> Self {
        Self::Number {
            name: name.into(),
            value,
        }
    }

    /// Sets an enum property by path.
    #[must_use]
    pub fn enumeration(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Enum {
            path: path.into(),
            value: value.into(),
        }
    }

    /// The input name or property path this action targets.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Enum { path, .. } => path,
            Self::Trigger { name } | Self::Boolean { name, .. } | Self::Number { name, .. } => name,
        }
    }

    /// Applies the action to an animation instance.
    pub fn apply<T: AnimationInstance + ?Sized>(&self, target: &mut T) -> Result<(), ActionError> {
        match self {
            Self::Enum { path, value } => target.set_enum(path, value),
            Self::Trigger { name } => {
                check_kind(target, name, InputKind::Trigger)?;
                target.fire_trigger(name)
            }
            Self::Boolean { name, value } => {
                check_kind(target, name, InputKind::Boolean)?;
                target.set_boolean(name, *value)
            }
            Self::Number { name, value } => {
                check_kind(target, name, InputKind::Number)?;
                target.set_number(name, *value)
            }
        }
    }
}

fn check_kind<T: AnimationInstance + ?Sized>(
    target: &T,
    name: &str,
    expected: InputKind,
) -> Result<(), ActionError> {
    match target.input_kind(name) {
        None => Err(ActionError::TargetNotFound(name.into())),
        Some(actual) if actual != expected => Err(ActionError::WrongKind {
            name: name.into(),
            expected: expected.as_str(),
            actual: actual.as_str(),
        }),
        Some(_) => Ok(()),
    }
}

/// Result of one [`ActionQueue::process_next`] call that dequeued a command.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionOutcome {
    /// The command that was dequeued.
    pub action: PendingAction,
    /// Whether it applied cleanly.
    pub result: Result<(), ActionError>,
}

/// FIFO of pending state-machine commands, drained one per frame.
#[derive(Clone, Debug, Default)]
pub struct ActionQueue {
    pending: VecDeque<PendingAction>,
    processed_this_frame: bool,
}

impl ActionQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a command.
    pub fn enqueue(&mut self, action: PendingAction) {
        self.pending.push_back(action);
    }

    /// Resets the once-per-frame gate.
    pub fn begin_frame(&mut self) {
        self.processed_this_frame = false;
    }

    /// Dequeues and applies at most one command this frame.
    ///
    /// Returns `None` if the queue is empty or a command was already
    /// processed since the last [`begin_frame`](Self::begin_frame). When
    /// `target` is `None` the dequeued command fails with
    /// [`ActionError::NoAnimation`] and is dropped like any other failure.
    pub fn process_next<T: AnimationInstance + ?Sized>(
        &mut self,
        target: Option<&mut T>,
    ) -> Option<ActionOutcome> {
        if self.processed_this_frame {
            return None;
        }
        let action = self.pending.pop_front()?;
        self.processed_this_frame = true;

        let result = match target {
            Some(target) => action.apply(target),
            None => Err(ActionError::NoAnimation),
        };
        if let Err(err) = &result {
            tracing::warn!(target_name = action.target(), %err, "dropping state-machine action");
        }
        Some(ActionOutcome { action, result })
    }

    /// Whether a command has been processed since the last
    /// [`begin_frame`](Self::begin_frame).
    #[must_use]
    pub fn processed_this_frame(&self) -> bool {
        self.processed_this_frame
    }

    /// Number of pending commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops every pending command.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
