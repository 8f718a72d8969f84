// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Nothing inside the per-frame loop propagates these upward: action
//! failures, lookup misses and lifecycle faults are logged and the offending
//! operation becomes a no-op. Only construction-time APIs such as
//! [`Entity::with_animation`](crate::entity::Entity::with_animation) return
//! them to the caller.

use alloc::string::String;

use thiserror::Error;

use crate::entity::EntityId;

/// Failure while applying a queued [`PendingAction`](crate::action::PendingAction).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The named input or view-model property does not exist.
    #[error("action target `{0}` not found")]
    TargetNotFound(String),
    /// The target exists but has a different input kind.
    #[error("action target `{name}` is a {actual} input, not a {expected} input")]
    WrongKind {
        /// Target name.
        name: String,
        /// Kind the action expected.
        expected: &'static str,
        /// Kind the runtime reported.
        actual: &'static str,
    },
    /// The entity has no animation instance to apply the action to.
    #[error("entity has no animation instance")]
    NoAnimation,
    /// The animation runtime rejected the change.
    #[error("animation runtime rejected action: {0}")]
    Rejected(String),
}

/// Failure while loading an animation asset.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("failed to load animation `{source_name}`: {reason}")]
pub struct LoadError {
    /// The asset that was requested.
    pub source_name: String,
    /// Why loading failed.
    pub reason: String,
}

/// Scene-level failures surfaced to callers of construction APIs.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SceneError {
    /// An external collaborator failed to load an asset.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// The entity was already disposed.
    #[error("entity {0} is disposed")]
    Disposed(EntityId),
    /// The proposed parent cannot hold children.
    #[error("entity {0} is not a container")]
    NotAContainer(EntityId),
    /// A parent/child link would form a cycle or self-reference.
    #[error("entity {parent} cannot adopt {child}: link would form a cycle")]
    InvalidParent {
        /// Proposed parent.
        parent: EntityId,
        /// Proposed child.
        child: EntityId,
    },
}
