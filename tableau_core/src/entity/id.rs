// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Entity identity and label generation.

use alloc::format;
use alloc::string::String;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// Next value handed out by [`EntityId::next`].
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Per-kind counters for auto-generated labels, indexed by [`EntityKind::index`].
static LABEL_COUNTERS: [AtomicU64; EntityKind::COUNT] =
    [AtomicU64::new(0), AtomicU64::new(0), AtomicU64::new(0)];

/// Process-wide unique, monotonically increasing entity identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u64);

impl EntityId {
    /// Allocates the next identifier.
    #[must_use]
    pub(crate) fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw counter value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The structural variant of an entity, fixed at construction.
///
/// Animation and physics are attached capabilities rather than kinds; an
/// animated container is a [`Container`](Self::Container) with an animation
/// instance attached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A leaf visual.
    #[default]
    Visual,
    /// A leaf visual driven by an animation instance.
    Animation,
    /// An entity that positions child entities relative to itself.
    Container,
}

impl EntityKind {
    const COUNT: usize = 3;

    const fn index(self) -> usize {
        match self {
            Self::Visual => 0,
            Self::Animation => 1,
            Self::Container => 2,
        }
    }

    /// Returns the lowercase prefix used for generated labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Visual => "visual",
            Self::Animation => "animation",
            Self::Container => "container",
        }
    }

    /// Generates the next label for this kind, e.g. `"container-3"`.
    #[must_use]
    pub(crate) fn next_label(self) -> String {
        let n = LABEL_COUNTERS[self.index()].fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{n}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic() {
        let a = EntityId::next();
        let b = EntityId::next();
        assert!(b > a, "later ids compare greater");
        assert_ne!(a, b);
    }

    #[test]
    fn labels_are_unique_per_kind() {
        let a = EntityKind::Container.next_label();
        let b = EntityKind::Container.next_label();
        assert!(a.starts_with("container-"));
        assert_ne!(a, b);
        assert!(EntityKind::Animation.next_label().starts_with("animation-"));
    }
}
