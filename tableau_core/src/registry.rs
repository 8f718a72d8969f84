// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grouped, depth-ordered entity registry.
//!
//! Entities live in named groups. Within a group they are kept sorted by `z`
//! ascending with a stable sort, so equal depths keep append order. An entity
//! is in at most one group; adding a tracked entity again moves it.
//!
//! # Depth assignment
//!
//! An entity whose definition has no explicit `z` receives one the first time
//! it is added: one more than the largest *auto-assigned* depth already in the
//! destination group. Explicit depths never feed the counter, so one entity at
//! `z = 9999` does not push its auto-assigned siblings above it.
//!
//! # Callbacks
//!
//! On add the registry installs two hooks on the entity. A depth write calls
//! back to re-sort the group. An entity disposing itself calls back to drop it
//! from tracking. [`remove`](ObjectRegistry::remove) detaches the hooks before
//! disposing, so removal never re-enters the registry.
//!
//! The group table sits behind `Rc<RefCell<_>>` so that hooks can hold a weak
//! handle to it. No entity method is called while the table is borrowed.

use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::backend::BodyHandle;
use crate::entity::{CascadeTarget, EntityId, EntityRef, RegistryHooks};

#[derive(Debug)]
struct GroupEntry {
    id: EntityId,
    z: f64,
    auto_z: bool,
    entity: EntityRef,
}

#[derive(Debug, Default)]
struct GroupTable {
    groups: BTreeMap<String, Vec<GroupEntry>>,
    index: BTreeMap<EntityId, String>,
}

impl GroupTable {
    /// Splices an entity out, looking in `hint` first and then in the group
    /// the index recorded for it. Empty groups are deleted.
    fn take(&mut self, id: EntityId, hint: Option<&str>) -> Option<GroupEntry> {
        let in_hint = hint.filter(|g| {
            self.groups
                .get(*g)
                .is_some_and(|entries| entries.iter().any(|e| e.id == id))
        });
        let group = match in_hint {
            Some(g) => g.to_owned(),
            None => self.index.get(&id)?.clone(),
        };
        let entries = self.groups.get_mut(&group)?;
        let pos = entries.iter().position(|e| e.id == id)?;
        let entry = entries.remove(pos);
        if entries.is_empty() {
            self.groups.remove(&group);
        }
        self.index.remove(&id);
        Some(entry)
    }

    fn insert(&mut self, group: &str, entry: GroupEntry) {
        self.index.insert(entry.id, group.to_owned());
        let entries = self.groups.entry(group.to_owned()).or_default();
        entries.push(entry);
        entries.sort_by(|a, b| a.z.total_cmp(&b.z));
    }

    fn set_z(&mut self, id: EntityId, z: f64) {
        let Some(group) = self.index.get(&id).cloned() else {
            return;
        };
        let unchanged = self
            .groups
            .get(&group)
            .and_then(|entries| entries.iter().find(|e| e.id == id))
            .is_some_and(|e| e.z == z);
        if unchanged {
            return;
        }
        if let Some(mut entry) = self.take(id, Some(&group)) {
            entry.z = z;
            entry.auto_z = false;
            self.insert(&group, entry);
        }
    }

    fn max_auto_z(&self, group: &str) -> f64 {
        self.groups
            .get(group)
            .into_iter()
            .flatten()
            .filter(|e| e.auto_z)
            .map(|e| e.z)
            .fold(0.0, f64::max)
    }

    fn drain(&mut self) -> Vec<GroupEntry> {
        self.index.clear();
        core::mem::take(&mut self.groups)
            .into_values()
            .flatten()
            .collect()
    }
}

/// Tracks every live entity, grouped and ordered by depth.
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    table: Rc<RefCell<GroupTable>>,
    resolution_scale: Option<f64>,
}

impl ObjectRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one entity; see [`add_all`](Self::add_all).
    pub fn add(&mut self, entity: &EntityRef, group: Option<&str>) -> bool {
        self.add_all(core::slice::from_ref(entity), group) == 1
    }

    /// Adds entities to `group`, or to each entity's own group when `None`.
    ///
    /// Tracked entities are moved. Entities that were never initialized get
    /// [`init_visuals`](crate::entity::Entity::init_visuals) and, absent an
    /// explicit depth, an auto-assigned one. Disposed entities are skipped
    /// with a warning. Returns the number of entities added.
    pub fn add_all(&mut self, entities: &[EntityRef], group: Option<&str>) -> usize {
        let mut added = 0;
        for entity in entities {
            let Ok(mut e) = entity.try_borrow_mut() else {
                tracing::warn!("entity busy; add skipped");
                continue;
            };
            if e.is_disposed() {
                tracing::warn!(entity = %e.id(), "cannot add disposed entity");
                continue;
            }
            let id = e.id();
            let dest = group.unwrap_or(e.group()).to_owned();
            let previous = self.table.borrow_mut().take(id, None);

            let fresh = e.init_visuals();
            let auto_z = if fresh && !e.has_explicit_z() {
                let z = self.table.borrow().max_auto_z(&dest) + 1.0;
                e.assign_auto_z(z);
                true
            } else {
                previous.is_some_and(|p| p.auto_z) && !e.has_explicit_z()
            };

            if let Some(scale) = self.resolution_scale {
                e.apply_resolution_scale(scale, CascadeTarget::All);
            }
            e.set_group(&dest);
            e.attach_registry(self.hooks());
            let entry = GroupEntry {
                id,
                z: e.state().z(),
                auto_z,
                entity: Rc::clone(entity),
            };
            tracing::debug!(entity = %id, group = %dest, z = entry.z, "entity added");
            self.table.borrow_mut().insert(&dest, entry);
            added += 1;
        }
        added
    }

    fn hooks(&self) -> RegistryHooks {
        let table: Weak<RefCell<GroupTable>> = Rc::downgrade(&self.table);
        let table_for_dispose = table.clone();
        RegistryHooks {
            on_z: Box::new(move |id, z| {
                let Some(table) = table.upgrade() else {
                    return;
                };
                match table.try_borrow_mut() {
                    Ok(mut table) => table.set_z(id, z),
                    Err(_) => tracing::warn!(entity = %id, "registry busy; z change not re-sorted"),
                }
            }),
            on_dispose: Box::new(move |id| {
                let Some(table) = table_for_dispose.upgrade() else {
                    return;
                };
                match table.try_borrow_mut() {
                    Ok(mut table) => {
                        table.take(id, None);
                    }
                    Err(_) => {
                        tracing::warn!(entity = %id, "registry busy; disposed entity still tracked");
                    }
                }
            }),
        }
    }

    /// Removes one entity and disposes it; see [`remove_all`](Self::remove_all).
    pub fn remove(&mut self, entity: &EntityRef, group: Option<&str>) -> bool {
        self.remove_all(core::slice::from_ref(entity), group) == 1
    }

    /// Removes entities from tracking and disposes them.
    ///
    /// Each entity is looked up in `group` first and then in the group it
    /// was recorded under. Untracked or disposed entities are skipped with a
    /// warning. Returns the number of entities removed.
    pub fn remove_all(&mut self, entities: &[EntityRef], group: Option<&str>) -> usize {
        let mut removed = 0;
        for entity in entities {
            let (id, disposed) = match entity.try_borrow() {
                Ok(e) => (e.id(), e.is_disposed()),
                Err(_) => {
                    tracing::warn!("entity busy; remove skipped");
                    continue;
                }
            };
            if disposed {
                tracing::warn!(entity = %id, "cannot remove disposed entity");
                continue;
            }
            let taken = self.table.borrow_mut().take(id, group);
            let Some(entry) = taken else {
                tracing::warn!(entity = %id, "remove of untracked entity ignored");
                continue;
            };
            let mut e = entry.entity.borrow_mut();
            e.detach_registry();
            e.dispose();
            removed += 1;
        }
        removed
    }

    /// Removes and disposes every entity. Returns how many were tracked.
    pub fn dispose_all(&mut self) -> usize {
        let entries = self.table.borrow_mut().drain();
        let count = entries.len();
        for entry in entries {
            match entry.entity.try_borrow_mut() {
                Ok(mut e) => {
                    e.detach_registry();
                    e.dispose();
                }
                Err(_) => tracing::warn!(entity = %entry.id, "entity busy; not disposed"),
            }
        }
        count
    }

    /// Applies a resolution scale to every tracked entity and remembers it for
    /// entities added later. Returns the number of entities scaled.
    pub fn apply_resolution_scale(&mut self, scale: f64) -> usize {
        if !scale.is_finite() {
            tracing::warn!(scale, "ignoring non-finite resolution scale");
            return 0;
        }
        self.resolution_scale = Some(scale);
        let mut scaled = 0;
        for entity in self.render_order() {
            match entity.try_borrow_mut() {
                Ok(mut e) => {
                    e.apply_resolution_scale(scale, CascadeTarget::All);
                    scaled += 1;
                }
                Err(_) => tracing::warn!("entity busy; resolution scale skipped"),
            }
        }
        scaled
    }

    /// The last resolution scale applied.
    #[must_use]
    pub fn resolution_scale(&self) -> Option<f64> {
        self.resolution_scale
    }

    /// Number of tracked entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.borrow().index.len()
    }

    /// Returns `true` if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the entity is tracked.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.table.borrow().index.contains_key(&id)
    }

    /// The group an entity is tracked in.
    #[must_use]
    pub fn group_of(&self, id: EntityId) -> Option<String> {
        self.table.borrow().index.get(&id).cloned()
    }

    /// Names of every non-empty group.
    #[must_use]
    pub fn group_names(&self) -> Vec<String> {
        self.table.borrow().groups.keys().cloned().collect()
    }

    /// Entities in `group`, in depth order.
    #[must_use]
    pub fn group(&self, name: &str) -> Vec<EntityRef> {
        self.table
            .borrow()
            .groups
            .get(name)
            .into_iter()
            .flatten()
            .map(|e| Rc::clone(&e.entity))
            .collect()
    }

    /// Depths of `group` as the registry has them ordered.
    #[must_use]
    pub fn z_order(&self, name: &str) -> Vec<f64> {
        self.table
            .borrow()
            .groups
            .get(name)
            .into_iter()
            .flatten()
            .map(|e| e.z)
            .collect()
    }

    /// Every entity, group by group, each group in depth order.
    #[must_use]
    pub fn render_order(&self) -> Vec<EntityRef> {
        self.table
            .borrow()
            .groups
            .values()
            .flatten()
            .map(|e| Rc::clone(&e.entity))
            .collect()
    }

    /// First tracked entity with the given label.
    #[must_use]
    pub fn find_by_label(&self, label: &str) -> Option<EntityRef> {
        self.render_order()
            .into_iter()
            .find(|e| e.try_borrow().is_ok_and(|e| e.label() == label))
    }

    /// Tracked entity that owns the given physics body.
    #[must_use]
    pub fn find_by_body(&self, body: BodyHandle) -> Option<EntityRef> {
        self.render_order().into_iter().find(|e| {
            e.try_borrow()
                .is_ok_and(|e| e.physics().and_then(|p| p.body()) == Some(body))
        })
    }
}
