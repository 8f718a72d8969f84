// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame loop, entity registry and resolution-scale cascade for 2D scenes.
//!
//! `tableau_core` keeps a set of drawable entities ordered by depth, drives
//! them from a host frame callback, and rescales them when the host
//! container changes size. It is `no_std` compatible (with `alloc`) and
//! reaches the outside world only through the collaborator traits in
//! [`backend`].
//!
//! # Architecture
//!
//! ```text
//!   Host frame callback ──► Stage::frame()
//!                              │
//!            ┌─────────────────┴─────────────────┐
//!            ▼                                   ▼
//!   ResizeController::poll()          FrameScheduler::frame()
//!   (debounced fit + rescale)            │
//!                                        ├─► update listeners
//!                                        ├─► PhysicsEngine::step() + contacts
//!                                        ├─► RenderSurface::clear()
//!                                        │     for entity in ObjectRegistry::render_order():
//!                                        │         Entity::update()  (one queued action,
//!                                        │                            animation, physics,
//!                                        │                            children, draw)
//!                                        ├─► RenderSurface::flush()
//!                                        └─► SceneRenderer::advance(dt)
//! ```
//!
//! **[`scheduler`]**: Frame scheduler with a time bank. Callbacks that arrive
//! faster than the minimum step only bank their elapsed time; the next tick
//! consumes the whole bank as its `dt`.
//!
//! **[`registry`]**: Named groups of entities, each kept sorted by depth.
//! Entities added without an explicit depth are stacked on top of the
//! group's automatically placed ones.
//!
//! **[`entity`]**: The entity model: observable state, the
//! resolution-scale cascade, containers with relative children, and the
//! per-entity update.
//!
//! **[`action`]**: One-per-frame queue of state-machine input changes.
//!
//! **[`physics`]**: Optional physics binding and the shared engine handle.
//!
//! **[`resize`]**: Debounced fit of the design size into the host box.
//!
//! **[`coords`]**: Pointer mapping between window, canvas and content space.
//!
//! **[`stage`]**: The façade host glue talks to.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! frame-loop instrumentation, with a zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod action;
pub mod backend;
pub mod coords;
pub mod entity;
pub mod error;
pub mod physics;
pub mod registry;
pub mod resize;
pub mod scheduler;
pub mod stage;
pub mod time;
pub mod trace;

#[cfg(test)]
pub(crate) mod testing;
