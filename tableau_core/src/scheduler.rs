// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The frame loop.
//!
//! [`FrameScheduler`] is driven by one host callback per display refresh
//! (see [`FrameRequester`]). Each callback either banks its elapsed time or
//! runs one tick.
//!
//! # Accumulation
//!
//! Elapsed time since the previous callback is added to a bank. While the bank
//! holds less than [`SchedulerConfig::min_step`] the callback is *skipped*:
//! nothing is updated and the time stays banked. Once the bank reaches the
//! minimum step, the whole bank is consumed as a single `dt`. Time is never
//! dropped; high-refresh displays simply produce fewer, larger steps.
//!
//! # Tick order
//!
//! 1. update listeners, with `(time, dt, frame, once_second)`;
//! 2. physics step, followed by collision dispatch to the owning entities;
//! 3. surface clear, then every entity whose `render` flag is set, group by
//!    group in depth order, then surface flush;
//! 4. scene renderer advance;
//! 5. request the next frame.
//!
//! # Run state
//!
//! `Stopped → Running ⇄ Paused`. A callback in any state other than
//! [`RunState::Running`] only records the time and requests another frame, so
//! the loop stays alive for a later resume. [`FrameScheduler::dispose`] is the
//! only way to stop requesting frames.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::action::ActionOutcome;
use crate::backend::{
    Clock, Collision, FrameRequester, PhysicsService, PixelSize, RenderSurface, SceneRenderer,
};
use crate::entity::EntityId;
use crate::registry::ObjectRegistry;
use crate::time::{Duration, HostTime};
use crate::trace::{
    ActionEvent, FrameSkippedEvent, FrameTickEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    RunStateEvent, StatsEvent, Tracer,
};

/// Scheduler run state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Not simulating. Frames are still requested.
    #[default]
    Stopped,
    /// Simulating.
    Running,
    /// Temporarily not simulating.
    Paused,
}

impl RunState {
    /// The state [`FrameScheduler::toggle_run_state`] moves to.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Running => Self::Paused,
            Self::Paused | Self::Stopped => Self::Running,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

/// Configuration for the [`FrameScheduler`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchedulerConfig {
    /// Smallest amount of banked time that runs a tick.
    pub min_step: Duration,
    /// How often [`FrameStats`] are published.
    pub stats_interval: Duration,
    /// Whether the physics engine is stepped each tick.
    pub physics_enabled: bool,
}

impl SchedulerConfig {
    /// 15 ms minimum step, stats every second, physics on.
    pub const DEFAULT: Self = Self {
        min_step: Duration::from_millis(15),
        stats_interval: Duration::from_secs(1),
        physics_enabled: true,
    };

    /// Tuned for 120 Hz and faster displays: every second callback runs.
    #[must_use]
    pub const fn high_refresh() -> Self {
        Self {
            min_step: Duration::from_millis(8),
            ..Self::DEFAULT
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Counters published once per stats interval.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    /// Ticks per second over the interval.
    pub fps: f64,
    /// Ticks that ran during the interval.
    pub iterations: u32,
    /// Callbacks that banked their time during the interval.
    pub skipped: u32,
}

/// Arguments passed to update listeners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateInfo {
    /// Host time of the frame callback.
    pub time: HostTime,
    /// Seconds of simulation time consumed by this tick.
    pub dt: f64,
    /// Tick counter, starting at 1.
    pub frame: u64,
    /// Whether stats were published on this tick.
    pub once_second: bool,
}

/// Per-tick callback.
pub type UpdateListener = Box<dyn FnMut(&UpdateInfo)>;

/// Handle returned when registering a listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub(crate) u64);

/// State handed to [`Entity::update`](crate::entity::Entity::update).
pub struct FrameContext<'a> {
    /// Host time of the frame callback.
    pub time: HostTime,
    /// Seconds of simulation time consumed by this tick.
    pub dt: f64,
    /// Tick counter.
    pub frame: u64,
    /// Whether stats were published on this tick.
    pub once_second: bool,
    /// Surface entities draw into.
    pub surface: &'a mut dyn RenderSurface,
    /// Actions dequeued during this tick, by entity.
    pub outcomes: Vec<(EntityId, ActionOutcome)>,
}

impl fmt::Debug for FrameContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameContext")
            .field("time", &self.time)
            .field("dt", &self.dt)
            .field("frame", &self.frame)
            .field("once_second", &self.once_second)
            .field("outcomes", &self.outcomes)
            .finish_non_exhaustive()
    }
}

impl<'a> FrameContext<'a> {
    /// Creates a context for one tick.
    pub fn new(
        time: HostTime,
        dt: f64,
        frame: u64,
        once_second: bool,
        surface: &'a mut dyn RenderSurface,
    ) -> Self {
        Self {
            time,
            dt,
            frame,
            once_second,
            surface,
            outcomes: Vec::new(),
        }
    }
}

/// Drives the registry and collaborators once per frame callback.
pub struct FrameScheduler {
    config: SchedulerConfig,
    state: RunState,
    registry: ObjectRegistry,
    surface: Box<dyn RenderSurface>,
    renderer: Box<dyn SceneRenderer>,
    physics: Option<PhysicsService>,
    contacts: Rc<RefCell<Vec<Collision>>>,
    requester: Option<Box<dyn FrameRequester>>,
    clock: Option<Box<dyn Clock>>,
    listeners: Vec<(ListenerId, UpdateListener)>,
    next_listener: u64,
    last_time: Option<HostTime>,
    banked: Duration,
    frame_count: u64,
    stats_since: Option<HostTime>,
    iterations: u32,
    skipped: u32,
    last_stats: Option<FrameStats>,
    pending_state_events: Vec<RunStateEvent>,
    disposed: bool,
}

impl fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("registry", &self.registry)
            .field("listeners", &self.listeners.len())
            .field("banked", &self.banked)
            .field("frame_count", &self.frame_count)
            .field("last_stats", &self.last_stats)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl FrameScheduler {
    /// Creates a stopped scheduler over the given surface and renderer.
    #[must_use]
    pub fn new(
        config: SchedulerConfig,
        surface: Box<dyn RenderSurface>,
        renderer: Box<dyn SceneRenderer>,
    ) -> Self {
        Self {
            config,
            state: RunState::Stopped,
            registry: ObjectRegistry::new(),
            surface,
            renderer,
            physics: None,
            contacts: Rc::new(RefCell::new(Vec::new())),
            requester: None,
            clock: None,
            listeners: Vec::new(),
            next_listener: 0,
            last_time: None,
            banked: Duration::ZERO,
            frame_count: 0,
            stats_since: None,
            iterations: 0,
            skipped: 0,
            last_stats: None,
            pending_state_events: Vec::new(),
            disposed: false,
        }
    }

    /// Attaches the physics engine and routes its collisions to entities.
    #[must_use]
    pub fn with_physics(mut self, physics: PhysicsService) -> Self {
        let contacts = Rc::clone(&self.contacts);
        physics
            .borrow_mut()
            .set_collision_handler(Box::new(move |c| contacts.borrow_mut().push(c)));
        self.physics = Some(physics);
        self
    }

    /// Attaches the host's frame requester.
    #[must_use]
    pub fn with_requester(mut self, requester: Box<dyn FrameRequester>) -> Self {
        self.requester = Some(requester);
        self
    }

    /// Attaches a clock used to timestamp tick phases.
    #[must_use]
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The entity registry.
    #[must_use]
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// The entity registry, mutably.
    pub fn registry_mut(&mut self) -> &mut ObjectRegistry {
        &mut self.registry
    }

    /// The current run state.
    #[must_use]
    pub fn run_state(&self) -> RunState {
        self.state
    }

    /// Changes the run state. Returns the previous state.
    ///
    /// Entering [`RunState::Running`] from [`RunState::Stopped`] discards the
    /// last callback time, so the stopped interval is not simulated.
    pub fn set_run_state(&mut self, state: RunState) -> RunState {
        let from = self.state;
        if from == state || self.disposed {
            return from;
        }
        self.state = state;
        if from == RunState::Stopped {
            self.last_time = None;
            self.banked = Duration::ZERO;
        }
        self.pending_state_events.push(RunStateEvent { from, to: state });
        tracing::info!(from = from.as_str(), to = state.as_str(), "run state changed");
        if state == RunState::Running {
            self.request_frame();
        }
        from
    }

    /// Flips between running and paused; a stopped scheduler starts.
    pub fn toggle_run_state(&mut self) -> RunState {
        let next = self.state.toggled();
        self.set_run_state(next);
        next
    }

    /// Registers a per-tick listener.
    pub fn on_update(&mut self, listener: UpdateListener) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.push((id, listener));
        id
    }

    /// Unregisters a listener. Returns `false` if it was not registered.
    pub fn remove_update_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    /// Ticks run so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Time banked by skipped callbacks.
    #[must_use]
    pub fn banked(&self) -> Duration {
        self.banked
    }

    /// The most recently published stats.
    #[must_use]
    pub fn last_stats(&self) -> Option<FrameStats> {
        self.last_stats
    }

    /// Whether [`dispose`](Self::dispose) has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Pushes a new device-pixel size to the surface, renderer and physics.
    pub fn resize_collaborators(&mut self, size: PixelSize) {
        self.surface.resize(size);
        self.renderer.resize(size);
        if let Some(physics) = &self.physics {
            match physics.try_borrow_mut() {
                Ok(mut engine) => engine.resize(size),
                Err(_) => tracing::warn!("physics engine busy; resize skipped"),
            }
        }
    }

    /// Handles one host frame callback. Returns `true` if a tick ran.
    pub fn frame(&mut self, time: HostTime, tracer: &mut Tracer<'_>) -> bool {
        if self.disposed {
            return false;
        }
        for e in self.pending_state_events.drain(..) {
            tracer.run_state(&e);
        }

        let last = self.last_time.replace(time);
        if self.state != RunState::Running {
            self.request_frame();
            return false;
        }

        let elapsed = last.map_or(Duration::ZERO, |last| time.saturating_duration_since(last));
        self.banked += elapsed;
        if self.banked < self.config.min_step {
            self.skipped += 1;
            tracer.frame_skipped(&FrameSkippedEvent {
                now: time,
                banked: self.banked,
            });
            self.request_frame();
            return false;
        }
        let dt = self.banked.as_secs_f64();
        self.banked = Duration::ZERO;
        self.frame_count += 1;
        self.iterations += 1;
        let frame = self.frame_count;

        let once_second = self.publish_stats(time, tracer);
        tracer.frame_tick(&FrameTickEvent {
            frame_index: frame,
            now: time,
            dt,
            once_second,
        });

        let info = UpdateInfo {
            time,
            dt,
            frame,
            once_second,
        };
        self.phase_begin(tracer, frame, PhaseKind::Listeners, time);
        for (_, listener) in &mut self.listeners {
            listener(&info);
        }
        self.phase_end(tracer, frame, PhaseKind::Listeners, time);

        if self.config.physics_enabled && self.physics.is_some() {
            self.phase_begin(tracer, frame, PhaseKind::Physics, time);
            self.step_physics(dt);
            self.phase_end(tracer, frame, PhaseKind::Physics, time);
        }

        self.phase_begin(tracer, frame, PhaseKind::Update, time);
        self.surface.clear();
        let outcomes = {
            let mut ctx = FrameContext::new(time, dt, frame, once_second, &mut *self.surface);
            for entity in self.registry.render_order() {
                let Ok(mut e) = entity.try_borrow_mut() else {
                    tracing::warn!("entity busy; skipped this frame");
                    continue;
                };
                if e.state().render() && !e.is_disposed() {
                    e.update(&mut ctx);
                }
            }
            ctx.outcomes
        };
        self.surface.flush();
        self.phase_end(tracer, frame, PhaseKind::Update, time);

        for (entity, outcome) in &outcomes {
            tracer.action(&ActionEvent {
                frame_index: frame,
                entity: *entity,
                action: &outcome.action,
                applied: outcome.result.is_ok(),
            });
        }

        self.phase_begin(tracer, frame, PhaseKind::Render, time);
        self.renderer.advance(dt);
        self.phase_end(tracer, frame, PhaseKind::Render, time);

        self.request_frame();
        true
    }

    fn publish_stats(&mut self, time: HostTime, tracer: &mut Tracer<'_>) -> bool {
        let Some(since) = self.stats_since else {
            self.stats_since = Some(time);
            return false;
        };
        let window = time.saturating_duration_since(since);
        if window <= self.config.stats_interval {
            return false;
        }
        let stats = FrameStats {
            fps: f64::from(self.iterations) / window.as_secs_f64(),
            iterations: self.iterations,
            skipped: self.skipped,
        };
        tracing::debug!(
            fps = stats.fps,
            iterations = stats.iterations,
            skipped = stats.skipped,
            "frame stats"
        );
        tracer.stats(&StatsEvent { now: time, stats });
        self.last_stats = Some(stats);
        self.iterations = 0;
        self.skipped = 0;
        self.stats_since = Some(time);
        true
    }

    fn step_physics(&mut self, dt: f64) {
        let Some(physics) = &self.physics else {
            return;
        };
        match physics.try_borrow_mut() {
            Ok(mut engine) => engine.step(dt),
            Err(_) => {
                tracing::warn!("physics engine busy; step skipped");
                return;
            }
        }
        let contacts: Vec<Collision> = self.contacts.borrow_mut().drain(..).collect();
        for contact in contacts {
            for body in [contact.a, contact.b] {
                let Some(entity) = self.registry.find_by_body(body) else {
                    continue;
                };
                match entity.try_borrow_mut() {
                    Ok(mut e) => e.on_collision(&contact),
                    Err(_) => tracing::warn!(?body, "entity busy; collision dropped"),
                }
            }
        }
    }

    fn stamp(&self, fallback: HostTime) -> HostTime {
        self.clock.as_ref().map_or(fallback, |c| c.now())
    }

    fn phase_begin(&self, tracer: &mut Tracer<'_>, frame: u64, phase: PhaseKind, t: HostTime) {
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index: frame,
            phase,
            timestamp: self.stamp(t),
        });
    }

    fn phase_end(&self, tracer: &mut Tracer<'_>, frame: u64, phase: PhaseKind, t: HostTime) {
        tracer.phase_end(&PhaseEndEvent {
            frame_index: frame,
            phase,
            timestamp: self.stamp(t),
        });
    }

    fn request_frame(&mut self) {
        if let Some(requester) = &mut self.requester {
            requester.request_frame();
        }
    }

    /// Tears the loop down: cancels the pending frame request, disposes every
    /// entity and drops all listeners. Calling it again does nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(mut requester) = self.requester.take() {
            requester.cancel_frame();
        }
        let entities = self.registry.dispose_all();
        self.listeners.clear();
        self.pending_state_events.clear();
        self.state = RunState::Stopped;
        self.disposed = true;
        tracing::info!(entities, "scheduler disposed");
    }
}
