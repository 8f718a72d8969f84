// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless scene that exercises the frame loop end to end.
//!
//! Simulates four seconds of 120 Hz frame callbacks against a stage holding a
//! falling ball, a floor, an animated puppet and a HUD container. Along the
//! way it queues state-machine actions, resizes the window twice in a burst,
//! pauses and resumes, and maps a pointer into the puppet. Events go to both a
//! [`PrettyPrintSink`](tableau_debug::pretty::PrettyPrintSink) and a
//! [`RecorderSink`](tableau_debug::recorder::RecorderSink); the recording is
//! exported as Chrome trace JSON at the end.

mod headless;

use std::cell::{Cell, RefCell};
use std::fs::File;
use std::io::BufWriter;
use std::rc::Rc;

use kurbo::{Point, Size};
use tableau_core::action::PendingAction;
use tableau_core::backend::{AnimationSource, PhysicsService};
use tableau_core::coords::Clamp;
use tableau_core::entity::{Entity, EntityDefinition, EntityRef, StateField, attach_child};
use tableau_core::physics::BodyBinding;
use tableau_core::resize::ResizeConfig;
use tableau_core::scheduler::{FrameScheduler, RunState, SchedulerConfig};
use tableau_core::stage::{SharedStage, Stage};
use tableau_core::time::HostTime;
use tableau_core::trace::{
    ActionEvent, FrameSkippedEvent, FrameTickEvent, PhaseBeginEvent, PhaseEndEvent, ResizeEvent,
    RunStateEvent, StatsEvent, TraceSink,
};

use tableau_debug::pretty::PrettyPrintSink;
use tableau_debug::recorder::RecorderSink;

use headless::{
    CountingSurface, FallingWorld, NullRenderer, PuppetRuntime, SimClock, SimRequester, SimWindow,
};

/// 120 Hz callbacks: every other one is banked at the default 15 ms step.
const CALLBACK_US: u64 = 8_333;
const CALLBACKS: u64 = 480;

/// Forwards every event to a pretty printer and a recorder.
struct Tee {
    pretty: PrettyPrintSink,
    recorder: RecorderSink,
}

impl TraceSink for Tee {
    fn on_frame_tick(&mut self, e: &FrameTickEvent) {
        self.pretty.on_frame_tick(e);
        self.recorder.on_frame_tick(e);
    }

    fn on_frame_skipped(&mut self, e: &FrameSkippedEvent) {
        self.pretty.on_frame_skipped(e);
        self.recorder.on_frame_skipped(e);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.recorder.on_phase_begin(e);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.recorder.on_phase_end(e);
    }

    fn on_stats(&mut self, e: &StatsEvent) {
        self.pretty.on_stats(e);
        self.recorder.on_stats(e);
    }

    fn on_run_state(&mut self, e: &RunStateEvent) {
        self.pretty.on_run_state(e);
        self.recorder.on_run_state(e);
    }

    fn on_resize(&mut self, e: &ResizeEvent) {
        self.pretty.on_resize(e);
        self.recorder.on_resize(e);
    }

    fn on_action(&mut self, e: &ActionEvent<'_>) {
        self.pretty.on_action(e);
        self.recorder.on_action(e);
    }
}

struct Scene {
    ball: EntityRef,
    floor: EntityRef,
    puppet: EntityRef,
    hud: EntityRef,
}

fn build_scene(world: &PhysicsService) -> Scene {
    let floor = Entity::new(
        EntityDefinition::new()
            .label("floor")
            .at(0.0, 460.0)
            .size(800.0, 40.0)
            .z(0.0),
    )
    .with_physics(Box::new(BodyBinding::fixed(world.clone())))
    .into_ref();

    let mut bounces = 0_u32;
    let ball = Entity::new(
        EntityDefinition::new()
            .label("ball")
            .at(380.0, 40.0)
            .size(40.0, 40.0),
    )
    .with_physics(Box::new(
        BodyBinding::dynamic(world.clone()).with_collision_callback(Box::new(move |c| {
            bounces += 1;
            tracing::info!(bounces, other = ?c.b, "ball bounced");
        })),
    ))
    .into_ref();

    let mut runtime = PuppetRuntime;
    let source = AnimationSource {
        src: "puppet.riv".to_owned(),
        ..AnimationSource::default()
    };
    let puppet = match Entity::with_animation(
        EntityDefinition::new().label("puppet").at(80.0, 280.0),
        &mut runtime,
        &source,
    ) {
        Ok(entity) => entity.into_ref(),
        Err(err) => {
            tracing::error!(%err, "puppet failed to load; using a plain visual");
            Entity::new(EntityDefinition::new().label("puppet")).into_ref()
        }
    };
    puppet.borrow_mut().bind(
        StateField::X,
        Box::new(|old, new| tracing::debug!(?old, ?new, "puppet moved")),
    );

    // Missing assets surface as a load error.
    let missing = AnimationSource {
        src: "missing.riv".to_owned(),
        ..AnimationSource::default()
    };
    if let Err(err) = Entity::with_animation(EntityDefinition::new(), &mut runtime, &missing) {
        tracing::info!(%err, "expected load failure");
    }

    let hud = Entity::container(
        EntityDefinition::new()
            .label("hud")
            .group("hud")
            .at(600.0, 20.0)
            .size(180.0, 60.0),
    )
    .into_ref();
    for (i, label) in ["score", "lives"].into_iter().enumerate() {
        let child = Entity::new(
            EntityDefinition::new()
                .label(label)
                .at(610.0, 30.0 + 20.0 * i as f64)
                .size(80.0, 16.0),
        )
        .into_ref();
        if let Err(err) = attach_child(&hud, &child) {
            tracing::warn!(%err, label, "hud child rejected");
        }
    }

    Scene {
        ball,
        floor,
        puppet,
        hud,
    }
}

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    // -- collaborators -----------------------------------------------------
    let world: PhysicsService = Rc::new(RefCell::new(FallingWorld::default()));
    let surface = CountingSurface::default();
    let draws = surface.draws.clone();
    let requester = SimRequester::default();
    let clock = SimClock::default();
    let window = SimWindow {
        size: Rc::new(Cell::new(Size::new(800.0, 500.0))),
        dpr: 2.0,
    };

    let scheduler = FrameScheduler::new(
        SchedulerConfig::DEFAULT,
        Box::new(surface),
        Box::new(NullRenderer::default()),
    )
    .with_physics(world.clone())
    .with_requester(Box::new(requester.clone()))
    .with_clock(Box::new(clock.clone()));
    let stage = SharedStage::new(
        Stage::new(scheduler, ResizeConfig::DEFAULT).with_host(Box::new(window.clone())),
    );

    // -- scene -------------------------------------------------------------
    let scene = build_scene(&world);
    let mut now = HostTime(1_000_000);
    {
        let mut s = stage.borrow_mut();
        s.layout(now);
        s.add_entities(
            &[
                scene.floor.clone(),
                scene.ball.clone(),
                scene.puppet.clone(),
            ],
            None,
        );
        s.add_entities(&[scene.hud.clone()], Some("hud"));

        s.on_update(Box::new(|info| {
            if info.once_second {
                tracing::info!(frame = info.frame, "one second of simulation");
            }
        }));
        s.on_resize(Box::new(|d| {
            tracing::info!(width = d.width, height = d.height, "layout listener");
        }));
        s.set_run_state(RunState::Running);
    }

    // -- simulated loop ----------------------------------------------------
    let mut sink = Tee {
        pretty: PrettyPrintSink::new(Box::new(std::io::stdout())),
        recorder: RecorderSink::new(),
    };

    for callback in 0..CALLBACKS {
        match callback {
            60 => {
                let mut puppet = scene.puppet.borrow_mut();
                puppet.enqueue(PendingAction::trigger("wave"));
                puppet.enqueue(PendingAction::number("speed", 2.0));
                puppet.enqueue(PendingAction::enumeration("face/mood", "happy"));
                puppet.enqueue(PendingAction::boolean("missing", true));
            }
            120 => {
                window.size.set(Size::new(1200.0, 900.0));
                stage.borrow_mut().window_resized(now);
            }
            130 => stage.borrow_mut().window_resized(now),
            240 => {
                stage.borrow_mut().toggle_run_state();
            }
            270 => {
                stage.borrow_mut().toggle_run_state();
            }
            300 => {
                let p = stage.borrow_mut().pointer_to_content(
                    &scene.puppet,
                    Point::new(300.0, 700.0),
                    Clamp::Inset,
                );
                tracing::info!(?p, "pointer in puppet space");
            }
            _ => {}
        }

        clock.now.set(now);
        if requester.pending.replace(false) {
            stage.frame_traced(now, &mut sink);
        }
        now = HostTime(now.ticks() + CALLBACK_US);
    }

    // -- teardown ----------------------------------------------------------
    {
        let s = stage.borrow();
        let scheduler = s.scheduler();
        let ball = scene.ball.borrow();
        tracing::info!(
            frames = scheduler.frame_count(),
            draws = draws.get(),
            ball_y = ball.state().y(),
            stats = ?scheduler.last_stats(),
            groups = ?s.registry().group_names(),
            "simulation finished"
        );
    }
    stage.borrow_mut().dispose();
    stage.borrow_mut().dispose();
    assert!(scene.hud.borrow().is_disposed(), "dispose reaches every group");

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let file = File::create(path).expect("failed to create trace.json");
    let mut writer = BufWriter::new(file);
    tableau_debug::chrome::export(sink.recorder.as_bytes(), &mut writer)
        .expect("failed to write Chrome trace");

    println!("Wrote {path} ({CALLBACKS} callbacks)");
}
