//! End-to-end behavior of the core: plugins, phases, views, handles and
//! teardown working together.

use std::sync::{Mutex, OnceLock};

use kjarni::prelude::*;

struct Position {
    x: f32,
}
struct Velocity {
    dx: f32,
}
struct Marked;

/// Shared log for systems to record execution order into.
#[derive(Default)]
struct TraceLog(Vec<&'static str>);

fn trace(core: &mut Core, label: &'static str) -> Result<()> {
    core.resource_mut::<TraceLog>()?.0.push(label);
    Ok(())
}

#[test]
fn phases_and_systems_run_in_declared_order() {
    let mut core = Core::new();
    core.register_resource(TraceLog::default()).unwrap();

    core.add_system(RENDER, "r", |c: &mut Core| trace(c, "R")).unwrap();
    core.add_system(UPDATE, "a", |c: &mut Core| trace(c, "A")).unwrap();
    core.add_system(UPDATE, "b", |c: &mut Core| trace(c, "B")).unwrap();

    core.run_once().unwrap();
    assert_eq!(core.resource::<TraceLog>().unwrap().0, vec!["A", "B", "R"]);
}

#[test]
fn startup_runs_once_and_is_drained() {
    let mut core = Core::new();
    core.register_resource(TraceLog::default()).unwrap();
    core.add_system(STARTUP, "init", |c: &mut Core| trace(c, "S")).unwrap();

    core.run_once().unwrap();
    core.run_once().unwrap();
    core.run_once().unwrap();
    assert_eq!(core.resource::<TraceLog>().unwrap().0, vec!["S"]);
}

#[test]
fn startup_can_repeat_when_configured() {
    let mut config = CoreConfig::default();
    config.run_startup_phase_every_frame = true;
    let mut core = Core::with_config(config);
    core.register_resource(TraceLog::default()).unwrap();
    core.add_system(STARTUP, "init", |c: &mut Core| trace(c, "S")).unwrap();

    core.run_once().unwrap();
    core.run_once().unwrap();
    assert_eq!(core.resource::<TraceLog>().unwrap().0, vec!["S", "S"]);
}

#[test]
fn inserted_phase_runs_in_position() {
    let mut core = Core::new();
    core.register_resource(TraceLog::default()).unwrap();
    core.add_phase("Physics", PhasePosition::Before(UPDATE)).unwrap();
    core.add_system("Physics", "p", |c: &mut Core| trace(c, "P")).unwrap();
    core.add_system(UPDATE, "u", |c: &mut Core| trace(c, "U")).unwrap();

    core.run_once().unwrap();
    assert_eq!(core.resource::<TraceLog>().unwrap().0, vec!["P", "U"]);
}

#[test]
fn missing_resource_is_an_error() {
    let core = Core::new();
    assert!(matches!(
        core.resource::<TraceLog>(),
        Err(Error::MissingResource { .. })
    ));
}

#[test]
fn duplicate_resource_is_rejected() {
    let mut core = Core::new();
    core.register_resource(TraceLog::default()).unwrap();
    assert!(matches!(
        core.register_resource(TraceLog::default()),
        Err(Error::DuplicateResource { .. })
    ));
}

// ── Plugins ──────────────────────────────────────────────────────────

struct InnerPlugin;
impl Plugin for InnerPlugin {
    fn build(&self, core: &mut Core) -> Result<()> {
        core.resource_mut::<TraceLog>()?.0.push("inner");
        Ok(())
    }
}

struct OuterPlugin;
impl Plugin for OuterPlugin {
    fn build(&self, core: &mut Core) -> Result<()> {
        core.register_resource(TraceLog::default())?;
        core.resource_mut::<TraceLog>()?.0.push("outer");
        core.add_plugin(InnerPlugin);
        Ok(())
    }
}

#[test]
fn plugins_bind_in_add_order_including_transitive() {
    let mut core = Core::new();
    core.add_plugin(OuterPlugin);
    assert!(core.has_plugin::<OuterPlugin>());
    assert!(!core.has_plugin::<InnerPlugin>());

    core.bind_plugins().unwrap();
    assert!(core.has_plugin::<InnerPlugin>());
    assert_eq!(
        core.resource::<TraceLog>().unwrap().0,
        vec!["outer", "inner"]
    );

    // Re-adding a bound plugin is a no-op.
    core.add_plugin(OuterPlugin);
    core.bind_plugins().unwrap();
    assert_eq!(
        core.resource::<TraceLog>().unwrap().0,
        vec!["outer", "inner"]
    );
}

struct BrokenPlugin;
impl Plugin for BrokenPlugin {
    fn build(&self, core: &mut Core) -> Result<()> {
        core.resource::<TraceLog>()?; // never registered
        Ok(())
    }
    fn name(&self) -> &str {
        "broken"
    }
}

#[test]
fn plugin_bind_failure_names_the_plugin() {
    let mut core = Core::new();
    core.add_plugin(BrokenPlugin);
    match core.bind_plugins() {
        Err(Error::MissingPlugin { plugin, .. }) => assert_eq!(plugin, "broken"),
        other => panic!("expected bind failure, got {other:?}"),
    }
}

// ── Views ────────────────────────────────────────────────────────────

#[test]
fn view_visits_matching_entities_only() {
    let mut core = Core::new();
    for i in 0..100 {
        let e = core.create_entity();
        e.attach(&mut core, Position { x: i as f32 }).unwrap();
        if i < 50 {
            e.attach(&mut core, Velocity { dx: 1.0 }).unwrap();
        }
    }

    let mut moving = 0;
    core.view::<(&mut Position, &Velocity)>(|_, _, (pos, vel)| {
        pos.x += vel.dx;
        moving += 1;
    })
    .unwrap();
    assert_eq!(moving, 50);

    let mut total = 0;
    core.view::<(&Position,)>(|_, _, _| total += 1).unwrap();
    assert_eq!(total, 100);
}

#[test]
fn structural_mutation_during_view_is_rejected() {
    let mut core = Core::new();
    let e = core.create_entity();
    e.attach(&mut core, Position { x: 0.0 }).unwrap();

    let mut results = Vec::new();
    core.view::<(&Position,)>(|core, entity, _| {
        results.push(core.registry_mut().attach(entity, Velocity { dx: 1.0 }));
        results.push(core.destroy_entity(entity).map(|_| ()));
        // Creating entities is fine; no iterated storage is touched.
        let spawned = core.create_entity();
        results.push(if spawned.is_valid(core) {
            Ok(())
        } else {
            Err(Error::InvalidEntity {
                entity: spawned.entity(),
            })
        });
    })
    .unwrap();

    assert!(matches!(results[0], Err(Error::StructuralMutation { .. })));
    assert!(matches!(results[1], Err(Error::StructuralMutation { .. })));
    assert!(results[2].is_ok());
    assert_eq!(core.registry().entity_count(), 2);

    // The lock is released once the view ends.
    e.attach(&mut core, Velocity { dx: 1.0 }).unwrap();
}

#[test]
fn nested_views_are_rejected() {
    let mut core = Core::new();
    let e = core.create_entity();
    e.attach(&mut core, Position { x: 0.0 }).unwrap();

    let mut nested = None;
    core.view::<(&Position,)>(|core, _, _| {
        nested = Some(core.view::<(&Position,)>(|_, _, _| {}));
    })
    .unwrap();
    assert!(matches!(
        nested,
        Some(Err(Error::StructuralMutation { .. }))
    ));
}

// ── Handles ──────────────────────────────────────────────────────────

#[test]
fn destroyed_entity_invalidates_every_handle() {
    let mut core = Core::new();
    let handle = core.create_entity();
    handle.attach(&mut core, Position { x: 1.0 }).unwrap();
    let raw = handle.entity();
    let other = core.handle_of(raw);

    core.destroy_entity(raw).unwrap();
    assert!(!handle.is_valid(&core));
    assert!(!other.is_valid(&core));

    // The recycled identifier is a different entity.
    let fresh = core.create_entity();
    assert_eq!(fresh.entity().index(), raw.index());
    assert_ne!(fresh.entity().generation(), raw.generation());
    assert!(!handle.is_valid(&core));
}

#[test]
fn temporary_components_are_swept_after_the_tick() {
    let mut core = Core::new();
    let e = core.create_entity();
    e.attach(&mut core, Position { x: 0.0 }).unwrap();
    e.attach_temporary(&mut core, Marked).unwrap();
    assert!(e.has::<Marked>(&core).unwrap());

    core.run_once().unwrap();
    assert!(!e.has::<Marked>(&core).unwrap());
    assert!(e.has::<Position>(&core).unwrap());
}

// ── Main loop and failure ────────────────────────────────────────────

#[test]
fn run_stops_and_executes_shutdown_once() {
    let mut core = Core::new();
    core.register_resource(TraceLog::default()).unwrap();
    core.add_system(UPDATE, "stop", |c: &mut Core| {
        c.stop();
        c.stop(); // idempotent
        trace(c, "tick")
    })
    .unwrap();
    core.add_system(SHUTDOWN, "bye", |c: &mut Core| trace(c, "down")).unwrap();

    core.run().unwrap();
    assert!(!core.is_running());
    assert_eq!(core.resource::<TraceLog>().unwrap().0, vec!["tick", "down"]);
}

#[test]
fn shutdown_runs_when_core_is_dropped() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let teardowns = Arc::new(AtomicUsize::new(0));
    let mut core = Core::new();
    let counter = Arc::clone(&teardowns);
    core.add_system(SHUTDOWN, "bye", move |_: &mut Core| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
    .unwrap();

    // Driven by run_once only; the loop never runs.
    core.run_once().unwrap();
    assert_eq!(teardowns.load(Ordering::SeqCst), 0);
    drop(core);
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
}

#[test]
fn shutdown_does_not_repeat_when_a_run_core_is_dropped() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let teardowns = Arc::new(AtomicUsize::new(0));
    let mut core = Core::new();
    let counter = Arc::clone(&teardowns);
    core.add_system(SHUTDOWN, "bye", move |_: &mut Core| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
    .unwrap();
    core.add_system(UPDATE, "stop", |c: &mut Core| {
        c.stop();
        Ok(())
    })
    .unwrap();

    core.run().unwrap();
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
    drop(core);
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
}

#[test]
fn stop_before_run_discards_pending_startup() {
    let mut core = Core::new();
    core.register_resource(TraceLog::default()).unwrap();
    core.add_system(STARTUP, "init", |c: &mut Core| trace(c, "init")).unwrap();
    core.add_system(UPDATE, "tick", |c: &mut Core| trace(c, "tick")).unwrap();
    core.add_system(SHUTDOWN, "bye", |c: &mut Core| trace(c, "down")).unwrap();

    core.stop();
    core.run().unwrap();
    // No tick ran and the pending Startup systems were discarded.
    assert_eq!(core.resource::<TraceLog>().unwrap().0, vec!["down"]);

    // The discarded Startup work stays gone on later ticks.
    core.run_once().unwrap();
    assert_eq!(core.resource::<TraceLog>().unwrap().0, vec!["down", "tick"]);
}

#[test]
fn system_failure_aborts_the_loop_but_shutdown_still_runs() {
    let mut core = Core::new();
    core.register_resource(TraceLog::default()).unwrap();
    core.add_system(UPDATE, "boom", |c: &mut Core| {
        c.resource::<Velocity>()?; // missing
        Ok(())
    })
    .unwrap();
    core.add_system(RENDER, "after", |c: &mut Core| trace(c, "after")).unwrap();
    core.add_system(SHUTDOWN, "bye", |c: &mut Core| trace(c, "down")).unwrap();

    let err = core.run().unwrap_err();
    match err {
        Error::System { phase, system, .. } => {
            assert_eq!(phase, UPDATE);
            assert_eq!(system, "boom");
        }
        other => panic!("expected system error, got {other:?}"),
    }
    // The failing tick never reached Render, but Shutdown ran.
    assert_eq!(core.resource::<TraceLog>().unwrap().0, vec!["down"]);
}

#[test]
fn handled_errors_do_not_abort_the_tick() {
    let mut core = Core::new();
    core.register_resource(TraceLog::default()).unwrap();
    core.add_system_with_error_handler(
        UPDATE,
        "flaky",
        |c: &mut Core| {
            c.resource::<Velocity>()?;
            Ok(())
        },
        |core: &mut Core, _err| {
            let _ = trace(core, "handled");
        },
    )
    .unwrap();
    core.add_system(UPDATE, "next", |c: &mut Core| trace(c, "next")).unwrap();

    core.run_once().unwrap();
    assert_eq!(
        core.resource::<TraceLog>().unwrap().0,
        vec!["handled", "next"]
    );
}

#[test]
fn schedule_mutation_from_a_system_is_rejected() {
    let mut core = Core::new();
    core.register_resource(TraceLog::default()).unwrap();
    core.add_system(UPDATE, "meddle", |c: &mut Core| {
        match c.add_system(UPDATE, "late", |_: &mut Core| Ok(())) {
            Err(Error::ScheduleInUse) => trace(c, "rejected"),
            other => panic!("expected ScheduleInUse, got {other:?}"),
        }
    })
    .unwrap();

    core.run_once().unwrap();
    assert_eq!(core.resource::<TraceLog>().unwrap().0, vec!["rejected"]);
}

// ── Teardown order ───────────────────────────────────────────────────

static DROPS: OnceLock<Mutex<Vec<&'static str>>> = OnceLock::new();

fn drops() -> &'static Mutex<Vec<&'static str>> {
    DROPS.get_or_init(|| Mutex::new(Vec::new()))
}

struct First;
impl Drop for First {
    fn drop(&mut self) {
        drops().lock().unwrap().push("first");
    }
}

struct Second;
impl Drop for Second {
    fn drop(&mut self) {
        drops().lock().unwrap().push("second");
    }
}

#[test]
fn resources_tear_down_in_reverse_registration_order() {
    let mut core = Core::new();
    core.register_resource(First).unwrap();
    core.register_resource(Second).unwrap();
    drop(core);
    assert_eq!(*drops().lock().unwrap(), vec!["second", "first"]);
}

// ── Time ─────────────────────────────────────────────────────────────

#[test]
fn time_plugin_advances_each_tick() {
    let mut core = Core::new();
    core.add_plugin(TimePlugin);
    core.bind_plugins().unwrap();

    core.run_once().unwrap();
    core.run_once().unwrap();
    let time = core.resource::<Time>().unwrap();
    assert_eq!(time.tick_count(), 2);
    assert!(time.elapsed() >= time.delta());
}
