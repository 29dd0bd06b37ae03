//! # Core — Kernel Facade
//!
//! [`Core`] owns the four kernel pieces and is the single mutation point
//! hosts and plugins talk to:
//!
//! - the [`EntityRegistry`] (entities and components),
//! - the [`ResourceStore`] (typed singletons),
//! - the [`Scheduler`] (phases of systems),
//! - the [`PluginLoader`](crate::plugin) (queued composition units).
//!
//! A typical host builds a core, adds plugins, and hands control to
//! [`Core::run`]:
//!
//! ```no_run
//! use kjarni::prelude::*;
//!
//! fn main() -> kjarni::Result<()> {
//!     let mut core = Core::new();
//!     core.add_plugin(TimePlugin);
//!     core.add_system(UPDATE, "quit", |core: &mut Core| {
//!         core.stop();
//!         Ok(())
//!     })?;
//!     core.run()
//! }
//! ```

use std::any::TypeId;
use std::sync::Arc;

use log::{error, info};

use crate::config::CoreConfig;
use crate::ecs::{Entity, EntityRegistry, ViewParam};
use crate::error::{Error, Result};
use crate::handle::{CoreTag, EntityHandle};
use crate::plugin::{Plugin, PluginLoader};
use crate::resource::ResourceStore;
use crate::schedule::{PhasePosition, Scheduler, System};

/// Detaches one temporary component type from every carrier.
type TemporarySweep = fn(&mut EntityRegistry) -> Result<usize>;

/// The kernel facade. See the [module docs](self).
pub struct Core {
    /// Identity token handles hold weakly; proves a handle belongs here.
    tag: Arc<CoreTag>,
    registry: EntityRegistry,
    resources: ResourceStore,
    /// Checked out (`None`) while a tick is in flight.
    scheduler: Option<Scheduler>,
    plugins: PluginLoader,
    /// Component types to sweep at the end of the current tick.
    temporary: Vec<(TypeId, TemporarySweep)>,
    running: bool,
    /// Set by [`Core::stop`]; honored even before the loop starts.
    stop_requested: bool,
}

impl Core {
    pub fn new() -> Self {
        Self::with_config(CoreConfig::default())
    }

    pub fn with_config(config: CoreConfig) -> Self {
        Self {
            tag: Arc::new(CoreTag),
            registry: EntityRegistry::with_capacity(config.initial_entity_capacity),
            resources: ResourceStore::default(),
            scheduler: Some(Scheduler::new(
                &config.phase_order,
                config.run_startup_phase_every_frame,
            )),
            plugins: PluginLoader::default(),
            temporary: Vec::new(),
            running: false,
            stop_requested: false,
        }
    }

    pub(crate) fn tag(&self) -> &Arc<CoreTag> {
        &self.tag
    }

    // ── Entities ─────────────────────────────────────────────────────

    /// Create an entity and return a handle bound to this core.
    pub fn create_entity(&mut self) -> EntityHandle {
        let entity = self.registry.create_entity();
        self.handle_of(entity)
    }

    /// Wrap an existing identifier in a handle bound to this core. The
    /// identifier is not checked; a handle to a dead entity simply fails
    /// its operations.
    pub fn handle_of(&self, entity: Entity) -> EntityHandle {
        EntityHandle::new(entity, Arc::downgrade(&self.tag))
    }

    /// Destroy an entity. Idempotent; `Ok(false)` when already dead.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<bool> {
        self.registry.destroy_entity(entity)
    }

    /// Destroy every entity. Resources and the schedule are untouched.
    pub fn clear_entities(&mut self) -> Result<()> {
        self.registry.clear()
    }

    /// Direct access to the registry, for component operations on raw
    /// [`Entity`] identifiers.
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    /// Iterate every entity owning all component types in `Q`. The closure
    /// gets the core back, so systems can read resources or create entities
    /// mid-iteration; structural mutation of iterated storage is rejected
    /// with [`Error::StructuralMutation`].
    pub fn view<Q: ViewParam>(
        &mut self,
        mut f: impl FnMut(&mut Core, Entity, Q::Item<'_>),
    ) -> Result<()> {
        self.registry.begin_view::<Q>()?;
        let mut cols = self.registry.checkout_columns::<Q>();
        for entity in Q::candidates(&cols).to_vec() {
            if let Some(item) = Q::fetch(&mut cols, entity) {
                f(self, entity, item);
            }
        }
        self.registry.restore_columns::<Q>(cols);
        self.registry.end_view();
        Ok(())
    }

    // ── Resources ────────────────────────────────────────────────────

    /// Register a typed singleton. One instance per type;
    /// [`Error::DuplicateResource`] otherwise.
    pub fn register_resource<R: 'static + Send + Sync>(&mut self, resource: R) -> Result<()> {
        self.resources.register(resource)
    }

    pub fn resource<R: 'static + Send + Sync>(&self) -> Result<&R> {
        self.resources.get::<R>()
    }

    pub fn resource_mut<R: 'static + Send + Sync>(&mut self) -> Result<&mut R> {
        self.resources.get_mut::<R>()
    }

    /// Remove a resource, returning it.
    pub fn remove_resource<R: 'static + Send + Sync>(&mut self) -> Result<R> {
        self.resources.remove::<R>()
    }

    pub fn has_resource<R: 'static + Send + Sync>(&self) -> bool {
        self.resources.has::<R>()
    }

    // ── Schedule ─────────────────────────────────────────────────────

    /// Insert a phase into the schedule. Fails with [`Error::ScheduleInUse`]
    /// when called from inside a running system.
    pub fn add_phase(&mut self, name: &str, position: PhasePosition<'_>) -> Result<()> {
        self.scheduler_mut()?.add_phase(name, position)
    }

    /// Append a system to a phase.
    pub fn add_system<S: System + 'static>(
        &mut self,
        phase: &str,
        name: &str,
        system: S,
    ) -> Result<()> {
        self.scheduler_mut()?.add_system(phase, name, system)
    }

    /// Append a system whose errors are handed to `handler` instead of
    /// aborting the tick.
    pub fn add_system_with_error_handler<S: System + 'static>(
        &mut self,
        phase: &str,
        name: &str,
        system: S,
        handler: impl FnMut(&mut Core, &Error) + 'static,
    ) -> Result<()> {
        self.scheduler_mut()?
            .add_system_with_error_handler(phase, name, system, handler)
    }

    pub fn has_phase(&self, name: &str) -> bool {
        self.scheduler.as_ref().is_some_and(|s| s.has_phase(name))
    }

    fn scheduler_mut(&mut self) -> Result<&mut Scheduler> {
        self.scheduler.as_mut().ok_or(Error::ScheduleInUse)
    }

    // ── Plugins ──────────────────────────────────────────────────────

    /// Queue a plugin. Binding happens in [`bind_plugins`](Self::bind_plugins)
    /// (or at the top of [`run`](Self::run)), in add order, once per type.
    pub fn add_plugin<P: Plugin>(&mut self, plugin: P) {
        self.plugins.add(plugin);
    }

    /// Whether a plugin type has been added, bound or not.
    pub fn has_plugin<P: Plugin>(&self) -> bool {
        self.plugins.has::<P>()
    }

    /// Bind every queued plugin in add order. Plugins added during the pass
    /// are bound in the same pass. The first failure aborts binding, wrapped
    /// in [`Error::MissingPlugin`].
    pub fn bind_plugins(&mut self) -> Result<()> {
        while let Some((name, plugin)) = self.plugins.next_unbound() {
            info!("binding plugin `{name}`");
            plugin.build(self).map_err(|source| Error::MissingPlugin {
                plugin: name,
                source: Box::new(source),
            })?;
        }
        Ok(())
    }

    // ── Temporary components ─────────────────────────────────────────

    /// Mark component type `T` as temporary: every instance of it is
    /// detached from every entity at the end of the current tick.
    pub fn mark_temporary<T: 'static + Send + Sync>(&mut self) {
        let tid = TypeId::of::<T>();
        if self.temporary.iter().any(|(t, _)| *t == tid) {
            return;
        }
        self.temporary.push((tid, EntityRegistry::detach_all_of::<T>));
    }

    /// Sweep every marked temporary type now. Runs automatically at the end
    /// of each tick.
    pub fn clear_temporary_components(&mut self) -> Result<()> {
        for (_, sweep) in std::mem::take(&mut self.temporary) {
            sweep(&mut self.registry)?;
        }
        Ok(())
    }

    // ── Main loop ────────────────────────────────────────────────────

    /// Execute one tick of the schedule, then sweep temporary components.
    ///
    /// The schedule is checked out for the duration, so systems that try to
    /// mutate it fail with [`Error::ScheduleInUse`].
    pub fn run_once(&mut self) -> Result<()> {
        let mut scheduler = self.scheduler.take().ok_or(Error::ScheduleInUse)?;
        let ticked = scheduler.tick(self);
        self.scheduler = Some(scheduler);
        let swept = self.clear_temporary_components();
        ticked.and(swept)
    }

    /// Bind queued plugins, then tick until [`stop`](Self::stop) is called
    /// or a system fails. The `Shutdown` phase runs exactly once on the way
    /// out, on both paths.
    ///
    /// A stop requested before `run` is called is honored: no tick executes,
    /// pending `Startup` systems are discarded, and `Shutdown` still runs.
    pub fn run(&mut self) -> Result<()> {
        self.bind_plugins()?;
        info!("core running");
        let mut outcome = Ok(());
        if self.stop_requested {
            if let Some(scheduler) = self.scheduler.as_mut() {
                scheduler.discard_startup();
            }
        } else {
            self.running = true;
            while !self.stop_requested {
                if let Err(err) = self.run_once() {
                    error!("tick failed, shutting down: {err}");
                    outcome = Err(err);
                    break;
                }
            }
            self.running = false;
        }
        self.stop_requested = false;
        self.run_shutdown();
        info!("core stopped");
        outcome
    }

    /// Request the main loop to exit after the current tick. Idempotent.
    /// Called before [`run`](Self::run), it makes the loop exit without
    /// ticking, discarding pending `Startup` systems.
    pub fn stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn run_shutdown(&mut self) {
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.run_shutdown(self);
            self.scheduler = Some(scheduler);
        }
    }
}

impl Default for Core {
    fn default() -> Self {
        Self::new()
    }
}

/// Teardown runs the `Shutdown` phase even when the host never calls
/// [`Core::run`] — a core driven by [`Core::run_once`] still gets its
/// shutdown systems on drop. The phase is drained when it runs, so a core
/// that already shut down via `run` runs nothing here.
impl Drop for Core {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        self.run_shutdown();
    }
}
