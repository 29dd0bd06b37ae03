//! # Scheduler — Ordered Phases of Systems
//!
//! The scheduler is an ordered list of named *phases*; each phase is an
//! ordered list of *systems*. One [`tick`](Scheduler::tick) executes every
//! phase in declared order and, within a phase, every system in registration
//! order. There is no dependency inference — insertion order is authoritative.
//!
//! ## Phase Conventions
//!
//! The kernel ships the default order [`STARTUP`], [`PRE_UPDATE`],
//! [`UPDATE`], [`POST_UPDATE`], [`RENDER`], [`SHUTDOWN`]:
//!
//! - `Startup` runs on the first tick only and is drained afterwards
//!   (opt out with `run_startup_phase_every_frame` in
//!   [`CoreConfig`](crate::config::CoreConfig)).
//! - `Shutdown` never runs during a tick; the core executes it once at
//!   teardown, including when an error escapes the main loop.
//!
//! ## Failure
//!
//! Systems return [`Result`]; the first error aborts the remaining systems
//! of the current phase and the remaining phases of the tick, and propagates
//! to the caller wrapped in [`Error::System`]. A system registered with an
//! error handler is the exception: its error is handed to the handler and
//! the tick continues.

use log::{error, warn};

use crate::core::Core;
use crate::error::{Error, Result};

/// Phase that runs once, on the first tick.
pub const STARTUP: &str = "Startup";
pub const PRE_UPDATE: &str = "PreUpdate";
pub const UPDATE: &str = "Update";
pub const POST_UPDATE: &str = "PostUpdate";
pub const RENDER: &str = "Render";
/// Phase reserved for core teardown; skipped by [`Scheduler::tick`].
pub const SHUTDOWN: &str = "Shutdown";

/// The phase order a default-configured core ships with.
pub fn default_phase_order() -> Vec<String> {
    [STARTUP, PRE_UPDATE, UPDATE, POST_UPDATE, RENDER, SHUTDOWN]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// A side-effecting operation executed once per tick, in phase order.
///
/// Any `FnMut(&mut Core) -> Result<()>` is a system, so closures and function
/// items work directly.
pub trait System {
    fn run(&mut self, core: &mut Core) -> Result<()>;
}

impl<F: FnMut(&mut Core) -> Result<()>> System for F {
    fn run(&mut self, core: &mut Core) -> Result<()> {
        (self)(core)
    }
}

/// Callback invoked with a failed system's error instead of aborting the tick.
pub type ErrorHandler = Box<dyn FnMut(&mut Core, &Error)>;

struct NamedSystem {
    name: String,
    system: Box<dyn System>,
    on_error: Option<ErrorHandler>,
}

/// Where to insert a phase relative to the existing order.
#[derive(Debug, Clone, Copy)]
pub enum PhasePosition<'a> {
    Front,
    Back,
    Before(&'a str),
    After(&'a str),
}

/// A named, ordered group of systems.
pub struct Phase {
    name: String,
    systems: Vec<NamedSystem>,
}

impl Phase {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            systems: Vec::new(),
        }
    }

    /// Run the systems in registration order, fail-fast on the first
    /// unhandled error.
    fn run(&mut self, core: &mut Core) -> Result<()> {
        for ns in &mut self.systems {
            if let Err(err) = ns.system.run(core) {
                match &mut ns.on_error {
                    Some(handler) => {
                        warn!("system `{}/{}` failed, handled: {err}", self.name, ns.name);
                        handler(core, &err);
                    }
                    None => {
                        return Err(Error::System {
                            phase: self.name.clone(),
                            system: ns.name.clone(),
                            source: Box::new(err),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Ordered collection of named phases. One [`tick`](Self::tick) per frame.
pub struct Scheduler {
    phases: Vec<Phase>,
    run_startup_every_tick: bool,
    startup_done: bool,
}

impl Scheduler {
    /// Build a scheduler with the given phase order.
    pub fn new(phase_order: &[String], run_startup_every_tick: bool) -> Self {
        Self {
            phases: phase_order.iter().map(Phase::new).collect(),
            run_startup_every_tick,
            startup_done: false,
        }
    }

    /// Insert a phase at the given position.
    ///
    /// Duplicate names are rejected with [`Error::DuplicatePhase`]; a
    /// `Before`/`After` anchor that does not exist fails with
    /// [`Error::MissingPhase`].
    pub fn add_phase(&mut self, name: &str, position: PhasePosition<'_>) -> Result<()> {
        if self.has_phase(name) {
            return Err(Error::DuplicatePhase { phase: name.into() });
        }
        let index = match position {
            PhasePosition::Front => 0,
            PhasePosition::Back => self.phases.len(),
            PhasePosition::Before(anchor) => self.phase_index(anchor)?,
            PhasePosition::After(anchor) => self.phase_index(anchor)? + 1,
        };
        self.phases.insert(index, Phase::new(name));
        Ok(())
    }

    /// Append a system to a phase. Fails with [`Error::MissingPhase`] when
    /// the phase does not exist.
    pub fn add_system<S: System + 'static>(
        &mut self,
        phase: &str,
        name: &str,
        system: S,
    ) -> Result<()> {
        self.push_system(phase, name, Box::new(system), None)
    }

    /// Append a system paired with an error handler. When the system fails,
    /// the handler receives the error and the tick continues.
    pub fn add_system_with_error_handler<S: System + 'static>(
        &mut self,
        phase: &str,
        name: &str,
        system: S,
        handler: impl FnMut(&mut Core, &Error) + 'static,
    ) -> Result<()> {
        self.push_system(phase, name, Box::new(system), Some(Box::new(handler)))
    }

    fn push_system(
        &mut self,
        phase: &str,
        name: &str,
        system: Box<dyn System>,
        on_error: Option<ErrorHandler>,
    ) -> Result<()> {
        let index = self.phase_index(phase)?;
        self.phases[index].systems.push(NamedSystem {
            name: name.into(),
            system,
            on_error,
        });
        Ok(())
    }

    fn phase_index(&self, name: &str) -> Result<usize> {
        self.phases
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| Error::MissingPhase { phase: name.into() })
    }

    pub fn has_phase(&self, name: &str) -> bool {
        self.phases.iter().any(|p| p.name == name)
    }

    /// Phase names in execution order.
    pub fn phase_names(&self) -> Vec<&str> {
        self.phases.iter().map(|p| p.name.as_str()).collect()
    }

    /// Number of systems registered in a phase.
    pub fn system_count(&self, phase: &str) -> Result<usize> {
        let index = self.phase_index(phase)?;
        Ok(self.phases[index].systems.len())
    }

    /// Execute one tick: all phases in order, systems in registration order.
    ///
    /// The `Shutdown` phase is skipped; `Startup` is drained after its first
    /// run unless the scheduler was built with `run_startup_every_tick`.
    pub(crate) fn tick(&mut self, core: &mut Core) -> Result<()> {
        let startup_done = self.startup_done;
        let drain_startup = !self.run_startup_every_tick;
        for phase in &mut self.phases {
            if phase.name == SHUTDOWN {
                continue;
            }
            if phase.name == STARTUP {
                if startup_done && drain_startup {
                    continue;
                }
                let result = phase.run(core);
                if drain_startup {
                    self.startup_done = true;
                    phase.systems.clear();
                }
                result?;
            } else {
                phase.run(core)?;
            }
        }
        Ok(())
    }

    /// Drop pending `Startup` systems without running them. Used when a
    /// stop lands before the first tick.
    pub(crate) fn discard_startup(&mut self) {
        self.startup_done = true;
        if let Some(index) = self.phases.iter().position(|p| p.name == STARTUP) {
            self.phases[index].systems.clear();
        }
    }

    /// Execute and drain the `Shutdown` phase. Every shutdown system runs
    /// even when an earlier one fails; failures are logged, not propagated,
    /// so teardown always completes.
    pub(crate) fn run_shutdown(&mut self, core: &mut Core) {
        let Some(index) = self.phases.iter().position(|p| p.name == SHUTDOWN) else {
            return;
        };
        let mut systems = std::mem::take(&mut self.phases[index].systems);
        for ns in &mut systems {
            if let Err(err) = ns.system.run(core) {
                error!("shutdown system `{}` failed: {err}", ns.name);
            }
        }
    }
}
