//! Kernel error taxonomy.
//!
//! Every fallible kernel operation returns [`Result`]. All kernel errors are
//! fatal to the current tick: the scheduler aborts the running phase and the
//! error surfaces to the caller of [`Core::run_once`](crate::core::Core::run_once)
//! (wrapped in [`Error::System`] when it escaped a system). The kernel never
//! retries.

use crate::ecs::Entity;

/// Convenience alias used throughout the kernel.
pub type Result<T> = std::result::Result<T, Error>;

/// Every way a kernel operation can fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A resource of the requested type was never registered (or was removed).
    #[error("resource `{type_name}` is not registered")]
    MissingResource { type_name: &'static str },

    /// A resource of this type is already registered; at most one instance
    /// per type may exist in a core.
    #[error("resource `{type_name}` is already registered")]
    DuplicateResource { type_name: &'static str },

    /// A plugin's bind step failed, usually because a prerequisite registered
    /// by an earlier plugin is missing. Surfaces at bind time, before the
    /// main loop starts.
    #[error("plugin `{plugin}` failed to bind: {source}")]
    MissingPlugin {
        plugin: String,
        #[source]
        source: Box<Error>,
    },

    /// A system or phase insertion targeted a phase that does not exist.
    #[error("phase `{phase}` does not exist")]
    MissingPhase { phase: String },

    /// A phase with this name is already registered.
    #[error("phase `{phase}` is already registered")]
    DuplicatePhase { phase: String },

    /// The schedule cannot be modified while a tick is in flight.
    #[error("the schedule cannot be modified during a tick")]
    ScheduleInUse,

    /// Component access through a dead identifier, a foreign handle, or a
    /// handle whose core has been dropped.
    #[error("entity {entity} is not valid")]
    InvalidEntity { entity: Entity },

    /// Component access on a live entity that does not carry the component.
    #[error("entity {entity} has no component `{type_name}`")]
    MissingComponent {
        entity: Entity,
        type_name: &'static str,
    },

    /// Attach/detach/destroy attempted while a view over the component
    /// storage is live.
    #[error("`{type_name}`: structural mutation while a view is live")]
    StructuralMutation { type_name: &'static str },

    /// A system failed; carries the phase and system names for diagnosis.
    #[error("system `{phase}/{system}` failed: {source}")]
    System {
        phase: String,
        system: String,
        #[source]
        source: Box<Error>,
    },
}
