//! # kjarni
//!
//! A minimal plugin-driven application kernel: generational entities with
//! sparse-set component storage, typed singleton resources, a phase-ordered
//! scheduler, and plugins that compose all three behind a single [`Core`]
//! facade.
//!
//! ```no_run
//! use kjarni::prelude::*;
//!
//! struct Position { x: f32 }
//! struct Velocity { dx: f32 }
//!
//! fn main() -> kjarni::Result<()> {
//!     let mut core = Core::new();
//!     core.add_plugin(TimePlugin);
//!
//!     let player = core.create_entity();
//!     player.attach(&mut core, Position { x: 0.0 })?;
//!     player.attach(&mut core, Velocity { dx: 1.5 })?;
//!
//!     core.add_system(UPDATE, "integrate", |core: &mut Core| {
//!         let dt = core.resource::<Time>()?.delta_secs();
//!         core.view::<(&mut Position, &Velocity)>(|_, _, (pos, vel)| {
//!             pos.x += vel.dx * dt;
//!         })
//!     })?;
//!
//!     core.run()
//! }
//! ```
//!
//! [`Core`]: core::Core

pub mod config;
pub mod core;
pub mod ecs;
pub mod error;
pub mod handle;
pub mod plugin;
pub mod resource;
pub mod schedule;
pub mod time;

pub use error::{Error, Result};

/// The common imports: `use kjarni::prelude::*;`.
pub mod prelude {
    pub use crate::config::CoreConfig;
    pub use crate::core::Core;
    pub use crate::ecs::{Entity, EntityRegistry, ViewParam};
    pub use crate::error::{Error, Result};
    pub use crate::handle::EntityHandle;
    pub use crate::plugin::Plugin;
    pub use crate::schedule::{
        PhasePosition, POST_UPDATE, PRE_UPDATE, RENDER, SHUTDOWN, STARTUP, System, UPDATE,
    };
    pub use crate::time::{Time, TimePlugin};
}
