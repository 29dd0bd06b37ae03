//! Generational entity handles, bound to the core that issued them.
//!
//! An [`EntityHandle`] pairs an [`Entity`] identifier with a weak token
//! identifying its core. Handles are cheap to clone, safe to hold after the
//! entity dies, and safe to hold after the core itself is dropped — every
//! operation re-validates both, and a handle presented to a *different*
//! core is rejected rather than resolving to an unrelated entity.

use std::sync::{Arc, Weak};

use log::debug;

use crate::core::Core;
use crate::ecs::Entity;
use crate::error::{Error, Result};

/// Identity token owned by a [`Core`]. Handles hold it weakly; pointer
/// equality proves a handle belongs to the core it is presented to.
pub(crate) struct CoreTag;

/// A clonable reference to one entity of one core.
#[derive(Clone)]
pub struct EntityHandle {
    entity: Entity,
    core: Weak<CoreTag>,
}

impl EntityHandle {
    pub(crate) fn new(entity: Entity, core: Weak<CoreTag>) -> Self {
        Self { entity, core }
    }

    /// The raw identifier, for registry calls and logging.
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Whether the issuing core still exists. A handle can outlive its core;
    /// operations on such a handle fail with [`Error::InvalidEntity`].
    pub fn core_alive(&self) -> bool {
        self.core.strong_count() > 0
    }

    /// True iff `core` is the issuing core and the entity is alive there.
    pub fn is_valid(&self, core: &Core) -> bool {
        self.check_core(core).is_ok() && core.registry().is_valid(self.entity)
    }

    /// Attach a component to the entity.
    pub fn attach<T: 'static + Send + Sync>(&self, core: &mut Core, component: T) -> Result<()> {
        self.check_core(core)?;
        core.registry_mut().attach(self.entity, component)
    }

    /// Attach a component and mark its type temporary, so it is swept from
    /// every entity at the end of the current tick.
    pub fn attach_temporary<T: 'static + Send + Sync>(
        &self,
        core: &mut Core,
        component: T,
    ) -> Result<()> {
        self.attach(core, component)?;
        debug!(
            "[{}] `{}` is temporary",
            self.entity,
            std::any::type_name::<T>()
        );
        core.mark_temporary::<T>();
        Ok(())
    }

    /// Detach a component. `Ok(false)` when it was absent.
    pub fn detach<T: 'static + Send + Sync>(&self, core: &mut Core) -> Result<bool> {
        self.check_core(core)?;
        core.registry_mut().detach::<T>(self.entity)
    }

    pub fn get<'c, T: 'static + Send + Sync>(&self, core: &'c Core) -> Result<&'c T> {
        self.check_core(core)?;
        core.registry().get::<T>(self.entity)
    }

    pub fn get_mut<'c, T: 'static + Send + Sync>(&self, core: &'c mut Core) -> Result<&'c mut T> {
        self.check_core(core)?;
        core.registry_mut().get_mut::<T>(self.entity)
    }

    pub fn has<T: 'static + Send + Sync>(&self, core: &Core) -> Result<bool> {
        self.check_core(core)?;
        core.registry().has::<T>(self.entity)
    }

    /// Destroy the entity. Idempotent; `Ok(false)` when already dead.
    pub fn destroy(&self, core: &mut Core) -> Result<bool> {
        self.check_core(core)?;
        core.registry_mut().destroy_entity(self.entity)
    }

    /// Reject handles whose core is gone or is not `core`.
    fn check_core(&self, core: &Core) -> Result<()> {
        match self.core.upgrade() {
            Some(tag) if Arc::ptr_eq(&tag, core.tag()) => Ok(()),
            _ => Err(Error::InvalidEntity {
                entity: self.entity,
            }),
        }
    }
}

impl std::fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityHandle")
            .field("entity", &self.entity)
            .field("core_alive", &self.core_alive())
            .finish()
    }
}
