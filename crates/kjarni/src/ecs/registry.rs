//! # Entity Registry — The ECS Store
//!
//! The [`EntityRegistry`] owns all entities and their components. Entities
//! are generational identifiers; components live in one sparse-set column
//! per component type:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ EntityRegistry                                       │
//! │                                                      │
//! │  EntityAllocator: identity lifecycle (free list +    │
//! │                   generation counters)               │
//! │                                                      │
//! │  columns: HashMap<TypeId, SparseColumn>              │
//! │    one dense column per component type, each with    │
//! │    its own entity-index → row map                    │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Attaching or detaching a component touches exactly one column; the
//! entity's other components never move. A view over `(A, B)` walks the
//! smaller of the two columns and checks the other per entity.
//!
//! ## Structural Lock
//!
//! While a view has columns checked out, attach, detach, and destroy would
//! invalidate the rows being iterated. The registry counts live views and
//! rejects structural mutation with
//! [`Error::StructuralMutation`](crate::error::Error::StructuralMutation)
//! for the duration.

use std::any::TypeId;
use std::collections::HashMap;

use log::debug;

use super::component::SparseColumn;
use super::entity::{Entity, EntityAllocator};
use super::view::ViewParam;
use crate::error::{Error, Result};

/// The ECS store: entity identities plus components keyed by
/// (entity, component type).
pub struct EntityRegistry {
    allocator: EntityAllocator,
    /// One column per component type.
    columns: HashMap<TypeId, SparseColumn>,
    /// Number of live views. Structural mutation is rejected while nonzero.
    view_depth: u32,
}

impl EntityRegistry {
    /// Create a registry pre-sized for `capacity` entities.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            allocator: EntityAllocator::with_capacity(capacity),
            columns: HashMap::new(),
            view_depth: 0,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    // ── Entity lifecycle ─────────────────────────────────────────────

    /// Create a fresh entity with no components. Recycles an index whose
    /// generation has advanced when one is free.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        debug!("[{entity}] create entity");
        entity
    }

    /// Destroy an entity: every component is detached and the generation is
    /// bumped, invalidating all outstanding identifiers.
    ///
    /// Idempotent — returns `Ok(false)` when the entity is already dead.
    /// Rejected while a view is live.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<bool> {
        if !self.allocator.is_alive(entity) {
            return Ok(false);
        }
        self.check_unlocked("destroy")?;
        debug!("[{entity}] destroy entity");

        for column in self.columns.values_mut() {
            column.remove(entity);
        }
        self.allocator.release(entity);
        Ok(true)
    }

    /// Destroy every entity. Component destructors run; identities are
    /// recycled with advanced generations.
    pub fn clear(&mut self) -> Result<()> {
        self.check_unlocked("clear")?;
        self.columns.clear();
        self.allocator.release_all();
        Ok(())
    }

    /// True iff the index is within capacity and the stored generation
    /// matches.
    pub fn is_valid(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.allocator.live_count()
    }

    // ── Component access ─────────────────────────────────────────────

    /// Attach a component. If a component of the same type is already
    /// present its value is replaced (last write wins).
    pub fn attach<T: 'static + Send + Sync>(&mut self, entity: Entity, component: T) -> Result<()> {
        self.check_alive(entity)?;
        self.check_unlocked(std::any::type_name::<T>())?;
        debug!("[{entity}] attach `{}`", std::any::type_name::<T>());

        self.columns
            .entry(TypeId::of::<T>())
            .or_default()
            .insert(entity, component);
        Ok(())
    }

    /// Detach a component, dropping its value.
    ///
    /// Returns `Ok(false)` when the component was absent (no-op).
    pub fn detach<T: 'static + Send + Sync>(&mut self, entity: Entity) -> Result<bool> {
        self.check_alive(entity)?;
        self.check_unlocked(std::any::type_name::<T>())?;

        let Some(column) = self.columns.get_mut(&TypeId::of::<T>()) else {
            return Ok(false);
        };
        if !column.remove(entity) {
            return Ok(false);
        }
        debug!("[{entity}] detach `{}`", std::any::type_name::<T>());
        Ok(true)
    }

    /// Detach a component type from every entity that carries it. Returns
    /// the number of entities affected.
    pub fn detach_all_of<T: 'static + Send + Sync>(&mut self) -> Result<usize> {
        self.check_unlocked(std::any::type_name::<T>())?;
        Ok(self
            .columns
            .remove(&TypeId::of::<T>())
            .map_or(0, |column| column.len()))
    }

    /// Shared reference to a component.
    pub fn get<T: 'static + Send + Sync>(&self, entity: Entity) -> Result<&T> {
        self.check_alive(entity)?;
        self.try_get(entity).ok_or(Error::MissingComponent {
            entity,
            type_name: std::any::type_name::<T>(),
        })
    }

    /// Mutable reference to a component.
    pub fn get_mut<T: 'static + Send + Sync>(&mut self, entity: Entity) -> Result<&mut T> {
        self.check_alive(entity)?;
        self.try_get_mut(entity).ok_or(Error::MissingComponent {
            entity,
            type_name: std::any::type_name::<T>(),
        })
    }

    /// Shared reference to a component; `None` when the entity is dead or
    /// the component is absent.
    pub fn try_get<T: 'static + Send + Sync>(&self, entity: Entity) -> Option<&T> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        self.columns.get(&TypeId::of::<T>())?.get(entity)
    }

    /// Mutable reference to a component; `None` when the entity is dead or
    /// the component is absent.
    pub fn try_get_mut<T: 'static + Send + Sync>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        self.columns.get_mut(&TypeId::of::<T>())?.get_mut(entity)
    }

    /// Whether the entity carries a component of type `T`.
    pub fn has<T: 'static + Send + Sync>(&self, entity: Entity) -> Result<bool> {
        self.check_alive(entity)?;
        Ok(self
            .columns
            .get(&TypeId::of::<T>())
            .is_some_and(|column| column.contains(entity)))
    }

    /// Collect every entity carrying a component of type `T`.
    pub fn entities_with<T: 'static + Send + Sync>(&self) -> Vec<Entity> {
        self.columns
            .get(&TypeId::of::<T>())
            .map_or_else(Vec::new, |column| column.entities().to_vec())
    }

    // ── Views ────────────────────────────────────────────────────────

    /// Iterate every entity owning all component types listed in `Q`.
    ///
    /// The closure receives `(Entity, Q::Item)` per matching entity.
    /// Iteration order is unspecified but stable between structural changes.
    /// Rejected while another view is already live, and when `Q` names the
    /// same component type twice.
    ///
    /// ```ignore
    /// registry.view::<(&mut Position, &Velocity)>(|_, (pos, vel)| {
    ///     pos.x += vel.dx;
    /// })?;
    /// ```
    pub fn view<Q: ViewParam>(&mut self, mut f: impl FnMut(Entity, Q::Item<'_>)) -> Result<()> {
        self.begin_view::<Q>()?;
        let mut cols = self.checkout_columns::<Q>();
        for entity in Q::candidates(&cols).to_vec() {
            if let Some(item) = Q::fetch(&mut cols, entity) {
                f(entity, item);
            }
        }
        self.restore_columns::<Q>(cols);
        self.end_view();
        Ok(())
    }

    /// Mark a view as live. Fails when a view is already in progress
    /// (nested views are unsupported), or when `Q` lists the same component
    /// type more than once — a column can only be checked out by one
    /// parameter at a time.
    pub(crate) fn begin_view<Q: ViewParam>(&mut self) -> Result<()> {
        let mut ids = Q::type_ids();
        let requested = ids.len();
        ids.sort();
        ids.dedup();
        if ids.len() != requested {
            return Err(Error::StructuralMutation {
                type_name: std::any::type_name::<Q>(),
            });
        }
        if self.view_depth > 0 {
            return Err(Error::StructuralMutation {
                type_name: std::any::type_name::<Q>(),
            });
        }
        self.view_depth += 1;
        Ok(())
    }

    pub(crate) fn end_view(&mut self) {
        self.view_depth -= 1;
    }

    /// Check the view's columns out of the registry. Only callable after
    /// [`begin_view`](Self::begin_view) accepted `Q`.
    pub(crate) fn checkout_columns<Q: ViewParam>(&mut self) -> Q::Column {
        Q::extract(&mut self.columns)
    }

    /// Check the view's columns back in.
    pub(crate) fn restore_columns<Q: ViewParam>(&mut self, cols: Q::Column) {
        Q::restore(cols, &mut self.columns);
    }

    // ── Internals ────────────────────────────────────────────────────

    fn check_alive(&self, entity: Entity) -> Result<()> {
        if self.allocator.is_alive(entity) {
            Ok(())
        } else {
            Err(Error::InvalidEntity { entity })
        }
    }

    fn check_unlocked(&self, type_name: &'static str) -> Result<()> {
        if self.view_depth > 0 {
            Err(Error::StructuralMutation { type_name })
        } else {
            Ok(())
        }
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
