//! # Component Storage — Sparse-Set Columns
//!
//! Components are plain data attached to entities. Each component type gets
//! one [`SparseColumn`]: a dense array of values plus a sparse map from
//! entity index to dense row. Unlike an archetype layout, attaching or
//! detaching a component touches exactly one column and never moves the
//! entity's other components.
//!
//! ```text
//! SparseColumn for Position
//!   rows:      { 4 → 0, 9 → 1, 2 → 2 }   entity index → dense row
//!   entities:  [ 4v0,   9v2,   2v1 ]     parallel to data
//!   data:      [ p_a,   p_b,   p_c ]     dense, swap-removed
//! ```
//!
//! Values are boxed `dyn Any` so the registry can hold a heterogeneous map
//! of columns keyed by `TypeId` with zero unsafe; typed access downcasts at
//! the edges. Reads verify the stored entity's generation, so a stale
//! identifier that happens to share a slot index never aliases the new
//! entity's data.

use std::any::Any;
use std::collections::HashMap;

use super::entity::Entity;

/// Storage for every instance of one component type.
#[derive(Default)]
pub struct SparseColumn {
    /// Entity index → row in the dense arrays.
    rows: HashMap<u32, usize>,
    /// Owning entity per row, parallel to `data`.
    entities: Vec<Entity>,
    data: Vec<Box<dyn Any + Send + Sync>>,
}

impl SparseColumn {
    /// Attach a value to an entity. An existing value of this entity is
    /// replaced in place (last write wins); returns `true` when the entity
    /// was not in the column before.
    pub fn insert<T: 'static + Send + Sync>(&mut self, entity: Entity, value: T) -> bool {
        match self.row_of(entity) {
            Some(row) => {
                self.data[row] = Box::new(value);
                false
            }
            None => {
                let row = self.entities.len();
                self.rows.insert(entity.index(), row);
                self.entities.push(entity);
                self.data.push(Box::new(value));
                true
            }
        }
    }

    /// Detach an entity's value, dropping it. Swap-removes the row, so the
    /// last entity in the column takes its place. Returns `false` when the
    /// entity had no value here.
    pub fn remove(&mut self, entity: Entity) -> bool {
        let Some(row) = self.row_of(entity) else {
            return false;
        };
        self.rows.remove(&entity.index());
        self.entities.swap_remove(row);
        self.data.swap_remove(row);
        if row < self.entities.len() {
            self.rows.insert(self.entities[row].index(), row);
        }
        true
    }

    pub fn get<T: 'static>(&self, entity: Entity) -> Option<&T> {
        let row = self.row_of(entity)?;
        self.data[row].downcast_ref()
    }

    pub fn get_mut<T: 'static>(&mut self, entity: Entity) -> Option<&mut T> {
        let row = self.row_of(entity)?;
        self.data[row].downcast_mut()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.row_of(entity).is_some()
    }

    /// Every entity carrying this component, in dense-row order. The order
    /// is unspecified but stable while no insert/remove happens.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Dense row for a *live* match: index known and generation agreeing.
    fn row_of(&self, entity: Entity) -> Option<usize> {
        let &row = self.rows.get(&entity.index())?;
        (self.entities[row] == entity).then_some(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(index: u32, generation: u32) -> Entity {
        Entity { index, generation }
    }

    #[test]
    fn insert_then_read_back() {
        let mut col = SparseColumn::default();
        assert!(col.insert(entity(3, 0), 1.5f32));
        assert_eq!(col.get::<f32>(entity(3, 0)), Some(&1.5));
        assert!(col.contains(entity(3, 0)));
        assert!(!col.contains(entity(4, 0)));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut col = SparseColumn::default();
        assert!(col.insert(entity(0, 0), 10u32));
        assert!(!col.insert(entity(0, 0), 99u32));
        assert_eq!(col.get::<u32>(entity(0, 0)), Some(&99));
        assert_eq!(col.len(), 1);
    }

    #[test]
    fn remove_swaps_last_row_and_stays_addressable() {
        let mut col = SparseColumn::default();
        col.insert(entity(0, 0), "a");
        col.insert(entity(1, 0), "b");
        col.insert(entity(2, 0), "c");

        assert!(col.remove(entity(0, 0)));
        assert!(!col.remove(entity(0, 0)));
        assert_eq!(col.len(), 2);
        // The swapped-in entity is still reachable through the sparse map.
        assert_eq!(col.get::<&str>(entity(2, 0)), Some(&"c"));
        assert_eq!(col.get::<&str>(entity(1, 0)), Some(&"b"));
    }

    #[test]
    fn stale_generation_does_not_alias_recycled_slot() {
        let mut col = SparseColumn::default();
        col.insert(entity(5, 1), 7i64);
        // Same slot index, older generation.
        assert_eq!(col.get::<i64>(entity(5, 0)), None);
        assert!(!col.contains(entity(5, 0)));
        assert!(!col.remove(entity(5, 0)));
        assert_eq!(col.len(), 1);
    }

    #[test]
    fn mutation_writes_through() {
        let mut col = SparseColumn::default();
        col.insert(entity(1, 0), vec![1u8]);
        col.get_mut::<Vec<u8>>(entity(1, 0)).unwrap().push(2);
        assert_eq!(col.get::<Vec<u8>>(entity(1, 0)), Some(&vec![1u8, 2]));
    }

    #[test]
    fn drop_runs_when_values_are_removed() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static DROPS: AtomicUsize = AtomicUsize::new(0);

        struct Tracked;
        impl Drop for Tracked {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::SeqCst);
            }
        }

        DROPS.store(0, Ordering::SeqCst);
        let mut col = SparseColumn::default();
        col.insert(entity(0, 0), Tracked);
        col.insert(entity(1, 0), Tracked);
        col.remove(entity(0, 0));
        assert_eq!(DROPS.load(Ordering::SeqCst), 1);
        drop(col);
        assert_eq!(DROPS.load(Ordering::SeqCst), 2);
    }
}
