//! # View Parameters — Typed Access for Iteration
//!
//! A view iterates every entity that owns all of the requested component
//! types. [`ViewParam`] describes what a view fetches per entity: `&T` for
//! shared reads, `&mut T` for writes, and tuples of either to combine them,
//! so `(&Position, &mut Velocity)` just works.
//!
//! ## The Extract/Restore Pattern
//!
//! Rust's `Iterator` trait can't express "yielded items borrow from the
//! iterator" without unsafe lending-iterator tricks. Instead, views are
//! closure-based: the needed columns are temporarily *removed* from the
//! registry's column map, giving owned access that satisfies the borrow
//! checker, and restored once iteration finishes. While columns are checked
//! out, the registry rejects structural mutation (see
//! [`EntityRegistry`](super::registry::EntityRegistry)).
//!
//! Extraction is total: a component type no entity carries yields an empty
//! column, which simply matches nothing. The registry rejects a parameter
//! list naming the same type twice before extraction begins, so a column
//! can never be checked out by two parameters at once.

use std::any::TypeId;
use std::collections::HashMap;

use super::component::SparseColumn;
use super::entity::Entity;

/// A type that can be fetched from the registry's columns during a view.
///
/// Implemented for `&T` (shared read), `&mut T` (exclusive write), and tuples
/// of up to eight parameters.
pub trait ViewParam {
    /// The item yielded per entity.
    type Item<'w>;

    /// Owned column data extracted from the registry for the duration of
    /// the view.
    type Column;

    /// The component types this parameter requires.
    fn type_ids() -> Vec<TypeId>;

    /// Remove the needed column(s) from the registry's column map. A type
    /// with no column yet extracts as an empty column.
    fn extract(columns: &mut HashMap<TypeId, SparseColumn>) -> Self::Column;

    /// Put the column(s) back into the registry's column map.
    fn restore(col: Self::Column, columns: &mut HashMap<TypeId, SparseColumn>);

    /// Entities worth checking for a full match. For tuples this is the
    /// smallest member column, so iteration cost tracks the rarest type.
    fn candidates(col: &Self::Column) -> &[Entity];

    /// Fetch the item for one entity, or `None` when the entity is missing
    /// any of the requested components.
    fn fetch<'w>(col: &'w mut Self::Column, entity: Entity) -> Option<Self::Item<'w>>;
}

fn take_column<T: 'static>(
    columns: &mut HashMap<TypeId, SparseColumn>,
) -> (TypeId, SparseColumn) {
    let tid = TypeId::of::<T>();
    (tid, columns.remove(&tid).unwrap_or_default())
}

fn put_column(col: (TypeId, SparseColumn), columns: &mut HashMap<TypeId, SparseColumn>) {
    // Empty columns (absent types, or fully detached during the view)
    // are not worth keeping around.
    if !col.1.is_empty() {
        columns.insert(col.0, col.1);
    }
}

/// Shared read access to a component.
impl<T: 'static + Send + Sync> ViewParam for &T {
    type Item<'w> = &'w T;
    type Column = (TypeId, SparseColumn);

    fn type_ids() -> Vec<TypeId> {
        vec![TypeId::of::<T>()]
    }

    fn extract(columns: &mut HashMap<TypeId, SparseColumn>) -> Self::Column {
        take_column::<T>(columns)
    }

    fn restore(col: Self::Column, columns: &mut HashMap<TypeId, SparseColumn>) {
        put_column(col, columns);
    }

    fn candidates(col: &Self::Column) -> &[Entity] {
        col.1.entities()
    }

    fn fetch<'w>(col: &'w mut Self::Column, entity: Entity) -> Option<Self::Item<'w>> {
        col.1.get::<T>(entity)
    }
}

/// Exclusive write access to a component.
impl<T: 'static + Send + Sync> ViewParam for &mut T {
    type Item<'w> = &'w mut T;
    type Column = (TypeId, SparseColumn);

    fn type_ids() -> Vec<TypeId> {
        vec![TypeId::of::<T>()]
    }

    fn extract(columns: &mut HashMap<TypeId, SparseColumn>) -> Self::Column {
        take_column::<T>(columns)
    }

    fn restore(col: Self::Column, columns: &mut HashMap<TypeId, SparseColumn>) {
        put_column(col, columns);
    }

    fn candidates(col: &Self::Column) -> &[Entity] {
        col.1.entities()
    }

    fn fetch<'w>(col: &'w mut Self::Column, entity: Entity) -> Option<Self::Item<'w>> {
        col.1.get_mut::<T>(entity)
    }
}

/// Implement `ViewParam` for tuples of parameters, so a view can fetch
/// `(&A, &mut B, &C)` per entity.
macro_rules! impl_view_param_tuple {
    ($($P:ident),+) => {
        impl<$($P: ViewParam),+> ViewParam for ($($P,)+) {
            type Item<'w> = ($($P::Item<'w>,)+);
            type Column = ($($P::Column,)+);

            fn type_ids() -> Vec<TypeId> {
                let mut ids = Vec::new();
                $(ids.extend($P::type_ids());)+
                ids
            }

            #[allow(non_snake_case)]
            fn extract(columns: &mut HashMap<TypeId, SparseColumn>) -> Self::Column {
                ($($P::extract(columns),)+)
            }

            #[allow(non_snake_case)]
            fn restore(col: Self::Column, columns: &mut HashMap<TypeId, SparseColumn>) {
                let ($($P,)+) = col;
                $($P::restore($P, columns);)+
            }

            #[allow(non_snake_case)]
            fn candidates(col: &Self::Column) -> &[Entity] {
                let ($($P,)+) = col;
                let mut best: Option<&[Entity]> = None;
                $(
                    let cand = $P::candidates($P);
                    if best.map_or(true, |b| cand.len() < b.len()) {
                        best = Some(cand);
                    }
                )+
                best.unwrap_or(&[])
            }

            #[allow(non_snake_case)]
            fn fetch<'w>(col: &'w mut Self::Column, entity: Entity) -> Option<Self::Item<'w>> {
                let ($($P,)+) = col;
                Some(($($P::fetch($P, entity)?,)+))
            }
        }
    };
}

impl_view_param_tuple!(A);
impl_view_param_tuple!(A, B);
impl_view_param_tuple!(A, B, C);
impl_view_param_tuple!(A, B, C, D);
impl_view_param_tuple!(A, B, C, D, E);
impl_view_param_tuple!(A, B, C, D, E, F);
impl_view_param_tuple!(A, B, C, D, E, F, G);
impl_view_param_tuple!(A, B, C, D, E, F, G, H);
