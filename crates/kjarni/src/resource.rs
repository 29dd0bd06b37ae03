//! # Resource Store — Typed Singletons
//!
//! Resources are engine-wide services not tied to any entity: a window, a
//! renderer context, a scene manager, an asset cache. The store keeps at most
//! one instance per type, keyed by [`TypeId`], and exclusively owns it.
//!
//! Resources are typically created before the main loop, in dependency order
//! driven by plugin binding. Teardown runs in **reverse insertion order** so
//! a resource may safely hold on to services registered before it.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use log::debug;

use crate::error::{Error, Result};

/// A typed singleton map: at most one instance per resource type.
pub struct ResourceStore {
    values: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    /// Insertion order, used for reverse-order teardown.
    order: Vec<TypeId>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a resource instance.
    ///
    /// Fails with [`Error::DuplicateResource`] when an instance of `T` is
    /// already stored.
    pub fn register<T: 'static + Send + Sync>(&mut self, value: T) -> Result<()> {
        let tid = TypeId::of::<T>();
        if self.values.contains_key(&tid) {
            return Err(Error::DuplicateResource {
                type_name: std::any::type_name::<T>(),
            });
        }
        debug!("register resource `{}`", std::any::type_name::<T>());
        self.values.insert(tid, Box::new(value));
        self.order.push(tid);
        Ok(())
    }

    /// Shared reference to the stored instance.
    pub fn get<T: 'static + Send + Sync>(&self) -> Result<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
            .ok_or(Error::MissingResource {
                type_name: std::any::type_name::<T>(),
            })
    }

    /// Mutable reference to the stored instance.
    pub fn get_mut<T: 'static + Send + Sync>(&mut self) -> Result<&mut T> {
        self.values
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut::<T>())
            .ok_or(Error::MissingResource {
                type_name: std::any::type_name::<T>(),
            })
    }

    /// Tear down the instance and take ownership of it. Subsequent `get`
    /// calls fail with [`Error::MissingResource`].
    ///
    /// Also useful for the extract/reinsert pattern when a resource must be
    /// borrowed alongside the rest of the core.
    pub fn remove<T: 'static + Send + Sync>(&mut self) -> Result<T> {
        let tid = TypeId::of::<T>();
        let boxed = self.values.remove(&tid).ok_or(Error::MissingResource {
            type_name: std::any::type_name::<T>(),
        })?;
        self.order.retain(|&t| t != tid);
        debug!("remove resource `{}`", std::any::type_name::<T>());
        // The downcast cannot fail: the map is keyed by TypeId.
        Ok(*boxed.downcast::<T>().unwrap_or_else(|_| unreachable!()))
    }

    /// Whether an instance of `T` is stored.
    pub fn has<T: 'static + Send + Sync>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for ResourceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ResourceStore {
    /// Drop resources in reverse insertion order, so later resources may
    /// depend on earlier ones until the moment they are destroyed.
    fn drop(&mut self) {
        while let Some(tid) = self.order.pop() {
            self.values.remove(&tid);
        }
    }
}
