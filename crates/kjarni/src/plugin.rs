//! Plugins bundle registration work — resources, phases, systems, other
//! plugins — behind one [`Plugin::build`] call.
//!
//! Plugins are queued on the core and *bound* in one pass, in the order they
//! were added. A plugin added while the pass runs (a transitive dependency)
//! is bound in the same pass, after the plugins already queued. A plugin
//! type is only ever bound once; re-adding it logs a warning and is a no-op.

use std::any::{TypeId, type_name};

use log::warn;

use crate::core::Core;
use crate::error::Result;

/// A unit of composition. `build` receives the core and registers whatever
/// the plugin contributes.
pub trait Plugin: 'static {
    fn build(&self, core: &mut Core) -> Result<()>;

    /// Human-readable name used in logs and bind errors. Defaults to the
    /// type name.
    fn name(&self) -> &str {
        type_name::<Self>()
    }
}

struct QueuedPlugin {
    id: TypeId,
    name: String,
    plugin: Box<dyn Plugin>,
}

/// Queue of added plugins plus the record of which types are already bound.
#[derive(Default)]
pub(crate) struct PluginLoader {
    queue: Vec<QueuedPlugin>,
    bound: Vec<TypeId>,
}

impl PluginLoader {
    /// Queue a plugin for binding. Duplicates (already queued or already
    /// bound) are skipped with a warning.
    pub(crate) fn add<P: Plugin>(&mut self, plugin: P) {
        let id = TypeId::of::<P>();
        if self.bound.contains(&id) || self.queue.iter().any(|q| q.id == id) {
            warn!("plugin `{}` already added, skipping", plugin.name());
            return;
        }
        self.queue.push(QueuedPlugin {
            id,
            name: plugin.name().to_string(),
            plugin: Box::new(plugin),
        });
    }

    /// Whether a plugin type has been added (queued or bound).
    pub(crate) fn has<P: Plugin>(&self) -> bool {
        let id = TypeId::of::<P>();
        self.bound.contains(&id) || self.queue.iter().any(|q| q.id == id)
    }

    /// Dequeue the next plugin to bind, recording it as bound. The caller
    /// runs `build` without holding a borrow of the loader, so transitive
    /// `add` calls from inside `build` land in this same queue.
    pub(crate) fn next_unbound(&mut self) -> Option<(String, Box<dyn Plugin>)> {
        if self.queue.is_empty() {
            return None;
        }
        let queued = self.queue.remove(0);
        self.bound.push(queued.id);
        Some((queued.name, queued.plugin))
    }
}
