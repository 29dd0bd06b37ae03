//! Startup configuration for a [`Core`](crate::core::Core).
//!
//! Serde-friendly so hosts can load it from a file; every field has a
//! sensible default and `CoreConfig::default()` is what
//! [`Core::new`](crate::core::Core::new) uses.

use serde::{Deserialize, Serialize};

use crate::schedule::default_phase_order;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Entity slots reserved up front by the registry.
    pub initial_entity_capacity: usize,
    /// Phase names in execution order.
    pub phase_order: Vec<String>,
    /// Run the `Startup` phase on every tick instead of draining it after
    /// the first. Off by default.
    pub run_startup_phase_every_frame: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            initial_entity_capacity: 1024,
            phase_order: default_phase_order(),
            run_startup_phase_every_frame: false,
        }
    }
}
