//! Frame timing as a resource.
//!
//! [`TimePlugin`] registers a [`Time`] resource and a `PreUpdate` system
//! that advances it once per tick, so every later phase observes the same
//! delta. `Time` also carries an optional fixed-step accumulator for
//! systems that want deterministic step sizes (physics, replays):
//!
//! ```ignore
//! core.add_system(UPDATE, "physics", |core: &mut Core| {
//!     while core.resource_mut::<Time>()?.consume_fixed_step() {
//!         step_physics(core)?;
//!     }
//!     Ok(())
//! })?;
//! ```

use std::time::{Duration, Instant};

use crate::core::Core;
use crate::error::Result;
use crate::plugin::Plugin;
use crate::schedule::PRE_UPDATE;

struct FixedStep {
    step: Duration,
    accumulator: Duration,
}

/// Wall-clock timing for the current tick.
pub struct Time {
    last_tick: Instant,
    delta: Duration,
    elapsed: Duration,
    tick_count: u64,
    fixed: Option<FixedStep>,
}

impl Time {
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            tick_count: 0,
            fixed: None,
        }
    }

    /// Measure the time since the previous tick and advance the clock.
    /// Called once per tick by [`TimePlugin`]'s `PreUpdate` system.
    pub fn update(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_tick;
        self.last_tick = now;
        self.advance(delta);
    }

    /// Advance the clock by an explicit delta. Useful for deterministic
    /// stepping outside the main loop.
    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.elapsed += delta;
        self.tick_count += 1;
        if let Some(fixed) = &mut self.fixed {
            fixed.accumulator += delta;
        }
    }

    /// Time elapsed between the two most recent ticks.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Total time accumulated across all ticks.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Ticks observed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Fixed stepping ───────────────────────────────────────────────

    /// Enable the fixed-step accumulator at `hz` steps per second. Resets
    /// any accumulated time.
    pub fn set_fixed_rate(&mut self, hz: u32) {
        self.fixed = Some(FixedStep {
            step: Duration::from_secs(1) / hz.max(1),
            accumulator: Duration::ZERO,
        });
    }

    /// The configured fixed step, if any.
    pub fn fixed_step(&self) -> Option<Duration> {
        self.fixed.as_ref().map(|f| f.step)
    }

    /// Consume one fixed step from the accumulator. Returns `true` while a
    /// full step is available; call in a loop to catch up after a long
    /// frame. Always `false` when no fixed rate is set.
    pub fn consume_fixed_step(&mut self) -> bool {
        match &mut self.fixed {
            Some(fixed) if fixed.accumulator >= fixed.step => {
                fixed.accumulator -= fixed.step;
                true
            }
            _ => false,
        }
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

/// Registers [`Time`] and the `PreUpdate` system that advances it.
pub struct TimePlugin;

impl Plugin for TimePlugin {
    fn build(&self, core: &mut Core) -> Result<()> {
        core.register_resource(Time::new())?;
        core.add_system(PRE_UPDATE, "update_time", |core: &mut Core| {
            core.resource_mut::<Time>()?.update();
            Ok(())
        })
    }
}
