//! Trait for models that can be advanced by master clock ticks.

use crate::Ticks;

/// A model that can be advanced by master clock ticks.
///
/// Implemented by top-level designs that own their clock domains. Leaf
/// components take their inputs explicitly on each edge instead.
pub trait Tickable {
    /// Advance the model by one master clock tick.
    ///
    /// Each clock domain does work only on the ticks where it has an edge.
    fn tick(&mut self);

    /// Advance the model by multiple ticks.
    ///
    /// Default implementation calls `tick()` in a loop.
    fn tick_n(&mut self, count: Ticks) {
        for _ in 0..count.get() {
            self.tick();
        }
    }
}
