//! Core traits and types for cycle-accurate hardware models.
//!
//! Every model advances on the edges of a master clock. Clock domains are
//! integer divisions of that clock; a component only does work on the
//! edges of the domain it lives in.

mod clock;
mod observable;
mod tickable;

pub use clock::{ClockDomain, MasterClock, Ticks};
pub use observable::{Observable, Value};
pub use tickable::Tickable;
