//! FIFO and clock-domain-crossing primitives.
//!
//! Every primitive is a registered model: outputs are read from state
//! latched on the previous edge, and `tick` advances one edge with the
//! inputs sampled at that edge. Dual-clock primitives take an optional
//! input per domain; `Some` means that domain has an edge on this master
//! tick.

pub mod async_fifo;
pub mod gray;
pub mod pulse_sync;
pub mod ram;
pub mod reset_sync;
pub mod sync_fifo;

pub use async_fifo::{AsyncFifo, ReadPort, WritePort};
pub use pulse_sync::PulseSync;
pub use ram::SyncRam;
pub use reset_sync::ResetSync;
pub use sync_fifo::SyncFifo;
