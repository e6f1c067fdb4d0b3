//! Fixed-length AXI4 burst masters for a streaming frame buffer.
//!
//! The write path accepts narrow words, packs them into bus words and
//! writes them out in fixed-length INCR bursts, with one shorter burst to
//! drain the remainder on flush. The read path requests fixed-length
//! bursts whenever its FIFO can take a whole one and unpacks bus words
//! back into narrow words.
//!
//! Both paths pair a reservation-counted FIFO with a protocol engine, so a
//! burst only starts once everything it needs is guaranteed: the writer's
//! data is already in its FIFO, the reader's space is already set aside.
//! Neither side ever stalls mid-burst.
//!
//! [`AxiRam`] models the memory controller on the other side of both
//! ports.

pub mod channel;
pub mod config;
pub mod memory_reader;
pub mod memory_writer;
pub mod ram;
pub mod read_fifo;
pub mod reader;
pub mod write_fifo;
pub mod writer;

pub use channel::{
    AddrBeat, BurstKind, ReadBeat, ReadMaster, ReadSlave, Resp, WriteBeat, WriteMaster,
    WriteResp, WriteSlave,
};
pub use config::{BOUNDARY_BYTES, ConfigError, MemoryConfig};
pub use memory_reader::MemoryReader;
pub use memory_writer::{Flush, MemoryWriter};
pub use ram::{AxiRam, BurstRecord, Channel, ProtocolStats};
pub use read_fifo::BurstReadFifo;
pub use reader::{AxiBurstReader, ReaderStats};
pub use write_fifo::{BurstWriteFifo, WriteFifoInputs};
pub use writer::{AxiBurstWriter, WriterInputs, WriterStats};
