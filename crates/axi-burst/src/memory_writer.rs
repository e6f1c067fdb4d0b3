//! Memory writer: burst write FIFO plus AXI burst writer.
//!
//! Exposes a narrow streaming input with a `full` flag, a base pointer
//! applied at reset and two flush controls. `Flush::pad` completes a
//! partial wide word; `Flush::burst` lets the writer issue the final short
//! burst. The burst flush is held off while a partial word is still being
//! padded, so it always sees the complete remainder.

use log::warn;

use crate::channel::{WriteBeat, WriteMaster, WriteSlave};
use crate::config::MemoryConfig;
use crate::write_fifo::{BurstWriteFifo, WriteFifoInputs};
use crate::writer::{AxiBurstWriter, WriterInputs, WriterStats};

/// End-of-stream controls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flush {
    pub pad: bool,
    pub burst: bool,
}

impl Flush {
    pub const NONE: Self = Self {
        pad: false,
        burst: false,
    };
    pub const ALL: Self = Self {
        pad: true,
        burst: true,
    };
}

#[derive(Debug, Clone)]
pub struct MemoryWriter {
    fifo: BurstWriteFifo,
    writer: AxiBurstWriter,
    strb: u8,
}

impl MemoryWriter {
    #[must_use]
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            fifo: BurstWriteFifo::new(config),
            writer: AxiBurstWriter::new(config),
            strb: ((1u16 << config.bus_bytes()) - 1) as u8,
        }
    }

    /// Clear the FIFO and restart the writer at `base`. The memory is
    /// assumed to be reset alongside, or idle.
    ///
    /// # Panics
    ///
    /// Panics if `base` is not 4 KiB aligned.
    pub fn reset(&mut self, base: u32) {
        self.warn_if_busy();
        self.fifo.reset();
        self.writer.reset(base);
    }

    /// Clear the FIFO and restart at `base` while the memory keeps
    /// running. Bursts the memory has accepted are completed with
    /// strobe-less beats.
    ///
    /// # Panics
    ///
    /// Panics if `base` is not 4 KiB aligned.
    pub fn reset_at_edge(&mut self, base: u32, slave: &WriteSlave) {
        self.warn_if_busy();
        self.fifo.reset();
        self.writer.reset_at_edge(base, slave);
    }

    fn warn_if_busy(&self) {
        if !self.writer.is_idle() {
            warn!(
                "memory writer reset with a burst in flight at {:#010X}",
                self.writer.next_addr()
            );
        }
    }

    /// Do not present a narrow word while this is set.
    #[must_use]
    pub fn full(&self) -> bool {
        self.fifo.full()
    }

    #[must_use]
    pub fn master(&self) -> WriteMaster {
        WriteMaster {
            aw: self.writer.aw(),
            w: self.writer.w_valid().then(|| {
                let draining = self.writer.draining();
                WriteBeat {
                    data: if draining { 0 } else { self.fifo.rd_data() },
                    strb: if draining { 0 } else { self.strb },
                    last: self.writer.w_last(),
                }
            }),
            bready: true,
        }
    }

    #[must_use]
    pub fn error(&self) -> bool {
        self.writer.error()
    }

    #[must_use]
    pub fn stats(&self) -> WriterStats {
        self.writer.stats()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.writer.is_idle()
    }

    #[must_use]
    pub fn fifo(&self) -> &BurstWriteFifo {
        &self.fifo
    }

    #[must_use]
    pub fn writer(&self) -> &AxiBurstWriter {
        &self.writer
    }

    /// Advance one memory-clock edge.
    pub fn tick(&mut self, wr: Option<u64>, flush: Flush, slave: &WriteSlave) {
        let w_fire = self.writer.w_valid() && !self.writer.draining() && slave.wready;
        debug_assert!(
            !w_fire || self.fifo.rd_valid(),
            "AXI writer sent a beat the FIFO did not hold"
        );

        let inputs = WriterInputs {
            burst_avail: self.fifo.burst_avail(),
            reserve_count: self.fifo.reserve_count(),
            flush: flush.burst && !self.fifo.has_partial(),
        };
        let reserve = self.writer.tick(&inputs, slave);
        self.fifo.tick(WriteFifoInputs {
            wr,
            flush: flush.pad,
            rd_en: w_fire,
            reserve,
        });
    }
}
