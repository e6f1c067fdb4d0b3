//! Burst read FIFO: reservation-counted FIFO filled by the AXI burst
//! reader, drained through a wide-to-narrow downsizer.
//!
//! `reserve_count` covers words in the FIFO plus words promised to
//! bursts already requested: +burst length per reservation, -1 per wide
//! word moved into the downsizer. `wr_burst_avail` asserts while at least
//! one more burst fits in the remaining space.

use fifo_cdc::SyncFifo;

use crate::config::MemoryConfig;

/// Reservation-counted read FIFO with width conversion.
#[derive(Debug, Clone)]
pub struct BurstReadFifo {
    fifo: SyncFifo<u64>,
    depth: i32,
    burst_len: u32,
    ratio: u32,
    narrow_bits: u32,
    narrow_mask: u64,

    shift: u64,
    /// Narrow words left in the downsizer.
    remaining: u32,

    reserve_count: i32,
    burst_avail: bool,
}

impl BurstReadFifo {
    #[must_use]
    pub fn new(config: &MemoryConfig) -> Self {
        let mut fifo = Self {
            fifo: SyncFifo::new(config.fifo_depth()),
            depth: config.fifo_depth() as i32,
            burst_len: config.burst_len(),
            ratio: config.ratio(),
            narrow_bits: config.narrow_width_bits(),
            narrow_mask: config.narrow_mask(),
            shift: 0,
            remaining: 0,
            reserve_count: 0,
            burst_avail: false,
        };
        fifo.reset();
        fifo
    }

    pub fn reset(&mut self) {
        self.fifo.reset();
        self.shift = 0;
        self.remaining = 0;
        self.reserve_count = 0;
        self.burst_avail = self.depth >= self.burst_len as i32;
    }

    /// Room for one more burst beyond everything already claimed.
    #[must_use]
    pub fn wr_burst_avail(&self) -> bool {
        self.burst_avail
    }

    #[must_use]
    pub fn reserve_count(&self) -> i32 {
        self.reserve_count
    }

    /// No narrow word is visible.
    #[must_use]
    pub fn empty(&self) -> bool {
        self.remaining == 0
    }

    /// Head narrow word, valid when `!empty()`.
    #[must_use]
    pub fn rd_data(&self) -> u64 {
        self.shift & self.narrow_mask
    }

    /// Wide words held in the FIFO, excluding the downsizer.
    #[must_use]
    pub fn occupancy(&self) -> u32 {
        self.fifo.occupancy()
    }

    /// Advance one edge.
    ///
    /// `reserve` claims space for one burst; `wr` stores a wide word from
    /// the memory; `rd_en` pops the head narrow word.
    pub fn tick(&mut self, reserve: bool, wr: Option<u64>, rd_en: bool) {
        debug_assert!(!rd_en || !self.empty(), "burst read FIFO read while empty");

        let pop = rd_en && self.remaining > 0;
        let left = self.remaining - u32::from(pop);
        let load = left == 0 && !self.fifo.empty();
        if load {
            self.shift = self.fifo.rd_data();
            self.remaining = self.ratio;
        } else {
            if pop && self.ratio > 1 {
                self.shift >>= self.narrow_bits;
            }
            self.remaining = left;
        }
        self.fifo.tick(wr, load);

        let claimed = if reserve { self.burst_len as i32 } else { 0 };
        let count_next = self.reserve_count + claimed - i32::from(load);
        debug_assert!(
            count_next <= self.depth,
            "read reservations exceed FIFO depth"
        );
        self.reserve_count = count_next;
        self.burst_avail = self.depth - count_next >= self.burst_len as i32;
    }
}
