//! Single-clock first-word-fall-through FIFO.
//!
//! Storage is a [`SyncRam`] addressed by binary pointers one bit wider than
//! the address, so a full RAM and an empty RAM are distinguishable. The
//! RAM read register doubles as the FWFT output stage: whenever the RAM
//! holds data and the output stage is empty or being drained, the next
//! word is pre-fetched and becomes visible one edge later.

use crate::ram::SyncRam;

/// FWFT synchronous FIFO.
#[derive(Debug, Clone)]
pub struct SyncFifo<T> {
    ram: SyncRam<T>,
    depth: u32,
    wr_ptr: u32,
    rd_ptr: u32,
    /// Output stage holds a valid word.
    out_valid: bool,
    /// `almost_full` asserts when at most this many RAM slots remain.
    almost_full_margin: u32,
}

impl<T: Copy + Default> SyncFifo<T> {
    /// Create a FIFO with `depth` RAM slots.
    ///
    /// # Panics
    ///
    /// Panics if `depth` is not a power of two or is below 2.
    #[must_use]
    pub fn new(depth: u32) -> Self {
        assert!(
            depth >= 2 && depth.is_power_of_two(),
            "FIFO depth must be a power of two >= 2, got {depth}"
        );
        Self {
            ram: SyncRam::new(depth as usize),
            depth,
            wr_ptr: 0,
            rd_ptr: 0,
            out_valid: false,
            almost_full_margin: 1,
        }
    }

    /// Set the number of free slots at which `almost_full` asserts.
    #[must_use]
    pub fn with_almost_full_margin(mut self, margin: u32) -> Self {
        self.almost_full_margin = margin.min(self.depth);
        self
    }

    pub fn reset(&mut self) {
        self.wr_ptr = 0;
        self.rd_ptr = 0;
        self.out_valid = false;
    }

    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    fn ptr_mask(&self) -> u32 {
        (self.depth << 1) - 1
    }

    /// Words held in RAM (excluding the output stage).
    #[must_use]
    pub fn ram_count(&self) -> u32 {
        self.wr_ptr.wrapping_sub(self.rd_ptr) & self.ptr_mask()
    }

    /// Words held in total, including the output stage.
    #[must_use]
    pub fn occupancy(&self) -> u32 {
        self.ram_count() + u32::from(self.out_valid)
    }

    #[must_use]
    pub fn full(&self) -> bool {
        self.ram_count() == self.depth
    }

    #[must_use]
    pub fn almost_full(&self) -> bool {
        self.depth - self.ram_count() <= self.almost_full_margin
    }

    /// No word is visible at the output.
    #[must_use]
    pub fn empty(&self) -> bool {
        !self.out_valid
    }

    /// The word at the head of the FIFO, valid when `!empty()`.
    #[must_use]
    pub fn rd_data(&self) -> T {
        self.ram.q()
    }

    /// Advance one edge.
    ///
    /// `write` pushes a word; `rd_en` pops the visible head. Writing while
    /// full or reading while empty is a logic error in the caller.
    pub fn tick(&mut self, write: Option<T>, rd_en: bool) {
        debug_assert!(
            write.is_none() || !self.full(),
            "sync FIFO written while full"
        );
        debug_assert!(!rd_en || self.out_valid, "sync FIFO read while empty");

        let push = write.filter(|_| !self.full());
        let pop = rd_en && self.out_valid;
        let prefetch = self.ram_count() > 0 && (!self.out_valid || pop);

        let mask = self.depth - 1;
        let write_port = push.map(|data| ((self.wr_ptr & mask) as usize, data));
        let read_port = prefetch.then_some((self.rd_ptr & mask) as usize);
        self.ram.tick(write_port, read_port);

        let ptr_mask = self.ptr_mask();
        if push.is_some() {
            self.wr_ptr = (self.wr_ptr + 1) & ptr_mask;
        }
        if prefetch {
            self.rd_ptr = (self.rd_ptr + 1) & ptr_mask;
        }
        self.out_valid = prefetch || (self.out_valid && !pop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_word_falls_through() {
        let mut fifo = SyncFifo::<u32>::new(4);
        assert!(fifo.empty());
        fifo.tick(Some(11), false);
        // In RAM, not yet visible.
        assert!(fifo.empty());
        assert_eq!(fifo.occupancy(), 1);
        fifo.tick(None, false);
        assert!(!fifo.empty());
        assert_eq!(fifo.rd_data(), 11);
    }

    #[test]
    fn sustains_one_word_per_edge() {
        let mut fifo = SyncFifo::<u32>::new(8);
        for v in 0..4 {
            fifo.tick(Some(v), false);
        }
        fifo.tick(None, false);
        let mut out = Vec::new();
        while !fifo.empty() {
            out.push(fifo.rd_data());
            fifo.tick(None, true);
        }
        assert_eq!(out, vec![0, 1, 2, 3]);
    }

    #[test]
    fn full_counts_ram_slots_only() {
        let mut fifo = SyncFifo::<u8>::new(4).with_almost_full_margin(1);
        for v in 0..4 {
            assert!(!fifo.full());
            fifo.tick(Some(v), false);
        }
        // One word moved to the output stage on the second edge.
        assert_eq!(fifo.ram_count(), 3);
        assert!(fifo.almost_full());
        fifo.tick(Some(4), false);
        assert!(fifo.full());
        assert_eq!(fifo.occupancy(), 5);
    }

    #[test]
    fn simultaneous_read_and_write() {
        let mut fifo = SyncFifo::<u16>::new(4);
        fifo.tick(Some(1), false);
        fifo.tick(Some(2), false);
        assert_eq!(fifo.rd_data(), 1);
        fifo.tick(Some(3), true);
        assert_eq!(fifo.rd_data(), 2);
        fifo.tick(None, true);
        assert_eq!(fifo.rd_data(), 3);
        fifo.tick(None, true);
        assert!(fifo.empty());
        assert_eq!(fifo.occupancy(), 0);
    }

    #[test]
    fn reset_empties() {
        let mut fifo = SyncFifo::<u16>::new(2);
        fifo.tick(Some(9), false);
        fifo.tick(None, false);
        fifo.reset();
        assert!(fifo.empty());
        assert_eq!(fifo.occupancy(), 0);
    }
}
