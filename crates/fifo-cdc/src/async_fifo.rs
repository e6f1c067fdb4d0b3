//! Dual-clock FIFO with Gray-coded pointer synchronization.
//!
//! Each side keeps a binary pointer one bit wider than the RAM address
//! and publishes its Gray-coded copy. The opposite domain samples that
//! copy through a chain of synchronizer registers, so it only ever sees a
//! pointer that is stale, never one that is torn.
//!
//! - full (write domain): the next write Gray pointer equals the
//!   synchronized read pointer with its two most significant bits
//!   inverted.
//! - RAM empty (read domain): the next read Gray pointer equals the
//!   synchronized write pointer.
//!
//! The read side is first-word-fall-through: an output register is
//! refilled from RAM whenever it is empty or being drained.

use log::warn;

use crate::gray::bin_to_gray;

/// Write-domain inputs for one write-clock edge.
#[derive(Debug, Clone, Copy)]
pub struct WritePort<T> {
    pub en: bool,
    pub data: T,
}

/// Read-domain inputs for one read-clock edge.
#[derive(Debug, Clone, Copy)]
pub struct ReadPort {
    pub en: bool,
}

/// Asynchronous FWFT FIFO.
#[derive(Debug, Clone)]
pub struct AsyncFifo<T> {
    cells: Vec<T>,
    addr_bits: u32,

    // Write domain.
    wbin: u32,
    wgray: u32,
    wfull: bool,
    /// Read pointer synchronizer chain; the last stage is the one compared.
    rgray_sync: Vec<u32>,
    overflows: u64,

    // Read domain.
    rbin: u32,
    rgray: u32,
    /// RAM holds no word the read side can see.
    rempty: bool,
    /// Write pointer synchronizer chain.
    wgray_sync: Vec<u32>,
    out_valid: bool,
    out_data: T,
}

impl<T: Copy + Default> AsyncFifo<T> {
    /// Create a FIFO of `2^depth_log2` words with `sync_stages` registers
    /// in each pointer synchronizer.
    ///
    /// # Panics
    ///
    /// Panics if `depth_log2` is outside `1..=16` or `sync_stages < 2`.
    #[must_use]
    pub fn new(depth_log2: u32, sync_stages: usize) -> Self {
        assert!(
            (1..=16).contains(&depth_log2),
            "async FIFO depth_log2 must be 1..=16, got {depth_log2}"
        );
        assert!(sync_stages >= 2, "pointer synchronizers need at least 2 stages");
        Self {
            cells: vec![T::default(); 1 << depth_log2],
            addr_bits: depth_log2,
            wbin: 0,
            wgray: 0,
            wfull: false,
            rgray_sync: vec![0; sync_stages],
            overflows: 0,
            rbin: 0,
            rgray: 0,
            rempty: true,
            wgray_sync: vec![0; sync_stages],
            out_valid: false,
            out_data: T::default(),
        }
    }

    /// Reset both domains.
    pub fn reset(&mut self) {
        self.wbin = 0;
        self.wgray = 0;
        self.wfull = false;
        self.rgray_sync.fill(0);
        self.rbin = 0;
        self.rgray = 0;
        self.rempty = true;
        self.wgray_sync.fill(0);
        self.out_valid = false;
        self.out_data = T::default();
    }

    #[must_use]
    pub fn depth(&self) -> u32 {
        1 << self.addr_bits
    }

    fn ptr_mask(&self) -> u32 {
        (1 << (self.addr_bits + 1)) - 1
    }

    /// Full, as seen by the write domain.
    #[must_use]
    pub fn full(&self) -> bool {
        self.wfull
    }

    /// No word visible at the output, as seen by the read domain.
    #[must_use]
    pub fn empty(&self) -> bool {
        !self.out_valid
    }

    /// Head of the FIFO, valid when `!empty()`.
    #[must_use]
    pub fn rd_data(&self) -> T {
        self.out_data
    }

    /// Writes dropped because the FIFO was full.
    #[must_use]
    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    /// Binary write pointer (write domain).
    #[must_use]
    pub fn write_pointer(&self) -> u32 {
        self.wbin
    }

    /// Binary read pointer (read domain).
    #[must_use]
    pub fn read_pointer(&self) -> u32 {
        self.rbin
    }

    /// Words in RAM from a global viewpoint no single domain has.
    #[must_use]
    pub fn ram_occupancy(&self) -> u32 {
        self.wbin.wrapping_sub(self.rbin) & self.ptr_mask()
    }

    /// Advance one master tick.
    ///
    /// Both synchronizers sample the opposite domain's Gray pointer as it
    /// was before this tick, so coincident edges see each other's old
    /// state.
    pub fn tick(&mut self, write: Option<WritePort<T>>, read: Option<ReadPort>) {
        let rgray_seen = self.rgray;
        let wgray_seen = self.wgray;

        if let Some(port) = write {
            self.write_edge(port, rgray_seen);
        }
        if let Some(port) = read {
            self.read_edge(port, wgray_seen);
        }
    }

    fn write_edge(&mut self, port: WritePort<T>, rgray_seen: u32) {
        let push = port.en && !self.wfull;
        if port.en && self.wfull {
            self.overflows += 1;
            if self.overflows == 1 {
                warn!("async FIFO overflow: write dropped while full");
            }
        }
        if push {
            let mask = self.depth() - 1;
            self.cells[(self.wbin & mask) as usize] = port.data;
        }

        let ptr_mask = self.ptr_mask();
        let wbin_next = (self.wbin + u32::from(push)) & ptr_mask;
        let wgray_next = bin_to_gray(wbin_next);
        let rq = self.rgray_sync[self.rgray_sync.len() - 1];
        let top_two = 0b11 << (self.addr_bits - 1);
        self.wfull = wgray_next == (rq ^ top_two);
        self.wbin = wbin_next;
        self.wgray = wgray_next;

        self.rgray_sync.rotate_right(1);
        self.rgray_sync[0] = rgray_seen;
    }

    fn read_edge(&mut self, port: ReadPort, wgray_seen: u32) {
        let pop = port.en && self.out_valid;
        let fetch = !self.rempty && (!self.out_valid || pop);
        if fetch {
            let mask = self.depth() - 1;
            self.out_data = self.cells[(self.rbin & mask) as usize];
        }
        self.out_valid = fetch || (self.out_valid && !pop);

        let rbin_next = (self.rbin + u32::from(fetch)) & self.ptr_mask();
        let rgray_next = bin_to_gray(rbin_next);
        let wq = self.wgray_sync[self.wgray_sync.len() - 1];
        self.rempty = rgray_next == wq;
        self.rbin = rbin_next;
        self.rgray = rgray_next;

        self.wgray_sync.rotate_right(1);
        self.wgray_sync[0] = wgray_seen;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(v: u8) -> Option<WritePort<u8>> {
        Some(WritePort { en: true, data: v })
    }

    const IDLE_WRITE: Option<WritePort<u8>> = Some(WritePort { en: false, data: 0 });
    const IDLE_READ: Option<ReadPort> = Some(ReadPort { en: false });

    #[test]
    fn word_crosses_after_synchronizer_latency() {
        let mut fifo = AsyncFifo::<u8>::new(2, 2);
        fifo.tick(write(0x5A), IDLE_READ);
        let mut edges = 0;
        while fifo.empty() {
            fifo.tick(IDLE_WRITE, IDLE_READ);
            edges += 1;
            assert!(edges < 10, "word never crossed");
        }
        // Two sync stages, the RAM-empty register and the output register.
        assert_eq!(edges, 4);
        assert_eq!(fifo.rd_data(), 0x5A);
    }

    #[test]
    fn fills_to_depth_then_reports_full() {
        let mut fifo = AsyncFifo::<u8>::new(2, 2);
        for v in 0..4 {
            assert!(!fifo.full());
            fifo.tick(write(v), None);
        }
        assert!(fifo.full());
        fifo.tick(write(99), None);
        assert_eq!(fifo.overflows(), 1);
        assert_eq!(fifo.ram_occupancy(), 4);
    }

    #[test]
    fn drains_in_order_across_domains() {
        let mut fifo = AsyncFifo::<u8>::new(3, 2);
        for v in 0..6 {
            fifo.tick(write(v), None);
        }
        let mut out = Vec::new();
        for _ in 0..40 {
            let en = !fifo.empty();
            if en {
                out.push(fifo.rd_data());
            }
            fifo.tick(IDLE_WRITE, Some(ReadPort { en }));
        }
        assert_eq!(out, vec![0, 1, 2, 3, 4, 5]);
        assert!(fifo.empty());
    }

    #[test]
    fn full_clears_once_reads_synchronize_back() {
        let mut fifo = AsyncFifo::<u8>::new(1, 2);
        fifo.tick(write(1), None);
        fifo.tick(write(2), None);
        assert!(fifo.full());
        // Let the write pointer reach the read side, then pop one word.
        for _ in 0..4 {
            fifo.tick(None, IDLE_READ);
        }
        assert!(!fifo.empty());
        fifo.tick(None, Some(ReadPort { en: true }));
        let mut edges = 0;
        while fifo.full() {
            fifo.tick(IDLE_WRITE, None);
            edges += 1;
            assert!(edges < 10);
        }
        assert!(edges >= 2);
    }
}
