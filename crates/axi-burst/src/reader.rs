//! AXI burst reader.
//!
//! When the read FIFO has room for a whole burst the reader claims that
//! room and presents AR until it is accepted. One burst is in flight at a
//! time. RREADY is held high: every returned beat already has a place in
//! the FIFO. An error response on any beat raises `error()` for one cycle.
//!
//! [`AxiBurstReader::reset`] assumes the slave was reset with it, so
//! nothing requested earlier will arrive. [`AxiBurstReader::reset_at_edge`]
//! restarts against a live slave: beats still due for bursts accepted up
//! to and including that edge are counted and dropped as they arrive.

use log::{trace, warn};

use crate::channel::{AddrBeat, ReadSlave};
use crate::config::{BOUNDARY_BYTES, MemoryConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Send,
}

/// What the reader hands to the read FIFO on one edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStep {
    /// Claim one burst of FIFO space.
    pub reserve: bool,
    /// Wide word returned by the memory.
    pub store: Option<u64>,
}

/// Running totals since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    pub bursts: u64,
    pub beats: u64,
    pub error_beats: u64,
    pub discarded_beats: u64,
}

/// Fixed-length AXI4 read master.
#[derive(Debug, Clone)]
pub struct AxiBurstReader {
    burst_len: u32,
    bus_bytes: u32,

    state: State,
    ar: AddrBeat,
    next_addr: u32,

    /// Beats still due for the accepted burst.
    beats_left: u32,
    /// Beats due for a burst abandoned by reset.
    discard: u32,
    burst_failed: bool,

    error: bool,
    stats: ReaderStats,
}

impl AxiBurstReader {
    #[must_use]
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            burst_len: config.burst_len(),
            bus_bytes: config.bus_bytes(),
            state: State::Idle,
            ar: AddrBeat::default(),
            next_addr: 0,
            beats_left: 0,
            discard: 0,
            burst_failed: false,
            error: false,
            stats: ReaderStats::default(),
        }
    }

    /// Return to idle and restart at `base`, forgetting every outstanding
    /// beat. Use when the slave is reset on the same edge.
    ///
    /// # Panics
    ///
    /// Panics if `base` is not 4 KiB aligned.
    pub fn reset(&mut self, base: u32) {
        assert!(
            base % BOUNDARY_BYTES == 0,
            "AXI reader base pointer {base:#010X} is not 4 KiB aligned"
        );
        self.discard = 0;
        self.state = State::Idle;
        self.ar = AddrBeat::default();
        self.next_addr = base;
        self.beats_left = 0;
        self.burst_failed = false;
        self.error = false;
    }

    /// Restart at `base` on an edge where `slave` keeps running.
    ///
    /// An AR accepted on this edge and an R beat handed over on it both
    /// still count: the accepted burst's beats and the rest of the current
    /// one are dropped when they arrive.
    ///
    /// # Panics
    ///
    /// Panics if `base` is not 4 KiB aligned.
    pub fn reset_at_edge(&mut self, base: u32, slave: &ReadSlave) {
        let mut due = self.beats_left;
        if self.state == State::Send && slave.arready {
            due += self.burst_len;
            self.stats.bursts += 1;
        }
        let mut discard = self.discard;
        if slave.r.is_some() {
            self.stats.discarded_beats += 1;
            if discard > 0 {
                discard -= 1;
            } else {
                due = due.saturating_sub(1);
            }
        }
        self.reset(base);
        self.discard = discard + due;
    }

    #[must_use]
    pub fn ar(&self) -> Option<AddrBeat> {
        (self.state == State::Send).then_some(self.ar)
    }

    /// One-cycle error pulse for an error read response.
    #[must_use]
    pub fn error(&self) -> bool {
        self.error
    }

    #[must_use]
    pub fn next_addr(&self) -> u32 {
        self.next_addr
    }

    #[must_use]
    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    /// Beats the slave still owes, kept or dropped.
    #[must_use]
    pub fn outstanding_beats(&self) -> u32 {
        self.beats_left + self.discard
    }

    /// No request outstanding and no beats due.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == State::Idle && self.beats_left == 0 && self.discard == 0
    }

    /// Advance one edge given the FIFO's `wr_burst_avail`.
    pub fn tick(&mut self, wr_burst_avail: bool, slave: &ReadSlave) -> ReadStep {
        let ar_fire = self.state == State::Send && slave.arready;
        let can_start = wr_burst_avail && self.beats_left == 0 && self.discard == 0;

        self.error = false;
        let mut store = None;
        if let Some(beat) = slave.r {
            if self.discard > 0 {
                self.discard -= 1;
                self.stats.discarded_beats += 1;
            } else {
                debug_assert!(self.beats_left > 0, "read data with no burst outstanding");
                debug_assert_eq!(beat.last, self.beats_left == 1, "RLAST misplaced");
                self.beats_left = self.beats_left.saturating_sub(1);
                self.stats.beats += 1;
                store = Some(beat.data);
                if beat.resp.is_error() {
                    self.error = true;
                    self.stats.error_beats += 1;
                    if !self.burst_failed {
                        warn!("AXI reader: read response {:?}", beat.resp);
                    }
                    self.burst_failed = true;
                }
            }
        }

        let mut reserve = false;
        match self.state {
            State::Idle => {
                if can_start {
                    self.ar = AddrBeat::incr(self.next_addr, self.burst_len, self.bus_bytes);
                    self.state = State::Send;
                    reserve = true;
                    trace!("AXI reader: burst at {:#010X}", self.next_addr);
                }
            }
            State::Send => {
                if ar_fire {
                    self.next_addr = self
                        .next_addr
                        .wrapping_add(self.burst_len * self.bus_bytes);
                    self.beats_left = self.burst_len;
                    self.burst_failed = false;
                    self.state = State::Idle;
                    self.stats.bursts += 1;
                }
            }
        }

        ReadStep { reserve, store }
    }
}
