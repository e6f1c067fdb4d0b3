//! AXI burst writer.
//!
//! Two cooperating state machines share one start signal:
//!
//! - the address machine presents AW until it is accepted, then advances
//!   the write address by the burst's size;
//! - the data machine streams exactly the burst's beats on W with no gaps,
//!   asserting WLAST on the final one.
//!
//! A new burst starts only while the address machine is idle and no burst
//! is queued behind the one the data machine is sending. Its words are
//! claimed from the write FIFO on the same edge. Full bursts start when
//! the FIFO reports `burst_avail`; a single shorter flush burst drains the
//! remainder once per reset when `flush` is asserted.
//!
//! B is always accepted. An error response raises `error()` for one cycle
//! and is counted; the writer carries on with the next burst.
//!
//! AXI has no way to cancel a burst whose address was accepted. When the
//! writer restarts against a slave that keeps running
//! ([`AxiBurstWriter::reset_at_edge`]) it still owes those bursts their
//! data, so it sends the remaining beats with no strobes before any new
//! data. [`AxiBurstWriter::reset`] is for a slave reset on the same edge.

use std::collections::VecDeque;

use log::{debug, trace, warn};

use crate::channel::{AddrBeat, WriteSlave};
use crate::config::{BOUNDARY_BYTES, MemoryConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddrState {
    Idle,
    Send,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataState {
    Idle,
    Send,
}

/// Write-FIFO status sampled by the writer each edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterInputs {
    pub burst_avail: bool,
    pub reserve_count: i32,
    pub flush: bool,
}

/// Running totals since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Bursts whose address was accepted.
    pub bursts: u64,
    /// Of which were flush bursts.
    pub flush_bursts: u64,
    pub beats: u64,
    /// Strobe-less beats finishing bursts abandoned by a reset.
    pub drained_beats: u64,
    pub responses: u64,
    pub error_responses: u64,
}

/// Fixed-length AXI4 write master.
#[derive(Debug, Clone)]
pub struct AxiBurstWriter {
    burst_len: u32,
    bus_bytes: u32,

    addr_state: AddrState,
    aw: AddrBeat,
    next_addr: u32,

    data_state: DataState,
    beats_left: u32,
    /// Burst started while the data machine was still busy.
    pending: Option<u32>,
    /// Beats still owed to accepted bursts abandoned by a reset, oldest
    /// burst first.
    drain: VecDeque<u32>,

    flushed: bool,
    /// Bursts whose data has gone out but whose response has not come back.
    awaiting_response: u32,
    error: bool,
    stats: WriterStats,
}

impl AxiBurstWriter {
    #[must_use]
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            burst_len: config.burst_len(),
            bus_bytes: config.bus_bytes(),
            addr_state: AddrState::Idle,
            aw: AddrBeat::default(),
            next_addr: 0,
            data_state: DataState::Idle,
            beats_left: 0,
            pending: None,
            drain: VecDeque::new(),
            flushed: false,
            awaiting_response: 0,
            error: false,
            stats: WriterStats::default(),
        }
    }

    /// Return both state machines to idle and restart at `base`,
    /// forgetting every outstanding burst.
    ///
    /// # Panics
    ///
    /// Panics if `base` is not 4 KiB aligned.
    pub fn reset(&mut self, base: u32) {
        assert!(
            base % BOUNDARY_BYTES == 0,
            "AXI writer base pointer {base:#010X} is not 4 KiB aligned"
        );
        self.addr_state = AddrState::Idle;
        self.aw = AddrBeat::default();
        self.next_addr = base;
        self.data_state = DataState::Idle;
        self.beats_left = 0;
        self.pending = None;
        self.drain.clear();
        self.flushed = false;
        self.awaiting_response = 0;
        self.error = false;
    }

    /// Restart at `base` on an edge where `slave` keeps running.
    ///
    /// Handshakes completing on this edge still count. Bursts whose
    /// address has been accepted are finished with strobe-less beats and
    /// their responses are still collected; a burst whose address was
    /// never accepted is dropped.
    ///
    /// # Panics
    ///
    /// Panics if `base` is not 4 KiB aligned.
    pub fn reset_at_edge(&mut self, base: u32, slave: &WriteSlave) {
        let aw_fire = self.addr_state == AddrState::Send && slave.awready;
        let mut w_fire = self.w_valid() && slave.wready;

        if w_fire && self.draining() {
            self.drain_beat();
            w_fire = false;
        }
        let mut drain = std::mem::take(&mut self.drain);
        let mut awaiting = self.awaiting_response;
        if aw_fire {
            self.stats.bursts += 1;
            if self.aw.beats() < self.burst_len {
                self.stats.flush_bursts += 1;
            }
        }

        // The address machine is only ever busy with the newest burst.
        let newest_accepted = self.addr_state == AddrState::Idle || aw_fire;
        if self.data_state == DataState::Send {
            let current_accepted = self.pending.is_some() || newest_accepted;
            let left = self.beats_left - u32::from(w_fire);
            if w_fire {
                self.stats.beats += 1;
            }
            if current_accepted {
                if left > 0 {
                    drain.push_back(left);
                } else {
                    awaiting += 1;
                }
            }
            if let Some(beats) = self.pending.filter(|_| newest_accepted) {
                drain.push_back(beats);
            }
        }

        let error = slave.b.is_some_and(|b| b.resp.is_error());
        if let Some(b) = slave.b {
            self.stats.responses += 1;
            awaiting = awaiting.saturating_sub(1);
            if error {
                self.stats.error_responses += 1;
                warn!("AXI writer: write response {:?}", b.resp);
            }
        }

        self.reset(base);
        self.drain = drain;
        self.awaiting_response = awaiting;
        self.error = error;
    }

    /// AW payload while the address machine is sending.
    #[must_use]
    pub fn aw(&self) -> Option<AddrBeat> {
        (self.addr_state == AddrState::Send).then_some(self.aw)
    }

    #[must_use]
    pub fn w_valid(&self) -> bool {
        !self.drain.is_empty() || self.data_state == DataState::Send
    }

    #[must_use]
    pub fn w_last(&self) -> bool {
        match self.drain.front() {
            Some(&left) => left == 1,
            None => self.data_state == DataState::Send && self.beats_left == 1,
        }
    }

    fn drain_beat(&mut self) {
        self.stats.drained_beats += 1;
        if let Some(front) = self.drain.front_mut() {
            *front -= 1;
            if *front == 0 {
                self.drain.pop_front();
                self.awaiting_response += 1;
            }
        }
    }

    /// The W beat on offer finishes an abandoned burst and carries no
    /// strobes.
    #[must_use]
    pub fn draining(&self) -> bool {
        !self.drain.is_empty()
    }

    /// One-cycle error pulse for an error write response.
    #[must_use]
    pub fn error(&self) -> bool {
        self.error
    }

    /// Address the next burst will be written to.
    #[must_use]
    pub fn next_addr(&self) -> u32 {
        self.next_addr
    }

    #[must_use]
    pub fn flushed(&self) -> bool {
        self.flushed
    }

    #[must_use]
    pub fn stats(&self) -> WriterStats {
        self.stats
    }

    /// No address, data or response outstanding.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.addr_state == AddrState::Idle
            && self.data_state == DataState::Idle
            && self.pending.is_none()
            && self.drain.is_empty()
            && self.awaiting_response == 0
    }

    /// Beats of the burst that would start this edge, if any.
    #[must_use]
    pub fn start_request(&self, inputs: &WriterInputs) -> Option<u32> {
        if self.addr_state != AddrState::Idle || self.pending.is_some() {
            return None;
        }
        if inputs.burst_avail {
            return Some(self.burst_len);
        }
        let partial = u32::try_from(inputs.reserve_count).ok()?;
        (inputs.flush && !self.flushed && partial > 0 && partial < self.burst_len).then_some(partial)
    }

    /// Advance one edge. Returns the number of FIFO words claimed by a
    /// burst starting on this edge.
    pub fn tick(&mut self, inputs: &WriterInputs, slave: &WriteSlave) -> Option<u32> {
        let start = self.start_request(inputs);
        let aw_fire = self.addr_state == AddrState::Send && slave.awready;
        let w_fire = self.w_valid() && slave.wready;

        self.error = false;
        if let Some(b) = slave.b {
            self.stats.responses += 1;
            self.awaiting_response = self.awaiting_response.saturating_sub(1);
            if b.resp.is_error() {
                self.error = true;
                self.stats.error_responses += 1;
                warn!("AXI writer: write response {:?}", b.resp);
            }
        }

        match self.addr_state {
            AddrState::Idle => {
                if let Some(beats) = start {
                    self.aw = AddrBeat::incr(self.next_addr, beats, self.bus_bytes);
                    self.addr_state = AddrState::Send;
                    if beats < self.burst_len {
                        self.flushed = true;
                        debug!(
                            "AXI writer: flush burst of {beats} beats at {:#010X}",
                            self.next_addr
                        );
                    } else {
                        trace!("AXI writer: burst at {:#010X}", self.next_addr);
                    }
                }
            }
            AddrState::Send => {
                if aw_fire {
                    let beats = self.aw.beats();
                    self.next_addr = self.next_addr.wrapping_add(beats * self.bus_bytes);
                    self.addr_state = AddrState::Idle;
                    self.stats.bursts += 1;
                    if beats < self.burst_len {
                        self.stats.flush_bursts += 1;
                    }
                }
            }
        }

        let drain_fire = w_fire && self.draining();
        if drain_fire {
            self.drain_beat();
        } else if w_fire {
            self.stats.beats += 1;
            self.beats_left -= 1;
            if self.beats_left == 0 {
                self.awaiting_response += 1;
                match self.pending.take() {
                    Some(beats) => self.beats_left = beats,
                    None => self.data_state = DataState::Idle,
                }
            }
        }
        if let Some(beats) = start {
            if self.data_state == DataState::Idle {
                self.data_state = DataState::Send;
                self.beats_left = beats;
            } else {
                self.pending = Some(beats);
            }
        }

        start
    }
}
