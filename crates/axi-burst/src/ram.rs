//! AXI4 memory-controller model.
//!
//! Implements the slave side of one write port and one read port over a
//! sparse byte-addressed store. Address requests queue up to
//! [`ADDR_QUEUE_DEPTH`] deep per direction; data moves one beat per cycle
//! on W and R; write responses return in order on B.
//!
//! Each channel can be throttled with a cyclic pause pattern, address
//! ranges can be made to answer with an error response, and the model
//! counts protocol violations it observes from the master. Completed write
//! bursts are counted; only the most recent ones are kept as records.

use std::collections::{HashMap, VecDeque};
use std::ops::Range;

use log::warn;

use crate::channel::{
    AddrBeat, BurstKind, ReadBeat, ReadMaster, ReadSlave, Resp, WriteBeat, WriteMaster,
    WriteResp, WriteSlave,
};
use crate::config::{BOUNDARY_BYTES, MemoryConfig};

/// Address requests accepted ahead of their data, per direction.
pub const ADDR_QUEUE_DEPTH: usize = 2;

/// Default number of write burst records kept.
pub const WRITE_LOG_LIMIT: usize = 8192;

const PAGE_BYTES: u32 = 4096;

/// Channel selector for pause patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Aw,
    W,
    B,
    Ar,
    R,
}

impl Channel {
    const COUNT: usize = 5;

    fn index(self) -> usize {
        self as usize
    }
}

/// A write burst the model has fully received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstRecord {
    pub addr: u32,
    pub beats: u32,
    pub resp: Resp,
}

/// Master-side protocol violations seen by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProtocolStats {
    /// Bursts whose address range crosses a 4 KiB boundary.
    pub boundary_crossings: u64,
    /// W beats whose `last` flag disagrees with the burst length.
    pub misplaced_last: u64,
    /// Cycles mid-burst where the slave was ready but W was idle.
    pub write_gaps: u64,
    /// Bursts with a type other than INCR.
    pub unsupported_bursts: u64,
}

#[derive(Debug, Clone, Default)]
struct PausePattern {
    pattern: Vec<bool>,
    pos: usize,
}

impl PausePattern {
    fn paused(&self) -> bool {
        !self.pattern.is_empty() && self.pattern[self.pos % self.pattern.len()]
    }

    fn advance(&mut self) {
        if !self.pattern.is_empty() {
            self.pos = (self.pos + 1) % self.pattern.len();
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveBurst {
    beat: AddrBeat,
    resp: Resp,
    index: u32,
}

/// Sparse AXI RAM.
#[derive(Debug, Clone)]
pub struct AxiRam {
    addr_width: u32,
    bus_bytes: u32,
    pages: HashMap<u32, Box<[u8]>>,

    aw_queue: VecDeque<ActiveBurst>,
    b_queue: VecDeque<WriteResp>,
    b_out: Option<WriteResp>,
    ar_queue: VecDeque<ActiveBurst>,
    r_out: Option<ReadBeat>,

    pauses: [PausePattern; Channel::COUNT],
    error_ranges: Vec<(Range<u32>, Resp)>,

    completed_writes: Vec<BurstRecord>,
    write_log_limit: usize,
    write_bursts: u64,
    read_bursts: u64,
    protocol: ProtocolStats,
}

impl AxiRam {
    #[must_use]
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            addr_width: config.addr_width_bits(),
            bus_bytes: config.bus_bytes(),
            pages: HashMap::new(),
            aw_queue: VecDeque::new(),
            b_queue: VecDeque::new(),
            b_out: None,
            ar_queue: VecDeque::new(),
            r_out: None,
            pauses: Default::default(),
            error_ranges: Vec::new(),
            completed_writes: Vec::new(),
            write_log_limit: WRITE_LOG_LIMIT,
            write_bursts: 0,
            read_bursts: 0,
            protocol: ProtocolStats::default(),
        }
    }

    /// Throttle a channel. `true` entries stall it for that cycle; the
    /// pattern repeats. An empty pattern never stalls.
    pub fn set_pause_pattern(&mut self, channel: Channel, pattern: impl IntoIterator<Item = bool>) {
        self.pauses[channel.index()] = PausePattern {
            pattern: pattern.into_iter().collect(),
            pos: 0,
        };
    }

    /// Answer bursts touching `range` with `resp` instead of accessing memory.
    pub fn inject_error(&mut self, range: Range<u32>, resp: Resp) {
        self.error_ranges.push((range, resp));
    }

    /// Keep at most `limit` write burst records. When the log overflows
    /// the oldest half is dropped. At least two records are kept.
    pub fn set_write_log_limit(&mut self, limit: usize) {
        self.write_log_limit = limit.max(2);
        self.trim_write_log();
    }

    pub fn clear_errors(&mut self) {
        self.error_ranges.clear();
    }

    /// Controller reset: drop every queued and in-progress transaction.
    /// Memory contents, pause patterns and statistics are kept.
    pub fn reset(&mut self) {
        if !self.is_idle() {
            warn!(
                "AXI RAM reset with {} write and {} read bursts outstanding",
                self.aw_queue.len() + self.b_queue.len(),
                self.ar_queue.len()
            );
        }
        self.aw_queue.clear();
        self.b_queue.clear();
        self.b_out = None;
        self.ar_queue.clear();
        self.r_out = None;
    }

    // ---------------------------------------------------------------------
    // Slave outputs
    // ---------------------------------------------------------------------

    fn paused(&self, channel: Channel) -> bool {
        self.pauses[channel.index()].paused()
    }

    #[must_use]
    pub fn write_slave(&self) -> WriteSlave {
        WriteSlave {
            awready: self.aw_queue.len() < ADDR_QUEUE_DEPTH && !self.paused(Channel::Aw),
            wready: !self.aw_queue.is_empty() && !self.paused(Channel::W),
            b: self.b_out,
        }
    }

    #[must_use]
    pub fn read_slave(&self) -> ReadSlave {
        ReadSlave {
            arready: self.ar_queue.len() < ADDR_QUEUE_DEPTH && !self.paused(Channel::Ar),
            r: self.r_out,
        }
    }

    /// Nothing queued, in progress or waiting to be handed back.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.aw_queue.is_empty()
            && self.b_queue.is_empty()
            && self.b_out.is_none()
            && self.ar_queue.is_empty()
            && self.r_out.is_none()
    }

    // ---------------------------------------------------------------------
    // Statistics
    // ---------------------------------------------------------------------

    /// The most recent write bursts fully received, oldest first.
    #[must_use]
    pub fn completed_writes(&self) -> &[BurstRecord] {
        &self.completed_writes
    }

    /// Write bursts fully received since construction.
    #[must_use]
    pub fn write_bursts(&self) -> u64 {
        self.write_bursts
    }

    /// Read bursts whose last beat has been handed over.
    #[must_use]
    pub fn read_bursts(&self) -> u64 {
        self.read_bursts
    }

    #[must_use]
    pub fn protocol(&self) -> ProtocolStats {
        self.protocol
    }

    // ---------------------------------------------------------------------
    // Clocking
    // ---------------------------------------------------------------------

    /// Advance one memory-clock edge.
    pub fn tick(&mut self, write: &WriteMaster, read: &ReadMaster) {
        let ws = self.write_slave();
        let rs = self.read_slave();

        match write.w {
            Some(beat) if ws.wready => self.accept_write_beat(beat),
            None if ws.wready && self.aw_queue.front().is_some_and(|a| a.index > 0) => {
                self.protocol.write_gaps += 1;
            }
            _ => {}
        }
        if let Some(aw) = write.aw.filter(|_| ws.awready) {
            let burst = self.open_burst(aw);
            self.aw_queue.push_back(burst);
        }
        if ws.b.is_some() && write.bready {
            self.b_out = None;
        }
        if self.b_out.is_none() && !self.paused(Channel::B) {
            self.b_out = self.b_queue.pop_front();
        }

        if let Some(ar) = read.ar.filter(|_| rs.arready) {
            let burst = self.open_burst(ar);
            self.ar_queue.push_back(burst);
        }
        if rs.r.is_some() && read.rready {
            self.r_out = None;
        }
        if self.r_out.is_none() && !self.paused(Channel::R) {
            self.r_out = self.next_read_beat();
        }

        for pause in &mut self.pauses {
            pause.advance();
        }
    }

    /// Decide the response for a newly accepted address request.
    fn open_burst(&mut self, beat: AddrBeat) -> ActiveBurst {
        let start = u64::from(beat.addr);
        let end = start + u64::from(beat.bytes());

        let mut resp = Resp::Okay;
        if beat.burst != BurstKind::Incr {
            self.protocol.unsupported_bursts += 1;
            warn!("AXI RAM: unsupported burst type {:?} at {:#010X}", beat.burst, beat.addr);
            resp = Resp::SlvErr;
        }
        if start % u64::from(BOUNDARY_BYTES) + u64::from(beat.bytes()) > u64::from(BOUNDARY_BYTES) {
            self.protocol.boundary_crossings += 1;
            warn!(
                "AXI RAM: burst at {:#010X} of {} bytes crosses a 4 KiB boundary",
                beat.addr,
                beat.bytes()
            );
        }
        if end > 1u64 << self.addr_width {
            resp = resp.worst(Resp::DecErr);
        }
        for (range, injected) in &self.error_ranges {
            if start < u64::from(range.end) && u64::from(range.start) < end {
                resp = resp.worst(*injected);
            }
        }
        ActiveBurst {
            beat,
            resp,
            index: 0,
        }
    }

    fn accept_write_beat(&mut self, w: WriteBeat) {
        let Some(active) = self.aw_queue.front().copied() else {
            return;
        };
        let beats = active.beat.beats();
        let addr = active.beat.addr.wrapping_add(active.index * self.bus_bytes);
        let expect_last = active.index + 1 == beats;

        if w.last != expect_last {
            self.protocol.misplaced_last += 1;
            warn!(
                "AXI RAM: WLAST={} on beat {} of {beats} at {:#010X}",
                w.last, active.index, active.beat.addr
            );
        }
        if !active.resp.is_error() {
            for lane in 0..self.bus_bytes {
                if w.strb & (1 << lane) != 0 {
                    self.store(addr.wrapping_add(lane), (w.data >> (lane * 8)) as u8);
                }
            }
        }

        if expect_last {
            self.aw_queue.pop_front();
            self.write_bursts += 1;
            self.completed_writes.push(BurstRecord {
                addr: active.beat.addr,
                beats,
                resp: active.resp,
            });
            self.trim_write_log();
            self.b_queue.push_back(WriteResp {
                id: active.beat.id,
                resp: active.resp,
            });
        } else if let Some(front) = self.aw_queue.front_mut() {
            front.index += 1;
        }
    }

    fn trim_write_log(&mut self) {
        let len = self.completed_writes.len();
        if len > self.write_log_limit {
            self.completed_writes.drain(..len - self.write_log_limit / 2);
        }
    }

    fn next_read_beat(&mut self) -> Option<ReadBeat> {
        let active = self.ar_queue.front().copied()?;
        let beats = active.beat.beats();
        let addr = active.beat.addr.wrapping_add(active.index * self.bus_bytes);
        let last = active.index + 1 == beats;

        let data = if active.resp.is_error() {
            0
        } else {
            (0..self.bus_bytes).fold(0u64, |acc, lane| {
                acc | (u64::from(self.load(addr.wrapping_add(lane))) << (lane * 8))
            })
        };

        if last {
            self.ar_queue.pop_front();
            self.read_bursts += 1;
        } else if let Some(front) = self.ar_queue.front_mut() {
            front.index += 1;
        }
        Some(ReadBeat {
            id: active.beat.id,
            data,
            resp: active.resp,
            last,
        })
    }

    // ---------------------------------------------------------------------
    // Backdoor access
    // ---------------------------------------------------------------------

    fn store(&mut self, addr: u32, value: u8) {
        let page = self
            .pages
            .entry(addr / PAGE_BYTES)
            .or_insert_with(|| vec![0; PAGE_BYTES as usize].into_boxed_slice());
        page[(addr % PAGE_BYTES) as usize] = value;
    }

    fn load(&self, addr: u32) -> u8 {
        self.pages
            .get(&(addr / PAGE_BYTES))
            .map_or(0, |page| page[(addr % PAGE_BYTES) as usize])
    }

    pub fn write_bytes(&mut self, addr: u32, bytes: &[u8]) {
        for (offset, &byte) in (0u32..).zip(bytes) {
            self.store(addr.wrapping_add(offset), byte);
        }
    }

    #[must_use]
    pub fn read_bytes(&self, addr: u32, len: usize) -> Vec<u8> {
        (0u32..)
            .take(len)
            .map(|offset| self.load(addr.wrapping_add(offset)))
            .collect()
    }

    /// Store little-endian words of `word_bytes` bytes each.
    pub fn write_words(&mut self, addr: u32, words: &[u64], word_bytes: u32) {
        for (index, &word) in (0u32..).zip(words) {
            let base = addr.wrapping_add(index * word_bytes);
            for byte in 0..word_bytes {
                self.store(base.wrapping_add(byte), (word >> (byte * 8)) as u8);
            }
        }
    }

    /// Load little-endian words of `word_bytes` bytes each.
    #[must_use]
    pub fn read_words(&self, addr: u32, count: usize, word_bytes: u32) -> Vec<u64> {
        (0u32..)
            .take(count)
            .map(|index| {
                let base = addr.wrapping_add(index * word_bytes);
                (0..word_bytes).fold(0u64, |acc, byte| {
                    acc | (u64::from(self.load(base.wrapping_add(byte))) << (byte * 8))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MemoryConfig {
        MemoryConfig::new(64, 16, 4, 8, 16).unwrap()
    }

    fn beat(data: u64, last: bool) -> WriteBeat {
        WriteBeat {
            data,
            strb: 0xFF,
            last,
        }
    }

    /// Drive one write burst to completion with a well-behaved master.
    fn write_burst(ram: &mut AxiRam, addr: u32, data: &[u64]) -> Resp {
        let aw = AddrBeat::incr(addr, data.len() as u32, 8);
        let mut aw_pending = true;
        let mut next = 0;
        for _ in 0..100 {
            let slave = ram.write_slave();
            if let Some(b) = slave.b {
                ram.tick(&WriteMaster { bready: true, ..Default::default() }, &ReadMaster::default());
                return b.resp;
            }
            let master = WriteMaster {
                aw: aw_pending.then_some(aw),
                w: (next < data.len()).then(|| beat(data[next], next + 1 == data.len())),
                bready: true,
            };
            if aw_pending && slave.awready {
                aw_pending = false;
            }
            if master.w.is_some() && slave.wready {
                next += 1;
            }
            ram.tick(&master, &ReadMaster::default());
        }
        panic!("write burst never completed");
    }

    fn read_burst(ram: &mut AxiRam, addr: u32, beats: u32) -> Vec<ReadBeat> {
        let ar = AddrBeat::incr(addr, beats, 8);
        let mut ar_pending = true;
        let mut out = Vec::new();
        for _ in 0..100 {
            let slave = ram.read_slave();
            if let Some(r) = slave.r {
                out.push(r);
                if r.last {
                    ram.tick(&WriteMaster::default(), &ReadMaster { ar: None, rready: true });
                    return out;
                }
            }
            let master = ReadMaster {
                ar: ar_pending.then_some(ar),
                rready: true,
            };
            if ar_pending && slave.arready {
                ar_pending = false;
            }
            ram.tick(&WriteMaster::default(), &master);
        }
        panic!("read burst never completed");
    }

    #[test]
    fn write_then_read_back() {
        let mut ram = AxiRam::new(&config());
        let data = [0x1111, 0x2222, 0x3333, 0x4444];
        assert_eq!(write_burst(&mut ram, 0x100, &data), Resp::Okay);
        assert_eq!(ram.read_words(0x100, 4, 8), data);
        assert_eq!(ram.completed_writes().len(), 1);

        let beats = read_burst(&mut ram, 0x100, 4);
        let values: Vec<u64> = beats.iter().map(|b| b.data).collect();
        assert_eq!(values, data);
        assert_eq!(ram.read_bursts(), 1);
        assert!(ram.is_idle());
        assert_eq!(ram.protocol(), ProtocolStats::default());
    }

    #[test]
    fn strobes_mask_bytes() {
        let mut ram = AxiRam::new(&config());
        ram.write_bytes(0, &[0xAA; 8]);
        let aw = AddrBeat::incr(0, 1, 8);
        let master = WriteMaster {
            aw: Some(aw),
            w: None,
            bready: true,
        };
        ram.tick(&master, &ReadMaster::default());
        let master = WriteMaster {
            aw: None,
            w: Some(WriteBeat {
                data: 0x0102_0304_0506_0708,
                strb: 0b0000_0011,
                last: true,
            }),
            bready: true,
        };
        ram.tick(&master, &ReadMaster::default());
        assert_eq!(ram.read_bytes(0, 4), vec![0x08, 0x07, 0xAA, 0xAA]);
    }

    #[test]
    fn out_of_range_is_decode_error() {
        let mut ram = AxiRam::new(&config());
        assert_eq!(write_burst(&mut ram, 0xFFF0, &[1, 2, 3, 4]), Resp::DecErr);
        assert_eq!(ram.read_words(0xFFF0, 2, 8), vec![0, 0]);
    }

    #[test]
    fn injected_error_ranges() {
        let mut ram = AxiRam::new(&config());
        ram.inject_error(0x200..0x220, Resp::SlvErr);
        assert_eq!(write_burst(&mut ram, 0x200, &[1, 2, 3, 4]), Resp::SlvErr);
        assert_eq!(write_burst(&mut ram, 0x240, &[1, 2, 3, 4]), Resp::Okay);
        let beats = read_burst(&mut ram, 0x200, 4);
        assert!(beats.iter().all(|b| b.resp == Resp::SlvErr));

        ram.clear_errors();
        assert_eq!(write_burst(&mut ram, 0x200, &[1, 2, 3, 4]), Resp::Okay);
        assert_eq!(ram.read_words(0x200, 4, 8), vec![1, 2, 3, 4]);
    }

    #[test]
    fn write_log_keeps_recent_bursts() {
        let mut ram = AxiRam::new(&config());
        ram.set_write_log_limit(4);
        for i in 0..10u32 {
            assert_eq!(write_burst(&mut ram, i * 0x20, &[u64::from(i)]), Resp::Okay);
            assert!(ram.completed_writes().len() <= 4);
        }
        assert_eq!(ram.write_bursts(), 10);
        let log = ram.completed_writes();
        assert_eq!(log.last().map(|b| b.addr), Some(9 * 0x20));
        assert!(log.windows(2).all(|w| w[1].addr == w[0].addr + 0x20));
    }

    #[test]
    fn counts_boundary_crossing_and_bad_last() {
        let mut ram = AxiRam::new(&config());
        let master = WriteMaster {
            aw: Some(AddrBeat::incr(0x0FF0, 4, 8)),
            w: None,
            bready: true,
        };
        ram.tick(&master, &ReadMaster::default());
        for i in 0..4 {
            let master = WriteMaster {
                aw: None,
                w: Some(beat(i, i == 1)),
                bready: true,
            };
            ram.tick(&master, &ReadMaster::default());
        }
        let stats = ram.protocol();
        assert_eq!(stats.boundary_crossings, 1);
        assert_eq!(stats.misplaced_last, 2);
    }

    #[test]
    fn pause_pattern_stalls_channel() {
        let mut ram = AxiRam::new(&config());
        ram.set_pause_pattern(Channel::Aw, [true, true, false]);
        assert!(!ram.write_slave().awready);
        ram.tick(&WriteMaster::default(), &ReadMaster::default());
        assert!(!ram.write_slave().awready);
        ram.tick(&WriteMaster::default(), &ReadMaster::default());
        assert!(ram.write_slave().awready);
        ram.tick(&WriteMaster::default(), &ReadMaster::default());
        assert!(!ram.write_slave().awready);
    }

    #[test]
    fn gap_mid_burst_is_counted() {
        let mut ram = AxiRam::new(&config());
        let master = WriteMaster {
            aw: Some(AddrBeat::incr(0, 2, 8)),
            w: None,
            bready: true,
        };
        ram.tick(&master, &ReadMaster::default());
        let first = WriteMaster {
            aw: None,
            w: Some(beat(1, false)),
            bready: true,
        };
        ram.tick(&first, &ReadMaster::default());
        ram.tick(&WriteMaster::default(), &ReadMaster::default());
        assert_eq!(ram.protocol().write_gaps, 1);
    }

    #[test]
    fn reset_drops_outstanding_bursts_but_keeps_memory() {
        let mut ram = AxiRam::new(&config());
        ram.write_words(0x40, &[0xDEAD], 8);
        let master = ReadMaster {
            ar: Some(AddrBeat::incr(0x40, 4, 8)),
            rready: false,
        };
        ram.tick(&WriteMaster::default(), &master);
        assert!(!ram.is_idle());
        ram.reset();
        assert!(ram.is_idle());
        assert_eq!(ram.read_words(0x40, 1, 8), vec![0xDEAD]);
    }
}
