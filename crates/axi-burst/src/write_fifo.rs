//! Burst write FIFO: narrow-to-wide upsizer in front of a reservation
//! counted FIFO that feeds the AXI burst writer.
//!
//! Narrow words shift in little-endian (the first word lands in the low
//! bits of the bus word). A wide word is committed to the FIFO once
//! `ratio` narrow words have arrived. While `flush` is held with a
//! partial word pending, zero words are shifted in one per edge until
//! the partial word commits.
//!
//! `reserve_count` counts committed wide words not yet claimed by a
//! burst: +1 per commit, minus the burst length per reservation.
//! `burst_avail` is registered from the post-edge count, so a burst
//! claimed on one edge is already accounted for on the next.

use fifo_cdc::SyncFifo;

use crate::config::MemoryConfig;

/// Inputs for one edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteFifoInputs {
    /// Narrow word to accept. Only present it while `!full()`.
    pub wr: Option<u64>,
    /// Pad a partial wide word with zeros until it commits.
    pub flush: bool,
    /// Pop the head wide word.
    pub rd_en: bool,
    /// Claim this many committed wide words for a burst.
    pub reserve: Option<u32>,
}

/// Reservation-counted write FIFO with width conversion.
#[derive(Debug, Clone)]
pub struct BurstWriteFifo {
    fifo: SyncFifo<u64>,
    burst_len: u32,
    ratio: u32,
    narrow_bits: u32,
    bus_bits: u32,
    narrow_mask: u64,

    shift: u64,
    shift_count: u32,

    reserve_count: i32,
    burst_avail: bool,
}

impl BurstWriteFifo {
    #[must_use]
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            fifo: SyncFifo::new(config.fifo_depth()),
            burst_len: config.burst_len(),
            ratio: config.ratio(),
            narrow_bits: config.narrow_width_bits(),
            bus_bits: config.bus_width_bits(),
            narrow_mask: config.narrow_mask(),
            shift: 0,
            shift_count: 0,
            reserve_count: 0,
            burst_avail: false,
        }
    }

    pub fn reset(&mut self) {
        self.fifo.reset();
        self.shift = 0;
        self.shift_count = 0;
        self.reserve_count = 0;
        self.burst_avail = false;
    }

    /// The next narrow word would commit into a full FIFO.
    #[must_use]
    pub fn full(&self) -> bool {
        self.shift_count + 1 == self.ratio && self.fifo.full()
    }

    /// Narrow words waiting in the upsizer.
    #[must_use]
    pub fn has_partial(&self) -> bool {
        self.shift_count > 0
    }

    #[must_use]
    pub fn burst_avail(&self) -> bool {
        self.burst_avail
    }

    #[must_use]
    pub fn reserve_count(&self) -> i32 {
        self.reserve_count
    }

    #[must_use]
    pub fn rd_valid(&self) -> bool {
        !self.fifo.empty()
    }

    #[must_use]
    pub fn rd_data(&self) -> u64 {
        self.fifo.rd_data()
    }

    /// Wide words held, including the output stage.
    #[must_use]
    pub fn occupancy(&self) -> u32 {
        self.fifo.occupancy()
    }

    pub fn tick(&mut self, inputs: WriteFifoInputs) {
        debug_assert!(
            inputs.wr.is_none() || !self.full(),
            "burst write FIFO written while full"
        );
        debug_assert!(
            !inputs.rd_en || self.rd_valid(),
            "burst write FIFO read while empty"
        );

        let full = self.full();
        let narrow = match inputs.wr {
            Some(word) if !full => Some(word),
            None if inputs.flush && self.has_partial() && !full => Some(0),
            _ => None,
        };
        let commit = narrow.and_then(|word| self.shift_in(word));
        self.fifo.tick(commit, inputs.rd_en);

        let claimed = inputs.reserve.map_or(0, |beats| beats as i32);
        let count_next = self.reserve_count + i32::from(commit.is_some()) - claimed;
        debug_assert!(count_next >= 0, "reserved more words than were written");
        self.reserve_count = count_next;
        self.burst_avail = count_next >= self.burst_len as i32;
    }

    /// Shift one narrow word in; returns the wide word when it fills.
    fn shift_in(&mut self, word: u64) -> Option<u64> {
        let word = word & self.narrow_mask;
        if self.ratio == 1 {
            return Some(word);
        }
        self.shift = (self.shift >> self.narrow_bits) | (word << (self.bus_bits - self.narrow_bits));
        self.shift_count += 1;
        if self.shift_count == self.ratio {
            self.shift_count = 0;
            Some(self.shift)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(burst_len: u32, depth: u32) -> MemoryConfig {
        MemoryConfig::new(64, 16, burst_len, depth, 16).unwrap()
    }

    fn push(fifo: &mut BurstWriteFifo, word: u64) {
        fifo.tick(WriteFifoInputs {
            wr: Some(word),
            ..Default::default()
        });
    }

    fn idle(fifo: &mut BurstWriteFifo) {
        fifo.tick(WriteFifoInputs::default());
    }

    #[test]
    fn packs_little_endian() {
        let mut fifo = BurstWriteFifo::new(&config(2, 4));
        for w in [0x1111, 0x2222, 0x3333, 0x4444] {
            push(&mut fifo, w);
        }
        idle(&mut fifo);
        assert!(fifo.rd_valid());
        assert_eq!(fifo.rd_data(), 0x4444_3333_2222_1111);
        assert_eq!(fifo.reserve_count(), 1);
    }

    #[test]
    fn burst_avail_after_one_burst_of_words() {
        let mut fifo = BurstWriteFifo::new(&config(2, 4));
        for w in 0..7 {
            push(&mut fifo, w);
            assert!(!fifo.burst_avail());
        }
        push(&mut fifo, 7);
        assert!(fifo.burst_avail());
        fifo.tick(WriteFifoInputs {
            reserve: Some(2),
            ..Default::default()
        });
        assert!(!fifo.burst_avail());
        assert_eq!(fifo.reserve_count(), 0);
    }

    #[test]
    fn flush_pads_partial_word() {
        let mut fifo = BurstWriteFifo::new(&config(2, 4));
        push(&mut fifo, 0xAAAA);
        assert!(fifo.has_partial());
        let flush = WriteFifoInputs {
            flush: true,
            ..Default::default()
        };
        // Three pad words complete a 4:1 word.
        for _ in 0..3 {
            assert_eq!(fifo.reserve_count(), 0);
            fifo.tick(flush);
        }
        assert!(!fifo.has_partial());
        assert_eq!(fifo.reserve_count(), 1);
        // Nothing further happens while flush stays high.
        fifo.tick(flush);
        assert_eq!(fifo.reserve_count(), 1);
        assert_eq!(fifo.rd_data(), 0xAAAA);
    }

    #[test]
    fn full_tracks_the_committing_word() {
        let mut fifo = BurstWriteFifo::new(&config(1, 2));
        let mut pushed = 0;
        while !fifo.full() {
            push(&mut fifo, pushed);
            pushed += 1;
            assert!(pushed < 64);
        }
        // Two RAM slots plus the output stage, then three more narrow
        // words waiting on the fourth.
        assert_eq!(pushed, 3 * 4 + 3);
        assert_eq!(fifo.occupancy(), 3);
    }

    #[test]
    fn ratio_one_passes_words_straight_through() {
        let cfg = MemoryConfig::new(32, 32, 2, 4, 16).unwrap();
        let mut fifo = BurstWriteFifo::new(&cfg);
        push(&mut fifo, 0x1_DEAD_BEEF);
        idle(&mut fifo);
        assert_eq!(fifo.rd_data(), 0xDEAD_BEEF);
        assert!(!fifo.has_partial());
    }

    proptest! {
        #[test]
        fn reservation_conservation(ops in proptest::collection::vec(0u8..4, 1..400)) {
            let cfg = config(4, 16);
            let mut fifo = BurstWriteFifo::new(&cfg);
            let mut commits = 0i32;
            let mut claimed = 0i32;
            let mut narrow = 0u32;
            let mut unpopped_claims = 0u32;
            for op in ops {
                let wr = (op & 1 == 1 && !fifo.full()).then_some(u64::from(narrow));
                let reserve = (op & 2 == 2 && fifo.burst_avail()).then_some(4);
                let rd_en = unpopped_claims > 0 && fifo.rd_valid();
                if wr.is_some() {
                    narrow += 1;
                    if narrow % 4 == 0 {
                        commits += 1;
                    }
                }
                if let Some(beats) = reserve {
                    claimed += beats as i32;
                    unpopped_claims += beats;
                }
                if rd_en {
                    unpopped_claims -= 1;
                }
                fifo.tick(WriteFifoInputs { wr, flush: false, rd_en, reserve });

                prop_assert_eq!(fifo.reserve_count(), commits - claimed);
                prop_assert!(fifo.reserve_count() >= 0);
                prop_assert_eq!(fifo.burst_avail(), fifo.reserve_count() >= 4);
                prop_assert!(fifo.occupancy() <= cfg.fifo_depth() + 1);
            }
        }
    }
}
