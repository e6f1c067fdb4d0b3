//! End-of-frame flush sequencing.
//!
//! End of stream sets a hold latch that stays set until the writer is
//! reset for the next frame. The latch feeds a shift register with two
//! taps: the earlier one tells the upsizer to pad its partial word, the
//! later one lets the AXI writer issue its short final burst once the
//! padded word has landed in the burst FIFO.

#[derive(Debug, Clone)]
pub struct FlushSequencer {
    hold: bool,
    delay: Vec<bool>,
    fifo_tap: usize,
}

impl FlushSequencer {
    /// # Panics
    ///
    /// Panics unless `0 < fifo_tap <= axi_tap`.
    #[must_use]
    pub fn new(fifo_tap: usize, axi_tap: usize) -> Self {
        assert!(
            fifo_tap > 0 && fifo_tap <= axi_tap,
            "flush taps must satisfy 0 < fifo ({fifo_tap}) <= axi ({axi_tap})"
        );
        Self {
            hold: false,
            delay: vec![false; axi_tap],
            fifo_tap,
        }
    }

    pub fn reset(&mut self) {
        self.hold = false;
        self.delay.fill(false);
    }

    /// Latch output.
    #[must_use]
    pub fn hold(&self) -> bool {
        self.hold
    }

    /// Pad the upsizer's partial word.
    #[must_use]
    pub fn fifo_flush(&self) -> bool {
        self.delay[self.fifo_tap - 1]
    }

    /// Allow the short final burst.
    #[must_use]
    pub fn axi_flush(&self) -> bool {
        self.delay[self.delay.len() - 1]
    }

    /// Advance one memory-clock edge. `writer_reset` clears the latch and
    /// the delay line on the same edge.
    pub fn tick(&mut self, eos: bool, writer_reset: bool) {
        if writer_reset {
            self.reset();
            return;
        }
        self.delay.rotate_right(1);
        self.delay[0] = self.hold;
        self.hold |= eos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taps_follow_latch() {
        let mut seq = FlushSequencer::new(2, 5);
        seq.tick(true, false);
        assert!(seq.hold());
        let mut fifo_at = None;
        let mut axi_at = None;
        for edge in 1..=8 {
            seq.tick(false, false);
            if seq.fifo_flush() && fifo_at.is_none() {
                fifo_at = Some(edge);
            }
            if seq.axi_flush() && axi_at.is_none() {
                axi_at = Some(edge);
            }
        }
        assert_eq!(fifo_at, Some(2));
        assert_eq!(axi_at, Some(5));
        assert!(seq.fifo_flush() && seq.axi_flush());
    }

    #[test]
    fn writer_reset_clears_everything() {
        let mut seq = FlushSequencer::new(1, 3);
        seq.tick(true, false);
        for _ in 0..4 {
            seq.tick(false, false);
        }
        assert!(seq.axi_flush());
        seq.tick(false, true);
        assert!(!seq.hold() && !seq.fifo_flush() && !seq.axi_flush());
        seq.tick(false, false);
        assert!(!seq.fifo_flush());
    }
}
