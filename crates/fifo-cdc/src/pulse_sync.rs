//! Toggle-based pulse synchronizer.
//!
//! A rising edge on the source input flips a toggle register. The toggle
//! level crosses through `stages` destination registers; comparing the
//! last stage with one further register regenerates a single
//! destination-cycle pulse.
//!
//! A source pulse reaches the destination within `stages + 1` destination
//! cycles. Callers must space source pulses further apart than that; a
//! second toggle arriving before the first was observed cancels it.

/// Pulse synchronizer between two clock domains.
#[derive(Debug, Clone)]
pub struct PulseSync {
    src_prev: bool,
    toggle: bool,
    sync: Vec<bool>,
    /// Edge-detect register behind the last synchronizer stage.
    last: bool,
}

impl PulseSync {
    /// # Panics
    ///
    /// Panics if `stages < 2`.
    #[must_use]
    pub fn new(stages: usize) -> Self {
        assert!(stages >= 2, "pulse synchronizer needs at least 2 stages");
        Self {
            src_prev: false,
            toggle: false,
            sync: vec![false; stages],
            last: false,
        }
    }

    pub fn reset(&mut self) {
        self.src_prev = false;
        self.toggle = false;
        self.sync.fill(false);
        self.last = false;
    }

    #[must_use]
    pub fn stages(&self) -> usize {
        self.sync.len()
    }

    /// Single-cycle pulse in the destination domain.
    #[must_use]
    pub fn pulse(&self) -> bool {
        self.sync[self.sync.len() - 1] != self.last
    }

    /// Advance one master tick.
    ///
    /// `src` is the source input level on a source edge, `None` when the
    /// source domain has no edge. `dst_edge` marks a destination edge.
    pub fn tick(&mut self, src: Option<bool>, dst_edge: bool) {
        let toggle_seen = self.toggle;

        if let Some(level) = src {
            if level && !self.src_prev {
                self.toggle = !self.toggle;
            }
            self.src_prev = level;
        }

        if dst_edge {
            self.last = self.sync[self.sync.len() - 1];
            self.sync.rotate_right(1);
            self.sync[0] = toggle_seen;
        }
    }
}
