//! Reset synchronizer: asynchronous assert, synchronous release.

/// Per-domain reset synchronizer.
///
/// Asserting `rst_in` forces every stage to reset immediately, regardless
/// of edges. Release shifts deasserted values in on destination edges, so
/// the domain leaves reset `stages` edges after the input drops.
#[derive(Debug, Clone)]
pub struct ResetSync {
    stages: Vec<bool>,
}

impl ResetSync {
    /// # Panics
    ///
    /// Panics if `stages` is zero.
    #[must_use]
    pub fn new(stages: usize) -> Self {
        assert!(stages > 0, "reset synchronizer needs at least 1 stage");
        Self {
            stages: vec![true; stages],
        }
    }

    /// Reset as seen by the destination domain.
    #[must_use]
    pub fn asserted(&self) -> bool {
        self.stages[self.stages.len() - 1]
    }

    pub fn tick(&mut self, rst_in: bool, edge: bool) {
        if rst_in {
            self.stages.fill(true);
        } else if edge {
            self.stages.rotate_right(1);
            self.stages[0] = false;
        }
    }
}
