//! Single-clock RAM with one write port and one registered read port.
//!
//! Reads are READ_FIRST: a read and a write to the same address on the
//! same edge return the old contents. With the optional output register
//! enabled the read latency is two edges instead of one.

/// Synchronous RAM primitive.
#[derive(Debug, Clone)]
pub struct SyncRam<T> {
    cells: Vec<T>,
    /// Read data register (first read stage).
    q: T,
    /// Optional output register (second read stage).
    q_out: Option<T>,
}

impl<T: Copy + Default> SyncRam<T> {
    /// Create a RAM of `depth` words with one-edge read latency.
    ///
    /// # Panics
    ///
    /// Panics if `depth` is zero.
    #[must_use]
    pub fn new(depth: usize) -> Self {
        assert!(depth > 0, "RAM depth must be non-zero");
        Self {
            cells: vec![T::default(); depth],
            q: T::default(),
            q_out: None,
        }
    }

    /// Create a RAM with an extra output register (two-edge read latency).
    #[must_use]
    pub fn with_output_register(depth: usize) -> Self {
        let mut ram = Self::new(depth);
        ram.q_out = Some(T::default());
        ram
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.cells.len()
    }

    /// Read latency in edges.
    #[must_use]
    pub fn latency(&self) -> u32 {
        if self.q_out.is_some() { 2 } else { 1 }
    }

    /// Registered read data.
    #[must_use]
    pub fn q(&self) -> T {
        self.q_out.unwrap_or(self.q)
    }

    /// Advance one edge.
    ///
    /// `write` stores `(address, data)`; `read` latches the word at the
    /// given address into the read register. Without a read the read
    /// register holds its value.
    pub fn tick(&mut self, write: Option<(usize, T)>, read: Option<usize>) {
        let depth = self.cells.len();
        if let Some(out) = self.q_out.as_mut() {
            *out = self.q;
        }
        if let Some(addr) = read {
            self.q = self.cells[addr % depth];
        }
        if let Some((addr, data)) = write {
            self.cells[addr % depth] = data;
        }
    }

    /// Direct view of a cell, for inspection.
    #[must_use]
    pub fn peek(&self, addr: usize) -> T {
        self.cells[addr % self.cells.len()]
    }
}
