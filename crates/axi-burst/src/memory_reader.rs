//! Memory reader: AXI burst reader plus burst read FIFO.
//!
//! Exposes a narrow FWFT output (`empty`, `rd_data`, `rd_en`) that
//! streams memory contents from the base pointer applied at reset. Reads
//! run ahead of the consumer as far as the FIFO allows.

use crate::channel::{ReadMaster, ReadSlave};
use crate::config::MemoryConfig;
use crate::read_fifo::BurstReadFifo;
use crate::reader::{AxiBurstReader, ReaderStats};

#[derive(Debug, Clone)]
pub struct MemoryReader {
    reader: AxiBurstReader,
    fifo: BurstReadFifo,
}

impl MemoryReader {
    #[must_use]
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            reader: AxiBurstReader::new(config),
            fifo: BurstReadFifo::new(config),
        }
    }

    /// Clear the FIFO and restart reading at `base`. The memory is
    /// assumed to be reset alongside, or idle.
    ///
    /// # Panics
    ///
    /// Panics if `base` is not 4 KiB aligned.
    pub fn reset(&mut self, base: u32) {
        self.fifo.reset();
        self.reader.reset(base);
    }

    /// Clear the FIFO and restart at `base` while the memory keeps
    /// running. `slave` is what the memory presents on this edge.
    ///
    /// # Panics
    ///
    /// Panics if `base` is not 4 KiB aligned.
    pub fn reset_at_edge(&mut self, base: u32, slave: &ReadSlave) {
        self.fifo.reset();
        self.reader.reset_at_edge(base, slave);
    }

    #[must_use]
    pub fn empty(&self) -> bool {
        self.fifo.empty()
    }

    #[must_use]
    pub fn rd_data(&self) -> u64 {
        self.fifo.rd_data()
    }

    #[must_use]
    pub fn master(&self) -> ReadMaster {
        ReadMaster {
            ar: self.reader.ar(),
            rready: true,
        }
    }

    #[must_use]
    pub fn error(&self) -> bool {
        self.reader.error()
    }

    #[must_use]
    pub fn stats(&self) -> ReaderStats {
        self.reader.stats()
    }

    #[must_use]
    pub fn fifo(&self) -> &BurstReadFifo {
        &self.fifo
    }

    #[must_use]
    pub fn reader(&self) -> &AxiBurstReader {
        &self.reader
    }

    /// Advance one memory-clock edge.
    pub fn tick(&mut self, rd_en: bool, slave: &ReadSlave) {
        let step = self.reader.tick(self.fifo.wr_burst_avail(), slave);
        self.fifo.tick(step.reserve, step.store, rd_en);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ram::{AxiRam, Channel};

    fn config() -> MemoryConfig {
        MemoryConfig::new(64, 16, 4, 8, 16).unwrap()
    }

    fn drain(reader: &mut MemoryReader, ram: &mut AxiRam, count: usize, read_every: u32) -> Vec<u16> {
        let mut out = Vec::new();
        let mut cycle = 0u32;
        while out.len() < count {
            let rd_en = !reader.empty() && cycle % read_every == 0;
            if rd_en {
                out.push(reader.rd_data() as u16);
            }
            let slave = ram.read_slave();
            let master = reader.master();
            reader.tick(rd_en, &slave);
            ram.tick(&Default::default(), &master);
            cycle += 1;
            assert!(cycle < 100_000);
        }
        out
    }

    #[test]
    fn streams_memory_in_order() {
        let cfg = config();
        let mut ram = AxiRam::new(&cfg);
        let words: Vec<u64> = (0..200).collect();
        ram.write_words(0x2000, &words, 2);
        let mut reader = MemoryReader::new(&cfg);
        reader.reset(0x2000);
        let out = drain(&mut reader, &mut ram, 200, 1);
        assert_eq!(out, (0..200).collect::<Vec<u16>>());
    }

    #[test]
    fn slow_consumer_and_stalled_memory() {
        let cfg = config();
        let mut ram = AxiRam::new(&cfg);
        ram.set_pause_pattern(Channel::Ar, [true, false, true]);
        ram.set_pause_pattern(Channel::R, [false, true, true, false, true]);
        let words: Vec<u64> = (0..100).map(|v| v * 3 + 1).collect();
        ram.write_words(0, &words, 2);
        let mut reader = MemoryReader::new(&cfg);
        reader.reset(0);
        let out = drain(&mut reader, &mut ram, 100, 3);
        let expected: Vec<u16> = words.iter().map(|&w| w as u16).collect();
        assert_eq!(out, expected);
        assert_eq!(reader.stats().error_beats, 0);
    }

    #[test]
    fn restart_while_memory_accepts_address() {
        let cfg = config();
        let mut ram = AxiRam::new(&cfg);
        let old: Vec<u64> = (0..32).map(|v| 0x100 + v).collect();
        let new: Vec<u64> = (0..32).map(|v| 0x200 + v).collect();
        ram.write_words(0, &old, 2);
        ram.write_words(0x1000, &new, 2);

        let mut reader = MemoryReader::new(&cfg);
        reader.reset(0);
        // Edge 0: claim FIFO space, AR for 0x0 goes out.
        let slave = ram.read_slave();
        let master = reader.master();
        reader.tick(false, &slave);
        ram.tick(&Default::default(), &master);
        assert!(reader.master().ar.is_some());

        // Edge 1: the memory accepts that AR while the reader restarts.
        let slave = ram.read_slave();
        let master = reader.master();
        assert!(slave.arready);
        reader.reset_at_edge(0x1000, &slave);
        ram.tick(&Default::default(), &master);

        let out = drain(&mut reader, &mut ram, 32, 1);
        let expected: Vec<u16> = new.iter().map(|&w| w as u16).collect();
        assert_eq!(out, expected);
        assert_eq!(reader.stats().discarded_beats, 4);
    }
}
