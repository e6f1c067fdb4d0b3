//! Structural parameters shared by every memory-side component.
//!
//! A [`MemoryConfig`] is built once, validated up front, and passed by
//! reference to each constructor. Nothing downstream re-checks it.

use thiserror::Error;

/// AXI bursts must not cross a 4 KiB boundary, so frame slots and burst
/// sizes are aligned to it.
pub const BOUNDARY_BYTES: u32 = 4096;

/// Unsupported memory-side configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("bus width must be 8, 16, 32 or 64 bits, got {0}")]
    BusWidth(u32),
    #[error("narrow width {narrow} must be a power of two of at least 8 bits dividing the {bus}-bit bus")]
    NarrowWidth { narrow: u32, bus: u32 },
    #[error("burst length must be a power of two in 1..=256, got {0}")]
    BurstLength(u32),
    #[error("FIFO depth {depth} must be a power of two holding at least two bursts of {burst_len}")]
    FifoDepth { depth: u32, burst_len: u32 },
    #[error("address width must be 13..=32 bits, got {0}")]
    AddrWidth(u32),
    #[error("base pointer {0:#010X} is not 4 KiB aligned")]
    Unaligned(u32),
    #[error("base pointer {ptr:#010X} is outside the {width}-bit address space")]
    OutOfRange { ptr: u32, width: u32 },
}

/// Validated widths, burst length and FIFO depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    bus_width_bits: u32,
    narrow_width_bits: u32,
    burst_len: u32,
    fifo_depth: u32,
    addr_width_bits: u32,
}

impl MemoryConfig {
    /// Validate and build a configuration.
    ///
    /// - `bus_width_bits`: memory data bus, one of 8, 16, 32, 64.
    /// - `narrow_width_bits`: streaming side, a power of two dividing the bus.
    /// - `burst_len`: beats per burst, a power of two up to 256.
    /// - `fifo_depth`: wide words per burst FIFO, at least two bursts.
    /// - `addr_width_bits`: memory address width, 13 to 32.
    pub fn new(
        bus_width_bits: u32,
        narrow_width_bits: u32,
        burst_len: u32,
        fifo_depth: u32,
        addr_width_bits: u32,
    ) -> Result<Self, ConfigError> {
        if !matches!(bus_width_bits, 8 | 16 | 32 | 64) {
            return Err(ConfigError::BusWidth(bus_width_bits));
        }
        if narrow_width_bits < 8
            || !narrow_width_bits.is_power_of_two()
            || bus_width_bits % narrow_width_bits != 0
        {
            return Err(ConfigError::NarrowWidth {
                narrow: narrow_width_bits,
                bus: bus_width_bits,
            });
        }
        if !burst_len.is_power_of_two() || burst_len > 256 {
            return Err(ConfigError::BurstLength(burst_len));
        }
        if !fifo_depth.is_power_of_two() || fifo_depth < 2 * burst_len {
            return Err(ConfigError::FifoDepth {
                depth: fifo_depth,
                burst_len,
            });
        }
        // 256 beats of 8 bytes is the largest burst, well inside 4 KiB.
        debug_assert!(burst_len * bus_width_bits / 8 <= BOUNDARY_BYTES);
        if !(13..=32).contains(&addr_width_bits) {
            return Err(ConfigError::AddrWidth(addr_width_bits));
        }
        Ok(Self {
            bus_width_bits,
            narrow_width_bits,
            burst_len,
            fifo_depth,
            addr_width_bits,
        })
    }

    #[must_use]
    pub fn bus_width_bits(&self) -> u32 {
        self.bus_width_bits
    }

    #[must_use]
    pub fn narrow_width_bits(&self) -> u32 {
        self.narrow_width_bits
    }

    #[must_use]
    pub fn burst_len(&self) -> u32 {
        self.burst_len
    }

    #[must_use]
    pub fn fifo_depth(&self) -> u32 {
        self.fifo_depth
    }

    #[must_use]
    pub fn addr_width_bits(&self) -> u32 {
        self.addr_width_bits
    }

    /// Narrow words per bus word.
    #[must_use]
    pub fn ratio(&self) -> u32 {
        self.bus_width_bits / self.narrow_width_bits
    }

    #[must_use]
    pub fn bus_bytes(&self) -> u32 {
        self.bus_width_bits / 8
    }

    #[must_use]
    pub fn narrow_bytes(&self) -> u32 {
        self.narrow_width_bits / 8
    }

    /// Bytes moved by one full burst.
    #[must_use]
    pub fn burst_bytes(&self) -> u32 {
        self.burst_len * self.bus_bytes()
    }

    /// Size of the address space in bytes.
    #[must_use]
    pub fn address_space(&self) -> u64 {
        1u64 << self.addr_width_bits
    }

    /// Mask of valid narrow-word bits.
    #[must_use]
    pub fn narrow_mask(&self) -> u64 {
        if self.narrow_width_bits == 64 {
            u64::MAX
        } else {
            (1u64 << self.narrow_width_bits) - 1
        }
    }

    /// Reject base pointers that are misaligned or outside the address space.
    pub fn check_base_pointer(&self, ptr: u32) -> Result<(), ConfigError> {
        if ptr % BOUNDARY_BYTES != 0 {
            return Err(ConfigError::Unaligned(ptr));
        }
        if u64::from(ptr) >= self.address_space() {
            return Err(ConfigError::OutOfRange {
                ptr,
                width: self.addr_width_bits,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vga_memory_parameters() {
        let cfg = MemoryConfig::new(64, 16, 64, 512, 28).unwrap();
        assert_eq!(cfg.ratio(), 4);
        assert_eq!(cfg.bus_bytes(), 8);
        assert_eq!(cfg.burst_bytes(), 512);
        assert_eq!(cfg.narrow_mask(), 0xFFFF);
        assert_eq!(cfg.address_space(), 1 << 28);
    }

    #[test]
    fn rejects_bad_widths() {
        assert_eq!(
            MemoryConfig::new(48, 16, 64, 512, 28),
            Err(ConfigError::BusWidth(48))
        );
        assert!(matches!(
            MemoryConfig::new(64, 24, 64, 512, 28),
            Err(ConfigError::NarrowWidth { .. })
        ));
        assert!(matches!(
            MemoryConfig::new(32, 64, 64, 512, 28),
            Err(ConfigError::NarrowWidth { .. })
        ));
    }

    #[test]
    fn rejects_bad_burst_and_depth() {
        assert_eq!(
            MemoryConfig::new(64, 16, 48, 512, 28),
            Err(ConfigError::BurstLength(48))
        );
        assert_eq!(
            MemoryConfig::new(64, 16, 512, 2048, 28),
            Err(ConfigError::BurstLength(512))
        );
        assert!(matches!(
            MemoryConfig::new(64, 16, 64, 64, 28),
            Err(ConfigError::FifoDepth { .. })
        ));
        assert!(MemoryConfig::new(64, 16, 256, 512, 28).is_ok());
        assert_eq!(
            MemoryConfig::new(64, 16, 64, 512, 12),
            Err(ConfigError::AddrWidth(12))
        );
    }

    #[test]
    fn base_pointer_checks() {
        let cfg = MemoryConfig::new(64, 16, 64, 512, 16).unwrap();
        assert!(cfg.check_base_pointer(0x1000).is_ok());
        assert_eq!(
            cfg.check_base_pointer(0x1010),
            Err(ConfigError::Unaligned(0x1010))
        );
        assert_eq!(
            cfg.check_base_pointer(0x1_0000),
            Err(ConfigError::OutOfRange {
                ptr: 0x1_0000,
                width: 16
            })
        );
    }
}
