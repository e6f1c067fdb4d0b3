//! Pipeline configuration and presets.
//!
//! [`PipelineSettings`] is plain data that can be loaded from JSON.
//! [`PipelineConfig::new`] validates it once; every component is then
//! built from the validated config.

use std::fs;
use std::path::Path;

use axi_burst::{BOUNDARY_BYTES, MemoryConfig};
use ov7670_capture::SensorTiming;
use serde::{Deserialize, Serialize};
use sim_core::{ClockDomain, MasterClock};
use thiserror::Error;

use crate::display::RasterTiming;

/// Width of an RGB565 pixel on the streaming side.
pub const PIXEL_BITS: u32 = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Memory(#[from] axi_burst::ConfigError),
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame size {width}x{height} is empty")]
    EmptyFrame { width: u32, height: u32 },
    #[error("narrow width must be 16 bits for RGB565 pixels, got {0}")]
    PixelWidth(u32),
    #[error(
        "display active area {display_width}x{display_height} does not match the {width}x{height} frame"
    )]
    DisplaySize {
        display_width: u32,
        display_height: u32,
        width: u32,
        height: u32,
    },
    #[error("display sync pulses must be at least one clock/line wide")]
    DisplaySync,
    #[error("clock divisor {divisor} with phase {phase} is invalid")]
    Clock { divisor: u64, phase: u64 },
    #[error("synchronizers need at least 2 stages, got {0}")]
    SyncStages(usize),
    #[error("pixel FIFO depth_log2 must be 1..=16, got {0}")]
    PixelFifoDepth(u32),
    #[error("frame slot {slot} at {base:#010X} does not fit in the memory")]
    SlotOutOfRange { slot: usize, base: u32 },
}

/// Memory-side structural parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySettings {
    pub bus_width_bits: u32,
    pub narrow_width_bits: u32,
    pub burst_len: u32,
    pub fifo_depth: u32,
    pub addr_width_bits: u32,
    /// Base of frame slot 0. Slot 1 follows it, 4 KiB aligned.
    pub frame_base: u32,
}

/// Master clock and domain divisors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSettings {
    pub master_hz: u64,
    pub pixel_divisor: u64,
    pub pixel_phase: u64,
    pub memory_divisor: u64,
}

/// Sensor blanking around the active frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSettings {
    pub vsync_lines: u32,
    pub v_front_porch: u32,
    pub v_back_porch: u32,
    pub h_blank: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSettings {
    pub frame_width: u32,
    pub frame_height: u32,
    pub memory: MemorySettings,
    pub clocks: ClockSettings,
    /// Register stages in every synchronizer.
    pub cdc_stages: usize,
    /// Pixel clock-crossing FIFO holds `2^pixel_fifo_depth_log2` pixels.
    pub pixel_fifo_depth_log2: u32,
    pub sensor: SensorSettings,
    pub display: RasterTiming,
}

impl PipelineSettings {
    /// 640x480 RGB565 into a 64-bit, 28-bit-address memory with 64-beat
    /// bursts. 100 MHz memory clock, 25 MHz pixel clock.
    #[must_use]
    pub fn vga() -> Self {
        Self {
            frame_width: 640,
            frame_height: 480,
            memory: MemorySettings {
                bus_width_bits: 64,
                narrow_width_bits: PIXEL_BITS,
                burst_len: 64,
                fifo_depth: 512,
                addr_width_bits: 28,
                frame_base: 0,
            },
            clocks: ClockSettings {
                master_hz: 100_000_000,
                pixel_divisor: 4,
                pixel_phase: 2,
                memory_divisor: 1,
            },
            cdc_stages: 2,
            pixel_fifo_depth_log2: 5,
            sensor: SensorSettings {
                vsync_lines: 3,
                v_front_porch: 17,
                v_back_porch: 10,
                h_blank: 144,
            },
            display: RasterTiming::vga(),
        }
    }

    /// 32x16 frame with short blanking, for fast simulation.
    #[must_use]
    pub fn small() -> Self {
        Self {
            frame_width: 32,
            frame_height: 16,
            memory: MemorySettings {
                bus_width_bits: 64,
                narrow_width_bits: PIXEL_BITS,
                burst_len: 8,
                fifo_depth: 32,
                addr_width_bits: 20,
                frame_base: 0,
            },
            clocks: ClockSettings {
                master_hz: 100_000_000,
                pixel_divisor: 4,
                pixel_phase: 2,
                memory_divisor: 1,
            },
            cdc_stages: 2,
            pixel_fifo_depth_log2: 4,
            sensor: SensorSettings {
                vsync_lines: 3,
                v_front_porch: 2,
                v_back_porch: 2,
                h_blank: 8,
            },
            display: RasterTiming {
                h_active: 32,
                h_front_porch: 4,
                h_sync: 4,
                h_back_porch: 8,
                v_active: 16,
                v_front_porch: 1,
                v_sync: 2,
                v_back_porch: 3,
            },
        }
    }

    /// Change the frame size, keeping the display active area in step.
    #[must_use]
    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_width = width;
        self.frame_height = height;
        self.display.h_active = width;
        self.display.v_active = height;
        self
    }

    /// # Errors
    ///
    /// Returns an error if the text is not valid settings JSON.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Validated pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    settings: PipelineSettings,
    memory: MemoryConfig,
    master: MasterClock,
    pixel_clock: ClockDomain,
    memory_clock: ClockDomain,
    slot_bytes: u32,
    slots: [u32; 2],
}

fn clock_domain(divisor: u64, phase: u64) -> Result<ClockDomain, ConfigError> {
    if divisor == 0 || phase >= divisor {
        return Err(ConfigError::Clock { divisor, phase });
    }
    Ok(ClockDomain::new(divisor, phase))
}

impl PipelineConfig {
    /// # Errors
    ///
    /// Returns the first setting that is out of range.
    pub fn new(settings: &PipelineSettings) -> Result<Self, ConfigError> {
        let width = settings.frame_width;
        let height = settings.frame_height;
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyFrame { width, height });
        }

        let m = &settings.memory;
        let memory = MemoryConfig::new(
            m.bus_width_bits,
            m.narrow_width_bits,
            m.burst_len,
            m.fifo_depth,
            m.addr_width_bits,
        )?;
        if m.narrow_width_bits != PIXEL_BITS {
            return Err(ConfigError::PixelWidth(m.narrow_width_bits));
        }

        let d = &settings.display;
        if d.h_active != width || d.v_active != height {
            return Err(ConfigError::DisplaySize {
                display_width: d.h_active,
                display_height: d.v_active,
                width,
                height,
            });
        }
        if d.h_sync == 0 || d.v_sync == 0 {
            return Err(ConfigError::DisplaySync);
        }

        if settings.cdc_stages < 2 {
            return Err(ConfigError::SyncStages(settings.cdc_stages));
        }
        if !(1..=16).contains(&settings.pixel_fifo_depth_log2) {
            return Err(ConfigError::PixelFifoDepth(settings.pixel_fifo_depth_log2));
        }

        let c = &settings.clocks;
        let pixel_clock = clock_domain(c.pixel_divisor, c.pixel_phase)?;
        let memory_clock = clock_domain(c.memory_divisor, 0)?;

        let frame_bytes = u64::from(width) * u64::from(height) * u64::from(memory.narrow_bytes());
        let boundary = u64::from(BOUNDARY_BYTES);
        let slot_bytes = frame_bytes.div_ceil(boundary) * boundary;
        let mut slots = [0u32; 2];
        for (slot, base) in slots.iter_mut().enumerate() {
            let start = u64::from(m.frame_base) + slot as u64 * slot_bytes;
            let base_u32 = u32::try_from(start).map_err(|_| ConfigError::SlotOutOfRange {
                slot,
                base: m.frame_base,
            })?;
            memory.check_base_pointer(base_u32)?;
            if start + frame_bytes > memory.address_space() {
                return Err(ConfigError::SlotOutOfRange {
                    slot,
                    base: base_u32,
                });
            }
            *base = base_u32;
        }

        Ok(Self {
            settings: settings.clone(),
            memory,
            master: MasterClock::new(c.master_hz),
            pixel_clock,
            memory_clock,
            // Bounded by the address space check above.
            slot_bytes: slot_bytes as u32,
            slots,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    #[must_use]
    pub fn memory(&self) -> &MemoryConfig {
        &self.memory
    }

    #[must_use]
    pub fn frame_width(&self) -> u32 {
        self.settings.frame_width
    }

    #[must_use]
    pub fn frame_height(&self) -> u32 {
        self.settings.frame_height
    }

    #[must_use]
    pub fn pixels_per_frame(&self) -> usize {
        self.settings.frame_width as usize * self.settings.frame_height as usize
    }

    #[must_use]
    pub fn master_clock(&self) -> MasterClock {
        self.master
    }

    #[must_use]
    pub fn pixel_clock(&self) -> ClockDomain {
        self.pixel_clock
    }

    #[must_use]
    pub fn memory_clock(&self) -> ClockDomain {
        self.memory_clock
    }

    #[must_use]
    pub fn cdc_stages(&self) -> usize {
        self.settings.cdc_stages
    }

    #[must_use]
    pub fn pixel_fifo_depth_log2(&self) -> u32 {
        self.settings.pixel_fifo_depth_log2
    }

    /// Sensor timing around the configured frame.
    #[must_use]
    pub fn sensor_timing(&self) -> SensorTiming {
        let s = &self.settings.sensor;
        SensorTiming {
            width: self.settings.frame_width,
            height: self.settings.frame_height,
            vsync_lines: s.vsync_lines,
            v_front_porch: s.v_front_porch,
            v_back_porch: s.v_back_porch,
            h_blank: s.h_blank,
        }
    }

    #[must_use]
    pub fn display_timing(&self) -> RasterTiming {
        self.settings.display
    }

    /// Master ticks per sensor frame.
    #[must_use]
    pub fn sensor_frame_ticks(&self) -> u64 {
        self.sensor_timing().frame_clocks() * self.pixel_clock.divisor()
    }

    /// Bytes reserved per frame slot.
    #[must_use]
    pub fn slot_bytes(&self) -> u32 {
        self.slot_bytes
    }

    /// Base address of frame slot 0 or 1.
    #[must_use]
    pub fn slot_base(&self, slot: bool) -> u32 {
        self.slots[usize::from(slot)]
    }

    /// Memory edges from end of stream until the upsizer is told to pad
    /// its last partial word: the end-of-stream pulse synchronizer plus
    /// the pixel FIFO's output stages.
    #[must_use]
    pub fn flush_fifo_tap(&self) -> usize {
        self.settings.cdc_stages + 2
    }

    /// Memory edges from end of stream until the writer may issue its
    /// short final burst: the FIFO tap plus one edge per narrow word the
    /// pad may need, plus the commit into the burst FIFO.
    #[must_use]
    pub fn flush_axi_tap(&self) -> usize {
        self.flush_fifo_tap() + self.memory.ratio() as usize + 2
    }
}
