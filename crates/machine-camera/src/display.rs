//! Raster display timing generator.
//!
//! Each axis runs sync, back porch, active, front porch, in that order.
//! The frame starts on the first sync clock of the first sync line, which
//! gives the memory reader the whole vertical sync and back porch to fill
//! its FIFO before the first active pixel.

use serde::{Deserialize, Serialize};

/// Clocks per line and lines per frame for each region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterTiming {
    pub h_active: u32,
    pub h_front_porch: u32,
    pub h_sync: u32,
    pub h_back_porch: u32,
    pub v_active: u32,
    pub v_front_porch: u32,
    pub v_sync: u32,
    pub v_back_porch: u32,
}

impl RasterTiming {
    /// 640x480 at 60 Hz.
    #[must_use]
    pub const fn vga() -> Self {
        Self {
            h_active: 640,
            h_front_porch: 16,
            h_sync: 96,
            h_back_porch: 48,
            v_active: 480,
            v_front_porch: 10,
            v_sync: 2,
            v_back_porch: 33,
        }
    }

    #[must_use]
    pub const fn h_total(&self) -> u32 {
        self.h_sync + self.h_back_porch + self.h_active + self.h_front_porch
    }

    #[must_use]
    pub const fn v_total(&self) -> u32 {
        self.v_sync + self.v_back_porch + self.v_active + self.v_front_porch
    }

    /// Display clocks per frame.
    #[must_use]
    pub const fn frame_clocks(&self) -> u64 {
        self.h_total() as u64 * self.v_total() as u64
    }

    const fn h_start(&self) -> u32 {
        self.h_sync + self.h_back_porch
    }

    const fn v_start(&self) -> u32 {
        self.v_sync + self.v_back_porch
    }
}

/// Horizontal and vertical counters with decoded outputs.
#[derive(Debug, Clone)]
pub struct RasterScanner {
    timing: RasterTiming,
    x: u32,
    y: u32,
    frames: u64,
}

impl RasterScanner {
    #[must_use]
    pub fn new(timing: RasterTiming) -> Self {
        Self {
            timing,
            x: 0,
            y: 0,
            frames: 0,
        }
    }

    /// Back to the first clock of a frame.
    pub fn reset(&mut self) {
        self.x = 0;
        self.y = 0;
    }

    #[must_use]
    pub fn timing(&self) -> &RasterTiming {
        &self.timing
    }

    /// Raw counters.
    #[must_use]
    pub fn counters(&self) -> (u32, u32) {
        (self.x, self.y)
    }

    /// Frames scanned to completion.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub fn hsync(&self) -> bool {
        self.x < self.timing.h_sync
    }

    #[must_use]
    pub fn vsync(&self) -> bool {
        self.y < self.timing.v_sync
    }

    #[must_use]
    pub fn sof(&self) -> bool {
        self.x == 0 && self.y == 0
    }

    /// Position within the active area, if the beam is in it.
    #[must_use]
    pub fn position(&self) -> Option<(u32, u32)> {
        let x = self.x.checked_sub(self.timing.h_start())?;
        let y = self.y.checked_sub(self.timing.v_start())?;
        (x < self.timing.h_active && y < self.timing.v_active).then_some((x, y))
    }

    #[must_use]
    pub fn active(&self) -> bool {
        self.position().is_some()
    }

    /// First active pixel of the frame.
    #[must_use]
    pub fn soa(&self) -> bool {
        self.position() == Some((0, 0))
    }

    /// Last active pixel of the frame.
    #[must_use]
    pub fn eoa(&self) -> bool {
        self.position() == Some((self.timing.h_active - 1, self.timing.v_active - 1))
    }

    #[must_use]
    pub fn vblank(&self) -> bool {
        let first = self.timing.v_start();
        self.y < first || self.y >= first + self.timing.v_active
    }

    /// Advance one display clock.
    pub fn tick(&mut self) {
        self.x += 1;
        if self.x == self.timing.h_total() {
            self.x = 0;
            self.y += 1;
            if self.y == self.timing.v_total() {
                self.y = 0;
                self.frames += 1;
            }
        }
    }
}
