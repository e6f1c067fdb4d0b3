//! OV7670 parallel bus model.
//!
//! Drives vsync, href and the 8-bit data bus the way the sensor does in
//! RGB565 mode: one pixel is two bytes on two consecutive pixel clocks,
//! high byte first. A frame is `vsync_lines` lines of vsync, a vertical
//! front porch, `height` active lines and a vertical back porch. Every
//! line holds `width` pixel slots with href high followed by `h_blank`
//! blank slots.
//!
//! ```text
//! vsync ‾‾‾|_____________________________________________
//! href  ____________|‾‾‾‾‾‾‾‾|____|‾‾‾‾‾‾‾‾|____ ... ____
//!          |<-vfp ->|<-line->|
//! ```

/// Bus levels driven during one pixel clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusSample {
    pub vsync: bool,
    pub href: bool,
    pub data: u8,
}

/// A source of sensor bus samples, one per pixel clock.
pub trait PixelBus {
    /// Levels currently on the bus.
    fn output(&self) -> BusSample;

    /// Advance one pixel clock.
    fn clock(&mut self);

    /// Frames started since reset, counting the one in progress.
    fn frame(&self) -> u64;
}

/// Sensor frame timing, in lines and pixel slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorTiming {
    pub width: u32,
    pub height: u32,
    pub vsync_lines: u32,
    pub v_front_porch: u32,
    pub v_back_porch: u32,
    /// Blank pixel slots after the active part of each line.
    pub h_blank: u32,
}

impl SensorTiming {
    /// Datasheet VGA timing.
    #[must_use]
    pub const fn vga() -> Self {
        Self::with_size(640, 480)
    }

    /// Datasheet porches around an arbitrary active area.
    #[must_use]
    pub const fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            vsync_lines: 3,
            v_front_porch: 17,
            v_back_porch: 10,
            h_blank: 144,
        }
    }

    #[must_use]
    pub const fn total_lines(&self) -> u32 {
        self.vsync_lines + self.v_front_porch + self.height + self.v_back_porch
    }

    /// Pixel clocks per line.
    #[must_use]
    pub const fn line_clocks(&self) -> u32 {
        (self.width + self.h_blank) * 2
    }

    /// Pixel clocks per frame.
    #[must_use]
    pub const fn frame_clocks(&self) -> u64 {
        self.line_clocks() as u64 * self.total_lines() as u64
    }

    #[must_use]
    pub const fn pixels(&self) -> u32 {
        self.width * self.height
    }

    const fn first_active_line(&self) -> u32 {
        self.vsync_lines + self.v_front_porch
    }
}

/// Image generated by the bus model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Every pixel the same.
    Solid(u16),
    /// Red ramps across, green ramps down, blue follows the diagonal.
    Gradient,
    /// Pixel index plus a per-frame offset, so consecutive frames differ.
    Sequence,
}

impl Pattern {
    /// Pixel at (`x`, `y`) of `frame`.
    #[must_use]
    pub fn pixel(&self, timing: &SensorTiming, frame: u64, x: u32, y: u32) -> u16 {
        match *self {
            Pattern::Solid(v) => v,
            Pattern::Gradient => {
                let r = x * 32 / timing.width.max(1);
                let g = y * 64 / timing.height.max(1);
                let b = (x + y) & 0x1F;
                ((r << 11) | (g << 5) | b) as u16
            }
            Pattern::Sequence => {
                let index = (y * timing.width + x) as u16;
                index.wrapping_add((frame as u16).wrapping_mul(0x1111))
            }
        }
    }

    /// Whole frame in raster order.
    #[must_use]
    pub fn frame(&self, timing: &SensorTiming, frame: u64) -> Vec<u16> {
        (0..timing.height)
            .flat_map(|y| (0..timing.width).map(move |x| (x, y)))
            .map(|(x, y)| self.pixel(timing, frame, x, y))
            .collect()
    }
}

/// RGB565 output of an OV7670 running from its own pixel clock.
#[derive(Debug, Clone)]
pub struct Ov7670Bus {
    timing: SensorTiming,
    pattern: Pattern,
    line: u32,
    slot: u32,
    second_byte: bool,
    frame: u64,
}

impl Ov7670Bus {
    /// # Panics
    ///
    /// Panics if the active area is empty.
    #[must_use]
    pub fn new(timing: SensorTiming, pattern: Pattern) -> Self {
        assert!(
            timing.width > 0 && timing.height > 0,
            "sensor active area must not be empty"
        );
        Self {
            timing,
            pattern,
            line: 0,
            slot: 0,
            second_byte: false,
            frame: 0,
        }
    }

    /// Back to the first vsync line of frame 0.
    pub fn reset(&mut self) {
        self.line = 0;
        self.slot = 0;
        self.second_byte = false;
        self.frame = 0;
    }

    #[must_use]
    pub fn timing(&self) -> &SensorTiming {
        &self.timing
    }

    #[must_use]
    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    pub fn set_pattern(&mut self, pattern: Pattern) {
        self.pattern = pattern;
    }

    /// Pixels the sensor sends for `frame`.
    #[must_use]
    pub fn frame_pixels(&self, frame: u64) -> Vec<u16> {
        self.pattern.frame(&self.timing, frame)
    }

    fn active_row(&self) -> Option<u32> {
        let first = self.timing.first_active_line();
        (self.line >= first && self.line < first + self.timing.height).then(|| self.line - first)
    }
}

impl PixelBus for Ov7670Bus {
    fn output(&self) -> BusSample {
        let vsync = self.line < self.timing.vsync_lines;
        let row = self.active_row().filter(|_| self.slot < self.timing.width);
        match row {
            Some(y) => {
                let pixel = self.pattern.pixel(&self.timing, self.frame, self.slot, y);
                let [high, low] = pixel.to_be_bytes();
                BusSample {
                    vsync,
                    href: true,
                    data: if self.second_byte { low } else { high },
                }
            }
            None => BusSample {
                vsync,
                href: false,
                data: 0,
            },
        }
    }

    fn clock(&mut self) {
        if self.second_byte {
            self.slot += 1;
            if self.slot == self.timing.width + self.timing.h_blank {
                self.slot = 0;
                self.line += 1;
                if self.line == self.timing.total_lines() {
                    self.line = 0;
                    self.frame += 1;
                }
            }
        }
        self.second_byte = !self.second_byte;
    }

    fn frame(&self) -> u64 {
        self.frame
    }
}
