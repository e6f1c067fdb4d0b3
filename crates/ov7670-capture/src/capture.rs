//! Pixel capture: turns the sensor's byte stream into RGB565 words.
//!
//! Runs on the sensor pixel clock. All outputs are registered, so they
//! appear one edge after the bus sample that caused them.
//!
//! - `sof` pulses for one cycle after vsync falls.
//! - `pixel` carries a word for one cycle on the edge after its second
//!   byte was sampled. Pixels before the first `sof` are dropped.
//! - `eos` pulses alongside the pixel that completes `width * height`.
//!   Anything after that is dropped until the next `sof`.

use log::{debug, warn};

use crate::bus::BusSample;
use crate::pixel::Rgb565;

#[derive(Debug, Clone)]
pub struct Capture {
    width: u32,
    height: u32,

    vsync_prev: bool,
    /// First byte of the pixel being assembled.
    high: Option<u8>,
    /// A start of frame has been seen and the frame is not complete yet.
    armed: bool,
    pixel_count: u32,

    pixel: Option<Rgb565>,
    sof: bool,
    eos: bool,

    frames: u64,
    short_frames: u64,
}

impl Capture {
    /// # Panics
    ///
    /// Panics if the frame is empty.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        assert!(width > 0 && height > 0, "capture frame must not be empty");
        Self {
            width,
            height,
            vsync_prev: false,
            high: None,
            armed: false,
            pixel_count: 0,
            pixel: None,
            sof: false,
            eos: false,
            frames: 0,
            short_frames: 0,
        }
    }

    /// Clear all state. The next frame is only captured after a fresh
    /// vsync falling edge.
    pub fn reset(&mut self) {
        self.vsync_prev = false;
        self.high = None;
        self.armed = false;
        self.pixel_count = 0;
        self.pixel = None;
        self.sof = false;
        self.eos = false;
    }

    /// Pixel valid this cycle.
    #[must_use]
    pub fn pixel(&self) -> Option<Rgb565> {
        self.pixel
    }

    #[must_use]
    pub fn sof(&self) -> bool {
        self.sof
    }

    #[must_use]
    pub fn eos(&self) -> bool {
        self.eos
    }

    /// Frames completed since construction.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Frames cut short by a new vsync.
    #[must_use]
    pub fn short_frames(&self) -> u64 {
        self.short_frames
    }

    /// Pixels captured in the current frame.
    #[must_use]
    pub fn pixel_count(&self) -> u32 {
        self.pixel_count
    }

    #[must_use]
    pub fn pixels_per_frame(&self) -> u32 {
        self.width * self.height
    }

    /// Sample the bus on one pixel clock edge.
    pub fn tick(&mut self, bus: BusSample) {
        let sof = self.vsync_prev && !bus.vsync;
        self.vsync_prev = bus.vsync;

        self.sof = sof;
        self.pixel = None;
        self.eos = false;

        if sof {
            if self.armed && self.pixel_count > 0 {
                warn!(
                    "capture: frame cut short at {} of {} pixels",
                    self.pixel_count,
                    self.pixels_per_frame()
                );
                self.short_frames += 1;
            }
            self.armed = true;
            self.pixel_count = 0;
            self.high = None;
        }

        if !bus.href {
            self.high = None;
            return;
        }
        if !self.armed {
            return;
        }

        match self.high.take() {
            None => self.high = Some(bus.data),
            Some(high) => {
                self.pixel = Some(Rgb565::from_bytes(high, bus.data));
                self.pixel_count += 1;
                if self.pixel_count == self.pixels_per_frame() {
                    self.eos = true;
                    self.armed = false;
                    self.frames += 1;
                    debug!("capture: frame {} complete", self.frames);
                }
            }
        }
    }
}
