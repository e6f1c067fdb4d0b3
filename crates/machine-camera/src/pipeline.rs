//! Camera-to-display pipeline.
//!
//! Two clock domains share one master clock:
//!
//! - pixel domain: sensor bus, capture, write side of the pixel FIFO
//! - memory domain: read side of the pixel FIFO, memory writer, AXI RAM,
//!   memory reader and display scanner
//!
//! Pixels cross through an asynchronous FIFO; start-of-frame and
//! end-of-stream cross through pulse synchronizers. Each domain gets its
//! reset through its own reset synchronizer.
//!
//! Two frame slots alternate. Every capture start-of-frame toggles the
//! frame index, restarts the writer at the slot it now selects and leaves
//! the other slot, the last complete frame, to the reader. The reader
//! restarts at every display start-of-frame and is held in reset until two
//! capture frames have started, so it never shows memory nothing has
//! written yet.

#![allow(clippy::cast_possible_truncation)]

use axi_burst::{AxiRam, Flush, MemoryReader, MemoryWriter};
use fifo_cdc::{AsyncFifo, PulseSync, ReadPort, ResetSync, WritePort};
use log::{debug, info, warn};
use ov7670_capture::{Capture, Ov7670Bus, Pattern, PixelBus, Rgb565};
use sim_core::{Observable, Tickable, Value};

use crate::config::PipelineConfig;
use crate::display::RasterScanner;
use crate::flush::FlushSequencer;

/// Pipeline-level event counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Capture start-of-frame pulses seen in the memory domain.
    pub capture_frames: u64,
    /// Error pulses from the memory writer.
    pub write_errors: u64,
    /// Error pulses from the memory reader.
    pub read_errors: u64,
    /// Active display pixels with no data ready, in frames that started
    /// with reads enabled.
    pub underflows: u64,
    /// Pixels the display took from the memory reader.
    pub pixels_read: u64,
    /// Display frames shown from start to end without a fault.
    pub frames_displayed: u64,
}

pub struct Pipeline {
    config: PipelineConfig,
    master_clock: u64,
    reset_request: bool,
    controller_reset: bool,

    // Pixel domain.
    sensor: Box<dyn PixelBus>,
    capture: Capture,
    pixel_reset: ResetSync,

    // Crossings.
    pixel_fifo: AsyncFifo<u16>,
    sof_sync: PulseSync,
    eos_sync: PulseSync,

    // Memory domain.
    memory_reset: ResetSync,
    writer: MemoryWriter,
    reader: MemoryReader,
    ram: AxiRam,
    flush: FlushSequencer,
    display: RasterScanner,
    frame_index: bool,
    /// One bit shifted in per capture start-of-frame; reads are enabled
    /// once both are set.
    valid_frames: u8,
    /// Reads were enabled at the current display start-of-frame.
    frame_reading: bool,
    frame_clean: bool,

    framebuffer: Vec<u16>,
    displayed: Vec<u16>,
    stats: PipelineStats,
}

impl Pipeline {
    /// Build a pipeline fed by the OV7670 bus model.
    #[must_use]
    pub fn new(config: &PipelineConfig, pattern: Pattern) -> Self {
        let sensor = Ov7670Bus::new(config.sensor_timing(), pattern);
        Self::with_sensor(config, Box::new(sensor))
    }

    /// Build a pipeline fed by any pixel bus.
    #[must_use]
    pub fn with_sensor(config: &PipelineConfig, sensor: Box<dyn PixelBus>) -> Self {
        let stages = config.cdc_stages();
        let memory = config.memory();
        let pixels = config.pixels_per_frame();
        let mut pipeline = Self {
            config: config.clone(),
            master_clock: 0,
            reset_request: false,
            controller_reset: false,
            sensor,
            capture: Capture::new(config.frame_width(), config.frame_height()),
            pixel_reset: ResetSync::new(stages),
            pixel_fifo: AsyncFifo::new(config.pixel_fifo_depth_log2(), stages),
            sof_sync: PulseSync::new(stages),
            eos_sync: PulseSync::new(stages),
            memory_reset: ResetSync::new(stages),
            writer: MemoryWriter::new(memory),
            reader: MemoryReader::new(memory),
            ram: AxiRam::new(memory),
            flush: FlushSequencer::new(config.flush_fifo_tap(), config.flush_axi_tap()),
            display: RasterScanner::new(config.display_timing()),
            frame_index: false,
            valid_frames: 0,
            frame_reading: false,
            frame_clean: false,
            framebuffer: vec![0; pixels],
            displayed: vec![0; pixels],
            stats: PipelineStats::default(),
        };
        pipeline.writer.reset(pipeline.write_slot());
        pipeline.reader.reset(pipeline.read_slot());
        pipeline
    }

    /// Assert system reset on the next master tick.
    ///
    /// Both domains drop into reset at once and leave it through their
    /// reset synchronizers. The sensor keeps running; memory contents are
    /// kept.
    pub fn reset(&mut self) {
        self.reset_request = true;
    }

    /// Drive the memory controller's reset output. The memory domain stays
    /// in reset while this is set.
    pub fn hold_memory_reset(&mut self, asserted: bool) {
        self.controller_reset = asserted;
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn master_clock(&self) -> u64 {
        self.master_clock
    }

    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Ping-pong slot bit.
    #[must_use]
    pub fn frame_index(&self) -> bool {
        self.frame_index
    }

    /// Slot the writer fills.
    #[must_use]
    pub fn write_slot(&self) -> u32 {
        self.config.slot_base(self.frame_index)
    }

    /// Slot the reader shows: the other half of the same toggle.
    #[must_use]
    pub fn read_slot(&self) -> u32 {
        self.config.slot_base(!self.frame_index)
    }

    /// Two capture frames have started since reset.
    #[must_use]
    pub fn reads_enabled(&self) -> bool {
        self.valid_frames == 0b11
    }

    #[must_use]
    pub fn sensor_frame(&self) -> u64 {
        self.sensor.frame()
    }

    #[must_use]
    pub fn capture(&self) -> &Capture {
        &self.capture
    }

    #[must_use]
    pub fn pixel_fifo(&self) -> &AsyncFifo<u16> {
        &self.pixel_fifo
    }

    #[must_use]
    pub fn writer(&self) -> &MemoryWriter {
        &self.writer
    }

    #[must_use]
    pub fn reader(&self) -> &MemoryReader {
        &self.reader
    }

    #[must_use]
    pub fn ram(&self) -> &AxiRam {
        &self.ram
    }

    /// For pause patterns and error injection.
    pub fn ram_mut(&mut self) -> &mut AxiRam {
        &mut self.ram
    }

    #[must_use]
    pub fn display(&self) -> &RasterScanner {
        &self.display
    }

    /// Display frame being drawn, RGB565.
    #[must_use]
    pub fn framebuffer(&self) -> &[u16] {
        &self.framebuffer
    }

    /// Last frame shown cleanly, RGB565.
    #[must_use]
    pub fn displayed_frame(&self) -> &[u16] {
        &self.displayed
    }

    // ---------------------------------------------------------------------
    // Running
    // ---------------------------------------------------------------------

    /// Run one sensor frame period. Returns the master ticks executed.
    pub fn run_frame(&mut self) -> u64 {
        let ticks = self.config.sensor_frame_ticks();
        for _ in 0..ticks {
            self.tick();
        }
        ticks
    }

    /// Tick until `done` holds or `max_ticks` have run. Returns whether
    /// `done` was reached.
    pub fn run_until(&mut self, max_ticks: u64, mut done: impl FnMut(&Self) -> bool) -> bool {
        for _ in 0..max_ticks {
            if done(self) {
                return true;
            }
            self.tick();
        }
        done(self)
    }

    // ---------------------------------------------------------------------
    // Clock domains
    // ---------------------------------------------------------------------

    /// One pixel-clock edge. Returns the pixel FIFO write port and the
    /// start-of-frame and end-of-stream levels for the synchronizers.
    fn pixel_edge(&mut self) -> (WritePort<u16>, bool, bool) {
        let in_reset = self.pixel_reset.asserted();
        let pixel = self.capture.pixel().filter(|_| !in_reset);
        let port = WritePort {
            en: pixel.is_some(),
            data: pixel.map_or(0, Rgb565::raw),
        };
        let sof = self.capture.sof() && !in_reset;
        let eos = self.capture.eos() && !in_reset;

        let sample = self.sensor.output();
        if in_reset {
            self.capture.reset();
        } else {
            self.capture.tick(sample);
        }
        self.sensor.clock();
        (port, sof, eos)
    }

    /// One memory-clock edge. Returns the pixel FIFO read port.
    fn memory_edge(&mut self) -> ReadPort {
        let in_reset = self.memory_reset.asserted();
        let capture_sof = self.sof_sync.pulse() && !in_reset;
        let eos = self.eos_sync.pulse() && !in_reset;
        let reads_enabled = self.reads_enabled();

        let write_slave = self.ram.write_slave();
        let read_slave = self.ram.read_slave();
        let write_master = self.writer.master();
        let read_master = self.reader.master();

        if self.writer.error() {
            self.stats.write_errors += 1;
        }
        if self.reader.error() {
            self.stats.read_errors += 1;
        }

        // Write side.
        let writer_reset = in_reset || capture_sof;
        let pixel_fifo_empty = self.pixel_fifo.empty();
        let pixel_rd = !writer_reset && !pixel_fifo_empty && !self.writer.full();
        if writer_reset {
            // The memory is reset on this edge too, so nothing it has
            // accepted is owed.
            if in_reset {
                self.frame_index = false;
                self.valid_frames = 0;
                self.writer.reset(self.write_slot());
            } else {
                self.start_capture_frame();
                self.writer.reset_at_edge(self.write_slot(), &write_slave);
            }
        } else {
            // Nothing is flushed while the last pixels are still crossing.
            let flush = Flush {
                pad: self.flush.fifo_flush() && pixel_fifo_empty,
                burst: self.flush.axi_flush() && pixel_fifo_empty,
            };
            let wr = pixel_rd.then(|| u64::from(self.pixel_fifo.rd_data()));
            self.writer.tick(wr, flush, &write_slave);
        }
        self.flush.tick(eos, writer_reset);

        // Read side.
        let display_sof = self.display.sof();
        let position = self.display.position();
        let reader_reset = in_reset || display_sof || !reads_enabled;
        let rd_en = position.is_some() && !reader_reset && !self.reader.empty();

        if display_sof {
            self.frame_reading = reads_enabled && !in_reset;
            self.frame_clean = self.frame_reading;
        }
        if let Some((x, y)) = position {
            let pixel = if rd_en {
                self.stats.pixels_read += 1;
                self.reader.rd_data() as u16
            } else {
                if self.frame_reading && !in_reset {
                    if self.frame_clean {
                        warn!("display underflow at ({x}, {y})");
                    }
                    self.stats.underflows += 1;
                    self.frame_clean = false;
                }
                0
            };
            let width = self.config.frame_width();
            self.framebuffer[(y * width + x) as usize] = pixel;
        }
        if self.display.eoa() && self.frame_clean {
            self.stats.frames_displayed += 1;
            self.displayed.copy_from_slice(&self.framebuffer);
            debug!(
                "display frame {} complete from {:#010X}",
                self.stats.frames_displayed,
                self.read_slot()
            );
        }

        if in_reset {
            self.reader.reset(self.read_slot());
        } else if reader_reset {
            self.reader.reset_at_edge(self.read_slot(), &read_slave);
        } else {
            self.reader.tick(rd_en, &read_slave);
        }

        if in_reset {
            self.ram.reset();
            self.display.reset();
            self.frame_reading = false;
            self.frame_clean = false;
        } else {
            self.ram.tick(&write_master, &read_master);
            self.display.tick();
        }

        ReadPort { en: pixel_rd }
    }

    fn start_capture_frame(&mut self) {
        let was_enabled = self.reads_enabled();
        self.frame_index = !self.frame_index;
        self.valid_frames = ((self.valid_frames << 1) | 1) & 0b11;
        self.stats.capture_frames += 1;
        debug!(
            "capture frame {} start, writing {:#010X}",
            self.stats.capture_frames,
            self.write_slot()
        );
        if !was_enabled && self.reads_enabled() {
            info!("frame buffer holds a complete frame, display reads enabled");
        }
    }
}

impl Tickable for Pipeline {
    fn tick(&mut self) {
        let now = self.master_clock;
        let pixel_edge = self.config.pixel_clock().is_edge(now);
        let memory_edge = self.config.memory_clock().is_edge(now);

        let system_reset = std::mem::take(&mut self.reset_request);
        if system_reset {
            debug!("system reset at tick {now}");
            self.pixel_fifo.reset();
            self.sof_sync.reset();
            self.eos_sync.reset();
        }

        let mut write = None;
        let mut sof = None;
        let mut eos = None;
        if pixel_edge {
            let (port, s, e) = self.pixel_edge();
            write = Some(port);
            sof = Some(s);
            eos = Some(e);
        }
        let read = memory_edge.then(|| self.memory_edge());

        self.pixel_fifo.tick(write, read);
        self.sof_sync.tick(sof, memory_edge);
        self.eos_sync.tick(eos, memory_edge);
        self.pixel_reset.tick(system_reset, pixel_edge);
        self.memory_reset
            .tick(system_reset || self.controller_reset, memory_edge);

        self.master_clock += 1;
    }
}

impl Observable for Pipeline {
    fn query(&self, path: &str) -> Option<Value> {
        let value: Value = match path {
            "master_clock" => self.master_clock.into(),
            "frame_index" => self.frame_index.into(),
            "reads_enabled" => self.reads_enabled().into(),
            "write_slot" => self.write_slot().into(),
            "read_slot" => self.read_slot().into(),
            "capture.frames" => self.capture.frames().into(),
            "capture.short_frames" => self.capture.short_frames().into(),
            "capture.pixel_count" => self.capture.pixel_count().into(),
            "pixel_fifo.overflows" => self.pixel_fifo.overflows().into(),
            "pixel_fifo.occupancy" => self.pixel_fifo.ram_occupancy().into(),
            "writer.reserve_count" => self.writer.fifo().reserve_count().into(),
            "writer.next_addr" => self.writer.writer().next_addr().into(),
            "writer.bursts" => self.writer.stats().bursts.into(),
            "writer.flush_bursts" => self.writer.stats().flush_bursts.into(),
            "writer.errors" => self.stats.write_errors.into(),
            "reader.reserve_count" => self.reader.fifo().reserve_count().into(),
            "reader.next_addr" => self.reader.reader().next_addr().into(),
            "reader.bursts" => self.reader.stats().bursts.into(),
            "reader.errors" => self.stats.read_errors.into(),
            "display.frames" => self.stats.frames_displayed.into(),
            "display.underflows" => self.stats.underflows.into(),
            "display.pixels_read" => self.stats.pixels_read.into(),
            "display.x" => self.display.counters().0.into(),
            "display.y" => self.display.counters().1.into(),
            "memory.write_bursts" => self.ram.write_bursts().into(),
            "memory.read_bursts" => self.ram.read_bursts().into(),
            _ => return None,
        };
        Some(value)
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "master_clock",
            "frame_index",
            "reads_enabled",
            "write_slot",
            "read_slot",
            "capture.frames",
            "capture.short_frames",
            "capture.pixel_count",
            "pixel_fifo.overflows",
            "pixel_fifo.occupancy",
            "writer.reserve_count",
            "writer.next_addr",
            "writer.bursts",
            "writer.flush_bursts",
            "writer.errors",
            "reader.reserve_count",
            "reader.next_addr",
            "reader.bursts",
            "reader.errors",
            "display.frames",
            "display.underflows",
            "display.pixels_read",
            "display.x",
            "display.y",
            "memory.write_bursts",
            "memory.read_bursts",
        ]
    }
}
