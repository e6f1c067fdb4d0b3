//! OV7670 camera to AXI frame buffer to raster display.
//!
//! [`Pipeline`] wires the capture front end, the pixel clock crossing, the
//! AXI burst writer and reader, a memory model and a display timing
//! generator into one model advanced by a master clock. Frames are double
//! buffered in two memory slots.

pub mod config;
pub mod display;
pub mod flush;
pub mod pipeline;
#[cfg(feature = "native")]
pub mod screenshot;

pub use config::{
    ClockSettings, ConfigError, MemorySettings, PipelineConfig, PipelineSettings, SensorSettings,
};
pub use display::{RasterScanner, RasterTiming};
pub use flush::FlushSequencer;
pub use pipeline::{Pipeline, PipelineStats};
