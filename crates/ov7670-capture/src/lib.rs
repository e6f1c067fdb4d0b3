//! OV7670 camera front end.
//!
//! [`Ov7670Bus`] stands in for the sensor and produces its RGB565 bus
//! timing. [`Capture`] is the logic on the receiving side: it finds frame
//! starts and assembles byte pairs into pixels.

pub mod bus;
pub mod capture;
pub mod pixel;

pub use bus::{BusSample, Ov7670Bus, Pattern, PixelBus, SensorTiming};
pub use capture::Capture;
pub use pixel::Rgb565;
