//! PNG screenshots of the displayed frame.

use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::Path;

use ov7670_capture::Rgb565;

use crate::pipeline::Pipeline;

/// Expand RGB565 pixels to RGBA bytes.
#[must_use]
pub fn rgba_bytes(pixels: &[u16]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(pixels.len() * 4);
    for &pixel in pixels {
        let [r, g, b] = Rgb565(pixel).to_rgb888();
        rgba.extend_from_slice(&[r, g, b, 0xFF]);
    }
    rgba
}

/// Encode RGB565 pixels as an RGBA PNG.
///
/// # Errors
///
/// Returns an error if encoding or writing fails.
pub fn write_png<W: Write>(out: W, width: u32, height: u32, pixels: &[u16]) -> Result<(), Box<dyn Error>> {
    let mut encoder = png::Encoder::new(out, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&rgba_bytes(pixels))?;
    Ok(())
}

/// Save the last cleanly displayed frame as a PNG file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn save_screenshot(pipeline: &Pipeline, path: &Path) -> Result<(), Box<dyn Error>> {
    let config = pipeline.config();
    let file = fs::File::create(path)?;
    write_png(
        std::io::BufWriter::new(file),
        config.frame_width(),
        config.frame_height(),
        pipeline.displayed_frame(),
    )
}
