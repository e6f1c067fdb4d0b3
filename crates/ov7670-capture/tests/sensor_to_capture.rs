//! The capture block fed directly from the sensor model.

use ov7670_capture::{Capture, Ov7670Bus, Pattern, PixelBus, SensorTiming};
use proptest::prelude::*;

struct Frame {
    pixels: Vec<u16>,
    sof_at: u64,
    eos_at: u64,
}

/// Run until `frames` complete frames were captured.
fn capture_frames(bus: &mut Ov7670Bus, frames: usize) -> Vec<Frame> {
    let timing = *bus.timing();
    let mut cap = Capture::new(timing.width, timing.height);
    let mut out: Vec<Frame> = Vec::new();
    let mut current: Option<Frame> = None;
    let limit = timing.frame_clocks() * (frames as u64 + 2);

    for clock in 0..limit {
        if cap.sof() {
            current = Some(Frame {
                pixels: Vec::new(),
                sof_at: clock,
                eos_at: 0,
            });
        }
        if let Some(p) = cap.pixel() {
            current
                .as_mut()
                .expect("pixel before start of frame")
                .pixels
                .push(p.raw());
        }
        if cap.eos() {
            let mut frame = current.take().expect("end of stream without frame");
            frame.eos_at = clock;
            out.push(frame);
            if out.len() == frames {
                break;
            }
        }
        cap.tick(bus.output());
        bus.clock();
    }
    out
}

#[test]
fn vga_frame_matches_sensor() {
    let mut bus = Ov7670Bus::new(SensorTiming::vga(), Pattern::Gradient);
    let frames = capture_frames(&mut bus, 1);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].pixels.len(), 640 * 480);
    assert_eq!(frames[0].pixels, bus.frame_pixels(0));
}

#[test]
fn consecutive_frames_are_one_frame_period_apart() {
    let timing = SensorTiming::with_size(16, 8);
    let mut bus = Ov7670Bus::new(timing, Pattern::Sequence);
    let frames = capture_frames(&mut bus, 3);
    assert_eq!(frames.len(), 3);
    for (n, frame) in frames.iter().enumerate() {
        assert_eq!(frame.pixels, bus.frame_pixels(n as u64));
    }
    assert_eq!(frames[1].sof_at - frames[0].sof_at, timing.frame_clocks());
    assert_eq!(frames[2].eos_at - frames[1].eos_at, timing.frame_clocks());
    // Start of frame lands one edge after vsync falls.
    assert_eq!(frames[0].sof_at, u64::from(timing.vsync_lines * timing.line_clocks()) + 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn any_geometry_captures_whole_frame(
        width in 1u32..24,
        height in 1u32..12,
        h_blank in 1u32..8,
        v_front_porch in 0u32..4,
        v_back_porch in 0u32..4,
    ) {
        let timing = SensorTiming {
            width,
            height,
            vsync_lines: 3,
            v_front_porch,
            v_back_porch,
            h_blank,
        };
        let mut bus = Ov7670Bus::new(timing, Pattern::Sequence);
        let frames = capture_frames(&mut bus, 2);
        prop_assert_eq!(frames.len(), 2);
        prop_assert_eq!(&frames[0].pixels, &bus.frame_pixels(0));
        prop_assert_eq!(&frames[1].pixels, &bus.frame_pixels(1));
    }
}
