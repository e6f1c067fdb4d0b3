//! Whole-frame scenarios through the memory writer, the AXI RAM model and
//! the memory reader.

use axi_burst::{
    AxiRam, Channel, Flush, MemoryConfig, MemoryReader, MemoryWriter, ProtocolStats, Resp,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const WIDTH: usize = 640;
const HEIGHT: usize = 480;

fn vga_config() -> MemoryConfig {
    MemoryConfig::new(64, 16, 64, 512, 28).expect("valid VGA memory config")
}

fn test_frame(pixels: usize) -> Vec<u16> {
    (0..pixels)
        .map(|i| (i as u16).wrapping_mul(31).wrapping_add((i / WIDTH) as u16))
        .collect()
}

/// Push `pixels` through the writer, then hold flush until the writer and
/// the memory are both idle.
fn write_frame(writer: &mut MemoryWriter, ram: &mut AxiRam, pixels: &[u16], rng: Option<&mut StdRng>) {
    let mut rng = rng;
    let mut next = 0;
    let mut cycles = 0u64;
    let mut flush_cycles = 0;
    loop {
        // Flush starts the edge after the last word went in.
        let flush = if next == pixels.len() { Flush::ALL } else { Flush::NONE };
        if flush.pad {
            flush_cycles += 1;
        }
        let stall = rng.as_mut().is_some_and(|r| r.gen_bool(0.1));
        let wr = (next < pixels.len() && !writer.full() && !stall).then(|| u64::from(pixels[next]));
        if wr.is_some() {
            next += 1;
        }

        let slave = ram.write_slave();
        let master = writer.master();
        writer.tick(wr, flush, &slave);
        ram.tick(&master, &Default::default());

        cycles += 1;
        assert!(cycles < 5_000_000, "write never drained");
        if flush_cycles > 16 && writer.is_idle() && ram.is_idle() {
            break;
        }
    }
}

fn read_frame(reader: &mut MemoryReader, ram: &mut AxiRam, count: usize) -> Vec<u16> {
    let mut out = Vec::with_capacity(count);
    let mut cycles = 0u64;
    while out.len() < count {
        let rd_en = !reader.empty();
        if rd_en {
            out.push(reader.rd_data() as u16);
        }
        let slave = ram.read_slave();
        let master = reader.master();
        reader.tick(rd_en, &slave);
        ram.tick(&Default::default(), &master);
        cycles += 1;
        assert!(cycles < 5_000_000, "read stalled");
    }
    out
}

#[test]
fn vga_frame_is_exactly_1200_bursts() {
    let cfg = vga_config();
    let mut ram = AxiRam::new(&cfg);
    let mut writer = MemoryWriter::new(&cfg);
    writer.reset(0);

    let frame = test_frame(WIDTH * HEIGHT);
    write_frame(&mut writer, &mut ram, &frame, None);

    let bursts = ram.completed_writes();
    assert_eq!(bursts.len(), WIDTH * HEIGHT * 2 / 8 / 64);
    assert!(bursts.iter().all(|b| b.beats == 64 && b.resp == Resp::Okay));
    assert!(bursts.windows(2).all(|w| w[1].addr == w[0].addr + 512));
    assert_eq!(writer.stats().flush_bursts, 0);
    assert_eq!(writer.stats().bursts, 1200);
    assert_eq!(ram.protocol(), ProtocolStats::default());

    let mut reader = MemoryReader::new(&cfg);
    reader.reset(0);
    let back = read_frame(&mut reader, &mut ram, frame.len());
    assert!(back == frame, "frame read back differs from frame written");
}

#[test]
fn random_backpressure_preserves_data() {
    let cfg = MemoryConfig::new(64, 16, 8, 32, 20).unwrap();
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let mut ram = AxiRam::new(&cfg);
    let pattern = |rng: &mut StdRng| -> Vec<bool> { (0..256).map(|_| rng.gen_bool(0.3)).collect() };
    for channel in [Channel::Aw, Channel::W, Channel::B, Channel::Ar, Channel::R] {
        let p = pattern(&mut rng);
        ram.set_pause_pattern(channel, p);
    }

    let pixels: Vec<u16> = (0..3000).map(|_| rng.r#gen()).collect();
    let mut writer = MemoryWriter::new(&cfg);
    writer.reset(0x4000);
    write_frame(&mut writer, &mut ram, &pixels, Some(&mut rng));

    let protocol = ram.protocol();
    assert_eq!(protocol.write_gaps, 0);
    assert_eq!(protocol.misplaced_last, 0);
    assert_eq!(protocol.boundary_crossings, 0);

    // 3000 narrow words = 750 bus words = 93 full bursts + 6 beats.
    let bursts = ram.completed_writes();
    assert_eq!(bursts.len(), 94);
    assert_eq!(bursts.last().map(|b| b.beats), Some(6));
    assert_eq!(writer.stats().flush_bursts, 1);

    let mut reader = MemoryReader::new(&cfg);
    reader.reset(0x4000);
    let back = read_frame(&mut reader, &mut ram, pixels.len());
    assert_eq!(back, pixels);
}

#[test]
fn partial_wide_word_is_padded_at_flush() {
    let cfg = MemoryConfig::new(64, 16, 4, 8, 16).unwrap();
    let mut ram = AxiRam::new(&cfg);
    let mut writer = MemoryWriter::new(&cfg);
    writer.reset(0);
    // 4 bursts of 16 narrow words, then one lone word.
    let pixels: Vec<u16> = (1..=65).collect();
    write_frame(&mut writer, &mut ram, &pixels, None);

    let bursts = ram.completed_writes();
    assert_eq!(bursts.len(), 5);
    assert_eq!(bursts[4].beats, 1);
    let back = ram.read_words(0, 68, 2);
    assert_eq!(back[64], 65);
    assert_eq!(&back[65..], &[0, 0, 0]);
}

#[test]
fn error_responses_are_reported_not_fatal() {
    let cfg = MemoryConfig::new(64, 16, 4, 8, 16).unwrap();
    let mut ram = AxiRam::new(&cfg);
    ram.inject_error(0x20..0x40, Resp::SlvErr);
    let mut writer = MemoryWriter::new(&cfg);
    writer.reset(0);

    let pixels: Vec<u16> = (0..64).collect();
    let mut pulses = 0;
    let mut next = 0;
    for _ in 0..400 {
        if writer.error() {
            pulses += 1;
        }
        let wr = (next < pixels.len() && !writer.full()).then(|| u64::from(pixels[next]));
        if wr.is_some() {
            next += 1;
        }
        let slave = ram.write_slave();
        let master = writer.master();
        writer.tick(wr, Flush::NONE, &slave);
        ram.tick(&master, &Default::default());
    }

    assert_eq!(pulses, 1);
    assert_eq!(writer.stats().error_responses, 1);
    assert_eq!(writer.stats().bursts, 4);
    // The failed burst left memory untouched; the ones after it landed.
    assert_eq!(ram.read_words(0x20, 16, 2), vec![0; 16]);
    assert_eq!(ram.read_words(0x40, 16, 2), (32..48).collect::<Vec<u64>>());
}
