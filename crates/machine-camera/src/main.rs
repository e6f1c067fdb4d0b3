//! Camera pipeline simulator.
//!
//! Runs the pipeline headless for a number of sensor frames, reports what
//! moved through it and optionally saves the last displayed frame.

use std::path::PathBuf;
use std::process;

use log::{error, info, warn};
use machine_camera::{Pipeline, PipelineConfig, PipelineSettings, screenshot};
use ov7670_capture::Pattern;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::util::SubscriberInitExt;

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

struct CliArgs {
    config_path: Option<PathBuf>,
    small: bool,
    frames: u32,
    screenshot_path: Option<PathBuf>,
    pattern: Pattern,
    print_config: bool,
    verbose: bool,
}

fn parse_pattern(name: &str) -> Option<Pattern> {
    match name {
        "gradient" => Some(Pattern::Gradient),
        "sequence" => Some(Pattern::Sequence),
        "solid" => Some(Pattern::Solid(0xFFFF)),
        other => {
            let hex = other.strip_prefix("solid:")?;
            let hex = hex.strip_prefix("0x").unwrap_or(hex);
            u16::from_str_radix(hex, 16).ok().map(Pattern::Solid)
        }
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        config_path: None,
        small: false,
        frames: 4,
        screenshot_path: None,
        pattern: Pattern::Gradient,
        print_config: false,
        verbose: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                cli.config_path = args.get(i).map(PathBuf::from);
            }
            "--small" => {
                cli.small = true;
            }
            "--frames" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.frames = s.parse().unwrap_or(4);
                }
            }
            "--screenshot" => {
                i += 1;
                cli.screenshot_path = args.get(i).map(PathBuf::from);
            }
            "--pattern" => {
                i += 1;
                let name = args.get(i).map_or("", String::as_str);
                match parse_pattern(name) {
                    Some(pattern) => cli.pattern = pattern,
                    None => {
                        eprintln!("Unknown pattern: {name}");
                        process::exit(1);
                    }
                }
            }
            "--print-config" => {
                cli.print_config = true;
            }
            "--verbose" | "-v" => {
                cli.verbose = true;
            }
            "--help" | "-h" => {
                eprintln!("Usage: camera-sim [OPTIONS]");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --config <file>      Pipeline settings (JSON) [default: VGA preset]");
                eprintln!("  --small              Use the 32x16 preset");
                eprintln!("  --frames <n>         Sensor frames to run [default: 4]");
                eprintln!("  --screenshot <file>  Save the last displayed frame as PNG");
                eprintln!(
                    "  --pattern <name>     gradient, sequence, solid or solid:<hex> [default: gradient]"
                );
                eprintln!("  --print-config       Print the settings as JSON and exit");
                eprintln!("  -v, --verbose        Log per-frame events");
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .compact()
        .finish()
        .init();
}

fn load_settings(cli: &CliArgs) -> PipelineSettings {
    match (&cli.config_path, cli.small) {
        (Some(path), _) => PipelineSettings::from_json_file(path).unwrap_or_else(|e| {
            error!("{}: {e}", path.display());
            process::exit(1);
        }),
        (None, true) => PipelineSettings::small(),
        (None, false) => PipelineSettings::vga(),
    }
}

fn main() {
    let cli = parse_args();
    setup_logging(cli.verbose);

    let settings = load_settings(&cli);
    if cli.print_config {
        match settings.to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!("{e}");
                process::exit(1);
            }
        }
        return;
    }

    let config = match PipelineConfig::new(&settings) {
        Ok(config) => config,
        Err(e) => {
            error!("invalid configuration: {e}");
            process::exit(1);
        }
    };
    info!(
        "{}x{} frames, slots at {:#010X} and {:#010X}, {} master ticks per sensor frame",
        config.frame_width(),
        config.frame_height(),
        config.slot_base(false),
        config.slot_base(true),
        config.sensor_frame_ticks()
    );

    let mut pipeline = Pipeline::new(&config, cli.pattern);
    for _ in 0..cli.frames {
        pipeline.run_frame();
    }

    let stats = pipeline.stats();
    info!(
        "{} capture frames, {} displayed, {} pixels read, {} write bursts",
        stats.capture_frames,
        stats.frames_displayed,
        stats.pixels_read,
        pipeline.ram().write_bursts()
    );
    if stats.underflows > 0 || pipeline.pixel_fifo().overflows() > 0 {
        warn!(
            "{} display underflows, {} pixel FIFO overflows",
            stats.underflows,
            pipeline.pixel_fifo().overflows()
        );
    }
    if stats.write_errors > 0 || stats.read_errors > 0 {
        warn!(
            "{} write errors, {} read errors",
            stats.write_errors, stats.read_errors
        );
    }

    if let Some(ref path) = cli.screenshot_path {
        if stats.frames_displayed == 0 {
            warn!("no frame has been displayed yet, screenshot will be blank");
        }
        if let Err(e) = screenshot::save_screenshot(&pipeline, path) {
            error!("screenshot error: {e}");
            process::exit(1);
        }
        info!("screenshot saved to {}", path.display());
    }
}
