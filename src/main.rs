// src/main.rs

//! Demo producer: opens a display device and feeds it a scrolling test
//! pattern until the window is closed, Escape is pressed, or the configured
//! frame limit is reached.

use anyhow::Context;
use core_display::config::{DemoConfig, CONFIG};
use core_display::display::{DisplayBackend, DisplayDevice};
use core_display::frame::{Rectangle, Rgb, VideoBuffer};
use log::{info, warn};
use std::thread;
use std::time::Duration;

/// Frame limit used by the headless backend when none is configured, since
/// nothing can close its window.
#[cfg(not(feature = "x11"))]
const HEADLESS_FRAME_LIMIT: u64 = 120;

fn main() -> anyhow::Result<()> {
    // Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting core-display demo...");
    let config = &*CONFIG;
    info!(
        "Device: {}x{} '{}' (fullscreen: {})",
        config.device.width, config.device.height, config.device.title, config.device.fullscreen
    );

    #[cfg(feature = "x11")]
    let (backend, frame_limit) = (
        core_display::display::X11Backend::new(),
        config.demo.max_frames,
    );
    #[cfg(not(feature = "x11"))]
    let (backend, frame_limit) = (
        core_display::display::HeadlessBackend::new(),
        Some(config.demo.max_frames.unwrap_or(HEADLESS_FRAME_LIMIT)),
    );

    run(backend, &config.demo, frame_limit)
}

fn run<B: DisplayBackend>(
    backend: B,
    demo: &DemoConfig,
    frame_limit: Option<u64>,
) -> anyhow::Result<()> {
    let device = DisplayDevice::new(CONFIG.device.clone(), backend)
        .context("Failed to create display device")?;
    let width = device.width() as usize;
    let height = device.height() as usize;
    let mut frame = VideoBuffer::new(width, height);
    let interval = Duration::from_millis(demo.frame_interval_ms);

    if !device.start() {
        anyhow::bail!("Display device refused to start");
    }

    let mut frame_no: u64 = 0;
    while !device.is_stopped() {
        if frame_limit.is_some_and(|limit| frame_no >= limit) {
            info!("Frame limit of {} reached", frame_no);
            break;
        }
        draw_pattern(&mut frame, frame_no);
        if !device.blit(&frame, Rectangle::sized(device.width(), device.height())) {
            break;
        }
        frame_no += 1;
        thread::sleep(interval);
    }

    if !device.stop() {
        warn!("Display device did not stop cleanly");
    }
    info!("Demo finished after {} frames", frame_no);
    Ok(())
}

/// Diagonal colour bands that move one pixel per frame.
fn draw_pattern(frame: &mut VideoBuffer, frame_no: u64) {
    let width = frame.width();
    let shift = frame_no as usize;
    for (i, pixel) in frame.pixels_mut().iter_mut().enumerate() {
        let (x, y) = (i % width, i / width);
        let t = (x + y + shift) as u32;
        *pixel = Rgb::new(
            (t & 0xff) as u8,
            ((t * 2) & 0xff) as u8,
            (255 - (t & 0xff)) as u8,
        );
    }
}
