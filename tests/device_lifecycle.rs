use core_display::config::DeviceConfig;
use core_display::display::{
    DisplayDevice, DisplayEvent, HeadlessBackend, HeadlessHandle, HeadlessStats, InputHandler,
};
use core_display::frame::{Rectangle, Rgb, VideoBuffer};
use core_display::keys::{keysym, KeyCode};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use test_log::test;

const RED: Rgb = Rgb::new(255, 0, 0);
const BLUE: Rgb = Rgb::new(0, 0, 255);

fn headless_device(width: u32, height: u32) -> (DisplayDevice<HeadlessBackend>, HeadlessHandle) {
    let backend = HeadlessBackend::new();
    let handle = backend.handle();
    let config = DeviceConfig::new(width, height, "lifecycle", false);
    let device = DisplayDevice::new(config, backend).unwrap();
    (device, handle)
}

/// Polls `condition` until it holds or two seconds have passed.
fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

#[test]
fn idle_device_reports_stopped() {
    let (device, handle) = headless_device(16, 16);
    assert!(device.is_stopped());
    assert_eq!(handle.stats().video_inits, 0);
}

#[test]
fn zero_sized_device_is_rejected() {
    let config = DeviceConfig::new(0, 240, "bad", false);
    assert!(DisplayDevice::new(config, HeadlessBackend::new()).is_err());
}

#[test]
fn start_is_idempotent_and_stop_is_repeatable() {
    let (device, handle) = headless_device(16, 16);

    assert!(device.start());
    assert!(!device.is_stopped());
    assert!(device.start());
    assert!(wait_until(|| handle.stats().surfaces_created == 1));

    assert!(device.stop());
    assert!(device.is_stopped());
    assert!(device.stop());

    let stats = handle.stats();
    assert_eq!(stats.video_inits, 1);
    assert_eq!(stats.surfaces_created, 1);
    assert_eq!(stats.surfaces_released, 1);
}

#[test]
fn solid_frame_is_presented_with_device_parameters() {
    let (device, handle) = headless_device(320, 240);
    assert!(device.start());

    let frame = VideoBuffer::filled(320, 240, RED);
    assert!(device.blit(&frame, Rectangle::sized(320, 240)));
    assert!(wait_until(|| handle.stats().last_presented.as_ref() == Some(&frame)));
    assert!(wait_until(|| !device.has_pending_frame()));

    let params = handle.stats().last_params.unwrap();
    assert_eq!((params.width, params.height), (320, 240));
    assert_eq!(params.title, "lifecycle");
    assert!(device.stop());
}

#[test]
fn frame_blitted_before_start_is_shown_first() {
    let (device, handle) = headless_device(8, 8);
    assert!(device.blit(&VideoBuffer::filled(8, 8, BLUE), Rectangle::sized(8, 8)));
    assert!(device.has_pending_frame());

    assert!(device.start());
    assert!(wait_until(|| handle.stats().presents == 1));
    assert_eq!(
        handle.stats().last_presented,
        Some(VideoBuffer::filled(8, 8, BLUE))
    );
    device.stop();
}

#[test]
fn partial_blit_updates_only_its_rectangle() {
    let (device, handle) = headless_device(8, 8);
    assert!(device.start());

    let patch = VideoBuffer::filled(4, 4, RED);
    assert!(device.blit(&patch, Rectangle::new(6, 6, 4, 4)));
    assert!(wait_until(|| handle.stats().presents == 1));

    let shown = handle.stats().last_presented.unwrap();
    assert_eq!(shown.pixel(7, 7), Some(RED));
    assert_eq!(shown.pixel(6, 6), Some(RED));
    assert_eq!(shown.pixel(5, 5), Some(Rgb::BLACK));
    device.stop();
}

#[test]
fn each_submitted_frame_is_presented_once() {
    let (device, handle) = headless_device(8, 8);
    assert!(device.start());

    device.blit(&VideoBuffer::filled(8, 8, RED), Rectangle::sized(8, 8));
    assert!(wait_until(|| handle.stats().presents == 1));
    thread::sleep(Duration::from_millis(30));
    assert_eq!(handle.stats().presents, 1);

    device.blit(&VideoBuffer::filled(8, 8, BLUE), Rectangle::sized(8, 8));
    assert!(wait_until(|| handle.stats().presents == 2));
    device.stop();
    assert_eq!(handle.stats().uploads, 2);
}

#[test]
fn quit_event_ends_the_session_without_stop() {
    let (device, handle) = headless_device(8, 8);
    assert!(device.start());
    handle.push_event(DisplayEvent::Quit);

    assert!(wait_until(|| device.is_stopped()));
    assert!(!device.blit(&VideoBuffer::filled(8, 8, RED), Rectangle::sized(8, 8)));
    assert!(wait_until(|| handle.stats().surfaces_released == 1));
    // The finished thread is not joined yet, start still refuses.
    assert!(!device.start());

    assert!(device.stop());
    assert!(!device.start());
    assert_eq!(handle.stats().video_inits, 1);
}

#[test]
fn quit_is_noticed_within_a_few_idle_intervals() {
    let (device, handle) = headless_device(8, 8);
    let idle_sleep = device.config().idle_sleep();
    assert!(device.start());
    assert!(wait_until(|| handle.stats().surfaces_created == 1));

    let quit_at = Instant::now();
    handle.push_event(DisplayEvent::Quit);
    while !device.is_stopped() && quit_at.elapsed() < Duration::from_secs(2) {
        thread::sleep(Duration::from_micros(100));
    }
    let elapsed = quit_at.elapsed();

    assert!(device.is_stopped());
    assert!(
        elapsed < idle_sleep * 10,
        "quit took {:?} with an idle sleep of {:?}",
        elapsed,
        idle_sleep
    );
    assert!(device.stop());
}

#[test]
fn stop_on_idle_device_is_a_noop() {
    let (device, handle) = headless_device(8, 8);
    assert!(device.stop());
    assert!(device.is_stopped());

    assert!(device.start());
    assert!(!device.is_stopped());
    let frame = VideoBuffer::filled(8, 8, BLUE);
    assert!(device.blit(&frame, Rectangle::sized(8, 8)));
    assert!(wait_until(|| handle.stats().last_presented.as_ref() == Some(&frame)));

    assert!(device.stop());
    assert!(device.is_stopped());
    assert!(!device.start());
    assert_eq!(handle.stats().video_inits, 1);
}

#[test]
fn escape_key_ends_the_session() {
    let (device, handle) = headless_device(8, 8);
    assert!(device.start());
    handle.push_event(DisplayEvent::Key {
        keysym: keysym::ESCAPE,
        pressed: true,
    });
    assert!(wait_until(|| device.is_stopped()));
    assert!(device.stop());
}

#[test]
fn failing_window_creation_stops_the_device() {
    let backend = HeadlessBackend::failing();
    let handle = backend.handle();
    let device = DisplayDevice::new(DeviceConfig::new(8, 8, "fail", false), backend).unwrap();

    assert!(device.start());
    assert!(wait_until(|| device.is_stopped()));
    assert!(device.stop());
    assert_eq!(handle.stats().surfaces_created, 0);
}

#[test]
fn drop_shuts_video_down_once() {
    let (device, handle) = headless_device(8, 8);
    assert!(device.start());
    assert!(wait_until(|| handle.stats().video_inits == 1));
    drop(device);

    let stats = handle.stats();
    assert_eq!(stats.video_shutdowns, 1);
    assert_eq!(stats.surfaces_released, stats.surfaces_created);
}

#[test]
fn dropping_a_never_started_device_touches_nothing() {
    let (device, handle) = headless_device(8, 8);
    drop(device);
    assert_eq!(handle.stats(), HeadlessStats::default());
}

#[derive(Clone, Default)]
struct ClickLog {
    clicks: Arc<Mutex<Vec<(u8, bool, i32, i32)>>>,
    keys: Arc<Mutex<Vec<KeyCode>>>,
}

impl InputHandler for ClickLog {
    fn key_pressed(&mut self, key: KeyCode, pressed: bool) -> bool {
        if pressed {
            self.keys.lock().unwrap().push(key);
        }
        true
    }

    fn mouse_button(&mut self, button: u8, pressed: bool, x: i32, y: i32) -> bool {
        self.clicks.lock().unwrap().push((button, pressed, x, y));
        // Right button closes.
        button != 2
    }
}

#[test]
fn custom_handler_receives_translated_input() {
    let backend = HeadlessBackend::new();
    let handle = backend.handle();
    let log = ClickLog::default();
    let device = DisplayDevice::with_handler(
        DeviceConfig::new(8, 8, "input", false),
        backend,
        log.clone(),
    )
    .unwrap();
    assert!(device.start());

    handle.push_event(DisplayEvent::Key {
        keysym: keysym::ESCAPE,
        pressed: true,
    });
    handle.push_event(DisplayEvent::Key {
        keysym: keysym::KEY_0 + 7,
        pressed: true,
    });
    handle.push_event(DisplayEvent::MouseButton {
        button: 1,
        pressed: true,
        x: 4,
        y: 5,
    });
    assert!(wait_until(|| log.clicks.lock().unwrap().len() == 1));
    // Escape does not end a session whose handler ignores it.
    assert!(!device.is_stopped());

    handle.push_event(DisplayEvent::MouseButton {
        button: 3,
        pressed: true,
        x: 0,
        y: 0,
    });
    assert!(wait_until(|| device.is_stopped()));
    device.stop();

    assert_eq!(
        *log.keys.lock().unwrap(),
        vec![KeyCode::Escape, KeyCode::Char('7')]
    );
    assert_eq!(
        *log.clicks.lock().unwrap(),
        vec![(0, true, 4, 5), (2, true, 0, 0)]
    );
}

#[test]
fn concurrent_start_and_stop_leave_one_session_at_most() {
    let (device, handle) = headless_device(8, 8);
    let device = Arc::new(device);

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let device = Arc::clone(&device);
            thread::spawn(move || {
                if i % 2 == 0 {
                    device.start();
                } else {
                    device.stop();
                }
                device.blit(&VideoBuffer::filled(8, 8, RED), Rectangle::sized(8, 8));
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert!(device.stop());
    assert!(device.is_stopped());
    let stats = handle.stats();
    assert!(stats.video_inits <= 1);
    assert_eq!(stats.surfaces_released, stats.surfaces_created);
}
