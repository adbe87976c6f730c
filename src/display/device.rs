// src/display/device.rs
//! DisplayDevice - a window fed by a producer thread and driven by a render
//! thread.
//!
//! The producer calls `blit` from any thread; the render thread started by
//! `start` owns the window, drains input and presents dirty frames. Lifecycle
//! is Idle -> Running -> Stopped, and Stopped is terminal: a device whose
//! session ended (stop, quit, veto or window failure) cannot be restarted.
//! `stop` on an Idle device leaves it Idle.

use crate::config::DeviceConfig;
use crate::display::driver::DisplayBackend;
use crate::display::input::{DefaultInputHandler, InputHandler};
use crate::display::messages::SurfaceParams;
use crate::display::render_loop::{run_session, SharedState};
use crate::frame::{Rectangle, VideoBuffer};
use anyhow::{Context, Result};
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// What the render thread borrows for a session and returns on join.
struct SessionParts<B, H> {
    backend: B,
    handler: H,
}

struct Lifecycle<B, H> {
    thread: Option<JoinHandle<SessionParts<B, H>>>,
    /// Present whenever no render thread holds them.
    parts: Option<SessionParts<B, H>>,
    /// A session was started, so the video subsystem needs a shutdown.
    started: bool,
}

pub struct DisplayDevice<B: DisplayBackend, H: InputHandler = DefaultInputHandler> {
    config: DeviceConfig,
    shared: Arc<SharedState>,
    running: AtomicBool,
    lifecycle: Mutex<Lifecycle<B, H>>,
}

impl<B: DisplayBackend> DisplayDevice<B, DefaultInputHandler> {
    /// Creates a device that ends its session when Escape is pressed.
    pub fn new(config: DeviceConfig, backend: B) -> Result<Self> {
        Self::with_handler(config, backend, DefaultInputHandler)
    }
}

impl<B: DisplayBackend, H: InputHandler> DisplayDevice<B, H> {
    /// Creates an idle device. No thread or window exists until `start`.
    pub fn with_handler(config: DeviceConfig, backend: B, handler: H) -> Result<Self> {
        config
            .validate()
            .context("Invalid display device configuration")?;
        let shared = SharedState::new(config.width as usize, config.height as usize);
        Ok(Self {
            config,
            shared: Arc::new(shared),
            running: AtomicBool::new(false),
            lifecycle: Mutex::new(Lifecycle {
                thread: None,
                parts: Some(SessionParts { backend, handler }),
                started: false,
            }),
        })
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle<B, H>> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawns the render thread.
    ///
    /// Returns true if a live session is running after the call, including
    /// when one was already running. Returns false once the session has
    /// finished, even if a quit or veto ended it and `stop` has not joined
    /// the thread yet.
    pub fn start(&self) -> bool {
        let mut lifecycle = self.lock_lifecycle();
        if self.shared.is_finished() {
            warn!("DisplayDevice: start() after the session finished, ignoring");
            return false;
        }
        if lifecycle.thread.is_some() {
            return true;
        }
        let Some(mut parts) = lifecycle.parts.take() else {
            error!("DisplayDevice: backend was lost by a previous session");
            return false;
        };

        let shared = Arc::clone(&self.shared);
        let params = SurfaceParams::new(
            self.config.width,
            self.config.height,
            self.config.title.clone(),
            self.config.fullscreen,
        );
        let idle_sleep = self.config.idle_sleep();

        let spawned = thread::Builder::new()
            .name("display-render".to_string())
            .spawn(move || {
                run_session(
                    &mut parts.backend,
                    &mut parts.handler,
                    &shared,
                    &params,
                    idle_sleep,
                );
                parts
            });

        match spawned {
            Ok(handle) => {
                lifecycle.thread = Some(handle);
                lifecycle.started = true;
                self.running.store(true, Ordering::SeqCst);
                info!("Render thread started");
                true
            }
            Err(e) => {
                error!("Failed to spawn render thread: {}", e);
                self.shared.request_finish();
                false
            }
        }
    }

    /// Ends the session and joins the render thread.
    ///
    /// Does nothing on a device that was never started, which can still be
    /// started afterwards. Always returns true once no render thread is
    /// left. Blocks for at most
    /// one loop iteration plus the idle sleep, unless the backend itself
    /// blocks.
    pub fn stop(&self) -> bool {
        let mut lifecycle = self.lock_lifecycle();
        let Some(handle) = lifecycle.thread.take() else {
            return true;
        };
        self.shared.request_finish();
        match handle.join() {
            Ok(parts) => lifecycle.parts = Some(parts),
            Err(_) => error!("Render thread panicked; backend dropped"),
        }
        self.running.store(false, Ordering::SeqCst);
        info!("Render thread joined");
        true
    }

    /// True unless a render thread is running and the session is still live.
    /// Never blocks.
    pub fn is_stopped(&self) -> bool {
        self.shared.is_finished() || !self.running.load(Ordering::SeqCst)
    }

    /// Copies `frame` into the device's frame buffer at `position`, clipped
    /// to the buffer bounds, and schedules it for presentation.
    ///
    /// Returns false, leaving the buffer untouched, once the session has
    /// finished. A blit before `start` pre-loads the first frame.
    pub fn blit(&self, frame: &VideoBuffer, position: Rectangle) -> bool {
        self.shared.write_frame(frame, position)
    }

    /// True while a submitted frame has not been picked up by the render
    /// thread.
    pub fn has_pending_frame(&self) -> bool {
        self.shared.is_dirty()
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }

    pub fn title(&self) -> &str {
        &self.config.title
    }

    pub fn is_fullscreen(&self) -> bool {
        self.config.fullscreen
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }
}

impl<B: DisplayBackend, H: InputHandler> Drop for DisplayDevice<B, H> {
    fn drop(&mut self) {
        self.stop();
        let mut lifecycle = self.lock_lifecycle();
        if !lifecycle.started {
            return;
        }
        if let Some(parts) = lifecycle.parts.as_mut() {
            parts.backend.shutdown_video();
        }
    }
}
