// src/display/render_loop.rs
//! The render-thread side of a `DisplayDevice`.
//!
//! `SharedState` is the only state visible to both the producer and the
//! render thread. `RenderLoop::step` is one iteration of the loop: drain
//! input, upload a dirty frame, then present or report idle.

use crate::display::driver::{DisplayBackend, WindowSurface};
use crate::display::input::InputHandler;
use crate::display::messages::{DisplayEvent, SurfaceParams};
use crate::frame::{Rectangle, VideoBuffer};
use crate::keys;
use log::{debug, error, info, trace};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Frame buffer plus its dirty flag, guarded together.
#[derive(Debug)]
pub(crate) struct FrameState {
    pub buffer: VideoBuffer,
    pub dirty: bool,
}

/// State shared between the producer and the render thread.
#[derive(Debug)]
pub(crate) struct SharedState {
    frame: Mutex<FrameState>,
    finish: AtomicBool,
}

impl SharedState {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            frame: Mutex::new(FrameState {
                buffer: VideoBuffer::new(width, height),
                dirty: false,
            }),
            finish: AtomicBool::new(false),
        }
    }

    pub fn lock_frame(&self) -> MutexGuard<'_, FrameState> {
        self.frame.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn request_finish(&self) {
        self.finish.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.finish.load(Ordering::SeqCst)
    }

    /// Copies `frame` into the shared buffer and marks it dirty.
    /// Returns false without touching the buffer once the session finished.
    pub fn write_frame(&self, frame: &VideoBuffer, position: Rectangle) -> bool {
        if self.is_finished() {
            return false;
        }
        let mut state = self.lock_frame();
        state.buffer.blit(frame, position);
        state.dirty = true;
        true
    }

    pub fn mark_dirty(&self) {
        self.lock_frame().dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.lock_frame().dirty
    }
}

/// Result of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// A frame was presented; loop again immediately.
    Presented,
    /// Nothing to present; the caller should sleep.
    Idle,
    /// The finish flag is set; the loop must exit.
    Finished,
}

pub(crate) struct RenderLoop<'a, S: WindowSurface, H: InputHandler> {
    surface: S,
    handler: &'a mut H,
    shared: &'a SharedState,
    staging: VideoBuffer,
    flip_pending: bool,
}

impl<'a, S: WindowSurface, H: InputHandler> RenderLoop<'a, S, H> {
    pub fn new(surface: S, handler: &'a mut H, shared: &'a SharedState) -> Self {
        let staging = {
            let state = shared.lock_frame();
            VideoBuffer::new(state.buffer.width(), state.buffer.height())
        };
        Self {
            surface,
            handler,
            shared,
            staging,
            flip_pending: false,
        }
    }

    #[cfg(test)]
    pub fn flip_pending(&self) -> bool {
        self.flip_pending
    }

    pub fn step(&mut self) -> Step {
        if self.shared.is_finished() {
            return Step::Finished;
        }

        self.process_events();
        if self.shared.is_finished() {
            return Step::Finished;
        }

        if let Err(e) = self.update_data() {
            error!("Failed to upload frame: {:#}", e);
            self.shared.request_finish();
            return Step::Finished;
        }

        if !self.flip_pending {
            return Step::Idle;
        }
        if let Err(e) = self.surface.present() {
            error!("Failed to present frame: {:#}", e);
            self.shared.request_finish();
            return Step::Finished;
        }
        self.flip_pending = false;
        trace!("Frame presented");
        Step::Presented
    }

    /// Drains every pending event. A veto sets the finish flag but the rest
    /// of the batch is still processed.
    fn process_events(&mut self) {
        while let Some(event) = self.surface.poll_event() {
            if !self.dispatch(event) {
                self.shared.request_finish();
            }
        }
    }

    fn dispatch(&mut self, event: DisplayEvent) -> bool {
        match event {
            DisplayEvent::Key { keysym, pressed } => {
                self.handler.key_pressed(keys::translate(keysym), pressed)
            }
            DisplayEvent::MouseButton {
                button,
                pressed,
                x,
                y,
            } => self
                .handler
                .mouse_button(button.saturating_sub(1), pressed, x, y),
            DisplayEvent::MouseMotion { x, y, dx, dy } => self.handler.mouse_moved(x, y, dx, dy),
            DisplayEvent::Quit => {
                debug!("Quit event received");
                false
            }
            DisplayEvent::Expose => {
                debug!("Video expose");
                self.shared.mark_dirty();
                true
            }
        }
    }

    /// Copies a dirty frame out under the lock, then uploads it without
    /// holding the lock.
    fn update_data(&mut self) -> anyhow::Result<()> {
        {
            let mut state = self.shared.lock_frame();
            if !state.dirty {
                return Ok(());
            }
            self.staging.copy_from(&state.buffer);
            state.dirty = false;
        }
        self.surface.upload(&self.staging)?;
        self.flip_pending = true;
        Ok(())
    }
}

/// Runs one render-thread session: bring up video, open the window, loop
/// until the finish flag is set, release the window.
///
/// Any setup failure is logged and turned into the finish state.
pub(crate) fn run_session<B: DisplayBackend, H: InputHandler>(
    backend: &mut B,
    handler: &mut H,
    shared: &SharedState,
    params: &SurfaceParams,
    idle_sleep: Duration,
) {
    if let Err(e) = backend.init_video() {
        error!("Failed to initialize video subsystem: {:#}", e);
        shared.request_finish();
        return;
    }

    debug!(
        "Creating window surface {}x{} '{}' ({:?})",
        params.width, params.height, params.title, params.flags
    );
    let surface = match backend.create_surface(params) {
        Ok(surface) => surface,
        Err(e) => {
            error!("Failed to create window surface: {:#}", e);
            shared.request_finish();
            return;
        }
    };
    debug!("Window surface created");

    let mut render_loop = RenderLoop::new(surface, handler, shared);
    loop {
        match render_loop.step() {
            Step::Presented => {}
            Step::Idle => backend.idle(idle_sleep),
            Step::Finished => break,
        }
    }
    drop(render_loop);
    info!("Render loop finished, window surface released");
}
