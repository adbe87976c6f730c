// src/display/driver.rs
//! Backend traits: the minimal platform primitives the render loop needs.
//!
//! ## Threading Model
//! - The backend value is moved into the render thread by `DisplayDevice::start`
//!   and handed back when the thread is joined.
//! - Surfaces are created, used and dropped on the render thread only, so they
//!   do not need to be `Send`.
//!
//! ## Lifecycle
//! 1. `init_video()` - bring up the platform video subsystem (render thread)
//! 2. `create_surface()` - open the window
//! 3. `upload` / `present` / `poll_event` loop
//! 4. `Drop` of the surface - window destroyed
//! 5. `shutdown_video()` - called from `DisplayDevice::drop` after the join

use crate::display::messages::{DisplayEvent, SurfaceParams};
use crate::frame::VideoBuffer;
use anyhow::Result;
use std::thread;
use std::time::Duration;

/// A platform video subsystem able to create window surfaces.
pub trait DisplayBackend: Send + 'static {
    type Surface: WindowSurface;

    /// Initialize the video subsystem. Called once per render-thread session.
    fn init_video(&mut self) -> Result<()>;

    /// Create a window surface. Failure is terminal for the device session.
    fn create_surface(&mut self, params: &SurfaceParams) -> Result<Self::Surface>;

    /// Release the video subsystem. Never called while a surface exists.
    fn shutdown_video(&mut self) {}

    /// Sleep used by the render loop when there is nothing to present.
    fn idle(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// An open window. Dropping it destroys the window.
pub trait WindowSurface {
    /// Copy a full frame into the surface's back buffer.
    fn upload(&mut self, frame: &VideoBuffer) -> Result<()>;

    /// Make the last upload visible.
    fn present(&mut self) -> Result<()>;

    /// Next pending input event, without blocking. `None` when the queue is
    /// empty.
    fn poll_event(&mut self) -> Option<DisplayEvent>;
}
