// src/display/mod.rs
//! Threaded display device with pluggable platform backends.
//!
//! - DisplayDevice: lifecycle, shared frame buffer, render thread
//! - DisplayBackend / WindowSurface: platform primitives (headless, X11)
//! - InputHandler: injected policy for key and mouse events
//! - Messages: events and surface parameters exchanged with backends

pub mod device;
pub mod driver;
pub mod drivers;
pub mod input;
pub mod messages;
mod render_loop;

pub use device::DisplayDevice;
pub use driver::{DisplayBackend, WindowSurface};
pub use drivers::{HeadlessBackend, HeadlessHandle, HeadlessStats};
pub use input::{DefaultInputHandler, InputHandler};
pub use messages::{DisplayEvent, SurfaceFlags, SurfaceParams};

#[cfg(feature = "x11")]
pub use drivers::X11Backend;
