//! Core-display library crate.
//!
//! A single full-frame RGB window: producers submit frames with
//! `DisplayDevice::blit`, a render thread owned by the device presents them
//! and forwards input to an `InputHandler`.

pub mod config;
pub mod display;
pub mod frame;
pub mod keys;

pub use display::{DisplayBackend, DisplayDevice, DisplayEvent, InputHandler, WindowSurface};
pub use frame::{Rectangle, Rgb, VideoBuffer};
pub use keys::KeyCode;
