// src/display/drivers/mod.rs
//! Platform-specific display backends.

pub mod headless;
#[cfg(feature = "x11")]
pub mod x11;

pub use headless::{HeadlessBackend, HeadlessHandle, HeadlessStats, HeadlessSurface};
#[cfg(feature = "x11")]
pub use self::x11::{X11Backend, X11Surface};
