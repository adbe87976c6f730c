// src/display/messages.rs
//! Types exchanged between the render loop and platform backends.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Colour depth requested for every window surface.
pub const SURFACE_DEPTH_BITS: u8 = 24;

bitflags! {
    /// Options for surface creation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SurfaceFlags: u8 {
        /// Uploads go to a back buffer that only becomes visible on present.
        const DOUBLE_BUFFER = 1 << 0;
        const FULLSCREEN = 1 << 1;
    }
}

/// Everything a backend needs to create a window surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceParams {
    pub width: u32,
    pub height: u32,
    pub depth_bits: u8,
    pub flags: SurfaceFlags,
    pub title: String,
}

impl SurfaceParams {
    pub fn new(width: u32, height: u32, title: impl Into<String>, fullscreen: bool) -> Self {
        let mut flags = SurfaceFlags::DOUBLE_BUFFER;
        if fullscreen {
            flags |= SurfaceFlags::FULLSCREEN;
        }
        Self {
            width,
            height,
            depth_bits: SURFACE_DEPTH_BITS,
            flags,
            title: title.into(),
        }
    }

    /// Whether the window should be locked to the frame size. Fullscreen
    /// surfaces leave sizing to the window manager.
    pub fn pins_window_size(&self) -> bool {
        !self.flags.contains(SurfaceFlags::FULLSCREEN)
    }
}

/// Platform input events, as reported by a `WindowSurface`.
///
/// Keys carry the native keysym; mouse buttons use the native 1-based
/// numbering. The render loop converts both before calling the input handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    Key { keysym: u32, pressed: bool },
    MouseButton {
        button: u8,
        pressed: bool,
        x: i32,
        y: i32,
    },
    MouseMotion { x: i32, y: i32, dx: i32, dy: i32 },
    /// The user asked to close the window.
    Quit,
    /// Window contents were lost and must be presented again.
    Expose,
}
