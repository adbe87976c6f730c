// src/display/input.rs
//! Input policy injected into the render thread.

use crate::keys::KeyCode;
use log::debug;

/// Receives translated input events on the render thread.
///
/// Every hook returns whether the session should continue; returning `false`
/// ends it once the current event batch is drained. Window-close requests are
/// not routed here: they always end the session.
pub trait InputHandler: Send + 'static {
    /// Default: pressing Escape ends the session, every other key is ignored.
    fn key_pressed(&mut self, key: KeyCode, pressed: bool) -> bool {
        if pressed && key == KeyCode::Escape {
            debug!("Escape pressed");
            return false;
        }
        true
    }

    /// `button` is zero-based.
    fn mouse_button(&mut self, _button: u8, _pressed: bool, _x: i32, _y: i32) -> bool {
        true
    }

    fn mouse_moved(&mut self, _x: i32, _y: i32, _dx: i32, _dy: i32) -> bool {
        true
    }
}

/// Handler with only the default behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultInputHandler;

impl InputHandler for DefaultInputHandler {}
