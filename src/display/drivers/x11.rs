//! Xlib window surface.
//!
//! One connection per surface, opened and closed on the render thread.
//! Frames are converted to the visual's 32-bit layout, put into a back-buffer
//! pixmap on upload, and copied to the window on present.

use crate::display::driver::{DisplayBackend, WindowSurface};
use crate::display::messages::{DisplayEvent, SurfaceFlags, SurfaceParams};
use crate::frame::VideoBuffer;
use crate::keys;
use anyhow::{anyhow, Context, Result};
use libc::{c_char, c_int, c_uchar, c_uint};
use log::{debug, info, trace, warn};
use std::ffi::{c_void, CString};
use std::mem;
use std::ptr;
use x11::xlib;

const BYTES_PER_PIXEL: usize = 4;

/// Creates `X11Surface`s on the display named by `$DISPLAY`.
#[derive(Debug, Default)]
pub struct X11Backend {
    threads_initialized: bool,
}

impl X11Backend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisplayBackend for X11Backend {
    type Surface = X11Surface;

    fn init_video(&mut self) -> Result<()> {
        if self.threads_initialized {
            return Ok(());
        }
        // SAFETY: XInitThreads takes no arguments and only has to run before
        // the first connection of the process is opened.
        let status = unsafe { xlib::XInitThreads() };
        if status == 0 {
            return Err(anyhow!("XInitThreads failed"));
        }
        self.threads_initialized = true;
        debug!("X11Backend: Xlib thread support initialized");
        Ok(())
    }

    fn create_surface(&mut self, params: &SurfaceParams) -> Result<X11Surface> {
        X11Surface::open(params)
    }
}

/// An Xlib window with a back-buffer pixmap.
///
/// Every resource is released in `Drop`, including on a partially failed
/// `open`.
pub struct X11Surface {
    display: *mut xlib::Display,
    window: xlib::Window,
    gc: xlib::GC,
    back_buffer: xlib::Pixmap,
    image: *mut xlib::XImage,
    /// Backing store of `image`. Never reallocated while `image` exists.
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    double_buffered: bool,
    wm_protocols: xlib::Atom,
    wm_delete_window: xlib::Atom,
    last_pointer: Option<(i32, i32)>,
}

impl X11Surface {
    fn open(params: &SurfaceParams) -> Result<Self> {
        info!(
            "X11Surface: opening {}x{} window '{}'",
            params.width, params.height, params.title
        );
        let title = CString::new(params.title.as_str()).context("Window title contains NUL")?;

        // SAFETY: a null name makes Xlib use $DISPLAY.
        let display = unsafe { xlib::XOpenDisplay(ptr::null()) };
        if display.is_null() {
            return Err(anyhow!(
                "Failed to open X display. Check DISPLAY environment variable or X server status."
            ));
        }

        let mut surface = Self {
            display,
            window: 0,
            gc: ptr::null_mut(),
            back_buffer: 0,
            image: ptr::null_mut(),
            pixels: vec![0u8; params.width as usize * params.height as usize * BYTES_PER_PIXEL],
            width: params.width,
            height: params.height,
            double_buffered: params.flags.contains(SurfaceFlags::DOUBLE_BUFFER),
            wm_protocols: 0,
            wm_delete_window: 0,
            last_pointer: None,
        };

        // SAFETY: `display` is a live connection owned by `surface`. Every
        // handle created below is stored in `surface` right away, so `Drop`
        // releases it if a later step fails.
        unsafe {
            let screen = xlib::XDefaultScreen(display);
            let root = xlib::XRootWindow(display, screen);
            let depth = xlib::XDefaultDepth(display, screen);
            let visual = xlib::XDefaultVisual(display, screen);

            surface.window = xlib::XCreateSimpleWindow(
                display,
                root,
                0,
                0,
                params.width as c_uint,
                params.height as c_uint,
                0,
                xlib::XBlackPixel(display, screen),
                xlib::XBlackPixel(display, screen),
            );
            if surface.window == 0 {
                return Err(anyhow!("XCreateSimpleWindow failed"));
            }

            xlib::XStoreName(display, surface.window, title.as_ptr());
            xlib::XSelectInput(
                display,
                surface.window,
                xlib::ExposureMask
                    | xlib::KeyPressMask
                    | xlib::KeyReleaseMask
                    | xlib::ButtonPressMask
                    | xlib::ButtonReleaseMask
                    | xlib::PointerMotionMask
                    | xlib::StructureNotifyMask,
            );

            surface.wm_protocols = intern_atom(display, b"WM_PROTOCOLS\0");
            surface.wm_delete_window = intern_atom(display, b"WM_DELETE_WINDOW\0");
            let mut protocols = [surface.wm_delete_window];
            xlib::XSetWMProtocols(display, surface.window, protocols.as_mut_ptr(), 1);

            // The frame size is fixed for the device lifetime. Fullscreen
            // windows get no size hints, window managers reject the state
            // change otherwise.
            let hints = if params.pins_window_size() {
                xlib::XAllocSizeHints()
            } else {
                ptr::null_mut()
            };
            if !hints.is_null() {
                (*hints).flags = xlib::PMinSize | xlib::PMaxSize;
                (*hints).min_width = params.width as c_int;
                (*hints).max_width = params.width as c_int;
                (*hints).min_height = params.height as c_int;
                (*hints).max_height = params.height as c_int;
                xlib::XSetWMNormalHints(display, surface.window, hints);
                xlib::XFree(hints as *mut c_void);
            }

            if params.flags.contains(SurfaceFlags::FULLSCREEN) {
                let wm_state = intern_atom(display, b"_NET_WM_STATE\0");
                let fullscreen = intern_atom(display, b"_NET_WM_STATE_FULLSCREEN\0");
                xlib::XChangeProperty(
                    display,
                    surface.window,
                    wm_state,
                    xlib::XA_ATOM,
                    32,
                    xlib::PropModeReplace,
                    &fullscreen as *const xlib::Atom as *const c_uchar,
                    1,
                );
            }

            surface.gc = xlib::XCreateGC(display, surface.window, 0, ptr::null_mut());
            if surface.gc.is_null() {
                return Err(anyhow!("XCreateGC failed"));
            }

            if surface.double_buffered {
                surface.back_buffer = xlib::XCreatePixmap(
                    display,
                    surface.window,
                    params.width as c_uint,
                    params.height as c_uint,
                    depth as c_uint,
                );
                if surface.back_buffer == 0 {
                    return Err(anyhow!("XCreatePixmap failed"));
                }
            }

            surface.image = xlib::XCreateImage(
                display,
                visual,
                depth as c_uint,
                xlib::ZPixmap,
                0,
                surface.pixels.as_mut_ptr() as *mut c_char,
                params.width as c_uint,
                params.height as c_uint,
                32,
                0,
            );
            if surface.image.is_null() {
                return Err(anyhow!("XCreateImage failed"));
            }
            let bits_per_pixel = (*surface.image).bits_per_pixel;
            if bits_per_pixel as usize != BYTES_PER_PIXEL * 8 {
                return Err(anyhow!(
                    "Unsupported visual: {} bits per pixel at depth {}",
                    bits_per_pixel,
                    depth
                ));
            }

            xlib::XMapWindow(display, surface.window);
            xlib::XFlush(display);
        }

        debug!(
            "X11Surface: window {} mapped (double buffered: {})",
            surface.window, surface.double_buffered
        );
        Ok(surface)
    }

    /// Drawable that uploads are written to.
    fn target(&self) -> xlib::Drawable {
        if self.double_buffered {
            self.back_buffer
        } else {
            self.window
        }
    }

    /// Converts packed RGB into the image's 32-bit pixel layout.
    fn convert(&mut self, frame: &VideoBuffer) {
        // SAFETY: `image` is non-null for a successfully opened surface.
        let lsb_first = unsafe { (*self.image).byte_order } == xlib::LSBFirst;
        for (dst, px) in self
            .pixels
            .chunks_exact_mut(BYTES_PER_PIXEL)
            .zip(frame.pixels())
        {
            if lsb_first {
                dst.copy_from_slice(&[px.b, px.g, px.r, 0]);
            } else {
                dst.copy_from_slice(&[0, px.r, px.g, px.b]);
            }
        }
    }

    fn translate_event(&mut self, xevent: &mut xlib::XEvent) -> Option<DisplayEvent> {
        // SAFETY: every union access below is guarded by the matching
        // `type_` discriminant filled in by XNextEvent.
        let event_type = unsafe { xevent.type_ };
        match event_type {
            xlib::KeyPress | xlib::KeyRelease => {
                let key_event = unsafe { &mut xevent.key };
                let unshifted = unsafe { xlib::XLookupKeysym(&mut *key_event, 0) } as u32;
                let shifted = unsafe { xlib::XLookupKeysym(&mut *key_event, 1) } as u32;
                let shift_held = key_event.state & xlib::ShiftMask != 0;
                let keysym = keys::select_keysym(unshifted, shifted, shift_held);
                trace!("XEvent: key {:X} (type {})", keysym, event_type);
                Some(DisplayEvent::Key {
                    keysym,
                    pressed: event_type == xlib::KeyPress,
                })
            }
            xlib::ButtonPress | xlib::ButtonRelease => {
                let button_event = unsafe { xevent.button };
                Some(DisplayEvent::MouseButton {
                    button: button_event.button.min(u8::MAX as c_uint) as u8,
                    pressed: event_type == xlib::ButtonPress,
                    x: button_event.x,
                    y: button_event.y,
                })
            }
            xlib::MotionNotify => {
                let motion_event = unsafe { xevent.motion };
                let (x, y) = (motion_event.x, motion_event.y);
                let (dx, dy) = match self.last_pointer {
                    Some((last_x, last_y)) => (x - last_x, y - last_y),
                    None => (0, 0),
                };
                self.last_pointer = Some((x, y));
                Some(DisplayEvent::MouseMotion { x, y, dx, dy })
            }
            xlib::Expose => {
                let expose_event = unsafe { xevent.expose };
                // Only the last event of an expose series.
                (expose_event.count == 0).then_some(DisplayEvent::Expose)
            }
            xlib::ClientMessage => {
                let client_message_event = unsafe { xevent.client_message };
                if client_message_event.message_type == self.wm_protocols
                    && client_message_event.data.as_longs()[0] as xlib::Atom
                        == self.wm_delete_window
                {
                    info!("XEvent: WM_DELETE_WINDOW received");
                    Some(DisplayEvent::Quit)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

impl WindowSurface for X11Surface {
    fn upload(&mut self, frame: &VideoBuffer) -> Result<()> {
        if frame.width() != self.width as usize || frame.height() != self.height as usize {
            return Err(anyhow!(
                "Frame is {}x{}, surface is {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            ));
        }
        self.convert(frame);
        // SAFETY: `image` points into `pixels`, which has exactly
        // width * height * 4 bytes; all handles belong to this connection.
        unsafe {
            xlib::XPutImage(
                self.display,
                self.target(),
                self.gc,
                self.image,
                0,
                0,
                0,
                0,
                self.width,
                self.height,
            );
        }
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        // SAFETY: live connection and handles owned by this surface.
        unsafe {
            if self.double_buffered {
                xlib::XCopyArea(
                    self.display,
                    self.back_buffer,
                    self.window,
                    self.gc,
                    0,
                    0,
                    self.width,
                    self.height,
                    0,
                    0,
                );
            }
            xlib::XFlush(self.display);
        }
        Ok(())
    }

    fn poll_event(&mut self) -> Option<DisplayEvent> {
        // SAFETY: XPending guarantees XNextEvent returns without blocking.
        while unsafe { xlib::XPending(self.display) } > 0 {
            let mut xevent: xlib::XEvent = unsafe { mem::zeroed() };
            unsafe { xlib::XNextEvent(self.display, &mut xevent) };
            if let Some(event) = self.translate_event(&mut xevent) {
                return Some(event);
            }
        }
        None
    }
}

impl Drop for X11Surface {
    fn drop(&mut self) {
        info!("X11Surface::drop() - releasing window");
        // SAFETY: each handle is released at most once and only if it was
        // created; the connection is closed last.
        unsafe {
            if !self.image.is_null() {
                // The pixel data belongs to `pixels`; free only the header.
                (*self.image).data = ptr::null_mut();
                xlib::XFree(self.image as *mut c_void);
            }
            if self.back_buffer != 0 {
                xlib::XFreePixmap(self.display, self.back_buffer);
            }
            if !self.gc.is_null() {
                xlib::XFreeGC(self.display, self.gc);
            }
            if self.window != 0 {
                xlib::XDestroyWindow(self.display, self.window);
            }
            let status = xlib::XCloseDisplay(self.display);
            if status != 0 {
                warn!("XCloseDisplay returned non-zero status: {}", status);
            }
        }
    }
}

/// # Safety
/// `display` must be a live connection and `name` NUL-terminated.
unsafe fn intern_atom(display: *mut xlib::Display, name: &[u8]) -> xlib::Atom {
    xlib::XInternAtom(display, name.as_ptr() as *const c_char, xlib::False)
}
