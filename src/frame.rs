// src/frame.rs

//! Packed RGB frame buffers.
//!
//! A `VideoBuffer` is the raster exchanged between a producer and the display
//! device: `width * height` pixels of three bytes each, row-major, with no
//! padding between rows. `as_bytes()` exposes that layout for byte-level
//! consumers.

use std::mem;

/// A single 24-bit pixel. Red is stored in the first byte.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

// Uploads reinterpret the pixel vector as raw bytes with stride `width * 3`.
const _: () = assert!(mem::size_of::<Rgb>() == 3, "Rgb must be packed to 3 bytes");
const _: () = assert!(mem::align_of::<Rgb>() == 1, "Rgb must be byte aligned");

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Destination area of a blit, in pixels of the target buffer.
///
/// The origin may be negative or lie outside the target; `VideoBuffer::blit`
/// clips the copied region to the target bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rectangle {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin covering `width` x `height` pixels.
    pub const fn sized(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }
}

/// Owned 2-D raster of `Rgb` pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoBuffer {
    width: usize,
    height: usize,
    data: Vec<Rgb>,
}

impl VideoBuffer {
    /// Creates a black buffer.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, Rgb::BLACK)
    }

    pub fn filled(width: usize, height: usize, color: Rgb) -> Self {
        Self {
            width,
            height,
            data: vec![color; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Bytes per row. Rows are tightly packed.
    pub fn stride(&self) -> usize {
        self.width * mem::size_of::<Rgb>()
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [Rgb] {
        &mut self.data
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Rgb) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.data[y * self.width + x] = color;
        true
    }

    pub fn fill(&mut self, color: Rgb) {
        self.data.fill(color);
    }

    /// Makes `self` an exact copy of `other`, reusing the allocation.
    pub fn copy_from(&mut self, other: &VideoBuffer) {
        self.width = other.width;
        self.height = other.height;
        self.data.clone_from(&other.data);
    }

    /// The raster as packed `r, g, b` bytes, `stride() * height()` long.
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: `Rgb` is `repr(C)` with three `u8` fields; size 3 and
        // alignment 1 are asserted at compile time, so the vector is a
        // contiguous run of initialized bytes.
        unsafe {
            std::slice::from_raw_parts(
                self.data.as_ptr() as *const u8,
                self.data.len() * mem::size_of::<Rgb>(),
            )
        }
    }

    /// Copies `src` into this buffer at `position`.
    ///
    /// The copied region is the intersection of `position`, the extent of
    /// `src` and the bounds of `self`. A negative origin skips the leading
    /// rows/columns of `src`. Returns the number of pixels written.
    pub fn blit(&mut self, src: &VideoBuffer, position: Rectangle) -> usize {
        let (dst_x, src_x) = clip_origin(position.x);
        let (dst_y, src_y) = clip_origin(position.y);

        let copy_w = (position.width as usize)
            .min(src.width)
            .saturating_sub(src_x)
            .min(self.width.saturating_sub(dst_x));
        let copy_h = (position.height as usize)
            .min(src.height)
            .saturating_sub(src_y)
            .min(self.height.saturating_sub(dst_y));

        if copy_w == 0 || copy_h == 0 {
            return 0;
        }

        for row in 0..copy_h {
            let s = (src_y + row) * src.width + src_x;
            let d = (dst_y + row) * self.width + dst_x;
            self.data[d..d + copy_w].copy_from_slice(&src.data[s..s + copy_w]);
        }
        copy_w * copy_h
    }
}

/// Splits a signed origin into (destination offset, source skip).
fn clip_origin(origin: i32) -> (usize, usize) {
    if origin < 0 {
        (0, origin.unsigned_abs() as usize)
    } else {
        (origin as usize, 0)
    }
}
