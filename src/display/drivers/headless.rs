//! Headless display backend.
//!
//! Nothing is shown on screen. Input is scripted through a `HeadlessHandle`
//! and every surface operation is counted, which makes this the backend used
//! by tests and by the demo binary when the `x11` feature is off.

use crate::display::driver::{DisplayBackend, WindowSurface};
use crate::display::messages::{DisplayEvent, SurfaceParams};
use crate::frame::VideoBuffer;
use anyhow::{anyhow, Result};
use log::{info, trace};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Counters and captured frames recorded by the headless backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadlessStats {
    pub video_inits: usize,
    pub video_shutdowns: usize,
    pub surfaces_created: usize,
    pub surfaces_released: usize,
    pub uploads: usize,
    pub presents: usize,
    /// Parameters of the most recent `create_surface` call.
    pub last_params: Option<SurfaceParams>,
    /// Contents of the most recent present.
    pub last_presented: Option<VideoBuffer>,
}

#[derive(Debug, Default)]
struct Inner {
    events: Mutex<VecDeque<DisplayEvent>>,
    stats: Mutex<HeadlessStats>,
}

impl Inner {
    fn events(&self) -> MutexGuard<'_, VecDeque<DisplayEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stats(&self) -> MutexGuard<'_, HeadlessStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable view into a headless backend, usable from any thread.
#[derive(Debug, Clone)]
pub struct HeadlessHandle {
    inner: Arc<Inner>,
}

impl HeadlessHandle {
    /// Queues an event for the next `poll_event` drain.
    pub fn push_event(&self, event: DisplayEvent) {
        self.inner.events().push_back(event);
    }

    pub fn pending_events(&self) -> usize {
        self.inner.events().len()
    }

    /// Snapshot of the recorded counters.
    pub fn stats(&self) -> HeadlessStats {
        self.inner.stats().clone()
    }
}

pub struct HeadlessBackend {
    inner: Arc<Inner>,
    fail_surface: bool,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::default()),
            fail_surface: false,
        }
    }

    /// A backend whose `create_surface` always fails.
    pub fn failing() -> Self {
        Self {
            fail_surface: true,
            ..Self::new()
        }
    }

    pub fn handle(&self) -> HeadlessHandle {
        HeadlessHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayBackend for HeadlessBackend {
    type Surface = HeadlessSurface;

    fn init_video(&mut self) -> Result<()> {
        info!("HeadlessBackend: init_video");
        self.inner.stats().video_inits += 1;
        Ok(())
    }

    fn create_surface(&mut self, params: &SurfaceParams) -> Result<HeadlessSurface> {
        if self.fail_surface {
            return Err(anyhow!("Headless surface creation disabled"));
        }
        info!(
            "HeadlessBackend: create_surface {}x{} '{}'",
            params.width, params.height, params.title
        );
        {
            let mut stats = self.inner.stats();
            stats.surfaces_created += 1;
            stats.last_params = Some(params.clone());
        }
        Ok(HeadlessSurface {
            inner: Arc::clone(&self.inner),
            back_buffer: None,
        })
    }

    fn shutdown_video(&mut self) {
        info!("HeadlessBackend: shutdown_video");
        self.inner.stats().video_shutdowns += 1;
    }
}

/// Off-screen surface with a single back buffer.
pub struct HeadlessSurface {
    inner: Arc<Inner>,
    back_buffer: Option<VideoBuffer>,
}

impl WindowSurface for HeadlessSurface {
    fn upload(&mut self, frame: &VideoBuffer) -> Result<()> {
        trace!("HeadlessSurface: upload");
        match self.back_buffer.as_mut() {
            Some(back) => back.copy_from(frame),
            None => self.back_buffer = Some(frame.clone()),
        }
        self.inner.stats().uploads += 1;
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        trace!("HeadlessSurface: present");
        let mut stats = self.inner.stats();
        stats.presents += 1;
        stats.last_presented = self.back_buffer.clone();
        Ok(())
    }

    fn poll_event(&mut self) -> Option<DisplayEvent> {
        self.inner.events().pop_front()
    }
}

impl Drop for HeadlessSurface {
    fn drop(&mut self) {
        info!("HeadlessSurface::drop()");
        self.inner.stats().surfaces_released += 1;
    }
}
