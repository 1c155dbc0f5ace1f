/// HeadlessSurface - in-memory SurfaceProvider (no window system required)
///
/// Used with `HeadlessBackend` for tests. Close requests and resizes are
/// simulated through `request_close()` and `resize()`.

use crate::error::{Error, Result};
use crate::surface::{NativeSurfaceHandles, SurfaceProvider};

/// Surface provider without a native window
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    width: u32,
    height: u32,
    alive: bool,
    close_pending: bool,
    polls: u64,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            alive: true,
            close_pending: false,
            polls: 0,
        }
    }

    /// Simulate a close request; observed by the next `poll_events()`
    pub fn request_close(&mut self) {
        self.close_pending = true;
    }

    /// Simulate a framebuffer resize (visible immediately)
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Number of `poll_events()` calls so far
    pub fn poll_count(&self) -> u64 {
        self.polls
    }
}

impl SurfaceProvider for HeadlessSurface {
    fn poll_events(&mut self) {
        self.polls += 1;
        if self.close_pending {
            self.alive = false;
        }
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn surface_width(&self) -> u32 {
        self.width
    }

    fn surface_height(&self) -> u32 {
        self.height
    }

    fn native_handles(&self) -> Result<NativeSurfaceHandles> {
        Err(Error::Unsupported("native handles on a headless surface"))
    }
}

#[cfg(test)]
#[path = "headless_surface_tests.rs"]
mod tests;
