/// SurfaceProvider trait - native window and event source

use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use crate::error::{Error, Result};

/// Raw platform handles a backend turns into a presentable surface
#[derive(Debug, Clone, Copy)]
pub struct NativeSurfaceHandles {
    /// Display / connection handle (X11 display, Wayland display, ...)
    pub display: RawDisplayHandle,
    /// Window handle (HWND, X11 window, Wayland surface, ...)
    pub window: RawWindowHandle,
}

/// Standard cursor shapes a surface may offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorKind {
    Default,
    Pointer,
    Text,
    Crosshair,
    Wait,
    Move,
    NotAllowed,
    Grab,
}

/// Cursor created by a surface provider
///
/// Only valid for the provider that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    kind: CursorKind,
}

impl Cursor {
    /// Wrap a cursor kind (for provider implementations)
    pub fn new(kind: CursorKind) -> Self {
        Self { kind }
    }

    /// Shape of this cursor
    pub fn kind(&self) -> CursorKind {
        self.kind
    }
}

/// Window/event source the frame executor renders into
///
/// Implemented by `WinitSurface` for real windows and `HeadlessSurface` for tests.
/// Cursor operations are optional capabilities: the default implementations
/// return `Error::Unsupported` so callers can tell "not implemented" apart
/// from a successful no-op.
pub trait SurfaceProvider {
    /// Drain pending platform input/resize/close events. Never blocks.
    fn poll_events(&mut self);

    /// False once a close request has been observed. Terminal.
    fn is_alive(&self) -> bool;

    /// Current framebuffer width in pixels (queried live)
    fn surface_width(&self) -> u32;

    /// Current framebuffer height in pixels (queried live)
    fn surface_height(&self) -> u32;

    /// Whether presentation should wait for vertical blank
    fn is_vsync(&self) -> bool {
        true
    }

    /// Raw handles used by a backend to create its presentable surface
    fn native_handles(&self) -> Result<NativeSurfaceHandles>;

    /// Hide the cursor while it is over the surface
    fn hide_cursor(&mut self) -> Result<()> {
        Err(Error::Unsupported("hide cursor"))
    }

    /// Show the cursor again
    fn show_cursor(&mut self) -> Result<()> {
        Err(Error::Unsupported("show cursor"))
    }

    /// Create a cursor of the given shape
    fn create_cursor(&mut self, _kind: CursorKind) -> Result<Cursor> {
        Err(Error::Unsupported("create cursor"))
    }

    /// Make `cursor` the active cursor over the surface
    fn set_cursor(&mut self, _cursor: &Cursor) -> Result<()> {
        Err(Error::Unsupported("set cursor"))
    }
}
