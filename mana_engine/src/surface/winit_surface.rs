/// WinitSurface - SurfaceProvider backed by a winit window
///
/// The event loop is pumped once per frame with a zero timeout instead of
/// handing control to `EventLoop::run_app`, so the caller keeps its own
/// frame loop.

use std::time::Duration;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{CursorIcon, Window, WindowId};

use crate::error::{Error, Result};
use crate::surface::{Cursor, CursorKind, NativeSurfaceHandles, SurfaceProvider};
use crate::{mana_debug, mana_error, mana_info};

/// Window configuration
#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial width (logical pixels)
    pub width: u32,
    /// Initial height (logical pixels)
    pub height: u32,
    /// Whether the user can resize the window
    pub resizable: bool,
    /// Whether the window is shown on creation
    pub visible: bool,
    /// Whether presentation waits for vertical blank
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Mana App Template".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
            visible: true,
            vsync: true,
        }
    }
}

/// Event sink handed to `pump_app_events`
struct SurfaceEvents {
    window_id: WindowId,
    close_requested: bool,
}

impl ApplicationHandler for SurfaceEvents {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if window_id != self.window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => {
                mana_debug!("mana::WinitSurface", "Window resized to {}x{}", size.width, size.height);
            }
            _ => {}
        }
    }
}

/// Surface provider backed by a winit window
pub struct WinitSurface {
    // Window must be dropped before the event loop
    window: Window,
    events: SurfaceEvents,
    event_loop: EventLoop<()>,
    vsync: bool,
}

impl WinitSurface {
    /// Create the event loop and the window
    ///
    /// # Errors
    ///
    /// Returns `Error::WindowSystemInit` if the platform event loop or the
    /// window cannot be created.
    pub fn init(config: &WindowConfig) -> Result<Self> {
        let event_loop = EventLoop::new().map_err(|e| {
            mana_error!("mana::WinitSurface", "Failed to create event loop: {}", e);
            Error::WindowSystemInit(format!("Failed to create event loop: {}", e))
        })?;

        let attributes = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(LogicalSize::new(config.width, config.height))
            .with_resizable(config.resizable)
            .with_visible(config.visible);

        #[allow(deprecated)]
        let window = event_loop.create_window(attributes).map_err(|e| {
            mana_error!("mana::WinitSurface", "Failed to create window: {}", e);
            Error::WindowSystemInit(format!("Failed to create window: {}", e))
        })?;

        let size = window.inner_size();
        mana_info!("mana::WinitSurface", "Window '{}' created ({}x{} framebuffer)",
            config.title, size.width, size.height);

        Ok(Self {
            events: SurfaceEvents {
                window_id: window.id(),
                close_requested: false,
            },
            window,
            event_loop,
            vsync: config.vsync,
        })
    }

    /// Underlying winit window
    pub fn window(&self) -> &Window {
        &self.window
    }
}

impl SurfaceProvider for WinitSurface {
    fn poll_events(&mut self) {
        let status = self.event_loop.pump_app_events(Some(Duration::ZERO), &mut self.events);
        if let PumpStatus::Exit(code) = status {
            mana_debug!("mana::WinitSurface", "Event loop exited with code {}", code);
            self.events.close_requested = true;
        }
    }

    fn is_alive(&self) -> bool {
        !self.events.close_requested
    }

    fn surface_width(&self) -> u32 {
        self.window.inner_size().width
    }

    fn surface_height(&self) -> u32 {
        self.window.inner_size().height
    }

    fn is_vsync(&self) -> bool {
        self.vsync
    }

    fn native_handles(&self) -> Result<NativeSurfaceHandles> {
        let display = self.window.display_handle()
            .map_err(|e| Error::ContextInit(format!("Failed to get display handle: {}", e)))?;
        let window = self.window.window_handle()
            .map_err(|e| Error::ContextInit(format!("Failed to get window handle: {}", e)))?;

        Ok(NativeSurfaceHandles {
            display: display.as_raw(),
            window: window.as_raw(),
        })
    }

    fn hide_cursor(&mut self) -> Result<()> {
        self.window.set_cursor_visible(false);
        Ok(())
    }

    fn show_cursor(&mut self) -> Result<()> {
        self.window.set_cursor_visible(true);
        Ok(())
    }

    fn create_cursor(&mut self, kind: CursorKind) -> Result<Cursor> {
        Ok(Cursor::new(kind))
    }

    fn set_cursor(&mut self, cursor: &Cursor) -> Result<()> {
        self.window.set_cursor(cursor_icon(cursor.kind()));
        Ok(())
    }
}

fn cursor_icon(kind: CursorKind) -> CursorIcon {
    match kind {
        CursorKind::Default => CursorIcon::Default,
        CursorKind::Pointer => CursorIcon::Pointer,
        CursorKind::Text => CursorIcon::Text,
        CursorKind::Crosshair => CursorIcon::Crosshair,
        CursorKind::Wait => CursorIcon::Wait,
        CursorKind::Move => CursorIcon::Move,
        CursorKind::NotAllowed => CursorIcon::NotAllowed,
        CursorKind::Grab => CursorIcon::Grab,
    }
}
