/*!
# Mana Engine - Vulkan Renderer Backend

Vulkan implementation of the Mana `Backend` trait.

This crate drives the GPU through the Ash bindings: instance and surface
creation from the window's native handles, device selection, swapchain
management with transparent recreation, per-frame synchronization and
replay of recorded command lists.

```no_run
use mana_engine::mana::render::ContextConfig;
use mana_engine::mana::surface::{WindowConfig, WinitSurface};

let surface = WinitSurface::init(&WindowConfig::default())?;
let _context = mana_engine_renderer_vulkan::create_context(&surface, &ContextConfig::default())?;
# Ok::<(), mana_engine::mana::Error>(())
```
*/

/// Log an initialization failure and evaluate to `Error::ContextInit` carrying it
macro_rules! init_err {
    ($($arg:tt)*) => {{
        let message = format!($($arg)*);
        mana_engine::mana_error!("mana::vulkan", "{}", message);
        mana_engine::mana::Error::ContextInit(message)
    }};
}

// Vulkan implementation modules
mod vulkan;
mod vulkan_context;
mod vulkan_swapchain;
mod vulkan_frame;
mod vulkan_render_pass;
mod vulkan_shader;
mod vulkan_pipeline;
mod vulkan_command_list;
mod vulkan_format;

#[cfg(feature = "vulkan-validation")]
mod debug;

pub use vulkan::VulkanBackend;
pub use vulkan_pipeline::{VulkanPipeline, VulkanPipelineLayout};

// Re-export debug utilities
#[cfg(feature = "vulkan-validation")]
pub use debug::{get_validation_stats, ValidationStats};

use mana_engine::mana::render::ContextConfig;
use mana_engine::mana::surface::SurfaceProvider;
use mana_engine::mana::{Context, Result};

/// Frame executor running on Vulkan
pub type VulkanContext = Context<VulkanBackend>;

/// Create a Vulkan-backed context for `surface`
///
/// # Errors
///
/// Returns `Error::ContextInit` if the Vulkan library, a suitable GPU or the
/// swapchain is unavailable.
pub fn create_context(surface: &dyn SurfaceProvider, config: &ContextConfig) -> Result<VulkanContext> {
    Context::init(surface, config)
}
