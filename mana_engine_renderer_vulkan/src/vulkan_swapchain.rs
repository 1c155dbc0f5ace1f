/// Swapchain - presentation images for the window surface
///
/// Owns the swapchain, its image views and one render-finished semaphore
/// per image. Recreation builds a new `Swapchain` from the old handle and
/// drops the old one.

use ash::vk;
use mana_engine::mana::render::{Extent2D, TextureFormat};
use mana_engine::mana::Result;
use mana_engine::{mana_debug, mana_error};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{vk_format_to_texture_format, vk_to_extent};

/// Preferred surface formats, best first
const PREFERRED_FORMATS: [vk::Format; 2] = [vk::Format::B8G8R8A8_SRGB, vk::Format::R8G8B8A8_SRGB];

/// Choose the surface format: sRGB BGRA/RGBA first, then anything the engine can name
pub(crate) fn choose_surface_format(available: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    PREFERRED_FORMATS
        .iter()
        .find_map(|&preferred| {
            available.iter().copied().find(|candidate| {
                candidate.format == preferred && candidate.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
            })
        })
        .or_else(|| {
            available
                .iter()
                .copied()
                .find(|candidate| vk_format_to_texture_format(candidate.format).is_some())
        })
}

/// FIFO when vsync is on; otherwise MAILBOX, then IMMEDIATE, then FIFO (always supported)
pub(crate) fn choose_present_mode(available: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|mode| available.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// The surface's current extent, or the requested one clamped to the surface limits
pub(crate) fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, requested: Extent2D) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: requested.width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: requested.height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// One image more than the minimum, capped by the maximum (0 means no limit)
pub(crate) fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let image_count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        image_count.min(capabilities.max_image_count)
    } else {
        image_count
    }
}

/// Vulkan swapchain and its per-image resources
pub(crate) struct Swapchain {
    device: ash::Device,
    loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    texture_format: TextureFormat,
    extent: vk::Extent2D,
    /// Extent requested by the caller (may differ from `extent` on some platforms)
    requested: Extent2D,
    /// Signaled when rendering to the image is done, waited on by present
    render_finished: Vec<vk::Semaphore>,
    /// Layout each image is left in after the last submitted work
    image_layouts: Vec<vk::ImageLayout>,
}

impl Swapchain {
    /// Create a swapchain for the context's surface
    ///
    /// `old_swapchain` is passed to the driver for resource reuse; the caller
    /// drops the old `Swapchain` afterwards.
    pub fn new(
        gpu: &GpuContext,
        requested: Extent2D,
        vsync: bool,
        old_swapchain: vk::SwapchainKHR,
    ) -> Result<Self> {
        unsafe {
            let capabilities = gpu.surface_loader
                .get_physical_device_surface_capabilities(gpu.physical_device, gpu.surface)
                .map_err(|e| init_err!("Failed to get surface capabilities: {:?}", e))?;

            let formats = gpu.surface_loader
                .get_physical_device_surface_formats(gpu.physical_device, gpu.surface)
                .map_err(|e| init_err!("Failed to get surface formats: {:?}", e))?;

            let present_modes = gpu.surface_loader
                .get_physical_device_surface_present_modes(gpu.physical_device, gpu.surface)
                .map_err(|e| init_err!("Failed to get present modes: {:?}", e))?;

            let surface_format = choose_surface_format(&formats)
                .ok_or_else(|| init_err!("No supported surface format among {:?}", formats))?;
            let texture_format = vk_format_to_texture_format(surface_format.format)
                .ok_or_else(|| init_err!("Unsupported surface format {:?}", surface_format.format))?;
            let present_mode = choose_present_mode(&present_modes, vsync);
            let extent = choose_extent(&capabilities, requested);
            let image_count = choose_image_count(&capabilities);

            let queue_family_indices = [gpu.queue_families.graphics, gpu.queue_families.present];
            let mut create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(gpu.surface)
                .min_image_count(image_count)
                .image_format(surface_format.format)
                .image_color_space(surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(present_mode)
                .clipped(true)
                .old_swapchain(old_swapchain);

            create_info = if gpu.queue_families.is_shared() {
                create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            } else {
                create_info
                    .image_sharing_mode(vk::SharingMode::CONCURRENT)
                    .queue_family_indices(&queue_family_indices)
            };

            let loader = ash::khr::swapchain::Device::new(&gpu.instance, &gpu.device);
            let swapchain = loader
                .create_swapchain(&create_info, None)
                .map_err(|e| init_err!("Failed to create swapchain: {:?}", e))?;

            // From here on, partially built resources are released by Drop
            let mut this = Self {
                device: gpu.device.clone(),
                loader,
                swapchain,
                images: Vec::new(),
                image_views: Vec::new(),
                texture_format,
                extent,
                requested,
                render_finished: Vec::new(),
                image_layouts: Vec::new(),
            };

            this.images = this.loader
                .get_swapchain_images(swapchain)
                .map_err(|e| init_err!("Failed to get swapchain images: {:?}", e))?;

            for &image in &this.images {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(surface_format.format)
                    .components(vk::ComponentMapping {
                        r: vk::ComponentSwizzle::IDENTITY,
                        g: vk::ComponentSwizzle::IDENTITY,
                        b: vk::ComponentSwizzle::IDENTITY,
                        a: vk::ComponentSwizzle::IDENTITY,
                    })
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });

                let view = this.device
                    .create_image_view(&view_info, None)
                    .map_err(|e| init_err!("Failed to create swapchain image view: {:?}", e))?;
                this.image_views.push(view);

                let semaphore = this.device
                    .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                    .map_err(|e| init_err!("Failed to create render-finished semaphore: {:?}", e))?;
                this.render_finished.push(semaphore);
            }

            this.image_layouts = vec![vk::ImageLayout::UNDEFINED; this.images.len()];

            mana_debug!("mana::vulkan", "Swapchain created: {}x{} {:?} {:?}, {} images",
                extent.width, extent.height, surface_format.format, present_mode, this.images.len());

            Ok(this)
        }
    }

    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    pub fn loader(&self) -> &ash::khr::swapchain::Device {
        &self.loader
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn image(&self, index: u32) -> vk::Image {
        self.images[index as usize]
    }

    pub fn image_view(&self, index: u32) -> vk::ImageView {
        self.image_views[index as usize]
    }

    pub fn render_finished(&self, index: u32) -> vk::Semaphore {
        self.render_finished[index as usize]
    }

    pub fn image_layout(&self, index: u32) -> vk::ImageLayout {
        self.image_layouts[index as usize]
    }

    pub fn set_image_layout(&mut self, index: u32, layout: vk::ImageLayout) {
        self.image_layouts[index as usize] = layout;
    }

    pub fn texture_format(&self) -> TextureFormat {
        self.texture_format
    }

    pub fn vk_extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn extent(&self) -> Extent2D {
        vk_to_extent(self.extent)
    }

    pub fn requested_extent(&self) -> Extent2D {
        self.requested
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                mana_error!("mana::vulkan", "Failed to wait idle before swapchain destruction: {:?}", e);
            }

            for &semaphore in &self.render_finished {
                self.device.destroy_semaphore(semaphore, None);
            }
            for &image_view in &self.image_views {
                self.device.destroy_image_view(image_view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
