/// VulkanBackend - Vulkan implementation of the `Backend` trait

use ash::vk;
use mana_engine::mana::render::{
    AcquiredImage, Backend, CommandList, ContextConfig, Extent2D, GraphicsPipelineDesc,
    PipelineLayoutDesc, PipelineRegistry, TextureFormat,
};
use mana_engine::mana::surface::SurfaceProvider;
use mana_engine::mana::{Error, Result};
use mana_engine::{mana_bail, mana_debug, mana_err, mana_info, mana_warn};

use crate::vulkan_command_list::{record_command_list, record_present_transition, ReplayTarget};
use crate::vulkan_context::GpuContext;
use crate::vulkan_frame::FrameSlot;
use crate::vulkan_pipeline::{VulkanPipeline, VulkanPipelineLayout};
use crate::vulkan_render_pass::RenderPassCache;
use crate::vulkan_swapchain::Swapchain;

/// Vulkan backend
///
/// Field order is drop order: everything created from the device goes
/// before `gpu`, which destroys the device, surface and instance.
pub struct VulkanBackend {
    render_passes: RenderPassCache,
    frames: Vec<FrameSlot>,
    swapchain: Swapchain,
    gpu: GpuContext,

    vsync: bool,
    /// Frame slot used by the current frame
    current_frame: usize,
    /// Fence of the frame slot that last rendered each swapchain image
    images_in_flight: Vec<vk::Fence>,
    /// Command buffers submitted during the current frame, executed by `end_frame`
    pending: Vec<vk::CommandBuffer>,
    /// Set when acquire/present report the swapchain as suboptimal or out of date
    needs_recreate: bool,
    recreation_count: u64,
}

impl VulkanBackend {
    /// Name of the physical device in use
    pub fn device_name(&self) -> &str {
        &self.gpu.device_name
    }

    /// Number of swapchain recreations since init
    pub fn recreation_count(&self) -> u64 {
        self.recreation_count
    }

    /// Number of cached render passes
    pub fn render_pass_count(&self) -> usize {
        self.render_passes.render_pass_count()
    }

    /// Current swapchain size
    pub fn swapchain_extent(&self) -> Extent2D {
        self.swapchain.extent()
    }

    fn recreate_swapchain(&mut self, extent: Extent2D) -> Result<()> {
        unsafe {
            self.gpu.device.device_wait_idle()
                .map_err(|e| mana_err!("mana::vulkan", "Failed to wait idle before swapchain recreate: {:?}", e))?;
        }

        self.render_passes.clear_framebuffers();
        let swapchain = Swapchain::new(&self.gpu, extent, self.vsync, self.swapchain.handle())
            .map_err(|e| Error::BackendError(format!("Swapchain recreation failed: {}", e)))?;
        self.swapchain = swapchain;

        self.images_in_flight = vec![vk::Fence::null(); self.swapchain.image_count()];
        self.needs_recreate = false;
        self.recreation_count += 1;

        mana_debug!("mana::vulkan", "Swapchain recreated for {}x{} (now {}x{})",
            extent.width, extent.height, self.swapchain.extent().width, self.swapchain.extent().height);
        Ok(())
    }

    /// Acquire an image with the current slot's semaphore
    ///
    /// `Ok(None)` means the swapchain is out of date.
    fn try_acquire(&mut self) -> Result<Option<u32>> {
        let semaphore = self.frames[self.current_frame].image_available();
        let result = unsafe {
            self.swapchain.loader().acquire_next_image(
                self.swapchain.handle(),
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            )
        };

        match result {
            Ok((image_index, suboptimal)) => {
                if suboptimal {
                    // Still presentable: rebuild before the next frame
                    self.needs_recreate = true;
                }
                Ok(Some(image_index))
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(None),
            Err(e) => Err(mana_err!("mana::vulkan", "Failed to acquire swapchain image: {:?}", e)),
        }
    }

    fn check_image(&self, image: &AcquiredImage) -> Result<()> {
        if image.image_index as usize >= self.swapchain.image_count() {
            mana_bail!("mana::vulkan", "Image index {} out of range ({} swapchain images)",
                image.image_index, self.swapchain.image_count());
        }
        Ok(())
    }
}

impl Backend for VulkanBackend {
    type PipelineLayout = VulkanPipelineLayout;
    type Pipeline = VulkanPipeline;

    fn init(surface: &dyn SurfaceProvider, config: &ContextConfig) -> Result<Self> {
        let extent = Extent2D::new(surface.surface_width(), surface.surface_height());
        if extent.is_empty() {
            return Err(init_err!("Surface has a zero extent ({}x{})", extent.width, extent.height));
        }
        if config.frames_in_flight == 0 {
            return Err(init_err!("frames_in_flight must be at least 1"));
        }

        let gpu = GpuContext::new(surface, config)?;
        let vsync = surface.is_vsync();
        let swapchain = Swapchain::new(&gpu, extent, vsync, vk::SwapchainKHR::null())?;

        let mut frames = Vec::with_capacity(config.frames_in_flight as usize);
        for _ in 0..config.frames_in_flight {
            frames.push(FrameSlot::new(&gpu.device, gpu.queue_families.graphics)?);
        }

        let render_passes = RenderPassCache::new(&gpu.device);
        let images_in_flight = vec![vk::Fence::null(); swapchain.image_count()];

        mana_info!("mana::vulkan", "Vulkan backend ready on '{}' ({} frames in flight, vsync {})",
            gpu.device_name, frames.len(), vsync);

        Ok(Self {
            render_passes,
            frames,
            swapchain,
            gpu,
            vsync,
            current_frame: 0,
            images_in_flight,
            pending: Vec::new(),
            needs_recreate: false,
            recreation_count: 0,
        })
    }

    fn name(&self) -> &str {
        "Vulkan"
    }

    fn surface_format(&self) -> TextureFormat {
        self.swapchain.texture_format()
    }

    fn create_pipeline_layout(&mut self, desc: &PipelineLayoutDesc) -> Result<VulkanPipelineLayout> {
        VulkanPipelineLayout::new(&self.gpu.device, desc)
    }

    fn create_graphics_pipeline(
        &mut self,
        desc: &GraphicsPipelineDesc,
        layout: &VulkanPipelineLayout,
    ) -> Result<VulkanPipeline> {
        VulkanPipeline::new(&self.gpu.device, desc, layout)
    }

    fn acquire_next_image(&mut self, extent: Extent2D) -> Result<AcquiredImage> {
        if self.needs_recreate || extent != self.swapchain.requested_extent() {
            self.recreate_swapchain(extent)?;
        }

        let slot = &mut self.frames[self.current_frame];
        slot.wait()?;
        slot.reset()?;

        let image_index = match self.try_acquire()? {
            Some(image_index) => image_index,
            None => {
                mana_debug!("mana::vulkan", "Swapchain out of date on acquire, recreating");
                self.recreate_swapchain(extent)?;
                match self.try_acquire()? {
                    Some(image_index) => image_index,
                    None => mana_bail!("mana::vulkan", "Swapchain still out of date after recreation"),
                }
            }
        };

        // Another slot may still be rendering to this image
        let image_fence = self.images_in_flight[image_index as usize];
        if image_fence != vk::Fence::null() {
            unsafe {
                self.gpu.device
                    .wait_for_fences(&[image_fence], true, u64::MAX)
                    .map_err(|e| mana_err!("mana::vulkan", "Failed to wait for image fence: {:?}", e))?;
            }
        }

        self.pending.clear();

        Ok(AcquiredImage {
            image_index,
            extent: self.swapchain.extent(),
            format: self.swapchain.texture_format(),
        })
    }

    fn submit(
        &mut self,
        image: &AcquiredImage,
        commands: &CommandList,
        pipelines: &PipelineRegistry<VulkanPipeline>,
    ) -> Result<()> {
        self.check_image(image)?;

        let command_buffer = self.frames[self.current_frame].next_command_buffer()?;
        record_command_list(
            &self.gpu.device,
            command_buffer,
            commands,
            ReplayTarget {
                image_index: image.image_index,
                swapchain: &mut self.swapchain,
                render_passes: &mut self.render_passes,
                pipelines,
            },
        )?;

        self.pending.push(command_buffer);
        Ok(())
    }

    fn end_frame(&mut self, image: &AcquiredImage) -> Result<()> {
        self.check_image(image)?;

        // No render pass reached the image (nothing submitted, or only empty
        // lists): it still has to be in PRESENT_SRC before present
        let layout = self.swapchain.image_layout(image.image_index);
        if layout != vk::ImageLayout::PRESENT_SRC_KHR {
            let command_buffer = self.frames[self.current_frame].next_command_buffer()?;
            record_present_transition(
                &self.gpu.device,
                command_buffer,
                self.swapchain.image(image.image_index),
                layout,
            )?;
            self.swapchain.set_image_layout(image.image_index, vk::ImageLayout::PRESENT_SRC_KHR);
            self.pending.push(command_buffer);
        }

        let slot = &self.frames[self.current_frame];
        let wait_semaphores = [slot.image_available()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [self.swapchain.render_finished(image.image_index)];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&self.pending)
            .signal_semaphores(&signal_semaphores);

        slot.reset_fence()?;
        unsafe {
            self.gpu.device
                .queue_submit(self.gpu.graphics_queue, &[submit_info], slot.fence())
                .map_err(|e| mana_err!("mana::vulkan", "Failed to submit frame to GPU queue: {:?}", e))?;
        }

        self.images_in_flight[image.image_index as usize] = slot.fence();
        self.pending.clear();
        Ok(())
    }

    fn present(&mut self, image: &AcquiredImage) -> Result<()> {
        self.check_image(image)?;

        let swapchains = [self.swapchain.handle()];
        let image_indices = [image.image_index];
        let wait_semaphores = [self.swapchain.render_finished(image.image_index)];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe {
            self.swapchain.loader().queue_present(self.gpu.present_queue, &present_info)
        };

        // Move to next frame
        self.current_frame = (self.current_frame + 1) % self.frames.len();

        match result {
            Ok(false) => Ok(()),
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                mana_debug!("mana::vulkan", "Swapchain out of date or suboptimal on present");
                self.needs_recreate = true;
                Ok(())
            }
            Err(e) => Err(mana_err!("mana::vulkan", "Failed to present swapchain image: {:?}", e)),
        }
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.gpu.device
                .device_wait_idle()
                .map_err(|e| mana_err!("mana::vulkan", "Failed to wait for device idle: {:?}", e))
        }
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        if let Err(e) = self.wait_idle() {
            mana_warn!("mana::vulkan", "Tearing down backend without device idle: {}", e);
        }
        mana_debug!("mana::vulkan", "Vulkan backend destroyed ({} swapchain recreation(s))", self.recreation_count);
    }
}
