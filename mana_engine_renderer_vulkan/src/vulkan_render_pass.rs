/// RenderPassCache - Vulkan render passes and framebuffers built on demand
///
/// Render passes are keyed by their attachment description and live until
/// the backend is dropped. Framebuffers reference swapchain image views and
/// are flushed whenever the swapchain is recreated.

use ash::vk;
use mana_engine::mana::render::{LoadOp, RenderPassInfo};
use mana_engine::mana::Result;
use mana_engine::mana_err;
use rustc_hash::FxHashMap;

use crate::vulkan_format::{load_op_to_vk, store_op_to_vk, texture_format_to_vk};

/// Attachment description a render pass is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct AttachmentKey {
    pub format: vk::Format,
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub initial_layout: vk::ImageLayout,
}

pub(crate) type RenderPassKey = Vec<AttachmentKey>;

/// Layout the attachment enters the pass in
///
/// Loading keeps the contents, so the real current layout is required.
/// Clearing or discarding may start from UNDEFINED.
pub(crate) fn initial_layout(load_op: LoadOp, current: vk::ImageLayout) -> vk::ImageLayout {
    match load_op {
        LoadOp::Load => current,
        LoadOp::Clear | LoadOp::DontCare => vk::ImageLayout::UNDEFINED,
    }
}

/// Build the cache key of a surface render pass
pub(crate) fn render_pass_key(info: &RenderPassInfo, current_layout: vk::ImageLayout) -> RenderPassKey {
    info.color_attachments
        .iter()
        .map(|attachment| AttachmentKey {
            format: texture_format_to_vk(attachment.format),
            load_op: load_op_to_vk(attachment.load_op),
            store_op: store_op_to_vk(attachment.store_op),
            initial_layout: initial_layout(attachment.load_op, current_layout),
        })
        .collect()
}

/// Create a single-subpass render pass whose attachments end in PRESENT_SRC
pub(crate) fn create_render_pass(device: &ash::Device, key: &[AttachmentKey]) -> Result<vk::RenderPass> {
    let attachments: Vec<vk::AttachmentDescription> = key
        .iter()
        .map(|attachment| {
            vk::AttachmentDescription::default()
                .format(attachment.format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(attachment.load_op)
                .store_op(attachment.store_op)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(attachment.initial_layout)
                .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
        })
        .collect();

    let color_refs: Vec<vk::AttachmentReference> = (0..key.len() as u32)
        .map(|index| vk::AttachmentReference {
            attachment: index,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        })
        .collect();

    let subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs);

    // Wait for the presentation engine (acquire semaphore) before writing
    let dependency = vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE);

    let render_pass_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass))
        .dependencies(std::slice::from_ref(&dependency));

    unsafe {
        device
            .create_render_pass(&render_pass_info, None)
            .map_err(|e| mana_err!("mana::vulkan", "Failed to create render pass: {:?}", e))
    }
}

pub(crate) struct RenderPassCache {
    device: ash::Device,
    render_passes: FxHashMap<RenderPassKey, vk::RenderPass>,
    framebuffers: FxHashMap<(vk::RenderPass, u32), vk::Framebuffer>,
}

impl RenderPassCache {
    pub fn new(device: &ash::Device) -> Self {
        Self {
            device: device.clone(),
            render_passes: FxHashMap::default(),
            framebuffers: FxHashMap::default(),
        }
    }

    pub fn render_pass(&mut self, key: RenderPassKey) -> Result<vk::RenderPass> {
        if let Some(&render_pass) = self.render_passes.get(&key) {
            return Ok(render_pass);
        }
        let render_pass = create_render_pass(&self.device, &key)?;
        self.render_passes.insert(key, render_pass);
        Ok(render_pass)
    }

    /// Framebuffer binding `image_view` (swapchain image `image_index`) to `render_pass`
    pub fn framebuffer(
        &mut self,
        render_pass: vk::RenderPass,
        image_index: u32,
        image_view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> Result<vk::Framebuffer> {
        if let Some(&framebuffer) = self.framebuffers.get(&(render_pass, image_index)) {
            return Ok(framebuffer);
        }

        let attachments = [image_view];
        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe { self.device.create_framebuffer(&framebuffer_info, None) }
            .map_err(|e| mana_err!("mana::vulkan", "Failed to create framebuffer: {:?}", e))?;
        self.framebuffers.insert((render_pass, image_index), framebuffer);
        Ok(framebuffer)
    }

    /// Destroy every framebuffer (swapchain images are about to change)
    pub fn clear_framebuffers(&mut self) {
        for (_, framebuffer) in self.framebuffers.drain() {
            unsafe { self.device.destroy_framebuffer(framebuffer, None) };
        }
    }

    pub fn render_pass_count(&self) -> usize {
        self.render_passes.len()
    }
}

impl Drop for RenderPassCache {
    fn drop(&mut self) {
        self.clear_framebuffers();
        for (_, render_pass) in self.render_passes.drain() {
            unsafe { self.device.destroy_render_pass(render_pass, None) };
        }
    }
}

#[cfg(test)]
#[path = "vulkan_render_pass_tests.rs"]
mod tests;
