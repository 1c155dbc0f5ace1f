/// Command replay - translates a recorded `CommandList` into a Vulkan command buffer
///
/// The list was validated while recording; replay only resolves handles
/// (render passes, framebuffers, pipelines) and emits the Vulkan calls.

use ash::vk;
use mana_engine::mana::render::{Command, CommandList, PipelineRegistry, Rect2D, Viewport};
use mana_engine::mana::{Error, Result};
use mana_engine::{mana_err, mana_trace};

use crate::vulkan_format::{clear_value, rect_to_vk, viewport_to_vk};
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_render_pass::{render_pass_key, RenderPassCache};
use crate::vulkan_swapchain::Swapchain;

/// Everything a replay needs besides the command buffer
pub(crate) struct ReplayTarget<'a> {
    pub image_index: u32,
    pub swapchain: &'a mut Swapchain,
    pub render_passes: &'a mut RenderPassCache,
    pub pipelines: &'a PipelineRegistry<VulkanPipeline>,
}

/// Record `commands` into `command_buffer` (begin to end)
pub(crate) fn record_command_list(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    commands: &CommandList,
    target: ReplayTarget<'_>,
) -> Result<()> {
    let ReplayTarget { image_index, swapchain, render_passes, pipelines } = target;

    unsafe {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        device
            .begin_command_buffer(command_buffer, &begin_info)
            .map_err(|e| mana_err!("mana::vulkan", "Failed to begin command buffer: {:?}", e))?;

        for command in commands.commands() {
            match command {
                Command::BeginRenderPass(info) => {
                    if info.target.image_index != image_index {
                        return Err(Error::InvalidResource(format!(
                            "Render pass targets image {} but image {} is acquired",
                            info.target.image_index, image_index)));
                    }
                    if info.color_attachments.len() != 1 {
                        return Err(Error::CommandRecording(format!(
                            "Surface render pass takes exactly one color attachment, got {}",
                            info.color_attachments.len())));
                    }

                    let key = render_pass_key(info, swapchain.image_layout(image_index));
                    let render_pass = render_passes.render_pass(key)?;
                    let framebuffer = render_passes.framebuffer(
                        render_pass,
                        image_index,
                        swapchain.image_view(image_index),
                        swapchain.vk_extent(),
                    )?;

                    let clear_values: Vec<vk::ClearValue> = info.color_attachments
                        .iter()
                        .map(|attachment| clear_value(attachment.clear_color))
                        .collect();

                    let begin_info = vk::RenderPassBeginInfo::default()
                        .render_pass(render_pass)
                        .framebuffer(framebuffer)
                        .render_area(rect_to_vk(info.render_area))
                        .clear_values(&clear_values);
                    device.cmd_begin_render_pass(command_buffer, &begin_info, vk::SubpassContents::INLINE);

                    // A pass starts with viewport and scissor covering its render area
                    apply_viewport(device, command_buffer, Viewport::from_rect(info.render_area));
                    apply_scissor(device, command_buffer, info.render_area);
                }
                Command::EndRenderPass => {
                    device.cmd_end_render_pass(command_buffer);
                    swapchain.set_image_layout(image_index, vk::ImageLayout::PRESENT_SRC_KHR);
                }
                Command::BindPipeline(handle) => {
                    let pipeline = pipelines.get(handle)?;
                    device.cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline.pipeline);
                }
                Command::SetViewport(viewport) => apply_viewport(device, command_buffer, *viewport),
                Command::SetScissor(scissor) => apply_scissor(device, command_buffer, *scissor),
                Command::Draw { vertex_count, first_vertex } => {
                    device.cmd_draw(command_buffer, *vertex_count, 1, *first_vertex, 0);
                }
            }
        }

        device
            .end_command_buffer(command_buffer)
            .map_err(|e| mana_err!("mana::vulkan", "Failed to end command buffer: {:?}", e))?;
    }

    mana_trace!("mana::vulkan", "Replayed {} command(s) of frame {} into image {}",
        commands.len(), commands.frame_serial(), image_index);
    Ok(())
}

/// Record a bare `old_layout` -> PRESENT_SRC transition for an image no render pass wrote to
pub(crate) fn record_present_transition(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    old_layout: vk::ImageLayout,
) -> Result<()> {
    unsafe {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        device
            .begin_command_buffer(command_buffer, &begin_info)
            .map_err(|e| mana_err!("mana::vulkan", "Failed to begin command buffer: {:?}", e))?;

        let barrier = vk::ImageMemoryBarrier::default()
            .src_access_mask(vk::AccessFlags::empty())
            .dst_access_mask(vk::AccessFlags::empty())
            .old_layout(old_layout)
            .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        device.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::PipelineStageFlags::BOTTOM_OF_PIPE,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );

        device
            .end_command_buffer(command_buffer)
            .map_err(|e| mana_err!("mana::vulkan", "Failed to end command buffer: {:?}", e))
    }
}

unsafe fn apply_viewport(device: &ash::Device, command_buffer: vk::CommandBuffer, viewport: Viewport) {
    device.cmd_set_viewport(command_buffer, 0, &[viewport_to_vk(viewport)]);
}

unsafe fn apply_scissor(device: &ash::Device, command_buffer: vk::CommandBuffer, scissor: Rect2D) {
    device.cmd_set_scissor(command_buffer, 0, &[rect_to_vk(scissor)]);
}
