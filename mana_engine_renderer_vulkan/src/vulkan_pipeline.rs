/// VulkanPipeline / VulkanPipelineLayout - graphics pipeline objects
///
/// Both are stored in the context's registry and destroy their Vulkan
/// handles on drop. Pipelines use dynamic viewport and scissor and take no
/// vertex buffers: vertices come from the vertex index.

use ash::vk;
use mana_engine::mana::render::{GraphicsPipelineDesc, PipelineLayoutDesc, PrimitiveTopology};
use mana_engine::mana::{Error, Result};
use mana_engine::{mana_debug, mana_error};

use crate::vulkan_format::{binding_type_to_vk, stage_flags_to_vk, texture_format_to_vk, topology_to_vk};
use crate::vulkan_render_pass::{create_render_pass, AttachmentKey};
use crate::vulkan_shader::ShaderModule;

fn build_err(what: &str, e: vk::Result) -> Error {
    Error::PipelineBuild(format!("{}: {:?}", what, e))
}

/// Vulkan pipeline layout (+ its descriptor set layout, if any)
pub struct VulkanPipelineLayout {
    pub(crate) pipeline_layout: vk::PipelineLayout,
    pub(crate) set_layout: Option<vk::DescriptorSetLayout>,
    device: ash::Device,
}

impl VulkanPipelineLayout {
    pub(crate) fn new(device: &ash::Device, desc: &PipelineLayoutDesc) -> Result<Self> {
        unsafe {
            let set_layout = if desc.bindings.is_empty() {
                None
            } else {
                let bindings: Vec<vk::DescriptorSetLayoutBinding> = desc.bindings
                    .iter()
                    .map(|slot| {
                        vk::DescriptorSetLayoutBinding::default()
                            .binding(slot.binding)
                            .descriptor_type(binding_type_to_vk(slot.binding_type))
                            .descriptor_count(slot.count)
                            .stage_flags(stage_flags_to_vk(slot.stages))
                    })
                    .collect();

                let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
                let set_layout = device.create_descriptor_set_layout(&create_info, None).map_err(|e| {
                    mana_error!("mana::vulkan", "Failed to create descriptor set layout: {:?}", e);
                    build_err("Failed to create descriptor set layout", e)
                })?;
                Some(set_layout)
            };

            let set_layouts: Vec<vk::DescriptorSetLayout> = set_layout.into_iter().collect();
            let create_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);

            let pipeline_layout = match device.create_pipeline_layout(&create_info, None) {
                Ok(layout) => layout,
                Err(e) => {
                    if let Some(set_layout) = set_layout {
                        device.destroy_descriptor_set_layout(set_layout, None);
                    }
                    mana_error!("mana::vulkan", "Failed to create pipeline layout: {:?}", e);
                    return Err(build_err("Failed to create pipeline layout", e));
                }
            };

            Ok(Self {
                pipeline_layout,
                set_layout,
                device: device.clone(),
            })
        }
    }
}

impl Drop for VulkanPipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline_layout(self.pipeline_layout, None);
            if let Some(set_layout) = self.set_layout {
                self.device.destroy_descriptor_set_layout(set_layout, None);
            }
        }
    }
}

/// Vulkan graphics pipeline
pub struct VulkanPipeline {
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) topology: PrimitiveTopology,
    pub(crate) label: Option<String>,
    device: ash::Device,
}

impl VulkanPipeline {
    pub(crate) fn new(
        device: &ash::Device,
        desc: &GraphicsPipelineDesc,
        layout: &VulkanPipelineLayout,
    ) -> Result<Self> {
        let vertex = ShaderModule::new(device, &desc.vertex.shader)?;
        let fragment = ShaderModule::new(device, &desc.fragment.shader)?;

        // Compatible render pass for pipeline creation: only formats matter
        let compatible_key: Vec<AttachmentKey> = desc.color_formats
            .iter()
            .map(|&format| AttachmentKey {
                format: texture_format_to_vk(format),
                load_op: vk::AttachmentLoadOp::CLEAR,
                store_op: vk::AttachmentStoreOp::STORE,
                initial_layout: vk::ImageLayout::UNDEFINED,
            })
            .collect();
        let temp_render_pass = create_render_pass(device, &compatible_key).map_err(|e| {
            Error::PipelineBuild(format!("Failed to create compatible render pass: {}", e))
        })?;

        let shader_stages = [vertex.stage_info(), fragment.stage_info()];

        // Vertices are generated from the vertex index
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default();

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(desc.topology))
            .primitive_restart_enable(false);

        // Viewport state (dynamic)
        let viewports = [vk::Viewport::default()];
        let scissors = [vk::Rect2D::default()];
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = desc.color_formats
            .iter()
            .map(|_| {
                vk::PipelineColorBlendAttachmentState::default()
                    .color_write_mask(vk::ColorComponentFlags::RGBA)
                    .blend_enable(false)
            })
            .collect();
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
            .dynamic_states(&dynamic_states);

        let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout.pipeline_layout)
            .render_pass(temp_render_pass)
            .subpass(0);

        let result = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_create_info], None)
        };

        unsafe { device.destroy_render_pass(temp_render_pass, None) };

        let pipeline = result
            .map_err(|(_, e)| e)
            .and_then(|pipelines| pipelines.into_iter().next().ok_or(vk::Result::ERROR_UNKNOWN))
            .map_err(|e| {
                mana_error!("mana::vulkan", "Failed to create graphics pipeline '{}': {:?}",
                    desc.label.as_deref().unwrap_or("unnamed"), e);
                build_err("Failed to create graphics pipeline", e)
            })?;

        mana_debug!("mana::vulkan", "Graphics pipeline '{}' created ({:?}, {} color target(s))",
            desc.label.as_deref().unwrap_or("unnamed"), desc.topology, desc.color_formats.len());

        Ok(Self {
            pipeline,
            topology: desc.topology,
            label: desc.label.clone(),
            device: device.clone(),
        })
    }

    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl Drop for VulkanPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
        }
    }
}
