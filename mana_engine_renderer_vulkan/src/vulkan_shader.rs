/// ShaderModule - Vulkan shader module alive only while a pipeline is built

use ash::vk;
use mana_engine::mana::shader::CompiledShader;
use mana_engine::mana::{Error, Result};
use mana_engine::mana_error;
use std::ffi::CString;

pub(crate) struct ShaderModule {
    pub(crate) module: vk::ShaderModule,
    pub(crate) stage: vk::ShaderStageFlags,
    /// Entry point name as it appears in the SPIR-V
    pub(crate) entry_point: CString,
    device: ash::Device,
}

impl ShaderModule {
    pub fn new(device: &ash::Device, shader: &CompiledShader) -> Result<Self> {
        let entry_point = CString::new(shader.spirv_entry_point()).map_err(|e| {
            mana_error!("mana::vulkan", "Invalid entry point name '{}': {}", shader.spirv_entry_point(), e);
            Error::PipelineBuild(format!("Invalid entry point name: {}", e))
        })?;

        let stage = crate::vulkan_format::stage_flags_to_vk(shader.stage().into());

        let create_info = vk::ShaderModuleCreateInfo::default().code(shader.spirv());
        let module = unsafe { device.create_shader_module(&create_info, None) }.map_err(|e| {
            mana_error!("mana::vulkan", "Failed to create {:?} shader module: {:?}", shader.stage(), e);
            Error::PipelineBuild(format!("Failed to create {:?} shader module: {:?}", shader.stage(), e))
        })?;

        Ok(Self {
            module,
            stage,
            entry_point,
            device: device.clone(),
        })
    }

    pub fn stage_info(&self) -> vk::PipelineShaderStageCreateInfo<'_> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage)
            .module(self.module)
            .name(&self.entry_point)
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}
