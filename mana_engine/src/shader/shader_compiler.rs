/// Shader compiler - source text to SPIR-V for one stage and entry point
///
/// Compilation is a pure function of its `ShaderCompileInfo`: every call
/// builds its own compiler instance, so compiling the same source twice
/// (once per stage) is safe and yields identical results.

use bitflags::bitflags;
use spirq::spirv::{BuiltIn, Decoration, ExecutionModel, Op};
use crate::error::{Error, Result};
use crate::{mana_debug, mana_error, mana_warn};

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Fragment/Pixel shader
    Fragment,
    /// Compute shader
    Compute,
}

bitflags! {
    /// Set of shader stages a binding is visible to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 0b001;
        const FRAGMENT = 0b010;
        const COMPUTE = 0b100;
    }
}

impl From<ShaderStage> for ShaderStageFlags {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => ShaderStageFlags::FRAGMENT,
            ShaderStage::Compute => ShaderStageFlags::COMPUTE,
        }
    }
}

/// Shading language dialect of the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    Hlsl,
    Glsl,
}

/// Input of one compilation
#[derive(Debug, Clone)]
pub struct ShaderCompileInfo<'a> {
    /// Dialect of `source`
    pub language: SourceLanguage,
    /// Source text
    pub source: &'a str,
    /// Target pipeline stage
    pub stage: ShaderStage,
    /// Name of the entry function in `source`
    pub entry_point: &'a str,
    /// Emit debug information (no semantic change)
    pub debug: bool,
    /// Name used in compiler diagnostics
    pub file_name: &'a str,
}

impl<'a> ShaderCompileInfo<'a> {
    /// HLSL compile info with debug info disabled
    pub fn hlsl(source: &'a str, stage: ShaderStage, entry_point: &'a str) -> Self {
        Self {
            language: SourceLanguage::Hlsl,
            source,
            stage,
            entry_point,
            debug: false,
            file_name: "shader.hlsl",
        }
    }

    /// GLSL compile info with debug info disabled
    pub fn glsl(source: &'a str, stage: ShaderStage, entry_point: &'a str) -> Self {
        Self {
            language: SourceLanguage::Glsl,
            source,
            stage,
            entry_point,
            debug: false,
            file_name: "shader.glsl",
        }
    }

    /// Builder-style toggle for debug information
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// SPIR-V binary for one stage
///
/// Remembers the entry point it was compiled for and the entry points the
/// binary actually declares (the compiler may rename the source entry, e.g.
/// to `main`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledShader {
    stage: ShaderStage,
    entry_point: String,
    spirv_entry_points: Vec<String>,
    spirv: Vec<u32>,
}

impl CompiledShader {
    #[cfg(test)]
    pub(crate) fn from_parts(stage: ShaderStage, entry_point: &str, spirv: Vec<u32>) -> Self {
        Self {
            stage,
            entry_point: entry_point.to_string(),
            spirv_entry_points: vec!["main".to_string()],
            spirv,
        }
    }

    /// Stage this shader was compiled for
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Entry point requested at compile time
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Entry point name to hand to the GPU API
    pub fn spirv_entry_point(&self) -> &str {
        if self.spirv_entry_points.iter().any(|name| name == &self.entry_point) {
            &self.entry_point
        } else {
            // Non-empty, checked in compile_shader()
            self.spirv_entry_points.first().map(String::as_str).unwrap_or(&self.entry_point)
        }
    }

    /// SPIR-V words
    pub fn spirv(&self) -> &[u32] {
        &self.spirv
    }

    /// Size of the binary in bytes
    pub fn byte_len(&self) -> usize {
        self.spirv.len() * std::mem::size_of::<u32>()
    }

    /// True if `name` is the requested entry point or one declared in the binary
    pub fn has_entry_point(&self, name: &str) -> bool {
        self.entry_point == name || self.spirv_entry_points.iter().any(|n| n == name)
    }
}

/// Words of the SPIR-V module header
const SPIRV_HEADER_WORDS: usize = 5;

/// Built-ins decorated in a SPIR-V module (`BuiltIn` values, in declaration order)
///
/// Reflection skips built-in interface variables, so they are read from the
/// `OpDecorate` / `OpMemberDecorate` instructions directly.
pub(crate) fn decorated_builtins(spirv: &[u32]) -> Vec<u32> {
    let mut builtins = Vec::new();
    let mut offset = SPIRV_HEADER_WORDS;

    while offset < spirv.len() {
        let word_count = (spirv[offset] >> 16) as usize;
        let opcode = spirv[offset] & 0xffff;
        if word_count == 0 || offset + word_count > spirv.len() {
            break;
        }

        let operands = &spirv[offset + 1..offset + word_count];
        // OpDecorate: target, decoration, literals
        // OpMemberDecorate: struct type, member, decoration, literals
        let decoration_operands = if opcode == Op::Decorate as u32 {
            operands.get(1..)
        } else if opcode == Op::MemberDecorate as u32 {
            operands.get(2..)
        } else {
            None
        };
        if let Some([decoration, builtin, ..]) = decoration_operands {
            if *decoration == Decoration::BuiltIn as u32 {
                builtins.push(*builtin);
            }
        }

        offset += word_count;
    }

    builtins
}

/// Check that an entry point's interface fits the stage it was compiled for
///
/// A vertex entry must produce a position; a fragment entry must not use
/// vertex-stage built-ins.
pub(crate) fn check_stage_signature(stage: ShaderStage, builtins: &[u32]) -> std::result::Result<(), String> {
    let has = |builtin: BuiltIn| builtins.contains(&(builtin as u32));

    match stage {
        ShaderStage::Vertex => {
            if !has(BuiltIn::Position) {
                return Err("vertex entry point does not output a position (SV_POSITION)".to_string());
            }
        }
        ShaderStage::Fragment => {
            for builtin in [BuiltIn::Position, BuiltIn::VertexIndex, BuiltIn::InstanceIndex] {
                if has(builtin) {
                    return Err(format!("fragment entry point uses vertex-stage built-in {:?}", builtin));
                }
            }
        }
        ShaderStage::Compute => {}
    }

    Ok(())
}

fn execution_model(stage: ShaderStage) -> ExecutionModel {
    match stage {
        ShaderStage::Vertex => ExecutionModel::Vertex,
        ShaderStage::Fragment => ExecutionModel::Fragment,
        ShaderStage::Compute => ExecutionModel::GLCompute,
    }
}

/// Compile shader source into SPIR-V targeting Vulkan 1.2
///
/// # Errors
///
/// Returns `Error::ShaderCompile` if the compiler cannot be created, the
/// source does not compile for the requested stage and entry point, the
/// resulting binary declares no entry point for that stage, or the entry
/// point's signature does not fit the stage.
pub fn compile_shader(info: &ShaderCompileInfo) -> Result<CompiledShader> {
    let fail = |message: String| {
        mana_error!("mana::shader", "Failed to compile {:?} shader '{}': {}",
            info.stage, info.entry_point, message);
        Error::ShaderCompile {
            stage: info.stage,
            entry_point: info.entry_point.to_string(),
            message,
        }
    };

    if info.entry_point.is_empty() {
        return Err(fail("empty entry point name".to_string()));
    }

    let compiler = shaderc::Compiler::new()
        .ok_or_else(|| fail("failed to create shader compiler".to_string()))?;
    let mut options = shaderc::CompileOptions::new()
        .ok_or_else(|| fail("failed to create compile options".to_string()))?;

    options.set_source_language(match info.language {
        SourceLanguage::Hlsl => shaderc::SourceLanguage::HLSL,
        SourceLanguage::Glsl => shaderc::SourceLanguage::GLSL,
    });
    options.set_target_env(shaderc::TargetEnv::Vulkan, shaderc::EnvVersion::Vulkan1_2 as u32);
    if info.debug {
        options.set_generate_debug_info();
    }

    let kind = match info.stage {
        ShaderStage::Vertex => shaderc::ShaderKind::Vertex,
        ShaderStage::Fragment => shaderc::ShaderKind::Fragment,
        ShaderStage::Compute => shaderc::ShaderKind::Compute,
    };

    let artifact = compiler
        .compile_into_spirv(info.source, kind, info.file_name, info.entry_point, Some(&options))
        .map_err(|e| fail(e.to_string()))?;

    if artifact.get_num_warnings() > 0 {
        mana_warn!("mana::shader", "{:?} shader '{}' compiled with warnings: {}",
            info.stage, info.entry_point, artifact.get_warning_messages());
    }

    let spirv = artifact.as_binary().to_vec();

    let entry_points = spirq::ReflectConfig::new()
        .spv(spirv.as_slice())
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| fail(format!("SPIR-V reflection failed: {:?}", e)))?;

    let spirv_entry_points: Vec<String> = entry_points
        .iter()
        .map(|entry_point| entry_point.name.clone())
        .collect();

    if spirv_entry_points.is_empty() {
        return Err(fail("SPIR-V binary declares no entry point".to_string()));
    }

    let model = execution_model(info.stage);
    if !entry_points.iter().any(|entry_point| entry_point.exec_model == model) {
        return Err(fail(format!("SPIR-V binary declares no {:?} entry point", model)));
    }

    check_stage_signature(info.stage, &decorated_builtins(&spirv)).map_err(fail)?;

    let shader = CompiledShader {
        stage: info.stage,
        entry_point: info.entry_point.to_string(),
        spirv_entry_points,
        spirv,
    };

    mana_debug!("mana::shader", "Compiled {:?} shader '{}' ({} bytes, SPIR-V entry '{}')",
        shader.stage, shader.entry_point, shader.byte_len(), shader.spirv_entry_point());

    Ok(shader)
}

#[cfg(test)]
#[path = "shader_compiler_tests.rs"]
mod tests;
