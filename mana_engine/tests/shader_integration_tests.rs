//! Integration tests for the shader front-end and pipeline validation
//!
//! Uses the real compiler and the headless backend. No GPU required.
//!
//! Run with: cargo test --test shader_integration_tests

use mana_engine::mana::render::{
    Context, ContextConfig, GraphicsPipelineDesc, HeadlessBackend, PipelineLayoutDesc,
    PrimitiveTopology, ShaderEntry, TextureFormat,
};
use mana_engine::mana::shader::{compile_shader, ShaderCompileInfo, ShaderStage};
use mana_engine::mana::surface::HeadlessSurface;
use mana_engine::mana::Error;

const QUAD_GLSL_VERT: &str = r#"
#version 450
layout(location = 0) out vec2 uv;
void main() {
    uv = vec2((gl_VertexIndex << 1) & 2, gl_VertexIndex & 2);
    gl_Position = vec4(uv * 2.0 - 1.0, 0.0, 1.0);
}
"#;

const QUAD_GLSL_FRAG: &str = r#"
#version 450
layout(location = 0) in vec2 uv;
layout(location = 0) out vec4 color;
void main() {
    color = vec4(uv, 0.0, 1.0);
}
"#;

const SOLID_HLSL: &str = r#"
float4 VSMain(uint id : SV_VERTEXID) : SV_POSITION
{
    return float4(float(id & 1), float(id >> 1), 0.0, 1.0);
}
float4 PSMain() : SV_TARGET0
{
    return float4(1.0, 1.0, 1.0, 1.0);
}
"#;

#[test]
fn test_integration_glsl_pipeline() {
    let surface = HeadlessSurface::new(640, 480);
    let mut ctx = Context::<HeadlessBackend>::init(&surface, &ContextConfig::default()).unwrap();
    let layout = ctx.create_pipeline_layout(&PipelineLayoutDesc::default()).unwrap();

    let vertex = compile_shader(&ShaderCompileInfo::glsl(QUAD_GLSL_VERT, ShaderStage::Vertex, "main")).unwrap();
    let fragment = compile_shader(&ShaderCompileInfo::glsl(QUAD_GLSL_FRAG, ShaderStage::Fragment, "main")).unwrap();

    let pipeline = ctx.create_graphics_pipeline(GraphicsPipelineDesc {
        vertex: ShaderEntry::new(vertex, "main"),
        fragment: ShaderEntry::new(fragment, "main"),
        topology: PrimitiveTopology::TriangleStrip,
        color_formats: vec![TextureFormat::B8G8R8A8_SRGB],
        layout,
        label: Some("quad".to_string()),
    }).unwrap();

    assert_eq!(pipeline.topology(), PrimitiveTopology::TriangleStrip);
    assert_eq!(ctx.pipeline_count(), 1);
}

#[test]
fn test_integration_hlsl_entry_names_survive_compilation() {
    let vertex = compile_shader(&ShaderCompileInfo::hlsl(SOLID_HLSL, ShaderStage::Vertex, "VSMain")).unwrap();
    let fragment = compile_shader(&ShaderCompileInfo::hlsl(SOLID_HLSL, ShaderStage::Fragment, "PSMain")).unwrap();

    assert!(vertex.has_entry_point("VSMain"));
    assert!(fragment.has_entry_point("PSMain"));
    assert!(!vertex.spirv_entry_point().is_empty());
}

#[test]
fn test_integration_stage_mismatch_rejected_by_pipeline() {
    let surface = HeadlessSurface::new(640, 480);
    let mut ctx = Context::<HeadlessBackend>::init(&surface, &ContextConfig::default()).unwrap();
    let layout = ctx.create_pipeline_layout(&PipelineLayoutDesc::default()).unwrap();

    let vertex = compile_shader(&ShaderCompileInfo::hlsl(SOLID_HLSL, ShaderStage::Vertex, "VSMain")).unwrap();

    let result = ctx.create_graphics_pipeline(GraphicsPipelineDesc {
        vertex: ShaderEntry::new(vertex.clone(), "VSMain"),
        fragment: ShaderEntry::new(vertex, "VSMain"),
        topology: PrimitiveTopology::TriangleList,
        color_formats: vec![TextureFormat::B8G8R8A8_SRGB],
        layout,
        label: None,
    });

    assert!(matches!(result, Err(Error::PipelineBuild(_))));
}

#[test]
fn test_integration_compile_errors_carry_context() {
    let result = compile_shader(&ShaderCompileInfo::hlsl(SOLID_HLSL, ShaderStage::Fragment, "Missing"));

    let error = result.unwrap_err();
    let message = error.to_string();
    assert!(matches!(error, Error::ShaderCompile { stage: ShaderStage::Fragment, .. }));
    assert!(message.contains("Missing"), "message: {}", message);
}
