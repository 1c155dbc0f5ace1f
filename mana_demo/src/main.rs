//! Mana Application Template
//!
//! Opens a window, compiles the triangle shader for both stages, builds one
//! pipeline and draws a single colored triangle every frame until the
//! window is closed.

use std::process::ExitCode;

use mana_engine::mana::render::{
    ContextConfig, FrameStatus, GraphicsPipelineDesc, PipelineHandle, PipelineLayoutDesc,
    PrimitiveTopology, ShaderEntry, Viewport,
};
use mana_engine::mana::shader::{compile_shader, CompiledShader, ShaderCompileInfo, ShaderStage};
use mana_engine::mana::surface::{SurfaceProvider, WindowConfig, WinitSurface};
use mana_engine::mana::Result;
use mana_engine::{mana_error, mana_info};
use mana_engine_renderer_vulkan::{create_context, VulkanContext};

const TRIANGLE_HLSL: &str = r#"
struct VSOutput
{
    float4 FragPos : SV_POSITION;
    [[vk::location(0)]] float4 Color : COLOR0;
};
VSOutput VSMain(uint vtxId : SV_VERTEXID)
{
    const float3 positions[3] = {
        float3(0.5, 0.5, 0.0),
        float3(-0.5, 0.5, 0.0),
        float3(0.0, -0.5, 0.0),
    };
    const float4 colors[3] = {
        float4(1, 0, 0, 1),
        float4(0, 1, 0, 1),
        float4(0, 0, 1, 1),
    };
    VSOutput output;
    output.FragPos = float4(positions[vtxId], 1.0);
    output.Color = colors[vtxId];
    return output;
}
struct PSInput
{
    [[vk::location(0)]] float4 Color : COLOR;
};
struct PSOutput
{
    float4 FragColor : SV_TARGET0;
};
PSOutput PSMain(PSInput input)
{
    PSOutput output;
    output.FragColor = input.Color;
    return output;
}
"#;

const LOG_SOURCE: &str = "mana::demo";

fn compile_stage(stage: ShaderStage, entry_point: &str) -> Option<CompiledShader> {
    let info = ShaderCompileInfo::hlsl(TRIANGLE_HLSL, stage, entry_point).with_debug(true);
    match compile_shader(&info) {
        Ok(shader) => Some(shader),
        Err(_) => {
            let stage_name = match stage {
                ShaderStage::Vertex => "VERTEX",
                ShaderStage::Fragment => "FRAGMENT",
                ShaderStage::Compute => "COMPUTE",
            };
            mana_error!(LOG_SOURCE, "Failed to compile {} shader.", stage_name);
            None
        }
    }
}

/// Record and present one frame
fn draw_frame(ctx: &mut VulkanContext, window: &WinitSurface, pipeline: &PipelineHandle) -> Result<()> {
    if ctx.begin_frame(window)? == FrameStatus::Skipped {
        // Minimized: nothing to render into
        return Ok(());
    }

    let mut cmd = ctx.request_cmd()?;
    let rp = ctx.get_surface_render_pass(window)?;

    cmd.begin_render_pass(&rp)?;
    cmd.bind_pipeline(pipeline)?;
    cmd.set_viewport(Viewport::from_rect(rp.render_area))?;
    cmd.set_scissor(rp.render_area)?;
    cmd.draw(3, 0)?;
    cmd.end_render_pass()?;

    ctx.submit(cmd)?;
    ctx.end_frame()?;
    ctx.present()
}

fn main() -> ExitCode {
    mana_info!(LOG_SOURCE, "Mana Application Template");

    let mut window = match WinitSurface::init(&WindowConfig::default()) {
        Ok(window) => window,
        Err(_) => {
            mana_error!(LOG_SOURCE, "Failed to init window");
            return ExitCode::FAILURE;
        }
    };

    let mut ctx = match create_context(&window, &ContextConfig::default()) {
        Ok(ctx) => ctx,
        Err(_) => {
            mana_error!(LOG_SOURCE, "Failed to init context");
            return ExitCode::FAILURE;
        }
    };

    let pipeline_layout = match ctx.create_pipeline_layout(&PipelineLayoutDesc::default()) {
        Ok(layout) => layout,
        Err(_) => {
            mana_error!(LOG_SOURCE, "Failed to create pipeline layout.");
            return ExitCode::FAILURE;
        }
    };

    let Some(vertex) = compile_stage(ShaderStage::Vertex, "VSMain") else {
        return ExitCode::FAILURE;
    };
    let Some(fragment) = compile_stage(ShaderStage::Fragment, "PSMain") else {
        return ExitCode::FAILURE;
    };

    let triangle_pipeline = match ctx.create_graphics_pipeline(GraphicsPipelineDesc {
        vertex: ShaderEntry::new(vertex, "VSMain"),
        fragment: ShaderEntry::new(fragment, "PSMain"),
        topology: PrimitiveTopology::TriangleList,
        color_formats: vec![ctx.surface_format()],
        layout: pipeline_layout,
        label: Some("triangle".to_string()),
    }) {
        Ok(pipeline) => pipeline,
        Err(_) => {
            mana_error!(LOG_SOURCE, "Failed to create triangle pipeline.");
            return ExitCode::FAILURE;
        }
    };

    while window.is_alive() {
        window.poll_events();

        if let Err(e) = draw_frame(&mut ctx, &window, &triangle_pipeline) {
            mana_error!(LOG_SOURCE, "Frame {} failed: {}", ctx.frame_index(), e);
            return ExitCode::FAILURE;
        }
    }

    mana_info!(LOG_SOURCE, "Window closed after {} frame(s)", ctx.frame_index());
    ExitCode::SUCCESS
}
