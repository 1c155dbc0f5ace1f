//! Integration tests for the triangle frame loop
//!
//! Runs the complete application flow against the headless backend:
//! compile both shaders, build the pipeline, then drive frames until the
//! surface is closed. No GPU required.
//!
//! Run with: cargo test --test frame_lifecycle_integration_tests

use mana_engine::mana::render::{
    Context, ContextConfig, FramePhase, FrameStatus, GraphicsPipelineDesc, HeadlessBackend,
    PipelineHandle, PipelineLayoutDesc, PrimitiveTopology, ShaderEntry, Viewport,
};
use mana_engine::mana::shader::{compile_shader, ShaderCompileInfo, ShaderStage};
use mana_engine::mana::surface::{HeadlessSurface, SurfaceProvider};
use mana_engine::mana::Result;

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

type HeadlessContext = Context<HeadlessBackend>;

// ============================================================================
// HELPERS
// ============================================================================

fn create_triangle_pipeline(ctx: &mut HeadlessContext) -> Result<PipelineHandle> {
    let layout = ctx.create_pipeline_layout(&PipelineLayoutDesc::default())?;

    let vertex = compile_shader(
        &ShaderCompileInfo::hlsl(TRIANGLE_HLSL, ShaderStage::Vertex, "VSMain").with_debug(true),
    )?;
    let fragment = compile_shader(
        &ShaderCompileInfo::hlsl(TRIANGLE_HLSL, ShaderStage::Fragment, "PSMain").with_debug(true),
    )?;

    ctx.create_graphics_pipeline(GraphicsPipelineDesc {
        vertex: ShaderEntry::new(vertex, "VSMain"),
        fragment: ShaderEntry::new(fragment, "PSMain"),
        topology: PrimitiveTopology::TriangleList,
        color_formats: vec![ctx.surface_format()],
        layout,
        label: Some("triangle".to_string()),
    })
}

/// One iteration of the application loop
fn run_frame(
    ctx: &mut HeadlessContext,
    surface: &mut HeadlessSurface,
    pipeline: &PipelineHandle,
) -> Result<FrameStatus> {
    surface.poll_events();

    if ctx.begin_frame(surface)? == FrameStatus::Skipped {
        return Ok(FrameStatus::Skipped);
    }

    let mut cmd = ctx.request_cmd()?;
    let rp = ctx.get_surface_render_pass(surface)?;
    let (width, height) = (surface.surface_width(), surface.surface_height());

    cmd.begin_render_pass(&rp)?;
    cmd.bind_pipeline(pipeline)?;
    cmd.set_viewport(Viewport::new(0.0, 0.0, width as f32, height as f32))?;
    cmd.set_scissor(rp.render_area)?;
    cmd.draw(3, 0)?;
    cmd.end_render_pass()?;

    ctx.submit(cmd)?;
    ctx.end_frame()?;
    ctx.present()?;
    Ok(FrameStatus::Ready)
}

// ============================================================================
// TESTS
// ============================================================================

#[test]
fn test_integration_single_triangle_frame() {
    let mut surface = HeadlessSurface::new(1280, 720);
    let mut ctx = HeadlessContext::init(&surface, &ContextConfig::default()).unwrap();
    let pipeline = create_triangle_pipeline(&mut ctx).unwrap();

    assert_eq!(run_frame(&mut ctx, &mut surface, &pipeline).unwrap(), FrameStatus::Ready);

    let backend = ctx.backend();
    assert_eq!(backend.submissions().len(), 1);

    let submission = &backend.submissions()[0];
    assert_eq!(submission.commands.render_pass_count(), 1);
    assert_eq!(submission.commands.draws().collect::<Vec<_>>(), vec![(3, 0)]);

    assert_eq!(submission.draws.len(), 1);
    let draw = &submission.draws[0];
    assert_eq!(draw.topology, PrimitiveTopology::TriangleList);
    assert_eq!(draw.vertex_ids, vec![0, 1, 2]);
    assert_eq!(draw.primitives, vec![vec![0, 1, 2]]);
    assert_eq!(draw.viewport, Viewport::new(0.0, 0.0, 1280.0, 720.0));
    assert_eq!(draw.pipeline_label.as_deref(), Some("triangle"));

    assert_eq!(backend.present_count(), 1);
    assert_eq!(ctx.phase(), FramePhase::Idle);
}

#[test]
fn test_integration_loop_until_close() {
    let mut surface = HeadlessSurface::new(1280, 720);
    let mut ctx = HeadlessContext::init(&surface, &ContextConfig::default()).unwrap();
    let pipeline = create_triangle_pipeline(&mut ctx).unwrap();

    let mut frames = 0;
    while surface.is_alive() {
        run_frame(&mut ctx, &mut surface, &pipeline).unwrap();
        frames += 1;
        if frames == 5 {
            surface.request_close();
        }
    }

    // The frame after the close request still runs (poll happens inside it)
    assert_eq!(frames, 6);
    assert!(!surface.is_alive());
    assert_eq!(ctx.frame_index(), 6);
    assert_eq!(ctx.backend().present_count(), 6);
    assert_eq!(ctx.backend().draws().count(), 6);
}

#[test]
fn test_integration_minimize_and_restore() {
    let mut surface = HeadlessSurface::new(1280, 720);
    let mut ctx = HeadlessContext::init(&surface, &ContextConfig::default()).unwrap();
    let pipeline = create_triangle_pipeline(&mut ctx).unwrap();

    run_frame(&mut ctx, &mut surface, &pipeline).unwrap();

    surface.resize(0, 0);
    assert_eq!(run_frame(&mut ctx, &mut surface, &pipeline).unwrap(), FrameStatus::Skipped);
    assert_eq!(ctx.backend().acquisition_count(), 1);

    surface.resize(1600, 900);
    assert_eq!(run_frame(&mut ctx, &mut surface, &pipeline).unwrap(), FrameStatus::Ready);
    assert_eq!(ctx.backend().recreation_count(), 1);

    let last = ctx.backend().draws().last().unwrap();
    assert_eq!(last.scissor.width, 1600);
    assert_eq!(last.scissor.height, 900);
}

#[test]
fn test_integration_teardown_after_loop() {
    let mut surface = HeadlessSurface::new(800, 600);
    let mut ctx = HeadlessContext::init(&surface, &ContextConfig::default()).unwrap();
    let pipeline = create_triangle_pipeline(&mut ctx).unwrap();
    run_frame(&mut ctx, &mut surface, &pipeline).unwrap();

    let log = ctx.backend().teardown_log();
    drop(ctx);

    let entries = log.lock().unwrap();
    assert_eq!(entries.last().map(String::as_str), Some("backend"));
    assert_eq!(entries.len(), 3);
}
