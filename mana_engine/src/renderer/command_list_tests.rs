//! Unit tests for CommandRecorder validation and CommandList queries

use std::sync::atomic::Ordering;
use std::sync::Arc;
use crate::error::Error;
use crate::renderer::*;

const SERIAL: u64 = 7;

fn pass_info(format: TextureFormat, frame_serial: u64) -> RenderPassInfo {
    RenderPassInfo {
        color_attachments: vec![ColorAttachment {
            format,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }],
        render_area: Rect2D::new(0, 0, 1280, 720),
        target: TargetId { frame_serial, image_index: 0 },
    }
}

fn pipeline(owner: ContextId, format: TextureFormat) -> PipelineHandle {
    let mut layouts = slotmap::SlotMap::<PipelineLayoutKey, ()>::with_key();
    let mut pipelines = slotmap::SlotMap::<PipelineKey, ()>::with_key();
    PipelineHandle {
        key: pipelines.insert(()),
        owner,
        info: Arc::new(PipelineInfo {
            topology: PrimitiveTopology::TriangleList,
            color_formats: vec![format],
            layout: PipelineLayoutHandle {
                key: layouts.insert(()),
                owner,
                desc: Arc::new(PipelineLayoutDesc::default()),
            },
            label: None,
        }),
    }
}

fn recorder() -> (CommandRecorder, ContextId) {
    let owner = ContextId::next();
    (CommandRecorder::new(1, owner, SERIAL), owner)
}

fn assert_recording_error(result: crate::error::Result<()>) {
    assert!(matches!(result, Err(Error::CommandRecording(_))), "got {:?}", result);
}

#[test]
fn test_triangle_sequence_records_in_order() {
    let (mut cmd, owner) = recorder();
    let triangle = pipeline(owner, TextureFormat::B8G8R8A8_SRGB);

    cmd.begin_render_pass(&pass_info(TextureFormat::B8G8R8A8_SRGB, SERIAL)).unwrap();
    cmd.bind_pipeline(&triangle).unwrap();
    cmd.set_viewport(Viewport::new(0.0, 0.0, 1280.0, 720.0)).unwrap();
    cmd.set_scissor(Rect2D::new(0, 0, 1280, 720)).unwrap();
    cmd.draw(3, 0).unwrap();
    cmd.end_render_pass().unwrap();

    let list = cmd.finish().unwrap();
    assert_eq!(list.frame_serial(), SERIAL);
    assert_eq!(list.len(), 6);
    assert_eq!(list.render_pass_count(), 1);
    assert_eq!(list.draws().collect::<Vec<_>>(), vec![(3, 0)]);
    assert!(matches!(list.commands()[0], Command::BeginRenderPass(_)));
    assert!(matches!(list.commands()[5], Command::EndRenderPass));
}

#[test]
fn test_nested_render_pass_rejected() {
    let (mut cmd, _) = recorder();
    let info = pass_info(TextureFormat::B8G8R8A8_SRGB, SERIAL);
    cmd.begin_render_pass(&info).unwrap();
    assert_recording_error(cmd.begin_render_pass(&info));
    assert_eq!(cmd.commands().len(), 1);
}

#[test]
fn test_end_without_begin_rejected() {
    let (mut cmd, _) = recorder();
    assert_recording_error(cmd.end_render_pass());
}

#[test]
fn test_stale_render_pass_rejected() {
    let (mut cmd, _) = recorder();
    assert_recording_error(cmd.begin_render_pass(&pass_info(TextureFormat::B8G8R8A8_SRGB, SERIAL - 1)));
    assert!(!cmd.is_in_render_pass());
}

#[test]
fn test_draw_outside_render_pass_rejected() {
    let (mut cmd, owner) = recorder();
    cmd.bind_pipeline(&pipeline(owner, TextureFormat::B8G8R8A8_SRGB)).unwrap();
    assert_recording_error(cmd.draw(3, 0));
}

#[test]
fn test_draw_before_bind_rejected() {
    let (mut cmd, _) = recorder();
    cmd.begin_render_pass(&pass_info(TextureFormat::B8G8R8A8_SRGB, SERIAL)).unwrap();
    assert_recording_error(cmd.draw(3, 0));
}

#[test]
fn test_draw_with_mismatched_formats_rejected() {
    let (mut cmd, owner) = recorder();
    cmd.begin_render_pass(&pass_info(TextureFormat::B8G8R8A8_SRGB, SERIAL)).unwrap();
    cmd.bind_pipeline(&pipeline(owner, TextureFormat::R16G16B16A16_SFLOAT)).unwrap();
    assert_recording_error(cmd.draw(3, 0));
}

#[test]
fn test_binding_persists_across_render_passes() {
    let (mut cmd, owner) = recorder();
    let info = pass_info(TextureFormat::B8G8R8A8_SRGB, SERIAL);
    cmd.bind_pipeline(&pipeline(owner, TextureFormat::B8G8R8A8_SRGB)).unwrap();

    for _ in 0..2 {
        cmd.begin_render_pass(&info).unwrap();
        cmd.draw(3, 0).unwrap();
        cmd.end_render_pass().unwrap();
    }

    let list = cmd.finish().unwrap();
    assert_eq!(list.render_pass_count(), 2);
    assert_eq!(list.draws().count(), 2);
}

#[test]
fn test_foreign_pipeline_rejected() {
    let (mut cmd, _) = recorder();
    let foreign = pipeline(ContextId::next(), TextureFormat::B8G8R8A8_SRGB);
    assert_recording_error(cmd.bind_pipeline(&foreign));
}

#[test]
fn test_dynamic_state_requires_render_pass() {
    let (mut cmd, _) = recorder();
    assert_recording_error(cmd.set_viewport(Viewport::new(0.0, 0.0, 10.0, 10.0)));
    assert_recording_error(cmd.set_scissor(Rect2D::new(0, 0, 10, 10)));
}

#[test]
fn test_invalid_viewport_and_scissor_rejected() {
    let (mut cmd, _) = recorder();
    cmd.begin_render_pass(&pass_info(TextureFormat::B8G8R8A8_SRGB, SERIAL)).unwrap();

    assert_recording_error(cmd.set_viewport(Viewport::new(0.0, 0.0, 0.0, 720.0)));
    let mut deep = Viewport::new(0.0, 0.0, 1280.0, 720.0);
    deep.max_depth = 2.0;
    assert_recording_error(cmd.set_viewport(deep));
    assert_recording_error(cmd.set_scissor(Rect2D::new(-1, 0, 10, 10)));
    assert_recording_error(cmd.set_viewport(Viewport::new(0.0, 0.0, f32::NAN, 720.0)));
    assert_recording_error(cmd.set_viewport(Viewport::new(0.0, 0.0, 1280.0, f32::NAN)));
    assert_recording_error(cmd.set_viewport(Viewport::new(0.0, 0.0, f32::INFINITY, 720.0)));

    // Flipped viewport is allowed
    assert!(cmd.set_viewport(Viewport::new(0.0, 720.0, 1280.0, -720.0)).is_ok());
}

#[test]
fn test_vertex_range_overflow_rejected() {
    let (mut cmd, owner) = recorder();
    cmd.begin_render_pass(&pass_info(TextureFormat::B8G8R8A8_SRGB, SERIAL)).unwrap();
    cmd.bind_pipeline(&pipeline(owner, TextureFormat::B8G8R8A8_SRGB)).unwrap();
    assert_recording_error(cmd.draw(2, u32::MAX));
}

#[test]
fn test_vertex_range_reaching_max_id_accepted() {
    let (mut cmd, owner) = recorder();
    cmd.begin_render_pass(&pass_info(TextureFormat::B8G8R8A8_SRGB, SERIAL)).unwrap();
    cmd.bind_pipeline(&pipeline(owner, TextureFormat::B8G8R8A8_SRGB)).unwrap();
    assert!(cmd.draw(1, u32::MAX).is_ok());
    assert!(cmd.draw(3, u32::MAX - 2).is_ok());
    assert!(cmd.draw(0, u32::MAX).is_ok());
}

#[test]
fn test_finish_with_open_render_pass_rejected() {
    let (mut cmd, _) = recorder();
    cmd.begin_render_pass(&pass_info(TextureFormat::B8G8R8A8_SRGB, SERIAL)).unwrap();
    assert!(matches!(cmd.finish(), Err(Error::CommandRecording(_))));
}

#[test]
fn test_drop_clears_liveness_flag() {
    let (cmd, _) = recorder();
    let live = cmd.liveness();
    assert!(live.load(Ordering::Acquire));
    drop(cmd);
    assert!(!live.load(Ordering::Acquire));
}
