//! Unit tests for render pass types

use crate::renderer::*;

#[test]
fn test_extent_is_empty() {
    assert!(Extent2D::new(0, 720).is_empty());
    assert!(Extent2D::new(1280, 0).is_empty());
    assert!(Extent2D::default().is_empty());
    assert!(!Extent2D::new(1280, 720).is_empty());
}

#[test]
fn test_rect_from_extent() {
    let rect = Rect2D::from_extent(Extent2D::new(1280, 720));
    assert_eq!(rect, Rect2D::new(0, 0, 1280, 720));
    assert_eq!(rect.extent(), Extent2D::new(1280, 720));
}

#[test]
fn test_viewport_defaults_to_unit_depth_range() {
    let viewport = Viewport::new(0.0, 0.0, 1280.0, 720.0);
    assert_eq!(viewport.min_depth, 0.0);
    assert_eq!(viewport.max_depth, 1.0);
    assert_eq!(Viewport::from_rect(Rect2D::new(0, 0, 1280, 720)), viewport);
}

#[test]
fn test_format_properties() {
    assert!(TextureFormat::B8G8R8A8_SRGB.is_srgb());
    assert!(TextureFormat::R8G8B8A8_SRGB.is_srgb());
    assert!(!TextureFormat::B8G8R8A8_UNORM.is_srgb());
    assert_eq!(TextureFormat::B8G8R8A8_SRGB.bytes_per_pixel(), 4);
    assert_eq!(TextureFormat::R16G16B16A16_SFLOAT.bytes_per_pixel(), 8);
}

#[test]
fn test_render_pass_color_formats_in_order() {
    let attachment = |format| ColorAttachment {
        format,
        load_op: LoadOp::Clear,
        store_op: StoreOp::Store,
        clear_color: [0.0, 0.0, 0.0, 1.0],
    };
    let info = RenderPassInfo {
        color_attachments: vec![
            attachment(TextureFormat::B8G8R8A8_SRGB),
            attachment(TextureFormat::R16G16B16A16_SFLOAT),
        ],
        render_area: Rect2D::new(0, 0, 64, 64),
        target: TargetId { frame_serial: 1, image_index: 0 },
    };

    assert_eq!(
        info.color_formats(),
        vec![TextureFormat::B8G8R8A8_SRGB, TextureFormat::R16G16B16A16_SFLOAT],
    );
}
