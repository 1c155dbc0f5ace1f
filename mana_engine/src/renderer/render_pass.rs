/// Render pass description and basic geometry types

/// Color target format
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    B8G8R8A8_SRGB,
    B8G8R8A8_UNORM,
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    R16G16B16A16_SFLOAT,
}

impl TextureFormat {
    /// True for formats with sRGB encoding
    pub fn is_srgb(&self) -> bool {
        matches!(self, TextureFormat::B8G8R8A8_SRGB | TextureFormat::R8G8B8A8_SRGB)
    }

    /// Size in bytes of one texel
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R16G16B16A16_SFLOAT => 8,
            _ => 4,
        }
    }
}

/// 2D size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True if either dimension is zero (e.g. minimized window)
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle at the origin covering `extent`
    pub fn from_extent(extent: Extent2D) -> Self {
        Self { x: 0, y: 0, width: extent.width, height: extent.height }
    }

    pub fn extent(&self) -> Extent2D {
        Extent2D::new(self.width, self.height)
    }
}

/// Viewport (depth range 0..1 unless set otherwise)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height, min_depth: 0.0, max_depth: 1.0 }
    }

    /// Viewport covering `rect`
    pub fn from_rect(rect: Rect2D) -> Self {
        Self::new(rect.x as f32, rect.y as f32, rect.width as f32, rect.height as f32)
    }
}

/// Load operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadOp {
    /// Load existing content
    Load,
    /// Clear the content
    Clear,
    /// Don't care about existing content
    DontCare,
}

/// Store operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// Store the rendered content
    Store,
    /// Don't care about storing the content
    DontCare,
}

/// One color attachment of a render pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAttachment {
    /// Pixel format
    pub format: TextureFormat,
    /// What happens to existing content at pass start
    pub load_op: LoadOp,
    /// What happens to rendered content at pass end
    pub store_op: StoreOp,
    /// Clear color (RGBA), used with `LoadOp::Clear`
    pub clear_color: [f32; 4],
}

/// Identifies the presentation image acquired for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId {
    /// Serial of the frame the image was acquired for
    pub frame_serial: u64,
    /// Index of the image in the presentation chain
    pub image_index: u32,
}

/// Render pass targeting the current presentation image
///
/// Obtained from `Context::get_surface_render_pass()` once per frame. Only
/// valid for the frame it was produced in.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassInfo {
    /// Color attachments (the surface image is attachment 0)
    pub color_attachments: Vec<ColorAttachment>,
    /// Region rendered to
    pub render_area: Rect2D,
    /// Target image
    pub target: TargetId,
}

impl RenderPassInfo {
    /// Formats of the color attachments, in order
    pub fn color_formats(&self) -> Vec<TextureFormat> {
        self.color_attachments.iter().map(|attachment| attachment.format).collect()
    }
}

#[cfg(test)]
#[path = "render_pass_tests.rs"]
mod tests;
