/// Backend trait - GPU API the context drives
///
/// A backend owns the device, the presentation chain and per-frame
/// synchronization. Pipeline and layout objects are returned to the context,
/// which stores them in its registry; dropping them must release the GPU
/// object (RAII).

use crate::error::Result;
use crate::renderer::{
    CommandList, ContextConfig, Extent2D, GraphicsPipelineDesc, PipelineLayoutDesc,
    PipelineRegistry, TextureFormat,
};
use crate::surface::SurfaceProvider;

/// Presentation image acquired for the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiredImage {
    /// Index in the presentation chain
    pub image_index: u32,
    /// Size of the image
    pub extent: Extent2D,
    /// Format of the image
    pub format: TextureFormat,
}

/// GPU backend
pub trait Backend {
    /// Backend pipeline layout object
    type PipelineLayout;
    /// Backend graphics pipeline object
    type Pipeline;

    /// Create the device and a presentation chain sized to the surface
    ///
    /// # Errors
    ///
    /// Returns `Error::ContextInit` if any part of the setup fails.
    fn init(surface: &dyn SurfaceProvider, config: &ContextConfig) -> Result<Self>
    where
        Self: Sized;

    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Format of the presentation images
    fn surface_format(&self) -> TextureFormat;

    fn create_pipeline_layout(&mut self, desc: &PipelineLayoutDesc) -> Result<Self::PipelineLayout>;

    /// Create a graphics pipeline (descriptor already validated)
    fn create_graphics_pipeline(
        &mut self,
        desc: &GraphicsPipelineDesc,
        layout: &Self::PipelineLayout,
    ) -> Result<Self::Pipeline>;

    /// Acquire the next presentation image
    ///
    /// Recreates the presentation chain first when `extent` differs from
    /// its current size or it became out of date.
    fn acquire_next_image(&mut self, extent: Extent2D) -> Result<AcquiredImage>;

    /// Record and queue one command list for the acquired image
    fn submit(
        &mut self,
        image: &AcquiredImage,
        commands: &CommandList,
        pipelines: &PipelineRegistry<Self::Pipeline>,
    ) -> Result<()>;

    /// Close the frame: hand all queued work to the GPU
    fn end_frame(&mut self, image: &AcquiredImage) -> Result<()>;

    /// Present the acquired image
    fn present(&mut self, image: &AcquiredImage) -> Result<()>;

    /// Block until the GPU is idle
    fn wait_idle(&self) -> Result<()>;
}
