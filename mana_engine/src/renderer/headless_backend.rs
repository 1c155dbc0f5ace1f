/// HeadlessBackend - Backend without a GPU
///
/// Records every submission and simulates input assembly for each draw so
/// frame sequences can be checked without a device. Acquisitions,
/// presentation-chain recreations and presents are counted.

use std::sync::{Arc, Mutex};
use crate::error::{Error, Result};
use crate::renderer::{
    AcquiredImage, Backend, Command, CommandList, ContextConfig, Extent2D, GraphicsPipelineDesc,
    PipelineLayoutDesc, PipelineRegistry, PrimitiveTopology, Rect2D, TextureFormat, Viewport,
};
use crate::surface::SurfaceProvider;
use crate::{mana_debug, mana_info};

/// Number of images in the simulated presentation chain
const HEADLESS_IMAGE_COUNT: u32 = 3;

/// Vertex IDs simulated per draw; larger draws keep only the leading IDs
pub const HEADLESS_MAX_SIMULATED_VERTICES: u32 = 1 << 16;

/// Shared log of destroyed objects, in destruction order
pub type TeardownLog = Arc<Mutex<Vec<String>>>;

fn log_teardown(log: &TeardownLog, entry: String) {
    if let Ok(mut entries) = log.lock() {
        entries.push(entry);
    }
}

/// Pipeline layout object of the headless backend
#[derive(Debug)]
pub struct HeadlessPipelineLayout {
    pub desc: PipelineLayoutDesc,
    teardown: TeardownLog,
}

impl Drop for HeadlessPipelineLayout {
    fn drop(&mut self) {
        log_teardown(&self.teardown, "pipeline layout".to_string());
    }
}

/// Pipeline object of the headless backend
#[derive(Debug)]
pub struct HeadlessPipeline {
    pub topology: PrimitiveTopology,
    pub color_formats: Vec<TextureFormat>,
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub label: Option<String>,
    teardown: TeardownLog,
}

impl Drop for HeadlessPipeline {
    fn drop(&mut self) {
        log_teardown(&self.teardown, format!("pipeline {}", self.label.as_deref().unwrap_or("<unnamed>")));
    }
}

/// One simulated draw
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    /// Label of the bound pipeline
    pub pipeline_label: Option<String>,
    pub topology: PrimitiveTopology,
    pub first_vertex: u32,
    pub vertex_count: u32,
    /// Vertex IDs fed to the vertex stage, in order
    /// (at most `HEADLESS_MAX_SIMULATED_VERTICES`)
    pub vertex_ids: Vec<u32>,
    /// Vertex IDs of each assembled primitive
    pub primitives: Vec<Vec<u32>>,
    /// Effective viewport
    pub viewport: Viewport,
    /// Effective scissor
    pub scissor: Rect2D,
}

/// One recorded submission
#[derive(Debug, Clone)]
pub struct SubmissionRecord {
    pub frame_serial: u64,
    pub image_index: u32,
    pub commands: CommandList,
    pub draws: Vec<DrawRecord>,
}

/// Group vertex IDs into primitives
pub fn assemble_primitives(topology: PrimitiveTopology, vertex_ids: &[u32]) -> Vec<Vec<u32>> {
    match topology {
        PrimitiveTopology::PointList => vertex_ids.iter().map(|id| vec![*id]).collect(),
        PrimitiveTopology::LineList => vertex_ids.chunks_exact(2).map(<[u32]>::to_vec).collect(),
        PrimitiveTopology::LineStrip => vertex_ids.windows(2).map(<[u32]>::to_vec).collect(),
        PrimitiveTopology::TriangleList => vertex_ids.chunks_exact(3).map(<[u32]>::to_vec).collect(),
        PrimitiveTopology::TriangleStrip => vertex_ids.windows(3).map(<[u32]>::to_vec).collect(),
    }
}

/// Vertex IDs `first..=first + count - 1`, truncated to the simulation cap
pub fn simulated_vertex_ids(first_vertex: u32, vertex_count: u32) -> Vec<u32> {
    if vertex_count == 0 {
        return Vec::new();
    }
    let simulated = vertex_count.min(HEADLESS_MAX_SIMULATED_VERTICES);
    let last = first_vertex.saturating_add(simulated - 1);
    (first_vertex..=last).collect()
}

/// Backend recording everything in memory
pub struct HeadlessBackend {
    extent: Extent2D,
    format: TextureFormat,
    next_image: u32,
    pending_image: Option<u32>,
    acquisitions: u64,
    recreations: u64,
    ended_frames: u64,
    presents: u64,
    submissions: Vec<SubmissionRecord>,
    teardown: TeardownLog,
}

impl HeadlessBackend {
    /// Current presentation chain size
    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn acquisition_count(&self) -> u64 {
        self.acquisitions
    }

    /// Number of presentation-chain recreations after a size change
    pub fn recreation_count(&self) -> u64 {
        self.recreations
    }

    pub fn ended_frame_count(&self) -> u64 {
        self.ended_frames
    }

    pub fn present_count(&self) -> u64 {
        self.presents
    }

    /// All submissions so far, in order
    pub fn submissions(&self) -> &[SubmissionRecord] {
        &self.submissions
    }

    /// All draws so far, in order
    pub fn draws(&self) -> impl Iterator<Item = &DrawRecord> + '_ {
        self.submissions.iter().flat_map(|submission| submission.draws.iter())
    }

    /// Log of destroyed objects (shared, survives the backend)
    pub fn teardown_log(&self) -> TeardownLog {
        Arc::clone(&self.teardown)
    }

    fn replay(
        &self,
        commands: &CommandList,
        pipelines: &PipelineRegistry<HeadlessPipeline>,
    ) -> Result<Vec<DrawRecord>> {
        let mut draws = Vec::new();
        let mut pipeline: Option<&HeadlessPipeline> = None;
        let mut render_area: Option<Rect2D> = None;
        let mut viewport = Viewport::new(0.0, 0.0, 0.0, 0.0);
        let mut scissor = Rect2D::new(0, 0, 0, 0);

        for command in commands.commands() {
            match command {
                Command::BeginRenderPass(info) => {
                    render_area = Some(info.render_area);
                    viewport = Viewport::from_rect(info.render_area);
                    scissor = info.render_area;
                }
                Command::EndRenderPass => render_area = None,
                Command::BindPipeline(handle) => pipeline = Some(pipelines.get(handle)?),
                Command::SetViewport(v) => viewport = *v,
                Command::SetScissor(s) => scissor = *s,
                Command::Draw { vertex_count, first_vertex } => {
                    let bound = pipeline.ok_or_else(|| {
                        Error::BackendError("Draw replayed without a bound pipeline".to_string())
                    })?;
                    if render_area.is_none() {
                        return Err(Error::BackendError("Draw replayed outside a render pass".to_string()));
                    }
                    let vertex_ids = simulated_vertex_ids(*first_vertex, *vertex_count);
                    draws.push(DrawRecord {
                        pipeline_label: bound.label.clone(),
                        topology: bound.topology,
                        first_vertex: *first_vertex,
                        vertex_count: *vertex_count,
                        primitives: assemble_primitives(bound.topology, &vertex_ids),
                        vertex_ids,
                        viewport,
                        scissor,
                    });
                }
            }
        }

        Ok(draws)
    }
}

impl Backend for HeadlessBackend {
    type PipelineLayout = HeadlessPipelineLayout;
    type Pipeline = HeadlessPipeline;

    fn init(surface: &dyn SurfaceProvider, config: &ContextConfig) -> Result<Self> {
        if !surface.is_alive() {
            return Err(Error::ContextInit("Surface is closed".to_string()));
        }

        let extent = Extent2D::new(surface.surface_width(), surface.surface_height());
        if extent.is_empty() {
            return Err(Error::ContextInit(format!(
                "Surface has zero size ({}x{})", extent.width, extent.height)));
        }

        mana_info!("mana::HeadlessBackend", "Headless backend initialized for '{}' ({}x{})",
            config.app_name, extent.width, extent.height);

        Ok(Self {
            extent,
            format: TextureFormat::B8G8R8A8_SRGB,
            next_image: 0,
            pending_image: None,
            acquisitions: 0,
            recreations: 0,
            ended_frames: 0,
            presents: 0,
            submissions: Vec::new(),
            teardown: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn name(&self) -> &str {
        "Headless"
    }

    fn surface_format(&self) -> TextureFormat {
        self.format
    }

    fn create_pipeline_layout(&mut self, desc: &PipelineLayoutDesc) -> Result<HeadlessPipelineLayout> {
        Ok(HeadlessPipelineLayout {
            desc: desc.clone(),
            teardown: Arc::clone(&self.teardown),
        })
    }

    fn create_graphics_pipeline(
        &mut self,
        desc: &GraphicsPipelineDesc,
        _layout: &HeadlessPipelineLayout,
    ) -> Result<HeadlessPipeline> {
        Ok(HeadlessPipeline {
            topology: desc.topology,
            color_formats: desc.color_formats.clone(),
            vertex_entry: desc.vertex.shader.spirv_entry_point().to_string(),
            fragment_entry: desc.fragment.shader.spirv_entry_point().to_string(),
            label: desc.label.clone(),
            teardown: Arc::clone(&self.teardown),
        })
    }

    fn acquire_next_image(&mut self, extent: Extent2D) -> Result<AcquiredImage> {
        if let Some(index) = self.pending_image {
            return Err(Error::BackendError(format!("Image {} acquired but not presented", index)));
        }

        if extent != self.extent {
            mana_debug!("mana::HeadlessBackend", "Presentation chain recreated: {}x{} -> {}x{}",
                self.extent.width, self.extent.height, extent.width, extent.height);
            self.extent = extent;
            self.recreations += 1;
        }

        let image_index = self.next_image;
        self.next_image = (self.next_image + 1) % HEADLESS_IMAGE_COUNT;
        self.pending_image = Some(image_index);
        self.acquisitions += 1;

        Ok(AcquiredImage {
            image_index,
            extent: self.extent,
            format: self.format,
        })
    }

    fn submit(
        &mut self,
        image: &AcquiredImage,
        commands: &CommandList,
        pipelines: &PipelineRegistry<HeadlessPipeline>,
    ) -> Result<()> {
        for command in commands.commands() {
            if let Command::BeginRenderPass(info) = command {
                if info.target.image_index != image.image_index {
                    return Err(Error::InvalidResource(format!(
                        "Render pass targets image {} but image {} is acquired",
                        info.target.image_index, image.image_index)));
                }
            }
        }

        let draws = self.replay(commands, pipelines)?;
        self.submissions.push(SubmissionRecord {
            frame_serial: commands.frame_serial(),
            image_index: image.image_index,
            commands: commands.clone(),
            draws,
        });
        Ok(())
    }

    fn end_frame(&mut self, _image: &AcquiredImage) -> Result<()> {
        self.ended_frames += 1;
        Ok(())
    }

    fn present(&mut self, image: &AcquiredImage) -> Result<()> {
        if self.pending_image != Some(image.image_index) {
            return Err(Error::BackendError(format!("Image {} was not acquired", image.image_index)));
        }
        self.pending_image = None;
        self.presents += 1;
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }
}

impl Drop for HeadlessBackend {
    fn drop(&mut self) {
        log_teardown(&self.teardown, "backend".to_string());
    }
}

#[cfg(test)]
#[path = "headless_backend_tests.rs"]
mod tests;
