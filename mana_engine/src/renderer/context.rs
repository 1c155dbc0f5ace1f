/// Context - frame executor and owner of all pipeline objects
///
/// The context drives a `Backend` through a strictly ordered frame
/// lifecycle:
///
/// ```text
/// Idle -> begin_frame -> (request_cmd -> record -> submit)* -> end_frame -> present -> Idle
/// ```
///
/// Out-of-order calls return `Error::FrameOrder` and leave the state
/// untouched. Dropping the context waits for the GPU, destroys every pipeline
/// and layout, then drops the backend.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use crate::error::{Error, Result};
use crate::renderer::{
    AcquiredImage, Backend, ColorAttachment, CommandRecorder, ContextConfig, Extent2D,
    GraphicsPipelineDesc, LoadOp, PipelineHandle, PipelineInfo, PipelineLayoutDesc,
    PipelineLayoutHandle, PipelineLayoutKey, PipelineRegistry, Rect2D, RenderPassInfo, StoreOp,
    TargetId, TextureFormat,
};
use crate::surface::SurfaceProvider;
use crate::{mana_debug, mana_error, mana_info, mana_trace};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique id of a context within the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    pub(crate) fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Phase of the frame lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    /// No open frame
    Idle,
    /// Frame open, recorders may be requested and submitted
    Recording,
    /// Frame closed, waiting for present
    Ended,
}

/// Result of `Context::begin_frame()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A presentation image was acquired; the frame is open
    Ready,
    /// The surface has zero size; no frame was opened
    Skipped,
}

struct OutstandingRecorder {
    id: u64,
    live: Arc<AtomicBool>,
}

struct FrameState {
    phase: FramePhase,
    /// Serial of the current (or last) frame; 0 before the first frame
    serial: u64,
    image: Option<AcquiredImage>,
    outstanding: Option<OutstandingRecorder>,
    submissions: u32,
}

impl FrameState {
    fn has_outstanding_recorder(&self) -> bool {
        self.outstanding
            .as_ref()
            .map_or(false, |recorder| recorder.live.load(Ordering::Acquire))
    }
}

/// Frame executor bound to one surface
///
/// Not shared between threads; all calls come from the thread driving the
/// frame loop.
pub struct Context<B: Backend> {
    id: ContextId,
    config: ContextConfig,
    frame: FrameState,
    next_recorder_id: u64,
    presented_frames: u64,
    // Registry fields are declared before the backend so they drop first
    pipelines: PipelineRegistry<B::Pipeline>,
    layouts: SlotMap<PipelineLayoutKey, B::PipelineLayout>,
    layout_cache: FxHashMap<PipelineLayoutDesc, PipelineLayoutHandle>,
    backend: B,
}

impl<B: Backend> Context<B> {
    /// Create the backend and a presentation chain sized to `surface`
    ///
    /// # Errors
    ///
    /// Returns `Error::ContextInit` if the configuration is invalid or the
    /// backend cannot be initialized.
    pub fn init(surface: &dyn SurfaceProvider, config: &ContextConfig) -> Result<Self> {
        if config.frames_in_flight == 0 {
            return Err(Error::ContextInit("frames_in_flight must be at least 1".to_string()));
        }

        let backend = B::init(surface, config).map_err(|e| {
            mana_error!("mana::Context", "Backend initialization failed: {}", e);
            match e {
                Error::ContextInit(_) => e,
                other => Error::ContextInit(other.to_string()),
            }
        })?;

        let id = ContextId::next();
        mana_info!("mana::Context", "Context {} created for '{}' ({} backend, {:?}, {} frames in flight)",
            id.raw(), config.app_name, backend.name(), backend.surface_format(), config.frames_in_flight);

        Ok(Self {
            id,
            config: config.clone(),
            frame: FrameState {
                phase: FramePhase::Idle,
                serial: 0,
                image: None,
                outstanding: None,
                submissions: 0,
            },
            next_recorder_id: 1,
            presented_frames: 0,
            pipelines: PipelineRegistry::new(id),
            layouts: SlotMap::with_key(),
            layout_cache: FxHashMap::default(),
            backend,
        })
    }

    // ===== ACCESSORS =====

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> FramePhase {
        self.frame.phase
    }

    /// Number of frames presented so far
    pub fn frame_index(&self) -> u64 {
        self.presented_frames
    }

    /// Serial of the current (or last) frame
    pub fn frame_serial(&self) -> u64 {
        self.frame.serial
    }

    /// Image acquired for the open frame
    pub fn current_image(&self) -> Option<&AcquiredImage> {
        self.frame.image.as_ref()
    }

    /// Number of command lists submitted in the open frame
    pub fn submission_count(&self) -> u32 {
        self.frame.submissions
    }

    /// Format of the presentation images
    pub fn surface_format(&self) -> TextureFormat {
        self.backend.surface_format()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of live pipelines
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Number of live pipeline layouts
    pub fn pipeline_layout_count(&self) -> usize {
        self.layouts.len()
    }

    /// Block until the GPU has finished all submitted work
    pub fn wait_idle(&self) -> Result<()> {
        self.backend.wait_idle()
    }

    // ===== PIPELINES =====

    /// Create (or fetch the cached) pipeline layout for `desc`
    pub fn create_pipeline_layout(&mut self, desc: &PipelineLayoutDesc) -> Result<PipelineLayoutHandle> {
        if let Some(handle) = self.layout_cache.get(desc) {
            return Ok(handle.clone());
        }

        desc.validate()?;
        let layout = self.backend.create_pipeline_layout(desc)?;
        let handle = PipelineLayoutHandle {
            key: self.layouts.insert(layout),
            owner: self.id,
            desc: Arc::new(desc.clone()),
        };
        self.layout_cache.insert(desc.clone(), handle.clone());

        mana_debug!("mana::Context", "Pipeline layout created ({} bindings)", desc.bindings.len());
        Ok(handle)
    }

    /// Validate `desc` and create a graphics pipeline
    ///
    /// The compiled shaders in `desc` are consumed.
    ///
    /// # Errors
    ///
    /// Returns `Error::PipelineBuild` if the descriptor is invalid or the
    /// backend rejects it.
    pub fn create_graphics_pipeline(&mut self, desc: GraphicsPipelineDesc) -> Result<PipelineHandle> {
        desc.validate(self.id)?;

        let layout = self.layouts.get(desc.layout.key).ok_or_else(|| {
            Error::PipelineBuild("Pipeline layout has been destroyed".to_string())
        })?;

        let pipeline = self.backend.create_graphics_pipeline(&desc, layout)?;
        let key = self.pipelines.insert(pipeline);

        mana_info!("mana::Context", "Graphics pipeline '{}' created ({:?}, {:?})",
            desc.label.as_deref().unwrap_or("<unnamed>"), desc.topology, desc.color_formats);

        let GraphicsPipelineDesc { topology, color_formats, layout, label, .. } = desc;
        Ok(PipelineHandle {
            key,
            owner: self.id,
            info: Arc::new(PipelineInfo { topology, color_formats, layout, label }),
        })
    }

    /// Destroy a pipeline (only between frames; waits for the GPU first)
    pub fn destroy_pipeline(&mut self, pipeline: PipelineHandle) -> Result<()> {
        self.require_phase("destroy_pipeline", FramePhase::Idle)?;
        if !self.pipelines.contains(&pipeline) {
            return Err(Error::InvalidResource(
                "Pipeline does not belong to this context or was already destroyed".to_string()));
        }

        self.backend.wait_idle()?;
        self.pipelines.remove(pipeline.key);
        mana_debug!("mana::Context", "Graphics pipeline '{}' destroyed",
            pipeline.info.label.as_deref().unwrap_or("<unnamed>"));
        Ok(())
    }

    // ===== FRAME LIFECYCLE =====

    /// Open a frame and acquire the next presentation image
    ///
    /// Returns `FrameStatus::Skipped` (and stays `Idle`) when the surface
    /// has zero size.
    pub fn begin_frame(&mut self, surface: &dyn SurfaceProvider) -> Result<FrameStatus> {
        self.require_phase("begin_frame", FramePhase::Idle)?;

        let extent = Extent2D::new(surface.surface_width(), surface.surface_height());
        if extent.is_empty() {
            mana_trace!("mana::Context", "Surface is {}x{}, frame skipped", extent.width, extent.height);
            return Ok(FrameStatus::Skipped);
        }

        let image = self.backend.acquire_next_image(extent)?;

        self.frame.serial += 1;
        self.frame.image = Some(image);
        self.frame.outstanding = None;
        self.frame.submissions = 0;
        self.frame.phase = FramePhase::Recording;

        mana_trace!("mana::Context", "Frame {} begun (image {}, {}x{})",
            self.frame.serial, image.image_index, image.extent.width, image.extent.height);
        Ok(FrameStatus::Ready)
    }

    /// Get a fresh command recorder bound to the open frame
    pub fn request_cmd(&mut self) -> Result<CommandRecorder> {
        self.require_phase("request_cmd", FramePhase::Recording)?;
        if self.frame.has_outstanding_recorder() {
            return Err(Error::CommandRecording(
                "Another command recorder is still outstanding (submit or discard it first)".to_string()));
        }

        let recorder = CommandRecorder::new(self.next_recorder_id, self.id, self.frame.serial);
        self.next_recorder_id += 1;
        self.frame.outstanding = Some(OutstandingRecorder {
            id: recorder.id(),
            live: recorder.liveness(),
        });
        Ok(recorder)
    }

    /// Render pass targeting the image acquired for the open frame
    ///
    /// Must be queried each frame; a description from another frame is
    /// rejected by the recorder.
    pub fn get_surface_render_pass(&self, surface: &dyn SurfaceProvider) -> Result<RenderPassInfo> {
        self.require_phase("get_surface_render_pass", FramePhase::Recording)?;
        let image = self.acquired_image("get_surface_render_pass")?;

        let (width, height) = (surface.surface_width(), surface.surface_height());
        if (width, height) != (image.extent.width, image.extent.height) {
            mana_trace!("mana::Context", "Surface resized to {}x{} during frame {}, applied next frame",
                width, height, self.frame.serial);
        }

        Ok(RenderPassInfo {
            color_attachments: vec![ColorAttachment {
                format: image.format,
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                clear_color: self.config.clear_color,
            }],
            render_area: Rect2D::from_extent(image.extent),
            target: TargetId {
                frame_serial: self.frame.serial,
                image_index: image.image_index,
            },
        })
    }

    /// Finalize `recorder` and hand its commands to the backend
    ///
    /// The recorder is consumed even when submission fails.
    pub fn submit(&mut self, recorder: CommandRecorder) -> Result<()> {
        self.require_phase("submit", FramePhase::Recording)?;
        self.check_recorder(&recorder)?;

        self.frame.outstanding = None;
        let commands = recorder.finish()?;
        let image = self.acquired_image("submit")?;

        self.backend.submit(&image, &commands, &self.pipelines)?;
        self.frame.submissions += 1;

        mana_trace!("mana::Context", "Submission {} of frame {}: {} commands, {} render passes",
            self.frame.submissions, self.frame.serial, commands.len(), commands.render_pass_count());
        Ok(())
    }

    /// Abandon an outstanding recorder without submitting it
    pub fn discard(&mut self, recorder: CommandRecorder) -> Result<()> {
        if recorder.owner() != self.id {
            return Err(Error::InvalidResource(
                "Command recorder belongs to another context".to_string()));
        }
        if self.frame.outstanding.as_ref().map_or(false, |outstanding| outstanding.id == recorder.id()) {
            self.frame.outstanding = None;
        }
        mana_debug!("mana::Context", "Recorder for frame {} discarded ({} commands)",
            recorder.frame_serial(), recorder.commands().len());
        recorder.abandon();
        Ok(())
    }

    /// Close the frame; no further submissions are accepted
    pub fn end_frame(&mut self) -> Result<()> {
        self.require_phase("end_frame", FramePhase::Recording)?;
        if self.frame.has_outstanding_recorder() {
            return Err(Error::CommandRecording(
                "end_frame called while a command recorder is outstanding".to_string()));
        }

        let image = self.acquired_image("end_frame")?;
        self.backend.end_frame(&image)?;

        self.frame.outstanding = None;
        self.frame.phase = FramePhase::Ended;
        Ok(())
    }

    /// Present the frame and return to `Idle`
    pub fn present(&mut self) -> Result<()> {
        self.require_phase("present", FramePhase::Ended)?;
        let image = self.acquired_image("present")?;

        self.frame.image = None;
        self.frame.phase = FramePhase::Idle;
        self.presented_frames += 1;

        self.backend.present(&image)
    }

    // ===== HELPERS =====

    fn require_phase(&self, operation: &'static str, expected: FramePhase) -> Result<()> {
        if self.frame.phase != expected {
            return Err(Error::FrameOrder {
                operation,
                phase: self.frame.phase,
            });
        }
        Ok(())
    }

    fn acquired_image(&self, operation: &'static str) -> Result<AcquiredImage> {
        self.frame.image.ok_or(Error::FrameOrder {
            operation,
            phase: self.frame.phase,
        })
    }

    fn check_recorder(&self, recorder: &CommandRecorder) -> Result<()> {
        if recorder.owner() != self.id {
            return Err(Error::InvalidResource(
                "Command recorder belongs to another context".to_string()));
        }
        if recorder.frame_serial() != self.frame.serial {
            return Err(Error::CommandRecording(format!(
                "Command recorder belongs to frame {} (current frame is {})",
                recorder.frame_serial(), self.frame.serial)));
        }
        let is_outstanding = self.frame.outstanding
            .as_ref()
            .map_or(false, |outstanding| outstanding.id == recorder.id());
        if !is_outstanding {
            return Err(Error::CommandRecording(
                "Command recorder is not the outstanding recorder of this frame".to_string()));
        }
        Ok(())
    }
}

impl<B: Backend> Drop for Context<B> {
    fn drop(&mut self) {
        if let Err(e) = self.backend.wait_idle() {
            mana_error!("mana::Context", "wait_idle failed during teardown: {}", e);
        }

        let pipelines = self.pipelines.len();
        let layouts = self.layouts.len();
        self.pipelines.clear();
        self.layout_cache.clear();
        self.layouts.clear();

        mana_info!("mana::Context", "Context {} destroyed ({} pipelines, {} layouts released)",
            self.id.raw(), pipelines, layouts);
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
