/// CommandRecorder - records rendering commands for one submission
///
/// Recording is validated as it happens and performs no GPU work. The
/// finished `CommandList` is replayed by the backend on `Context::submit()`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use crate::error::{Error, Result};
use crate::renderer::{
    ContextId, PipelineHandle, Rect2D, RenderPassInfo, TextureFormat, Viewport,
};
use crate::mana_warn;

/// One recorded command
#[derive(Debug, Clone)]
pub enum Command {
    /// Begin a render pass (viewport and scissor reset to the render area)
    BeginRenderPass(RenderPassInfo),
    /// End the current render pass
    EndRenderPass,
    /// Bind a graphics pipeline
    BindPipeline(PipelineHandle),
    /// Set the viewport for subsequent draws
    SetViewport(Viewport),
    /// Set the scissor rectangle for subsequent draws
    SetScissor(Rect2D),
    /// Non-indexed draw of vertex IDs `first_vertex..first_vertex + vertex_count`
    Draw { vertex_count: u32, first_vertex: u32 },
}

/// Finalized, ordered list of commands for one submission
#[derive(Debug, Clone)]
pub struct CommandList {
    frame_serial: u64,
    commands: Vec<Command>,
}

impl CommandList {
    /// Serial of the frame this list was recorded for
    pub fn frame_serial(&self) -> u64 {
        self.frame_serial
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of render passes in the list
    pub fn render_pass_count(&self) -> usize {
        self.commands.iter()
            .filter(|command| matches!(command, Command::BeginRenderPass(_)))
            .count()
    }

    /// `(vertex_count, first_vertex)` of every draw, in order
    pub fn draws(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.commands.iter().filter_map(|command| match command {
            Command::Draw { vertex_count, first_vertex } => Some((*vertex_count, *first_vertex)),
            _ => None,
        })
    }
}

/// Single-use command recorder bound to one frame
///
/// Obtained from `Context::request_cmd()` and consumed by
/// `Context::submit()` or `Context::discard()`.
pub struct CommandRecorder {
    id: u64,
    owner: ContextId,
    frame_serial: u64,
    commands: Vec<Command>,
    /// Color formats of the open render pass
    open_pass: Option<Vec<TextureFormat>>,
    bound_pipeline: Option<PipelineHandle>,
    /// Cleared on drop; the context polls it to detect abandoned recorders
    live: Arc<AtomicBool>,
    finished: bool,
}

impl CommandRecorder {
    pub(crate) fn new(id: u64, owner: ContextId, frame_serial: u64) -> Self {
        Self {
            id,
            owner,
            frame_serial,
            commands: Vec::new(),
            open_pass: None,
            bound_pipeline: None,
            live: Arc::new(AtomicBool::new(true)),
            finished: false,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn owner(&self) -> ContextId {
        self.owner
    }

    pub(crate) fn liveness(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.live)
    }

    /// Serial of the frame this recorder belongs to
    pub fn frame_serial(&self) -> u64 {
        self.frame_serial
    }

    /// Commands recorded so far
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// True while a render pass is open
    pub fn is_in_render_pass(&self) -> bool {
        self.open_pass.is_some()
    }

    /// Begin a render pass
    ///
    /// Viewport and scissor start out covering `info.render_area`.
    pub fn begin_render_pass(&mut self, info: &RenderPassInfo) -> Result<()> {
        if self.open_pass.is_some() {
            return Err(Error::CommandRecording(
                "begin_render_pass called inside a render pass (nesting is not allowed)".to_string()));
        }
        if info.target.frame_serial != self.frame_serial {
            return Err(Error::CommandRecording(format!(
                "Render pass was obtained for frame {} but the recorder belongs to frame {}",
                info.target.frame_serial, self.frame_serial)));
        }
        if info.color_attachments.is_empty() {
            return Err(Error::CommandRecording(
                "Render pass has no color attachment".to_string()));
        }
        if info.render_area.width == 0 || info.render_area.height == 0 {
            return Err(Error::CommandRecording(
                "Render pass has an empty render area".to_string()));
        }

        self.open_pass = Some(info.color_formats());
        self.commands.push(Command::BeginRenderPass(info.clone()));
        Ok(())
    }

    /// End the current render pass
    pub fn end_render_pass(&mut self) -> Result<()> {
        if self.open_pass.take().is_none() {
            return Err(Error::CommandRecording(
                "end_render_pass called without a matching begin_render_pass".to_string()));
        }
        self.commands.push(Command::EndRenderPass);
        Ok(())
    }

    /// Bind a graphics pipeline for subsequent draws
    ///
    /// The binding persists across render passes of this recorder.
    pub fn bind_pipeline(&mut self, pipeline: &PipelineHandle) -> Result<()> {
        if pipeline.owner() != self.owner {
            return Err(Error::CommandRecording(
                "Pipeline belongs to another context".to_string()));
        }
        self.bound_pipeline = Some(pipeline.clone());
        self.commands.push(Command::BindPipeline(pipeline.clone()));
        Ok(())
    }

    /// Set the viewport for subsequent draws of the current render pass
    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.require_render_pass("set_viewport")?;
        // Negative height is allowed (y-flip)
        let valid_size = viewport.width > 0.0
            && viewport.width.is_finite()
            && viewport.height.is_finite()
            && viewport.height != 0.0;
        if !valid_size {
            return Err(Error::CommandRecording(format!(
                "Invalid viewport size {}x{}", viewport.width, viewport.height)));
        }
        if !(0.0..=1.0).contains(&viewport.min_depth) || !(0.0..=1.0).contains(&viewport.max_depth) {
            return Err(Error::CommandRecording(format!(
                "Viewport depth range {}..{} outside 0..1", viewport.min_depth, viewport.max_depth)));
        }
        self.commands.push(Command::SetViewport(viewport));
        Ok(())
    }

    /// Set the scissor rectangle for subsequent draws of the current render pass
    pub fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.require_render_pass("set_scissor")?;
        if scissor.x < 0 || scissor.y < 0 {
            return Err(Error::CommandRecording(format!(
                "Scissor offset ({}, {}) is negative", scissor.x, scissor.y)));
        }
        self.commands.push(Command::SetScissor(scissor));
        Ok(())
    }

    /// Non-indexed draw
    ///
    /// Must be inside a render pass with a bound pipeline whose color
    /// formats match the pass.
    pub fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.require_render_pass("draw")?;

        let pipeline = self.bound_pipeline.as_ref().ok_or_else(|| {
            Error::CommandRecording("draw called before bind_pipeline".to_string())
        })?;

        if let Some(pass_formats) = &self.open_pass {
            if pipeline.color_formats() != pass_formats.as_slice() {
                return Err(Error::CommandRecording(format!(
                    "Pipeline color formats {:?} do not match render pass formats {:?}",
                    pipeline.color_formats(), pass_formats)));
            }
        }

        // Last vertex ID is first_vertex + vertex_count - 1
        if vertex_count > 0 && first_vertex.checked_add(vertex_count - 1).is_none() {
            return Err(Error::CommandRecording(format!(
                "Vertex range {}+{} overflows", first_vertex, vertex_count)));
        }

        self.commands.push(Command::Draw { vertex_count, first_vertex });
        Ok(())
    }

    /// Finalize into a command list
    pub(crate) fn finish(mut self) -> Result<CommandList> {
        if self.open_pass.is_some() {
            return Err(Error::CommandRecording(
                "Recorder submitted with an open render pass".to_string()));
        }
        self.finished = true;
        Ok(CommandList {
            frame_serial: self.frame_serial,
            commands: std::mem::take(&mut self.commands),
        })
    }

    /// Drop without warning about unsubmitted commands
    pub(crate) fn abandon(mut self) {
        self.finished = true;
    }

    fn require_render_pass(&self, operation: &str) -> Result<()> {
        if self.open_pass.is_none() {
            return Err(Error::CommandRecording(format!(
                "{} called outside of a render pass", operation)));
        }
        Ok(())
    }
}

impl Drop for CommandRecorder {
    fn drop(&mut self) {
        if !self.finished && !self.commands.is_empty() {
            mana_warn!("mana::CommandRecorder",
                "Recorder for frame {} dropped without submit ({} commands discarded)",
                self.frame_serial, self.commands.len());
        }
        self.live.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "command_list_tests.rs"]
mod tests;
