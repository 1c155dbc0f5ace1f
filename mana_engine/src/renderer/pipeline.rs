/// Pipeline layouts, graphics pipeline descriptors and the pipeline registry
///
/// Pipelines and layouts are owned by the `Context` that created them. User
/// code only holds handles: a slot map key, the owning context id and the
/// immutable creation info.

use std::sync::Arc;
use slotmap::{new_key_type, SlotMap};
use crate::error::{Error, Result};
use crate::renderer::{ContextId, TextureFormat};
use crate::shader::{CompiledShader, ShaderStage, ShaderStageFlags};

/// Maximum number of color targets of a graphics pipeline
pub const MAX_COLOR_TARGETS: usize = 8;

// ===== SLOT MAP KEYS =====

new_key_type! {
    /// Key of a pipeline within its context's registry
    pub struct PipelineKey;

    /// Key of a pipeline layout within its context
    pub struct PipelineLayoutKey;
}

// ===== TOPOLOGY =====

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

impl PrimitiveTopology {
    /// Number of complete primitives assembled from `vertex_count` vertices
    pub fn primitive_count(&self, vertex_count: u32) -> u32 {
        match self {
            PrimitiveTopology::PointList => vertex_count,
            PrimitiveTopology::LineList => vertex_count / 2,
            PrimitiveTopology::LineStrip => vertex_count.saturating_sub(1),
            PrimitiveTopology::TriangleList => vertex_count / 3,
            PrimitiveTopology::TriangleStrip => vertex_count.saturating_sub(2),
        }
    }
}

// ===== PIPELINE LAYOUT =====

/// Resource type bound at a layout slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingType {
    UniformBuffer,
    StorageBuffer,
    CombinedImageSampler,
}

/// One binding slot of a pipeline layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingSlot {
    /// Binding number
    pub binding: u32,
    /// Resource type
    pub binding_type: BindingType,
    /// Array size (1 = single resource)
    pub count: u32,
    /// Stages that can access the binding
    pub stages: ShaderStageFlags,
}

/// Pipeline layout descriptor
///
/// Equal descriptors resolve to the same cached layout within a context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PipelineLayoutDesc {
    /// Binding slots, in order
    pub bindings: Vec<BindingSlot>,
}

impl PipelineLayoutDesc {
    pub(crate) fn validate(&self) -> Result<()> {
        for (i, slot) in self.bindings.iter().enumerate() {
            if slot.count == 0 {
                return Err(Error::PipelineBuild(format!(
                    "Binding {} has a zero descriptor count", slot.binding)));
            }
            if slot.stages.is_empty() {
                return Err(Error::PipelineBuild(format!(
                    "Binding {} is not visible to any shader stage", slot.binding)));
            }
            if self.bindings[..i].iter().any(|other| other.binding == slot.binding) {
                return Err(Error::PipelineBuild(format!(
                    "Binding {} is declared more than once", slot.binding)));
            }
        }
        Ok(())
    }
}

/// Handle to a pipeline layout owned by a context
#[derive(Debug, Clone)]
pub struct PipelineLayoutHandle {
    pub(crate) key: PipelineLayoutKey,
    pub(crate) owner: ContextId,
    pub(crate) desc: Arc<PipelineLayoutDesc>,
}

impl PipelineLayoutHandle {
    pub fn key(&self) -> PipelineLayoutKey {
        self.key
    }

    /// Id of the context that owns the layout
    pub fn owner(&self) -> ContextId {
        self.owner
    }

    /// Descriptor the layout was created from
    pub fn desc(&self) -> &PipelineLayoutDesc {
        &self.desc
    }
}

impl PartialEq for PipelineLayoutHandle {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.owner == other.owner
    }
}

impl Eq for PipelineLayoutHandle {}

// ===== GRAPHICS PIPELINE =====

/// Shader stage input of a pipeline: compiled module plus the entry to run
#[derive(Debug, Clone)]
pub struct ShaderEntry {
    /// Compiled module (consumed by pipeline creation)
    pub shader: CompiledShader,
    /// Entry point to run
    pub entry_point: String,
}

impl ShaderEntry {
    pub fn new(shader: CompiledShader, entry_point: impl Into<String>) -> Self {
        Self { shader, entry_point: entry_point.into() }
    }

    fn validate(&self, expected: ShaderStage) -> Result<()> {
        if self.shader.stage() != expected {
            return Err(Error::PipelineBuild(format!(
                "Expected a {:?} shader, got a {:?} shader", expected, self.shader.stage())));
        }
        if !self.shader.has_entry_point(&self.entry_point) {
            return Err(Error::PipelineBuild(format!(
                "{:?} shader has no entry point '{}'", expected, self.entry_point)));
        }
        Ok(())
    }
}

/// Graphics pipeline descriptor
#[derive(Debug, Clone)]
pub struct GraphicsPipelineDesc {
    /// Vertex stage
    pub vertex: ShaderEntry,
    /// Fragment stage
    pub fragment: ShaderEntry,
    /// Primitive topology
    pub topology: PrimitiveTopology,
    /// Color target formats, in attachment order (1..=8)
    pub color_formats: Vec<TextureFormat>,
    /// Pipeline layout
    pub layout: PipelineLayoutHandle,
    /// Debug label
    pub label: Option<String>,
}

impl GraphicsPipelineDesc {
    /// Check the descriptor before any backend sees it
    pub(crate) fn validate(&self, owner: ContextId) -> Result<()> {
        self.vertex.validate(ShaderStage::Vertex)?;
        self.fragment.validate(ShaderStage::Fragment)?;

        if self.color_formats.is_empty() {
            return Err(Error::PipelineBuild(
                "Graphics pipeline needs at least one color target".to_string()));
        }
        if self.color_formats.len() > MAX_COLOR_TARGETS {
            return Err(Error::PipelineBuild(format!(
                "Graphics pipeline has {} color targets (max {})",
                self.color_formats.len(), MAX_COLOR_TARGETS)));
        }
        if self.layout.owner != owner {
            return Err(Error::PipelineBuild(
                "Pipeline layout belongs to another context".to_string()));
        }
        Ok(())
    }
}

/// Immutable creation info shared by all clones of a pipeline handle
#[derive(Debug)]
pub struct PipelineInfo {
    pub topology: PrimitiveTopology,
    pub color_formats: Vec<TextureFormat>,
    pub layout: PipelineLayoutHandle,
    pub label: Option<String>,
}

/// Handle to a graphics pipeline owned by a context
#[derive(Debug, Clone)]
pub struct PipelineHandle {
    pub(crate) key: PipelineKey,
    pub(crate) owner: ContextId,
    pub(crate) info: Arc<PipelineInfo>,
}

impl PipelineHandle {
    pub fn key(&self) -> PipelineKey {
        self.key
    }

    /// Id of the context that owns the pipeline
    pub fn owner(&self) -> ContextId {
        self.owner
    }

    pub fn info(&self) -> &PipelineInfo {
        &self.info
    }

    pub fn topology(&self) -> PrimitiveTopology {
        self.info.topology
    }

    pub fn color_formats(&self) -> &[TextureFormat] {
        &self.info.color_formats
    }
}

impl PartialEq for PipelineHandle {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.owner == other.owner
    }
}

impl Eq for PipelineHandle {}

// ===== REGISTRY =====

/// Backend pipeline objects owned by one context
///
/// Backends resolve the handles found in a command list through this registry.
pub struct PipelineRegistry<P> {
    owner: ContextId,
    pipelines: SlotMap<PipelineKey, P>,
}

impl<P> PipelineRegistry<P> {
    pub(crate) fn new(owner: ContextId) -> Self {
        Self {
            owner,
            pipelines: SlotMap::with_key(),
        }
    }

    pub(crate) fn insert(&mut self, pipeline: P) -> PipelineKey {
        self.pipelines.insert(pipeline)
    }

    pub(crate) fn remove(&mut self, key: PipelineKey) -> Option<P> {
        self.pipelines.remove(key)
    }

    pub(crate) fn clear(&mut self) {
        self.pipelines.clear();
    }

    /// Resolve a handle to the backend pipeline
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidResource` if the handle belongs to another
    /// context or the pipeline was destroyed.
    pub fn get(&self, handle: &PipelineHandle) -> Result<&P> {
        if handle.owner != self.owner {
            return Err(Error::InvalidResource(
                "Pipeline handle belongs to another context".to_string()));
        }
        self.pipelines.get(handle.key).ok_or_else(|| {
            Error::InvalidResource(format!(
                "Pipeline {:?} has been destroyed", handle.info.label.as_deref().unwrap_or("<unnamed>")))
        })
    }

    /// True if the handle resolves in this registry
    pub fn contains(&self, handle: &PipelineHandle) -> bool {
        handle.owner == self.owner && self.pipelines.contains_key(handle.key)
    }

    /// Number of live pipelines
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
