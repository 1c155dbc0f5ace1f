//! Unit tests for pipeline descriptors and the pipeline registry

use std::sync::Arc;
use crate::error::Error;
use crate::renderer::*;
use crate::shader::{CompiledShader, ShaderStage, ShaderStageFlags};

fn layout_handle(owner: ContextId) -> PipelineLayoutHandle {
    let mut keys = slotmap::SlotMap::<PipelineLayoutKey, ()>::with_key();
    PipelineLayoutHandle {
        key: keys.insert(()),
        owner,
        desc: Arc::new(PipelineLayoutDesc::default()),
    }
}

fn triangle_desc(owner: ContextId) -> GraphicsPipelineDesc {
    GraphicsPipelineDesc {
        vertex: ShaderEntry::new(
            CompiledShader::from_parts(ShaderStage::Vertex, "VSMain", vec![0x0723_0203]),
            "VSMain",
        ),
        fragment: ShaderEntry::new(
            CompiledShader::from_parts(ShaderStage::Fragment, "PSMain", vec![0x0723_0203]),
            "PSMain",
        ),
        topology: PrimitiveTopology::TriangleList,
        color_formats: vec![TextureFormat::B8G8R8A8_SRGB],
        layout: layout_handle(owner),
        label: Some("triangle".to_string()),
    }
}

fn assert_pipeline_build_error<T: std::fmt::Debug>(result: crate::error::Result<T>) {
    assert!(matches!(result, Err(Error::PipelineBuild(_))), "got {:?}", result);
}

#[test]
fn test_primitive_count_per_topology() {
    assert_eq!(PrimitiveTopology::TriangleList.primitive_count(3), 1);
    assert_eq!(PrimitiveTopology::TriangleList.primitive_count(7), 2);
    assert_eq!(PrimitiveTopology::TriangleStrip.primitive_count(5), 3);
    assert_eq!(PrimitiveTopology::TriangleStrip.primitive_count(1), 0);
    assert_eq!(PrimitiveTopology::LineList.primitive_count(4), 2);
    assert_eq!(PrimitiveTopology::LineStrip.primitive_count(4), 3);
    assert_eq!(PrimitiveTopology::LineStrip.primitive_count(0), 0);
    assert_eq!(PrimitiveTopology::PointList.primitive_count(9), 9);
}

#[test]
fn test_valid_triangle_desc_passes() {
    let owner = ContextId::next();
    assert!(triangle_desc(owner).validate(owner).is_ok());
}

#[test]
fn test_zero_color_targets_rejected() {
    let owner = ContextId::next();
    let mut desc = triangle_desc(owner);
    desc.color_formats.clear();
    assert_pipeline_build_error(desc.validate(owner));
}

#[test]
fn test_too_many_color_targets_rejected() {
    let owner = ContextId::next();
    let mut desc = triangle_desc(owner);
    desc.color_formats = vec![TextureFormat::R8G8B8A8_UNORM; MAX_COLOR_TARGETS + 1];
    assert_pipeline_build_error(desc.validate(owner));

    desc.color_formats.truncate(MAX_COLOR_TARGETS);
    assert!(desc.validate(owner).is_ok());
}

#[test]
fn test_swapped_stages_rejected() {
    let owner = ContextId::next();
    let mut desc = triangle_desc(owner);
    std::mem::swap(&mut desc.vertex, &mut desc.fragment);
    assert_pipeline_build_error(desc.validate(owner));
}

#[test]
fn test_unknown_entry_point_rejected() {
    let owner = ContextId::next();
    let mut desc = triangle_desc(owner);
    desc.fragment.entry_point = "NotThere".to_string();
    assert_pipeline_build_error(desc.validate(owner));
}

#[test]
fn test_reflected_entry_point_accepted() {
    let owner = ContextId::next();
    let mut desc = triangle_desc(owner);
    desc.vertex.entry_point = "main".to_string();
    assert!(desc.validate(owner).is_ok());
}

#[test]
fn test_foreign_layout_rejected() {
    let owner = ContextId::next();
    let desc = triangle_desc(ContextId::next());
    assert_pipeline_build_error(desc.validate(owner));
}

#[test]
fn test_layout_desc_validation() {
    let slot = |binding, count| BindingSlot {
        binding,
        binding_type: BindingType::UniformBuffer,
        count,
        stages: ShaderStageFlags::VERTEX,
    };

    assert!(PipelineLayoutDesc::default().validate().is_ok());
    assert!(PipelineLayoutDesc { bindings: vec![slot(0, 1), slot(1, 4)] }.validate().is_ok());
    assert_pipeline_build_error(PipelineLayoutDesc { bindings: vec![slot(0, 1), slot(0, 1)] }.validate());
    assert_pipeline_build_error(PipelineLayoutDesc { bindings: vec![slot(0, 0)] }.validate());

    let mut invisible = slot(2, 1);
    invisible.stages = ShaderStageFlags::empty();
    assert_pipeline_build_error(PipelineLayoutDesc { bindings: vec![invisible] }.validate());
}

#[test]
fn test_equal_layout_descs_hash_equal() {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let desc = || PipelineLayoutDesc {
        bindings: vec![BindingSlot {
            binding: 0,
            binding_type: BindingType::CombinedImageSampler,
            count: 1,
            stages: ShaderStageFlags::FRAGMENT,
        }],
    };
    let hash = |d: &PipelineLayoutDesc| {
        let mut hasher = DefaultHasher::new();
        d.hash(&mut hasher);
        hasher.finish()
    };

    assert_eq!(desc(), desc());
    assert_eq!(hash(&desc()), hash(&desc()));
}

#[test]
fn test_registry_resolves_own_handles_only() {
    let owner = ContextId::next();
    let mut registry = PipelineRegistry::<&'static str>::new(owner);
    let key = registry.insert("pipeline");

    let info = Arc::new(PipelineInfo {
        topology: PrimitiveTopology::TriangleList,
        color_formats: vec![TextureFormat::B8G8R8A8_SRGB],
        layout: layout_handle(owner),
        label: None,
    });
    let handle = PipelineHandle { key, owner, info: info.clone() };
    let foreign = PipelineHandle { key, owner: ContextId::next(), info };

    assert_eq!(*registry.get(&handle).unwrap(), "pipeline");
    assert!(registry.contains(&handle));
    assert!(matches!(registry.get(&foreign), Err(Error::InvalidResource(_))));
    assert!(!registry.contains(&foreign));

    assert_eq!(registry.remove(key), Some("pipeline"));
    assert!(matches!(registry.get(&handle), Err(Error::InvalidResource(_))));
    assert!(registry.is_empty());
}
