/// Shader module - shader front-end (HLSL/GLSL source to SPIR-V)

// Module declarations
pub mod shader_compiler;

// Re-export everything from shader_compiler.rs
pub use shader_compiler::*;
