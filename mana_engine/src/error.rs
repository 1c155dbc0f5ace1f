//! Error types for the Mana engine
//!
//! This module defines the error types used throughout the engine,
//! covering window-system setup, context initialization, shader compilation,
//! pipeline building and frame-lifecycle misuse.

use std::fmt;

use crate::renderer::FramePhase;
use crate::shader::ShaderStage;

/// Result type for Mana engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Mana engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Window system could not be initialized or the window could not be created
    WindowSystemInit(String),

    /// Device, surface or presentation chain initialization failed
    ContextInit(String),

    /// Shader compilation failed for one stage
    ShaderCompile {
        stage: ShaderStage,
        entry_point: String,
        message: String,
    },

    /// Pipeline layout or graphics pipeline could not be built
    PipelineBuild(String),

    /// A frame-lifecycle method was called in the wrong phase
    FrameOrder {
        operation: &'static str,
        phase: FramePhase,
    },

    /// Command recorder misuse (unpaired render pass, draw without pipeline, ...)
    CommandRecording(String),

    /// Invalid resource (stale handle, handle from another context, ...)
    InvalidResource(String),

    /// Capability not provided by this implementation
    Unsupported(&'static str),

    /// Backend-specific error (Vulkan, headless, ...)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::WindowSystemInit(msg) => write!(f, "Window system initialization failed: {}", msg),
            Error::ContextInit(msg) => write!(f, "Context initialization failed: {}", msg),
            Error::ShaderCompile { stage, entry_point, message } => {
                write!(f, "Shader compilation failed ({:?} '{}'): {}", stage, entry_point, message)
            }
            Error::PipelineBuild(msg) => write!(f, "Pipeline build failed: {}", msg),
            Error::FrameOrder { operation, phase } => {
                write!(f, "Frame order violation: {} called while {:?}", operation, phase)
            }
            Error::CommandRecording(msg) => write!(f, "Command recording error: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::Unsupported(what) => write!(f, "Unsupported: {}", what),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
