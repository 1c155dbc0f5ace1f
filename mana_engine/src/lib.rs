/*!
# Mana Engine

Core traits and types for the Mana frame-execution layer.

This crate provides the platform-agnostic API used to drive a GPU one frame at
a time: a window/surface abstraction, an HLSL/GLSL shader front-end, pipeline
descriptors, a command recorder and a context enforcing the frame lifecycle.
GPU backends (Vulkan, headless) plug in through the `Backend` trait.

## Architecture

- **SurfaceProvider**: Window/event source trait (winit and headless implementations)
- **compile_shader**: Shader front-end producing validated SPIR-V
- **Context**: Frame executor owning the backend and the pipeline registry
- **CommandRecorder**: Single-use recorder for one submission
- **Backend**: GPU backend trait (see `mana_engine_renderer_vulkan`)
- **HeadlessBackend**: Recording backend used by tests and tooling
*/

// Internal modules
mod error;
pub mod log;
pub mod renderer;
pub mod shader;
pub mod surface;

// Main mana namespace module
pub mod mana {
    // Error types
    pub use crate::error::{Error, Result};

    // Frame executor and backend seam
    pub use crate::renderer::{Backend, Context, ContextConfig};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        pub use crate::log::{set_logger, reset_logger, log, log_detailed};
    }

    // Render sub-module with all rendering types
    pub mod render {
        pub use crate::renderer::*;
    }

    // Shader front-end sub-module
    pub mod shader {
        pub use crate::shader::*;
    }

    // Surface sub-module
    pub mod surface {
        pub use crate::surface::*;
    }
}
