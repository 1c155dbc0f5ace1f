/// Renderer module - frame executor, pipelines, command recording and backends

// Module declarations
pub mod render_pass;
pub mod pipeline;
pub mod command_list;
pub mod config;
pub mod backend;
pub mod context;
pub mod headless_backend;

// Re-export everything
pub use render_pass::*;
pub use pipeline::*;
pub use command_list::*;
pub use config::*;
pub use backend::*;
pub use context::*;
pub use headless_backend::*;
