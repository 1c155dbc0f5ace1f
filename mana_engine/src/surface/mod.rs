/// Surface module - window/event sources the frame executor renders into

// Module declarations
pub mod surface_provider;
pub mod winit_surface;
pub mod headless_surface;

// Re-export everything from surface_provider.rs
pub use surface_provider::*;

// Re-export implementations
pub use winit_surface::*;
pub use headless_surface::*;
