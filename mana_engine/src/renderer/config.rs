/// Context configuration

/// Configuration for `Context::init()`
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Application name (reported to the GPU driver)
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Enable backend validation layers
    pub enable_validation: bool,
    /// Number of frames the CPU may record ahead of the GPU
    pub frames_in_flight: u32,
    /// Clear color of the surface render pass (RGBA)
    pub clear_color: [f32; 4],
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            app_name: "Mana Application".to_string(),
            app_version: (0, 1, 0),
            enable_validation: cfg!(debug_assertions),
            frames_in_flight: 2,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}
