//! Display mode configuration and device capabilities.

use crate::types::{MAX_CONSTANT_BUFFERS, MAX_TEXTURE_UNITS};

/// Requested display mode.
///
/// # Example
///
/// ```ignore
/// let mode = DisplayMode::new(1280, 720)
///     .with_resizable(true)
///     .with_multisample(4)
///     .with_vsync(true);
/// graphics.set_mode(&mode)?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayMode {
    /// Backbuffer width.
    pub width: i32,
    /// Backbuffer height.
    pub height: i32,
    /// Fullscreen presentation.
    pub fullscreen: bool,
    /// Whether the window may be resized by the user.
    pub resizable: bool,
    /// Multisample level, 1 for no multisampling.
    pub multisample: u32,
    /// Vertical sync.
    pub vsync: bool,
}

impl Default for DisplayMode {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            fullscreen: false,
            resizable: false,
            multisample: 1,
            vsync: false,
        }
    }
}

impl DisplayMode {
    /// Windowed mode of the given size.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Set fullscreen presentation.
    pub fn with_fullscreen(mut self, fullscreen: bool) -> Self {
        self.fullscreen = fullscreen;
        self
    }

    /// Allow the user to resize the window.
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    /// Set the multisample level.
    pub fn with_multisample(mut self, multisample: u32) -> Self {
        self.multisample = multisample;
        self
    }

    /// Enable or disable vertical sync.
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }
}

/// Capabilities reported by the backend after context creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCapabilities {
    /// Constant buffer binding points available to vertex shaders.
    pub max_vs_constant_buffers: usize,
    /// Constant buffer binding points available to pixel shaders.
    pub max_ps_constant_buffers: usize,
    /// Texture units available to pixel shaders.
    pub max_texture_units: usize,
    /// Maximum texture dimension.
    pub max_texture_size: u32,
    /// Whether instanced drawing is supported.
    pub instancing: bool,
    /// Whether anisotropic filtering is supported.
    pub anisotropic_filtering: bool,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            max_vs_constant_buffers: MAX_CONSTANT_BUFFERS,
            max_ps_constant_buffers: MAX_CONSTANT_BUFFERS,
            max_texture_units: MAX_TEXTURE_UNITS,
            max_texture_size: 16384,
            instancing: true,
            anisotropic_filtering: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mode_builder() {
        let mode = DisplayMode::new(640, 480)
            .with_resizable(true)
            .with_multisample(4);
        assert_eq!(mode.width, 640);
        assert!(mode.resizable);
        assert!(!mode.fullscreen);
        assert_eq!(mode.multisample, 4);
    }

    #[test]
    fn test_capabilities_default() {
        let caps = DeviceCapabilities::default();
        assert_eq!(caps.max_vs_constant_buffers, MAX_CONSTANT_BUFFERS);
        assert!(caps.instancing);
    }
}
