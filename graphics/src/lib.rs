//! # Ember Graphics
//!
//! Immediate-mode graphics device layer for the Ember engine.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`Graphics`] - the device: resource registry, state binding, draw and present
//! - [`resources`] - vertex, index and constant buffers, textures and state objects
//! - [`shader`] - shader sources, compiled variations and linked programs
//! - [`RenderBackend`](backend::RenderBackend) - the native driver seam
//! - [`DummyBackend`](backend::dummy::DummyBackend) - recording backend for tests and tools
//!
//! Bindings set on the device are only desired state. They are resolved
//! against what the backend last received right before each draw, so
//! redundant native calls are skipped.
//!
//! ## Example
//!
//! ```ignore
//! use ember_graphics::backend::dummy::DummyBackend;
//! use ember_graphics::{DisplayMode, Graphics, HeadlessWindow};
//!
//! let mut graphics = Graphics::new(HeadlessWindow::new(), DummyBackend::new());
//! graphics.set_mode(&DisplayMode::new(1280, 720))?;
//! graphics.clear(ClearFlags::ALL, Color::BLACK, 1.0, 0);
//! graphics.present();
//! ```

pub mod backend;
pub mod device;
pub mod error;
pub mod framebuffer;
pub mod profiling;
pub mod resources;
pub mod settings;
pub mod shader;
pub mod types;
pub mod window;

// Re-export main types for convenience
pub use backend::{BackendError, NativeHandle, RenderBackend};
pub use device::{DirtyFlags, Graphics, GraphicsEvent};
pub use error::GraphicsError;
pub use resources::{
    BlendStateId, ConstantBufferId, DepthStateId, GpuObject, GpuResourceId, IndexBufferId,
    RasterizerStateId, TextureId, VertexBufferId,
};
pub use settings::{DeviceCapabilities, DisplayMode};
pub use shader::{ShaderId, ShaderVariationId};
pub use types::{
    BlendDescriptor, ClearFlags, CullMode, DepthDescriptor, ElementSemantic, ElementType,
    ImageFormat, PrimitiveType, RasterizerDescriptor, ResourceUsage, ShaderStage, TextureType,
    VertexElement,
};
pub use window::{HeadlessWindow, Window};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the graphics library version.
pub fn init() {
    log::info!("Ember Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_dummy_backend() {
        let backend = DummyBackend::new();
        assert_eq!(backend.name(), "Dummy Backend");
    }

    #[test]
    fn test_device_creation() {
        let graphics = Graphics::new(HeadlessWindow::new(), DummyBackend::new());
        assert!(!graphics.is_initialized());
    }
}
