//! Common types and limits shared across the graphics system.

use bitflags::bitflags;

// ============================================================================
// Limits
// ============================================================================

/// Maximum number of simultaneously bound vertex buffers.
pub const MAX_VERTEX_STREAMS: usize = 4;
/// Maximum number of constant buffers per shader stage.
pub const MAX_CONSTANT_BUFFERS: usize = 15;
/// Maximum number of texture units.
pub const MAX_TEXTURE_UNITS: usize = 16;
/// Maximum number of simultaneous color render targets.
pub const MAX_RENDERTARGETS: usize = 4;
/// Number of faces in a cube map.
pub const MAX_CUBE_FACES: usize = 6;
/// Number of shader stages.
pub const MAX_SHADER_STAGES: usize = 2;
/// Maximum number of vertex attributes the device tracks.
pub const MAX_VERTEX_ATTRIBUTES: usize = 16;
/// Unused frames after which a cached framebuffer is destroyed.
pub const MAX_FRAMEBUFFER_AGE: u32 = 16;

// ============================================================================
// Enums
// ============================================================================

/// Shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader.
    Vertex,
    /// Pixel (fragment) shader.
    Pixel,
}

impl ShaderStage {
    /// Index of the stage for per-stage binding tables.
    pub fn index(self) -> usize {
        match self {
            Self::Vertex => 0,
            Self::Pixel => 1,
        }
    }

    /// Short stage name used in log messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Vertex => "VS",
            Self::Pixel => "PS",
        }
    }
}

/// Primitive topology for draw calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// Independent points.
    PointList,
    /// Independent line segments.
    LineList,
    /// Connected line strip.
    LineStrip,
    /// Independent triangles.
    TriangleList,
    /// Connected triangle strip.
    TriangleStrip,
}

/// Update-frequency contract of a GPU resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceUsage {
    /// Rarely updated, usually by full replacement.
    #[default]
    Default,
    /// Set once at creation, never updated afterwards.
    Immutable,
    /// Frequently updated.
    Dynamic,
    /// Texture used as a color render target or depth-stencil buffer.
    RenderTarget,
}

bitflags! {
    /// Which buffers a clear operation affects.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        /// Clear the first color render target.
        const COLOR = 1;
        /// Clear depth.
        const DEPTH = 2;
        /// Clear stencil.
        const STENCIL = 4;
        /// Clear everything.
        const ALL = Self::COLOR.bits() | Self::DEPTH.bits() | Self::STENCIL.bits();
    }
}

impl Default for ClearFlags {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_flag_values() {
        assert_eq!(ClearFlags::COLOR.bits(), 1);
        assert_eq!(ClearFlags::DEPTH.bits(), 2);
        assert_eq!(ClearFlags::STENCIL.bits(), 4);
        assert_eq!(ClearFlags::ALL.bits(), 7);
    }

    #[test]
    fn test_stage_index() {
        assert_eq!(ShaderStage::Vertex.index(), 0);
        assert_eq!(ShaderStage::Pixel.index(), 1);
        assert!(ShaderStage::Pixel.index() < MAX_SHADER_STAGES);
    }
}
