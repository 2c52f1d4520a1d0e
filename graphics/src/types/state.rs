//! Fixed-function pipeline state descriptors.
//!
//! Blend, depth-stencil and rasterizer configuration are plain value types.
//! The device compares them field by field against what was last applied,
//! so two descriptors that compare equal never cause native state changes.

use bitflags::bitflags;

// ============================================================================
// Blend
// ============================================================================

/// Blend factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// 0.
    Zero,
    /// 1.
    One,
    /// Source color.
    SrcColor,
    /// 1 - source color.
    InvSrcColor,
    /// Source alpha.
    SrcAlpha,
    /// 1 - source alpha.
    InvSrcAlpha,
    /// Destination alpha.
    DestAlpha,
    /// 1 - destination alpha.
    InvDestAlpha,
    /// Destination color.
    DestColor,
    /// 1 - destination color.
    InvDestColor,
    /// Saturated source alpha.
    SrcAlphaSat,
    /// Constant blend factor.
    BlendFactor,
    /// 1 - constant blend factor.
    InvBlendFactor,
    /// Second source color (dual-source blending).
    Src1Color,
    /// 1 - second source color.
    InvSrc1Color,
    /// Second source alpha.
    Src1Alpha,
    /// 1 - second source alpha.
    InvSrc1Alpha,
}

/// Blend operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOp {
    /// source + destination.
    Add,
    /// source - destination.
    Subtract,
    /// destination - source.
    RevSubtract,
    /// min(source, destination).
    Min,
    /// max(source, destination).
    Max,
}

bitflags! {
    /// Render target color channels that are written.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWriteMask: u8 {
        /// Red channel.
        const R = 1;
        /// Green channel.
        const G = 2;
        /// Blue channel.
        const B = 4;
        /// Alpha channel.
        const A = 8;
        /// All channels.
        const ALL = 0xf;
    }
}

impl Default for ColorWriteMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Blend state description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendDescriptor {
    /// Whether blending is enabled.
    pub blend_enable: bool,
    /// Source color factor.
    pub src_blend: BlendFactor,
    /// Destination color factor.
    pub dest_blend: BlendFactor,
    /// Color blend operation.
    pub blend_op: BlendOp,
    /// Source alpha factor.
    pub src_blend_alpha: BlendFactor,
    /// Destination alpha factor.
    pub dest_blend_alpha: BlendFactor,
    /// Alpha blend operation.
    pub blend_op_alpha: BlendOp,
    /// Written color channels.
    pub color_write_mask: ColorWriteMask,
    /// Alpha to coverage.
    pub alpha_to_coverage: bool,
}

impl Default for BlendDescriptor {
    fn default() -> Self {
        Self {
            blend_enable: false,
            src_blend: BlendFactor::One,
            dest_blend: BlendFactor::One,
            blend_op: BlendOp::Add,
            src_blend_alpha: BlendFactor::One,
            dest_blend_alpha: BlendFactor::One,
            blend_op_alpha: BlendOp::Add,
            color_write_mask: ColorWriteMask::ALL,
            alpha_to_coverage: false,
        }
    }
}

impl BlendDescriptor {
    /// Opaque rendering, blending disabled.
    pub fn opaque() -> Self {
        Self::default()
    }

    /// Classic alpha blending.
    pub fn alpha() -> Self {
        Self {
            blend_enable: true,
            src_blend: BlendFactor::SrcAlpha,
            dest_blend: BlendFactor::InvSrcAlpha,
            src_blend_alpha: BlendFactor::SrcAlpha,
            dest_blend_alpha: BlendFactor::InvSrcAlpha,
            ..Self::default()
        }
    }

    /// Additive blending.
    pub fn additive() -> Self {
        Self {
            blend_enable: true,
            ..Self::default()
        }
    }

    /// Set the written color channels.
    pub fn with_color_write_mask(mut self, mask: ColorWriteMask) -> Self {
        self.color_write_mask = mask;
        self
    }

    /// Enable or disable alpha to coverage.
    pub fn with_alpha_to_coverage(mut self, enable: bool) -> Self {
        self.alpha_to_coverage = enable;
        self
    }
}

// ============================================================================
// Depth / stencil
// ============================================================================

/// Comparison function for depth and stencil tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareMode {
    /// Never pass.
    Never,
    /// Pass if less than.
    Less,
    /// Pass if equal.
    Equal,
    /// Pass if less than or equal.
    LessEqual,
    /// Pass if greater than.
    Greater,
    /// Pass if not equal.
    NotEqual,
    /// Pass if greater than or equal.
    GreaterEqual,
    /// Always pass.
    Always,
}

/// Stencil buffer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOp {
    /// Keep the current value.
    Keep,
    /// Set to zero.
    Zero,
    /// Replace with the reference value.
    Replace,
    /// Increment, saturating.
    IncrSat,
    /// Decrement, saturating.
    DecrSat,
    /// Bitwise invert.
    Invert,
    /// Increment, wrapping.
    Incr,
    /// Decrement, wrapping.
    Decr,
}

/// Stencil test configuration for one face orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilFaceDescriptor {
    /// Operation when the stencil test fails.
    pub fail: StencilOp,
    /// Operation when stencil passes but depth fails.
    pub depth_fail: StencilOp,
    /// Operation when both tests pass.
    pub pass: StencilOp,
    /// Stencil comparison function.
    pub func: CompareMode,
}

impl Default for StencilFaceDescriptor {
    fn default() -> Self {
        Self {
            fail: StencilOp::Keep,
            depth_fail: StencilOp::Keep,
            pass: StencilOp::Keep,
            func: CompareMode::Always,
        }
    }
}

/// Depth-stencil state description.
///
/// `front` and `back` refer to faces in the device convention, where
/// clockwise-wound triangles face the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthDescriptor {
    /// Depth test enable.
    pub depth_enable: bool,
    /// Depth write enable.
    pub depth_write: bool,
    /// Depth comparison function.
    pub depth_func: CompareMode,
    /// Stencil test enable.
    pub stencil_enable: bool,
    /// Stencil read mask.
    pub stencil_read_mask: u8,
    /// Stencil write mask.
    pub stencil_write_mask: u8,
    /// Stencil configuration of front faces.
    pub front: StencilFaceDescriptor,
    /// Stencil configuration of back faces.
    pub back: StencilFaceDescriptor,
}

impl Default for DepthDescriptor {
    fn default() -> Self {
        Self {
            depth_enable: true,
            depth_write: true,
            depth_func: CompareMode::Less,
            stencil_enable: false,
            stencil_read_mask: 0xff,
            stencil_write_mask: 0xff,
            front: StencilFaceDescriptor::default(),
            back: StencilFaceDescriptor::default(),
        }
    }
}

impl DepthDescriptor {
    /// Depth test and write disabled.
    pub fn disabled() -> Self {
        Self {
            depth_enable: false,
            depth_write: false,
            ..Self::default()
        }
    }

    /// Set the depth test function.
    pub fn with_depth_func(mut self, func: CompareMode) -> Self {
        self.depth_func = func;
        self
    }

    /// Enable stencil testing with the same configuration on both faces.
    pub fn with_stencil(mut self, face: StencilFaceDescriptor) -> Self {
        self.stencil_enable = true;
        self.front = face;
        self.back = face;
        self
    }
}

// ============================================================================
// Rasterizer
// ============================================================================

/// Polygon fill mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FillMode {
    /// Draw edges only.
    Wireframe,
    /// Fill polygons.
    Solid,
}

/// Face culling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    /// No culling.
    None,
    /// Cull front faces.
    Front,
    /// Cull back faces.
    Back,
}

/// Rasterizer state description.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizerDescriptor {
    /// Fill mode.
    pub fill_mode: FillMode,
    /// Cull mode, in the device winding convention.
    pub cull_mode: CullMode,
    /// Constant depth bias added to fragments.
    pub depth_bias: i32,
    /// Maximum depth bias.
    pub depth_bias_clamp: f32,
    /// Slope-scaled depth bias.
    pub slope_scaled_depth_bias: f32,
    /// Depth clipping enable.
    pub depth_clip_enable: bool,
    /// Scissor test enable.
    pub scissor_enable: bool,
    /// Multisample rasterization enable.
    pub multisample_enable: bool,
    /// Antialiased line drawing.
    pub antialiased_line_enable: bool,
}

impl Default for RasterizerDescriptor {
    fn default() -> Self {
        Self {
            fill_mode: FillMode::Solid,
            cull_mode: CullMode::Back,
            depth_bias: 0,
            depth_bias_clamp: f32::INFINITY,
            slope_scaled_depth_bias: 0.0,
            depth_clip_enable: true,
            scissor_enable: false,
            multisample_enable: true,
            antialiased_line_enable: false,
        }
    }
}

impl RasterizerDescriptor {
    /// Set the cull mode.
    pub fn with_cull_mode(mut self, cull_mode: CullMode) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    /// Set the fill mode.
    pub fn with_fill_mode(mut self, fill_mode: FillMode) -> Self {
        self.fill_mode = fill_mode;
        self
    }

    /// Enable or disable the scissor test.
    pub fn with_scissor(mut self, enable: bool) -> Self {
        self.scissor_enable = enable;
        self
    }

    /// Set constant and slope-scaled depth bias.
    pub fn with_depth_bias(mut self, depth_bias: i32, slope_scaled: f32) -> Self {
        self.depth_bias = depth_bias;
        self.slope_scaled_depth_bias = slope_scaled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_write_mask_values() {
        assert_eq!(ColorWriteMask::R.bits(), 1);
        assert_eq!(ColorWriteMask::G.bits(), 2);
        assert_eq!(ColorWriteMask::B.bits(), 4);
        assert_eq!(ColorWriteMask::A.bits(), 8);
        assert_eq!(ColorWriteMask::default(), ColorWriteMask::ALL);
    }

    #[test]
    fn test_descriptor_defaults() {
        let blend = BlendDescriptor::default();
        assert!(!blend.blend_enable);
        assert_eq!(blend.src_blend, BlendFactor::One);

        let depth = DepthDescriptor::default();
        assert!(depth.depth_enable);
        assert_eq!(depth.depth_func, CompareMode::Less);
        assert_eq!(depth.front.func, CompareMode::Always);

        let raster = RasterizerDescriptor::default();
        assert_eq!(raster.cull_mode, CullMode::Back);
        assert!(raster.depth_bias_clamp.is_infinite());
    }

    #[test]
    fn test_alpha_blend() {
        let blend = BlendDescriptor::alpha();
        assert!(blend.blend_enable);
        assert_eq!(blend.dest_blend, BlendFactor::InvSrcAlpha);
        assert_ne!(blend, BlendDescriptor::opaque());
    }
}
