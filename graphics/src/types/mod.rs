//! Common types and descriptors for graphics resources.
//!
//! This module contains limits, format enums, vertex and constant layouts,
//! and the fixed-function state descriptors used throughout the graphics system.

mod common;
mod state;
mod texture;
mod vertex;

pub use common::{
    ClearFlags, MAX_CONSTANT_BUFFERS, MAX_CUBE_FACES, MAX_FRAMEBUFFER_AGE, MAX_RENDERTARGETS,
    MAX_SHADER_STAGES, MAX_TEXTURE_UNITS, MAX_VERTEX_ATTRIBUTES, MAX_VERTEX_STREAMS,
    PrimitiveType, ResourceUsage, ShaderStage,
};
pub use state::{
    BlendDescriptor, BlendFactor, BlendOp, ColorWriteMask, CompareMode, CullMode,
    DepthDescriptor, FillMode, RasterizerDescriptor, StencilFaceDescriptor, StencilOp,
};
pub use texture::{
    ImageFormat, ImageLevel, SamplerDescriptor, TextureAddressMode, TextureFilterMode,
    TextureType,
};
pub use vertex::{Constant, ElementSemantic, ElementType, VertexElement};
