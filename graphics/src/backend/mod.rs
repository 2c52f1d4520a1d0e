//! Native rendering backend abstraction.
//!
//! The device layer tracks desired and applied state and decides *when* a
//! native call is necessary. A [`RenderBackend`] implementation performs the
//! native call itself. The trait mirrors an immediate-mode driver with the
//! OpenGL conventions:
//!
//! - counter-clockwise triangles are front facing,
//! - viewport and scissor rectangles use a bottom-left origin,
//! - objects are referred to by opaque integer names ([`NativeHandle`]).
//!
//! The device converts from its own top-left, clockwise-front contract
//! before calling into the backend, so backends never flip coordinates or
//! faces themselves.
//!
//! # Available Backends
//!
//! - `dummy` (default feature): in-memory recording backend for tests,
//!   benchmarks and headless tools.

#[cfg(any(test, feature = "dummy"))]
pub mod dummy;
mod error;

pub use error::BackendError;

use ember_core::{Color, IntRect};

use crate::settings::DeviceCapabilities;
use crate::types::{
    BlendFactor, BlendOp, ClearFlags, ColorWriteMask, CompareMode, ElementType, FillMode,
    ImageFormat, ImageLevel, PrimitiveType, ResourceUsage, SamplerDescriptor, ShaderStage,
    StencilOp, TextureType,
};
use crate::window::Window;

/// Opaque name of a native object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(pub u32);

/// Binding target of a native buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex data.
    Vertex,
    /// Index data.
    Index,
    /// Uniform (constant) data.
    Uniform,
}

/// Face orientation in the native counter-clockwise-front convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeFace {
    /// Counter-clockwise wound faces.
    Front,
    /// Clockwise wound faces.
    Back,
}

/// Storage description of a native texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeTextureDesc {
    /// Texture type.
    pub texture_type: TextureType,
    /// Pixel format.
    pub format: ImageFormat,
    /// Width of the top level.
    pub width: u32,
    /// Height of the top level.
    pub height: u32,
    /// Number of mip levels.
    pub num_levels: usize,
    /// Multisample count, 1 when not multisampled.
    pub multisample: u32,
    /// Usage.
    pub usage: ResourceUsage,
}

/// One upload into a native texture.
#[derive(Debug, Clone, Copy)]
pub struct TextureUpdate<'a> {
    /// Cube face, 0 for 2D textures.
    pub face: usize,
    /// Mip level.
    pub level: usize,
    /// Destination region in pixels, top-left origin.
    pub rect: IntRect,
    /// Source data.
    pub data: ImageLevel<'a>,
    /// Whether the update replaces the whole level.
    pub whole_level: bool,
}

/// A vertex input reported by a linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedAttribute {
    /// Attribute name as declared in the shader.
    pub name: String,
    /// Native attribute location.
    pub location: u32,
}

/// A sampler uniform reported by a linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedSampler {
    /// Uniform name as declared in the shader.
    pub name: String,
    /// Native uniform location.
    pub location: u32,
}

/// A uniform block reported by a linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedUniformBlock {
    /// Block name as declared in the shader.
    pub name: String,
    /// Native block index.
    pub index: u32,
}

/// Active inputs and uniforms of a linked program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramReflection {
    /// Vertex attributes.
    pub attributes: Vec<ReflectedAttribute>,
    /// Sampler uniforms.
    pub samplers: Vec<ReflectedSampler>,
    /// Uniform blocks.
    pub uniform_blocks: Vec<ReflectedUniformBlock>,
}

/// Native rendering driver trait.
///
/// All calls happen on the thread that owns the device. Calls that create
/// objects return a handle or an error; state setters are infallible.
pub trait RenderBackend {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    // ------------------------------------------------------------------------
    // Context
    // ------------------------------------------------------------------------

    /// Create the rendering context for a window.
    fn create_context(
        &mut self,
        window: &dyn Window,
        multisample: u32,
    ) -> Result<DeviceCapabilities, BackendError>;

    /// Destroy the rendering context. All native objects become invalid.
    fn destroy_context(&mut self);

    /// Whether a context exists.
    fn has_context(&self) -> bool;

    /// Set the swap interval.
    fn set_vsync(&mut self, enable: bool);

    /// Present the backbuffer.
    fn present(&mut self);

    // ------------------------------------------------------------------------
    // Buffers
    // ------------------------------------------------------------------------

    /// Create a buffer of `size` bytes, optionally with initial contents.
    fn create_buffer(
        &mut self,
        target: BufferTarget,
        size: usize,
        usage: ResourceUsage,
        data: Option<&[u8]>,
    ) -> Result<NativeHandle, BackendError>;

    /// Write `data` at `offset`. `whole` is set when the write covers the buffer.
    fn update_buffer(
        &mut self,
        target: BufferTarget,
        buffer: NativeHandle,
        offset: usize,
        data: &[u8],
        whole: bool,
    ) -> Result<(), BackendError>;

    /// Destroy a buffer.
    fn destroy_buffer(&mut self, target: BufferTarget, buffer: NativeHandle);

    // ------------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------------

    /// Create texture storage.
    fn create_texture(&mut self, desc: &NativeTextureDesc) -> Result<NativeHandle, BackendError>;

    /// Upload one region of one level.
    fn update_texture(
        &mut self,
        texture: NativeHandle,
        texture_type: TextureType,
        format: ImageFormat,
        update: &TextureUpdate<'_>,
    ) -> Result<(), BackendError>;

    /// Apply sampling parameters to a texture.
    fn set_texture_sampler(
        &mut self,
        texture: NativeHandle,
        texture_type: TextureType,
        sampler: &SamplerDescriptor,
    ) -> Result<(), BackendError>;

    /// Destroy a texture.
    fn destroy_texture(&mut self, texture: NativeHandle);

    // ------------------------------------------------------------------------
    // Shaders and programs
    // ------------------------------------------------------------------------

    /// Compile one shader stage. On failure returns the compiler log.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<NativeHandle, String>;

    /// Destroy a shader object.
    fn destroy_shader(&mut self, shader: NativeHandle);

    /// Link a program. On failure returns the linker log.
    fn link_program(&mut self, vs: NativeHandle, ps: NativeHandle)
    -> Result<NativeHandle, String>;

    /// Enumerate the active attributes, samplers and uniform blocks of a program.
    fn program_reflection(&self, program: NativeHandle) -> ProgramReflection;

    /// Assign a texture unit to a sampler uniform.
    fn set_program_sampler_unit(&mut self, program: NativeHandle, location: u32, unit: u32);

    /// Assign a binding point to a uniform block.
    fn set_program_block_binding(&mut self, program: NativeHandle, block_index: u32, binding: u32);

    /// Make a program current, or none.
    fn use_program(&mut self, program: Option<NativeHandle>);

    /// Destroy a program.
    fn destroy_program(&mut self, program: NativeHandle);

    // ------------------------------------------------------------------------
    // Framebuffers
    // ------------------------------------------------------------------------

    /// Create a framebuffer object.
    fn create_framebuffer(&mut self) -> Result<NativeHandle, BackendError>;

    /// Bind a framebuffer, or the backbuffer when `None`.
    fn bind_framebuffer(&mut self, framebuffer: Option<NativeHandle>);

    /// Attach a color texture to a slot of the bound framebuffer.
    fn attach_color(&mut self, slot: usize, texture: Option<NativeHandle>);

    /// Attach a depth or depth-stencil texture to the bound framebuffer.
    fn attach_depth_stencil(&mut self, texture: Option<NativeHandle>, has_stencil: bool);

    /// Set which color attachments are drawn to, one bit per slot.
    fn set_draw_buffers(&mut self, mask: u32);

    /// Destroy a framebuffer.
    fn destroy_framebuffer(&mut self, framebuffer: NativeHandle);

    // ------------------------------------------------------------------------
    // Bindings
    // ------------------------------------------------------------------------

    /// Bind the vertex buffer subsequent attribute pointers read from.
    fn bind_vertex_buffer(&mut self, buffer: Option<NativeHandle>);

    /// Point an attribute location at the bound vertex buffer.
    fn set_vertex_attribute(
        &mut self,
        location: u32,
        element_type: ElementType,
        stride: usize,
        offset: usize,
    );

    /// Enable or disable an attribute location.
    fn enable_vertex_attribute(&mut self, location: u32, enable: bool);

    /// Set the instance divisor of an attribute location.
    fn set_vertex_attribute_divisor(&mut self, location: u32, divisor: u32);

    /// Bind the index buffer.
    fn bind_index_buffer(&mut self, buffer: Option<NativeHandle>);

    /// Bind a uniform buffer to a binding point.
    fn bind_constant_buffer(&mut self, binding: usize, buffer: Option<NativeHandle>);

    /// Bind a texture to a texture unit.
    fn bind_texture(&mut self, unit: usize, texture: Option<(NativeHandle, TextureType)>);

    // ------------------------------------------------------------------------
    // Fixed-function state
    // ------------------------------------------------------------------------

    /// Set the viewport, bottom-left origin.
    fn set_viewport(&mut self, x: i32, y: i32, width: i32, height: i32);

    /// Set the scissor rectangle, bottom-left origin.
    fn set_scissor_rect(&mut self, x: i32, y: i32, width: i32, height: i32);

    /// Enable or disable blending.
    fn set_blend_enable(&mut self, enable: bool);

    /// Set separate color and alpha blend factors.
    fn set_blend_func(
        &mut self,
        src: BlendFactor,
        dest: BlendFactor,
        src_alpha: BlendFactor,
        dest_alpha: BlendFactor,
    );

    /// Set separate color and alpha blend operations.
    fn set_blend_op(&mut self, op: BlendOp, op_alpha: BlendOp);

    /// Set the written color channels.
    fn set_color_write_mask(&mut self, mask: ColorWriteMask);

    /// Enable or disable alpha to coverage.
    fn set_alpha_to_coverage(&mut self, enable: bool);

    /// Enable or disable the depth test.
    fn set_depth_test(&mut self, enable: bool);

    /// Enable or disable depth writes.
    fn set_depth_write(&mut self, enable: bool);

    /// Set the depth comparison function.
    fn set_depth_func(&mut self, func: CompareMode);

    /// Enable or disable the stencil test.
    fn set_stencil_test(&mut self, enable: bool);

    /// Set the stencil function of one face.
    fn set_stencil_func(&mut self, face: NativeFace, func: CompareMode, reference: u8, mask: u8);

    /// Set the stencil operations of one face.
    fn set_stencil_op(
        &mut self,
        face: NativeFace,
        fail: StencilOp,
        depth_fail: StencilOp,
        pass: StencilOp,
    );

    /// Set the stencil write mask.
    fn set_stencil_write_mask(&mut self, mask: u8);

    /// Set the polygon fill mode.
    fn set_fill_mode(&mut self, mode: FillMode);

    /// Cull the given face, or disable culling.
    fn set_cull_face(&mut self, face: Option<NativeFace>);

    /// Set the polygon offset. A zero bias disables it.
    fn set_depth_bias(&mut self, constant: f32, slope_scaled: f32, clamp: f32);

    /// Enable or disable depth clamping, the inverse of depth clipping.
    fn set_depth_clamp(&mut self, enable: bool);

    /// Enable or disable the scissor test.
    fn set_scissor_test(&mut self, enable: bool);

    /// Enable or disable multisample rasterization.
    fn set_multisample(&mut self, enable: bool);

    /// Enable or disable antialiased lines.
    fn set_line_smooth(&mut self, enable: bool);

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Clear the bound framebuffer.
    fn clear(&mut self, flags: ClearFlags, color: Color, depth: f32, stencil: u8);

    /// Draw non-indexed geometry.
    fn draw(&mut self, primitive: PrimitiveType, vertex_start: usize, vertex_count: usize);

    /// Draw indexed geometry.
    fn draw_indexed(
        &mut self,
        primitive: PrimitiveType,
        index_start: usize,
        index_count: usize,
        index_size: usize,
        base_vertex: usize,
    );

    /// Draw instanced non-indexed geometry.
    fn draw_instanced(
        &mut self,
        primitive: PrimitiveType,
        vertex_start: usize,
        vertex_count: usize,
        instance_count: usize,
    );

    /// Draw instanced indexed geometry.
    #[allow(clippy::too_many_arguments)]
    fn draw_indexed_instanced(
        &mut self,
        primitive: PrimitiveType,
        index_start: usize,
        index_count: usize,
        index_size: usize,
        base_vertex: usize,
        instance_count: usize,
    );
}
