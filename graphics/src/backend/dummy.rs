//! Dummy rendering backend for testing and development.
//!
//! This backend doesn't talk to a GPU. It keeps an in-memory model of the
//! native objects and of the last applied fixed-function state, and counts
//! every native call so tests can observe how much driver traffic the
//! device generates.

use std::collections::HashMap;

use ember_core::Color;

use crate::settings::DeviceCapabilities;
use crate::types::{
    BlendFactor, BlendOp, ClearFlags, ColorWriteMask, CompareMode, ElementType, FillMode,
    ImageFormat, MAX_CONSTANT_BUFFERS, MAX_RENDERTARGETS, MAX_SHADER_STAGES, MAX_TEXTURE_UNITS,
    MAX_VERTEX_ATTRIBUTES, PrimitiveType, ResourceUsage, SamplerDescriptor, ShaderStage,
    StencilOp, TextureType,
};
use crate::window::Window;

use super::{
    BackendError, BufferTarget, NativeFace, NativeHandle, NativeTextureDesc, ProgramReflection,
    ReflectedAttribute, ReflectedSampler, ReflectedUniformBlock, RenderBackend, TextureUpdate,
};

/// Native call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DummyStats {
    /// Successful context creations.
    pub context_creations: usize,
    /// Present calls.
    pub presents: usize,
    /// Buffers created.
    pub buffer_creates: usize,
    /// Buffer updates.
    pub buffer_updates: usize,
    /// Textures created.
    pub texture_creates: usize,
    /// Texture uploads.
    pub texture_updates: usize,
    /// Sampler parameter applications.
    pub sampler_updates: usize,
    /// Shader compile calls.
    pub compile_calls: usize,
    /// Program link calls.
    pub link_calls: usize,
    /// Program binds.
    pub program_binds: usize,
    /// Framebuffers created.
    pub framebuffer_creates: usize,
    /// Framebuffer binds, including the backbuffer.
    pub framebuffer_binds: usize,
    /// Color and depth-stencil attachment changes.
    pub attachment_changes: usize,
    /// Draw buffer mask changes.
    pub draw_buffer_changes: usize,
    /// Vertex buffer binds.
    pub vertex_buffer_binds: usize,
    /// Vertex attribute pointer calls.
    pub attribute_pointer_calls: usize,
    /// Index buffer binds.
    pub index_buffer_binds: usize,
    /// Constant buffer binds.
    pub constant_buffer_binds: usize,
    /// Texture binds.
    pub texture_binds: usize,
    /// Fixed-function state calls.
    pub state_calls: usize,
    /// Clear calls.
    pub clears: usize,
    /// Draw calls of any kind.
    pub draw_calls: usize,
}

/// A recorded draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRecord {
    /// Primitive type.
    pub primitive: PrimitiveType,
    /// First vertex or index.
    pub start: usize,
    /// Vertex or index count.
    pub count: usize,
    /// Index size in bytes, 0 for non-indexed draws.
    pub index_size: usize,
    /// Base vertex for indexed draws.
    pub base_vertex: usize,
    /// Instance count, 0 for non-instanced draws.
    pub instance_count: usize,
}

/// One vertex attribute pointer as last set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributePointer {
    /// Source buffer.
    pub buffer: Option<NativeHandle>,
    /// Element type.
    pub element_type: ElementType,
    /// Vertex stride.
    pub stride: usize,
    /// Byte offset.
    pub offset: usize,
}

/// Stencil configuration of one native face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DummyStencilFace {
    /// Comparison function.
    pub func: CompareMode,
    /// Reference value.
    pub reference: u8,
    /// Read mask.
    pub mask: u8,
    /// Fail operation.
    pub fail: StencilOp,
    /// Depth-fail operation.
    pub depth_fail: StencilOp,
    /// Pass operation.
    pub pass: StencilOp,
}

impl Default for DummyStencilFace {
    fn default() -> Self {
        Self {
            func: CompareMode::Always,
            reference: 0,
            mask: 0xff,
            fail: StencilOp::Keep,
            depth_fail: StencilOp::Keep,
            pass: StencilOp::Keep,
        }
    }
}

/// Native state as last applied through the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct DummyState {
    /// Bound framebuffer, `None` for the backbuffer.
    pub framebuffer: Option<NativeHandle>,
    /// Current program.
    pub program: Option<NativeHandle>,
    /// Vertex buffer attribute pointers read from.
    pub vertex_buffer: Option<NativeHandle>,
    /// Bound index buffer.
    pub index_buffer: Option<NativeHandle>,
    /// Uniform buffer binding points.
    pub constant_buffers: [Option<NativeHandle>; MAX_CONSTANT_BUFFERS * MAX_SHADER_STAGES],
    /// Texture units.
    pub textures: [Option<NativeHandle>; MAX_TEXTURE_UNITS],
    /// Attribute pointers per location.
    pub attributes: [Option<AttributePointer>; MAX_VERTEX_ATTRIBUTES],
    /// Attribute enable flags per location.
    pub attribute_enabled: [bool; MAX_VERTEX_ATTRIBUTES],
    /// Attribute divisors per location.
    pub attribute_divisors: [u32; MAX_VERTEX_ATTRIBUTES],
    /// Viewport as `(x, y, width, height)`, bottom-left origin.
    pub viewport: (i32, i32, i32, i32),
    /// Scissor rectangle as `(x, y, width, height)`, bottom-left origin.
    pub scissor: (i32, i32, i32, i32),
    /// Blend enable.
    pub blend_enable: bool,
    /// Blend factors `(src, dest, src_alpha, dest_alpha)`.
    pub blend_func: (BlendFactor, BlendFactor, BlendFactor, BlendFactor),
    /// Blend operations `(color, alpha)`.
    pub blend_op: (BlendOp, BlendOp),
    /// Color write mask.
    pub color_write_mask: ColorWriteMask,
    /// Alpha to coverage.
    pub alpha_to_coverage: bool,
    /// Depth test.
    pub depth_test: bool,
    /// Depth write.
    pub depth_write: bool,
    /// Depth function.
    pub depth_func: CompareMode,
    /// Stencil test.
    pub stencil_test: bool,
    /// Native front face stencil configuration.
    pub stencil_front: DummyStencilFace,
    /// Native back face stencil configuration.
    pub stencil_back: DummyStencilFace,
    /// Stencil write mask.
    pub stencil_write_mask: u8,
    /// Fill mode.
    pub fill_mode: FillMode,
    /// Culled face.
    pub cull_face: Option<NativeFace>,
    /// Depth bias `(constant, slope_scaled, clamp)`.
    pub depth_bias: (f32, f32, f32),
    /// Depth clamp.
    pub depth_clamp: bool,
    /// Scissor test.
    pub scissor_test: bool,
    /// Multisample rasterization.
    pub multisample: bool,
    /// Line smoothing.
    pub line_smooth: bool,
    /// Swap interval.
    pub vsync: bool,
}

impl Default for DummyState {
    fn default() -> Self {
        Self {
            framebuffer: None,
            program: None,
            vertex_buffer: None,
            index_buffer: None,
            constant_buffers: [None; MAX_CONSTANT_BUFFERS * MAX_SHADER_STAGES],
            textures: [None; MAX_TEXTURE_UNITS],
            attributes: [None; MAX_VERTEX_ATTRIBUTES],
            attribute_enabled: [false; MAX_VERTEX_ATTRIBUTES],
            attribute_divisors: [0; MAX_VERTEX_ATTRIBUTES],
            viewport: (0, 0, 0, 0),
            scissor: (0, 0, 0, 0),
            blend_enable: false,
            blend_func: (
                BlendFactor::One,
                BlendFactor::Zero,
                BlendFactor::One,
                BlendFactor::Zero,
            ),
            blend_op: (BlendOp::Add, BlendOp::Add),
            color_write_mask: ColorWriteMask::ALL,
            alpha_to_coverage: false,
            depth_test: false,
            depth_write: true,
            depth_func: CompareMode::Less,
            stencil_test: false,
            stencil_front: DummyStencilFace::default(),
            stencil_back: DummyStencilFace::default(),
            stencil_write_mask: 0xff,
            fill_mode: FillMode::Solid,
            cull_face: None,
            depth_bias: (0.0, 0.0, 0.0),
            depth_clamp: false,
            scissor_test: false,
            multisample: true,
            line_smooth: false,
            vsync: false,
        }
    }
}

#[derive(Debug, Clone)]
struct DummyShader {
    stage: ShaderStage,
    source: String,
}

#[derive(Debug, Clone)]
struct DummyProgram {
    reflection: ProgramReflection,
    sampler_units: HashMap<u32, u32>,
    block_bindings: HashMap<u32, u32>,
}

#[derive(Debug, Clone, Default)]
struct DummyFramebuffer {
    colors: [Option<NativeHandle>; MAX_RENDERTARGETS],
    depth_stencil: Option<NativeHandle>,
    draw_buffers: u32,
}

/// Dummy rendering backend.
#[derive(Debug, Default)]
pub struct DummyBackend {
    context: bool,
    multisample: u32,
    next_handle: u32,
    fail_resource_creation: bool,
    fail_context_creation: bool,
    buffers: HashMap<NativeHandle, Vec<u8>>,
    textures: HashMap<NativeHandle, NativeTextureDesc>,
    shaders: HashMap<NativeHandle, DummyShader>,
    programs: HashMap<NativeHandle, DummyProgram>,
    framebuffers: HashMap<NativeHandle, DummyFramebuffer>,
    state: DummyState,
    stats: DummyStats,
    last_draw: Option<DrawRecord>,
    last_clear: Option<(ClearFlags, Color, f32, u8)>,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following buffer, texture and framebuffer creation fail.
    pub fn set_fail_resource_creation(&mut self, fail: bool) {
        self.fail_resource_creation = fail;
    }

    /// Make every following context creation fail.
    pub fn set_fail_context_creation(&mut self, fail: bool) {
        self.fail_context_creation = fail;
    }

    /// Native call counters.
    pub fn stats(&self) -> &DummyStats {
        &self.stats
    }

    /// Reset the native call counters.
    pub fn reset_stats(&mut self) {
        self.stats = DummyStats::default();
    }

    /// Native state as last applied.
    pub fn state(&self) -> &DummyState {
        &self.state
    }

    /// The multisample level of the current context.
    pub fn multisample(&self) -> u32 {
        self.multisample
    }

    /// Contents of a live buffer.
    pub fn buffer_data(&self, buffer: NativeHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    /// Storage description of a live texture.
    pub fn texture_desc(&self, texture: NativeHandle) -> Option<&NativeTextureDesc> {
        self.textures.get(&texture)
    }

    /// Texture unit assigned to a sampler uniform of a program.
    pub fn sampler_unit(&self, program: NativeHandle, location: u32) -> Option<u32> {
        self.programs
            .get(&program)
            .and_then(|p| p.sampler_units.get(&location).copied())
    }

    /// Binding point assigned to a uniform block of a program.
    pub fn block_binding(&self, program: NativeHandle, block_index: u32) -> Option<u32> {
        self.programs
            .get(&program)
            .and_then(|p| p.block_bindings.get(&block_index).copied())
    }

    /// Color attachments of a framebuffer.
    pub fn framebuffer_colors(
        &self,
        framebuffer: NativeHandle,
    ) -> Option<[Option<NativeHandle>; MAX_RENDERTARGETS]> {
        self.framebuffers.get(&framebuffer).map(|fb| fb.colors)
    }

    /// Depth-stencil attachment of a framebuffer.
    pub fn framebuffer_depth_stencil(&self, framebuffer: NativeHandle) -> Option<NativeHandle> {
        self.framebuffers
            .get(&framebuffer)
            .and_then(|fb| fb.depth_stencil)
    }

    /// Draw buffer mask of a framebuffer.
    pub fn framebuffer_draw_buffers(&self, framebuffer: NativeHandle) -> Option<u32> {
        self.framebuffers.get(&framebuffer).map(|fb| fb.draw_buffers)
    }

    /// Number of live buffers.
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Number of live textures.
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Number of live shader objects.
    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    /// Number of live programs.
    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// Number of live framebuffers.
    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.len()
    }

    /// The most recent draw call.
    pub fn last_draw(&self) -> Option<DrawRecord> {
        self.last_draw
    }

    /// The most recent clear as `(flags, color, depth, stencil)`.
    pub fn last_clear(&self) -> Option<(ClearFlags, Color, f32, u8)> {
        self.last_clear
    }

    fn allocate_handle(&mut self) -> NativeHandle {
        self.next_handle += 1;
        NativeHandle(self.next_handle)
    }

    fn check_resource_creation(&self, what: &str) -> Result<(), BackendError> {
        if !self.context {
            return Err(BackendError::ContextLost);
        }
        if self.fail_resource_creation {
            return Err(BackendError::ResourceCreationFailed(format!(
                "{what} creation disabled"
            )));
        }
        Ok(())
    }

    fn stencil_face_mut(&mut self, face: NativeFace) -> &mut DummyStencilFace {
        match face {
            NativeFace::Front => &mut self.state.stencil_front,
            NativeFace::Back => &mut self.state.stencil_back,
        }
    }

    fn record_draw(&mut self, record: DrawRecord) {
        log::trace!("DummyBackend: draw {:?}", record);
        self.stats.draw_calls += 1;
        self.last_draw = Some(record);
    }
}

/// Name of the last identifier on a declaration line, without trailing `;`, `{` or array suffix.
fn declared_name(line: &str) -> Option<&str> {
    let last = line.split_whitespace().last()?;
    let name = last.trim_end_matches([';', '{']);
    let name = name.split('[').next().unwrap_or(name);
    if name.is_empty() { None } else { Some(name) }
}

/// Scan GLSL-like sources for attributes, samplers and uniform blocks.
fn reflect_sources(vs: &str, ps: &str) -> ProgramReflection {
    let mut reflection = ProgramReflection::default();

    for line in vs.lines().map(str::trim) {
        if line.starts_with("in ") || line.starts_with("attribute ") {
            if let Some(name) = declared_name(line) {
                let location = reflection.attributes.len() as u32;
                reflection.attributes.push(ReflectedAttribute {
                    name: name.to_string(),
                    location,
                });
            }
        }
    }

    for source in [vs, ps] {
        for line in source.lines().map(str::trim) {
            let mut tokens = line.split_whitespace();
            if tokens.next() != Some("uniform") {
                continue;
            }
            let Some(second) = tokens.next() else {
                continue;
            };

            if second.starts_with("sampler") {
                if let Some(name) = declared_name(line) {
                    if !reflection.samplers.iter().any(|s| s.name == name) {
                        let location = reflection.samplers.len() as u32;
                        reflection.samplers.push(ReflectedSampler {
                            name: name.to_string(),
                            location,
                        });
                    }
                }
            } else if !line.ends_with(';') {
                let name = second.trim_end_matches('{');
                if !name.is_empty() && !reflection.uniform_blocks.iter().any(|b| b.name == name) {
                    let index = reflection.uniform_blocks.len() as u32;
                    reflection.uniform_blocks.push(ReflectedUniformBlock {
                        name: name.to_string(),
                        index,
                    });
                }
            }
        }
    }

    reflection
}

impl RenderBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn create_context(
        &mut self,
        window: &dyn Window,
        multisample: u32,
    ) -> Result<DeviceCapabilities, BackendError> {
        if self.fail_context_creation {
            return Err(BackendError::ContextCreationFailed(
                "context creation disabled".to_string(),
            ));
        }
        if !window.is_open() {
            return Err(BackendError::ContextCreationFailed(
                "window is not open".to_string(),
            ));
        }

        log::trace!(
            "DummyBackend: creating context {}x{} (multisample {})",
            window.size().x,
            window.size().y,
            multisample
        );
        self.context = true;
        self.multisample = multisample;
        self.state = DummyState::default();
        self.stats.context_creations += 1;
        Ok(DeviceCapabilities::default())
    }

    fn destroy_context(&mut self) {
        log::trace!("DummyBackend: destroying context");
        self.context = false;
        self.multisample = 0;
        self.buffers.clear();
        self.textures.clear();
        self.shaders.clear();
        self.programs.clear();
        self.framebuffers.clear();
        self.state = DummyState::default();
    }

    fn has_context(&self) -> bool {
        self.context
    }

    fn set_vsync(&mut self, enable: bool) {
        self.state.vsync = enable;
    }

    fn present(&mut self) {
        self.stats.presents += 1;
    }

    fn create_buffer(
        &mut self,
        target: BufferTarget,
        size: usize,
        usage: ResourceUsage,
        data: Option<&[u8]>,
    ) -> Result<NativeHandle, BackendError> {
        self.check_resource_creation("buffer")?;
        if data.is_some_and(|d| d.len() < size) {
            return Err(BackendError::InvalidParameter(
                "initial data smaller than buffer".to_string(),
            ));
        }

        let handle = self.allocate_handle();
        let contents = match data {
            Some(d) => d[..size].to_vec(),
            None => vec![0; size],
        };
        log::trace!(
            "DummyBackend: creating {:?} buffer {:?} ({} bytes, {:?})",
            target,
            handle,
            size,
            usage
        );
        self.buffers.insert(handle, contents);
        self.stats.buffer_creates += 1;
        Ok(handle)
    }

    fn update_buffer(
        &mut self,
        _target: BufferTarget,
        buffer: NativeHandle,
        offset: usize,
        data: &[u8],
        _whole: bool,
    ) -> Result<(), BackendError> {
        let contents = self
            .buffers
            .get_mut(&buffer)
            .ok_or(BackendError::InvalidHandle)?;
        let end = offset + data.len();
        if end > contents.len() {
            return Err(BackendError::InvalidParameter(format!(
                "write of {} bytes at {} exceeds buffer size {}",
                data.len(),
                offset,
                contents.len()
            )));
        }
        contents[offset..end].copy_from_slice(data);
        self.stats.buffer_updates += 1;
        Ok(())
    }

    fn destroy_buffer(&mut self, _target: BufferTarget, buffer: NativeHandle) {
        self.buffers.remove(&buffer);
        if self.state.vertex_buffer == Some(buffer) {
            self.state.vertex_buffer = None;
        }
        if self.state.index_buffer == Some(buffer) {
            self.state.index_buffer = None;
        }
        for binding in self.state.constant_buffers.iter_mut() {
            if *binding == Some(buffer) {
                *binding = None;
            }
        }
    }

    fn create_texture(&mut self, desc: &NativeTextureDesc) -> Result<NativeHandle, BackendError> {
        self.check_resource_creation("texture")?;
        let handle = self.allocate_handle();
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{}, {:?}, {} levels)",
            handle,
            desc.width,
            desc.height,
            desc.format,
            desc.num_levels
        );
        self.textures.insert(handle, *desc);
        self.stats.texture_creates += 1;
        Ok(handle)
    }

    fn update_texture(
        &mut self,
        texture: NativeHandle,
        _texture_type: TextureType,
        _format: ImageFormat,
        update: &TextureUpdate<'_>,
    ) -> Result<(), BackendError> {
        if !self.textures.contains_key(&texture) {
            return Err(BackendError::InvalidHandle);
        }
        log::trace!(
            "DummyBackend: updating texture {:?} face {} level {} rect {}",
            texture,
            update.face,
            update.level,
            update.rect
        );
        self.stats.texture_updates += 1;
        Ok(())
    }

    fn set_texture_sampler(
        &mut self,
        texture: NativeHandle,
        _texture_type: TextureType,
        sampler: &SamplerDescriptor,
    ) -> Result<(), BackendError> {
        if !self.textures.contains_key(&texture) {
            return Err(BackendError::InvalidHandle);
        }
        log::trace!(
            "DummyBackend: sampler {:?} for texture {:?}",
            sampler.filter,
            texture
        );
        self.stats.sampler_updates += 1;
        Ok(())
    }

    fn destroy_texture(&mut self, texture: NativeHandle) {
        self.textures.remove(&texture);
        for unit in self.state.textures.iter_mut() {
            if *unit == Some(texture) {
                *unit = None;
            }
        }
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<NativeHandle, String> {
        self.stats.compile_calls += 1;
        if !self.context {
            return Err("no rendering context".to_string());
        }
        if let Some(line) = source.lines().find(|l| l.trim_start().starts_with("#error")) {
            return Err(format!("0:1: error: {}", line.trim()));
        }

        let handle = self.allocate_handle();
        log::trace!("DummyBackend: compiled {} shader {:?}", stage.name(), handle);
        self.shaders.insert(
            handle,
            DummyShader {
                stage,
                source: source.to_string(),
            },
        );
        Ok(handle)
    }

    fn destroy_shader(&mut self, shader: NativeHandle) {
        self.shaders.remove(&shader);
    }

    fn link_program(
        &mut self,
        vs: NativeHandle,
        ps: NativeHandle,
    ) -> Result<NativeHandle, String> {
        self.stats.link_calls += 1;
        let (Some(vs), Some(ps)) = (self.shaders.get(&vs), self.shaders.get(&ps)) else {
            return Err("invalid shader object".to_string());
        };
        if vs.stage != ShaderStage::Vertex || ps.stage != ShaderStage::Pixel {
            return Err("shader stages do not match".to_string());
        }
        if !vs.source.contains("void main") || !ps.source.contains("void main") {
            return Err("error: missing main function".to_string());
        }

        let reflection = reflect_sources(&vs.source, &ps.source);
        let handle = self.allocate_handle();
        log::trace!(
            "DummyBackend: linked program {:?} ({} attributes, {} samplers, {} blocks)",
            handle,
            reflection.attributes.len(),
            reflection.samplers.len(),
            reflection.uniform_blocks.len()
        );
        self.programs.insert(
            handle,
            DummyProgram {
                reflection,
                sampler_units: HashMap::new(),
                block_bindings: HashMap::new(),
            },
        );
        Ok(handle)
    }

    fn program_reflection(&self, program: NativeHandle) -> ProgramReflection {
        self.programs
            .get(&program)
            .map(|p| p.reflection.clone())
            .unwrap_or_default()
    }

    fn set_program_sampler_unit(&mut self, program: NativeHandle, location: u32, unit: u32) {
        if let Some(p) = self.programs.get_mut(&program) {
            p.sampler_units.insert(location, unit);
        }
    }

    fn set_program_block_binding(&mut self, program: NativeHandle, block_index: u32, binding: u32) {
        if let Some(p) = self.programs.get_mut(&program) {
            p.block_bindings.insert(block_index, binding);
        }
    }

    fn use_program(&mut self, program: Option<NativeHandle>) {
        self.state.program = program;
        self.stats.program_binds += 1;
    }

    fn destroy_program(&mut self, program: NativeHandle) {
        self.programs.remove(&program);
        if self.state.program == Some(program) {
            self.state.program = None;
        }
    }

    fn create_framebuffer(&mut self) -> Result<NativeHandle, BackendError> {
        self.check_resource_creation("framebuffer")?;
        let handle = self.allocate_handle();
        log::trace!("DummyBackend: creating framebuffer {:?}", handle);
        self.framebuffers.insert(handle, DummyFramebuffer::default());
        self.stats.framebuffer_creates += 1;
        Ok(handle)
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<NativeHandle>) {
        self.state.framebuffer = framebuffer;
        self.stats.framebuffer_binds += 1;
    }

    fn attach_color(&mut self, slot: usize, texture: Option<NativeHandle>) {
        if let Some(fb) = self
            .state
            .framebuffer
            .and_then(|h| self.framebuffers.get_mut(&h))
        {
            if slot < MAX_RENDERTARGETS {
                fb.colors[slot] = texture;
                self.stats.attachment_changes += 1;
            }
        }
    }

    fn attach_depth_stencil(&mut self, texture: Option<NativeHandle>, _has_stencil: bool) {
        if let Some(fb) = self
            .state
            .framebuffer
            .and_then(|h| self.framebuffers.get_mut(&h))
        {
            fb.depth_stencil = texture;
            self.stats.attachment_changes += 1;
        }
    }

    fn set_draw_buffers(&mut self, mask: u32) {
        if let Some(fb) = self
            .state
            .framebuffer
            .and_then(|h| self.framebuffers.get_mut(&h))
        {
            fb.draw_buffers = mask;
            self.stats.draw_buffer_changes += 1;
        }
    }

    fn destroy_framebuffer(&mut self, framebuffer: NativeHandle) {
        self.framebuffers.remove(&framebuffer);
        if self.state.framebuffer == Some(framebuffer) {
            self.state.framebuffer = None;
        }
    }

    fn bind_vertex_buffer(&mut self, buffer: Option<NativeHandle>) {
        self.state.vertex_buffer = buffer;
        self.stats.vertex_buffer_binds += 1;
    }

    fn set_vertex_attribute(
        &mut self,
        location: u32,
        element_type: ElementType,
        stride: usize,
        offset: usize,
    ) {
        if let Some(slot) = self.state.attributes.get_mut(location as usize) {
            *slot = Some(AttributePointer {
                buffer: self.state.vertex_buffer,
                element_type,
                stride,
                offset,
            });
        }
        self.stats.attribute_pointer_calls += 1;
    }

    fn enable_vertex_attribute(&mut self, location: u32, enable: bool) {
        if let Some(slot) = self.state.attribute_enabled.get_mut(location as usize) {
            *slot = enable;
        }
    }

    fn set_vertex_attribute_divisor(&mut self, location: u32, divisor: u32) {
        if let Some(slot) = self.state.attribute_divisors.get_mut(location as usize) {
            *slot = divisor;
        }
    }

    fn bind_index_buffer(&mut self, buffer: Option<NativeHandle>) {
        self.state.index_buffer = buffer;
        self.stats.index_buffer_binds += 1;
    }

    fn bind_constant_buffer(&mut self, binding: usize, buffer: Option<NativeHandle>) {
        if let Some(slot) = self.state.constant_buffers.get_mut(binding) {
            *slot = buffer;
        }
        self.stats.constant_buffer_binds += 1;
    }

    fn bind_texture(&mut self, unit: usize, texture: Option<(NativeHandle, TextureType)>) {
        if let Some(slot) = self.state.textures.get_mut(unit) {
            *slot = texture.map(|(handle, _)| handle);
        }
        self.stats.texture_binds += 1;
    }

    fn set_viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.state.viewport = (x, y, width, height);
        self.stats.state_calls += 1;
    }

    fn set_scissor_rect(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.state.scissor = (x, y, width, height);
        self.stats.state_calls += 1;
    }

    fn set_blend_enable(&mut self, enable: bool) {
        self.state.blend_enable = enable;
        self.stats.state_calls += 1;
    }

    fn set_blend_func(
        &mut self,
        src: BlendFactor,
        dest: BlendFactor,
        src_alpha: BlendFactor,
        dest_alpha: BlendFactor,
    ) {
        self.state.blend_func = (src, dest, src_alpha, dest_alpha);
        self.stats.state_calls += 1;
    }

    fn set_blend_op(&mut self, op: BlendOp, op_alpha: BlendOp) {
        self.state.blend_op = (op, op_alpha);
        self.stats.state_calls += 1;
    }

    fn set_color_write_mask(&mut self, mask: ColorWriteMask) {
        self.state.color_write_mask = mask;
        self.stats.state_calls += 1;
    }

    fn set_alpha_to_coverage(&mut self, enable: bool) {
        self.state.alpha_to_coverage = enable;
        self.stats.state_calls += 1;
    }

    fn set_depth_test(&mut self, enable: bool) {
        self.state.depth_test = enable;
        self.stats.state_calls += 1;
    }

    fn set_depth_write(&mut self, enable: bool) {
        self.state.depth_write = enable;
        self.stats.state_calls += 1;
    }

    fn set_depth_func(&mut self, func: CompareMode) {
        self.state.depth_func = func;
        self.stats.state_calls += 1;
    }

    fn set_stencil_test(&mut self, enable: bool) {
        self.state.stencil_test = enable;
        self.stats.state_calls += 1;
    }

    fn set_stencil_func(&mut self, face: NativeFace, func: CompareMode, reference: u8, mask: u8) {
        let state = self.stencil_face_mut(face);
        state.func = func;
        state.reference = reference;
        state.mask = mask;
        self.stats.state_calls += 1;
    }

    fn set_stencil_op(
        &mut self,
        face: NativeFace,
        fail: StencilOp,
        depth_fail: StencilOp,
        pass: StencilOp,
    ) {
        let state = self.stencil_face_mut(face);
        state.fail = fail;
        state.depth_fail = depth_fail;
        state.pass = pass;
        self.stats.state_calls += 1;
    }

    fn set_stencil_write_mask(&mut self, mask: u8) {
        self.state.stencil_write_mask = mask;
        self.stats.state_calls += 1;
    }

    fn set_fill_mode(&mut self, mode: FillMode) {
        self.state.fill_mode = mode;
        self.stats.state_calls += 1;
    }

    fn set_cull_face(&mut self, face: Option<NativeFace>) {
        self.state.cull_face = face;
        self.stats.state_calls += 1;
    }

    fn set_depth_bias(&mut self, constant: f32, slope_scaled: f32, clamp: f32) {
        self.state.depth_bias = (constant, slope_scaled, clamp);
        self.stats.state_calls += 1;
    }

    fn set_depth_clamp(&mut self, enable: bool) {
        self.state.depth_clamp = enable;
        self.stats.state_calls += 1;
    }

    fn set_scissor_test(&mut self, enable: bool) {
        self.state.scissor_test = enable;
        self.stats.state_calls += 1;
    }

    fn set_multisample(&mut self, enable: bool) {
        self.state.multisample = enable;
        self.stats.state_calls += 1;
    }

    fn set_line_smooth(&mut self, enable: bool) {
        self.state.line_smooth = enable;
        self.stats.state_calls += 1;
    }

    fn clear(&mut self, flags: ClearFlags, color: Color, depth: f32, stencil: u8) {
        log::trace!("DummyBackend: clear {:?}", flags);
        self.last_clear = Some((flags, color, depth, stencil));
        self.stats.clears += 1;
    }

    fn draw(&mut self, primitive: PrimitiveType, vertex_start: usize, vertex_count: usize) {
        self.record_draw(DrawRecord {
            primitive,
            start: vertex_start,
            count: vertex_count,
            index_size: 0,
            base_vertex: 0,
            instance_count: 0,
        });
    }

    fn draw_indexed(
        &mut self,
        primitive: PrimitiveType,
        index_start: usize,
        index_count: usize,
        index_size: usize,
        base_vertex: usize,
    ) {
        self.record_draw(DrawRecord {
            primitive,
            start: index_start,
            count: index_count,
            index_size,
            base_vertex,
            instance_count: 0,
        });
    }

    fn draw_instanced(
        &mut self,
        primitive: PrimitiveType,
        vertex_start: usize,
        vertex_count: usize,
        instance_count: usize,
    ) {
        self.record_draw(DrawRecord {
            primitive,
            start: vertex_start,
            count: vertex_count,
            index_size: 0,
            base_vertex: 0,
            instance_count,
        });
    }

    fn draw_indexed_instanced(
        &mut self,
        primitive: PrimitiveType,
        index_start: usize,
        index_count: usize,
        index_size: usize,
        base_vertex: usize,
        instance_count: usize,
    ) {
        self.record_draw(DrawRecord {
            primitive,
            start: index_start,
            count: index_count,
            index_size,
            base_vertex,
            instance_count,
        });
    }
}
