//! Resource registry: creation, definition, updates and release of every
//! kind of GPU resource owned by the device.
//!
//! Releasing a resource first clears every device slot it occupies, so
//! bindings never refer to a released native object. Destroying a resource
//! releases it and removes it from its arena. Destroyed ids stay invalid.

use bytemuck::Pod;
use ember_core::{IntRect, IntVector2};
use slotmap::{Key, SlotMap};

use crate::backend::RenderBackend;
use crate::error::GraphicsError;
use crate::resources::{
    BlendState, BlendStateId, ConstantBuffer, ConstantBufferId, DepthState, DepthStateId,
    GpuObject, GpuResourceId, IndexBuffer, IndexBufferId, RasterizerState, RasterizerStateId,
    Texture, TextureId, VertexBuffer, VertexBufferId,
};
use crate::shader::{
    Shader, ShaderId, ShaderProgram, ShaderVariation, ShaderVariationId, normalize_defines,
};
use crate::types::{
    BlendDescriptor, Constant, DepthDescriptor, ImageFormat, ImageLevel, MAX_CONSTANT_BUFFERS,
    MAX_TEXTURE_UNITS, MAX_VERTEX_STREAMS, RasterizerDescriptor, ResourceUsage,
    SamplerDescriptor, ShaderStage, TextureType, VertexElement,
};
use crate::window::Window;

use super::{DirtyFlags, Graphics, native};

fn lookup<'a, K: Key, V>(
    arena: &'a mut SlotMap<K, V>,
    id: K,
    kind: &str,
) -> Result<&'a mut V, GraphicsError> {
    arena.get_mut(id).ok_or_else(|| {
        log::error!("Invalid {} handle", kind);
        GraphicsError::InvalidHandle
    })
}

impl<B: RenderBackend, W: Window> Graphics<B, W> {
    // ------------------------------------------------------------------------
    // Vertex buffers
    // ------------------------------------------------------------------------

    /// Create an undefined vertex buffer.
    pub fn create_vertex_buffer(&mut self) -> VertexBufferId {
        self.vertex_buffers.insert(VertexBuffer::new())
    }

    /// Define a vertex buffer. See [`VertexBuffer::define`].
    pub fn define_vertex_buffer(
        &mut self,
        id: VertexBufferId,
        usage: ResourceUsage,
        num_vertices: usize,
        elements: &[VertexElement],
        use_shadow_data: bool,
        data: Option<&[u8]>,
    ) -> Result<(), GraphicsError> {
        lookup(&mut self.vertex_buffers, id, "vertex buffer")?;
        self.unbind_vertex_buffer(id);

        let backend = native(&mut self.backend, self.window.is_open());
        let buffer = lookup(&mut self.vertex_buffers, id, "vertex buffer")?;
        buffer.define(backend, usage, num_vertices, elements, use_shadow_data, data)
    }

    /// Update a range of vertices.
    pub fn set_vertex_data(
        &mut self,
        id: VertexBufferId,
        first_vertex: usize,
        num_vertices: usize,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let backend = native(&mut self.backend, self.window.is_open());
        let buffer = lookup(&mut self.vertex_buffers, id, "vertex buffer")?;
        buffer.set_data(backend, first_vertex, num_vertices, data)
    }

    /// Release the native buffer, keeping the definition.
    pub fn release_vertex_buffer(&mut self, id: VertexBufferId) {
        self.unbind_vertex_buffer(id);
        if let Some(backend) = native(&mut self.backend, self.window.is_open())
            && let Some(buffer) = self.vertex_buffers.get_mut(id)
        {
            buffer.release(backend);
        }
    }

    /// Release and forget a vertex buffer.
    pub fn destroy_vertex_buffer(&mut self, id: VertexBufferId) {
        self.release_vertex_buffer(id);
        self.vertex_buffers.remove(id);
    }

    /// A vertex buffer.
    pub fn vertex_buffer_object(&self, id: VertexBufferId) -> Option<&VertexBuffer> {
        self.vertex_buffers.get(id)
    }

    // ------------------------------------------------------------------------
    // Index buffers
    // ------------------------------------------------------------------------

    /// Create an undefined index buffer.
    pub fn create_index_buffer(&mut self) -> IndexBufferId {
        self.index_buffers.insert(IndexBuffer::new())
    }

    /// Define an index buffer. See [`IndexBuffer::define`].
    pub fn define_index_buffer(
        &mut self,
        id: IndexBufferId,
        usage: ResourceUsage,
        num_indices: usize,
        index_size: usize,
        use_shadow_data: bool,
        data: Option<&[u8]>,
    ) -> Result<(), GraphicsError> {
        lookup(&mut self.index_buffers, id, "index buffer")?;
        self.unbind_index_buffer(id);

        let backend = native(&mut self.backend, self.window.is_open());
        let buffer = lookup(&mut self.index_buffers, id, "index buffer")?;
        buffer.define(backend, usage, num_indices, index_size, use_shadow_data, data)
    }

    /// Update a range of indices.
    pub fn set_index_data(
        &mut self,
        id: IndexBufferId,
        first_index: usize,
        num_indices: usize,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let backend = native(&mut self.backend, self.window.is_open());
        let buffer = lookup(&mut self.index_buffers, id, "index buffer")?;
        buffer.set_data(backend, first_index, num_indices, data)
    }

    /// Release the native buffer, keeping the definition.
    pub fn release_index_buffer(&mut self, id: IndexBufferId) {
        self.unbind_index_buffer(id);
        if let Some(backend) = native(&mut self.backend, self.window.is_open())
            && let Some(buffer) = self.index_buffers.get_mut(id)
        {
            buffer.release(backend);
        }
    }

    /// Release and forget an index buffer.
    pub fn destroy_index_buffer(&mut self, id: IndexBufferId) {
        self.release_index_buffer(id);
        self.index_buffers.remove(id);
    }

    /// An index buffer.
    pub fn index_buffer_object(&self, id: IndexBufferId) -> Option<&IndexBuffer> {
        self.index_buffers.get(id)
    }

    // ------------------------------------------------------------------------
    // Constant buffers
    // ------------------------------------------------------------------------

    /// Create an undefined constant buffer.
    pub fn create_constant_buffer(&mut self) -> ConstantBufferId {
        self.constant_buffers.insert(ConstantBuffer::new())
    }

    /// Define the constants of a constant buffer. See [`ConstantBuffer::define`].
    pub fn define_constant_buffer(
        &mut self,
        id: ConstantBufferId,
        usage: ResourceUsage,
        constants: &[Constant],
    ) -> Result<(), GraphicsError> {
        lookup(&mut self.constant_buffers, id, "constant buffer")?;
        self.unbind_constant_buffer(id);

        let backend = native(&mut self.backend, self.window.is_open());
        let buffer = lookup(&mut self.constant_buffers, id, "constant buffer")?;
        buffer.define(backend, usage, constants)
    }

    /// Set a constant by index in the shadow copy. Uploaded by [`apply_constant_buffer`](Self::apply_constant_buffer).
    pub fn set_constant<T: Pod>(
        &mut self,
        id: ConstantBufferId,
        index: usize,
        value: &T,
    ) -> Result<(), GraphicsError> {
        lookup(&mut self.constant_buffers, id, "constant buffer")?.set_constant(index, value)
    }

    /// Set a constant by name in the shadow copy.
    pub fn set_constant_by_name<T: Pod>(
        &mut self,
        id: ConstantBufferId,
        name: &str,
        value: &T,
    ) -> Result<(), GraphicsError> {
        lookup(&mut self.constant_buffers, id, "constant buffer")?.set_constant_by_name(name, value)
    }

    /// Set raw bytes of a constant. A `num_elements` of 0 writes every element.
    pub fn set_constant_raw(
        &mut self,
        id: ConstantBufferId,
        index: usize,
        data: &[u8],
        num_elements: usize,
    ) -> Result<(), GraphicsError> {
        lookup(&mut self.constant_buffers, id, "constant buffer")?.set_constant_raw(
            index,
            data,
            num_elements,
        )
    }

    /// Replace the whole contents of a constant buffer.
    pub fn set_constant_buffer_data(
        &mut self,
        id: ConstantBufferId,
        data: &[u8],
        copy_to_shadow: bool,
    ) -> Result<(), GraphicsError> {
        let backend = native(&mut self.backend, self.window.is_open());
        let buffer = lookup(&mut self.constant_buffers, id, "constant buffer")?;
        buffer.set_data(backend, data, copy_to_shadow)
    }

    /// Upload the shadow copy if it changed.
    ///
    /// Immutable buffers are created here, and slots already holding the
    /// buffer are rebound to the new native object.
    pub fn apply_constant_buffer(&mut self, id: ConstantBufferId) -> Result<(), GraphicsError> {
        let backend = native(&mut self.backend, self.window.is_open());
        let buffer = lookup(&mut self.constant_buffers, id, "constant buffer")?;
        let before = buffer.handle();
        buffer.apply(backend)?;
        if buffer.handle() == before {
            return Ok(());
        }

        for stage in [ShaderStage::Vertex, ShaderStage::Pixel] {
            for index in 0..MAX_CONSTANT_BUFFERS {
                if self.bound_constant_buffers[stage.index()][index] == Some(id) {
                    self.bind_native_constant_buffer(stage, index);
                }
            }
        }
        Ok(())
    }

    /// Release the native buffer, keeping the constants and their values.
    pub fn release_constant_buffer(&mut self, id: ConstantBufferId) {
        self.unbind_constant_buffer(id);
        if let Some(backend) = native(&mut self.backend, self.window.is_open())
            && let Some(buffer) = self.constant_buffers.get_mut(id)
        {
            buffer.release(backend);
        }
    }

    /// Release and forget a constant buffer.
    pub fn destroy_constant_buffer(&mut self, id: ConstantBufferId) {
        self.release_constant_buffer(id);
        self.constant_buffers.remove(id);
    }

    /// A constant buffer.
    pub fn constant_buffer_object(&self, id: ConstantBufferId) -> Option<&ConstantBuffer> {
        self.constant_buffers.get(id)
    }

    // ------------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------------

    /// Create an undefined texture.
    pub fn create_texture(&mut self) -> TextureId {
        self.textures.insert(Texture::new())
    }

    /// Define texture storage. See [`Texture::define`].
    #[allow(clippy::too_many_arguments)]
    pub fn define_texture(
        &mut self,
        id: TextureId,
        texture_type: TextureType,
        usage: ResourceUsage,
        size: IntVector2,
        format: ImageFormat,
        num_levels: usize,
        initial_data: &[ImageLevel<'_>],
    ) -> Result<(), GraphicsError> {
        lookup(&mut self.textures, id, "texture")?;
        self.unbind_texture(id);

        let backend = native(&mut self.backend, self.window.is_open());
        let texture = lookup(&mut self.textures, id, "texture")?;
        texture.define(
            backend,
            texture_type,
            usage,
            size,
            format,
            num_levels,
            initial_data,
        )
    }

    /// Define a multisampled render target texture.
    pub fn define_multisampled_texture(
        &mut self,
        id: TextureId,
        size: IntVector2,
        format: ImageFormat,
        multisample: u32,
    ) -> Result<(), GraphicsError> {
        lookup(&mut self.textures, id, "texture")?;
        self.unbind_texture(id);

        let backend = native(&mut self.backend, self.window.is_open());
        let texture = lookup(&mut self.textures, id, "texture")?;
        texture.define_multisampled(backend, size, format, multisample)
    }

    /// Set the sampling parameters of a texture.
    pub fn define_sampler(
        &mut self,
        id: TextureId,
        sampler: &SamplerDescriptor,
    ) -> Result<(), GraphicsError> {
        let backend = native(&mut self.backend, self.window.is_open());
        let texture = lookup(&mut self.textures, id, "texture")?;
        texture.define_sampler(backend, sampler)
    }

    /// Update a region of one level of one face.
    pub fn set_texture_data(
        &mut self,
        id: TextureId,
        face: usize,
        level: usize,
        rect: IntRect,
        data: &ImageLevel<'_>,
    ) -> Result<(), GraphicsError> {
        let backend = native(&mut self.backend, self.window.is_open());
        let texture = lookup(&mut self.textures, id, "texture")?;
        texture.set_data(backend, face, level, rect, data)
    }

    /// Release the native texture, keeping the definition.
    pub fn release_texture(&mut self, id: TextureId) {
        self.unbind_texture(id);
        if let Some(backend) = native(&mut self.backend, self.window.is_open())
            && let Some(texture) = self.textures.get_mut(id)
        {
            texture.release(backend);
        }
    }

    /// Release and forget a texture.
    pub fn destroy_texture(&mut self, id: TextureId) {
        self.release_texture(id);
        self.textures.remove(id);
    }

    /// A texture.
    pub fn texture_object(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id)
    }

    // ------------------------------------------------------------------------
    // State objects
    // ------------------------------------------------------------------------

    /// Create an undefined blend state.
    pub fn create_blend_state(&mut self) -> BlendStateId {
        self.blend_states.insert(BlendState::new())
    }

    /// Define a blend state.
    pub fn define_blend_state(
        &mut self,
        id: BlendStateId,
        descriptor: &BlendDescriptor,
    ) -> Result<(), GraphicsError> {
        lookup(&mut self.blend_states, id, "blend state")?;
        if self.blend_state == Some(id) {
            self.set_blend_state(None);
        }
        lookup(&mut self.blend_states, id, "blend state")?.define(descriptor)
    }

    /// Release and forget a blend state.
    pub fn destroy_blend_state(&mut self, id: BlendStateId) {
        if self.blend_state == Some(id) {
            self.set_blend_state(None);
        }
        self.blend_states.remove(id);
    }

    /// A blend state.
    pub fn blend_state_object(&self, id: BlendStateId) -> Option<&BlendState> {
        self.blend_states.get(id)
    }

    /// Create an undefined depth state.
    pub fn create_depth_state(&mut self) -> DepthStateId {
        self.depth_states.insert(DepthState::new())
    }

    /// Define a depth state.
    pub fn define_depth_state(
        &mut self,
        id: DepthStateId,
        descriptor: &DepthDescriptor,
    ) -> Result<(), GraphicsError> {
        lookup(&mut self.depth_states, id, "depth state")?;
        if self.depth_state == Some(id) {
            self.set_depth_state(None, self.stencil_ref);
        }
        lookup(&mut self.depth_states, id, "depth state")?.define(descriptor)
    }

    /// Release and forget a depth state.
    pub fn destroy_depth_state(&mut self, id: DepthStateId) {
        if self.depth_state == Some(id) {
            self.set_depth_state(None, self.stencil_ref);
        }
        self.depth_states.remove(id);
    }

    /// A depth state.
    pub fn depth_state_object(&self, id: DepthStateId) -> Option<&DepthState> {
        self.depth_states.get(id)
    }

    /// Create an undefined rasterizer state.
    pub fn create_rasterizer_state(&mut self) -> RasterizerStateId {
        self.rasterizer_states.insert(RasterizerState::new())
    }

    /// Define a rasterizer state.
    pub fn define_rasterizer_state(
        &mut self,
        id: RasterizerStateId,
        descriptor: &RasterizerDescriptor,
    ) -> Result<(), GraphicsError> {
        lookup(&mut self.rasterizer_states, id, "rasterizer state")?;
        if self.rasterizer_state == Some(id) {
            self.set_rasterizer_state(None);
        }
        lookup(&mut self.rasterizer_states, id, "rasterizer state")?.define(descriptor)
    }

    /// Release and forget a rasterizer state.
    pub fn destroy_rasterizer_state(&mut self, id: RasterizerStateId) {
        if self.rasterizer_state == Some(id) {
            self.set_rasterizer_state(None);
        }
        self.rasterizer_states.remove(id);
    }

    /// A rasterizer state.
    pub fn rasterizer_state_object(&self, id: RasterizerStateId) -> Option<&RasterizerState> {
        self.rasterizer_states.get(id)
    }

    // ------------------------------------------------------------------------
    // Shaders
    // ------------------------------------------------------------------------

    /// Create an empty shader.
    pub fn create_shader(&mut self) -> ShaderId {
        self.shaders.insert(Shader::new())
    }

    /// Set the stage, name and source code of a shader.
    ///
    /// Existing variations are released and recompile from the new code the
    /// next time they are used. If the stage changes they are destroyed.
    pub fn define_shader(
        &mut self,
        id: ShaderId,
        stage: ShaderStage,
        name: &str,
        source_code: &str,
    ) -> Result<(), GraphicsError> {
        let shader = lookup(&mut self.shaders, id, "shader")?;
        let previous_stage = shader.stage();
        let variations = shader.define(stage, name, source_code);

        for variation in variations {
            if previous_stage == Some(stage) {
                self.release_variation(variation);
            } else {
                self.destroy_variation(variation);
            }
        }
        Ok(())
    }

    /// Get or create the variation of a shader for a defines string.
    ///
    /// The defines are normalized, so `"B A"` and `"a b"` give the same variation.
    pub fn create_variation(
        &mut self,
        shader: ShaderId,
        defines: &str,
    ) -> Result<ShaderVariationId, GraphicsError> {
        let parent = lookup(&mut self.shaders, shader, "shader")?;
        if let Some(existing) = parent.find_variation(defines) {
            return Ok(existing);
        }
        let Some(stage) = parent.stage() else {
            log::error!("Can not create variation of undefined shader");
            return Err(GraphicsError::NotDefined);
        };

        let defines = normalize_defines(defines);
        let id = self
            .variations
            .insert(ShaderVariation::new(shader, stage, defines.clone()));
        if let Some(parent) = self.shaders.get_mut(shader) {
            parent.add_variation(defines, id);
        }
        Ok(id)
    }

    /// Compile a variation now instead of before the first draw that uses it.
    pub fn compile_variation(&mut self, id: ShaderVariationId) -> Result<(), GraphicsError> {
        let backend = native(&mut self.backend, self.window.is_open());
        let variation = lookup(&mut self.variations, id, "shader variation")?;
        let parent = self.shaders.get(variation.parent());
        variation.compile(backend, parent).map(|_| ())
    }

    /// Release the compiled shader of a variation and every program that uses it.
    pub fn release_variation(&mut self, id: ShaderVariationId) {
        if self.vertex_shader == Some(id) || self.pixel_shader == Some(id) {
            self.set_shaders(None, None);
        }
        if self
            .applied
            .program
            .is_some_and(|(vs, ps)| vs == id || ps == id)
        {
            self.applied.program = None;
            self.dirty |= DirtyFlags::SHADERS;
        }

        let mut backend = native(&mut self.backend, self.window.is_open());
        self.programs.retain(|_, program| {
            if !program.uses(id) {
                return true;
            }
            if let Some(backend) = backend.as_deref_mut() {
                program.release(backend);
            }
            false
        });

        if let Some(variation) = self.variations.get_mut(id) {
            match backend {
                Some(backend) => variation.release(backend),
                None => variation.reset(),
            }
        }
    }

    /// Release and forget a variation.
    pub fn destroy_variation(&mut self, id: ShaderVariationId) {
        self.release_variation(id);
        if let Some(variation) = self.variations.remove(id)
            && let Some(parent) = self.shaders.get_mut(variation.parent())
        {
            parent.remove_variation(id);
        }
    }

    /// Destroy a shader and all of its variations.
    pub fn destroy_shader(&mut self, id: ShaderId) {
        let Some(shader) = self.shaders.get(id) else {
            return;
        };
        for variation in shader.variation_ids() {
            self.destroy_variation(variation);
        }
        self.shaders.remove(id);
    }

    /// A shader.
    pub fn shader_object(&self, id: ShaderId) -> Option<&Shader> {
        self.shaders.get(id)
    }

    /// A shader variation.
    pub fn variation_object(&self, id: ShaderVariationId) -> Option<&ShaderVariation> {
        self.variations.get(id)
    }

    /// The cached program of a variation pair, if it has been linked or attempted.
    pub fn program_object(
        &self,
        vs: ShaderVariationId,
        ps: ShaderVariationId,
    ) -> Option<&ShaderProgram> {
        self.programs.get(&(vs, ps))
    }

    // ------------------------------------------------------------------------
    // Data loss
    // ------------------------------------------------------------------------

    /// Whether the contents of a resource were lost with the previous context.
    pub fn is_data_lost(&self, id: impl Into<GpuResourceId>) -> bool {
        match id.into() {
            GpuResourceId::VertexBuffer(id) => {
                self.vertex_buffers.get(id).is_some_and(|b| b.is_data_lost())
            }
            GpuResourceId::IndexBuffer(id) => {
                self.index_buffers.get(id).is_some_and(|b| b.is_data_lost())
            }
            GpuResourceId::ConstantBuffer(id) => {
                self.constant_buffers.get(id).is_some_and(|b| b.is_data_lost())
            }
            GpuResourceId::Texture(id) => self.textures.get(id).is_some_and(|t| t.is_data_lost()),
        }
    }

    /// Acknowledge that the contents of a resource were lost.
    pub fn clear_data_lost(&mut self, id: impl Into<GpuResourceId>) {
        match id.into() {
            GpuResourceId::VertexBuffer(id) => {
                if let Some(buffer) = self.vertex_buffers.get_mut(id) {
                    buffer.clear_data_lost();
                }
            }
            GpuResourceId::IndexBuffer(id) => {
                if let Some(buffer) = self.index_buffers.get_mut(id) {
                    buffer.clear_data_lost();
                }
            }
            GpuResourceId::ConstantBuffer(id) => {
                if let Some(buffer) = self.constant_buffers.get_mut(id) {
                    buffer.clear_data_lost();
                }
            }
            GpuResourceId::Texture(id) => {
                if let Some(texture) = self.textures.get_mut(id) {
                    texture.clear_data_lost();
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Slot cleanup
    // ------------------------------------------------------------------------

    fn unbind_vertex_buffer(&mut self, id: VertexBufferId) {
        for index in 0..MAX_VERTEX_STREAMS {
            if self.bound_vertex_buffers[index] == Some(id) {
                self.set_vertex_buffer(index, None);
            }
        }
    }

    fn unbind_index_buffer(&mut self, id: IndexBufferId) {
        if self.bound_index_buffer == Some(id) {
            self.set_index_buffer(None);
        }
    }

    fn unbind_constant_buffer(&mut self, id: ConstantBufferId) {
        for stage in [ShaderStage::Vertex, ShaderStage::Pixel] {
            for index in 0..MAX_CONSTANT_BUFFERS {
                if self.bound_constant_buffers[stage.index()][index] == Some(id) {
                    self.set_constant_buffer(stage, index, None);
                }
            }
        }
    }

    fn unbind_texture(&mut self, id: TextureId) {
        for unit in 0..MAX_TEXTURE_UNITS {
            if self.bound_textures[unit] == Some(id) {
                self.set_texture(unit, None);
            }
        }

        if self.bound_render_targets.contains(&Some(id)) || self.bound_depth_stencil == Some(id) {
            self.reset_render_targets();
        }
        if self.framebuffers.forget_texture(id) {
            self.dirty |= DirtyFlags::FRAMEBUFFER;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::settings::DisplayMode;
    use crate::types::{ElementSemantic, ElementType};
    use crate::window::HeadlessWindow;

    fn graphics() -> Graphics<DummyBackend, HeadlessWindow> {
        let mut graphics = Graphics::new(HeadlessWindow::new(), DummyBackend::new());
        graphics.set_mode(&DisplayMode::new(640, 480)).unwrap();
        graphics
    }

    #[test]
    fn test_invalid_handle_after_destroy() {
        let mut graphics = graphics();
        let vb = graphics.create_vertex_buffer();
        graphics.destroy_vertex_buffer(vb);

        let elements = [VertexElement::new(ElementType::Vector3, ElementSemantic::Position)];
        assert_eq!(
            graphics.define_vertex_buffer(vb, ResourceUsage::Default, 3, &elements, false, None),
            Err(GraphicsError::InvalidHandle)
        );
        assert!(graphics.vertex_buffer_object(vb).is_none());
    }

    #[test]
    fn test_release_clears_slots() {
        let mut graphics = graphics();
        let vb = graphics.create_vertex_buffer();
        let elements = [VertexElement::new(ElementType::Vector3, ElementSemantic::Position)];
        graphics
            .define_vertex_buffer(vb, ResourceUsage::Default, 3, &elements, false, None)
            .unwrap();
        graphics.set_vertex_buffer(0, Some(vb));
        graphics.set_vertex_buffer(2, Some(vb));

        graphics.release_vertex_buffer(vb);
        assert_eq!(graphics.vertex_buffer(0), None);
        assert_eq!(graphics.vertex_buffer(2), None);
        assert!(graphics.vertex_buffer_object(vb).unwrap().is_defined());
        assert_eq!(graphics.backend().live_buffers(), 0);
    }

    #[test]
    fn test_variations_are_shared_by_normalized_defines() {
        let mut graphics = graphics();
        let shader = graphics.create_shader();
        graphics
            .define_shader(shader, ShaderStage::Vertex, "Test.vs", "void main() {}")
            .unwrap();

        let a = graphics.create_variation(shader, "skinned INSTANCED").unwrap();
        let b = graphics.create_variation(shader, "INSTANCED SKINNED").unwrap();
        assert_eq!(a, b);
        assert_eq!(graphics.variation_object(a).unwrap().defines(), "INSTANCED SKINNED");
        assert_eq!(graphics.shader_object(shader).unwrap().num_variations(), 1);
    }

    #[test]
    fn test_variation_of_undefined_shader() {
        let mut graphics = graphics();
        let shader = graphics.create_shader();
        assert_eq!(
            graphics.create_variation(shader, ""),
            Err(GraphicsError::NotDefined)
        );
    }

    #[test]
    fn test_redefine_shader_releases_variations() {
        let mut graphics = graphics();
        let shader = graphics.create_shader();
        graphics
            .define_shader(shader, ShaderStage::Vertex, "Test.vs", "void main() {}")
            .unwrap();
        let variation = graphics.create_variation(shader, "").unwrap();
        graphics.compile_variation(variation).unwrap();
        assert_eq!(graphics.backend().live_shaders(), 1);

        graphics
            .define_shader(shader, ShaderStage::Vertex, "Test.vs", "void main() { }")
            .unwrap();
        assert!(!graphics.variation_object(variation).unwrap().is_compiled());
        assert_eq!(graphics.backend().live_shaders(), 0);

        graphics
            .define_shader(shader, ShaderStage::Pixel, "Test.ps", "void main() {}")
            .unwrap();
        assert!(graphics.variation_object(variation).is_none());
        assert_eq!(graphics.shader_object(shader).unwrap().num_variations(), 0);
    }

    #[test]
    fn test_data_lost_by_resource_id() {
        let mut graphics = graphics();
        let ib = graphics.create_index_buffer();
        graphics
            .define_index_buffer(ib, ResourceUsage::Default, 3, 2, false, None)
            .unwrap();
        assert!(!graphics.is_data_lost(ib));

        graphics.set_multisample(4).unwrap();
        assert!(graphics.is_data_lost(ib));
        graphics.clear_data_lost(ib);
        assert!(!graphics.is_data_lost(ib));
    }
}
