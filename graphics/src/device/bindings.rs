//! Desired-state setters, resets and binding queries.
//!
//! Setters ignore out-of-range slots and treat setting the current value
//! as a no-op. Texture, index buffer and constant buffer bindings reach the
//! backend immediately. Everything else only marks dirty state that is
//! resolved before the next draw or clear.

use ember_core::IntRect;

use crate::backend::RenderBackend;
use crate::resources::{
    BlendStateId, ConstantBufferId, DepthStateId, IndexBufferId, RasterizerStateId, TextureId,
    VertexBufferId,
};
use crate::shader::{ShaderProgram, ShaderVariationId};
use crate::types::{
    MAX_CONSTANT_BUFFERS, MAX_RENDERTARGETS, MAX_SHADER_STAGES, MAX_TEXTURE_UNITS,
    MAX_VERTEX_STREAMS, ShaderStage,
};
use crate::window::Window;

use super::{DirtyFlags, Graphics, native};

impl<B: RenderBackend, W: Window> Graphics<B, W> {
    /// Render to one color target and an optional depth-stencil buffer.
    /// `None` for both renders to the backbuffer.
    pub fn set_render_target(
        &mut self,
        render_target: Option<TextureId>,
        depth_stencil: Option<TextureId>,
    ) {
        self.set_render_targets(&[render_target], depth_stencil);
    }

    /// Render to several color targets. Slots past the end of the slice are cleared.
    ///
    /// Textures without render target usage, or with a format that does not
    /// fit the slot kind, are bound as `None`.
    pub fn set_render_targets(
        &mut self,
        render_targets: &[Option<TextureId>],
        depth_stencil: Option<TextureId>,
    ) {
        if render_targets.is_empty() {
            return;
        }

        let mut changed = false;
        for slot in 0..MAX_RENDERTARGETS {
            let target = render_targets
                .get(slot)
                .copied()
                .flatten()
                .filter(|id| self.textures.get(*id).is_some_and(|t| t.is_render_target()));
            if self.bound_render_targets[slot] != target {
                self.bound_render_targets[slot] = target;
                changed = true;
            }
        }

        let depth_stencil = depth_stencil
            .filter(|id| self.textures.get(*id).is_some_and(|t| t.is_depth_stencil()));
        if self.bound_depth_stencil != depth_stencil {
            self.bound_depth_stencil = depth_stencil;
            changed = true;
        }

        self.render_target_size = self.bound_render_targets[0]
            .or(self.bound_depth_stencil)
            .and_then(|id| self.textures.get(id))
            .map_or(self.backbuffer_size, |t| t.size());

        if changed {
            self.dirty |= DirtyFlags::FRAMEBUFFER;
        }
    }

    /// Set the viewport, clamped to the render target.
    pub fn set_viewport(&mut self, viewport: IntRect) {
        self.viewport = viewport.clamped_to(self.render_target_size);

        let (x, y, width, height) = self.native_rect(self.viewport);
        if let Some(backend) = native(&mut self.backend, self.window.is_open()) {
            backend.set_viewport(x, y, width, height);
        }
    }

    /// Set the scissor rectangle, clamped to the render target. Takes effect
    /// while the bound rasterizer state enables the scissor test.
    pub fn set_scissor_rect(&mut self, scissor_rect: IntRect) {
        let scissor_rect = scissor_rect.clamped_to(self.render_target_size);
        if scissor_rect != self.scissor_rect {
            self.scissor_rect = scissor_rect;
            self.dirty |= DirtyFlags::RASTERIZER;
        }
    }

    /// Bind a vertex buffer to a stream.
    pub fn set_vertex_buffer(&mut self, index: usize, buffer: Option<VertexBufferId>) {
        if index < MAX_VERTEX_STREAMS && self.bound_vertex_buffers[index] != buffer {
            self.bound_vertex_buffers[index] = buffer;
            self.dirty |= DirtyFlags::VERTEX_BUFFERS;
        }
    }

    /// Bind the index buffer.
    pub fn set_index_buffer(&mut self, buffer: Option<IndexBufferId>) {
        if self.bound_index_buffer == buffer {
            return;
        }
        self.bound_index_buffer = buffer;

        let handle = buffer
            .and_then(|id| self.index_buffers.get(id))
            .and_then(|b| b.handle());
        if let Some(backend) = native(&mut self.backend, self.window.is_open()) {
            backend.bind_index_buffer(handle);
        }
    }

    /// Bind a constant buffer to a slot of a shader stage.
    pub fn set_constant_buffer(
        &mut self,
        stage: ShaderStage,
        index: usize,
        buffer: Option<ConstantBufferId>,
    ) {
        let stage_index = stage.index();
        if stage_index >= MAX_SHADER_STAGES
            || index >= MAX_CONSTANT_BUFFERS
            || self.bound_constant_buffers[stage_index][index] == buffer
        {
            return;
        }
        self.bound_constant_buffers[stage_index][index] = buffer;
        self.bind_native_constant_buffer(stage, index);
    }

    /// Bind a texture to a texture unit.
    pub fn set_texture(&mut self, unit: usize, texture: Option<TextureId>) {
        if unit >= MAX_TEXTURE_UNITS || self.bound_textures[unit] == texture {
            return;
        }
        self.bound_textures[unit] = texture;
        self.bind_native_texture(unit);
    }

    /// Select the vertex and pixel shader variations.
    ///
    /// Compiling and linking happen before the next draw. Each variation is
    /// compiled at most once and each pair is linked at most once.
    pub fn set_shaders(&mut self, vs: Option<ShaderVariationId>, ps: Option<ShaderVariationId>) {
        if vs == self.vertex_shader && ps == self.pixel_shader {
            return;
        }
        self.vertex_shader = vs;
        self.pixel_shader = ps;
        self.dirty |= DirtyFlags::SHADERS;
    }

    /// Bind the blend state. `None` uses the default blend configuration.
    pub fn set_blend_state(&mut self, state: Option<BlendStateId>) {
        if self.blend_state != state {
            self.blend_state = state;
            self.dirty |= DirtyFlags::BLEND;
        }
    }

    /// Bind the depth state and the stencil reference value.
    pub fn set_depth_state(&mut self, state: Option<DepthStateId>, stencil_ref: u8) {
        if self.depth_state != state || self.stencil_ref != stencil_ref {
            self.depth_state = state;
            self.stencil_ref = stencil_ref;
            self.dirty |= DirtyFlags::DEPTH;
        }
    }

    /// Bind the rasterizer state.
    pub fn set_rasterizer_state(&mut self, state: Option<RasterizerStateId>) {
        if self.rasterizer_state != state {
            self.rasterizer_state = state;
            self.dirty |= DirtyFlags::RASTERIZER;
        }
    }

    /// Render to the backbuffer.
    pub fn reset_render_targets(&mut self) {
        self.set_render_target(None, None);
    }

    /// Set the viewport to cover the whole render target.
    pub fn reset_viewport(&mut self) {
        let size = self.render_target_size;
        self.set_viewport(IntRect::from_size(size.x, size.y));
    }

    /// Unbind all vertex buffers.
    pub fn reset_vertex_buffers(&mut self) {
        for index in 0..MAX_VERTEX_STREAMS {
            self.set_vertex_buffer(index, None);
        }
    }

    /// Unbind all constant buffers of both stages.
    pub fn reset_constant_buffers(&mut self) {
        for stage in [ShaderStage::Vertex, ShaderStage::Pixel] {
            for index in 0..MAX_CONSTANT_BUFFERS {
                self.set_constant_buffer(stage, index, None);
            }
        }
    }

    /// Unbind all textures.
    pub fn reset_textures(&mut self) {
        for unit in 0..MAX_TEXTURE_UNITS {
            self.set_texture(unit, None);
        }
    }

    /// Color render target of a slot.
    pub fn render_target(&self, index: usize) -> Option<TextureId> {
        self.bound_render_targets.get(index).copied().flatten()
    }

    /// Depth-stencil buffer.
    pub fn depth_stencil(&self) -> Option<TextureId> {
        self.bound_depth_stencil
    }

    /// Viewport, top-left origin.
    pub fn viewport(&self) -> IntRect {
        self.viewport
    }

    /// Scissor rectangle, top-left origin.
    pub fn scissor_rect(&self) -> IntRect {
        self.scissor_rect
    }

    /// Vertex buffer of a stream.
    pub fn vertex_buffer(&self, index: usize) -> Option<VertexBufferId> {
        self.bound_vertex_buffers.get(index).copied().flatten()
    }

    /// Index buffer.
    pub fn index_buffer(&self) -> Option<IndexBufferId> {
        self.bound_index_buffer
    }

    /// Constant buffer of a slot of a shader stage.
    pub fn constant_buffer(&self, stage: ShaderStage, index: usize) -> Option<ConstantBufferId> {
        self.bound_constant_buffers
            .get(stage.index())
            .and_then(|slots| slots.get(index))
            .copied()
            .flatten()
    }

    /// Texture of a texture unit.
    pub fn texture(&self, unit: usize) -> Option<TextureId> {
        self.bound_textures.get(unit).copied().flatten()
    }

    /// Vertex shader variation.
    pub fn vertex_shader(&self) -> Option<ShaderVariationId> {
        self.vertex_shader
    }

    /// Pixel shader variation.
    pub fn pixel_shader(&self) -> Option<ShaderVariationId> {
        self.pixel_shader
    }

    /// The program currently in use, resolved by the last draw or clear.
    pub fn shader_program(&self) -> Option<&ShaderProgram> {
        self.applied.program.and_then(|key| self.programs.get(&key))
    }

    /// Blend state.
    pub fn blend_state(&self) -> Option<BlendStateId> {
        self.blend_state
    }

    /// Depth state.
    pub fn depth_state(&self) -> Option<DepthStateId> {
        self.depth_state
    }

    /// Rasterizer state.
    pub fn rasterizer_state(&self) -> Option<RasterizerStateId> {
        self.rasterizer_state
    }

    /// Stencil reference value.
    pub fn stencil_ref(&self) -> u8 {
        self.stencil_ref
    }

    /// Convert a top-left origin rectangle to the backend's bottom-left
    /// origin `(x, y, width, height)`.
    pub(super) fn native_rect(&self, rect: IntRect) -> (i32, i32, i32, i32) {
        (
            rect.left,
            self.render_target_size.y - rect.bottom,
            rect.width(),
            rect.height(),
        )
    }

    pub(super) fn bind_native_texture(&mut self, unit: usize) {
        let texture = self.bound_textures[unit]
            .and_then(|id| self.textures.get(id))
            .and_then(|t| t.handle().map(|h| (h, t.texture_type())));
        if let Some(backend) = native(&mut self.backend, self.window.is_open()) {
            backend.bind_texture(unit, texture);
        }
    }

    pub(super) fn bind_native_constant_buffer(&mut self, stage: ShaderStage, index: usize) {
        let binding = match stage {
            ShaderStage::Vertex => index,
            ShaderStage::Pixel => self.vs_constant_buffer_slots() as usize + index,
        };
        let handle = self.bound_constant_buffers[stage.index()][index]
            .and_then(|id| self.constant_buffers.get(id))
            .and_then(|b| b.handle());
        if let Some(backend) = native(&mut self.backend, self.window.is_open()) {
            backend.bind_constant_buffer(binding, handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use ember_core::IntVector2;

    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::settings::DisplayMode;
    use crate::window::HeadlessWindow;

    fn graphics() -> Graphics<DummyBackend, HeadlessWindow> {
        let mut graphics = Graphics::new(HeadlessWindow::new(), DummyBackend::new());
        graphics.set_mode(&DisplayMode::new(640, 480)).unwrap();
        graphics
    }

    #[test]
    fn test_out_of_range_slots_are_ignored() {
        let mut graphics = graphics();
        let vb = graphics.create_vertex_buffer();
        let texture = graphics.create_texture();

        graphics.set_vertex_buffer(MAX_VERTEX_STREAMS, Some(vb));
        graphics.set_texture(MAX_TEXTURE_UNITS, Some(texture));
        assert_eq!(graphics.vertex_buffer(MAX_VERTEX_STREAMS), None);
        assert_eq!(graphics.texture(MAX_TEXTURE_UNITS), None);
        assert_eq!(graphics.backend().stats().texture_binds, 0);
    }

    #[test]
    fn test_viewport_clamped_and_flipped() {
        let mut graphics = graphics();
        graphics.set_viewport(IntRect::new(-10, 10, 100, 2000));
        assert_eq!(graphics.viewport(), IntRect::new(0, 10, 100, 480));
        assert_eq!(graphics.backend().state().viewport, (0, 0, 100, 470));

        graphics.set_viewport(IntRect::new(0, 0, 320, 240));
        assert_eq!(graphics.backend().state().viewport, (0, 240, 320, 240));
    }

    #[test]
    fn test_scissor_change_marks_rasterizer_dirty() {
        let mut graphics = graphics();
        graphics.draw(crate::types::PrimitiveType::TriangleList, 0, 3);
        assert!(!graphics.dirty_flags().contains(DirtyFlags::RASTERIZER));

        graphics.set_scissor_rect(IntRect::new(10, 10, 20, 20));
        assert!(graphics.dirty_flags().contains(DirtyFlags::RASTERIZER));
    }

    #[test]
    fn test_render_target_requires_render_target_usage() {
        let mut graphics = graphics();
        let texture = graphics.create_texture();
        graphics
            .define_texture(
                texture,
                crate::types::TextureType::Tex2D,
                crate::types::ResourceUsage::Default,
                IntVector2::new(64, 64),
                crate::types::ImageFormat::Rgba8,
                1,
                &[],
            )
            .unwrap();

        graphics.set_render_target(Some(texture), None);
        assert_eq!(graphics.render_target(0), None);
        assert_eq!(graphics.render_target_size(), IntVector2::new(640, 480));
    }

    #[test]
    fn test_pixel_constant_buffers_bind_after_vertex_slots() {
        let mut graphics = graphics();
        let cb = graphics.create_constant_buffer();
        graphics
            .define_constant_buffer(
                cb,
                crate::types::ResourceUsage::Default,
                &[crate::types::Constant::new(crate::types::ElementType::Vector4, "Color")],
            )
            .unwrap();

        graphics.set_constant_buffer(ShaderStage::Pixel, 2, Some(cb));
        let slots = graphics.capabilities().max_vs_constant_buffers as usize;
        assert!(graphics.backend().state().constant_buffers[slots + 2].is_some());
        assert_eq!(graphics.constant_buffer(ShaderStage::Pixel, 2), Some(cb));
    }
}
