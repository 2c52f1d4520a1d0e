//! Clear and draw commands.

use ember_core::Color;

use crate::backend::RenderBackend;
use crate::resources::GpuObject;
use crate::types::{ClearFlags, ColorWriteMask, PrimitiveType};
use crate::window::Window;

use super::{DirtyFlags, Graphics, native};

impl<B: RenderBackend, W: Window> Graphics<B, W> {
    /// Clear the current render targets.
    ///
    /// The clear is not affected by the bound blend, depth or rasterizer
    /// state: color writes, depth writes and stencil writes are enabled and
    /// the scissor test is disabled for it. The affected state is applied
    /// again before the next draw.
    pub fn clear(&mut self, flags: ClearFlags, color: Color, depth: f32, stencil: u8) {
        if !self.is_initialized() {
            return;
        }
        self.prepare_framebuffer();

        let Some(backend) = native(&mut self.backend, self.window.is_open()) else {
            return;
        };
        let applied = &mut self.applied;

        if flags.contains(ClearFlags::COLOR)
            && applied
                .blend
                .is_none_or(|b| b.color_write_mask != ColorWriteMask::ALL)
        {
            backend.set_color_write_mask(ColorWriteMask::ALL);
            if let Some(blend) = applied.blend.as_mut() {
                blend.color_write_mask = ColorWriteMask::ALL;
            }
            self.dirty |= DirtyFlags::BLEND;
        }

        if flags.contains(ClearFlags::DEPTH) && applied.depth.is_none_or(|d| !d.depth_write) {
            backend.set_depth_write(true);
            if let Some(depth_state) = applied.depth.as_mut() {
                depth_state.depth_write = true;
            }
            self.dirty |= DirtyFlags::DEPTH;
        }

        if flags.contains(ClearFlags::STENCIL)
            && applied.depth.is_none_or(|d| d.stencil_write_mask != 0xff)
        {
            backend.set_stencil_write_mask(0xff);
            if let Some(depth_state) = applied.depth.as_mut() {
                depth_state.stencil_write_mask = 0xff;
            }
            self.dirty |= DirtyFlags::DEPTH;
        }

        if applied.rasterizer.is_none_or(|r| r.scissor_enable) {
            backend.set_scissor_test(false);
            if let Some(rasterizer) = applied.rasterizer.as_mut() {
                rasterizer.scissor_enable = false;
            }
            self.dirty |= DirtyFlags::RASTERIZER;
        }

        backend.clear(flags, color, depth, stencil);
    }

    /// Draw non-indexed geometry from the bound vertex buffers.
    pub fn draw(&mut self, primitive: PrimitiveType, vertex_start: usize, vertex_count: usize) {
        if vertex_count == 0 || self.vertex_data_lost() || !self.prepare_draw(false, 0) {
            return;
        }
        if let Some(backend) = native(&mut self.backend, self.window.is_open()) {
            backend.draw(primitive, vertex_start, vertex_count);
        }
    }

    /// Draw indexed geometry. `vertex_start` is added to every index.
    pub fn draw_indexed(
        &mut self,
        primitive: PrimitiveType,
        index_start: usize,
        index_count: usize,
        vertex_start: usize,
    ) {
        let Some(index_size) = self.usable_index_size() else {
            return;
        };
        if index_count == 0 || self.vertex_data_lost() || !self.prepare_draw(false, 0) {
            return;
        }
        if let Some(backend) = native(&mut self.backend, self.window.is_open()) {
            backend.draw_indexed(primitive, index_start, index_count, index_size, vertex_start);
        }
    }

    /// Draw instanced non-indexed geometry. Per-instance vertex elements
    /// start at `instance_start`.
    pub fn draw_instanced(
        &mut self,
        primitive: PrimitiveType,
        vertex_start: usize,
        vertex_count: usize,
        instance_start: usize,
        instance_count: usize,
    ) {
        if vertex_count == 0
            || instance_count == 0
            || !self.instancing_supported()
            || self.vertex_data_lost()
            || !self.prepare_draw(true, instance_start)
        {
            return;
        }
        if let Some(backend) = native(&mut self.backend, self.window.is_open()) {
            backend.draw_instanced(primitive, vertex_start, vertex_count, instance_count);
        }
    }

    /// Draw instanced indexed geometry.
    pub fn draw_indexed_instanced(
        &mut self,
        primitive: PrimitiveType,
        index_start: usize,
        index_count: usize,
        vertex_start: usize,
        instance_start: usize,
        instance_count: usize,
    ) {
        let Some(index_size) = self.usable_index_size() else {
            return;
        };
        if index_count == 0
            || instance_count == 0
            || !self.instancing_supported()
            || self.vertex_data_lost()
            || !self.prepare_draw(true, instance_start)
        {
            return;
        }
        if let Some(backend) = native(&mut self.backend, self.window.is_open()) {
            backend.draw_indexed_instanced(
                primitive,
                index_start,
                index_count,
                index_size,
                vertex_start,
                instance_count,
            );
        }
    }

    /// Index size of the bound index buffer, if it can be drawn from.
    fn usable_index_size(&self) -> Option<usize> {
        let buffer = self
            .bound_index_buffer
            .and_then(|id| self.index_buffers.get(id))?;
        if buffer.handle().is_none() || buffer.is_data_lost() {
            return None;
        }
        Some(buffer.index_size())
    }

    fn vertex_data_lost(&self) -> bool {
        self.bound_vertex_buffers
            .iter()
            .flatten()
            .filter_map(|id| self.vertex_buffers.get(*id))
            .any(|buffer| buffer.is_data_lost())
    }

    fn instancing_supported(&self) -> bool {
        if !self.capabilities.instancing {
            log::warn!("Instanced drawing is not supported by the device");
        }
        self.capabilities.instancing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::settings::DisplayMode;
    use crate::types::{BlendDescriptor, DepthDescriptor, ResourceUsage, ShaderStage};
    use crate::window::HeadlessWindow;

    fn graphics() -> Graphics<DummyBackend, HeadlessWindow> {
        let mut graphics = Graphics::new(HeadlessWindow::new(), DummyBackend::new());
        graphics.set_mode(&DisplayMode::new(640, 480)).unwrap();
        graphics
    }

    fn bind_shaders(graphics: &mut Graphics<DummyBackend, HeadlessWindow>) {
        let vs = graphics.create_shader();
        graphics
            .define_shader(vs, ShaderStage::Vertex, "Test.vs", "in vec3 position;\nvoid main() {}")
            .unwrap();
        let ps = graphics.create_shader();
        graphics
            .define_shader(ps, ShaderStage::Pixel, "Test.ps", "void main() {}")
            .unwrap();
        let vs = graphics.create_variation(vs, "").unwrap();
        let ps = graphics.create_variation(ps, "").unwrap();
        graphics.set_shaders(Some(vs), Some(ps));
    }

    #[test]
    fn test_draw_without_program_is_skipped() {
        let mut graphics = graphics();
        graphics.draw(PrimitiveType::TriangleList, 0, 3);
        assert_eq!(graphics.backend().stats().draw_calls, 0);

        bind_shaders(&mut graphics);
        graphics.draw(PrimitiveType::TriangleList, 0, 3);
        assert_eq!(graphics.backend().stats().draw_calls, 1);
    }

    #[test]
    fn test_draw_indexed_requires_index_buffer() {
        let mut graphics = graphics();
        bind_shaders(&mut graphics);
        graphics.draw_indexed(PrimitiveType::TriangleList, 0, 6, 0);
        assert_eq!(graphics.backend().stats().draw_calls, 0);

        let ib = graphics.create_index_buffer();
        graphics
            .define_index_buffer(ib, ResourceUsage::Default, 6, 4, true, None)
            .unwrap();
        graphics.set_index_buffer(Some(ib));
        graphics.draw_indexed(PrimitiveType::TriangleList, 3, 3, 10);

        let record = graphics.backend().last_draw().unwrap();
        assert_eq!(record.start, 3);
        assert_eq!(record.count, 3);
        assert_eq!(record.index_size, 4);
        assert_eq!(record.base_vertex, 10);
    }

    #[test]
    fn test_clear_forces_writes_and_restores_state() {
        let mut graphics = graphics();
        bind_shaders(&mut graphics);

        let blend = graphics.create_blend_state();
        graphics
            .define_blend_state(
                blend,
                &BlendDescriptor::default().with_color_write_mask(ColorWriteMask::R),
            )
            .unwrap();
        let depth = graphics.create_depth_state();
        let mut no_write = DepthDescriptor::default();
        no_write.depth_write = false;
        graphics.define_depth_state(depth, &no_write).unwrap();
        graphics.set_blend_state(Some(blend));
        graphics.set_depth_state(Some(depth), 0);
        graphics.draw(PrimitiveType::TriangleList, 0, 3);
        assert_eq!(graphics.backend().state().color_write_mask, ColorWriteMask::R);
        assert!(!graphics.backend().state().depth_write);

        graphics.clear(ClearFlags::ALL, Color::BLACK, 1.0, 0);
        assert_eq!(graphics.backend().state().color_write_mask, ColorWriteMask::ALL);
        assert!(graphics.backend().state().depth_write);
        assert!(!graphics.backend().state().scissor_test);
        assert!(graphics
            .dirty_flags()
            .contains(DirtyFlags::BLEND | DirtyFlags::DEPTH));

        graphics.draw(PrimitiveType::TriangleList, 0, 3);
        assert_eq!(graphics.backend().state().color_write_mask, ColorWriteMask::R);
        assert!(!graphics.backend().state().depth_write);
    }

    #[test]
    fn test_clear_without_context_is_ignored() {
        let mut graphics = Graphics::new(HeadlessWindow::new(), DummyBackend::new());
        graphics.clear(ClearFlags::COLOR, Color::BLACK, 1.0, 0);
        assert!(graphics.backend().last_clear().is_none());
    }
}
