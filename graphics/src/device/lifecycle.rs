//! Screen mode, context loss and presentation.

use ember_core::{IntRect, IntVector2};
use ember_core::profiling::{frame_mark, profile_scope};

use crate::backend::RenderBackend;
use crate::error::GraphicsError;
use crate::profiling::plot_cache_sizes;
use crate::resources::GpuObject;
use crate::settings::DisplayMode;
use crate::types::{
    MAX_CONSTANT_BUFFERS, MAX_RENDERTARGETS, MAX_SHADER_STAGES, MAX_TEXTURE_UNITS, MAX_VERTEX_STREAMS,
};
use crate::window::Window;

use super::{AppliedState, DirtyFlags, Graphics, GraphicsEvent, native};

impl<B: RenderBackend, W: Window> Graphics<B, W> {
    /// Set the screen mode, opening the window and creating the rendering
    /// context if necessary.
    ///
    /// A change of multisample level replaces the context: every native
    /// object is released, [`GraphicsEvent::ContextLost`] is queued, and the
    /// objects are recreated from their retained definitions afterwards.
    pub fn set_mode(&mut self, mode: &DisplayMode) -> Result<(), GraphicsError> {
        profile_scope!("set_mode");

        let multisample = mode.multisample.max(1);

        if !self.window.set_size(mode.width, mode.height, mode.resizable) {
            log::error!("Failed to set window size {}x{}", mode.width, mode.height);
            return Err(GraphicsError::InitializationFailed(format!(
                "could not set window size {}x{}",
                mode.width, mode.height
            )));
        }
        if !self.window.set_fullscreen(mode.fullscreen) {
            log::warn!("Failed to change fullscreen state to {}", mode.fullscreen);
        }

        if !self.backend.has_context() || multisample != self.multisample {
            let context_lost = self.backend.has_context();
            if context_lost {
                self.release_all();
                self.events.push(GraphicsEvent::ContextLost);
                self.backend.destroy_context();
            }

            match self.backend.create_context(&self.window, multisample) {
                Ok(capabilities) => self.capabilities = capabilities,
                Err(err) => {
                    log::error!("Failed to create rendering context: {}", err);
                    self.reset_state();
                    return Err(GraphicsError::InitializationFailed(err.to_string()));
                }
            }

            self.multisample = multisample;
            self.recreate_all();
            if context_lost {
                self.events.push(GraphicsEvent::ContextRestored);
            }
            self.reset_state();
        }

        self.vsync = mode.vsync;
        self.backend.set_vsync(mode.vsync);

        self.backbuffer_size = self.window.size();
        self.reset_render_targets();
        self.reset_viewport();

        self.events.push(GraphicsEvent::ScreenMode {
            width: self.backbuffer_size.x,
            height: self.backbuffer_size.y,
            fullscreen: self.window.is_fullscreen(),
            resizable: self.window.is_resizable(),
            multisample: self.multisample,
        });
        log::info!(
            "Set screen mode {}x{} fullscreen {} resizable {} multisample {}",
            self.backbuffer_size.x,
            self.backbuffer_size.y,
            self.window.is_fullscreen(),
            self.window.is_resizable(),
            self.multisample
        );
        Ok(())
    }

    /// Switch between fullscreen and windowed at the current resolution.
    pub fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), GraphicsError> {
        let mode = self.current_mode("fullscreen")?.with_fullscreen(fullscreen);
        self.set_mode(&mode)
    }

    /// Change the backbuffer multisample level at the current resolution.
    pub fn set_multisample(&mut self, multisample: u32) -> Result<(), GraphicsError> {
        let mode = self.current_mode("multisample")?.with_multisample(multisample);
        self.set_mode(&mode)
    }

    /// Enable or disable vertical sync.
    pub fn set_vsync(&mut self, enable: bool) {
        self.vsync = enable;
        if let Some(backend) = native(&mut self.backend, self.window.is_open()) {
            backend.set_vsync(enable);
        }
    }

    /// Destroy the rendering context and close the window.
    ///
    /// Resource definitions survive, so a later [`set_mode`](Self::set_mode)
    /// recreates them.
    pub fn close(&mut self) {
        if self.backend.has_context() {
            self.release_all();
            self.backend.destroy_context();
        }
        self.window.close();
        self.backbuffer_size = IntVector2::ZERO;
        self.reset_state();
    }

    /// Present the backbuffer and age out unused framebuffers.
    pub fn present(&mut self) {
        if let Some(backend) = native(&mut self.backend, self.window.is_open()) {
            profile_scope!("present");
            backend.present();
            self.framebuffers.age_out(backend);
            plot_cache_sizes(self.framebuffers.len(), self.programs.len());
        }
        frame_mark!();
    }

    /// Pick up a window size change made outside of [`set_mode`](Self::set_mode).
    pub fn handle_resize(&mut self) {
        if !self.is_initialized() {
            return;
        }

        let size = self.window.size();
        if size == self.backbuffer_size || size.x <= 0 || size.y <= 0 {
            return;
        }

        log::debug!("Window resized to {}x{}", size.x, size.y);
        self.backbuffer_size = size;
        self.reset_render_targets();
        self.reset_viewport();
    }

    fn current_mode(&self, what: &str) -> Result<DisplayMode, GraphicsError> {
        if !self.is_initialized() {
            log::error!("Can not change {} before the screen mode is set", what);
            return Err(GraphicsError::NotInitialized);
        }
        Ok(DisplayMode::new(self.backbuffer_size.x, self.backbuffer_size.y)
            .with_fullscreen(self.window.is_fullscreen())
            .with_resizable(self.window.is_resizable())
            .with_multisample(self.multisample)
            .with_vsync(self.vsync))
    }

    /// Release every native object while keeping the definitions.
    fn release_all(&mut self) {
        let Some(backend) = native(&mut self.backend, self.window.is_open()) else {
            return;
        };

        for program in self.programs.values_mut() {
            program.release(backend);
        }
        self.programs.clear();
        for variation in self.variations.values_mut() {
            variation.release(backend);
        }
        for buffer in self.vertex_buffers.values_mut() {
            buffer.release(backend);
        }
        for buffer in self.index_buffers.values_mut() {
            buffer.release(backend);
        }
        for buffer in self.constant_buffers.values_mut() {
            buffer.release(backend);
        }
        for texture in self.textures.values_mut() {
            texture.release(backend);
        }
        self.framebuffers.clear(Some(backend));
    }

    /// Recreate native objects for every defined resource.
    fn recreate_all(&mut self) {
        let Some(backend) = native(&mut self.backend, self.window.is_open()) else {
            return;
        };

        for (id, buffer) in self.vertex_buffers.iter_mut() {
            if let Err(err) = buffer.recreate(backend) {
                log::error!("Failed to recreate vertex buffer {:?}: {}", id, err);
            }
        }
        for (id, buffer) in self.index_buffers.iter_mut() {
            if let Err(err) = buffer.recreate(backend) {
                log::error!("Failed to recreate index buffer {:?}: {}", id, err);
            }
        }
        for (id, buffer) in self.constant_buffers.iter_mut() {
            if let Err(err) = buffer.recreate(backend) {
                log::error!("Failed to recreate constant buffer {:?}: {}", id, err);
            }
        }
        for (id, texture) in self.textures.iter_mut() {
            if let Err(err) = texture.recreate(backend) {
                log::error!("Failed to recreate texture {:?}: {}", id, err);
            }
        }
    }

    /// Forget every binding and mark all state for re-application.
    fn reset_state(&mut self) {
        self.bound_render_targets = [None; MAX_RENDERTARGETS];
        self.bound_depth_stencil = None;
        self.bound_vertex_buffers = [None; MAX_VERTEX_STREAMS];
        self.bound_index_buffer = None;
        self.bound_constant_buffers = [[None; MAX_CONSTANT_BUFFERS]; MAX_SHADER_STAGES];
        self.bound_textures = [None; MAX_TEXTURE_UNITS];
        self.vertex_shader = None;
        self.pixel_shader = None;
        self.blend_state = None;
        self.depth_state = None;
        self.rasterizer_state = None;
        self.stencil_ref = 0;
        self.scissor_rect = IntRect::ZERO;
        self.render_target_size = self.backbuffer_size;
        self.applied = AppliedState::default();
        self.dirty = DirtyFlags::all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::resources::VertexBufferId;
    use crate::types::{ElementSemantic, ElementType, ResourceUsage, VertexElement};
    use crate::window::HeadlessWindow;

    fn vertex_buffer(
        graphics: &mut Graphics<DummyBackend, HeadlessWindow>,
        shadow: bool,
    ) -> VertexBufferId {
        let elements = [VertexElement::new(ElementType::Vector3, ElementSemantic::Position)];
        let data = [0u8; 36];
        let vb = graphics.create_vertex_buffer();
        graphics
            .define_vertex_buffer(vb, ResourceUsage::Default, 3, &elements, shadow, Some(&data))
            .unwrap();
        vb
    }

    #[test]
    fn test_set_mode_rejects_invalid_size() {
        let mut graphics = Graphics::new(HeadlessWindow::new(), DummyBackend::new());
        let result = graphics.set_mode(&DisplayMode::new(0, 480));
        assert!(matches!(result, Err(GraphicsError::InitializationFailed(_))));
        assert!(!graphics.is_initialized());
    }

    #[test]
    fn test_set_mode_clamps_multisample() {
        let mut graphics = Graphics::new(HeadlessWindow::new(), DummyBackend::new());
        graphics
            .set_mode(&DisplayMode::new(640, 480).with_multisample(0))
            .unwrap();
        assert_eq!(graphics.multisample(), 1);
        assert_eq!(graphics.backend().multisample(), 1);
    }

    #[test]
    fn test_context_creation_failure() {
        let mut backend = DummyBackend::new();
        backend.set_fail_context_creation(true);
        let mut graphics = Graphics::new(HeadlessWindow::new(), backend);
        assert!(graphics.set_mode(&DisplayMode::new(640, 480)).is_err());
        assert!(!graphics.is_initialized());
    }

    #[test]
    fn test_resources_defined_before_mode_are_created() {
        let mut graphics = Graphics::new(HeadlessWindow::new(), DummyBackend::new());
        let vb = vertex_buffer(&mut graphics, true);
        assert!(graphics.vertex_buffer_object(vb).unwrap().handle().is_none());

        graphics.set_mode(&DisplayMode::new(640, 480)).unwrap();
        assert!(graphics.vertex_buffer_object(vb).unwrap().handle().is_some());
        assert!(!graphics.is_data_lost(vb));
    }

    #[test]
    fn test_multisample_change_loses_context() {
        let mut graphics = Graphics::new(HeadlessWindow::new(), DummyBackend::new());
        graphics.set_mode(&DisplayMode::new(640, 480)).unwrap();
        let shadowed = vertex_buffer(&mut graphics, true);
        let unshadowed = vertex_buffer(&mut graphics, false);
        graphics.set_vertex_buffer(0, Some(shadowed));
        graphics.take_events();

        graphics.set_multisample(4).unwrap();

        let events = graphics.take_events();
        assert_eq!(events[0], GraphicsEvent::ContextLost);
        assert_eq!(events[1], GraphicsEvent::ContextRestored);
        assert!(matches!(events[2], GraphicsEvent::ScreenMode { multisample: 4, .. }));
        assert_eq!(graphics.backend().stats().context_creations, 2);
        assert_eq!(graphics.size(), IntVector2::new(640, 480));

        assert!(!graphics.is_data_lost(shadowed));
        assert!(graphics.is_data_lost(unshadowed));
        assert_eq!(graphics.vertex_buffer(0), None);
        assert_eq!(graphics.backend().live_buffers(), 2);
    }

    #[test]
    fn test_same_multisample_keeps_context() {
        let mut graphics = Graphics::new(HeadlessWindow::new(), DummyBackend::new());
        graphics.set_mode(&DisplayMode::new(640, 480)).unwrap();
        graphics.set_fullscreen(true).unwrap();

        assert!(graphics.is_fullscreen());
        assert_eq!(graphics.backend().stats().context_creations, 1);
    }

    #[test]
    fn test_mode_changes_require_initialization() {
        let mut graphics = Graphics::new(HeadlessWindow::new(), DummyBackend::new());
        assert!(matches!(
            graphics.set_multisample(2),
            Err(GraphicsError::NotInitialized)
        ));
        assert!(matches!(
            graphics.set_fullscreen(true),
            Err(GraphicsError::NotInitialized)
        ));
    }

    #[test]
    fn test_close_releases_and_mode_recreates() {
        let mut graphics = Graphics::new(HeadlessWindow::new(), DummyBackend::new());
        graphics.set_mode(&DisplayMode::new(640, 480)).unwrap();
        let vb = vertex_buffer(&mut graphics, true);

        graphics.close();
        assert!(!graphics.is_initialized());
        assert_eq!(graphics.size(), IntVector2::ZERO);
        assert!(graphics.vertex_buffer_object(vb).unwrap().handle().is_none());

        graphics.set_mode(&DisplayMode::new(320, 200)).unwrap();
        assert!(graphics.vertex_buffer_object(vb).unwrap().handle().is_some());
    }

    #[test]
    fn test_handle_resize_updates_backbuffer() {
        let mut graphics = Graphics::new(HeadlessWindow::new(), DummyBackend::new());
        graphics
            .set_mode(&DisplayMode::new(640, 480).with_resizable(true))
            .unwrap();

        graphics.window_mut().resize(800, 600);
        graphics.handle_resize();

        assert_eq!(graphics.size(), IntVector2::new(800, 600));
        assert_eq!(graphics.render_target_size(), IntVector2::new(800, 600));
        assert_eq!(graphics.viewport(), IntRect::from_size(800, 600));
    }

    #[test]
    fn test_set_vsync_applies_when_initialized() {
        let mut graphics = Graphics::new(HeadlessWindow::new(), DummyBackend::new());
        graphics.set_vsync(true);
        assert!(graphics.vsync());

        graphics.set_mode(&DisplayMode::new(640, 480)).unwrap();
        assert!(!graphics.backend().state().vsync);
        graphics.set_vsync(true);
        assert!(graphics.backend().state().vsync);
    }
}
