//! The graphics device.
//!
//! [`Graphics`] owns every GPU resource in generational arenas, tracks the
//! state the caller wants (the *desired* state) separately from the state
//! last sent to the backend (the *applied* state), and reconciles the two
//! lazily right before each draw or clear.
//!
//! # Example
//!
//! ```ignore
//! use ember_graphics::backend::dummy::DummyBackend;
//! use ember_graphics::{DisplayMode, Graphics, HeadlessWindow};
//!
//! let mut graphics = Graphics::new(HeadlessWindow::new(), DummyBackend::new());
//! graphics.set_mode(&DisplayMode::new(800, 600))?;
//!
//! let vb = graphics.create_vertex_buffer();
//! graphics.define_vertex_buffer(vb, ResourceUsage::Default, 3, &elements, true, Some(&vertices))?;
//! graphics.set_vertex_buffer(0, Some(vb));
//! graphics.set_shaders(Some(vs), Some(ps));
//! graphics.draw(PrimitiveType::TriangleList, 0, 3);
//! graphics.present();
//! ```

mod bindings;
mod commands;
mod lifecycle;
mod prepare;
mod registry;

use std::collections::HashMap;

use bitflags::bitflags;
use ember_core::{IntRect, IntVector2};
use slotmap::SlotMap;

use crate::backend::RenderBackend;
use crate::framebuffer::FramebufferCache;
use crate::resources::{
    BlendState, BlendStateId, ConstantBuffer, ConstantBufferId, DepthState, DepthStateId,
    IndexBuffer, IndexBufferId, RasterizerState, RasterizerStateId, Texture, TextureId,
    VertexBuffer, VertexBufferId,
};
use crate::settings::DeviceCapabilities;
use crate::shader::{Shader, ShaderId, ShaderProgram, ShaderVariation, ShaderVariationId};
use crate::types::{
    BlendDescriptor, DepthDescriptor, MAX_CONSTANT_BUFFERS, MAX_RENDERTARGETS, MAX_SHADER_STAGES,
    MAX_TEXTURE_UNITS, MAX_VERTEX_ATTRIBUTES, MAX_VERTEX_STREAMS, RasterizerDescriptor,
};
use crate::window::Window;

bitflags! {
    /// Categories of desired state not yet applied to the backend.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DirtyFlags: u32 {
        /// Blend state.
        const BLEND = 1 << 0;
        /// Depth and stencil state, including the stencil reference.
        const DEPTH = 1 << 1;
        /// Rasterizer state, including the scissor rectangle.
        const RASTERIZER = 1 << 2;
        /// Vertex buffer bindings.
        const VERTEX_BUFFERS = 1 << 3;
        /// Vertex attribute pointers.
        const VERTEX_ATTRIBUTES = 1 << 4;
        /// Render target and depth-stencil bindings.
        const FRAMEBUFFER = 1 << 5;
        /// Vertex and pixel shader selection.
        const SHADERS = 1 << 6;
    }
}

/// Notifications emitted by the device, drained with [`Graphics::take_events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphicsEvent {
    /// The screen mode was set.
    ScreenMode {
        /// Backbuffer width.
        width: i32,
        /// Backbuffer height.
        height: i32,
        /// Fullscreen.
        fullscreen: bool,
        /// Resizable window.
        resizable: bool,
        /// Multisample level.
        multisample: u32,
    },
    /// The rendering context is about to be destroyed. Native objects have been released.
    ContextLost,
    /// A new rendering context was created and objects were recreated.
    ContextRestored,
}

/// State last sent to the backend. `None` means unknown, which forces
/// every field to be applied on the next resolution.
#[derive(Debug, Clone, Default)]
struct AppliedState {
    blend: Option<BlendDescriptor>,
    depth: Option<DepthDescriptor>,
    stencil_ref: Option<u8>,
    rasterizer: Option<RasterizerDescriptor>,
    scissor: Option<(i32, i32, i32, i32)>,
    program: Option<(ShaderVariationId, ShaderVariationId)>,
    attributes_enabled: u32,
    attribute_divisors: [u32; MAX_VERTEX_ATTRIBUTES],
}

/// The graphics device.
///
/// Generic over the native backend and the window so that both can be
/// swapped for headless implementations. The device is single-threaded.
pub struct Graphics<B: RenderBackend, W: Window> {
    window: W,
    backend: B,
    capabilities: DeviceCapabilities,
    backbuffer_size: IntVector2,
    render_target_size: IntVector2,
    multisample: u32,
    vsync: bool,

    vertex_buffers: SlotMap<VertexBufferId, VertexBuffer>,
    index_buffers: SlotMap<IndexBufferId, IndexBuffer>,
    constant_buffers: SlotMap<ConstantBufferId, ConstantBuffer>,
    textures: SlotMap<TextureId, Texture>,
    blend_states: SlotMap<BlendStateId, BlendState>,
    depth_states: SlotMap<DepthStateId, DepthState>,
    rasterizer_states: SlotMap<RasterizerStateId, RasterizerState>,
    shaders: SlotMap<ShaderId, Shader>,
    variations: SlotMap<ShaderVariationId, ShaderVariation>,
    programs: HashMap<(ShaderVariationId, ShaderVariationId), ShaderProgram>,
    framebuffers: FramebufferCache,

    bound_render_targets: [Option<TextureId>; MAX_RENDERTARGETS],
    bound_depth_stencil: Option<TextureId>,
    viewport: IntRect,
    scissor_rect: IntRect,
    bound_vertex_buffers: [Option<VertexBufferId>; MAX_VERTEX_STREAMS],
    bound_index_buffer: Option<IndexBufferId>,
    bound_constant_buffers: [[Option<ConstantBufferId>; MAX_CONSTANT_BUFFERS]; MAX_SHADER_STAGES],
    bound_textures: [Option<TextureId>; MAX_TEXTURE_UNITS],
    vertex_shader: Option<ShaderVariationId>,
    pixel_shader: Option<ShaderVariationId>,
    blend_state: Option<BlendStateId>,
    depth_state: Option<DepthStateId>,
    rasterizer_state: Option<RasterizerStateId>,
    stencil_ref: u8,

    dirty: DirtyFlags,
    applied: AppliedState,
    events: Vec<GraphicsEvent>,
}

impl<B: RenderBackend, W: Window> Graphics<B, W> {
    /// Create a device for a window. No rendering context exists until
    /// [`set_mode`](Self::set_mode) succeeds.
    pub fn new(window: W, backend: B) -> Self {
        log::info!("Graphics device using backend: {}", backend.name());
        Self {
            window,
            backend,
            capabilities: DeviceCapabilities::default(),
            backbuffer_size: IntVector2::ZERO,
            render_target_size: IntVector2::ZERO,
            multisample: 1,
            vsync: false,

            vertex_buffers: SlotMap::with_key(),
            index_buffers: SlotMap::with_key(),
            constant_buffers: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            blend_states: SlotMap::with_key(),
            depth_states: SlotMap::with_key(),
            rasterizer_states: SlotMap::with_key(),
            shaders: SlotMap::with_key(),
            variations: SlotMap::with_key(),
            programs: HashMap::new(),
            framebuffers: FramebufferCache::new(),

            bound_render_targets: [None; MAX_RENDERTARGETS],
            bound_depth_stencil: None,
            viewport: IntRect::ZERO,
            scissor_rect: IntRect::ZERO,
            bound_vertex_buffers: [None; MAX_VERTEX_STREAMS],
            bound_index_buffer: None,
            bound_constant_buffers: [[None; MAX_CONSTANT_BUFFERS]; MAX_SHADER_STAGES],
            bound_textures: [None; MAX_TEXTURE_UNITS],
            vertex_shader: None,
            pixel_shader: None,
            blend_state: None,
            depth_state: None,
            rasterizer_state: None,
            stencil_ref: 0,

            dirty: DirtyFlags::all(),
            applied: AppliedState::default(),
            events: Vec::new(),
        }
    }

    /// Whether the window is open and a rendering context exists.
    pub fn is_initialized(&self) -> bool {
        self.window.is_open() && self.backend.has_context()
    }

    /// The window.
    pub fn window(&self) -> &W {
        &self.window
    }

    /// Mutable access to the window, e.g. to resize it before [`handle_resize`](Self::handle_resize).
    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    /// The native backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the native backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Backbuffer size.
    pub fn size(&self) -> IntVector2 {
        self.backbuffer_size
    }

    /// Backbuffer width.
    pub fn width(&self) -> i32 {
        self.backbuffer_size.x
    }

    /// Backbuffer height.
    pub fn height(&self) -> i32 {
        self.backbuffer_size.y
    }

    /// Size of the current color render target, or the backbuffer.
    pub fn render_target_size(&self) -> IntVector2 {
        self.render_target_size
    }

    /// Backbuffer multisample level.
    pub fn multisample(&self) -> u32 {
        self.multisample
    }

    /// Whether vertical sync is enabled.
    pub fn vsync(&self) -> bool {
        self.vsync
    }

    /// Whether the window is fullscreen.
    pub fn is_fullscreen(&self) -> bool {
        self.window.is_fullscreen()
    }

    /// Whether the window is resizable.
    pub fn is_resizable(&self) -> bool {
        self.window.is_resizable()
    }

    /// Limits reported by the backend when the context was created.
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    /// Desired state not yet applied.
    pub fn dirty_flags(&self) -> DirtyFlags {
        self.dirty
    }

    /// Number of cached shader programs.
    pub fn num_shader_programs(&self) -> usize {
        self.programs.len()
    }

    /// The framebuffer cache.
    pub fn framebuffers(&self) -> &FramebufferCache {
        &self.framebuffers
    }

    /// Drain the queued events.
    pub fn take_events(&mut self) -> Vec<GraphicsEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of vertex-stage constant buffer bindings. Pixel-stage
    /// bindings start after them.
    fn vs_constant_buffer_slots(&self) -> u32 {
        self.capabilities
            .max_vs_constant_buffers
            .min(MAX_CONSTANT_BUFFERS) as u32
    }
}

/// The backend as a trait object when a context exists.
fn native<B: RenderBackend>(backend: &mut B, window_open: bool) -> Option<&mut dyn RenderBackend> {
    if window_open && backend.has_context() {
        Some(backend as &mut dyn RenderBackend)
    } else {
        None
    }
}

static_assertions::assert_impl_all!(GraphicsEvent: Send, Sync);
static_assertions::assert_impl_all!(DirtyFlags: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::settings::DisplayMode;
    use crate::window::HeadlessWindow;

    #[test]
    fn test_new_device_is_uninitialized() {
        let graphics = Graphics::new(HeadlessWindow::new(), DummyBackend::new());
        assert!(!graphics.is_initialized());
        assert_eq!(graphics.size(), IntVector2::ZERO);
        assert_eq!(graphics.dirty_flags(), DirtyFlags::all());
    }

    #[test]
    fn test_take_events_drains() {
        let mut graphics = Graphics::new(HeadlessWindow::new(), DummyBackend::new());
        graphics.set_mode(&DisplayMode::new(320, 240)).unwrap();

        let events = graphics.take_events();
        assert_eq!(
            events,
            vec![GraphicsEvent::ScreenMode {
                width: 320,
                height: 240,
                fullscreen: false,
                resizable: false,
                multisample: 1,
            }]
        );
        assert!(graphics.take_events().is_empty());
    }
}
