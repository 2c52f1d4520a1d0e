//! Just-in-time resolution of desired state into native calls.
//!
//! Runs before every draw in a fixed order: framebuffer, shader program,
//! vertex attributes, then fixed-function state. Each step only does work
//! when its dirty flag is set, and fixed-function state is compared field
//! by field against the applied snapshot so unchanged fields cost nothing.

use ember_core::profiling::profile_scope;
use slotmap::SlotMap;

use crate::backend::{NativeFace, NativeHandle, RenderBackend};
use crate::error::GraphicsError;
use crate::framebuffer::{Attachment, framebuffer_key};
use crate::resources::TextureId;
use crate::shader::{Shader, ShaderId, ShaderProgram, ShaderVariation, ShaderVariationId};
use crate::types::{
    BlendDescriptor, CullMode, DepthDescriptor, MAX_VERTEX_ATTRIBUTES, RasterizerDescriptor,
    ShaderStage,
};
use crate::window::Window;

use super::{DirtyFlags, Graphics, native};

/// Map a face in the device convention, where clockwise triangles face the
/// viewer, to the native counter-clockwise convention. `CullMode::None` has
/// no face.
pub(crate) fn native_face(face: CullMode) -> Option<NativeFace> {
    match face {
        CullMode::None => None,
        CullMode::Front => Some(NativeFace::Back),
        CullMode::Back => Some(NativeFace::Front),
    }
}

impl<B: RenderBackend, W: Window> Graphics<B, W> {
    /// Resolve everything a draw needs. Returns false when there is no
    /// usable shader program, in which case the draw must be skipped.
    pub(super) fn prepare_draw(&mut self, instanced: bool, instance_start: usize) -> bool {
        profile_scope!("prepare_draw");

        if !self.is_initialized() {
            return false;
        }

        self.prepare_framebuffer();
        let has_program = self.prepare_program();
        if has_program {
            self.prepare_attributes(instanced, instance_start);
        }
        self.prepare_state();
        has_program
    }

    /// Bind the backbuffer or a cached framebuffer with the desired attachments.
    pub(super) fn prepare_framebuffer(&mut self) {
        if !self.dirty.contains(DirtyFlags::FRAMEBUFFER) {
            return;
        }

        let attachment = |id: TextureId| {
            let texture = self.textures.get(id)?;
            texture.handle().map(|handle| {
                (
                    Attachment {
                        texture: id,
                        handle,
                    },
                    texture,
                )
            })
        };
        let colors = self.bound_render_targets.map(|slot| slot.and_then(attachment));
        let depth_stencil = self.bound_depth_stencil.and_then(attachment);

        let primary = colors.iter().flatten().next().or(depth_stencil.as_ref());
        let target = primary.map(|(_, texture)| framebuffer_key(texture.size(), texture.format()));
        let has_stencil = depth_stencil
            .as_ref()
            .is_some_and(|(_, texture)| texture.format().has_stencil());
        let colors = colors.map(|slot| slot.map(|(attachment, _)| attachment));
        let depth_stencil = depth_stencil.map(|(attachment, _)| attachment);

        let Some(backend) = native(&mut self.backend, self.window.is_open()) else {
            return;
        };
        self.dirty.remove(DirtyFlags::FRAMEBUFFER);

        let Some(key) = target else {
            self.framebuffers.bind_backbuffer(backend);
            return;
        };
        match self.framebuffers.bind(backend, key) {
            Ok(framebuffer) => {
                framebuffer.update_attachments(backend, &colors, depth_stencil, has_stencil);
            }
            Err(e) => {
                log::error!("Failed to create framebuffer: {}", e);
                self.framebuffers.bind_backbuffer(backend);
            }
        }
    }

    /// Compile, link and bind the program of the selected shaders.
    /// Returns whether a linked program is in use.
    fn prepare_program(&mut self) -> bool {
        if self.dirty.contains(DirtyFlags::SHADERS) {
            self.dirty.remove(DirtyFlags::SHADERS);

            let linked = match (self.vertex_shader, self.pixel_shader) {
                (Some(vs), Some(ps)) => self.link_program(vs, ps).ok().map(|h| ((vs, ps), h)),
                _ => None,
            };

            let applied = self.applied.program;
            if let Some(backend) = native(&mut self.backend, self.window.is_open()) {
                match linked {
                    Some((key, handle)) => {
                        if applied != Some(key) {
                            backend.use_program(Some(handle));
                            self.applied.program = Some(key);
                            self.dirty |= DirtyFlags::VERTEX_ATTRIBUTES;
                        }
                    }
                    None => {
                        if applied.is_some() {
                            backend.use_program(None);
                        }
                        self.applied.program = None;
                    }
                }
            }
        }

        self.applied.program.is_some()
    }

    /// Get the program of a variation pair from the cache, creating and
    /// linking it on first use.
    fn link_program(
        &mut self,
        vs: ShaderVariationId,
        ps: ShaderVariationId,
    ) -> Result<NativeHandle, GraphicsError> {
        profile_scope!("link_program");

        let num_vs_constant_buffers = self.vs_constant_buffer_slots();
        let Some(backend) = native(&mut self.backend, self.window.is_open()) else {
            return Err(GraphicsError::NotInitialized);
        };

        let vs_handle = compile_stage(
            &mut self.variations,
            &self.shaders,
            &mut *backend,
            vs,
            ShaderStage::Vertex,
        )?;
        let ps_handle = compile_stage(
            &mut self.variations,
            &self.shaders,
            &mut *backend,
            ps,
            ShaderStage::Pixel,
        )?;

        let source = |id: ShaderVariationId| {
            self.variations
                .get(id)
                .and_then(|v| self.shaders.get(v.parent()))
                .map_or("", |s| s.source_code())
        };
        let (vs_source, ps_source) = (source(vs), source(ps));

        let program = self.programs.entry((vs, ps)).or_insert_with(|| {
            let name = |id: ShaderVariationId| {
                self.variations
                    .get(id)
                    .map(|v| v.full_name(self.shaders.get(v.parent())))
                    .unwrap_or_default()
            };
            ShaderProgram::new(vs, ps, format!("{} {}", name(vs), name(ps)))
        });
        program.link(
            backend,
            vs_handle,
            ps_handle,
            vs_source,
            ps_source,
            num_vs_constant_buffers,
        )
    }

    /// Point the attributes the program consumes at the bound vertex
    /// buffers, and disable the rest.
    ///
    /// Instanced draws always rebind, because per-instance attributes are
    /// offset by the first instance.
    fn prepare_attributes(&mut self, instanced: bool, instance_start: usize) {
        if !instanced
            && !self
                .dirty
                .intersects(DirtyFlags::VERTEX_ATTRIBUTES | DirtyFlags::VERTEX_BUFFERS)
        {
            return;
        }

        let Some(program) = self.applied.program.and_then(|key| self.programs.get(&key)) else {
            return;
        };
        let Some(backend) = native(&mut self.backend, self.window.is_open()) else {
            return;
        };
        self.dirty
            .remove(DirtyFlags::VERTEX_ATTRIBUTES | DirtyFlags::VERTEX_BUFFERS);

        let mut used = 0u32;
        let streams = self
            .bound_vertex_buffers
            .iter()
            .flatten()
            .filter_map(|id| self.vertex_buffers.get(*id));
        for buffer in streams {
            let Some(handle) = buffer.handle() else {
                continue;
            };
            let stride = buffer.vertex_size();

            let mut buffer_bound = false;
            for element in buffer.elements() {
                let Some(location) = program.attribute_location(element.semantic, element.index)
                else {
                    continue;
                };
                let slot = location as usize;
                // First stream wins
                if slot >= MAX_VERTEX_ATTRIBUTES || used & (1 << slot) != 0 {
                    continue;
                }

                if !buffer_bound {
                    backend.bind_vertex_buffer(Some(handle));
                    buffer_bound = true;
                }

                let (offset, divisor) = if element.per_instance {
                    (element.offset + instance_start * stride, 1)
                } else {
                    (element.offset, 0)
                };
                backend.set_vertex_attribute(location, element.element_type, stride, offset);
                if self.applied.attribute_divisors[slot] != divisor {
                    backend.set_vertex_attribute_divisor(location, divisor);
                    self.applied.attribute_divisors[slot] = divisor;
                }
                used |= 1 << slot;
            }
        }

        let enabled = self.applied.attributes_enabled;
        for slot in 0..MAX_VERTEX_ATTRIBUTES {
            let bit = 1 << slot;
            if used & bit != 0 && enabled & bit == 0 {
                backend.enable_vertex_attribute(slot as u32, true);
            } else if used & bit == 0 && enabled & bit != 0 {
                backend.enable_vertex_attribute(slot as u32, false);
            }
        }
        self.applied.attributes_enabled = used;

        if instanced {
            self.dirty |= DirtyFlags::VERTEX_ATTRIBUTES;
        }
    }

    /// Apply blend, depth-stencil and rasterizer state that differs from
    /// the applied snapshot.
    fn prepare_state(&mut self) {
        let pending =
            self.dirty & (DirtyFlags::BLEND | DirtyFlags::DEPTH | DirtyFlags::RASTERIZER);
        if pending.is_empty() {
            return;
        }

        let blend = self
            .blend_state
            .and_then(|id| self.blend_states.get(id))
            .and_then(|s| s.descriptor())
            .copied()
            .unwrap_or_default();
        let depth = self
            .depth_state
            .and_then(|id| self.depth_states.get(id))
            .and_then(|s| s.descriptor())
            .copied()
            .unwrap_or_default();
        let rasterizer = self
            .rasterizer_state
            .and_then(|id| self.rasterizer_states.get(id))
            .and_then(|s| s.descriptor())
            .copied()
            .unwrap_or_default();
        let scissor = self.native_rect(self.scissor_rect);
        let stencil_ref = self.stencil_ref;

        let Some(backend) = native(&mut self.backend, self.window.is_open()) else {
            return;
        };
        self.dirty.remove(pending);

        if pending.contains(DirtyFlags::BLEND) {
            apply_blend(backend, self.applied.blend.as_ref(), &blend);
            self.applied.blend = Some(blend);
        }

        if pending.contains(DirtyFlags::DEPTH) {
            apply_depth(
                backend,
                self.applied.depth.as_ref(),
                self.applied.stencil_ref,
                &depth,
                stencil_ref,
            );
            self.applied.depth = Some(depth);
            self.applied.stencil_ref = Some(stencil_ref);
        }

        if pending.contains(DirtyFlags::RASTERIZER) {
            apply_rasterizer(backend, self.applied.rasterizer.as_ref(), &rasterizer);
            self.applied.rasterizer = Some(rasterizer);

            if rasterizer.scissor_enable && self.applied.scissor != Some(scissor) {
                let (x, y, width, height) = scissor;
                backend.set_scissor_rect(x, y, width, height);
                self.applied.scissor = Some(scissor);
            }
        }
    }
}

fn compile_stage(
    variations: &mut SlotMap<ShaderVariationId, ShaderVariation>,
    shaders: &SlotMap<ShaderId, Shader>,
    backend: &mut dyn RenderBackend,
    id: ShaderVariationId,
    stage: ShaderStage,
) -> Result<NativeHandle, GraphicsError> {
    let variation = variations.get_mut(id).ok_or(GraphicsError::InvalidHandle)?;
    if variation.stage() != stage {
        log::error!(
            "Shader variation {} is not a {} shader",
            variation.full_name(shaders.get(variation.parent())),
            stage.name()
        );
        return Err(GraphicsError::InvalidParameter(format!(
            "expected {} shader",
            stage.name()
        )));
    }
    variation.compile(Some(backend), shaders.get(variation.parent()))
}

fn apply_blend(
    backend: &mut dyn RenderBackend,
    applied: Option<&BlendDescriptor>,
    desired: &BlendDescriptor,
) {
    if applied.is_none_or(|a| a.blend_enable != desired.blend_enable) {
        backend.set_blend_enable(desired.blend_enable);
    }
    if applied.is_none_or(|a| {
        a.src_blend != desired.src_blend
            || a.dest_blend != desired.dest_blend
            || a.src_blend_alpha != desired.src_blend_alpha
            || a.dest_blend_alpha != desired.dest_blend_alpha
    }) {
        backend.set_blend_func(
            desired.src_blend,
            desired.dest_blend,
            desired.src_blend_alpha,
            desired.dest_blend_alpha,
        );
    }
    if applied.is_none_or(|a| {
        a.blend_op != desired.blend_op || a.blend_op_alpha != desired.blend_op_alpha
    }) {
        backend.set_blend_op(desired.blend_op, desired.blend_op_alpha);
    }
    if applied.is_none_or(|a| a.color_write_mask != desired.color_write_mask) {
        backend.set_color_write_mask(desired.color_write_mask);
    }
    if applied.is_none_or(|a| a.alpha_to_coverage != desired.alpha_to_coverage) {
        backend.set_alpha_to_coverage(desired.alpha_to_coverage);
    }
}

fn apply_depth(
    backend: &mut dyn RenderBackend,
    applied: Option<&DepthDescriptor>,
    applied_ref: Option<u8>,
    desired: &DepthDescriptor,
    stencil_ref: u8,
) {
    if applied.is_none_or(|a| a.depth_enable != desired.depth_enable) {
        backend.set_depth_test(desired.depth_enable);
    }
    if applied.is_none_or(|a| a.depth_write != desired.depth_write) {
        backend.set_depth_write(desired.depth_write);
    }
    if applied.is_none_or(|a| a.depth_func != desired.depth_func) {
        backend.set_depth_func(desired.depth_func);
    }
    if applied.is_none_or(|a| a.stencil_enable != desired.stencil_enable) {
        backend.set_stencil_test(desired.stencil_enable);
    }

    let ref_changed = applied_ref != Some(stencil_ref);
    let faces = [
        (
            CullMode::Front,
            &desired.front,
            applied.map(|a| (&a.front, a.stencil_read_mask)),
        ),
        (
            CullMode::Back,
            &desired.back,
            applied.map(|a| (&a.back, a.stencil_read_mask)),
        ),
    ];
    for (face, face_desc, applied_face) in faces {
        let Some(native) = native_face(face) else {
            continue;
        };

        if ref_changed
            || applied_face.is_none_or(|(a, read_mask)| {
                a.func != face_desc.func || read_mask != desired.stencil_read_mask
            })
        {
            backend.set_stencil_func(
                native,
                face_desc.func,
                stencil_ref,
                desired.stencil_read_mask,
            );
        }
        if applied_face.is_none_or(|(a, _)| {
            (a.fail, a.depth_fail, a.pass) != (face_desc.fail, face_desc.depth_fail, face_desc.pass)
        }) {
            backend.set_stencil_op(native, face_desc.fail, face_desc.depth_fail, face_desc.pass);
        }
    }

    if applied.is_none_or(|a| a.stencil_write_mask != desired.stencil_write_mask) {
        backend.set_stencil_write_mask(desired.stencil_write_mask);
    }
}

fn apply_rasterizer(
    backend: &mut dyn RenderBackend,
    applied: Option<&RasterizerDescriptor>,
    desired: &RasterizerDescriptor,
) {
    if applied.is_none_or(|a| a.fill_mode != desired.fill_mode) {
        backend.set_fill_mode(desired.fill_mode);
    }
    if applied.is_none_or(|a| a.cull_mode != desired.cull_mode) {
        backend.set_cull_face(native_face(desired.cull_mode));
    }
    if applied.is_none_or(|a| {
        a.depth_bias != desired.depth_bias
            || a.slope_scaled_depth_bias != desired.slope_scaled_depth_bias
            || a.depth_bias_clamp != desired.depth_bias_clamp
    }) {
        backend.set_depth_bias(
            desired.depth_bias as f32,
            desired.slope_scaled_depth_bias,
            desired.depth_bias_clamp,
        );
    }
    if applied.is_none_or(|a| a.depth_clip_enable != desired.depth_clip_enable) {
        backend.set_depth_clamp(!desired.depth_clip_enable);
    }
    if applied.is_none_or(|a| a.scissor_enable != desired.scissor_enable) {
        backend.set_scissor_test(desired.scissor_enable);
    }
    if applied.is_none_or(|a| a.multisample_enable != desired.multisample_enable) {
        backend.set_multisample(desired.multisample_enable);
    }
    if applied.is_none_or(|a| a.antialiased_line_enable != desired.antialiased_line_enable) {
        backend.set_line_smooth(desired.antialiased_line_enable);
    }
}

#[cfg(test)]
mod tests {
    use ember_core::IntRect;

    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::settings::DisplayMode;
    use crate::types::{
        CompareMode, ElementSemantic, ElementType, PrimitiveType, ResourceUsage,
        StencilFaceDescriptor, StencilOp, VertexElement,
    };
    use crate::window::HeadlessWindow;

    const VS: &str = "in vec3 position;\nin vec4 color;\nvoid main() {}\n";
    const PS: &str = "void main() {}\n";

    fn graphics() -> Graphics<DummyBackend, HeadlessWindow> {
        let mut graphics = Graphics::new(HeadlessWindow::new(), DummyBackend::new());
        graphics.set_mode(&DisplayMode::new(640, 480)).unwrap();
        graphics
    }

    fn bind_shaders(graphics: &mut Graphics<DummyBackend, HeadlessWindow>) {
        let vs = graphics.create_shader();
        graphics.define_shader(vs, ShaderStage::Vertex, "Test.vs", VS).unwrap();
        let ps = graphics.create_shader();
        graphics.define_shader(ps, ShaderStage::Pixel, "Test.ps", PS).unwrap();
        let vs = graphics.create_variation(vs, "").unwrap();
        let ps = graphics.create_variation(ps, "").unwrap();
        graphics.set_shaders(Some(vs), Some(ps));
    }

    #[test]
    fn test_native_face_mapping() {
        assert_eq!(native_face(CullMode::None), None);
        assert_eq!(native_face(CullMode::Front), Some(NativeFace::Back));
        assert_eq!(native_face(CullMode::Back), Some(NativeFace::Front));
    }

    #[test]
    fn test_default_cull_mode_culls_native_front() {
        let mut graphics = graphics();
        bind_shaders(&mut graphics);
        graphics.draw(PrimitiveType::TriangleList, 0, 3);
        assert_eq!(graphics.backend().state().cull_face, Some(NativeFace::Front));
    }

    #[test]
    fn test_unchanged_state_issues_no_calls() {
        let mut graphics = graphics();
        bind_shaders(&mut graphics);
        graphics.draw(PrimitiveType::TriangleList, 0, 3);

        let alpha = graphics.create_blend_state();
        graphics
            .define_blend_state(alpha, &BlendDescriptor::alpha())
            .unwrap();
        graphics.set_blend_state(Some(alpha));
        graphics.draw(PrimitiveType::TriangleList, 0, 3);
        let calls = graphics.backend().stats().state_calls;

        let same = graphics.create_blend_state();
        graphics.define_blend_state(same, &BlendDescriptor::alpha()).unwrap();
        graphics.set_blend_state(Some(same));
        graphics.draw(PrimitiveType::TriangleList, 0, 3);
        assert_eq!(graphics.backend().stats().state_calls, calls);
        assert!(graphics.backend().state().blend_enable);
    }

    #[test]
    fn test_stencil_faces_are_swapped() {
        let mut graphics = graphics();
        bind_shaders(&mut graphics);

        let mut desc = DepthDescriptor::default().with_stencil(StencilFaceDescriptor {
            pass: StencilOp::Incr,
            ..StencilFaceDescriptor::default()
        });
        desc.back.func = CompareMode::Never;
        let state = graphics.create_depth_state();
        graphics.define_depth_state(state, &desc).unwrap();
        graphics.set_depth_state(Some(state), 3);
        graphics.draw(PrimitiveType::TriangleList, 0, 3);

        let native = graphics.backend().state();
        assert!(native.stencil_test);
        assert_eq!(native.stencil_back.pass, StencilOp::Incr);
        assert_eq!(native.stencil_back.func, CompareMode::Always);
        assert_eq!(native.stencil_front.func, CompareMode::Never);
        assert_eq!(native.stencil_front.reference, 3);
    }

    #[test]
    fn test_unused_attributes_are_disabled() {
        let mut graphics = graphics();
        bind_shaders(&mut graphics);

        let vb = graphics.create_vertex_buffer();
        let elements = [
            VertexElement::new(ElementType::Vector3, ElementSemantic::Position),
            VertexElement::new(ElementType::Vector3, ElementSemantic::Normal),
            VertexElement::new(ElementType::UByte4, ElementSemantic::Color),
        ];
        graphics
            .define_vertex_buffer(vb, ResourceUsage::Default, 3, &elements, false, None)
            .unwrap();
        graphics.set_vertex_buffer(0, Some(vb));
        graphics.draw(PrimitiveType::TriangleList, 0, 3);

        let program = graphics.shader_program().unwrap();
        let position = program.attribute_location(ElementSemantic::Position, 0).unwrap() as usize;
        let color = program.attribute_location(ElementSemantic::Color, 0).unwrap() as usize;
        let native = graphics.backend().state();
        assert!(native.attribute_enabled[position]);
        assert!(native.attribute_enabled[color]);
        assert_eq!(native.attribute_enabled.iter().filter(|e| **e).count(), 2);
        assert_eq!(native.attributes[color].unwrap().offset, 24);
        assert_eq!(native.attributes[color].unwrap().stride, 28);

        graphics.set_vertex_buffer(0, None);
        graphics.draw(PrimitiveType::TriangleList, 0, 3);
        assert!(!graphics.backend().state().attribute_enabled.iter().any(|e| *e));
    }

    #[test]
    fn test_scissor_rect_applied_flipped() {
        let mut graphics = graphics();
        bind_shaders(&mut graphics);

        let state = graphics.create_rasterizer_state();
        graphics
            .define_rasterizer_state(state, &RasterizerDescriptor::default().with_scissor(true))
            .unwrap();
        graphics.set_rasterizer_state(Some(state));
        graphics.set_scissor_rect(IntRect::new(10, 20, 110, 70));
        graphics.draw(PrimitiveType::TriangleList, 0, 3);

        let native = graphics.backend().state();
        assert!(native.scissor_test);
        assert_eq!(native.scissor, (10, 410, 100, 50));
    }
}
