//! Linked shader programs.

use ember_core::profiling::profile_scope;

use crate::backend::{NativeHandle, RenderBackend};
use crate::error::GraphicsError;
use crate::resources::GpuObject;
use crate::types::ElementSemantic;

use super::ShaderVariationId;

/// Outcome of the one link attempt a program gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// Not linked yet.
    #[default]
    NotAttempted,
    /// The link failed and will not be retried.
    Failed,
    /// Linked to a native program object.
    Linked(NativeHandle),
}

/// A vertex input of a linked program, resolved to a semantic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Name as declared in the shader.
    pub name: String,
    /// Semantic derived from the name prefix.
    pub semantic: ElementSemantic,
    /// Semantic index derived from the name suffix.
    pub index: u8,
    /// Native attribute location.
    pub location: u32,
}

/// A vertex and pixel shader variation linked together.
#[derive(Debug)]
pub struct ShaderProgram {
    vs: ShaderVariationId,
    ps: ShaderVariationId,
    name: String,
    state: LinkState,
    attributes: Vec<VertexAttribute>,
    locations: Vec<Vec<Option<u32>>>,
}

impl ShaderProgram {
    /// Create an unlinked program. `name` is used in log messages.
    pub fn new(vs: ShaderVariationId, ps: ShaderVariationId, name: impl Into<String>) -> Self {
        Self {
            vs,
            ps,
            name: name.into(),
            state: LinkState::NotAttempted,
            attributes: Vec::new(),
            locations: vec![Vec::new(); ElementSemantic::COUNT],
        }
    }

    /// Link the compiled stages and assign texture units and block bindings.
    ///
    /// Sampler uniforms go to the texture unit given by the number in their
    /// name. Uniform blocks go to the binding given by the number in their
    /// name, or their block index without one. Pixel shader blocks are
    /// offset by `num_vs_constant_buffers`. A block is assigned to a stage by
    /// searching for its name in the stage sources.
    #[allow(clippy::too_many_arguments)]
    pub fn link(
        &mut self,
        backend: &mut dyn RenderBackend,
        vs: NativeHandle,
        ps: NativeHandle,
        vs_source: &str,
        ps_source: &str,
        num_vs_constant_buffers: u32,
    ) -> Result<NativeHandle, GraphicsError> {
        match self.state {
            LinkState::Linked(handle) => return Ok(handle),
            LinkState::Failed => {
                return Err(GraphicsError::ProgramLinkFailed {
                    name: self.name.clone(),
                    log: "previous link attempt failed".to_string(),
                });
            }
            LinkState::NotAttempted => {}
        }

        profile_scope!("link_shader_program");

        self.state = LinkState::Failed;
        let program = match backend.link_program(vs, ps) {
            Ok(program) => program,
            Err(error_log) => {
                log::error!("Could not link shaders {}: {}", self.name, error_log);
                return Err(GraphicsError::ProgramLinkFailed {
                    name: self.name.clone(),
                    log: error_log,
                });
            }
        };
        self.state = LinkState::Linked(program);
        log::debug!("Linked shaders {}", self.name);

        let reflection = backend.program_reflection(program);

        self.attributes.clear();
        self.locations = vec![Vec::new(); ElementSemantic::COUNT];
        for attribute in &reflection.attributes {
            let Some((semantic, index)) = parse_attribute_name(&attribute.name) else {
                log::warn!(
                    "Found vertex attribute {} with no known semantic in shader program {}",
                    attribute.name,
                    self.name
                );
                continue;
            };

            let slots = &mut self.locations[semantic.index()];
            if slots.len() <= index as usize {
                slots.resize(index as usize + 1, None);
            }
            slots[index as usize] = Some(attribute.location);

            self.attributes.push(VertexAttribute {
                name: attribute.name.clone(),
                semantic,
                index,
                location: attribute.location,
            });
        }

        for sampler in &reflection.samplers {
            if let Some(unit) = number_postfix(&sampler.name) {
                backend.set_program_sampler_unit(program, sampler.location, unit);
            }
        }

        for block in &reflection.uniform_blocks {
            let in_vs = vs_source.contains(block.name.as_str());
            let in_ps = ps_source.contains(block.name.as_str());
            if in_vs && in_ps {
                log::warn!(
                    "Found uniform block {} in both vertex and pixel shader in shader program {}",
                    block.name,
                    self.name
                );
                continue;
            }

            let mut binding = number_postfix(&block.name).unwrap_or(block.index);
            if in_ps {
                binding += num_vs_constant_buffers;
            }
            backend.set_program_block_binding(program, block.index, binding);
        }

        Ok(program)
    }

    /// Native location of the attribute with the given semantic and index.
    ///
    /// Returns `None` when the program does not consume that input.
    pub fn attribute_location(&self, semantic: ElementSemantic, index: u8) -> Option<u32> {
        self.locations
            .get(semantic.index())
            .and_then(|slots| slots.get(index as usize))
            .copied()
            .flatten()
    }

    /// Vertex inputs with known semantics.
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Vertex shader variation.
    pub fn vertex_shader(&self) -> ShaderVariationId {
        self.vs
    }

    /// Pixel shader variation.
    pub fn pixel_shader(&self) -> ShaderVariationId {
        self.ps
    }

    /// Combined name of both variations.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Link state.
    pub fn link_state(&self) -> LinkState {
        self.state
    }

    /// Native program object, if linked successfully.
    pub fn handle(&self) -> Option<NativeHandle> {
        match self.state {
            LinkState::Linked(handle) => Some(handle),
            _ => None,
        }
    }

    /// Whether the program uses either of the given variations.
    pub fn uses(&self, variation: ShaderVariationId) -> bool {
        self.vs == variation || self.ps == variation
    }
}

impl GpuObject for ShaderProgram {
    fn release(&mut self, backend: &mut dyn RenderBackend) {
        if let LinkState::Linked(handle) = self.state {
            backend.destroy_program(handle);
        }
        self.state = LinkState::NotAttempted;
        self.attributes.clear();
        self.locations = vec![Vec::new(); ElementSemantic::COUNT];
    }

    /// Programs are relinked on demand from the device's program cache.
    fn recreate(&mut self, _backend: &mut dyn RenderBackend) -> Result<(), GraphicsError> {
        Ok(())
    }
}

/// The number following the first digit found in `name`, e.g. 2 for `DiffuseMap2`.
pub fn number_postfix(name: &str) -> Option<u32> {
    let start = name.find(|c: char| c.is_ascii_digit())?;
    let digits: &str = &name[start..];
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}

/// Match an attribute name against the semantic names, case-insensitively by prefix.
fn parse_attribute_name(name: &str) -> Option<(ElementSemantic, u8)> {
    let upper = name.to_ascii_uppercase();
    ElementSemantic::ALL.iter().find_map(|&semantic| {
        let suffix = upper.strip_prefix(semantic.name())?;
        let index = if suffix.is_empty() {
            0
        } else {
            suffix.parse::<u8>().unwrap_or(0)
        };
        Some((semantic, index))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::types::ShaderStage;
    use crate::window::{HeadlessWindow, Window};

    const VS: &str = "\
in vec3 position;
in vec2 texCoord1;
in vec4 mystery;
uniform PerObjectVS1 {
    mat4 worldMatrix;
};
uniform Shared {
    vec4 value;
};
void main() {}
";

    const PS: &str = "\
uniform sampler2D diffuseMap3;
uniform sampler2D noUnitMap;
uniform PerMaterialPS2 {
    vec4 color;
};
uniform Shared {
    vec4 value;
};
void main() {}
";

    fn ids() -> (ShaderVariationId, ShaderVariationId) {
        let mut arena = slotmap::SlotMap::<ShaderVariationId, ()>::with_key();
        (arena.insert(()), arena.insert(()))
    }

    fn linked_program(backend: &mut DummyBackend) -> (ShaderProgram, NativeHandle) {
        let mut window = HeadlessWindow::new();
        window.set_size(32, 32, false);
        backend.create_context(&window, 1).unwrap();

        let vs = backend.compile_shader(ShaderStage::Vertex, VS).unwrap();
        let ps = backend.compile_shader(ShaderStage::Pixel, PS).unwrap();
        let (vs_id, ps_id) = ids();
        let mut program = ShaderProgram::new(vs_id, ps_id, "Test.vs Test.ps");
        let handle = program.link(backend, vs, ps, VS, PS, 15).unwrap();
        (program, handle)
    }

    #[test]
    fn test_number_postfix() {
        assert_eq!(number_postfix("diffuseMap3"), Some(3));
        assert_eq!(number_postfix("PerObjectVS12"), Some(12));
        assert_eq!(number_postfix("noUnitMap"), None);
        assert_eq!(number_postfix("light2Color"), Some(2));
    }

    #[test]
    fn test_parse_attribute_name() {
        assert_eq!(
            parse_attribute_name("position"),
            Some((ElementSemantic::Position, 0))
        );
        assert_eq!(
            parse_attribute_name("texCoord1"),
            Some((ElementSemantic::TexCoord, 1))
        );
        assert_eq!(
            parse_attribute_name("BlendIndices"),
            Some((ElementSemantic::BlendIndices, 0))
        );
        assert_eq!(parse_attribute_name("mystery"), None);
    }

    #[test]
    fn test_attribute_table_with_gaps() {
        let mut backend = DummyBackend::new();
        let (program, _) = linked_program(&mut backend);

        assert_eq!(program.attributes().len(), 2);
        assert!(program.attribute_location(ElementSemantic::Position, 0).is_some());
        assert!(program.attribute_location(ElementSemantic::TexCoord, 1).is_some());
        assert_eq!(program.attribute_location(ElementSemantic::TexCoord, 0), None);
        assert_eq!(program.attribute_location(ElementSemantic::Normal, 0), None);
    }

    #[test]
    fn test_sampler_units_and_block_bindings() {
        let mut backend = DummyBackend::new();
        let (_, handle) = linked_program(&mut backend);
        let reflection = backend.program_reflection(handle);

        let diffuse = reflection.samplers.iter().find(|s| s.name == "diffuseMap3").unwrap();
        assert_eq!(backend.sampler_unit(handle, diffuse.location), Some(3));
        let no_unit = reflection.samplers.iter().find(|s| s.name == "noUnitMap").unwrap();
        assert_eq!(backend.sampler_unit(handle, no_unit.location), None);

        let block = |name: &str| reflection.uniform_blocks.iter().find(|b| b.name == name).unwrap().index;
        assert_eq!(backend.block_binding(handle, block("PerObjectVS1")), Some(1));
        assert_eq!(backend.block_binding(handle, block("PerMaterialPS2")), Some(17));
        assert_eq!(backend.block_binding(handle, block("Shared")), None);
    }

    #[test]
    fn test_failed_link_is_sticky() {
        let mut backend = DummyBackend::new();
        let mut window = HeadlessWindow::new();
        window.set_size(32, 32, false);
        backend.create_context(&window, 1).unwrap();

        let vs = backend.compile_shader(ShaderStage::Vertex, "in vec3 position;").unwrap();
        let ps = backend.compile_shader(ShaderStage::Pixel, PS).unwrap();
        let (vs_id, ps_id) = ids();
        let mut program = ShaderProgram::new(vs_id, ps_id, "Broken");

        assert!(program.link(&mut backend, vs, ps, "", PS, 15).is_err());
        assert!(program.link(&mut backend, vs, ps, "", PS, 15).is_err());
        assert_eq!(backend.stats().link_calls, 1);
        assert_eq!(program.link_state(), LinkState::Failed);
        assert!(program.uses(vs_id));
    }
}
