//! Compiled shader variations.

use ember_core::profiling::profile_scope;

use crate::backend::{NativeHandle, RenderBackend};
use crate::error::GraphicsError;
use crate::resources::GpuObject;
use crate::types::ShaderStage;

use super::{Shader, ShaderId};

/// Outcome of the one compile attempt a variation gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompileState {
    /// Not compiled yet.
    #[default]
    NotAttempted,
    /// The compile failed and will not be retried until released.
    Failed,
    /// Compiled to a native shader object.
    Compiled(NativeHandle),
}

/// One stage of shader code compiled with a specific set of defines.
#[derive(Debug)]
pub struct ShaderVariation {
    parent: ShaderId,
    stage: ShaderStage,
    defines: String,
    state: CompileState,
}

impl ShaderVariation {
    /// Create an uncompiled variation. `defines` should already be normalized.
    pub fn new(parent: ShaderId, stage: ShaderStage, defines: impl Into<String>) -> Self {
        Self {
            parent,
            stage,
            defines: defines.into(),
            state: CompileState::NotAttempted,
        }
    }

    /// Compile, unless a compile has already been attempted.
    pub fn compile(
        &mut self,
        backend: Option<&mut dyn RenderBackend>,
        parent: Option<&Shader>,
    ) -> Result<NativeHandle, GraphicsError> {
        let full_name = self.full_name(parent);
        match self.state {
            CompileState::Compiled(handle) => return Ok(handle),
            CompileState::Failed => {
                return Err(GraphicsError::ShaderCompileFailed {
                    name: full_name,
                    log: "previous compile attempt failed".to_string(),
                });
            }
            CompileState::NotAttempted => {}
        }

        profile_scope!("compile_shader_variation");

        // Do not retry without a release in between
        self.state = CompileState::Failed;

        let Some(backend) = backend else {
            log::error!("Can not compile shader without initialized Graphics subsystem");
            return Err(GraphicsError::NotInitialized);
        };
        let Some(parent) = parent else {
            log::error!("Can not compile shader without parent shader resource");
            return Err(GraphicsError::NotDefined);
        };

        let source = build_source(parent.source_code(), &self.defines);
        match backend.compile_shader(self.stage, &source) {
            Ok(handle) => {
                self.state = CompileState::Compiled(handle);
                log::debug!("Compiled shader {}", full_name);
                Ok(handle)
            }
            Err(error_log) => {
                log::error!("Could not compile shader {}: {}", full_name, error_log);
                Err(GraphicsError::ShaderCompileFailed {
                    name: full_name,
                    log: error_log,
                })
            }
        }
    }

    /// Parent shader.
    pub fn parent(&self) -> ShaderId {
        self.parent
    }

    /// Stage.
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Normalized defines.
    pub fn defines(&self) -> &str {
        &self.defines
    }

    /// Compile state.
    pub fn compile_state(&self) -> CompileState {
        self.state
    }

    /// Whether a compile has been attempted.
    pub fn is_compiled(&self) -> bool {
        self.state != CompileState::NotAttempted
    }

    /// Native shader object, if compiled successfully.
    pub fn handle(&self) -> Option<NativeHandle> {
        match self.state {
            CompileState::Compiled(handle) => Some(handle),
            _ => None,
        }
    }

    /// Forget the compile result without a context, allowing a retry.
    pub(crate) fn reset(&mut self) {
        self.state = CompileState::NotAttempted;
    }

    /// Name with defines, e.g. `Basic.vs (SKINNED)`.
    pub fn full_name(&self, parent: Option<&Shader>) -> String {
        match parent {
            Some(parent) if self.defines.is_empty() => parent.name().to_string(),
            Some(parent) => format!("{} ({})", parent.name(), self.defines),
            None => String::new(),
        }
    }
}

impl GpuObject for ShaderVariation {
    fn release(&mut self, backend: &mut dyn RenderBackend) {
        if let CompileState::Compiled(handle) = self.state {
            backend.destroy_shader(handle);
        }
        self.state = CompileState::NotAttempted;
    }

    /// Variations recompile lazily the next time they are bound.
    fn recreate(&mut self, _backend: &mut dyn RenderBackend) -> Result<(), GraphicsError> {
        Ok(())
    }
}

/// Insert the defines into the source, after the `#version` line if there is one.
pub(crate) fn build_source(source: &str, defines: &str) -> String {
    let mut code = String::with_capacity(source.len() + defines.len() * 2 + 64);

    let mut body = source;
    let trimmed = source.trim_start();
    if trimmed.starts_with("#version") {
        let (version, rest) = trimmed.split_once('\n').unwrap_or((trimmed, ""));
        code.push_str(version.trim_end());
        code.push('\n');
        body = rest;
    }

    for define in defines.split_whitespace() {
        let (name, value) = define.split_once('=').unwrap_or((define, "1"));
        code.push_str("#define ");
        code.push_str(name);
        code.push(' ');
        code.push_str(value);
        code.push('\n');
    }

    code.push_str(body);
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::window::{HeadlessWindow, Window};

    fn backend() -> DummyBackend {
        let mut window = HeadlessWindow::new();
        window.set_size(32, 32, false);
        let mut backend = DummyBackend::new();
        backend.create_context(&window, 1).unwrap();
        backend
    }

    fn shader(source: &str) -> (ShaderId, Shader) {
        let mut ids = slotmap::SlotMap::<ShaderId, ()>::with_key();
        let mut shader = Shader::new();
        shader.define(ShaderStage::Vertex, "Test.vs", source);
        (ids.insert(()), shader)
    }

    #[test]
    fn test_build_source_keeps_version_first() {
        let code = build_source("#version 150 core\nvoid main() {}\n", "A B=2");
        assert_eq!(
            code,
            "#version 150 core\n#define A 1\n#define B 2\nvoid main() {}\n"
        );

        let code = build_source("void main() {}", "");
        assert_eq!(code, "void main() {}");
    }

    #[test]
    fn test_full_name() {
        let (id, parent) = shader("void main() {}");
        assert_eq!(
            ShaderVariation::new(id, ShaderStage::Vertex, "").full_name(Some(&parent)),
            "Test.vs"
        );
        assert_eq!(
            ShaderVariation::new(id, ShaderStage::Vertex, "SKINNED").full_name(Some(&parent)),
            "Test.vs (SKINNED)"
        );
    }

    #[test]
    fn test_compile_once() {
        let mut backend = backend();
        let (id, parent) = shader("void main() {}");
        let mut variation = ShaderVariation::new(id, ShaderStage::Vertex, "");

        let handle = variation.compile(Some(&mut backend), Some(&parent)).unwrap();
        assert_eq!(variation.compile(Some(&mut backend), Some(&parent)).unwrap(), handle);
        assert_eq!(backend.stats().compile_calls, 1);
    }

    #[test]
    fn test_failed_compile_is_sticky() {
        let mut backend = backend();
        let (id, parent) = shader("#error broken\nvoid main() {}");
        let mut variation = ShaderVariation::new(id, ShaderStage::Vertex, "");

        assert!(matches!(
            variation.compile(Some(&mut backend), Some(&parent)),
            Err(GraphicsError::ShaderCompileFailed { .. })
        ));
        assert!(variation.compile(Some(&mut backend), Some(&parent)).is_err());
        assert_eq!(backend.stats().compile_calls, 1);
        assert_eq!(variation.compile_state(), CompileState::Failed);

        variation.release(&mut backend);
        assert!(!variation.is_compiled());
        assert!(variation.compile(Some(&mut backend), Some(&parent)).is_err());
        assert_eq!(backend.stats().compile_calls, 2);
    }

    #[test]
    fn test_compile_without_device_fails() {
        let (id, parent) = shader("void main() {}");
        let mut variation = ShaderVariation::new(id, ShaderStage::Pixel, "");
        assert!(matches!(
            variation.compile(None, Some(&parent)),
            Err(GraphicsError::NotInitialized)
        ));
        assert_eq!(variation.compile_state(), CompileState::Failed);
    }
}
