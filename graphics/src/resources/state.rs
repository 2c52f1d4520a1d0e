//! Fixed-function state objects.
//!
//! A state object is an immutable-once-defined descriptor. The device diffs
//! the bound descriptors field by field against the last applied state before
//! each draw, so state objects own no native handle of their own.

use ember_core::profiling::profile_scope;

use crate::backend::RenderBackend;
use crate::error::GraphicsError;
use crate::types::{BlendDescriptor, DepthDescriptor, RasterizerDescriptor};

use super::GpuObject;

/// A defined-or-not fixed-function descriptor.
#[derive(Debug, Clone, Default)]
pub struct StateObject<D> {
    descriptor: Option<D>,
}

/// Blend and color write configuration.
pub type BlendState = StateObject<BlendDescriptor>;
/// Depth and stencil configuration.
pub type DepthState = StateObject<DepthDescriptor>;
/// Rasterizer configuration.
pub type RasterizerState = StateObject<RasterizerDescriptor>;

impl<D: Copy> StateObject<D> {
    /// Create an undefined state object.
    pub fn new() -> Self {
        Self { descriptor: None }
    }

    /// The descriptor, if defined.
    pub fn descriptor(&self) -> Option<&D> {
        self.descriptor.as_ref()
    }

    /// Whether the state has been defined.
    pub fn is_defined(&self) -> bool {
        self.descriptor.is_some()
    }

    fn store(&mut self, descriptor: &D) {
        self.descriptor = Some(*descriptor);
    }
}

impl BlendState {
    /// Define the blend configuration.
    pub fn define(&mut self, descriptor: &BlendDescriptor) -> Result<(), GraphicsError> {
        profile_scope!("define_blend_state");
        self.store(descriptor);
        Ok(())
    }
}

impl DepthState {
    /// Define the depth and stencil configuration.
    pub fn define(&mut self, descriptor: &DepthDescriptor) -> Result<(), GraphicsError> {
        profile_scope!("define_depth_state");
        self.store(descriptor);
        Ok(())
    }
}

impl RasterizerState {
    /// Define the rasterizer configuration. Depth bias values must not be NaN.
    pub fn define(&mut self, descriptor: &RasterizerDescriptor) -> Result<(), GraphicsError> {
        profile_scope!("define_rasterizer_state");

        if descriptor.slope_scaled_depth_bias.is_nan() || descriptor.depth_bias_clamp.is_nan() {
            self.descriptor = None;
            log::error!("Rasterizer depth bias must be a number");
            return Err(GraphicsError::InvalidParameter(
                "depth bias is NaN".to_string(),
            ));
        }
        self.store(descriptor);
        Ok(())
    }
}

impl<D> GpuObject for StateObject<D> {
    fn release(&mut self, _backend: &mut dyn RenderBackend) {}

    fn recreate(&mut self, _backend: &mut dyn RenderBackend) -> Result<(), GraphicsError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompareMode, CullMode};

    #[test]
    fn test_define_and_redefine() {
        let mut state = BlendState::new();
        assert!(!state.is_defined());

        state.define(&BlendDescriptor::alpha()).unwrap();
        assert_eq!(state.descriptor(), Some(&BlendDescriptor::alpha()));

        state.define(&BlendDescriptor::opaque()).unwrap();
        assert!(!state.descriptor().unwrap().blend_enable);
    }

    #[test]
    fn test_depth_state() {
        let mut state = DepthState::new();
        state
            .define(&DepthDescriptor::default().with_depth_func(CompareMode::LessEqual))
            .unwrap();
        assert_eq!(state.descriptor().unwrap().depth_func, CompareMode::LessEqual);
    }

    #[test]
    fn test_rasterizer_rejects_nan_bias() {
        let mut state = RasterizerState::new();
        state
            .define(&RasterizerDescriptor::default().with_cull_mode(CullMode::None))
            .unwrap();
        assert!(state.is_defined());

        let result = state.define(&RasterizerDescriptor::default().with_depth_bias(1, f32::NAN));
        assert!(result.is_err());
        assert!(!state.is_defined());
    }
}
