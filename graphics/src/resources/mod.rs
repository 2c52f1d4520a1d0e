//! GPU resources.
//!
//! This module contains the resource objects owned by [`Graphics`]:
//! - [`VertexBuffer`], [`IndexBuffer`], [`ConstantBuffer`] - GPU memory buffers
//! - [`Texture`] - 2D and cube textures, also used as render targets
//! - [`BlendState`], [`DepthState`], [`RasterizerState`] - fixed-function state objects
//!
//! Resources live in generational arenas inside the device and are referred
//! to by typed ids. A stale id never aliases a newer resource, so a binding
//! slot can not dangle after its resource is destroyed.
//!
//! [`Graphics`]: crate::Graphics

mod constant_buffer;
mod index_buffer;
mod state;
mod texture;
mod vertex_buffer;

pub use constant_buffer::{ConstantBuffer, NPOS};
pub use index_buffer::IndexBuffer;
pub use state::{BlendState, DepthState, RasterizerState, StateObject};
pub use texture::Texture;
pub use vertex_buffer::VertexBuffer;

use crate::backend::RenderBackend;
use crate::error::GraphicsError;

slotmap::new_key_type! {
    /// Handle to a [`VertexBuffer`].
    pub struct VertexBufferId;
    /// Handle to an [`IndexBuffer`].
    pub struct IndexBufferId;
    /// Handle to a [`ConstantBuffer`].
    pub struct ConstantBufferId;
    /// Handle to a [`Texture`].
    pub struct TextureId;
    /// Handle to a [`BlendState`].
    pub struct BlendStateId;
    /// Handle to a [`DepthState`].
    pub struct DepthStateId;
    /// Handle to a [`RasterizerState`].
    pub struct RasterizerStateId;
}

/// Handle to any resource that owns native GPU memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuResourceId {
    /// A vertex buffer.
    VertexBuffer(VertexBufferId),
    /// An index buffer.
    IndexBuffer(IndexBufferId),
    /// A constant buffer.
    ConstantBuffer(ConstantBufferId),
    /// A texture.
    Texture(TextureId),
}

impl From<VertexBufferId> for GpuResourceId {
    fn from(id: VertexBufferId) -> Self {
        Self::VertexBuffer(id)
    }
}

impl From<IndexBufferId> for GpuResourceId {
    fn from(id: IndexBufferId) -> Self {
        Self::IndexBuffer(id)
    }
}

impl From<ConstantBufferId> for GpuResourceId {
    fn from(id: ConstantBufferId) -> Self {
        Self::ConstantBuffer(id)
    }
}

impl From<TextureId> for GpuResourceId {
    fn from(id: TextureId) -> Self {
        Self::Texture(id)
    }
}

/// Lifecycle shared by every object that owns native GPU memory.
///
/// `release` frees the native object but keeps the CPU-side definition, so
/// `recreate` can rebuild it after the rendering context has been replaced.
pub trait GpuObject {
    /// Free the native object. Calling this on a released object is a no-op.
    fn release(&mut self, backend: &mut dyn RenderBackend);

    /// Rebuild the native object from the retained definition.
    fn recreate(&mut self, backend: &mut dyn RenderBackend) -> Result<(), GraphicsError>;

    /// Whether the contents were lost when the context was replaced.
    fn is_data_lost(&self) -> bool {
        false
    }

    /// Acknowledge lost contents.
    fn clear_data_lost(&mut self) {}
}
