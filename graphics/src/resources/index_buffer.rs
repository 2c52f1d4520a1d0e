//! Index buffer resource.

use ember_core::profiling::profile_scope;

use crate::backend::{BufferTarget, NativeHandle, RenderBackend};
use crate::error::GraphicsError;
use crate::types::ResourceUsage;

use super::GpuObject;

/// GPU buffer of 16-bit or 32-bit indices.
#[derive(Debug, Default)]
pub struct IndexBuffer {
    handle: Option<NativeHandle>,
    shadow_data: Option<Vec<u8>>,
    num_indices: usize,
    index_size: usize,
    usage: ResourceUsage,
    data_lost: bool,
}

impl IndexBuffer {
    /// Create an undefined index buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the buffer and optionally upload initial data. `index_size` must be 2 or 4.
    pub fn define(
        &mut self,
        mut backend: Option<&mut dyn RenderBackend>,
        usage: ResourceUsage,
        num_indices: usize,
        index_size: usize,
        use_shadow_data: bool,
        data: Option<&[u8]>,
    ) -> Result<(), GraphicsError> {
        profile_scope!("define_index_buffer");

        if num_indices == 0 {
            return Err(invalid("Can not define index buffer with no indices"));
        }
        if usage == ResourceUsage::RenderTarget {
            return Err(invalid("Rendertarget usage is illegal for index buffers"));
        }
        if usage == ResourceUsage::Immutable && data.is_none() {
            return Err(invalid("Immutable index buffer must define initial data"));
        }
        if index_size != 2 && index_size != 4 {
            return Err(invalid("Index buffer index size must be 2 or 4"));
        }

        let byte_size = num_indices * index_size;
        if data.is_some_and(|d| d.len() < byte_size) {
            return Err(invalid("Initial data is smaller than index buffer size"));
        }

        self.release_native(backend.as_deref_mut());

        self.num_indices = num_indices;
        self.index_size = index_size;
        self.usage = usage;
        self.data_lost = false;
        self.shadow_data = use_shadow_data.then(|| match data {
            Some(data) => data[..byte_size].to_vec(),
            None => vec![0; byte_size],
        });

        match backend {
            Some(backend) => self.create(backend, data),
            None => Ok(()),
        }
    }

    /// Update a range of indices.
    pub fn set_data(
        &mut self,
        backend: Option<&mut dyn RenderBackend>,
        first_index: usize,
        num_indices: usize,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        profile_scope!("update_index_buffer");

        if first_index
            .checked_add(num_indices)
            .is_none_or(|end| end > self.num_indices)
        {
            log::error!("Out of bounds range for updating index buffer");
            return Err(GraphicsError::OutOfBounds(format!(
                "indices {}..{} of {}",
                first_index,
                first_index.saturating_add(num_indices),
                self.num_indices
            )));
        }
        if self.handle.is_some() && self.usage == ResourceUsage::Immutable {
            log::error!("Can not update immutable index buffer");
            return Err(GraphicsError::ImmutableResource);
        }
        if num_indices == 0 {
            return Ok(());
        }

        let offset = first_index * self.index_size;
        let size = num_indices * self.index_size;
        if data.len() < size {
            return Err(invalid("Source data is smaller than the index range"));
        }
        let data = &data[..size];

        if let Some(shadow) = self.shadow_data.as_mut() {
            shadow[offset..offset + size].copy_from_slice(data);
        }

        if let (Some(handle), Some(backend)) = (self.handle, backend) {
            let whole = num_indices == self.num_indices;
            backend
                .update_buffer(BufferTarget::Index, handle, offset, data, whole)
                .map_err(|e| {
                    log::error!("Failed to update index buffer: {}", e);
                    GraphicsError::from(e)
                })?;
        }

        self.data_lost = false;
        Ok(())
    }

    /// Native buffer handle, if created.
    pub fn handle(&self) -> Option<NativeHandle> {
        self.handle
    }

    /// CPU shadow copy, if retained.
    pub fn shadow_data(&self) -> Option<&[u8]> {
        self.shadow_data.as_deref()
    }

    /// Number of indices.
    pub fn num_indices(&self) -> usize {
        self.num_indices
    }

    /// Size of one index in bytes.
    pub fn index_size(&self) -> usize {
        self.index_size
    }

    /// Usage.
    pub fn usage(&self) -> ResourceUsage {
        self.usage
    }

    /// Whether the buffer has been defined.
    pub fn is_defined(&self) -> bool {
        self.num_indices > 0
    }

    fn create(
        &mut self,
        backend: &mut dyn RenderBackend,
        data: Option<&[u8]>,
    ) -> Result<(), GraphicsError> {
        let byte_size = self.num_indices * self.index_size;
        match backend.create_buffer(BufferTarget::Index, byte_size, self.usage, data) {
            Ok(handle) => {
                self.handle = Some(handle);
                log::debug!(
                    "Created index buffer: {} indices, {} bytes each",
                    self.num_indices,
                    self.index_size
                );
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to create index buffer: {}", e);
                Err(GraphicsError::ResourceCreationFailed(format!(
                    "index buffer: {e}"
                )))
            }
        }
    }

    fn release_native(&mut self, backend: Option<&mut (dyn RenderBackend + '_)>) {
        if let Some(handle) = self.handle.take()
            && let Some(backend) = backend
        {
            backend.destroy_buffer(BufferTarget::Index, handle);
        }
    }
}

impl GpuObject for IndexBuffer {
    fn release(&mut self, backend: &mut dyn RenderBackend) {
        self.release_native(Some(backend));
    }

    fn recreate(&mut self, backend: &mut dyn RenderBackend) -> Result<(), GraphicsError> {
        if !self.is_defined() || self.handle.is_some() {
            return Ok(());
        }

        let shadow = self.shadow_data.take();
        let result = self.create(backend, shadow.as_deref());
        self.data_lost = shadow.is_none();
        self.shadow_data = shadow;
        result
    }

    fn is_data_lost(&self) -> bool {
        self.data_lost
    }

    fn clear_data_lost(&mut self) {
        self.data_lost = false;
    }
}

fn invalid(message: &str) -> GraphicsError {
    log::error!("{}", message);
    GraphicsError::InvalidParameter(message.to_string())
}
