//! Constant (uniform) buffer resource.
//!
//! Constants are laid out with the std140-style packing of uniform blocks:
//! an element of up to 16 bytes never straddles a 16-byte boundary, larger
//! elements start on a 16-byte boundary, and the total size is padded to a
//! multiple of 16.
//!
//! Values are written into a CPU shadow copy with the `set_constant*`
//! functions and uploaded in one go by [`ConstantBuffer::apply`].

use bytemuck::Pod;
use ember_core::profiling::profile_scope;

use crate::backend::{BufferTarget, NativeHandle, RenderBackend};
use crate::error::GraphicsError;
use crate::types::{Constant, ElementType, ResourceUsage};

use super::GpuObject;

/// Index returned by [`ConstantBuffer::find_constant_index`] for an unknown name.
pub const NPOS: usize = usize::MAX;

/// GPU buffer of shader constants with a CPU shadow copy.
#[derive(Debug, Default)]
pub struct ConstantBuffer {
    handle: Option<NativeHandle>,
    constants: Vec<Constant>,
    shadow_data: Vec<u8>,
    byte_size: usize,
    usage: ResourceUsage,
    dirty: bool,
}

impl ConstantBuffer {
    /// Create an undefined constant buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the constants. Offsets and the total size are computed here.
    ///
    /// Immutable buffers get their native buffer on the first [`apply`](Self::apply),
    /// after the initial values have been set.
    pub fn define(
        &mut self,
        mut backend: Option<&mut dyn RenderBackend>,
        usage: ResourceUsage,
        constants: &[Constant],
    ) -> Result<(), GraphicsError> {
        profile_scope!("define_constant_buffer");

        if constants.is_empty() {
            return Err(invalid("Can not define constant buffer with no constants"));
        }
        if usage == ResourceUsage::RenderTarget {
            return Err(invalid("Rendertarget usage is illegal for constant buffers"));
        }
        if constants
            .iter()
            .any(|c| c.element_type == ElementType::UByte4)
        {
            return Err(invalid("UByte4 type is not supported in constant buffers"));
        }

        self.release_native(backend.as_deref_mut());

        let (layout, byte_size) = layout_constants(constants);
        self.constants = layout;
        self.byte_size = byte_size;
        self.usage = usage;
        self.shadow_data = vec![0; byte_size];
        self.dirty = false;

        match backend {
            Some(backend) if usage != ResourceUsage::Immutable => self.create(backend, None),
            _ => Ok(()),
        }
    }

    /// Set a constant from raw bytes.
    ///
    /// `num_elements` of 0, or more than the constant holds, writes every element.
    pub fn set_constant_raw(
        &mut self,
        index: usize,
        data: &[u8],
        num_elements: usize,
    ) -> Result<(), GraphicsError> {
        let Some(constant) = self.constants.get(index) else {
            return Err(GraphicsError::InvalidParameter(format!(
                "constant index {index} out of range"
            )));
        };

        let num_elements = if num_elements == 0 || num_elements > constant.num_elements {
            constant.num_elements
        } else {
            num_elements
        };
        let size = num_elements * constant.element_size;
        if data.len() < size {
            return Err(invalid(&format!(
                "Source data of {} bytes is too small for constant {} ({} bytes)",
                data.len(),
                constant.name,
                size
            )));
        }

        let offset = constant.offset;
        self.shadow_data[offset..offset + size].copy_from_slice(&data[..size]);
        self.dirty = true;
        Ok(())
    }

    /// Set a constant from a plain-data value.
    ///
    /// The number of elements written is the size of `T` divided by the
    /// element size, so an array value fills consecutive elements.
    pub fn set_constant<T: Pod>(&mut self, index: usize, value: &T) -> Result<(), GraphicsError> {
        let bytes = bytemuck::bytes_of(value);
        let element_size = self
            .constants
            .get(index)
            .map(|c| c.element_size)
            .ok_or_else(|| {
                GraphicsError::InvalidParameter(format!("constant index {index} out of range"))
            })?;

        let num_elements = bytes.len() / element_size;
        if num_elements == 0 {
            return Err(invalid(&format!(
                "Value of {} bytes is smaller than one constant element",
                bytes.len()
            )));
        }
        self.set_constant_raw(index, bytes, num_elements)
    }

    /// Set a constant by name from a plain-data value.
    pub fn set_constant_by_name<T: Pod>(
        &mut self,
        name: &str,
        value: &T,
    ) -> Result<(), GraphicsError> {
        match self.find_constant_index(name) {
            NPOS => Err(GraphicsError::InvalidParameter(format!(
                "unknown constant {name}"
            ))),
            index => self.set_constant(index, value),
        }
    }

    /// Replace the whole buffer contents directly, bypassing the per-constant setters.
    pub fn set_data(
        &mut self,
        backend: Option<&mut dyn RenderBackend>,
        data: &[u8],
        copy_to_shadow: bool,
    ) -> Result<(), GraphicsError> {
        if self.usage == ResourceUsage::Immutable {
            log::error!("Can not update immutable constant buffer");
            return Err(GraphicsError::ImmutableResource);
        }
        if data.len() < self.byte_size {
            return Err(invalid("Source data is smaller than the constant buffer"));
        }
        let data = &data[..self.byte_size];

        if copy_to_shadow {
            self.shadow_data.copy_from_slice(data);
            self.dirty = false;
        }

        if let (Some(handle), Some(backend)) = (self.handle, backend) {
            backend
                .update_buffer(BufferTarget::Uniform, handle, 0, data, true)
                .map_err(|e| {
                    log::error!("Failed to update constant buffer: {}", e);
                    GraphicsError::from(e)
                })?;
        }
        Ok(())
    }

    /// Upload the shadow copy if it has changed.
    ///
    /// An immutable buffer is created by its first apply and rejects further applies.
    pub fn apply(&mut self, backend: Option<&mut dyn RenderBackend>) -> Result<(), GraphicsError> {
        if self.usage == ResourceUsage::Immutable {
            if self.handle.is_some() {
                log::error!("Apply can only be called once on an immutable constant buffer");
                return Err(GraphicsError::ImmutableResource);
            }
            return match backend {
                Some(backend) => {
                    let shadow = std::mem::take(&mut self.shadow_data);
                    let result = self.create(backend, Some(&shadow));
                    self.shadow_data = shadow;
                    result
                }
                None => Ok(()),
            };
        }

        if !self.dirty {
            return Ok(());
        }

        if let (Some(handle), Some(backend)) = (self.handle, backend) {
            backend
                .update_buffer(BufferTarget::Uniform, handle, 0, &self.shadow_data, true)
                .map_err(|e| {
                    log::error!("Failed to apply constant buffer: {}", e);
                    GraphicsError::from(e)
                })?;
        }

        self.dirty = false;
        Ok(())
    }

    /// Index of the named constant, or [`NPOS`].
    pub fn find_constant_index(&self, name: &str) -> usize {
        self.constants
            .iter()
            .position(|c| c.name == name)
            .unwrap_or(NPOS)
    }

    /// Shadow bytes of a constant.
    pub fn constant_data(&self, index: usize) -> Option<&[u8]> {
        let constant = self.constants.get(index)?;
        Some(&self.shadow_data[constant.offset..constant.offset + constant.byte_size()])
    }

    /// Read one element of a constant back from the shadow copy.
    pub fn constant_value<T: Pod>(&self, index: usize, element: usize) -> Option<T> {
        let constant = self.constants.get(index)?;
        if element >= constant.num_elements || std::mem::size_of::<T>() > constant.element_size {
            return None;
        }
        let start = constant.offset + element * constant.element_size;
        let end = start + std::mem::size_of::<T>();
        Some(bytemuck::pod_read_unaligned(&self.shadow_data[start..end]))
    }

    /// Native buffer handle, if created.
    pub fn handle(&self) -> Option<NativeHandle> {
        self.handle
    }

    /// Constants with computed offsets.
    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    /// Total size in bytes, a multiple of 16.
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    /// Usage.
    pub fn usage(&self) -> ResourceUsage {
        self.usage
    }

    /// Whether the shadow copy has changes not yet applied.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// CPU shadow copy.
    pub fn shadow_data(&self) -> &[u8] {
        &self.shadow_data
    }

    fn create(
        &mut self,
        backend: &mut dyn RenderBackend,
        data: Option<&[u8]>,
    ) -> Result<(), GraphicsError> {
        self.dirty = false;
        match backend.create_buffer(BufferTarget::Uniform, self.byte_size, self.usage, data) {
            Ok(handle) => {
                self.handle = Some(handle);
                log::debug!(
                    "Created constant buffer: {} constants, {} bytes",
                    self.constants.len(),
                    self.byte_size
                );
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to create constant buffer: {}", e);
                Err(GraphicsError::ResourceCreationFailed(format!(
                    "constant buffer: {e}"
                )))
            }
        }
    }

    fn release_native(&mut self, backend: Option<&mut (dyn RenderBackend + '_)>) {
        if let Some(handle) = self.handle.take()
            && let Some(backend) = backend
        {
            backend.destroy_buffer(BufferTarget::Uniform, handle);
        }
    }
}

impl GpuObject for ConstantBuffer {
    fn release(&mut self, backend: &mut dyn RenderBackend) {
        self.release_native(Some(backend));
    }

    fn recreate(&mut self, backend: &mut dyn RenderBackend) -> Result<(), GraphicsError> {
        if self.constants.is_empty() || self.handle.is_some() {
            return Ok(());
        }

        let shadow = std::mem::take(&mut self.shadow_data);
        let result = self.create(backend, Some(&shadow));
        self.shadow_data = shadow;
        result
    }
}

/// Compute constant offsets and the padded total size.
fn layout_constants(constants: &[Constant]) -> (Vec<Constant>, usize) {
    let mut byte_size = 0usize;
    let mut layout = Vec::with_capacity(constants.len());

    for constant in constants {
        let mut constant = constant.clone();
        constant.element_size = constant.element_type.size();

        let element_size = constant.element_size;
        let straddles = element_size <= 16
            && ((byte_size + element_size - 1) >> 4) != (byte_size >> 4);
        let misaligned = element_size > 16 && (byte_size & 15) != 0;
        if straddles || misaligned {
            byte_size += 16 - (byte_size & 15);
        }

        constant.offset = byte_size;
        byte_size += element_size * constant.num_elements;
        layout.push(constant);
    }

    if byte_size & 15 != 0 {
        byte_size += 16 - (byte_size & 15);
    }

    (layout, byte_size)
}

fn invalid(message: &str) -> GraphicsError {
    log::error!("{}", message);
    GraphicsError::InvalidParameter(message.to_string())
}

static_assertions::assert_impl_all!(ConstantBuffer: Send, Sync);
