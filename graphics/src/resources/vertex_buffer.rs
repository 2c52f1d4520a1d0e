//! Vertex buffer resource.

use std::hash::{DefaultHasher, Hash, Hasher};

use ember_core::profiling::profile_scope;

use crate::backend::{BufferTarget, NativeHandle, RenderBackend};
use crate::error::GraphicsError;
use crate::types::{ResourceUsage, VertexElement};

use super::GpuObject;

/// GPU buffer of vertex records.
///
/// # Example
///
/// ```ignore
/// let vb = graphics.create_vertex_buffer();
/// graphics.define_vertex_buffer(
///     vb,
///     ResourceUsage::Default,
///     3,
///     &[VertexElement::new(ElementType::Vector3, ElementSemantic::Position)],
///     true,
///     Some(bytemuck::cast_slice(&positions)),
/// )?;
/// ```
#[derive(Debug, Default)]
pub struct VertexBuffer {
    handle: Option<NativeHandle>,
    shadow_data: Option<Vec<u8>>,
    num_vertices: usize,
    vertex_size: usize,
    elements: Vec<VertexElement>,
    element_hash: u64,
    usage: ResourceUsage,
    data_lost: bool,
}

impl VertexBuffer {
    /// Create an undefined vertex buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the buffer layout and optionally upload initial data.
    ///
    /// The native buffer is created only when `backend` is given, i.e. when
    /// the device has a rendering context. Otherwise it is created on the
    /// next [`GpuObject::recreate`].
    pub fn define(
        &mut self,
        mut backend: Option<&mut dyn RenderBackend>,
        usage: ResourceUsage,
        num_vertices: usize,
        elements: &[VertexElement],
        use_shadow_data: bool,
        data: Option<&[u8]>,
    ) -> Result<(), GraphicsError> {
        profile_scope!("define_vertex_buffer");

        if num_vertices == 0 || elements.is_empty() {
            return Err(invalid(
                "Can not define vertex buffer with no vertices or no elements",
            ));
        }
        if usage == ResourceUsage::RenderTarget {
            return Err(invalid("Rendertarget usage is illegal for vertex buffers"));
        }
        if usage == ResourceUsage::Immutable && data.is_none() {
            return Err(invalid("Immutable vertex buffer must define initial data"));
        }
        if elements.iter().any(|e| e.element_type.is_matrix()) {
            return Err(invalid("Matrix elements are not supported in vertex buffers"));
        }

        let mut vertex_size = 0;
        let mut layout = Vec::with_capacity(elements.len());
        for element in elements {
            let mut element = *element;
            element.offset = vertex_size;
            vertex_size += element.element_type.size();
            layout.push(element);
        }

        let byte_size = num_vertices * vertex_size;
        if let Some(data) = data
            && data.len() < byte_size
        {
            return Err(invalid(&format!(
                "Initial data of {} bytes is smaller than vertex buffer size {}",
                data.len(),
                byte_size
            )));
        }

        self.release_native(backend.as_deref_mut());

        self.num_vertices = num_vertices;
        self.usage = usage;
        self.vertex_size = vertex_size;
        self.element_hash = element_hash(&layout);
        self.elements = layout;
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

    /// Update a range of vertices.
    ///
    /// A range covering the whole buffer replaces its storage, a partial
    /// range is written in place. The shadow copy is updated as well.
    pub fn set_data(
        &mut self,
        backend: Option<&mut dyn RenderBackend>,
        first_vertex: usize,
        num_vertices: usize,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        profile_scope!("update_vertex_buffer");

        if first_vertex
            .checked_add(num_vertices)
            .is_none_or(|end| end > self.num_vertices)
        {
            let err = GraphicsError::OutOfBounds(
                "Out of bounds range for updating vertex buffer".to_string(),
            );
            log::error!("{}", err);
            return Err(err);
        }
        if self.handle.is_some() && self.usage == ResourceUsage::Immutable {
            log::error!("Can not update immutable vertex buffer");
            return Err(GraphicsError::ImmutableResource);
        }
        if num_vertices == 0 {
            return Ok(());
        }

        let offset = first_vertex * self.vertex_size;
        let size = num_vertices * self.vertex_size;
        if data.len() < size {
            return Err(invalid(&format!(
                "Source data of {} bytes is smaller than the {} byte update",
                data.len(),
                size
            )));
        }
        let data = &data[..size];

        if let Some(shadow) = self.shadow_data.as_mut() {
            shadow[offset..offset + size].copy_from_slice(data);
        }

        if let (Some(handle), Some(backend)) = (self.handle, backend) {
            let whole = num_vertices == self.num_vertices;
            backend
                .update_buffer(BufferTarget::Vertex, handle, offset, data, whole)
                .map_err(|e| {
                    log::error!("Failed to update vertex buffer: {}", e);
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

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    /// Size of one vertex record in bytes.
    pub fn vertex_size(&self) -> usize {
        self.vertex_size
    }

    /// Vertex elements with computed offsets.
    pub fn elements(&self) -> &[VertexElement] {
        &self.elements
    }

    /// Hash of the element layout, usable as an input-layout cache key.
    pub fn element_hash(&self) -> u64 {
        self.element_hash
    }

    /// Usage.
    pub fn usage(&self) -> ResourceUsage {
        self.usage
    }

    /// Whether the buffer has been defined.
    pub fn is_defined(&self) -> bool {
        self.num_vertices > 0
    }

    /// Whether any element advances per instance.
    pub fn has_instance_data(&self) -> bool {
        self.elements.iter().any(|e| e.per_instance)
    }

    fn create(
        &mut self,
        backend: &mut dyn RenderBackend,
        data: Option<&[u8]>,
    ) -> Result<(), GraphicsError> {
        let byte_size = self.num_vertices * self.vertex_size;
        match backend.create_buffer(BufferTarget::Vertex, byte_size, self.usage, data) {
            Ok(handle) => {
                self.handle = Some(handle);
                log::debug!(
                    "Created vertex buffer: {} vertices, {} bytes each",
                    self.num_vertices,
                    self.vertex_size
                );
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to create vertex buffer: {}", e);
                Err(GraphicsError::ResourceCreationFailed(format!(
                    "vertex buffer: {e}"
                )))
            }
        }
    }

    fn release_native(&mut self, backend: Option<&mut (dyn RenderBackend + '_)>) {
        if let Some(handle) = self.handle.take()
            && let Some(backend) = backend
        {
            backend.destroy_buffer(BufferTarget::Vertex, handle);
        }
    }
}

impl GpuObject for VertexBuffer {
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

/// Hash of everything in an element list except the computed offsets.
fn element_hash(elements: &[VertexElement]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for element in elements {
        element.element_type.hash(&mut hasher);
        element.semantic.hash(&mut hasher);
        element.index.hash(&mut hasher);
        element.per_instance.hash(&mut hasher);
    }
    hasher.finish()
}

static_assertions::assert_impl_all!(VertexBuffer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::types::{ElementSemantic, ElementType};
    use crate::window::HeadlessWindow;
    use crate::window::Window;

    fn backend() -> DummyBackend {
        let mut window = HeadlessWindow::new();
        window.set_size(32, 32, false);
        let mut backend = DummyBackend::new();
        backend.create_context(&window, 1).unwrap();
        backend
    }

    fn position_color() -> [VertexElement; 2] {
        [
            VertexElement::new(ElementType::Vector3, ElementSemantic::Position),
            VertexElement::new(ElementType::UByte4, ElementSemantic::Color),
        ]
    }

    #[test]
    fn test_layout_offsets() {
        let mut vb = VertexBuffer::new();
        vb.define(None, ResourceUsage::Default, 4, &position_color(), true, None)
            .unwrap();
        assert_eq!(vb.vertex_size(), 16);
        let offsets: Vec<_> = vb.elements().iter().map(|e| e.offset).collect();
        assert_eq!(offsets, [0, 12]);
        assert!(vb.handle().is_none());
        assert_eq!(vb.shadow_data().map(<[u8]>::len), Some(64));
    }

    #[test]
    fn test_define_validation() {
        let mut vb = VertexBuffer::new();
        assert!(
            vb.define(None, ResourceUsage::Default, 0, &position_color(), false, None)
                .is_err()
        );
        assert!(
            vb.define(None, ResourceUsage::Default, 4, &[], false, None)
                .is_err()
        );
        assert!(
            vb.define(None, ResourceUsage::RenderTarget, 4, &position_color(), false, None)
                .is_err()
        );
        assert!(
            vb.define(None, ResourceUsage::Immutable, 4, &position_color(), false, None)
                .is_err()
        );
        let matrix = [VertexElement::new(ElementType::Matrix4, ElementSemantic::TexCoord)];
        assert!(
            vb.define(None, ResourceUsage::Default, 4, &matrix, false, None)
                .is_err()
        );
        assert!(!vb.is_defined());
    }

    #[test]
    fn test_immutable_rejects_updates() {
        let mut backend = backend();
        let mut vb = VertexBuffer::new();
        let data = [7u8; 32];
        vb.define(
            Some(&mut backend),
            ResourceUsage::Immutable,
            2,
            &position_color(),
            true,
            Some(&data),
        )
        .unwrap();

        let result = vb.set_data(Some(&mut backend), 0, 2, &[0u8; 32]);
        assert_eq!(result, Err(GraphicsError::ImmutableResource));
        assert_eq!(vb.shadow_data(), Some(&data[..]));
        let handle = vb.handle().unwrap();
        assert_eq!(backend.buffer_data(handle), Some(&data[..]));
    }

    #[test]
    fn test_partial_update() {
        let mut backend = backend();
        let mut vb = VertexBuffer::new();
        vb.define(
            Some(&mut backend),
            ResourceUsage::Dynamic,
            2,
            &position_color(),
            true,
            None,
        )
        .unwrap();

        vb.set_data(Some(&mut backend), 1, 1, &[5u8; 16]).unwrap();
        let handle = vb.handle().unwrap();
        let contents = backend.buffer_data(handle).unwrap();
        assert_eq!(&contents[..16], &[0u8; 16]);
        assert_eq!(&contents[16..], &[5u8; 16]);
        assert_eq!(vb.shadow_data(), Some(contents));

        assert!(matches!(
            vb.set_data(Some(&mut backend), 1, 2, &[0u8; 32]),
            Err(GraphicsError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_update_range_overflow() {
        let mut backend = backend();
        let mut vb = VertexBuffer::new();
        vb.define(
            Some(&mut backend),
            ResourceUsage::Dynamic,
            2,
            &position_color(),
            true,
            None,
        )
        .unwrap();

        assert!(matches!(
            vb.set_data(Some(&mut backend), usize::MAX, 1, &[0u8; 16]),
            Err(GraphicsError::OutOfBounds(_))
        ));
        assert!(matches!(
            vb.set_data(None, 1, usize::MAX, &[0u8; 16]),
            Err(GraphicsError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut backend = backend();
        let mut vb = VertexBuffer::new();
        vb.define(
            Some(&mut backend),
            ResourceUsage::Default,
            1,
            &position_color(),
            false,
            None,
        )
        .unwrap();
        assert_eq!(backend.live_buffers(), 1);

        vb.release(&mut backend);
        vb.release(&mut backend);
        assert!(vb.handle().is_none());
        assert!(vb.is_defined());
        assert_eq!(backend.live_buffers(), 0);
    }

    #[test]
    fn test_recreate_without_shadow_loses_data() {
        let mut backend = backend();
        let mut vb = VertexBuffer::new();
        vb.define(
            Some(&mut backend),
            ResourceUsage::Default,
            1,
            &position_color(),
            false,
            Some(&[1u8; 16]),
        )
        .unwrap();

        vb.release(&mut backend);
        vb.recreate(&mut backend).unwrap();
        assert!(vb.handle().is_some());
        assert!(vb.is_data_lost());

        vb.set_data(Some(&mut backend), 0, 1, &[2u8; 16]).unwrap();
        assert!(!vb.is_data_lost());
    }

    #[test]
    fn test_element_hash_ignores_offsets() {
        let mut a = VertexBuffer::new();
        let mut b = VertexBuffer::new();
        a.define(None, ResourceUsage::Default, 1, &position_color(), false, None)
            .unwrap();
        b.define(None, ResourceUsage::Default, 8, &position_color(), false, None)
            .unwrap();
        assert_eq!(a.element_hash(), b.element_hash());

        let instanced = [
            VertexElement::new(ElementType::Vector3, ElementSemantic::Position),
            VertexElement::new(ElementType::UByte4, ElementSemantic::Color).per_instance(),
        ];
        b.define(None, ResourceUsage::Default, 8, &instanced, false, None)
            .unwrap();
        assert_ne!(a.element_hash(), b.element_hash());
        assert!(b.has_instance_data());
    }
}
