//! Vertex element and shader constant descriptions.
//!
//! A vertex buffer is described by an ordered list of [`VertexElement`]s and
//! a constant buffer by an ordered list of [`Constant`]s. Offsets in both are
//! computed by the owning buffer when it is defined.
//!
//! # Example
//!
//! ```ignore
//! let elements = [
//!     VertexElement::new(ElementType::Vector3, ElementSemantic::Position),
//!     VertexElement::new(ElementType::UByte4, ElementSemantic::Color),
//! ];
//! // After definition: stride = 16, offsets = [0, 12]
//! ```

/// Data type of a vertex element or shader constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// 32-bit signed integer.
    Int,
    /// 32-bit float.
    Float,
    /// Two 32-bit floats.
    Vector2,
    /// Three 32-bit floats.
    Vector3,
    /// Four 32-bit floats.
    Vector4,
    /// Four 8-bit unsigned bytes.
    UByte4,
    /// 3x4 float matrix (three rows of four floats).
    Matrix3x4,
    /// 4x4 float matrix.
    Matrix4,
}

impl ElementType {
    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::Int | Self::Float | Self::UByte4 => 4,
            Self::Vector2 => 8,
            Self::Vector3 => 12,
            Self::Vector4 => 16,
            Self::Matrix3x4 => 48,
            Self::Matrix4 => 64,
        }
    }

    /// Number of scalar components, as seen by a vertex attribute pointer.
    pub fn components(self) -> usize {
        match self {
            Self::Int | Self::Float => 1,
            Self::Vector2 => 2,
            Self::Vector3 => 3,
            Self::Vector4 | Self::UByte4 => 4,
            Self::Matrix3x4 => 12,
            Self::Matrix4 => 16,
        }
    }

    /// Returns true for the matrix types, which can not be vertex attributes.
    pub fn is_matrix(self) -> bool {
        matches!(self, Self::Matrix3x4 | Self::Matrix4)
    }
}

/// Semantic meaning of a vertex element.
///
/// Semantics are used to match vertex buffer elements with shader inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementSemantic {
    /// Vertex position.
    Position,
    /// Vertex normal.
    Normal,
    /// Vertex binormal.
    Binormal,
    /// Vertex tangent.
    Tangent,
    /// Texture coordinate.
    TexCoord,
    /// Vertex color.
    Color,
    /// Skinning blend weights.
    BlendWeight,
    /// Skinning blend indices.
    BlendIndices,
}

impl ElementSemantic {
    /// All semantics, in their canonical order.
    pub const ALL: [ElementSemantic; 8] = [
        Self::Position,
        Self::Normal,
        Self::Binormal,
        Self::Tangent,
        Self::TexCoord,
        Self::Color,
        Self::BlendWeight,
        Self::BlendIndices,
    ];

    /// Number of semantics.
    pub const COUNT: usize = Self::ALL.len();

    /// Upper-case semantic name as used in shader attribute names.
    pub fn name(self) -> &'static str {
        match self {
            Self::Position => "POSITION",
            Self::Normal => "NORMAL",
            Self::Binormal => "BINORMAL",
            Self::Tangent => "TANGENT",
            Self::TexCoord => "TEXCOORD",
            Self::Color => "COLOR",
            Self::BlendWeight => "BLENDWEIGHT",
            Self::BlendIndices => "BLENDINDICES",
        }
    }

    /// Index of the semantic in [`ElementSemantic::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One element of a vertex record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexElement {
    /// Data type.
    pub element_type: ElementType,
    /// Semantic.
    pub semantic: ElementSemantic,
    /// Semantic index, e.g. 1 for the second texture coordinate set.
    pub index: u8,
    /// Whether the element advances per instance instead of per vertex.
    pub per_instance: bool,
    /// Byte offset within the vertex record. Computed on buffer definition.
    pub offset: usize,
}

impl VertexElement {
    /// Create a per-vertex element with semantic index 0.
    pub fn new(element_type: ElementType, semantic: ElementSemantic) -> Self {
        Self {
            element_type,
            semantic,
            index: 0,
            per_instance: false,
            offset: 0,
        }
    }

    /// Set the semantic index.
    pub fn with_index(mut self, index: u8) -> Self {
        self.index = index;
        self
    }

    /// Make the element advance per instance.
    pub fn per_instance(mut self) -> Self {
        self.per_instance = true;
        self
    }
}

/// A named constant in a constant buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constant {
    /// Data type.
    pub element_type: ElementType,
    /// Name used for lookup.
    pub name: String,
    /// Number of array elements.
    pub num_elements: usize,
    /// Size of one element in bytes. Computed on buffer definition.
    pub element_size: usize,
    /// Byte offset in the buffer. Computed on buffer definition.
    pub offset: usize,
}

impl Constant {
    /// Create a single-element constant.
    pub fn new(element_type: ElementType, name: impl Into<String>) -> Self {
        Self {
            element_type,
            name: name.into(),
            num_elements: 1,
            element_size: 0,
            offset: 0,
        }
    }

    /// Set the number of array elements.
    pub fn with_elements(mut self, num_elements: usize) -> Self {
        self.num_elements = num_elements;
        self
    }

    /// Total size of the constant in bytes.
    pub fn byte_size(&self) -> usize {
        self.element_size * self.num_elements
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_sizes() {
        assert_eq!(ElementType::Int.size(), 4);
        assert_eq!(ElementType::Float.size(), 4);
        assert_eq!(ElementType::Vector2.size(), 8);
        assert_eq!(ElementType::Vector3.size(), 12);
        assert_eq!(ElementType::Vector4.size(), 16);
        assert_eq!(ElementType::UByte4.size(), 4);
        assert_eq!(ElementType::Matrix3x4.size(), 48);
        assert_eq!(ElementType::Matrix4.size(), 64);
    }

    #[test]
    fn test_semantic_names() {
        assert_eq!(ElementSemantic::Position.name(), "POSITION");
        assert_eq!(ElementSemantic::BlendIndices.name(), "BLENDINDICES");
        for (i, semantic) in ElementSemantic::ALL.iter().enumerate() {
            assert_eq!(semantic.index(), i);
        }
    }

    #[test]
    fn test_vertex_element_builder() {
        let element = VertexElement::new(ElementType::Vector2, ElementSemantic::TexCoord)
            .with_index(1)
            .per_instance();
        assert_eq!(element.index, 1);
        assert!(element.per_instance);
        assert_eq!(element.offset, 0);
    }
}
