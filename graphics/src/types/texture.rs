//! Texture types and sampler descriptors.

use ember_core::Color;

/// Texture dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureType {
    /// One-dimensional texture.
    Tex1D,
    /// Two-dimensional texture.
    #[default]
    Tex2D,
    /// Three-dimensional texture.
    Tex3D,
    /// Cube map with six square faces.
    Cube,
}

impl TextureType {
    /// Number of faces (layers) a texture of this type has.
    pub fn num_faces(self) -> usize {
        match self {
            Self::Cube => super::MAX_CUBE_FACES,
            _ => 1,
        }
    }
}

/// Pixel format of image and texture data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageFormat {
    /// No format.
    #[default]
    None,
    /// 8-bit red.
    R8,
    /// 8-bit red-green.
    Rg8,
    /// 8-bit RGBA.
    Rgba8,
    /// 8-bit alpha.
    A8,
    /// 16-bit red.
    R16,
    /// 16-bit red-green.
    Rg16,
    /// 16-bit RGBA.
    Rgba16,
    /// 16-bit float red.
    R16F,
    /// 16-bit float red-green.
    Rg16F,
    /// 16-bit float RGBA.
    Rgba16F,
    /// 32-bit float red.
    R32F,
    /// 32-bit float red-green.
    Rg32F,
    /// 32-bit float RGB.
    Rgb32F,
    /// 32-bit float RGBA.
    Rgba32F,
    /// 16-bit depth.
    D16,
    /// 32-bit depth.
    D32,
    /// 24-bit depth with 8-bit stencil.
    D24S8,
    /// DXT1 (BC1) block compression.
    Dxt1,
    /// DXT3 (BC2) block compression.
    Dxt3,
    /// DXT5 (BC3) block compression.
    Dxt5,
    /// ETC1 block compression.
    Etc1,
    /// PVRTC RGB 2 bits per pixel.
    PvrtcRgb2bpp,
    /// PVRTC RGBA 2 bits per pixel.
    PvrtcRgba2bpp,
    /// PVRTC RGB 4 bits per pixel.
    PvrtcRgb4bpp,
    /// PVRTC RGBA 4 bits per pixel.
    PvrtcRgba4bpp,
}

impl ImageFormat {
    /// Returns true for block-compressed formats.
    pub fn is_compressed(self) -> bool {
        matches!(
            self,
            Self::Dxt1
                | Self::Dxt3
                | Self::Dxt5
                | Self::Etc1
                | Self::PvrtcRgb2bpp
                | Self::PvrtcRgba2bpp
                | Self::PvrtcRgb4bpp
                | Self::PvrtcRgba4bpp
        )
    }

    /// Returns true for depth and depth-stencil formats.
    pub fn is_depth_stencil(self) -> bool {
        matches!(self, Self::D16 | Self::D32 | Self::D24S8)
    }

    /// Returns true if the format has a stencil component.
    pub fn has_stencil(self) -> bool {
        matches!(self, Self::D24S8)
    }

    /// Returns true for formats the device can upload natively.
    ///
    /// ETC1 and PVRTC data must be decompressed before reaching a texture.
    pub fn is_supported(self) -> bool {
        !matches!(
            self,
            Self::Etc1
                | Self::PvrtcRgb2bpp
                | Self::PvrtcRgba2bpp
                | Self::PvrtcRgb4bpp
                | Self::PvrtcRgba4bpp
        )
    }

    /// Bytes per pixel for uncompressed formats, 0 for compressed formats.
    pub fn pixel_byte_size(self) -> usize {
        match self {
            Self::None => 0,
            Self::R8 | Self::A8 => 1,
            Self::Rg8 | Self::R16 | Self::R16F | Self::D16 => 2,
            Self::Rgba8 | Self::Rg16 | Self::Rg16F | Self::R32F | Self::D32 | Self::D24S8 => 4,
            Self::Rgba16 | Self::Rgba16F | Self::Rg32F => 8,
            Self::Rgb32F => 12,
            Self::Rgba32F => 16,
            _ => 0,
        }
    }

    /// Bytes of one 4x4 block for block-compressed formats, 0 otherwise.
    pub fn block_byte_size(self) -> usize {
        match self {
            Self::Dxt1 | Self::Etc1 => 8,
            Self::Dxt3 | Self::Dxt5 => 16,
            _ => 0,
        }
    }

    /// Size in bytes of an image region of `width` x `height` pixels.
    pub fn data_size(self, width: usize, height: usize) -> usize {
        if self.is_compressed() {
            match self {
                Self::PvrtcRgb2bpp | Self::PvrtcRgba2bpp => {
                    (width.max(16) * height.max(8) * 2).div_ceil(8)
                }
                Self::PvrtcRgb4bpp | Self::PvrtcRgba4bpp => {
                    (width.max(8) * height.max(8) * 4).div_ceil(8)
                }
                _ => width.div_ceil(4) * height.div_ceil(4) * self.block_byte_size(),
            }
        } else {
            width * height * self.pixel_byte_size()
        }
    }
}

/// Texture filtering mode, including depth comparison variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFilterMode {
    /// Nearest neighbor.
    Point,
    /// Linear filtering within a mip level.
    Bilinear,
    /// Linear filtering across mip levels.
    #[default]
    Trilinear,
    /// Anisotropic filtering.
    Anisotropic,
    /// Nearest neighbor with depth comparison.
    ComparePoint,
    /// Bilinear with depth comparison.
    CompareBilinear,
    /// Trilinear with depth comparison.
    CompareTrilinear,
    /// Anisotropic with depth comparison.
    CompareAnisotropic,
}

impl TextureFilterMode {
    /// Returns true for the depth comparison modes.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::ComparePoint
                | Self::CompareBilinear
                | Self::CompareTrilinear
                | Self::CompareAnisotropic
        )
    }

    /// Returns true if anisotropic filtering applies.
    pub fn is_anisotropic(self) -> bool {
        matches!(self, Self::Anisotropic | Self::CompareAnisotropic)
    }
}

/// Texture coordinate addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureAddressMode {
    /// Repeat.
    #[default]
    Wrap,
    /// Mirrored repeat.
    Mirror,
    /// Clamp to edge.
    Clamp,
    /// Clamp to border color.
    Border,
    /// Mirror once, then clamp.
    MirrorOnce,
}

/// Sampling parameters of a texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerDescriptor {
    /// Filtering mode.
    pub filter: TextureFilterMode,
    /// Address modes for the U, V and W axes.
    pub address_modes: [TextureAddressMode; 3],
    /// Maximum anisotropy, used by the anisotropic modes only.
    pub max_anisotropy: u32,
    /// Minimum LOD.
    pub min_lod: f32,
    /// Maximum LOD.
    pub max_lod: f32,
    /// Border color for [`TextureAddressMode::Border`].
    pub border_color: Color,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            filter: TextureFilterMode::Trilinear,
            address_modes: [TextureAddressMode::Wrap; 3],
            max_anisotropy: 16,
            min_lod: 0.0,
            max_lod: f32::INFINITY,
            border_color: Color::BLACK,
        }
    }
}

impl SamplerDescriptor {
    /// Point sampling with clamped coordinates.
    pub fn point_clamp() -> Self {
        Self {
            filter: TextureFilterMode::Point,
            address_modes: [TextureAddressMode::Clamp; 3],
            ..Self::default()
        }
    }

    /// Set the filtering mode.
    pub fn with_filter(mut self, filter: TextureFilterMode) -> Self {
        self.filter = filter;
        self
    }

    /// Use the same address mode on all axes.
    pub fn with_address_mode(mut self, mode: TextureAddressMode) -> Self {
        self.address_modes = [mode; 3];
        self
    }

    /// Set the LOD range.
    pub fn with_lod_range(mut self, min_lod: f32, max_lod: f32) -> Self {
        self.min_lod = min_lod;
        self.max_lod = max_lod;
        self
    }
}

/// One mip level of image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLevel<'a> {
    /// Pixel data.
    pub data: &'a [u8],
    /// Bytes per row, or per row of blocks for compressed formats.
    pub row_pitch: usize,
}

impl<'a> ImageLevel<'a> {
    /// Create a level description.
    pub fn new(data: &'a [u8], row_pitch: usize) -> Self {
        Self { data, row_pitch }
    }

    /// Size of the level data in bytes.
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ranges() {
        assert!(ImageFormat::D24S8.is_depth_stencil());
        assert!(!ImageFormat::Rgba8.is_depth_stencil());
        assert!(ImageFormat::Dxt5.is_compressed());
        assert!(!ImageFormat::Rgba32F.is_compressed());
        assert!(ImageFormat::Dxt5.is_supported());
        assert!(!ImageFormat::Etc1.is_supported());
    }

    #[test]
    fn test_data_size() {
        assert_eq!(ImageFormat::Rgba8.data_size(64, 64), 64 * 64 * 4);
        assert_eq!(ImageFormat::Dxt1.data_size(64, 64), 16 * 16 * 8);
        assert_eq!(ImageFormat::Dxt5.data_size(2, 2), 16);
    }

    #[test]
    fn test_sampler_defaults() {
        let sampler = SamplerDescriptor::default();
        assert_eq!(sampler.filter, TextureFilterMode::Trilinear);
        assert_eq!(sampler.max_anisotropy, 16);
        assert!(sampler.max_lod.is_infinite());
        assert!(TextureFilterMode::CompareBilinear.is_comparison());
    }

    #[test]
    fn test_cube_faces() {
        assert_eq!(TextureType::Cube.num_faces(), 6);
        assert_eq!(TextureType::Tex2D.num_faces(), 1);
    }
}
