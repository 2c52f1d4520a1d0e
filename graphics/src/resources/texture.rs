//! Texture resource.
//!
//! A texture is either sampled by shaders or, with
//! [`ResourceUsage::RenderTarget`], used as a color or depth-stencil
//! attachment. The format decides which of the two attachment kinds it can be.

use ember_core::profiling::profile_scope;
use ember_core::{IntRect, IntVector2, Intersection};

use crate::backend::{NativeHandle, NativeTextureDesc, RenderBackend, TextureUpdate};
use crate::error::GraphicsError;
use crate::types::{ImageFormat, ImageLevel, ResourceUsage, SamplerDescriptor, TextureType};

use super::GpuObject;

/// 2D texture or cube map.
#[derive(Debug, Default)]
pub struct Texture {
    handle: Option<NativeHandle>,
    texture_type: TextureType,
    usage: ResourceUsage,
    size: IntVector2,
    format: ImageFormat,
    num_levels: usize,
    multisample: u32,
    sampler: SamplerDescriptor,
    data_lost: bool,
}

impl Texture {
    /// Create an undefined texture.
    pub fn new() -> Self {
        Self {
            multisample: 1,
            ..Self::default()
        }
    }

    /// Define storage and optionally upload initial data.
    ///
    /// `initial_data` is either empty or holds every level of every face,
    /// faces outermost. A `num_levels` of 0 is treated as 1.
    #[allow(clippy::too_many_arguments)]
    pub fn define(
        &mut self,
        backend: Option<&mut dyn RenderBackend>,
        texture_type: TextureType,
        usage: ResourceUsage,
        size: IntVector2,
        format: ImageFormat,
        num_levels: usize,
        initial_data: &[ImageLevel<'_>],
    ) -> Result<(), GraphicsError> {
        self.define_storage(
            backend,
            texture_type,
            usage,
            size,
            format,
            num_levels,
            1,
            initial_data,
        )
    }

    /// Define a multisampled render target. Multisampled textures hold one
    /// level and can not be updated from the CPU.
    pub fn define_multisampled(
        &mut self,
        backend: Option<&mut dyn RenderBackend>,
        size: IntVector2,
        format: ImageFormat,
        multisample: u32,
    ) -> Result<(), GraphicsError> {
        self.define_storage(
            backend,
            TextureType::Tex2D,
            ResourceUsage::RenderTarget,
            size,
            format,
            1,
            multisample.max(1),
            &[],
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn define_storage(
        &mut self,
        mut backend: Option<&mut dyn RenderBackend>,
        texture_type: TextureType,
        usage: ResourceUsage,
        size: IntVector2,
        format: ImageFormat,
        num_levels: usize,
        multisample: u32,
        initial_data: &[ImageLevel<'_>],
    ) -> Result<(), GraphicsError> {
        profile_scope!("define_texture");

        if texture_type != TextureType::Tex2D && texture_type != TextureType::Cube {
            return Err(invalid("Only 2D textures and cube maps are supported"));
        }
        if !format.is_supported() {
            return Err(invalid("ETC1 and PVRTC formats are unsupported"));
        }
        if format == ImageFormat::None {
            return Err(invalid("Texture format must be defined"));
        }
        if size.x <= 0 || size.y <= 0 {
            return Err(invalid(&format!(
                "Invalid texture size {}x{}",
                size.x, size.y
            )));
        }
        if texture_type == TextureType::Cube && size.x != size.y {
            return Err(invalid("Cube map must have square dimensions"));
        }

        let num_levels = num_levels.max(1);
        if !initial_data.is_empty() && initial_data.len() < texture_type.num_faces() * num_levels
        {
            return Err(invalid("Initial data must contain every level of every face"));
        }

        self.release_native(backend.as_deref_mut());

        self.texture_type = texture_type;
        self.usage = usage;
        self.size = size;
        self.format = format;
        self.num_levels = num_levels;
        self.multisample = multisample;
        self.data_lost = false;

        let Some(backend) = backend else {
            return Ok(());
        };

        if let Err(e) = self.create(backend, initial_data) {
            self.release_native(Some(backend));
            self.size = IntVector2::ZERO;
            self.format = ImageFormat::None;
            self.num_levels = 0;
            return Err(e);
        }
        Ok(())
    }

    /// Set sampling parameters.
    ///
    /// The parameters are retained while the device is not initialized and
    /// applied when the texture is created. With an initialized device the
    /// texture must already be defined.
    pub fn define_sampler(
        &mut self,
        backend: Option<&mut dyn RenderBackend>,
        sampler: &SamplerDescriptor,
    ) -> Result<(), GraphicsError> {
        profile_scope!("define_texture_sampler");

        self.sampler = *sampler;

        let Some(backend) = backend else {
            return Ok(());
        };
        let Some(handle) = self.handle else {
            log::error!("Texture must be defined before defining sampling parameters");
            return Err(GraphicsError::NotDefined);
        };

        backend
            .set_texture_sampler(handle, self.texture_type, &self.sampler)
            .map_err(|e| {
                log::error!("Failed to define texture sampler: {}", e);
                GraphicsError::from(e)
            })
    }

    /// Update a region of one level of one face.
    ///
    /// Compressed formats accept whole levels only.
    pub fn set_data(
        &mut self,
        backend: Option<&mut dyn RenderBackend>,
        face: usize,
        level: usize,
        rect: IntRect,
        data: &ImageLevel<'_>,
    ) -> Result<(), GraphicsError> {
        profile_scope!("update_texture_level");

        let (Some(handle), Some(backend)) = (self.handle, backend) else {
            return Ok(());
        };

        if self.usage == ResourceUsage::Immutable {
            log::error!("Can not update immutable texture");
            return Err(GraphicsError::ImmutableResource);
        }
        self.upload(backend, handle, face, level, rect, data)
    }

    fn upload(
        &mut self,
        backend: &mut dyn RenderBackend,
        handle: NativeHandle,
        face: usize,
        level: usize,
        rect: IntRect,
        data: &ImageLevel<'_>,
    ) -> Result<(), GraphicsError> {
        if self.multisample > 1 {
            return Err(invalid("Can not update multisampled texture"));
        }
        if face >= self.num_faces() {
            log::error!("Face to update out of bounds");
            return Err(GraphicsError::OutOfBounds(format!(
                "face {face} of {}",
                self.num_faces()
            )));
        }
        if level >= self.num_levels {
            log::error!("Mipmap level to update out of bounds");
            return Err(GraphicsError::OutOfBounds(format!(
                "level {level} of {}",
                self.num_levels
            )));
        }

        let level_rect = self.level_rect(level);
        if level_rect.is_inside(&rect) != Intersection::Inside {
            log::error!(
                "Texture update region {} is outside level {}",
                rect,
                level_rect
            );
            return Err(GraphicsError::OutOfBounds(format!(
                "region {rect} outside level {level_rect}"
            )));
        }

        let whole_level = rect == level_rect;
        if self.format.is_compressed() && !whole_level {
            return Err(invalid("Compressed textures can only be updated a whole level at a time"));
        }

        let expected = self
            .format
            .data_size(rect.width() as usize, rect.height() as usize);
        if data.byte_size() < expected {
            return Err(invalid(&format!(
                "Texture data of {} bytes is smaller than the {} bytes required",
                data.byte_size(),
                expected
            )));
        }

        let update = TextureUpdate {
            face,
            level,
            rect,
            data: *data,
            whole_level,
        };
        backend
            .update_texture(handle, self.texture_type, self.format, &update)
            .map_err(|e| {
                log::error!("Failed to update texture: {}", e);
                GraphicsError::from(e)
            })?;

        self.data_lost = false;
        Ok(())
    }

    /// Native texture handle, if created.
    pub fn handle(&self) -> Option<NativeHandle> {
        self.handle
    }

    /// Texture type.
    pub fn texture_type(&self) -> TextureType {
        self.texture_type
    }

    /// Usage.
    pub fn usage(&self) -> ResourceUsage {
        self.usage
    }

    /// Size of the top level.
    pub fn size(&self) -> IntVector2 {
        self.size
    }

    /// Width of the top level.
    pub fn width(&self) -> i32 {
        self.size.x
    }

    /// Height of the top level.
    pub fn height(&self) -> i32 {
        self.size.y
    }

    /// Pixel format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Number of mip levels.
    pub fn num_levels(&self) -> usize {
        self.num_levels
    }

    /// Number of faces, 6 for cube maps.
    pub fn num_faces(&self) -> usize {
        self.texture_type.num_faces()
    }

    /// Multisample count, 1 when not multisampled.
    pub fn multisample(&self) -> u32 {
        self.multisample
    }

    /// Sampling parameters.
    pub fn sampler(&self) -> &SamplerDescriptor {
        &self.sampler
    }

    /// Whether the format is block-compressed.
    pub fn is_compressed(&self) -> bool {
        self.format.is_compressed()
    }

    /// Whether this texture can be bound as a color render target.
    pub fn is_render_target(&self) -> bool {
        self.usage == ResourceUsage::RenderTarget && !self.format.is_depth_stencil()
    }

    /// Whether this texture can be bound as a depth-stencil buffer.
    pub fn is_depth_stencil(&self) -> bool {
        self.usage == ResourceUsage::RenderTarget && self.format.is_depth_stencil()
    }

    /// Whether the texture has been defined.
    pub fn is_defined(&self) -> bool {
        self.num_levels > 0
    }

    /// Full rectangle of a mip level.
    pub fn level_rect(&self, level: usize) -> IntRect {
        let shift = level.min(31) as u32;
        IntRect::from_size((self.size.x >> shift).max(1), (self.size.y >> shift).max(1))
    }

    fn create(
        &mut self,
        backend: &mut dyn RenderBackend,
        initial_data: &[ImageLevel<'_>],
    ) -> Result<(), GraphicsError> {
        let desc = NativeTextureDesc {
            texture_type: self.texture_type,
            format: self.format,
            width: self.size.x as u32,
            height: self.size.y as u32,
            num_levels: self.num_levels,
            multisample: self.multisample,
            usage: self.usage,
        };

        let handle = backend.create_texture(&desc).map_err(|e| {
            log::error!("Failed to create texture: {}", e);
            GraphicsError::ResourceCreationFailed(format!("texture: {e}"))
        })?;
        self.handle = Some(handle);

        // Immutable textures accept their initial data here
        let mut levels = initial_data.iter();
        if !initial_data.is_empty() {
            for face in 0..self.num_faces() {
                for level in 0..self.num_levels {
                    let Some(data) = levels.next() else { break };
                    let rect = self.level_rect(level);
                    self.upload(backend, handle, face, level, rect, data)?;
                }
            }
        }

        if self.multisample <= 1 {
            backend
                .set_texture_sampler(handle, self.texture_type, &self.sampler)
                .map_err(GraphicsError::from)?;
        }

        log::debug!(
            "Created texture: {}x{}, {:?}, {} levels",
            self.size.x,
            self.size.y,
            self.format,
            self.num_levels
        );
        Ok(())
    }

    fn release_native(&mut self, backend: Option<&mut (dyn RenderBackend + '_)>) {
        if let Some(handle) = self.handle.take()
            && let Some(backend) = backend
        {
            backend.destroy_texture(handle);
        }
    }
}

impl GpuObject for Texture {
    fn release(&mut self, backend: &mut dyn RenderBackend) {
        self.release_native(Some(backend));
    }

    /// Textures keep no pixel copy, so a recreated texture has undefined contents.
    fn recreate(&mut self, backend: &mut dyn RenderBackend) -> Result<(), GraphicsError> {
        if !self.is_defined() || self.handle.is_some() {
            return Ok(());
        }

        let result = self.create(backend, &[]);
        if result.is_err() {
            self.release_native(Some(backend));
        }
        self.data_lost = true;
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

static_assertions::assert_impl_all!(Texture: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::types::TextureFilterMode;
    use crate::window::{HeadlessWindow, Window};

    fn backend() -> DummyBackend {
        let mut window = HeadlessWindow::new();
        window.set_size(32, 32, false);
        let mut backend = DummyBackend::new();
        backend.create_context(&window, 1).unwrap();
        backend
    }

    #[test]
    fn test_cube_map_must_be_square() {
        let mut backend = backend();
        let mut texture = Texture::new();

        texture
            .define(
                Some(&mut backend),
                TextureType::Cube,
                ResourceUsage::Default,
                IntVector2::new(64, 64),
                ImageFormat::Rgba8,
                1,
                &[],
            )
            .unwrap();
        assert!(texture.handle().is_some());
        assert_eq!(texture.num_faces(), 6);

        let result = texture.define(
            Some(&mut backend),
            TextureType::Cube,
            ResourceUsage::Default,
            IntVector2::new(64, 32),
            ImageFormat::Rgba8,
            1,
            &[],
        );
        assert!(result.is_err());

        // A rejected redefine keeps the previous cube map
        assert!(texture.handle().is_some());
        assert_eq!(texture.size(), IntVector2::new(64, 64));
        assert_eq!(backend.live_textures(), 1);

        texture.release(&mut backend);
        texture.recreate(&mut backend).unwrap();
        assert_eq!(texture.size(), IntVector2::new(64, 64));
        assert_eq!(texture.texture_type(), TextureType::Cube);
    }

    #[test]
    fn test_unsupported_types_and_formats() {
        let mut texture = Texture::new();
        let size = IntVector2::new(16, 16);
        assert!(
            texture
                .define(None, TextureType::Tex3D, ResourceUsage::Default, size, ImageFormat::Rgba8, 1, &[])
                .is_err()
        );
        assert!(
            texture
                .define(None, TextureType::Tex2D, ResourceUsage::Default, size, ImageFormat::Etc1, 1, &[])
                .is_err()
        );
        assert!(
            texture
                .define(None, TextureType::Tex2D, ResourceUsage::Default, size, ImageFormat::Rgba8, 0, &[])
                .is_ok()
        );
        assert_eq!(texture.num_levels(), 1);
    }

    #[test]
    fn test_set_data_bounds() {
        let mut backend = backend();
        let mut texture = Texture::new();
        texture
            .define(
                Some(&mut backend),
                TextureType::Tex2D,
                ResourceUsage::Dynamic,
                IntVector2::new(8, 8),
                ImageFormat::Rgba8,
                2,
                &[],
            )
            .unwrap();

        let pixels = vec![0u8; 8 * 8 * 4];
        let level = ImageLevel::new(&pixels, 8 * 4);

        assert!(
            texture
                .set_data(Some(&mut backend), 0, 0, IntRect::new(2, 2, 6, 6), &level)
                .is_ok()
        );
        assert!(matches!(
            texture.set_data(Some(&mut backend), 1, 0, IntRect::from_size(8, 8), &level),
            Err(GraphicsError::OutOfBounds(_))
        ));
        assert!(matches!(
            texture.set_data(Some(&mut backend), 0, 2, IntRect::from_size(1, 1), &level),
            Err(GraphicsError::OutOfBounds(_))
        ));
        assert!(matches!(
            texture.set_data(Some(&mut backend), 0, 1, IntRect::from_size(8, 8), &level),
            Err(GraphicsError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_compressed_update_whole_level_only() {
        let mut backend = backend();
        let mut texture = Texture::new();
        texture
            .define(
                Some(&mut backend),
                TextureType::Tex2D,
                ResourceUsage::Default,
                IntVector2::new(8, 8),
                ImageFormat::Dxt1,
                1,
                &[],
            )
            .unwrap();

        let blocks = vec![0u8; ImageFormat::Dxt1.data_size(8, 8)];
        let level = ImageLevel::new(&blocks, 2 * 8);
        assert!(
            texture
                .set_data(Some(&mut backend), 0, 0, IntRect::from_size(4, 4), &level)
                .is_err()
        );
        assert!(
            texture
                .set_data(Some(&mut backend), 0, 0, IntRect::from_size(8, 8), &level)
                .is_ok()
        );
    }

    #[test]
    fn test_immutable_accepts_initial_data_only() {
        let mut backend = backend();
        let pixels = vec![255u8; 4 * 4 * 4];
        let levels = [ImageLevel::new(&pixels, 16)];

        let mut texture = Texture::new();
        texture
            .define(
                Some(&mut backend),
                TextureType::Tex2D,
                ResourceUsage::Immutable,
                IntVector2::new(4, 4),
                ImageFormat::Rgba8,
                1,
                &levels,
            )
            .unwrap();
        assert_eq!(backend.stats().texture_updates, 1);

        let result = texture.set_data(Some(&mut backend), 0, 0, IntRect::from_size(4, 4), &levels[0]);
        assert!(matches!(result, Err(GraphicsError::ImmutableResource)));
    }

    #[test]
    fn test_multisampled_rejects_updates() {
        let mut backend = backend();
        let mut texture = Texture::new();
        texture
            .define_multisampled(Some(&mut backend), IntVector2::new(16, 16), ImageFormat::Rgba8, 4)
            .unwrap();
        assert!(texture.is_render_target());
        assert_eq!(texture.multisample(), 4);

        let pixels = vec![0u8; 16 * 16 * 4];
        let level = ImageLevel::new(&pixels, 64);
        assert!(
            texture
                .set_data(Some(&mut backend), 0, 0, IntRect::from_size(16, 16), &level)
                .is_err()
        );
    }

    #[test]
    fn test_sampler_requires_native_texture() {
        let mut backend = backend();
        let mut texture = Texture::new();
        let sampler = SamplerDescriptor::default().with_filter(TextureFilterMode::CompareBilinear);

        assert!(texture.define_sampler(None, &sampler).is_ok());
        assert!(texture.define_sampler(Some(&mut backend), &sampler).is_err());
        assert_eq!(texture.sampler().filter, TextureFilterMode::CompareBilinear);
    }

    #[test]
    fn test_render_target_kinds() {
        let mut texture = Texture::new();
        let size = IntVector2::new(32, 32);
        texture
            .define(None, TextureType::Tex2D, ResourceUsage::RenderTarget, size, ImageFormat::D24S8, 1, &[])
            .unwrap();
        assert!(texture.is_depth_stencil());
        assert!(!texture.is_render_target());

        texture
            .define(None, TextureType::Tex2D, ResourceUsage::Default, size, ImageFormat::Rgba8, 1, &[])
            .unwrap();
        assert!(!texture.is_render_target());
    }

    #[test]
    fn test_recreate_marks_data_lost() {
        let mut backend = backend();
        let mut texture = Texture::new();
        texture
            .define(
                Some(&mut backend),
                TextureType::Tex2D,
                ResourceUsage::Default,
                IntVector2::new(4, 4),
                ImageFormat::Rgba8,
                1,
                &[],
            )
            .unwrap();

        texture.release(&mut backend);
        texture.release(&mut backend);
        assert!(texture.handle().is_none());

        texture.recreate(&mut backend).unwrap();
        assert!(texture.handle().is_some());
        assert!(texture.is_data_lost());

        let pixels = vec![0u8; 64];
        texture
            .set_data(Some(&mut backend), 0, 0, IntRect::from_size(4, 4), &ImageLevel::new(&pixels, 16))
            .unwrap();
        assert!(!texture.is_data_lost());
    }
}
