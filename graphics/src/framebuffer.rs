//! Framebuffer object cache.
//!
//! Rendering to textures needs a native framebuffer object. The device keeps
//! one per combination of render target size and color format, and changes
//! only the attachment points that differ from what the framebuffer last had
//! attached. Framebuffers that stay unbound for [`MAX_FRAMEBUFFER_AGE`]
//! presented frames are destroyed.

use std::collections::HashMap;

use ember_core::IntVector2;

use crate::backend::{BackendError, NativeHandle, RenderBackend};
use crate::resources::TextureId;
use crate::types::{ImageFormat, MAX_FRAMEBUFFER_AGE, MAX_RENDERTARGETS};

const DEPTH_SLOT_BIT: u32 = 1 << MAX_RENDERTARGETS;

/// Build the cache key for a render target size and primary color format.
pub fn framebuffer_key(size: IntVector2, format: ImageFormat) -> u64 {
    let width = size.x.max(0) as u64 & 0xffff;
    let height = size.y.max(0) as u64 & 0xffff;
    ((width << 16) | height) | ((format as u64) << 32)
}

/// A texture attached to a framebuffer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    /// Device-side texture handle.
    pub texture: TextureId,
    /// Native texture at the time of attaching.
    pub handle: NativeHandle,
}

/// A cached native framebuffer and its last-known attachments.
#[derive(Debug)]
pub struct Framebuffer {
    handle: NativeHandle,
    colors: [Option<Attachment>; MAX_RENDERTARGETS],
    depth_stencil: Option<Attachment>,
    draw_buffers: Option<u32>,
    stale_slots: u32,
    age: u32,
}

impl Framebuffer {
    fn new(handle: NativeHandle) -> Self {
        Self {
            handle,
            colors: [None; MAX_RENDERTARGETS],
            depth_stencil: None,
            draw_buffers: None,
            stale_slots: 0,
            age: 0,
        }
    }

    /// Native framebuffer object.
    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    /// Last-known color attachment of a slot.
    pub fn color(&self, slot: usize) -> Option<Attachment> {
        self.colors.get(slot).copied().flatten()
    }

    /// Last-known depth-stencil attachment.
    pub fn depth_stencil(&self) -> Option<Attachment> {
        self.depth_stencil
    }

    /// Frames since the framebuffer was last bound.
    pub fn age(&self) -> u32 {
        self.age
    }

    /// Bring the attachments of this framebuffer, which must be bound, in
    /// line with the desired ones. Each slot is compared independently.
    pub(crate) fn update_attachments(
        &mut self,
        backend: &mut dyn RenderBackend,
        colors: &[Option<Attachment>; MAX_RENDERTARGETS],
        depth_stencil: Option<Attachment>,
        depth_has_stencil: bool,
    ) {
        let mut draw_buffers = 0u32;

        for (slot, desired) in colors.iter().enumerate() {
            let stale = self.stale_slots & (1 << slot) != 0;
            if stale || self.colors[slot] != *desired {
                backend.attach_color(slot, desired.map(|a| a.handle));
                self.colors[slot] = *desired;
            }
            if desired.is_some() {
                draw_buffers |= 1 << slot;
            }
        }

        if self.draw_buffers != Some(draw_buffers) {
            backend.set_draw_buffers(draw_buffers);
            self.draw_buffers = Some(draw_buffers);
        }

        let stale = self.stale_slots & DEPTH_SLOT_BIT != 0;
        if stale || self.depth_stencil != depth_stencil {
            backend.attach_depth_stencil(depth_stencil.map(|a| a.handle), depth_has_stencil);
            self.depth_stencil = depth_stencil;
        }

        self.stale_slots = 0;
        self.age = 0;
    }

    fn forget_texture(&mut self, texture: TextureId) -> bool {
        let mut changed = false;
        for (slot, color) in self.colors.iter_mut().enumerate() {
            if color.is_some_and(|a| a.texture == texture) {
                *color = None;
                self.stale_slots |= 1 << slot;
                changed = true;
            }
        }
        if self.depth_stencil.is_some_and(|a| a.texture == texture) {
            self.depth_stencil = None;
            self.stale_slots |= DEPTH_SLOT_BIT;
            changed = true;
        }
        changed
    }
}

/// Framebuffers keyed by [`framebuffer_key`].
#[derive(Debug, Default)]
pub struct FramebufferCache {
    framebuffers: HashMap<u64, Framebuffer>,
    bound: Option<u64>,
}

impl FramebufferCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the framebuffer for `key`, creating it on first use.
    ///
    /// Does nothing if it is already bound.
    pub(crate) fn bind(
        &mut self,
        backend: &mut dyn RenderBackend,
        key: u64,
    ) -> Result<&mut Framebuffer, BackendError> {
        if !self.framebuffers.contains_key(&key) {
            let handle = backend.create_framebuffer()?;
            log::debug!("Created framebuffer {:#x}", key);
            self.framebuffers.insert(key, Framebuffer::new(handle));
        }

        let framebuffer = self
            .framebuffers
            .get_mut(&key)
            .ok_or(BackendError::InvalidHandle)?;
        if self.bound != Some(key) {
            backend.bind_framebuffer(Some(framebuffer.handle));
            self.bound = Some(key);
        }
        Ok(framebuffer)
    }

    /// Switch to the backbuffer.
    pub(crate) fn bind_backbuffer(&mut self, backend: &mut dyn RenderBackend) {
        if self.bound.is_some() {
            backend.bind_framebuffer(None);
            self.bound = None;
        }
    }

    /// Clear every attachment record that refers to `texture`.
    ///
    /// Returns true if any framebuffer referred to it.
    pub(crate) fn forget_texture(&mut self, texture: TextureId) -> bool {
        let mut changed = false;
        for framebuffer in self.framebuffers.values_mut() {
            changed |= framebuffer.forget_texture(texture);
        }
        changed
    }

    /// Advance the age of unbound framebuffers and destroy the expired ones.
    pub(crate) fn age_out(&mut self, backend: &mut dyn RenderBackend) {
        let bound = self.bound;
        self.framebuffers.retain(|key, framebuffer| {
            if Some(*key) == bound {
                framebuffer.age = 0;
                return true;
            }

            framebuffer.age += 1;
            if framebuffer.age > MAX_FRAMEBUFFER_AGE {
                log::debug!("Destroying unused framebuffer {:#x}", key);
                backend.destroy_framebuffer(framebuffer.handle);
                false
            } else {
                true
            }
        });
    }

    /// Destroy every framebuffer.
    pub(crate) fn clear(&mut self, backend: Option<&mut dyn RenderBackend>) {
        if let Some(backend) = backend {
            if self.bound.is_some() {
                backend.bind_framebuffer(None);
            }
            for framebuffer in self.framebuffers.values() {
                backend.destroy_framebuffer(framebuffer.handle);
            }
        }
        self.framebuffers.clear();
        self.bound = None;
    }

    /// Key of the bound framebuffer, `None` for the backbuffer.
    pub fn bound_key(&self) -> Option<u64> {
        self.bound
    }

    /// Cached framebuffer for a key.
    pub fn get(&self, key: u64) -> Option<&Framebuffer> {
        self.framebuffers.get(&key)
    }

    /// Number of cached framebuffers.
    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }
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

    fn attachment(handle: u32) -> (TextureId, Attachment) {
        let mut ids = slotmap::SlotMap::<TextureId, ()>::with_key();
        let texture = ids.insert(());
        (
            texture,
            Attachment {
                texture,
                handle: NativeHandle(handle),
            },
        )
    }

    #[test]
    fn test_key_layout() {
        let key = framebuffer_key(IntVector2::new(640, 480), ImageFormat::Rgba8);
        assert_eq!(key & 0xffff, 480);
        assert_eq!((key >> 16) & 0xffff, 640);
        assert_eq!(key >> 32, ImageFormat::Rgba8 as u64);
        assert_ne!(key, framebuffer_key(IntVector2::new(640, 480), ImageFormat::Rgba16F));
    }

    #[test]
    fn test_attachments_diffed_per_slot() {
        let mut backend = backend();
        let mut cache = FramebufferCache::new();
        let (_, color) = attachment(100);
        let (_, depth) = attachment(200);

        let framebuffer = cache.bind(&mut backend, 1).unwrap();
        framebuffer.update_attachments(&mut backend, &[Some(color), None, None, None], Some(depth), true);
        let changes = backend.stats().attachment_changes;

        let framebuffer = cache.bind(&mut backend, 1).unwrap();
        framebuffer.update_attachments(&mut backend, &[Some(color), None, None, None], Some(depth), true);
        assert_eq!(backend.stats().attachment_changes, changes);
        assert_eq!(backend.stats().framebuffer_binds, 1);
        assert_eq!(backend.stats().draw_buffer_changes, 1);

        let framebuffer = cache.bind(&mut backend, 1).unwrap();
        framebuffer.update_attachments(&mut backend, &[Some(color), None, None, None], None, false);
        assert_eq!(backend.stats().attachment_changes, changes + 1);
    }

    #[test]
    fn test_forget_texture_forces_reattach() {
        let mut backend = backend();
        let mut cache = FramebufferCache::new();
        let (texture, color) = attachment(100);

        let framebuffer = cache.bind(&mut backend, 1).unwrap();
        framebuffer.update_attachments(&mut backend, &[Some(color), None, None, None], None, false);
        assert!(cache.forget_texture(texture));
        assert_eq!(cache.get(1).unwrap().color(0), None);

        let changes = backend.stats().attachment_changes;
        let framebuffer = cache.bind(&mut backend, 1).unwrap();
        framebuffer.update_attachments(&mut backend, &[None; MAX_RENDERTARGETS], None, false);
        assert_eq!(backend.stats().attachment_changes, changes + 1);
    }

    #[test]
    fn test_age_out_skips_bound() {
        let mut backend = backend();
        let mut cache = FramebufferCache::new();
        cache.bind(&mut backend, 1).unwrap();
        cache.bind(&mut backend, 2).unwrap();

        for _ in 0..MAX_FRAMEBUFFER_AGE {
            cache.age_out(&mut backend);
        }
        assert_eq!(cache.len(), 2);

        cache.age_out(&mut backend);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(2).is_some());
        assert_eq!(backend.live_framebuffers(), 1);

        cache.bind_backbuffer(&mut backend);
        assert_eq!(cache.bound_key(), None);
        cache.clear(Some(&mut backend));
        assert!(cache.is_empty());
        assert_eq!(backend.live_framebuffers(), 0);
    }
}
