//! Rendering window collaborator.
//!
//! The device does not create OS windows itself. It drives a [`Window`]
//! implementation supplied by the application, and the application forwards
//! OS resize notifications to [`Graphics::handle_resize`](crate::Graphics::handle_resize).
//!
//! [`HeadlessWindow`] is an in-memory implementation for tests, tools and
//! offscreen rendering.

use ember_core::IntVector2;

/// A rendering surface the device presents to.
pub trait Window {
    /// Open the window, or change its client size if already open. Return true on success.
    fn set_size(&mut self, width: i32, height: i32, resizable: bool) -> bool;

    /// Switch between fullscreen and windowed presentation. Return true on success.
    fn set_fullscreen(&mut self, fullscreen: bool) -> bool;

    /// Current client area size.
    fn size(&self) -> IntVector2;

    /// Whether the window is open.
    fn is_open(&self) -> bool;

    /// Whether the user may resize the window.
    fn is_resizable(&self) -> bool;

    /// Whether the window is fullscreen.
    fn is_fullscreen(&self) -> bool;

    /// Close the window.
    fn close(&mut self);
}

/// Window without an OS surface.
#[derive(Debug, Clone, Default)]
pub struct HeadlessWindow {
    size: IntVector2,
    open: bool,
    resizable: bool,
    fullscreen: bool,
}

impl HeadlessWindow {
    /// Create a closed headless window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the user resizing the window. Returns the new size.
    ///
    /// The caller is responsible for forwarding the change to the device.
    pub fn resize(&mut self, width: i32, height: i32) -> IntVector2 {
        if self.open && self.resizable {
            self.size = IntVector2::new(width.max(1), height.max(1));
        }
        self.size
    }
}

impl Window for HeadlessWindow {
    fn set_size(&mut self, width: i32, height: i32, resizable: bool) -> bool {
        if width <= 0 || height <= 0 {
            log::error!("Invalid window size {}x{}", width, height);
            return false;
        }

        self.size = IntVector2::new(width, height);
        self.resizable = resizable;
        self.open = true;
        true
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> bool {
        if !self.open {
            return false;
        }
        self.fullscreen = fullscreen;
        true
    }

    fn size(&self) -> IntVector2 {
        self.size
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn is_resizable(&self) -> bool {
        self.resizable
    }

    fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    fn close(&mut self) {
        self.open = false;
        self.fullscreen = false;
        self.size = IntVector2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_open_and_close() {
        let mut window = HeadlessWindow::new();
        assert!(!window.is_open());
        assert!(window.set_size(640, 480, true));
        assert!(window.is_open());
        assert_eq!(window.size(), IntVector2::new(640, 480));

        window.close();
        assert!(!window.is_open());
        assert_eq!(window.size(), IntVector2::ZERO);
    }

    #[test]
    fn test_headless_rejects_invalid_size() {
        let mut window = HeadlessWindow::new();
        assert!(!window.set_size(0, 480, false));
        assert!(!window.is_open());
    }

    #[test]
    fn test_headless_resize_requires_resizable() {
        let mut window = HeadlessWindow::new();
        window.set_size(640, 480, false);
        assert_eq!(window.resize(800, 600), IntVector2::new(640, 480));

        window.set_size(640, 480, true);
        assert_eq!(window.resize(800, 600), IntVector2::new(800, 600));
    }
}
