//! Integer rectangle, integer vector and color types.
//!
//! These are the small value types shared by the device layer for
//! viewports, scissor rectangles, texture update regions and clear colors.

use bytemuck::{Pod, Zeroable};

// ============================================================================
// IntVector2
// ============================================================================

/// Two-dimensional integer vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntVector2 {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
}

impl IntVector2 {
    /// Zero vector.
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Create a new vector.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

// ============================================================================
// IntRect
// ============================================================================

/// Result of testing whether a rectangle is contained in another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intersection {
    /// Completely outside.
    Outside,
    /// Partially overlapping.
    Intersects,
    /// Completely inside.
    Inside,
}

/// Integer rectangle with exclusive right and bottom edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntRect {
    /// Left coordinate.
    pub left: i32,
    /// Top coordinate.
    pub top: i32,
    /// Right coordinate (exclusive).
    pub right: i32,
    /// Bottom coordinate (exclusive).
    pub bottom: i32,
}

impl IntRect {
    /// Zero-sized rectangle at the origin.
    pub const ZERO: Self = Self {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    /// Create a rectangle from its edges.
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a rectangle at the origin with the given size.
    pub const fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Width of the rectangle.
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    /// Height of the rectangle.
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Size of the rectangle.
    pub fn size(&self) -> IntVector2 {
        IntVector2::new(self.width(), self.height())
    }

    /// Test whether `rect` lies inside this rectangle.
    pub fn is_inside(&self, rect: &IntRect) -> Intersection {
        if rect.right <= self.left
            || rect.left >= self.right
            || rect.bottom <= self.top
            || rect.top >= self.bottom
        {
            Intersection::Outside
        } else if rect.left >= self.left
            && rect.right <= self.right
            && rect.top >= self.top
            && rect.bottom <= self.bottom
        {
            Intersection::Inside
        } else {
            Intersection::Intersects
        }
    }

    /// Clamp this rectangle into a target of `size`, keeping it at least one pixel large.
    ///
    /// Left and top are clamped to `[0, size - 1]`, right and bottom to
    /// `[left + 1, size]`.
    pub fn clamped_to(&self, size: IntVector2) -> IntRect {
        let left = self.left.clamp(0, (size.x - 1).max(0));
        let top = self.top.clamp(0, (size.y - 1).max(0));
        let right = self.right.clamp(left + 1, size.x.max(left + 1));
        let bottom = self.bottom.clamp(top + 1, size.y.max(top + 1));
        IntRect::new(left, top, right, bottom)
    }
}

impl std::fmt::Display for IntRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.left, self.top, self.right, self.bottom
        )
    }
}

// ============================================================================
// Color
// ============================================================================

/// RGBA color with floating point components.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Color {
    /// Red component.
    pub r: f32,
    /// Green component.
    pub g: f32,
    /// Blue component.
    pub b: f32,
    /// Alpha component.
    pub a: f32,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    /// Opaque red.
    pub const RED: Self = Self::new(1.0, 0.0, 0.0, 1.0);
    /// Opaque green.
    pub const GREEN: Self = Self::new(0.0, 1.0, 0.0, 1.0);
    /// Opaque blue.
    pub const BLUE: Self = Self::new(0.0, 0.0, 1.0, 1.0);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Create a color from its components.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Components as an array.
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_size() {
        let rect = IntRect::new(10, 20, 110, 70);
        assert_eq!(rect.width(), 100);
        assert_eq!(rect.height(), 50);
        assert_eq!(rect.size(), IntVector2::new(100, 50));
    }

    #[test]
    fn test_rect_is_inside() {
        let level = IntRect::from_size(64, 64);
        assert_eq!(level.is_inside(&IntRect::new(0, 0, 64, 64)), Intersection::Inside);
        assert_eq!(level.is_inside(&IntRect::new(8, 8, 16, 16)), Intersection::Inside);
        assert_eq!(
            level.is_inside(&IntRect::new(60, 60, 70, 70)),
            Intersection::Intersects
        );
        assert_eq!(
            level.is_inside(&IntRect::new(64, 0, 80, 16)),
            Intersection::Outside
        );
    }

    #[test]
    fn test_rect_clamped_to() {
        let size = IntVector2::new(640, 480);
        assert_eq!(
            IntRect::new(-10, -10, 1000, 1000).clamped_to(size),
            IntRect::new(0, 0, 640, 480)
        );
        // Degenerate rectangles stay at least one pixel large
        assert_eq!(
            IntRect::new(700, 500, 0, 0).clamped_to(size),
            IntRect::new(639, 479, 640, 480)
        );
    }

    #[test]
    fn test_color_pod() {
        let color = Color::rgb(0.0, 0.0, 0.5);
        let bytes: &[u8] = bytemuck::bytes_of(&color);
        assert_eq!(bytes.len(), 16);
        assert_eq!(color.to_array(), [0.0, 0.0, 0.5, 1.0]);
    }
}
