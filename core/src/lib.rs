//! # Ember Engine Core
//!
//! Core crate for the Ember engine: small math value types and profiling macros.

pub mod math;
pub mod profiling;

pub use math::{Color, IntRect, IntVector2, Intersection};

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the core library version.
pub fn init() {
    log::info!("Ember Core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
