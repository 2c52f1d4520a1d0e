//! Profiling support via Tracy.
//!
//! This module re-exports the CPU profiling macros from
//! [`ember_core::profiling`] and adds the per-frame device counters plotted
//! by [`Graphics::present`](crate::Graphics::present).
//!
//! # Enabling Profiling
//!
//! ```toml
//! [dependencies]
//! ember-graphics = { version = "0.1", features = ["profiling"] }
//! ```
//!
//! The device opens spans around mode changes, draw preparation, resource
//! definition and shader compilation, and marks a frame on every present.

pub use ember_core::profiling::*;

/// Plot the size of the device caches for the current frame.
pub(crate) fn plot_cache_sizes(framebuffers: usize, programs: usize) {
    profile_plot!("framebuffers", framebuffers);
    profile_plot!("shader programs", programs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plot_without_profiler() {
        plot_cache_sizes(2, 3);
        profile_scope!("test_scope");
    }
}
