//! Profiling support via Tracy.
//!
//! This module provides optional profiling instrumentation using the [Tracy profiler](https://github.com/wolfpld/tracy).
//! Profiling is enabled via the `profiling` Cargo feature.
//!
//! # Enabling Profiling
//!
//! ```toml
//! [dependencies]
//! ember-core = { version = "0.1", features = ["profiling"] }
//! ```
//!
//! # CPU Profiling
//!
//! ```ignore
//! use ember_core::profiling::{profile_scope, profile_function};
//!
//! fn expensive_operation() {
//!     profile_function!();
//!
//!     {
//!         profile_scope!("inner_work");
//!         // ... do work ...
//!     }
//! }
//! ```
//!
//! # Frame Marking
//!
//! ```ignore
//! use ember_core::profiling::frame_mark;
//!
//! loop {
//!     // ... render frame ...
//!     frame_mark!();
//! }
//! ```
//!
//! When profiling is disabled (the default), all macros compile to no-ops.

#[cfg(feature = "profiling")]
pub use tracy_client::{
    self, Client, frame_mark as tracy_frame_mark, plot as tracy_plot, span,
};

/// Mark the end of a frame for Tracy's frame analysis.
///
/// Call once per frame, typically right after presenting.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! frame_mark {
    () => {
        $crate::profiling::tracy_frame_mark()
    };
}

/// Mark the end of a frame (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! frame_mark {
    () => {};
}

/// Create a profiling span for the current scope.
///
/// The span ends when the scope exits.
///
/// # Example
///
/// ```ignore
/// fn define_buffer() {
///     profile_scope!("upload");
///     // ...
/// }
/// ```
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_scope {
    ($name:expr) => {
        let _profile_span = $crate::profiling::span!($name);
    };
}

/// Create a profiling span (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_scope {
    ($name:expr) => {};
}

/// Create a profiling span for the entire function.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_function {
    () => {
        let _profile_span = $crate::profiling::span!();
    };
}

/// Create a profiling span for function (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_function {
    () => {};
}

/// Plot a value over time in Tracy.
///
/// # Example
///
/// ```ignore
/// profile_plot!("framebuffers", cache.len());
/// ```
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_plot {
    ($name:expr, $value:expr) => {
        $crate::profiling::tracy_plot!($name, $value as f64)
    };
}

/// Plot a value (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_plot {
    ($name:expr, $value:expr) => {
        let _ = $value;
    };
}

/// Send a message to Tracy's message log.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_message {
    ($msg:expr) => {
        if let Some(client) = $crate::profiling::Client::running() {
            client.message($msg, 0);
        }
    };
}

/// Send a message (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_message {
    ($msg:expr) => {};
}

pub use frame_mark;
pub use profile_function;
pub use profile_message;
pub use profile_plot;
pub use profile_scope;

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_compile() {
        frame_mark!();
        profile_scope!("test_scope");
        profile_function!();
        profile_plot!("test_value", 42.0);
        profile_message!("test message");
    }
}
