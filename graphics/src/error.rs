//! Graphics error types.

use std::fmt;

use crate::backend::BackendError;

/// Errors that can occur in the graphics system.
///
/// Every fallible `define`/`set_data` style call logs the error at the point
/// of failure before returning it, so callers may simply test `is_ok()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// Failed to initialize the rendering context or window.
    InitializationFailed(String),
    /// Failed to create a native resource.
    ResourceCreationFailed(String),
    /// An invalid parameter was provided.
    InvalidParameter(String),
    /// An update was attempted on an immutable resource.
    ImmutableResource,
    /// An update range was outside the resource.
    OutOfBounds(String),
    /// The resource has not been defined yet.
    NotDefined,
    /// The device has no rendering context.
    NotInitialized,
    /// A shader variation failed to compile.
    ShaderCompileFailed {
        /// Full name of the variation.
        name: String,
        /// Compiler output.
        log: String,
    },
    /// A shader program failed to link.
    ProgramLinkFailed {
        /// Names of the linked variations.
        name: String,
        /// Linker output.
        log: String,
    },
    /// The handle does not refer to a live resource.
    InvalidHandle,
    /// The native backend reported an error.
    Backend(BackendError),
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializationFailed(msg) => write!(f, "initialization failed: {msg}"),
            Self::ResourceCreationFailed(msg) => write!(f, "resource creation failed: {msg}"),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::ImmutableResource => write!(f, "can not update immutable resource"),
            Self::OutOfBounds(msg) => write!(f, "out of bounds: {msg}"),
            Self::NotDefined => write!(f, "resource is not defined"),
            Self::NotInitialized => write!(f, "graphics device is not initialized"),
            Self::ShaderCompileFailed { name, log } => {
                write!(f, "failed to compile shader {name}: {log}")
            }
            Self::ProgramLinkFailed { name, log } => {
                write!(f, "failed to link shader program {name}: {log}")
            }
            Self::InvalidHandle => write!(f, "invalid resource handle"),
            Self::Backend(err) => write!(f, "backend error: {err}"),
        }
    }
}

impl std::error::Error for GraphicsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BackendError> for GraphicsError {
    fn from(err: BackendError) -> Self {
        Self::Backend(err)
    }
}
