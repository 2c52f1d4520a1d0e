//! Backend error types.

/// Errors reported by a native rendering backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Failed to create or restore the rendering context.
    ContextCreationFailed(String),
    /// Failed to create a native object.
    ResourceCreationFailed(String),
    /// The native handle is not known to the backend.
    InvalidHandle,
    /// Out of GPU memory.
    OutOfMemory,
    /// The context was lost.
    ContextLost,
    /// Invalid parameter.
    InvalidParameter(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ContextCreationFailed(msg) => write!(f, "context creation failed: {msg}"),
            Self::ResourceCreationFailed(msg) => write!(f, "native object creation failed: {msg}"),
            Self::InvalidHandle => write!(f, "invalid native handle"),
            Self::OutOfMemory => write!(f, "out of GPU memory"),
            Self::ContextLost => write!(f, "rendering context lost"),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}
