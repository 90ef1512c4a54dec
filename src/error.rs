//! Error types for the playground

use thiserror::Error;

/// Result type alias for playground operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the playground
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write the persisted snapshot
    #[error("Storage failed: {0}")]
    StoreError(String),

    /// Snapshot could not be serialized or parsed
    #[error("Serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to render the composed document
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Failed to execute preview JavaScript
    #[error("Script execution failed: {0}")]
    ScriptError(String),

    /// Page job timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Clipboard write failed
    #[error("Clipboard unavailable: {0}")]
    ClipboardError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
