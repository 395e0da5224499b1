use thiserror::Error;

use crate::component::DataType;

/// Canonical result for the engine.
pub type Result<T> = std::result::Result<T, VtlError>;

#[derive(Debug, Error)]
pub enum VtlError {
    #[error("type mismatch: cannot compare {left} with {right}")]
    TypeMismatch { left: DataType, right: DataType },

    #[error("unsupported value type: {0}")]
    UnsupportedType(String),

    #[error("schema violation: {0}")]
    Schema(String),

    #[error("domain error: {0}")]
    Domain(String),

    #[error("precondition violated: {0}")]
    Precondition(String),

    // Connector failures are opaque to the engine and surfaced unchanged.
    #[error("connector error: {0}")]
    Connector(#[source] Box<dyn std::error::Error + Send + Sync>),
}
