use thiserror::Error;

/// An inbound envelope that cannot be interpreted
///
/// Only ever fatal to the envelope itself: callers acknowledge and drop it.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    /// Payload is not JSON or does not match the envelope shape
    #[error("Envelope is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Neither a resource update nor a relation update is present
    #[error("Envelope carries neither resourceUpdate nor relationUpdate")]
    MissingUpdate,

    /// A resource update without events or traits
    #[error("resourceUpdate for {0} carries neither events nor traits")]
    EmptyResourceUpdate(String),
}

/// Result type for envelope parsing
pub type Result<T> = std::result::Result<T, EnvelopeError>;
