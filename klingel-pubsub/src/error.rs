use klingel_auth::{AuthError, Unauthorized};
use thiserror::Error;

/// Errors talking to the Pub/Sub REST API
#[derive(Error, Debug)]
pub enum PubSubError {
    /// The API answered 401; the bearer token is stale or revoked
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Network error: {0}")]
    Network(String),

    /// Any other non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Message data is not valid base64
    #[error("Message {message_id} has undecodable data: {source}")]
    Decode {
        message_id: String,
        #[source]
        source: base64::DecodeError,
    },

    /// Obtaining or refreshing the access token failed
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl Unauthorized for PubSubError {
    fn is_unauthorized(&self) -> bool {
        match self {
            PubSubError::Unauthorized(_) => true,
            PubSubError::Auth(e) => e.is_unauthorized(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PubSubError>;
