/// Errors that can occur while encoding or decoding protocol messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An identifier did not carry the expected prefix.
    #[error("malformed identifier '{0}'")]
    MalformedId(String),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
