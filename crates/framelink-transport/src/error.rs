/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The address could not be turned into an origin.
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The frame is no longer attached to a mount point.
    #[error("frame {0} is detached")]
    Detached(String),

    /// The mount point refused to attach a frame.
    #[error("failed to mount frame {id}: {reason}")]
    Mount { id: String, reason: String },

    /// The message could not be delivered.
    #[error("failed to post message: {0}")]
    Post(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
