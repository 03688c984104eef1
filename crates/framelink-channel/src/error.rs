use std::sync::Arc;
use std::time::Duration;

use framelink_protocol::{ProtocolError, RemoteError};
use framelink_transport::TransportError;

/// Errors that can occur in channel operations.
///
/// Cloneable so a failed readiness result can be handed to every waiter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChannelError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(Arc<TransportError>),

    /// Protocol encoding error.
    #[error("protocol error: {0}")]
    Protocol(Arc<ProtocolError>),

    /// The frame failed to load or never acknowledged the handshake.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// The frame answered with `result = false`.
    #[error("request rejected: {0}")]
    Rejected(RemoteError),

    /// No response arrived in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The channel was torn down.
    #[error("channel destroyed")]
    Destroyed,
}

impl From<TransportError> for ChannelError {
    fn from(err: TransportError) -> Self {
        ChannelError::Transport(Arc::new(err))
    }
}

impl From<ProtocolError> for ChannelError {
    fn from(err: ProtocolError) -> Self {
        ChannelError::Protocol(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
