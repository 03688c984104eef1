use framelink_channel::ChannelError;

/// Errors surfaced by checkout sessions.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// An operation needed a session token and none was held.
    #[error("a session invocation was attempted while no session token was provided")]
    NoSessionToken,

    /// The frame rejected the session or the exchange broke.
    #[error("failed to load session: {0}")]
    LoadSession(String),

    /// The frame never completed the handshake.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The frame was needed before any mount point was supplied.
    #[error("a container must be specified before accessing the frame")]
    ContainerNotSpecified,

    /// The session was destroyed.
    #[error("checkout session destroyed")]
    Destroyed,

    /// Any other channel failure.
    #[error("channel error: {0}")]
    Channel(ChannelError),
}

impl From<ChannelError> for SessionError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Destroyed => SessionError::Destroyed,
            ChannelError::HandshakeFailed(reason) => SessionError::Handshake(reason),
            other => SessionError::Channel(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
