use std::fmt;

/// Lifecycle of a [`crate::MessageChannel`].
///
/// ```text
/// Uncreated -> Creating -> Handshaking -> Ready -> Destroyed
///                 |             |
///                 v             v
///              Failed        Failed
/// ```
///
/// Any state can move to `Destroyed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    /// No frame has been requested yet.
    Uncreated,
    /// The frame is attached and loading.
    Creating,
    /// The frame loaded; waiting for the handshake response.
    Handshaking,
    /// The handshake completed.
    Ready,
    /// Loading or the handshake failed.
    Failed,
    /// The channel was torn down.
    Destroyed,
}

impl ChannelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelState::Uncreated => "uncreated",
            ChannelState::Creating => "creating",
            ChannelState::Handshaking => "handshaking",
            ChannelState::Ready => "ready",
            ChannelState::Failed => "failed",
            ChannelState::Destroyed => "destroyed",
        }
    }

    /// Whether no further transition other than teardown can happen.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            ChannelState::Ready | ChannelState::Failed | ChannelState::Destroyed
        )
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
