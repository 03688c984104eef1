use std::time::Duration;

/// Channel tuning.
///
/// Both timeouts are off by default: a frame that never answers leaves the
/// caller waiting until the channel is destroyed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Upper bound on waiting for one response.
    pub request_timeout: Option<Duration>,
    /// Upper bound on frame load plus handshake.
    pub handshake_timeout: Option<Duration>,
}

impl ChannelConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }
}
