//! Typed, origin-checked messaging with embedded checkout frames.
//!
//! framelink embeds a third-party checkout in a content frame and talks to it
//! over the page-wide broadcast transport: a handshake, correlated
//! request/response calls and proxied notifications.
//!
//! # Crate Structure
//!
//! - [`transport`]: broadcast transport, frame and mount point abstractions, in-memory page
//! - [`protocol`]: wire shapes, actions, notification kinds, identifiers
//! - [`emitter`]: publish/subscribe with wildcard subscriptions
//! - [`channel`]: the handshaken message channel to one frame
//! - [`session`]: checkout sessions and the redirect, inline and modal variants

/// Re-export transport types.
pub mod transport {
    pub use framelink_transport::*;
}

/// Re-export protocol types.
pub mod protocol {
    pub use framelink_protocol::*;
}

/// Re-export emitter types.
pub mod emitter {
    pub use framelink_emitter::*;
}

/// Re-export channel types.
pub mod channel {
    pub use framelink_channel::*;
}

/// Re-export session types.
pub mod session {
    pub use framelink_session::*;
}
