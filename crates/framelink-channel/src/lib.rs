//! Point-to-point messaging with an embedded frame over a broadcast transport.
//!
//! A [`MessageChannel`] owns one content frame. It creates the frame lazily,
//! performs the `initiateHandshake` exchange once the frame loads, correlates
//! requests with responses by message id and republishes the frame's
//! notifications to subscribers.
//!
//! Every inbound delivery is filtered twice: its declared origin must equal
//! the channel's target origin, and it must carry this channel's id (for
//! notifications) or an awaited message id (for responses). Anything else is
//! dropped without error.

pub mod channel;
pub mod config;
pub mod error;
mod handshake;
pub mod state;

use framelink_emitter::{Handler, WildcardHandler};
use framelink_protocol::CheckoutEvent;
use serde_json::Value;

pub use channel::MessageChannel;
pub use config::ChannelConfig;
pub use error::{ChannelError, Result};
pub use state::ChannelState;

/// Handler for one notification kind; receives the payload.
pub type NotificationHandler = Handler<Value>;

/// Handler for every notification kind; receives the kind and the payload.
pub type WildcardNotificationHandler = WildcardHandler<CheckoutEvent, Value>;
