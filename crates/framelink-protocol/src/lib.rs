//! The framelink checkout protocol.
//!
//! Three message shapes share one broadcast transport:
//! - requests (`action`, `payload`, `messageId`) posted into the frame
//! - responses (`result`, `messageId`, `payload`) correlated by message id
//! - notifications (`handshakeId`, `event`, `payload`) tagged with the channel id
//!
//! Responses and notifications are told apart by shape, never by order.

pub mod action;
pub mod error;
pub mod event;
pub mod id;
pub mod message;
pub mod script;

pub use action::Action;
pub use error::{ProtocolError, Result};
pub use event::CheckoutEvent;
pub use id::{ChannelId, MessageId};
pub use message::{
    is_truthy, parse_notification, parse_response, NotificationMessage, RemoteError,
    RequestMessage, ResponseMessage,
};
pub use script::{Reply, ScriptedDocument};
