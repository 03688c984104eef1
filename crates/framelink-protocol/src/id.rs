//! Channel and message identifiers.
//!
//! Both are a fixed prefix followed by the 32 hex digits of a UUIDv4, giving
//! 122 random bits. That keeps identifiers unique across every channel on a
//! page and across pages, not just within one channel's lifetime.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProtocolError;

const CHANNEL_PREFIX: &str = "iframe_";
const MESSAGE_PREFIX: &str = "message_";

macro_rules! prefixed_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(format!("{}{}", $prefix, Uuid::new_v4().simple()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = ProtocolError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.strip_prefix($prefix) {
                    Some(rest) if !rest.is_empty() => Ok(Self(value.to_string())),
                    _ => Err(ProtocolError::MalformedId(value.to_string())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

prefixed_id!(
    /// Identity of one message channel. Doubles as the frame element id and as
    /// the handshake id every notification from the frame carries.
    ChannelId,
    CHANNEL_PREFIX
);

prefixed_id!(
    /// Correlates one request with its response.
    MessageId,
    MESSAGE_PREFIX
);
