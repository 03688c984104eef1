//! Request actions.
//!
//! Three action names are reserved by the checkout document. Anything else is
//! passed through verbatim as [`Action::Custom`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Action name: load a checkout session by token.
pub const LOAD_SESSION: &str = "loadSession";
/// Action name: establish the channel with the frame document.
pub const INITIATE_HANDSHAKE: &str = "initiateHandshake";
/// Action name: reply to `close`/`cancel` so the frame does not navigate the page.
pub const ACKNOWLEDGE_CLOSE_REQUEST: &str = "acknowledgeCloseRequest";

/// An action the frame document responds to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    LoadSession,
    InitiateHandshake,
    AcknowledgeCloseRequest,
    Custom(String),
}

impl Action {
    pub fn as_str(&self) -> &str {
        match self {
            Action::LoadSession => LOAD_SESSION,
            Action::InitiateHandshake => INITIATE_HANDSHAKE,
            Action::AcknowledgeCloseRequest => ACKNOWLEDGE_CLOSE_REQUEST,
            Action::Custom(name) => name,
        }
    }

    /// Returns true for the actions the protocol itself defines.
    pub fn is_reserved(&self) -> bool {
        !matches!(self, Action::Custom(_))
    }
}

impl From<&str> for Action {
    fn from(name: &str) -> Self {
        match name {
            LOAD_SESSION => Action::LoadSession,
            INITIATE_HANDSHAKE => Action::InitiateHandshake,
            ACKNOWLEDGE_CLOSE_REQUEST => Action::AcknowledgeCloseRequest,
            other => Action::Custom(other.to_string()),
        }
    }
}

impl From<String> for Action {
    fn from(name: String) -> Self {
        match Action::from(name.as_str()) {
            Action::Custom(_) => Action::Custom(name),
            reserved => reserved,
        }
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        match action {
            Action::Custom(name) => name,
            reserved => reserved.as_str().to_string(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
