use std::fmt;

use serde::{Deserialize, Serialize};

/// Notification kinds the checkout document emits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CheckoutEvent {
    /// A payment has been authorized.
    Authorize,
    /// The session was cancelled; the frame asks to be closed.
    Cancel,
    /// The session completed; the frame asks to be closed.
    Close,
    /// A payment type has been selected.
    PaymentTypeSelection,
    /// The payment card type has been determined.
    CardTypeResolve,
    /// Any kind this crate does not know about.
    Other(String),
}

impl CheckoutEvent {
    /// Every kind the protocol defines.
    pub const KNOWN: [CheckoutEvent; 5] = [
        CheckoutEvent::Authorize,
        CheckoutEvent::Cancel,
        CheckoutEvent::Close,
        CheckoutEvent::PaymentTypeSelection,
        CheckoutEvent::CardTypeResolve,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            CheckoutEvent::Authorize => "authorize",
            CheckoutEvent::Cancel => "cancel",
            CheckoutEvent::Close => "close",
            CheckoutEvent::PaymentTypeSelection => "paymentTypeSelection",
            CheckoutEvent::CardTypeResolve => "cardTypeResolve",
            CheckoutEvent::Other(kind) => kind,
        }
    }

    /// Whether the frame expects an `acknowledgeCloseRequest` reply.
    ///
    /// Without one it navigates the whole page away.
    pub fn requires_close_acknowledgement(&self) -> bool {
        matches!(self, CheckoutEvent::Cancel | CheckoutEvent::Close)
    }
}

impl From<&str> for CheckoutEvent {
    fn from(kind: &str) -> Self {
        match kind {
            "authorize" => CheckoutEvent::Authorize,
            "cancel" => CheckoutEvent::Cancel,
            "close" => CheckoutEvent::Close,
            "paymentTypeSelection" => CheckoutEvent::PaymentTypeSelection,
            "cardTypeResolve" => CheckoutEvent::CardTypeResolve,
            other => CheckoutEvent::Other(other.to_string()),
        }
    }
}

impl From<String> for CheckoutEvent {
    fn from(kind: String) -> Self {
        CheckoutEvent::from(kind.as_str())
    }
}

impl From<CheckoutEvent> for String {
    fn from(event: CheckoutEvent) -> Self {
        match event {
            CheckoutEvent::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for CheckoutEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
