use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::Action;
use crate::error::Result;
use crate::event::CheckoutEvent;
use crate::id::{ChannelId, MessageId};

/// A request posted into the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage {
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub message_id: MessageId,
}

impl RequestMessage {
    pub fn new(action: Action, payload: Option<Value>, message_id: MessageId) -> Self {
        Self {
            action,
            payload,
            message_id,
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// A reply to a request, correlated by `message_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage {
    pub result: bool,
    pub message_id: MessageId,
    #[serde(default)]
    pub payload: Value,
}

impl ResponseMessage {
    pub fn accept(message_id: MessageId, payload: Value) -> Self {
        Self {
            result: true,
            message_id,
            payload,
        }
    }

    pub fn reject(message_id: MessageId, payload: Value) -> Self {
        Self {
            result: false,
            message_id,
            payload,
        }
    }

    /// Split into the success payload or the remote rejection.
    pub fn into_result(self) -> std::result::Result<Value, RemoteError> {
        if self.result {
            Ok(self.payload)
        } else {
            Err(RemoteError::new(self.payload))
        }
    }
}

/// An unsolicited message from the frame, tagged with the channel it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    pub handshake_id: ChannelId,
    pub event: CheckoutEvent,
    #[serde(default)]
    pub payload: Value,
}

/// JavaScript truthiness of a JSON value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Read `data` as the response to `expected`.
///
/// Anything that is not an object carrying `messageId == expected` is not a
/// match. A missing or falsy `result` means the request was rejected.
pub fn parse_response(data: &Value, expected: &MessageId) -> Option<ResponseMessage> {
    let fields = data.as_object()?;
    if fields.get("messageId")?.as_str()? != expected.as_str() {
        return None;
    }

    Some(ResponseMessage {
        result: fields.get("result").is_some_and(is_truthy),
        message_id: expected.clone(),
        payload: fields.get("payload").cloned().unwrap_or(Value::Null),
    })
}

/// Read `data` as a notification addressed to `channel`.
pub fn parse_notification(data: &Value, channel: &ChannelId) -> Option<NotificationMessage> {
    let fields = data.as_object()?;
    if fields.get("handshakeId")?.as_str()? != channel.as_str() {
        return None;
    }

    let event = fields.get("event")?.as_str()?;
    Some(NotificationMessage {
        handshake_id: channel.clone(),
        event: CheckoutEvent::from(event),
        payload: fields.get("payload").cloned().unwrap_or(Value::Null),
    })
}

/// A rejection reported by the frame document.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteError {
    payload: Value,
}

impl RemoteError {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    /// The payload exactly as the frame sent it.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Human-readable error text carried by the payload.
    pub fn message(&self) -> String {
        match &self.payload {
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            Value::Object(fields) => match fields.get("message").and_then(Value::as_str) {
                Some(text) => text.to_string(),
                None => self.payload.to_string(),
            },
            other => other.to_string(),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for RemoteError {}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn message_id(raw: &str) -> MessageId {
        raw.parse().unwrap()
    }

    #[test]
    fn request_uses_camel_case_keys_and_omits_missing_payload() {
        let request = RequestMessage::new(Action::LoadSession, None, message_id("message_1"));
        assert_eq!(
            request.to_value().unwrap(),
            json!({ "action": "loadSession", "messageId": "message_1" })
        );

        let request = RequestMessage::new(
            Action::InitiateHandshake,
            Some(json!("iframe_1")),
            message_id("message_2"),
        );
        assert_eq!(
            request.to_value().unwrap(),
            json!({ "action": "initiateHandshake", "payload": "iframe_1", "messageId": "message_2" })
        );
    }

    #[test]
    fn response_matches_only_its_message_id() {
        let expected = message_id("message_a");
        let data = json!({ "result": true, "messageId": "message_a", "payload": 5 });

        let response = parse_response(&data, &expected).unwrap();
        assert!(response.result);
        assert_eq!(response.into_result().unwrap(), json!(5));

        assert!(parse_response(&data, &message_id("message_b")).is_none());
        assert!(parse_response(&json!("message_a"), &expected).is_none());
        assert!(parse_response(&json!({ "result": true }), &expected).is_none());
    }

    #[test]
    fn falsy_or_missing_result_is_a_rejection() {
        let expected = message_id("message_a");
        for data in [
            json!({ "messageId": "message_a", "payload": "nope" }),
            json!({ "result": false, "messageId": "message_a", "payload": "nope" }),
            json!({ "result": 0, "messageId": "message_a", "payload": "nope" }),
            json!({ "result": "", "messageId": "message_a", "payload": "nope" }),
        ] {
            let err = parse_response(&data, &expected)
                .unwrap()
                .into_result()
                .unwrap_err();
            assert_eq!(err.message(), "nope");
        }
    }

    #[test]
    fn notification_requires_matching_handshake_id_and_kind() {
        let channel: ChannelId = "iframe_x".parse().unwrap();
        let data = json!({
            "handshakeId": "iframe_x",
            "event": "authorize",
            "payload": { "transactionId": "123" }
        });

        let notification = parse_notification(&data, &channel).unwrap();
        assert_eq!(notification.event, CheckoutEvent::Authorize);
        assert_eq!(notification.payload["transactionId"], "123");

        let foreign: ChannelId = "iframe_y".parse().unwrap();
        assert!(parse_notification(&data, &foreign).is_none());
        assert!(parse_notification(&json!({ "handshakeId": "iframe_x" }), &channel).is_none());
    }

    #[test]
    fn responses_and_notifications_are_disjoint_by_shape() {
        let channel: ChannelId = "iframe_x".parse().unwrap();
        let expected = message_id("message_a");
        let response = json!({ "result": true, "messageId": "message_a", "payload": null });
        let notification = json!({ "handshakeId": "iframe_x", "event": "close" });

        assert!(parse_notification(&response, &channel).is_none());
        assert!(parse_response(&notification, &expected).is_none());
    }

    #[test]
    fn remote_error_message_text() {
        assert_eq!(RemoteError::new(json!("session expired")).message(), "session expired");
        assert_eq!(
            RemoteError::new(json!({ "message": "bad token", "code": 4 })).message(),
            "bad token"
        );
        assert_eq!(RemoteError::new(json!({ "code": 4 })).message(), "{\"code\":4}");
        assert_eq!(RemoteError::new(Value::Null).message(), "");
        assert_eq!(RemoteError::new(json!(42)).to_string(), "42");
    }

    #[test]
    fn truthiness_follows_javascript() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!([])));
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(0.0)));
    }
}
