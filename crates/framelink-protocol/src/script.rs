//! A scriptable checkout document for simulated frames.
//!
//! [`ScriptedDocument`] plays the far end of the protocol inside a
//! [`framelink_transport::LocalFrame`]: it answers requests per action, tags
//! its notifications with the handshake id it was given, and records what it
//! received.

use std::sync::{Mutex, PoisonError};

use framelink_transport::{FrameScript, ParentWindow};
use serde_json::{json, Value};
use tracing::trace;

use crate::action::Action;
use crate::event::CheckoutEvent;
use crate::id::MessageId;
use crate::message::{RequestMessage, ResponseMessage};

/// How the document answers one action.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Accept, echoing the request payload back.
    Echo,
    /// Accept with a fixed payload.
    Accept(Value),
    /// Reject with a fixed payload.
    Reject(Value),
    /// Hold the request until [`ScriptedDocument::respond`] is called.
    Defer,
    /// Never answer.
    Ignore,
}

#[derive(Debug, Clone)]
struct Rule {
    action: Action,
    reply: Reply,
    notifications: Vec<(CheckoutEvent, Value)>,
}

#[derive(Default)]
struct ScriptState {
    parent: Option<ParentWindow>,
    handshake_id: Option<String>,
    received: Vec<RequestMessage>,
    deferred: Vec<MessageId>,
}

/// Remote checkout document driven by per-action rules.
pub struct ScriptedDocument {
    rules: Vec<Rule>,
    duplicate_replies: bool,
    state: Mutex<ScriptState>,
}

impl ScriptedDocument {
    /// A document that completes the handshake and ignores everything else.
    pub fn new() -> Self {
        Self::silent().on(Action::InitiateHandshake, Reply::Echo)
    }

    /// A document that answers nothing, not even the handshake.
    pub fn silent() -> Self {
        Self {
            rules: Vec::new(),
            duplicate_replies: false,
            state: Mutex::new(ScriptState::default()),
        }
    }

    /// Answer `action` with `reply`. Later rules override earlier ones.
    pub fn on(mut self, action: impl Into<Action>, reply: Reply) -> Self {
        self.rules.push(Rule {
            action: action.into(),
            reply,
            notifications: Vec::new(),
        });
        self
    }

    /// After answering the most recent rule's action, emit a notification.
    pub fn then_notify(mut self, event: CheckoutEvent, payload: Value) -> Self {
        if let Some(rule) = self.rules.last_mut() {
            rule.notifications.push((event, payload));
        }
        self
    }

    /// Post every reply twice.
    pub fn with_duplicate_replies(mut self) -> Self {
        self.duplicate_replies = true;
        self
    }

    /// Every request received so far, in arrival order.
    pub fn received(&self) -> Vec<RequestMessage> {
        self.lock().received.clone()
    }

    /// Actions of every request received so far.
    pub fn received_actions(&self) -> Vec<Action> {
        self.lock()
            .received
            .iter()
            .map(|request| request.action.clone())
            .collect()
    }

    /// The channel identity presented in the last handshake.
    pub fn handshake_id(&self) -> Option<String> {
        self.lock().handshake_id.clone()
    }

    /// Requests held by [`Reply::Defer`] and not yet answered.
    pub fn deferred(&self) -> Vec<MessageId> {
        self.lock().deferred.clone()
    }

    /// Answer a deferred request. Returns `false` if it is not pending.
    pub fn respond(&self, message_id: &MessageId, reply: Reply) -> bool {
        let (parent, request) = {
            let mut state = self.lock();
            let Some(index) = state.deferred.iter().position(|id| id == message_id) else {
                return false;
            };
            state.deferred.remove(index);
            let request = state
                .received
                .iter()
                .find(|request| &request.message_id == message_id)
                .cloned();
            (state.parent.clone(), request)
        };

        match (parent, request) {
            (Some(parent), Some(request)) => {
                self.send_reply(&parent, &request, &reply);
                true
            }
            _ => false,
        }
    }

    /// Emit a notification to the page. Returns `false` before the first request.
    pub fn notify(&self, event: CheckoutEvent, payload: Value) -> bool {
        let (parent, handshake_id) = {
            let state = self.lock();
            (state.parent.clone(), state.handshake_id.clone())
        };
        match parent {
            Some(parent) => {
                post_notification(&parent, handshake_id.as_deref(), &event, &payload);
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rule_for(&self, action: &Action) -> Option<&Rule> {
        self.rules.iter().rev().find(|rule| &rule.action == action)
    }

    fn send_reply(&self, parent: &ParentWindow, request: &RequestMessage, reply: &Reply) {
        let response = match reply {
            Reply::Echo => ResponseMessage::accept(
                request.message_id.clone(),
                request.payload.clone().unwrap_or(Value::Null),
            ),
            Reply::Accept(payload) => {
                ResponseMessage::accept(request.message_id.clone(), payload.clone())
            }
            Reply::Reject(payload) => {
                ResponseMessage::reject(request.message_id.clone(), payload.clone())
            }
            Reply::Defer | Reply::Ignore => return,
        };

        let data = json!({
            "result": response.result,
            "messageId": response.message_id,
            "payload": response.payload,
        });
        parent.post_message(data.clone());
        if self.duplicate_replies {
            parent.post_message(data);
        }
    }
}

impl Default for ScriptedDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScript for ScriptedDocument {
    fn on_message(&self, data: &Value, parent: &ParentWindow) {
        let request: RequestMessage = match serde_json::from_value(data.clone()) {
            Ok(request) => request,
            Err(err) => {
                trace!(error = %err, "ignoring non-request message");
                return;
            }
        };

        let handshake_id = {
            let mut state = self.lock();
            state.parent = Some(parent.clone());
            if request.action == Action::InitiateHandshake {
                state.handshake_id = request
                    .payload
                    .as_ref()
                    .and_then(Value::as_str)
                    .map(str::to_string);
            }
            state.received.push(request.clone());
            state.handshake_id.clone()
        };

        let Some(rule) = self.rule_for(&request.action) else {
            return;
        };

        if rule.reply == Reply::Defer {
            self.lock().deferred.push(request.message_id.clone());
            return;
        }

        self.send_reply(parent, &request, &rule.reply);
        if rule.reply == Reply::Ignore {
            return;
        }
        for (event, payload) in &rule.notifications {
            post_notification(parent, handshake_id.as_deref(), event, payload);
        }
    }
}

fn post_notification(
    parent: &ParentWindow,
    handshake_id: Option<&str>,
    event: &CheckoutEvent,
    payload: &Value,
) {
    parent.post_message(json!({
        "handshakeId": handshake_id,
        "event": event,
        "payload": payload,
    }));
}
