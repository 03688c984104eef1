use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use framelink_emitter::{EventEmitter, HandlerMap};
use framelink_protocol::{
    parse_notification, parse_response, Action, ChannelId, CheckoutEvent, MessageId,
    RequestMessage, ResponseMessage,
};
use framelink_transport::{
    get_origin, ContentFrame, ListenerId, MessageEvent, MessageListener, MessageTransport,
    MountPoint,
};
use serde_json::Value;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::config::ChannelConfig;
use crate::error::{ChannelError, Result};
use crate::handshake;
use crate::state::ChannelState;
use crate::{NotificationHandler, WildcardNotificationHandler};

/// Shared outcome of frame creation; `None` until it settles.
type Readiness = Option<Result<Arc<dyn ContentFrame>>>;

struct PendingRequest {
    listener: ListenerId,
    responder: oneshot::Sender<ResponseMessage>,
}

pub(crate) struct Inner {
    pub(crate) id: ChannelId,
    pub(crate) source: String,
    pub(crate) target_origin: String,
    pub(crate) transport: Arc<dyn MessageTransport>,
    pub(crate) mount: Arc<dyn MountPoint>,
    pub(crate) config: ChannelConfig,
    pub(crate) emitter: EventEmitter<CheckoutEvent, Value>,
    pub(crate) frame: Mutex<Option<Arc<dyn ContentFrame>>>,
    pub(crate) rebind_task: Mutex<Option<JoinHandle<()>>>,
    establish_task: Mutex<Option<JoinHandle<()>>>,
    ready: watch::Sender<Readiness>,
    state: Mutex<ChannelState>,
    proxy_listener: Mutex<Option<ListenerId>>,
    pending: Mutex<HashMap<MessageId, PendingRequest>>,
    destroyed: AtomicBool,
}

impl Inner {
    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    pub(crate) fn state(&self) -> ChannelState {
        *lock(&self.state)
    }

    /// Move to `next` unless the channel is already destroyed.
    pub(crate) fn set_state(&self, next: ChannelState) {
        let mut state = lock(&self.state);
        if *state == ChannelState::Destroyed {
            return;
        }
        let previous = *state;
        if previous != next {
            trace!(channel = %self.id, from = %previous, to = %next, "channel state change");
            *state = next;
        }
    }

    /// Start frame creation once, detached from whoever asked for it.
    fn start_establish(self: &Arc<Self>) {
        let mut slot = lock(&self.establish_task);
        if slot.is_some() || self.ready.borrow().is_some() || self.is_destroyed() {
            return;
        }
        let inner = Arc::clone(self);
        *slot = Some(tokio::spawn(async move {
            let outcome = handshake::establish(&inner).await;
            inner.ready.send_replace(Some(outcome));
        }));
    }

    async fn wait_ready(&self) -> Result<Arc<dyn ContentFrame>> {
        let mut ready = self.ready.subscribe();
        let outcome = match ready.wait_for(Option::is_some).await {
            Ok(settled) => (*settled).clone(),
            Err(_) => None,
        };
        outcome.unwrap_or(Err(ChannelError::Destroyed))
    }

    /// Install the page-wide listener that republishes this channel's notifications.
    pub(crate) fn install_proxy(self: &Arc<Self>) {
        let mut slot = lock(&self.proxy_listener);
        if slot.is_some() || self.is_destroyed() {
            return;
        }
        *slot = Some(self.transport.add_listener(self.notification_listener()));
    }

    fn notification_listener(self: &Arc<Self>) -> MessageListener {
        let channel = Arc::downgrade(self);
        Arc::new(move |event: &MessageEvent| {
            let Some(inner) = channel.upgrade() else {
                return;
            };
            if event.origin != inner.target_origin {
                trace!(channel = %inner.id, origin = %event.origin, "dropping message from foreign origin");
                return;
            }
            let Some(notification) = parse_notification(&event.data, &inner.id) else {
                return;
            };
            debug!(channel = %inner.id, event = %notification.event, "proxying notification");
            inner.emitter.emit(&notification.event, &notification.payload);
        })
    }

    fn response_listener(self: &Arc<Self>, message_id: MessageId) -> MessageListener {
        let channel = Arc::downgrade(self);
        Arc::new(move |event: &MessageEvent| {
            let Some(inner) = channel.upgrade() else {
                return;
            };
            if event.origin != inner.target_origin {
                return;
            }
            if let Some(response) = parse_response(&event.data, &message_id) {
                inner.settle(response);
            }
        })
    }

    /// Post one request to `frame` and wait for its correlated response.
    ///
    /// Takes the frame explicitly so the handshake can run before the channel
    /// is ready.
    pub(crate) async fn send_request(
        self: &Arc<Self>,
        frame: &Arc<dyn ContentFrame>,
        action: Action,
        payload: Option<Value>,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let message_id = MessageId::generate();
        let message = RequestMessage::new(action.clone(), payload, message_id.clone()).to_value()?;
        let (responder, response) = oneshot::channel();

        let listener = self
            .transport
            .add_listener(self.response_listener(message_id.clone()));
        {
            let mut pending = lock(&self.pending);
            if self.is_destroyed() {
                drop(pending);
                self.transport.remove_listener(listener);
                return Err(ChannelError::Destroyed);
            }
            pending.insert(
                message_id.clone(),
                PendingRequest {
                    listener,
                    responder,
                },
            );
        }
        let _guard = PendingGuard {
            channel: Arc::downgrade(self),
            message_id: message_id.clone(),
        };

        trace!(channel = %self.id, %action, message_id = %message_id, "posting request");
        frame.post_message(message, &self.target_origin)?;

        let outcome = match timeout {
            Some(limit) => tokio::time::timeout(limit, response)
                .await
                .map_err(|_| ChannelError::Timeout(limit))?,
            None => response.await,
        };

        match outcome {
            Ok(response) => response.into_result().map_err(ChannelError::Rejected),
            Err(_) => Err(ChannelError::Destroyed),
        }
    }

    fn settle(&self, response: ResponseMessage) {
        let entry = lock(&self.pending).remove(&response.message_id);
        let Some(entry) = entry else {
            trace!(channel = %self.id, message_id = %response.message_id, "ignoring response for settled request");
            return;
        };
        self.transport.remove_listener(entry.listener);
        if entry.responder.send(response).is_err() {
            trace!(channel = %self.id, "requester went away before its response arrived");
        }
    }

    fn forget(&self, message_id: &MessageId) {
        let entry = lock(&self.pending).remove(message_id);
        if let Some(entry) = entry {
            self.transport.remove_listener(entry.listener);
        }
    }

    fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    fn release_listeners(&self) {
        if let Some(listener) = lock(&self.proxy_listener).take() {
            self.transport.remove_listener(listener);
        }
        let drained: Vec<PendingRequest> = lock(&self.pending).drain().map(|(_, entry)| entry).collect();
        for entry in drained {
            self.transport.remove_listener(entry.listener);
        }
        if let Some(task) = lock(&self.rebind_task).take() {
            task.abort();
        }
        if let Some(task) = lock(&self.establish_task).take() {
            task.abort();
        }
    }

    fn destroy(&self) {
        let first = !self.destroyed.swap(true, Ordering::AcqRel);
        self.release_listeners();
        self.ready.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(Err(ChannelError::Destroyed));
            true
        });
        self.emitter.clear();
        if let Some(frame) = lock(&self.frame).take() {
            frame.detach();
        }
        *lock(&self.state) = ChannelState::Destroyed;
        if first {
            debug!(channel = %self.id, "channel destroyed");
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.release_listeners();
    }
}

/// Removes a pending request whose caller stopped waiting.
struct PendingGuard {
    channel: Weak<Inner>,
    message_id: MessageId,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.channel.upgrade() {
            inner.forget(&self.message_id);
        }
    }
}

/// A request/response and notification channel to one embedded frame.
///
/// The frame is created lazily on the first [`element`](Self::element) or
/// [`request`](Self::request) call and the outcome of creation is shared by
/// every caller. Clones share the same channel.
#[derive(Clone)]
pub struct MessageChannel {
    inner: Arc<Inner>,
}

impl MessageChannel {
    /// Create a channel to a frame at `source`, mounted on `mount`.
    ///
    /// Fails when no origin can be derived from `source`.
    pub fn new(
        source: impl Into<String>,
        mount: Arc<dyn MountPoint>,
        transport: Arc<dyn MessageTransport>,
    ) -> Result<Self> {
        Self::with_config(source, mount, transport, ChannelConfig::default())
    }

    /// Create a channel with custom timeouts.
    pub fn with_config(
        source: impl Into<String>,
        mount: Arc<dyn MountPoint>,
        transport: Arc<dyn MessageTransport>,
        config: ChannelConfig,
    ) -> Result<Self> {
        let source = source.into();
        let target_origin = get_origin(&source)?;
        let id = ChannelId::generate();
        debug!(channel = %id, %target_origin, "message channel created");

        Ok(Self {
            inner: Arc::new(Inner {
                id,
                source,
                target_origin,
                transport,
                mount,
                config,
                emitter: EventEmitter::new(),
                frame: Mutex::new(None),
                rebind_task: Mutex::new(None),
                establish_task: Mutex::new(None),
                ready: watch::channel(None).0,
                state: Mutex::new(ChannelState::Uncreated),
                proxy_listener: Mutex::new(None),
                pending: Mutex::new(HashMap::new()),
                destroyed: AtomicBool::new(false),
            }),
        })
    }

    /// Register handlers before the frame exists.
    pub fn with_handlers(self, handlers: HandlerMap<CheckoutEvent, Value>) -> Self {
        self.inner.emitter.extend(handlers);
        self
    }

    /// Identity carried by every notification addressed to this channel.
    pub fn id(&self) -> &ChannelId {
        &self.inner.id
    }

    pub fn source(&self) -> &str {
        &self.inner.source
    }

    /// The only origin inbound messages are accepted from.
    pub fn target_origin(&self) -> &str {
        &self.inner.target_origin
    }

    pub fn config(&self) -> ChannelConfig {
        self.inner.config
    }

    pub fn state(&self) -> ChannelState {
        self.inner.state()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed()
    }

    /// Requests still waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.inner.pending_count()
    }

    /// The frame, if it has been attached and not torn down.
    pub fn frame(&self) -> Option<Arc<dyn ContentFrame>> {
        lock(&self.inner.frame).clone()
    }

    /// Resolve to the frame once it has loaded and completed the handshake.
    ///
    /// The first call starts creating the frame in a background task. Later
    /// calls, concurrent or not, see the same outcome; a failure is never
    /// retried. Dropping the returned future does not cancel creation.
    pub async fn element(&self) -> Result<Arc<dyn ContentFrame>> {
        if self.inner.is_destroyed() {
            return Err(ChannelError::Destroyed);
        }
        self.inner.start_establish();
        let outcome = self.inner.wait_ready().await;
        if self.inner.is_destroyed() {
            return Err(ChannelError::Destroyed);
        }
        outcome
    }

    /// Send `action` to the frame and resolve with the response payload.
    ///
    /// Rejects with [`ChannelError::Rejected`] when the frame answers with a
    /// falsy `result`. Dropping the returned future abandons the request.
    pub async fn request(&self, action: impl Into<Action>, payload: Option<Value>) -> Result<Value> {
        let frame = self.element().await?;
        self.inner
            .send_request(&frame, action.into(), payload, self.inner.config.request_timeout)
            .await
    }

    pub fn subscribe(&self, kind: CheckoutEvent, handler: NotificationHandler) {
        self.inner.emitter.subscribe(kind, handler);
    }

    /// Subscribe to every notification kind.
    pub fn subscribe_all(&self, handler: WildcardNotificationHandler) {
        self.inner.emitter.subscribe_all(handler);
    }

    pub fn unsubscribe(&self, kind: &CheckoutEvent, handler: &NotificationHandler) -> bool {
        self.inner.emitter.unsubscribe(kind, handler)
    }

    pub fn unsubscribe_all(&self, handler: &WildcardNotificationHandler) -> bool {
        self.inner.emitter.unsubscribe_all(handler)
    }

    /// Tear the channel down.
    ///
    /// Removes every listener, fails outstanding requests with
    /// [`ChannelError::Destroyed`], drops all subscriptions and detaches the
    /// frame. Calling it again has no further effect.
    pub fn destroy(&self) {
        self.inner.destroy();
    }
}

impl fmt::Debug for MessageChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageChannel")
            .field("id", &self.inner.id)
            .field("source", &self.inner.source)
            .field("target_origin", &self.inner.target_origin)
            .field("state", &self.inner.state())
            .field("settled", &self.inner.state().is_settled())
            .field("pending", &self.inner.pending_count())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
