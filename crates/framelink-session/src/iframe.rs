//! The frame-backed session shared by the inline and modal variants.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use framelink_channel::{
    ChannelConfig, ChannelError, ChannelState, MessageChannel, NotificationHandler,
    WildcardNotificationHandler,
};
use framelink_emitter::{wildcard_handler, EventEmitter, HandlerMap};
use framelink_protocol::{Action, CheckoutEvent};
use framelink_transport::{ContentFrame, MessageTransport, MountPoint};
use serde_json::Value;
use tracing::debug;

use crate::checkout::Checkout;
use crate::error::{Result, SessionError};
use crate::options::CheckoutOptions;
use crate::token::TokenSlot;

/// A checkout session running inside an embedded frame.
///
/// The channel is opened on first use, against the checkout address computed
/// at that moment, and needs a mount point by then. Every notification the
/// channel proxies is re-emitted through the session's own subscriptions.
pub struct IframeSession {
    options: CheckoutOptions,
    token: TokenSlot,
    transport: Arc<dyn MessageTransport>,
    channel_config: ChannelConfig,
    container: Mutex<Option<Arc<dyn MountPoint>>>,
    channel: Mutex<Option<MessageChannel>>,
    emitter: Arc<EventEmitter<CheckoutEvent, Value>>,
    destroyed: AtomicBool,
}

impl IframeSession {
    pub fn new(
        token: Option<String>,
        options: CheckoutOptions,
        transport: Arc<dyn MessageTransport>,
    ) -> Self {
        Self {
            options,
            token: TokenSlot::new(token),
            transport,
            channel_config: ChannelConfig::default(),
            container: Mutex::new(None),
            channel: Mutex::new(None),
            emitter: Arc::new(EventEmitter::new()),
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn with_channel_config(mut self, config: ChannelConfig) -> Self {
        self.channel_config = config;
        self
    }

    /// Subscribe `handlers` up front.
    pub fn with_handlers(self, handlers: HandlerMap<CheckoutEvent, Value>) -> Self {
        self.emitter.extend(handlers);
        self
    }

    pub(crate) fn apply_default_ui(mut self, ui: crate::options::Ui) -> Self {
        self.options = self.options.with_default_ui(ui);
        self
    }

    /// Supply the mount point the frame is attached to.
    ///
    /// Has no effect on a channel that is already open.
    pub fn set_container(&self, container: Arc<dyn MountPoint>) {
        *lock(&self.container) = Some(container);
    }

    pub fn has_container(&self) -> bool {
        lock(&self.container).is_some()
    }

    /// The channel to the frame, opening it if needed.
    pub fn channel(&self) -> Result<MessageChannel> {
        self.ensure_live()?;
        let mut slot = lock(&self.channel);
        if let Some(channel) = slot.as_ref() {
            return Ok(channel.clone());
        }

        let container = lock(&self.container)
            .clone()
            .ok_or(SessionError::ContainerNotSpecified)?;
        let address = self.checkout_address();
        let channel =
            MessageChannel::with_config(address, container, Arc::clone(&self.transport), self.channel_config)?;

        let emitter = Arc::clone(&self.emitter);
        channel.subscribe_all(wildcard_handler(move |kind: &CheckoutEvent, payload: &Value| {
            emitter.emit(kind, payload);
        }));

        debug!(channel = %channel.id(), "checkout channel opened");
        *slot = Some(channel.clone());
        Ok(channel)
    }

    /// State of the channel, if one has been opened.
    pub fn channel_state(&self) -> Option<ChannelState> {
        lock(&self.channel).as_ref().map(MessageChannel::state)
    }

    /// Resolve to the frame once it is ready.
    pub async fn frame(&self) -> Result<Arc<dyn ContentFrame>> {
        let channel = self.channel()?;
        Ok(channel.element().await?)
    }

    /// Send any action to the frame.
    pub async fn request(&self, action: impl Into<Action>, payload: Option<Value>) -> Result<Value> {
        let channel = self.channel()?;
        Ok(channel.request(action, payload).await?)
    }

    /// Tell the frame a `close` or `cancel` was handled, so it does not
    /// navigate the page.
    pub async fn acknowledge_close_request(&self) -> Result<Value> {
        self.request(Action::AcknowledgeCloseRequest, None).await
    }

    pub fn subscribe(&self, kind: CheckoutEvent, handler: NotificationHandler) -> Result<()> {
        self.ensure_live()?;
        self.emitter.subscribe(kind, handler);
        Ok(())
    }

    pub fn subscribe_all(&self, handler: WildcardNotificationHandler) -> Result<()> {
        self.ensure_live()?;
        self.emitter.subscribe_all(handler);
        Ok(())
    }

    pub fn unsubscribe(&self, kind: &CheckoutEvent, handler: &NotificationHandler) -> Result<bool> {
        self.ensure_live()?;
        Ok(self.emitter.unsubscribe(kind, handler))
    }

    pub fn unsubscribe_all(&self, handler: &WildcardNotificationHandler) -> Result<bool> {
        self.ensure_live()?;
        Ok(self.emitter.unsubscribe_all(handler))
    }

    /// Deliver a notification to this session's subscribers.
    pub fn emit(&self, kind: &CheckoutEvent, payload: &Value) -> Result<usize> {
        self.ensure_live()?;
        Ok(self.emitter.emit(kind, payload))
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Destroy the channel and drop every subscription.
    ///
    /// Subscription calls fail with [`SessionError::Destroyed`] afterwards.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(channel) = lock(&self.channel).as_ref() {
            channel.destroy();
        }
        self.emitter.clear();
        debug!("checkout session destroyed");
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(SessionError::Destroyed);
        }
        Ok(())
    }
}

#[async_trait]
impl Checkout for IframeSession {
    fn options(&self) -> &CheckoutOptions {
        &self.options
    }

    fn session_token(&self) -> Option<String> {
        self.token.get()
    }

    /// Ask the frame to load the session. Resolves to the frame's string
    /// answer, or to the token when the answer is not a string.
    async fn initialize(&self, token: Option<&str>) -> Result<String> {
        let token = self.token.resolve(token)?;
        let channel = self.channel()?;

        match channel
            .request(Action::LoadSession, Some(Value::String(token.clone())))
            .await
        {
            Ok(Value::String(answer)) => Ok(answer),
            Ok(_) => Ok(token),
            Err(ChannelError::HandshakeFailed(reason)) => Err(SessionError::Handshake(reason)),
            Err(ChannelError::Destroyed) => Err(SessionError::Destroyed),
            Err(ChannelError::Rejected(remote)) => Err(SessionError::LoadSession(remote.message())),
            Err(other) => Err(SessionError::LoadSession(other.to_string())),
        }
    }
}

impl fmt::Debug for IframeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IframeSession")
            .field("options", &self.options)
            .field("token", &self.token)
            .field("channel", &*lock(&self.channel))
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
