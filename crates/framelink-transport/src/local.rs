//! In-memory host page.
//!
//! [`LocalWindow`] is a broadcast transport where every listener sees every
//! delivery, like a browser window's `message` event. [`LocalContainer`]
//! attaches [`LocalFrame`]s whose documents are [`FrameScript`]s that can post
//! back to the page through their [`ParentWindow`].
//!
//! Deliveries are synchronous: `post_message` runs the frame script inline and
//! the script's replies reach page listeners before `post_message` returns.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::origin::get_origin;
use crate::traits::{
    AttachedFrame, ContentFrame, FrameLoadEvent, FrameSpec, ListenerId, MessageEvent,
    MessageListener, MessageTransport, MountPoint,
};

/// Target origin wildcard accepted by [`ContentFrame::post_message`].
pub const ANY_ORIGIN: &str = "*";

/// In-memory page-wide broadcast transport.
#[derive(Default)]
pub struct LocalWindow {
    listeners: Mutex<Vec<(ListenerId, MessageListener)>>,
    next_id: AtomicU64,
}

impl LocalWindow {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Deliver an event to every listener registered at the time of the call.
    ///
    /// Returns the number of listeners invoked.
    pub fn dispatch(&self, event: &MessageEvent) -> usize {
        let snapshot: Vec<MessageListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        trace!(origin = %event.origin, listeners = snapshot.len(), "dispatching message event");
        for listener in &snapshot {
            listener(event);
        }
        snapshot.len()
    }

    /// Convenience for `dispatch(&MessageEvent::new(origin, data))`.
    pub fn post(&self, origin: &str, data: Value) -> usize {
        self.dispatch(&MessageEvent::new(origin, data))
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl MessageTransport for LocalWindow {
    fn add_listener(&self, listener: MessageListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        match listeners.iter().position(|(existing, _)| *existing == id) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for LocalWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalWindow")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// The document running inside a simulated frame.
pub trait FrameScript: Send + Sync {
    /// Called for every message the page posts into the frame.
    fn on_message(&self, data: &Value, parent: &ParentWindow);
}

/// A frame document's view of the page that embeds it.
#[derive(Clone)]
pub struct ParentWindow {
    window: Arc<LocalWindow>,
    origin: String,
}

impl ParentWindow {
    /// The origin the frame document runs at.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Broadcast `data` to the page, declaring the frame's origin.
    pub fn post_message(&self, data: Value) -> usize {
        self.window.post(&self.origin, data)
    }
}

impl fmt::Debug for ParentWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParentWindow")
            .field("origin", &self.origin)
            .finish()
    }
}

/// How a [`LocalContainer`] drives the load lifecycle of frames it attaches.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadBehavior {
    /// Signal a successful load immediately after attaching.
    #[default]
    Load,
    /// Signal a load failure immediately after attaching.
    Fail(String),
    /// Signal nothing; drive the lifecycle through [`LocalFrame::load`].
    Manual,
}

/// In-memory mount point.
pub struct LocalContainer {
    window: Arc<LocalWindow>,
    script: Arc<dyn FrameScript>,
    load: LoadBehavior,
    frame_origin: Option<String>,
    frames: Mutex<Vec<Arc<LocalFrame>>>,
}

impl LocalContainer {
    pub fn new(window: Arc<LocalWindow>, script: Arc<dyn FrameScript>) -> Self {
        Self {
            window,
            script,
            load: LoadBehavior::default(),
            frame_origin: None,
            frames: Mutex::new(Vec::new()),
        }
    }

    /// Override the load lifecycle of attached frames.
    pub fn with_load_behavior(mut self, load: LoadBehavior) -> Self {
        self.load = load;
        self
    }

    /// Run frame documents at `origin` instead of the origin of their source.
    pub fn with_frame_origin(mut self, origin: impl Into<String>) -> Self {
        self.frame_origin = Some(origin.into());
        self
    }

    /// Every frame attached so far, attached or not.
    pub fn frames(&self) -> Vec<Arc<LocalFrame>> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recently attached frame.
    pub fn last_frame(&self) -> Option<Arc<LocalFrame>> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Number of frames currently attached.
    pub fn attached_count(&self) -> usize {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|frame| frame.is_attached())
            .count()
    }
}

impl MountPoint for LocalContainer {
    fn attach_frame(&self, spec: FrameSpec) -> Result<AttachedFrame> {
        let origin = match &self.frame_origin {
            Some(origin) => origin.clone(),
            None => get_origin(&spec.source).map_err(|err| TransportError::Mount {
                id: spec.id.clone(),
                reason: err.to_string(),
            })?,
        };

        let (load_tx, load_events) = mpsc::unbounded_channel();
        let frame = Arc::new(LocalFrame {
            parent: ParentWindow {
                window: Arc::clone(&self.window),
                origin: origin.clone(),
            },
            spec,
            origin,
            attached: AtomicBool::new(true),
            script: Arc::clone(&self.script),
            load_tx,
        });

        debug!(id = %frame.spec.id, origin = %frame.origin, "attached local frame");

        match &self.load {
            LoadBehavior::Load => {
                frame.load();
            }
            LoadBehavior::Fail(reason) => {
                frame.fail_load(reason);
            }
            LoadBehavior::Manual => {}
        }

        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&frame));

        Ok(AttachedFrame {
            frame,
            load_events,
        })
    }
}

/// In-memory content frame.
pub struct LocalFrame {
    spec: FrameSpec,
    origin: String,
    attached: AtomicBool,
    script: Arc<dyn FrameScript>,
    parent: ParentWindow,
    load_tx: mpsc::UnboundedSender<FrameLoadEvent>,
}

impl LocalFrame {
    /// The spec the frame was created from.
    pub fn spec(&self) -> &FrameSpec {
        &self.spec
    }

    /// The origin the frame document runs at.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The frame document's handle to the embedding page.
    pub fn parent(&self) -> &ParentWindow {
        &self.parent
    }

    /// Signal a completed load. Fires again on every call, like a reload.
    ///
    /// Returns `false` when nobody is observing the load lifecycle anymore.
    pub fn load(&self) -> bool {
        self.load_tx.send(FrameLoadEvent::Loaded).is_ok()
    }

    /// Signal a failed load.
    pub fn fail_load(&self, reason: &str) -> bool {
        self.load_tx
            .send(FrameLoadEvent::Failed(reason.to_string()))
            .is_ok()
    }
}

impl ContentFrame for LocalFrame {
    fn id(&self) -> &str {
        &self.spec.id
    }

    fn source(&self) -> &str {
        &self.spec.source
    }

    fn post_message(&self, data: Value, target_origin: &str) -> Result<()> {
        if !self.is_attached() {
            return Err(TransportError::Detached(self.spec.id.clone()));
        }

        if target_origin != ANY_ORIGIN && target_origin != self.origin {
            trace!(
                id = %self.spec.id,
                target_origin,
                origin = %self.origin,
                "target origin mismatch; message not delivered"
            );
            return Ok(());
        }

        self.script.on_message(&data, &self.parent);
        Ok(())
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    fn detach(&self) -> bool {
        let was_attached = self.attached.swap(false, Ordering::AcqRel);
        if was_attached {
            debug!(id = %self.spec.id, "detached local frame");
        }
        was_attached
    }
}

impl fmt::Debug for LocalFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFrame")
            .field("id", &self.spec.id)
            .field("source", &self.spec.source)
            .field("origin", &self.origin)
            .field("attached", &self.is_attached())
            .finish()
    }
}
