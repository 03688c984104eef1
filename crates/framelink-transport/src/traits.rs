use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::Result;

/// A single delivery on the page-wide broadcast transport.
///
/// `origin` is the origin the sending context declared for itself. It is the
/// only trust signal available to a receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub origin: String,
    pub data: Value,
}

impl MessageEvent {
    pub fn new(origin: impl Into<String>, data: Value) -> Self {
        Self {
            origin: origin.into(),
            data,
        }
    }
}

/// Callback invoked for every broadcast delivery.
pub type MessageListener = Arc<dyn Fn(&MessageEvent) + Send + Sync>;

/// Handle returned by [`MessageTransport::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// The page-wide broadcast transport.
///
/// Every listener receives every message, regardless of who sent it or who it
/// was meant for. Filtering is the listener's job.
///
/// Implementations must tolerate listeners being added or removed (including
/// a listener removing itself) while a delivery is in progress.
pub trait MessageTransport: Send + Sync {
    /// Register a listener for all subsequent deliveries.
    fn add_listener(&self, listener: MessageListener) -> ListenerId;

    /// Remove a listener. Returns `false` if it was not registered.
    fn remove_listener(&self, id: ListenerId) -> bool;
}

/// An embedded content frame owned by the host page.
pub trait ContentFrame: Send + Sync + fmt::Debug {
    /// Element id assigned at creation.
    fn id(&self) -> &str;

    /// The address the frame was pointed at.
    fn source(&self) -> &str;

    /// Post a message into the frame's content window, scoped to `target_origin`.
    ///
    /// A content window whose origin does not match `target_origin` never sees
    /// the message. This is not reported as an error.
    fn post_message(&self, data: Value, target_origin: &str) -> Result<()>;

    /// Whether the frame is still attached to its mount point.
    fn is_attached(&self) -> bool;

    /// Detach the frame from its mount point.
    ///
    /// Returns `false` when it was already detached. Never fails.
    fn detach(&self) -> bool;
}

/// Load lifecycle signals raised by an attached frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameLoadEvent {
    /// The frame document finished loading. May fire again on internal navigation.
    Loaded,
    /// The frame document failed to load.
    Failed(String),
}

/// Attributes a frame is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSpec {
    pub id: String,
    pub name: String,
    pub source: String,
    pub attributes: Vec<(String, String)>,
}

impl FrameSpec {
    /// Create a spec with the standard checkout frame attributes.
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            source: source.into(),
            attributes: vec![
                ("frameborder".to_string(), "0".to_string()),
                ("allowtransparency".to_string(), "true".to_string()),
                ("style".to_string(), "width:100%; height:100%;".to_string()),
                ("allow".to_string(), "payment 'src'".to_string()),
            ],
        }
    }

    /// Look up an attribute value by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A freshly attached frame and its load signal stream.
pub struct AttachedFrame {
    pub frame: Arc<dyn ContentFrame>,
    pub load_events: mpsc::UnboundedReceiver<FrameLoadEvent>,
}

impl fmt::Debug for AttachedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachedFrame")
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

/// A host-page element frames can be attached to.
pub trait MountPoint: Send + Sync {
    /// Create a frame from `spec`, attach it and start loading its source.
    fn attach_frame(&self, spec: FrameSpec) -> Result<AttachedFrame>;
}
