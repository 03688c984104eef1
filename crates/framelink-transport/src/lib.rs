//! Cross-context message transport abstraction.
//!
//! Models the pieces of a host page that framelink talks through:
//! - a page-wide broadcast transport every listener on the page shares
//! - embedded content frames that accept posted messages
//! - mount points that frames are attached to
//!
//! This is the lowest layer of framelink. Everything else builds on top of
//! the [`MessageTransport`], [`ContentFrame`] and [`MountPoint`] traits
//! provided here. The [`local`] module ships an in-memory implementation.

pub mod error;
pub mod local;
pub mod origin;
pub mod traits;

pub use error::{Result, TransportError};
pub use local::{FrameScript, LoadBehavior, LocalContainer, LocalFrame, LocalWindow, ParentWindow};
pub use origin::get_origin;
pub use traits::{
    AttachedFrame, ContentFrame, FrameLoadEvent, FrameSpec, ListenerId, MessageEvent,
    MessageListener, MessageTransport, MountPoint,
};
