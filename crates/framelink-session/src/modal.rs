use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use framelink_emitter::handler;
use framelink_protocol::CheckoutEvent;
use framelink_transport::{ContentFrame, MountPoint};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::checkout::Checkout;
use crate::error::Result;
use crate::iframe::IframeSession;
use crate::options::{CheckoutOptions, Ui};

/// Element id prefix of the modal overlay.
pub const OVERLAY_ID_PREFIX: &str = "bc-overlay-container-";

/// Owns the overlay a modal checkout is shown in.
pub trait ModalPresenter: Send + Sync {
    /// Create the hidden overlay and return the mount point inside it.
    fn create_container(&self, overlay_id: &str) -> Arc<dyn MountPoint>;

    fn show(&self);

    fn hide(&self);

    /// Remove the overlay from the page.
    fn remove(&self);
}

struct Overlay {
    id: String,
    active: AtomicBool,
    removed: AtomicBool,
    presenter: Arc<dyn ModalPresenter>,
}

impl Overlay {
    fn hide(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            debug!(overlay = %self.id, "hiding checkout overlay");
            self.presenter.hide();
        }
    }
}

/// Clears `active` unless disarmed, so a failed or cancelled `show` can be retried.
struct PendingShow<'a>(Option<&'a AtomicBool>);

impl Drop for PendingShow<'_> {
    fn drop(&mut self) {
        if let Some(active) = self.0 {
            active.store(false, Ordering::Release);
        }
    }
}

/// Checkout in an overlay that is shown and hidden on demand.
///
/// The overlay hides itself when the frame sends `cancel` or `close`.
pub struct ModalCheckout {
    session: IframeSession,
    overlay: Arc<Overlay>,
}

impl ModalCheckout {
    /// Create the overlay, mount the frame in it and open the channel.
    pub fn new(session: IframeSession, presenter: Arc<dyn ModalPresenter>) -> Result<Self> {
        let session = session.apply_default_ui(Ui::Modal);
        let id = format!("{OVERLAY_ID_PREFIX}{}", Uuid::new_v4().simple());
        let overlay = Arc::new(Overlay {
            id,
            active: AtomicBool::new(false),
            removed: AtomicBool::new(false),
            presenter,
        });

        session.set_container(overlay.presenter.create_container(&overlay.id));
        session.channel()?;

        for kind in [CheckoutEvent::Cancel, CheckoutEvent::Close] {
            let overlay = Arc::clone(&overlay);
            session.subscribe(kind, handler(move |_: &Value| overlay.hide()))?;
        }

        Ok(Self { session, overlay })
    }

    pub fn overlay_id(&self) -> &str {
        &self.overlay.id
    }

    /// Whether the overlay is shown.
    pub fn is_active(&self) -> bool {
        self.overlay.active.load(Ordering::Acquire)
    }

    /// Show the overlay once the frame is ready. No-op when already shown.
    pub async fn show(&self) -> Result<()> {
        if self.overlay.active.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut pending = PendingShow(Some(&self.overlay.active));
        self.session.frame().await?;
        pending.0 = None;
        debug!(overlay = %self.overlay.id, "showing checkout overlay");
        self.overlay.presenter.show();
        Ok(())
    }

    /// Hide the overlay. No-op when not shown.
    pub fn hide(&self) {
        self.overlay.hide();
    }

    pub fn session(&self) -> &IframeSession {
        &self.session
    }

    pub async fn frame(&self) -> Result<Arc<dyn ContentFrame>> {
        self.session.frame().await
    }

    /// Destroy the session and remove the overlay.
    pub fn destroy(&self) {
        self.session.destroy();
        self.overlay.active.store(false, Ordering::Release);
        if !self.overlay.removed.swap(true, Ordering::AcqRel) {
            self.overlay.presenter.remove();
        }
    }
}

#[async_trait]
impl Checkout for ModalCheckout {
    fn options(&self) -> &CheckoutOptions {
        self.session.options()
    }

    fn session_token(&self) -> Option<String> {
        self.session.session_token()
    }

    async fn initialize(&self, token: Option<&str>) -> Result<String> {
        self.session.initialize(token).await
    }
}

impl fmt::Debug for ModalCheckout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalCheckout")
            .field("overlay", &self.overlay.id)
            .field("active", &self.is_active())
            .field("session", &self.session)
            .finish()
    }
}
