use std::sync::Arc;

use async_trait::async_trait;
use framelink_transport::{ContentFrame, MountPoint};

use crate::checkout::Checkout;
use crate::error::Result;
use crate::iframe::IframeSession;
use crate::options::{CheckoutOptions, Ui};

/// Checkout embedded in a caller-supplied container.
#[derive(Debug)]
pub struct InlineCheckout {
    session: IframeSession,
}

impl InlineCheckout {
    /// An unmounted checkout. Call [`mount`](Self::mount) before using the frame.
    pub fn new(session: IframeSession) -> Self {
        Self {
            session: session.apply_default_ui(Ui::Inline),
        }
    }

    /// A checkout mounted on `container`, with its channel opened immediately.
    pub fn with_container(session: IframeSession, container: Arc<dyn MountPoint>) -> Result<Self> {
        let checkout = Self::new(session);
        checkout.session.set_container(container);
        checkout.session.channel()?;
        Ok(checkout)
    }

    /// Mount on `container` and resolve to the ready frame.
    pub async fn mount(&self, container: Arc<dyn MountPoint>) -> Result<Arc<dyn ContentFrame>> {
        self.session.set_container(container);
        self.session.frame().await
    }

    pub fn session(&self) -> &IframeSession {
        &self.session
    }

    pub async fn frame(&self) -> Result<Arc<dyn ContentFrame>> {
        self.session.frame().await
    }

    pub fn destroy(&self) {
        self.session.destroy();
    }
}

#[async_trait]
impl Checkout for InlineCheckout {
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
