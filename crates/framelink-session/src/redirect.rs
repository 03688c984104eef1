use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::checkout::Checkout;
use crate::error::Result;
use crate::options::{CheckoutOptions, Ui};
use crate::token::TokenSlot;

/// Performs full-page navigation.
pub trait Navigator: Send + Sync {
    fn assign(&self, address: &str);
}

/// Checkout by navigating the whole page to the checkout address.
///
/// Navigates at construction when a token is given. To defer navigation,
/// construct without a token and pass it to [`Checkout::initialize`], which
/// only resolves the address.
pub struct RedirectCheckout {
    options: CheckoutOptions,
    token: TokenSlot,
    navigator: Arc<dyn Navigator>,
}

impl RedirectCheckout {
    pub fn new(
        token: Option<String>,
        options: CheckoutOptions,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let checkout = Self {
            options: options.with_default_ui(Ui::Fullscreen),
            token: TokenSlot::new(token),
            navigator,
        };
        if checkout.token.get().is_some() {
            checkout.redirect();
        }
        checkout
    }

    /// Navigate to the current checkout address.
    pub fn redirect(&self) {
        let address = self.checkout_address();
        debug!(%address, "redirecting to checkout");
        self.navigator.assign(&address);
    }
}

#[async_trait]
impl Checkout for RedirectCheckout {
    fn options(&self) -> &CheckoutOptions {
        &self.options
    }

    fn session_token(&self) -> Option<String> {
        self.token.get()
    }

    async fn initialize(&self, token: Option<&str>) -> Result<String> {
        self.token.resolve(token)?;
        Ok(self.checkout_address())
    }
}

impl fmt::Debug for RedirectCheckout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectCheckout")
            .field("options", &self.options)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}
