use async_trait::async_trait;

use crate::address::checkout_address;
use crate::error::Result;
use crate::options::CheckoutOptions;

/// What every checkout variant can do.
#[async_trait]
pub trait Checkout: Send + Sync {
    /// Options with the variant's `ui` default applied.
    fn options(&self) -> &CheckoutOptions;

    /// The session token currently held.
    fn session_token(&self) -> Option<String>;

    /// The address the checkout loads from, given the current token.
    fn checkout_address(&self) -> String {
        checkout_address(self.options(), self.session_token().as_deref())
    }

    /// Start the session identified by `token`, or by the token already held.
    async fn initialize(&self, token: Option<&str>) -> Result<String>;
}
