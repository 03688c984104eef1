//! Checkout sessions on top of a framelink channel.
//!
//! [`RedirectCheckout`] navigates the page to the checkout address.
//! [`InlineCheckout`] and [`ModalCheckout`] embed the checkout in a frame
//! through a shared [`IframeSession`], which loads the session over a
//! [`framelink_channel::MessageChannel`] and republishes its notifications.
//! All of them implement [`Checkout`].

pub mod address;
pub mod checkout;
pub mod error;
pub mod iframe;
pub mod inline;
pub mod modal;
pub mod options;
pub mod redirect;
pub mod token;

pub use address::checkout_address;
pub use checkout::Checkout;
pub use error::{Result, SessionError};
pub use iframe::IframeSession;
pub use inline::InlineCheckout;
pub use modal::{ModalCheckout, ModalPresenter, OVERLAY_ID_PREFIX};
pub use options::{
    CheckoutOptions, PublicOptions, RoutingOptions, Ui, DEFAULT_ENDPOINT, DEFAULT_LANGUAGE,
};
pub use redirect::{Navigator, RedirectCheckout};
pub use token::TokenSlot;
