//! Embed a modal checkout in an in-memory page and walk through a payment.
//!
//! Run with `cargo run -p framelink --example simulated-checkout`.

use std::sync::Arc;

use framelink::emitter::{handler, wildcard_handler};
use framelink::protocol::{Action, CheckoutEvent, Reply, ScriptedDocument};
use framelink::session::{
    Checkout, CheckoutOptions, IframeSession, ModalCheckout, ModalPresenter,
};
use framelink::transport::{LocalContainer, LocalWindow, MountPoint};
use serde_json::{json, Value};

struct ConsoleOverlay {
    window: Arc<LocalWindow>,
    document: Arc<ScriptedDocument>,
}

impl ModalPresenter for ConsoleOverlay {
    fn create_container(&self, overlay_id: &str) -> Arc<dyn MountPoint> {
        println!("overlay {overlay_id} created");
        Arc::new(LocalContainer::new(
            Arc::clone(&self.window),
            self.document.clone(),
        ))
    }

    fn show(&self) {
        println!("overlay shown");
    }

    fn hide(&self) {
        println!("overlay hidden");
    }

    fn remove(&self) {
        println!("overlay removed");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let window = LocalWindow::new();
    let document = Arc::new(
        ScriptedDocument::new()
            .on(Action::LoadSession, Reply::Accept(json!("session-loaded")))
            .then_notify(CheckoutEvent::CardTypeResolve, json!({ "cardType": "visa" }))
            .then_notify(CheckoutEvent::Authorize, json!({ "txnid": "1234", "amount": 4200 }))
            .on(Action::AcknowledgeCloseRequest, Reply::Accept(Value::Null)),
    );

    let session = IframeSession::new(
        Some("123456".to_string()),
        CheckoutOptions {
            endpoint: "https://checkout.example".to_string(),
            demo: Some(true),
            ..Default::default()
        },
        window.clone(),
    );
    let overlay = Arc::new(ConsoleOverlay {
        window,
        document: Arc::clone(&document),
    });

    let checkout = match ModalCheckout::new(session, overlay) {
        Ok(checkout) => checkout,
        Err(err) => {
            eprintln!("cannot open checkout: {err}");
            std::process::exit(1);
        }
    };
    println!("checkout address: {}", checkout.checkout_address());

    let on_authorize = handler(|payload: &Value| println!("authorized: {payload}"));
    let on_any = wildcard_handler(|kind: &CheckoutEvent, _: &Value| println!("event: {kind}"));
    let subscribed = checkout
        .session()
        .subscribe(CheckoutEvent::Authorize, on_authorize)
        .and_then(|()| checkout.session().subscribe_all(on_any));
    if let Err(err) = subscribed {
        eprintln!("cannot subscribe: {err}");
        std::process::exit(1);
    }

    if let Err(err) = checkout.show().await {
        eprintln!("cannot show checkout: {err}");
        std::process::exit(1);
    }

    match checkout.initialize(None).await {
        Ok(answer) => println!("frame answered: {answer}"),
        Err(err) => eprintln!("session failed: {err}"),
    }

    // The frame closes itself once the payment is done.
    document.notify(CheckoutEvent::Close, Value::Null);
    if checkout.session().acknowledge_close_request().await.is_ok() {
        println!("close acknowledged");
    }

    checkout.destroy();
}
