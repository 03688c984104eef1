use std::sync::{Arc, Mutex};
use std::time::Duration;

use framelink_emitter::{handler, wildcard_handler};
use framelink_protocol::{Action, CheckoutEvent, Reply, ScriptedDocument};
use framelink_session::{
    Checkout, CheckoutOptions, IframeSession, InlineCheckout, ModalCheckout, ModalPresenter,
    SessionError, Ui, OVERLAY_ID_PREFIX,
};
use framelink_transport::{ContentFrame, LoadBehavior, LocalContainer, LocalWindow, MountPoint};
use serde_json::{json, Value};

const ENDPOINT: &str = "https://checkout.test";

fn options() -> CheckoutOptions {
    CheckoutOptions {
        endpoint: ENDPOINT.to_string(),
        ..Default::default()
    }
}

fn checkout_document() -> ScriptedDocument {
    ScriptedDocument::new()
        .on(Action::LoadSession, Reply::Accept(json!("loaded")))
        .then_notify(CheckoutEvent::PaymentTypeSelection, json!({ "paymentType": 1 }))
        .then_notify(CheckoutEvent::Authorize, json!({ "txnid": "9001" }))
        .on(Action::AcknowledgeCloseRequest, Reply::Accept(Value::Null))
}

#[tokio::test]
async fn address_follows_hosted_checkout_layout() {
    let window = LocalWindow::new();
    let unmounted = InlineCheckout::new(IframeSession::new(
        None,
        CheckoutOptions {
            ui: Some(Ui::Fullscreen),
            ..Default::default()
        },
        window.clone(),
    ));
    assert_eq!(
        unmounted.checkout_address(),
        "https://v1.checkout.bambora.com?ui=fullscreen&language=en-US"
    );

    let with_token = InlineCheckout::new(IframeSession::new(
        Some("123456".to_string()),
        CheckoutOptions {
            ui: Some(Ui::Fullscreen),
            ..Default::default()
        },
        window,
    ));
    assert_eq!(
        with_token.checkout_address(),
        "https://v1.checkout.bambora.com/123456?ui=fullscreen&language=en-US"
    );
}

#[tokio::test]
async fn inline_checkout_loads_session_and_reemits_notifications() {
    let window = LocalWindow::new();
    let script = Arc::new(checkout_document());
    let container = Arc::new(LocalContainer::new(Arc::clone(&window), script.clone()));

    let seen = Arc::new(Mutex::new(Vec::<String>::new()));
    let authorized = Arc::new(Mutex::new(Vec::<Value>::new()));
    let seen_sink = Arc::clone(&seen);
    let authorized_sink = Arc::clone(&authorized);

    let handlers = framelink_emitter::HandlerMap::new()
        .on(
            CheckoutEvent::Authorize,
            handler(move |payload: &Value| authorized_sink.lock().unwrap().push(payload.clone())),
        )
        .on_all(wildcard_handler(move |kind: &CheckoutEvent, _: &Value| {
            seen_sink.lock().unwrap().push(kind.to_string())
        }));

    let checkout = InlineCheckout::with_container(
        IframeSession::new(None, options(), window.clone()).with_handlers(handlers),
        container.clone(),
    )
    .unwrap();

    assert_eq!(checkout.options().ui(), Ui::Inline);
    let frame = checkout.frame().await.unwrap();
    assert_eq!(frame.source(), "https://checkout.test?ui=inline&language=en-US");

    assert_eq!(checkout.initialize(Some("tok")).await.unwrap(), "loaded");
    assert_eq!(checkout.session_token().as_deref(), Some("tok"));

    assert_eq!(*seen.lock().unwrap(), ["paymentTypeSelection", "authorize"]);
    assert_eq!(*authorized.lock().unwrap(), vec![json!({ "txnid": "9001" })]);
    assert_eq!(
        script.received_actions(),
        vec![Action::InitiateHandshake, Action::LoadSession]
    );
}

#[tokio::test]
async fn unmounted_inline_checkout_needs_a_container() {
    let window = LocalWindow::new();
    let checkout = InlineCheckout::new(IframeSession::new(Some("tok".to_string()), options(), window.clone()));

    assert!(matches!(checkout.frame().await, Err(SessionError::ContainerNotSpecified)));
    assert!(matches!(
        checkout.initialize(None).await,
        Err(SessionError::ContainerNotSpecified)
    ));

    let container: Arc<dyn MountPoint> =
        Arc::new(LocalContainer::new(Arc::clone(&window), Arc::new(checkout_document())));
    let frame = checkout.mount(container).await.unwrap();
    assert!(frame.is_attached());
    assert_eq!(frame.source(), "https://checkout.test/tok?ui=inline&language=en-US");
}

#[tokio::test]
async fn load_failure_surfaces_as_handshake_error() {
    let window = LocalWindow::new();
    let container = Arc::new(
        LocalContainer::new(Arc::clone(&window), Arc::new(checkout_document()))
            .with_load_behavior(LoadBehavior::Fail("offline".to_string())),
    );
    let checkout =
        InlineCheckout::with_container(IframeSession::new(None, options(), window), container).unwrap();

    match checkout.initialize(Some("tok")).await {
        Err(SessionError::Handshake(reason)) => assert!(reason.contains("offline")),
        other => panic!("expected handshake error, got {other:?}"),
    }
}

#[tokio::test]
async fn close_request_can_be_acknowledged() {
    let window = LocalWindow::new();
    let script = Arc::new(checkout_document());
    let container = Arc::new(LocalContainer::new(Arc::clone(&window), script.clone()));
    let checkout =
        InlineCheckout::with_container(IframeSession::new(None, options(), window), container).unwrap();
    checkout.frame().await.unwrap();

    checkout.session().acknowledge_close_request().await.unwrap();

    assert_eq!(
        script.received_actions().last(),
        Some(&Action::AcknowledgeCloseRequest)
    );
}

#[derive(Default)]
struct Stage {
    window: Option<Arc<LocalWindow>>,
    script: Option<Arc<ScriptedDocument>>,
    load: LoadBehavior,
    containers: Mutex<Vec<Arc<LocalContainer>>>,
    calls: Mutex<Vec<String>>,
}

impl ModalPresenter for Stage {
    fn create_container(&self, overlay_id: &str) -> Arc<dyn MountPoint> {
        self.calls.lock().unwrap().push(format!("create {overlay_id}"));
        let window = self.window.clone().unwrap_or_else(LocalWindow::new);
        let script = self
            .script
            .clone()
            .unwrap_or_else(|| Arc::new(ScriptedDocument::new()));
        let container =
            Arc::new(LocalContainer::new(window, script).with_load_behavior(self.load.clone()));
        self.containers.lock().unwrap().push(Arc::clone(&container));
        container
    }

    fn show(&self) {
        self.calls.lock().unwrap().push("show".to_string());
    }

    fn hide(&self) {
        self.calls.lock().unwrap().push("hide".to_string());
    }

    fn remove(&self) {
        self.calls.lock().unwrap().push("remove".to_string());
    }
}

fn modal() -> (ModalCheckout, Arc<Stage>, Arc<ScriptedDocument>) {
    let window = LocalWindow::new();
    let script = Arc::new(checkout_document());
    let stage = Arc::new(Stage {
        window: Some(Arc::clone(&window)),
        script: Some(Arc::clone(&script)),
        ..Default::default()
    });
    let checkout = ModalCheckout::new(IframeSession::new(None, options(), window), stage.clone()).unwrap();
    (checkout, stage, script)
}

fn calls(stage: &Stage) -> Vec<String> {
    stage.calls.lock().unwrap().clone()
}

#[tokio::test]
async fn modal_shows_once_and_hides_on_close() {
    let (checkout, stage, script) = modal();
    assert_eq!(checkout.options().ui(), Ui::Modal);
    assert!(checkout.overlay_id().starts_with(OVERLAY_ID_PREFIX));

    checkout.show().await.unwrap();
    checkout.show().await.unwrap();
    assert!(checkout.is_active());

    assert!(script.notify(CheckoutEvent::Close, Value::Null));
    assert!(!checkout.is_active());
    checkout.hide();

    let recorded = calls(&stage);
    assert_eq!(recorded.len(), 3);
    assert!(recorded[0].starts_with("create bc-overlay-container-"));
    assert_eq!(recorded[1..], ["show", "hide"]);
}

#[tokio::test]
async fn modal_hides_on_cancel() {
    let (checkout, stage, script) = modal();
    checkout.show().await.unwrap();

    assert!(script.notify(CheckoutEvent::Cancel, json!({ "reason": "user" })));

    assert!(!checkout.is_active());
    assert_eq!(calls(&stage).last().map(String::as_str), Some("hide"));
}

#[tokio::test]
async fn modal_destroy_removes_overlay_once() {
    let (checkout, stage, _) = modal();
    let frame = checkout.frame().await.unwrap();

    checkout.destroy();
    checkout.destroy();

    assert!(!frame.is_attached());
    assert!(!checkout.is_active());
    assert_eq!(calls(&stage).iter().filter(|call| *call == "remove").count(), 1);
    assert!(matches!(
        checkout.session().subscribe(CheckoutEvent::Close, handler(|_: &Value| {})),
        Err(SessionError::Destroyed)
    ));
    assert!(matches!(checkout.show().await, Err(SessionError::Destroyed)));
    assert!(!checkout.is_active());
}

#[tokio::test]
async fn cancelled_show_can_be_retried() {
    let window = LocalWindow::new();
    let stage = Arc::new(Stage {
        window: Some(Arc::clone(&window)),
        script: Some(Arc::new(checkout_document())),
        load: LoadBehavior::Manual,
        ..Default::default()
    });
    let checkout = ModalCheckout::new(IframeSession::new(None, options(), window), stage.clone()).unwrap();

    let cancelled = tokio::time::timeout(Duration::from_millis(10), checkout.show()).await;
    assert!(cancelled.is_err());
    assert!(!checkout.is_active());
    assert!(!calls(&stage).contains(&"show".to_string()));

    let container = stage.containers.lock().unwrap()[0].clone();
    assert!(container.last_frame().unwrap().load());
    checkout.show().await.unwrap();

    assert!(checkout.is_active());
    assert_eq!(calls(&stage).iter().filter(|call| *call == "show").count(), 1);
    assert_eq!(container.frames().len(), 1);
}
