use std::sync::{Arc, Mutex};
use std::time::Duration;

use framelink_channel::{ChannelConfig, ChannelError, ChannelState, MessageChannel};
use framelink_emitter::{handler, wildcard_handler};
use framelink_protocol::{Action, CheckoutEvent, Reply, ScriptedDocument};
use framelink_transport::{ContentFrame, LoadBehavior, LocalContainer, LocalWindow};
use serde_json::{json, Value};

const SOURCE: &str = "https://checkout.test/session";
const ORIGIN: &str = "https://checkout.test";

struct Harness {
    window: Arc<LocalWindow>,
    container: Arc<LocalContainer>,
    script: Arc<ScriptedDocument>,
    channel: MessageChannel,
}

fn harness(script: ScriptedDocument) -> Harness {
    harness_with(script, LoadBehavior::Load, ChannelConfig::default())
}

fn harness_with(script: ScriptedDocument, load: LoadBehavior, config: ChannelConfig) -> Harness {
    let window = LocalWindow::new();
    let script = Arc::new(script);
    let container = Arc::new(
        LocalContainer::new(Arc::clone(&window), script.clone()).with_load_behavior(load),
    );
    let channel =
        MessageChannel::with_config(SOURCE, container.clone(), window.clone(), config).unwrap();
    Harness {
        window,
        container,
        script,
        channel,
    }
}

async fn until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn handshake_presents_channel_id_to_the_frame() {
    let h = harness(ScriptedDocument::new());

    let frame = h.channel.element().await.unwrap();

    assert_eq!(frame.id(), h.channel.id().as_str());
    assert_eq!(frame.source(), SOURCE);
    assert_eq!(h.channel.state(), ChannelState::Ready);
    assert_eq!(h.script.handshake_id().as_deref(), Some(h.channel.id().as_str()));
    assert_eq!(h.script.received_actions(), vec![Action::InitiateHandshake]);
}

#[tokio::test]
async fn concurrent_readiness_callers_share_one_frame() {
    let h = harness(ScriptedDocument::new());

    let (first, second) = tokio::join!(h.channel.element(), h.channel.element());

    assert!(Arc::ptr_eq(&first.unwrap(), &second.unwrap()));
    assert_eq!(h.container.frames().len(), 1);
    assert_eq!(h.script.received_actions(), vec![Action::InitiateHandshake]);
}

#[tokio::test]
async fn abandoned_readiness_wait_does_not_create_a_second_frame() {
    let h = harness_with(ScriptedDocument::new(), LoadBehavior::Manual, ChannelConfig::default());

    let abandoned = tokio::time::timeout(Duration::from_millis(10), h.channel.element()).await;
    assert!(abandoned.is_err());
    assert_eq!(h.container.frames().len(), 1);

    let container = Arc::clone(&h.container);
    let (outcome, ()) = tokio::join!(h.channel.element(), async move {
        until(|| container.last_frame().is_some()).await;
        assert!(container.last_frame().unwrap().load());
    });

    let frame = outcome.unwrap();
    assert_eq!(h.container.frames().len(), 1);
    assert_eq!(h.channel.state(), ChannelState::Ready);
    assert_eq!(h.script.received_actions(), vec![Action::InitiateHandshake]);

    h.channel.destroy();
    assert!(!frame.is_attached());
    assert_eq!(h.container.attached_count(), 0);
}

#[tokio::test]
async fn destroy_while_loading_settles_readiness_waiters() {
    let h = harness_with(ScriptedDocument::new(), LoadBehavior::Manual, ChannelConfig::default());

    let container = Arc::clone(&h.container);
    let channel = h.channel.clone();
    let (outcome, ()) = tokio::join!(h.channel.element(), async move {
        until(|| container.last_frame().is_some()).await;
        channel.destroy();
    });

    assert!(matches!(outcome, Err(ChannelError::Destroyed)));
    assert_eq!(h.container.attached_count(), 0);
    assert_eq!(h.window.listener_count(), 0);
}

#[tokio::test]
async fn request_resolves_only_on_truthy_result() {
    let h = harness(
        ScriptedDocument::new()
            .on(Action::LoadSession, Reply::Accept(json!("loaded")))
            .on("refuse", Reply::Reject(json!({ "message": "session expired" }))),
    );

    let value = h.channel.request(Action::LoadSession, Some(json!("tok"))).await.unwrap();
    assert_eq!(value, json!("loaded"));

    let err = h.channel.request("refuse", None).await.unwrap_err();
    match err {
        ChannelError::Rejected(remote) => {
            assert_eq!(remote.message(), "session expired");
            assert_eq!(remote.payload()["message"], "session expired");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn responses_resolve_their_own_request_regardless_of_order() {
    let h = harness(ScriptedDocument::new().on("slow", Reply::Defer));
    h.channel.element().await.unwrap();

    let script = Arc::clone(&h.script);
    let (first, second, ()) = tokio::join!(
        h.channel.request("slow", Some(json!("first"))),
        h.channel.request("slow", Some(json!("second"))),
        async move {
            until(|| script.deferred().len() == 2).await;
            let deferred = script.deferred();
            assert!(script.respond(&deferred[1], Reply::Echo));
            assert!(script.respond(&deferred[0], Reply::Echo));
        }
    );

    assert_eq!(first.unwrap(), json!("first"));
    assert_eq!(second.unwrap(), json!("second"));
    assert_eq!(h.channel.pending_requests(), 0);
}

#[tokio::test]
async fn responses_from_foreign_origins_are_ignored() {
    let h = harness(ScriptedDocument::new().on("slow", Reply::Defer));
    h.channel.element().await.unwrap();

    let script = Arc::clone(&h.script);
    let window = Arc::clone(&h.window);
    let (outcome, ()) = tokio::join!(h.channel.request("slow", None), async move {
        until(|| script.deferred().len() == 1).await;
        let id = script.deferred()[0].clone();
        window.post(
            "https://evil.test",
            json!({ "result": true, "messageId": id, "payload": "spoofed" }),
        );
        window.post(
            "https://checkout.test:8443",
            json!({ "result": true, "messageId": id, "payload": "spoofed" }),
        );
        assert!(script.respond(&id, Reply::Accept(json!("genuine"))));
    });

    assert_eq!(outcome.unwrap(), json!("genuine"));
}

#[tokio::test]
async fn notifications_require_matching_origin_and_channel_id() {
    let h = harness(ScriptedDocument::new());
    h.channel.element().await.unwrap();

    let seen = Arc::new(Mutex::new(Vec::<Value>::new()));
    let sink = Arc::clone(&seen);
    h.channel.subscribe(
        CheckoutEvent::Authorize,
        handler(move |payload: &Value| sink.lock().unwrap().push(payload.clone())),
    );

    let id = h.channel.id().to_string();
    h.window.post(
        "https://evil.test",
        json!({ "handshakeId": id, "event": "authorize", "payload": "spoofed" }),
    );
    h.window.post(
        ORIGIN,
        json!({ "handshakeId": "iframe_someone_else", "event": "authorize", "payload": "foreign" }),
    );
    h.window.post(
        ORIGIN,
        json!({ "handshakeId": id, "event": "authorize", "payload": "mine" }),
    );

    assert_eq!(*seen.lock().unwrap(), vec![json!("mine")]);
    assert_eq!(h.channel.state(), ChannelState::Ready);
}

#[tokio::test]
async fn wildcard_sees_every_kind_and_specific_handlers_only_theirs() {
    let h = harness(
        ScriptedDocument::new()
            .on(Action::LoadSession, Reply::Accept(json!(null)))
            .then_notify(CheckoutEvent::PaymentTypeSelection, json!({ "paymentType": 1 }))
            .then_notify(CheckoutEvent::Authorize, json!({ "txnid": "42" }))
            .then_notify(CheckoutEvent::Other("sessionExpired".into()), json!(null)),
    );

    let all = Arc::new(Mutex::new(Vec::<(String, Value)>::new()));
    let authorize = Arc::new(Mutex::new(Vec::<Value>::new()));
    let all_sink = Arc::clone(&all);
    let authorize_sink = Arc::clone(&authorize);
    h.channel.subscribe_all(wildcard_handler(move |kind: &CheckoutEvent, payload: &Value| {
        all_sink
            .lock()
            .unwrap()
            .push((kind.to_string(), payload.clone()));
    }));
    h.channel.subscribe(
        CheckoutEvent::Authorize,
        handler(move |payload: &Value| authorize_sink.lock().unwrap().push(payload.clone())),
    );

    h.channel.request(Action::LoadSession, Some(json!("tok"))).await.unwrap();

    let kinds: Vec<String> = all.lock().unwrap().iter().map(|(kind, _)| kind.clone()).collect();
    assert_eq!(kinds, ["paymentTypeSelection", "authorize", "sessionExpired"]);
    assert_eq!(all.lock().unwrap()[1].1["txnid"], "42");
    assert_eq!(*authorize.lock().unwrap(), vec![json!({ "txnid": "42" })]);
}

#[tokio::test]
async fn unsubscribed_handler_stops_receiving() {
    let h = harness(ScriptedDocument::new());
    h.channel.element().await.unwrap();

    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    let on_close = handler(move |_: &Value| *counter.lock().unwrap() += 1);
    h.channel.subscribe(CheckoutEvent::Close, on_close.clone());

    assert!(h.script.notify(CheckoutEvent::Close, json!(null)));
    assert!(h.channel.unsubscribe(&CheckoutEvent::Close, &on_close));
    assert!(h.script.notify(CheckoutEvent::Close, json!(null)));

    assert_eq!(*calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn load_failure_fails_readiness_before_any_request_is_sent() {
    let h = harness_with(
        ScriptedDocument::new(),
        LoadBehavior::Fail("net::ERR_NAME_NOT_RESOLVED".to_string()),
        ChannelConfig::default(),
    );

    let err = h.channel.element().await.unwrap_err();
    assert!(matches!(err, ChannelError::HandshakeFailed(ref reason) if reason.contains("ERR_NAME_NOT_RESOLVED")));
    assert_eq!(h.channel.state(), ChannelState::Failed);

    let err = h.channel.request(Action::LoadSession, Some(json!("tok"))).await.unwrap_err();
    assert!(matches!(err, ChannelError::HandshakeFailed(_)));
    assert!(h.script.received().is_empty());
}

#[tokio::test]
async fn load_failure_during_handshake_rejects_readiness() {
    let h = harness_with(
        ScriptedDocument::silent(),
        LoadBehavior::Manual,
        ChannelConfig::default(),
    );

    let container = Arc::clone(&h.container);
    let script = Arc::clone(&h.script);
    let (outcome, ()) = tokio::join!(h.channel.element(), async move {
        until(|| container.last_frame().is_some()).await;
        let frame = container.last_frame().unwrap();
        assert!(frame.load());
        until(|| !script.received().is_empty()).await;
        assert!(frame.fail_load("aborted"));
    });

    assert!(matches!(outcome, Err(ChannelError::HandshakeFailed(_))));
    let err = h.channel.request(Action::LoadSession, None).await.unwrap_err();
    assert!(matches!(err, ChannelError::HandshakeFailed(_)));
    assert_eq!(h.script.received_actions(), vec![Action::InitiateHandshake]);
}

#[tokio::test]
async fn rejected_handshake_is_a_handshake_failure() {
    let h = harness(ScriptedDocument::new().on(Action::InitiateHandshake, Reply::Reject(json!("unsupported"))));

    let err = h.channel.element().await.unwrap_err();
    assert!(matches!(err, ChannelError::HandshakeFailed(ref reason) if reason.contains("unsupported")));
}

#[tokio::test]
async fn handshake_timeout_fails_readiness() {
    let h = harness_with(
        ScriptedDocument::silent(),
        LoadBehavior::Load,
        ChannelConfig::default().with_handshake_timeout(Duration::from_millis(30)),
    );

    let err = h.channel.element().await.unwrap_err();
    assert!(matches!(err, ChannelError::HandshakeFailed(_)));
    assert_eq!(h.channel.state(), ChannelState::Failed);
    assert_eq!(h.channel.pending_requests(), 0);
}

#[tokio::test]
async fn request_timeout_releases_listener() {
    let h = harness_with(
        ScriptedDocument::new().on("void", Reply::Ignore),
        LoadBehavior::Load,
        ChannelConfig::default().with_request_timeout(Duration::from_millis(30)),
    );
    h.channel.element().await.unwrap();
    let baseline = h.window.listener_count();

    let err = h.channel.request("void", None).await.unwrap_err();

    assert!(matches!(err, ChannelError::Timeout(limit) if limit == Duration::from_millis(30)));
    assert_eq!(h.channel.pending_requests(), 0);
    assert_eq!(h.window.listener_count(), baseline);
}

#[tokio::test]
async fn abandoned_request_releases_listener() {
    let h = harness(ScriptedDocument::new().on("void", Reply::Ignore));
    h.channel.element().await.unwrap();
    let baseline = h.window.listener_count();

    let abandoned = tokio::time::timeout(Duration::from_millis(20), h.channel.request("void", None)).await;

    assert!(abandoned.is_err());
    assert_eq!(h.channel.pending_requests(), 0);
    assert_eq!(h.window.listener_count(), baseline);
}

#[tokio::test]
async fn duplicate_responses_are_ignored() {
    let h = harness(
        ScriptedDocument::new()
            .on("ping", Reply::Accept(json!("pong")))
            .with_duplicate_replies(),
    );

    assert_eq!(h.channel.request("ping", None).await.unwrap(), json!("pong"));
    assert_eq!(h.channel.request("ping", None).await.unwrap(), json!("pong"));
    assert_eq!(h.channel.pending_requests(), 0);
    assert_eq!(h.window.listener_count(), 1);
}

#[tokio::test]
async fn destroy_settles_outstanding_requests() {
    let h = harness(ScriptedDocument::new().on("slow", Reply::Defer));
    h.channel.element().await.unwrap();

    let script = Arc::clone(&h.script);
    let channel = h.channel.clone();
    let (outcome, ()) = tokio::join!(h.channel.request("slow", None), async move {
        until(|| !script.deferred().is_empty()).await;
        channel.destroy();
    });

    assert!(matches!(outcome, Err(ChannelError::Destroyed)));
    assert_eq!(h.window.listener_count(), 0);
    assert!(matches!(
        h.channel.request("slow", None).await,
        Err(ChannelError::Destroyed)
    ));
}

#[tokio::test]
async fn destroy_twice_is_harmless() {
    let h = harness(ScriptedDocument::new());
    let frame = h.channel.element().await.unwrap();

    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    h.channel
        .subscribe_all(wildcard_handler(move |_: &CheckoutEvent, _: &Value| *counter.lock().unwrap() += 1));

    h.channel.destroy();
    h.channel.destroy();

    assert!(!frame.is_attached());
    assert_eq!(h.container.attached_count(), 0);
    assert_eq!(h.window.listener_count(), 0);
    assert_eq!(h.channel.state(), ChannelState::Destroyed);

    let id = h.channel.id().to_string();
    h.window
        .post(ORIGIN, json!({ "handshakeId": id, "event": "close", "payload": null }));
    assert_eq!(*calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn destroy_before_creation_never_attaches_a_frame() {
    let h = harness(ScriptedDocument::new());

    h.channel.destroy();

    assert!(matches!(h.channel.element().await, Err(ChannelError::Destroyed)));
    assert!(h.container.frames().is_empty());
}

#[tokio::test]
async fn reload_repeats_the_handshake() {
    let h = harness(ScriptedDocument::new().on("ping", Reply::Echo));
    h.channel.element().await.unwrap();

    let frame = h.container.last_frame().unwrap();
    assert!(frame.load());

    let script = Arc::clone(&h.script);
    until(|| {
        script
            .received_actions()
            .iter()
            .filter(|action| **action == Action::InitiateHandshake)
            .count()
            == 2
    })
    .await;

    assert_eq!(h.channel.state(), ChannelState::Ready);
    assert_eq!(h.channel.request("ping", Some(json!(1))).await.unwrap(), json!(1));
}

#[tokio::test]
async fn failed_rehandshake_keeps_the_channel_usable() {
    let h = harness_with(
        ScriptedDocument::new().on("ping", Reply::Echo),
        LoadBehavior::Load,
        ChannelConfig::default().with_handshake_timeout(Duration::from_millis(20)),
    );
    h.channel.element().await.unwrap();

    assert!(h.container.last_frame().unwrap().fail_load("reload failed"));
    tokio::time::sleep(Duration::from_millis(5)).await;

    assert_eq!(h.channel.state(), ChannelState::Ready);
    assert_eq!(h.channel.request("ping", Some(json!("still"))).await.unwrap(), json!("still"));
}
