//! Drive an inline checkout against an in-memory page.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use framelink_emitter::wildcard_handler;
use framelink_protocol::{Action, CheckoutEvent, Reply, ScriptedDocument};
use framelink_session::{Checkout, IframeSession, InlineCheckout};
use framelink_transport::{LoadBehavior, LocalContainer, LocalWindow};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::cmd::SimulateArgs;
use crate::exit::{io_error, session_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_fields, print_json, print_table, OutputFormat};

#[derive(Serialize, Clone)]
struct Notification {
    event: String,
    payload: Value,
}

#[derive(Serialize)]
struct SimulateOutput {
    address: String,
    origin: String,
    channel: String,
    state: String,
    result: String,
    acknowledged: bool,
    notifications: Vec<Notification>,
}

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_timeout(&args.timeout)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|err| io_error("failed to start runtime", err))?;

    let out = runtime.block_on(async {
        match tokio::time::timeout(timeout, simulate(&args)).await {
            Ok(result) => result,
            Err(_) => Err(CliError::new(
                TIMEOUT,
                format!("checkout did not complete within {}", args.timeout.trim()),
            )),
        }
    })?;

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            print_fields(&[
                ("address", out.address.clone()),
                ("origin", out.origin.clone()),
                ("channel", out.channel.clone()),
                ("state", out.state.clone()),
                ("result", out.result.clone()),
                ("acknowledged", out.acknowledged.to_string()),
            ]);
            if !out.notifications.is_empty() {
                let rows = out
                    .notifications
                    .iter()
                    .map(|n| vec![n.event.clone(), n.payload.to_string()])
                    .collect();
                print_table(&["event", "payload"], rows);
            }
        }
        OutputFormat::Pretty => {
            println!("loaded {} via {}", out.result, out.channel);
            for n in &out.notifications {
                println!("  {} {}", n.event, n.payload);
            }
            if out.acknowledged {
                println!("close acknowledged");
            }
        }
    }

    Ok(SUCCESS)
}

async fn simulate(args: &SimulateArgs) -> CliResult<SimulateOutput> {
    let options = args.options.resolve()?;
    let window = LocalWindow::new();
    let container = LocalContainer::new(Arc::clone(&window), Arc::new(document(args)))
        .with_load_behavior(match &args.fail_load {
            Some(reason) => LoadBehavior::Fail(reason.clone()),
            None => LoadBehavior::Load,
        });

    let session = IframeSession::new(None, options, window);
    let checkout = InlineCheckout::with_container(session, Arc::new(container))
        .map_err(|err| session_error("cannot open checkout", err))?;

    let seen = Arc::new(Mutex::new(Vec::<Notification>::new()));
    let sink = Arc::clone(&seen);
    checkout
        .session()
        .subscribe_all(wildcard_handler(move |kind: &CheckoutEvent, payload: &Value| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Notification {
                    event: kind.to_string(),
                    payload: payload.clone(),
                });
        }))
        .map_err(|err| session_error("cannot subscribe", err))?;

    let channel = checkout
        .session()
        .channel()
        .map_err(|err| session_error("cannot open channel", err))?;
    info!(channel = %channel.id(), source = channel.source(), "loading checkout session");

    let result = checkout
        .initialize(Some(args.token.as_str()))
        .await
        .map_err(|err| session_error("session failed to load", err))?;

    let notifications = seen
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    let acknowledged = if notifications
        .iter()
        .any(|n| CheckoutEvent::from(n.event.as_str()).requires_close_acknowledgement())
    {
        checkout
            .session()
            .acknowledge_close_request()
            .await
            .map_err(|err| session_error("close acknowledgement failed", err))?;
        true
    } else {
        false
    };

    let out = SimulateOutput {
        address: channel.source().to_string(),
        origin: channel.target_origin().to_string(),
        channel: channel.id().to_string(),
        state: channel.state().to_string(),
        result,
        acknowledged,
        notifications,
    };
    checkout.destroy();
    debug!("simulated checkout destroyed");
    Ok(out)
}

fn document(args: &SimulateArgs) -> ScriptedDocument {
    if args.silent {
        return ScriptedDocument::silent();
    }

    let load = match &args.reject {
        Some(text) => Reply::Reject(json!(text)),
        None => Reply::Accept(json!(args.token)),
    };
    let mut document = ScriptedDocument::new().on(Action::LoadSession, load);
    if args.reject.is_none() {
        for kind in args.notify.iter().filter(|kind| !kind.trim().is_empty()) {
            document = document.then_notify(CheckoutEvent::from(kind.trim()), json!({}));
        }
    }
    document.on(Action::AcknowledgeCloseRequest, Reply::Accept(Value::Null))
}

fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
