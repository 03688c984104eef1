//! Frame creation and the `initiateHandshake` exchange.
//!
//! The handshake request carries the channel id. The frame tags every
//! notification it sends afterwards with that id.

use std::sync::{Arc, PoisonError};

use framelink_protocol::Action;
use framelink_transport::{AttachedFrame, ContentFrame, FrameLoadEvent, FrameSpec};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::channel::Inner;
use crate::error::{ChannelError, Result};
use crate::state::ChannelState;

/// Attach the frame, wait for it to load and complete the handshake.
///
/// Bounded by the configured handshake timeout, if any.
pub(crate) async fn establish(inner: &Arc<Inner>) -> Result<Arc<dyn ContentFrame>> {
    let work = attach_and_handshake(inner);
    let outcome = match inner.config.handshake_timeout {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ChannelError::HandshakeFailed(format!(
                "no handshake response within {limit:?}"
            ))),
        },
        None => work.await,
    };

    match &outcome {
        Ok(_) => {
            inner.set_state(ChannelState::Ready);
            debug!(channel = %inner.id, "channel ready");
        }
        Err(err) => {
            inner.set_state(ChannelState::Failed);
            debug!(channel = %inner.id, error = %err, "channel failed to become ready");
        }
    }
    outcome
}

async fn attach_and_handshake(inner: &Arc<Inner>) -> Result<Arc<dyn ContentFrame>> {
    if inner.is_destroyed() {
        return Err(ChannelError::Destroyed);
    }
    inner.set_state(ChannelState::Creating);

    let AttachedFrame {
        frame,
        mut load_events,
    } = inner
        .mount
        .attach_frame(FrameSpec::new(inner.id.as_str(), inner.source.clone()))?;
    *inner.frame.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&frame));
    if inner.is_destroyed() {
        frame.detach();
        return Err(ChannelError::Destroyed);
    }
    inner.install_proxy();

    wait_for_load(&mut load_events).await?;
    inner.set_state(ChannelState::Handshaking);

    {
        let exchange = handshake(inner, &frame);
        tokio::pin!(exchange);
        loop {
            tokio::select! {
                outcome = &mut exchange => {
                    outcome?;
                    break;
                }
                event = load_events.recv() => match event {
                    Some(FrameLoadEvent::Failed(reason)) => {
                        return Err(ChannelError::HandshakeFailed(format!(
                            "frame failed to load: {reason}"
                        )));
                    }
                    Some(FrameLoadEvent::Loaded) => {
                        trace!(channel = %inner.id, "frame reloaded during handshake");
                    }
                    None => {
                        (&mut exchange).await?;
                        break;
                    }
                }
            }
        }
    }

    spawn_rebind(inner, Arc::clone(&frame), load_events);
    Ok(frame)
}

async fn wait_for_load(load_events: &mut mpsc::UnboundedReceiver<FrameLoadEvent>) -> Result<()> {
    match load_events.recv().await {
        Some(FrameLoadEvent::Loaded) => Ok(()),
        Some(FrameLoadEvent::Failed(reason)) => Err(ChannelError::HandshakeFailed(format!(
            "frame failed to load: {reason}"
        ))),
        None => Err(ChannelError::HandshakeFailed(
            "frame load signal lost before first load".to_string(),
        )),
    }
}

/// Run one `initiateHandshake` exchange over `frame`.
pub(crate) async fn handshake(inner: &Arc<Inner>, frame: &Arc<dyn ContentFrame>) -> Result<()> {
    let payload = Value::String(inner.id.to_string());
    match inner
        .send_request(frame, Action::InitiateHandshake, Some(payload), None)
        .await
    {
        Ok(_) => Ok(()),
        Err(ChannelError::Destroyed) => Err(ChannelError::Destroyed),
        Err(ChannelError::Rejected(remote)) => Err(ChannelError::HandshakeFailed(format!(
            "frame rejected handshake: {remote}"
        ))),
        Err(other) => Err(ChannelError::HandshakeFailed(other.to_string())),
    }
}

/// Repeat the handshake whenever the frame signals another load.
///
/// Requests in flight during a re-handshake are left to settle on their own.
fn spawn_rebind(
    inner: &Arc<Inner>,
    frame: Arc<dyn ContentFrame>,
    mut load_events: mpsc::UnboundedReceiver<FrameLoadEvent>,
) {
    let channel = Arc::downgrade(inner);
    let task = tokio::spawn(async move {
        while let Some(event) = load_events.recv().await {
            let Some(inner) = channel.upgrade() else {
                break;
            };
            if inner.is_destroyed() {
                break;
            }
            match event {
                FrameLoadEvent::Loaded => {
                    debug!(channel = %inner.id, "frame reloaded; repeating handshake");
                    let exchange = handshake(&inner, &frame);
                    let outcome = match inner.config.handshake_timeout {
                        Some(limit) => tokio::time::timeout(limit, exchange)
                            .await
                            .unwrap_or_else(|_| {
                                Err(ChannelError::HandshakeFailed(format!(
                                    "no handshake response within {limit:?}"
                                )))
                            }),
                        None => exchange.await,
                    };
                    if let Err(err) = outcome {
                        warn!(channel = %inner.id, error = %err, "re-handshake failed");
                    }
                }
                FrameLoadEvent::Failed(reason) => {
                    warn!(channel = %inner.id, %reason, "frame failed to reload");
                }
            }
        }
    });

    let mut slot = inner.rebind_task.lock().unwrap_or_else(PoisonError::into_inner);
    if inner.is_destroyed() {
        task.abort();
    } else {
        *slot = Some(task);
    }
}
