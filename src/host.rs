//! Native messaging host: runs the coordinator behind the extension's
//! native port.
//!
//! Every inbound frame is one protocol message, optionally carrying a
//! `sender` context and a `requestId`. Replies go out as
//! `{requestId?, response}` frames, in completion order; surface events go
//! out as `{event, ...}` frames.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::Config;
use crate::error::{PagesmithError, Result};
use crate::protocol::message::{ActionResponse, SenderContext};
use crate::protocol::native::{read_message, write_message};
use crate::protocol::router::{Responder, ResponseMode, Routed, Router};
use crate::protocol::{coordinator_router, InboundMessage, SurfaceEvent};
use crate::registry::{Coordinator, MemoryStyleTarget, MemoryUserScripts};

/// Host-control message mirroring the user's user-scripts toggle.
pub const SET_CAPABILITY: &str = "set-capability";

/// Build the coordinator-side router over an in-memory runtime.
pub fn build_router(
    config: &Config,
    runtime: Arc<MemoryUserScripts>,
    events: mpsc::UnboundedSender<SurfaceEvent>,
) -> Router {
    let coordinator = Coordinator::new(runtime.clone(), Arc::new(MemoryStyleTarget::new()))
        .with_runtime(
            config.runtime.effective_version(),
            config.runtime.effective_extension_id().map(str::to_string),
        );

    coordinator_router(Arc::new(coordinator), events).on(
        SET_CAPABILITY,
        move |message: InboundMessage, _sender: SenderContext, responder: Responder| {
            match message.body.get("enabled").and_then(Value::as_bool) {
                Some(enabled) => {
                    runtime.set_enabled(enabled);
                    tracing::info!("User scripts capability set to {}", enabled);
                    let status = if enabled { "enabled" } else { "disabled" };
                    responder.respond_with(&ActionResponse::ok_with_status(status));
                }
                None => {
                    responder.respond_with(&ActionResponse::failed("Missing required field: enabled"))
                }
            }
            ResponseMode::Sync
        },
    )
}

fn reply_frame(request_id: &Option<Value>, response: Value) -> Value {
    match request_id {
        Some(id) => json!({ "requestId": id, "response": response }),
        None => json!({ "response": response }),
    }
}

fn violation_reply(e: &PagesmithError) -> Value {
    serde_json::to_value(ActionResponse::failed(e)).unwrap_or(Value::Null)
}

/// Replies still being computed, reaped as they finish.
#[derive(Default)]
struct InFlight {
    tasks: JoinSet<()>,
}

impl InFlight {
    fn spawn<F>(&mut self, reply: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.reap();
        self.tasks.spawn(reply);
    }

    /// Join every finished task without waiting.
    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            if let Err(e) = joined {
                tracing::error!("Reply task failed: {}", e);
            }
        }
    }

    fn len(&self) -> usize {
        self.tasks.len()
    }

    async fn drain(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Reply task failed: {}", e);
            }
        }
    }
}

/// Serve the native messaging protocol on stdin/stdout until stdin closes.
pub async fn run(config: &Config) -> Result<()> {
    serve(tokio::io::stdin(), tokio::io::stdout(), config).await
}

/// Serve the native messaging protocol over the given streams.
pub async fn serve<R, W>(mut reader: R, mut writer: W, config: &Config) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Value>();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<SurfaceEvent>();

    // Single writer so frames never interleave
    let write_handle = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if let Err(e) = write_message(&mut writer, &frame).await {
                tracing::error!("Failed to write native message: {}", e);
                break;
            }
        }
    });

    let event_tx = out_tx.clone();
    let events_handle = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match serde_json::to_value(&event) {
                Ok(frame) => {
                    let _ = event_tx.send(frame);
                }
                Err(e) => tracing::error!("Failed to serialize surface event: {}", e),
            }
        }
    });

    let runtime = Arc::new(MemoryUserScripts::new());
    let router = build_router(config, runtime, events_tx);
    let mut in_flight = InFlight::default();

    tracing::info!("Native messaging host ready");

    // Reaping happens between reads: `read_message` is not cancel-safe, so it
    // never races `join_next` in a select.
    let result = loop {
        in_flight.reap();

        let frame = match read_message(&mut reader, config.host.max_message_bytes).await {
            Ok(Some(frame)) => frame,
            Ok(None) => break Ok(()),
            Err(PagesmithError::MalformedMessage(reason)) => {
                tracing::warn!("Skipping malformed native message: {}", reason);
                let reply = ActionResponse::failed(format!("Malformed message: {}", reason));
                let _ = out_tx.send(reply_frame(
                    &None,
                    serde_json::to_value(reply).unwrap_or(Value::Null),
                ));
                continue;
            }
            Err(e) => {
                tracing::error!("Failed to read native message: {}", e);
                break Err(e);
            }
        };

        let request_id = frame.get("requestId").cloned();
        let sender = frame
            .get("sender")
            .cloned()
            .and_then(|s| serde_json::from_value::<SenderContext>(s).ok())
            .unwrap_or_default();

        match router.dispatch(frame, sender) {
            Ok(Routed::Unhandled) => {}
            Ok(Routed::Replied(response)) => {
                let _ = out_tx.send(reply_frame(&request_id, response));
            }
            Ok(Routed::Pending(pending)) => {
                tracing::debug!(
                    "Awaiting reply to {} ({} in flight)",
                    pending.discriminant(),
                    in_flight.len()
                );
                let out_tx = out_tx.clone();
                in_flight.spawn(async move {
                    let response = match pending.recv().await {
                        Ok(response) => response,
                        Err(e) => violation_reply(&e),
                    };
                    let _ = out_tx.send(reply_frame(&request_id, response));
                });
            }
            Err(e) => {
                let _ = out_tx.send(reply_frame(&request_id, violation_reply(&e)));
            }
        }
    };

    // Let in-flight replies finish before closing the channel.
    in_flight.drain().await;
    drop(router);
    drop(out_tx);
    let _ = events_handle.await;
    let _ = write_handle.await;

    tracing::info!("Native messaging host stopped");
    result
}
