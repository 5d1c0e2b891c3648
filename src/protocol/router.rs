//! Discriminant-based message routing with synchronous and asynchronous
//! response disciplines.
//!
//! Every handler receives a [`Responder`] and reports which discipline it
//! used. `respond` consumes the responder, so a handler cannot answer twice;
//! a responder dropped without answering is reported as a protocol violation
//! to whoever is waiting on the reply.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;

use super::message::{InboundMessage, SenderContext};
use crate::error::{PagesmithError, Result};

/// How a handler will deliver its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Already responded before returning.
    Sync,
    /// Will respond later; keep the channel open.
    Async,
}

/// One-shot reply channel handed to a handler.
pub struct Responder {
    discriminant: String,
    tx: oneshot::Sender<Value>,
}

impl Responder {
    fn new(discriminant: &str) -> (Self, oneshot::Receiver<Value>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                discriminant: discriminant.to_string(),
                tx,
            },
            rx,
        )
    }

    pub fn discriminant(&self) -> &str {
        &self.discriminant
    }

    pub fn respond(self, value: Value) {
        if self.tx.send(value).is_err() {
            // The requester stopped listening; nothing left to deliver to.
            tracing::debug!("Reply to {} dropped: receiver gone", self.discriminant);
        }
    }

    pub fn respond_with<T: Serialize>(self, body: &T) {
        match serde_json::to_value(body) {
            Ok(value) => self.respond(value),
            Err(e) => {
                tracing::error!("Failed to serialize {} reply: {}", self.discriminant, e);
                let fallback = serde_json::json!({
                    "success": false,
                    "error": format!("Failed to serialize reply: {}", e),
                });
                self.respond(fallback);
            }
        }
    }
}

/// A handler for one discriminant.
pub trait MessageHandler: Send + Sync {
    fn handle(
        &self,
        message: InboundMessage,
        sender: SenderContext,
        responder: Responder,
    ) -> ResponseMode;
}

impl<F> MessageHandler for F
where
    F: Fn(InboundMessage, SenderContext, Responder) -> ResponseMode + Send + Sync,
{
    fn handle(
        &self,
        message: InboundMessage,
        sender: SenderContext,
        responder: Responder,
    ) -> ResponseMode {
        self(message, sender, responder)
    }
}

/// A reply the handler promised to deliver later.
pub struct PendingResponse {
    discriminant: String,
    rx: oneshot::Receiver<Value>,
}

impl PendingResponse {
    pub fn discriminant(&self) -> &str {
        &self.discriminant
    }

    /// Wait for the reply. Fails if the handler dropped its responder.
    pub async fn recv(self) -> Result<Value> {
        self.rx.await.map_err(|_| {
            tracing::error!("Handler for {} never responded", self.discriminant);
            PagesmithError::ProtocolViolation(format!(
                "handler for {} dropped its responder without responding",
                self.discriminant
            ))
        })
    }
}

/// Result of routing one message.
pub enum Routed {
    /// No handler for the discriminant; another listener may take it.
    Unhandled,
    /// Answered synchronously.
    Replied(Value),
    /// Answer will arrive later.
    Pending(PendingResponse),
}

impl Routed {
    /// Resolve to the reply, waiting if needed. `None` for unhandled messages.
    pub async fn into_reply(self) -> Result<Option<Value>> {
        match self {
            Routed::Unhandled => Ok(None),
            Routed::Replied(value) => Ok(Some(value)),
            Routed::Pending(pending) => pending.recv().await.map(Some),
        }
    }
}

#[derive(Default, Clone)]
pub struct Router {
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `discriminant` to `handler`, replacing any earlier handler.
    pub fn on(mut self, discriminant: &str, handler: impl MessageHandler + 'static) -> Self {
        self.handlers
            .insert(discriminant.to_string(), Arc::new(handler));
        self
    }

    pub fn handles(&self, discriminant: &str) -> bool {
        self.handlers.contains_key(discriminant)
    }

    /// Route one raw message to its handler.
    pub fn dispatch(&self, raw: Value, sender: SenderContext) -> Result<Routed> {
        let Some(message) = InboundMessage::parse(raw) else {
            tracing::debug!("Ignoring message without action/type");
            return Ok(Routed::Unhandled);
        };

        let Some(handler) = self.handlers.get(&message.discriminant) else {
            tracing::debug!("No handler for {}", message.discriminant);
            return Ok(Routed::Unhandled);
        };

        let discriminant = message.discriminant.clone();
        tracing::debug!("Dispatching {}", discriminant);

        let (responder, mut rx) = Responder::new(&discriminant);
        match handler.handle(message, sender, responder) {
            ResponseMode::Sync => match rx.try_recv() {
                Ok(value) => Ok(Routed::Replied(value)),
                Err(_) => {
                    tracing::error!("Handler for {} returned Sync without responding", discriminant);
                    Err(PagesmithError::ProtocolViolation(format!(
                        "handler for {} claimed a synchronous reply but did not respond",
                        discriminant
                    )))
                }
            },
            ResponseMode::Async => Ok(Routed::Pending(PendingResponse { discriminant, rx })),
        }
    }

    /// Dispatch and wait for the reply in one step.
    pub async fn request(&self, raw: Value, sender: SenderContext) -> Result<Option<Value>> {
        self.dispatch(raw, sender)?.into_reply().await
    }
}
