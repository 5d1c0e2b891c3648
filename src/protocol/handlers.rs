//! Background coordinator handlers for every message the coordinator answers.

use std::future::Future;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::mpsc;

use super::message::{
    actions, AckResponse, ActionResponse, CapabilityResponse, DisplayStateRequest,
    DisplayStateResponse, ElementSelectedRequest, InboundMessage, RegisterScriptRequest,
    RegisteredScriptsResponse, RemoveScriptEffectRequest, SenderContext,
};
use super::router::{MessageHandler, Responder, ResponseMode, Router};
use crate::registry::{get_display_state, CodeKind, Coordinator};

/// Notifications for the UI surface that the coordinator relays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum SurfaceEvent {
    #[serde(rename_all = "camelCase")]
    OpenSideSurface {
        tab_id: Option<i64>,
        window_id: Option<i64>,
    },
    #[serde(rename_all = "camelCase")]
    ElementSelected {
        selector: String,
        tab_id: Option<i64>,
    },
}

pub type SurfaceEvents = mpsc::UnboundedSender<SurfaceEvent>;

/// Build a router answering every coordinator-side message.
pub fn coordinator_router(coordinator: Arc<Coordinator>, events: SurfaceEvents) -> Router {
    Router::new()
        .on(actions::OPEN_SIDE_SURFACE, OpenSideSurface { events: events.clone() })
        .on(actions::REGISTER_SCRIPT, RegisterScript { coordinator: coordinator.clone() })
        .on(actions::CHECK_CAPABILITY, CheckCapability { coordinator: coordinator.clone() })
        .on(actions::REMOVE_SCRIPT_EFFECT, RemoveScriptEffect { coordinator: coordinator.clone() })
        .on(actions::LIST_REGISTERED, ListRegistered { coordinator: coordinator.clone() })
        .on(actions::DISPLAY_STATE, DisplayState { coordinator })
        .on(actions::ELEMENT_SELECTED, ElementSelected { events })
}

/// Answer later with whatever `reply` resolves to.
pub(crate) fn reply_async<F, T>(responder: Responder, reply: F) -> ResponseMode
where
    F: Future<Output = T> + Send + 'static,
    T: Serialize + Send,
{
    tokio::spawn(async move {
        let body = reply.await;
        responder.respond_with(&body);
    });
    ResponseMode::Async
}

/// Decode the payload, or answer synchronously with the decoding error.
pub(crate) fn decode_or_reply<T: DeserializeOwned>(
    message: &InboundMessage,
    responder: Responder,
) -> Result<(T, Responder), ResponseMode> {
    match message.payload::<T>() {
        Ok(request) => Ok((request, responder)),
        Err(e) => {
            tracing::warn!("Rejected {} payload: {}", responder.discriminant(), e);
            responder.respond_with(&ActionResponse::failed(e));
            Err(ResponseMode::Sync)
        }
    }
}

struct OpenSideSurface {
    events: SurfaceEvents,
}

impl MessageHandler for OpenSideSurface {
    fn handle(&self, _message: InboundMessage, sender: SenderContext, responder: Responder) -> ResponseMode {
        if sender.window_id.is_none() && sender.tab_id.is_none() {
            tracing::warn!("open-side-surface without a window or tab");
            responder.respond_with(&AckResponse::error("No window or tab to open the side surface in"));
            return ResponseMode::Sync;
        }

        let event = SurfaceEvent::OpenSideSurface {
            tab_id: sender.tab_id,
            window_id: sender.window_id,
        };
        if self.events.send(event).is_err() {
            tracing::warn!("Side surface listener is gone");
            responder.respond_with(&AckResponse::error("Side surface is not available"));
        } else {
            responder.respond_with(&AckResponse::status("opened"));
        }
        ResponseMode::Sync
    }
}

struct ElementSelected {
    events: SurfaceEvents,
}

impl MessageHandler for ElementSelected {
    fn handle(&self, message: InboundMessage, sender: SenderContext, responder: Responder) -> ResponseMode {
        let (request, responder) = match decode_or_reply::<ElementSelectedRequest>(&message, responder) {
            Ok(decoded) => decoded,
            Err(mode) => return mode,
        };

        if request.selector.trim().is_empty() {
            responder.respond_with(&AckResponse::error("Missing required field: selector"));
            return ResponseMode::Sync;
        }

        let event = SurfaceEvent::ElementSelected {
            selector: request.selector,
            tab_id: sender.tab_id,
        };
        if self.events.send(event).is_err() {
            tracing::warn!("Element selection arrived with no UI listening");
            responder.respond_with(&AckResponse::error("No UI surface is listening"));
        } else {
            responder.respond_with(&AckResponse::status("received"));
        }
        ResponseMode::Sync
    }
}

struct RegisterScript {
    coordinator: Arc<Coordinator>,
}

impl MessageHandler for RegisterScript {
    fn handle(&self, message: InboundMessage, _sender: SenderContext, responder: Responder) -> ResponseMode {
        let (request, responder) = match decode_or_reply::<RegisterScriptRequest>(&message, responder) {
            Ok(decoded) => decoded,
            Err(mode) => return mode,
        };

        let coordinator = Arc::clone(&self.coordinator);
        reply_async(responder, async move {
            let kind = CodeKind::resolve(request.kind, &request.code);
            let result = match kind {
                CodeKind::Js => coordinator
                    .register(&request.id, &request.target_url, &request.code)
                    .await
                    .map(|()| "registered"),
                // Styles are inserted directly, never registered.
                CodeKind::Css => coordinator
                    .apply_style(&request.id, &request.code)
                    .await
                    .map(|()| "style-applied"),
            };

            match result {
                Ok(status) => ActionResponse::ok_with_status(status),
                Err(e) => ActionResponse::from(&e),
            }
        })
    }
}

struct CheckCapability {
    coordinator: Arc<Coordinator>,
}

impl MessageHandler for CheckCapability {
    fn handle(&self, _message: InboundMessage, _sender: SenderContext, responder: Responder) -> ResponseMode {
        let coordinator = Arc::clone(&self.coordinator);
        reply_async(responder, async move {
            match coordinator.check_capability().await {
                Ok(()) => CapabilityResponse {
                    available: true,
                    error: None,
                    guidance: None,
                },
                Err(e) => CapabilityResponse {
                    available: false,
                    error: Some(e.to_string()),
                    guidance: e.guidance().map(str::to_string),
                },
            }
        })
    }
}

struct RemoveScriptEffect {
    coordinator: Arc<Coordinator>,
}

impl MessageHandler for RemoveScriptEffect {
    fn handle(&self, message: InboundMessage, _sender: SenderContext, responder: Responder) -> ResponseMode {
        let (request, responder) = match decode_or_reply::<RemoveScriptEffectRequest>(&message, responder) {
            Ok(decoded) => decoded,
            Err(mode) => return mode,
        };

        let coordinator = Arc::clone(&self.coordinator);
        reply_async(responder, async move {
            let kind = CodeKind::resolve(request.kind, &request.code_sample);
            let result = match kind {
                CodeKind::Js => coordinator.unregister(&request.id).await.map(|outcome| {
                    if outcome.removed {
                        "removed"
                    } else {
                        "not-registered"
                    }
                }),
                CodeKind::Css => coordinator.remove_style(&request.id).await.map(|outcome| {
                    if outcome.removed {
                        "removed"
                    } else {
                        "not-present"
                    }
                }),
            };

            match result {
                Ok(status) => ActionResponse::ok_with_status(status),
                Err(e) => ActionResponse::from(&e),
            }
        })
    }
}

struct ListRegistered {
    coordinator: Arc<Coordinator>,
}

impl MessageHandler for ListRegistered {
    fn handle(&self, _message: InboundMessage, _sender: SenderContext, responder: Responder) -> ResponseMode {
        let coordinator = Arc::clone(&self.coordinator);
        reply_async(responder, async move {
            match coordinator.list_active().await {
                Ok(scripts) => RegisteredScriptsResponse::ok(scripts),
                Err(e) => RegisteredScriptsResponse::failed(&e),
            }
        })
    }
}

struct DisplayState {
    coordinator: Arc<Coordinator>,
}

impl MessageHandler for DisplayState {
    fn handle(&self, message: InboundMessage, _sender: SenderContext, responder: Responder) -> ResponseMode {
        let (request, responder) = match decode_or_reply::<DisplayStateRequest>(&message, responder) {
            Ok(decoded) => decoded,
            Err(mode) => return mode,
        };

        let coordinator = Arc::clone(&self.coordinator);
        reply_async(responder, async move {
            match get_display_state(&coordinator, request.scripts).await {
                Ok(scripts) => DisplayStateResponse::ok(scripts),
                Err(e) => DisplayStateResponse::failed(&e),
            }
        })
    }
}
