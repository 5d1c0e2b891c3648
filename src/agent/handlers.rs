use std::sync::Arc;

use super::document::{PageDocument, ScriptOutcome};
use super::InjectionAgent;
use crate::protocol::handlers::{decode_or_reply, reply_async};
use crate::protocol::message::{
    actions, ActionResponse, ApplyStyleRequest, ExecuteScriptRequest, InboundMessage,
    RemoveStyleRequest, RemovedResponse, SenderContext,
};
use crate::protocol::router::{MessageHandler, Responder, ResponseMode, Router};

/// Build the router for messages addressed to the in-page agent.
pub fn agent_router<D: PageDocument>(agent: Arc<InjectionAgent<D>>) -> Router {
    Router::new()
        .on(actions::EXECUTE_SCRIPT, ExecuteScript { agent: agent.clone() })
        .on(actions::APPLY_STYLE, ApplyStyle { agent: agent.clone() })
        .on(actions::REMOVE_STYLE, RemoveStyle { agent })
}

struct ExecuteScript<D: PageDocument> {
    agent: Arc<InjectionAgent<D>>,
}

impl<D: PageDocument> MessageHandler for ExecuteScript<D> {
    fn handle(&self, message: InboundMessage, _sender: SenderContext, responder: Responder) -> ResponseMode {
        let (request, responder) = match decode_or_reply::<ExecuteScriptRequest>(&message, responder) {
            Ok(decoded) => decoded,
            Err(mode) => return mode,
        };

        if request.code.trim().is_empty() {
            responder.respond_with(&ActionResponse::failed("Missing required field: code"));
            return ResponseMode::Sync;
        }

        let outcome = self.agent.execute(&request.code);
        reply_async(responder, async move {
            match outcome.await {
                Ok(ScriptOutcome::Loaded) => ActionResponse::ok(),
                Ok(ScriptOutcome::Failed(reason)) => {
                    ActionResponse::failed(format!("Script failed to load: {}", reason))
                }
                Err(_) => ActionResponse::failed("Script element was discarded before it finished loading"),
            }
        })
    }
}

struct ApplyStyle<D: PageDocument> {
    agent: Arc<InjectionAgent<D>>,
}

impl<D: PageDocument> MessageHandler for ApplyStyle<D> {
    fn handle(&self, message: InboundMessage, _sender: SenderContext, responder: Responder) -> ResponseMode {
        let (request, responder) = match decode_or_reply::<ApplyStyleRequest>(&message, responder) {
            Ok(decoded) => decoded,
            Err(mode) => return mode,
        };

        let reply = if request.id.trim().is_empty() {
            ActionResponse::failed("Missing required field: id")
        } else if request.css.trim().is_empty() {
            ActionResponse::failed("Missing required field: css")
        } else {
            match self.agent.apply_style(&request.id, &request.css) {
                Ok(()) => ActionResponse::ok(),
                Err(fault) => {
                    tracing::error!("Failed to apply style for {}: {}", request.id, fault);
                    ActionResponse::failed(format!("Failed to apply style: {}", fault))
                }
            }
        };
        responder.respond_with(&reply);
        ResponseMode::Sync
    }
}

struct RemoveStyle<D: PageDocument> {
    agent: Arc<InjectionAgent<D>>,
}

impl<D: PageDocument> MessageHandler for RemoveStyle<D> {
    fn handle(&self, message: InboundMessage, _sender: SenderContext, responder: Responder) -> ResponseMode {
        let (request, responder) = match decode_or_reply::<RemoveStyleRequest>(&message, responder) {
            Ok(decoded) => decoded,
            Err(mode) => return mode,
        };

        let removed = self.agent.remove_style(&request.id);
        responder.respond_with(&RemovedResponse {
            success: true,
            removed,
        });
        ResponseMode::Sync
    }
}
