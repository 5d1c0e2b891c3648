//! Cross-context message protocol: message shapes, routing, and framing.

pub mod handlers;
pub mod message;
pub mod native;
pub mod router;

pub use handlers::{coordinator_router, SurfaceEvent, SurfaceEvents};
pub use message::{actions, InboundMessage, SenderContext};
pub use router::{MessageHandler, PendingResponse, Responder, ResponseMode, Routed, Router};
