//! In-page injection agent.
//!
//! Runs in the page's context and materializes code sent by the coordinator:
//! scripts as blob-backed script elements, styles as tagged style elements.

mod document;
mod handlers;
mod recording;
mod session;

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::config::AgentConfig;

pub use document::{ElementHandle, PageDocument, PageFault, ScriptOutcome, SettleCallback};
pub use handlers::agent_router;
pub use recording::{RecordingDocument, SetupStep};
pub use session::InjectionSession;

const SCRIPT_MIME_TYPE: &str = "text/javascript";

pub struct InjectionAgent<D: PageDocument> {
    doc: Arc<D>,
    style_marker: String,
}

impl<D: PageDocument> InjectionAgent<D> {
    pub fn new(doc: Arc<D>, style_marker: impl Into<String>) -> Self {
        Self {
            doc,
            style_marker: style_marker.into(),
        }
    }

    /// Agent tagging styles with the configured marker attribute.
    pub fn from_config(doc: Arc<D>, config: &AgentConfig) -> Self {
        Self::new(doc, config.style_marker.clone())
    }

    pub fn document(&self) -> &Arc<D> {
        &self.doc
    }

    /// Materialize `code` as a script element and start it.
    ///
    /// The returned receiver yields exactly one outcome: the element's load
    /// or error event, or the setup fault. A receiver error means the page
    /// discarded the element before either event fired.
    pub fn execute(&self, code: &str) -> oneshot::Receiver<ScriptOutcome> {
        let (session, rx) = InjectionSession::new(Arc::clone(&self.doc));

        if let Err(fault) = self.start(&session, code) {
            tracing::error!("Failed to inject script: {}", fault);
            session.settle(ScriptOutcome::Failed(fault.to_string()));
        }
        rx
    }

    fn start(&self, session: &Arc<InjectionSession<D>>, code: &str) -> Result<(), PageFault> {
        let url = self.doc.create_blob_url(code, SCRIPT_MIME_TYPE)?;
        session.track_blob_url(url.clone());

        let element = self.doc.create_script_element(&url)?;
        session.track_element(element);

        let settling = Arc::clone(session);
        self.doc.attach_lifecycle(
            element,
            Box::new(move |outcome| settling.settle(outcome)),
        )?;

        self.doc.append_element(element)?;
        tracing::debug!("Injected script element from {}", url);
        Ok(())
    }

    /// Insert `css` tagged with `script_id`, replacing earlier styles for it.
    pub fn apply_style(&self, script_id: &str, css: &str) -> Result<(), PageFault> {
        let replaced = self.doc.remove_tagged_styles(&self.style_marker, script_id);
        self.doc.insert_style(&self.style_marker, script_id, css)?;
        tracing::debug!("Applied style for {} (replaced {})", script_id, replaced);
        Ok(())
    }

    /// Remove every style tagged with `script_id`.
    pub fn remove_style(&self, script_id: &str) -> usize {
        self.doc.remove_tagged_styles(&self.style_marker, script_id)
    }
}
