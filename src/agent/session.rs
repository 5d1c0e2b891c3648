use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use super::document::{ElementHandle, PageDocument, ScriptOutcome};

#[derive(Default)]
struct Resources {
    blob_url: Option<String>,
    element: Option<ElementHandle>,
}

/// One in-flight script materialization.
///
/// Owns the blob URL and the script element until cleanup, which runs at
/// most once per resource no matter how often it is triggered: on load, on
/// error, on a setup fault, and finally on drop.
pub struct InjectionSession<D: PageDocument> {
    doc: Arc<D>,
    resources: Mutex<Resources>,
    reply: Mutex<Option<oneshot::Sender<ScriptOutcome>>>,
}

impl<D: PageDocument> InjectionSession<D> {
    pub fn new(doc: Arc<D>) -> (Arc<Self>, oneshot::Receiver<ScriptOutcome>) {
        let (tx, rx) = oneshot::channel();
        let session = Arc::new(Self {
            doc,
            resources: Mutex::new(Resources::default()),
            reply: Mutex::new(Some(tx)),
        });
        (session, rx)
    }

    pub(crate) fn track_blob_url(&self, url: String) {
        self.lock_resources().blob_url = Some(url);
    }

    pub(crate) fn track_element(&self, element: ElementHandle) {
        self.lock_resources().element = Some(element);
    }

    fn lock_resources(&self) -> std::sync::MutexGuard<'_, Resources> {
        self.resources.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Remove the element and revoke the blob URL. Safe to call any number of times.
    pub fn cleanup(&self) {
        let (element, blob_url) = {
            let mut resources = self.lock_resources();
            (resources.element.take(), resources.blob_url.take())
        };

        if let Some(element) = element {
            self.doc.remove_element(element);
        }
        if let Some(url) = blob_url {
            self.doc.revoke_blob_url(&url);
        }
    }

    /// Clean up and deliver `outcome`. Only the first settle is reported.
    pub fn settle(&self, outcome: ScriptOutcome) {
        self.cleanup();

        let reply = self.reply.lock().unwrap_or_else(|e| e.into_inner()).take();
        match reply {
            Some(tx) => {
                if let ScriptOutcome::Failed(ref reason) = outcome {
                    tracing::warn!("Injected script failed: {}", reason);
                }
                let _ = tx.send(outcome);
            }
            None => tracing::debug!("Injection session already settled, ignoring {:?}", outcome),
        }
    }
}

impl<D: PageDocument> Drop for InjectionSession<D> {
    fn drop(&mut self) {
        self.cleanup();
    }
}
