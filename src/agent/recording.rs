//! A document that records what the agent does to it.
//!
//! Stands in for a browser page wherever no real DOM exists: in tests and
//! when driving the agent from the command line.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::document::{ElementHandle, PageDocument, PageFault, ScriptOutcome, SettleCallback};

/// Setup step that can be made to fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    CreateBlobUrl,
    CreateElement,
    AttachLifecycle,
    Append,
}

#[derive(Default)]
struct State {
    next_id: u64,
    blob_urls: HashMap<String, String>,
    revocations: HashMap<String, usize>,
    elements: HashMap<ElementHandle, String>,
    attached: HashSet<ElementHandle>,
    removals: HashMap<ElementHandle, usize>,
    callbacks: HashMap<ElementHandle, SettleCallback>,
    styles: Vec<(String, String, String)>,
    fail_at: Option<SetupStep>,
}

#[derive(Default)]
pub struct RecordingDocument {
    state: Mutex<State>,
    /// Settle scripts as soon as they are appended.
    auto_settle: Option<ScriptOutcome>,
}

impl RecordingDocument {
    /// Scripts stay pending until [`RecordingDocument::settle_all`] is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts load the moment they are appended.
    pub fn auto_loading() -> Self {
        Self {
            state: Mutex::default(),
            auto_settle: Some(ScriptOutcome::Loaded),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the next run of `step` fault.
    pub fn fail_next(&self, step: SetupStep) {
        self.lock().fail_at = Some(step);
    }

    fn check_fault(state: &mut State, step: SetupStep) -> Result<(), PageFault> {
        if state.fail_at == Some(step) {
            state.fail_at = None;
            return Err(PageFault(format!("{:?} failed", step)));
        }
        Ok(())
    }

    /// Fire the settle event of every pending script element.
    pub fn settle_all(&self, outcome: ScriptOutcome) -> usize {
        let callbacks: Vec<SettleCallback> = {
            let mut state = self.lock();
            let pending: Vec<ElementHandle> = state
                .callbacks
                .keys()
                .filter(|el| state.attached.contains(*el))
                .copied()
                .collect();
            pending
                .iter()
                .filter_map(|el| state.callbacks.remove(el))
                .collect()
        };
        let count = callbacks.len();
        // Callbacks re-enter the document, so they run without the lock.
        for callback in callbacks {
            callback(outcome.clone());
        }
        count
    }

    pub fn live_blob_urls(&self) -> usize {
        self.lock().blob_urls.len()
    }

    /// Blob code by URL, while not revoked.
    pub fn blob_code(&self, url: &str) -> Option<String> {
        self.lock().blob_urls.get(url).cloned()
    }

    pub fn live_elements(&self) -> usize {
        self.lock().attached.len()
    }

    /// Revocations per URL, counting repeats.
    pub fn revocation_counts(&self) -> Vec<usize> {
        self.lock().revocations.values().copied().collect()
    }

    /// Removals per element, counting repeats.
    pub fn removal_counts(&self) -> Vec<usize> {
        self.lock().removals.values().copied().collect()
    }

    /// Marker attributes carried by the styles tagged with `script_id`.
    pub fn markers_for(&self, script_id: &str) -> Vec<String> {
        self.lock()
            .styles
            .iter()
            .filter(|(_, id, _)| id == script_id)
            .map(|(marker, _, _)| marker.clone())
            .collect()
    }

    /// Tagged stylesheets for `script_id`.
    pub fn styles_for(&self, script_id: &str) -> Vec<String> {
        self.lock()
            .styles
            .iter()
            .filter(|(_, id, _)| id == script_id)
            .map(|(_, _, css)| css.clone())
            .collect()
    }
}

impl PageDocument for RecordingDocument {
    fn create_blob_url(&self, code: &str, _mime_type: &str) -> Result<String, PageFault> {
        let mut state = self.lock();
        Self::check_fault(&mut state, SetupStep::CreateBlobUrl)?;
        state.next_id += 1;
        let url = format!("blob:https://page.test/{}", state.next_id);
        state.blob_urls.insert(url.clone(), code.to_string());
        Ok(url)
    }

    fn revoke_blob_url(&self, url: &str) {
        let mut state = self.lock();
        state.blob_urls.remove(url);
        *state.revocations.entry(url.to_string()).or_default() += 1;
    }

    fn create_script_element(&self, src: &str) -> Result<ElementHandle, PageFault> {
        let mut state = self.lock();
        Self::check_fault(&mut state, SetupStep::CreateElement)?;
        state.next_id += 1;
        let element = ElementHandle(state.next_id);
        state.elements.insert(element, src.to_string());
        Ok(element)
    }

    fn attach_lifecycle(&self, element: ElementHandle, on_settle: SettleCallback) -> Result<(), PageFault> {
        let mut state = self.lock();
        Self::check_fault(&mut state, SetupStep::AttachLifecycle)?;
        state.callbacks.insert(element, on_settle);
        Ok(())
    }

    fn append_element(&self, element: ElementHandle) -> Result<(), PageFault> {
        let callback = {
            let mut state = self.lock();
            Self::check_fault(&mut state, SetupStep::Append)?;
            if !state.elements.contains_key(&element) {
                return Err(PageFault(format!("Unknown element {:?}", element)));
            }
            state.attached.insert(element);
            match self.auto_settle {
                Some(_) => state.callbacks.remove(&element),
                None => None,
            }
        };

        if let (Some(callback), Some(outcome)) = (callback, self.auto_settle.clone()) {
            callback(outcome);
        }
        Ok(())
    }

    fn remove_element(&self, element: ElementHandle) {
        let dropped = {
            let mut state = self.lock();
            state.attached.remove(&element);
            state.elements.remove(&element);
            *state.removals.entry(element).or_default() += 1;
            state.callbacks.remove(&element)
        };
        // May hold the last reference to a session, whose drop re-enters.
        drop(dropped);
    }

    fn insert_style(&self, marker: &str, script_id: &str, css: &str) -> Result<(), PageFault> {
        self.lock()
            .styles
            .push((marker.to_string(), script_id.to_string(), css.to_string()));
        Ok(())
    }

    fn remove_tagged_styles(&self, marker: &str, script_id: &str) -> usize {
        let mut state = self.lock();
        let before = state.styles.len();
        state
            .styles
            .retain(|(m, id, _)| !(m == marker && id == script_id));
        before - state.styles.len()
    }
}
