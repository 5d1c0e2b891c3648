use std::fmt;

/// Opaque reference to an element the document created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u64);

/// How an injected script element settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    Loaded,
    Failed(String),
}

/// Called once with the first of the element's load or error events.
pub type SettleCallback = Box<dyn FnOnce(ScriptOutcome) + Send + 'static>;

/// A fault thrown by the page while materializing code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFault(pub String);

impl fmt::Display for PageFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for PageFault {}

/// The page's document, as seen by the in-page agent.
///
/// Scripts are materialized through blob URLs rather than inline text so
/// they still run on pages whose content security policy forbids inline
/// script.
pub trait PageDocument: Send + Sync + 'static {
    /// Wrap `code` in a blob and return a revocable URL for it.
    fn create_blob_url(&self, code: &str, mime_type: &str) -> Result<String, PageFault>;

    fn revoke_blob_url(&self, url: &str);

    /// Create a detached script element loading `src`.
    fn create_script_element(&self, src: &str) -> Result<ElementHandle, PageFault>;

    /// Wire both the load and error events of `element` to `on_settle`.
    fn attach_lifecycle(&self, element: ElementHandle, on_settle: SettleCallback) -> Result<(), PageFault>;

    /// Append `element` to the document, which starts loading it.
    fn append_element(&self, element: ElementHandle) -> Result<(), PageFault>;

    /// Detach `element` if it is still in the document.
    fn remove_element(&self, element: ElementHandle);

    /// Insert a style element carrying `marker="<script_id>"`.
    fn insert_style(&self, marker: &str, script_id: &str, css: &str) -> Result<(), PageFault>;

    /// Remove every style element tagged `marker="<script_id>"`; returns how many.
    fn remove_tagged_styles(&self, marker: &str, script_id: &str) -> usize;
}
