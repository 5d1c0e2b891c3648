//! Seams to the privileged runtime: the user-script registration table and
//! the page style target.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// When a registered script runs relative to page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunAt {
    DocumentStart,
    /// After the DOM is built, before subresources finish loading.
    DocumentEnd,
    DocumentIdle,
}

/// One live binding of generated code to a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRegistration {
    pub id: String,
    pub match_pattern: String,
    pub code: String,
    pub run_at: RunAt,
}

impl ScriptRegistration {
    /// Build a registration with the fixed `document_end` timing policy.
    pub fn new(id: impl Into<String>, match_pattern: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            match_pattern: match_pattern.into(),
            code: code.into(),
            run_at: RunAt::DocumentEnd,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    NotFound,
    Duplicate,
    Unavailable,
    Other,
}

/// A fault reported by the runtime behind a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreFault {
    pub kind: FaultKind,
    pub message: String,
}

impl StoreFault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// A fault with no structured kind, known only by its message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Other, message)
    }
}

impl fmt::Display for StoreFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StoreFault {}

/// Phrasings runtimes use when an unregister targets an unknown id.
const NOT_FOUND_PHRASES: &[&str] = &[
    "nonexistent script id",
    "does not exist",
    "not found",
    "no script with id",
];

/// Whether a fault means "no such registration".
///
/// The structured kind is authoritative; faults without one are matched
/// against the known message phrasings.
pub fn is_not_found_fault(fault: &StoreFault) -> bool {
    match fault.kind {
        FaultKind::NotFound => true,
        FaultKind::Other => {
            let message = fault.message.to_lowercase();
            NOT_FOUND_PHRASES.iter().any(|phrase| message.contains(phrase))
        }
        FaultKind::Duplicate | FaultKind::Unavailable => false,
    }
}

/// The runtime's registration table.
///
/// Same-id semantics follow the browser API: registering an id that is
/// already present is a `Duplicate` fault, unregistering an unknown id is a
/// `NotFound` fault.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Zero-argument call that fails when the capability is switched off.
    async fn probe(&self) -> Result<(), StoreFault>;

    async fn register(&self, registration: ScriptRegistration) -> Result<(), StoreFault>;

    async fn unregister(&self, ids: &[String]) -> Result<(), StoreFault>;

    /// Snapshot of the live table.
    async fn get_scripts(&self) -> Result<Vec<ScriptRegistration>, StoreFault>;
}

/// Where CSS effects are inserted. Every inserted stylesheet is tagged with
/// its script id so it can be removed again.
#[async_trait]
pub trait StyleTarget: Send + Sync {
    async fn insert_css(&self, script_id: &str, css: &str) -> Result<(), StoreFault>;

    /// Remove every stylesheet tagged with `script_id`; returns whether any existed.
    async fn remove_css(&self, script_id: &str) -> Result<bool, StoreFault>;
}
