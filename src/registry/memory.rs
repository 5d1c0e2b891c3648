//! In-process runtime: a user-script table and a style target held in memory.
//!
//! The native messaging host runs against these, and the tests use them as
//! the fake runtime.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::store::{FaultKind, RegistrationStore, ScriptRegistration, StoreFault, StyleTarget};

/// User-script table with browser-equivalent fault behavior.
pub struct MemoryUserScripts {
    enabled: AtomicBool,
    scripts: Mutex<Vec<ScriptRegistration>>,
}

impl MemoryUserScripts {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            scripts: Mutex::new(Vec::new()),
        }
    }

    /// Flip the capability toggle, as the user would in the extension settings.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn check_enabled(&self) -> Result<(), StoreFault> {
        if self.is_enabled() {
            Ok(())
        } else {
            Err(StoreFault::new(
                FaultKind::Unavailable,
                "The userScripts API is not available",
            ))
        }
    }
}

impl Default for MemoryUserScripts {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistrationStore for MemoryUserScripts {
    async fn probe(&self) -> Result<(), StoreFault> {
        self.check_enabled()
    }

    async fn register(&self, registration: ScriptRegistration) -> Result<(), StoreFault> {
        self.check_enabled()?;

        if registration.match_pattern.trim().is_empty() {
            return Err(StoreFault::other(format!(
                "Script with ID '{}' must specify at least one match",
                registration.id
            )));
        }

        let mut scripts = self.scripts.lock().await;
        if scripts.iter().any(|s| s.id == registration.id) {
            return Err(StoreFault::new(
                FaultKind::Duplicate,
                format!("Duplicate script ID '{}'", registration.id),
            ));
        }
        scripts.push(registration);
        Ok(())
    }

    async fn unregister(&self, ids: &[String]) -> Result<(), StoreFault> {
        self.check_enabled()?;

        let mut scripts = self.scripts.lock().await;
        // All-or-nothing, like the browser API.
        if let Some(missing) = ids.iter().find(|id| !scripts.iter().any(|s| &s.id == *id)) {
            return Err(StoreFault::new(
                FaultKind::NotFound,
                format!("Nonexistent script ID '{}'", missing),
            ));
        }
        scripts.retain(|s| !ids.contains(&s.id));
        Ok(())
    }

    async fn get_scripts(&self) -> Result<Vec<ScriptRegistration>, StoreFault> {
        self.check_enabled()?;
        Ok(self.scripts.lock().await.clone())
    }
}

/// Style target that keeps tagged stylesheets per script id.
#[derive(Default)]
pub struct MemoryStyleTarget {
    sheets: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryStyleTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stylesheets currently tagged with `script_id`.
    pub async fn sheets_for(&self, script_id: &str) -> Vec<String> {
        self.sheets
            .lock()
            .await
            .get(script_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl StyleTarget for MemoryStyleTarget {
    async fn insert_css(&self, script_id: &str, css: &str) -> Result<(), StoreFault> {
        self.sheets
            .lock()
            .await
            .entry(script_id.to_string())
            .or_default()
            .push(css.to_string());
        Ok(())
    }

    async fn remove_css(&self, script_id: &str) -> Result<bool, StoreFault> {
        Ok(self.sheets.lock().await.remove(script_id).is_some())
    }
}
