//! Register / overwrite / unregister protocol for script identities.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::capability::{self, build_guidance_for};
use super::locks::IdLocks;
use super::pattern::derive_pattern;
use super::store::{is_not_found_fault, RegistrationStore, ScriptRegistration, StyleTarget};
use crate::error::RegistrationError;

/// Outcome of an unregister: whether anything was actually removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unregistered {
    pub removed: bool,
}

/// Sole owner of the registration table. Everything else reaches the table
/// through these operations.
pub struct Coordinator {
    store: Arc<dyn RegistrationStore>,
    styles: Arc<dyn StyleTarget>,
    runtime_version: u32,
    extension_id: Option<String>,
    locks: IdLocks,
}

fn require(field: &'static str, value: &str) -> Result<(), RegistrationError> {
    if value.trim().is_empty() {
        return Err(RegistrationError::Validation(field));
    }
    Ok(())
}

impl Coordinator {
    pub fn new(store: Arc<dyn RegistrationStore>, styles: Arc<dyn StyleTarget>) -> Self {
        Self {
            store,
            styles,
            runtime_version: 0,
            extension_id: None,
            locks: IdLocks::new(),
        }
    }

    /// Runtime details used to tailor the enablement guidance.
    pub fn with_runtime(mut self, runtime_version: u32, extension_id: Option<String>) -> Self {
        self.runtime_version = runtime_version;
        self.extension_id = extension_id;
        self
    }

    pub fn guidance(&self) -> String {
        build_guidance_for(self.runtime_version, self.extension_id.as_deref())
    }

    /// Probe the capability; fails with guidance when it is switched off.
    pub async fn check_capability(&self) -> Result<(), RegistrationError> {
        if capability::is_available(self.store.as_ref()).await {
            Ok(())
        } else {
            Err(RegistrationError::CapabilityUnavailable {
                guidance: self.guidance(),
            })
        }
    }

    /// Register `code` for every page of `target_url`'s site under `id`,
    /// replacing any existing registration with that id.
    pub async fn register(
        &self,
        id: &str,
        target_url: &str,
        code: &str,
    ) -> Result<(), RegistrationError> {
        require("id", id)?;
        require("targetUrl", target_url)?;
        require("code", code)?;

        let _guard = self.locks.acquire(id).await;

        if let Err(e) = self.check_capability().await {
            tracing::warn!("Cannot register script {}: user scripts unavailable", id);
            return Err(e);
        }

        // The old registration must be gone before the new one goes in.
        match self.store.unregister(&[id.to_string()]).await {
            Ok(()) => tracing::debug!("Cleared previous registration for script {}", id),
            Err(fault) if is_not_found_fault(&fault) => {
                tracing::debug!("No previous registration for script {}", id)
            }
            Err(fault) => {
                tracing::error!(
                    "Unregister precheck failed for script {}: {}",
                    id,
                    fault
                );
                return Err(RegistrationError::UnregisterPrecheckFailed {
                    id: id.to_string(),
                    message: fault.message,
                });
            }
        }

        let pattern = derive_pattern(target_url);
        let registration = ScriptRegistration::new(id, pattern.clone(), code);

        self.store.register(registration).await.map_err(|fault| {
            tracing::error!(
                "Register failed for script {} (pattern {}): {}",
                id,
                pattern,
                fault
            );
            RegistrationError::RegisterFailed {
                id: id.to_string(),
                message: fault.message,
            }
        })?;

        tracing::info!("Registered script {} for {}", id, pattern);
        Ok(())
    }

    /// Remove the registration under `id`. An id that was never registered
    /// is already in the desired state and reports `removed: false`.
    pub async fn unregister(&self, id: &str) -> Result<Unregistered, RegistrationError> {
        require("id", id)?;

        let _guard = self.locks.acquire(id).await;

        match self.store.unregister(&[id.to_string()]).await {
            Ok(()) => {
                tracing::info!("Unregistered script {}", id);
                Ok(Unregistered { removed: true })
            }
            Err(fault) if is_not_found_fault(&fault) => {
                tracing::debug!("Script {} was not registered", id);
                Ok(Unregistered { removed: false })
            }
            Err(fault) => {
                tracing::error!("Unregister failed for script {}: {}", id, fault);
                Err(RegistrationError::UnregisterFailed {
                    id: id.to_string(),
                    message: fault.message,
                })
            }
        }
    }

    /// Live snapshot of the registration table, read from the runtime every time.
    pub async fn list_active(&self) -> Result<Vec<ScriptRegistration>, RegistrationError> {
        self.check_capability().await?;

        self.store.get_scripts().await.map_err(|fault| {
            tracing::error!("Listing registered scripts failed: {}", fault);
            RegistrationError::ListFailed(fault.message)
        })
    }

    /// Insert `css` tagged with `id`, replacing styles previously tagged with it.
    pub async fn apply_style(&self, id: &str, css: &str) -> Result<(), RegistrationError> {
        require("id", id)?;
        require("code", css)?;

        let _guard = self.locks.acquire(id).await;

        let style_failed = |fault: super::store::StoreFault| {
            tracing::error!("Style update failed for script {}: {}", id, fault);
            RegistrationError::StyleFailed {
                id: id.to_string(),
                message: fault.message,
            }
        };

        self.styles.remove_css(id).await.map_err(style_failed)?;
        self.styles.insert_css(id, css).await.map_err(style_failed)?;

        tracing::info!("Applied style for script {}", id);
        Ok(())
    }

    /// Remove every style tagged with `id`.
    pub async fn remove_style(&self, id: &str) -> Result<Unregistered, RegistrationError> {
        require("id", id)?;

        let _guard = self.locks.acquire(id).await;

        let removed = self.styles.remove_css(id).await.map_err(|fault| {
            tracing::error!("Style removal failed for script {}: {}", id, fault);
            RegistrationError::StyleFailed {
                id: id.to_string(),
                message: fault.message,
            }
        })?;

        tracing::info!("Removed style for script {} (present: {})", id, removed);
        Ok(Unregistered { removed })
    }
}
