//! Availability checks for the dynamic user-script capability.

use super::store::RegistrationStore;

/// First runtime major version that gates user scripts behind the per-extension
/// "Allow User Scripts" toggle instead of the global Developer Mode switch.
pub const ALLOW_USER_SCRIPTS_VERSION: u32 = 138;

/// Probe whether the registration capability is usable right now.
///
/// Never cached: the user can flip the toggle in the extension settings
/// between any two calls.
pub async fn is_available(store: &dyn RegistrationStore) -> bool {
    match store.probe().await {
        Ok(()) => true,
        Err(fault) => {
            tracing::debug!("User scripts capability probe failed: {}", fault);
            false
        }
    }
}

/// Build step-by-step enablement guidance for the given runtime version.
pub fn build_guidance(runtime_version: u32) -> String {
    build_guidance_for(runtime_version, None)
}

/// Like [`build_guidance`], linking straight to the extension's details page
/// when its id is known.
pub fn build_guidance_for(runtime_version: u32, extension_id: Option<&str>) -> String {
    let extensions_page = match extension_id {
        Some(id) => format!("chrome://extensions/?id={}", id),
        None => "chrome://extensions".to_string(),
    };

    if runtime_version >= ALLOW_USER_SCRIPTS_VERSION {
        format!(
            "To enable user scripts: 1. Open {} 2. Click \"Details\" on this extension \
             3. Turn on the \"Allow User Scripts\" toggle 4. Reload the page and try again.",
            extensions_page
        )
    } else {
        format!(
            "To enable user scripts: 1. Open {} 2. Turn on \"Developer Mode\" in the top \
             right corner 3. Reload the page and try again.",
            extensions_page
        )
    }
}

/// Extract the major version from a `Chrome/<major>.<...>` user agent token.
pub fn runtime_version_from_user_agent(user_agent: &str) -> Option<u32> {
    let (_, rest) = user_agent.split_once("Chrome/")?;
    let major: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    major.parse().ok()
}
