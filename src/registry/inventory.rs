//! Reconcile the data store's view of scripts with what is live in the runtime.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::classify::CodeKind;
use super::coordinator::Coordinator;
use super::store::ScriptRegistration;
use crate::error::RegistrationError;

/// Script record as kept by the external data store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptMetadata {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<CodeKind>,
}

/// Keep only the known scripts that are also live, in the caller's order.
pub fn display_state(known: Vec<ScriptMetadata>, active: &[ScriptRegistration]) -> Vec<ScriptMetadata> {
    let live: HashSet<&str> = active.iter().map(|r| r.id.as_str()).collect();
    known
        .into_iter()
        .filter(|script| live.contains(script.id.as_str()))
        .collect()
}

/// Intersect `known` against a fresh read of the registration table.
pub async fn get_display_state(
    coordinator: &Coordinator,
    known: Vec<ScriptMetadata>,
) -> Result<Vec<ScriptMetadata>, RegistrationError> {
    let active = coordinator.list_active().await?;
    let before = known.len();
    let shown = display_state(known, &active);
    if shown.len() != before {
        tracing::debug!(
            "{} of {} known scripts are not registered in the runtime",
            before - shown.len(),
            before
        );
    }
    Ok(shown)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: &str) -> ScriptMetadata {
        ScriptMetadata {
            id: id.to_string(),
            name: None,
            target_url: None,
            kind: None,
        }
    }

    #[test]
    fn test_intersection_by_id() {
        let known = vec![meta("a"), meta("b"), meta("c")];
        let active = vec![
            ScriptRegistration::new("c", "*://*.c.com/*", "1"),
            ScriptRegistration::new("a", "*://*.a.com/*", "1"),
            ScriptRegistration::new("orphan", "*://*.o.com/*", "1"),
        ];

        let shown: Vec<String> = display_state(known, &active)
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(shown, vec!["a", "c"]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(display_state(Vec::new(), &[]).is_empty());
        assert!(display_state(vec![meta("a")], &[]).is_empty());
    }
}
