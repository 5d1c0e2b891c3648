//! Message shapes exchanged between the UI surface, the background
//! coordinator and the in-page agent.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{PagesmithError, RegistrationError, Result};
use crate::registry::{CodeKind, ScriptMetadata, ScriptRegistration};

/// Routing discriminants carried in the `action` (or `type`) field.
pub mod actions {
    pub const OPEN_SIDE_SURFACE: &str = "open-side-surface";
    pub const REGISTER_SCRIPT: &str = "register-script";
    pub const CHECK_CAPABILITY: &str = "check-capability";
    pub const REMOVE_SCRIPT_EFFECT: &str = "remove-script-effect";
    pub const LIST_REGISTERED: &str = "list-registered";
    pub const DISPLAY_STATE: &str = "display-state";
    pub const ELEMENT_SELECTED: &str = "element-selected";
    pub const EXECUTE_SCRIPT: &str = "execute-script";
    pub const APPLY_STYLE: &str = "apply-style";
    pub const REMOVE_STYLE: &str = "remove-style";
}

/// A message with its discriminant split out.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub discriminant: String,
    pub body: Value,
}

impl InboundMessage {
    /// Read the discriminant from `action`, falling back to `type`.
    /// Messages with neither are not addressed to any router.
    pub fn parse(body: Value) -> Option<Self> {
        let discriminant = ["action", "type"]
            .iter()
            .find_map(|key| body.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string)?;
        Some(Self { discriminant, body })
    }

    /// Deserialize the message body into a typed request.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.body.clone()).map_err(|e| {
            PagesmithError::ProtocolError(format!("Invalid {} payload: {}", self.discriminant, e))
        })
    }
}

/// Who sent a message, as reported by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderContext {
    #[serde(default)]
    pub tab_id: Option<i64>,
    #[serde(default)]
    pub window_id: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Script ids come from the data store and may arrive as numbers.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!("expected a string id, got {}", other))),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterScriptRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default)]
    pub target_url: String,
    #[serde(default)]
    pub code: String,
    /// Authoritative language tag; sniffed from `code` when absent.
    #[serde(default)]
    pub kind: Option<CodeKind>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveScriptEffectRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default)]
    pub code_sample: String,
    #[serde(default)]
    pub kind: Option<CodeKind>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayStateRequest {
    #[serde(default)]
    pub scripts: Vec<ScriptMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElementSelectedRequest {
    #[serde(default)]
    pub selector: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteScriptRequest {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplyStyleRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default)]
    pub css: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoveStyleRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
}

/// `{success, status?, error?, guidance?}` reply shared by most actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

impl ActionResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn ok_with_status(status: impl Into<String>) -> Self {
        Self {
            success: true,
            status: Some(status.into()),
            ..Self::default()
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        let mut error = error.to_string();
        if error.trim().is_empty() {
            error = "Unknown error".to_string();
        }
        Self {
            success: false,
            error: Some(error),
            ..Self::default()
        }
    }
}

impl From<&RegistrationError> for ActionResponse {
    fn from(err: &RegistrationError) -> Self {
        Self {
            guidance: err.guidance().map(str::to_string),
            ..Self::failed(err)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityResponse {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptsResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts: Option<Vec<T>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

impl<T> ScriptsResponse<T> {
    pub fn ok(scripts: Vec<T>) -> Self {
        Self {
            success: true,
            scripts: Some(scripts),
            error: None,
            guidance: None,
        }
    }

    pub fn failed(err: &RegistrationError) -> Self {
        Self {
            success: false,
            scripts: None,
            error: Some(err.to_string()),
            guidance: err.guidance().map(str::to_string),
        }
    }
}

pub type RegisteredScriptsResponse = ScriptsResponse<ScriptRegistration>;
pub type DisplayStateResponse = ScriptsResponse<ScriptMetadata>;

/// Status acknowledgement for page-originated notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AckResponse {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(error.into()),
        }
    }
}

/// Reply to `remove-style` from the page agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedResponse {
    pub success: bool,
    pub removed: usize,
}
