use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Language of a generated code effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeKind {
    #[serde(alias = "javascript")]
    Js,
    Css,
}

impl CodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeKind::Js => "js",
            CodeKind::Css => "css",
        }
    }

    /// Use the caller's tag when given, otherwise sniff the code.
    pub fn resolve(tag: Option<CodeKind>, code: &str) -> CodeKind {
        tag.unwrap_or_else(|| classify(code))
    }
}

impl fmt::Display for CodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "js" | "javascript" => Ok(CodeKind::Js),
            "css" => Ok(CodeKind::Css),
            other => Err(format!("Unknown code kind: {}", other)),
        }
    }
}

const JS_KEYWORDS: &[&str] = &["function", "const", "let", "var", "document", "window", "=>"];

/// Keyword heuristic: anything mentioning a JS keyword is JavaScript, the
/// rest is CSS. Plain substring matching, so CSS comments mentioning
/// `const` are misread as JavaScript.
pub fn classify(code: &str) -> CodeKind {
    if JS_KEYWORDS.iter().any(|kw| code.contains(kw)) {
        CodeKind::Js
    } else {
        CodeKind::Css
    }
}
