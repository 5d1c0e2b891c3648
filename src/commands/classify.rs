use std::path::Path;

use colored::Colorize;

use crate::cli::Cli;
use crate::error::{PagesmithError, Result};
use crate::registry::classify;

pub async fn run(cli: &Cli, code: Option<&str>, file: Option<&Path>) -> Result<()> {
    let code = match (code, file) {
        (Some(code), _) => code.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
            PagesmithError::Other(format!("Failed to read {}: {}", path.display(), e))
        })?,
        (None, None) => {
            return Err(PagesmithError::Other(
                "Provide the code as an argument or with --file".to_string(),
            ))
        }
    };

    let kind = classify(&code);

    if cli.json {
        println!("{}", serde_json::json!({ "kind": kind }));
    } else {
        let route = match kind {
            crate::registry::CodeKind::Js => "registered as a user script",
            crate::registry::CodeKind::Css => "inserted as a tagged stylesheet",
        };
        println!("{} {}", kind.to_string().bold(), route.dimmed());
    }

    Ok(())
}
