use colored::Colorize;

use crate::cli::Cli;
use crate::error::Result;
use crate::registry::derive_pattern;

pub async fn run(cli: &Cli, url: &str) -> Result<()> {
    let pattern = derive_pattern(url);

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "url": url,
                "pattern": pattern,
            })
        );
    } else {
        println!("{}", pattern);
        if pattern == url {
            eprintln!(
                "  {}  {}",
                "!".yellow(),
                "Not a URL with a host; using it as an exact-match pattern".dimmed()
            );
        }
    }

    Ok(())
}
