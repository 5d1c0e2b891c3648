use colored::Colorize;

use crate::cli::{Cli, ConfigCommands};
use crate::config::Config;
use crate::error::{PagesmithError, Result};

pub async fn run(cli: &Cli, command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => show(cli).await,
        ConfigCommands::Path => path(cli).await,
        ConfigCommands::Get { key } => get(cli, key).await,
        ConfigCommands::Set { key, value } => set(cli, key, value).await,
        ConfigCommands::Init { force } => init(cli, *force).await,
    }
}

async fn show(cli: &Cli) -> Result<()> {
    let config = cli.load_config()?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| PagesmithError::ConfigError(e.to_string()))?;
        println!("{}", toml_str);
    }

    Ok(())
}

async fn path(cli: &Cli) -> Result<()> {
    let path = cli.config_path();

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "path": path.display().to_string()
            })
        );
    } else {
        println!("{}", path.display());
    }

    Ok(())
}

async fn get(cli: &Cli, key: &str) -> Result<()> {
    let config = cli.load_config()?;
    let value = config.get_key(key)?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "key": key,
                "value": value
            })
        );
    } else {
        match value {
            Some(v) => println!("{}", v),
            None => println!("{}", "(not set)".dimmed()),
        }
    }

    Ok(())
}

async fn set(cli: &Cli, key: &str, value: &str) -> Result<()> {
    let path = cli.config_path();
    let mut config = cli.load_config()?;
    config.set_key(key, value)?;
    config.save_to(&path)?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "key": key, "value": value, "path": path.display().to_string() })
        );
    } else {
        println!("{} Set {} = {}", "✓".green(), key, value);
    }

    Ok(())
}

async fn init(cli: &Cli, force: bool) -> Result<()> {
    let path = cli.config_path();

    if path.exists() && !force {
        return Err(PagesmithError::ConfigError(format!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        )));
    }

    Config::default().save_to(&path)?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "status": "created", "path": path.display().to_string() })
        );
    } else {
        println!(
            "{} Config written: {}",
            "✓".green(),
            path.display().to_string().dimmed()
        );
    }

    Ok(())
}
