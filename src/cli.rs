use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands;
use crate::config::Config;
use crate::error::Result;

/// Pagesmith - register and inject generated page tweaks
#[derive(Parser)]
#[command(name = "pagesmith")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, env = "PAGESMITH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as the extension's native messaging host (stdin/stdout)
    Host,

    /// Derive the site-wide match pattern for a URL
    Pattern {
        /// Target page URL (e.g., "https://www.example.com/page")
        url: String,
    },

    /// Show how to enable user scripts for a runtime version
    Guidance {
        /// Runtime major version (e.g., 138)
        #[arg(long, conflicts_with = "user_agent")]
        runtime_version: Option<u32>,

        /// Runtime user agent string to read the version from
        #[arg(long)]
        user_agent: Option<String>,
    },

    /// Classify generated code as JavaScript or CSS
    Classify {
        /// Code text (reads --file when omitted)
        #[arg(required_unless_present = "file")]
        code: Option<String>,

        /// Read the code from a file
        #[arg(short, long, conflicts_with = "code")]
        file: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Show the configuration file path
    Path,

    /// Get a configuration value
    Get {
        /// Configuration key (e.g., runtime.version)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., runtime.version)
        key: String,
        /// Configuration value
        value: String,
    },

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Configuration file this invocation reads and writes
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::config_path)
    }

    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
    }

    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Host => commands::host::run(self).await,
            Commands::Pattern { url } => commands::pattern::run(self, url).await,
            Commands::Guidance {
                runtime_version,
                user_agent,
            } => commands::guidance::run(self, *runtime_version, user_agent.as_deref()).await,
            Commands::Classify { code, file } => {
                commands::classify::run(self, code.as_deref(), file.as_deref()).await
            }
            Commands::Config { command } => commands::config::run(self, command).await,
        }
    }
}
