use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{PagesmithError, Result};
use crate::registry::capability::runtime_version_from_user_agent;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Browser runtime the extension is running in
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Native messaging host settings
    #[serde(default)]
    pub host: HostConfig,

    /// In-page agent settings
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Major version of the browser runtime
    pub version: Option<u32>,

    /// Runtime user agent, parsed when `version` is not set
    pub user_agent: Option<String>,

    /// Extension id, used to link straight to the extension's details page
    pub extension_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Largest accepted native messaging frame, in bytes
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

fn default_max_message_bytes() -> usize {
    // Chrome caps native messages at 1MB
    1_048_576
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Attribute that tags injected style elements with their script id
    #[serde(default = "default_style_marker")]
    pub style_marker: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            style_marker: default_style_marker(),
        }
    }
}

fn default_style_marker() -> String {
    "data-pagesmith-script-id".to_string()
}

impl RuntimeConfig {
    /// Resolve the runtime major version.
    ///
    /// An explicit version wins, then the `Chrome/<major>` token of the user
    /// agent. Unknown runtimes resolve to 0, which selects the legacy
    /// Developer Mode guidance.
    pub fn effective_version(&self) -> u32 {
        self.version
            .or_else(|| {
                self.user_agent
                    .as_deref()
                    .and_then(runtime_version_from_user_agent)
            })
            .unwrap_or(0)
    }

    pub fn effective_extension_id(&self) -> Option<&str> {
        self.extension_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

impl Config {
    /// Load configuration from all sources (file, env, defaults)
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration using the given file in place of the default path
    pub fn load_from(config_path: &std::path::Path) -> Result<Self> {
        let config: Config = Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Config::default()))
            // Merge config file if exists
            .merge(Toml::file(config_path))
            // Merge environment variables (PAGESMITH_RUNTIME__VERSION, ...)
            .merge(Env::prefixed("PAGESMITH_").split("__"))
            .extract()
            .map_err(|e| PagesmithError::ConfigError(e.to_string()))?;

        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pagesmith")
            .join("config.toml")
    }

    /// Save configuration to `path`, creating its directory
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| PagesmithError::ConfigError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Read a single dotted key as a display string
    pub fn get_key(&self, key: &str) -> Result<Option<String>> {
        let value = match key {
            "runtime.version" => self.runtime.version.map(|v| v.to_string()),
            "runtime.user_agent" => self.runtime.user_agent.clone(),
            "runtime.extension_id" => self.runtime.extension_id.clone(),
            "host.max_message_bytes" => Some(self.host.max_message_bytes.to_string()),
            "agent.style_marker" => Some(self.agent.style_marker.clone()),
            _ => {
                return Err(PagesmithError::ConfigError(format!(
                    "Unknown config key: {}",
                    key
                )))
            }
        };
        Ok(value)
    }

    /// Set a single dotted key from its string form
    pub fn set_key(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "runtime.version" => {
                self.runtime.version = Some(value.parse().map_err(|_| {
                    PagesmithError::ConfigError("runtime.version must be a number".to_string())
                })?)
            }
            "runtime.user_agent" => self.runtime.user_agent = Some(value.to_string()),
            "runtime.extension_id" => self.runtime.extension_id = Some(value.to_string()),
            "host.max_message_bytes" => {
                self.host.max_message_bytes = value.parse().map_err(|_| {
                    PagesmithError::ConfigError(
                        "host.max_message_bytes must be a number".to_string(),
                    )
                })?
            }
            "agent.style_marker" => {
                if value.trim().is_empty() {
                    return Err(PagesmithError::ConfigError(
                        "agent.style_marker cannot be empty".to_string(),
                    ));
                }
                self.agent.style_marker = value.trim().to_string()
            }
            _ => {
                return Err(PagesmithError::ConfigError(format!(
                    "Unknown config key: {}",
                    key
                )))
            }
        }
        Ok(())
    }
}
