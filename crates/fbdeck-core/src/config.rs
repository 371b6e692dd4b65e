//! Configuration management for fbdeck.
//!
//! Loads configuration from ${FBDECK_HOME}/config.toml with sensible defaults.
//! Nothing session-related is ever written here.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::bootstrap::{DEFAULT_API_VERSION, SdkSettings};
use crate::graph::GraphOptions;

/// Returns the default config template with comments.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for fbdeck configuration and log directories.
    //!
    //! FBDECK_HOME resolution order:
    //! 1. FBDECK_HOME environment variable (if set)
    //! 2. ~/.config/fbdeck (default)

    use std::path::PathBuf;

    /// Returns the fbdeck home directory.
    pub fn fbdeck_home() -> PathBuf {
        if let Ok(home) = std::env::var("FBDECK_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map_or_else(|| PathBuf::from(".fbdeck"), |h| h.join(".config").join("fbdeck"))
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        fbdeck_home().join("config.toml")
    }

    /// Returns the directory log files are written to.
    pub fn logs_dir() -> PathBuf {
        fbdeck_home().join("logs")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Facebook App ID
    pub app_id: String,

    /// Optional app secret for the code exchange
    pub app_secret: Option<String>,

    /// Graph API version (e.g. "v18.0")
    pub api_version: String,

    pub graph_base_url: String,

    pub dialog_base_url: String,

    /// Keep platform cookies between calls
    pub cookie: bool,

    /// Local port for the OAuth redirect; random when unset
    pub callback_port: Option<u16>,

    /// How long to wait for the OAuth redirect, in seconds
    pub login_timeout_secs: u64,

    /// Revoke app permissions on logout
    pub revoke_on_logout: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_secret: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            graph_base_url: Self::DEFAULT_GRAPH_BASE_URL.to_string(),
            dialog_base_url: Self::DEFAULT_DIALOG_BASE_URL.to_string(),
            cookie: true,
            callback_port: None,
            login_timeout_secs: Self::DEFAULT_LOGIN_TIMEOUT_SECS,
            revoke_on_logout: false,
        }
    }
}

impl Config {
    pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.facebook.com";
    pub const DEFAULT_DIALOG_BASE_URL: &str = "https://www.facebook.com";
    const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 120;

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to move config into {}", path.display()))
    }

    /// Settings for the SDK `init` call. The app id is not validated here;
    /// a bad one fails the SDK load.
    pub fn sdk_settings(&self) -> SdkSettings {
        SdkSettings {
            app_id: resolve_value(Some(&self.app_id), "FBDECK_APP_ID").unwrap_or_default(),
            cookie: self.cookie,
            api_version: self.api_version.trim().to_string(),
        }
    }

    /// Transport options for the Graph SDK.
    ///
    /// # Errors
    /// Returns an error if a configured base URL is malformed.
    pub fn graph_options(&self) -> Result<GraphOptions> {
        Ok(GraphOptions {
            graph_base_url: resolve_base_url(
                Some(&self.graph_base_url),
                "FBDECK_GRAPH_BASE_URL",
                Self::DEFAULT_GRAPH_BASE_URL,
            )?,
            dialog_base_url: resolve_base_url(
                Some(&self.dialog_base_url),
                "FBDECK_DIALOG_BASE_URL",
                Self::DEFAULT_DIALOG_BASE_URL,
            )?,
            app_secret: resolve_value(self.app_secret.as_deref(), "FBDECK_APP_SECRET"),
            callback_port: self.callback_port,
            login_timeout: self.login_timeout(),
            revoke_on_logout: self.revoke_on_logout,
            open_browser: std::env::var("FBDECK_NO_BROWSER").is_err(),
        })
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs.max(1))
    }
}

/// Resolves a value with precedence: env > config.
fn resolve_value(config_value: Option<&str>, env_var: &str) -> Option<String> {
    let non_empty = |value: &str| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    };

    std::env::var(env_var)
        .ok()
        .and_then(|v| non_empty(&v))
        .or_else(|| config_value.and_then(non_empty))
}

/// Resolves a base URL with precedence: env > config > default.
fn resolve_base_url(config_base_url: Option<&str>, env_var: &str, default_url: &str) -> Result<String> {
    let url = resolve_value(config_base_url, env_var).unwrap_or_else(|| default_url.to_string());
    url::Url::parse(&url).with_context(|| format!("Invalid base URL: {url}"))?;
    Ok(url.trim_end_matches('/').to_string())
}
