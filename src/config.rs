// ABOUTME: Configuration loading for wabridge.
// ABOUTME: Reads ~/.wabridge/config.toml (or an explicit path), then applies env and CLI overrides.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::transport::BrowserInfo;

/// Environment variable that overrides `server.token`.
pub const TOKEN_ENV: &str = "WABRIDGE_TOKEN";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub credentials: CredentialsConfig,
    pub transport: TransportConfig,
    pub reconnect: ReconnectConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener and its fixed bearer token.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub token: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            token: String::new(),
        }
    }
}

/// Where session credential namespaces live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub root: PathBuf,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./auth"),
        }
    }
}

/// Options passed to every transport connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub driver: String,
    pub browser: BrowserInfo,
    pub sync_full_history: bool,
    pub mark_online_on_connect: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            driver: "memory".to_string(),
            browser: BrowserInfo::default(),
            sync_full_history: false,
            mark_online_on_connect: false,
        }
    }
}

/// What the supervisor does when re-establishing a connection fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Leave the session Disconnected until someone re-creates it.
    GiveUp,
    /// Keep re-establishing after `failure_retry_delay_ms`.
    Retry,
}

/// Automatic reconnection behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Pause before each automatic reconnect. Zero reconnects immediately.
    pub delay_ms: u64,
    pub on_failure: FailurePolicy,
    pub failure_retry_delay_ms: u64,
    /// Wipe the namespace and pair again when the transport reports a bad session.
    pub reset_on_bad_session: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay_ms: 0,
            on_failure: FailurePolicy::GiveUp,
            failure_retry_delay_ms: 5000,
            reset_on_bad_session: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load config from `path`, or ~/.wabridge/config.toml, falling back to defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Path to the default config file.
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".wabridge")
            .join("config.toml")
    }

    /// Replace the server token when an override is present and non-empty.
    pub fn apply_token_override(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.server.token = token.trim().to_string();
        }
    }

    /// Fail closed: the HTTP layer must never run without a token.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.token.trim().is_empty() {
            anyhow::bail!(
                "server.token is empty; set it in the config file or via {}",
                TOKEN_ENV
            );
        }
        if self.transport.driver != "memory" {
            anyhow::bail!(
                "Unknown transport driver: '{}'. Expected: memory",
                self.transport.driver
            );
        }
        Ok(())
    }
}
