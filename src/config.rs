use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub transport: TransportConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TransportConfig {
    /// Base URL of the transport bridge
    pub base_url: String,
    /// Device profile the session is opened with
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommandsConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Label shown on the contact card sent by the `me` command
    #[serde(default = "default_operator_name")]
    pub operator_name: String,
    /// CDN domain profile pictures are served from
    #[serde(default = "default_profile_cdn")]
    pub profile_cdn: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            operator_name: default_operator_name(),
            profile_cdn: default_profile_cdn(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_auth_path")]
    pub path: PathBuf,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            path: default_auth_path(),
        }
    }
}

fn default_device() -> String {
    "DESKTOPWIN".to_string()
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_operator_name() -> String {
    "github.com/nezumi0627".to_string()
}

fn default_profile_cdn() -> String {
    "https://profile.line-scdn.net".to_string()
}

fn default_auth_path() -> PathBuf {
    PathBuf::from("data/auther.json")
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;

        if config.commands.prefix.is_empty() {
            anyhow::bail!("commands.prefix must not be empty");
        }
        if config.transport.base_url.is_empty() {
            anyhow::bail!("transport.base_url must not be empty");
        }

        Ok(config)
    }
}
