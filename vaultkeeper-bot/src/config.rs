//! Bot configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub database_path: PathBuf,
    /// Telegram id of the only user (and private chat) the bot serves
    pub admin_id: Option<i64>,
    /// SHA-256 hex digest of the shared password
    pub password_hash: String,
    pub session_ttl_secs: u64,
    pub session_sweep_interval_secs: u64,
    pub step_timeout_secs: u64,
    pub step_sweep_interval_secs: u64,
    pub page_size: i64,
    pub token_length: usize,
    pub poll_timeout_secs: u64,
    pub api_url: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("vaultkeeper.db"),
            admin_id: None,
            password_hash: String::new(),
            session_ttl_secs: 600,
            session_sweep_interval_secs: 5,
            step_timeout_secs: 3600,
            step_sweep_interval_secs: 60,
            page_size: 6,
            token_length: 8,
            poll_timeout_secs: 60,
            api_url: "https://api.telegram.org".to_string(),
        }
    }
}

impl BotConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_secs.max(1))
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    pub fn step_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.step_sweep_interval_secs.max(1))
    }
}
