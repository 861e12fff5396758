//! Configuration types.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::channels::discord::DISCORD_API_BASE;
use crate::error::ConfigError;

/// Default rules file, relative to the working directory.
pub const DEFAULT_RULES_FILE: &str = "channel_config.json";

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Where rules are persisted.
    pub rules_file: PathBuf,
    /// Bot token. Without one, forwards are printed instead of sent.
    pub discord_token: Option<SecretString>,
    /// Discord REST API base URL.
    pub discord_api_base: String,
    /// Relay's own author id. Fetched from Discord when unset and a token is present.
    pub self_id: Option<u64>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            rules_file: PathBuf::from(DEFAULT_RULES_FILE),
            discord_token: None,
            discord_api_base: DISCORD_API_BASE.to_string(),
            self_id: None,
        }
    }
}

impl RelayConfig {
    /// Read configuration from `RELAY_*` / `DISCORD_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let rules_file = lookup("RELAY_RULES_FILE")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.rules_file);

        let discord_token = lookup("DISCORD_BOT_TOKEN")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(SecretString::from);

        let discord_api_base = lookup("DISCORD_API_BASE")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.discord_api_base);

        let self_id = match lookup("RELAY_SELF_ID").filter(|s| !s.trim().is_empty()) {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
                ConfigError::InvalidValue {
                    key: "RELAY_SELF_ID".into(),
                    message: e.to_string(),
                }
            })?),
            None => None,
        };

        Ok(Self {
            rules_file,
            discord_token,
            discord_api_base,
            self_id,
        })
    }
}
