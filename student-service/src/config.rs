use auth::TokenConfig;
use error::ConfigError;

use crate::models::DEFAULT_ROLE;

/// Role assigned at signup
pub const DEFAULT_ROLE_ENV: &str = "DEFAULT_ROLE";

/// Student service configuration
#[derive(Debug, Clone)]
pub struct StudentServiceConfig {
    /// Token signing and lifetime settings
    pub token: TokenConfig,

    /// Role given to newly registered accounts
    pub default_role: String,
}

impl StudentServiceConfig {
    pub fn new(token: TokenConfig) -> Self {
        Self {
            token,
            default_role: DEFAULT_ROLE.to_string(),
        }
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(TokenConfig::from_lookup(&lookup)?);

        if let Some(role) = lookup(DEFAULT_ROLE_ENV) {
            let role = role.trim().to_uppercase();
            if role.is_empty() {
                return Err(ConfigError::Invalid {
                    key: DEFAULT_ROLE_ENV,
                    reason: "must not be blank".to_string(),
                });
            }
            config.default_role = role;
        }

        Ok(config)
    }
}
