//! Token configuration.

use chrono::Duration;
use error::ConfigError;

use crate::signer::SigningSecret;

/// Environment variable holding the signing secret.
pub const SECRET_KEY_ENV: &str = "JWT_SECRET_KEY";
/// Environment variable holding the default token lifetime in milliseconds.
pub const EXPIRATION_ENV: &str = "JWT_EXPIRATION_MS";

/// HS256 wants at least 256 bits of key material.
pub const MIN_SECRET_LEN: usize = 32;

const DEFAULT_EXPIRATION_MS: i64 = 86_400_000;

/// Token configuration.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Secret key for signing tokens
    pub secret: SigningSecret,
    /// Default token lifetime
    pub expires_in: Duration,
}

impl TokenConfig {
    /// Create a new token configuration.
    pub fn new(secret: impl Into<Vec<u8>>, expires_in: Duration) -> Self {
        Self {
            secret: SigningSecret::new(secret),
            expires_in,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(SECRET_KEY_ENV).ok_or(ConfigError::Missing(SECRET_KEY_ENV))?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                key: SECRET_KEY_ENV,
                reason: format!("must be at least {MIN_SECRET_LEN} bytes"),
            });
        }

        let expires_in_ms = match lookup(EXPIRATION_ENV) {
            Some(raw) => raw.trim().parse::<i64>().map_err(|e| ConfigError::Invalid {
                key: EXPIRATION_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_EXPIRATION_MS,
        };
        if expires_in_ms <= 0 {
            return Err(ConfigError::Invalid {
                key: EXPIRATION_ENV,
                reason: "must be positive".to_string(),
            });
        }

        tracing::info!(expires_in_ms, "Loaded token configuration");
        Ok(Self::new(secret, Duration::milliseconds(expires_in_ms)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "8gUPHuF2TcGTR4xNb5ZvEK6yJwL3mWqX1pDsAoC7fVkQrY9jM";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_expiration() {
        let config = TokenConfig::from_lookup(lookup(&[(SECRET_KEY_ENV, SECRET)])).unwrap();
        assert_eq!(config.expires_in, Duration::hours(24));
    }

    #[test]
    fn test_custom_expiration() {
        let config = TokenConfig::from_lookup(lookup(&[
            (SECRET_KEY_ENV, SECRET),
            (EXPIRATION_ENV, "300000"),
        ]))
        .unwrap();
        assert_eq!(config.expires_in, Duration::minutes(5));
    }

    #[test]
    fn test_missing_secret() {
        let result = TokenConfig::from_lookup(lookup(&[]));
        assert_eq!(result.unwrap_err(), ConfigError::Missing(SECRET_KEY_ENV));
    }

    #[test]
    fn test_short_secret() {
        let result = TokenConfig::from_lookup(lookup(&[(SECRET_KEY_ENV, "short")]));
        assert!(matches!(result, Err(ConfigError::Invalid { key: SECRET_KEY_ENV, .. })));
    }

    #[test]
    fn test_invalid_expiration() {
        for raw in ["soon", "0", "-5"] {
            let result = TokenConfig::from_lookup(lookup(&[
                (SECRET_KEY_ENV, SECRET),
                (EXPIRATION_ENV, raw),
            ]));
            assert!(matches!(result, Err(ConfigError::Invalid { key: EXPIRATION_ENV, .. })));
        }
    }
}
