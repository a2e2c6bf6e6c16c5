//! Configuration for the client runtime.
//!
//! Built once at startup and passed explicitly to the components that need
//! it; nothing here is a process-global.

use bazaar_sync::{FreshnessPolicy, DEFAULT_TTL_MS};
use std::env;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Time-to-live for cached query results, in milliseconds
    pub cache_ttl_ms: u64,
    /// Stable identifier for this device/install
    pub device_id: String,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// `BAZAAR_CACHE_TTL_MS` defaults to 5 minutes; `BAZAAR_DEVICE_ID`
    /// defaults to a fresh UUID.
    pub fn from_env() -> Result<Self, ConfigError> {
        let cache_ttl_ms = match env::var("BAZAAR_CACHE_TTL_MS") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidCacheTtl)?,
            Err(_) => DEFAULT_TTL_MS,
        };

        let device_id = env::var("BAZAAR_DEVICE_ID")
            .unwrap_or_else(|_| uuid::Uuid::new_v4().to_string());

        Ok(Self {
            cache_ttl_ms,
            device_id,
        })
    }

    /// The freshness policy derived from the configured ttl.
    pub fn freshness(&self) -> FreshnessPolicy {
        FreshnessPolicy::new(self.cache_ttl_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: DEFAULT_TTL_MS,
            device_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid BAZAAR_CACHE_TTL_MS value")]
    InvalidCacheTtl,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.cache_ttl_ms, DEFAULT_TTL_MS);
        assert!(!config.device_id.is_empty());
        assert_eq!(config.freshness().ttl_ms, DEFAULT_TTL_MS);
    }

    // One test for all the env cases; env vars are process-global and the
    // test harness runs tests in parallel.
    #[test]
    fn from_env_reads_and_validates_ttl() {
        env::set_var("BAZAAR_CACHE_TTL_MS", "42000");
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.cache_ttl_ms, 42_000);

        env::set_var("BAZAAR_CACHE_TTL_MS", "five minutes");
        assert!(matches!(
            ClientConfig::from_env(),
            Err(ConfigError::InvalidCacheTtl)
        ));

        env::remove_var("BAZAAR_CACHE_TTL_MS");
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.cache_ttl_ms, DEFAULT_TTL_MS);
        assert!(!config.device_id.is_empty());
    }
}
