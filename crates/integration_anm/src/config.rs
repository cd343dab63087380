//! ANM service configuration

use serde::{Deserialize, Serialize};

/// Minimum accepted request timeout
pub const MIN_TIMEOUT_SECS: u64 = 5;
/// Maximum accepted request timeout
pub const MAX_TIMEOUT_SECS: u64 = 60;

/// Configuration for the ANM API client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnmConfig {
    /// Base URL of the ANM service API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// URL of the legacy InfoClick page the API key is scraped from
    #[serde(default = "default_key_page_url")]
    pub key_page_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Stop directory cache TTL in minutes (0 to disable caching)
    #[serde(default = "default_stops_cache_ttl_minutes")]
    pub stops_cache_ttl_minutes: u32,
}

fn default_base_url() -> String {
    "https://srv.anm.it".to_string()
}

fn default_key_page_url() -> String {
    "https://www2.anm.it/infoclick/infoclick.php".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_stops_cache_ttl_minutes() -> u32 {
    60
}

impl Default for AnmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            key_page_url: default_key_page_url(),
            timeout_secs: default_timeout_secs(),
            stops_cache_ttl_minutes: default_stops_cache_ttl_minutes(),
        }
    }
}

impl AnmConfig {
    /// Create a configuration suitable for testing
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            timeout_secs: 5,
            stops_cache_ttl_minutes: 0,
            ..Default::default()
        }
    }

    /// Check if stop directory caching is enabled
    #[must_use]
    pub const fn caching_enabled(&self) -> bool {
        self.stops_cache_ttl_minutes > 0
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base_url must not be empty".to_string());
        }

        if self.key_page_url.is_empty() {
            return Err("key_page_url must not be empty".to_string());
        }

        if self.timeout_secs < MIN_TIMEOUT_SECS || self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(format!(
                "timeout_secs must be between {MIN_TIMEOUT_SECS} and {MAX_TIMEOUT_SECS}, got {}",
                self.timeout_secs
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnmConfig::default();
        assert_eq!(config.base_url, "https://srv.anm.it");
        assert_eq!(config.key_page_url, "https://www2.anm.it/infoclick/infoclick.php");
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.stops_cache_ttl_minutes, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_testing_config() {
        let config = AnmConfig::for_testing();
        assert_eq!(config.timeout_secs, 5);
        assert!(!config.caching_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_base_url() {
        let config = AnmConfig {
            base_url: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_empty_key_page_url() {
        let config = AnmConfig {
            key_page_url: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_timeout_bounds() {
        let too_low = AnmConfig {
            timeout_secs: 4,
            ..Default::default()
        };
        assert!(too_low.validate().is_err());

        let too_high = AnmConfig {
            timeout_secs: 61,
            ..Default::default()
        };
        assert!(too_high.validate().is_err());

        let at_bounds = AnmConfig {
            timeout_secs: 5,
            ..Default::default()
        };
        assert!(at_bounds.validate().is_ok());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = AnmConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: AnmConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.base_url, config.base_url);
        assert_eq!(deserialized.timeout_secs, config.timeout_secs);
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: AnmConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.base_url, "https://srv.anm.it");
        assert_eq!(config.timeout_secs, 10);
    }
}
