//! Layered settings for the Fermata CLI
//!
//! Loaded from a TOML file with `FERMATA_*` environment overrides. The stop
//! entries stay raw strings here; [`Settings::stop_configs`] turns them into
//! validated domain values.

use std::collections::HashSet;

use application::CoordinatorConfig;
use domain::errors::DomainError;
use domain::value_objects::{LineFilter, StopConfig, StopId};
use integration_anm::AnmConfig;
use serde::{Deserialize, Serialize};

/// One `[[stops]]` entry from the settings file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopEntry {
    /// Provider-assigned stop id
    pub stop_id: String,
    /// Display name; falls back to the stop id when blank
    #[serde(default)]
    pub stop_name: String,
    /// Optional comma-separated line allow-list
    #[serde(default)]
    pub line_filter: Option<String>,
}

/// Complete CLI settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// ANM service settings
    #[serde(default)]
    pub anm: AnmConfig,
    /// Polling settings
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    /// Monitored stops
    #[serde(default)]
    pub stops: Vec<StopEntry>,
}

impl Settings {
    /// Load settings from a file (if present) and the environment
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("FERMATA")
                    .separator("_")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Turn the raw stop entries into validated domain configuration
    pub fn stop_configs(&self) -> Result<Vec<StopConfig>, DomainError> {
        self.stops
            .iter()
            .map(|entry| {
                let stop_id = StopId::new(&entry.stop_id)?;
                let stop_name = if entry.stop_name.trim().is_empty() {
                    stop_id.to_string()
                } else {
                    entry.stop_name.trim().to_string()
                };

                let config = StopConfig::new(stop_id, stop_name);
                Ok(match LineFilter::parse_optional(entry.line_filter.as_deref())? {
                    Some(filter) => config.with_line_filter(filter),
                    None => config,
                })
            })
            .collect()
    }

    /// Validate the complete settings
    ///
    /// # Errors
    ///
    /// Returns the first problem found in any section.
    pub fn validate(&self) -> Result<(), String> {
        self.anm.validate()?;
        self.coordinator.validate()?;

        if self.stops.is_empty() {
            return Err("at least one [[stops]] entry is required".to_string());
        }

        let configs = self.stop_configs().map_err(|e| e.to_string())?;
        let mut seen = HashSet::new();
        for config in &configs {
            if !seen.insert(config.stop_id.clone()) {
                return Err(format!("stop {} is configured twice", config.stop_id));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [anm]
        timeout_secs = 15

        [coordinator]
        update_interval_secs = 120

        [[stops]]
        stop_id = "2103"
        stop_name = "Piazza Dante"
        line_filter = "151, R2"

        [[stops]]
        stop_id = "4012"
    "#;

    fn sample() -> Settings {
        toml::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn sample_settings_parse_and_validate() {
        let settings = sample();
        assert_eq!(settings.anm.timeout_secs, 15);
        assert_eq!(settings.anm.base_url, "https://srv.anm.it");
        assert_eq!(settings.coordinator.update_interval_secs, 120);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn stop_configs_are_validated_domain_values() {
        let configs = sample().stop_configs().unwrap();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].stop_name, "Piazza Dante");
        assert_eq!(
            configs[0].line_filter.as_ref().unwrap().codes(),
            ["151", "R2"]
        );
        // Blank name falls back to the stop id
        assert_eq!(configs[1].stop_name, "4012");
        assert!(configs[1].line_filter.is_none());
    }

    #[test]
    fn empty_settings_use_defaults_but_fail_validation() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.anm.timeout_secs, 10);
        assert_eq!(settings.coordinator.update_interval_secs, 60);
        // No stops configured
        assert!(settings.validate().is_err());
    }

    #[test]
    fn duplicate_stops_fail_validation() {
        let settings: Settings = toml::from_str(
            r#"
            [[stops]]
            stop_id = "2103"
            [[stops]]
            stop_id = "2103"
            "#,
        )
        .unwrap();
        let err = settings.validate().unwrap_err();
        assert!(err.contains("configured twice"));
    }

    #[test]
    fn invalid_stop_id_fails_validation() {
        let settings: Settings = toml::from_str(
            r#"
            [[stops]]
            stop_id = "dante"
            "#,
        )
        .unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn out_of_bounds_interval_fails_validation() {
        let settings: Settings = toml::from_str(
            r#"
            [coordinator]
            update_interval_secs = 5

            [[stops]]
            stop_id = "2103"
            "#,
        )
        .unwrap();
        assert!(settings.validate().is_err());
    }
}
