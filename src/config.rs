//! Configuration management for the Skywatch monitor.
//!
//! Handles loading configuration from a TOML file and environment variable
//! overrides, and validates all settings up front. The alert engine assumes
//! a validated config — constraint violations are rejected here, never
//! during evaluation.

use crate::SkywatchError;
use crate::models::{CityInfo, TemperatureUnit, default_cities};
use crate::store::MAX_RECORDS_PER_CITY;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration for the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Weather provider settings
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Polling cadence settings
    #[serde(default)]
    pub polling: PollingConfig,
    /// Unit preferences
    #[serde(default)]
    pub units: UnitsConfig,
    /// Cities to monitor
    #[serde(default = "default_cities")]
    pub cities: Vec<CityInfo>,
    /// Per-city alert thresholds, keyed by city id. Cities without an entry
    /// use [`AlertConfig::default`].
    #[serde(default)]
    pub alerts: HashMap<String, AlertConfig>,
}

/// Weather provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// OpenWeatherMap API key. Polling stays idle without one.
    pub api_key: Option<String>,
    /// Base URL for the current-weather endpoint
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u32,
    /// Retries per fetch after the initial attempt, for rate-limit and
    /// transient failures
    #[serde(default = "default_provider_max_retries")]
    pub max_retries: u32,
}

/// Polling cadence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Minutes between polling cycles
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
}

/// Unit preferences applied when normalizing provider data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitsConfig {
    #[serde(default = "default_temperature_unit")]
    pub temperature: TemperatureUnit,
}

/// Per-city alert thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_alerts_enabled")]
    pub enabled: bool,
    #[serde(default = "default_high_temp")]
    pub high_temp: f64,
    #[serde(default = "default_low_temp")]
    pub low_temp: f64,
    /// Number of consecutive qualifying readings (current one included)
    /// required before a temperature alert fires. Must be at least 1.
    #[serde(default = "default_consecutive_readings")]
    pub consecutive_readings: u32,
    /// Single condition to watch, e.g. "Thunderstorm". Empty or "none"
    /// disables the watch.
    #[serde(default)]
    pub weather_condition: String,
}

impl AlertConfig {
    /// Whether the condition watch is active.
    #[must_use]
    pub fn watches_condition(&self) -> bool {
        !self.weather_condition.is_empty() && self.weather_condition != "none"
    }
}

// Default value functions
fn default_provider_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_provider_timeout() -> u32 {
    30
}

fn default_provider_max_retries() -> u32 {
    3
}

fn default_interval_minutes() -> u64 {
    5
}

fn default_temperature_unit() -> TemperatureUnit {
    TemperatureUnit::Celsius
}

fn default_alerts_enabled() -> bool {
    true
}

fn default_high_temp() -> f64 {
    35.0
}

fn default_low_temp() -> f64 {
    10.0
}

fn default_consecutive_readings() -> u32 {
    2
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_provider_base_url(),
            timeout_seconds: default_provider_timeout(),
            max_retries: default_provider_max_retries(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
        }
    }
}

impl Default for UnitsConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature_unit(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: default_alerts_enabled(),
            high_temp: default_high_temp(),
            low_temp: default_low_temp(),
            consecutive_readings: default_consecutive_readings(),
            weather_condition: String::new(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            polling: PollingConfig::default(),
            units: UnitsConfig::default(),
            cities: default_cities(),
            alerts: HashMap::new(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from the default file location and environment.
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from the specified path, falling back to the
    /// default location, with `SKYWATCH_`-prefixed environment overrides.
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("SKYWATCH")
                .separator("_")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let config: MonitorConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// The default configuration file path.
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("skywatch").join("config.toml"))
    }

    /// Persist the configuration to the default location, creating the
    /// directory if needed. Called after settings or thresholds change.
    pub fn save(&self) -> Result<()> {
        let dir = Self::ensure_config_dir()?;
        self.save_to_path(&dir.join("config.toml"))
    }

    /// Persist the configuration as TOML to the given path.
    pub fn save_to_path(&self, path: &std::path::Path) -> Result<()> {
        self.validate()?;
        let rendered =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize configuration")?;
        std::fs::write(path, rendered)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Create the configuration directory if it doesn't exist.
    pub fn ensure_config_dir() -> Result<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            let skywatch_config_dir = config_dir.join("skywatch");
            std::fs::create_dir_all(&skywatch_config_dir).with_context(|| {
                format!(
                    "Failed to create config directory: {}",
                    skywatch_config_dir.display()
                )
            })?;
            Ok(skywatch_config_dir)
        } else {
            Err(SkywatchError::config("Unable to determine config directory").into())
        }
    }

    /// Whether a provider credential is present (it may still be rejected
    /// by the provider).
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.provider
            .api_key
            .as_deref()
            .is_some_and(|key| !key.is_empty())
    }

    /// Alert thresholds for a city, falling back to defaults when the city
    /// has no explicit entry.
    #[must_use]
    pub fn alert_config(&self, city_id: &str) -> AlertConfig {
        self.alerts.get(city_id).cloned().unwrap_or_default()
    }

    /// Validate all configuration settings.
    pub fn validate(&self) -> Result<()> {
        self.validate_provider()?;
        self.validate_polling()?;
        self.validate_cities()?;
        self.validate_alerts()?;
        Ok(())
    }

    fn validate_provider(&self) -> Result<()> {
        if let Some(api_key) = &self.provider.api_key {
            if api_key.is_empty() {
                return Err(SkywatchError::validation(
                    "Provider API key cannot be empty if provided. Either remove it or provide a valid key."
                ).into());
            }

            if api_key.len() < 8 {
                return Err(SkywatchError::validation(
                    "Provider API key appears to be invalid (too short). Please check your API key."
                ).into());
            }

            if api_key.len() > 100 {
                return Err(SkywatchError::validation(
                    "Provider API key appears to be invalid (too long). Please check your API key."
                ).into());
            }
        }

        if !self.provider.base_url.starts_with("http://")
            && !self.provider.base_url.starts_with("https://")
        {
            return Err(SkywatchError::validation(
                "Provider base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        if self.provider.timeout_seconds == 0 || self.provider.timeout_seconds > 300 {
            return Err(SkywatchError::validation(
                "Provider timeout must be between 1 and 300 seconds",
            )
            .into());
        }

        if self.provider.max_retries > 10 {
            return Err(SkywatchError::validation(
                "Provider max retries cannot exceed 10",
            )
            .into());
        }

        Ok(())
    }

    fn validate_polling(&self) -> Result<()> {
        if self.polling.interval_minutes == 0 {
            return Err(
                SkywatchError::validation("Polling interval must be at least 1 minute").into(),
            );
        }

        if self.polling.interval_minutes > 1440 {
            return Err(SkywatchError::validation(
                "Polling interval cannot exceed 1440 minutes (24 hours)",
            )
            .into());
        }

        Ok(())
    }

    fn validate_cities(&self) -> Result<()> {
        if self.cities.is_empty() {
            return Err(SkywatchError::validation("At least one city must be configured").into());
        }

        let mut seen = std::collections::HashSet::new();
        for city in &self.cities {
            if city.id.is_empty() {
                return Err(SkywatchError::validation(format!(
                    "City '{}' has an empty id",
                    city.name
                ))
                .into());
            }
            if !seen.insert(city.id.as_str()) {
                return Err(
                    SkywatchError::validation(format!("Duplicate city id '{}'", city.id)).into(),
                );
            }
        }

        Ok(())
    }

    fn validate_alerts(&self) -> Result<()> {
        for (city_id, alert) in &self.alerts {
            if alert.consecutive_readings == 0 {
                return Err(SkywatchError::validation(format!(
                    "Alert config for '{city_id}': consecutive_readings must be at least 1"
                ))
                .into());
            }

            if alert.consecutive_readings as usize > MAX_RECORDS_PER_CITY {
                return Err(SkywatchError::validation(format!(
                    "Alert config for '{city_id}': consecutive_readings cannot exceed the \
                     retention cap of {MAX_RECORDS_PER_CITY} readings"
                ))
                .into());
            }

            if alert.high_temp <= alert.low_temp {
                return Err(SkywatchError::validation(format!(
                    "Alert config for '{city_id}': high_temp must be greater than low_temp"
                ))
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(
            config.provider.base_url,
            "https://api.openweathermap.org/data/2.5"
        );
        assert_eq!(config.provider.timeout_seconds, 30);
        assert_eq!(config.provider.max_retries, 3);
        assert_eq!(config.polling.interval_minutes, 5);
        assert_eq!(config.units.temperature, TemperatureUnit::Celsius);
        assert_eq!(config.cities.len(), 6);
        assert!(config.provider.api_key.is_none());
        assert!(!config.has_credential());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_alert_config() {
        let alert = AlertConfig::default();
        assert!(alert.enabled);
        assert_eq!(alert.high_temp, 35.0);
        assert_eq!(alert.low_temp, 10.0);
        assert_eq!(alert.consecutive_readings, 2);
        assert!(!alert.watches_condition());
    }

    #[test]
    fn test_alert_config_fallback_for_unknown_city() {
        let config = MonitorConfig::default();
        assert_eq!(config.alert_config("atlantis"), AlertConfig::default());
    }

    #[test]
    fn test_alert_config_lookup_uses_city_entry() {
        let mut config = MonitorConfig::default();
        config.alerts.insert(
            "delhi".to_string(),
            AlertConfig {
                high_temp: 42.0,
                ..AlertConfig::default()
            },
        );
        assert_eq!(config.alert_config("delhi").high_temp, 42.0);
        assert_eq!(config.alert_config("mumbai").high_temp, 35.0);
    }

    #[test]
    fn test_validation_rejects_short_api_key() {
        let mut config = MonitorConfig::default();
        config.provider.api_key = Some("short".to_string());
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("too short"));
    }

    #[test]
    fn test_validation_accepts_plausible_api_key() {
        let mut config = MonitorConfig::default();
        config.provider.api_key = Some("valid_api_key_123".to_string());
        assert!(config.validate().is_ok());
        assert!(config.has_credential());
    }

    #[test]
    fn test_validation_rejects_excessive_retries() {
        let mut config = MonitorConfig::default();
        config.provider.max_retries = 11;
        let result = config.validate();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("max retries cannot exceed 10")
        );

        config.provider.max_retries = 10;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_constraint_violations_are_validation_errors() {
        let mut config = MonitorConfig::default();
        config.polling.interval_minutes = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SkywatchError>(),
            Some(SkywatchError::Validation { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_zero_interval() {
        let mut config = MonitorConfig::default();
        config.polling.interval_minutes = 0;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("at least 1 minute"));
    }

    #[test]
    fn test_validation_rejects_zero_consecutive_readings() {
        let mut config = MonitorConfig::default();
        config.alerts.insert(
            "delhi".to_string(),
            AlertConfig {
                consecutive_readings: 0,
                ..AlertConfig::default()
            },
        );
        let result = config.validate();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("consecutive_readings must be at least 1")
        );
    }

    #[test]
    fn test_validation_rejects_inverted_thresholds() {
        let mut config = MonitorConfig::default();
        config.alerts.insert(
            "delhi".to_string(),
            AlertConfig {
                high_temp: 5.0,
                low_temp: 10.0,
                ..AlertConfig::default()
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_duplicate_city_ids() {
        let mut config = MonitorConfig::default();
        config.cities.push(CityInfo::new("delhi", "Delhi Again", 0.0, 0.0));
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Duplicate city id"));
    }

    #[test]
    fn test_validation_rejects_empty_city_list() {
        let mut config = MonitorConfig::default();
        config.cities.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_watches_condition_sentinels() {
        let mut alert = AlertConfig::default();
        assert!(!alert.watches_condition());

        alert.weather_condition = "none".to_string();
        assert!(!alert.watches_condition());

        alert.weather_condition = "Thunderstorm".to_string();
        assert!(alert.watches_condition());
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let mut config = MonitorConfig::default();
        config.alerts.insert(
            "delhi".to_string(),
            AlertConfig {
                high_temp: 40.0,
                weather_condition: "Thunderstorm".to_string(),
                ..AlertConfig::default()
            },
        );

        let path = std::env::temp_dir().join("skywatch-config-roundtrip.toml");
        config.save_to_path(&path).expect("save should succeed");

        let reloaded = MonitorConfig::load_from_path(Some(path.clone())).unwrap();
        assert_eq!(reloaded.alert_config("delhi").high_temp, 40.0);
        assert_eq!(reloaded.alert_config("delhi").weather_condition, "Thunderstorm");
        assert_eq!(reloaded.cities.len(), config.cities.len());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_save_refuses_invalid_config() {
        let mut config = MonitorConfig::default();
        config.polling.interval_minutes = 0;
        let path = std::env::temp_dir().join("skywatch-config-invalid.toml");
        assert!(config.save_to_path(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_config_path_generation() {
        let path = MonitorConfig::get_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("skywatch"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }
}
