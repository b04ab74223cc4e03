//! Core domain types shared by the store, aggregator and alert engine.
//!
//! This module defines data only — no I/O and no provider-specific shapes.
//! Raw API responses live next to the client that parses them.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A city tracked by the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityInfo {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl CityInfo {
    pub fn new<S: Into<String>>(id: S, name: S, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lat,
            lon,
        }
    }
}

/// The default city set monitored when no configuration is supplied.
#[must_use]
pub fn default_cities() -> Vec<CityInfo> {
    vec![
        CityInfo::new("delhi", "Delhi", 28.6139, 77.2090),
        CityInfo::new("mumbai", "Mumbai", 19.0760, 72.8777),
        CityInfo::new("chennai", "Chennai", 13.0827, 80.2707),
        CityInfo::new("bangalore", "Bangalore", 12.9716, 77.5946),
        CityInfo::new("kolkata", "Kolkata", 22.5726, 88.3639),
        CityInfo::new("hyderabad", "Hyderabad", 17.3850, 78.4867),
    ]
}

/// Temperature unit preference applied when normalizing provider data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Unit symbol for display and alert messages.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemperatureUnit::Celsius => write!(f, "celsius"),
            TemperatureUnit::Fahrenheit => write!(f, "fahrenheit"),
        }
    }
}

/// One normalized weather observation for a city at a point in time.
///
/// Temperatures are already converted to the configured unit and rounded to
/// one decimal. Immutable once created — the store never rewrites readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub city_id: String,
    pub city_name: String,
    /// Observation time as epoch seconds, as reported by the provider.
    pub timestamp: i64,
    /// Calendar day derived from `timestamp` in UTC. Daily summaries group
    /// on this field.
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
    /// Wind speed in m/s.
    pub wind_speed: f64,
    /// Coarse condition category, e.g. "Rain" or "Clear".
    pub condition: String,
    pub description: String,
    pub icon: String,
}

/// Aggregate statistics over all readings sharing one calendar date for one
/// city. Always rebuilt from the full reading set, never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub city_id: String,
    pub date: NaiveDate,
    pub avg_temp: f64,
    pub min_temp: f64,
    pub max_temp: f64,
    /// Most frequent condition; ties go to the condition observed first.
    pub dominant_condition: String,
    /// Condition occurrence counts in first-observed order. Kept ordered so
    /// recomputing from the same readings yields an identical summary.
    pub condition_counts: Vec<(String, u32)>,
    pub avg_humidity: f64,
    pub avg_wind_speed: f64,
    /// The readings the summary was computed from, newest first.
    pub readings: Vec<Reading>,
}

/// What kind of threshold produced an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HighTemp,
    LowTemp,
    WeatherCondition,
}

impl AlertKind {
    /// Stable identifier used in alert ids.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::HighTemp => "high_temp",
            AlertKind::LowTemp => "low_temp",
            AlertKind::WeatherCondition => "weather_condition",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Observed value or configured threshold carried on an alert. Temperature
/// alerts carry numbers, condition alerts carry the condition name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AlertValue {
    Temperature(f64),
    Condition(String),
}

impl fmt::Display for AlertValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertValue::Temperature(t) => write!(f, "{t}"),
            AlertValue::Condition(c) => write!(f, "{c}"),
        }
    }
}

/// A triggered alert as kept in the bounded alert log.
///
/// The id is derived from `(city, kind, timestamp)`, so re-evaluating the
/// same reading can never produce a second distinguishable alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub city_id: String,
    pub timestamp: i64,
    pub kind: AlertKind,
    pub message: String,
    pub value: AlertValue,
    pub threshold: AlertValue,
    pub acknowledged: bool,
}

impl Alert {
    /// Deterministic alert id for a `(city, kind, timestamp)` triple.
    #[must_use]
    pub fn make_id(city_id: &str, kind: AlertKind, timestamp: i64) -> String {
        format!("{city_id}-{}-{timestamp}", kind.as_str())
    }
}

/// Round to one decimal place, halves away from zero.
///
/// All derived statistics (averages, converted temperatures) pass through
/// this so repeated computation over the same inputs is bit-identical.
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Convert a Kelvin temperature to Celsius, rounded to one decimal.
#[must_use]
pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    round1(kelvin - 273.15)
}

/// Convert a Kelvin temperature to Fahrenheit, rounded to one decimal.
#[must_use]
pub fn kelvin_to_fahrenheit(kelvin: f64) -> f64 {
    round1((kelvin - 273.15) * 9.0 / 5.0 + 32.0)
}
