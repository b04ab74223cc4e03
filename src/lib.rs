//! Skywatch - city weather monitoring
//!
//! This library polls a weather provider for a configured set of cities,
//! keeps a bounded rolling history of readings per city, derives daily
//! statistical summaries, and raises threshold-based alerts.

pub mod alert;
pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod provider;
pub mod store;
pub mod summary;

// Re-export core types for public API
pub use alert::{AlertEngine, MAX_ALERTS};
pub use config::{AlertConfig, MonitorConfig};
pub use error::SkywatchError;
pub use models::{Alert, AlertKind, AlertValue, CityInfo, DailySummary, Reading, TemperatureUnit};
pub use monitor::{CycleOutcome, WeatherMonitor};
pub use provider::{FetchError, OpenWeatherClient, WeatherProvider};
pub use store::{MAX_RECORDS_PER_CITY, ReadingStore};
pub use summary::SummaryAggregator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, SkywatchError>;
