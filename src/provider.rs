//! Weather provider interface and the OpenWeatherMap client.
//!
//! The monitor core only depends on [`WeatherProvider`]; the HTTP client
//! here is one implementation of it. Provider failures are typed so the
//! orchestrator can tell credential problems (worth surfacing to the user)
//! apart from transient network trouble. Transient and rate-limit failures
//! are retried in-fetch with exponential backoff, up to the configured
//! retry budget; whatever still fails waits for the next cycle.

use crate::config::MonitorConfig;
use crate::models::{
    CityInfo, Reading, TemperatureUnit, kelvin_to_celsius, kelvin_to_fahrenheit, round1,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// First retry delay; doubles on each subsequent retry.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Typed failures from a weather provider. All are per-city and non-fatal
/// to a polling cycle.
#[derive(Error, Debug)]
pub enum FetchError {
    /// No API key is configured.
    #[error("no API key configured")]
    MissingCredential,

    /// The provider rejected the configured API key.
    #[error("provider rejected the API key")]
    InvalidCredential,

    /// The provider throttled the request.
    #[error("provider rate limit exceeded")]
    RateLimited,

    /// Network-level or server-side failure; likely to succeed on a later
    /// cycle.
    #[error("transient fetch failure: {message}")]
    Transient { message: String },

    /// The response arrived but could not be interpreted.
    #[error("malformed provider response: {message}")]
    Malformed { message: String },
}

impl FetchError {
    /// Credential failures should be surfaced distinctly: retrying on the
    /// same cadence will not fix them.
    #[must_use]
    pub fn is_credential(&self) -> bool {
        matches!(
            self,
            FetchError::MissingCredential | FetchError::InvalidCredential
        )
    }

    /// Failures worth retrying within a single fetch. Credential and parse
    /// failures will not improve on a second attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::RateLimited | FetchError::Transient { .. }
        )
    }
}

/// Run `op` up to `max_retries + 1` times, sleeping with exponential
/// backoff between retryable failures. The last error is returned once the
/// retry budget is exhausted.
async fn with_retries<T, F, Fut>(max_retries: u32, mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(e) if e.is_retryable() && attempt < max_retries => {
                attempt += 1;
                let delay = RETRY_BASE_DELAY * 2u32.pow(attempt - 1);
                warn!(
                    "fetch attempt {} failed ({}), retrying in {:.1}s",
                    attempt,
                    e,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
            }
            result => return result,
        }
    }
}

/// Source of weather readings, one city at a time.
///
/// Implementations must be shareable across concurrent per-city fetches
/// within one polling cycle.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fetch one normalized reading for a city.
    async fn fetch_reading(&self, city: &CityInfo) -> Result<Reading, FetchError>;
}

/// OpenWeatherMap current-weather client.
pub struct OpenWeatherClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    unit: TemperatureUnit,
    max_retries: u32,
}

impl OpenWeatherClient {
    /// Build a client from the monitor configuration.
    pub fn new(config: &MonitorConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.provider.timeout_seconds.into());

        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Skywatch/0.1.0")
            .build()
            .with_context(|| "Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: config.provider.api_key.clone(),
            base_url: config.provider.base_url.clone(),
            unit: config.units.temperature,
            max_retries: config.provider.max_retries,
        })
    }

    /// One request/parse round trip, no retry handling.
    async fn request_current(&self, city: &CityInfo, api_key: &str) -> Result<Reading, FetchError> {
        let url = format!(
            "{}/weather?lat={}&lon={}&appid={}",
            self.base_url, city.lat, city.lon, api_key
        );

        debug!("requesting current weather for {}", city.name);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transient {
                message: e.to_string(),
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED => return Err(FetchError::InvalidCredential),
            StatusCode::TOO_MANY_REQUESTS => return Err(FetchError::RateLimited),
            status if !status.is_success() => {
                return Err(FetchError::Transient {
                    message: format!("HTTP {status}"),
                });
            }
            _ => {}
        }

        let body: openweather::CurrentResponse =
            response.json().await.map_err(|e| FetchError::Malformed {
                message: e.to_string(),
            })?;

        openweather::normalize(&body, city, self.unit)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    #[instrument(skip(self), fields(city = %city.id))]
    async fn fetch_reading(&self, city: &CityInfo) -> Result<Reading, FetchError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(FetchError::MissingCredential)?;

        with_retries(self.max_retries, || self.request_current(city, api_key)).await
    }
}

/// OpenWeatherMap API response structures and normalization
pub(crate) mod openweather {
    use super::{
        CityInfo, FetchError, Reading, TemperatureUnit, kelvin_to_celsius, kelvin_to_fahrenheit,
        round1,
    };
    use serde::Deserialize;

    /// Current-weather response from OpenWeatherMap. Temperatures arrive in
    /// Kelvin.
    #[derive(Debug, Deserialize)]
    pub struct CurrentResponse {
        pub weather: Vec<ConditionData>,
        pub main: MainData,
        pub wind: WindData,
        /// Observation time, epoch seconds
        pub dt: i64,
        pub name: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct ConditionData {
        pub main: String,
        pub description: String,
        pub icon: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct MainData {
        pub temp: f64,
        pub feels_like: f64,
        pub temp_min: f64,
        pub temp_max: f64,
        pub humidity: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct WindData {
        pub speed: f64,
    }

    /// Convert a raw response into a normalized [`Reading`]: temperatures
    /// in the preferred unit rounded to one decimal, calendar date and time
    /// derived from the observation timestamp in UTC.
    pub fn normalize(
        response: &CurrentResponse,
        city: &CityInfo,
        unit: TemperatureUnit,
    ) -> Result<Reading, FetchError> {
        let condition = response
            .weather
            .first()
            .ok_or_else(|| FetchError::Malformed {
                message: "response contains no weather conditions".to_string(),
            })?;

        let observed =
            chrono::DateTime::from_timestamp(response.dt, 0).ok_or_else(|| {
                FetchError::Malformed {
                    message: format!("timestamp {} out of range", response.dt),
                }
            })?;

        let convert = match unit {
            TemperatureUnit::Celsius => kelvin_to_celsius,
            TemperatureUnit::Fahrenheit => kelvin_to_fahrenheit,
        };

        Ok(Reading {
            city_id: city.id.clone(),
            city_name: response.name.clone(),
            timestamp: response.dt,
            date: observed.date_naive(),
            time: observed.time(),
            temp: convert(response.main.temp),
            feels_like: convert(response.main.feels_like),
            temp_min: convert(response.main.temp_min),
            temp_max: convert(response.main.temp_max),
            humidity: response.main.humidity,
            wind_speed: round1(response.wind.speed),
            condition: condition.main.clone(),
            description: condition.description.clone(),
            icon: condition.icon.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::openweather::{CurrentResponse, normalize};
    use super::*;
    use chrono::NaiveDate;

    fn sample_response() -> CurrentResponse {
        serde_json::from_str(
            r#"{
                "weather": [
                    { "id": 500, "main": "Rain", "description": "light rain", "icon": "10d" }
                ],
                "main": {
                    "temp": 300.15,
                    "feels_like": 302.65,
                    "temp_min": 298.15,
                    "temp_max": 301.15,
                    "pressure": 1008,
                    "humidity": 74
                },
                "wind": { "speed": 3.6, "deg": 220 },
                "dt": 1700000000,
                "name": "Delhi"
            }"#,
        )
        .expect("sample response should deserialize")
    }

    fn delhi() -> CityInfo {
        CityInfo::new("delhi", "Delhi", 28.6139, 77.2090)
    }

    #[test]
    fn test_normalize_celsius() {
        let reading = normalize(&sample_response(), &delhi(), TemperatureUnit::Celsius).unwrap();

        assert_eq!(reading.city_id, "delhi");
        assert_eq!(reading.city_name, "Delhi");
        assert_eq!(reading.temp, 27.0);
        assert_eq!(reading.feels_like, 29.5);
        assert_eq!(reading.temp_min, 25.0);
        assert_eq!(reading.temp_max, 28.0);
        assert_eq!(reading.humidity, 74.0);
        assert_eq!(reading.wind_speed, 3.6);
        assert_eq!(reading.condition, "Rain");
        assert_eq!(reading.description, "light rain");
        assert_eq!(reading.icon, "10d");
    }

    #[test]
    fn test_normalize_fahrenheit() {
        let reading =
            normalize(&sample_response(), &delhi(), TemperatureUnit::Fahrenheit).unwrap();
        assert_eq!(reading.temp, 80.6);
    }

    #[test]
    fn test_normalize_derives_utc_date() {
        let reading = normalize(&sample_response(), &delhi(), TemperatureUnit::Celsius).unwrap();
        assert_eq!(reading.timestamp, 1_700_000_000);
        assert_eq!(reading.date, NaiveDate::from_ymd_opt(2023, 11, 14).unwrap());
    }

    #[test]
    fn test_normalize_rejects_empty_conditions() {
        let mut response = sample_response();
        response.weather.clear();

        let result = normalize(&response, &delhi(), TemperatureUnit::Celsius);
        assert!(matches!(result, Err(FetchError::Malformed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_recover_from_transient_failures() {
        let attempts = std::cell::Cell::new(0u32);

        let result = with_retries(3, || {
            attempts.set(attempts.get() + 1);
            let attempt = attempts.get();
            async move {
                if attempt < 3 {
                    Err(FetchError::Transient {
                        message: "connection reset".to_string(),
                    })
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_give_up_once_budget_is_spent() {
        let attempts = std::cell::Cell::new(0u32);

        let result: Result<(), FetchError> = with_retries(2, || {
            attempts.set(attempts.get() + 1);
            async { Err(FetchError::RateLimited) }
        })
        .await;

        assert!(matches!(result, Err(FetchError::RateLimited)));
        // Initial attempt plus two retries.
        assert_eq!(attempts.get(), 3);
    }

    #[tokio::test]
    async fn test_credential_failure_is_not_retried() {
        let attempts = std::cell::Cell::new(0u32);

        let result: Result<(), FetchError> = with_retries(3, || {
            attempts.set(attempts.get() + 1);
            async { Err(FetchError::InvalidCredential) }
        })
        .await;

        assert!(matches!(result, Err(FetchError::InvalidCredential)));
        assert_eq!(attempts.get(), 1);
    }

    #[tokio::test]
    async fn test_malformed_response_is_not_retried() {
        let attempts = std::cell::Cell::new(0u32);

        let result: Result<(), FetchError> = with_retries(3, || {
            attempts.set(attempts.get() + 1);
            async {
                Err(FetchError::Malformed {
                    message: "truncated body".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(FetchError::Malformed { .. })));
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_credential_errors_are_distinguished() {
        assert!(FetchError::MissingCredential.is_credential());
        assert!(FetchError::InvalidCredential.is_credential());
        assert!(!FetchError::RateLimited.is_credential());
        assert!(
            !FetchError::Transient {
                message: "timeout".to_string()
            }
            .is_credential()
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(FetchError::RateLimited.is_retryable());
        assert!(
            FetchError::Transient {
                message: "timeout".to_string()
            }
            .is_retryable()
        );
        assert!(!FetchError::MissingCredential.is_retryable());
        assert!(!FetchError::InvalidCredential.is_retryable());
        assert!(
            !FetchError::Malformed {
                message: "bad json".to_string()
            }
            .is_retryable()
        );
    }
}
