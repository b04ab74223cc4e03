//! Threshold alert evaluation and the bounded alert log.
//!
//! Evaluation is a pure decision over (current reading, prior readings,
//! per-city config); the engine then owns the global newest-first log with
//! acknowledgement state. There is deliberately no cooldown beyond the
//! consecutive-readings gate: repeated qualifying readings at different
//! timestamps produce separate alerts, while re-evaluating the same reading
//! yields the same alert id.

use crate::config::AlertConfig;
use crate::models::{Alert, AlertKind, AlertValue, Reading, TemperatureUnit};
use std::collections::VecDeque;

/// Maximum number of alerts retained in the global log.
pub const MAX_ALERTS: usize = 50;

/// Evaluates readings against per-city thresholds and keeps the alert log.
/// The unit only affects message wording; readings and thresholds already
/// share the configured unit.
#[derive(Debug)]
pub struct AlertEngine {
    log: VecDeque<Alert>,
    capacity: usize,
    unit: TemperatureUnit,
}

impl AlertEngine {
    #[must_use]
    pub fn new(unit: TemperatureUnit) -> Self {
        Self::with_capacity(unit, MAX_ALERTS)
    }

    #[must_use]
    pub fn with_capacity(unit: TemperatureUnit, capacity: usize) -> Self {
        Self {
            log: VecDeque::new(),
            capacity,
            unit,
        }
    }

    /// Evaluate a freshly appended reading against its city's thresholds.
    ///
    /// `prior` is the city's history newest first, *as it stood before the
    /// current reading was appended*. Rules are checked in order and the
    /// first match wins, so one evaluation emits at most one alert:
    ///
    /// 1. disabled config — nothing fires
    /// 2. high temperature, gated on a consecutive run
    /// 3. low temperature, symmetric
    /// 4. watched weather condition — fires on every match, no history needed
    ///
    /// A matching alert is appended to the log and returned.
    pub fn evaluate(
        &mut self,
        current: &Reading,
        prior: &[Reading],
        config: &AlertConfig,
    ) -> Option<Alert> {
        let alert = check_reading(current, prior, config, self.unit)?;
        self.record(alert.clone());
        Some(alert)
    }

    /// Append an alert, evicting the oldest once the log is at capacity.
    pub fn record(&mut self, alert: Alert) {
        self.log.push_front(alert);
        self.log.truncate(self.capacity);
    }

    /// Mark the alert with this id as acknowledged. Returns whether a
    /// matching alert was found; unknown ids are a no-op.
    pub fn acknowledge(&mut self, alert_id: &str) -> bool {
        match self.log.iter_mut().find(|a| a.id == alert_id) {
            Some(alert) => {
                alert.acknowledged = true;
                true
            }
            None => false,
        }
    }

    /// Empty the log unconditionally.
    pub fn clear(&mut self) {
        self.log.clear();
    }

    /// All alerts, newest first.
    #[must_use]
    pub fn alerts(&self) -> impl Iterator<Item = &Alert> {
        self.log.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.log.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Number of unacknowledged alerts, for the display layer's unread badge.
    #[must_use]
    pub fn unacknowledged(&self) -> usize {
        self.log.iter().filter(|a| !a.acknowledged).count()
    }
}

/// The pure alert decision. See [`AlertEngine::evaluate`] for rule order.
fn check_reading(
    current: &Reading,
    prior: &[Reading],
    config: &AlertConfig,
    unit: TemperatureUnit,
) -> Option<Alert> {
    if !config.enabled {
        return None;
    }

    let symbol = unit.symbol();

    // High temperature: the current reading plus the most recent
    // `consecutive_readings - 1` prior readings must all exceed the
    // threshold. With consecutive_readings == 1 no history is needed.
    if current.temp > config.high_temp
        && consecutive_run(prior, config.consecutive_readings, |r| {
            r.temp > config.high_temp
        })
    {
        return Some(make_alert(
            current,
            AlertKind::HighTemp,
            format!(
                "High temperature alert: {}{symbol} exceeds threshold of {}{symbol} for {} consecutive readings",
                current.temp, config.high_temp, config.consecutive_readings
            ),
            AlertValue::Temperature(current.temp),
            AlertValue::Temperature(config.high_temp),
        ));
    }

    if current.temp < config.low_temp
        && consecutive_run(prior, config.consecutive_readings, |r| {
            r.temp < config.low_temp
        })
    {
        return Some(make_alert(
            current,
            AlertKind::LowTemp,
            format!(
                "Low temperature alert: {}{symbol} below threshold of {}{symbol} for {} consecutive readings",
                current.temp, config.low_temp, config.consecutive_readings
            ),
            AlertValue::Temperature(current.temp),
            AlertValue::Temperature(config.low_temp),
        ));
    }

    // Condition watch fires on every matching reading, independent of any
    // consecutive-run requirement. Empty string and "none" disable it.
    if config.watches_condition() && current.condition == config.weather_condition {
        return Some(make_alert(
            current,
            AlertKind::WeatherCondition,
            format!(
                "Weather condition alert: {} condition detected",
                current.condition
            ),
            AlertValue::Condition(current.condition.clone()),
            AlertValue::Condition(config.weather_condition.clone()),
        ));
    }

    None
}

/// True when the most recent `required - 1` prior readings all satisfy the
/// predicate. Requires at least that many prior readings to exist.
fn consecutive_run<F>(prior: &[Reading], required: u32, predicate: F) -> bool
where
    F: Fn(&Reading) -> bool,
{
    let needed = required.saturating_sub(1) as usize;
    prior.len() >= needed && prior[..needed].iter().all(predicate)
}

fn make_alert(
    current: &Reading,
    kind: AlertKind,
    message: String,
    value: AlertValue,
    threshold: AlertValue,
) -> Alert {
    Alert {
        id: Alert::make_id(&current.city_id, kind, current.timestamp),
        city_id: current.city_id.clone(),
        timestamp: current.timestamp,
        kind,
        message,
        value,
        threshold,
        acknowledged: false,
    }
}
