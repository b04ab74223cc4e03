//! The polling orchestrator.
//!
//! `WeatherMonitor` owns the reading store, the summary aggregator and the
//! alert engine, and sequences one polling cycle as
//! fetch → append → evaluate alerts → recompute summaries. Fetches within a
//! cycle run concurrently; applying their results is serialized per city so
//! the history's insertion-order invariant holds. One city failing never
//! blocks the others.

use crate::alert::AlertEngine;
use crate::config::MonitorConfig;
use crate::models::{Alert, DailySummary, Reading};
use crate::provider::WeatherProvider;
use crate::store::ReadingStore;
use crate::summary::SummaryAggregator;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// What happened during one polling cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleOutcome {
    /// Cities whose reading was fetched and applied.
    pub succeeded: usize,
    /// Cities skipped this cycle because their fetch failed.
    pub failed: usize,
    /// Alerts raised while applying this cycle's readings.
    pub alerts_raised: usize,
}

/// Owns all monitor state and drives the polling cadence.
pub struct WeatherMonitor {
    config: MonitorConfig,
    provider: Arc<dyn WeatherProvider>,
    store: ReadingStore,
    aggregator: SummaryAggregator,
    alerts: AlertEngine,
}

impl WeatherMonitor {
    #[must_use]
    pub fn new(config: MonitorConfig, provider: Arc<dyn WeatherProvider>) -> Self {
        let alerts = AlertEngine::new(config.units.temperature);
        Self {
            config,
            provider,
            store: ReadingStore::new(),
            aggregator: SummaryAggregator::new(),
            alerts,
        }
    }

    /// Run one polling cycle over all configured cities.
    ///
    /// All fetches are issued concurrently; results are then applied one
    /// city at a time. A failed fetch leaves that city's history and
    /// summaries untouched and is reported in the outcome.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let cities = self.config.cities.clone();
        info!("starting polling cycle for {} cities", cities.len());

        let fetches = cities.iter().map(|city| {
            let provider = Arc::clone(&self.provider);
            async move { (city, provider.fetch_reading(city).await) }
        });
        let results = futures::future::join_all(fetches).await;

        let mut outcome = CycleOutcome::default();
        for (city, result) in results {
            match result {
                Ok(reading) => {
                    if let Some(alert) = self.apply_reading(&city.id, reading) {
                        info!(
                            city = %city.id,
                            alert_id = %alert.id,
                            "alert raised: {}", alert.message
                        );
                        outcome.alerts_raised += 1;
                    }
                    outcome.succeeded += 1;
                }
                Err(e) if e.is_credential() => {
                    error!(city = %city.id, "credential failure, check the API key: {e}");
                    outcome.failed += 1;
                }
                Err(e) => {
                    warn!(city = %city.id, "fetch failed, skipping this cycle: {e}");
                    outcome.failed += 1;
                }
            }
        }

        info!(
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            alerts = outcome.alerts_raised,
            "polling cycle finished"
        );
        outcome
    }

    /// Apply one fetched reading: snapshot the prior history, append,
    /// evaluate thresholds against the pre-append history, then rebuild the
    /// city's daily summaries.
    fn apply_reading(&mut self, city_id: &str, reading: Reading) -> Option<Alert> {
        let prior = self.store.history(city_id).to_vec();
        let alert_config = self.config.alert_config(city_id);

        self.store.append(city_id, reading.clone());
        let alert = self.alerts.evaluate(&reading, &prior, &alert_config);
        self.aggregator.recompute(city_id, self.store.history(city_id));

        alert
    }

    /// Poll on the configured cadence until `shutdown` flips to true.
    ///
    /// Fetches immediately when no data exists yet and a credential is
    /// configured; afterwards one cycle per interval. Cancellation stops
    /// scheduling new cycles; an in-flight cycle finishes applying first.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        if self.store.is_empty() && self.config.has_credential() {
            self.run_cycle().await;
        }

        let period = Duration::from_secs(self.config.polling.interval_minutes * 60);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; consume it so the initial
        // fetch above is not doubled.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("shutdown requested, stopping polling");
                        break;
                    }
                }
            }
        }
    }

    // --- Read access for the display layer -------------------------------

    /// A city's readings, newest first.
    #[must_use]
    pub fn history(&self, city_id: &str) -> &[Reading] {
        self.store.history(city_id)
    }

    /// A city's most recent reading.
    #[must_use]
    pub fn latest(&self, city_id: &str) -> Option<&Reading> {
        self.store.latest(city_id)
    }

    /// A city's daily summaries keyed by date.
    #[must_use]
    pub fn summaries(&self, city_id: &str) -> Option<&BTreeMap<NaiveDate, DailySummary>> {
        self.aggregator.summaries(city_id)
    }

    /// The summary for one (city, date).
    #[must_use]
    pub fn summary(&self, city_id: &str, date: NaiveDate) -> Option<&DailySummary> {
        self.aggregator.summary(city_id, date)
    }

    /// All alerts, newest first.
    pub fn alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.alerts()
    }

    /// Unread-indicator count for the display layer.
    #[must_use]
    pub fn unacknowledged_alerts(&self) -> usize {
        self.alerts.unacknowledged()
    }

    /// When any city last received a reading.
    #[must_use]
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.store.last_updated()
    }

    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    // --- Mutations forwarded from the display layer -----------------------

    /// Acknowledge one alert by id. Unknown ids are a no-op.
    pub fn acknowledge_alert(&mut self, alert_id: &str) -> bool {
        self.alerts.acknowledge(alert_id)
    }

    /// Drop all alerts.
    pub fn clear_alerts(&mut self) {
        self.alerts.clear();
    }

    /// Drop one city's history and summaries, or everything. The alert log
    /// is global and survives history clears.
    pub fn clear_history(&mut self, city_id: Option<&str>) {
        self.store.clear(city_id);
        self.aggregator.clear(city_id);
    }
}
