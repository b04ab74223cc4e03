//! Daily summary aggregation.
//!
//! Summaries are always rebuilt from the full reading history of a city,
//! never incrementally patched. That keeps the result a pure function of the
//! reading set: recomputing with unchanged input yields a bit-identical
//! summary regardless of how often or in what order recompute is called.

use crate::models::{DailySummary, Reading, round1};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Holds the per-city, per-date summary maps and rebuilds them on demand.
#[derive(Debug, Default)]
pub struct SummaryAggregator {
    summaries: HashMap<String, BTreeMap<NaiveDate, DailySummary>>,
}

impl SummaryAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild every daily summary for one city from its current history.
    ///
    /// `history` is the city's readings newest first, as handed out by the
    /// store. Any prior summary for a date is overwritten; dates that no
    /// longer have readings disappear.
    pub fn recompute(&mut self, city_id: &str, history: &[Reading]) {
        let mut by_date: Vec<(NaiveDate, Vec<Reading>)> = Vec::new();
        for reading in history {
            match by_date.iter_mut().find(|(date, _)| *date == reading.date) {
                Some((_, group)) => group.push(reading.clone()),
                None => by_date.push((reading.date, vec![reading.clone()])),
            }
        }

        let mut rebuilt = BTreeMap::new();
        for (date, readings) in by_date {
            if let Some(summary) = calculate_daily_summary(city_id, date, readings) {
                rebuilt.insert(date, summary);
            }
        }
        self.summaries.insert(city_id.to_string(), rebuilt);
    }

    /// All summaries for a city, keyed by date. `None` until the first
    /// recompute for that city.
    #[must_use]
    pub fn summaries(&self, city_id: &str) -> Option<&BTreeMap<NaiveDate, DailySummary>> {
        self.summaries.get(city_id)
    }

    /// The summary for one specific (city, date), if it exists.
    #[must_use]
    pub fn summary(&self, city_id: &str, date: NaiveDate) -> Option<&DailySummary> {
        self.summaries.get(city_id).and_then(|m| m.get(&date))
    }

    /// Drop summaries for one city, or all of them. Mirrors store clears.
    pub fn clear(&mut self, city_id: Option<&str>) {
        match city_id {
            Some(id) => {
                self.summaries.remove(id);
            }
            None => self.summaries.clear(),
        }
    }
}

/// Single-pass summary over readings that all share one calendar date.
///
/// Averages are rounded to one decimal. The dominant condition is the one
/// with the highest count; on a tie the condition seen first in `readings`
/// wins, because counts are kept in first-observed order and only a strictly
/// greater count displaces the current leader.
fn calculate_daily_summary(
    city_id: &str,
    date: NaiveDate,
    readings: Vec<Reading>,
) -> Option<DailySummary> {
    if readings.is_empty() {
        return None;
    }

    let mut total_temp = 0.0;
    let mut min_temp = readings[0].temp;
    let mut max_temp = readings[0].temp;
    let mut total_humidity = 0.0;
    let mut total_wind_speed = 0.0;
    let mut condition_counts: Vec<(String, u32)> = Vec::new();

    for reading in &readings {
        total_temp += reading.temp;
        min_temp = min_temp.min(reading.temp);
        max_temp = max_temp.max(reading.temp);
        total_humidity += reading.humidity;
        total_wind_speed += reading.wind_speed;

        match condition_counts
            .iter_mut()
            .find(|(condition, _)| *condition == reading.condition)
        {
            Some((_, count)) => *count += 1,
            None => condition_counts.push((reading.condition.clone(), 1)),
        }
    }

    let mut dominant_condition = String::new();
    let mut max_count = 0;
    for (condition, count) in &condition_counts {
        if *count > max_count {
            max_count = *count;
            dominant_condition = condition.clone();
        }
    }

    let count = readings.len() as f64;
    Some(DailySummary {
        city_id: city_id.to_string(),
        date,
        avg_temp: round1(total_temp / count),
        min_temp,
        max_temp,
        dominant_condition,
        condition_counts,
        avg_humidity: round1(total_humidity / count),
        avg_wind_speed: round1(total_wind_speed / count),
        readings,
    })
}
