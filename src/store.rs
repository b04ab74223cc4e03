//! Bounded per-city reading history.
//!
//! Each city keeps its readings newest first, capped at
//! [`MAX_RECORDS_PER_CITY`]. Appending at capacity drops the oldest entry.
//! Order is strictly insertion order — the store never re-sorts by timestamp,
//! so a provider delivering out-of-order timestamps is preserved as-is.

use crate::models::Reading;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Maximum number of readings retained per city.
pub const MAX_RECORDS_PER_CITY: usize = 100;

/// In-memory store of rolling reading histories, one per city.
#[derive(Debug, Default)]
pub struct ReadingStore {
    histories: HashMap<String, Vec<Reading>>,
    capacity: usize,
    last_updated: Option<DateTime<Utc>>,
}

impl ReadingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_RECORDS_PER_CITY)
    }

    /// Store with a non-default retention cap. Used by tests; production
    /// code goes through [`ReadingStore::new`].
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            histories: HashMap::new(),
            capacity,
            last_updated: None,
        }
    }

    /// Prepend a reading to the city's history, evicting the oldest entry
    /// once the retention cap is reached, and stamp `last_updated`.
    pub fn append(&mut self, city_id: &str, reading: Reading) {
        let history = self.histories.entry(city_id.to_string()).or_default();
        history.insert(0, reading);
        history.truncate(self.capacity);
        self.last_updated = Some(Utc::now());
    }

    /// The city's readings, newest first. Empty slice for unknown cities.
    #[must_use]
    pub fn history(&self, city_id: &str) -> &[Reading] {
        self.histories.get(city_id).map_or(&[], Vec::as_slice)
    }

    /// The most recent reading for a city, if any.
    #[must_use]
    pub fn latest(&self, city_id: &str) -> Option<&Reading> {
        self.history(city_id).first()
    }

    /// Remove one city's history, or every history when `city_id` is `None`.
    pub fn clear(&mut self, city_id: Option<&str>) {
        match city_id {
            Some(id) => {
                self.histories.remove(id);
            }
            None => self.histories.clear(),
        }
    }

    /// True when no city has any readings yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.histories.values().all(Vec::is_empty)
    }

    /// When the store last accepted a reading, if ever.
    #[must_use]
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }
}
