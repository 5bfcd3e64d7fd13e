//! ReferenceStore: holds the one active reference document of a session.
//!
//! Isolation rules:
//! - a document is replaced wholesale, never merged;
//! - `switch` drops the previous document before touching the new city, so a
//!   failed switch leaves nothing loaded rather than the old city;
//! - `load` builds the new document first and only then swaps it in, so a
//!   failed load leaves the previous document untouched.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::reference::{City, ReferenceDocument, ReferenceError, ReferenceSource};

pub struct ReferenceStore {
    source: Arc<dyn ReferenceSource>,
    active: Option<ReferenceDocument>,
}

impl ReferenceStore {
    pub fn new(source: Arc<dyn ReferenceSource>) -> Self {
        Self {
            source,
            active: None,
        }
    }

    pub fn available_cities(&self) -> Vec<City> {
        City::ALL.to_vec()
    }

    /// Loads `city_id` and makes it the active document.
    pub fn load(&mut self, city_id: &str) -> Result<&ReferenceDocument, ReferenceError> {
        let city: City = city_id.parse()?;
        let document = read_document(self.source.as_ref(), city)?;

        if !document.mentions_own_city() {
            warn!(
                "Reference for {} at {} never mentions the city by name",
                city,
                document.source()
            );
        }

        info!(
            "Loaded reference for {} from {} ({} passages)",
            city,
            document.source(),
            document.passages().len()
        );

        // Previous document (and its passages) is dropped here.
        Ok(&*self.active.insert(document))
    }

    /// Discards the active document, then loads `city_id`.
    pub fn switch(&mut self, city_id: &str) -> Result<&ReferenceDocument, ReferenceError> {
        self.clear();
        self.load(city_id)
    }

    pub fn clear(&mut self) {
        if let Some(previous) = self.active.take() {
            info!("Cleared reference for {}", previous.city());
        }
    }

    pub fn active(&self) -> Option<&ReferenceDocument> {
        self.active.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.active.is_some()
    }

    /// True when the active document belongs to `city`, names it, and names
    /// every other supported city at most a tenth as often.
    pub fn validate_isolation(&self, city: City) -> bool {
        let Some(document) = self.active.as_ref() else {
            return false;
        };
        if document.city() != city {
            return false;
        }

        let lowered = document.text().to_lowercase();
        let own_mentions = lowered.matches(city.id()).count();
        if own_mentions == 0 {
            return false;
        }

        city.others()
            .all(|other| lowered.matches(other.id()).count() as f64 <= own_mentions as f64 / 10.0)
    }

    pub fn summary(&self) -> Option<String> {
        self.active.as_ref().map(ReferenceDocument::summary)
    }
}

/// Fetches and validates one city's document without touching any store.
pub fn read_document(
    source: &dyn ReferenceSource,
    city: City,
) -> Result<ReferenceDocument, ReferenceError> {
    let fetched = source
        .fetch(city)?
        .ok_or_else(|| ReferenceError::NotFound {
            city,
            locator: source.locator(city),
        })?;

    ReferenceDocument::new(city, fetched.text, fetched.locator, Utc::now())
}
