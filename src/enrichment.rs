//! Merge step between a scraped restaurant and its analysis outcome.
//!
//! Pure functions with no side effects and no failure mode: a failed
//! analysis still produces an enriched record (null scores, empty keywords)
//! so the row is marked processed and not re-fetched forever.

use crate::models::{AnalysisOutcome, EnrichedRestaurant, Restaurant};
use chrono::{DateTime, Utc};

/// Merges a restaurant with an analysis outcome, stamping `processed_at`
/// with the current time.
pub fn enrich(restaurant: Restaurant, outcome: &AnalysisOutcome) -> EnrichedRestaurant {
    enrich_at(restaurant, outcome, Utc::now())
}

/// [`enrich`] with an explicit timestamp, for deterministic tests.
pub fn enrich_at(
    restaurant: Restaurant,
    outcome: &AnalysisOutcome,
    processed_at: DateTime<Utc>,
) -> EnrichedRestaurant {
    EnrichedRestaurant {
        restaurant,
        analysis: outcome.result_or_empty(),
        analysis_failed: outcome.is_failed(),
        processed_at,
    }
}
