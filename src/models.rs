use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

// ============ Database Models ============

/// A scraped restaurant row awaiting (or having received) AI annotation.
///
/// Rows are created by the scrape workflow; this service only reads and
/// updates them. Identity is the (name, address) pair, which carries a
/// unique constraint in the `restaurants` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Restaurant {
    /// Unique identifier for the row.
    pub id: Uuid,
    /// Restaurant name (identity, together with `address`).
    pub name: String,
    /// Street address (identity, together with `name`).
    pub address: String,
    /// Aggregate rating from the scrape source.
    pub rating: Option<f64>,
    /// Cuisine label as scraped (distinct from the AI category).
    pub cuisine_type: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub hours: Option<String>,
    pub price_range: Option<String>,
    /// JSON array of image URLs.
    pub image_urls: Option<serde_json::Value>,
    pub reviews_count: Option<i32>,
    /// When the scrape source captured this row.
    pub scraped_at: Option<DateTime<Utc>>,
}

// ============ Analysis API Models ============

/// Structured output of the Taskmaster analysis endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Sentiment score in the service's bounded range; `None` on failure.
    pub sentiment_score: Option<f64>,
    /// Cuisine category assigned by the service.
    pub cuisine_category: Option<String>,
    /// Data quality score; `None` on failure.
    pub quality_score: Option<f64>,
    /// Extracted keywords, in the order the service returned them.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl AnalysisResult {
    /// Sentinel used when an analysis attempt failed: all scores null,
    /// keywords empty.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Why an analysis attempt failed.
#[derive(Debug, Clone)]
pub enum AnalysisErrorKind {
    /// Network-level failure (connect, timeout, body read).
    Transport(String),
    /// Non-2xx response from the analysis API.
    Status { code: u16, body: String },
    /// 2xx response whose body did not deserialize.
    InvalidResponse(String),
}

impl fmt::Display for AnalysisErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisErrorKind::Transport(msg) => write!(f, "transport error: {}", msg),
            AnalysisErrorKind::Status { code, body } => {
                write!(f, "analysis API returned {}: {}", code, body)
            }
            AnalysisErrorKind::InvalidResponse(msg) => {
                write!(f, "unparseable analysis response: {}", msg)
            }
        }
    }
}

/// Outcome of one analysis attempt.
///
/// Callers can tell "no error" apart from "null score by policy": a
/// `Failed` outcome is still enrichable (it maps to the null-scored
/// sentinel), but the distinction is preserved for logging and reporting.
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    Analyzed(AnalysisResult),
    Failed(AnalysisErrorKind),
}

impl AnalysisOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, AnalysisOutcome::Failed(_))
    }

    /// The result to persist: the real one on success, the null-scored
    /// sentinel on failure.
    pub fn result_or_empty(&self) -> AnalysisResult {
        match self {
            AnalysisOutcome::Analyzed(result) => result.clone(),
            AnalysisOutcome::Failed(_) => AnalysisResult::empty(),
        }
    }
}

// ============ Enriched Model ============

/// A restaurant merged with its analysis output.
///
/// Invariant: `processed_at` is set exactly when an analysis attempt
/// (success or failure) has been recorded, so every `EnrichedRestaurant`
/// carries it.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedRestaurant {
    pub restaurant: Restaurant,
    pub analysis: AnalysisResult,
    /// True when the analysis attempt failed and `analysis` is the sentinel.
    pub analysis_failed: bool,
    pub processed_at: DateTime<Utc>,
}
