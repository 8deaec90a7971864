use crate::models::{AnalysisResult, Restaurant};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Restaurant payload as posted by the scrape workflow.
///
/// Only the identity pair is required; everything else is whatever the
/// scraper managed to capture.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScrapedRestaurant {
    pub name: String,
    pub address: String,
    pub rating: Option<f64>,
    pub cuisine_type: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub hours: Option<String>,
    pub price_range: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub reviews_count: Option<i32>,
    pub scraped_at: Option<DateTime<Utc>>,
}

impl ScrapedRestaurant {
    /// Converts the payload into a `Restaurant`. The generated id is only a
    /// placeholder; persistence is keyed by (name, address).
    pub fn into_restaurant(self) -> Restaurant {
        Restaurant {
            id: Uuid::new_v4(),
            name: self.name,
            address: self.address,
            rating: self.rating,
            cuisine_type: self.cuisine_type,
            description: self.description,
            phone: self.phone,
            hours: self.hours,
            price_range: self.price_range,
            image_urls: Some(json!(self.image_urls)),
            reviews_count: self.reviews_count,
            scraped_at: self.scraped_at,
        }
    }
}

/// Response body for the restaurant webhook.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: String,
    pub restaurant_name: String,
    pub analysis: AnalysisResult,
    pub database_saved: bool,
}
