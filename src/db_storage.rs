use crate::errors::AppError;
use crate::models::{AnalysisResult, EnrichedRestaurant, Restaurant};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

/// Database gateway for enriched restaurant rows.
pub struct RestaurantStorage {
    pool: PgPool,
}

impl RestaurantStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts or updates a restaurant keyed by (name, address), swallowing
    /// storage errors.
    ///
    /// Returns `false` and logs on any failure; the caller never sees the
    /// underlying error. On conflict only the rating and AI fields refresh:
    /// the other descriptive fields are intentionally immutable after first
    /// insert, matching the upstream scrape feed's contract.
    pub async fn upsert(&self, enriched: &EnrichedRestaurant) -> bool {
        match self.try_upsert(enriched).await {
            Ok(()) => {
                tracing::info!("Saved restaurant: {}", enriched.restaurant.name);
                true
            }
            Err(e) => {
                tracing::error!(
                    "Error saving restaurant '{}': {}",
                    enriched.restaurant.name,
                    e
                );
                false
            }
        }
    }

    async fn try_upsert(&self, enriched: &EnrichedRestaurant) -> Result<(), AppError> {
        let restaurant = &enriched.restaurant;
        let analysis = &enriched.analysis;

        sqlx::query(
            r#"
            INSERT INTO restaurants (
                name, address, rating, cuisine_type, description,
                phone, hours, price_range, image_urls, reviews_count,
                ai_sentiment_score, ai_cuisine_category, ai_data_quality_score,
                ai_keywords, ai_processed_at, scraped_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16
            ) ON CONFLICT (name, address) DO UPDATE SET
                rating = EXCLUDED.rating,
                ai_sentiment_score = EXCLUDED.ai_sentiment_score,
                ai_cuisine_category = EXCLUDED.ai_cuisine_category,
                ai_data_quality_score = EXCLUDED.ai_data_quality_score,
                ai_keywords = EXCLUDED.ai_keywords,
                ai_processed_at = EXCLUDED.ai_processed_at
            "#,
        )
        .bind(&restaurant.name)
        .bind(&restaurant.address)
        .bind(restaurant.rating)
        .bind(&restaurant.cuisine_type)
        .bind(&restaurant.description)
        .bind(&restaurant.phone)
        .bind(&restaurant.hours)
        .bind(&restaurant.price_range)
        .bind(restaurant.image_urls.clone().unwrap_or_else(|| json!([])))
        .bind(restaurant.reviews_count)
        .bind(to_decimal(analysis.sentiment_score))
        .bind(&analysis.cuisine_category)
        .bind(to_decimal(analysis.quality_score))
        .bind(json!(analysis.keywords))
        .bind(enriched.processed_at)
        .bind(restaurant.scraped_at.unwrap_or_else(Utc::now))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches up to `limit` rows with no recorded analysis attempt.
    ///
    /// Order is implementation-defined (whatever the planner returns); the
    /// sync loop does not rely on it. Takes an executor so the sync loop can
    /// run it inside its batch transaction.
    pub async fn fetch_unprocessed<'e>(
        &self,
        executor: impl sqlx::PgExecutor<'e>,
        limit: i64,
    ) -> Result<Vec<Restaurant>, AppError> {
        let rows = sqlx::query_as::<_, Restaurant>(
            r#"
            SELECT id, name, address, rating, cuisine_type, description,
                   phone, hours, price_range, image_urls, reviews_count,
                   scraped_at
            FROM restaurants
            WHERE ai_processed_at IS NULL
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    /// Partial update of the AI fields for an existing row, by primary key.
    pub async fn update_annotations<'e>(
        &self,
        executor: impl sqlx::PgExecutor<'e>,
        id: Uuid,
        analysis: &AnalysisResult,
        processed_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE restaurants
            SET ai_sentiment_score = $2,
                ai_cuisine_category = $3,
                ai_data_quality_score = $4,
                ai_keywords = $5,
                ai_processed_at = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(to_decimal(analysis.sentiment_score))
        .bind(&analysis.cuisine_category)
        .bind(to_decimal(analysis.quality_score))
        .bind(json!(analysis.keywords))
        .bind(processed_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Idempotently adds the AI annotation columns and their indexes.
    ///
    /// Safe to call on every startup; each statement is a no-op when the
    /// column or index already exists.
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        let add_column_statements = [
            r#"
            DO $$
            BEGIN
                IF NOT EXISTS (SELECT 1 FROM information_schema.columns
                              WHERE table_name='restaurants' AND column_name='ai_sentiment_score') THEN
                    ALTER TABLE restaurants ADD COLUMN ai_sentiment_score DECIMAL(3,2);
                END IF;
            END $$;
            "#,
            r#"
            DO $$
            BEGIN
                IF NOT EXISTS (SELECT 1 FROM information_schema.columns
                              WHERE table_name='restaurants' AND column_name='ai_cuisine_category') THEN
                    ALTER TABLE restaurants ADD COLUMN ai_cuisine_category VARCHAR(100);
                END IF;
            END $$;
            "#,
            r#"
            DO $$
            BEGIN
                IF NOT EXISTS (SELECT 1 FROM information_schema.columns
                              WHERE table_name='restaurants' AND column_name='ai_data_quality_score') THEN
                    ALTER TABLE restaurants ADD COLUMN ai_data_quality_score DECIMAL(3,2);
                END IF;
            END $$;
            "#,
            r#"
            DO $$
            BEGIN
                IF NOT EXISTS (SELECT 1 FROM information_schema.columns
                              WHERE table_name='restaurants' AND column_name='ai_keywords') THEN
                    ALTER TABLE restaurants ADD COLUMN ai_keywords JSONB;
                END IF;
            END $$;
            "#,
            r#"
            DO $$
            BEGIN
                IF NOT EXISTS (SELECT 1 FROM information_schema.columns
                              WHERE table_name='restaurants' AND column_name='ai_processed_at') THEN
                    ALTER TABLE restaurants ADD COLUMN ai_processed_at TIMESTAMPTZ;
                END IF;
            END $$;
            "#,
        ];

        for statement in add_column_statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_restaurants_ai_sentiment
             ON restaurants(ai_sentiment_score)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_restaurants_ai_cuisine
             ON restaurants(ai_cuisine_category)",
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("Database schema verified (AI columns and indexes present)");
        Ok(())
    }
}

/// DECIMAL(3,2) columns are bound as BigDecimal; scores arrive from the API
/// as JSON floats.
fn to_decimal(value: Option<f64>) -> Option<BigDecimal> {
    value.and_then(|v| BigDecimal::from_str(&v.to_string()).ok())
}
