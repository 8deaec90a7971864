/// Integration smoke tests for the storage gateway and sync loop.
/// Marked ignored to avoid running against production by accident; set
/// TEST_DATABASE_URL (or DATABASE_URL) to run them.
use std::env;
use std::time::Duration;

use chrono::Utc;
use restaurant_ai_sync::analysis_client::AnalysisClient;
use restaurant_ai_sync::config::Config;
use restaurant_ai_sync::db::Database;
use restaurant_ai_sync::db_storage::RestaurantStorage;
use restaurant_ai_sync::enrichment::enrich_at;
use restaurant_ai_sync::models::{AnalysisOutcome, AnalysisResult, Restaurant};
use restaurant_ai_sync::sync::SyncLoop;
use restaurant_ai_sync::webhook_handler::{app, AppState};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn test_database() -> anyhow::Result<Database> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url).await?;

    // The base table normally comes from the scrape workflow; create it here
    // so the smoke tests are self-contained.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS restaurants (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL,
            address TEXT NOT NULL,
            rating DOUBLE PRECISION,
            cuisine_type TEXT,
            description TEXT,
            phone TEXT,
            hours TEXT,
            price_range TEXT,
            image_urls JSONB,
            reviews_count INTEGER,
            scraped_at TIMESTAMPTZ,
            UNIQUE (name, address)
        )
        "#,
    )
    .execute(&db.pool)
    .await?;

    Ok(db)
}

fn unique_restaurant(tag: &str) -> Restaurant {
    Restaurant {
        id: Uuid::new_v4(),
        name: format!("Example Restaurant {}", tag),
        address: "123 Main St, City, State".to_string(),
        rating: Some(4.5),
        cuisine_type: Some("Italian".to_string()),
        description: Some("Authentic Italian cuisine".to_string()),
        phone: Some("(555) 123-4567".to_string()),
        hours: Some("Mon-Fri: 11AM-10PM".to_string()),
        price_range: Some("$$".to_string()),
        image_urls: Some(serde_json::json!(["https://example.com/image1.jpg"])),
        reviews_count: Some(150),
        scraped_at: Some(Utc::now()),
    }
}

#[tokio::test]
#[ignore]
async fn ensure_schema_is_idempotent() -> anyhow::Result<()> {
    let db = test_database().await?;
    let storage = RestaurantStorage::new(db.pool.clone());

    storage.ensure_schema().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;
    storage.ensure_schema().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;
    storage.ensure_schema().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let ai_columns: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM information_schema.columns
         WHERE table_name = 'restaurants' AND column_name LIKE 'ai\\_%'",
    )
    .fetch_one(&db.pool)
    .await?;

    assert_eq!(ai_columns, 5);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn upsert_is_idempotent_on_identity() -> anyhow::Result<()> {
    let db = test_database().await?;
    let storage = RestaurantStorage::new(db.pool.clone());
    storage.ensure_schema().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let tag = Uuid::new_v4().to_string();
    let restaurant = unique_restaurant(&tag);

    let first = AnalysisOutcome::Analyzed(AnalysisResult {
        sentiment_score: Some(0.4),
        cuisine_category: Some("Italian".to_string()),
        quality_score: Some(0.5),
        keywords: vec!["old".to_string()],
    });
    assert!(storage.upsert(&enrich_at(restaurant.clone(), &first, Utc::now())).await);

    let second = AnalysisOutcome::Analyzed(AnalysisResult {
        sentiment_score: Some(0.9),
        cuisine_category: Some("Italian".to_string()),
        quality_score: Some(0.95),
        keywords: vec!["new".to_string()],
    });
    assert!(storage.upsert(&enrich_at(restaurant.clone(), &second, Utc::now())).await);

    let (count, sentiment): (i64, Option<bigdecimal::BigDecimal>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(ai_sentiment_score)
         FROM restaurants WHERE name = $1 AND address = $2",
    )
    .bind(&restaurant.name)
    .bind(&restaurant.address)
    .fetch_one(&db.pool)
    .await?;

    assert_eq!(count, 1, "second upsert must update, not duplicate");
    assert_eq!(
        sentiment.map(|s| s.to_string()),
        Some("0.90".to_string())
    );
    Ok(())
}

#[tokio::test]
#[ignore]
async fn fetch_unprocessed_excludes_annotated_rows() -> anyhow::Result<()> {
    let db = test_database().await?;
    let storage = RestaurantStorage::new(db.pool.clone());
    storage.ensure_schema().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;

    // Simulate the scrape source: a raw insert with no AI fields.
    let tag = Uuid::new_v4().to_string();
    let name = format!("Example Restaurant {}", tag);
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO restaurants (name, address, rating, scraped_at)
         VALUES ($1, $2, 4.5, NOW()) RETURNING id",
    )
    .bind(&name)
    .bind("123 Main St, City, State")
    .fetch_one(&db.pool)
    .await?;

    let unprocessed = storage
        .fetch_unprocessed(&db.pool, 1000)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert!(unprocessed.iter().any(|r| r.id == id));

    let annotations = AnalysisResult {
        sentiment_score: Some(0.75),
        cuisine_category: Some("Italian".to_string()),
        quality_score: Some(0.8),
        keywords: vec!["authentic".to_string()],
    };
    storage
        .update_annotations(&db.pool, id, &annotations, Utc::now())
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let unprocessed = storage
        .fetch_unprocessed(&db.pool, 1000)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert!(
        unprocessed.iter().all(|r| r.id != id),
        "annotated rows must not be fetched again"
    );
    Ok(())
}

/// Full cycle against a mocked analysis API: an unprocessed row ends up with
/// AI fields populated and processed_at set.
#[tokio::test]
#[ignore]
async fn sync_loop_annotates_unprocessed_rows() -> anyhow::Result<()> {
    let db = test_database().await?;
    let storage = RestaurantStorage::new(db.pool.clone());
    storage.ensure_schema().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let tag = Uuid::new_v4().to_string();
    let name = format!("Example Restaurant {}", tag);
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO restaurants (name, address, rating, scraped_at)
         VALUES ($1, $2, 4.5, NOW()) RETURNING id",
    )
    .bind(&name)
    .bind("123 Main St, City, State")
    .fetch_one(&db.pool)
    .await?;

    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sentiment_score": 0.85,
            "cuisine_category": "Italian",
            "quality_score": 0.92,
            "keywords": ["authentic", "fresh"]
        })))
        .mount(&mock_server)
        .await;

    let config = Config {
        database_url: "postgresql://unused".to_string(),
        port: 0,
        api_key: "test_key".to_string(),
        base_url: mock_server.uri(),
        batch_size: 1000,
        timeout_secs: 5,
        retry_attempts: 0,
    };
    let client = AnalysisClient::new(&config).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let sync = SyncLoop::new(db.pool.clone(), RestaurantStorage::new(db.pool.clone()), client)
        .with_pacing_interval(Duration::from_millis(10));
    let report = sync
        .process_unprocessed(1000)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert!(report.fetched >= 1);

    let (cuisine, processed): (Option<String>, Option<chrono::DateTime<Utc>>) = sqlx::query_as(
        "SELECT ai_cuisine_category, ai_processed_at FROM restaurants WHERE id = $1",
    )
    .bind(id)
    .fetch_one(&db.pool)
    .await?;

    assert_eq!(cuisine.as_deref(), Some("Italian"));
    assert!(processed.is_some());
    Ok(())
}

/// A storage failure on one record must roll back only that record's
/// savepoint: the rest of the batch still commits and the failed row stays
/// unprocessed for the next pass.
#[tokio::test]
#[ignore]
async fn sync_loop_survives_per_record_storage_failure() -> anyhow::Result<()> {
    let db = test_database().await?;
    let storage = RestaurantStorage::new(db.pool.clone());
    storage.ensure_schema().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let tag = Uuid::new_v4().to_string();
    let bad_name = format!("Bad Row {}", tag);
    let good_name = format!("Good Row {}", tag);
    for name in [&bad_name, &good_name] {
        sqlx::query(
            "INSERT INTO restaurants (name, address, rating, scraped_at)
             VALUES ($1, $2, 4.0, NOW())",
        )
        .bind(name)
        .bind("123 Main St, City, State")
        .execute(&db.pool)
        .await?;
    }

    let mock_server = MockServer::start().await;

    // The bad row gets a category too long for VARCHAR(100), which makes
    // its annotation write fail.
    Mock::given(method("POST"))
        .and(path("/v1/analyze"))
        .and(body_partial_json(serde_json::json!({"input": {"name": bad_name}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sentiment_score": 0.5,
            "cuisine_category": "x".repeat(200),
            "keywords": []
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sentiment_score": 0.8,
            "cuisine_category": "Italian",
            "keywords": ["good"]
        })))
        .mount(&mock_server)
        .await;

    let config = Config {
        database_url: "postgresql://unused".to_string(),
        port: 0,
        api_key: "test_key".to_string(),
        base_url: mock_server.uri(),
        batch_size: 1000,
        timeout_secs: 5,
        retry_attempts: 0,
    };
    let client = AnalysisClient::new(&config).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let sync = SyncLoop::new(db.pool.clone(), RestaurantStorage::new(db.pool.clone()), client)
        .with_pacing_interval(Duration::from_millis(10));
    let report = sync
        .process_unprocessed(1000)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert!(report.skipped >= 1);

    let good_processed: Option<chrono::DateTime<Utc>> =
        sqlx::query_scalar("SELECT ai_processed_at FROM restaurants WHERE name = $1")
            .bind(&good_name)
            .fetch_one(&db.pool)
            .await?;
    assert!(good_processed.is_some(), "good row must commit");

    let bad_processed: Option<chrono::DateTime<Utc>> =
        sqlx::query_scalar("SELECT ai_processed_at FROM restaurants WHERE name = $1")
            .bind(&bad_name)
            .fetch_one(&db.pool)
            .await?;
    assert!(bad_processed.is_none(), "failed row must stay unprocessed");
    Ok(())
}

/// Webhook success path against a real database: the row is saved and the
/// response reports success with the analysis attached.
#[tokio::test]
#[ignore]
async fn webhook_saves_and_reports_success() -> anyhow::Result<()> {
    let db = test_database().await?;
    let storage = RestaurantStorage::new(db.pool.clone());
    storage.ensure_schema().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sentiment_score": 0.85,
            "cuisine_category": "Italian",
            "quality_score": 0.92,
            "keywords": ["authentic"]
        })))
        .mount(&mock_server)
        .await;

    let config = Config {
        database_url: "postgresql://unused".to_string(),
        port: 0,
        api_key: "test_key".to_string(),
        base_url: mock_server.uri(),
        batch_size: 10,
        timeout_secs: 5,
        retry_attempts: 0,
    };
    let client = AnalysisClient::new(&config).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let state = Arc::new(AppState {
        storage: RestaurantStorage::new(db.pool.clone()),
        client,
    });

    let tag = Uuid::new_v4().to_string();
    let name = format!("Example Restaurant {}", tag);
    let payload = serde_json::json!({
        "name": name,
        "address": "123 Main St, City, State",
        "rating": 4.5,
        "cuisine_type": "Italian"
    });

    let response = app(state)
        .oneshot(
            axum::http::Request::builder()
                .method("POST")
                .uri("/api/v1/webhooks/restaurant")
                .header("content-type", "application/json")
                .body(axum::body::Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body: serde_json::Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["status"], "success");
    assert_eq!(body["database_saved"], true);
    assert_eq!(body["analysis"]["cuisine_category"], "Italian");

    let (cuisine, processed): (Option<String>, Option<chrono::DateTime<Utc>>) = sqlx::query_as(
        "SELECT ai_cuisine_category, ai_processed_at FROM restaurants WHERE name = $1",
    )
    .bind(&name)
    .fetch_one(&db.pool)
    .await?;
    assert_eq!(cuisine.as_deref(), Some("Italian"));
    assert!(processed.is_some());
    Ok(())
}
