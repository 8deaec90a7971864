use restaurant_ai_sync::analysis_client::AnalysisClient;
use restaurant_ai_sync::config::Config;
use restaurant_ai_sync::db::Database;
use restaurant_ai_sync::db_storage::RestaurantStorage;
use restaurant_ai_sync::sync::SyncLoop;
use restaurant_ai_sync::webhook_handler::{self, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point.
///
/// Default invocation runs the schema migration and one batch sync pass,
/// then exits. With the `serve` argument it instead starts the webhook
/// server for inline enrichment of freshly scraped restaurants.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "restaurant_ai_sync=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; aborts here when TASKMASTER_API_KEY is missing
    let config = Config::from_env()?;

    // Initialize database connection pool
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    let storage = RestaurantStorage::new(db.pool.clone());

    // Idempotent: adds AI columns and indexes when absent
    storage.ensure_schema().await.map_err(|e| {
        anyhow::anyhow!("Failed to verify database schema: {}", e)
    })?;

    let client = AnalysisClient::new(&config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize analysis client: {}", e))?;

    match std::env::args().nth(1).as_deref() {
        Some("serve") => serve(config, storage, client).await,
        _ => {
            let sync = SyncLoop::new(db.pool.clone(), storage, client);
            let report = sync
                .process_unprocessed(config.batch_size)
                .await
                .map_err(|e| anyhow::anyhow!("Batch sync failed: {}", e))?;

            tracing::info!(
                "Sync run finished: {} fetched, {} analyzed, {} degraded, {} skipped",
                report.fetched,
                report.analyzed,
                report.degraded,
                report.skipped
            );
            Ok(())
        }
    }
}

/// Runs the webhook server until the process is stopped.
async fn serve(
    config: Config,
    storage: RestaurantStorage,
    client: AnalysisClient,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState { storage, client });
    let app = webhook_handler::app(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Webhook server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
