use crate::analysis_client::AnalysisClient;
use crate::db_storage::RestaurantStorage;
use crate::enrichment::enrich;
use crate::errors::AppError;
use crate::webhook_models::{ScrapedRestaurant, WebhookResponse};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state for the webhook surface.
pub struct AppState {
    pub storage: RestaurantStorage,
    pub client: AnalysisClient,
}

/// Builds the webhook router: one ingest endpoint plus a health check.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/v1/webhooks/restaurant",
            post(restaurant_webhook),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// Restaurant Webhook Handler
///
/// Receives a freshly scraped restaurant from the workflow engine, runs the
/// inline analyze → enrich → upsert cycle and reports what happened. An
/// analysis failure is not an HTTP failure: the record is stored with the
/// null-scored sentinel and the response carries `status: "error"`.
pub async fn restaurant_webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ScrapedRestaurant>,
) -> Result<(StatusCode, Json<WebhookResponse>), AppError> {
    tracing::info!("Received webhook for restaurant: {}", payload.name);

    if payload.name.trim().is_empty() || payload.address.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Restaurant name and address are required".to_string(),
        ));
    }

    let restaurant = payload.into_restaurant();
    let outcome = state.client.analyze(&restaurant).await;
    let enriched = enrich(restaurant, &outcome);

    let saved = state.storage.upsert(&enriched).await;

    let status = if saved && !enriched.analysis_failed {
        "success"
    } else {
        "error"
    };

    Ok((
        StatusCode::OK,
        Json(WebhookResponse {
            status: status.to_string(),
            restaurant_name: enriched.restaurant.name.clone(),
            analysis: enriched.analysis,
            database_saved: saved,
        }),
    ))
}
