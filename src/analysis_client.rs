use crate::config::Config;
use crate::errors::AppError;
use crate::models::{AnalysisErrorKind, AnalysisOutcome, AnalysisResult, Restaurant};
use serde_json::json;
use std::time::Duration;

/// Client for the Taskmaster analysis API.
///
/// Stateless wrapper over `POST /v1/analyze` and `POST /v1/batch-process`
/// with bearer-token auth and a bounded per-request timeout. Failures never
/// escape this boundary: every public method returns an [`AnalysisOutcome`]
/// so callers decide how to degrade.
#[derive(Clone)]
pub struct AnalysisClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    retry_attempts: u32,
    backoff: Duration,
}

impl AnalysisClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create analysis client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            retry_attempts: config.retry_attempts,
            backoff: Duration::from_millis(500),
        })
    }

    /// Analyzes a single restaurant.
    ///
    /// Transient failures (transport errors, 5xx) are retried up to the
    /// configured number of attempts with linear backoff; 4xx responses are
    /// not retried since they will not heal on their own.
    pub async fn analyze(&self, restaurant: &Restaurant) -> AnalysisOutcome {
        let payload = json!({
            "input": restaurant,
            "analysis_type": "restaurant_insights",
            "options": {
                "extract_sentiment": true,
                "categorize_cuisine": true,
                "validate_contact_info": true,
                "extract_keywords": true,
                "detect_language": true
            }
        });

        let url = format!("{}/v1/analyze", self.base_url);
        let mut attempt = 0;
        loop {
            match self.post_for_result(&url, &payload).await {
                Ok(result) => {
                    tracing::debug!("Analysis succeeded for restaurant: {}", restaurant.name);
                    return AnalysisOutcome::Analyzed(result);
                }
                Err(kind) if is_retryable(&kind) && attempt < self.retry_attempts => {
                    attempt += 1;
                    tracing::warn!(
                        "Analysis attempt {} failed for '{}', retrying: {}",
                        attempt,
                        restaurant.name,
                        kind
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(kind) => {
                    tracing::error!("Analysis failed for '{}': {}", restaurant.name, kind);
                    return AnalysisOutcome::Failed(kind);
                }
            }
        }
    }

    /// Analyzes a batch of restaurants in one call to `/v1/batch-process`.
    ///
    /// On any failure the whole batch degrades to `Failed` outcomes, one per
    /// input, mirroring the per-item contract of [`analyze`](Self::analyze).
    pub async fn analyze_batch(&self, restaurants: &[Restaurant]) -> Vec<AnalysisOutcome> {
        if restaurants.is_empty() {
            return Vec::new();
        }

        let payload = json!({
            "items": restaurants,
            "task_type": "restaurant_analysis",
            "batch_size": restaurants.len()
        });

        let url = format!("{}/v1/batch-process", self.base_url);
        let response = match self.post(&url, &payload).await {
            Ok(response) => response,
            Err(kind) => {
                tracing::error!("Batch analysis request failed: {}", kind);
                return restaurants
                    .iter()
                    .map(|_| AnalysisOutcome::Failed(kind.clone()))
                    .collect();
            }
        };

        let results: Vec<AnalysisResult> = match response.json().await {
            Ok(results) => results,
            Err(e) => {
                let kind = AnalysisErrorKind::InvalidResponse(e.to_string());
                tracing::error!("Batch analysis response unparseable: {}", kind);
                return restaurants
                    .iter()
                    .map(|_| AnalysisOutcome::Failed(kind.clone()))
                    .collect();
            }
        };

        if results.len() != restaurants.len() {
            tracing::warn!(
                "Batch analysis returned {} results for {} inputs",
                results.len(),
                restaurants.len()
            );
        }

        // Pad a short response so every input gets an outcome.
        let mut outcomes: Vec<AnalysisOutcome> =
            results.into_iter().map(AnalysisOutcome::Analyzed).collect();
        while outcomes.len() < restaurants.len() {
            outcomes.push(AnalysisOutcome::Failed(AnalysisErrorKind::InvalidResponse(
                "missing result in batch response".to_string(),
            )));
        }
        outcomes.truncate(restaurants.len());
        outcomes
    }

    async fn post_for_result(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<AnalysisResult, AnalysisErrorKind> {
        let response = self.post(url, payload).await?;
        response
            .json()
            .await
            .map_err(|e| AnalysisErrorKind::InvalidResponse(e.to_string()))
    }

    async fn post(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<reqwest::Response, AnalysisErrorKind> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(payload)
            .send()
            .await
            .map_err(|e| AnalysisErrorKind::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let code = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AnalysisErrorKind::Status { code, body });
        }

        Ok(response)
    }
}

fn is_retryable(kind: &AnalysisErrorKind) -> bool {
    match kind {
        AnalysisErrorKind::Transport(_) => true,
        AnalysisErrorKind::Status { code, .. } => *code >= 500,
        AnalysisErrorKind::InvalidResponse(_) => false,
    }
}
