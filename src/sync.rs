use crate::analysis_client::AnalysisClient;
use crate::db_storage::RestaurantStorage;
use crate::enrichment::enrich;
use crate::errors::AppError;
use crate::pacing::RequestPacer;
use sqlx::{Acquire, PgPool};
use std::time::Duration;

/// Default spacing between analysis calls, matching the upstream service's
/// informal rate expectations.
pub const DEFAULT_PACING_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome summary of one batch pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub fetched: usize,
    pub analyzed: usize,
    pub degraded: usize,
    pub skipped: usize,
}

/// Drives unprocessed rows through analyze → enrich → annotate.
///
/// Single-threaded and sequential: one open transaction per batch, one
/// in-flight analysis call at a time, with a pacing delay between records.
/// The batch commits once after the full pass; a hard process stop is the
/// only mid-batch cancellation mechanism.
pub struct SyncLoop {
    pool: PgPool,
    storage: RestaurantStorage,
    client: AnalysisClient,
    pacing_interval: Duration,
}

impl SyncLoop {
    pub fn new(pool: PgPool, storage: RestaurantStorage, client: AnalysisClient) -> Self {
        Self {
            pool,
            storage,
            client,
            pacing_interval: DEFAULT_PACING_INTERVAL,
        }
    }

    /// Overrides the pacing interval (tests use short ones).
    pub fn with_pacing_interval(mut self, interval: Duration) -> Self {
        self.pacing_interval = interval;
        self
    }

    /// Processes up to `limit` unprocessed restaurants.
    ///
    /// Per-record analysis failures degrade to null-scored annotations and
    /// the pass continues. Each annotation write runs under its own
    /// savepoint, so a per-record storage failure rolls back only that
    /// record: it is logged, the row stays unprocessed for the next pass,
    /// and the rest of the batch still commits. Only a batch-level failure
    /// (fetch or commit) propagates.
    pub async fn process_unprocessed(&self, limit: i64) -> Result<SyncReport, AppError> {
        let mut tx = self.pool.begin().await?;

        let restaurants = self.storage.fetch_unprocessed(&mut *tx, limit).await?;
        if restaurants.is_empty() {
            tracing::info!("No unprocessed restaurants found");
            return Ok(SyncReport::default());
        }

        tracing::info!("Processing {} restaurants", restaurants.len());
        let mut report = SyncReport {
            fetched: restaurants.len(),
            ..SyncReport::default()
        };

        let mut pacer = RequestPacer::new(self.pacing_interval);
        for restaurant in restaurants {
            pacer.pace().await;

            tracing::info!("Processing restaurant: {}", restaurant.name);
            let outcome = self.client.analyze(&restaurant).await;
            let enriched = enrich(restaurant, &outcome);

            if enriched.analysis_failed {
                report.degraded += 1;
            } else {
                report.analyzed += 1;
            }

            // Savepoint per record: a failed write must not abort the
            // enclosing batch transaction.
            let stored: Result<(), crate::errors::AppError> = async {
                let mut savepoint = tx.begin().await?;
                self.storage
                    .update_annotations(
                        &mut *savepoint,
                        enriched.restaurant.id,
                        &enriched.analysis,
                        enriched.processed_at,
                    )
                    .await?;
                savepoint.commit().await?;
                Ok(())
            }
            .await;

            if let Err(e) = stored {
                tracing::error!(
                    "Failed to store annotations for '{}', skipping: {}",
                    enriched.restaurant.name,
                    e
                );
                report.skipped += 1;
            }
        }

        tx.commit().await?;

        tracing::info!(
            "Completed batch: {} fetched, {} analyzed, {} degraded, {} skipped",
            report.fetched,
            report.analyzed,
            report.degraded,
            report.skipped
        );

        Ok(report)
    }
}
