//! Restaurant AI Enrichment Sync
//!
//! Fetches scraped restaurant rows from PostgreSQL, forwards them to the
//! Taskmaster analysis API and writes the returned annotations back.
//!
//! # Modules
//!
//! - `analysis_client`: Taskmaster API client.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `db_storage`: Database storage operations.
//! - `enrichment`: Record/analysis merge step.
//! - `errors`: Error handling types.
//! - `models`: Core data models.
//! - `pacing`: Request pacing between analysis calls.
//! - `sync`: Batch sync loop over unprocessed rows.
//! - `webhook_handler`: Scrape-workflow webhook handler.
//! - `webhook_models`: Webhook payload models.

pub mod analysis_client;
pub mod config;
pub mod db;
pub mod db_storage;
pub mod enrichment;
pub mod errors;
pub mod models;
pub mod pacing;
pub mod sync;
pub mod webhook_handler;
pub mod webhook_models;
