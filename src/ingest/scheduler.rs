// src/ingest/scheduler.rs
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::ingest::newsapi::NewsApiClient;
use crate::processor::AlertProcessor;
use crate::store::ArticleStore;

/// Spawn the periodic feed fetch. Each tick pulls top headlines and stores
/// them idempotently; a failed tick is logged and the loop keeps going.
pub fn spawn_fetch_loop(
    client: Arc<NewsApiClient>,
    store: Arc<dyn ArticleStore>,
    cfg: AppConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(cfg.fetch_interval_secs.max(1)));
        loop {
            ticker.tick().await;
            match client
                .top_headlines(None, &cfg.country, cfg.page_size)
                .await
            {
                Ok(drafts) => match crate::ingest::store_drafts(store.as_ref(), drafts).await {
                    Ok(stats) => info!(
                        target: "ingest",
                        received = stats.received,
                        new = stats.stored_new,
                        duplicates = stats.duplicates,
                        dropped = stats.dropped,
                        "fetch tick"
                    ),
                    Err(e) => warn!(target: "ingest", error = %e, "storing fetched articles failed"),
                },
                Err(e) => warn!(target: "ingest", error = ?e, "feed fetch failed"),
            }
        }
    })
}

/// Spawn the periodic alert batch. Mirrors the manual trigger: each tick runs
/// `process_all` against the configured lookback window.
pub fn spawn_process_loop(processor: Arc<AlertProcessor>, cfg: AppConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(
            cfg.process_interval_secs.max(1),
        ));
        loop {
            ticker.tick().await;
            match processor.process_all(cfg.lookback(), Utc::now()).await {
                Ok(summary) => info!(
                    target: "alerts",
                    sent = summary.sent,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    "process tick"
                ),
                Err(e) => warn!(target: "alerts", error = %e, "process tick failed"),
            }
        }
    })
}
