use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tower_http::cors::CorsLayer;

use crate::config::AppConfig;
use crate::error::AlertError;
use crate::ingest::{self, newsapi::NewsApiClient, IngestStats};
use crate::processor::{AlertProcessor, RunSummary};
use crate::store::{ArticleStore, HistoryStore};
use crate::types::DispatchRecord;

/// Operational trigger surface. Subscription CRUD lives outside this service;
/// the router only exposes health, the manual batch/fetch triggers, and the
/// dispatch history.
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<AlertProcessor>,
    pub history: Arc<dyn HistoryStore>,
    pub articles: Arc<dyn ArticleStore>,
    pub feed: Option<Arc<NewsApiClient>>,
    pub config: AppConfig,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/process", post(process_all))
        .route("/api/fetch", post(fetch_news))
        .route("/api/history", get(history))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn store_error(e: AlertError) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Manual "process all alerts" trigger; same path as the scheduler tick.
async fn process_all(
    State(state): State<AppState>,
) -> Result<Json<RunSummary>, (StatusCode, String)> {
    let summary = state
        .processor
        .process_all(state.config.lookback(), Utc::now())
        .await
        .map_err(store_error)?;
    Ok(Json(summary))
}

/// Manual feed pull. Returns 503 when the service runs without a feed key.
async fn fetch_news(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<IngestStats>, (StatusCode, String)> {
    let Some(feed) = &state.feed else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "news feed is not configured (NEWS_API_KEY unset)".to_string(),
        ));
    };
    let drafts = if let Some(query) = q.get("q") {
        feed.everything(Some(query), state.config.page_size).await
    } else {
        feed.top_headlines(
            q.get("category").map(String::as_str),
            &state.config.country,
            state.config.page_size,
        )
        .await
    }
    .map_err(|e| (StatusCode::BAD_GATEWAY, format!("feed fetch failed: {e:#}")))?;

    let stats = ingest::store_drafts(state.articles.as_ref(), drafts)
        .await
        .map_err(store_error)?;
    Ok(Json(stats))
}

async fn history(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<Vec<DispatchRecord>>, (StatusCode, String)> {
    let limit = q
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(50usize);
    let rows = state.history.recent(limit).await.map_err(store_error)?;
    Ok(Json(rows))
}
