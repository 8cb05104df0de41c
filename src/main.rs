//! newswatch — Binary Entrypoint
//! Boots the Axum HTTP server, the feed fetch loop, and the alert batch loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newswatch::api::{self, AppState};
use newswatch::config::{load_seeds_default, seed_store, AppConfig};
use newswatch::dispatch::Dispatcher;
use newswatch::evaluator::Evaluator;
use newswatch::ingest::newsapi::NewsApiClient;
use newswatch::ingest::scheduler::{spawn_fetch_loop, spawn_process_loop};
use newswatch::metrics::Metrics;
use newswatch::notify::email::SmtpSender;
use newswatch::notify::{LogSender, NotificationSender};
use newswatch::processor::AlertProcessor;
use newswatch::store::{AlertStore, ArticleStore, HistoryStore, MemoryStore};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = AppConfig::from_env();

    let store = Arc::new(MemoryStore::new());
    let seeds = load_seeds_default().context("loading subscription seeds")?;
    let (filters, alerts) = seed_store(&store, &seeds, Utc::now());
    info!(filters, alerts, "subscriptions seeded");

    let sender: Arc<dyn NotificationSender> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpSender::new(smtp).context("building SMTP sender")?),
        None => {
            warn!("SMTP not configured; deliveries will be logged only");
            Arc::new(LogSender)
        }
    };

    let articles: Arc<dyn ArticleStore> = store.clone();
    let alert_store: Arc<dyn AlertStore> = store.clone();
    let history: Arc<dyn HistoryStore> = store.clone();

    let evaluator = Evaluator::new(articles.clone(), alert_store.clone());
    let dispatcher = Dispatcher::new(
        alert_store.clone(),
        history.clone(),
        sender,
        Duration::from_secs(config.dispatch_timeout_secs),
    );
    let processor = Arc::new(AlertProcessor::new(alert_store, evaluator, dispatcher));

    let metrics = Metrics::init(config.lookback_days);

    // Missing feed credentials disable ingestion loudly; alert processing
    // keeps running against whatever the store already holds.
    let feed = match NewsApiClient::from_env() {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            error!(error = %e, "news ingestion disabled");
            None
        }
    };
    if let Some(client) = feed.clone() {
        spawn_fetch_loop(client, articles.clone(), config.clone());
    }
    spawn_process_loop(processor.clone(), config.clone());

    let state = AppState {
        processor: processor.clone(),
        history,
        articles,
        feed,
        config: config.clone(),
    };
    let router = api::router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
            processor.request_stop();
        })
        .await?;
    Ok(())
}
