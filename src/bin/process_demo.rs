//! Demo that seeds sample articles and subscriptions, then runs one batch
//! with the log-only sender and prints the run summary.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use newswatch::dispatch::Dispatcher;
use newswatch::evaluator::Evaluator;
use newswatch::ingest::{self, newsapi};
use newswatch::notify::LogSender;
use newswatch::processor::AlertProcessor;
use newswatch::store::MemoryStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let store = Arc::new(MemoryStore::new());
    let now = Utc::now();

    let stats = ingest::store_drafts(store.as_ref(), newsapi::sample_drafts(now))
        .await
        .expect("seed sample articles");
    println!("seeded {} sample article(s)", stats.stored_new);

    let filter = store.create_filter("sample news", vec!["sample".into()], vec![], vec![]);
    store
        .create_alert("demo@example.com", filter.id, "immediate", now)
        .expect("seed demo alert");

    let evaluator = Evaluator::new(store.clone(), store.clone());
    let dispatcher = Dispatcher::new(
        store.clone(),
        store.clone(),
        Arc::new(LogSender),
        Duration::from_secs(5),
    );
    let processor = AlertProcessor::new(store.clone(), evaluator, dispatcher);

    let summary = processor
        .process_all(chrono::Duration::days(1), Utc::now())
        .await
        .expect("process alerts");

    println!(
        "{}",
        serde_json::to_string_pretty(&summary).expect("serialize summary")
    );
}
