// tests/dispatch_outcomes.rs
//
// Dispatcher state bookkeeping: the cadence timestamp only advances on a
// successful send, and every attempt leaves an audit record behind.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use newswatch::dispatch::Dispatcher;
use newswatch::notify::NotificationSender;
use newswatch::store::{AlertStore, ArticleStore, HistoryStore, MemoryStore};
use newswatch::types::{Article, ArticleDraft, DispatchOutcome, Filter};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 6, 15, 0, 0).unwrap()
}

struct OkSender;

#[async_trait]
impl NotificationSender for OkSender {
    async fn deliver(&self, _: &str, _: &Filter, _: &[Article]) -> anyhow::Result<()> {
        Ok(())
    }
}

struct ErrSender;

#[async_trait]
impl NotificationSender for ErrSender {
    async fn deliver(&self, _: &str, _: &Filter, _: &[Article]) -> anyhow::Result<()> {
        anyhow::bail!("550 mailbox unavailable")
    }
}

/// Sender that never returns inside the dispatcher's deadline.
struct StuckSender;

#[async_trait]
impl NotificationSender for StuckSender {
    async fn deliver(&self, _: &str, _: &Filter, _: &[Article]) -> anyhow::Result<()> {
        tokio::time::sleep(StdDuration::from_secs(60)).await;
        Ok(())
    }
}

async fn setup(store: &Arc<MemoryStore>) -> (newswatch::types::Alert, Filter, Vec<Article>) {
    let filter = store.create_filter("tech", vec!["tech".into()], vec![], vec![]);
    let alert = store
        .create_alert("reader@example.com", filter.id, "daily", now())
        .unwrap();
    let draft = ArticleDraft {
        title: "tech headline".into(),
        description: None,
        content: None,
        url: "https://example.com/tech/1".into(),
        source: "Wire".into(),
        author: None,
        published_at: now() - Duration::minutes(5),
        image_url: None,
        category: None,
        keywords: vec![],
    };
    let (article, _) = store.upsert_by_url(draft, now()).await.unwrap();
    (alert, filter, vec![article])
}

fn dispatcher(store: &Arc<MemoryStore>, sender: Arc<dyn NotificationSender>) -> Dispatcher {
    Dispatcher::new(
        store.clone(),
        store.clone(),
        sender,
        StdDuration::from_millis(100),
    )
}

#[tokio::test]
async fn success_advances_cadence_state_and_records_history() {
    let store = Arc::new(MemoryStore::new());
    let (mut alert, filter, articles) = setup(&store).await;

    let outcome = dispatcher(&store, Arc::new(OkSender))
        .dispatch(&mut alert, &filter, &articles, now())
        .await;

    assert_eq!(outcome, DispatchOutcome::Sent);
    assert_eq!(alert.last_dispatch_at, Some(now()));

    let persisted = store.alert_by_id(alert.id).await.unwrap().unwrap();
    assert_eq!(persisted.last_dispatch_at, Some(now()));

    let history = store.recent(10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].outcome, DispatchOutcome::Sent);
    assert_eq!(history[0].alert_id, alert.id);
    assert_eq!(history[0].article_ids, vec![articles[0].id.clone()]);
}

#[tokio::test]
async fn failure_keeps_cadence_state_but_still_audits() {
    let store = Arc::new(MemoryStore::new());
    let (mut alert, filter, articles) = setup(&store).await;

    let outcome = dispatcher(&store, Arc::new(ErrSender))
        .dispatch(&mut alert, &filter, &articles, now())
        .await;

    assert_eq!(outcome, DispatchOutcome::Failed);
    assert_eq!(alert.last_dispatch_at, None);
    assert_eq!(
        store.alert_by_id(alert.id).await.unwrap().unwrap().last_dispatch_at,
        None
    );

    let history = store.recent(10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].outcome, DispatchOutcome::Failed);
    assert_eq!(history[0].article_ids, vec![articles[0].id.clone()]);
}

#[tokio::test]
async fn timeout_counts_as_delivery_failure() {
    let store = Arc::new(MemoryStore::new());
    let (mut alert, filter, articles) = setup(&store).await;

    let outcome = dispatcher(&store, Arc::new(StuckSender))
        .dispatch(&mut alert, &filter, &articles, now())
        .await;

    assert_eq!(outcome, DispatchOutcome::Failed);
    assert_eq!(alert.last_dispatch_at, None);
    let history = store.recent(10).await.unwrap();
    assert_eq!(history[0].outcome, DispatchOutcome::Failed);
}

#[tokio::test]
async fn repeated_dispatches_append_to_history() {
    let store = Arc::new(MemoryStore::new());
    let (mut alert, filter, articles) = setup(&store).await;
    let d = dispatcher(&store, Arc::new(OkSender));

    d.dispatch(&mut alert, &filter, &articles, now()).await;
    d.dispatch(&mut alert, &filter, &articles, now() + Duration::days(1))
        .await;

    let history = store.recent(10).await.unwrap();
    assert_eq!(history.len(), 2);
    // newest first
    assert!(history[0].sent_at > history[1].sent_at);
}
