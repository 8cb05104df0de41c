// tests/ingest_dedup.rs
//
// Idempotent ingestion: the same URL never creates a second record, and the
// second upsert resolves to the first record's identity unchanged.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use newswatch::ingest;
use newswatch::store::{ArticleStore, MemoryStore};
use newswatch::types::ArticleDraft;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 6, 10, 0, 0).unwrap()
}

fn draft(url: &str, title: &str) -> ArticleDraft {
    ArticleDraft {
        title: title.into(),
        description: None,
        content: None,
        url: url.into(),
        source: "Wire".into(),
        author: None,
        published_at: now(),
        image_url: None,
        category: None,
        keywords: vec![],
    }
}

#[tokio::test]
async fn upserting_the_same_url_twice_yields_one_record() {
    let store = Arc::new(MemoryStore::new());

    let (first, created) = store
        .upsert_by_url(draft("https://example.com/a", "original title"), now())
        .await
        .unwrap();
    assert!(created);

    // Second ingest of the same URL, even with different text, resolves to
    // the stored record.
    let (second, created) = store
        .upsert_by_url(draft("https://example.com/a", "updated title"), now())
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(second.id, first.id);
    assert_eq!(second.title, "original title");
    assert_eq!(store.article_count(), 1);
}

#[tokio::test]
async fn store_drafts_reports_new_vs_duplicate() {
    let store = Arc::new(MemoryStore::new());

    let batch = vec![
        draft("https://example.com/a", "one"),
        draft("https://example.com/b", "two"),
    ];
    let stats = ingest::store_drafts(store.as_ref(), batch).await.unwrap();
    assert_eq!(stats.stored_new, 2);
    assert_eq!(stats.duplicates, 0);

    // Overlapping second page: one known URL, one new.
    let batch = vec![
        draft("https://example.com/b", "two"),
        draft("https://example.com/c", "three"),
    ];
    let stats = ingest::store_drafts(store.as_ref(), batch).await.unwrap();
    assert_eq!(stats.stored_new, 1);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(store.article_count(), 3);
}

#[tokio::test]
async fn unusable_records_are_dropped_not_stored() {
    let store = Arc::new(MemoryStore::new());

    let batch = vec![draft("https://example.com/ok", "fine"), draft("", "no url")];
    let stats = ingest::store_drafts(store.as_ref(), batch).await.unwrap();
    assert_eq!(stats.stored_new, 1);
    assert_eq!(stats.dropped, 1);
}

#[tokio::test]
async fn published_since_excludes_older_articles() {
    let store = Arc::new(MemoryStore::new());
    let mut old = draft("https://example.com/old", "old");
    old.published_at = now() - Duration::days(3);
    store.upsert_by_url(old, now()).await.unwrap();
    store
        .upsert_by_url(draft("https://example.com/new", "new"), now())
        .await
        .unwrap();

    let recent = store.published_since(now() - Duration::days(1)).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].title, "new");
}
