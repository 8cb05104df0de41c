// src/ingest/mod.rs
pub mod newsapi;
pub mod scheduler;

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;

use crate::store::ArticleStore;
use crate::types::ArticleDraft;

/// Field length caps applied at storage time.
const TITLE_MAX: usize = 500;
const DESCRIPTION_MAX: usize = 2000;
const CONTENT_MAX: usize = 10_000;
const SOURCE_MAX: usize = 200;
const AUTHOR_MAX: usize = 200;
const URL_MAX: usize = 1000;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_articles_total", "Articles received from the feed.");
        describe_counter!("ingest_new_total", "Articles stored as new records.");
        describe_counter!(
            "ingest_duplicate_total",
            "Articles resolved to an existing URL."
        );
        describe_counter!(
            "ingest_dropped_total",
            "Articles dropped during normalization (no title or URL)."
        );
        describe_gauge!("ingest_last_run_ts", "Unix ts when ingest last ran.");
    });
}

/// Normalize text: decode HTML entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

fn cap_chars(s: String, max: usize) -> String {
    if s.chars().count() > max {
        s.chars().take(max).collect()
    } else {
        s
    }
}

fn clean_opt(v: Option<String>, max: usize) -> Option<String> {
    v.map(|s| cap_chars(normalize_text(&s), max))
        .filter(|s| !s.is_empty())
}

/// Normalize one draft: strip markup, enforce field caps, drop records that
/// end up without a usable title or URL.
pub fn normalize_draft(mut draft: ArticleDraft) -> Option<ArticleDraft> {
    draft.title = cap_chars(normalize_text(&draft.title), TITLE_MAX);
    draft.url = cap_chars(draft.url.trim().to_string(), URL_MAX);
    if draft.title.is_empty() || draft.url.is_empty() {
        return None;
    }
    draft.source = cap_chars(normalize_text(&draft.source), SOURCE_MAX);
    if draft.source.is_empty() {
        draft.source = "Unknown".to_string();
    }
    draft.description = clean_opt(draft.description, DESCRIPTION_MAX);
    draft.content = clean_opt(draft.content, CONTENT_MAX);
    draft.author = clean_opt(draft.author, AUTHOR_MAX);
    draft.image_url = draft
        .image_url
        .map(|u| cap_chars(u.trim().to_string(), URL_MAX))
        .filter(|u| !u.is_empty());
    Some(draft)
}

/// Counters for one ingest pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct IngestStats {
    pub received: usize,
    pub stored_new: usize,
    pub duplicates: usize,
    pub dropped: usize,
}

/// Normalize and store a batch of drafts. Storage is idempotent by URL, so
/// re-running over an overlapping feed page only creates the unseen articles.
pub async fn store_drafts(
    store: &dyn ArticleStore,
    drafts: Vec<ArticleDraft>,
) -> Result<IngestStats, crate::error::AlertError> {
    ensure_metrics_described();

    let mut stats = IngestStats {
        received: drafts.len(),
        ..Default::default()
    };
    let fetched_at = Utc::now();

    for raw in drafts {
        let Some(draft) = normalize_draft(raw) else {
            stats.dropped += 1;
            continue;
        };
        let (_, created) = store.upsert_by_url(draft, fetched_at).await?;
        if created {
            stats.stored_new += 1;
        } else {
            stats.duplicates += 1;
        }
    }

    counter!("ingest_articles_total").increment(stats.received as u64);
    counter!("ingest_new_total").increment(stats.stored_new as u64);
    counter!("ingest_duplicate_total").increment(stats.duplicates as u64);
    counter!("ingest_dropped_total").increment(stats.dropped as u64);
    gauge!("ingest_last_run_ts").set(fetched_at.timestamp().max(0) as f64);

    Ok(stats)
}
