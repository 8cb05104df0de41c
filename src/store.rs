//! store.rs — persistence seams for the pipeline, plus the in-memory
//! reference implementation used by the service binary and the tests.
//!
//! The traits are the collaborator boundary: a deployment can put a real
//! database behind them without touching the evaluator/dispatcher logic.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::cadence::Frequency;
use crate::error::AlertError;
use crate::types::{Alert, Article, ArticleDraft, DispatchOutcome, DispatchRecord, Filter};

/// Ingested articles, queryable by publish-time lower bound.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// All articles with `published_at >= since`, newest first.
    async fn published_since(&self, since: DateTime<Utc>) -> Result<Vec<Article>, AlertError>;

    /// Idempotent ingest. A draft whose URL is already stored resolves to the
    /// existing record; the returned flag is `true` only for a fresh insert.
    async fn upsert_by_url(
        &self,
        draft: ArticleDraft,
        fetched_at: DateTime<Utc>,
    ) -> Result<(Article, bool), AlertError>;
}

/// Alert subscriptions and their filters.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn active_alerts(&self) -> Result<Vec<Alert>, AlertError>;

    /// Fresh read of one alert; `None` if it disappeared since listing.
    async fn alert_by_id(&self, id: u64) -> Result<Option<Alert>, AlertError>;

    async fn filter_by_id(&self, id: u64) -> Result<Option<Filter>, AlertError>;

    /// Persist a mutated alert (the dispatcher's `last_dispatch_at` update).
    async fn save_alert(&self, alert: &Alert) -> Result<(), AlertError>;
}

/// Append-only dispatch audit log.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn record(
        &self,
        alert_id: u64,
        article_ids: Vec<String>,
        outcome: DispatchOutcome,
        at: DateTime<Utc>,
    ) -> Result<DispatchRecord, AlertError>;

    /// Last `n` records, newest first.
    async fn recent(&self, n: usize) -> Result<Vec<DispatchRecord>, AlertError>;
}

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));

/// Syntactic email check, applied when subscriptions are created.
pub fn validate_email(email: &str) -> Result<(), AlertError> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(AlertError::Configuration(format!(
            "invalid destination email '{email}'"
        )))
    }
}

#[derive(Default)]
struct Inner {
    articles: Vec<Article>,
    by_url: HashMap<String, usize>,
    filters: HashMap<u64, Filter>,
    alerts: HashMap<u64, Alert>,
    history: Vec<DispatchRecord>,
    next_filter_id: u64,
    next_alert_id: u64,
    next_record_id: u64,
}

/// In-memory store backing all three collaborator seams. State lives for the
/// process lifetime only; history is capped so a long-running instance stays
/// bounded.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    history_cap: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            history_cap: 10_000,
        }
    }

    /// Create a filter and assign it an id.
    pub fn create_filter(
        &self,
        name: &str,
        keywords: Vec<String>,
        sources: Vec<String>,
        categories: Vec<String>,
    ) -> Filter {
        let mut inner = self.lock();
        inner.next_filter_id += 1;
        let filter = Filter {
            id: inner.next_filter_id,
            name: name.to_string(),
            keywords,
            sources,
            categories,
            is_active: true,
        };
        inner.filters.insert(filter.id, filter.clone());
        filter
    }

    /// Create a subscription, enforcing the invariants the original data model
    /// carries: syntactically valid email, resolvable filter, known cadence,
    /// and (email, filter) uniqueness.
    pub fn create_alert(
        &self,
        email: &str,
        filter_id: u64,
        frequency: &str,
        now: DateTime<Utc>,
    ) -> Result<Alert, AlertError> {
        validate_email(email)?;
        if Frequency::parse(frequency).is_none() {
            return Err(AlertError::Configuration(format!(
                "unknown cadence '{frequency}'"
            )));
        }
        let mut inner = self.lock();
        if !inner.filters.contains_key(&filter_id) {
            return Err(AlertError::Configuration(format!(
                "filter {filter_id} does not exist"
            )));
        }
        let duplicate = inner
            .alerts
            .values()
            .any(|a| a.filter_id == filter_id && a.email.eq_ignore_ascii_case(email));
        if duplicate {
            return Err(AlertError::Configuration(format!(
                "duplicate subscription: {email} already watches filter {filter_id}"
            )));
        }
        inner.next_alert_id += 1;
        let alert = Alert {
            id: inner.next_alert_id,
            email: email.to_string(),
            filter_id,
            frequency: frequency.to_string(),
            is_active: true,
            last_dispatch_at: None,
            created_at: now,
        };
        inner.alerts.insert(alert.id, alert.clone());
        Ok(alert)
    }

    /// Insert an alert as-is, bypassing validation. For restoring persisted
    /// state and for exercising misconfigured records in tests.
    pub fn put_alert(&self, alert: Alert) {
        let mut inner = self.lock();
        inner.next_alert_id = inner.next_alert_id.max(alert.id);
        inner.alerts.insert(alert.id, alert);
    }

    pub fn article_count(&self) -> usize {
        self.lock().articles.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("store mutex poisoned")
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn published_since(&self, since: DateTime<Utc>) -> Result<Vec<Article>, AlertError> {
        let inner = self.lock();
        let mut out: Vec<Article> = inner
            .articles
            .iter()
            .filter(|a| a.published_at >= since)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(out)
    }

    async fn upsert_by_url(
        &self,
        draft: ArticleDraft,
        fetched_at: DateTime<Utc>,
    ) -> Result<(Article, bool), AlertError> {
        let mut inner = self.lock();
        if let Some(&idx) = inner.by_url.get(&draft.url) {
            return Ok((inner.articles[idx].clone(), false));
        }
        let article = draft.into_article(fetched_at);
        let idx = inner.articles.len();
        inner.by_url.insert(article.url.clone(), idx);
        inner.articles.push(article.clone());
        Ok((article, true))
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn active_alerts(&self) -> Result<Vec<Alert>, AlertError> {
        let inner = self.lock();
        let mut out: Vec<Alert> = inner
            .alerts
            .values()
            .filter(|a| a.is_active)
            .cloned()
            .collect();
        out.sort_by_key(|a| a.id);
        Ok(out)
    }

    async fn alert_by_id(&self, id: u64) -> Result<Option<Alert>, AlertError> {
        Ok(self.lock().alerts.get(&id).cloned())
    }

    async fn filter_by_id(&self, id: u64) -> Result<Option<Filter>, AlertError> {
        Ok(self.lock().filters.get(&id).cloned())
    }

    async fn save_alert(&self, alert: &Alert) -> Result<(), AlertError> {
        let mut inner = self.lock();
        match inner.alerts.get_mut(&alert.id) {
            Some(slot) => {
                *slot = alert.clone();
                Ok(())
            }
            None => Err(AlertError::Store(format!(
                "alert {} vanished during save",
                alert.id
            ))),
        }
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn record(
        &self,
        alert_id: u64,
        article_ids: Vec<String>,
        outcome: DispatchOutcome,
        at: DateTime<Utc>,
    ) -> Result<DispatchRecord, AlertError> {
        let mut inner = self.lock();
        inner.next_record_id += 1;
        let record = DispatchRecord {
            id: inner.next_record_id,
            alert_id,
            article_ids,
            sent_at: at,
            outcome,
        };
        inner.history.push(record.clone());
        if inner.history.len() > self.history_cap {
            let excess = inner.history.len() - self.history_cap;
            inner.history.drain(0..excess);
        }
        Ok(record)
    }

    async fn recent(&self, n: usize) -> Result<Vec<DispatchRecord>, AlertError> {
        let inner = self.lock();
        let len = inner.history.len();
        let start = len.saturating_sub(n);
        let mut out = inner.history[start..].to_vec();
        out.reverse();
        Ok(out)
    }
}
