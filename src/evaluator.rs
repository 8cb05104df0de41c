//! # Alert Evaluator
//! Per-alert pipeline: cadence check → candidate query → filter match →
//! delivery cap. The cadence check runs first so alerts that are not due
//! never touch the article store.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::cadence::{self, Frequency};
use crate::error::AlertError;
use crate::matcher;
use crate::store::{AlertStore, ArticleStore};
use crate::types::{Alert, Article, Filter};

/// Maximum number of articles included in a single notification.
pub const DISPATCH_CAP: usize = 10;

/// Result of evaluating one alert.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// The cadence gate said "not due"; no store query was made.
    SkippedCadence,
    /// The alert was due. `matched` is capped at [`DISPATCH_CAP`] newest
    /// first; an empty set means "nothing to send this cycle".
    Due {
        considered: usize,
        matched: Vec<Article>,
        filter: Filter,
    },
}

pub struct Evaluator {
    articles: Arc<dyn ArticleStore>,
    alerts: Arc<dyn AlertStore>,
}

impl Evaluator {
    pub fn new(articles: Arc<dyn ArticleStore>, alerts: Arc<dyn AlertStore>) -> Self {
        Self { articles, alerts }
    }

    /// Evaluate `alert` against articles published within `lookback` of `now`.
    ///
    /// `now` is injected rather than read from a global clock so tests can
    /// pin the cadence decisions.
    pub async fn evaluate(
        &self,
        alert: &Alert,
        lookback: Duration,
        now: DateTime<Utc>,
    ) -> Result<Evaluation, AlertError> {
        let frequency = Frequency::parse(&alert.frequency).ok_or_else(|| {
            AlertError::Configuration(format!(
                "alert {} has unknown cadence '{}'",
                alert.id, alert.frequency
            ))
        })?;

        if !cadence::is_due(frequency, alert.last_dispatch_at, now) {
            return Ok(Evaluation::SkippedCadence);
        }

        let filter = self
            .alerts
            .filter_by_id(alert.filter_id)
            .await?
            .ok_or_else(|| {
                AlertError::Configuration(format!(
                    "alert {} references missing filter {}",
                    alert.id, alert.filter_id
                ))
            })?;

        // The store contract returns candidates newest first, so truncation
        // keeps the most recent matches.
        let candidates = self.articles.published_since(now - lookback).await?;
        let considered = candidates.len();
        let mut matched: Vec<Article> = candidates
            .into_iter()
            .filter(|a| matcher::matches(a, &filter))
            .collect();
        matched.truncate(DISPATCH_CAP);

        Ok(Evaluation::Due {
            considered,
            matched,
            filter,
        })
    }
}
