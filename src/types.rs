//! types.rs — domain records shared across the pipeline: articles, filters,
//! alerts, and the append-only dispatch history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A stored news article. Identity is derived from the canonical URL, so
/// re-ingesting the same URL always resolves to the same record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub url: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

/// Stable article id: first 16 hex chars of SHA-256 over the canonical URL.
pub fn article_id(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// An article as produced by the feed client, before it has an identity or a
/// fetch timestamp. `published_at` is already parsed and normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDraft {
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: String,
    pub source: String,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ArticleDraft {
    pub fn into_article(self, fetched_at: DateTime<Utc>) -> Article {
        Article {
            id: article_id(&self.url),
            title: self.title,
            description: self.description,
            content: self.content,
            url: self.url,
            source: self.source,
            author: self.author,
            published_at: self.published_at,
            image_url: self.image_url,
            category: self.category,
            keywords: self.keywords,
            fetched_at,
        }
    }
}

/// Saved match criteria. Each dimension is an independent list; an empty list
/// means "no constraint on this dimension".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub is_active: bool,
}

impl Filter {
    pub fn named(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            keywords: Vec::new(),
            sources: Vec::new(),
            categories: Vec::new(),
            is_active: true,
        }
    }

    pub fn keywords(mut self, kws: &[&str]) -> Self {
        self.keywords = kws.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn sources(mut self, srcs: &[&str]) -> Self {
        self.sources = srcs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn categories(mut self, cats: &[&str]) -> Self {
        self.categories = cats.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// A subscription: one destination email bound to one filter, with a delivery
/// cadence. `frequency` is kept as the raw configured string and parsed at
/// evaluation time, so an unrecognized value surfaces as a per-alert
/// configuration error instead of being coerced to some default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    pub email: String,
    pub filter_id: u64,
    pub frequency: String,
    pub is_active: bool,
    pub last_dispatch_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Terminal outcome of one dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchOutcome {
    Sent,
    Failed,
}

/// One line of the delivery audit log. Created once per dispatch attempt,
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub id: u64,
    pub alert_id: u64,
    pub article_ids: Vec<String>,
    pub sent_at: DateTime<Utc>,
    pub outcome: DispatchOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_id_is_stable_and_url_bound() {
        let a = article_id("https://example.com/news/1");
        let b = article_id("https://example.com/news/1");
        let c = article_id("https://example.com/news/2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn filter_builder_fills_dimensions() {
        let f = Filter::named(1, "tech")
            .keywords(&["rust", "ai"])
            .sources(&["Reuters"]);
        assert_eq!(f.keywords, vec!["rust", "ai"]);
        assert_eq!(f.sources, vec!["Reuters"]);
        assert!(f.categories.is_empty());
        assert!(f.is_active);
    }
}
