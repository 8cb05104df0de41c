// src/ingest/newsapi.rs
//
// Client for the external news feed (NewsAPI-shaped JSON). A missing API key
// is an explicit, loud condition at construction time, never a silent
// fallback to canned data.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::types::ArticleDraft;

const ENV_API_KEY: &str = "NEWS_API_KEY";
const ENV_BASE_URL: &str = "NEWS_API_URL";
const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2";

pub struct NewsApiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl NewsApiClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build http client")?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            client,
        })
    }

    /// Build from the environment. Errors when `NEWS_API_KEY` is unset so the
    /// caller can disable ingestion loudly instead of degrading to sample
    /// data the way the legacy pipeline did.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(ENV_API_KEY)
            .context("NEWS_API_KEY not set; news ingestion cannot run")?;
        let base_url =
            std::env::var(ENV_BASE_URL).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(api_key, base_url)
    }

    /// Top headlines, optionally narrowed to a category.
    pub async fn top_headlines(
        &self,
        category: Option<&str>,
        country: &str,
        page_size: u32,
    ) -> Result<Vec<ArticleDraft>> {
        let url = format!("{}/top-headlines", self.base_url);
        let mut params: Vec<(&str, String)> = vec![
            ("apiKey", self.api_key.clone()),
            ("country", country.to_string()),
            ("pageSize", page_size.to_string()),
        ];
        if let Some(cat) = category {
            params.push(("category", cat.to_string()));
        }
        self.fetch(&url, &params).await
    }

    /// Everything endpoint, sorted by publish time.
    pub async fn everything(&self, query: Option<&str>, page_size: u32) -> Result<Vec<ArticleDraft>> {
        let url = format!("{}/everything", self.base_url);
        let params: Vec<(&str, String)> = vec![
            ("apiKey", self.api_key.clone()),
            ("pageSize", page_size.to_string()),
            ("sortBy", "publishedAt".to_string()),
            ("q", query.unwrap_or("news").to_string()),
        ];
        self.fetch(&url, &params).await
    }

    async fn fetch(&self, url: &str, params: &[(&str, String)]) -> Result<Vec<ArticleDraft>> {
        let resp = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .context("news feed request failed")?
            .error_for_status()
            .context("news feed returned an error status")?;

        let body: ApiResponse = resp.json().await.context("parse news feed JSON")?;
        let now = Utc::now();
        Ok(body
            .articles
            .into_iter()
            .filter_map(|a| a.into_draft(now))
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    articles: Vec<ApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiArticle {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    source: Option<ApiSource>,
    author: Option<String>,
    published_at: Option<String>,
    url_to_image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiSource {
    name: Option<String>,
}

impl ApiArticle {
    /// Map a feed record onto a draft. Records without a URL are unusable
    /// (identity is URL-derived) and are skipped. An unparseable publish time
    /// falls back to the fetch time.
    fn into_draft(self, now: DateTime<Utc>) -> Option<ArticleDraft> {
        let url = self.url?;
        Some(ArticleDraft {
            title: self.title.unwrap_or_default(),
            description: self.description,
            content: self.content,
            url,
            source: self
                .source
                .and_then(|s| s.name)
                .unwrap_or_else(|| "Unknown".to_string()),
            author: self.author,
            published_at: self
                .published_at
                .as_deref()
                .and_then(parse_published)
                .unwrap_or(now),
            image_url: self.url_to_image,
            category: None,
            keywords: Vec::new(),
        })
    }
}

fn parse_published(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Two canned articles for offline runs. Reachable only from the demo binary
/// and tests; the service itself refuses to start ingestion without a key.
pub fn sample_drafts(now: DateTime<Utc>) -> Vec<ArticleDraft> {
    vec![
        ArticleDraft {
            title: "Sample News Article 1".into(),
            description: Some("This is a sample news article description.".into()),
            content: Some("This is the full content of the sample news article.".into()),
            url: "https://example.com/news/1".into(),
            source: "Sample Source".into(),
            author: Some("Sample Author".into()),
            published_at: now,
            image_url: None,
            category: None,
            keywords: Vec::new(),
        },
        ArticleDraft {
            title: "Sample News Article 2".into(),
            description: Some("Another sample news article description.".into()),
            content: Some("Another sample news article content.".into()),
            url: "https://example.com/news/2".into(),
            source: "Another Source".into(),
            author: Some("Another Author".into()),
            published_at: now - chrono::Duration::hours(1),
            image_url: None,
            category: None,
            keywords: Vec::new(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_json_maps_onto_drafts() {
        let body = r#"{
            "status": "ok",
            "articles": [
                {
                    "title": "Headline",
                    "description": "desc",
                    "url": "https://example.com/a",
                    "source": {"name": "Reuters"},
                    "author": "Jo",
                    "publishedAt": "2025-09-06T09:00:00Z",
                    "urlToImage": null
                },
                { "title": "no url, dropped", "source": {"name": "X"} }
            ]
        }"#;
        let parsed: ApiResponse = serde_json::from_str(body).unwrap();
        let now = Utc::now();
        let drafts: Vec<ArticleDraft> = parsed
            .articles
            .into_iter()
            .filter_map(|a| a.into_draft(now))
            .collect();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].source, "Reuters");
        assert_eq!(drafts[0].published_at.to_rfc3339(), "2025-09-06T09:00:00+00:00");
    }

    #[test]
    fn publish_time_accepts_both_formats() {
        assert!(parse_published("2025-09-06T09:00:00Z").is_some());
        assert!(parse_published("2025-09-06 09:00:00").is_some());
        assert!(parse_published("yesterday").is_none());
    }
}
