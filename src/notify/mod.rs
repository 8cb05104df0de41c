//! notify — outbound delivery seam plus the email body rendering shared by
//! every sender implementation.

pub mod email;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{Article, Filter};

/// Delivery collaborator. Implementations must bound their own transport
/// timeouts; the dispatcher additionally wraps calls in a hard deadline.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn deliver(
        &self,
        to: &str,
        filter: &Filter,
        articles: &[Article],
    ) -> anyhow::Result<()>;
}

/// Log-only sender used when SMTP is not configured (and by the demo binary).
/// Every delivery is reported at INFO so a local run stays observable.
pub struct LogSender;

#[async_trait]
impl NotificationSender for LogSender {
    async fn deliver(
        &self,
        to: &str,
        filter: &Filter,
        articles: &[Article],
    ) -> anyhow::Result<()> {
        tracing::info!(
            to,
            filter = %filter.name,
            articles = articles.len(),
            subject = %subject(filter),
            "log-only delivery (SMTP disabled)"
        );
        Ok(())
    }
}

pub fn subject(filter: &Filter) -> String {
    format!("News Alert: {}", filter.name)
}

fn fmt_published(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        s.chars().take(max).collect()
    } else {
        s.to_string()
    }
}

/// HTML body: one block per article with linked title, source, publish time,
/// and a truncated description. The caller passes the already-capped list.
pub fn render_html(filter: &Filter, articles: &[Article]) -> String {
    let name = html_escape::encode_text(&filter.name);
    let mut out = format!(
        "<html>\n<body>\n<h2>News Alert: {name}</h2>\n\
         <p>You have {} new article(s) matching your criteria.</p>\n<hr>\n",
        articles.len()
    );
    for item in articles {
        out.push_str(&format!(
            "<div style=\"margin-bottom: 20px; padding: 10px; border: 1px solid #ddd;\">\n\
             <h3><a href=\"{url}\" target=\"_blank\">{title}</a></h3>\n\
             <p><strong>Source:</strong> {source}</p>\n\
             <p><strong>Published:</strong> {published}</p>\n",
            url = html_escape::encode_double_quoted_attribute(&item.url),
            title = html_escape::encode_text(&item.title),
            source = html_escape::encode_text(&item.source),
            published = fmt_published(item.published_at),
        ));
        if let Some(desc) = &item.description {
            out.push_str(&format!(
                "<p>{}...</p>\n",
                html_escape::encode_text(&truncate_chars(desc, 200))
            ));
        }
        out.push_str("</div>\n");
    }
    out.push_str(
        "<hr>\n<p><small>This is an automated news alert. To manage your alerts, \
         please visit the news alert system.</small></p>\n</body>\n</html>\n",
    );
    out
}

/// Plain-text alternative for clients that reject HTML.
pub fn render_text(filter: &Filter, articles: &[Article]) -> String {
    let mut out = format!(
        "News Alert: {}\nYou have {} new article(s) matching your criteria.\n\n",
        filter.name,
        articles.len()
    );
    for item in articles {
        out.push_str(&format!(
            "- {} ({}, {})\n  {}\n",
            item.title,
            item.source,
            fmt_published(item.published_at),
            item.url
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn article(title: &str, desc: Option<&str>) -> Article {
        let ts = Utc.with_ymd_and_hms(2025, 9, 6, 9, 30, 0).unwrap();
        Article {
            id: crate::types::article_id(title),
            title: title.to_string(),
            description: desc.map(|d| d.to_string()),
            content: None,
            url: "https://example.com/a?x=1&y=2".into(),
            source: "Wire & Co".into(),
            author: None,
            published_at: ts,
            image_url: None,
            category: None,
            keywords: vec![],
            fetched_at: ts,
        }
    }

    #[test]
    fn subject_carries_filter_name() {
        let f = Filter::named(1, "AI funding");
        assert_eq!(subject(&f), "News Alert: AI funding");
    }

    #[test]
    fn html_escapes_values_and_truncates_description() {
        let f = Filter::named(1, "tech");
        let long = "x".repeat(300);
        let html = render_html(&f, &[article("Rust <3 async", Some(&long))]);
        assert!(html.contains("Rust &lt;3 async"));
        assert!(html.contains("Wire &amp; Co"));
        assert!(html.contains(&format!("{}...", "x".repeat(200))));
        assert!(!html.contains(&"x".repeat(201)));
        assert!(html.contains("2025-09-06 09:30"));
    }

    #[test]
    fn text_lists_every_article() {
        let f = Filter::named(1, "tech");
        let txt = render_text(&f, &[article("One", None), article("Two", None)]);
        assert!(txt.contains("2 new article(s)"));
        assert!(txt.contains("- One"));
        assert!(txt.contains("- Two"));
    }
}
