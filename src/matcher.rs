//! # Filter Matcher
//! Pure, testable predicate that maps `(article, filter)` → match/no-match.
//! No I/O, deterministic, suitable for unit tests per dimension.
//!
//! Dimensions combine with logical AND: every non-empty dimension must match
//! on its own. Evaluation short-circuits on the first failing dimension, which
//! is equivalent to the full conjunction.

use crate::types::{Article, Filter};

/// Decide whether `article` satisfies `filter`.
/// A filter with no active constraints matches everything.
pub fn matches(article: &Article, filter: &Filter) -> bool {
    keywords_pass(article, &filter.keywords)
        && sources_pass(article, &filter.sources)
        && categories_pass(article, &filter.categories)
}

/// Keyword rule: ANY keyword occurs (case-insensitive substring) in the
/// concatenated title + description + content. Missing fields count as empty.
fn keywords_pass(article: &Article, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let haystack = format!(
        "{} {} {}",
        article.title,
        article.description.as_deref().unwrap_or(""),
        article.content.as_deref().unwrap_or("")
    )
    .to_lowercase();
    keywords
        .iter()
        .any(|kw| !kw.is_empty() && haystack.contains(&kw.to_lowercase()))
}

/// Source rule: ANY configured source is a case-insensitive substring of the
/// article's source name.
fn sources_pass(article: &Article, sources: &[String]) -> bool {
    if sources.is_empty() {
        return true;
    }
    let article_source = article.source.to_lowercase();
    sources
        .iter()
        .any(|s| !s.is_empty() && article_source.contains(&s.to_lowercase()))
}

/// Category rule: the article's category equals ANY configured category,
/// case-insensitively. An article without a category is rejected whenever the
/// filter constrains categories at all.
fn categories_pass(article: &Article, categories: &[String]) -> bool {
    if categories.is_empty() {
        return true;
    }
    match article.category.as_deref() {
        Some(cat) => categories.iter().any(|c| c.eq_ignore_ascii_case(cat)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn mk_article(title: &str, source: &str, category: Option<&str>) -> Article {
        let ts = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        Article {
            id: crate::types::article_id(title),
            title: title.to_string(),
            description: None,
            content: None,
            url: format!("https://example.com/{}", title.replace(' ', "-")),
            source: source.to_string(),
            author: None,
            published_at: ts,
            image_url: None,
            category: category.map(|c| c.to_string()),
            keywords: Vec::new(),
            fetched_at: ts,
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let f = Filter::named(1, "all");
        let a = mk_article("Anything at all", "AnySource", None);
        assert!(matches(&a, &f));
    }

    #[test]
    fn keyword_is_case_insensitive_substring_over_all_text_fields() {
        let f = Filter::named(1, "tech").keywords(&["RUST"]);
        let mut a = mk_article("Quiet day on the markets", "Reuters", None);
        assert!(!matches(&a, &f));

        a.description = Some("A deep dive into Rust async runtimes".into());
        assert!(matches(&a, &f));

        a.description = None;
        a.content = Some("trust the process".into());
        // substring semantics: "rust" occurs inside "trust"
        assert!(matches(&a, &f));
    }

    #[test]
    fn failing_keywords_reject_regardless_of_other_dimensions() {
        let f = Filter::named(1, "tech")
            .keywords(&["quantum"])
            .sources(&["Reuters"])
            .categories(&["technology"]);
        let a = mk_article("Markets rally", "Reuters", Some("technology"));
        assert!(!matches(&a, &f));
    }

    #[test]
    fn source_matches_on_substring() {
        let f = Filter::named(1, "wire").sources(&["reuters"]);
        let a = mk_article("Headline", "Thomson Reuters", None);
        assert!(matches(&a, &f));
        let b = mk_article("Headline", "Bloomberg", None);
        assert!(!matches(&b, &f));
    }

    #[test]
    fn category_requires_exact_equality() {
        let f = Filter::named(1, "biz").categories(&["Business"]);
        assert!(matches(&mk_article("x", "s", Some("business")), &f));
        assert!(!matches(&mk_article("x", "s", Some("business-news")), &f));
    }

    #[test]
    fn category_constraint_rejects_uncategorized_articles() {
        let f = Filter::named(1, "biz").categories(&["business"]);
        assert!(!matches(&mk_article("x", "s", None), &f));
    }

    #[test]
    fn dimensions_combine_with_and() {
        let f = Filter::named(1, "narrow")
            .keywords(&["earnings"])
            .sources(&["Reuters"])
            .categories(&["business"]);
        let hit = mk_article("Q3 earnings beat estimates", "Reuters", Some("business"));
        assert!(matches(&hit, &f));
        let wrong_source = mk_article("Q3 earnings beat estimates", "Bloomberg", Some("business"));
        assert!(!matches(&wrong_source, &f));
    }
}
