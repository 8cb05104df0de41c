// src/config.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::store::MemoryStore;

const ENV_SEEDS_PATH: &str = "ALERTS_CONFIG_PATH";

/// SMTP relay settings. Absent when the deployment runs without email, in
/// which case deliveries go through the log-only sender.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub user: String,
    pub pass: String,
    pub from: String,
    pub timeout_secs: u64,
}

/// Service configuration, read from the environment with defaults that suit a
/// local run. `.env` is honored when the binary loads dotenvy first.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Candidate window: articles published within the last N days.
    pub lookback_days: i64,
    pub process_interval_secs: u64,
    pub fetch_interval_secs: u64,
    /// Hard deadline on one delivery attempt.
    pub dispatch_timeout_secs: u64,
    pub country: String,
    pub page_size: u32,
    pub smtp: Option<SmtpConfig>,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Self {
        let smtp = match (
            std::env::var("SMTP_HOST"),
            std::env::var("SMTP_USER"),
            std::env::var("SMTP_PASS"),
            std::env::var("ALERT_EMAIL_FROM"),
        ) {
            (Ok(host), Ok(user), Ok(pass), Ok(from)) => Some(SmtpConfig {
                host,
                user,
                pass,
                from,
                timeout_secs: env_parse("SMTP_TIMEOUT_SECS", 10),
            }),
            _ => None,
        };

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into()),
            lookback_days: env_parse("ALERT_LOOKBACK_DAYS", 1),
            process_interval_secs: env_parse("PROCESS_INTERVAL_SECS", 300),
            fetch_interval_secs: env_parse("FETCH_INTERVAL_SECS", 900),
            dispatch_timeout_secs: env_parse("DISPATCH_TIMEOUT_SECS", 15),
            country: std::env::var("NEWS_COUNTRY").unwrap_or_else(|_| "us".into()),
            page_size: env_parse("NEWS_PAGE_SIZE", 100),
            smtp,
        }
    }

    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::days(self.lookback_days.max(0))
    }
}

// --- subscription seeds ---
//
// Filters and alerts come from a TOML file at boot; the admin/CRUD surface of
// the system lives outside this service.

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FilterSeed {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AlertSeed {
    pub email: String,
    /// References a `[[filters]]` entry by name.
    pub filter: String,
    pub frequency: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SubscriptionSeeds {
    #[serde(default)]
    pub filters: Vec<FilterSeed>,
    #[serde(default)]
    pub alerts: Vec<AlertSeed>,
}

/// Load seeds from an explicit path.
pub fn load_seeds_from(path: &Path) -> Result<SubscriptionSeeds> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading subscriptions from {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Load seeds using env var + fallback:
/// 1) $ALERTS_CONFIG_PATH
/// 2) config/alerts.toml
/// Missing file means an empty subscription set, not an error.
pub fn load_seeds_default() -> Result<SubscriptionSeeds> {
    if let Ok(p) = std::env::var(ENV_SEEDS_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_seeds_from(&pb);
        }
        anyhow::bail!("ALERTS_CONFIG_PATH points to non-existent path");
    }
    let fallback = PathBuf::from("config/alerts.toml");
    if fallback.exists() {
        return load_seeds_from(&fallback);
    }
    Ok(SubscriptionSeeds::default())
}

/// Apply seeds to the store. Invalid entries are logged and skipped so one bad
/// subscription cannot keep the service from starting.
/// Returns (filters_created, alerts_created).
pub fn seed_store(
    store: &MemoryStore,
    seeds: &SubscriptionSeeds,
    now: DateTime<Utc>,
) -> (usize, usize) {
    let mut filters = 0usize;
    let mut alerts = 0usize;
    let mut by_name = std::collections::HashMap::new();

    for seed in &seeds.filters {
        let f = store.create_filter(
            &seed.name,
            seed.keywords.clone(),
            seed.sources.clone(),
            seed.categories.clone(),
        );
        by_name.insert(seed.name.clone(), f.id);
        filters += 1;
    }

    for seed in &seeds.alerts {
        let Some(&filter_id) = by_name.get(&seed.filter) else {
            tracing::warn!(alert = %seed.email, filter = %seed.filter, "alert references unknown filter, skipping");
            continue;
        };
        match store.create_alert(&seed.email, filter_id, &seed.frequency, now) {
            Ok(_) => alerts += 1,
            Err(e) => {
                tracing::warn!(alert = %seed.email, error = %e, "skipping invalid alert seed");
            }
        }
    }

    (filters, alerts)
}
