// src/cadence.rs
use chrono::{DateTime, Duration as ChronoDuration, Utc};

/// Delivery cadence for an alert subscription.
/// - `Immediate`: eligible on every cycle.
/// - `Hourly` / `Daily`: eligible once the minimum interval since the last
///   dispatch has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Immediate,
    Hourly,
    Daily,
}

impl Frequency {
    /// Parse a configured cadence string. Returns `None` for anything
    /// unrecognized; callers must treat that as a configuration error, never
    /// as `Immediate`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "immediate" => Some(Frequency::Immediate),
            "hourly" => Some(Frequency::Hourly),
            "daily" => Some(Frequency::Daily),
            _ => None,
        }
    }

    fn min_interval(self) -> Option<ChronoDuration> {
        match self {
            Frequency::Immediate => None,
            Frequency::Hourly => Some(ChronoDuration::hours(1)),
            Frequency::Daily => Some(ChronoDuration::hours(24)),
        }
    }
}

/// Check whether an alert may fire at `now` given when it last fired.
/// First dispatch (no `last` timestamp) is always allowed. Does NOT mutate
/// state; the dispatcher records the new timestamp only after a successful
/// send, so a failed delivery leaves the alert due on the next cycle.
pub fn is_due(frequency: Frequency, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    let Some(interval) = frequency.min_interval() else {
        return true;
    };
    match last {
        None => true,
        Some(ts) => now.signed_duration_since(ts) >= interval,
    }
}
