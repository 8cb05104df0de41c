//! # Dispatcher
//! Owns the side effects of one delivery: invoke the sender, advance the
//! alert's cadence state, append the audit record.
//!
//! Ordering invariant: `last_dispatch_at` moves forward only after a
//! successful send. A failed or timed-out delivery leaves the alert due on
//! the next cycle, and still leaves a `failed` audit record behind.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::notify::NotificationSender;
use crate::store::{AlertStore, HistoryStore};
use crate::types::{Alert, Article, DispatchOutcome, Filter};

pub struct Dispatcher {
    alerts: Arc<dyn AlertStore>,
    history: Arc<dyn HistoryStore>,
    sender: Arc<dyn NotificationSender>,
    send_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        alerts: Arc<dyn AlertStore>,
        history: Arc<dyn HistoryStore>,
        sender: Arc<dyn NotificationSender>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            alerts,
            history,
            sender,
            send_timeout,
        }
    }

    /// Deliver `matched` to the alert's destination and update state.
    ///
    /// Precondition: `matched` is non-empty (the processor never invokes the
    /// dispatcher for an empty set). Delivery failure is a returned outcome,
    /// not an error. Store failures after a successful send are logged and
    /// never rolled back or retried: the mail is already out, and a retry
    /// would risk a duplicate send.
    pub async fn dispatch(
        &self,
        alert: &mut Alert,
        filter: &Filter,
        matched: &[Article],
        now: DateTime<Utc>,
    ) -> DispatchOutcome {
        debug_assert!(!matched.is_empty(), "dispatch requires a non-empty match set");

        let delivery = tokio::time::timeout(
            self.send_timeout,
            self.sender.deliver(&alert.email, filter, matched),
        )
        .await;

        let article_ids: Vec<String> = matched.iter().map(|a| a.id.clone()).collect();

        match delivery {
            Ok(Ok(())) => {
                alert.last_dispatch_at = Some(now);
                if let Err(e) = self.alerts.save_alert(alert).await {
                    error!(alert = alert.id, error = %e, "delivered but failed to persist last_dispatch_at");
                }
                if let Err(e) = self
                    .history
                    .record(alert.id, article_ids, DispatchOutcome::Sent, now)
                    .await
                {
                    warn!(alert = alert.id, error = %e, "delivered but audit record failed");
                }
                info!(alert = alert.id, to = %alert.email, articles = matched.len(), "alert sent");
                DispatchOutcome::Sent
            }
            Ok(Err(e)) => {
                warn!(alert = alert.id, to = %alert.email, error = %e, "delivery failed");
                self.record_failure(alert.id, article_ids, now).await;
                DispatchOutcome::Failed
            }
            Err(_elapsed) => {
                warn!(
                    alert = alert.id,
                    to = %alert.email,
                    timeout_secs = self.send_timeout.as_secs(),
                    "delivery timed out"
                );
                self.record_failure(alert.id, article_ids, now).await;
                DispatchOutcome::Failed
            }
        }
    }

    async fn record_failure(&self, alert_id: u64, article_ids: Vec<String>, now: DateTime<Utc>) {
        if let Err(e) = self
            .history
            .record(alert_id, article_ids, DispatchOutcome::Failed, now)
            .await
        {
            warn!(alert = alert_id, error = %e, "audit record for failed delivery failed");
        }
    }
}
