//! # Batch Processor
//! Walks every active alert, applies evaluator + dispatcher, isolates
//! per-alert failures, and aggregates an operator-facing run summary.
//!
//! Overlapping runs (scheduler tick + manual trigger) are safe per alert:
//! each alert's unit of work runs under a lock keyed by its id, and the
//! alert's stored state is re-read under that lock, so the cadence gate sees
//! any `last_dispatch_at` a concurrent run just wrote.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dispatch::Dispatcher;
use crate::error::AlertError;
use crate::evaluator::{Evaluation, Evaluator};
use crate::store::AlertStore;
use crate::types::DispatchOutcome;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("alerts_sent_total", "Alerts delivered successfully.");
        describe_counter!("alerts_failed_total", "Alert deliveries that failed.");
        describe_counter!(
            "alerts_skipped_total",
            "Alerts skipped by cadence or empty match."
        );
        describe_counter!(
            "alerts_config_errors_total",
            "Alerts with unresolvable filter or cadence."
        );
        describe_gauge!("alerts_last_run_ts", "Unix ts when the last batch run finished.");
    });
}

/// Per-alert line in the run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertReport {
    pub alert_id: u64,
    pub email: String,
    pub outcome: ReportOutcome,
    pub matched: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportOutcome {
    Sent,
    SkippedCadence,
    SkippedNoMatch,
    Failed,
    ConfigError,
}

/// Aggregate counts for one batch run. Configuration errors count as failed;
/// both skip flavors count as skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
    pub details: Vec<AlertReport>,
}

pub struct AlertProcessor {
    alerts: Arc<dyn AlertStore>,
    evaluator: Evaluator,
    dispatcher: Dispatcher,
    locks: Mutex<HashMap<u64, Arc<tokio::sync::Mutex<()>>>>,
    stop: AtomicBool,
}

impl AlertProcessor {
    pub fn new(alerts: Arc<dyn AlertStore>, evaluator: Evaluator, dispatcher: Dispatcher) -> Self {
        Self {
            alerts,
            evaluator,
            dispatcher,
            locks: Mutex::new(HashMap::new()),
            stop: AtomicBool::new(false),
        }
    }

    /// Signal a graceful shutdown: in-flight runs finish the alert they are
    /// on, then stop before picking up the next one.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    fn lock_for(&self, alert_id: u64) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock map poisoned");
        locks.entry(alert_id).or_default().clone()
    }

    /// Process every active alert once. Only a store-wide outage aborts the
    /// run; per-alert failures land in the summary and processing continues.
    pub async fn process_all(
        &self,
        lookback: Duration,
        now: DateTime<Utc>,
    ) -> Result<RunSummary, AlertError> {
        ensure_metrics_described();

        let active = self.alerts.active_alerts().await?;
        info!(count = active.len(), "processing active alerts");

        let mut summary = RunSummary::default();

        for listed in active {
            if self.stop.load(Ordering::SeqCst) {
                info!(processed = summary.details.len(), "batch run aborted between alerts");
                break;
            }

            let lock = self.lock_for(listed.id);
            let _guard = lock.lock().await;

            // Fresh read under the lock: a concurrent run may have dispatched
            // this alert after we listed it.
            let Some(mut alert) = self.alerts.alert_by_id(listed.id).await? else {
                summary.skipped += 1;
                summary.details.push(AlertReport {
                    alert_id: listed.id,
                    email: listed.email.clone(),
                    outcome: ReportOutcome::SkippedCadence,
                    matched: 0,
                    reason: Some("alert removed during run".into()),
                });
                continue;
            };
            if !alert.is_active {
                summary.skipped += 1;
                summary.details.push(AlertReport {
                    alert_id: alert.id,
                    email: alert.email.clone(),
                    outcome: ReportOutcome::SkippedCadence,
                    matched: 0,
                    reason: Some("alert deactivated during run".into()),
                });
                continue;
            }

            match self.evaluator.evaluate(&alert, lookback, now).await {
                Ok(Evaluation::SkippedCadence) => {
                    summary.skipped += 1;
                    counter!("alerts_skipped_total").increment(1);
                    summary.details.push(AlertReport {
                        alert_id: alert.id,
                        email: alert.email.clone(),
                        outcome: ReportOutcome::SkippedCadence,
                        matched: 0,
                        reason: None,
                    });
                }
                Ok(Evaluation::Due { matched, .. }) if matched.is_empty() => {
                    summary.skipped += 1;
                    counter!("alerts_skipped_total").increment(1);
                    summary.details.push(AlertReport {
                        alert_id: alert.id,
                        email: alert.email.clone(),
                        outcome: ReportOutcome::SkippedNoMatch,
                        matched: 0,
                        reason: None,
                    });
                }
                Ok(Evaluation::Due {
                    matched, filter, ..
                }) => {
                    let count = matched.len();
                    let outcome = self
                        .dispatcher
                        .dispatch(&mut alert, &filter, &matched, now)
                        .await;
                    match outcome {
                        DispatchOutcome::Sent => {
                            summary.sent += 1;
                            counter!("alerts_sent_total").increment(1);
                            summary.details.push(AlertReport {
                                alert_id: alert.id,
                                email: alert.email.clone(),
                                outcome: ReportOutcome::Sent,
                                matched: count,
                                reason: None,
                            });
                        }
                        DispatchOutcome::Failed => {
                            summary.failed += 1;
                            counter!("alerts_failed_total").increment(1);
                            summary.details.push(AlertReport {
                                alert_id: alert.id,
                                email: alert.email.clone(),
                                outcome: ReportOutcome::Failed,
                                matched: count,
                                reason: Some("delivery failed".into()),
                            });
                        }
                    }
                }
                Err(AlertError::Configuration(reason)) => {
                    warn!(alert = alert.id, %reason, "alert misconfigured, continuing");
                    summary.failed += 1;
                    counter!("alerts_config_errors_total").increment(1);
                    summary.details.push(AlertReport {
                        alert_id: alert.id,
                        email: alert.email.clone(),
                        outcome: ReportOutcome::ConfigError,
                        matched: 0,
                        reason: Some(reason),
                    });
                }
                // Store outages are not per-alert conditions; the run cannot
                // make progress.
                Err(e) => return Err(e),
            }
        }

        gauge!("alerts_last_run_ts").set(now.timestamp().max(0) as f64);
        info!(
            sent = summary.sent,
            skipped = summary.skipped,
            failed = summary.failed,
            "batch run finished"
        );
        Ok(summary)
    }
}
