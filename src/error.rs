// src/error.rs
use thiserror::Error;

/// Failure taxonomy for the alert pipeline.
///
/// `Configuration` and `Delivery` are per-alert conditions: the batch isolates
/// them and keeps going. `Store` means persistence itself is unavailable and
/// aborts the whole run.
#[derive(Debug, Error)]
pub enum AlertError {
    /// Alert points at a missing filter or carries an unparseable cadence.
    #[error("alert misconfigured: {0}")]
    Configuration(String),

    /// The notification collaborator reported failure or timed out.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// Underlying persistence is unavailable.
    #[error("store unavailable: {0}")]
    Store(String),
}

impl AlertError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, AlertError::Store(_))
    }
}
