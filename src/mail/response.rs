//! Interpretation of Mandrill's per-recipient delivery results.
//!
//! The provider answers every send with one entry per recipient. This module
//! folds that array into a single batch-level verdict and emits one log event
//! per recipient under the `mandrill` target.

use serde::Deserialize;

use super::LOG_TARGET;

/// Delivery status reported by Mandrill for a single recipient
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum DeliveryStatus {
    Sent,
    Queued,
    Scheduled,
    Rejected,
    Invalid,
    /// Any status string this adapter does not know about
    Unknown(String),
}

impl From<String> for DeliveryStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "sent" => DeliveryStatus::Sent,
            "queued" => DeliveryStatus::Queued,
            "scheduled" => DeliveryStatus::Scheduled,
            "rejected" => DeliveryStatus::Rejected,
            "invalid" => DeliveryStatus::Invalid,
            _ => DeliveryStatus::Unknown(raw),
        }
    }
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Queued => "queued",
            DeliveryStatus::Scheduled => "scheduled",
            DeliveryStatus::Rejected => "rejected",
            DeliveryStatus::Invalid => "invalid",
            DeliveryStatus::Unknown(raw) => raw,
        }
    }
}

/// One recipient's outcome from a send call
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeliveryResult {
    pub email: String,
    pub status: DeliveryStatus,
    #[serde(default)]
    pub reject_reason: Option<String>,
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
}

/// Returns `true` only if every recipient was sent, queued or scheduled.
///
/// One invalid, rejected or unrecognised entry fails the whole batch, even
/// when every other recipient succeeded. An empty result set is a success.
pub fn all_accepted(results: &[DeliveryResult]) -> bool {
    let mut all_accepted = true;

    for result in results {
        let email = result.email.as_str();
        match &result.status {
            DeliveryStatus::Invalid => {
                all_accepted = false;
                tracing::warn!(
                    target: LOG_TARGET,
                    email = %email,
                    status = "invalid",
                    "Message to {} has status invalid",
                    email
                );
            }
            DeliveryStatus::Rejected => {
                all_accepted = false;
                let reason = result.reject_reason.as_deref().unwrap_or("unspecified");
                tracing::warn!(
                    target: LOG_TARGET,
                    email = %email,
                    reason = %reason,
                    "Message to {} was rejected: {}",
                    email,
                    reason
                );
            }
            DeliveryStatus::Queued => {
                tracing::info!(
                    target: LOG_TARGET,
                    email = %email,
                    "Message to {} queued, waiting to be sent",
                    email
                );
            }
            DeliveryStatus::Scheduled => {
                tracing::info!(
                    target: LOG_TARGET,
                    email = %email,
                    "Message to {} submission scheduled",
                    email
                );
            }
            DeliveryStatus::Sent => {
                tracing::info!(target: LOG_TARGET, email = %email, "Message to {} sent", email);
            }
            DeliveryStatus::Unknown(status) => {
                all_accepted = false;
                tracing::warn!(
                    target: LOG_TARGET,
                    email = %email,
                    status = %status,
                    category = "unknown",
                    "Message to {} has unrecognised status {}",
                    email,
                    status
                );
            }
        }
    }

    all_accepted
}
