use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mail::message::{MergeParams, Recipient};

/// Request to compose and send one email
#[derive(Debug, Deserialize)]
pub struct SendMailRequest {
    pub to: Vec<Recipient>,
    /// View name, or Mandrill template name in template mode
    pub view: String,
    #[serde(default)]
    pub params: MergeParams,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, rename = "async")]
    pub send_async: bool,
    #[serde(default)]
    pub send_at: Option<DateTime<Utc>>,
}

/// Batch-level result: `sent` is false if any recipient was not accepted
#[derive(Debug, Serialize)]
pub struct SendMailResponse {
    pub sent: bool,
    pub recipients: usize,
}
