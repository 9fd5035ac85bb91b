use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{SmsRecord, SmsStatus};

/// A message to one or more phone numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsRequest {
    pub recipients: Vec<String>,
    pub message: String,
    pub order_id: Option<i64>,
}

impl SmsRequest {
    pub fn new<S: Into<String>>(recipients: Vec<String>, message: S) -> Self {
        Self { recipients, message: message.into(), order_id: None }
    }

    pub fn for_order(mut self, order_id: i64) -> Self {
        self.order_id = Some(order_id);
        self
    }
}

/// A personalised message to many clients. `{name}` in the message is replaced with each client's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSmsRequest {
    /// The clients to message. `None` sends to every client.
    pub client_ids: Option<Vec<i64>>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsDispatchResult {
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    pub records: Vec<SmsRecord>,
}

impl SmsDispatchResult {
    pub fn add(&mut self, record: SmsRecord) {
        match record.status {
            SmsStatus::Sent => self.sent += 1,
            SmsStatus::Failed => self.failed += 1,
            SmsStatus::Skipped => self.skipped += 1,
        }
        self.records.push(record);
    }

    pub fn merge(&mut self, other: SmsDispatchResult) {
        other.records.into_iter().for_each(|r| self.add(r));
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmsQueryFilter {
    pub recipient: Option<String>,
    pub status: Option<SmsStatus>,
    pub order_id: Option<i64>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl SmsQueryFilter {
    pub fn with_recipient<S: Into<String>>(mut self, recipient: S) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn with_status(mut self, status: SmsStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_order_id(mut self, order_id: i64) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.recipient.is_none() &&
            self.status.is_none() &&
            self.order_id.is_none() &&
            self.since.is_none() &&
            self.until.is_none() &&
            self.limit.is_none()
    }
}
