use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsResponse {
    #[serde(rename = "SMSMessageData")]
    pub data: SmsMessageData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsMessageData {
    /// A summary, e.g. `Sent to 1/1 Total Cost: KES 0.8000`
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Recipients", default)]
    pub recipients: Vec<RecipientReport>,
}

/// The provider's verdict on one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientReport {
    pub status_code: i64,
    /// In E.164 format, `+2547XXXXXXXX`
    pub number: String,
    pub status: String,
    #[serde(default)]
    pub cost: String,
    #[serde(default)]
    pub message_id: String,
}

impl RecipientReport {
    /// 100 (processed), 101 (sent) and 102 (queued) all mean the message was accepted
    pub fn is_success(&self) -> bool {
        (100..=102).contains(&self.status_code)
    }

    pub fn message_id(&self) -> Option<String> {
        Some(self.message_id.clone()).filter(|s| !s.is_empty() && s != "None")
    }

    pub fn cost(&self) -> Option<String> {
        Some(self.cost.clone()).filter(|s| !s.is_empty() && s != "0")
    }
}
