use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{PhoneNumber, SmsStatus, StkResolution};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("The gateway rejected the request. {0}")]
    Rejected(String),
    #[error("The gateway could not be reached. {0}")]
    Unavailable(String),
    #[error("The gateway is not configured. {0}")]
    NotConfigured(String),
}

//--------------------------------------        M-Pesa         --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StkPushRequest {
    pub phone: PhoneNumber,
    /// M-Pesa only accepts whole shillings
    pub amount: i64,
    /// Shown to the customer on the prompt. We use the order number.
    pub account_reference: String,
    pub description: String,
}

/// The gateway accepted an STK push and will prompt the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StkPushAck {
    pub merchant_request_id: String,
    pub checkout_request_id: String,
    pub customer_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StkQueryOutcome {
    /// The customer has not responded yet
    Pending,
    Completed(StkResolution),
}

#[allow(async_fn_in_trait)]
pub trait MpesaGateway {
    async fn stk_push(&self, request: StkPushRequest) -> Result<StkPushAck, GatewayError>;

    async fn stk_query(&self, checkout_request_id: &str) -> Result<StkQueryOutcome, GatewayError>;
}

//--------------------------------------          SMS          --------------------------------------------------------
/// Delivery report for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsDelivery {
    pub recipient: String,
    pub status: SmsStatus,
    pub message_id: Option<String>,
    pub cost: Option<String>,
    pub error: Option<String>,
}

impl SmsDelivery {
    pub fn sent<S: Into<String>>(recipient: S, message_id: Option<String>, cost: Option<String>) -> Self {
        Self { recipient: recipient.into(), status: SmsStatus::Sent, message_id, cost, error: None }
    }

    pub fn failed<S: Into<String>, E: Into<String>>(recipient: S, error: E) -> Self {
        let error = Some(error.into());
        Self { recipient: recipient.into(), status: SmsStatus::Failed, message_id: None, cost: None, error }
    }

    pub fn skipped<S: Into<String>, E: Into<String>>(recipient: S, reason: E) -> Self {
        let error = Some(reason.into());
        Self { recipient: recipient.into(), status: SmsStatus::Skipped, message_id: None, cost: None, error }
    }
}

#[allow(async_fn_in_trait)]
pub trait SmsGateway {
    /// Sends `message` to every recipient, returning one delivery report per recipient.
    async fn send_sms(&self, recipients: &[PhoneNumber], message: &str) -> Result<Vec<SmsDelivery>, GatewayError>;
}
