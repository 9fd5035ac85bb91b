use thiserror::Error;

use crate::{
    db_types::{NewSmsRecord, SmsRecord},
    lms_api::sms_objects::SmsQueryFilter,
    traits::{ClientApiError, GatewayError},
};

#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Cannot send an empty message")]
    EmptyMessage,
    #[error("The message has no valid recipients")]
    NoRecipients,
    #[error("SMS gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Client #{0} does not exist")]
    ClientNotFound(i64),
}

impl From<sqlx::Error> for NotificationError {
    fn from(e: sqlx::Error) -> Self {
        NotificationError::DatabaseError(e.to_string())
    }
}

impl From<ClientApiError> for NotificationError {
    fn from(e: ClientApiError) -> Self {
        match e {
            ClientApiError::ClientNotFound(id) => NotificationError::ClientNotFound(id),
            e => NotificationError::DatabaseError(e.to_string()),
        }
    }
}

/// A log of every text message sent, or not sent, by the system.
#[allow(async_fn_in_trait)]
pub trait SmsLog {
    async fn insert_sms_record(&self, record: NewSmsRecord) -> Result<SmsRecord, NotificationError>;

    /// Matching records, newest first.
    async fn search_sms_records(&self, query: SmsQueryFilter) -> Result<Vec<SmsRecord>, NotificationError>;
}
