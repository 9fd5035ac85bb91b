use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum MpesaApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("The M-Pesa API is not configured. {0}")]
    NotConfigured(String),
    #[error("Could not obtain an access token: {0}")]
    AuthenticationError(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("M-Pesa rejected the request. {code}: {message}")]
    Rejected { code: String, message: String },
    #[error("Invalid callback payload: {0}")]
    InvalidCallback(String),
}

impl MpesaApiError {
    /// True for failures where trying again later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            MpesaApiError::RestRequestError(_) | MpesaApiError::RestResponseError(_) => true,
            MpesaApiError::AuthenticationError(_) => true,
            MpesaApiError::QueryError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum SmsApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}
