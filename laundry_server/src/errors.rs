use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use laundry_engine::{
    traits::GatewayError,
    CatalogApiError,
    ClientApiError,
    NotificationError,
    OrderFlowError,
    PaymentFlowError,
    ReportError,
};
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    Conflict(String),
    #[error("The payment gateway failed. {0}")]
    GatewayError(String),
    #[error("Access denied. {0}")]
    Forbidden(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            error!("💻️ {self}");
        }
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<ClientApiError> for ServerError {
    fn from(e: ClientApiError) -> Self {
        match e {
            ClientApiError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            ClientApiError::ClientNotFound(_) => Self::NoRecordFound(e.to_string()),
            ClientApiError::DuplicatePhone(_) | ClientApiError::ClientHasOrders(_) => Self::Conflict(e.to_string()),
            ClientApiError::InvalidPhone(_) |
            ClientApiError::ValidationError(_) |
            ClientApiError::ClientModificationNoOp => Self::ValidationError(e.to_string()),
        }
    }
}

impl From<CatalogApiError> for ServerError {
    fn from(e: CatalogApiError) -> Self {
        match e {
            CatalogApiError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            CatalogApiError::CategoryNotFound(_) | CatalogApiError::ServiceNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            CatalogApiError::DuplicateCategory(_) |
            CatalogApiError::DuplicateService(_) |
            CatalogApiError::CategoryInUse(_, _) => Self::Conflict(e.to_string()),
            CatalogApiError::ValidationError(_) | CatalogApiError::CatalogModificationNoOp => {
                Self::ValidationError(e.to_string())
            },
        }
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            OrderFlowError::OrderNotFound(_) |
            OrderFlowError::OrderNumberNotFound(_) |
            OrderFlowError::ClientNotFound(_) |
            OrderFlowError::ServiceNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::ServiceInactive(_) |
            OrderFlowError::EmptyCart |
            OrderFlowError::InvalidQuantity(_, _) |
            OrderFlowError::InvalidDiscount(_) |
            OrderFlowError::InvalidPaymentAmount(_) => Self::ValidationError(e.to_string()),
            OrderFlowError::StatusModificationNoOp(_) |
            OrderFlowError::ForbiddenStatusChange { .. } |
            OrderFlowError::CannotCancelPaidOrder(_) |
            OrderFlowError::OrderCancelled(_) |
            OrderFlowError::OrderAlreadyPaid(_) |
            OrderFlowError::DuplicatePaymentReference(_) |
            OrderFlowError::ForbiddenPaymentStatusChange { .. } => Self::Conflict(e.to_string()),
        }
    }
}

impl From<GatewayError> for ServerError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::NotConfigured(_) => Self::ConfigurationError(e.to_string()),
            GatewayError::Rejected(_) | GatewayError::Unavailable(_) => Self::GatewayError(e.to_string()),
        }
    }
}

impl From<PaymentFlowError> for ServerError {
    fn from(e: PaymentFlowError) -> Self {
        match e {
            PaymentFlowError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            PaymentFlowError::Order(e) => e.into(),
            PaymentFlowError::Gateway(e) => e.into(),
            PaymentFlowError::StkRequestNotFound(_) | PaymentFlowError::TransactionNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            PaymentFlowError::StkAlreadyPending { .. } | PaymentFlowError::TransactionAlreadyProcessed { .. } => {
                Self::Conflict(e.to_string())
            },
            PaymentFlowError::InvalidAmount(_) | PaymentFlowError::InvalidPhone(_) => {
                Self::ValidationError(e.to_string())
            },
        }
    }
}

impl From<NotificationError> for ServerError {
    fn from(e: NotificationError) -> Self {
        match e {
            NotificationError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            NotificationError::EmptyMessage | NotificationError::NoRecipients => Self::ValidationError(e.to_string()),
            NotificationError::Gateway(e) => e.into(),
            NotificationError::ClientNotFound(_) => Self::NoRecordFound(e.to_string()),
        }
    }
}

impl From<ReportError> for ServerError {
    fn from(e: ReportError) -> Self {
        match e {
            ReportError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            ReportError::InvalidRange { .. } |
            ReportError::InvalidPreset(_) |
            ReportError::InvalidOption(_) |
            ReportError::PeriodTooLong(_) => Self::ValidationError(e.to_string()),
        }
    }
}
