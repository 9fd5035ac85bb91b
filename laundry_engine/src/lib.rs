//! Laundry Engine
//!
//! The core of the laundry management backend. It holds the business rules for clients, the service catalog,
//! orders taken at the point of sale, M-Pesa payments and their reconciliation, text message notifications and
//! business reports. It knows nothing about HTTP.
//!
//! The library is divided into these sections:
//! 1. Storage contracts ([`traits`]) and the SQLite backend that implements them ([`SqliteDatabase`]). The data types
//!    stored are defined in [`db_types`].
//! 2. The public API ([`lms_api`]). Each API is generic over the storage traits, and the M-Pesa and SMS gateway
//!    traits, that it needs.
//! 3. Pure business rules ([`helpers`]): pricing, payment state, transaction matching, report aggregation and message
//!    templates.
//! 4. Event hooks ([`events`]) for order and payment events. The server uses them to send notifications.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod lms_api;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use lms_api::{
    catalog_api::CatalogApi,
    client_api::ClientApi,
    notification_api::NotificationApi,
    order_flow_api::OrderFlowApi,
    payment_flow_api::PaymentFlowApi,
    reports_api::{ReportError, ReportsApi},
};
pub use traits::{
    CatalogApiError,
    CatalogManagement,
    ClientApiError,
    ClientManagement,
    MpesaGateway,
    MpesaManagement,
    NotificationError,
    OrderFlowError,
    OrderManagement,
    PaymentFlowError,
    SmsGateway,
    SmsLog,
};
