//! # Storage and gateway contracts
//!
//! The APIs in this crate never talk to a database or an HTTP service directly. Instead, they are generic over the
//! traits defined here, and any backend that implements them can drive the laundry engine.
//!
//! ## Storage
//! * [`ClientManagement`] stores client records.
//! * [`CatalogManagement`] stores service categories and priced services.
//! * [`OrderManagement`] stores orders and their items, and is responsible for applying payments to orders
//!   atomically.
//! * [`MpesaManagement`] tracks STK prompts and incoming M-Pesa transactions, and links them to orders.
//! * [`SmsLog`] records every message the system tries to send.
//!
//! ## Gateways
//! * [`MpesaGateway`] sends STK prompts and queries their status.
//! * [`SmsGateway`] delivers text messages.
mod catalog_management;
mod client_management;
mod data_objects;
mod gateways;
mod mpesa_management;
mod order_management;
mod sms_log;

pub use catalog_management::{CatalogApiError, CatalogManagement};
pub use client_management::{ClientApiError, ClientManagement};
pub use data_objects::PaymentApplied;
pub use gateways::{
    GatewayError,
    MpesaGateway,
    SmsDelivery,
    SmsGateway,
    StkPushAck,
    StkPushRequest,
    StkQueryOutcome,
};
pub use mpesa_management::{MpesaManagement, PaymentFlowError};
pub use order_management::{OrderFlowError, OrderManagement};
pub use sms_log::{NotificationError, SmsLog};

/// True if the error is a violation of a `UNIQUE` constraint
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}
