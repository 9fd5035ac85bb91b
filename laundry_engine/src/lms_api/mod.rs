//! # Laundry engine public API
//!
//! Each API is a thin layer of business rules over a storage backend (and, for payments and notifications, a
//! gateway). An API instance is created by supplying a backend that implements the storage traits it needs.
//!
//! * [`client_api`] registers clients and reports their order history.
//! * [`catalog_api`] manages service categories and priced services.
//! * [`order_flow_api`] is the point of sale: quotes, orders, fulfilment status and counter payments.
//! * [`payment_flow_api`] handles M-Pesa STK prompts, paybill payments and reconciliation.
//! * [`notification_api`] sends and logs text messages.
//! * [`reports_api`] aggregates orders, clients and payments into business reports.
//!
//! ```rust,ignore
//! use laundry_engine::{OrderFlowApi, SqliteDatabase, events::EventProducers};
//! let db = SqliteDatabase::new_with_url("sqlite://data/laundry.db", 5).await?;
//! let api = OrderFlowApi::new(db, EventProducers::default());
//! let order = api.fetch_order_by_number("LND-240601-0001").await?;
//! ```
pub mod catalog_api;
pub mod client_api;
pub mod notification_api;
pub mod order_flow_api;
pub mod payment_flow_api;
pub mod reports_api;

pub mod catalog_objects;
pub mod client_objects;
pub mod order_objects;
pub mod payment_objects;
pub mod report_objects;
pub mod sms_objects;
