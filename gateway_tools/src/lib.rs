//! HTTP clients for the payment and messaging providers used by the laundry server.
//!
//! * [`MpesaApi`] talks to Safaricom's Daraja API: OAuth tokens, STK push and STK status queries. The callback and
//!   paybill confirmation payloads Safaricom posts back are in [`mpesa_objects`].
//! * [`SmsApi`] sends text messages through an Africa's Talking style bulk SMS endpoint.
//!
//! Neither client knows anything about orders. The server adapts them to the engine's gateway traits.
mod config;
mod error;
mod mpesa_api;
mod sms_api;

pub mod helpers;
pub mod mpesa_objects;
pub mod sms_objects;

pub use config::{MpesaConfig, MpesaEnvironment, SmsConfig, SmsEnvironment};
pub use error::{MpesaApiError, SmsApiError};
pub use mpesa_api::MpesaApi;
pub use sms_api::SmsApi;
