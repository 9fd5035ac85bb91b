//! Adapters between the provider clients in `gateway_tools` and the laundry engine.
pub mod mpesa;
pub mod sms;
