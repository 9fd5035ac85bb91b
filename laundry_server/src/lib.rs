//! # Laundry server
//! The HTTP face of the laundry management backend. It is responsible for:
//! * Serving the admin API used by the counter and the back office (`/api/admin`).
//! * Receiving STK results and paybill payments from Safaricom (`/mpesa`).
//! * Sending text message notifications when orders are created, ready for collection or paid for.
//! * Polling M-Pesa for STK prompts whose callback never arrived.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/admin/...`: Clients, the service catalog, orders, M-Pesa, SMS and reports. See [routes].
//! * `/mpesa/stk_callback`, `/mpesa/c2b/validation`, `/mpesa/c2b/confirmation`: Safaricom callbacks.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod payment_poller;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
