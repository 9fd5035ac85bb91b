use chrono::Duration;
use laundry_engine::{lms_api::payment_objects::StkOutcome, PaymentFlowApi, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

use crate::integrations::mpesa::DarajaGateway;

/// Starts the payment poller. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `poll_interval` it asks M-Pesa about prompts that have been pending for at least one interval without a
/// callback, and then times out prompts older than `stk_timeout`.
pub fn start_payment_poller(
    api: PaymentFlowApi<SqliteDatabase, DarajaGateway>,
    poll_interval: Duration,
    stk_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = poll_interval.to_std().unwrap_or(std::time::Duration::from_secs(60));
        let mut timer = tokio::time::interval(period);
        info!("🕰️ STK payment poller started. Checking every {}s", period.as_secs());
        loop {
            timer.tick().await;
            trace!("🕰️ Running STK status poll");
            match api.refresh_pending_stk_requests(poll_interval).await {
                Ok(outcomes) if !outcomes.is_empty() => {
                    debug!("🕰️ {} pending STK prompts checked: {}", outcomes.len(), outcome_list(&outcomes));
                },
                Ok(_) => {},
                Err(e) => error!("🕰️ Error polling pending STK prompts: {e}"),
            }
            match api.expire_stale_stk_requests(stk_timeout).await {
                Ok(outcomes) if !outcomes.is_empty() => {
                    info!("🕰️ {} STK prompts timed out: {}", outcomes.len(), outcome_list(&outcomes));
                },
                Ok(_) => {},
                Err(e) => error!("🕰️ Error expiring stale STK prompts: {e}"),
            }
        }
    })
}

fn outcome_list(outcomes: &[StkOutcome]) -> String {
    outcomes
        .iter()
        .map(|o| {
            let request = o.request();
            format!("[{}] order_id: {} status: {}", request.checkout_request_id, request.order_id, request.status)
        })
        .collect::<Vec<String>>()
        .join(", ")
}
