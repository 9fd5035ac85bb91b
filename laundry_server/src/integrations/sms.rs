use std::sync::Arc;

use gateway_tools::{sms_objects::RecipientReport, SmsApi, SmsApiError};
use laundry_engine::{
    db_types::{OrderStatus, PhoneNumber},
    events::EventHooks,
    traits::{GatewayError, SmsDelivery},
    NotificationApi,
    SmsGateway,
    SqliteDatabase,
};
use log::*;

use crate::config::NotificationConfig;

pub const NOTIFICATION_EVENT_BUFFER_SIZE: usize = 25;

pub type SqliteNotificationApi = NotificationApi<SqliteDatabase, SmsGatewayAdapter>;

/// The engine's SMS gateway, backed by the bulk SMS provider.
#[derive(Clone)]
pub struct SmsGatewayAdapter {
    api: SmsApi,
}

impl SmsGatewayAdapter {
    pub fn new(api: SmsApi) -> Self {
        Self { api }
    }
}

impl SmsGateway for SmsGatewayAdapter {
    async fn send_sms(&self, recipients: &[PhoneNumber], message: &str) -> Result<Vec<SmsDelivery>, GatewayError> {
        if !self.api.config().enabled {
            debug!("📱️ Text messages are disabled. Not sending to {} recipients", recipients.len());
            let skipped = recipients.iter().map(|p| SmsDelivery::skipped(p.as_str(), "Text messages are disabled"));
            return Ok(skipped.collect());
        }
        let reports = self.api.send(recipients, message).await.map_err(gateway_error)?;
        Ok(deliveries_from_reports(recipients, &reports))
    }
}

/// Pairs each recipient with the provider's report for that number. Recipients the provider did not report on are
/// treated as failed.
pub fn deliveries_from_reports(recipients: &[PhoneNumber], reports: &[RecipientReport]) -> Vec<SmsDelivery> {
    recipients
        .iter()
        .map(|phone| {
            let report = reports.iter().find(|r| PhoneNumber::parse(&r.number).is_ok_and(|n| &n == phone));
            match report {
                Some(r) if r.is_success() => SmsDelivery::sent(phone.as_str(), r.message_id(), r.cost()),
                Some(r) => SmsDelivery::failed(phone.as_str(), format!("{} ({})", r.status, r.status_code)),
                None => SmsDelivery::failed(phone.as_str(), "The provider did not report on this number"),
            }
        })
        .collect()
}

pub fn gateway_error(e: SmsApiError) -> GatewayError {
    match e {
        SmsApiError::Initialization(_) => GatewayError::NotConfigured(e.to_string()),
        SmsApiError::QueryError { status, .. } if status < 500 => GatewayError::Rejected(e.to_string()),
        _ => GatewayError::Unavailable(e.to_string()),
    }
}

/// Hooks that text the client when their order is taken, when it is ready for collection and when a payment
/// arrives. Each notification can be switched off in the configuration.
///
/// Failures are logged and never reach the request that triggered the event.
pub fn notification_hooks(api: Arc<SqliteNotificationApi>, config: NotificationConfig) -> EventHooks {
    let mut hooks = EventHooks::default();
    if config.order_created {
        let api = Arc::clone(&api);
        hooks.on_order_created(move |ev| {
            let api = Arc::clone(&api);
            Box::pin(async move {
                let order = ev.order;
                match api.notify_order_created(&order).await {
                    Ok(result) => debug!("📬️ Order {} confirmation: {} sent", order.order_number, result.sent),
                    Err(e) => error!("📬️ Could not send the confirmation for order {}. {e}", order.order_number),
                }
            })
        });
    }
    if config.order_ready {
        let api = Arc::clone(&api);
        hooks.on_status_changed(move |ev| {
            let api = Arc::clone(&api);
            Box::pin(async move {
                if ev.new_status() != OrderStatus::Ready {
                    return;
                }
                let order = ev.order;
                match api.notify_order_ready(&order).await {
                    Ok(result) => debug!("📬️ Order {} ready notice: {} sent", order.order_number, result.sent),
                    Err(e) => error!("📬️ Could not send the ready notice for order {}. {e}", order.order_number),
                }
            })
        });
    }
    if config.payment_received {
        hooks.on_payment_received(move |ev| {
            let api = Arc::clone(&api);
            Box::pin(async move {
                let number = &ev.order.order_number;
                match api.notify_payment_received(&ev.order, &ev.payment).await {
                    Ok(result) => debug!("📬️ Order {number} payment receipt: {} sent", result.sent),
                    Err(e) => error!("📬️ Could not send the payment receipt for order {number}. {e}"),
                }
            })
        });
    }
    hooks
}
