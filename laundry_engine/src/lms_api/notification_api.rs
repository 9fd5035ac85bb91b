//! Text messages to clients: one-off messages, bulk campaigns and the automatic order notifications.
use std::{collections::BTreeSet, fmt::Debug};

use log::*;

use crate::{
    db_types::{NewSmsRecord, Order, Payment, PhoneNumber, SmsRecord},
    helpers::sms_templates,
    lms_api::{
        client_objects::ClientQueryFilter,
        sms_objects::{BulkSmsRequest, SmsDispatchResult, SmsQueryFilter, SmsRequest},
    },
    traits::{ClientManagement, NotificationError, SmsDelivery, SmsGateway, SmsLog},
};

pub struct NotificationApi<B, G> {
    db: B,
    gateway: G,
    business_name: String,
}

impl<B, G> Debug for NotificationApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationApi ({})", self.business_name)
    }
}

impl<B, G> NotificationApi<B, G> {
    pub fn new<S: Into<String>>(db: B, gateway: G, business_name: S) -> Self {
        Self { db, gateway, business_name: business_name.into() }
    }

    pub fn business_name(&self) -> &str {
        self.business_name.as_str()
    }
}

impl<B, G> NotificationApi<B, G>
where
    B: SmsLog + ClientManagement,
    G: SmsGateway,
{
    /// Sends a message to a list of phone numbers.
    ///
    /// Numbers are normalised and duplicates dropped. Numbers that cannot be parsed are not sent to, but are logged as
    /// skipped. Every recipient gets exactly one entry in the SMS log.
    pub async fn send_sms(&self, request: SmsRequest) -> Result<SmsDispatchResult, NotificationError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(NotificationError::EmptyMessage);
        }
        let mut valid = BTreeSet::new();
        let mut invalid = Vec::new();
        for recipient in request.recipients.iter().map(|r| r.trim()).filter(|r| !r.is_empty()) {
            match PhoneNumber::parse(recipient) {
                Ok(phone) => {
                    valid.insert(phone);
                },
                Err(e) => invalid.push(SmsDelivery::skipped(recipient, e.to_string())),
            }
        }
        if valid.is_empty() && invalid.is_empty() {
            return Err(NotificationError::NoRecipients);
        }
        let recipients = valid.into_iter().collect::<Vec<_>>();
        let mut deliveries = if recipients.is_empty() {
            Vec::new()
        } else {
            match self.gateway.send_sms(&recipients, message).await {
                Ok(deliveries) => deliveries,
                Err(e) => {
                    warn!("📱️ SMS gateway error sending to {} recipients. {e}", recipients.len());
                    recipients.iter().map(|p| SmsDelivery::failed(p.as_str(), e.to_string())).collect()
                },
            }
        };
        deliveries.extend(invalid);
        let mut result = SmsDispatchResult::default();
        for delivery in deliveries {
            let record = NewSmsRecord {
                recipient: delivery.recipient,
                message: message.to_string(),
                status: delivery.status,
                provider_message_id: delivery.message_id,
                cost: delivery.cost,
                error: delivery.error,
                order_id: request.order_id,
            };
            result.add(self.db.insert_sms_record(record).await?);
        }
        info!(
            "📱️ Message dispatched: {} sent, {} failed, {} skipped",
            result.sent, result.failed, result.skipped
        );
        Ok(result)
    }

    /// Sends a personalised message to each of the given clients, or to every client. `{name}` in the message is
    /// replaced with the client's name.
    pub async fn send_bulk(&self, request: BulkSmsRequest) -> Result<SmsDispatchResult, NotificationError> {
        if request.message.trim().is_empty() {
            return Err(NotificationError::EmptyMessage);
        }
        let clients = match &request.client_ids {
            Some(ids) => {
                let clients = self.db.fetch_clients_by_id(ids).await?;
                if let Some(missing) = ids.iter().find(|id| !clients.iter().any(|c| c.id == **id)) {
                    return Err(NotificationError::ClientNotFound(*missing));
                }
                clients
            },
            None => self.db.search_clients(ClientQueryFilter::default()).await?,
        };
        if clients.is_empty() {
            return Err(NotificationError::NoRecipients);
        }
        let mut result = SmsDispatchResult::default();
        for client in clients {
            let message = sms_templates::personalise(&request.message, &client.name);
            let sms = SmsRequest::new(vec![client.phone.to_string()], message);
            result.merge(self.send_sms(sms).await?);
        }
        info!("📱️ Bulk message complete: {} sent, {} failed, {} skipped", result.sent, result.failed, result.skipped);
        Ok(result)
    }

    pub async fn notify_order_created(&self, order: &Order) -> Result<SmsDispatchResult, NotificationError> {
        let message = sms_templates::order_created(&self.business_name, order);
        self.notify(order, message).await
    }

    pub async fn notify_order_ready(&self, order: &Order) -> Result<SmsDispatchResult, NotificationError> {
        let message = sms_templates::order_ready(&self.business_name, order);
        self.notify(order, message).await
    }

    pub async fn notify_payment_received(
        &self,
        order: &Order,
        payment: &Payment,
    ) -> Result<SmsDispatchResult, NotificationError> {
        let message = sms_templates::payment_received(&self.business_name, order, payment);
        self.notify(order, message).await
    }

    async fn notify(&self, order: &Order, message: String) -> Result<SmsDispatchResult, NotificationError> {
        debug!("📱️ Notifying {} about order {}", order.client_phone, order.order_number);
        let request = SmsRequest::new(vec![order.client_phone.to_string()], message).for_order(order.id);
        self.send_sms(request).await
    }

    pub async fn sms_history(&self, query: SmsQueryFilter) -> Result<Vec<SmsRecord>, NotificationError> {
        self.db.search_sms_records(query).await
    }
}
