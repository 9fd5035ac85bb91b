use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{Money, NewOrder, NewPayment, Order, OrderStatus, Payment, PaymentMethod},
    events::{EventProducers, OrderCreatedEvent, OrderStatusChangedEvent, PaymentReceivedEvent},
    helpers::{
        payment_state::{check_payment_amount, split_tender, tender},
        pricing::price_cart,
    },
    lms_api::order_objects::{
        Cart,
        NewOrderRequest,
        OrderQueryFilter,
        OrderReceipt,
        PaymentQueryFilter,
        PaymentReceipt,
        PaymentRequest,
        Quote,
    },
    traits::{CatalogManagement, ClientManagement, OrderFlowError, OrderManagement},
};

/// `OrderFlowApi` handles the point of sale: pricing carts, taking orders, moving them through the workshop and
/// taking payments at the counter.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement + CatalogManagement + ClientManagement
{
    /// Prices a cart against the current catalog without storing anything.
    pub async fn quote(&self, cart: &Cart) -> Result<Quote, OrderFlowError> {
        let mut ids = cart.items.iter().map(|i| i.service_id).collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        let services = self.db.fetch_services_by_id(&ids).await?;
        price_cart(cart, &services)
    }

    /// Takes a new order at the counter.
    ///
    /// The cart is priced against the current catalog, and the order and its items are stored. If the customer paid
    /// when handing the order in, the payment is applied in the same transaction. Cash above the order total is
    /// returned as change.
    ///
    /// Emits `OrderCreated`, and `PaymentReceived` if a payment was taken.
    pub async fn create_order(&self, request: NewOrderRequest) -> Result<OrderReceipt, OrderFlowError> {
        let client_id = request.client_id;
        self.db.fetch_client(client_id).await?.ok_or(OrderFlowError::ClientNotFound(client_id))?;
        let quote = self.quote(&request.cart).await?;
        let (payment, change) = match request.initial_payment {
            Some(p) => self.initial_payment(&quote, p)?,
            None => (None, Default::default()),
        };
        let new_order = NewOrder {
            client_id,
            items: quote.items,
            subtotal: quote.subtotal,
            discount: quote.discount,
            discount_amount: quote.discount_amount,
            total: quote.total,
            notes: request.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            due_date: request.due_date,
            created_at: Utc::now(),
        };
        let (order, payment) = self.db.insert_order(new_order, payment).await?;
        info!(
            "🔄️📦️ Order {} created for {}. Total {}, paid {}, change {change}",
            order.order_number, order.client_name, order.total, order.amount_paid
        );
        self.producers.publish_order_created(OrderCreatedEvent::new(order.clone())).await;
        if let Some(payment) = &payment {
            self.producers.publish_payment_received(PaymentReceivedEvent::new(order.clone(), payment.clone())).await;
        }
        Ok(OrderReceipt { order, payment, change })
    }

    fn initial_payment(
        &self,
        quote: &Quote,
        request: PaymentRequest,
    ) -> Result<(Option<NewPayment>, Money), OrderFlowError> {
        check_payment_amount(request.amount)?;
        // Free orders are settled at creation. Only cash can be handed straight back.
        if !quote.total.is_positive() && request.method != PaymentMethod::Cash {
            return Err(OrderFlowError::InvalidPaymentAmount(request.amount));
        }
        let tender = split_tender(quote.total, request.method, request.amount);
        if tender.applied.is_zero() {
            return Ok((None, tender.change));
        }
        Ok((Some(new_payment(tender.applied, request)), tender.change))
    }

    pub async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderFlowError> {
        self.db.fetch_order(id).await
    }

    pub async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, OrderFlowError> {
        self.db.fetch_order_by_number(order_number).await
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        trace!("🔄️📦️ Order search: {query}");
        self.db.search_orders(query).await
    }

    /// Moves an order to a new fulfilment status.
    ///
    /// | From \ To   | Received | InProgress | Ready | Delivered | Cancelled |
    /// |-------------|----------|------------|-------|-----------|-----------|
    /// | Received    | NoOp     | ✓          | ✓     | ✓         | 1         |
    /// | InProgress  | ✗        | NoOp       | ✓     | ✓         | 1         |
    /// | Ready       | ✗        | ✓          | NoOp  | ✓         | 1         |
    /// | Delivered   | ✗        | ✗          | ✗     | NoOp      | ✗         |
    /// | Cancelled   | ✗        | ✗          | ✗     | ✗         | NoOp      |
    ///
    /// (1) Only while nothing has been paid against the order.
    ///
    /// Delivery does not require the order to be paid off. The balance stays open and can be collected later.
    ///
    /// Emits `OrderStatusChanged`.
    pub async fn update_status(&self, id: i64, status: OrderStatus) -> Result<Order, OrderFlowError> {
        let (old, order) = self.db.update_order_status(id, status).await?;
        info!("🔄️📦️ Order {} is now {} (was {})", order.order_number, order.status, old.status);
        self.producers.publish_status_changed(OrderStatusChangedEvent::new(order.clone(), old.status)).await;
        Ok(order)
    }

    /// Records a payment taken at the counter, or entered by an administrator.
    ///
    /// Cash above the balance is handed back as change and not recorded. Other methods are recorded in full.
    ///
    /// Emits `PaymentReceived`.
    pub async fn record_payment(
        &self,
        order_id: i64,
        request: PaymentRequest,
    ) -> Result<PaymentReceipt, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        let tender = tender(&order, request.method, request.amount)?;
        let payment = new_payment(tender.applied, request);
        let applied = self.db.apply_payment(order_id, payment).await?;
        info!(
            "🔄️💰️ {} payment of {} recorded for order {}. Balance is now {}",
            applied.payment.method,
            applied.payment.amount,
            applied.order.order_number,
            applied.order.balance()
        );
        self.producers
            .publish_payment_received(PaymentReceivedEvent::new(applied.order.clone(), applied.payment.clone()))
            .await;
        Ok(PaymentReceipt { order: applied.order, payment: applied.payment, change: tender.change })
    }

    pub async fn payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>, OrderFlowError> {
        self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        self.db.fetch_payments(PaymentQueryFilter::for_order(order_id)).await
    }
}

fn new_payment(amount: Money, request: PaymentRequest) -> NewPayment {
    let mut payment = NewPayment::new(amount, request.method);
    payment.reference = request.reference.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    payment.notes = request.notes;
    payment
}
