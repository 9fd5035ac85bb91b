use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatus, Payment, StkRequest};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order: Order,
    pub old_status: OrderStatus,
}

impl OrderStatusChangedEvent {
    pub fn new(order: Order, old_status: OrderStatus) -> Self {
        Self { order, old_status }
    }

    pub fn new_status(&self) -> OrderStatus {
        self.order.status
    }
}

/// Money was applied to an order, from any channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceivedEvent {
    pub order: Order,
    pub payment: Payment,
}

impl PaymentReceivedEvent {
    pub fn new(order: Order, payment: Payment) -> Self {
        Self { order, payment }
    }
}

/// An STK prompt failed, was dismissed or expired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentFailedEvent {
    pub order: Order,
    pub request: StkRequest,
}

impl PaymentFailedEvent {
    pub fn new(order: Order, request: StkRequest) -> Self {
        Self { order, request }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventType {
    OrderCreated(OrderCreatedEvent),
    OrderStatusChanged(OrderStatusChangedEvent),
    PaymentReceived(PaymentReceivedEvent),
    PaymentFailed(PaymentFailedEvent),
}
